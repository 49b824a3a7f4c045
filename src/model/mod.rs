//! Core data types for `wit_core`.
//!
//! This module defines the field type system and the schema types built on it:
//! - `Kind` - Primitive and structural type tags
//! - `FieldValue` - External representation of a field value
//! - `FieldType` - Simple, enum and list types with their conversions
//! - `FieldDefinition` - A field type plus required-ness
//! - `WorkItemType` - Named set of field definitions
//! - `WorkItem` - A stored work item

pub mod codebase;
pub mod enum_type;
pub mod field_definition;
pub mod field_type;
pub mod kind;
pub mod list_type;
pub mod markup;
pub mod simple_type;
pub mod value;
pub mod work_item;
pub mod work_item_type;

pub use codebase::CodebaseContent;
pub use enum_type::EnumType;
pub use field_definition::FieldDefinition;
pub use field_type::FieldType;
pub use kind::Kind;
pub use list_type::ListType;
pub use markup::{MarkupContent, MarkupLanguage};
pub use simple_type::SimpleType;
pub use value::FieldValue;
pub use work_item::WorkItem;
pub use work_item_type::WorkItemType;

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) const fn is_false(b: &bool) -> bool {
    !*b
}
