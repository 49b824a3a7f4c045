use crate::model::value::FieldValue;
use crate::model::work_item_type::SYSTEM_TITLE;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A work item with its fields in external form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    pub id: Uuid,
    /// Sequence number, unique within the space.
    pub number: i64,
    #[serde(rename = "type")]
    pub type_id: Uuid,
    pub space_id: Uuid,
    pub version: i64,
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.field(SYSTEM_TITLE).and_then(FieldValue::as_str)
    }
}
