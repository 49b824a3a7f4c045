//! Type command implementations.

use crate::cli::commands::{open_storage, print_json};
use crate::cli::{TypeCommands, TypeCreateArgs, TypeUpdateArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::{FieldType, WorkItemType};
use std::fs;
use std::path::Path;

/// Execute a type subcommand.
///
/// # Errors
///
/// Returns an error if the definition cannot be read, fails validation, or
/// the store rejects it.
pub fn execute(command: &TypeCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    match command {
        TypeCommands::Create(args) => create(args, json, cli),
        TypeCommands::Show { id } => {
            let storage = open_storage(cli)?;
            let work_item_type = storage.resolve_type(id)?;
            render(&work_item_type, json)
        }
        TypeCommands::List => {
            let storage = open_storage(cli)?;
            let types = storage.list_types()?;
            if json {
                return print_json(&types);
            }
            if types.is_empty() {
                println!("No work item types.");
            }
            for work_item_type in &types {
                println!(
                    "{}  {} (v{}, {} fields)",
                    work_item_type.id,
                    work_item_type.name,
                    work_item_type.version,
                    work_item_type.fields.len()
                );
            }
            Ok(())
        }
        TypeCommands::Update(args) => update(args, json, cli),
        TypeCommands::Template { name } => {
            let template = WorkItemType::with_system_fields(name.as_str());
            if json {
                print_json(&template)
            } else {
                print!("{}", serde_yaml::to_string(&template)?);
                Ok(())
            }
        }
    }
}

fn create(args: &TypeCreateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut definition = read_definition(&args.file)?;
    let mut storage = open_storage(cli)?;
    if let Some(base) = &args.extends {
        definition.extended_type_id = Some(storage.resolve_type(base)?.id);
    }
    let created = storage.create_type(definition)?;
    render(&created, json)
}

fn update(args: &TypeUpdateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut definition = read_definition(&args.file)?;
    let mut storage = open_storage(cli)?;
    definition.id = storage.resolve_type(&args.id)?.id;
    let updated = storage.update_type(definition)?;
    render(&updated, json)
}

/// Read a type definition. YAML is a superset of JSON, so one parser covers both.
fn read_definition(path: &Path) -> Result<WorkItemType> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn render(work_item_type: &WorkItemType, json: bool) -> Result<()> {
    if json {
        return print_json(work_item_type);
    }
    println!("{} ({})", work_item_type.name, work_item_type.id);
    println!("  version: {}", work_item_type.version);
    if let Some(base) = work_item_type.extended_type_id {
        println!("  extends: {base}");
    }
    if !work_item_type.can_construct {
        println!("  abstract");
    }
    for (name, definition) in &work_item_type.fields {
        let required = if definition.required { " (required)" } else { "" };
        println!("  {name}: {}{required}", describe(&definition.field_type));
    }
    Ok(())
}

fn describe(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Simple(simple) => simple.kind.as_str().to_string(),
        FieldType::Enum(enumeration) => {
            let values: Vec<String> = enumeration.values.iter().map(ToString::to_string).collect();
            format!(
                "enum<{}> [{}]",
                enumeration.base_type.kind.as_str(),
                values.join(", ")
            )
        }
        FieldType::List(list) => format!("list<{}>", list.component_type.kind.as_str()),
    }
}
