//! Work item command implementations.

use crate::cli::commands::{open_storage, parse_fields, parse_uuid, print_json};
use crate::cli::{ItemCommands, ItemCreateArgs, ItemUpdateArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::WorkItem;

/// Execute a work item subcommand.
///
/// # Errors
///
/// Returns an error for unknown ids, field conversion failures, or version
/// conflicts.
pub fn execute(command: &ItemCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    match command {
        ItemCommands::Create(args) => create(args, json, cli),
        ItemCommands::Show { id } => {
            let storage = open_storage(cli)?;
            let item = storage.get_item(&parse_uuid("id", id)?)?;
            render(&item, json)
        }
        ItemCommands::List { space } => {
            let storage = open_storage(cli)?;
            let space = space
                .as_deref()
                .map(|space| parse_uuid("space", space))
                .transpose()?;
            let items = storage.list_items(space.as_ref())?;
            if json {
                return print_json(&items);
            }
            for item in &items {
                println!(
                    "#{:<4} {}  {}",
                    item.number,
                    item.id,
                    item.title().unwrap_or("(untitled)")
                );
            }
            Ok(())
        }
        ItemCommands::Update(args) => update(args, json, cli),
        ItemCommands::Retype { id, type_name } => {
            let mut storage = open_storage(cli)?;
            let new_type = storage.resolve_type(type_name)?;
            let item = storage.change_item_type(&parse_uuid("id", id)?, &new_type.id)?;
            render(&item, json)
        }
    }
}

fn create(args: &ItemCreateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let space = parse_uuid("space", &args.space)?;
    let fields = parse_fields(&args.fields)?;
    let mut storage = open_storage(cli)?;
    let work_item_type = storage.resolve_type(&args.type_name)?;
    let item = storage.create_item(&work_item_type.id, &space, &fields)?;
    render(&item, json)
}

fn update(args: &ItemUpdateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let id = parse_uuid("id", &args.id)?;
    let changes = parse_fields(&args.fields)?;
    let mut storage = open_storage(cli)?;
    let item = storage.update_item(&id, args.version, &changes)?;
    render(&item, json)
}

fn render(item: &WorkItem, json: bool) -> Result<()> {
    if json {
        return print_json(item);
    }
    println!("#{} {} (v{})", item.number, item.id, item.version);
    println!("  type: {}", item.type_id);
    println!("  space: {}", item.space_id);
    for (name, value) in &item.fields {
        if !value.is_null() {
            println!("  {name}: {value}");
        }
    }
    Ok(())
}
