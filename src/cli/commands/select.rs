//! Select command implementation.

use crate::cli::SelectArgs;
use crate::cli::commands::print_json;
use crate::criteria::filter::parse_filter_str;
use crate::error::Result;
use crate::query::{Page, select_work_items};
use serde_json::json;

/// Execute the select command.
///
/// # Errors
///
/// Returns `Filter` for a malformed filter or `Compile` with every compile error.
pub fn execute(args: &SelectArgs, json: bool) -> Result<()> {
    let expression = parse_filter_str(&args.filter)?;
    let page = Page {
        limit: args.limit,
        offset: args.offset,
    };
    let statement = select_work_items(&expression, page)?;
    let sql = if args.raw {
        statement.sql.clone()
    } else {
        statement.to_postgres()
    };

    if json {
        return print_json(&json!({
            "sql": sql,
            "parameters": statement.parameters,
        }));
    }

    println!("{sql}");
    for (i, parameter) in statement.parameters.iter().enumerate() {
        println!("  ${} = {parameter}", i + 1);
    }
    Ok(())
}
