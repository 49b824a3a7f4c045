//! Compile command implementation.

use crate::cli::CompileArgs;
use crate::cli::commands::{load_settings, print_json};
use crate::config::CliOverrides;
use crate::criteria::filter::parse_filter_str;
use crate::error::Result;
use crate::query::Compiler;
use serde_json::json;

/// Execute the compile command.
///
/// # Errors
///
/// Returns `Filter` for a malformed filter or `Compile` with every compile error.
pub fn execute(args: &CompileArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let settings = load_settings(cli)?;
    let expression = parse_filter_str(&args.filter)?;
    let compiled = Compiler::new()
        .qualified(args.qualified || settings.qualify_columns)
        .compile(&expression)
        .into_result()?;

    if json {
        return print_json(&json!({
            "expression": expression.to_string(),
            "where": compiled.where_clause,
            "parameters": compiled.parameters,
            "joins": compiled.joins.names(),
        }));
    }

    println!("{}", compiled.where_clause);
    for (i, parameter) in compiled.parameters.iter().enumerate() {
        println!("  ?{} = {parameter}", i + 1);
    }
    if !compiled.joins.is_empty() {
        println!("joins: {}", compiled.joins.names().join(", "));
    }
    Ok(())
}
