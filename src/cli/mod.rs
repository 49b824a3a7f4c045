//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Work item types and criteria-to-SQL compilation
#[derive(Parser, Debug)]
#[command(name = "wit", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to .wit/wit.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a JSON filter into a SQL predicate
    Compile(CompileArgs),

    /// Build the full SELECT statement for a JSON filter
    Select(SelectArgs),

    /// Manage work item types
    #[command(name = "type")]
    Type {
        #[command(subcommand)]
        command: TypeCommands,
    },

    /// Manage work items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
}

/// Arguments for the compile command.
#[derive(Args, Debug, Clone, Default)]
pub struct CompileArgs {
    /// Filter as JSON, e.g. '{"state": "open"}'
    pub filter: String,

    /// Prefix base columns with the table name
    #[arg(long)]
    pub qualified: bool,
}

/// Arguments for the select command.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Filter as JSON
    pub filter: String,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<u64>,

    /// Rows to skip
    #[arg(long)]
    pub offset: Option<u64>,

    /// Keep `?` placeholders instead of `$n`
    #[arg(long)]
    pub raw: bool,
}

#[derive(Subcommand, Debug)]
pub enum TypeCommands {
    /// Create a type from a YAML or JSON definition
    Create(TypeCreateArgs),
    /// Show a type by id or name
    Show {
        /// Type id or name
        id: String,
    },
    /// List all types
    List,
    /// Replace a type's definition
    Update(TypeUpdateArgs),
    /// Print the standard type template with every system field
    Template {
        /// Name for the new type
        name: String,
    },
}

/// Arguments for the type create command.
#[derive(Args, Debug, Clone)]
pub struct TypeCreateArgs {
    /// Definition file (YAML or JSON)
    pub file: PathBuf,

    /// Base type id or name to inherit fields from
    #[arg(long)]
    pub extends: Option<String>,
}

/// Arguments for the type update command.
#[derive(Args, Debug, Clone)]
pub struct TypeUpdateArgs {
    /// Type id or name
    pub id: String,

    /// New definition file (YAML or JSON); its version must match the stored one
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create a work item
    Create(ItemCreateArgs),
    /// Show a work item
    Show {
        /// Work item id
        id: String,
    },
    /// List work items
    List {
        /// Only items of this space
        #[arg(long)]
        space: Option<String>,
    },
    /// Change field values of a work item
    Update(ItemUpdateArgs),
    /// Move a work item to another type
    Retype {
        /// Work item id
        id: String,

        /// Target type id or name
        #[arg(long = "type")]
        type_name: String,
    },
}

/// Arguments for the item create command.
#[derive(Args, Debug, Clone)]
pub struct ItemCreateArgs {
    /// Type id or name
    #[arg(long = "type")]
    pub type_name: String,

    /// Space id
    #[arg(long)]
    pub space: String,

    /// Field values as a JSON object
    #[arg(long, default_value = "{}")]
    pub fields: String,
}

/// Arguments for the item update command.
#[derive(Args, Debug, Clone)]
pub struct ItemUpdateArgs {
    /// Work item id
    pub id: String,

    /// Version the change is based on
    #[arg(long)]
    pub version: i64,

    /// Field values to overwrite, as a JSON object
    #[arg(long)]
    pub fields: String,
}
