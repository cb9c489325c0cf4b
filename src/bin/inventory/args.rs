use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use inventory_store::{BackendKind, SortKey, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "inventory")]
#[command(about = "A product inventory management system", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store backend: memory|file
    #[arg(long, global = true, env = "INVENTORY_STORE")]
    pub store: Option<BackendKind>,

    /// File path for the file store [default: data/products.json]
    #[arg(long, global = true, env = "INVENTORY_STORE_FILE")]
    pub store_file: Option<PathBuf>,

    /// JSON or YAML config file (backend, path, import_workers)
    #[arg(long, global = true, env = "INVENTORY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (RUST_LOG takes precedence)
    #[arg(long, global = true, env = "INVENTORY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Abort each store call after this many milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new product with a generated id
    Create {
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        price: f64,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        quantity: i64,

        #[arg(long, default_value = "")]
        category: String,
    },

    /// Get a product by id
    Get { id: String },

    /// List products
    #[command(alias = "ls")]
    List {
        /// Filter by exact category
        #[arg(long)]
        category: Option<String>,

        /// Inclusive lower price bound
        #[arg(long)]
        min_price: Option<f64>,

        /// Inclusive upper price bound
        #[arg(long)]
        max_price: Option<f64>,

        /// Sort by: name|price|quantity
        #[arg(long)]
        sort_by: Option<SortKey>,

        /// Order: asc|desc
        #[arg(long, default_value = "asc")]
        order: SortOrder,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Update a product; only the given fields change
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        price: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        quantity: Option<i64>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a product
    #[command(alias = "rm")]
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Import products from a JSON array or newline-delimited JSON file
    Import {
        #[arg(long)]
        file: PathBuf,
    },

    /// Export products to a JSON file
    Export {
        #[arg(long)]
        file: PathBuf,

        /// Optional category filter
        #[arg(long)]
        category: Option<String>,
    },

    /// Interactive shell (type 'exit' or 'quit' to leave)
    Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
