use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use clap::Parser;
use inventory_store::{
    decode_products, encode_products, Context, ListFilter, Product, ProductId, ProductStore,
    StoreError, StoreResult,
};
use tracing::{error, info};

use crate::args::{Cli, Command, OutputFormat};

const PROMPT: &str = "inventory> ";

fn context(timeout: Option<Duration>) -> Context {
    timeout.map_or_else(Context::background, Context::with_timeout)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> StoreResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode { source })?;
    println!("{text}");
    Ok(())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn read_file(path: &Path) -> StoreResult<Vec<u8>> {
    fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs one parsed command against an open store.
pub fn execute(store: &dyn ProductStore, command: Command, timeout: Option<Duration>) -> StoreResult<()> {
    match command {
        Command::Create {
            name,
            price,
            quantity,
            category,
        } => {
            let name = name.filter(|n| !n.is_empty()).ok_or_else(|| StoreError::config("name required"))?;
            let product = Product::new(ProductId::generate(), name, price, quantity, category);
            let id = product.id.clone();

            let start = Instant::now();
            if let Err(e) = store.create(&context(timeout), product.clone()) {
                error!(operation = "create", product_id = %id, error = %e, "create failed");
                return Err(e);
            }
            info!(operation = "create", product_id = %id, duration_ms = elapsed_ms(start), "product created");
            print_json(&product)
        }

        Command::Get { id } => match store.get(&context(timeout), &id) {
            Ok(product) => print_json(&product),
            Err(e) if e.is_not_found() => {
                eprintln!("{e}");
                Ok(())
            }
            Err(e) => Err(e),
        },

        Command::List {
            category,
            min_price,
            max_price,
            sort_by,
            order,
            output,
        } => {
            let filter = ListFilter {
                category,
                min_price,
                max_price,
                sort_by,
                order,
            };
            let products = store.list(&context(timeout), &filter)?;
            match output {
                OutputFormat::Json => print_json(&products),
                OutputFormat::Table => {
                    for p in &products {
                        println!("{} | {} | {:.2} | {} | {}", p.id, p.name, p.price, p.quantity, p.category);
                    }
                    Ok(())
                }
            }
        }

        Command::Update {
            id,
            name,
            price,
            quantity,
            category,
        } => {
            let ctx = context(timeout);
            let mut product = store.get(&ctx, &id)?;
            if let Some(name) = name {
                product.name = name;
            }
            if let Some(price) = price {
                product.price = price;
            }
            if let Some(quantity) = quantity {
                product.quantity = quantity;
            }
            if let Some(category) = category {
                product.category = category;
            }

            let start = Instant::now();
            if let Err(e) = store.update(&ctx, &id, product.clone()) {
                error!(operation = "update", product_id = %id, error = %e, "update failed");
                return Err(e);
            }
            info!(operation = "update", product_id = %id, duration_ms = elapsed_ms(start), "product updated");
            print_json(&product)
        }

        Command::Delete { id, force } => {
            if !force && !confirm(&format!("Delete {id}? (y/N): ")) {
                println!("aborted");
                return Ok(());
            }
            let start = Instant::now();
            if let Err(e) = store.delete(&context(timeout), &id) {
                error!(operation = "delete", product_id = %id, error = %e, "delete failed");
                return Err(e);
            }
            info!(operation = "delete", product_id = %id, duration_ms = elapsed_ms(start), "product deleted");
            println!("deleted");
            Ok(())
        }

        Command::Import { file } => {
            let bytes = read_file(&file)?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Err(StoreError::config(format!("empty import file: {}", file.display())));
            }
            let products = decode_products(&bytes)?;

            let start = Instant::now();
            let imported = store.bulk_import(&context(timeout), products)?;
            info!(operation = "import", imported, duration_ms = elapsed_ms(start), "import finished");
            println!("imported {imported} products");
            Ok(())
        }

        Command::Export { file, category } => {
            let filter = ListFilter {
                category,
                ..ListFilter::default()
            };
            let products = store.list(&context(timeout), &filter)?;
            let bytes = encode_products(&products)?;
            fs::write(&file, bytes).map_err(|source| StoreError::Io { path: file.clone(), source })?;
            println!("exported {} products to {}", products.len(), file.display());
            Ok(())
        }

        Command::Shell => shell(store),
    }
}

fn confirm(question: &str) -> bool {
    print!("{question}");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(answer.trim(), "y" | "Y"),
    }
}

/// Reads commands line by line until `exit`, `quit` or end of input.
///
/// Lines are split on whitespace only; quoting is not supported.
fn shell(store: &dyn ProductStore) -> StoreResult<()> {
    let stdin = io::stdin();
    loop {
        print!("{PROMPT}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return Ok(()),
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            return Ok(());
        }

        let parsed = Cli::try_parse_from(std::iter::once("inventory").chain(line.split_whitespace()));
        let cli = match parsed {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        if matches!(cli.command, Command::Shell) {
            eprintln!("already in shell");
            continue;
        }
        if let Err(e) = execute(store, cli.command, cli.timeout_ms.map(Duration::from_millis)) {
            eprintln!("error: {e}");
        }
    }
}
