//! # inventory-store
//!
//! A concurrency-safe product catalog with two interchangeable backends: a
//! volatile in-memory map and a JSON file that is atomically rewritten after
//! every mutation. Both support single-record CRUD, filtered listing and a
//! concurrent bulk import that reports every rejected record.
//!
//! ## Core Concepts
//!
//! - **Product**: one inventory item (`id`, `name`, `price`, `quantity`, `category`)
//! - **ProductStore**: the storage contract both backends implement
//! - **Context**: cancellation signal and deadline passed to every operation
//! - **BulkImportError**: aggregated per-record failures of a partial import
//!
//! ## Usage
//!
//! ```
//! use inventory_store::{
//!     Context, InMemoryProductStore, ListFilter, Product, ProductStore, SortKey, SortOrder,
//! };
//!
//! let store = InMemoryProductStore::new();
//! let ctx = Context::background();
//!
//! store.create(&ctx, Product::new("sku-1", "Lamp", 39.0, 4, "Home"))?;
//! store.create(&ctx, Product::new("sku-2", "Desk", 180.0, 1, "Home"))?;
//!
//! let expensive = store.list(
//!     &ctx,
//!     &ListFilter::new().min_price(50.0).sort_by(SortKey::Price, SortOrder::Descending),
//! )?;
//! assert_eq!(expensive[0].id.as_str(), "sku-2");
//! # Ok::<(), inventory_store::StoreError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Records and their contracts
pub mod codec;
pub mod context;
pub mod error;
pub mod filter;
pub mod product;

// Backends
pub mod config;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use codec::{decode_products, encode_products};
pub use config::{BackendKind, StoreConfig};
pub use context::Context;
pub use error::{
    BulkImportError, ErrorKind, FieldValue, Interruption, ItemFailure, ProductField, StoreError,
    StoreResult,
};
pub use filter::{ListFilter, SortKey, SortOrder};
pub use product::{validate, Product, ProductId};
pub use storage::{
    open_store, FileProductStore, InMemoryProductStore, ProductStore, MAX_IMPORT_WORKERS,
};
