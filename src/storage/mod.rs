//! Product storage backends.
//!
//! [`ProductStore`] is the contract; [`InMemoryProductStore`] and
//! [`FileProductStore`] implement it. [`open_store`] picks a backend from a
//! [`StoreConfig`].

mod bulk;
mod memory;
pub mod persistent;
mod traits;

pub use bulk::MAX_IMPORT_WORKERS;
pub use memory::InMemoryProductStore;
pub use persistent::FileProductStore;
pub use traits::ProductStore;

use tracing::info;

use crate::config::{BackendKind, StoreConfig};
use crate::error::{StoreError, StoreResult};

/// Opens the backend described by `config`.
///
/// # Errors
/// - `Config` if the configuration is invalid (see [`StoreConfig::validate`])
/// - any error from [`FileProductStore::open`] for the file backend
///
/// # Example
/// ```
/// use inventory_store::{open_store, Context, ProductStore, StoreConfig};
///
/// let store = open_store(&StoreConfig::memory())?;
/// assert!(store.is_empty(&Context::background())?);
/// # Ok::<(), inventory_store::StoreError>(())
/// ```
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn ProductStore>> {
    let config = config.clone().validate()?;
    info!(backend = %config.backend, workers = config.import_workers, "opening product store");
    match config.backend {
        BackendKind::Memory => Ok(Box::new(InMemoryProductStore::with_import_workers(
            config.import_workers,
        ))),
        BackendKind::File => {
            let path = config
                .path
                .ok_or_else(|| StoreError::config("file backend requires a path"))?;
            Ok(Box::new(FileProductStore::open_with_workers(path, config.import_workers)?))
        }
    }
}
