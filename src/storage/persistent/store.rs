//! JSON-file-backed product store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::{ItemFailure, StoreError, StoreResult};
use crate::filter::ListFilter;
use crate::product::{validate, validate_new, Product, ProductId};
use crate::storage::bulk::{self, MAX_IMPORT_WORKERS};
use crate::storage::memory::lock_err;
use crate::storage::traits::ProductStore;

use super::snapshot;

/// Product store that rewrites a JSON file after every mutation.
///
/// The file is loaded once when the store is opened; afterwards the
/// in-memory map is authoritative and the file is its durable copy.
///
/// # Consistency
/// A mutation is applied to memory before the file is saved. If the save
/// fails, the error is returned but the in-memory change is kept, so the
/// file lags memory until the next successful save.
#[derive(Debug)]
pub struct FileProductStore {
    path: PathBuf,
    state: RwLock<HashMap<ProductId, Product>>,
    import_workers: usize,
}

#[derive(Default)]
struct Staging {
    entries: HashMap<ProductId, (usize, Product)>,
    displaced: Vec<ItemFailure>,
}

impl Staging {
    /// Stages `product`; the lowest batch index wins an id collision.
    fn stage(&mut self, index: usize, product: Product) -> StoreResult<()> {
        match self.entries.entry(product.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert((index, product));
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                if slot.get().0 < index {
                    return Err(StoreError::duplicate(product.id.as_str()));
                }
                let (lost, _) = slot.insert((index, product));
                let id = slot.key().to_string();
                self.displaced.push(ItemFailure {
                    index: lost,
                    error: StoreError::duplicate(id.as_str()),
                    id,
                });
                Ok(())
            }
        }
    }
}

impl FileProductStore {
    /// Opens the store at `path`, loading existing records.
    ///
    /// A missing file yields an empty store; the file is created by the
    /// first mutation. Temporary files left by an interrupted save are
    /// removed.
    ///
    /// # Errors
    /// - `Config` if `path` is empty
    /// - `Corrupt` if the file exists but is not a JSON array of products
    /// - `Io` if the file cannot be read
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_workers(path, MAX_IMPORT_WORKERS)
    }

    /// Like [`open`](Self::open), with a bulk-import worker limit.
    pub fn open_with_workers(path: impl AsRef<Path>, workers: usize) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StoreError::config("file backend requires a non-empty path"));
        }

        snapshot::remove_stale_temp_files(path)?;
        let records = snapshot::load(path)?;
        info!(path = %path.display(), records = records.len(), "product store opened");

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(records),
            import_workers: bulk::clamp_workers(workers),
        })
    }

    /// Path of the canonical store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist_locked(&self, state: &HashMap<ProductId, Product>) -> StoreResult<()> {
        let mut products: Vec<Product> = state.values().cloned().collect();
        snapshot::save(&self.path, &mut products).inspect_err(|e| {
            warn!(path = %self.path.display(), error = %e, "store file save failed; memory is ahead of disk");
        })
    }
}

impl ProductStore for FileProductStore {
    fn create(&self, ctx: &Context, product: Product) -> StoreResult<()> {
        ctx.check()?;
        validate_new(&product)?;
        let mut state = self.state.write().map_err(|_| lock_err("file store write"))?;
        let id = product.id.clone();
        match state.entry(id.clone()) {
            Entry::Occupied(_) => return Err(StoreError::duplicate(id.as_str())),
            Entry::Vacant(slot) => {
                slot.insert(product);
            }
        }
        debug!(product_id = %id, operation = "create", "product stored");
        self.persist_locked(&state)
    }

    fn get(&self, ctx: &Context, id: &str) -> StoreResult<Product> {
        ctx.check()?;
        let state = self.state.read().map_err(|_| lock_err("file store read"))?;
        state.get(id).cloned().ok_or_else(|| StoreError::not_found(id))
    }

    fn update(&self, ctx: &Context, id: &str, mut product: Product) -> StoreResult<()> {
        ctx.check()?;
        validate(&product)?;
        let mut state = self.state.write().map_err(|_| lock_err("file store write"))?;
        let slot = state.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
        product.id = ProductId::from(id);
        *slot = product;
        debug!(product_id = id, operation = "update", "product replaced");
        self.persist_locked(&state)
    }

    fn delete(&self, ctx: &Context, id: &str) -> StoreResult<()> {
        ctx.check()?;
        let mut state = self.state.write().map_err(|_| lock_err("file store write"))?;
        state.remove(id).ok_or_else(|| StoreError::not_found(id))?;
        debug!(product_id = id, operation = "delete", "product removed");
        self.persist_locked(&state)
    }

    fn list(&self, ctx: &Context, filter: &ListFilter) -> StoreResult<Vec<Product>> {
        ctx.check()?;
        let state = self.state.read().map_err(|_| lock_err("file store read"))?;
        Ok(filter.apply(state.values()))
    }

    /// Validates and de-duplicates the batch on the pool, then merges it
    /// under one write lock and saves the file once.
    ///
    /// Records staged before an interruption are still merged.
    fn bulk_import(&self, ctx: &Context, products: Vec<Product>) -> StoreResult<usize> {
        ctx.check()?;
        let total = products.len();
        if total == 0 {
            return Ok(0);
        }

        let staging = Mutex::new(Staging::default());
        let report = bulk::run(ctx, products, self.import_workers, |index, product| {
            validate_new(&product)?;
            staging
                .lock()
                .map_err(|_| lock_err("bulk import staging"))?
                .stage(index, product)
        });
        let Staging { entries, displaced } = staging.into_inner().unwrap_or_else(PoisonError::into_inner);

        let mut failures = report.failures;
        failures.extend(displaced);

        let mut staged: Vec<(usize, Product)> = entries.into_values().collect();
        staged.sort_unstable_by_key(|(index, _)| *index);

        let mut imported = 0;
        let mut persist = None;
        {
            let mut state = self.state.write().map_err(|_| lock_err("file store write"))?;
            for (index, product) in staged {
                match state.entry(product.id.clone()) {
                    Entry::Occupied(slot) => {
                        let id = slot.key().to_string();
                        failures.push(ItemFailure {
                            index,
                            error: StoreError::duplicate(id.as_str()),
                            id,
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(product);
                        imported += 1;
                    }
                }
            }
            if imported > 0 {
                persist = self.persist_locked(&state).err();
            }
        }

        bulk::conclude(total, imported, report.processed, failures, report.interrupted, persist)
    }

    fn len(&self, ctx: &Context) -> StoreResult<usize> {
        ctx.check()?;
        let state = self.state.read().map_err(|_| lock_err("file store read"))?;
        Ok(state.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    use crate::error::ErrorKind;

    fn open_in(dir: &TempDir) -> FileProductStore {
        FileProductStore::open(dir.path().join("products.json")).unwrap()
    }

    #[test]
    fn empty_path_is_config_error() {
        let err = FileProductStore::open("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_file_opens_empty_and_is_created_on_write() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        let ctx = Context::background();
        assert!(store.is_empty(&ctx).unwrap());
        assert!(!store.path().exists());

        store.create(&ctx, Product::new("a", "A", 1.0, 1, "")).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn every_mutation_is_persisted() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::background();
        {
            let store = open_in(&dir);
            store.create(&ctx, Product::new("a", "A", 1.0, 1, "x")).unwrap();
            store.create(&ctx, Product::new("b", "B", 2.0, 2, "x")).unwrap();
            store.update(&ctx, "a", Product::new("", "A2", 1.5, 3, "y")).unwrap();
            store.delete(&ctx, "b").unwrap();
        }

        let reopened = open_in(&dir);
        let all = reopened.list(&ctx, &ListFilter::new()).unwrap();
        assert_eq!(all, vec![Product::new("a", "A2", 1.5, 3, "y")]);
    }

    #[test]
    fn failed_mutations_do_not_write() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        let ctx = Context::background();
        store.create(&ctx, Product::new("a", "A", 1.0, 1, "")).unwrap();
        let before = fs::read(store.path()).unwrap();

        assert!(store.create(&ctx, Product::new("a", "A", 1.0, 1, "")).unwrap_err().is_duplicate());
        assert!(store.delete(&ctx, "zzz").unwrap_err().is_not_found());
        assert!(store.update(&ctx, "a", Product::new("a", "", 1.0, 1, "")).unwrap_err().is_invalid());
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn staging_keeps_lowest_index() {
        let mut staging = Staging::default();
        staging.stage(4, Product::new("x", "Late", 1.0, 1, "")).unwrap();
        staging.stage(1, Product::new("x", "Early", 1.0, 1, "")).unwrap();
        let err = staging.stage(9, Product::new("x", "Later", 1.0, 1, "")).unwrap_err();
        assert!(err.is_duplicate());

        assert_eq!(staging.entries["x"].0, 1);
        assert_eq!(staging.entries["x"].1.name, "Early");
        assert_eq!(staging.displaced.len(), 1);
        assert_eq!(staging.displaced[0].index, 4);
    }

    #[test]
    fn bulk_import_merges_and_saves_once() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        let ctx = Context::background();
        store.create(&ctx, Product::new("resident", "R", 1.0, 1, "")).unwrap();

        let batch = vec![
            Product::new("n1", "N1", 1.0, 1, ""),
            Product::new("resident", "Clash", 1.0, 1, ""),
            Product::new("n2", "N2", 1.0, 1, ""),
            Product::new("n1", "Again", 1.0, 1, ""),
        ];
        let err = store.bulk_import(&ctx, batch).unwrap_err();
        let bulk = err.as_bulk().unwrap();
        assert_eq!(bulk.imported(), 2);
        assert_eq!(bulk.count(ErrorKind::Duplicate), 2);
        let indexes: Vec<usize> = bulk.failures().iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![1, 3]);

        assert_eq!(store.get(&ctx, "resident").unwrap().name, "R");
        assert_eq!(store.get(&ctx, "n1").unwrap().name, "N1");

        let reopened = open_in(&dir);
        assert_eq!(reopened.len(&ctx).unwrap(), 3);
    }

    #[test]
    fn bulk_import_with_nothing_imported_skips_save() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        let ctx = Context::background();
        let err = store
            .bulk_import(&ctx, vec![Product::new("a", "", 1.0, 1, "")])
            .unwrap_err();
        assert_eq!(err.as_bulk().unwrap().count(ErrorKind::Invalid), 1);
        assert!(!store.path().exists());
    }
}
