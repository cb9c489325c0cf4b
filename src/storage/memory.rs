//! In-memory storage backend.
//!
//! This module provides a thread-safe, volatile implementation of
//! [`ProductStore`]. It is intended for embedded usage, tests, and as the
//! reference behavior the file-backed store follows.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use crate::filter::ListFilter;
use crate::product::{validate, validate_new, Product, ProductId};
use crate::storage::bulk::{self, MAX_IMPORT_WORKERS};
use crate::storage::traits::ProductStore;

pub(crate) fn lock_err(context: &'static str) -> StoreError {
    StoreError::Poisoned { context }
}

/// Volatile product store guarded by a single reader/writer lock.
#[derive(Debug)]
pub struct InMemoryProductStore {
    state: RwLock<HashMap<ProductId, Product>>,
    import_workers: usize,
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProductStore {
    /// Creates an empty store that imports with the full worker cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_import_workers(MAX_IMPORT_WORKERS)
    }

    /// Creates an empty store whose bulk imports use at most `workers`
    /// threads (clamped to `1..=MAX_IMPORT_WORKERS`).
    #[must_use]
    pub fn with_import_workers(workers: usize) -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            import_workers: bulk::clamp_workers(workers),
        }
    }

    fn insert(&self, product: Product) -> StoreResult<()> {
        validate_new(&product)?;
        let mut state = self.state.write().map_err(|_| lock_err("product state write"))?;
        match state.entry(product.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::duplicate(product.id.as_str())),
            Entry::Vacant(slot) => {
                debug!(product_id = %product.id, operation = "create", "product stored");
                slot.insert(product);
                Ok(())
            }
        }
    }
}

impl ProductStore for InMemoryProductStore {
    fn create(&self, ctx: &Context, product: Product) -> StoreResult<()> {
        ctx.check()?;
        self.insert(product)
    }

    fn get(&self, ctx: &Context, id: &str) -> StoreResult<Product> {
        ctx.check()?;
        let state = self.state.read().map_err(|_| lock_err("product state read"))?;
        state.get(id).cloned().ok_or_else(|| StoreError::not_found(id))
    }

    fn update(&self, ctx: &Context, id: &str, mut product: Product) -> StoreResult<()> {
        ctx.check()?;
        validate(&product)?;
        let mut state = self.state.write().map_err(|_| lock_err("product state write"))?;
        let slot = state.get_mut(id).ok_or_else(|| StoreError::not_found(id))?;
        product.id = ProductId::from(id);
        *slot = product;
        debug!(product_id = id, operation = "update", "product replaced");
        Ok(())
    }

    fn delete(&self, ctx: &Context, id: &str) -> StoreResult<()> {
        ctx.check()?;
        let mut state = self.state.write().map_err(|_| lock_err("product state write"))?;
        state.remove(id).ok_or_else(|| StoreError::not_found(id))?;
        debug!(product_id = id, operation = "delete", "product removed");
        Ok(())
    }

    fn list(&self, ctx: &Context, filter: &ListFilter) -> StoreResult<Vec<Product>> {
        ctx.check()?;
        let state = self.state.read().map_err(|_| lock_err("product state read"))?;
        Ok(filter.apply(state.values()))
    }

    fn bulk_import(&self, ctx: &Context, products: Vec<Product>) -> StoreResult<usize> {
        ctx.check()?;
        let total = products.len();
        if total == 0 {
            return Ok(0);
        }

        let report = bulk::run(ctx, products, self.import_workers, |_, product| self.insert(product));
        bulk::conclude(
            total,
            report.succeeded,
            report.processed,
            report.failures,
            report.interrupted,
            None,
        )
    }

    fn len(&self, ctx: &Context) -> StoreResult<usize> {
        ctx.check()?;
        let state = self.state.read().map_err(|_| lock_err("product state read"))?;
        Ok(state.len())
    }
}
