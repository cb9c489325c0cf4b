//! Abstract storage trait for product stores.
//!
//! Both backends implement [`ProductStore`] uniformly so callers (the CLI,
//! tests, benchmarks) stay backend-agnostic and can hold a
//! `Box<dyn ProductStore>`.

use crate::context::Context;
use crate::error::StoreResult;
use crate::filter::ListFilter;
use crate::product::Product;

/// Storage contract for products.
///
/// # Concurrency
/// - All methods take `&self`; implementations guard their state with a
///   reader/writer lock so concurrent callers are linearized.
/// - Every method checks `ctx` first and fails with `Cancelled` or
///   `DeadlineExceeded` without touching the lock if it is already done.
/// - Reads return copies; the underlying map is never exposed.
pub trait ProductStore: Send + Sync {
    /// Insert a new product.
    ///
    /// # Errors
    /// - `Invalid` if the id is empty or a field fails validation
    /// - `Duplicate` if the id already exists (the stored record is unchanged)
    fn create(&self, ctx: &Context, product: Product) -> StoreResult<()>;

    /// Get a copy of the product with the given id.
    ///
    /// # Errors
    /// - `NotFound` if the id is absent
    fn get(&self, ctx: &Context, id: &str) -> StoreResult<Product>;

    /// Replace the product stored under `id`.
    ///
    /// The record's own `id` is ignored and overwritten with `id`.
    ///
    /// # Errors
    /// - `Invalid` if a field fails validation (checked before lookup)
    /// - `NotFound` if the id is absent
    fn update(&self, ctx: &Context, id: &str, product: Product) -> StoreResult<()>;

    /// Remove the product with the given id.
    ///
    /// # Errors
    /// - `NotFound` if the id is absent
    fn delete(&self, ctx: &Context, id: &str) -> StoreResult<()>;

    /// Snapshot of the products matching `filter`, in the filter's order.
    fn list(&self, ctx: &Context, filter: &ListFilter) -> StoreResult<Vec<Product>>;

    /// Insert many products concurrently and return how many were imported.
    ///
    /// Not atomic: valid records are committed even when others fail. Every
    /// failed record appears in the returned `Bulk` error.
    ///
    /// # Errors
    /// - `Cancelled`/`DeadlineExceeded` if `ctx` is done before any work starts
    /// - `Bulk` aggregating per-record failures; its kind is the interruption
    ///   kind if `ctx` fired mid-batch
    fn bulk_import(&self, ctx: &Context, products: Vec<Product>) -> StoreResult<usize>;

    /// Number of stored products.
    fn len(&self, ctx: &Context) -> StoreResult<usize>;

    /// Returns true if the store holds no products.
    fn is_empty(&self, ctx: &Context) -> StoreResult<bool> {
        Ok(self.len(ctx)? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_product_store_object_safe(_: &dyn ProductStore) {}

    #[test]
    fn boxed_backends_share_the_trait() {
        let dir = tempfile::tempdir().unwrap();
        let memory: Box<dyn ProductStore> = Box::new(crate::storage::InMemoryProductStore::new());
        let file: Box<dyn ProductStore> =
            Box::new(crate::storage::FileProductStore::open(dir.path().join("p.json")).unwrap());

        let ctx = Context::background();
        for store in [memory, file] {
            assert!(store.is_empty(&ctx).unwrap());
            store.create(&ctx, Product::new("a", "A", 1.0, 1, "")).unwrap();
            assert!(!store.is_empty(&ctx).unwrap());
        }
    }
}
