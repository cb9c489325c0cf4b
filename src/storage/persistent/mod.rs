//! Persistent storage backend.
//!
//! The whole catalog lives in one JSON file, rewritten after every
//! mutation:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               FileProductStore               │
//! │   RwLock<HashMap<ProductId, Product>>        │
//! └──────────────────────┬───────────────────────┘
//!                        │ every mutation
//!                        ↓
//! ┌──────────────────────────────────────────────┐
//! │ SnapshotWriter                               │
//! │   .products.json.tmp.<uuid>                  │
//! │   write → flush → fsync → rename             │
//! └──────────────────────┬───────────────────────┘
//!                        ↓
//!                  products.json
//! ```
//!
//! Only in-process writers are serialized; another process writing the
//! same file is not guarded against.

mod snapshot;
mod store;

pub use store::FileProductStore;
