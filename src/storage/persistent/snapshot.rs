//! Whole-file JSON snapshots with atomic replace.
//!
//! The canonical file is never written in place: a snapshot goes to a
//! hidden sibling `.<name>.tmp.<uuid>`, is flushed and fsynced, then renamed
//! over the canonical path.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::product::{Product, ProductId};

const TEMP_MARKER: &str = ".tmp.";

fn file_name(path: &Path) -> StoreResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::config(format!("store path has no file name: {}", path.display())))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn temp_prefix(name: &str) -> String {
    format!(".{name}{TEMP_MARKER}")
}

/// Loads the products stored at `path`, keyed by id.
///
/// A missing, empty or whitespace-only file is an empty store. Malformed
/// content fails with `Corrupt`. If an id repeats, the last record wins.
pub(crate) fn load(path: &Path) -> StoreResult<HashMap<ProductId, Product>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }

    let products: Vec<Product> = serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let mut map = HashMap::with_capacity(products.len());
    for product in products {
        let id = product.id.clone();
        if map.insert(id.clone(), product).is_some() {
            warn!(path = %path.display(), product_id = %id, "duplicate id in store file; keeping last record");
        }
    }
    Ok(map)
}

/// Removes temporary siblings of `path` left behind by an interrupted save.
///
/// Returns how many files were removed.
pub(crate) fn remove_stale_temp_files(path: &Path) -> StoreResult<usize> {
    let prefix = temp_prefix(&file_name(path)?);
    let dir = parent_dir(path);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StoreError::io(&dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let stale = entry.path();
        match fs::remove_file(&stale) {
            Ok(()) => {
                warn!(path = %stale.display(), "removed stale temporary store file");
                removed += 1;
            }
            Err(e) => warn!(path = %stale.display(), error = %e, "failed to remove stale temporary store file"),
        }
    }
    Ok(removed)
}

/// Writes one snapshot to a temporary sibling and renames it into place.
///
/// Dropping a writer that was not finalized removes its temporary file.
#[derive(Debug)]
pub(crate) struct SnapshotWriter {
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl SnapshotWriter {
    /// Creates the temporary file, creating missing parent directories.
    pub(crate) fn new(final_path: &Path) -> StoreResult<Self> {
        let dir = parent_dir(final_path);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let name = file_name(final_path)?;
        let temp_path = dir.join(format!("{}{}", temp_prefix(&name), Uuid::new_v4()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| StoreError::io(&temp_path, e))?;

        Ok(Self {
            temp_path: Some(temp_path),
            final_path: final_path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    fn temp_path(&self) -> &Path {
        self.temp_path.as_deref().unwrap_or(&self.final_path)
    }

    /// Appends bytes to the temporary file.
    pub(crate) fn write(&mut self, bytes: &[u8]) -> StoreResult<()> {
        let temp_path = self.temp_path().to_path_buf();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StoreError::io(&temp_path, io::Error::other("writer already consumed")))?;
        writer.write_all(bytes).map_err(|e| StoreError::io(&temp_path, e))
    }

    /// Flushes, fsyncs and renames the temporary file over the final path.
    ///
    /// This is the commit point: once it returns, the snapshot is durable.
    pub(crate) fn finalize(mut self) -> StoreResult<()> {
        let temp_path = self.temp_path().to_path_buf();
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| StoreError::io(&temp_path, io::Error::other("writer already consumed")))?;

        writer.flush().map_err(|e| StoreError::io(&temp_path, e))?;
        writer.get_ref().sync_all().map_err(|e| StoreError::io(&temp_path, e))?;
        drop(writer);

        fs::rename(&temp_path, &self.final_path).map_err(|e| StoreError::io(&self.final_path, e))?;
        self.temp_path = None;

        sync_dir(&parent_dir(&self.final_path));
        Ok(())
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.writer.take();
        if let Some(temp_path) = self.temp_path.take() {
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Best effort: some filesystems refuse fsync on directories.
    if let Ok(handle) = File::open(dir) {
        if let Err(e) = handle.sync_all() {
            warn!(path = %dir.display(), error = %e, "directory fsync failed");
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Atomically replaces the file at `path` with `products`, sorted by id.
pub(crate) fn save(path: &Path, products: &mut [Product]) -> StoreResult<()> {
    products.sort_by(|a, b| a.id.cmp(&b.id));
    let bytes = codec::encode_products(products)?;
    let mut writer = SnapshotWriter::new(path)?;
    writer.write(&bytes)?;
    writer.finalize()
}
