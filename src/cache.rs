use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::data::loader::{self, LoadError};
use crate::data::model::CropDataset;

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// Identity of the raw source file: path plus modification signature.
/// Two equal signatures are treated as the same table; any change in
/// size or mtime invalidates the cached normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSignature {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl SourceSignature {
    fn probe(path: &Path) -> Result<Self, LoadError> {
        let meta = fs::metadata(path).map_err(|source| LoadError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(SourceSignature {
            path: path.to_path_buf(),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// TableCache
// ---------------------------------------------------------------------------

/// Owner of the latest normalized table.
///
/// Normalization is pure, so caching is purely an optimization: every
/// analysis call would be correct against a freshly loaded table. The
/// published table is immutable-after-publish — a refresh builds the new
/// `Arc<CropDataset>` completely and then swaps it in, so readers holding
/// an earlier `Arc` keep a consistent snapshot and never observe a
/// half-updated table.
#[derive(Default)]
pub struct TableCache {
    entry: Option<(SourceSignature, Arc<CropDataset>)>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached table for `path`, reloading when the source signature
    /// changed (or nothing is cached yet). A vanished source is the same
    /// fatal [`LoadError::SourceUnavailable`] the loader raises.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<CropDataset>, LoadError> {
        let signature = SourceSignature::probe(path)?;

        if let Some((cached_signature, table)) = &self.entry {
            if *cached_signature == signature {
                log::debug!("table cache hit for {}", path.display());
                return Ok(Arc::clone(table));
            }
            log::info!("source signature changed for {}, reloading", path.display());
        }

        let table = Arc::new(loader::load_csv(path)?);
        self.entry = Some((signature, Arc::clone(&table)));
        Ok(table)
    }

    /// Drop the cached table; the next `get_or_load` reloads.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// The currently published table, if any.
    pub fn cached(&self) -> Option<Arc<CropDataset>> {
        self.entry.as_ref().map(|(_, table)| Arc::clone(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct TempCsv(PathBuf);

    impl TempCsv {
        fn new(name: &str, body: &str) -> Self {
            let path = std::env::temp_dir().join(format!("yieldwatch-{}-{name}.csv", std::process::id()));
            let mut file = fs::File::create(&path).unwrap();
            write!(file, "{body}").unwrap();
            TempCsv(path)
        }
    }

    impl Drop for TempCsv {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    const HEADER: &str = "State,District,Year,Season,Crop,Area,Production\n";

    #[test]
    fn unchanged_source_returns_the_same_table() {
        let tmp = TempCsv::new(
            "hit",
            &format!("{HEADER}Gujarat,Rajkot,2018-19,Kharif,Rice,100,250\n"),
        );
        let mut cache = TableCache::new();

        let first = cache.get_or_load(&tmp.0).unwrap();
        let second = cache.get_or_load(&tmp.0).unwrap();
        assert!(Arc::ptr_eq(&first, &second), "cache hit must not reload");
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn changed_source_swaps_in_a_new_table() {
        let tmp = TempCsv::new(
            "swap",
            &format!("{HEADER}Gujarat,Rajkot,2018-19,Kharif,Rice,100,250\n"),
        );
        let mut cache = TableCache::new();
        let first = cache.get_or_load(&tmp.0).unwrap();

        // Grow the file; the length component of the signature changes
        // even when mtime granularity is coarse.
        let mut file = fs::OpenOptions::new().append(true).open(&tmp.0).unwrap();
        write!(file, "Punjab,Amritsar,2019-20,Rabi,Wheat,50,100\n").unwrap();
        drop(file);

        let second = cache.get_or_load(&tmp.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
        // The old snapshot is untouched.
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn missing_source_is_fatal_and_nothing_is_published() {
        let mut cache = TableCache::new();
        let err = cache.get_or_load(Path::new("/no/such/source.csv")).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
        assert!(cache.cached().is_none());
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let tmp = TempCsv::new(
            "invalidate",
            &format!("{HEADER}Gujarat,Rajkot,2018-19,Kharif,Rice,100,250\n"),
        );
        let mut cache = TableCache::new();
        let first = cache.get_or_load(&tmp.0).unwrap();
        cache.invalidate();
        assert!(cache.cached().is_none());
        let second = cache.get_or_load(&tmp.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
