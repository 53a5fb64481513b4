//! Database formats, readers, writers and the format registry
//!
//! A format bundles detection plus reader/writer construction behind a small
//! trait object. Formats register themselves in a process-wide registry; the
//! built-in "mmdat" and "mmdb" formats are seeded on first access.

use crate::error::{GeoDbError, Result};
use crate::metadata::{DatabaseType, IpVersion, Metadata};
use crate::record::Record;
use crate::source::ReaderSource;
use crate::tree::RecordTree;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

/// A database reader
pub trait Reader: Send + Sync {
    /// The database's full record tree for the given IP version.
    ///
    /// This is an expensive operation: the first call materialises every
    /// record in the database. The result is memoised, so subsequent calls
    /// are cheap. Plain lookups do not need the tree.
    fn record_tree(&self, ip_version: IpVersion) -> Result<Arc<RecordTree>>;

    /// Retrieve the record covering the given IP address
    fn lookup_ip(&self, ip: IpAddr) -> Result<Record>;
}

/// A database writer
pub trait Writer {
    /// Write a complete database from metadata and a record tree
    fn write_database(&mut self, meta: &Metadata, tree: &RecordTree) -> Result<()>;
}

/// A database format
pub trait Format: Send + Sync {
    /// The format's registry name
    fn name(&self) -> &'static str;

    /// Open a reader over the given source, returning the reader and the
    /// database metadata parsed during open
    fn open_reader(&self, source: Arc<dyn ReaderSource>) -> Result<(Box<dyn Reader>, Metadata)>;

    /// Open a writer emitting to the given sink
    fn open_writer(
        &self,
        sink: Box<dyn io::Write + Send>,
        database_type: DatabaseType,
        ip_version: IpVersion,
    ) -> Result<Box<dyn Writer>>;

    /// Check whether the source holds a database of this format.
    ///
    /// Must be a pure function of the source bytes; only `read_at` calls are
    /// permitted.
    fn detect(&self, source: &Arc<dyn ReaderSource>) -> bool;
}

static FORMAT_REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn Format>>>> = Lazy::new(|| {
    let mut formats: HashMap<String, Arc<dyn Format>> = HashMap::new();

    let dat: Arc<dyn Format> = Arc::new(crate::dat::DatFormat);
    formats.insert(dat.name().to_string(), dat);

    let mmdb: Arc<dyn Format> = Arc::new(crate::mmdb::MmdbFormat);
    formats.insert(mmdb.name().to_string(), mmdb);

    RwLock::new(formats)
});

/// Register a database format under its (lowercased) name
pub fn register_format(format: Arc<dyn Format>) -> Result<()> {
    let name = format.name().to_lowercase();

    let mut registry = FORMAT_REGISTRY
        .write()
        .expect("format registry lock poisoned");
    if registry.contains_key(&name) {
        return Err(GeoDbError::FormatIsRegistered);
    }

    registry.insert(name, format);
    Ok(())
}

/// Names of all registered formats, sorted
pub fn format_names() -> Vec<String> {
    let registry = FORMAT_REGISTRY
        .read()
        .expect("format registry lock poisoned");
    let mut names: Vec<String> = registry.keys().cloned().collect();
    names.sort();
    names
}

/// Retrieve a registered format by name
pub fn lookup_format(name: &str) -> Result<Arc<dyn Format>> {
    let registry = FORMAT_REGISTRY
        .read()
        .expect("format registry lock poisoned");
    registry
        .get(&name.to_lowercase())
        .cloned()
        .ok_or(GeoDbError::FormatNotFound)
}

/// Detect the format of the given source.
///
/// Formats are probed in sorted-name order; the first positive detection
/// wins.
pub fn detect_format(source: &Arc<dyn ReaderSource>) -> Result<Arc<dyn Format>> {
    let formats: Vec<Arc<dyn Format>> = {
        let registry = FORMAT_REGISTRY
            .read()
            .expect("format registry lock poisoned");
        let mut formats: Vec<_> = registry.values().cloned().collect();
        formats.sort_by_key(|f| f.name());
        formats
    };

    for format in formats {
        if format.detect(source) {
            log::debug!("detected database format {}", format.name());
            return Ok(format);
        }
    }

    Err(GeoDbError::FormatNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullFormat(&'static str);

    impl Format for NullFormat {
        fn name(&self) -> &'static str {
            self.0
        }

        fn open_reader(
            &self,
            _source: Arc<dyn ReaderSource>,
        ) -> Result<(Box<dyn Reader>, Metadata)> {
            Err(GeoDbError::NotImplemented)
        }

        fn open_writer(
            &self,
            _sink: Box<dyn io::Write + Send>,
            _database_type: DatabaseType,
            _ip_version: IpVersion,
        ) -> Result<Box<dyn Writer>> {
            Err(GeoDbError::NotImplemented)
        }

        fn detect(&self, _source: &Arc<dyn ReaderSource>) -> bool {
            false
        }
    }

    #[test]
    fn test_builtin_formats_are_registered() {
        let names = format_names();
        assert!(names.contains(&"mmdat".to_string()));
        assert!(names.contains(&"mmdb".to_string()));
    }

    #[test]
    fn test_lookup_format_is_case_insensitive() {
        assert!(lookup_format("MMDAT").is_ok());
        assert!(lookup_format("mmdat").is_ok());
    }

    #[test]
    fn test_lookup_unknown_format() {
        assert_eq!(
            lookup_format("no-such-format").err(),
            Some(GeoDbError::FormatNotFound)
        );
    }

    #[test]
    fn test_register_duplicate_format() {
        register_format(Arc::new(NullFormat("nullfmt"))).unwrap();
        assert_eq!(
            register_format(Arc::new(NullFormat("nullfmt"))).err(),
            Some(GeoDbError::FormatIsRegistered)
        );
    }

    #[test]
    fn test_format_names_sorted() {
        let names = format_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
