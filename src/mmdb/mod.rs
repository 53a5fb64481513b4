//! The modern header-indexed trie format ("mmdb")
//!
//! The low-level codec is delegated to the `maxminddb` crate; this module
//! adapts its reader to the common `Reader` interface and feeds its network
//! enumeration into the canonical record tree. Only country-level data is
//! decoded; city databases are accepted but read country-only. Writing mmdb
//! databases is not implemented.

pub mod reader;

use crate::error::{GeoDbError, Result};
use crate::format::{Format, Reader, Writer};
use crate::metadata::{DatabaseType, IpVersion, Metadata};
use crate::source::{self, ReaderSource};
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;

/// Map an mmdb `database_type` header value onto the common database type
fn database_type_for(name: &str) -> Result<DatabaseType> {
    match name {
        "GeoLite2-Country" | "GeoIP2-Country" => Ok(DatabaseType::Country),
        // city databases are decoded country-only until a city record codec exists
        "GeoLite2-City" | "GeoIP2-City" => Ok(DatabaseType::Country),
        _ => Err(GeoDbError::TypeNotFound),
    }
}

/// The mmdb database format
pub struct MmdbFormat;

impl Format for MmdbFormat {
    fn name(&self) -> &'static str {
        "mmdb"
    }

    fn open_reader(&self, source: Arc<dyn ReaderSource>) -> Result<(Box<dyn Reader>, Metadata)> {
        let buf = source::read_all(&*source)?;
        let inner = maxminddb::Reader::from_source(buf)?;

        let database_type = database_type_for(&inner.metadata.database_type)?;

        let build_time = DateTime::<Utc>::from_timestamp(inner.metadata.build_epoch as i64, 0)
            .unwrap_or_else(Utc::now);
        let description = inner
            .metadata
            .description
            .get("en")
            .cloned()
            .unwrap_or_default();

        let meta = Metadata {
            database_type,
            build_time,
            description,
            major_format_version: u32::from(inner.metadata.binary_format_major_version),
            minor_format_version: u32::from(inner.metadata.binary_format_minor_version),
            ip_version: IpVersion::from_u8(inner.metadata.ip_version as u8),
        };

        Ok((Box::new(reader::MmdbReader::new(inner)), meta))
    }

    fn open_writer(
        &self,
        _sink: Box<dyn io::Write + Send>,
        _database_type: DatabaseType,
        _ip_version: IpVersion,
    ) -> Result<Box<dyn Writer>> {
        Err(GeoDbError::NotImplemented)
    }

    fn detect(&self, source: &Arc<dyn ReaderSource>) -> bool {
        self.open_reader(Arc::clone(source)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognised_database_types() {
        assert_eq!(
            database_type_for("GeoLite2-Country").unwrap(),
            DatabaseType::Country
        );
        assert_eq!(
            database_type_for("GeoIP2-Country").unwrap(),
            DatabaseType::Country
        );
        assert_eq!(
            database_type_for("GeoLite2-City").unwrap(),
            DatabaseType::Country
        );
        assert_eq!(
            database_type_for("GeoIP2-City").unwrap(),
            DatabaseType::Country
        );
    }

    #[test]
    fn test_unrecognised_database_type() {
        assert_eq!(
            database_type_for("GeoLite2-ASN").err(),
            Some(GeoDbError::TypeNotFound)
        );
    }

    #[test]
    fn test_writer_is_not_implemented() {
        let result = MmdbFormat.open_writer(
            Box::new(Vec::new()),
            DatabaseType::Country,
            IpVersion::V4,
        );
        assert_eq!(result.err(), Some(GeoDbError::NotImplemented));
    }
}
