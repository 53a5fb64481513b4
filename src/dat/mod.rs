//! The legacy trailer-indexed trie format ("mmdat")
//!
//! A dat file is a trie of fixed-width record pairs followed by a metadata
//! trailer, all parsed back-to-front from EOF:
//!
//! ```text
//! [ record pairs ] [00 00 00] [ description text ] [FF FF FF] [type byte]
//! ```
//!
//! Each record-pair half either points at a child node (values below the
//! database segment offset) or carries a terminal record (values at or above
//! it). Country editions use 3-byte halves and encode the country as an
//! index above `COUNTRY_BEGIN`.

pub mod codec;
pub mod country;
pub mod country_codes;
pub mod reader;
pub mod types;
pub mod writer;

use crate::error::Result;
use crate::format::{Format, Reader, Writer};
use crate::metadata::{DatabaseType, IpVersion, Metadata};
use crate::source::ReaderSource;
use std::io;
use std::sync::Arc;

/// Maximum size of the structure trailer scanned at EOF, marker and type
/// byte included
pub(crate) const STRUCTURE_INFO_MAX_SIZE: usize = 20;

/// Maximum size of the description record scanned before the structure
/// trailer
pub(crate) const DATABASE_INFO_MAX_SIZE: usize = 100;

/// Maximum width of a single trie cell in bytes
pub(crate) const MAX_RECORD_LENGTH: u32 = 4;

/// Trie cell values at or above this sentinel are country records; the
/// country index is the value minus the sentinel
pub(crate) const COUNTRY_BEGIN: u32 = 16_776_960;

/// The legacy dat database format
pub struct DatFormat;

impl Format for DatFormat {
    fn name(&self) -> &'static str {
        "mmdat"
    }

    fn open_reader(&self, source: Arc<dyn ReaderSource>) -> Result<(Box<dyn Reader>, Metadata)> {
        reader::new_reader(source)
    }

    fn open_writer(
        &self,
        sink: Box<dyn io::Write + Send>,
        database_type: DatabaseType,
        ip_version: IpVersion,
    ) -> Result<Box<dyn Writer>> {
        let dat_type = types::lookup_type(database_type)?;
        dat_type.new_writer(sink, ip_version)
    }

    fn detect(&self, source: &Arc<dyn ReaderSource>) -> bool {
        self.open_reader(Arc::clone(source)).is_ok()
    }
}
