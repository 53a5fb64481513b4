//! Geotrie - Read, Convert and Verify Trie-Based GeoIP Databases
//!
//! Geotrie works with GeoIP databases that map IP networks to country
//! codes. It understands the legacy trailer-indexed trie format ("mmdat")
//! and the modern header-indexed format ("mmdb"), and can convert between
//! them through a canonical in-memory record tree.
//!
//! # Quick Start
//!
//! ```no_run
//! use geotrie::format;
//! use geotrie::source::MmapSource;
//! use std::sync::Arc;
//!
//! let source: Arc<dyn geotrie::source::ReaderSource> =
//!     Arc::new(MmapSource::open("GeoIP.dat")?);
//!
//! // Detect the format and open a reader
//! let fmt = format::detect_format(&source)?;
//! let (reader, meta) = fmt.open_reader(source)?;
//! println!("{} database built {}", meta.database_type, meta.build_time);
//!
//! // Single lookup
//! let record = reader.lookup_ip("8.8.8.8".parse().unwrap())?;
//! println!("{}", record);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ReaderSource ──▶ Format::detect ──▶ Format::open_reader
//!                                          │
//!                                          ▼
//!                                 RecordTree (canonical)
//!                                          │
//!                        ┌─────────────────┼──────────────┐
//!                        ▼                 ▼              ▼
//!                  Format::open_writer   verify()     enumeration
//! ```
//!
//! Every database is reduced to the same rooted binary trie of records; the
//! writers, the verifier and record enumeration all consume that one shape.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitmap;
pub mod convert;
pub mod dat;
pub mod error;
pub mod format;
pub mod metadata;
pub mod mmdb;
pub mod record;
pub mod source;
pub mod tree;
pub mod verify;

pub use crate::convert::{convert, ConvertError, ConvertOptions, ConvertSummary};
pub use crate::error::{GeoDbError, Result};
pub use crate::format::{
    detect_format, format_names, lookup_format, register_format, Format, Reader, Writer,
};
pub use crate::metadata::{DatabaseType, IpVersion, Metadata};
pub use crate::record::{Network, Record};
pub use crate::source::{MmapSource, ReaderSource, SliceSource};
pub use crate::tree::RecordTree;
pub use crate::verify::{
    are_country_codes_equal, register_equivalent_country_code, verify, VerificationError,
    VerificationFailure, VerificationProgress,
};

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library major version
pub const VERSION_MAJOR: u32 = 1;

/// Library minor version
pub const VERSION_MINOR: u32 = 0;

/// Library patch version
pub const VERSION_PATCH: u32 = 1;

/// The complete version as a string
pub fn version_string() -> String {
    format!("{}.{}.{}", VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}
