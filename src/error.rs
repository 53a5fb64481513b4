//! Error types shared across the library
use std::fmt;
use std::io;

/// Result type alias for geotrie operations
pub type Result<T> = std::result::Result<T, GeoDbError>;

/// Main error type for database operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoDbError {
    /// The database type is not supported by the requested operation
    UnsupportedDatabaseType,

    /// The database contents are invalid (truncated file, pointer past EOF, ...)
    DatabaseInvalid,

    /// The embedded database description could not be located
    DatabaseInfoNotFound,

    /// The type byte of a legacy database does not resolve to a known type
    DatabaseTypeNotFound,

    /// No record exists for the given lookup
    RecordNotFound,

    /// The requested IP version is not provided by the database
    UnsupportedIPVersion,

    /// A record variant the encoder cannot represent (e.g. a city record
    /// handed to a country writer)
    UnsupportedRecordType,

    /// Unknown country code or out-of-range country index
    CountryNotFound,

    /// A format with this name is already registered
    FormatIsRegistered,

    /// No format with this name is registered
    FormatNotFound,

    /// A type with this ID is already registered
    TypeRegistered,

    /// No type with this ID is registered
    TypeNotFound,

    /// Bitmap operands differ in length
    LengthMismatch,

    /// A record's address bytes are too short for the requested bit test
    MalformedRecord,

    /// Tree construction descended below depth zero with records remaining
    NegativeDepth,

    /// The operation exists in the interface but has no implementation
    NotImplemented,

    /// I/O errors from the reader source or output sink
    Io(String),

    /// Errors surfaced by the mmdb decoding collaborator
    Mmdb(String),
}

impl fmt::Display for GeoDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoDbError::UnsupportedDatabaseType => write!(f, "unsupported database type"),
            GeoDbError::DatabaseInvalid => write!(f, "database invalid"),
            GeoDbError::DatabaseInfoNotFound => write!(f, "database information not found"),
            GeoDbError::DatabaseTypeNotFound => write!(f, "database type not found"),
            GeoDbError::RecordNotFound => write!(f, "record not found"),
            GeoDbError::UnsupportedIPVersion => {
                write!(f, "requested IP version not supported by database")
            }
            GeoDbError::UnsupportedRecordType => write!(f, "unsupported record type"),
            GeoDbError::CountryNotFound => write!(f, "country not found"),
            GeoDbError::FormatIsRegistered => write!(f, "format already registered"),
            GeoDbError::FormatNotFound => write!(f, "format not found"),
            GeoDbError::TypeRegistered => write!(f, "type is already registered"),
            GeoDbError::TypeNotFound => write!(f, "type not found"),
            GeoDbError::LengthMismatch => write!(f, "length mismatch"),
            GeoDbError::MalformedRecord => write!(f, "malformed record address"),
            GeoDbError::NegativeDepth => write!(f, "tree depth exhausted with records remaining"),
            GeoDbError::NotImplemented => write!(f, "not implemented"),
            GeoDbError::Io(msg) => write!(f, "I/O error: {}", msg),
            GeoDbError::Mmdb(msg) => write!(f, "mmdb error: {}", msg),
        }
    }
}

impl std::error::Error for GeoDbError {}

impl From<io::Error> for GeoDbError {
    fn from(err: io::Error) -> Self {
        GeoDbError::Io(err.to_string())
    }
}

impl From<maxminddb::MaxMindDBError> for GeoDbError {
    fn from(err: maxminddb::MaxMindDBError) -> Self {
        match err {
            maxminddb::MaxMindDBError::AddressNotFoundError(_) => GeoDbError::RecordNotFound,
            other => GeoDbError::Mmdb(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(GeoDbError::DatabaseInvalid.to_string(), "database invalid");
        assert_eq!(GeoDbError::RecordNotFound.to_string(), "record not found");
        assert_eq!(
            GeoDbError::UnsupportedIPVersion.to_string(),
            "requested IP version not supported by database"
        );
    }

    #[test]
    fn test_from_io_error() {
        let err: GeoDbError = io::Error::new(io::ErrorKind::UnexpectedEof, "short read").into();
        assert!(matches!(err, GeoDbError::Io(_)));
        assert!(err.to_string().contains("short read"));
    }
}
