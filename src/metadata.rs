//! Database metadata shared by all formats

use chrono::{DateTime, Utc};
use std::fmt;

/// The kind of data a database maps addresses to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// IP to country mapping
    Country,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::Country => write!(f, "country"),
        }
    }
}

/// IP version served by a database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// Non-IP databases only; rejected by lookup and tree APIs
    Undefined,
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl IpVersion {
    /// Maximum trie depth for this version (31 for v4, 127 for v6)
    pub fn max_depth(self) -> Option<u32> {
        match self {
            IpVersion::V4 => Some(31),
            IpVersion::V6 => Some(127),
            IpVersion::Undefined => None,
        }
    }

    /// Numeric version as stored in database headers
    pub fn as_u8(self) -> u8 {
        match self {
            IpVersion::Undefined => 0,
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Parse a numeric IP version; anything but 4 or 6 is `Undefined`
    pub fn from_u8(v: u8) -> Self {
        match v {
            4 => IpVersion::V4,
            6 => IpVersion::V6,
            _ => IpVersion::Undefined,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A database's descriptive metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Database type
    pub database_type: DatabaseType,
    /// Build time of the database
    pub build_time: DateTime<Utc>,
    /// Human-readable database description
    pub description: String,
    /// Major version number of the on-disk format
    pub major_format_version: u32,
    /// Minor version number of the on-disk format
    pub minor_format_version: u32,
    /// IP version represented by the database
    pub ip_version: IpVersion,
}
