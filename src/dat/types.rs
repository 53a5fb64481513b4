//! Dat database types and the type registry
//!
//! A dat file's trailing type byte selects the edition: record width, IP
//! version, segment offset and record construction all dispatch through the
//! `DatType` trait. The registry is keyed by the 8-bit type ID; country
//! editions are seeded on first access.

use crate::error::{GeoDbError, Result};
use crate::format::Writer;
use crate::metadata::{DatabaseType, IpVersion};
use crate::record::{Network, Record};
use crate::source::ReaderSource;
use crate::tree::RecordTree;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Arc, RwLock};

/// 8-bit identifier of a dat edition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseTypeId(pub u8);

impl DatabaseTypeId {
    /// Base offset added to the type byte of newer databases; older files
    /// store the unshifted value
    pub const BASE: DatabaseTypeId = DatabaseTypeId(105);

    /// IPv4 country edition
    pub const COUNTRY: DatabaseTypeId = DatabaseTypeId(106);

    /// IPv6 country edition
    pub const COUNTRY_V6: DatabaseTypeId = DatabaseTypeId(117);

    /// The ID shifted up by the base offset
    pub fn with_base_offset(self) -> DatabaseTypeId {
        DatabaseTypeId(self.0.wrapping_add(Self::BASE.0))
    }
}

impl fmt::Display for DatabaseTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dat database edition
pub trait DatType: Send + Sync {
    /// The database type this edition carries
    fn database_type(&self) -> DatabaseType;

    /// IP version for the given type ID; `Undefined` when the ID does not
    /// belong to this edition
    fn ip_version(&self, type_id: DatabaseTypeId) -> IpVersion;

    /// Width of a single trie cell in bytes
    fn record_length(&self, type_id: DatabaseTypeId) -> u32;

    /// Threshold separating child pointers from terminal record cells
    fn segment_offset(
        &self,
        source: &dyn ReaderSource,
        type_id: DatabaseTypeId,
        structure_info_offset: i64,
    ) -> u32;

    /// Construct a record from a terminal cell value
    fn new_record(
        &self,
        source: &dyn ReaderSource,
        matching_network: Network,
        value: u32,
    ) -> Result<Record>;

    /// Encode one tree node as a record pair.
    ///
    /// `position` is the running index of emitted non-leaf children; the
    /// returned nodes must be appended to the write queue in order so their
    /// final file offsets match the indices just encoded.
    fn encode_tree_node<'a>(
        &self,
        position: &mut u32,
        node: &'a RecordTree,
    ) -> Result<(Vec<u8>, Vec<&'a RecordTree>)>;

    /// A writer emitting this edition to the given sink
    fn new_writer(
        &self,
        sink: Box<dyn io::Write + Send>,
        ip_version: IpVersion,
    ) -> Result<Box<dyn Writer>>;
}

static TYPE_REGISTRY: Lazy<RwLock<HashMap<u8, Arc<dyn DatType>>>> = Lazy::new(|| {
    let mut types: HashMap<u8, Arc<dyn DatType>> = HashMap::new();
    types.insert(
        DatabaseTypeId::COUNTRY.0,
        Arc::new(super::country::CountryType),
    );
    types.insert(
        DatabaseTypeId::COUNTRY_V6.0,
        Arc::new(super::country::CountryType),
    );
    RwLock::new(types)
});

/// Register a dat edition under a type ID
pub fn register_type(type_id: DatabaseTypeId, dat_type: Arc<dyn DatType>) -> Result<()> {
    let mut registry = TYPE_REGISTRY.write().expect("type registry lock poisoned");
    if registry.contains_key(&type_id.0) {
        return Err(GeoDbError::TypeRegistered);
    }

    registry.insert(type_id.0, dat_type);
    Ok(())
}

/// Retrieve the edition registered for a type ID
pub fn lookup_type_by_id(type_id: DatabaseTypeId) -> Result<Arc<dyn DatType>> {
    let registry = TYPE_REGISTRY.read().expect("type registry lock poisoned");
    registry
        .get(&type_id.0)
        .cloned()
        .ok_or(GeoDbError::TypeNotFound)
}

/// Retrieve the edition serving the given database type
pub fn lookup_type(database_type: DatabaseType) -> Result<Arc<dyn DatType>> {
    let registry = TYPE_REGISTRY.read().expect("type registry lock poisoned");

    let mut ids: Vec<u8> = registry.keys().copied().collect();
    ids.sort_unstable();

    for id in ids {
        let dat_type = &registry[&id];
        if dat_type.database_type() == database_type {
            return Ok(Arc::clone(dat_type));
        }
    }

    Err(GeoDbError::TypeNotFound)
}
