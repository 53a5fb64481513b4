//! The country edition of the dat format
//!
//! Country editions store 3-byte cells; terminal cells hold the ISO-2
//! country index offset by `COUNTRY_BEGIN`, with offset 0 reserved for the
//! "unknown country" sentinel.

use super::codec::encode_record;
use super::country_codes;
use super::types::{DatabaseTypeId, DatType};
use super::writer::DatWriter;
use super::COUNTRY_BEGIN;
use crate::error::{GeoDbError, Result};
use crate::format::Writer;
use crate::metadata::{DatabaseType, IpVersion};
use crate::record::{Network, Record};
use crate::source::ReaderSource;
use crate::tree::RecordTree;
use std::io;
use std::sync::Arc;

/// Country edition dispatch
pub struct CountryType;

impl DatType for CountryType {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Country
    }

    fn ip_version(&self, type_id: DatabaseTypeId) -> IpVersion {
        match type_id {
            DatabaseTypeId::COUNTRY => IpVersion::V4,
            DatabaseTypeId::COUNTRY_V6 => IpVersion::V6,
            _ => IpVersion::Undefined,
        }
    }

    fn record_length(&self, _type_id: DatabaseTypeId) -> u32 {
        3
    }

    fn segment_offset(
        &self,
        _source: &dyn ReaderSource,
        _type_id: DatabaseTypeId,
        _structure_info_offset: i64,
    ) -> u32 {
        // country editions use a fixed segment offset; city editions would
        // read theirs from just before the structure trailer
        COUNTRY_BEGIN
    }

    fn new_record(
        &self,
        _source: &dyn ReaderSource,
        matching_network: Network,
        value: u32,
    ) -> Result<Record> {
        let country_code = country_codes::iso2_code(value as usize)?;

        Ok(Record::Country {
            network: matching_network,
            country_code: country_code.to_string(),
        })
    }

    fn encode_tree_node<'a>(
        &self,
        position: &mut u32,
        node: &'a RecordTree,
    ) -> Result<(Vec<u8>, Vec<&'a RecordTree>)> {
        let mut pair = Vec::with_capacity(6);
        let mut additional_nodes = Vec::new();

        for child in [node.left(), node.right()] {
            let value = match child {
                None => COUNTRY_BEGIN,
                Some(child) => match child.leaf() {
                    Some(Record::Country { country_code, .. }) => {
                        let index = country_codes::iso2_index(country_code)?;
                        COUNTRY_BEGIN + index as u32
                    }
                    Some(_) => return Err(GeoDbError::UnsupportedRecordType),
                    None => {
                        *position += 1;
                        additional_nodes.push(child);
                        *position
                    }
                },
            };

            pair.extend_from_slice(&encode_record(value, 3));
        }

        Ok((pair, additional_nodes))
    }

    fn new_writer(
        &self,
        sink: Box<dyn io::Write + Send>,
        ip_version: IpVersion,
    ) -> Result<Box<dyn Writer>> {
        let type_id = match ip_version {
            IpVersion::V4 => DatabaseTypeId::COUNTRY,
            IpVersion::V6 => DatabaseTypeId::COUNTRY_V6,
            IpVersion::Undefined => return Err(GeoDbError::UnsupportedDatabaseType),
        };

        Ok(Box::new(DatWriter::new(
            sink,
            Arc::new(CountryType),
            type_id,
        )))
    }
}
