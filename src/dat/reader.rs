//! Dat database reader
//!
//! The trailer is located by scanning backwards from EOF: up to 100 bytes
//! for the `00 00 00` marker that starts the description record and up to 20
//! bytes for the `FF FF FF` marker that precedes the type byte. The trie
//! itself starts at byte offset 0 and is walked most-significant-bit first.

use super::codec::decode_record_u32;
use super::types::{self, DatabaseTypeId, DatType};
use super::{DATABASE_INFO_MAX_SIZE, MAX_RECORD_LENGTH, STRUCTURE_INFO_MAX_SIZE};
use crate::bitmap::{self, belongs_right_v4, belongs_right_v6, BelongsRight};
use crate::error::{GeoDbError, Result};
use crate::format::Reader;
use crate::metadata::{IpVersion, Metadata};
use crate::record::{Network, Record};
use crate::source::ReaderSource;
use crate::tree::RecordTree;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

struct TrailerInfo {
    type_id: DatabaseTypeId,
    description: String,
    build_time: DateTime<Utc>,
    /// Absolute offset of the structure marker's first byte, -1 when absent
    structure_info_offset: i64,
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

fn contains_only_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn is_unprintable(b: u8) -> bool {
    b < 0x20 || b >= 0x7f
}

fn parse_trailer(source: &dyn ReaderSource) -> Result<TrailerInfo> {
    let size = source.size();
    if size < DATABASE_INFO_MAX_SIZE as u64 {
        return Err(GeoDbError::DatabaseInvalid);
    }

    let mut info_window = vec![0u8; DATABASE_INFO_MAX_SIZE];
    source.read_at(&mut info_window, size - DATABASE_INFO_MAX_SIZE as u64)?;

    let info_start =
        find_last(&info_window, &[0x00, 0x00, 0x00]).ok_or(GeoDbError::DatabaseInfoNotFound)?;
    let info_bytes = &info_window[info_start + 3..];

    let info_end = info_bytes
        .iter()
        .position(|&b| is_unprintable(b))
        .unwrap_or(info_bytes.len());
    let description = std::str::from_utf8(&info_bytes[..info_end])
        .map_err(|_| GeoDbError::DatabaseInfoNotFound)?
        .to_string();

    if description.is_empty() {
        return Err(GeoDbError::DatabaseInfoNotFound);
    }

    // an 8-digit token inside the description is the build date
    let build_time = description
        .split(' ')
        .find(|part| part.len() == 8 && contains_only_digits(part))
        .and_then(|part| NaiveDate::parse_from_str(part, "%Y%m%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now);

    let mut struct_window = vec![0u8; STRUCTURE_INFO_MAX_SIZE];
    source.read_at(&mut struct_window, size - STRUCTURE_INFO_MAX_SIZE as u64)?;

    let mut type_id = DatabaseTypeId::COUNTRY;
    let mut structure_info_offset = -1i64;
    if let Some(struct_start) = find_last(&struct_window, &[0xff, 0xff, 0xff]) {
        if struct_start + 3 < struct_window.len() {
            type_id = DatabaseTypeId(struct_window[struct_start + 3]);
            structure_info_offset =
                (size - STRUCTURE_INFO_MAX_SIZE as u64 + struct_start as u64) as i64;
        }
    }

    Ok(TrailerInfo {
        type_id,
        description,
        build_time,
        structure_info_offset,
    })
}

/// Open a dat reader over the given source, parsing the trailer metadata
pub fn new_reader(source: Arc<dyn ReaderSource>) -> Result<(Box<dyn Reader>, Metadata)> {
    let trailer = parse_trailer(&*source)?;

    // older databases store the type byte without the base offset applied
    let mut type_id = trailer.type_id;
    let dat_type = match types::lookup_type_by_id(type_id) {
        Ok(dat_type) => dat_type,
        Err(_) => {
            type_id = type_id.with_base_offset();
            types::lookup_type_by_id(type_id).map_err(|_| GeoDbError::DatabaseTypeNotFound)?
        }
    };

    let ip_version = dat_type.ip_version(type_id);
    if ip_version == IpVersion::Undefined {
        return Err(GeoDbError::UnsupportedIPVersion);
    }

    let record_length = dat_type.record_length(type_id);
    if record_length == 0 || record_length > MAX_RECORD_LENGTH {
        return Err(GeoDbError::DatabaseInvalid);
    }

    let segment_offset = dat_type.segment_offset(&*source, type_id, trailer.structure_info_offset);

    log::debug!(
        "opened dat database: type {}, IP version {}, description {:?}",
        type_id,
        ip_version,
        trailer.description,
    );

    let meta = Metadata {
        database_type: dat_type.database_type(),
        build_time: trailer.build_time,
        description: trailer.description,
        major_format_version: 1,
        minor_format_version: 0,
        ip_version,
    };

    let reader = DatReader {
        source,
        dat_type,
        record_length,
        segment_offset,
        ip_version,
        tree: Mutex::new(None),
    };

    Ok((Box::new(reader), meta))
}

/// Generic trie reader shared by all dat editions
pub struct DatReader {
    source: Arc<dyn ReaderSource>,
    dat_type: Arc<dyn DatType>,
    record_length: u32,
    segment_offset: u32,
    ip_version: IpVersion,
    tree: Mutex<Option<Arc<RecordTree>>>,
}

struct TrieNode {
    depth: u32,
    offset: u64,
    bit_mask: Vec<u8>,
}

impl DatReader {
    fn max_depth(&self) -> u32 {
        match self.ip_version {
            IpVersion::V6 => 127,
            _ => 31,
        }
    }

    fn belongs_right(&self) -> BelongsRight {
        match self.ip_version {
            IpVersion::V6 => belongs_right_v6,
            _ => belongs_right_v4,
        }
    }

    fn normalize_ip(&self, ip: IpAddr) -> Result<Vec<u8>> {
        match self.ip_version {
            IpVersion::V6 => Ok(match ip {
                IpAddr::V4(v4) => v4.to_ipv6_mapped().octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            }),
            _ => match ip {
                IpAddr::V4(v4) => Ok(v4.octets().to_vec()),
                // a non-v4 address cannot match in a v4 tree
                IpAddr::V6(v6) => v6
                    .to_ipv4_mapped()
                    .map(|v4| v4.octets().to_vec())
                    .ok_or(GeoDbError::RecordNotFound),
            },
        }
    }

    /// Walk the trie for the given normalized address, returning the terminal
    /// cell value (segment offset already subtracted) and the matching network
    fn find_record_value(&self, ip: &[u8]) -> Result<(u32, Network)> {
        let max_depth = self.max_depth();
        let belongs_right = self.belongs_right();
        let record_length = self.record_length as usize;
        let pair_length = u64::from(2 * self.record_length);
        let size = self.source.size();

        let mut offset = 0u64;
        let mut cell = vec![0u8; record_length];

        for depth in (0..=max_depth).rev() {
            let cell_offset = if belongs_right(ip, depth)? {
                offset + u64::from(self.record_length)
            } else {
                offset
            };
            self.source.read_at(&mut cell, cell_offset)?;

            let value = decode_record_u32(&cell, record_length)?;

            if value >= self.segment_offset {
                let prefix_len = (max_depth - depth) + 1;
                let mask_bytes = bitmap::cidr_mask(prefix_len, max_depth + 1);
                let masked = bitmap::mask(ip, &mask_bytes)?;
                return Ok((
                    value - self.segment_offset,
                    Network::new(masked, prefix_len),
                ));
            }

            let next_offset = u64::from(value) * pair_length;
            if next_offset + pair_length >= size {
                return Err(GeoDbError::DatabaseInvalid);
            }
            offset = next_offset;
        }

        Err(GeoDbError::RecordNotFound)
    }

    fn build_tree(&self) -> Result<RecordTree> {
        let max_depth = self.max_depth();
        let record_length = self.record_length as usize;
        let pair_length = u64::from(2 * self.record_length);
        let size = self.source.size();

        let mut nodes = VecDeque::new();
        nodes.push_back(TrieNode {
            depth: 0,
            offset: 0,
            bit_mask: vec![0u8; ((max_depth + 1) / 8) as usize],
        });

        let mut records = Vec::new();
        let mut pair = vec![0u8; pair_length as usize];

        while let Some(node) = nodes.pop_front() {
            if node.depth > max_depth {
                return Err(GeoDbError::DatabaseInvalid);
            }

            self.source.read_at(&mut pair, node.offset)?;
            let left = decode_record_u32(&pair, record_length)?;
            let right = decode_record_u32(&pair[record_length..], record_length)?;

            let branch_bit = max_depth - node.depth;

            if left < self.segment_offset {
                let next_offset = u64::from(left) * pair_length;
                if next_offset + pair_length >= size {
                    return Err(GeoDbError::DatabaseInvalid);
                }
                nodes.push_back(TrieNode {
                    depth: node.depth + 1,
                    offset: next_offset,
                    bit_mask: node.bit_mask.clone(),
                });
            } else {
                let network = Network::new(node.bit_mask.clone(), node.depth + 1);
                records.push(self.dat_type.new_record(
                    &*self.source,
                    network,
                    left - self.segment_offset,
                )?);
            }

            if right < self.segment_offset {
                let next_offset = u64::from(right) * pair_length;
                if next_offset + pair_length >= size {
                    return Err(GeoDbError::DatabaseInvalid);
                }
                let mut bit_mask = node.bit_mask.clone();
                bitmap::set(&mut bit_mask, branch_bit);
                nodes.push_back(TrieNode {
                    depth: node.depth + 1,
                    offset: next_offset,
                    bit_mask,
                });
            } else {
                let mut ip = node.bit_mask.clone();
                bitmap::set(&mut ip, branch_bit);
                let network = Network::new(ip, node.depth + 1);
                records.push(self.dat_type.new_record(
                    &*self.source,
                    network,
                    right - self.segment_offset,
                )?);
            }
        }

        log::debug!("materialised {} records from dat trie", records.len());

        RecordTree::new(max_depth, records, self.belongs_right())
    }
}

impl Reader for DatReader {
    fn record_tree(&self, ip_version: IpVersion) -> Result<Arc<RecordTree>> {
        if ip_version != self.ip_version {
            return Err(GeoDbError::UnsupportedIPVersion);
        }

        let mut cached = self.tree.lock().expect("record tree lock poisoned");
        if let Some(tree) = cached.as_ref() {
            return Ok(Arc::clone(tree));
        }

        let tree = Arc::new(self.build_tree()?);
        *cached = Some(Arc::clone(&tree));
        Ok(tree)
    }

    fn lookup_ip(&self, ip: IpAddr) -> Result<Record> {
        let ip_bytes = self.normalize_ip(ip)?;
        let (value, matching_network) = self.find_record_value(&ip_bytes)?;
        self.dat_type
            .new_record(&*self.source, matching_network, value)
    }
}
