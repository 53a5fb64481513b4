//! Test support: a minimal mmdb assembler
//!
//! Builds just enough of the mmdb wire format to exercise the adapter
//! without binary fixtures: a 24-bit-record search tree, the 16-byte data
//! separator, a data section of country maps and a metadata section.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

const DATA_SEPARATOR_SIZE: u32 = 16;
const METADATA_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Cell {
    Empty,
    Node(u32),
    Data(u32),
}

/// Assembles an IPv4 `GeoLite2-Country` mmdb buffer from `(network, code)`
/// entries
pub struct MmdbBuilder {
    nodes: Vec<[Cell; 2]>,
    data: Vec<u8>,
    data_offsets: BTreeMap<String, u32>,
    database_type: String,
}

impl MmdbBuilder {
    pub fn new() -> Self {
        MmdbBuilder {
            nodes: vec![[Cell::Empty, Cell::Empty]],
            data: Vec::new(),
            data_offsets: BTreeMap::new(),
            database_type: "GeoLite2-Country".to_string(),
        }
    }

    pub fn with_database_type(mut self, database_type: &str) -> Self {
        self.database_type = database_type.to_string();
        self
    }

    /// Insert a v4 network with the given country code
    pub fn add(&mut self, network: &str, iso_code: &str) {
        let (addr, prefix_len) = network
            .split_once('/')
            .expect("network must be addr/prefix");
        let addr: Ipv4Addr = addr.parse().expect("invalid address");
        let prefix_len: u32 = prefix_len.parse().expect("invalid prefix");
        let bits = u32::from(addr);

        let data_offset = self.country_data_offset(iso_code);

        let mut node = 0usize;
        for depth in 0..prefix_len {
            let side = ((bits >> (31 - depth)) & 1) as usize;

            if depth + 1 == prefix_len {
                self.nodes[node][side] = Cell::Data(data_offset);
                return;
            }

            match self.nodes[node][side] {
                Cell::Node(next) => node = next as usize,
                Cell::Empty => {
                    let next = self.nodes.len() as u32;
                    self.nodes.push([Cell::Empty, Cell::Empty]);
                    self.nodes[node][side] = Cell::Node(next);
                    node = next as usize;
                }
                Cell::Data(_) => panic!("conflicting insert below an existing record"),
            }
        }
    }

    fn country_data_offset(&mut self, iso_code: &str) -> u32 {
        if let Some(&offset) = self.data_offsets.get(iso_code) {
            return offset;
        }

        let offset = self.data.len() as u32;
        // {"country": {"iso_code": <code>}}
        self.data.push(0xe0 | 1);
        encode_string(&mut self.data, "country");
        self.data.push(0xe0 | 1);
        encode_string(&mut self.data, "iso_code");
        encode_string(&mut self.data, iso_code);

        self.data_offsets.insert(iso_code.to_string(), offset);
        offset
    }

    /// Serialise the database
    pub fn build(&self) -> Vec<u8> {
        let node_count = self.nodes.len() as u32;

        let mut out = Vec::new();
        for node in &self.nodes {
            for cell in node {
                let value = match cell {
                    Cell::Empty => node_count,
                    Cell::Node(index) => *index,
                    Cell::Data(offset) => node_count + DATA_SEPARATOR_SIZE + offset,
                };
                out.extend_from_slice(&value.to_be_bytes()[1..]);
            }
        }

        out.extend_from_slice(&[0u8; DATA_SEPARATOR_SIZE as usize]);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(METADATA_MARKER);
        out.extend_from_slice(&self.metadata(node_count));
        out
    }

    fn metadata(&self, node_count: u32) -> Vec<u8> {
        let mut meta = Vec::new();
        meta.push(0xe0 | 9); // map, 9 entries

        encode_string(&mut meta, "binary_format_major_version");
        encode_uint16(&mut meta, 2);

        encode_string(&mut meta, "binary_format_minor_version");
        encode_uint16(&mut meta, 0);

        encode_string(&mut meta, "build_epoch");
        // 2019-03-09T01:20:48Z; chosen free of zero bytes
        meta.extend_from_slice(&[0x04, 0x02, 0x5c, 0x83, 0x14, 0xf0]);

        encode_string(&mut meta, "database_type");
        encode_string(&mut meta, &self.database_type);

        encode_string(&mut meta, "description");
        meta.push(0xe0 | 1);
        encode_string(&mut meta, "en");
        // long enough that a converted dat database clears its minimum size
        encode_string(&mut meta, "Test mmdb database fixture for conversion coverage");

        encode_string(&mut meta, "ip_version");
        encode_uint16(&mut meta, 4);

        encode_string(&mut meta, "languages");
        meta.extend_from_slice(&[0x01, 0x04]); // array, 1 entry
        encode_string(&mut meta, "en");

        encode_string(&mut meta, "node_count");
        encode_uint32(&mut meta, node_count);

        encode_string(&mut meta, "record_size");
        encode_uint16(&mut meta, 24);

        meta
    }
}

fn encode_string(out: &mut Vec<u8>, s: &str) {
    if s.len() < 29 {
        out.push(0x40 | s.len() as u8);
    } else {
        assert!(s.len() < 29 + 256, "single extended-size byte only");
        out.push(0x40 | 29);
        out.push((s.len() - 29) as u8);
    }
    out.extend_from_slice(s.as_bytes());
}

fn encode_uint16(out: &mut Vec<u8>, value: u16) {
    let bytes = value.to_be_bytes();
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
    out.push(0xa0 | significant.len() as u8);
    out.extend_from_slice(&significant);
}

fn encode_uint32(out: &mut Vec<u8>, value: u32) {
    let bytes = value.to_be_bytes();
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
    out.push(0xc0 | significant.len() as u8);
    out.extend_from_slice(&significant);
}
