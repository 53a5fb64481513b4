//! Reader adapter over the `maxminddb` decoder

use crate::bitmap::{belongs_right_v4, belongs_right_v6, BelongsRight};
use crate::error::{GeoDbError, Result};
use crate::format::Reader;
use crate::metadata::IpVersion;
use crate::record::{Network, Record};
use crate::tree::RecordTree;
use ipnetwork::IpNetwork;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

/// Decoded shape of one mmdb data row; only the country ISO code is kept
#[derive(Deserialize)]
struct CountryRow<'a> {
    #[serde(borrow)]
    country: Option<CountryData<'a>>,
}

#[derive(Deserialize)]
struct CountryData<'a> {
    iso_code: Option<&'a str>,
}

impl CountryRow<'_> {
    fn country_code(&self) -> &str {
        self.country
            .as_ref()
            .and_then(|country| country.iso_code)
            .unwrap_or("")
    }
}

/// Reader over an mmdb database
pub struct MmdbReader {
    inner: maxminddb::Reader<Vec<u8>>,
    trees: Mutex<HashMap<u8, Arc<RecordTree>>>,
}

impl MmdbReader {
    /// Wrap a decoded mmdb reader
    pub fn new(inner: maxminddb::Reader<Vec<u8>>) -> Self {
        MmdbReader {
            inner,
            trees: Mutex::new(HashMap::new()),
        }
    }

    fn build_tree(&self, ip_version: IpVersion) -> Result<RecordTree> {
        let (max_depth, belongs_right, root): (u32, BelongsRight, IpNetwork) = match ip_version {
            IpVersion::V4 => {
                let root = IpNetwork::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
                    .map_err(|e| GeoDbError::Mmdb(e.to_string()))?;
                (31, belongs_right_v4, root)
            }
            IpVersion::V6 => {
                if self.inner.metadata.ip_version != 6 {
                    return Err(GeoDbError::UnsupportedIPVersion);
                }
                let root = IpNetwork::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
                    .map_err(|e| GeoDbError::Mmdb(e.to_string()))?;
                (127, belongs_right_v6, root)
            }
            IpVersion::Undefined => return Err(GeoDbError::UnsupportedIPVersion),
        };

        let mut records = Vec::new();
        for item in self.inner.within::<CountryRow>(root)? {
            let item = item?;

            let ip_bytes = match item.ip_net {
                IpNetwork::V4(net) => net.ip().octets().to_vec(),
                IpNetwork::V6(net) => net.ip().octets().to_vec(),
            };

            records.push(Record::Country {
                network: Network::new(ip_bytes, u32::from(item.ip_net.prefix())),
                country_code: item.info.country_code().to_string(),
            });
        }

        log::debug!(
            "enumerated {} records from mmdb database (IP version {})",
            records.len(),
            ip_version,
        );

        RecordTree::new(max_depth, records, belongs_right)
    }
}

impl Reader for MmdbReader {
    fn record_tree(&self, ip_version: IpVersion) -> Result<Arc<RecordTree>> {
        let key = ip_version.as_u8();

        let mut cached = self.trees.lock().expect("record tree lock poisoned");
        if let Some(tree) = cached.get(&key) {
            return Ok(Arc::clone(tree));
        }

        let tree = Arc::new(self.build_tree(ip_version)?);
        cached.insert(key, Arc::clone(&tree));
        Ok(tree)
    }

    fn lookup_ip(&self, ip: IpAddr) -> Result<Record> {
        let row: CountryRow = self.inner.lookup(ip)?;
        let country_code = row.country_code().to_string();

        // the decoder reports no matching prefix, so the record carries the
        // queried address as a host-width network
        let network = match ip {
            IpAddr::V4(v4) => Network::new(v4.octets().to_vec(), 32),
            IpAddr::V6(v6) => Network::new(v6.octets().to_vec(), 128),
        };

        Ok(Record::Country {
            network,
            country_code,
        })
    }
}
