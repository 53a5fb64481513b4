//! Tests for the mmdb adapter and mmdb-to-dat conversion, driven by a
//! hand-assembled minimal mmdb buffer

mod common;

use common::MmdbBuilder;
use geotrie::convert::{convert, ConvertOptions};
use geotrie::error::GeoDbError;
use geotrie::format::{detect_format, lookup_format};
use geotrie::metadata::{DatabaseType, IpVersion};
use geotrie::source::{ReaderSource, SliceSource};
use std::sync::Arc;

fn sample_mmdb() -> Vec<u8> {
    let mut builder = MmdbBuilder::new();
    builder.add("1.0.0.0/8", "US");
    builder.add("2.0.0.0/8", "DE");
    builder.add("192.168.0.0/16", "AT");
    builder.build()
}

fn as_source(bytes: Vec<u8>) -> Arc<dyn ReaderSource> {
    Arc::new(SliceSource::new(bytes))
}

#[test]
fn test_open_mmdb_metadata() {
    let format = lookup_format("mmdb").unwrap();
    let (_, meta) = format.open_reader(as_source(sample_mmdb())).unwrap();

    assert_eq!(meta.database_type, DatabaseType::Country);
    assert_eq!(
        meta.description,
        "Test mmdb database fixture for conversion coverage"
    );
    assert_eq!(meta.ip_version, IpVersion::V4);
    assert_eq!(meta.major_format_version, 2);
    assert_eq!(meta.minor_format_version, 0);
}

#[test]
fn test_mmdb_lookup() {
    let format = lookup_format("mmdb").unwrap();
    let (reader, _) = format.open_reader(as_source(sample_mmdb())).unwrap();

    let record = reader.lookup_ip("1.2.3.4".parse().unwrap()).unwrap();
    assert_eq!(record.country_code(), "US");
    // the adapter reports the queried address as a host-width network
    assert_eq!(record.network().to_string(), "1.2.3.4/32");

    let record = reader.lookup_ip("192.168.13.37".parse().unwrap()).unwrap();
    assert_eq!(record.country_code(), "AT");
}

#[test]
fn test_mmdb_lookup_not_found() {
    let format = lookup_format("mmdb").unwrap();
    let (reader, _) = format.open_reader(as_source(sample_mmdb())).unwrap();

    assert_eq!(
        reader.lookup_ip("9.9.9.9".parse().unwrap()).err(),
        Some(GeoDbError::RecordNotFound)
    );
}

#[test]
fn test_mmdb_record_tree() {
    let format = lookup_format("mmdb").unwrap();
    let (reader, _) = format.open_reader(as_source(sample_mmdb())).unwrap();

    let tree = reader.record_tree(IpVersion::V4).unwrap();
    let mut summaries: Vec<String> = tree.records().iter().map(|r| r.to_string()).collect();
    summaries.sort();

    assert_eq!(
        summaries,
        vec![
            "1.0.0.0/8: country code US".to_string(),
            "192.168.0.0/16: country code AT".to_string(),
            "2.0.0.0/8: country code DE".to_string(),
        ]
    );
}

#[test]
fn test_mmdb_v6_tree_of_v4_database_is_unsupported() {
    let format = lookup_format("mmdb").unwrap();
    let (reader, _) = format.open_reader(as_source(sample_mmdb())).unwrap();

    assert_eq!(
        reader.record_tree(IpVersion::V6).err(),
        Some(GeoDbError::UnsupportedIPVersion)
    );
}

#[test]
fn test_city_database_is_read_country_only() {
    let mut builder = MmdbBuilder::new().with_database_type("GeoLite2-City");
    builder.add("1.0.0.0/8", "US");
    let bytes = builder.build();

    let format = lookup_format("mmdb").unwrap();
    let (reader, meta) = format.open_reader(as_source(bytes)).unwrap();
    assert_eq!(meta.database_type, DatabaseType::Country);

    let record = reader.lookup_ip("1.2.3.4".parse().unwrap()).unwrap();
    assert_eq!(record.country_code(), "US");
}

#[test]
fn test_unrecognised_database_type_is_rejected() {
    let mut builder = MmdbBuilder::new().with_database_type("GeoLite2-ASN");
    builder.add("1.0.0.0/8", "US");
    let bytes = builder.build();

    let format = lookup_format("mmdb").unwrap();
    assert_eq!(
        format.open_reader(as_source(bytes)).err(),
        Some(GeoDbError::TypeNotFound)
    );
}

#[test]
fn test_format_detection_is_exclusive() {
    let mmdb_source = as_source(sample_mmdb());

    let detected = detect_format(&mmdb_source).unwrap();
    assert_eq!(detected.name(), "mmdb");

    // the dat detector must not claim an mmdb buffer
    let dat = lookup_format("mmdat").unwrap();
    assert!(!dat.detect(&mmdb_source));

    // nor the mmdb detector a dat buffer
    let mut dat_bytes = vec![0xff, 0xff, 0xff, 0xfd, 0xff, 0xff];
    dat_bytes.extend_from_slice(&[0u8; 100]);
    dat_bytes.extend_from_slice(b"T");
    dat_bytes.extend_from_slice(&[0x00, 0xff, 0xff, 0xff, 106]);
    let dat_source = as_source(dat_bytes);

    let mmdb = lookup_format("mmdb").unwrap();
    assert!(!mmdb.detect(&dat_source));
    assert_eq!(detect_format(&dat_source).unwrap().name(), "mmdat");
}

#[test]
fn test_convert_mmdb_to_dat_with_verification() {
    let source = as_source(sample_mmdb());

    let mut output = Vec::new();
    let summary = convert(
        source,
        &ConvertOptions {
            input_format: None,
            output_format: "mmdat",
            ip_version: IpVersion::V4,
            verify: true,
        },
        None,
        &mut output,
    )
    .unwrap();

    assert_eq!(summary.input_format, "mmdb");
    assert_eq!(summary.record_count, 3);

    // the converted dat database answers the original networks
    let dat = lookup_format("mmdat").unwrap();
    let (reader, meta) = dat.open_reader(as_source(output)).unwrap();
    assert_eq!(meta.ip_version, IpVersion::V4);

    let record = reader.lookup_ip("1.2.3.4".parse().unwrap()).unwrap();
    assert_eq!(record.country_code(), "US");
    let record = reader.lookup_ip("2.3.4.5".parse().unwrap()).unwrap();
    assert_eq!(record.country_code(), "DE");
    let record = reader.lookup_ip("192.168.0.1".parse().unwrap()).unwrap();
    assert_eq!(record.country_code(), "AT");
}
