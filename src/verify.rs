//! Verification of a database against an expected record set
//!
//! The verifier walks every record of a tree, looks the record's address up
//! in the reader under test and compares the results. Country codes compare
//! under an equivalence table seeded with the historical aliases, so a
//! database answering `XK` verifies against an expected `RS`. All mismatches
//! are collected; verification never stops at the first failure.

use crate::dat::country_codes::{ISO2_ALIASES, ISO3_ALIASES};
use crate::error::GeoDbError;
use crate::format::Reader;
use crate::record::Record;
use crate::tree::RecordTree;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::RwLock;

static EQUIVALENT_COUNTRY_CODES: Lazy<RwLock<HashMap<String, String>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (a, b) in ISO2_ALIASES.iter().chain(ISO3_ALIASES.iter()).copied() {
        map.insert(a.to_string(), b.to_string());
    }
    RwLock::new(map)
});

/// Register a pair of country codes treated as equal during verification
pub fn register_equivalent_country_code(a: &str, b: &str) {
    let mut map = EQUIVALENT_COUNTRY_CODES
        .write()
        .expect("equivalence table lock poisoned");
    map.insert(a.to_string(), b.to_string());
}

/// Check two country codes for equality under the equivalence table.
///
/// The table is consulted in both directions, so the relation is symmetric
/// regardless of which side an alias was registered on.
pub fn are_country_codes_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    let map = EQUIVALENT_COUNTRY_CODES
        .read()
        .expect("equivalence table lock poisoned");
    map.get(a).map(String::as_str) == Some(b) || map.get(b).map(String::as_str) == Some(a)
}

/// Check two records for equality under the type-specific rules
pub fn records_equal(a: &Record, b: &Record) -> bool {
    match (a, b) {
        (
            Record::Country {
                country_code: code_a,
                ..
            },
            Record::Country {
                country_code: code_b,
                ..
            },
        ) => are_country_codes_equal(code_a, code_b),
        (
            Record::City {
                country_code: code_a,
                city_name: city_a,
                ..
            },
            Record::City {
                country_code: code_b,
                city_name: city_b,
                ..
            },
        ) => are_country_codes_equal(code_a, code_b) && city_a == city_b,
        _ => false,
    }
}

/// One verification failure
#[derive(Debug)]
pub struct VerificationError {
    /// The record the database was expected to return
    pub expected: Record,
    /// The record actually returned, when the lookup succeeded
    pub found: Option<Record>,
    /// The lookup failure, when it did not
    pub lookup_error: Option<GeoDbError>,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lookup_error, &self.found) {
            (Some(err), _) => write!(f, "expected record {}, received error {}", self.expected, err),
            (None, Some(found)) => {
                write!(f, "expected record {}, received record {}", self.expected, found)
            }
            (None, None) => write!(f, "expected record {}, received nothing", self.expected),
        }
    }
}

/// Aggregate verification failure preserving per-record order
#[derive(Debug)]
pub struct VerificationFailure {
    /// The collected per-record failures
    pub errors: Vec<VerificationError>,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "verification failed with {} errors", self.errors.len())
    }
}

impl std::error::Error for VerificationFailure {}

/// Status of a verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationProgress {
    /// Total number of records to check
    pub total_records: usize,
    /// Records checked so far
    pub checked_records: usize,
}

/// Verify that `reader` answers every record of `tree`.
///
/// Progress reports are pushed per record plus one terminal report with
/// `checked_records == total_records`; a dropped receiver stops reporting
/// but not verification.
pub fn verify(
    reader: &dyn Reader,
    tree: &RecordTree,
    progress: Option<&Sender<VerificationProgress>>,
) -> std::result::Result<(), VerificationFailure> {
    let expected_records = tree.records();
    let total_records = expected_records.len();

    let mut errors = Vec::new();

    for (checked_records, expected) in expected_records.iter().enumerate() {
        if let Some(progress) = progress {
            let _ = progress.send(VerificationProgress {
                total_records,
                checked_records,
            });
        }

        let network = expected.network();
        if network.ip().is_empty() {
            // records without a network cannot be looked up
            continue;
        }

        let Some(ip) = network.ip_addr() else {
            errors.push(VerificationError {
                expected: (**expected).clone(),
                found: None,
                lookup_error: Some(GeoDbError::MalformedRecord),
            });
            continue;
        };

        match reader.lookup_ip(ip) {
            Err(err) => {
                errors.push(VerificationError {
                    expected: (**expected).clone(),
                    found: None,
                    lookup_error: Some(err),
                });
            }
            Ok(found) => {
                if !records_equal(expected, &found) {
                    errors.push(VerificationError {
                        expected: (**expected).clone(),
                        found: Some(found),
                        lookup_error: None,
                    });
                }
            }
        }
    }

    if let Some(progress) = progress {
        let _ = progress.send(VerificationProgress {
            total_records,
            checked_records: total_records,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(VerificationFailure { errors })
    }
}
