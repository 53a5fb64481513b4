//! Cross-format conversion driver
//!
//! Glues the pieces together: open (or detect) the input format, materialise
//! the record tree, write the output format into an in-memory buffer,
//! optionally verify the buffer against the tree, then hand the bytes to the
//! sink. The output only reaches the sink after verification passes.

use crate::error::GeoDbError;
use crate::format::{detect_format, lookup_format};
use crate::metadata::{IpVersion, Metadata};
use crate::source::{ReaderSource, SliceSource};
use crate::verify::{verify, VerificationFailure, VerificationProgress};
use std::fmt;
use std::io;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Conversion parameters
pub struct ConvertOptions<'a> {
    /// Input format name; `None` auto-detects
    pub input_format: Option<&'a str>,
    /// Output format name
    pub output_format: &'a str,
    /// IP version of the tree to convert
    pub ip_version: IpVersion,
    /// Verify the written database against the source tree
    pub verify: bool,
}

/// What a conversion produced
#[derive(Debug)]
pub struct ConvertSummary {
    /// Resolved input format name
    pub input_format: String,
    /// Number of records converted
    pub record_count: usize,
    /// Metadata of the input database
    pub metadata: Metadata,
    /// Time spent materialising the record tree
    pub tree_elapsed: Duration,
    /// Time spent encoding the output database
    pub convert_elapsed: Duration,
}

/// Conversion failure: either a database error or an aggregate verification
/// failure
#[derive(Debug)]
pub enum ConvertError {
    /// Reading or writing failed
    Database(GeoDbError),
    /// The written database does not answer the source records
    Verification(VerificationFailure),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Database(err) => err.fmt(f),
            ConvertError::Verification(failure) => failure.fmt(f),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<GeoDbError> for ConvertError {
    fn from(err: GeoDbError) -> Self {
        ConvertError::Database(err)
    }
}

/// Byte sink collecting writer output so it can be retrieved afterwards
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn into_bytes(self) -> Vec<u8> {
        let buffer = self.0.lock().expect("conversion buffer lock poisoned");
        buffer.clone()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("conversion buffer lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Convert a database and write the result to `sink`
pub fn convert(
    source: Arc<dyn ReaderSource>,
    options: &ConvertOptions<'_>,
    progress: Option<&Sender<VerificationProgress>>,
    sink: &mut dyn io::Write,
) -> std::result::Result<ConvertSummary, ConvertError> {
    let output_format = lookup_format(options.output_format)?;

    let input_format = match options.input_format {
        Some(name) => lookup_format(name)?,
        None => detect_format(&source)?,
    };

    let (reader, metadata) = input_format.open_reader(Arc::clone(&source))?;

    log::info!(
        "converting {} database from {} to {}",
        metadata.database_type,
        input_format.name(),
        output_format.name(),
    );

    let tree_start = Instant::now();
    let tree = reader.record_tree(options.ip_version)?;
    let tree_elapsed = tree_start.elapsed();
    let record_count = tree.records().len();

    let buffer = SharedBuffer::default();
    let mut writer = output_format.open_writer(
        Box::new(buffer.clone()),
        metadata.database_type,
        options.ip_version,
    )?;
    let convert_start = Instant::now();
    writer.write_database(&metadata, &tree)?;
    drop(writer);
    let convert_elapsed = convert_start.elapsed();

    let bytes = buffer.into_bytes();

    if options.verify {
        let verify_source: Arc<dyn ReaderSource> = Arc::new(SliceSource::new(bytes.clone()));
        let (verify_reader, _) = output_format.open_reader(verify_source)?;
        verify(&*verify_reader, &tree, progress).map_err(ConvertError::Verification)?;
    }

    sink.write_all(&bytes).map_err(GeoDbError::from)?;

    Ok(ConvertSummary {
        input_format: input_format.name().to_string(),
        record_count,
        metadata,
        tree_elapsed,
        convert_elapsed,
    })
}
