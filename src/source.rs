//! Random-access byte sources backing database readers
//!
//! Readers issue small positional reads (record pairs are 6 bytes for
//! country editions), so sources only need `read_at` and `size`. The file
//! source memory-maps the database; a slice source serves in-memory buffers
//! such as freshly written databases awaiting verification.

use crate::error::{GeoDbError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A random-access byte source
///
/// `read_at` either fills the whole buffer or fails; partial reads are
/// treated as I/O failure. Implementations must support concurrent calls.
/// Resources are released on drop.
pub trait ReaderSource: Send + Sync {
    /// Read exactly `buf.len()` bytes starting at `offset`
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()>;

    /// Total size of the source in bytes
    fn size(&self) -> u64;
}

/// Memory-mapped file source
pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    /// Open and memory-map a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(MmapSource { mmap })
    }
}

impl ReaderSource for MmapSource {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        read_from_slice(&self.mmap[..], buf, offset)
    }

    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// In-memory byte source
pub struct SliceSource {
    data: Vec<u8>,
}

impl SliceSource {
    /// Wrap an owned buffer as a reader source
    pub fn new(data: Vec<u8>) -> Self {
        SliceSource { data }
    }

    /// The underlying bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl ReaderSource for SliceSource {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        read_from_slice(&self.data, buf, offset)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

fn read_from_slice(data: &[u8], buf: &mut [u8], offset: u64) -> Result<()> {
    let start = usize::try_from(offset).map_err(|_| GeoDbError::DatabaseInvalid)?;
    let end = start
        .checked_add(buf.len())
        .ok_or(GeoDbError::DatabaseInvalid)?;
    if end > data.len() {
        return Err(GeoDbError::Io(format!(
            "read of {} bytes at offset {} past end of {}-byte source",
            buf.len(),
            start,
            data.len()
        )));
    }
    buf.copy_from_slice(&data[start..end]);
    Ok(())
}

/// Read the entire source into an owned buffer
pub fn read_all(source: &dyn ReaderSource) -> Result<Vec<u8>> {
    let size = usize::try_from(source.size()).map_err(|_| GeoDbError::DatabaseInvalid)?;
    let mut buf = vec![0u8; size];
    source.read_at(&mut buf, 0)?;
    Ok(buf)
}
