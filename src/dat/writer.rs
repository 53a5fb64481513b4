//! Sequential dat database writer
//!
//! Emits the trie as record pairs in breadth-first order, then the metadata
//! separator, the description record and the structure trailer. The writer
//! owns nothing but its byte sink and never seeks.

use super::types::{DatabaseTypeId, DatType};
use crate::error::Result;
use crate::format::Writer;
use crate::metadata::Metadata;
use crate::tree::RecordTree;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// Writer emitting one dat database to a byte sink
pub struct DatWriter {
    sink: Box<dyn io::Write + Send>,
    dat_type: Arc<dyn DatType>,
    type_id: DatabaseTypeId,
}

impl DatWriter {
    /// Create a writer for the given edition
    pub fn new(
        sink: Box<dyn io::Write + Send>,
        dat_type: Arc<dyn DatType>,
        type_id: DatabaseTypeId,
    ) -> Self {
        DatWriter {
            sink,
            dat_type,
            type_id,
        }
    }
}

impl Writer for DatWriter {
    fn write_database(&mut self, meta: &Metadata, tree: &RecordTree) -> Result<()> {
        let mut nodes: VecDeque<&RecordTree> = VecDeque::new();
        nodes.push_back(tree);

        // position counts emitted non-leaf children; appending their nodes
        // in FIFO order makes the on-disk offsets match the indices written
        let mut position = 0u32;

        while let Some(node) = nodes.pop_front() {
            let (pair, additional_nodes) = self.dat_type.encode_tree_node(&mut position, node)?;
            self.sink.write_all(&pair)?;
            nodes.extend(additional_nodes);
        }

        self.sink.write_all(&[0x00, 0x00, 0x00])?;

        let description = format!(
            "GEO-{} {} {}",
            self.type_id,
            meta.build_time.format("%Y%m%d"),
            meta.description,
        );
        self.sink.write_all(description.as_bytes())?;

        self.sink
            .write_all(&[0xff, 0xff, 0xff, self.type_id.0])?;

        Ok(())
    }
}
