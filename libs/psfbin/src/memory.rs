//! An in-memory implementation of the sink contract.

use indexmap::IndexMap;

use crate::ast::{LogicalType, Properties, PsfString, Value};
use crate::error::Result;
use crate::sink::{TypedSink, Values};

/// One dataset captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDataset {
    pub ty: LogicalType,
    /// The length declared at creation time.
    pub len: u32,
    pub values: Values,
    pub properties: Properties,
}

/// Collects every dataset in memory, in creation order.
///
/// Used by the decoder tests and the CLI summary mode; also the reference
/// implementation of the sink contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub datasets: IndexMap<PsfString, MemoryDataset>,
    finished: bool,
}

/// Handle into a [`MemorySink`] dataset.
#[derive(Debug)]
pub struct MemoryHandle {
    index: usize,
    written: u32,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self, name: &str) -> Option<&MemoryDataset> {
        self.datasets.get(name.as_bytes())
    }

    /// The decoded values of a named dataset.
    pub fn values(&self, name: &str) -> Option<&Values> {
        self.dataset(name).map(|d| &d.values)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl TypedSink for MemorySink {
    type Handle = MemoryHandle;

    fn create_dataset(
        &mut self,
        name: &PsfString,
        ty: &LogicalType,
        len: u32,
    ) -> Result<MemoryHandle> {
        let dataset = MemoryDataset {
            ty: ty.clone(),
            len,
            values: Values::new(ty),
            properties: Properties::new(),
        };
        let (index, _) = self.datasets.insert_full(name.clone(), dataset);
        Ok(MemoryHandle { index, written: 0 })
    }

    fn write_slab(
        &mut self,
        handle: &mut MemoryHandle,
        start: u32,
        count: u32,
        bytes: &[u8],
    ) -> Result<()> {
        debug_assert_eq!(start, handle.written, "slab offsets must be contiguous");
        let (_, dataset) = self
            .datasets
            .get_index_mut(handle.index)
            .expect("valid dataset handle");
        dataset.values.extend_from_disk(bytes, count)?;
        handle.written += count;
        Ok(())
    }

    fn attach_property(
        &mut self,
        handle: &mut MemoryHandle,
        name: &PsfString,
        value: &Value,
    ) -> Result<()> {
        let (_, dataset) = self
            .datasets
            .get_index_mut(handle.index)
            .expect("valid dataset handle");
        dataset.properties.insert(name.clone(), value.clone());
        Ok(())
    }

    fn close_dataset(&mut self, _handle: MemoryHandle) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
