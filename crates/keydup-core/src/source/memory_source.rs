use super::{RecordSource, SourceError};
use crate::types::Record;

/// Records already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }
}

impl RecordSource for MemorySource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn scan(&mut self, sink: &mut dyn FnMut(Record)) -> Result<u64, SourceError> {
        for record in &self.records {
            sink(record.clone());
        }
        Ok(self.records.len() as u64)
    }
}
