//! Sources of machines for the decider engine. A source hands out the machines in batches, the engine
//! decides each batch on its own (possibly in a worker thread).
pub mod bb_file_reader;
pub mod machine_list;

use std::fmt::Display;

use crate::{config::IdBig, decider::decider_result::EndReason, machine_binary::MachineId};

pub type ResultDataProvider = Result<DataProviderBatch, Box<DataProviderError>>;

pub trait DataProvider {
    fn name(&self) -> &'static str;

    /// Next machines in order. The batch holding the last machine is marked with [EndReason::IsLastBatch].
    fn machine_batch_next(&mut self) -> ResultDataProvider;

    fn num_batches(&self) -> usize;

    /// Machines which will be returned over all batches.
    fn num_machines_to_process(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct DataProviderBatch {
    /// Counted from 0.
    pub batch_no: usize,
    pub machines: Vec<MachineId>,
    /// [EndReason::None] while more batches follow.
    pub end_reason: EndReason,
}

impl DataProviderBatch {
    pub fn new(batch_no: usize) -> Self {
        Self {
            batch_no,
            ..Default::default()
        }
    }
}

pub(crate) fn num_batches_for(num_machines: u64, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    num_machines.div_ceil(batch_size as u64) as usize
}

/// A machine source failed, e.g. the database could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataProviderError {
    pub source_name: &'static str,
    /// Id of the first machine which could not be provided.
    pub machine_id: Option<IdBig>,
    pub msg: String,
}

impl DataProviderError {
    pub fn new(source_name: &'static str, msg: impl Into<String>) -> Self {
        Self {
            source_name,
            machine_id: None,
            msg: msg.into(),
        }
    }

    pub fn with_machine_id(mut self, machine_id: IdBig) -> Self {
        self.machine_id = Some(machine_id);
        self
    }
}

impl std::error::Error for DataProviderError {}

impl Display for DataProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source_name)?;
        if let Some(id) = self.machine_id {
            write!(f, " (machine id {id})")?;
        }
        write!(f, ": {}", self.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_rounded_up() {
        assert_eq!(0, num_batches_for(0, 10));
        assert_eq!(1, num_batches_for(10, 10));
        assert_eq!(2, num_batches_for(11, 10));
        assert_eq!(0, num_batches_for(11, 0));
    }

    #[test]
    fn error_names_source_and_id() {
        let e = DataProviderError::new("Machine Database", "Not enough bytes").with_machine_id(17);
        assert_eq!("Machine Database (machine id 17): Not enough bytes", e.to_string());
        assert_eq!(
            "Machine List: empty",
            DataProviderError::new("Machine List", "empty").to_string()
        );
    }
}
