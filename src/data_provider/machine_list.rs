//! Data provider for a list of machines held in memory, e.g. parsed from Standard TM Text Format.

use crate::{
    data_provider::{num_batches_for, DataProvider, DataProviderBatch, ResultDataProvider},
    decider::decider_result::EndReason,
    machine_binary::{MachineBinary, MachineError, MachineId},
};

#[derive(Debug)]
pub struct MachineList {
    machines: Vec<MachineId>,
    batch_size: usize,
    batch_no: usize,
    next: usize,
}

impl MachineList {
    pub fn new(machines: Vec<MachineId>, batch_size: usize) -> Self {
        Self {
            machines,
            batch_size: batch_size.max(1),
            batch_no: 0,
            next: 0,
        }
    }

    /// Parses the machines, the id is the index in the list.
    pub fn try_from_tm_text_format(
        tm_texts: &[&str],
        batch_size: usize,
    ) -> Result<Self, MachineError> {
        let machines = tm_texts
            .iter()
            .enumerate()
            .map(|(i, tm)| {
                MachineBinary::try_from_standard_tm_text_format(tm)
                    .map(|m| MachineId::new(i as u64, m))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(machines, batch_size))
    }

    pub fn machines(&self) -> &[MachineId] {
        &self.machines
    }
}

impl DataProvider for MachineList {
    fn name(&self) -> &'static str {
        "Machine List"
    }

    fn machine_batch_next(&mut self) -> ResultDataProvider {
        let mut batch = DataProviderBatch::new(self.batch_no);
        let end = (self.next + self.batch_size).min(self.machines.len());
        batch.machines = self.machines[self.next..end].to_vec();
        if end == self.machines.len() {
            batch.end_reason = EndReason::IsLastBatch;
        }
        self.next = end;
        self.batch_no += 1;

        Ok(batch)
    }

    fn num_batches(&self) -> usize {
        num_batches_for(self.machines.len() as u64, self.batch_size)
    }

    fn num_machines_to_process(&self) -> u64 {
        self.machines.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_of_list() {
        let mut list =
            MachineList::try_from_tm_text_format(&["1RB---_1RA---", "1RZ---", "1RB---_0LC---_---1RA"], 2)
                .unwrap();
        assert_eq!(2, list.num_batches());
        let batch = list.machine_batch_next().unwrap();
        assert_eq!(2, batch.machines.len());
        assert_eq!(EndReason::None, batch.end_reason);
        let batch = list.machine_batch_next().unwrap();
        assert_eq!(2, batch.machines[0].id());
        assert_eq!(EndReason::IsLastBatch, batch.end_reason);
    }

    #[test]
    fn invalid_machine() {
        assert!(MachineList::try_from_tm_text_format(&["1RB---_1XA---"], 2).is_err());
    }
}
