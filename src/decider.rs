pub mod cost_function;
pub mod decider_data_lba;
pub mod decider_engine;
pub mod decider_result;
pub mod decider_result_worker;
pub mod decider_translated_cycler;
pub mod record;

use std::time::Duration;

use crate::{
    config::Config,
    decider::{
        decider_result::{BatchData, DeciderResultStats, EndReason, ResultUnitEndReason},
        decider_result_worker::FnResultWorker,
        decider_translated_cycler::DeciderTranslatedCycler,
    },
    machine_binary::MachineBinary,
    status::MachineStatus,
};

pub const DECIDER_TRANSLATED_CYCLER_ID: DeciderId = DeciderId {
    id: 30,
    name: "Decider Translated Cycler",
    sub_dir: "translated_cycler",
};

/// Decides all machines of a batch and stores the outcome in the batch data.
pub type FnDeciderRunBatch = fn(&mut BatchData) -> ResultUnitEndReason;

/// Deciders shipped with this crate.
pub enum DeciderStandard {
    TranslatedCycler,
}

impl DeciderStandard {
    pub fn decider_config<'a>(&self, config: &'a Config) -> DeciderConfig<'a> {
        match self {
            DeciderStandard::TranslatedCycler => DeciderConfig::new(
                &DECIDER_TRANSLATED_CYCLER_ID,
                DeciderTranslatedCycler::decider_run_batch,
                config,
            ),
        }
    }
}

/// What the engine runs per batch: the decider, an optional worker on its results and the run config.
#[derive(Debug, Clone, Copy)]
pub struct DeciderConfig<'a> {
    decider_id: &'a DeciderId,
    f_decider_run_batch: FnDeciderRunBatch,
    fo_result_worker: Option<FnResultWorker>,
    config: &'a Config,
}

impl<'a> DeciderConfig<'a> {
    pub fn new(decider_id: &'a DeciderId, f_decider: FnDeciderRunBatch, config: &'a Config) -> Self {
        Self {
            decider_id,
            f_decider_run_batch: f_decider,
            fo_result_worker: None,
            config,
        }
    }

    /// Runs the worker after each batch, e.g. [decider_result_worker::save_translated_cycler_ids].
    pub fn with_result_worker(mut self, f_result_worker: FnResultWorker) -> Self {
        self.fo_result_worker = Some(f_result_worker);
        self
    }

    pub fn f_decider(&self) -> FnDeciderRunBatch {
        self.f_decider_run_batch
    }

    pub fn fo_result_worker(&self) -> Option<FnResultWorker> {
        self.fo_result_worker
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn decider_id(&self) -> &'a DeciderId {
        self.decider_id
    }
}

/// Name and result directory of a decider. The engine only gets the batch function,
/// so the id travels separately in the [DeciderConfig].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeciderId {
    pub id: usize,
    pub name: &'static str,
    /// Sub directory for result files of this decider.
    pub sub_dir: &'static str,
}

pub trait Decider {
    fn decider_id() -> &'static DeciderId;

    /// Decides one machine. The decider is reused within a batch and resets its state here.
    fn decide_machine(&mut self, machine: &MachineBinary) -> MachineStatus;

    /// Creates a decider for this config and decides one machine.
    fn decide_single_machine(machine: &MachineBinary, config: &Config) -> MachineStatus;

    fn decider_run_batch(batch_data: &mut BatchData) -> ResultUnitEndReason;
}

/// Runs the decider on all machines of the batch and records the results in the batch data. \
/// All machines of the batch are kept with their status for the result worker.
#[inline]
pub fn decider_generic_run_batch(
    decider: &mut impl Decider,
    batch_data: &mut BatchData,
) -> ResultUnitEndReason {
    if batch_data.machines.is_empty() {
        return Err(EndReason::NoBatchData);
    }

    for machine in batch_data.machines.iter() {
        let status = decider.decide_machine(machine.machine());
        match status {
            MachineStatus::Undecided(_, _, _) => batch_data.machines_undecided.push(*machine, status),
            _ => batch_data.machines_decided.push(*machine, status),
        }
        if !batch_data.result_decided.add(machine, &status) {
            // record limit reached, end_reason is set in the result
            break;
        }
    }

    Ok(())
}

/// Result of one batch decided in a worker thread.
pub struct ThreadResultDecider {
    pub batch_no: usize,
    pub result: DeciderResultStats,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine_binary::{MachineId, NotableMachineBinary};

    #[test]
    fn run_batch_records_results() {
        let config = Config::builder(3)
            .tape_length(6)
            .limit_machines_decided(10)
            .step_limit(10)
            .build();
        let machines = vec![
            NotableMachineBinary::TranslatedPeriod3.machine_id(),
            MachineId::try_from("1RZ---").unwrap(),
            // needs 3 * 6 - 2 = 16 steps
            NotableMachineBinary::TranslatedPeriod3.machine_id(),
        ];
        let decider_config = DeciderStandard::TranslatedCycler.decider_config(&config);
        let config_short = Config::builder(3).tape_length(2).limit_machines_decided(10).build();
        let mut batch_data = BatchData::new(
            &machines[0..2],
            0,
            1,
            decider_config.decider_id(),
            &config_short,
        );
        assert_eq!(Ok(()), (decider_config.f_decider())(&mut batch_data));
        assert_eq!(2, batch_data.result_decided.num_evaluated());
        assert_eq!(1, batch_data.result_decided.num_translated_cycler());
        assert_eq!(1, batch_data.result_decided.num_not_cycler());
        assert_eq!(2, batch_data.machines_decided.machines.len());

        let mut batch_data = BatchData::new(&machines, 0, 1, decider_config.decider_id(), &config);
        assert_eq!(Ok(()), DeciderTranslatedCycler::decider_run_batch(&mut batch_data));
        assert_eq!(2, batch_data.machines_undecided.machines.len());
        assert_eq!(2, batch_data.result_decided.num_undecided());
    }

    #[test]
    fn empty_batch() {
        let config = Config::new_default(3);
        let mut batch_data = BatchData::new(&[], 0, 1, &DECIDER_TRANSLATED_CYCLER_ID, &config);
        assert_eq!(
            Err(EndReason::NoBatchData),
            DeciderTranslatedCycler::decider_run_batch(&mut batch_data)
        );
    }
}
