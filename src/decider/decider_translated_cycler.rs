//! This is the translated cycler decider for machines on a bounded tape (LBA). \
//! A translated cycler repeats a tape pattern which is shifted along the tape each period, until the head
//! hits the tape end. There it usually bounces and starts another sweep, until the machine halts. \
//! The decider runs the machine until it halts and derives a cost function `coefficient * L + constant`
//! which predicts the steps of the machine for any tape length L.
//!
//! How it works: \
//! When the head reaches a position in a state never reached before in scan direction, a record (tape copy)
//! is taken and stored for the field (state and read symbol). It is compared with the earlier records of that
//! field. If the tape matches shifted by the head distance, a periodic section has been found and its steps
//! per cell go into the coefficient. The section ends when the head bounces at the tape end, where all
//! records are dropped and the search starts again in the other direction.
//!
//! Example: 1RB---_0LC---_---1RA advances one cell every 3 steps, the cost function is 3 * L - 2.

use crate::{
    config::{Config, StepBig},
    decider::{
        self,
        cost_function::CostAccumulator,
        decider_data_lba::{DeciderDataLba, StepResult},
        decider_result::{BatchData, ResultUnitEndReason},
        record::{Record, RecordStore, ScanDirection, Translation},
        Decider, DECIDER_TRANSLATED_CYCLER_ID,
    },
    machine_binary::MachineBinary,
    status::{MachineStatus, NotCyclerReason},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Records are taken and compared.
    #[default]
    SearchingForPeriod,
    /// A periodic section was found, the machine runs until the head bounces at the tape end.
    MovingToEdge,
}

#[derive(Debug)]
pub struct DeciderTranslatedCycler {
    data: DeciderDataLba,
    records: RecordStore,
    cost: CostAccumulator,
    phase: CyclePhase,
    direction: ScanDirection,
    verify_cost_function: bool,
    num_runtime_mismatch: u64,
}

impl DeciderTranslatedCycler {
    pub fn new(config: &Config) -> Self {
        Self {
            data: DeciderDataLba::new(config),
            records: RecordStore::new(),
            cost: CostAccumulator::new(),
            phase: CyclePhase::SearchingForPeriod,
            direction: ScanDirection::Right,
            verify_cost_function: config.verify_cost_function(),
            num_runtime_mismatch: 0,
        }
    }

    #[inline]
    fn clear(&mut self, machine: &MachineBinary) {
        self.data.set_machine(machine);
        self.records.clear();
        self.cost.clear();
        self.phase = CyclePhase::SearchingForPeriod;
        self.direction = ScanDirection::Right;
    }

    /// Number of machines where the cost function did not predict the steps, counted over all runs of this decider.
    pub fn num_runtime_mismatch(&self) -> u64 {
        self.num_runtime_mismatch
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Takes a record if the head is on a new extreme position of the current state and compares it with the
    /// earlier records of the same field, newest first.
    /// # Returns
    /// The translation if the record repeats an earlier one.
    fn capture_record(&mut self) -> Option<Translation> {
        let state = self.data.state();
        let pos = self.data.pos;
        if !self.records.is_new_extreme(state, pos, self.direction) {
            return None;
        }

        let field = self.data.current_field();
        let record = Record::new(&self.data.tape, self.data.step_no, pos);
        let mut found = None;
        for past in self.records.records(field).iter().rev() {
            if !record.is_translation_of(past, self.direction) {
                continue;
            }
            match record.translation_from(past) {
                Ok(translation) => {
                    found = Some(translation);
                    break;
                }
                Err(e) => log::debug!(
                    "{}: candidate at step {} rejected: {e}",
                    self.data.transition_table,
                    record.time
                ),
            }
        }

        #[cfg(feature = "debug_translated_cycler")]
        {
            println!("  {} {record}", MachineBinary::array_id_to_field_name(field));
            if let Some(t) = found {
                println!(
                    "  *** Translation found: past step {}, pos {}, {} steps per cell",
                    t.past_time, t.past_pos, t.steps_per_cell
                );
            }
        }

        self.records.push(field, record);
        self.records.update_extent(state, pos);

        found
    }

    /// Head bounced at the tape end: drop all records, close an open periodic section and turn around.
    fn bounce(&mut self) {
        self.records.clear();
        if self.phase == CyclePhase::MovingToEdge {
            self.cost.close_cycle(self.data.step_no);
            self.phase = CyclePhase::SearchingForPeriod;
        }
        self.direction = self
            .direction
            .after_bounce(self.data.pos, self.data.tape_length());

        #[cfg(feature = "debug_translated_cycler")]
        println!(
            "  Bounce at step {}, pos {}, now moving {}, cost so far {}",
            self.data.step_no,
            self.data.pos,
            self.direction,
            self.cost.cost_function()
        );
    }

    /// Machine halted: close the cost function and check it against the actual steps.
    fn halted(&mut self, machine: &MachineBinary) -> MachineStatus {
        let step_no = self.data.step_no;
        self.cost.finish(step_no);
        let cost_function = self.cost.cost_function();
        if !cost_function.has_cost() {
            return MachineStatus::DecidedNotTranslatedCycler(NotCyclerReason::NoCostFunction);
        }

        let tape_length = self.data.tape_length();
        if cost_function.predict_steps(tape_length) != Some(step_no) {
            self.num_runtime_mismatch += 1;
            log::warn!(
                "{machine}: Runtime mismatch for L = {tape_length}: {cost_function} but halted after {step_no} steps"
            );
        } else if self.verify_cost_function {
            if let Err(mismatch) = cost_function.verify(machine, tape_length) {
                self.num_runtime_mismatch += 1;
                log::warn!("{machine}: {mismatch}");
            }
        }

        MachineStatus::DecidedTranslatedCycler(cost_function, step_no)
    }
}

impl Decider for DeciderTranslatedCycler {
    fn decider_id() -> &'static decider::DeciderId {
        &DECIDER_TRANSLATED_CYCLER_ID
    }

    fn decide_machine(&mut self, machine: &MachineBinary) -> MachineStatus {
        self.clear(machine);
        let tape_length = self.data.tape_length();
        let configuration_bound = Config::configuration_bound(machine.n_states(), tape_length);

        #[cfg(feature = "debug_translated_cycler")]
        println!("\nDecider Translated Cycler for {machine}, L = {tape_length}");

        loop {
            if self.data.step_no > configuration_bound {
                self.data.status =
                    MachineStatus::DecidedNotTranslatedCycler(NotCyclerReason::NeverHalts);
                return self.data.status;
            }
            if let Some(limit) = self.data.step_limit {
                if self.data.step_no > limit {
                    self.data.status = self.data.status_undecided_step_limit();
                    return self.data.status;
                }
            }
            if self.data.pos >= tape_length {
                self.data.status = self.data.status_undecided_bound_exceeded();
                return self.data.status;
            }

            if self.phase == CyclePhase::SearchingForPeriod {
                let found = self.capture_record();
                if !self.records.is_extent_in_bounds(tape_length) {
                    self.data.status = self.data.status_undecided_bound_exceeded();
                    return self.data.status;
                }
                if let Some(translation) = found {
                    self.cost
                        .open_cycle(&translation, self.direction, tape_length);
                    self.phase = CyclePhase::MovingToEdge;
                }
            }

            let step_result = self.data.step();

            #[cfg(feature = "debug_translated_cycler")]
            println!("{}", self.data.step_to_string());

            match step_result {
                StepResult::Moved => {}
                StepResult::Bounced => self.bounce(),
                StepResult::Halted => {
                    self.data.status = self.halted(machine);
                    return self.data.status;
                }
            }
        }
    }

    fn decide_single_machine(machine: &MachineBinary, config: &Config) -> MachineStatus {
        let mut d = Self::new(config);
        d.decide_machine(machine)
    }

    fn decider_run_batch(batch_data: &mut BatchData) -> ResultUnitEndReason {
        let mut decider = Self::new(batch_data.config);
        decider::decider_generic_run_batch(&mut decider, batch_data)
    }
}

/// Decides the machine for the tape length without a step limit.
pub fn decide_translated_cycler(machine: &MachineBinary, tape_length: usize) -> MachineStatus {
    let config = Config::builder(machine.n_states())
        .tape_length(tape_length)
        .build();
    DeciderTranslatedCycler::decide_single_machine(machine, &config)
}

/// Steps the machine needs on this tape length, None if it does not halt within the limit.
pub fn steps_until_halt(machine: &MachineBinary, tape_length: usize, limit: StepBig) -> Option<StepBig> {
    DeciderDataLba::new_with_tape_length(tape_length).run_until_halt(machine, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decider::cost_function::CostFunction, machine_binary::NotableMachineBinary,
        status::UndecidedReason,
    };

    fn decide(tm: &str, tape_length: usize) -> MachineStatus {
        let machine = MachineBinary::try_from(tm).unwrap();
        decide_translated_cycler(&machine, tape_length)
    }

    /// Replays the machine for the predicted steps and checks it halts exactly then.
    fn assert_prediction_replays(tm: &str, tape_length: usize) {
        let machine = MachineBinary::try_from(tm).unwrap();
        let status = decide_translated_cycler(&machine, tape_length);
        let cost_function = status.cost_function().unwrap();
        let predicted = cost_function.predict_steps(tape_length).unwrap();
        assert_eq!(
            Some(predicted),
            steps_until_halt(&machine, tape_length, predicted),
            "{tm} L = {tape_length}: {cost_function}"
        );
        assert_eq!(Ok(predicted), cost_function.verify(&machine, tape_length));
    }

    #[test]
    fn halt_in_first_step_is_not_a_translated_cycler() {
        assert_eq!(
            MachineStatus::DecidedNotTranslatedCycler(NotCyclerReason::NoCostFunction),
            decide("1RZ---", 5)
        );
    }

    #[test]
    fn scan_right_is_translated_cycler() {
        // A0 at step 2 pos 2 repeats A0 at step 0 pos 0
        let tm = NotableMachineBinary::ScanRight.tm_text_format();
        assert_eq!(
            MachineStatus::DecidedTranslatedCycler(CostFunction::new(1, 0), 10),
            decide(tm, 10)
        );
        // on two cells the head bounces before a record repeats
        assert_eq!(
            MachineStatus::DecidedTranslatedCycler(CostFunction::new(0, 2), 2),
            decide(tm, 2)
        );
        for tape_length in [3, 7, 25] {
            assert_eq!(
                Some(CostFunction::new(1, 0)),
                decide(tm, tape_length).cost_function()
            );
        }
    }

    #[test]
    fn period_3_translated_cycler() {
        let tm = NotableMachineBinary::TranslatedPeriod3.tm_text_format();
        assert_eq!(
            MachineStatus::DecidedTranslatedCycler(CostFunction::new(3, -2), 4),
            decide(tm, 2)
        );
        assert_eq!(
            MachineStatus::DecidedTranslatedCycler(CostFunction::new(3, -2), 13),
            decide(tm, 5)
        );
    }

    #[test]
    fn cost_function_invariant_to_tape_length() {
        let tm = NotableMachineBinary::TranslatedPeriod3.tm_text_format();
        let mut last_steps = 0;
        for tape_length in 2..40 {
            let status = decide(tm, tape_length);
            assert_eq!(Some(CostFunction::new(3, -2)), status.cost_function());
            let MachineStatus::DecidedTranslatedCycler(_, steps) = status else {
                panic!("{status}");
            };
            assert!(steps > last_steps);
            last_steps = steps;
            assert_prediction_replays(tm, tape_length);
        }
    }

    #[test]
    fn single_cell_tape() {
        let tm = NotableMachineBinary::TranslatedPeriod3.tm_text_format();
        assert_eq!(
            MachineStatus::DecidedTranslatedCycler(CostFunction::new(0, 1), 1),
            decide(tm, 1)
        );
    }

    #[test]
    fn records_cleared_after_bounce() {
        let machine = NotableMachineBinary::ScanRight.machine();
        let config = Config::builder(2).tape_length(3).build();
        let mut decider = DeciderTranslatedCycler::new(&config);
        decider.clear(&machine);
        // steps 0 and 1 move, step 2 writes at the last cell and bounces
        for _ in 0..3 {
            if decider.phase == CyclePhase::SearchingForPeriod {
                decider.capture_record();
            }
            if decider.data.step() == StepResult::Bounced {
                decider.bounce();
            }
        }
        assert!(decider.records().is_empty());
        assert_eq!(CyclePhase::SearchingForPeriod, decider.phase());
        assert_eq!(ScanDirection::Left, decider.direction);
    }

    #[test]
    fn non_divisible_candidate_falls_back_to_older_record() {
        let config = Config::builder(2).tape_length(10).build();
        let mut decider = DeciderTranslatedCycler::new(&config);
        decider.clear(&NotableMachineBinary::ScanRight.machine());
        let field = decider.data.current_field();
        // blank tape, so every record of the field matches
        decider.records.push(field, Record::new(&decider.data.tape, 1, 0));
        decider.records.push(field, Record::new(&decider.data.tape, 2, 1));
        decider.records.update_extent(decider.data.state(), 1);
        decider.data.step_no = 7;
        decider.data.pos = 3;

        // newest: period 5, distance 2; older: period 6, distance 3
        let translation = decider.capture_record().unwrap();
        assert_eq!(1, translation.past_time);
        assert_eq!(0, translation.past_pos);
        assert_eq!(2, translation.steps_per_cell);
        assert_eq!(3, decider.records().records(field).len());
    }

    #[test]
    fn step_limit_is_undecided() {
        let machine = MachineBinary::try_from("1RB---_1RA---").unwrap();
        let config = Config::builder(2).tape_length(10).step_limit(5).build();
        assert_eq!(
            MachineStatus::Undecided(UndecidedReason::StepLimit, 6, 10),
            DeciderTranslatedCycler::decide_single_machine(&machine, &config)
        );
    }

    #[test]
    fn endless_machine_exceeds_configuration_bound() {
        // bounces between both ends forever
        let machine = MachineBinary::try_from("1RA1LB_0LB0RA").unwrap();
        let config = Config::builder(2).tape_length(4).build();
        assert_eq!(
            MachineStatus::DecidedNotTranslatedCycler(NotCyclerReason::NeverHalts),
            DeciderTranslatedCycler::decide_single_machine(&machine, &config)
        );
    }

    #[test]
    fn verify_cost_function_no_mismatch() {
        let machine = NotableMachineBinary::TranslatedPeriod3.machine();
        let config = Config::builder(3)
            .tape_length(12)
            .verify_cost_function(true)
            .build();
        let mut decider = DeciderTranslatedCycler::new(&config);
        let status = decider.decide_machine(&machine);
        assert!(status.is_translated_cycler());
        assert_eq!(0, decider.num_runtime_mismatch());
    }

    #[test]
    fn decider_reused_for_machines() {
        let config = Config::builder(3).tape_length(6).build();
        let mut decider = DeciderTranslatedCycler::new(&config);
        let first = decider.decide_machine(&NotableMachineBinary::TranslatedPeriod3.machine());
        decider.decide_machine(&NotableMachineBinary::ScanRight.machine());
        let again = decider.decide_machine(&NotableMachineBinary::TranslatedPeriod3.machine());
        assert_eq!(first, again);
    }
}
