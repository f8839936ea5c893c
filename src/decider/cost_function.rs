//! The cost function predicts the number of steps a translated cycler runs on a tape of length L: \
//! `steps = coefficient * L + constant`. \
//! The [CostAccumulator] collects the coefficient and constant while the machine runs. Every periodic
//! section (from the first record of a translation up to the bounce at the tape end) adds its steps per cell
//! to the coefficient. All steps outside of periodic sections go into the constant, and the part of a
//! periodic section which does not scale with the tape length is corrected in the constant.

use std::fmt::Display;

use crate::{
    config::StepBig,
    decider::{
        decider_data_lba::DeciderDataLba,
        record::{ScanDirection, Translation},
    },
    machine_binary::MachineBinary,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CostFunction {
    pub coefficient: u64,
    /// May be negative, e.g. 3 * L - 2.
    pub constant: i64,
}

impl CostFunction {
    pub fn new(coefficient: u64, constant: i64) -> Self {
        Self {
            coefficient,
            constant,
        }
    }

    /// True if the function has any cost, which is the condition for a translated cycler.
    pub fn has_cost(&self) -> bool {
        self.coefficient > 0 || self.constant > 0
    }

    /// Predicted number of steps for the tape length. None if the result is negative or too large.
    pub fn predict_steps(&self, tape_length: usize) -> Option<StepBig> {
        let steps =
            self.coefficient as i128 * tape_length as i128 + self.constant as i128;
        StepBig::try_from(steps).ok()
    }

    /// Replays the machine on a new tape and compares the steps with the prediction.
    /// # Returns
    /// The verified number of steps or the mismatch.
    pub fn verify(
        &self,
        machine: &MachineBinary,
        tape_length: usize,
    ) -> Result<StepBig, RuntimeMismatch> {
        let predicted = self.predict_steps(tape_length);
        let limit = predicted.unwrap_or_default();
        let mut data = DeciderDataLba::new_with_tape_length(tape_length);
        let actual = data.run_until_halt(machine, limit);
        match (predicted, actual) {
            (Some(p), Some(a)) if p == a => Ok(a),
            _ => Err(RuntimeMismatch {
                cost_function: *self,
                tape_length,
                predicted,
                actual,
            }),
        }
    }
}

impl Display for CostFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.constant < 0 {
            write!(f, "{} * L - {}", self.coefficient, self.constant.unsigned_abs())
        } else {
            write!(f, "{} * L + {}", self.coefficient, self.constant)
        }
    }
}

/// The cost function does not predict the actual number of steps. The classification stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeMismatch {
    pub cost_function: CostFunction,
    pub tape_length: usize,
    /// None if the prediction is negative.
    pub predicted: Option<StepBig>,
    /// None if the replay did not halt within the predicted steps.
    pub actual: Option<StepBig>,
}

impl std::error::Error for RuntimeMismatch {}

impl Display for RuntimeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let predicted = match self.predicted {
            Some(p) => p.to_string(),
            None => "negative".to_string(),
        };
        let actual = match self.actual {
            Some(a) => a.to_string(),
            None => "not halted".to_string(),
        };
        write!(
            f,
            "Runtime mismatch for L = {}: {} predicts {predicted} steps, actual {actual}",
            self.tape_length, self.cost_function
        )
    }
}

/// Periodic section which is still open, i.e. the head did not yet reach the tape end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSection {
    pub start: StepBig,
    pub steps_per_cell: u64,
    /// Cells from the start position of the section to the tape end.
    pub remaining_cells: u64,
}

#[derive(Debug, Default)]
pub struct CostAccumulator {
    coefficient: u64,
    constant: i64,
    open_section: Option<CycleSection>,
    previous_cycle_end: StepBig,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Starts a periodic section for the found translation. The steps before the section are
    /// added to the constant, the cells traversed before the section are removed from the periodic part.
    pub fn open_cycle(
        &mut self,
        translation: &Translation,
        direction: ScanDirection,
        tape_length: usize,
    ) {
        let c = translation.steps_per_cell;
        let traversed = match direction {
            ScanDirection::Right => translation.past_pos,
            ScanDirection::Left => tape_length - 1 - translation.past_pos,
        } as u64;
        self.coefficient = self.coefficient.saturating_add(c);
        let before_section = to_i64(translation.past_time) - to_i64(self.previous_cycle_end);
        self.add_constant(before_section - to_i64(c.saturating_mul(traversed)));
        self.open_section = Some(CycleSection {
            start: translation.past_time,
            steps_per_cell: c,
            remaining_cells: tape_length as u64 - traversed,
        });
    }

    /// Closes the open periodic section at step_no. The difference between the actual steps of the
    /// section and the linear part goes into the constant.
    pub fn close_cycle(&mut self, step_no: StepBig) {
        if let Some(section) = self.open_section.take() {
            let section_steps = to_i64(step_no) - to_i64(section.start);
            let linear = to_i64(section.steps_per_cell.saturating_mul(section.remaining_cells));
            self.add_constant(section_steps - linear);
        }
        self.previous_cycle_end = step_no;
    }

    /// Adds the steps since the end of the last periodic section to the constant.
    pub fn add_non_periodic(&mut self, step_no: StepBig) {
        self.add_constant(to_i64(step_no) - to_i64(self.previous_cycle_end));
        self.previous_cycle_end = step_no;
    }

    /// Called on halt: closes an open section or adds the remaining steps.
    pub fn finish(&mut self, step_no: StepBig) {
        if self.open_section.is_some() {
            self.close_cycle(step_no);
        } else {
            self.add_non_periodic(step_no);
        }
    }

    pub fn is_cycle_open(&self) -> bool {
        self.open_section.is_some()
    }

    pub fn open_section(&self) -> Option<CycleSection> {
        self.open_section
    }

    pub fn cost_function(&self) -> CostFunction {
        CostFunction::new(self.coefficient, self.constant)
    }

    fn add_constant(&mut self, value: i64) {
        self.constant = self.constant.saturating_add(value);
    }
}

#[inline]
fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine_binary::NotableMachineBinary;

    #[test]
    fn display_and_predict() {
        let cf = CostFunction::new(3, -2);
        assert_eq!("3 * L - 2", cf.to_string());
        assert_eq!(Some(13), cf.predict_steps(5));
        assert_eq!("0 * L + 1", CostFunction::new(0, 1).to_string());
        assert_eq!(None, CostFunction::new(0, -1).predict_steps(10));
        assert!(!CostFunction::default().has_cost());
        assert!(CostFunction::new(0, 1).has_cost());
    }

    #[test]
    fn accumulate_scan_right() {
        // 1RB---_1RA---: record A0 at step 0 pos 0 repeats at step 2 pos 2
        let mut acc = CostAccumulator::new();
        let translation = Translation {
            past_time: 0,
            past_pos: 0,
            steps_per_cell: 1,
        };
        acc.open_cycle(&translation, ScanDirection::Right, 10);
        assert!(acc.is_cycle_open());
        // bounce at the right end after step 10
        acc.close_cycle(10);
        assert!(!acc.is_cycle_open());
        // halt right after the bounce
        acc.finish(10);
        assert_eq!(CostFunction::new(1, 0), acc.cost_function());

        acc.clear();
        assert_eq!(CostFunction::default(), acc.cost_function());
    }

    #[test]
    fn accumulate_moving_left() {
        let mut acc = CostAccumulator::new();
        acc.add_non_periodic(4);
        // periodic section starting at step 6 from pos 5 of 8 cells moving left, 2 cells traversed
        let translation = Translation {
            past_time: 6,
            past_pos: 5,
            steps_per_cell: 2,
        };
        acc.open_cycle(&translation, ScanDirection::Left, 8);
        assert_eq!(
            Some(CycleSection {
                start: 6,
                steps_per_cell: 2,
                remaining_cells: 6
            }),
            acc.open_section()
        );
        // constant: 4 + (6 - 4) - 2 * 2
        assert_eq!(CostFunction::new(2, 2), acc.cost_function());
        acc.finish(19);
        // section: 19 - 6 - 2 * 6 = 1
        assert_eq!(CostFunction::new(2, 3), acc.cost_function());
    }

    #[test]
    fn verify_by_replay() {
        let machine = NotableMachineBinary::ScanRight.machine();
        assert_eq!(Ok(10), CostFunction::new(1, 0).verify(&machine, 10));
        let mismatch = CostFunction::new(1, 1).verify(&machine, 10).unwrap_err();
        assert_eq!(Some(11), mismatch.predicted);
        assert_eq!(Some(10), mismatch.actual);
        let mismatch = CostFunction::new(1, -1).verify(&machine, 10).unwrap_err();
        assert_eq!(None, mismatch.actual);
    }
}
