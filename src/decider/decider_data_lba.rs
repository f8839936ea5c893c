//! DeciderDataLba carries all data which is not specific to the decider. \
//! It holds the bounded tape, the head position, the current state and the step_no and provides
//! the single step function. A move beyond the tape end is clamped, the head stays in place for this step.
//! The decider detects the bounce at the tape end by this.

use std::fmt::Display;

use crate::{
    config::{Config, StepBig},
    machine_binary::MachineBinary,
    status::{MachineStatus, UndecidedReason},
    tape::{Tape, TapeLba},
    transition_binary::{TransitionBinary, TRANSITION_SYM2_UNUSED},
};

/// Field id of A0 in the transition table.
const FIELD_A0: usize = 2;
/// State A doubled.
const STATE_X2_A: usize = 2;

/// Result of one step of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Symbol written and head moved one cell.
    Moved,
    /// Symbol written, but the head could not move as the tape end was reached.
    Bounced,
    /// The transition for the current field is undefined. Nothing was written, step_no is unchanged.
    Halted,
}

/// This contains the functionality to run a machine on a bounded tape and can be used to create more elaborate deciders.
#[derive(Debug)]
pub struct DeciderDataLba {
    /// Number of executed (defined) steps. This is also the time stamp written into the tape cells.
    pub step_no: StepBig,
    /// Last transition looked up
    pub tr: TransitionBinary,
    /// Field Id of the last transition. This is the table field, e.g. B1 converted to a 1D-map (A0=2, B1=5).
    pub tr_field: usize,
    /// Current state doubled (A=2, B=4), which is the field id for the symbol 0.
    pub state_x2: usize,
    /// Head position on the tape, always in 0..tape length.
    pub pos: usize,
    pub tape: TapeLba,
    pub transition_table: MachineBinary,
    /// Explicit step limit of the configuration, if any.
    pub step_limit: Option<StepBig>,
    /// Final status, only valid once machine has ended, but intended to be used internally.
    pub status: MachineStatus,
}

impl DeciderDataLba {
    pub fn new(config: &Config) -> Self {
        Self {
            step_no: 0,
            tr: TRANSITION_SYM2_UNUSED,
            tr_field: FIELD_A0,
            state_x2: STATE_X2_A,
            pos: 0,
            tape: TapeLba::new(config),
            transition_table: MachineBinary::default(),
            step_limit: config.step_limit(),
            status: MachineStatus::NoDecision,
        }
    }

    /// Creates the data for a tape of the given length without any step limit.
    pub fn new_with_tape_length(tape_length: usize) -> Self {
        let config = Config::builder(1).tape_length(tape_length).build();
        Self::new(&config)
    }

    /// Resets the data for a different machine.
    #[inline]
    pub fn clear(&mut self) {
        self.tape.clear();

        self.step_no = 0;
        self.tr = TRANSITION_SYM2_UNUSED;
        self.tr_field = FIELD_A0;
        self.state_x2 = STATE_X2_A;
        self.pos = 0;
        self.status = MachineStatus::NoDecision;
    }

    /// Resets the data and sets the machine to run.
    pub fn set_machine(&mut self, machine: &MachineBinary) {
        self.clear();
        self.transition_table = *machine;
    }

    /// Current state, A=1
    #[inline]
    pub fn state(&self) -> usize {
        self.state_x2 >> 1
    }

    /// Field id for the current state and the symbol under the head.
    #[inline(always)]
    pub fn current_field(&self) -> usize {
        self.state_x2 + self.tape.symbol(self.pos) as usize
    }

    #[inline]
    pub fn tape_length(&self) -> usize {
        self.tape.len()
    }

    /// Executes one step: Reads the symbol under the head, writes the symbol of the transition, marks the
    /// cell with the current step_no, moves the head if possible and increments the step_no. \
    /// On an undefined transition nothing is changed and [StepResult::Halted] is returned.
    #[inline(always)]
    pub fn step(&mut self) -> StepResult {
        self.tr_field = self.current_field();
        self.tr = self.transition_table.transition(self.tr_field);
        if self.tr.is_halt() {
            return StepResult::Halted;
        }

        self.tape.write(self.pos, self.tr.symbol(), self.step_no);
        let pos_before = self.pos;
        if self.tr.is_dir_right() {
            if self.pos + 1 < self.tape.len() {
                self.pos += 1;
            }
        } else if self.pos > 0 {
            self.pos -= 1;
        }
        self.step_no += 1;
        self.state_x2 = self.tr.state_x2();

        if self.pos == pos_before {
            StepResult::Bounced
        } else {
            StepResult::Moved
        }
    }

    /// Runs the machine from a cleared tape until it halts.
    /// # Returns
    /// The number of executed steps or None if the limit was exceeded before the halt.
    pub fn run_until_halt(&mut self, machine: &MachineBinary, limit: StepBig) -> Option<StepBig> {
        self.set_machine(machine);
        loop {
            if self.step_no > limit {
                self.status = self.status_undecided_step_limit();
                return None;
            }
            if self.step() == StepResult::Halted {
                return Some(self.step_no);
            }
        }
    }

    pub fn status_undecided_step_limit(&self) -> MachineStatus {
        MachineStatus::Undecided(
            UndecidedReason::StepLimit,
            self.step_no,
            self.tape.tape_size_cells(),
        )
    }

    pub fn status_undecided_bound_exceeded(&self) -> MachineStatus {
        MachineStatus::Undecided(
            UndecidedReason::BoundExceeded,
            self.step_no,
            self.tape.tape_size_cells(),
        )
    }

    /// Returns the status of the decider
    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// Returns the current step as text, e.g. "Step    12 B0 0LC: 01[0]11"
    pub fn step_to_string(&self) -> String {
        format!(
            "Step {:5} {} {}: {}",
            self.step_no,
            MachineBinary::array_id_to_field_name(self.tr_field),
            self.tr,
            self.tape.to_string_with_head(self.pos)
        )
    }
}

impl Display for DeciderDataLba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "State {}, Pos {}, Step {}, Tape {}",
            (self.state() as u8 + b'A' - 1) as char,
            self.pos,
            self.step_no,
            self.tape.to_string_with_head(self.pos)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine_binary::NotableMachineBinary;

    #[test]
    fn scan_right_bounces_then_halts() {
        let machine = NotableMachineBinary::ScanRight.machine();
        let mut data = DeciderDataLba::new_with_tape_length(4);
        data.set_machine(&machine);
        for i in 0..3 {
            assert_eq!(StepResult::Moved, data.step());
            assert_eq!(i + 1, data.pos);
        }
        // write at the last cell, the head stays
        assert_eq!(StepResult::Bounced, data.step());
        assert_eq!(3, data.pos);
        assert_eq!(4, data.step_no);
        assert_eq!(Some(3), data.tape.cell(3).last_visit);
        // A1 is undefined
        assert_eq!(StepResult::Halted, data.step());
        assert_eq!(StepResult::Halted, data.step());
        assert_eq!(4, data.step_no);
        assert_eq!(4, data.tape.count_ones());
    }

    #[test]
    fn left_move_at_start_is_clamped() {
        let machine = MachineBinary::try_from("1LA---").unwrap();
        let mut data = DeciderDataLba::new_with_tape_length(3);
        data.set_machine(&machine);
        assert_eq!(StepResult::Bounced, data.step());
        assert_eq!(0, data.pos);
        assert_eq!(StepResult::Halted, data.step());
        assert_eq!(1, data.step_no);
    }

    #[test]
    fn head_never_leaves_tape() {
        let machine = NotableMachineBinary::BB5Max.machine();
        for tape_length in 1..8 {
            let mut data = DeciderDataLba::new_with_tape_length(tape_length);
            data.set_machine(&machine);
            for _ in 0..2_000 {
                if data.step() == StepResult::Halted {
                    break;
                }
                assert!(data.pos < tape_length);
            }
        }
    }

    #[test]
    fn run_until_halt_limit() {
        let machine = NotableMachineBinary::ScanRight.machine();
        let mut data = DeciderDataLba::new_with_tape_length(10);
        assert_eq!(Some(10), data.run_until_halt(&machine, 10));
        assert_eq!(None, data.run_until_halt(&machine, 9));
        assert!(data.status().is_undecided());
    }
}
