use std::fmt::Display;

use num_format::ToFormattedString;

use crate::{
    config::{user_locale, StepBig},
    decider::cost_function::CostFunction,
};

/// Reasons why a machine is decided not to be a translated cycler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NotCyclerReason {
    /// The machine halted, but no periodic section and no steps were accumulated.
    NoCostFunction,
    /// The machine ran longer than the number of distinct configurations on the tape,
    /// so it repeats a configuration and never halts.
    NeverHalts,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UndecidedReason {
    /// Head position or a state extent left the tape. This is an internal invariant violation.
    BoundExceeded,
    /// The configured step limit was reached.
    StepLimit,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum MachineStatus {
    #[default]
    NoDecision,
    /// Cost function and the number of steps the machine ran on this tape length
    DecidedTranslatedCycler(CostFunction, StepBig),
    DecidedNotTranslatedCycler(NotCyclerReason),
    /// UndecidedReason, stopped after steps, tape length in cells
    Undecided(UndecidedReason, StepBig, u32),
}

impl MachineStatus {
    pub fn is_translated_cycler(&self) -> bool {
        matches!(self, MachineStatus::DecidedTranslatedCycler(_, _))
    }

    pub fn is_undecided(&self) -> bool {
        matches!(self, MachineStatus::Undecided(_, _, _))
    }

    pub fn cost_function(&self) -> Option<CostFunction> {
        match self {
            MachineStatus::DecidedTranslatedCycler(cost_function, _) => Some(*cost_function),
            _ => None,
        }
    }
}

impl Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locale = user_locale();
        match self {
            MachineStatus::NoDecision => write!(f, "No decision"),
            MachineStatus::DecidedTranslatedCycler(cost_function, steps) => write!(
                f,
                "Decided: Translated cycler, cost function {cost_function}, halts after {} steps",
                (steps + 1).to_formatted_string(&locale)
            ),
            MachineStatus::DecidedNotTranslatedCycler(reason) => match reason {
                NotCyclerReason::NoCostFunction => {
                    write!(f, "Decided: Not a translated cycler, no cost function")
                }
                NotCyclerReason::NeverHalts => write!(
                    f,
                    "Decided: Not a translated cycler, configuration bound exceeded (never halts)"
                ),
            },
            MachineStatus::Undecided(reason, steps, tape_length) => match reason {
                UndecidedReason::BoundExceeded => write!(
                    f,
                    "Undecided: Tape bound {tape_length} exceeded after {} steps",
                    steps.to_formatted_string(&locale)
                ),
                UndecidedReason::StepLimit => write!(
                    f,
                    "Undecided: Step limit reached, machine did not halt for {} steps (tape length {tape_length})",
                    steps.to_formatted_string(&locale)
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_counts_halting_transition() {
        let status = MachineStatus::DecidedTranslatedCycler(CostFunction::new(3, -2), 1_000);
        assert_eq!(
            "Decided: Translated cycler, cost function 3 * L - 2, halts after 1,001 steps",
            status.to_string()
        );
        assert!(status.is_translated_cycler());
        assert_eq!(Some(CostFunction::new(3, -2)), status.cost_function());
    }

    #[test]
    fn undecided_has_no_cost_function() {
        let status = MachineStatus::Undecided(UndecidedReason::StepLimit, 50, 10);
        assert!(status.is_undecided());
        assert_eq!(None, status.cost_function());
    }
}
