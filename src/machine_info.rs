//! A machine together with its decider result, as kept in the result lists.

use std::{cmp::Ordering, fmt::Display};

use num_format::ToFormattedString;

use crate::{
    config::{user_locale, IdBig},
    decider::cost_function::CostFunction,
    machine_binary::MachineId,
    status::MachineStatus,
};

#[derive(Debug, Clone, Copy)]
pub struct MachineInfo {
    machine: MachineId,
    status: MachineStatus,
}

impl MachineInfo {
    pub fn from_machine_id(machine: &MachineId, status: &MachineStatus) -> MachineInfo {
        Self {
            machine: *machine,
            status: *status,
        }
    }

    /// Database id, None for machines created from text.
    pub fn id(&self) -> Option<IdBig> {
        self.machine.id_as_option()
    }

    pub fn cost_function(&self) -> Option<CostFunction> {
        self.status.cost_function()
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn to_standard_tm_text_format(&self) -> String {
        self.machine.to_standard_tm_text_format()
    }
}

impl PartialEq for MachineInfo {
    fn eq(&self, other: &Self) -> bool {
        self.machine == other.machine
    }
}

impl Eq for MachineInfo {}

impl PartialOrd for MachineInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorted by id, machines without id by their text.
impl Ord for MachineInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id()).then_with(|| {
            self.to_standard_tm_text_format()
                .cmp(&other.to_standard_tm_text_format())
        })
    }
}

impl Display for MachineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = self.id() {
            write!(f, "Id {:>12} ", id.to_formatted_string(&user_locale()))?;
        }
        write!(f, "{}: {}", self.to_standard_tm_text_format(), self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine_binary::NotableMachineBinary;

    #[test]
    fn sorted_by_id() {
        let m = NotableMachineBinary::TranslatedPeriod3.machine();
        let status = MachineStatus::NoDecision;
        let mut v = vec![
            MachineInfo::from_machine_id(&MachineId::new(7_000, m), &status),
            MachineInfo::from_machine_id(&MachineId::new(3, m), &status),
        ];
        v.sort();
        assert_eq!(Some(3), v[0].id());
        assert_eq!(
            "Id        7,000 1RB---_0LC---_---1RA: No decision",
            v[1].to_string()
        );
    }

    #[test]
    fn machine_without_id() {
        let mi = MachineInfo::from_machine_id(
            &NotableMachineBinary::ScanRight.machine_id(),
            &MachineStatus::NoDecision,
        );
        assert_eq!(None, mi.id());
        assert_eq!("1RB---_1RA---: No decision", mi.to_string());
    }
}
