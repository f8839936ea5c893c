use hashbrown::HashMap;
use num_format::{Buffer, ToFormattedString};
use std::{fmt::Display, time::Duration};

use crate::{
    config::{user_locale, Config, StepBig},
    decider::{cost_function::CostFunction, DeciderId},
    machine_binary::MachineId,
    machine_info::MachineInfo,
    reporter::format_duration_hhmmss_ms,
    status::{MachineStatus, NotCyclerReason},
};

const NUM_LONG_LEN: usize = 18;
const NUM_SHORT_LEN: usize = 14;
const LEVEL_1_CHAR: char = '\u{2022}';
const NUM_MAX_MACHINES_TO_DISPLAY_IN_RESULT: usize = 10;
const NUM_UNDECIDED_MACHINES_TO_DISPLAY_IN_RESULT: usize = 10;
const NUM_COST_FUNCTIONS_TO_DISPLAY_IN_RESULT: usize = 10;

pub type ResultUnitEndReason = Result<(), EndReason>;

#[non_exhaustive]
#[derive(Debug, Default, Clone, PartialEq)]
pub enum EndReason {
    /// Final end reason of the decider(s).
    AllMachinesChecked,
    /// Error Machine Id, msg
    Error(u64, String),
    /// The data provider needs to mark the last batch so the caller knows it can end requesting batches.
    IsLastBatch,
    /// A legit result of the data provider, e.g. an empty id range.
    NoBatchData,
    /// Usually an unexpected end when the total is not reached.
    NoMoreData,
    /// Machine Id, msg. ResultWorker can use this to end processing without marking it as an error.
    StopRequested(u64, String),
    /// When the maximum number of recorded decided machines is reached.
    RecordLimitDecidedReached(usize),
    /// When the maximum number of recorded undecided machines is reached. For analyzing undecided.
    RecordLimitUndecidedReached(usize),
    /// Default state indicating no action has been taken yet.
    #[default]
    None,
}

impl From<std::io::Error> for EndReason {
    fn from(error: std::io::Error) -> Self {
        Self::Error(0, error.to_string())
    }
}

impl Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::AllMachinesChecked => write!(f, "All machines checked"),
            EndReason::Error(m_id, message) => {
                let ms = if *m_id != 0 {
                    format!("Machine Id: {m_id}, ")
                } else {
                    String::new()
                };
                write!(f, "{ms}Error: {message}")
            }
            EndReason::IsLastBatch => {
                write!(f, "Last batch indication. Should be internal only")
            }
            EndReason::NoBatchData => write!(f, "No data in this batch"),
            EndReason::NoMoreData => write!(f, "No more data found"),
            EndReason::StopRequested(m_id, message) => {
                let ms = if *m_id != 0 {
                    format!("Machine Id: {m_id}, ")
                } else {
                    String::new()
                };
                write!(f, "{ms}Stop requested: {message}")
            }
            EndReason::RecordLimitDecidedReached(limit) => {
                write!(f, "Limit ({limit}) for recording decided machines reached")
            }
            EndReason::RecordLimitUndecidedReached(limit) => {
                write!(
                    f,
                    "Limit ({limit}) for recording undecided machines reached"
                )
            }
            EndReason::None => write!(f, "No end reason"),
        }
    }
}

/// The result of the decider. It holds a number of counters for each result type and may carry the
/// machines with max steps and the undecided machines.
/// This is always returned. end_reason should give error information if any.
#[derive(Debug, Default)]
pub struct DeciderResultStats {
    /// Number of machines which have run through the decider.
    num_evaluated: u64,
    /// Machines decided as translated cycler.
    num_translated_cycler: u64,
    /// Machines which halted without any cost.
    num_not_cycler: u64,
    /// Machines which run longer than the configuration bound.
    num_never_halts: u64,
    /// Tested machines which did not come to a result.
    num_undecided: u64,
    /// Translated cyclers where the cost function does not predict the steps on this tape length.
    num_runtime_mismatch: u64,
    /// Number of machines by cost function.
    cost_functions: HashMap<CostFunction, u64>,

    /// Number of states used for the Turing machines.
    n_states: usize,
    /// Tape length the machines were decided with.
    tape_length: usize,

    /// Longest running translated cycler.
    steps_max: StepMaxResult,
    /// Store decided machines up to this limit.
    limit_machines_decided: usize,
    /// Store undecided machines up to this limit.
    limit_machines_undecided: usize,
    machines_decided: Option<Vec<MachineInfo>>,
    machines_undecided: Option<Vec<MachineInfo>>,
    pub end_reason: EndReason,

    // for statistical purposes and performance tests
    pub duration: DurationDataProvider,
    /// Optional name of the tests or any other info.
    names: Vec<String>,
}

impl DeciderResultStats {
    pub fn new(config: &Config) -> Self {
        let limit_machines_decided = config.limit_machines_decided();
        DeciderResultStats {
            n_states: config.n_states(),
            tape_length: config.tape_length(),
            limit_machines_decided,
            machines_decided: if limit_machines_decided > 0 {
                Some(Vec::new())
            } else {
                None
            },
            limit_machines_undecided: config.limit_machines_undecided(),
            ..Default::default()
        }
    }

    /// Add one single result to these totals
    /// # Returns
    /// False if <limit_machines_(un)decided> (Un)decided Machines have been stored
    /// which allows the caller to stop further processing. \
    /// In this case the end_reason is set also.
    pub fn add(&mut self, machine: &MachineId, status: &MachineStatus) -> bool {
        let mut is_decided = true;
        self.num_evaluated += 1;
        match status {
            MachineStatus::DecidedTranslatedCycler(cost_function, steps) => {
                self.num_translated_cycler += 1;
                *self.cost_functions.entry(*cost_function).or_insert(0) += 1;
                if cost_function.predict_steps(self.tape_length) != Some(*steps) {
                    self.num_runtime_mismatch += 1;
                }
                self.steps_max.add_steps(*steps, machine, status);
            }
            MachineStatus::DecidedNotTranslatedCycler(reason) => match reason {
                NotCyclerReason::NoCostFunction => self.num_not_cycler += 1,
                NotCyclerReason::NeverHalts => self.num_never_halts += 1,
            },
            MachineStatus::Undecided(_, _, _) => {
                is_decided = false;
                if self.limit_machines_undecided > 0 {
                    if self.num_undecided < self.limit_machines_undecided as u64 {
                        self.machines_undecided
                            .get_or_insert_with(Vec::new)
                            .push(MachineInfo::from_machine_id(machine, status));
                    } else {
                        self.end_reason =
                            EndReason::RecordLimitUndecidedReached(self.limit_machines_undecided);
                        return false;
                    }
                }
                self.num_undecided += 1;
            }
            MachineStatus::NoDecision => {
                // a decider must not end without a decision, count it as undecided
                log::error!("{machine}: ended without a decision");
                is_decided = false;
                self.num_undecided += 1;
            }
        }

        if is_decided && self.limit_machines_decided > 0 {
            if let Some(m_decided) = self.machines_decided.as_mut() {
                if m_decided.len() < self.limit_machines_decided {
                    m_decided.push(MachineInfo::from_machine_id(machine, status));
                } else {
                    self.end_reason =
                        EndReason::RecordLimitDecidedReached(self.limit_machines_decided);
                    return false;
                }
            }
        }
        true
    }

    /// adds this name if it does not exist already
    pub fn add_name(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    /// Add another result to this result. \
    /// Returns false if <limit_machines_(un)decided> (Un)decided Machines have been stored
    /// which allows the caller to stop further processing.
    pub fn add_result(&mut self, result: &DeciderResultStats) -> bool {
        self.num_evaluated += result.num_evaluated;
        self.num_translated_cycler += result.num_translated_cycler;
        self.num_not_cycler += result.num_not_cycler;
        self.num_never_halts += result.num_never_halts;
        self.num_runtime_mismatch += result.num_runtime_mismatch;
        for (cost_function, count) in result.cost_functions.iter() {
            *self.cost_functions.entry(*cost_function).or_insert(0) += count;
        }

        self.steps_max.add_self(&result.steps_max);

        for name in result.names.iter() {
            self.add_name(name);
        }

        let mut is_ok = true;

        // add decided machines
        if self.limit_machines_decided > 0 {
            if let Some(d_machines) = self.machines_decided.as_mut() {
                if d_machines.len() < self.limit_machines_decided {
                    if let Some(new_machines) = result.machines_decided.as_ref() {
                        let max = new_machines
                            .len()
                            .min(self.limit_machines_decided - d_machines.len());
                        d_machines.extend_from_slice(&new_machines[0..max]);
                    }
                    if d_machines.len() >= self.limit_machines_decided {
                        self.end_reason =
                            EndReason::RecordLimitDecidedReached(self.limit_machines_decided);
                        is_ok = false;
                    }
                } else {
                    self.end_reason =
                        EndReason::RecordLimitDecidedReached(self.limit_machines_decided);
                    is_ok = false;
                }
            }
        }

        // add undecided machines
        if self.limit_machines_undecided > 0 {
            if self.num_undecided < self.limit_machines_undecided as u64 {
                if let Some(new_machines) = result.machines_undecided.as_ref() {
                    let machines = self.machines_undecided.get_or_insert_with(Vec::new);
                    let max = new_machines
                        .len()
                        .min(self.limit_machines_undecided - machines.len());
                    machines.extend_from_slice(&new_machines[0..max]);
                    if machines.len() >= self.limit_machines_undecided {
                        self.end_reason =
                            EndReason::RecordLimitUndecidedReached(self.limit_machines_undecided);
                        is_ok = false;
                    }
                }
            } else {
                self.end_reason =
                    EndReason::RecordLimitUndecidedReached(self.limit_machines_undecided);
                is_ok = false;
            }
        }
        self.num_undecided += result.num_undecided;

        // add end_reason
        if result.end_reason != EndReason::None {
            match self.end_reason {
                // only if not already an error was reported
                EndReason::AllMachinesChecked | EndReason::None => match result.end_reason {
                    EndReason::IsLastBatch => {}
                    EndReason::NoBatchData => {}
                    _ => self.end_reason = result.end_reason.clone(),
                },
                _ => {}
            }
        }

        is_ok
    }

    pub fn cost_functions(&self) -> &HashMap<CostFunction, u64> {
        &self.cost_functions
    }

    /// Cost functions with their number of machines, most frequent first.
    pub fn cost_functions_sorted(&self) -> Vec<(CostFunction, u64)> {
        let mut v: Vec<(CostFunction, u64)> =
            self.cost_functions.iter().map(|(cf, n)| (*cf, *n)).collect();
        v.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.0.coefficient.cmp(&b.0.coefficient))
                .then(a.0.constant.cmp(&b.0.constant))
        });
        v
    }

    pub fn machine_max_steps(&self) -> Option<MachineInfo> {
        self.steps_max.machine_max_steps()
    }

    pub fn machines_decided(&self) -> Option<&Vec<MachineInfo>> {
        self.machines_decided.as_ref()
    }

    pub fn machines_undecided(&self) -> Option<&Vec<MachineInfo>> {
        self.machines_undecided.as_ref()
    }

    /// Returns all recorded undecided machines, sorted by id.
    pub fn machines_undecided_sorted(&self) -> Option<Vec<MachineInfo>> {
        self.machines_undecided.as_ref().map(|machines| {
            let mut v = machines.to_vec();
            v.sort();
            v
        })
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn num_evaluated(&self) -> u64 {
        self.num_evaluated
    }

    pub fn num_translated_cycler(&self) -> u64 {
        self.num_translated_cycler
    }

    pub fn num_not_cycler(&self) -> u64 {
        self.num_not_cycler
    }

    pub fn num_never_halts(&self) -> u64 {
        self.num_never_halts
    }

    pub fn num_runtime_mismatch(&self) -> u64 {
        self.num_runtime_mismatch
    }

    pub fn num_undecided(&self) -> u64 {
        self.num_undecided
    }

    pub fn steps_max(&self) -> StepBig {
        self.steps_max.steps_max()
    }

    pub fn tape_length(&self) -> usize {
        self.tape_length
    }

    pub fn to_string_with_duration(&self) -> String {
        let name = self.names.join(", ");
        format!(
            "{}\n{name} time elapsed for {} machines:\n Get machines {} ms, decider {}, total time {}.",
            self,
            self.num_evaluated.to_formatted_string(&user_locale()),
            format_duration_hhmmss_ms(self.duration.duration_data_provider, true),
            format_duration_hhmmss_ms(self.duration.duration_decider, true),
            format_duration_hhmmss_ms(self.duration.duration_total, true),
        )
    }
}

impl Display for DeciderResultStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locale = user_locale();
        let mut buf = Buffer::default();
        let mut s = String::new();

        writeln!(
            f,
            "Result BB{} on tape length {}: {}",
            self.n_states, self.tape_length, self.end_reason
        )?;
        buf.write_formatted(&self.num_evaluated, &locale);
        s.push_str(format!("  Total evaluated:    {:>NUM_LONG_LEN$}\n", buf.as_str()).as_str());
        buf.write_formatted(&self.num_undecided, &locale);
        s.push_str(
            format!(
                "  {LEVEL_1_CHAR} Undecided:        {:>NUM_LONG_LEN$}\n",
                buf.as_str()
            )
            .as_str(),
        );
        buf.write_formatted(&self.num_translated_cycler, &locale);
        s.push_str(
            format!(
                "  {LEVEL_1_CHAR} Translated Cycler:{:>NUM_LONG_LEN$}\n",
                buf.as_str()
            )
            .as_str(),
        );
        buf.write_formatted(&self.num_runtime_mismatch, &locale);
        s.push_str(
            format!(
                "    Runtime Mismatch:  {:>NUM_SHORT_LEN$}\n",
                buf.as_str()
            )
            .as_str(),
        );
        buf.write_formatted(&self.num_not_cycler, &locale);
        s.push_str(
            format!(
                "  {LEVEL_1_CHAR} No Cost Function: {:>NUM_LONG_LEN$}\n",
                buf.as_str()
            )
            .as_str(),
        );
        buf.write_formatted(&self.num_never_halts, &locale);
        s.push_str(
            format!(
                "  {LEVEL_1_CHAR} Never Halts:      {:>NUM_LONG_LEN$}\n",
                buf.as_str()
            )
            .as_str(),
        );
        write!(f, "{s}")?;

        if !self.cost_functions.is_empty() {
            writeln!(
                f,
                "  Cost Functions:        (Number of functions: {})",
                self.cost_functions.len()
            )?;
            for (cost_function, count) in self
                .cost_functions_sorted()
                .iter()
                .take(NUM_COST_FUNCTIONS_TO_DISPLAY_IN_RESULT)
            {
                buf.write_formatted(count, &locale);
                writeln!(f, "   {:<20} {:>NUM_SHORT_LEN$}", cost_function.to_string(), buf.as_str())?;
            }
        }
        write!(f, "{}", self.steps_max)?;

        if let Some(machines) = self.machines_undecided_sorted() {
            writeln!(
                f,
                "  Undecided:             (Number of machines: {})",
                self.num_undecided,
            )?;
            // format right aligned
            let len = machines
                .last()
                .and_then(|m| m.id())
                .unwrap_or_default()
                .to_formatted_string(&locale)
                .len();
            for m in machines
                .iter()
                .take(NUM_UNDECIDED_MACHINES_TO_DISPLAY_IN_RESULT)
            {
                writeln!(
                    f,
                    "   Machine No. {:>len$}: {}, {}",
                    m.id().unwrap_or_default().to_formatted_string(&locale),
                    m.to_standard_tm_text_format(),
                    m.status()
                )?;
            }
        };

        Ok(())
    }
}

/// Duration of the data provider tasks.
#[derive(Debug, Default)]
pub struct DurationDataProvider {
    pub duration_data_provider: Duration,
    /// Duration of the decider tasks.
    pub duration_decider: Duration,
    /// Duration total which includes the task creation and waiting time.
    pub duration_total: Duration,
}

/// Translated cyclers with the most steps.
#[derive(Debug, Default)]
pub struct StepMaxResult {
    steps_max: StepBig,
    num_machines_steps_max: usize,
    machines_max_steps: Option<Vec<MachineInfo>>,
}

impl StepMaxResult {
    pub fn add_self(&mut self, other: &Self) {
        if other.num_machines_steps_max == 0 || other.steps_max < self.steps_max {
            return;
        }
        if other.steps_max == self.steps_max && self.num_machines_steps_max > 0 {
            self.num_machines_steps_max += other.num_machines_steps_max;
            if let Some(machines) = other.machines_max_steps.as_ref() {
                self.machines_max_steps
                    .get_or_insert_with(Vec::new)
                    .extend_from_slice(machines);
            }
        } else {
            // new max
            self.steps_max = other.steps_max;
            self.num_machines_steps_max = other.num_machines_steps_max;
            self.machines_max_steps = other.machines_max_steps.clone();
        }
    }

    fn add_steps(&mut self, steps: StepBig, machine: &MachineId, status: &MachineStatus) {
        if steps < self.steps_max {
            return;
        }
        if steps == self.steps_max && self.num_machines_steps_max > 0 {
            // store additional max step machine
            self.machines_max_steps
                .get_or_insert_with(|| Vec::with_capacity(4))
                .push(MachineInfo::from_machine_id(machine, status));
            self.num_machines_steps_max += 1;
        } else {
            // new max, clear the list of machines and add new first
            self.steps_max = steps;
            self.num_machines_steps_max = 1;
            let machines = self
                .machines_max_steps
                .get_or_insert_with(|| Vec::with_capacity(8));
            machines.clear();
            machines.push(MachineInfo::from_machine_id(machine, status));
        }
    }

    /// Returns the first machine with max steps.
    pub fn machine_max_steps(&self) -> Option<MachineInfo> {
        self.machines_max_steps
            .as_ref()
            .and_then(|machines| machines.first().cloned())
    }

    /// Returns all recorded machines with max steps, sorted by id.
    pub fn machines_max_steps_sorted(&self) -> Option<Vec<MachineInfo>> {
        self.machines_max_steps.as_ref().map(|machines| {
            let mut v = machines.to_vec();
            v.sort();
            v
        })
    }

    pub fn steps_max(&self) -> StepBig {
        if self.num_machines_steps_max == 0 {
            0
        } else {
            self.steps_max
        }
    }
}

impl Display for StepMaxResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locale = user_locale();
        writeln!(
            f,
            "  Max Steps:      {:>10} (Number of machines: {})",
            self.steps_max().to_formatted_string(&locale),
            self.num_machines_steps_max,
        )?;
        if let Some(machines) = self.machines_max_steps_sorted() {
            for m in machines.iter().take(NUM_MAX_MACHINES_TO_DISPLAY_IN_RESULT) {
                writeln!(
                    f,
                    "   Machine No. {}: {}, {}",
                    m.id().unwrap_or_default().to_formatted_string(&locale),
                    m.to_standard_tm_text_format(),
                    m.cost_function().unwrap_or_default()
                )?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MachinesStates {
    /// Machines of one batch run.
    pub machines: Vec<MachineId>,
    /// The detailed MachineStatus. State corresponds with the machine with the same index.
    pub states: Vec<MachineStatus>,
}

impl MachinesStates {
    pub fn push(&mut self, machine: MachineId, status: MachineStatus) {
        self.machines.push(machine);
        self.states.push(status);
    }

    /// Machines which were identified as translated cycler.
    pub fn translated_cyclers(&self) -> impl Iterator<Item = &MachineId> {
        self.machines
            .iter()
            .zip(self.states.iter())
            .filter(|(_, status)| status.is_translated_cycler())
            .map(|(m, _)| m)
    }
}

/// Data of a batch run with results for all machines in the batch.
/// Decided and undecided machines are recorded in detail for the result worker.
#[derive(Debug)]
pub struct BatchData<'a> {
    pub machines: &'a [MachineId],
    pub result_decided: DeciderResultStats,
    pub machines_decided: MachinesStates,
    pub machines_undecided: MachinesStates,
    /// Current batch no, first batch is 0.
    pub batch_no: usize,
    pub num_batches: usize,
    pub decider_id: &'a DeciderId,
    pub config: &'a Config,
}

impl<'a> BatchData<'a> {
    pub fn new(
        machines: &'a [MachineId],
        batch_no: usize,
        num_batches: usize,
        decider_id: &'a DeciderId,
        config: &'a Config,
    ) -> Self {
        Self {
            machines,
            result_decided: DeciderResultStats::new(config),
            machines_decided: MachinesStates::default(),
            machines_undecided: MachinesStates::default(),
            batch_no,
            num_batches,
            decider_id,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{machine_binary::NotableMachineBinary, status::UndecidedReason};

    fn config() -> Config {
        Config::builder(3)
            .tape_length(5)
            .limit_machines_undecided(2)
            .build()
    }

    #[test]
    fn add_counts_by_status() {
        let config = config();
        let mut result = DeciderResultStats::new(&config);
        let m = NotableMachineBinary::TranslatedPeriod3.machine_id();
        let cf = CostFunction::new(3, -2);
        assert!(result.add(&m, &MachineStatus::DecidedTranslatedCycler(cf, 13)));
        // 14 steps do not match the prediction for L = 5
        assert!(result.add(&m, &MachineStatus::DecidedTranslatedCycler(cf, 14)));
        assert!(result.add(
            &m,
            &MachineStatus::DecidedNotTranslatedCycler(NotCyclerReason::NeverHalts)
        ));
        assert!(result.add(
            &m,
            &MachineStatus::DecidedNotTranslatedCycler(NotCyclerReason::NoCostFunction)
        ));
        assert_eq!(4, result.num_evaluated());
        assert_eq!(2, result.num_translated_cycler());
        assert_eq!(1, result.num_runtime_mismatch());
        assert_eq!(1, result.num_never_halts());
        assert_eq!(1, result.num_not_cycler());
        assert_eq!(Some(&2), result.cost_functions().get(&cf));
        assert_eq!(14, result.steps_max());
    }

    #[test]
    fn undecided_limit_stops() {
        let config = config();
        let mut result = DeciderResultStats::new(&config);
        let m = NotableMachineBinary::ScanRight.machine_id();
        let status = MachineStatus::Undecided(UndecidedReason::StepLimit, 100, 5);
        assert!(result.add(&m, &status));
        assert!(result.add(&m, &status));
        assert!(!result.add(&m, &status));
        assert_eq!(
            EndReason::RecordLimitUndecidedReached(2),
            result.end_reason
        );
        assert_eq!(2, result.machines_undecided().map_or(0, |m| m.len()));
    }

    #[test]
    fn add_result_merges() {
        let config = config();
        let mut total = DeciderResultStats::new(&config);
        let mut batch = DeciderResultStats::new(&config);
        let m = NotableMachineBinary::ScanRight.machine_id();
        batch.add(
            &m,
            &MachineStatus::DecidedTranslatedCycler(CostFunction::new(1, 0), 5),
        );
        batch.add_name("batch 1");
        assert!(total.add_result(&batch));
        assert!(total.add_result(&batch));
        assert_eq!(2, total.num_translated_cycler());
        assert_eq!(
            vec![(CostFunction::new(1, 0), 2)],
            total.cost_functions_sorted()
        );
        assert_eq!(5, total.steps_max());
        assert!(total.to_string().contains("1 * L + 0"));
    }
}
