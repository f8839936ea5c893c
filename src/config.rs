//! This crate hold the Config struct which is used to configure a decider run.

use std::{fmt::Display, ops::Range, time::SystemTime};

use num_format::ToFormattedString;

// --- Below are program defining definitions, where changes may have a serious impact. ---

/// Number type used for step counters. The configuration bound n_states * L * 2^L grows fast,
/// so the counter is 64 bit.
pub type StepBig = u64;
/// Number type for the machine id.
pub type IdBig = u64;

/// Number of states the program can handle. The binary file format has room for exactly 5 states.
pub const MAX_STATES: usize = 5;
/// Fields in the 1D transition table: state 0 is unused, so A0 is field 2.
pub const NUM_FIELDS: usize = MAX_STATES * 2 + 2;

/// Only used in Default to initialize, use new_default() instead.
pub const N_STATES_DEFAULT: usize = 5;
/// Tape length used for the LBA halting database.
pub const TAPE_LENGTH_DEFAULT: usize = 30;
/// Default directory for result files.
pub const PATH_RESULT_DEFAULT: &str = "./output/";
const BATCH_SIZE_FILE: usize = 200;
const CPU_UTILIZATION_DEFAULT: usize = 100;

/// This sets the configuration for the decider run. \
/// Use [Self::new_default] or the [Self::builder] to create a Config. \
/// Since the config is designed immutable, one can use [Self::builder_from_config] to copy values of an existing config and make changes.
/// # Example
/// ```
/// use bb_lba::config::Config;
///
/// let config = Config::new_default(2);
/// assert_eq!(2, config.n_states());
/// assert_eq!(None, config.step_limit());
///
/// let config = Config::builder(2).tape_length(12).step_limit(10_000).build();
/// assert_eq!(12, config.tape_length());
/// assert_eq!(Some(10_000), config.step_limit());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    n_states: usize,
    /// Number of cells of the bounded tape.
    tape_length: usize,
    /// Explicit step limit. If this many steps are exceeded, the machine is undecided. \
    /// If None, only the configuration bound applies.
    step_limit: Option<StepBig>,
    /// Ids from the machine file (start, end exclusive). If None then all.
    file_id_range: Option<Range<IdBig>>,
    /// batch size for operation
    batch_size: usize,
    /// This many decided machines are stored in the result. If full, the decider exits.
    limit_machines_decided: usize,
    /// This many undecided machines are stored in the result. If full, the decider exits.
    limit_machines_undecided: usize,
    /// CPU utilization in percent, e.g. 75 -> 6 of 8 cores used. 0-150 allowed.
    cpu_utilization_percent: usize,
    /// Replays every identified translated cycler with a fresh tape to check the cost function.
    verify_cost_function: bool,
    /// Directory for result files.
    result_path: String,
    /// Creation time of this Config. Used for file names.
    creation_time: SystemTime,
    /// When set to false UTC is used instead, but this may be confusing to the user.
    use_local_time: bool,
}

impl Config {
    /// Builder to initialize required values.
    pub fn builder(n_states: usize) -> ConfigBuilder {
        ConfigBuilder::new(n_states)
    }

    /// Builder to initialize required values taking over values of existing config.
    pub fn builder_from_config(config: &Config) -> ConfigBuilder {
        ConfigBuilder::new_config(config)
    }

    /// Default values for testing purposes. Better use builder.
    pub fn new_default(n_states: usize) -> Config {
        Self {
            n_states,
            tape_length: TAPE_LENGTH_DEFAULT,
            step_limit: None,
            file_id_range: None,
            batch_size: BATCH_SIZE_FILE,
            limit_machines_decided: 0,
            limit_machines_undecided: 0,
            cpu_utilization_percent: CPU_UTILIZATION_DEFAULT,
            verify_cost_function: false,
            result_path: PATH_RESULT_DEFAULT.to_string(),
            creation_time: SystemTime::now(),
            use_local_time: true,
        }
    }

    /// Number of distinct configurations (state, head position, tape content) of a machine
    /// on a bounded tape: n_states * L * 2^L. \
    /// A machine running longer than this repeats a configuration and never halts.
    /// Saturates at StepBig::MAX.
    pub fn configuration_bound(n_states: usize, tape_length: usize) -> StepBig {
        let tape_contents = match u32::try_from(tape_length) {
            Ok(l) => (1 as StepBig).checked_shl(l).filter(|v| v.trailing_zeros() == l),
            Err(_) => None,
        };
        tape_contents
            .and_then(|c| c.checked_mul(tape_length as StepBig))
            .and_then(|c| c.checked_mul(n_states as StepBig))
            .unwrap_or(StepBig::MAX)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cpu_utilization_percent(&self) -> usize {
        self.cpu_utilization_percent
    }

    pub fn creation_time(&self) -> SystemTime {
        self.creation_time
    }

    pub fn file_id_range(&self) -> Option<Range<IdBig>> {
        self.file_id_range.clone()
    }

    pub fn file_id_range_to_string(&self) -> String {
        let locale = user_locale();
        if let Some(range) = &self.file_id_range {
            format!(
                "{}..{}",
                range.start.to_formatted_string(&locale),
                range.end.to_formatted_string(&locale)
            )
        } else {
            "unlimited".to_string()
        }
    }

    pub fn limit_machines_decided(&self) -> usize {
        self.limit_machines_decided
    }

    pub fn limit_machines_undecided(&self) -> usize {
        self.limit_machines_undecided
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn result_path(&self) -> &str {
        &self.result_path
    }

    pub fn step_limit(&self) -> Option<StepBig> {
        self.step_limit
    }

    pub fn tape_length(&self) -> usize {
        self.tape_length
    }

    pub fn use_local_time(&self) -> bool {
        self.use_local_time
    }

    pub fn verify_cost_function(&self) -> bool {
        self.verify_cost_function
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new_default(N_STATES_DEFAULT)
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    ref_config: Config,
    n_states: usize,
    tape_length: Option<usize>,
    step_limit: Option<StepBig>,
    file_id_range: Option<Range<IdBig>>,
    batch_size: Option<usize>,
    limit_machines_decided: Option<usize>,
    limit_machines_undecided: Option<usize>,
    cpu_utilization_percent: Option<usize>,
    verify_cost_function: Option<bool>,
    result_path: Option<String>,
    use_local_time: Option<bool>,
}

impl ConfigBuilder {
    fn new(n_states: usize) -> Self {
        Self {
            n_states,
            ref_config: Config::new_default(n_states),
            ..Default::default()
        }
    }

    fn new_config(config: &Config) -> ConfigBuilder {
        Self {
            ref_config: config.clone(),
            n_states: config.n_states,
            step_limit: config.step_limit,
            file_id_range: config.file_id_range.clone(),
            ..Default::default()
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn cpu_utilization(mut self, percent: usize) -> Self {
        self.cpu_utilization_percent = Some(percent);
        self
    }

    pub fn file_id_range(mut self, file_id_range: Range<IdBig>) -> Self {
        self.file_id_range = Some(file_id_range);
        self
    }

    pub fn limit_machines_decided(mut self, value: usize) -> Self {
        self.limit_machines_decided = Some(value);
        self
    }

    pub fn limit_machines_undecided(mut self, value: usize) -> Self {
        self.limit_machines_undecided = Some(value);
        self
    }

    pub fn result_path(mut self, path: &str) -> Self {
        self.result_path = Some(path.to_string());
        self
    }

    pub fn step_limit(mut self, step_limit: StepBig) -> Self {
        self.step_limit = Some(step_limit);
        self
    }

    pub fn tape_length(mut self, tape_length: usize) -> Self {
        self.tape_length = Some(tape_length);
        self
    }

    pub fn use_local_time(mut self, value_false_is_utc: bool) -> Self {
        self.use_local_time = Some(value_false_is_utc);
        self
    }

    pub fn verify_cost_function(mut self, value: bool) -> Self {
        self.verify_cost_function = Some(value);
        self
    }

    pub fn build(self) -> Config {
        let mut config = Config {
            n_states: self.n_states,
            tape_length: self.tape_length.unwrap_or(self.ref_config.tape_length),
            step_limit: self.step_limit,
            file_id_range: self.file_id_range,
            batch_size: self.batch_size.unwrap_or(self.ref_config.batch_size),
            limit_machines_decided: self
                .limit_machines_decided
                .unwrap_or(self.ref_config.limit_machines_decided),
            limit_machines_undecided: self
                .limit_machines_undecided
                .unwrap_or(self.ref_config.limit_machines_undecided),
            cpu_utilization_percent: self
                .cpu_utilization_percent
                .unwrap_or(self.ref_config.cpu_utilization_percent),
            verify_cost_function: self
                .verify_cost_function
                .unwrap_or(self.ref_config.verify_cost_function),
            result_path: self.result_path.unwrap_or(self.ref_config.result_path),
            creation_time: SystemTime::now(),
            use_local_time: self
                .use_local_time
                .unwrap_or(self.ref_config.use_local_time),
        };

        if config.tape_length == 0 {
            log::warn!("Tape length 0 is not allowed, using tape length 1.");
            config.tape_length = 1;
        }
        if config.batch_size == 0 {
            log::warn!("Batch size 0 is not allowed, using {BATCH_SIZE_FILE}.");
            config.batch_size = BATCH_SIZE_FILE;
        }

        config
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locale = user_locale();
        let step_limit = match self.step_limit {
            Some(limit) => limit.to_formatted_string(&locale),
            None => "configuration bound".to_string(),
        };
        writeln!(
            f,
            "BB{} LBA, Tape Length: {}, Limit Steps: {}, Configuration Bound: {}",
            self.n_states,
            self.tape_length,
            step_limit,
            Self::configuration_bound(self.n_states, self.tape_length).to_formatted_string(&locale),
        )?;
        write!(
            f,
            "Batch Size: {}, File Id Range: {}, Verify Cost Function: {}",
            self.batch_size.to_formatted_string(&locale),
            self.file_id_range_to_string(),
            self.verify_cost_function
        )
    }
}

pub fn user_locale() -> num_format::Locale {
    // TODO get user locale
    num_format::Locale::en
}
