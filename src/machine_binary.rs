//! The [MachineBinary] holds the transitions for one machine where the symbol can only be 0 or 1.
//! This is a single column array with an additional first line. The transition for state/symbol is
//! calculated by state * 2 + symbol with state A=1, so C1 would become 3*2+1 = transitions[7]. \
//! Transition[0] contains the number of states used, therefore use either new_with_n_states or one of the
//! parsing functions.
//!
//! Use TryFrom to create a machine from Standard TM Text Format.

use std::fmt::Display;

use num_format::ToFormattedString;

use crate::{
    config::{IdBig, MAX_STATES, NUM_FIELDS},
    transition_binary::{
        TransitionBinary, TransitionError, TransitionType, TRANSITION_BINARY_UNUSED,
        TRANSITION_SYM2_UNUSED,
    },
};

/// Contains the transitions for one turing machine. \
/// As state 0 is undefined and to avoid number shifting to access the data for each state, the line 0 is unused.
/// The 2 field wide table is reduced to a single dimensional array, with access by state*2 + symbol,
/// e.g. C1 is field 3*2+1 = 7.
pub type TransitionTableBinaryArray1D = [TransitionBinary; NUM_FIELDS];
pub const TRANSITION_TABLE_BINARY_DEFAULT: TransitionTableBinaryArray1D =
    [TRANSITION_SYM2_UNUSED; NUM_FIELDS];
const FILTER_TABLE_N_STATES: TransitionType = 0b0000_1111;
/// Size of one machine in the machine database: 5 states * 2 symbols * 3 bytes.
pub const MACHINE_DB_BYTES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineBinary {
    /// Transition\[0\] holds n_states in bits 0-3.
    pub transitions: TransitionTableBinaryArray1D,
}

impl MachineBinary {
    /// Creates a new machine and stores the n_states.
    pub fn new_with_n_states(transitions: TransitionTableBinaryArray1D, n_states: usize) -> Self {
        let mut machine = Self { transitions };
        machine.set_n_states(n_states);
        machine
    }

    /// Creates a new empty transition table and stores the n_states.
    pub fn new_default(n_states: usize) -> MachineBinary {
        Self::new_with_n_states(TRANSITION_TABLE_BINARY_DEFAULT, n_states)
    }

    /// Creates the transition table from the 30 bytes of the machine database. \
    /// Each state holds 6 bytes: write, move (0 right, 1 left), next state for symbol 0, then for symbol 1. \
    /// States without any defined transition at the end are not counted.
    pub fn try_from_db_bytes(bytes: &[u8]) -> Result<Self, MachineError> {
        if bytes.len() != MACHINE_DB_BYTES {
            return Err(MachineError::InvalidDbLength(bytes.len()));
        }
        let mut transitions = TRANSITION_TABLE_BINARY_DEFAULT;
        let mut n_states = 0;
        for (i, chunk) in bytes.chunks_exact(3).enumerate() {
            let tr = [chunk[0], chunk[1], chunk[2]];
            transitions[i + 2] = TransitionBinary::try_new_from_db_bytes(tr)
                .map_err(|e| MachineError::Transition(i + 2, e))?;
            if !transitions[i + 2].is_halt() {
                n_states = n_states.max(i / 2 + 1);
                n_states = n_states.max(transitions[i + 2].state() as usize);
            }
        }

        Ok(Self::new_with_n_states(transitions, n_states.max(1)))
    }

    /// Creates the transition table from the Standard TM Text Format or returns an error. \
    /// <https://www.sligocki.com/2022/10/09/standard-tm-format.html>
    ///
    /// # Examples
    /// ```
    /// use bb_lba::machine_binary::MachineBinary;
    ///
    /// let tm_in = "1RB0LB_1LA0RA";
    /// let m = MachineBinary::try_from_standard_tm_text_format(tm_in).unwrap();
    /// assert_eq!(2, m.n_states());
    /// assert_eq!(tm_in, m.to_standard_tm_text_format());
    /// ```
    pub fn try_from_standard_tm_text_format(
        standard_tm_text_format: &str,
    ) -> Result<Self, MachineError> {
        let lines: Vec<&str> = standard_tm_text_format.trim().split('_').collect();
        if lines.len() > MAX_STATES {
            return Err(MachineError::TooManyStates(lines.len()));
        }
        let mut transitions = TRANSITION_TABLE_BINARY_DEFAULT;
        for (i, line) in lines.iter().enumerate() {
            let bytes = line.as_bytes();
            if bytes.len() != 6 {
                return Err(MachineError::InvalidLine(line.to_string()));
            }
            for symbol in 0..2 {
                let field = (i + 1) * 2 + symbol;
                let tr = [
                    bytes[symbol * 3],
                    bytes[symbol * 3 + 1],
                    bytes[symbol * 3 + 2],
                ];
                transitions[field] =
                    TransitionBinary::try_new(tr).map_err(|e| MachineError::Transition(field, e))?;
                if transitions[field].state() as usize > lines.len() {
                    return Err(MachineError::StateNotDefined(field));
                }
            }
        }

        Ok(Self::new_with_n_states(transitions, lines.len()))
    }

    /// Returns the transition table as standard TM Text format. Display returns this.
    pub fn to_standard_tm_text_format(&self) -> String {
        let mut transition_texts = Vec::new();
        for pair in self.transitions_used().chunks(2) {
            transition_texts.push(format!("{}{}", pair[0], pair[1]));
        }

        transition_texts.join("_")
    }

    /// Returns the transition table as formatted table (for print output).
    pub fn to_table_string(&self, show_header_0_1: bool) -> String {
        let mut s = String::new();
        if show_header_0_1 {
            s.push_str("   0   1\n");
        }

        let lines: Vec<String> = self
            .transitions_used()
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| format!("{} {} {}", (i as u8 + b'A') as char, pair[0], pair[1]))
            .collect();
        s.push_str(&lines.join("\n"));

        s
    }

    /// Returns the transition for the array id, which is state * 2 + symbol. A0 = 2.
    #[inline]
    pub fn transition(&self, array_id: usize) -> TransitionBinary {
        self.transitions[array_id]
    }

    /// Returns the used section of the transition table, which is from 2..n_states * 2 + 2.
    pub fn transitions_used(&self) -> &[TransitionBinary] {
        &self.transitions[2..self.n_states() * 2 + 2]
    }

    /// Returns the number of states used.
    #[inline]
    pub fn n_states(&self) -> usize {
        (self.transitions[0].transition & FILTER_TABLE_N_STATES) as usize
    }

    /// Sets the n_states in the first array element.
    fn set_n_states(&mut self, n_states: usize) {
        self.transitions[0].transition = TRANSITION_BINARY_UNUSED | n_states as TransitionType;
    }

    /// Returns the machine table field name from the transition array id in an 1D-array, e.g. 2 -> A0.
    pub fn array_id_to_field_name(arr_id: usize) -> String {
        let state = ((arr_id / 2) as u8 + b'A' - 1) as char;
        let symbol = ((arr_id & 1) as u8 + b'0') as char;
        format!("{state}{symbol}")
    }
}

impl Default for MachineBinary {
    fn default() -> Self {
        Self {
            transitions: TRANSITION_TABLE_BINARY_DEFAULT,
        }
    }
}

impl TryFrom<&str> for MachineBinary {
    type Error = MachineError;

    fn try_from(tm_text_format: &str) -> Result<Self, Self::Error> {
        Self::try_from_standard_tm_text_format(tm_text_format)
    }
}

impl Display for MachineBinary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_standard_tm_text_format())
    }
}

/// This struct is used in DataProvider to allow an index id. \
/// To keep the size small, instead of Option<id> the IdBig::MAX is used to indicate not used.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MachineId {
    id: IdBig,
    machine: MachineBinary,
}

impl MachineId {
    pub fn new(id: IdBig, machine: MachineBinary) -> Self {
        Self { id, machine }
    }

    pub fn new_no_id(machine: MachineBinary) -> Self {
        Self {
            id: IdBig::MAX,
            machine,
        }
    }

    /// Returns the id, instead of Option, the unused case is: IdBig::MAX
    pub fn id(&self) -> IdBig {
        self.id
    }

    pub fn id_as_option(&self) -> Option<IdBig> {
        if self.has_id() {
            Some(self.id)
        } else {
            None
        }
    }

    /// Returns the id as 4 byte big endian, the format of the result files. \
    /// Fails if the machine has no id or the id does not fit into u32.
    pub fn id_as_be_bytes(&self) -> Result<[u8; 4], MachineError> {
        if !self.has_id() {
            return Err(MachineError::NoId);
        }
        u32::try_from(self.id)
            .map(|id| id.to_be_bytes())
            .map_err(|_| MachineError::IdOutOfRange(self.id))
    }

    pub fn has_id(&self) -> bool {
        self.id != IdBig::MAX
    }

    pub fn machine(&self) -> &MachineBinary {
        &self.machine
    }

    pub fn n_states(&self) -> usize {
        self.machine.n_states()
    }

    pub fn to_standard_tm_text_format(&self) -> String {
        self.machine.to_standard_tm_text_format()
    }
}

impl Default for MachineId {
    fn default() -> Self {
        Self::new_no_id(MachineBinary::default())
    }
}

impl From<&MachineBinary> for MachineId {
    fn from(mb: &MachineBinary) -> Self {
        Self::new_no_id(*mb)
    }
}

impl TryFrom<&str> for MachineId {
    type Error = MachineError;

    fn try_from(tm_text_format: &str) -> Result<Self, Self::Error> {
        let m = MachineBinary::try_from_standard_tm_text_format(tm_text_format)?;

        Ok(MachineId::new_no_id(m))
    }
}

impl Display for MachineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_id() {
            let locale = &crate::config::user_locale();
            write!(
                f,
                "ID: {} {}",
                self.id.to_formatted_string(locale),
                self.machine
            )
        } else {
            write!(f, "{}", self.machine)
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum MachineError {
    /// Array field and the error of the transition
    Transition(usize, TransitionError),
    InvalidLine(String),
    InvalidDbLength(usize),
    TooManyStates(usize),
    /// Array field which refers to a state not in the table
    StateNotDefined(usize),
    NoId,
    IdOutOfRange(IdBig),
}

impl std::error::Error for MachineError {}

impl Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineError::Transition(field, e) => write!(
                f,
                "Transition {}: {e}",
                MachineBinary::array_id_to_field_name(*field)
            ),
            MachineError::InvalidLine(line) => {
                write!(f, "State line '{line}' must hold exactly two transitions")
            }
            MachineError::InvalidDbLength(len) => {
                write!(f, "Machine data must have {MACHINE_DB_BYTES} bytes, got {len}")
            }
            MachineError::TooManyStates(n) => {
                write!(f, "{n} states given, this format is limited to {MAX_STATES} states")
            }
            MachineError::StateNotDefined(field) => write!(
                f,
                "Transition {} refers to an undefined state",
                MachineBinary::array_id_to_field_name(*field)
            ),
            MachineError::NoId => write!(f, "Machine has no id"),
            MachineError::IdOutOfRange(id) => write!(f, "Id {id} does not fit into 4 bytes"),
        }
    }
}

/// Some notable machines which may be used for testing and benchmarks.
#[derive(Debug, Clone, Copy)]
pub enum NotableMachineBinary {
    BB2Max,
    BB3Max,
    BB4Max,
    BB5Max,
    /// Writes 1 and moves right until the tape end, then halts.
    ScanRight,
    /// Advances one cell every 3 steps with the pattern 1 0.
    TranslatedPeriod3,
}

impl NotableMachineBinary {
    pub fn tm_text_format(&self) -> &'static str {
        match self {
            NotableMachineBinary::BB2Max => "1RB1LB_1LA---",
            NotableMachineBinary::BB3Max => "1RB---_1LB0RC_1LC1LA",
            NotableMachineBinary::BB4Max => "1RB1LB_1LA0LC_---1LD_1RD0RA",
            NotableMachineBinary::BB5Max => "1RB1LC_1RC1RB_1RD0LE_1LA1LD_---0LA",
            NotableMachineBinary::ScanRight => "1RB---_1RA---",
            NotableMachineBinary::TranslatedPeriod3 => "1RB---_0LC---_---1RA",
        }
    }

    pub fn machine(&self) -> MachineBinary {
        // The texts above are constants and valid.
        MachineBinary::try_from_standard_tm_text_format(self.tm_text_format()).unwrap_or_default()
    }

    pub fn machine_id(&self) -> MachineId {
        MachineId::new_no_id(self.machine())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tm_text_format_both_directions() {
        let tm_in = "1RB1LC_1RC1RB_1RD0LE_1LA1LD_---0LA";
        let m = MachineBinary::try_from(tm_in).unwrap();
        assert_eq!(5, m.n_states());
        assert_eq!(tm_in, m.to_string());
        // C1 = 3 * 2 + 1
        assert_eq!("0LE", m.transition(7).to_string());
        assert!(m.transition(10).is_halt());
    }

    #[test]
    fn table_string() {
        let m = NotableMachineBinary::BB2Max.machine();
        assert_eq!("   0   1\nA 1RB 1LB\nB 1LA ---", m.to_table_string(true));
    }

    #[test]
    fn invalid_text_rejected() {
        assert_eq!(
            Err(MachineError::InvalidLine("1RB".to_string())),
            MachineBinary::try_from("1RB")
        );
        assert_eq!(
            Err(MachineError::StateNotDefined(3)),
            MachineBinary::try_from("1RB1RC_1LA---")
        );
        assert_eq!(
            Err(MachineError::TooManyStates(6)),
            MachineBinary::try_from("1RB---_1RB---_1RB---_1RB---_1RB---_1RB---")
        );
    }

    #[test]
    fn db_bytes_to_machine() {
        let mut bytes = [0u8; MACHINE_DB_BYTES];
        // A0 1RB, A1 ---, B0 0LA, B1 explicit halt state 6
        bytes[0..6].copy_from_slice(&[1, 0, 2, 0, 0, 0]);
        bytes[6..12].copy_from_slice(&[0, 1, 1, 1, 1, 6]);
        let m = MachineBinary::try_from_db_bytes(&bytes).unwrap();
        assert_eq!(2, m.n_states());
        assert_eq!("1RB---_0LA---", m.to_standard_tm_text_format());

        assert_eq!(
            Err(MachineError::InvalidDbLength(29)),
            MachineBinary::try_from_db_bytes(&bytes[1..])
        );
    }

    #[test]
    fn id_as_be_bytes() {
        let m = MachineId::new(258, NotableMachineBinary::BB2Max.machine());
        assert_eq!(Ok([0, 0, 1, 2]), m.id_as_be_bytes());
        let m = MachineId::new(u32::MAX as u64 + 1, NotableMachineBinary::BB2Max.machine());
        assert_eq!(
            Err(MachineError::IdOutOfRange(u32::MAX as u64 + 1)),
            m.id_as_be_bytes()
        );
        assert_eq!(
            Err(MachineError::NoId),
            NotableMachineBinary::BB2Max.machine_id().id_as_be_bytes()
        );
    }
}
