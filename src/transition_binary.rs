//! This file contains the transition for binary Turing machines. \
//! The transition does not use enums. Instead the data is packed into the lower byte of an i16,
//! which allows direct array index calculation and fast comparison. \
//! With 2 bytes per transition, a machine with 5 states fits into 24 bytes. \
//! See struct [TransitionBinary] for details.

use crate::config::MAX_STATES;

/// Number format to represent a transition (lower 8 bit used for state, symbol and direction).
pub type TransitionType = i16;
/// Number format for direction which is either -1 or 1.
pub type DirectionType = i16;

pub const TRANSITION_SYM2_UNUSED: TransitionBinary = TransitionBinary {
    transition: TRANSITION_BINARY_UNUSED,
};
/// This is the undefined transition ('---'), the halt signal of the machine.
pub const TRANSITION_SYM2_HOLD: TransitionBinary = TransitionBinary {
    transition: TRANSITION_HOLD,
};

const FILTER_SYMBOL_0_1: TransitionType = 0b0000_0001;
const FILTER_DIR: TransitionType = 0b1100_0000;
pub const FILTER_STATE: TransitionType = 0b0001_1110;
pub const TRANSITION_HOLD: TransitionType = DIRECTION_UNDEFINED;
pub const TRANSITION_BINARY_UNUSED: TransitionType = 0b0000_0000;
const SYMBOL_ONE: TransitionType = 0b0000_0001;
const DIRECTION_UNDEFINED: TransitionType = 0b1000_0000;
const TO_RIGHT: TransitionType = 0b1100_0000;
const TO_LEFT: TransitionType = 0b0100_0000;
pub const STATE_HOLD_SYM2: TransitionType = 0;
/// Next state byte used by some LBA databases as explicit halt state ('H' = 6).
const DB_STATE_HALT: u8 = 6;

/// A single transition of a binary machine, packed into bits:
/// - symbol: bit 0, the symbol to write
/// - next state: bits 1-4, the value is naturally doubled, so state_x2 + symbol read is the
///   array id of the next field. 0 means halt.
/// - direction: bits 6, 7: right 0b11, left 0b01, 0b10 for undefined (halt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionBinary {
    pub transition: TransitionType,
}

impl TransitionBinary {
    /// New transition from human readable format, e.g. 1RB, 1RZ or ---. \
    /// \[symbol,direction,state\]
    /// - symbol: 0 or 1 (char or number), '-' for the undefined transition.
    /// - direction: L or R, alternatively 1 for left and 0 for right (bbchallenge binary format).
    /// - next state: 1-9 (char or number) or A-Y. 0 or Z represent halt.
    pub fn try_new(transition_text: [u8; 3]) -> Result<Self, TransitionError> {
        let mut transition_bits = match transition_text[0] {
            b'0' | 0 => 0,
            b'1' | 1 => SYMBOL_ONE,
            b'-' => return Ok(TRANSITION_SYM2_HOLD),
            _ => return Err(TransitionError::InvalidSymbol(transition_text[0])),
        };

        let state_char = transition_text[2];
        let num_state = match state_char {
            0 | b'Z' => 0,
            1..=9 => state_char,
            b'1'..=b'9' => state_char - b'0',
            b'A'..=b'Y' => state_char - b'A' + 1,
            _ => return Err(TransitionError::InvalidStateChar(state_char)),
        };
        if num_state as usize > MAX_STATES {
            return Err(TransitionError::StateOutOfRange(num_state));
        }
        transition_bits |= (num_state as TransitionType) << 1;

        match transition_text[1] {
            b'L' | 1 => transition_bits |= TO_LEFT,
            b'R' | 0 => transition_bits |= TO_RIGHT,
            _ => return Err(TransitionError::InvalidDirection(transition_text[1])),
        };

        Ok(Self {
            transition: transition_bits,
        })
    }

    /// New transition from the three bytes of the machine database (write, move, next state). \
    /// Next state 0 is the undefined transition, 6 is an explicit halt state. Both result in [TRANSITION_SYM2_HOLD].
    pub fn try_new_from_db_bytes(bytes: [u8; 3]) -> Result<Self, TransitionError> {
        match bytes[2] {
            0 | DB_STATE_HALT => Ok(TRANSITION_SYM2_HOLD),
            _ => Self::try_new(bytes),
        }
    }

    pub fn is_dir_right(&self) -> bool {
        self.transition & FILTER_DIR == TO_RIGHT
    }

    pub fn is_dir_left(&self) -> bool {
        self.transition & FILTER_DIR == TO_LEFT
    }

    /// returns direction for left = -1, for right 1
    pub fn direction(&self) -> DirectionType {
        ((self.transition & FILTER_DIR) >> 6) as DirectionType - 2
    }

    pub fn state(&self) -> TransitionType {
        (self.transition & FILTER_STATE) >> 1
    }

    /// returns the state doubled as usize for array access
    pub fn state_x2(&self) -> usize {
        (self.transition & FILTER_STATE) as usize
    }

    /// Returns the state as char (A,B,C,...), Z for halt.
    pub fn state_to_char(&self) -> char {
        if self.is_halt() {
            'Z'
        } else {
            (self.state() as u8 + b'A' - 1) as char
        }
    }

    /// returns 0 or 1
    pub fn symbol(&self) -> u8 {
        (self.transition & FILTER_SYMBOL_0_1) as u8
    }

    pub fn is_halt(&self) -> bool {
        self.transition & FILTER_STATE == STATE_HOLD_SYM2
    }
}

impl Default for TransitionBinary {
    fn default() -> Self {
        TRANSITION_SYM2_UNUSED
    }
}

impl TryFrom<&str> for TransitionBinary {
    type Error = TransitionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes: [u8; 3] = value
            .as_bytes()
            .try_into()
            .map_err(|_| TransitionError::InvalidLength(value.len()))?;
        TransitionBinary::try_new(bytes)
    }
}

/// Displays the transition in standard format, e.g. 1RB
impl std::fmt::Display for TransitionBinary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.transition {
            TRANSITION_HOLD => write!(f, "---"),
            TRANSITION_BINARY_UNUSED => write!(f, "   "),
            _ => {
                let direction = match self.transition & FILTER_DIR {
                    TO_LEFT => 'L',
                    TO_RIGHT => 'R',
                    _ => return write!(f, "---"),
                };
                write!(f, "{}{direction}{}", self.symbol(), self.state_to_char())
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransitionError {
    InvalidLength(usize),
    InvalidSymbol(u8),
    InvalidDirection(u8),
    InvalidStateChar(u8),
    StateOutOfRange(u8),
}

impl std::error::Error for TransitionError {}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::InvalidLength(len) => {
                write!(f, "Transition must have length of 3, got {len}")
            }
            TransitionError::InvalidSymbol(s) => {
                write!(f, "Invalid symbol: '{}'", *s as char)
            }
            TransitionError::InvalidDirection(d) => {
                write!(f, "Invalid direction: '{}'", *d as char)
            }
            TransitionError::InvalidStateChar(s) => {
                write!(f, "Invalid state character: '{}'", *s as char)
            }
            TransitionError::StateOutOfRange(s) => {
                write!(f, "State {s} out of range (max {MAX_STATES})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_text_parsed() {
        let t = TransitionBinary::try_from("1LC").unwrap();
        assert_eq!(1, t.symbol());
        assert!(t.is_dir_left());
        assert_eq!(-1, t.direction());
        assert_eq!(3, t.state());
        assert_eq!(6, t.state_x2());
        assert_eq!("1LC", t.to_string());

        let t = TransitionBinary::try_from("0RA").unwrap();
        assert!(t.is_dir_right());
        assert_eq!(1, t.direction());
        assert_eq!(2, t.state_x2());
    }

    #[test]
    fn halt_transitions() {
        assert!(TransitionBinary::try_from("---").unwrap().is_halt());
        let t = TransitionBinary::try_from("1RZ").unwrap();
        assert!(t.is_halt());
        assert_eq!('Z', t.state_to_char());
        assert_eq!("1RZ", t.to_string());
        assert!(TRANSITION_SYM2_UNUSED.is_halt());
    }

    #[test]
    fn db_bytes_parsed() {
        // write 1, move left, next state C
        let t = TransitionBinary::try_new_from_db_bytes([1, 1, 3]).unwrap();
        assert_eq!("1LC", t.to_string());
        assert_eq!(
            TRANSITION_SYM2_HOLD,
            TransitionBinary::try_new_from_db_bytes([1, 0, 0]).unwrap()
        );
        assert_eq!(
            TRANSITION_SYM2_HOLD,
            TransitionBinary::try_new_from_db_bytes([0, 1, 6]).unwrap()
        );
        assert_eq!(
            Err(TransitionError::InvalidDirection(2)),
            TransitionBinary::try_new_from_db_bytes([0, 2, 1])
        );
    }

    #[test]
    fn invalid_transitions_rejected() {
        assert_eq!(
            Err(TransitionError::InvalidLength(2)),
            TransitionBinary::try_from("1R")
        );
        assert_eq!(
            Err(TransitionError::InvalidSymbol(b'2')),
            TransitionBinary::try_from("2RA")
        );
        assert_eq!(
            Err(TransitionError::StateOutOfRange(6)),
            TransitionBinary::try_from("1RF")
        );
        assert_eq!(
            Err(TransitionError::InvalidStateChar(b'-')),
            TransitionBinary::try_from("1R-")
        );
    }
}
