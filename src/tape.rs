//! Bounded tape for linear bounded automata. Each cell holds the symbol and the step at which the
//! head last wrote to it. The visit time is needed to decide which part of a tape record is stale.

use std::fmt::Display;

use crate::config::{Config, StepBig};

/// This trait provides the functions shared by tapes, which allows to switch tapes in the deciders.
pub trait Tape: Display {
    fn new(config: &Config) -> Self;

    /// Resets the tape for a new machine.
    fn clear(&mut self);

    /// Returns the ones which are set in the tape.
    fn count_ones(&self) -> u32;

    /// Returns the number of cells of the tape.
    fn tape_size_cells(&self) -> u32;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TapeCell {
    pub symbol: u8,
    /// Step number of the last write to this cell, None if never visited.
    pub last_visit: Option<StepBig>,
}

impl TapeCell {
    /// True if the cell was written at or after the given step.
    #[inline]
    pub fn is_visited_since(&self, step_no: StepBig) -> bool {
        matches!(self.last_visit, Some(visit) if visit >= step_no)
    }
}

/// Tape of fixed length, the head position is held by the decider data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeLba {
    cells: Vec<TapeCell>,
}

impl TapeLba {
    pub fn new_with_length(tape_length: usize) -> Self {
        Self {
            cells: vec![TapeCell::default(); tape_length],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cell(&self, pos: usize) -> TapeCell {
        self.cells[pos]
    }

    pub fn cells(&self) -> &[TapeCell] {
        &self.cells
    }

    #[inline]
    pub fn symbol(&self, pos: usize) -> u8 {
        self.cells[pos].symbol
    }

    /// Writes the symbol and marks the cell as visited in this step.
    #[inline]
    pub fn write(&mut self, pos: usize, symbol: u8, step_no: StepBig) {
        self.cells[pos] = TapeCell {
            symbol,
            last_visit: Some(step_no),
        };
    }

    /// Tape as symbols with the head cell in brackets, e.g. 10\[1\]00.
    pub fn to_string_with_head(&self, pos: usize) -> String {
        let mut s = String::with_capacity(self.cells.len() + 2);
        for (i, cell) in self.cells.iter().enumerate() {
            if i == pos {
                s.push('[');
                s.push((cell.symbol + b'0') as char);
                s.push(']');
            } else {
                s.push((cell.symbol + b'0') as char);
            }
        }
        s
    }
}

impl Tape for TapeLba {
    fn new(config: &Config) -> Self {
        Self::new_with_length(config.tape_length())
    }

    fn clear(&mut self) {
        self.cells.fill(TapeCell::default());
    }

    fn count_ones(&self) -> u32 {
        self.cells.iter().filter(|c| c.symbol == 1).count() as u32
    }

    fn tape_size_cells(&self) -> u32 {
        self.cells.len() as u32
    }
}

impl Display for TapeLba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for cell in self.cells.iter() {
            write!(f, "{}", cell.symbol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_marks_visit() {
        let config = Config::builder(2).tape_length(5).build();
        let mut tape = TapeLba::new(&config);
        assert_eq!(5, tape.len());
        tape.write(1, 1, 7);
        tape.write(3, 0, 9);
        assert_eq!(1, tape.count_ones());
        assert!(tape.cell(1).is_visited_since(7));
        assert!(!tape.cell(1).is_visited_since(8));
        assert!(!tape.cell(0).is_visited_since(0));
        assert_eq!(Some(9), tape.cell(3).last_visit);
        assert_eq!("0[1]000", tape.to_string_with_head(1));
        assert_eq!("01000", tape.to_string());

        tape.clear();
        assert_eq!(0, tape.count_ones());
        assert_eq!(None, tape.cell(3).last_visit);
    }
}
