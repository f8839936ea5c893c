//! Tape records for the translated cycler. \
//! A record is a full copy of the tape taken when the head reaches a new extreme position in a state
//! while scanning in one direction. Two records of the same field (state and symbol under the head)
//! are compared to find a tape pattern which is shifted along the tape.
//!
//! The [RecordStore] holds the records by field and the extent (min and max position) each state reached.
//! Both are cleared whenever the head bounces at a tape end.

use std::fmt::Display;

use crate::{
    config::{StepBig, MAX_STATES, NUM_FIELDS},
    tape::{TapeCell, TapeLba},
};

/// Direction in which the head currently sweeps over the tape.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    #[default]
    Right,
    Left,
}

impl ScanDirection {
    pub fn reversed(&self) -> Self {
        match self {
            ScanDirection::Right => ScanDirection::Left,
            ScanDirection::Left => ScanDirection::Right,
        }
    }

    /// New scan direction after the head bounced at position pos. The direction points away from the
    /// tape end which was hit. On a tape with a single cell both ends are hit, the direction is flipped.
    pub fn after_bounce(&self, pos: usize, tape_length: usize) -> Self {
        if tape_length > 1 {
            if pos == 0 {
                return ScanDirection::Right;
            }
            if pos == tape_length - 1 {
                return ScanDirection::Left;
            }
        }
        self.reversed()
    }
}

impl Display for ScanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanDirection::Right => write!(f, "right"),
            ScanDirection::Left => write!(f, "left"),
        }
    }
}

/// Snapshot of the tape, the step and the head position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub tape: Vec<TapeCell>,
    pub time: StepBig,
    pub pos: usize,
}

impl Record {
    pub fn new(tape: &TapeLba, time: StepBig, pos: usize) -> Self {
        Self {
            tape: tape.cells().to_vec(),
            time,
            pos,
        }
    }

    #[inline]
    fn symbol_at(&self, pos: Option<usize>) -> Option<u8> {
        pos.and_then(|p| self.tape.get(p)).map(|c| c.symbol)
    }

    /// Checks if this record shows the tape of the past record shifted in scan direction. \
    /// The past record must be taken before this one while scanning in the same direction.
    ///
    /// Behind the head (trailing side) only the cells which have been visited since the past record
    /// are relevant. Once a cell is found which was not written since, the older part of the tape is
    /// not compared any more. Ahead of the head (leading side) all cells up to the tape end must match.
    pub fn is_translation_of(&self, past: &Record, direction: ScanDirection) -> bool {
        self.is_translation_of_trailing_only(past, direction)
            && self.is_leading_side_equal(past, direction)
    }

    /// Compares only the trailing side, see [Self::is_translation_of]. This can identify cycles which
    /// did not yet write the leading cells, so it is less strict.
    pub fn is_translation_of_trailing_only(&self, past: &Record, direction: ScanDirection) -> bool {
        let len = self.tape.len();
        let max_offset = match direction {
            ScanDirection::Right => past.pos,
            ScanDirection::Left => len.saturating_sub(past.pos + 1),
        };
        for offset in 1..=max_offset {
            let (past_cell_pos, current_cell_pos) = match direction {
                ScanDirection::Right => (past.pos - offset, self.pos.checked_sub(offset)),
                ScanDirection::Left => (past.pos + offset, Some(self.pos + offset)),
            };
            // stale part of the tape, not touched since the past record
            if !self.tape[past_cell_pos].is_visited_since(past.time) {
                return true;
            }
            if self.symbol_at(current_cell_pos) != Some(past.tape[past_cell_pos].symbol) {
                return false;
            }
        }

        true
    }

    fn is_leading_side_equal(&self, past: &Record, direction: ScanDirection) -> bool {
        let len = self.tape.len();
        let mut offset = 0;
        loop {
            let (current_cell_pos, past_cell_pos) = match direction {
                ScanDirection::Right => (Some(self.pos + offset), Some(past.pos + offset)),
                ScanDirection::Left => (self.pos.checked_sub(offset), past.pos.checked_sub(offset)),
            };
            match (current_cell_pos, past_cell_pos) {
                (Some(c), Some(p)) if c < len && p < past.tape.len() => {
                    if self.tape[c].symbol != past.tape[p].symbol {
                        return false;
                    }
                }
                _ => return true,
            }
            offset += 1;
        }
    }

    /// Calculates the translation between the past record and this one.
    /// # Returns
    /// An error if the head did not move or the distance does not divide the period.
    pub fn translation_from(&self, past: &Record) -> Result<Translation, TranslationError> {
        let period = self.time - past.time;
        let distance = self.pos.abs_diff(past.pos) as StepBig;
        if distance == 0 {
            return Err(TranslationError::NoDistance { period });
        }
        if period % distance != 0 {
            return Err(TranslationError::NonDivisiblePeriod { period, distance });
        }

        Ok(Translation {
            past_time: past.time,
            past_pos: past.pos,
            steps_per_cell: period / distance,
        })
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record step {:5} pos {:3}: ", self.time, self.pos)?;
        for (i, cell) in self.tape.iter().enumerate() {
            if i == self.pos {
                write!(f, "[{}]", cell.symbol)?;
            } else {
                write!(f, "{}", cell.symbol)?;
            }
        }
        Ok(())
    }
}

/// A repeating pattern found between a past record and the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// Step of the past record, this is where the periodic section starts.
    pub past_time: StepBig,
    pub past_pos: usize,
    /// Period divided by the distance the pattern moved.
    pub steps_per_cell: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationError {
    NoDistance { period: StepBig },
    NonDivisiblePeriod { period: StepBig, distance: StepBig },
}

impl std::error::Error for TranslationError {}

impl Display for TranslationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationError::NoDistance { period } => {
                write!(f, "Records {period} steps apart have the same head position")
            }
            TranslationError::NonDivisiblePeriod { period, distance } => write!(
                f,
                "Period {period} is not divisible by the distance {distance}"
            ),
        }
    }
}

/// Lowest and highest head position reached by a state since the last bounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug)]
pub struct RecordStore {
    /// Records by field id (state * 2 + symbol), in order of capture.
    records: [Vec<Record>; NUM_FIELDS],
    /// Extent by state (A=1)
    extents: [Option<Extent>; MAX_STATES + 1],
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            records: core::array::from_fn(|_| Vec::new()),
            extents: [None; MAX_STATES + 1],
        }
    }

    pub fn clear(&mut self) {
        for records in self.records.iter_mut() {
            records.clear();
        }
        self.extents = [None; MAX_STATES + 1];
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(|r| r.is_empty()) && self.extents.iter().all(|e| e.is_none())
    }

    /// True if the state did not reach this position before in scan direction.
    #[inline]
    pub fn is_new_extreme(&self, state: usize, pos: usize, direction: ScanDirection) -> bool {
        match self.extents[state] {
            None => true,
            Some(extent) => match direction {
                ScanDirection::Right => pos > extent.max,
                ScanDirection::Left => pos < extent.min,
            },
        }
    }

    pub fn update_extent(&mut self, state: usize, pos: usize) {
        self.extents[state] = Some(match self.extents[state] {
            None => Extent { min: pos, max: pos },
            Some(extent) => Extent {
                min: extent.min.min(pos),
                max: extent.max.max(pos),
            },
        });
    }

    pub fn extent(&self, state: usize) -> Option<Extent> {
        self.extents[state]
    }

    /// True if no extent reaches beyond the tape.
    pub fn is_extent_in_bounds(&self, tape_length: usize) -> bool {
        self.extents
            .iter()
            .flatten()
            .all(|extent| extent.max < tape_length)
    }

    pub fn push(&mut self, field: usize, record: Record) {
        self.records[field].push(record);
    }

    pub fn records(&self, field: usize) -> &[Record] {
        &self.records[field]
    }

    pub fn num_records(&self) -> usize {
        self.records.iter().map(|r| r.len()).sum()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a record from symbols and visit steps (None as u64::MAX).
    fn record(symbols: &[u8], visits: &[StepBig], time: StepBig, pos: usize) -> Record {
        let tape = symbols
            .iter()
            .zip(visits.iter())
            .map(|(&symbol, &visit)| TapeCell {
                symbol,
                last_visit: if visit == StepBig::MAX {
                    None
                } else {
                    Some(visit)
                },
            })
            .collect();
        Record { tape, time, pos }
    }

    const N: StepBig = StepBig::MAX;

    #[test]
    fn record_is_translation_of_itself() {
        let r = record(&[1, 0, 1, 1, 0], &[0, 1, 2, 3, N], 4, 3);
        assert!(r.is_translation_of(&r.clone(), ScanDirection::Right));
        assert!(r.is_translation_of(&r.clone(), ScanDirection::Left));
    }

    #[test]
    fn shifted_pattern_moving_right() {
        // pattern 11 behind the head, shifted by 2 cells in 6 steps
        let past = record(&[1, 1, 0, 0, 0, 0], &[0, 1, N, N, N, N], 3, 2);
        let current = record(&[1, 1, 1, 1, 0, 0], &[0, 4, 6, 7, N, N], 9, 4);
        assert!(current.is_translation_of(&past, ScanDirection::Right));
        let translation = current.translation_from(&past).unwrap();
        assert_eq!(3, translation.steps_per_cell);
        assert_eq!(3, translation.past_time);
        assert_eq!(2, translation.past_pos);
    }

    #[test]
    fn trailing_mismatch_rejected() {
        // cell 1 was visited again, so it is compared with cell 3
        let past = record(&[1, 1, 0, 0, 0, 0], &[0, 1, N, N, N, N], 3, 2);
        let current = record(&[1, 1, 1, 0, 0, 0], &[0, 4, 6, 7, N, N], 9, 4);
        assert!(!current.is_translation_of(&past, ScanDirection::Right));
        assert!(!current.is_translation_of_trailing_only(&past, ScanDirection::Right));
    }

    #[test]
    fn stale_cells_are_not_compared() {
        // cell 0 differs, but was not visited since the past record at step 5
        let past = record(&[0, 1, 0, 0, 0], &[0, 4, N, N, N], 5, 2);
        let current = record(&[1, 1, 1, 0, 0], &[2, 6, 7, N, N], 8, 3);
        assert!(current.is_translation_of(&past, ScanDirection::Right));
    }

    #[test]
    fn leading_mismatch_rejected() {
        let past = record(&[1, 0, 0, 0, 0, 0], &[0, 1, N, N, N, N], 3, 2);
        let current = record(&[1, 0, 1, 0, 0, 1], &[0, 1, 4, 5, N, 0], 9, 4);
        assert!(current.is_translation_of_trailing_only(&past, ScanDirection::Right));
        assert!(!current.is_translation_of(&past, ScanDirection::Right));
    }

    #[test]
    fn shifted_pattern_moving_left() {
        let past = record(&[0, 0, 0, 0, 0, 1], &[N, N, N, N, 11, 10], 12, 3);
        let current = record(&[0, 0, 0, 1, 0, 1], &[N, N, 14, 15, 13, 10], 16, 1);
        assert!(current.is_translation_of(&past, ScanDirection::Left));
        assert_eq!(2, current.translation_from(&past).unwrap().steps_per_cell);
    }

    #[test]
    fn translation_errors() {
        let past = record(&[0, 0, 0], &[N, N, N], 0, 0);
        let same_pos = record(&[0, 0, 0], &[N, N, N], 4, 0);
        assert_eq!(
            Err(TranslationError::NoDistance { period: 4 }),
            same_pos.translation_from(&past)
        );
        let odd = record(&[0, 0, 0], &[N, N, N], 5, 2);
        assert_eq!(
            Err(TranslationError::NonDivisiblePeriod {
                period: 5,
                distance: 2
            }),
            odd.translation_from(&past)
        );
    }

    #[test]
    fn store_extents() {
        let mut store = RecordStore::new();
        assert!(store.is_empty());
        assert!(store.is_new_extreme(1, 0, ScanDirection::Right));
        store.update_extent(1, 3);
        store.push(2, record(&[0; 5], &[N; 5], 0, 3));
        assert!(!store.is_new_extreme(1, 3, ScanDirection::Right));
        assert!(store.is_new_extreme(1, 4, ScanDirection::Right));
        assert!(store.is_new_extreme(1, 2, ScanDirection::Left));
        assert!(store.is_extent_in_bounds(4));
        assert!(!store.is_extent_in_bounds(3));
        assert_eq!(1, store.num_records());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(None, store.extent(1));
    }

    #[test]
    fn bounce_direction() {
        assert_eq!(ScanDirection::Left, ScanDirection::Right.after_bounce(9, 10));
        assert_eq!(ScanDirection::Right, ScanDirection::Left.after_bounce(0, 10));
        assert_eq!(ScanDirection::Left, ScanDirection::Right.after_bounce(0, 1));
        assert_eq!(ScanDirection::Right, ScanDirection::Left.after_bounce(0, 1));
    }
}
