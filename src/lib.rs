//! Decider for translated cyclers on linear bounded automata (Turing machines on a tape of fixed length).
//!
//! The library runs a machine on a bounded tape, captures tape records whenever the head reaches a new
//! extreme position in a state, and identifies a repeating pattern which is shifted along the tape.
//! For those machines a cost function `coefficient * tape_length + constant` is derived, which predicts
//! the number of steps until the machine halts for any tape length.
//!
//! Start with [decider::decider_translated_cycler::DeciderTranslatedCycler] for single machines or
//! [decider::decider_engine] to run a machine database.

pub mod config;
pub mod data_provider;
pub mod decider;
pub mod machine_binary;
pub mod machine_info;
pub mod reporter;
pub mod status;
pub mod tape;
pub mod toml;
pub mod transition_binary;
pub mod utils;

/// This is used to define the CPU usage during data provider and decider run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CoreUsage {
    /// Data provider and decider run on the calling thread.
    SingleCore,
    /// The data provider runs on the calling thread, the batches are decided in scoped threads.
    #[default]
    SingleCoreDataProviderMultiCoreDecider,
}
