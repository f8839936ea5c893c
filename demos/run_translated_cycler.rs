//! This example shows how to use the translated cycler decider on single machines and on the LBA machine database.
//!
//! Run this with 'cargo run --example run_translated_cycler --release'.
//!
//! For the database run, the machine file must be available. Check the config.toml file in the working directory
//! and set 'machine_db_path' with the correct full or relative path.

use bb_lba::{
    config::Config,
    decider::{
        decider_engine, decider_result_worker, decider_translated_cycler::decide_translated_cycler,
        DeciderStandard,
    },
    machine_binary::NotableMachineBinary,
    toml::ConfigToml,
    CoreUsage,
};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Writes info and above to stderr, so progress and runtime mismatch warnings are visible.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

// This can be changed to evaluate a different section.
const FIRST_MACHINE_ID: u64 = 0;
const NUM_MACHINES: u64 = 100_000;
const TAPE_LENGTH: usize = 30;

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
    cost_function_for_tape_lengths();
    evaluate_machine_db();
}

/// The cost function does not depend on the tape length, but the steps do.
fn cost_function_for_tape_lengths() {
    let machine = NotableMachineBinary::TranslatedPeriod3.machine();
    for tape_length in [2, 5, 10, 30] {
        let status = decide_translated_cycler(&machine, tape_length);
        println!("{machine} L = {tape_length}: {status}");
    }
}

fn evaluate_machine_db() {
    let config_toml = ConfigToml::read_toml();
    let config = Config::builder(5)
        .tape_length(TAPE_LENGTH)
        .file_id_range(FIRST_MACHINE_ID..FIRST_MACHINE_ID + NUM_MACHINES)
        .limit_machines_undecided(100)
        .result_path(config_toml.result_path())
        .build();
    println!("{config}");

    // write the ids of all translated cyclers into the result directory
    let decider_config = DeciderStandard::TranslatedCycler
        .decider_config(&config)
        .with_result_worker(decider_result_worker::save_translated_cycler_ids);
    let result = decider_engine::run_decider_file(
        &decider_config,
        &config_toml,
        CoreUsage::SingleCoreDataProviderMultiCoreDecider,
    );

    println!("\n{}", result.to_string_with_duration());
    println!(
        "Runtime mismatches (cost function did not predict the steps): {}",
        result.num_runtime_mismatch()
    );
    println!("\nMost frequent cost functions:");
    for (cost_function, count) in result.cost_functions_sorted().iter().take(10) {
        println!("  {cost_function}: {count}");
    }
}
