//! This module holds functions to control the decider runs.
//! Mostly relevant are the functions [run_decider_data_provider] to run a decider over the machines
//! of any data provider and [run_decider_file] to run over the machine database.

use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{
    data_provider::{bb_file_reader::BBFileDataProviderBuilder, DataProvider, DataProviderBatch},
    decider::{
        decider_result::{BatchData, DeciderResultStats, DurationDataProvider, EndReason},
        DeciderConfig, ThreadResultDecider,
    },
    reporter::Reporter,
    toml::ConfigToml,
    utils::num_cpus_percentage,
    CoreUsage,
};

/// General function to run a decider over the machine database given in the config.toml. \
/// See [crate::config::Config] for configuration details, e.g. the file_id_range. \
/// See [DeciderConfig] on how to add a function to work with the results (e.g. write to file).
/// # Returns
/// Result stats [DeciderResultStats]. If the file cannot be opened, the end_reason holds the error.
pub fn run_decider_file(
    decider_config: &DeciderConfig,
    config_toml: &ConfigToml,
    core_usage: CoreUsage,
) -> DeciderResultStats {
    let config = decider_config.config();
    let reader = BBFileDataProviderBuilder::builder(config_toml)
        .id_range(config.file_id_range())
        .batch_size(config.batch_size())
        .build();
    match reader {
        Ok(data_provider) => run_decider_data_provider(decider_config, data_provider, core_usage),
        Err(e) => {
            log::error!("Machine database could not be opened: {e}");
            let mut result = DeciderResultStats::new(config);
            result.end_reason = EndReason::Error(0, e.to_string());
            result
        }
    }
}

/// General function to run a decider over all machines of the data provider.
/// # Example
/// ```
/// use bb_lba::CoreUsage;
/// use bb_lba::config::Config;
/// use bb_lba::data_provider::machine_list::MachineList;
/// use bb_lba::decider::DeciderStandard;
/// use bb_lba::decider::decider_engine::run_decider_data_provider;
///
/// let config = Config::builder(3).tape_length(12).build();
/// let decider_config = DeciderStandard::TranslatedCycler.decider_config(&config);
/// let list = MachineList::try_from_tm_text_format(&["1RB---_0LC---_---1RA", "1RB---_1RA---"], 10).unwrap();
/// let result = run_decider_data_provider(&decider_config, list, CoreUsage::SingleCore);
/// assert_eq!(2, result.num_translated_cycler());
/// ```
pub fn run_decider_data_provider(
    decider_config: &DeciderConfig,
    data_provider: impl DataProvider,
    core_usage: CoreUsage,
) -> DeciderResultStats {
    let total = data_provider.num_machines_to_process();
    let reporter = Some(Reporter::new_default(total));
    match core_usage {
        CoreUsage::SingleCore => {
            batch_run_decider_data_provider_single_thread_reporting(
                decider_config,
                data_provider,
                reporter,
            )
        }
        CoreUsage::SingleCoreDataProviderMultiCoreDecider => {
            batch_run_decider_threaded_data_provider_single_thread_reporting(
                decider_config,
                data_provider,
                reporter,
            )
        }
    }
}

/// Runs the decider (using the thread called from) and the result worker on one batch. \
/// Return DeciderResultStats with an EndReason which needs to be evaluated.
pub fn decide_batch(mut batch_data: BatchData, decider_config: &DeciderConfig) -> DeciderResultStats {
    let start_decider = Instant::now();
    let mut result_batch = DeciderResultStats::new(decider_config.config());

    match decider_config.f_decider()(&mut batch_data) {
        Ok(()) => {
            // Call user analyzer/worker so result can be dealt with individually (e.g. save).
            if let Some(f_result_worker) = decider_config.fo_result_worker() {
                if let Err(e) = f_result_worker(&mut batch_data) {
                    result_batch.end_reason = e;
                }
            }
            result_batch.add_result(&batch_data.result_decided);
        }
        Err(e) => result_batch.end_reason = e,
    }

    result_batch.duration = DurationDataProvider {
        duration_decider: start_decider.elapsed(),
        ..Default::default()
    };

    result_batch
}

/// True if the run needs to stop because of this end reason.
fn is_stop_reason(end_reason: &EndReason) -> bool {
    matches!(
        end_reason,
        EndReason::Error(_, _)
            | EndReason::StopRequested(_, _)
            | EndReason::RecordLimitDecidedReached(_)
            | EndReason::RecordLimitUndecidedReached(_)
    )
}

/// Runs the data provider and the decider both on the calling thread
/// using a custom reporter (or None to omit reporting).
pub fn batch_run_decider_data_provider_single_thread_reporting(
    decider_config: &DeciderConfig,
    mut data_provider: impl DataProvider,
    mut reporter: Option<Reporter>,
) -> DeciderResultStats {
    let config = decider_config.config();
    let start = Instant::now();
    let mut duration_data_provider = Duration::default();
    let mut duration_decider = Duration::default();
    let mut result_main = DeciderResultStats::new(config);
    let num_batches = data_provider.num_batches();

    loop {
        let start_data_provider = Instant::now();
        let batch = match data_provider.machine_batch_next() {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("{e}");
                result_main.end_reason = EndReason::Error(0, e.to_string());
                break;
            }
        };
        duration_data_provider += start_data_provider.elapsed();

        if !batch.machines.is_empty() {
            let batch_data = BatchData::new(
                &batch.machines,
                batch.batch_no,
                num_batches,
                decider_config.decider_id(),
                config,
            );
            let dc_result = decide_batch(batch_data, decider_config);
            duration_decider += dc_result.duration.duration_decider;
            result_main.add_result(&dc_result);
            if is_stop_reason(&result_main.end_reason) {
                break;
            }
        }

        match batch.end_reason {
            EndReason::IsLastBatch => {
                result_main.end_reason = EndReason::AllMachinesChecked;
                break;
            }
            EndReason::None => {}
            end_reason => {
                result_main.end_reason = end_reason;
                break;
            }
        }

        // Output info on progress
        if let Some(reporter) = reporter.as_mut() {
            if reporter.is_due_progress() {
                let s = reporter.report_stats(result_main.num_evaluated(), &result_main);
                log::info!("{s}");
            }
        }
    }

    result_main.duration = DurationDataProvider {
        duration_data_provider,
        duration_decider,
        duration_total: start.elapsed(),
    };
    result_main.add_name(&format!(
        "BB{} L={}: {}",
        config.n_states(),
        config.tape_length(),
        decider_config.decider_id().name
    ));

    result_main
}

/// Runs the data provider on the calling thread and the decider in scoped threads
/// using a custom reporter (or None to omit reporting).
// How it works:
// The data provider fills a buffer of batches. A decider thread takes one batch, decides it and sends
// the result as ThreadResultDecider, which is collected on the calling thread into the final result.
pub fn batch_run_decider_threaded_data_provider_single_thread_reporting(
    decider_config: &DeciderConfig,
    mut data_provider: impl DataProvider,
    mut reporter: Option<Reporter>,
) -> DeciderResultStats {
    let start = Instant::now();
    let config = decider_config.config();
    let max_threads = num_cpus_percentage(config.cpu_utilization_percent());
    // if single thread run single
    if max_threads == 1 {
        return batch_run_decider_data_provider_single_thread_reporting(
            decider_config,
            data_provider,
            reporter,
        );
    }
    let mut result_main = DeciderResultStats::new(config);
    let mut duration_data_provider = Duration::default();
    let mut duration_decider = Duration::default();
    let num_batches = data_provider.num_batches();

    // Make a Thread Scope so that references can be accessed
    thread::scope(|s| {
        let (send_finished_thread_decider, receive_finished_thread_decider) =
            std::sync::mpsc::channel::<ThreadResultDecider>();
        let mut num_threads_decider_running = 0;
        let mut buffer_batches: Vec<DataProviderBatch> = Vec::new();
        let max_buffer = max_threads + 4;
        let mut is_data_provider_finished = false;

        // loop over all batch packages
        loop {
            // triggers a thread sleep if none have finished
            let mut do_sleep = true;
            if !is_data_provider_finished && buffer_batches.len() < max_buffer {
                do_sleep = false;
                let start_data_provider = Instant::now();
                match data_provider.machine_batch_next() {
                    Ok(mut batch) => {
                        match &batch.end_reason {
                            EndReason::IsLastBatch => is_data_provider_finished = true,
                            EndReason::None => {}
                            end_reason => {
                                is_data_provider_finished = true;
                                result_main.end_reason = end_reason.clone();
                            }
                        }
                        batch.end_reason = EndReason::None;
                        if !batch.machines.is_empty() {
                            buffer_batches.push(batch);
                        }
                    }
                    Err(e) => {
                        log::error!("{e}");
                        is_data_provider_finished = true;
                        result_main.end_reason = EndReason::Error(0, e.to_string());
                    }
                }
                duration_data_provider += start_data_provider.elapsed();
            }

            // Check if new decider thread can be started
            if !buffer_batches.is_empty() && max_threads > num_threads_decider_running {
                do_sleep = false;
                num_threads_decider_running += 1;
                let send_finished_thread_dec = send_finished_thread_decider.clone();
                // move batch out of buffer to move into thread
                let batch = buffer_batches.remove(0);
                s.spawn(move || {
                    let start = Instant::now();
                    let batch_data = BatchData::new(
                        &batch.machines,
                        batch.batch_no,
                        num_batches,
                        decider_config.decider_id(),
                        config,
                    );
                    let result = decide_batch(batch_data, decider_config);
                    let decider_result = ThreadResultDecider {
                        batch_no: batch.batch_no,
                        result,
                        duration: start.elapsed(),
                    };
                    // send error can occur if stop is requested while other threads are still running
                    send_finished_thread_dec
                        .send(decider_result)
                        .unwrap_or_default();
                });
            }

            // Check if deciders have finished
            while let Ok(thread_result_dec) = receive_finished_thread_decider.try_recv() {
                result_main.add_result(&thread_result_dec.result);
                duration_decider += thread_result_dec.duration;
                num_threads_decider_running -= 1;
                do_sleep = false;
            }

            // Output info on progress
            if let Some(reporter) = reporter.as_mut() {
                if reporter.is_due_progress() {
                    let s = reporter.report_stats(result_main.num_evaluated(), &result_main);
                    log::info!("{s}");
                }
            }

            if is_stop_reason(&result_main.end_reason) {
                // wait for running threads, their results are dropped with the receiver
                break;
            }
            if is_data_provider_finished
                && num_threads_decider_running == 0
                && buffer_batches.is_empty()
            {
                if result_main.end_reason == EndReason::None {
                    result_main.end_reason = EndReason::AllMachinesChecked;
                }
                break;
            }

            if do_sleep {
                thread::sleep(Duration::from_micros(100));
            }
        }
    });

    result_main.duration = DurationDataProvider {
        duration_data_provider,
        duration_decider,
        duration_total: start.elapsed(),
    };
    result_main.add_name(&format!(
        "BB{} L={} threaded: {}",
        config.n_states(),
        config.tape_length(),
        decider_config.decider_id().name
    ));

    result_main
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        data_provider::machine_list::MachineList,
        decider::{
            cost_function::CostFunction, decider_result_worker::ResultWorker, DeciderStandard,
        },
    };

    const MACHINES: [&str; 5] = [
        "1RB---_0LC---_---1RA",
        "1RB---_1RA---",
        "1RZ---",
        "1RB---_0LC---_---1RA",
        "1RZ---",
    ];

    fn config() -> Config {
        Config::builder(3)
            .tape_length(8)
            .batch_size(2)
            .limit_machines_decided(10)
            .build()
    }

    fn assert_result(result: &DeciderResultStats) {
        assert_eq!(EndReason::AllMachinesChecked, result.end_reason);
        assert_eq!(5, result.num_evaluated());
        assert_eq!(3, result.num_translated_cycler());
        assert_eq!(2, result.num_not_cycler());
        assert_eq!(0, result.num_undecided());
        assert_eq!(0, result.num_runtime_mismatch());
        assert_eq!(Some(&2), result.cost_functions().get(&CostFunction::new(3, -2)));
        // 3 * 8 - 2
        assert_eq!(22, result.steps_max());
    }

    #[test]
    fn single_thread() {
        let config = config();
        let decider_config = DeciderStandard::TranslatedCycler.decider_config(&config);
        let list = MachineList::try_from_tm_text_format(&MACHINES, config.batch_size()).unwrap();
        let result =
            batch_run_decider_data_provider_single_thread_reporting(&decider_config, list, None);
        assert_result(&result);
    }

    #[test]
    fn threaded() {
        let config = Config::builder_from_config(&config())
            .cpu_utilization(150)
            .build();
        let decider_config = DeciderStandard::TranslatedCycler.decider_config(&config);
        let list = MachineList::try_from_tm_text_format(&MACHINES, config.batch_size()).unwrap();
        let result =
            batch_run_decider_threaded_data_provider_single_thread_reporting(&decider_config, list, None);
        assert_result(&result);
    }

    fn stop_on_translated_cycler(batch_data: &mut BatchData) -> ResultWorker {
        match batch_data.machines_decided.translated_cyclers().next() {
            Some(m) => Err(EndReason::StopRequested(m.id(), "translated cycler found".to_string())),
            None => Ok(()),
        }
    }

    #[test]
    fn result_worker_stops_run() {
        let config = config();
        let decider_config = DeciderStandard::TranslatedCycler
            .decider_config(&config)
            .with_result_worker(stop_on_translated_cycler);
        let list = MachineList::try_from_tm_text_format(&MACHINES, config.batch_size()).unwrap();
        let result =
            batch_run_decider_data_provider_single_thread_reporting(&decider_config, list, None);
        assert_eq!(
            EndReason::StopRequested(0, "translated cycler found".to_string()),
            result.end_reason
        );
        // first batch only
        assert_eq!(2, result.num_evaluated());
    }

    #[test]
    fn missing_file_is_error() {
        let config = config();
        let decider_config = DeciderStandard::TranslatedCycler.decider_config(&config);
        let toml: ConfigToml =
            toml::from_str("machine_db_path = \"./does/not/exist.bin\"").unwrap();
        let result = run_decider_file(&decider_config, &toml, CoreUsage::SingleCore);
        assert!(matches!(result.end_reason, EndReason::Error(_, _)));
    }
}
