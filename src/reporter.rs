//! Progress output for long decider runs. The engine asks [Reporter::is_due_progress] after each batch
//! and logs the line returned by [Reporter::report_stats].

use std::time::{Duration, Instant};

use num_format::ToFormattedString;

use crate::{
    config::{user_locale, IdBig},
    decider::decider_result::DeciderResultStats,
};

const REPORT_PROGRESS_AFTER: Duration = Duration::from_secs(2);
const REPORT_DETAIL_AFTER: Duration = Duration::from_secs(30);
/// Number of cost functions listed in the detail report.
const NUM_COST_FUNCTIONS_DETAIL: usize = 5;

#[derive(Debug)]
pub struct Reporter {
    start_time: Instant,
    total: IdBig,
    last_progress_time: Instant,
    report_progress_after: Duration,
    last_detail_time: Instant,
    report_detail_after: Duration,
}

impl Reporter {
    /// Progress every 2 seconds, cost function details every 30 seconds.
    pub fn new_default(total: IdBig) -> Self {
        Self::new(total, REPORT_PROGRESS_AFTER, REPORT_DETAIL_AFTER)
    }

    pub fn new(total: IdBig, report_progress_after: Duration, report_detail_after: Duration) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            total,
            last_progress_time: now,
            report_progress_after,
            last_detail_time: now,
            report_detail_after,
        }
    }

    pub fn is_due_progress(&self) -> bool {
        self.last_progress_time.elapsed() >= self.report_progress_after
    }

    fn is_due_detail(&self) -> bool {
        self.last_detail_time.elapsed() >= self.report_detail_after
    }

    /// Progress line with the counts found so far. When the detail report is due, the most
    /// frequent cost functions are added in a second line.
    pub fn report_stats(&mut self, processed: IdBig, result: &DeciderResultStats) -> String {
        let locale = user_locale();
        let percent = processed as f64 * 100.0 / self.total.max(1) as f64;
        let mut s = format!(
            "Working: {} / {} ({percent:.1}%), translated cyclers {}, not cycler {}, never halts {}, undecided {}, runtime mismatches {}",
            processed.to_formatted_string(&locale),
            self.total.to_formatted_string(&locale),
            result.num_translated_cycler().to_formatted_string(&locale),
            result.num_not_cycler().to_formatted_string(&locale),
            result.num_never_halts().to_formatted_string(&locale),
            result.num_undecided().to_formatted_string(&locale),
            result.num_runtime_mismatch().to_formatted_string(&locale),
        );
        if let Some(remaining) = self.remaining_estimate(processed) {
            s.push_str(&format!(", remaining {}", format_duration_hhmmss_ms(remaining, false)));
        }
        self.last_progress_time = Instant::now();

        if self.is_due_detail() {
            let cost_functions: Vec<String> = result
                .cost_functions_sorted()
                .iter()
                .take(NUM_COST_FUNCTIONS_DETAIL)
                .map(|(cf, n)| format!("{cf} ({})", n.to_formatted_string(&locale)))
                .collect();
            if !cost_functions.is_empty() {
                s.push_str("\nMost frequent cost functions: ");
                s.push_str(&cost_functions.join(", "));
            }
            self.last_detail_time = Instant::now();
        }

        s
    }

    /// Linear estimate from the average speed since the start.
    fn remaining_estimate(&self, processed: IdBig) -> Option<Duration> {
        if processed == 0 {
            return None;
        }
        let per_machine = self.start_time.elapsed().as_secs_f64() / processed as f64;
        Some(Duration::from_secs_f64(
            per_machine * self.total.saturating_sub(processed) as f64,
        ))
    }
}

/// Formats a `std::time::Duration` into a string in `HH:mm:ss.ms` format.
/// Without millis the seconds are rounded.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use bb_lba::reporter::format_duration_hhmmss_ms;
///
/// assert_eq!(format_duration_hhmmss_ms(Duration::from_secs(3661), true), "01:01:01.000");
/// assert_eq!(format_duration_hhmmss_ms(Duration::from_millis(123456), true), "00:02:03.456");
/// assert_eq!(format_duration_hhmmss_ms(Duration::from_millis(123456), false), "00:02:03");
/// assert_eq!(format_duration_hhmmss_ms(Duration::from_millis(123556), false), "00:02:04");
/// ```
pub fn format_duration_hhmmss_ms(duration: Duration, display_millis: bool) -> String {
    let mut millis = duration.as_millis();
    if !display_millis {
        millis += 500;
    }
    let hours = millis / 3_600_000;
    let minutes = millis / 60_000 % 60;
    let seconds = millis / 1000 % 60;

    if display_millis {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{:03}", millis % 1000)
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        decider::cost_function::CostFunction,
        machine_binary::NotableMachineBinary,
        status::MachineStatus,
    };

    #[test]
    fn rounding_carries_into_minutes() {
        assert_eq!(
            "00:01:00",
            format_duration_hhmmss_ms(Duration::from_millis(59_600), false)
        );
        assert_eq!(
            "00:00:59.600",
            format_duration_hhmmss_ms(Duration::from_millis(59_600), true)
        );
    }

    #[test]
    fn report_shows_counts_and_cost_functions() {
        let config = Config::builder(3).tape_length(5).build();
        let mut result = DeciderResultStats::new(&config);
        let machine = NotableMachineBinary::TranslatedPeriod3.machine_id();
        result.add(
            &machine,
            &MachineStatus::DecidedTranslatedCycler(CostFunction::new(3, -2), 13),
        );

        let mut reporter = Reporter::new(1_000, Duration::ZERO, Duration::ZERO);
        assert!(reporter.is_due_progress());
        let s = reporter.report_stats(250, &result);
        assert!(
            s.starts_with("Working: 250 / 1,000 (25.0%), translated cyclers 1, not cycler 0"),
            "{s}"
        );
        assert!(s.contains("runtime mismatches 0"), "{s}");
        assert!(s.ends_with("\nMost frequent cost functions: 3 * L - 2 (1)"), "{s}");
    }

    #[test]
    fn detail_only_when_due() {
        let config = Config::builder(3).tape_length(5).build();
        let mut result = DeciderResultStats::new(&config);
        result.add(
            &NotableMachineBinary::TranslatedPeriod3.machine_id(),
            &MachineStatus::DecidedTranslatedCycler(CostFunction::new(3, -2), 13),
        );
        let mut reporter = Reporter::new(10, Duration::ZERO, Duration::from_secs(3600));
        let s = reporter.report_stats(1, &result);
        assert!(!s.contains("cost functions"), "{s}");
    }
}
