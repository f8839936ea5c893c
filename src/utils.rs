pub fn duration_as_ms_rounded(duration: std::time::Duration) -> f64 {
    (duration.as_nanos() as f64 / 1000.0).round() / 1000.0
}

/// Returns the number of CPUs to use. \
/// Percent needs to be between 0 and 150%. \
/// At least 1 cpu, at most 1.5 * available CPUs.
pub fn num_cpus_percentage(percent: usize) -> usize {
    let cpus = num_cpus::get();
    if percent >= 150 {
        return cpus * 3 / 2;
    }

    (cpus * percent / 100).max(1)
}

/// Creates the directory (and parents) if it does not exist.
pub fn create_dir_if_missing(dir: &str) -> std::io::Result<()> {
    if !std::path::Path::new(dir).exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpus_at_least_one() {
        assert_eq!(1, num_cpus_percentage(0));
        assert!(num_cpus_percentage(200) >= num_cpus_percentage(100));
    }

    #[test]
    fn duration_rounded_to_micros() {
        let d = std::time::Duration::from_nanos(1_234_567);
        assert_eq!(1.235, duration_as_ms_rounded(d));
    }
}
