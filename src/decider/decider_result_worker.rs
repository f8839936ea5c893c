//! A result worker is a function which optionally can be called on the result of a decider batch.
//! It allows flexible functionality, e.g. write the ids of all translated cyclers into a result file.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Local, Utc};

use crate::{
    config::Config,
    decider::decider_result::{BatchData, EndReason},
    machine_binary::MachineId,
    utils::create_dir_if_missing,
};

pub type FnResultWorker = fn(&mut BatchData) -> ResultWorker;
pub type ResultWorker = std::result::Result<(), EndReason>;

/// File extension of the result files with 4 byte big endian machine ids.
const RESULT_FILE_EXTENSION: &str = "bin";

/// Name of this run derived from the creation time of the config, e.g. run_2025-03-01_14-05-59.
pub fn run_name(config: &Config) -> String {
    if config.use_local_time() {
        let datetime_local: DateTime<Local> = config.creation_time().into();
        datetime_local.format("run_%Y-%m-%d_%H-%M-%S").to_string()
    } else {
        let datetime_utc: DateTime<Utc> = config.creation_time().into();
        datetime_utc.format("run_%Y-%m-%d_%H-%M-%S").to_string()
    }
}

/// Appends the ids of all translated cyclers of this batch as 4 byte big endian integers to the
/// result file `<result_path>/<decider sub_dir>/<run name>.bin`.
pub fn save_translated_cycler_ids(batch_data: &mut BatchData) -> ResultWorker {
    let machines: Vec<MachineId> = batch_data
        .machines_decided
        .translated_cyclers()
        .copied()
        .collect();
    if machines.is_empty() {
        return Ok(());
    }

    let dir = Path::new(batch_data.config.result_path()).join(batch_data.decider_id.sub_dir);
    let dir = dir.to_string_lossy();
    create_dir_if_missing(&dir)?;
    let file_name = format!("{}.{RESULT_FILE_EXTENSION}", run_name(batch_data.config));
    let file = open_file_for_append(&dir, &file_name)?;
    let mut writer = BufWriter::new(file);
    let written = write_machine_ids_be(&mut writer, &machines)?;
    writer.flush()?;
    log::info!(
        "Batch {}: {written} translated cycler ids written to {dir}/{file_name}",
        batch_data.batch_no
    );

    Ok(())
}

/// Writes the machine ids as 4 byte big endian integers.
/// # Returns
/// The number of written ids or an error if an id is missing or too large.
pub fn write_machine_ids_be(
    writer: &mut impl Write,
    machines: &[MachineId],
) -> Result<usize, EndReason> {
    for machine in machines.iter() {
        let bytes = machine
            .id_as_be_bytes()
            .map_err(|e| EndReason::Error(machine.id(), e.to_string()))?;
        writer.write_all(&bytes)?;
    }

    Ok(machines.len())
}

fn open_file_for_append(path: &str, file_name: &str) -> Result<File, EndReason> {
    let file_path = Path::new(path).join(file_name);
    std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&file_path)
        .map_err(|e| EndReason::Error(0, format!("{e}: {}", file_path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine_binary::NotableMachineBinary;

    #[test]
    fn ids_written_big_endian() {
        let machine = NotableMachineBinary::ScanRight.machine();
        let machines = vec![
            MachineId::new(1, machine),
            MachineId::new(0x0102_0304, machine),
        ];
        let mut buf = Vec::new();
        assert_eq!(Ok(2), write_machine_ids_be(&mut buf, &machines));
        assert_eq!(vec![0, 0, 0, 1, 1, 2, 3, 4], buf);
    }

    #[test]
    fn id_too_large_fails() {
        let machine = NotableMachineBinary::ScanRight.machine();
        let machines = vec![MachineId::new(u32::MAX as u64 + 1, machine)];
        let mut buf = Vec::new();
        assert!(write_machine_ids_be(&mut buf, &machines).is_err());
        assert!(write_machine_ids_be(&mut buf, &[MachineId::new_no_id(machine)]).is_err());
    }

    #[test]
    fn run_name_format() {
        let config = Config::builder(2).use_local_time(false).build();
        let name = run_name(&config);
        assert!(name.starts_with("run_20"));
        assert_eq!("run_2025-03-01_14-05-59".len(), name.len());
    }
}
