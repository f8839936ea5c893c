//! Reader for machine databases in the bbchallenge format. \
//! <https://bbchallenge.org/method#format> \
//! Each machine is encoded in 30 bytes, per state: write, move (R=0, L=1), next state for symbol 0 and
//! then symbol 1. The bbchallenge database starts with a 30 byte global header, the LBA databases have none.
//! The machine id is the position of the machine in the file, starting with 0.

use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    ops::Range,
};

use crate::{
    config::IdBig,
    data_provider::{
        num_batches_for, DataProvider, DataProviderBatch, DataProviderError, ResultDataProvider,
    },
    decider::decider_result::EndReason,
    machine_binary::{MachineBinary, MachineId, MACHINE_DB_BYTES},
    toml::ConfigToml,
};

const BATCH_SIZE: usize = 100_000;
const SOURCE_NAME: &str = "Machine Database";

/// Global header of the bbchallenge database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub num_undecided_machines_exceed_47m_steps: u64,
    pub num_undecided_machines_exceed_12k_cells: u64,
    pub num_undecided_machines: u64,
    pub is_sorted: bool,
}

impl Header {
    fn from_bytes(buffer: &[u8; MACHINE_DB_BYTES]) -> Self {
        let be_u32 = |i: usize| {
            u32::from_be_bytes([buffer[i], buffer[i + 1], buffer[i + 2], buffer[i + 3]]) as u64
        };
        Header {
            num_undecided_machines_exceed_47m_steps: be_u32(0),
            num_undecided_machines_exceed_12k_cells: be_u32(4),
            num_undecided_machines: be_u32(8),
            is_sorted: buffer[12] == 1,
        }
    }
}

#[derive(Debug)]
pub struct BBFileReader<R: Read + Seek> {
    reader: R,
    header: Option<Header>,
    num_machines: u64,
}

impl<R: Read + Seek> BBFileReader<R> {
    /// Creates the reader and counts the machines from the length of the data.
    pub fn try_from_reader(mut reader: R, has_header: bool) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        let mut num_machines = len / MACHINE_DB_BYTES as u64;
        if len % MACHINE_DB_BYTES as u64 != 0 {
            log::warn!(
                "Machine database length {len} is not a multiple of {MACHINE_DB_BYTES}, the last bytes are ignored."
            );
        }
        reader.seek(SeekFrom::Start(0))?;
        let header = if has_header {
            if num_machines == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Not enough bytes in header",
                ));
            }
            let mut buffer = [0; MACHINE_DB_BYTES];
            reader.read_exact(&mut buffer)?;
            num_machines -= 1;
            Some(Header::from_bytes(&buffer))
        } else {
            None
        };

        Ok(Self {
            reader,
            header,
            num_machines,
        })
    }

    pub fn read_machine(&mut self, machine_id: IdBig) -> io::Result<MachineId> {
        let mut machines = self.read_machine_range(machine_id, 1)?;
        machines.pop().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "Not enough bytes")
        })
    }

    /// Reads count machines starting with first_id (id starts with 0).
    pub fn read_machine_range(&mut self, first_id: IdBig, count: usize) -> io::Result<Vec<MachineId>> {
        if first_id + count as u64 > self.num_machines {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Not enough machines: {} requested from id {first_id}, file has {}",
                    count, self.num_machines
                ),
            ));
        }
        let mut machines: Vec<MachineId> = Vec::with_capacity(count);
        self.reader.seek(SeekFrom::Start(self.file_pos(first_id)))?;
        let mut buffer = [0; MACHINE_DB_BYTES];
        for i in 0..count as u64 {
            self.reader.read_exact(&mut buffer)?;
            let machine = MachineBinary::try_from_db_bytes(&buffer).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Machine id {}: {e}", first_id + i),
                )
            })?;
            machines.push(MachineId::new(first_id + i, machine));
        }

        Ok(machines)
    }

    fn file_pos(&self, id: IdBig) -> u64 {
        let header_len = if self.header.is_some() { 1 } else { 0 };
        (id + header_len) * MACHINE_DB_BYTES as u64
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn num_machines(&self) -> u64 {
        self.num_machines
    }
}

#[derive(Debug)]
pub struct BBDataProvider<R: Read + Seek> {
    batch_no: usize,
    batch_size: usize,
    bb_file_reader: BBFileReader<R>,
    id_start: IdBig,
    id_end: IdBig,
    id_next: IdBig,
}

impl<R: Read + Seek> DataProvider for BBDataProvider<R> {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn machine_batch_next(&mut self) -> ResultDataProvider {
        let mut batch = DataProviderBatch::new(self.batch_no);

        if self.id_next >= self.id_end {
            // an empty id range is a single empty batch
            if self.id_start == self.id_end {
                batch.end_reason = EndReason::IsLastBatch;
                return Ok(batch);
            }
            return Err(Box::new(
                DataProviderError::new(SOURCE_NAME, "All machines were already provided.")
                    .with_machine_id(self.id_next),
            ));
        }

        let mut end = self.id_next + self.batch_size as u64;
        if end >= self.id_end {
            end = self.id_end;
            batch.end_reason = EndReason::IsLastBatch;
        };
        let count = (end - self.id_next) as usize;

        let machines = match self.bb_file_reader.read_machine_range(self.id_next, count) {
            Ok(m) => m,
            Err(e) => {
                return Err(Box::new(
                    DataProviderError::new(SOURCE_NAME, e.to_string()).with_machine_id(self.id_next),
                ));
            }
        };
        self.id_next += machines.len() as u64;
        self.batch_no += 1;
        batch.machines = machines;

        Ok(batch)
    }

    fn num_batches(&self) -> usize {
        num_batches_for(self.num_machines_to_process(), self.batch_size)
    }

    fn num_machines_to_process(&self) -> u64 {
        self.id_end - self.id_start
    }
}

pub struct BBFileDataProviderBuilder {
    batch_size: usize,
    file_path: String,
    has_header: bool,
    id_range: Option<Range<IdBig>>,
}

impl BBFileDataProviderBuilder {
    /// Creates a new builder for `BBDataProvider` with the database path of the config.toml.
    pub fn builder(config_toml: &ConfigToml) -> Self {
        Self {
            batch_size: BATCH_SIZE,
            file_path: config_toml.machine_db_path().to_string(),
            has_header: config_toml.machine_db_has_header(),
            id_range: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the file path for the data provider.
    pub fn file_path(mut self, path: &str) -> Self {
        self.file_path = path.to_string();
        self
    }

    /// True if the file starts with the 30 byte bbchallenge header.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Sets the ID range for the data provider. None will use full range.
    pub fn id_range(mut self, id_range: Option<Range<IdBig>>) -> Self {
        self.id_range = id_range;
        self
    }

    /// Builds the `BBDataProvider` for the file.
    pub fn build(self) -> Result<BBDataProvider<BufReader<File>>, Box<DataProviderError>> {
        let file = File::open(&self.file_path).map_err(|e| {
            Box::new(DataProviderError::new(
                SOURCE_NAME,
                format!("{e}: {}", self.file_path),
            ))
        })?;
        self.build_from_reader(BufReader::new(file))
    }

    /// Builds the `BBDataProvider` for any data source, e.g. a memory buffer.
    pub fn build_from_reader<R: Read + Seek>(
        self,
        reader: R,
    ) -> Result<BBDataProvider<R>, Box<DataProviderError>> {
        let bb_file_reader = BBFileReader::try_from_reader(reader, self.has_header).map_err(|e| {
            Box::new(DataProviderError::new(
                SOURCE_NAME,
                format!("{e}: {}", self.file_path),
            ))
        })?;
        let num_machines = bb_file_reader.num_machines();
        let id_range = self.id_range.unwrap_or(0..num_machines);
        let id_end = id_range.end.min(num_machines);
        let id_start = id_range.start.min(id_end);
        // reduce batch size to actually available machines
        let batch_size = (id_end - id_start).min(self.batch_size.max(1) as u64).max(1) as usize;

        Ok(BBDataProvider {
            batch_no: 0,
            batch_size,
            bb_file_reader,
            id_start,
            id_end,
            id_next: id_start,
        })
    }
}
