//! CSV packet log
//!
//! One row per sample, appended after every packet. The column names are
//! the ones existing analysis scripts read, so they are kept verbatim.

use super::{PacketSink, SinkError};
use crate::core::packet::Packet;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header row of the CSV log
pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "packet_id",
    "data_type",
    "index",
    "time_or_freq",
    "amplitude_or_magnitude",
];

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow<'a> {
    timestamp: Cow<'a, str>,
    packet_id: u64,
    data_type: Cow<'a, str>,
    index: usize,
    time_or_freq: f64,
    amplitude_or_magnitude: f64,
}

/// Appends packets to a CSV log
///
/// Each packet is encoded in full before anything reaches the writer, so a
/// failed packet never leaves some of its rows behind.
pub struct CsvSink<W: Write + Send = File> {
    path: Option<PathBuf>,
    out: W,
    rows_written: u64,
}

impl CsvSink<File> {
    /// Open `path` for appending, writing the header if the file is new or empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut sink = Self::from_writer(file, needs_header)?;
        if needs_header {
            info!(path = %path.display(), "CSV file created");
        } else {
            info!(path = %path.display(), "Using existing CSV file");
        }
        sink.path = Some(path);
        Ok(sink)
    }
}

impl<W: Write + Send> CsvSink<W> {
    /// Log into any writer, starting with the header row if asked to
    pub fn from_writer(mut out: W, write_header: bool) -> Result<Self, SinkError> {
        if write_header {
            let mut scratch = scratch_writer();
            scratch.write_record(CSV_HEADER)?;
            scratch.flush()?;
            out.write_all(scratch.get_ref())?;
            out.flush()?;
        }
        Ok(Self {
            path: None,
            out,
            rows_written: 0,
        })
    }

    /// File being written, when opened from a path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rows appended by this sink
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn scratch_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

/// All rows of one packet, ready to append
fn encode_rows(packet: &Packet) -> Result<(Vec<u8>, u64), SinkError> {
    let timestamp = packet.created_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    let mut scratch = scratch_writer();
    let mut rows = 0u64;

    for (kind, samples) in packet.sections.iter() {
        for (index, sample) in samples.iter().enumerate() {
            let time_or_freq = if kind.is_spectrum() {
                sample.frequency_hz()
            } else {
                sample.x
            };
            scratch.serialize(CsvRow {
                timestamp: Cow::Borrowed(&timestamp),
                packet_id: packet.id,
                data_type: Cow::Borrowed(kind.label()),
                index,
                time_or_freq,
                amplitude_or_magnitude: sample.y,
            })?;
            rows += 1;
        }
    }

    scratch.flush()?;
    Ok((scratch.get_ref().clone(), rows))
}

impl<W: Write + Send> PacketSink for CsvSink<W> {
    fn name(&self) -> &str {
        "csv"
    }

    fn on_packet(&mut self, packet: &Packet) -> Result<(), SinkError> {
        if packet.sections.is_empty() {
            return Ok(());
        }

        let (block, rows) = encode_rows(packet)?;
        self.out.write_all(&block)?;
        self.out.flush()?;
        self.rows_written += rows;
        debug!(packet_id = packet.id, rows, "Points saved to CSV");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Copy the CSV log to `signal_export_<timestamp>.csv` inside `dir`
///
/// Returns the new path and the number of data records it holds.
pub fn export_snapshot(csv_path: &Path, dir: &Path) -> Result<(PathBuf, usize), SinkError> {
    let name = format!("signal_export_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
    let target = dir.join(name);

    std::fs::copy(csv_path, &target)?;

    let mut reader = csv::Reader::from_path(&target)?;
    let mut records = 0usize;
    for record in reader.records() {
        record?;
        records += 1;
    }

    info!(path = %target.display(), records, "Data exported");
    Ok((target, records))
}

/// Figures for one `data_type` of a CSV log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    /// Rows of this type
    pub count: u64,
    /// Distinct packet ids carrying this type
    pub packets: usize,
    /// Mean of `amplitude_or_magnitude`
    pub mean: f64,
    /// Sample standard deviation; needs at least two rows
    pub std: Option<f64>,
    /// Smallest `amplitude_or_magnitude`
    pub min: f64,
    /// Largest `amplitude_or_magnitude`
    pub max: f64,
}

/// Overview of a CSV log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSummary {
    /// Data rows
    pub records: u64,
    /// Distinct packet ids
    pub packets: usize,
    /// Earliest timestamp
    pub first_timestamp: Option<String>,
    /// Latest timestamp
    pub last_timestamp: Option<String>,
    /// Per `data_type` figures, keyed by label
    pub by_type: BTreeMap<String, TypeSummary>,
}

#[derive(Default)]
struct Running {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    packets: BTreeSet<u64>,
}

impl Running {
    // Welford
    fn push(&mut self, packet_id: u64, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.packets.insert(packet_id);
    }

    fn finish(self) -> TypeSummary {
        TypeSummary {
            count: self.count,
            packets: self.packets.len(),
            mean: self.mean,
            std: (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt()),
            min: self.min,
            max: self.max,
        }
    }
}

/// Read a CSV log back and summarise it per `data_type`
pub fn summarize(csv_path: &Path) -> Result<LogSummary, SinkError> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut summary = LogSummary::default();
    let mut packets = BTreeSet::new();
    let mut by_type: BTreeMap<String, Running> = BTreeMap::new();

    for row in reader.deserialize::<CsvRow<'static>>() {
        let row = row?;
        summary.records += 1;
        packets.insert(row.packet_id);

        let timestamp = row.timestamp.as_ref();
        if summary.first_timestamp.as_deref().map_or(true, |t| timestamp < t) {
            summary.first_timestamp = Some(timestamp.to_string());
        }
        if summary.last_timestamp.as_deref().map_or(true, |t| timestamp > t) {
            summary.last_timestamp = Some(timestamp.to_string());
        }

        by_type
            .entry(row.data_type.into_owned())
            .or_default()
            .push(row.packet_id, row.amplitude_or_magnitude);
    }

    summary.packets = packets.len();
    summary.by_type = by_type
        .into_iter()
        .map(|(label, running)| (label, running.finish()))
        .collect();
    debug!(path = %csv_path.display(), records = summary.records, "CSV log summarised");
    Ok(summary)
}
