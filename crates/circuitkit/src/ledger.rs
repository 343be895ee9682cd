//! Per-device removal ledger.
//!
//! Every live provision appends the circuit's removal configuration to a
//! journal named after the device address. Deprovisioning replays the whole
//! journal as one push and then deletes it.
//!
//! The file is JSON lines, one [`LedgerRecord`] per line. There is no
//! locking: one writer per device at a time is assumed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use devicekit::Device;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Suffix of ledger files.
pub const LEDGER_SUFFIX: &str = "_removal.jsonl";

/// One removal fragment recorded for one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Position in the journal, starting at 1
    pub seq: u64,
    /// Device address the fragment applies to
    pub device: String,
    /// Circuit the fragment removes
    pub circuit_id: String,
    /// Removal configuration, newline terminated
    pub removal: String,
    /// When the record was written
    pub recorded_at: DateTime<Utc>,
}

/// The removal journal of one device.
#[derive(Debug, Clone)]
pub struct RemovalLedger {
    device: String,
    path: PathBuf,
}

impl RemovalLedger {
    /// Ledger for `device` inside `dir`.
    pub fn new(dir: &Path, device: impl Into<String>) -> Self {
        let device = device.into();
        let path = dir.join(Self::file_name(&device));
        Self { device, path }
    }

    /// File name of the ledger for a device address.
    pub fn file_name(device: &str) -> String {
        format!("{device}{LEDGER_SUFFIX}")
    }

    /// Device address this ledger belongs to.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Full path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether anything is pending removal.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read every record without consuming the ledger.
    pub fn records(&self) -> Result<Vec<LedgerRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::LedgerNotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|e| Error::LedgerCorrupt {
                    path: self.path.clone(),
                    line: idx + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Sequence number the next record will get.
    ///
    /// Reads and validates the whole ledger, so a corrupt ledger is reported
    /// here rather than after a device was configured.
    pub fn next_seq(&self) -> Result<u64> {
        if !self.exists() {
            return Ok(1);
        }
        Ok(self.records()?.last().map_or(1, |r| r.seq + 1))
    }

    /// Append the removal fragment of one circuit as record `seq`.
    ///
    /// Write-only: the existing content is not read again. Take `seq` from
    /// [`next_seq`](Self::next_seq) before touching the device.
    pub fn append(&self, seq: u64, circuit_id: &str, removal: &str) -> Result<LedgerRecord> {
        let mut removal = removal.to_string();
        if !removal.ends_with('\n') {
            removal.push('\n');
        }

        let record = LedgerRecord {
            seq,
            device: self.device.clone(),
            circuit_id: circuit_id.to_string(),
            removal,
            recorded_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        log::debug!(
            "Recorded removal of circuit {} on {} (seq {})",
            circuit_id,
            self.device,
            seq
        );
        Ok(record)
    }

    /// Push the whole ledger to `device` as one batch and delete it.
    ///
    /// The ledger is read before the device is touched, so a missing or
    /// corrupt ledger never reaches the device. The file is only deleted
    /// after a successful push.
    pub fn consume(&self, device: &Device, timeout: Duration) -> Result<Vec<LedgerRecord>> {
        let records = self.records()?;
        let lines = collect_lines(&records);

        log::info!(
            "Removing {} circuit(s) from {} ({} lines)",
            records.len(),
            self.device,
            lines.len()
        );
        device.push_config(&lines, timeout)?;

        fs::remove_file(&self.path)?;
        Ok(records)
    }
}

fn collect_lines(records: &[LedgerRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.removal.lines())
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
