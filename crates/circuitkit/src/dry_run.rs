//! Dry-run output files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Suffix of dry-run files.
pub const DRY_RUN_SUFFIX: &str = "_dry-run.cfg";

/// Append-only file receiving the configuration a live run would push to
/// one device. The tool never reads it back.
#[derive(Debug, Clone)]
pub struct DryRunFile {
    path: PathBuf,
}

impl DryRunFile {
    /// Dry-run file for `device` inside `dir`.
    pub fn new(dir: &Path, device: &str) -> Self {
        Self {
            path: dir.join(format!("{device}{DRY_RUN_SUFFIX}")),
        }
    }

    /// Full path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one rendering followed by a newline.
    pub fn append(&self, config: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{config}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_renderings() {
        let dir = TempDir::new().unwrap();
        let file = DryRunFile::new(dir.path(), "10.0.0.1");
        assert_eq!(file.path(), dir.path().join("10.0.0.1_dry-run.cfg"));

        file.append("ip sla 1").unwrap();
        file.append("ip sla 2\nip sla 3").unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "ip sla 1\nip sla 2\nip sla 3\n");
    }
}
