//! Append-only text log of reportable events.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::sample::Sample;

/// Human-readable event log, one line per event.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the event line for `sample`, creating the file if needed.
    pub fn append(&self, sample: &Sample) -> io::Result<()> {
        self.append_line(&sample.log_line())
    }

    /// Append a single newline-terminated line. Existing content is never touched.
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write so a line is never split across calls
        file.write_all(format!("{}\n", line.trim_end_matches('\n')).as_bytes())?;
        file.flush()
    }
}
