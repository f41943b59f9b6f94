//! The append-only sight log.
//!
//! Every line starts with `LOG: ` and the local time of the event:
//!
//! ```text
//! LOG: 2024-01-01 10:31:02+00:00 Log file:	/home/nav/log.txt
//! LOG: 2024-01-01 10:31:02+00:00 Sighting file:	/home/nav/sightings.xml 
//! LOG: 2024-01-01 10:31:02+00:00:	Sirius	2024-01-01	10:30:00	44d59.1	S16d44.3	156d28.7
//! LOG: 2024-01-01 10:31:02+00:00 Sighting errors:	0
//! ```

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::reduction::ComputedSighting;
use crate::{SightError, SourceKind};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Owns the log file for one reduction run.
///
/// The file is opened in append mode when the log is created and released by
/// [`SightLog::close`] or on drop. Writing after `close` fails with
/// [`SightError::LogClosed`].
#[derive(Debug)]
pub struct SightLog {
    path: PathBuf,
    writer: Option<LineWriter<File>>,
}

impl SightLog {
    /// Opens (or creates) `path` for appending and records its absolute path.
    ///
    /// # Errors
    ///
    /// [`SightError::InvalidInput`] for an empty path, [`SightError::Log`]
    /// when the file cannot be opened or written.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SightError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(SightError::InvalidInput("log file name is empty".to_string()));
        }
        let path = std::path::absolute(path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut log = Self {
            path,
            writer: Some(LineWriter::new(file)),
        };
        let startup = format!(" Log file:\t{}", log.path.display());
        log.write_entry(&startup)?;
        info!(path = %log.path.display(), "opened sight log");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Records the absolute path of a source file. The line ends with a
    /// space after the path.
    pub fn log_source(&mut self, kind: SourceKind, path: &Path) -> Result<(), SightError> {
        self.write_entry(&format!(" {kind} file:\t{} ", path.display()))
    }

    /// Records one computed sighting.
    pub fn log_sighting(&mut self, sighting: &ComputedSighting) -> Result<(), SightError> {
        self.write_entry(&format!(
            ":\t{}\t{}\t{}\t{}\t{}\t{}",
            sighting.body, sighting.date, sighting.time, sighting.corrected_altitude, sighting.latitude, sighting.longitude
        ))
    }

    /// Records the number of sightings skipped during the run.
    pub fn log_error_tally(&mut self, error_count: usize) -> Result<(), SightError> {
        self.write_entry(&format!(" Sighting errors:\t{error_count}"))
    }

    /// Flushes and releases the file.
    ///
    /// # Errors
    ///
    /// [`SightError::LogClosed`] if the log was already closed.
    pub fn close(&mut self) -> Result<(), SightError> {
        let mut writer = self.writer.take().ok_or(SightError::LogClosed)?;
        writer.flush()?;
        info!(path = %self.path.display(), "closed sight log");
        Ok(())
    }

    fn write_entry(&mut self, tail: &str) -> Result<(), SightError> {
        let writer = self.writer.as_mut().ok_or(SightError::LogClosed)?;
        writeln!(writer, "LOG: {}{tail}", Local::now().format(TIMESTAMP_FORMAT))?;
        Ok(())
    }
}
