#![warn(missing_docs)]
//! Testing surfaces: JSONL event log, golden snapshots and state fixtures.

mod fixtures;
mod snapshot;

use anyhow::Result;
use grove_core::{Millis, PlayerId};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub use fixtures::*;
pub use snapshot::*;

/// One line of a session event log.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a, T: Serialize> {
    /// Instant the event was applied.
    pub at: Millis,
    /// Player concerned.
    pub player: PlayerId,
    /// Short label, usually the command verb.
    pub kind: &'a str,
    /// Outcome or error payload.
    pub payload: &'a T,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    out: BufWriter<File>,
    written: usize,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append an event to the log.
    pub fn write<T: Serialize>(&mut self, event: &EventRecord<'_, T>) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Events written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    /// True before the first event.
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Err(err) = self.out.flush() {
            tracing::warn!(%err, "event log flush failed");
        }
    }
}
