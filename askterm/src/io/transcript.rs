//! User-facing conversation log.
//!
//! Unlike tracing diagnostics, the transcript records what was said on screen.
//! Entries are buffered and appended to disk every `flush_every` records.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

pub const DEFAULT_FLUSH_EVERY: usize = 10;

#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    flush_every: usize,
    pending: Vec<String>,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>, flush_every: usize) -> Self {
        Self {
            path: path.into(),
            flush_every: flush_every.max(1),
            pending: Vec::new(),
        }
    }

    /// Buffer one entry; appends to disk once the buffer is full.
    ///
    /// When the append fails the oldest entries are dropped so at most
    /// `flush_every` stay buffered.
    pub fn record(&mut self, line: &str) -> Result<()> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.pending.push(format!("{stamp} | {line}\n"));
        if self.pending.len() < self.flush_every {
            return Ok(());
        }
        if let Err(err) = self.flush() {
            let excess = self.pending.len().saturating_sub(self.flush_every);
            if excess > 0 {
                self.pending.drain(..excess);
                warn!(dropped = excess, "transcript entries dropped after failed append");
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create transcript dir {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open transcript {}", self.path.display()))?;
        file.write_all(self.pending.concat().as_bytes())
            .with_context(|| format!("append transcript {}", self.path.display()))?;
        self.pending.clear();
        Ok(())
    }

    /// Full transcript, pending entries included. Missing file reads as empty.
    pub fn read_all(&mut self) -> Result<String> {
        self.flush()?;
        if !self.path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&self.path)
            .with_context(|| format!("read transcript {}", self.path.display()))
    }

    pub fn wipe(&mut self) -> Result<()> {
        self.pending.clear();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create transcript dir {}", parent.display()))?;
        }
        fs::write(&self.path, "")
            .with_context(|| format!("truncate transcript {}", self.path.display()))
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!(err = %err, "failed to flush transcript on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_stay_buffered_until_threshold() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("askterm.log");
        let mut transcript = Transcript::new(&path, 3);

        transcript.record("one").expect("record");
        transcript.record("two").expect("record");
        assert!(!path.exists());

        transcript.record("three").expect("record");
        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.lines().all(|line| line.contains(" | ")));
    }

    #[test]
    fn read_all_includes_pending_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut transcript = Transcript::new(temp.path().join("askterm.log"), 10);
        transcript.record("hello").expect("record");

        let contents = transcript.read_all().expect("read");
        assert!(contents.ends_with("| hello\n"));
    }

    #[test]
    fn wipe_empties_file_and_buffer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut transcript = Transcript::new(temp.path().join("askterm.log"), 1);
        transcript.record("gone").expect("record");
        transcript.wipe().expect("wipe");
        assert_eq!(transcript.read_all().expect("read"), "");
    }

    #[test]
    fn missing_file_reads_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut transcript = Transcript::new(temp.path().join("none.log"), 10);
        assert_eq!(transcript.read_all().expect("read"), "");
    }

    #[test]
    fn failed_appends_keep_buffer_bounded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "file").expect("seed");
        let mut transcript = Transcript::new(blocker.join("askterm.log"), 10);

        for i in 0..1000 {
            let recorded = transcript.record(&format!("entry {i}"));
            assert_eq!(recorded.is_err(), i >= 9);
        }
        assert_eq!(transcript.pending.len(), 10);
        assert!(transcript.pending[9].ends_with("| entry 999\n"));
    }

    #[test]
    fn drop_flushes_pending_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("askterm.log");
        {
            let mut transcript = Transcript::new(&path, 10);
            transcript.record("bye").expect("record");
        }
        assert!(fs::read_to_string(&path).expect("read").contains("bye"));
    }
}
