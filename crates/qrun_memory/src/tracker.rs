//! Memory usage tracker
//!
//! Gantree: L3_Memory → MemoryTracker
//!
//! Time series of manager byte usage, recorded only while started.

use qrun_core::QrunResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One recorded sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    /// Time since `start`
    pub elapsed: Duration,
    /// Bytes in use
    pub bytes: usize,
}

#[derive(Debug)]
struct TrackerState {
    enabled: bool,
    started: Instant,
    samples: Vec<MemorySample>,
}

/// Thread-safe memory usage recorder
/// Gantree: MemoryTracker // 메모리 추적기
#[derive(Debug)]
pub struct MemoryTracker {
    inner: Mutex<TrackerState>,
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTracker {
    /// Stopped tracker with no samples
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerState {
                enabled: false,
                started: Instant::now(),
                samples: Vec::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear samples and start recording
    pub fn start(&self) {
        let mut s = self.state();
        s.enabled = true;
        s.started = Instant::now();
        s.samples.clear();
    }

    /// Stop recording; samples are kept
    pub fn stop(&self) {
        self.state().enabled = false;
    }

    /// Whether `record` currently stores samples
    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Store a sample if started
    pub fn record(&self, bytes: usize) {
        let mut s = self.state();
        if s.enabled {
            let elapsed = s.started.elapsed();
            s.samples.push(MemorySample { elapsed, bytes });
        }
    }

    /// Copy of the samples
    pub fn samples(&self) -> Vec<MemorySample> {
        self.state().samples.clone()
    }

    /// Largest recorded byte count
    pub fn peak(&self) -> Option<usize> {
        self.state().samples.iter().map(|s| s.bytes).max()
    }

    /// Write `seconds,bytes` lines to `path`
    /// Gantree: save_csv(path) -> QrunResult<()> // CSV 저장
    pub fn save_csv(&self, path: impl AsRef<Path>) -> QrunResult<()> {
        let samples = self.samples();
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "seconds,bytes")?;
        for s in &samples {
            writeln!(out, "{:.6},{}", s.elapsed.as_secs_f64(), s.bytes)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_only_while_started() {
        let t = MemoryTracker::new();
        t.record(10);
        assert!(t.samples().is_empty());

        t.start();
        t.record(10);
        t.record(30);
        t.stop();
        t.record(50);

        let bytes: Vec<usize> = t.samples().iter().map(|s| s.bytes).collect();
        assert_eq!(bytes, vec![10, 30]);
        assert_eq!(t.peak(), Some(30));
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mem.csv");
        let t = MemoryTracker::new();
        t.start();
        t.record(128);
        t.save_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "seconds,bytes");
        assert!(lines[1].ends_with(",128"));
        assert_eq!(lines.len(), 2);
    }
}
