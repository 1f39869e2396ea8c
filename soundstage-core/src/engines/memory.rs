//! Headless sound backend.
//!
//! Produces silent handles whose state can be inspected. Used when no output
//! device exists, and by tests to observe exactly what the engine did to each
//! handle.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::engines::{HandleOptions, SoundBackend, SoundHandle};
use crate::error::{Error, Result};

/// Observable state of one handle created by a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct HandleRecord {
    pub source: String,
    pub looping: bool,
    pub streaming: bool,
    pub volume: f32,
    pub muted: bool,
    pub playing: bool,
    pub stopped: bool,
}

/// Backend whose handles only record what was done to them.
#[derive(Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<Vec<Arc<Mutex<HandleRecord>>>>>,
    rejected: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a source as undecodable; `create` skips it like a corrupt file.
    pub fn reject_source(&self, source: &str) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.insert(source.to_string());
        }
    }

    /// Handles built from `source` construct fine but fail to start.
    pub fn fail_play(&self, source: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(source.to_string());
        }
    }

    /// Every source `create` considered, rejected ones included, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Snapshot of every handle ever created, in creation order.
    pub fn handles(&self) -> Vec<HandleRecord> {
        match self.records.lock() {
            Ok(records) => records
                .iter()
                .filter_map(|r| r.lock().ok().map(|r| r.clone()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Handles created for a given source.
    pub fn handles_for(&self, source: &str) -> Vec<HandleRecord> {
        self.handles().into_iter().filter(|h| h.source == source).collect()
    }

    pub fn created_count(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of handles that were started and not yet stopped.
    pub fn live_count(&self) -> usize {
        self.handles().iter().filter(|h| h.playing && !h.stopped).count()
    }

    fn is_rejected(&self, source: &str) -> bool {
        self.rejected
            .lock()
            .map(|rejected| rejected.contains(source))
            .unwrap_or(false)
    }

    fn fails_on_play(&self, source: &str) -> bool {
        self.failing
            .lock()
            .map(|failing| failing.contains(source))
            .unwrap_or(false)
    }

    fn record_attempt(&self, source: &str) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(source.to_string());
        }
    }
}

impl SoundBackend for MemoryBackend {
    fn create(&self, sources: &[String], options: HandleOptions) -> Result<Box<dyn SoundHandle>> {
        let mut chosen = None;
        for source in sources.iter().filter(|s| !s.is_empty()) {
            self.record_attempt(source);
            if !self.is_rejected(source) {
                chosen = Some(source);
                break;
            }
        }
        let source = chosen.ok_or_else(|| Error::SourceRejected(sources.join(", ")))?;

        let record = Arc::new(Mutex::new(HandleRecord {
            source: source.clone(),
            looping: options.looping,
            streaming: options.streaming,
            volume: options.volume,
            muted: false,
            playing: false,
            stopped: false,
        }));

        self.records
            .lock()
            .map_err(|_| Error::Other("memory backend lock poisoned".to_string()))?
            .push(Arc::clone(&record));

        Ok(Box::new(MemoryHandle {
            record,
            fail_on_play: self.fails_on_play(source),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryHandle {
    record: Arc<Mutex<HandleRecord>>,
    fail_on_play: bool,
}

impl SoundHandle for MemoryHandle {
    fn play(&mut self) -> Result<()> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| Error::SoundPlayback("memory handle lock poisoned".to_string()))?;
        if record.stopped {
            return Err(Error::SoundPlayback(format!("{} was already stopped", record.source)));
        }
        if self.fail_on_play {
            return Err(Error::SoundPlayback(format!("{} failed to start", record.source)));
        }
        record.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut record) = self.record.lock() {
            record.playing = false;
            record.stopped = true;
        }
    }

    fn set_muted(&mut self, muted: bool) {
        if let Ok(mut record) = self.record.lock() {
            record.muted = muted;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Ok(mut record) = self.record.lock() {
            record.volume = volume;
        }
    }
}
