//! Log deduplication
//!
//! A pass-through proxy over a logging sink. The first occurrence of a
//! (severity, source tag, message) triple is forwarded; repeats are counted
//! and swallowed. When the scope ends, one line per repeated message
//! reports how many occurrences were suppressed. The tracked set is
//! bounded: at the cap, singleton entries are purged first, then the oldest
//! entry by insertion order is evicted.

use crate::logging::LogLevel;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Longest message sample kept for the suppression summary.
pub const MAX_SAMPLE_LEN: usize = 120;

/// Destination for log lines.
///
/// The engine's default sink forwards to `tracing`; tests substitute a
/// recording sink.
pub trait LogSink {
    fn log(&mut self, level: LogLevel, target: &str, message: &str);
}

/// Sink forwarding to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, level: LogLevel, target: &str, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(tag = target, "{message}"),
            LogLevel::Debug => tracing::debug!(tag = target, "{message}"),
            LogLevel::Info => tracing::info!(tag = target, "{message}"),
            LogLevel::Warn => tracing::warn!(tag = target, "{message}"),
            LogLevel::Error => tracing::error!(tag = target, "{message}"),
        }
    }
}

struct DedupEntry {
    count: u64,
    level: LogLevel,
    target: String,
    sample: String,
}

/// Deduplicating proxy over a [`LogSink`].
pub struct DedupLogger {
    inner: Box<dyn LogSink>,
    enabled: bool,
    cap: usize,
    entries: HashMap<u64, DedupEntry>,
    order: VecDeque<u64>,
    flushed: bool,
}

impl DedupLogger {
    pub fn new(inner: Box<dyn LogSink>, enabled: bool, cap: usize) -> Self {
        Self {
            inner,
            enabled,
            cap: cap.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            flushed: false,
        }
    }

    /// The wrapped sink; anything the proxy does not interpret goes here.
    pub fn inner(&self) -> &dyn LogSink {
        self.inner.as_ref()
    }

    pub fn inner_mut(&mut self) -> &mut dyn LogSink {
        self.inner.as_mut()
    }

    /// Log a message, forwarding only first occurrences when enabled.
    pub fn log(&mut self, level: LogLevel, target: &str, message: &str) {
        if !self.enabled {
            self.inner.log(level, target, message);
            return;
        }

        let key = hash_key(level, target, message);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.count += 1;
            return;
        }

        if self.entries.len() >= self.cap {
            self.evict();
        }

        self.entries.insert(
            key,
            DedupEntry {
                count: 1,
                level,
                target: target.to_string(),
                sample: truncate(message),
            },
        );
        self.order.push_back(key);
        self.inner.log(level, target, message);
    }

    /// Purge singletons; if the map is still full, drop the oldest entry.
    fn evict(&mut self) {
        let singles: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, e)| e.count == 1)
            .map(|(k, _)| *k)
            .collect();
        for key in &singles {
            self.entries.remove(key);
        }
        self.order.retain(|k| self.entries.contains_key(k));

        if self.entries.len() >= self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Print one suppression line per repeated message, then reset.
    pub fn flush_summary(&mut self) {
        self.flushed = true;
        let keys: Vec<u64> = self.order.iter().copied().collect();
        for key in keys {
            if let Some(entry) = self.entries.get(&key) {
                if entry.count > 1 {
                    let line = format!(
                        "{}x suppressed: {}",
                        entry.count - 1,
                        entry.sample
                    );
                    let (level, target) = (entry.level, entry.target.clone());
                    self.inner.log(level, &target, &line);
                }
            }
        }
        self.entries.clear();
        self.order.clear();
    }
}

impl Drop for DedupLogger {
    fn drop(&mut self) {
        if !self.flushed {
            self.flush_summary();
        }
    }
}

fn hash_key(level: LogLevel, target: &str, message: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    (level as u8).hash(&mut hasher);
    target.hash(&mut hasher);
    message.hash(&mut hasher);
    hasher.finish()
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_SAMPLE_LEN {
        return message.to_string();
    }
    let truncated: String = message.chars().take(MAX_SAMPLE_LEN).collect();
    format!("{truncated}...")
}
