//! Near-duplicate suppression over recently emitted intent text.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::clock::Millis;

fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_set(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

fn jaccard(a: &str, b: &str) -> f32 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

#[derive(Debug, Clone)]
struct Entry {
    normalized: String,
    emitted_at: Millis,
}

pub struct DeduplicatorConfig {
    pub similarity_threshold: f32,
    pub window_ms: Millis,
    pub capacity: usize,
}

/// Sliding-window near-duplicate filter keyed on Jaccard similarity of
/// normalized token sets. Entries are a bounded FIFO; expired entries are
/// pruned on every check.
pub struct Deduplicator {
    config: DeduplicatorConfig,
    entries: Mutex<VecDeque<Entry>>,
}

impl Deduplicator {
    pub fn new(config: DeduplicatorConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// True if `text` Jaccard-matches a still-live retained entry.
    pub fn is_duplicate(&self, text: &str, now: Millis) -> bool {
        let normalized = normalize(text);
        let mut entries = self.entries.lock().unwrap();
        self.prune(&mut entries, now);

        entries
            .iter()
            .any(|e| jaccard(&e.normalized, &normalized) >= self.config.similarity_threshold)
    }

    /// Record `text` as seen. If it is a superset (contains an existing
    /// entry's normalized text as a substring), that entry is replaced
    /// rather than duplicated — the deduplicator always holds the most
    /// complete form.
    pub fn record(&self, text: &str, now: Millis) {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return;
        }

        let mut entries = self.entries.lock().unwrap();
        self.prune(&mut entries, now);

        if let Some(existing) = entries
            .iter_mut()
            .find(|e| normalized.contains(e.normalized.as_str()))
        {
            existing.normalized = normalized;
            existing.emitted_at = now;
            return;
        }

        while entries.len() >= self.config.capacity {
            entries.pop_front();
        }

        entries.push_back(Entry {
            normalized,
            emitted_at: now,
        });
    }

    pub fn reset(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn prune(&self, entries: &mut VecDeque<Entry>, now: Millis) {
        entries.retain(|e| now.saturating_sub(e.emitted_at) <= self.config.window_ms);
    }
}
