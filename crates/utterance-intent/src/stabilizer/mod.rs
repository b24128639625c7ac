//! Extracts a monotonically growing "stable" prefix from a window of
//! overlapping, possibly-revising ASR hypotheses.
//!
//! The stabilizer holds a bounded FIFO of recent hypotheses and, on every
//! update, recomputes the word-level longest common prefix (LCP) across the
//! whole window. The emitted stable text is the longer of the previous
//! stable text and `committed_text + LCP` — it never shortens, matching the
//! "transcript-as-oracle" convention of treating text as a token sequence
//! rather than a raw byte prefix.

use std::collections::VecDeque;

/// One word with optional per-word ASR confidence, as carried by an
/// `AsrEvent`.
#[derive(Debug, Clone, PartialEq)]
pub struct WordConfidence {
    pub word: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default)]
struct Hypothesis {
    tokens: Vec<String>,
    words: Option<Vec<WordConfidence>>,
}

/// A point-in-time view of the stabilizer's derived state, emitted after
/// every `add_hypothesis`/`commit_final` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StableSnapshot {
    pub stable_text: String,
    pub raw_text: String,
}

/// Longest-common-prefix stabilizer over a bounded hypothesis window.
pub struct Stabilizer {
    window: VecDeque<Hypothesis>,
    window_size: usize,
    min_word_confidence: f32,
    require_repetition_for_low_confidence: bool,

    committed_text: String,
    stable_text: String,
    raw_text: String,
}

impl Stabilizer {
    pub fn new(
        window_size: usize,
        min_word_confidence: f32,
        require_repetition_for_low_confidence: bool,
    ) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size.max(1)),
            window_size: window_size.max(1),
            min_word_confidence,
            require_repetition_for_low_confidence,
            committed_text: String::new(),
            stable_text: String::new(),
            raw_text: String::new(),
        }
    }

    pub fn stable_text(&self) -> &str {
        &self.stable_text
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn committed_text(&self) -> &str {
        &self.committed_text
    }

    /// Feed one non-final hypothesis. Malformed input (empty/whitespace
    /// text) is a no-op, per the core's failure semantics.
    pub fn add_hypothesis(&mut self, text: &str, words: Option<Vec<WordConfidence>>) -> &str {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::trace!("stabilizer_add_hypothesis_noop_empty_text");
            return &self.stable_text;
        }

        let tokens: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
        self.raw_text = join_committed_and_lcp(&self.committed_text, &tokens);

        while self.window.len() >= self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(Hypothesis { tokens, words });

        let lcp = self.compute_lcp();
        let candidate = join_committed_and_lcp(&self.committed_text, &lcp);

        if candidate.split_whitespace().count() > self.stable_text.split_whitespace().count() {
            self.stable_text = candidate;
        }

        &self.stable_text
    }

    /// Append a finalized ASR segment to committed text, clear the
    /// hypothesis window, and reset `stable_text` to the new committed
    /// text. Malformed input (empty/whitespace) is a no-op.
    pub fn commit_final(&mut self, text: &str) -> &str {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::trace!("stabilizer_commit_final_noop_empty_text");
            return &self.committed_text;
        }

        if self.committed_text.is_empty() {
            self.committed_text = trimmed.to_string();
        } else {
            self.committed_text.push(' ');
            self.committed_text.push_str(trimmed);
        }

        self.window.clear();
        self.stable_text = self.committed_text.clone();
        self.raw_text = self.committed_text.clone();

        &self.committed_text
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.committed_text.clear();
        self.stable_text.clear();
        self.raw_text.clear();
    }

    /// Word-level LCP across all hypotheses currently in the window. Fewer
    /// than two queued hypotheses means no stability claim yet — the LCP is
    /// empty.
    fn compute_lcp(&self) -> Vec<String> {
        if self.window.len() < 2 {
            return Vec::new();
        }

        let shortest_len = self.window.iter().map(|h| h.tokens.len()).min().unwrap_or(0);
        let mut lcp = Vec::with_capacity(shortest_len);

        'outer: for i in 0..shortest_len {
            let first = &self.window[0].tokens[i];
            for hyp in self.window.iter().skip(1) {
                if &hyp.tokens[i] != first {
                    break 'outer;
                }
            }

            if !self.word_passes_confidence_gate(i) {
                break;
            }

            lcp.push(first.clone());
        }

        lcp
    }

    /// A word at window position `i` passes the confidence gate if gating
    /// is disabled, if every hypothesis carrying per-word confidence meets
    /// the threshold, or — when repetition is required for low-confidence
    /// words — if it appears at all in at least two hypotheses.
    fn word_passes_confidence_gate(&self, i: usize) -> bool {
        if self.min_word_confidence <= 0.0 {
            return true;
        }

        let mut seen = 0u32;
        let mut all_meet_threshold = true;

        for hyp in &self.window {
            if let Some(words) = &hyp.words {
                if let Some(wc) = words.get(i) {
                    seen += 1;
                    if wc.confidence < self.min_word_confidence {
                        all_meet_threshold = false;
                    }
                }
            }
        }

        if all_meet_threshold {
            return true;
        }

        self.require_repetition_for_low_confidence && seen >= 2
    }
}

fn join_committed_and_lcp(committed: &str, lcp: &[String]) -> String {
    if lcp.is_empty() {
        return committed.to_string();
    }
    if committed.is_empty() {
        return lcp.join(" ");
    }
    format!("{committed} {}", lcp.join(" "))
}
