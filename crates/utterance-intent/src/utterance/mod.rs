//! Utterance segmentation: the state machine that turns a stream of
//! stabilizer snapshots into discrete, closed `Utterance` values.

use std::sync::Mutex;

use crate::clock::Millis;
use crate::stabilizer::{Stabilizer, WordConfidence};

/// Why an utterance closed. Evaluated in the order listed here — the first
/// condition that fires wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CloseReason {
    TerminalPunctuation,
    SilenceGap,
    MaxDuration,
    MaxLength,
    ExternalSignal,
    Manual,
}

/// A closed or in-flight utterance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Utterance {
    pub id: u64,
    pub opened_at: Millis,
    pub closed_at: Option<Millis>,
    pub committed_text: String,
    pub stable_text: String,
    pub raw_text: String,
    pub speaker_id: Option<String>,
    pub close_reason: Option<CloseReason>,
    pub committed_asr_timestamps: Vec<Millis>,
}

impl Utterance {
    fn open(id: u64, opened_at: Millis, speaker_id: Option<String>) -> Self {
        Self {
            id,
            opened_at,
            closed_at: None,
            committed_text: String::new(),
            stable_text: String::new(),
            raw_text: String::new(),
            speaker_id,
            close_reason: None,
            committed_asr_timestamps: Vec::new(),
        }
    }
}

/// A single ASR hypothesis. `text` empty is a legal no-op, per the core's
/// failure semantics.
#[derive(Debug, Clone)]
pub struct AsrEvent {
    pub text: String,
    pub is_final: bool,
    pub received_at: Millis,
    pub speaker_id: Option<String>,
    pub words: Option<Vec<WordConfidence>>,
}

/// A point-in-time stabilizer snapshot forwarded while an utterance is
/// active.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceSnapshot {
    pub id: u64,
    pub stable_text: String,
    pub raw_text: String,
    pub updated_at: Millis,
}

pub struct UtteranceBuilderConfig {
    pub silence_gap_threshold_ms: Millis,
    pub punctuation_pause_threshold_ms: Millis,
    pub max_utterance_duration_ms: Millis,
    pub max_utterance_length: usize,
}

/// Outcome of feeding one event into the builder: what happened downstream,
/// in the order it happened.
#[derive(Debug, Clone, Default)]
pub struct BuilderEffects {
    pub opened: Option<Utterance>,
    pub update: Option<UtteranceSnapshot>,
    pub finalized: Option<Utterance>,
}

impl BuilderEffects {
    fn with_finalized(u: Utterance) -> Self {
        Self {
            finalized: Some(u),
            ..Default::default()
        }
    }
}

struct ActiveState {
    utterance: Utterance,
    stabilizer: Stabilizer,
    last_asr_at: Millis,
}

/// Opens, updates, and closes utterances. The "current utterance" slot is
/// guarded by a single mutex so a concurrent timeout-checker thread and the
/// ASR-event thread can race to close without double-emitting a `Final`.
pub struct UtteranceBuilder {
    config: UtteranceBuilderConfig,
    stabilizer_window_size: usize,
    min_word_confidence: f32,
    require_repetition_for_low_confidence: bool,

    next_id: Mutex<u64>,
    active: Mutex<Option<ActiveState>>,
}

impl UtteranceBuilder {
    pub fn new(
        config: UtteranceBuilderConfig,
        stabilizer_window_size: usize,
        min_word_confidence: f32,
        require_repetition_for_low_confidence: bool,
    ) -> Self {
        Self {
            config,
            stabilizer_window_size,
            min_word_confidence,
            require_repetition_for_low_confidence,
            next_id: Mutex::new(1),
            active: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().unwrap().is_some()
    }

    /// Route one ASR event through the stabilizer, opening an utterance on
    /// first non-empty text, then check length-based close.
    pub fn process_asr_event(&self, event: AsrEvent) -> BuilderEffects {
        if event.text.trim().is_empty() {
            tracing::trace!("builder_process_asr_event_noop_empty_text");
            return BuilderEffects::default();
        }

        let mut guard = self.active.lock().unwrap();
        let mut opened = None;

        if guard.is_none() {
            let id = {
                let mut next = self.next_id.lock().unwrap();
                let id = *next;
                *next += 1;
                id
            };
            let utterance = Utterance::open(id, event.received_at, event.speaker_id.clone());
            opened = Some(utterance.clone());
            *guard = Some(ActiveState {
                utterance,
                stabilizer: Stabilizer::new(
                    self.stabilizer_window_size,
                    self.min_word_confidence,
                    self.require_repetition_for_low_confidence,
                ),
                last_asr_at: event.received_at,
            });
        }

        let state = guard.as_mut().unwrap();
        state.last_asr_at = event.received_at;

        if event.is_final {
            state.stabilizer.commit_final(&event.text);
            state
                .utterance
                .committed_asr_timestamps
                .push(event.received_at);
        } else {
            state.stabilizer.add_hypothesis(&event.text, event.words);
        }

        state.utterance.stable_text = state.stabilizer.stable_text().to_string();
        state.utterance.raw_text = state.stabilizer.raw_text().to_string();
        state.utterance.committed_text = state.stabilizer.committed_text().to_string();

        let update = Some(UtteranceSnapshot {
            id: state.utterance.id,
            stable_text: state.utterance.stable_text.clone(),
            raw_text: state.utterance.raw_text.clone(),
            updated_at: event.received_at,
        });

        let over_length = state.utterance.raw_text.len() >= self.config.max_utterance_length;
        drop(guard);

        let finalized = if over_length {
            self.close(CloseReason::MaxLength, event.received_at)
        } else {
            None
        };

        BuilderEffects {
            opened,
            update,
            finalized,
        }
    }

    pub fn signal_utterance_end(&self, now: Millis) -> BuilderEffects {
        match self.close(CloseReason::ExternalSignal, now) {
            Some(u) => BuilderEffects::with_finalized(u),
            None => BuilderEffects::default(),
        }
    }

    pub fn force_close(&self, now: Millis) -> BuilderEffects {
        match self.close(CloseReason::Manual, now) {
            Some(u) => BuilderEffects::with_finalized(u),
            None => BuilderEffects::default(),
        }
    }

    /// Evaluate the three timeout-driven close conditions, in priority
    /// order: terminal punctuation, then silence gap, then max duration.
    pub fn check_timeouts(&self, now: Millis) -> BuilderEffects {
        let reason = {
            let guard = self.active.lock().unwrap();
            let Some(state) = guard.as_ref() else {
                return BuilderEffects::default();
            };

            let elapsed_since_asr = now.saturating_sub(state.last_asr_at);
            let ends_with_terminal_punctuation = state
                .utterance
                .raw_text
                .trim_end()
                .ends_with(['.', '?', '!']);

            if ends_with_terminal_punctuation
                && elapsed_since_asr >= self.config.punctuation_pause_threshold_ms
            {
                Some(CloseReason::TerminalPunctuation)
            } else if elapsed_since_asr >= self.config.silence_gap_threshold_ms {
                Some(CloseReason::SilenceGap)
            } else if now.saturating_sub(state.utterance.opened_at)
                >= self.config.max_utterance_duration_ms
            {
                Some(CloseReason::MaxDuration)
            } else {
                None
            }
        };

        match reason.and_then(|r| self.close(r, now)) {
            Some(u) => BuilderEffects::with_finalized(u),
            None => BuilderEffects::default(),
        }
    }

    /// Compare-and-swap style close: takes the active slot if present,
    /// finalizes it, and leaves `None` behind. A concurrent caller racing
    /// for the same slot observes `None` and is a silent no-op.
    fn close(&self, reason: CloseReason, now: Millis) -> Option<Utterance> {
        let mut guard = self.active.lock().unwrap();
        let Some(state) = guard.take() else {
            tracing::trace!(?reason, "builder_close_lost_race");
            return None;
        };

        let mut utterance = state.utterance;
        utterance.closed_at = Some(now);
        utterance.close_reason = Some(reason);

        if utterance.committed_text.is_empty() && utterance.stable_text.is_empty() {
            utterance.stable_text = utterance.raw_text.clone();
        }

        tracing::debug!(utterance_id = utterance.id, ?reason, "builder_close_won_race");

        Some(utterance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> UtteranceBuilder {
        UtteranceBuilder::new(
            UtteranceBuilderConfig {
                silence_gap_threshold_ms: 750,
                punctuation_pause_threshold_ms: 300,
                max_utterance_duration_ms: 12_000,
                max_utterance_length: 1_000,
            },
            3,
            0.0,
            false,
        )
    }

    fn partial(text: &str, at: Millis) -> AsrEvent {
        AsrEvent {
            text: text.to_string(),
            is_final: false,
            received_at: at,
            speaker_id: None,
            words: None,
        }
    }

    fn finals(text: &str, at: Millis) -> AsrEvent {
        AsrEvent {
            text: text.to_string(),
            is_final: true,
            received_at: at,
            speaker_id: None,
            words: None,
        }
    }

    #[test]
    fn empty_text_opens_no_utterance() {
        let b = builder();
        let effects = b.process_asr_event(partial("", 0));
        assert!(effects.opened.is_none());
        assert!(!b.is_active());
    }

    #[test]
    fn first_nonempty_text_opens_an_utterance() {
        let b = builder();
        let effects = b.process_asr_event(partial("hello", 0));
        assert!(effects.opened.is_some());
        assert_eq!(effects.opened.unwrap().id, 1);
        assert!(b.is_active());
    }

    #[test]
    fn ids_strictly_increase_across_utterances() {
        let b = builder();
        let first = b.process_asr_event(partial("hello", 0)).opened.unwrap();
        b.force_close(1);
        let second = b.process_asr_event(partial("world", 2)).opened.unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn silence_gap_closes_after_threshold() {
        let b = builder();
        b.process_asr_event(partial("hello", 0));
        let effects = b.check_timeouts(800);
        let u = effects.finalized.expect("should close on silence");
        assert_eq!(u.close_reason, Some(CloseReason::SilenceGap));
    }

    #[test]
    fn exactly_at_threshold_counts_as_reached() {
        let b = builder();
        b.process_asr_event(partial("hello", 0));
        let effects = b.check_timeouts(750);
        assert_eq!(
            effects.finalized.unwrap().close_reason,
            Some(CloseReason::SilenceGap)
        );
    }

    #[test]
    fn terminal_punctuation_wins_over_silence_gap() {
        let b = builder();
        b.process_asr_event(finals("is this on?", 0));
        // 300ms (punctuation threshold) < 750ms (silence threshold); at
        // t=400 only punctuation has fired.
        let effects = b.check_timeouts(400);
        assert_eq!(
            effects.finalized.unwrap().close_reason,
            Some(CloseReason::TerminalPunctuation)
        );
    }

    #[test]
    fn max_duration_closes_a_long_running_utterance() {
        let b = builder();
        b.process_asr_event(partial("hello", 0));
        let effects = b.check_timeouts(12_000);
        assert_eq!(
            effects.finalized.unwrap().close_reason,
            Some(CloseReason::MaxDuration)
        );
    }

    #[test]
    fn max_length_closes_within_process_asr_event() {
        let b = UtteranceBuilder::new(
            UtteranceBuilderConfig {
                silence_gap_threshold_ms: 750,
                punctuation_pause_threshold_ms: 300,
                max_utterance_duration_ms: 12_000,
                max_utterance_length: 5,
            },
            3,
            0.0,
            false,
        );
        let effects = b.process_asr_event(partial("way too long for the cap", 0));
        assert_eq!(
            effects.finalized.unwrap().close_reason,
            Some(CloseReason::MaxLength)
        );
    }

    #[test]
    fn external_signal_closes_immediately() {
        let b = builder();
        b.process_asr_event(partial("hello", 0));
        let effects = b.signal_utterance_end(10);
        assert_eq!(
            effects.finalized.unwrap().close_reason,
            Some(CloseReason::ExternalSignal)
        );
        assert!(!b.is_active());
    }

    #[test]
    fn force_close_closes_manually() {
        let b = builder();
        b.process_asr_event(partial("hello", 0));
        let effects = b.force_close(10);
        assert_eq!(
            effects.finalized.unwrap().close_reason,
            Some(CloseReason::Manual)
        );
    }

    #[test]
    fn closing_an_already_idle_builder_is_a_no_op() {
        let b = builder();
        let effects = b.force_close(10);
        assert!(effects.finalized.is_none());
    }

    #[test]
    fn split_question_scenario_reaches_expected_stable_text() {
        let b = builder();
        b.process_asr_event(partial("What", 0));
        b.process_asr_event(partial("What is", 100));
        b.process_asr_event(partial("What is a", 200));
        b.process_asr_event(partial("What is a lock", 300));
        b.process_asr_event(finals("What is a lock statement", 400));
        b.process_asr_event(partial("used for", 500));
        b.process_asr_event(partial("used for in", 600));
        let effects_final = b.process_asr_event(finals("used for in C#?", 700));
        assert!(effects_final.finalized.is_none());

        let effects = b.signal_utterance_end(800);
        let u = effects.finalized.unwrap();
        assert_eq!(u.close_reason, Some(CloseReason::ExternalSignal));
        assert!(u.stable_text.contains("What is a lock statement"));
        assert!(u.stable_text.contains("used for in C#?"));
    }

    #[test]
    fn committed_asr_timestamps_track_only_finals() {
        let b = builder();
        b.process_asr_event(partial("hello", 0));
        b.process_asr_event(finals("hello world", 100));
        let effects = b.force_close(200);
        assert_eq!(effects.finalized.unwrap().committed_asr_timestamps, vec![100]);
    }
}
