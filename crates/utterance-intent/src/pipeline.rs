//! Top-level wiring: `Stabilizer → UtteranceBuilder → IntentDetector →
//! Deduplicator → ActionRouter`, fronted by a single ingestion entry point.
//!
//! Ordering guarantees (see `processAsrEvent` and `checkTimeouts`):
//! - For a given utterance, `Open` strictly precedes all `Update`s, which
//!   strictly precede `Final`.
//! - `IntentFinal(u)` is emitted after `UtteranceFinal(u)` within the same
//!   call.
//! - `ActionTriggered` for an intent fires either immediately within the
//!   same call, or at a subsequent `check_conflict_window` tick.

use std::sync::Arc;

use crate::clock::{Clock, Millis, SystemClock};
use crate::config::PipelineConfig;
use crate::dedup::{Deduplicator, DeduplicatorConfig};
use crate::error::Error;
use crate::events::{
    AsrFinalEvent, AsrPartialEvent, IntentCandidateEvent, IntentFinalEvent, PipelineErrorEvent,
    Subscriber, UtteranceFinalEvent, UtteranceOpenEvent, UtteranceUpdateEvent,
};
use crate::intent::{HeuristicDetector, IntentDetector, IntentType};
use crate::router::{ActionRouter, ActionRouterConfig, Handler};
use crate::stabilizer::WordConfidence;
use crate::utterance::{AsrEvent as RawAsrEvent, BuilderEffects, Utterance, UtteranceBuilder, UtteranceBuilderConfig};

/// One ASR hypothesis as seen by callers of the pipeline.
#[derive(Debug, Clone)]
pub struct AsrEvent {
    pub text: String,
    pub is_final: bool,
    pub received_at: Millis,
    pub speaker_id: Option<String>,
    pub words: Option<Vec<WordConfidence>>,
}

/// Wires the five components together and exposes the single entry point
/// external callers drive: `process_asr_event`, plus the two cooperative
/// timeout ticks.
pub struct UtteranceIntentPipeline {
    clock: Arc<dyn Clock>,
    subscribers: Vec<Arc<dyn Subscriber>>,
    detector: Box<dyn IntentDetector>,

    builder: UtteranceBuilder,
    dedup: Deduplicator,
    router: ActionRouter,

    intent_min_confidence: f32,
    candidate_min_confidence: f32,
}

impl UtteranceIntentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        let builder = UtteranceBuilder::new(
            UtteranceBuilderConfig {
                silence_gap_threshold_ms: config.silence_gap_threshold_ms,
                punctuation_pause_threshold_ms: config.punctuation_pause_threshold_ms,
                max_utterance_duration_ms: config.max_utterance_duration_ms,
                max_utterance_length: config.max_utterance_length,
            },
            config.stabilizer_window_size,
            config.min_word_confidence,
            config.require_repetition_for_low_confidence,
        );

        let dedup = Deduplicator::new(DeduplicatorConfig {
            similarity_threshold: config.dedup_similarity_threshold,
            window_ms: config.dedup_window_ms,
            capacity: config.dedup_capacity,
        });

        let router = ActionRouter::new(ActionRouterConfig {
            conflict_window_ms: config.conflict_window_ms,
            cooldowns: config.cooldowns.clone(),
        });

        Self {
            clock,
            subscribers: Vec::new(),
            detector: Box::new(HeuristicDetector),
            builder,
            dedup,
            router,
            intent_min_confidence: config.intent_min_confidence,
            candidate_min_confidence: config.candidate_min_confidence,
        }
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn set_detector(&mut self, detector: Box<dyn IntentDetector>) {
        self.detector = detector;
    }

    pub fn register_handler(
        &self,
        subtype: crate::intent::ImperativeSubtype,
        handler: Handler,
    ) {
        self.router.register_handler(subtype, handler);
    }

    fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Single entry point for new ASR hypotheses. Returns after every
    /// downstream event for this call has fired.
    pub fn process_asr_event(&self, event: AsrEvent) {
        if event.text.trim().is_empty() {
            return;
        }

        if event.is_final {
            self.emit_asr_final(&event);
        } else {
            self.emit_asr_partial(&event);
        }

        let effects = self.builder.process_asr_event(RawAsrEvent {
            text: event.text.clone(),
            is_final: event.is_final,
            received_at: event.received_at,
            speaker_id: event.speaker_id.clone(),
            words: event.words.clone(),
        });

        self.handle_builder_effects(effects);
    }

    pub fn signal_utterance_end(&self) {
        let effects = self.builder.signal_utterance_end(self.now());
        self.handle_builder_effects(effects);
    }

    pub fn force_close(&self) {
        let effects = self.builder.force_close(self.now());
        self.handle_builder_effects(effects);
    }

    /// Cooperative tick for silence/punctuation/max-duration closes. Safe to
    /// call from a second thread (e.g. a periodic timer).
    pub fn check_timeouts(&self) {
        let effects = self.builder.check_timeouts(self.now());
        self.handle_builder_effects(effects);
        self.check_conflict_window();
    }

    pub fn check_conflict_window(&self) {
        let outcome = self.router.check_conflict_window(self.now());
        if let Some(action) = outcome.action {
            self.emit_action(action);
        }
        if let Some(error) = outcome.error {
            self.emit_error(error);
        }
    }

    fn handle_builder_effects(&self, effects: BuilderEffects) {
        if let Some(opened) = effects.opened {
            self.emit_open(&opened);
        }
        if let Some(update) = effects.update {
            for sub in &self.subscribers {
                sub.on_utterance_update(&UtteranceUpdateEvent {
                    id: update.id,
                    stable_text: update.stable_text.clone(),
                    raw_text: update.raw_text.clone(),
                    updated_at: update.updated_at,
                });
            }

            if let Some(candidate) = self
                .detector
                .detect_candidate(&update.stable_text, self.candidate_min_confidence)
            {
                self.emit_candidate(update.id, candidate);
            }
        }
        if let Some(finalized) = effects.finalized {
            self.finalize_utterance(finalized);
        }
    }

    fn finalize_utterance(&self, utterance: Utterance) {
        self.emit_final(&utterance);

        let intent = self.detector.detect_final(&utterance.stable_text);
        if matches!(intent.intent_type, IntentType::Other)
            || intent.confidence < self.intent_min_confidence
        {
            return;
        }

        let now = self.now();
        if self.dedup.is_duplicate(&intent.source_text, now) {
            return;
        }
        self.dedup.record(&intent.source_text, now);

        for sub in &self.subscribers {
            sub.on_intent_final(&IntentFinalEvent {
                utterance_id: utterance.id,
                intent: intent.clone(),
            });
        }

        if matches!(intent.intent_type, IntentType::Imperative) {
            let outcome = self.router.route(intent, utterance.id, now);
            if let Some(action) = outcome.action {
                self.emit_action(action);
            }
            if let Some(error) = outcome.error {
                self.emit_error(error);
            }
        }
    }

    fn emit_asr_partial(&self, event: &AsrEvent) {
        for sub in &self.subscribers {
            sub.on_asr_partial(&AsrPartialEvent {
                text: event.text.clone(),
                received_at: event.received_at,
                speaker_id: event.speaker_id.clone(),
            });
        }
    }

    fn emit_asr_final(&self, event: &AsrEvent) {
        for sub in &self.subscribers {
            sub.on_asr_final(&AsrFinalEvent {
                text: event.text.clone(),
                received_at: event.received_at,
                speaker_id: event.speaker_id.clone(),
            });
        }
    }

    fn emit_open(&self, utterance: &Utterance) {
        for sub in &self.subscribers {
            sub.on_utterance_open(&UtteranceOpenEvent {
                id: utterance.id,
                opened_at: utterance.opened_at,
                speaker_id: utterance.speaker_id.clone(),
            });
        }
    }

    fn emit_final(&self, utterance: &Utterance) {
        let event = UtteranceFinalEvent {
            id: utterance.id,
            opened_at: utterance.opened_at,
            closed_at: utterance.closed_at.unwrap_or(utterance.opened_at),
            stable_text: utterance.stable_text.clone(),
            raw_text: utterance.raw_text.clone(),
            committed_text: utterance.committed_text.clone(),
            close_reason: utterance
                .close_reason
                .expect("finalized utterance always carries a close reason"),
            committed_asr_timestamps: utterance.committed_asr_timestamps.clone(),
            speaker_id: utterance.speaker_id.clone(),
        };
        for sub in &self.subscribers {
            sub.on_utterance_final(&event);
        }
    }

    fn emit_candidate(&self, utterance_id: u64, intent: crate::intent::DetectedIntent) {
        for sub in &self.subscribers {
            sub.on_intent_candidate(&IntentCandidateEvent {
                utterance_id,
                intent: intent.clone(),
            });
        }
    }

    fn emit_action(&self, action: crate::router::ActionEvent) {
        for sub in &self.subscribers {
            sub.on_action_triggered(&action);
        }
    }

    fn emit_error(&self, error: Error) {
        let event = PipelineErrorEvent {
            message: error.to_string(),
        };
        for sub in &self.subscribers {
            sub.on_error(&event);
        }
    }

    pub fn reset(&self) {
        self.dedup.reset();
        self.router.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSubscriber {
        opens: AtomicUsize,
        finals: AtomicUsize,
        intent_finals: Mutex<Vec<IntentFinalEvent>>,
        actions: Mutex<Vec<crate::router::ActionEvent>>,
    }

    impl Subscriber for RecordingSubscriber {
        fn on_utterance_open(&self, _event: &UtteranceOpenEvent) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }

        fn on_utterance_final(&self, _event: &UtteranceFinalEvent) {
            self.finals.fetch_add(1, Ordering::SeqCst);
        }

        fn on_intent_final(&self, event: &IntentFinalEvent) {
            self.intent_finals.lock().unwrap().push(event.clone());
        }

        fn on_action_triggered(&self, event: &crate::router::ActionEvent) {
            self.actions.lock().unwrap().push(event.clone());
        }
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

    fn pipeline_with_recorder() -> (UtteranceIntentPipeline, Arc<RecordingSubscriber>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let mut pipeline = UtteranceIntentPipeline::with_clock(PipelineConfig::default(), clock.clone());
        let recorder = Arc::new(RecordingSubscriber::default());
        pipeline.subscribe(recorder.clone());
        (pipeline, recorder, clock)
    }

    #[test]
    fn split_question_scenario() {
        let (pipeline, recorder, _clock) = pipeline_with_recorder();

        pipeline.process_asr_event(partial("What", 0));
        pipeline.process_asr_event(partial("What is", 100));
        pipeline.process_asr_event(partial("What is a", 200));
        pipeline.process_asr_event(partial("What is a lock", 300));
        pipeline.process_asr_event(finals("What is a lock statement", 400));
        pipeline.process_asr_event(partial("used for", 500));
        pipeline.process_asr_event(partial("used for in", 600));
        pipeline.process_asr_event(finals("used for in C#?", 700));
        pipeline.signal_utterance_end();

        assert_eq!(recorder.opens.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.finals.load(Ordering::SeqCst), 1);

        let intents = recorder.intent_finals.lock().unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].intent.intent_type, IntentType::Question);
        assert_eq!(
            intents[0].intent.subtype,
            crate::intent::Subtype::Question(crate::intent::QuestionSubtype::Definition)
        );
        assert!(intents[0]
            .intent
            .slots
            .topic
            .as_deref()
            .unwrap()
            .contains("lock statement"));

        assert!(recorder.actions.lock().unwrap().is_empty());
    }

    #[test]
    fn polite_imperative_scenario() {
        let (pipeline, recorder, clock) = pipeline_with_recorder();

        pipeline.process_asr_event(partial("Can you", 0));
        pipeline.process_asr_event(partial("Can you repeat", 100));
        pipeline.process_asr_event(finals("Can you repeat that", 200));
        pipeline.signal_utterance_end();
        clock.set(1_500);
        pipeline.check_conflict_window();

        let intents = recorder.intent_finals.lock().unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].intent.intent_type, IntentType::Imperative);
        assert!(intents[0].intent.confidence >= 0.4);

        let actions = recorder.actions.lock().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_name, "repeat");
        assert!(!actions[0].was_debounced);
    }

    #[test]
    fn slot_extraction_scenario() {
        let (pipeline, recorder, _clock) = pipeline_with_recorder();
        pipeline.process_asr_event(finals("repeat number 3", 0));
        pipeline.signal_utterance_end();

        let intents = recorder.intent_finals.lock().unwrap();
        assert_eq!(intents[0].intent.slots.count, Some(3));
        assert_eq!(intents[0].intent.slots.reference.as_deref(), Some("number 3"));
    }

    #[test]
    fn silence_close_scenario() {
        let clock = Arc::new(ManualClock::new());
        let mut pipeline = UtteranceIntentPipeline::with_clock(PipelineConfig::default(), clock.clone());
        let recorder = Arc::new(RecordingSubscriber::default());
        pipeline.subscribe(recorder.clone());

        pipeline.process_asr_event(partial("Hello", 0));
        clock.set(800);
        pipeline.check_timeouts();

        assert_eq!(recorder.finals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_imperative_intent_never_reaches_action_router() {
        let (pipeline, recorder, _clock) = pipeline_with_recorder();
        pipeline.process_asr_event(finals("the build finished successfully.", 0));
        pipeline.signal_utterance_end();

        assert!(recorder.actions.lock().unwrap().is_empty());
    }

    #[test]
    fn dedup_suppresses_repeated_intent_final_emission() {
        let (pipeline, recorder, _clock) = pipeline_with_recorder();

        pipeline.process_asr_event(finals("what is a lock statement used for", 0));
        pipeline.signal_utterance_end();

        pipeline.process_asr_event(finals("what is a lock statement needed for", 100));
        pipeline.signal_utterance_end();

        assert_eq!(recorder.intent_finals.lock().unwrap().len(), 1);
    }
}
