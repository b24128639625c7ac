//! Public event payloads and the subscriber contract.
//!
//! Emission is synchronous on the producing thread: every `process_asr_event`
//! call fires all downstream events before returning, in the ordering
//! guarantees spelled out on [`crate::pipeline::UtteranceIntentPipeline`].

use crate::clock::Millis;
use crate::intent::DetectedIntent;
use crate::utterance::CloseReason;

pub use crate::router::ActionEvent;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AsrPartialEvent {
    pub text: String,
    pub received_at: Millis,
    pub speaker_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AsrFinalEvent {
    pub text: String,
    pub received_at: Millis,
    pub speaker_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UtteranceOpenEvent {
    pub id: u64,
    pub opened_at: Millis,
    pub speaker_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UtteranceUpdateEvent {
    pub id: u64,
    pub stable_text: String,
    pub raw_text: String,
    pub updated_at: Millis,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UtteranceFinalEvent {
    pub id: u64,
    pub opened_at: Millis,
    pub closed_at: Millis,
    pub stable_text: String,
    pub raw_text: String,
    pub committed_text: String,
    pub close_reason: CloseReason,
    pub committed_asr_timestamps: Vec<Millis>,
    pub speaker_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IntentCandidateEvent {
    pub utterance_id: u64,
    pub intent: DetectedIntent,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IntentFinalEvent {
    pub utterance_id: u64,
    pub intent: DetectedIntent,
}

/// A subscriber callback faulted or a recoverable internal condition was
/// downgraded to a no-op; carried as a message, not a typed error, since
/// subscribers live outside this crate's error taxonomy.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineErrorEvent {
    pub message: String,
}

/// Every downstream observer of the pipeline implements this. Callbacks run
/// on the emitting thread and must not block or panic; a default no-op
/// implementation is provided for every method so observers only override
/// what they care about.
pub trait Subscriber: Send + Sync {
    fn on_asr_partial(&self, _event: &AsrPartialEvent) {}
    fn on_asr_final(&self, _event: &AsrFinalEvent) {}
    fn on_utterance_open(&self, _event: &UtteranceOpenEvent) {}
    fn on_utterance_update(&self, _event: &UtteranceUpdateEvent) {}
    fn on_utterance_final(&self, _event: &UtteranceFinalEvent) {}
    fn on_intent_candidate(&self, _event: &IntentCandidateEvent) {}
    fn on_intent_final(&self, _event: &IntentFinalEvent) {}
    fn on_action_triggered(&self, _event: &ActionEvent) {}
    fn on_error(&self, _event: &PipelineErrorEvent) {}
}

/// A subscriber that forwards every event to `tracing` under a terse,
/// snake_case event name, at `debug` level (`info`/`warn` for actions and
/// errors).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSubscriber;

impl Subscriber for TracingSubscriber {
    fn on_utterance_open(&self, event: &UtteranceOpenEvent) {
        tracing::debug!(utterance_id = event.id, opened_at = event.opened_at, "utterance_opened");
    }

    fn on_utterance_final(&self, event: &UtteranceFinalEvent) {
        tracing::debug!(
            utterance_id = event.id,
            close_reason = ?event.close_reason,
            "utterance_closed"
        );
    }

    fn on_intent_final(&self, event: &IntentFinalEvent) {
        tracing::debug!(
            utterance_id = event.utterance_id,
            intent_type = ?event.intent.intent_type,
            confidence = event.intent.confidence,
            "intent_final"
        );
    }

    fn on_action_triggered(&self, event: &ActionEvent) {
        tracing::info!(
            action = event.action_name,
            was_debounced = event.was_debounced,
            "action_triggered"
        );
    }

    fn on_error(&self, event: &PipelineErrorEvent) {
        tracing::warn!(message = %event.message, "pipeline_error");
    }
}
