//! Replays a recorded JSON array of `AsrEvent`s through the pipeline and
//! prints every emitted event, in the style of `listener-core`'s CLI demo.
//!
//! ```text
//! cargo run -p utterance-intent --example replay -- events.json
//! ```

use std::sync::Arc;

use clap::Parser;
use utterance_intent::events::{
    ActionEvent, IntentCandidateEvent, IntentFinalEvent, PipelineErrorEvent, Subscriber,
    UtteranceFinalEvent, UtteranceOpenEvent, UtteranceUpdateEvent,
};
use utterance_intent::{AsrEvent, Millis, PipelineConfig, UtteranceIntentPipeline, WordConfidence};

#[derive(Parser)]
struct Args {
    /// Path to a JSON array of recorded ASR events.
    path: std::path::PathBuf,
}

#[derive(serde::Deserialize)]
struct RecordedEvent {
    text: String,
    #[serde(default)]
    is_final: bool,
    received_at: Millis,
    #[serde(default)]
    speaker_id: Option<String>,
    #[serde(default)]
    words: Option<Vec<RecordedWord>>,
}

#[derive(serde::Deserialize)]
struct RecordedWord {
    word: String,
    confidence: f32,
}

struct PrintingSubscriber;

impl Subscriber for PrintingSubscriber {
    fn on_utterance_open(&self, event: &UtteranceOpenEvent) {
        eprintln!("[utterance] open id={}", event.id);
    }

    fn on_utterance_update(&self, event: &UtteranceUpdateEvent) {
        eprintln!("[utterance] update id={} stable={:?}", event.id, event.stable_text);
    }

    fn on_utterance_final(&self, event: &UtteranceFinalEvent) {
        eprintln!(
            "[utterance] final id={} reason={:?} text={:?}",
            event.id, event.close_reason, event.stable_text
        );
    }

    fn on_intent_candidate(&self, event: &IntentCandidateEvent) {
        eprintln!(
            "[intent] candidate utterance={} type={:?} confidence={:.2}",
            event.utterance_id, event.intent.intent_type, event.intent.confidence
        );
    }

    fn on_intent_final(&self, event: &IntentFinalEvent) {
        println!(
            "{}",
            serde_json::to_string(&event.intent).unwrap_or_default()
        );
    }

    fn on_action_triggered(&self, event: &ActionEvent) {
        eprintln!(
            "[action] {} debounced={}",
            event.action_name, event.was_debounced
        );
    }

    fn on_error(&self, event: &PipelineErrorEvent) {
        eprintln!("[error] {}", event.message);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.path)?;
    let recorded: Vec<RecordedEvent> = serde_json::from_str(&raw)?;

    let mut pipeline = UtteranceIntentPipeline::new(PipelineConfig::default());
    pipeline.subscribe(Arc::new(PrintingSubscriber));

    for event in recorded {
        pipeline.process_asr_event(AsrEvent {
            text: event.text,
            is_final: event.is_final,
            received_at: event.received_at,
            speaker_id: event.speaker_id,
            words: event.words.map(|ws| {
                ws.into_iter()
                    .map(|w| WordConfidence {
                        word: w.word,
                        confidence: w.confidence,
                    })
                    .collect()
            }),
        });
    }
    pipeline.signal_utterance_end();
    pipeline.check_conflict_window();

    Ok(())
}
