//! Streaming ASR-to-intent pipeline.
//!
//! Converts an unstable stream of speech-to-text hypotheses into discrete
//! utterances carrying a classified intent, and routes imperative intents
//! to action handlers under debounce and last-wins conflict resolution.
//!
//! The core performs no I/O, never blocks, and never panics across an event
//! boundary: malformed input is normalized or dropped, and handler faults
//! are caught and reported through [`events::Subscriber::on_error`] rather
//! than propagated.

pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod events;
pub mod intent;
pub mod pipeline;
pub mod router;
pub mod stabilizer;
pub mod utterance;

pub use clock::{Clock, Millis, ManualClock, SystemClock};
pub use config::{CooldownConfig, PipelineConfig, PipelineConfigBuilder};
pub use error::Error;
pub use events::{PipelineErrorEvent, Subscriber, TracingSubscriber};
pub use intent::{DetectedIntent, HeuristicDetector, ImperativeSubtype, IntentDetector, IntentType, QuestionSubtype, Slots, Subtype};
pub use pipeline::{AsrEvent, UtteranceIntentPipeline};
pub use router::ActionEvent;
pub use stabilizer::WordConfidence;
pub use utterance::CloseReason;
