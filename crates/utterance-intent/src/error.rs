/// Errors surfaced across the pipeline's public boundary.
///
/// Per the core's error-handling design, most malformed-input and
/// concurrent-close conditions are recovered silently (normalized or
/// dropped) rather than returned as `Result::Err` — they are logged at
/// `tracing::debug!` instead. This enum exists for the one kind that must
/// reach the caller: a registered imperative handler faulting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("imperative handler for subtype {subtype:?} failed: {message}")]
    HandlerFault {
        subtype: crate::intent::ImperativeSubtype,
        message: String,
    },
}
