//! Heuristic intent classification.
//!
//! Pattern families are precompiled once (see [`patterns`]) and evaluated in
//! a fixed priority order — Imperative, then Question, then Statement —
//! because a grammatically interrogative sentence ("can you repeat that")
//! is frequently semantically imperative.

mod patterns;
mod slots;

pub use slots::Slots;

/// Top-level classification of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IntentType {
    Question,
    Imperative,
    Statement,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ImperativeSubtype {
    Stop,
    Repeat,
    Continue,
    StartOver,
    Generate,
}

impl ImperativeSubtype {
    /// Lowercased action name used by `ActionEvent::action_name`.
    pub fn action_name(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Repeat => "repeat",
            Self::Continue => "continue",
            Self::StartOver => "start_over",
            Self::Generate => "generate_questions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum QuestionSubtype {
    Definition,
    HowTo,
    Compare,
    Troubleshoot,
    Generic,
}

/// Subtype carried by a [`DetectedIntent`], specific to its [`IntentType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Subtype {
    Imperative(ImperativeSubtype),
    Question(QuestionSubtype),
    None,
}

/// The result of classifying one piece of utterance text. Immutable,
/// produced by a pure function of its input string.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectedIntent {
    pub intent_type: IntentType,
    pub subtype: Subtype,
    pub confidence: f32,
    pub source_text: String,
    pub slots: Slots,
}

impl DetectedIntent {
    fn other(source_text: &str) -> Self {
        Self {
            intent_type: IntentType::Other,
            subtype: Subtype::None,
            confidence: 0.0,
            source_text: source_text.to_string(),
            slots: Slots::default(),
        }
    }
}

/// Classifier contract. The crate's only built-in implementation is
/// [`HeuristicDetector`]; hosts may substitute an LLM-backed one for
/// `detect_final` without the core depending on any particular model API.
pub trait IntentDetector: Send + Sync {
    /// Authoritative classification, run once per closed utterance.
    /// Always returns a value; empty input yields `IntentType::Other`.
    fn detect_final(&self, text: &str) -> DetectedIntent;

    /// Early classification for UI hinting, run on provisional text.
    /// Returns `None` when no type clears `candidate_min_confidence`.
    fn detect_candidate(&self, text: &str, candidate_min_confidence: f32) -> Option<DetectedIntent>;
}

/// The crate's pattern-based detector: precompiled regex families over
/// case-insensitive text, no learned weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

impl IntentDetector for HeuristicDetector {
    fn detect_final(&self, text: &str) -> DetectedIntent {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return DetectedIntent::other(text);
        }
        classify(trimmed)
    }

    fn detect_candidate(&self, text: &str, candidate_min_confidence: f32) -> Option<DetectedIntent> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let intent = classify(trimmed);
        (intent.confidence >= candidate_min_confidence).then_some(intent)
    }
}

/// Strip a leading politeness wrapper ("please", "can you", "could you",
/// "would you") so the imperative-verb patterns underneath can match a
/// grammatically question-shaped sentence.
fn strip_polite_prefix(text: &str) -> &str {
    match patterns::POLITE_PREFIX.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

fn classify(text: &str) -> DetectedIntent {
    if let Some(intent) = classify_imperative(text) {
        return intent;
    }
    if let Some(intent) = classify_question(text) {
        return intent;
    }
    classify_statement(text)
}

fn classify_imperative(text: &str) -> Option<DetectedIntent> {
    // `Stop` matches only at the very start (with an optional "please"
    // prefix baked into its own pattern) — "please stop" must not be
    // conflated with a mid-sentence "continue" match, so check it first
    // against the untouched text.
    if patterns::STOP.is_match(text) {
        return Some(DetectedIntent {
            intent_type: IntentType::Imperative,
            subtype: Subtype::Imperative(ImperativeSubtype::Stop),
            confidence: 0.95,
            source_text: text.to_string(),
            slots: Slots::default(),
        });
    }

    let candidate = strip_polite_prefix(text);

    if patterns::REPEAT.is_match(candidate) {
        return Some(DetectedIntent {
            intent_type: IntentType::Imperative,
            subtype: Subtype::Imperative(ImperativeSubtype::Repeat),
            confidence: 0.8,
            source_text: text.to_string(),
            slots: slots::repeat_slots(text),
        });
    }

    if patterns::GENERATE.is_match(candidate) {
        return Some(DetectedIntent {
            intent_type: IntentType::Imperative,
            subtype: Subtype::Imperative(ImperativeSubtype::Generate),
            confidence: 0.85,
            source_text: text.to_string(),
            slots: slots::generate_slots(text),
        });
    }

    if patterns::START_OVER.is_match(candidate) {
        return Some(DetectedIntent {
            intent_type: IntentType::Imperative,
            subtype: Subtype::Imperative(ImperativeSubtype::StartOver),
            confidence: 0.8,
            source_text: text.to_string(),
            slots: Slots::default(),
        });
    }

    if patterns::CONTINUE.is_match(candidate) {
        return Some(DetectedIntent {
            intent_type: IntentType::Imperative,
            subtype: Subtype::Imperative(ImperativeSubtype::Continue),
            confidence: 0.75,
            source_text: text.to_string(),
            slots: Slots::default(),
        });
    }

    None
}

fn classify_question(text: &str) -> Option<DetectedIntent> {
    let ends_with_question_mark = text.trim_end().ends_with('?');
    let starts_wh_or_aux = patterns::WH_OR_AUX_START.is_match(text);

    if !ends_with_question_mark && !starts_wh_or_aux {
        return None;
    }

    let from_mark = if ends_with_question_mark { 0.8 } else { 0.0 };
    let from_wh = if starts_wh_or_aux {
        0.5 + if ends_with_question_mark { 0.2 } else { 0.0 }
    } else {
        0.0
    };
    let confidence = from_mark.max(from_wh);

    let subtype = if patterns::DEFINITION.is_match(text) {
        QuestionSubtype::Definition
    } else if patterns::HOW_TO.is_match(text) {
        QuestionSubtype::HowTo
    } else if patterns::COMPARE.is_match(text) {
        QuestionSubtype::Compare
    } else if patterns::TROUBLESHOOT.is_match(text) {
        QuestionSubtype::Troubleshoot
    } else {
        QuestionSubtype::Generic
    };

    let topic = matches!(subtype, QuestionSubtype::Definition)
        .then(|| slots::definition_topic(text))
        .flatten();

    Some(DetectedIntent {
        intent_type: IntentType::Question,
        subtype: Subtype::Question(subtype),
        confidence,
        source_text: text.to_string(),
        slots: Slots {
            topic,
            count: None,
            reference: None,
        },
    })
}

fn classify_statement(text: &str) -> DetectedIntent {
    let word_count = text.split_whitespace().count();
    let mut confidence: f32 = 0.5;
    if text.trim_end().ends_with('.') {
        confidence += 0.1;
    }
    if word_count < 3 {
        confidence -= 0.1;
    }
    let confidence = confidence.clamp(0.4, 0.6);

    DetectedIntent {
        intent_type: IntentType::Statement,
        subtype: Subtype::None,
        confidence,
        source_text: text.to_string(),
        slots: Slots::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> HeuristicDetector {
        HeuristicDetector
    }

    #[test]
    fn empty_text_is_other() {
        let intent = detector().detect_final("");
        assert_eq!(intent.intent_type, IntentType::Other);
    }

    #[test]
    fn stop_is_imperative_with_high_confidence() {
        let intent = detector().detect_final("please stop");
        assert_eq!(intent.intent_type, IntentType::Imperative);
        assert_eq!(intent.subtype, Subtype::Imperative(ImperativeSubtype::Stop));
        assert!(intent.confidence >= 0.9);
    }

    #[test]
    fn cancel_and_nevermind_are_stop() {
        assert_eq!(
            detector().detect_final("cancel").subtype,
            Subtype::Imperative(ImperativeSubtype::Stop)
        );
        assert_eq!(
            detector().detect_final("never mind").subtype,
            Subtype::Imperative(ImperativeSubtype::Stop)
        );
    }

    #[test]
    fn polite_repeat_is_imperative_not_question() {
        let intent = detector().detect_final("can you repeat that");
        assert_eq!(intent.intent_type, IntentType::Imperative);
        assert_eq!(intent.subtype, Subtype::Imperative(ImperativeSubtype::Repeat));
        assert!(intent.confidence >= 0.4);
    }

    #[test]
    fn repeat_number_extracts_slots() {
        let intent = detector().detect_final("repeat number 3");
        assert_eq!(intent.subtype, Subtype::Imperative(ImperativeSubtype::Repeat));
        assert_eq!(intent.slots.count, Some(3));
        assert_eq!(intent.slots.reference.as_deref(), Some("number 3"));
    }

    #[test]
    fn generate_extracts_count_and_topic() {
        let intent = detector().detect_final("generate 5 questions about osmosis");
        assert_eq!(
            intent.subtype,
            Subtype::Imperative(ImperativeSubtype::Generate)
        );
        assert_eq!(intent.slots.count, Some(5));
        assert_eq!(intent.slots.topic.as_deref(), Some("osmosis"));
    }

    #[test]
    fn continue_family_matches() {
        for phrase in ["continue", "go on", "next", "proceed", "keep going"] {
            let intent = detector().detect_final(phrase);
            assert_eq!(
                intent.subtype,
                Subtype::Imperative(ImperativeSubtype::Continue),
                "expected {phrase:?} to match Continue"
            );
        }
    }

    #[test]
    fn start_over_family_matches() {
        for phrase in ["start over", "from the beginning", "reset"] {
            let intent = detector().detect_final(phrase);
            assert_eq!(
                intent.subtype,
                Subtype::Imperative(ImperativeSubtype::StartOver),
                "expected {phrase:?} to match StartOver"
            );
        }
    }

    #[test]
    fn split_question_is_definition_with_topic() {
        let intent = detector().detect_final("What is a lock statement used for in C#?");
        assert_eq!(intent.intent_type, IntentType::Question);
        assert_eq!(intent.subtype, Subtype::Question(QuestionSubtype::Definition));
        assert!(intent.slots.topic.as_deref().unwrap().contains("lock statement"));
    }

    #[test]
    fn how_to_question_detected() {
        let intent = detector().detect_final("how do I reset my password?");
        assert_eq!(intent.subtype, Subtype::Question(QuestionSubtype::HowTo));
    }

    #[test]
    fn compare_question_detected() {
        let intent = detector().detect_final("is there a difference between a mutex and a lock?");
        assert_eq!(intent.subtype, Subtype::Question(QuestionSubtype::Compare));
    }

    #[test]
    fn troubleshoot_question_detected() {
        let intent = detector().detect_final("why isn't my server starting?");
        assert_eq!(intent.subtype, Subtype::Question(QuestionSubtype::Troubleshoot));
    }

    #[test]
    fn question_mark_alone_is_generic_question() {
        let intent = detector().detect_final("this works right?");
        assert_eq!(intent.intent_type, IntentType::Question);
        assert_eq!(intent.subtype, Subtype::Question(QuestionSubtype::Generic));
    }

    #[test]
    fn statement_is_default_classification() {
        let intent = detector().detect_final("the build finished successfully.");
        assert_eq!(intent.intent_type, IntentType::Statement);
        assert!(intent.confidence >= 0.4 && intent.confidence <= 0.6);
    }

    #[test]
    fn detect_final_is_pure() {
        let a = detector().detect_final("what is a mutex?");
        let b = detector().detect_final("what is a mutex?");
        assert_eq!(a, b);
    }

    #[test]
    fn detect_candidate_returns_none_below_threshold() {
        // A bare statement-ish fragment sits right at the Statement default
        // band (~0.4-0.6); a high candidate floor should filter it out.
        let result = detector().detect_candidate("hello there", 0.9);
        assert!(result.is_none());
    }

    #[test]
    fn detect_candidate_returns_some_above_threshold() {
        let result = detector().detect_candidate("what is a mutex", 0.35);
        assert!(result.is_some());
    }

    #[test]
    fn action_names_are_lowercase_snake_case() {
        assert_eq!(ImperativeSubtype::Stop.action_name(), "stop");
        assert_eq!(ImperativeSubtype::StartOver.action_name(), "start_over");
        assert_eq!(ImperativeSubtype::Generate.action_name(), "generate_questions");
    }
}
