use std::collections::HashMap;

use crate::clock::Millis;
use crate::intent::ImperativeSubtype;

/// Per-subtype debounce duration, keyed by [`ImperativeSubtype`]. Unlisted
/// subtypes fall back to the configured default. `Stop` always carries a
/// duration of zero so it is never debounced; [`CooldownConfig::default`]
/// upholds that, and [`CooldownConfig::for_subtype`] does not let a caller
/// remove the entry, only replace its value — removing it would silently
/// fall back to the non-zero default.
#[derive(Debug, Clone)]
pub struct CooldownConfig {
    durations: HashMap<ImperativeSubtype, Millis>,
    default_cooldown: Millis,
}

impl CooldownConfig {
    pub fn new(default_cooldown: Millis) -> Self {
        Self {
            durations: HashMap::new(),
            default_cooldown,
        }
    }

    pub fn with(mut self, subtype: ImperativeSubtype, duration_ms: Millis) -> Self {
        self.durations.insert(subtype, duration_ms);
        self
    }

    pub fn for_subtype(&self, subtype: ImperativeSubtype) -> Millis {
        self.durations
            .get(&subtype)
            .copied()
            .unwrap_or(self.default_cooldown)
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self::new(1_500)
            .with(ImperativeSubtype::Stop, 0)
            .with(ImperativeSubtype::Repeat, 1_500)
            .with(ImperativeSubtype::Continue, 1_500)
            .with(ImperativeSubtype::StartOver, 1_500)
            .with(ImperativeSubtype::Generate, 5_000)
    }
}

/// Every tunable the pipeline recognizes, with a documented default.
///
/// Constructed in-process only — loading these from a file, environment, or
/// CLI is a host concern outside this crate's scope.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stabilizer_window_size: usize,
    pub min_word_confidence: f32,
    pub require_repetition_for_low_confidence: bool,

    pub silence_gap_threshold_ms: Millis,
    pub punctuation_pause_threshold_ms: Millis,
    pub max_utterance_duration_ms: Millis,
    pub max_utterance_length: usize,

    pub intent_min_confidence: f32,
    pub candidate_min_confidence: f32,

    pub dedup_similarity_threshold: f32,
    pub dedup_window_ms: Millis,
    pub dedup_capacity: usize,

    pub conflict_window_ms: Millis,
    pub cooldowns: CooldownConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stabilizer_window_size: 3,
            min_word_confidence: 0.0,
            require_repetition_for_low_confidence: false,

            silence_gap_threshold_ms: 750,
            punctuation_pause_threshold_ms: 300,
            max_utterance_duration_ms: 12_000,
            max_utterance_length: 1_000,

            intent_min_confidence: 0.4,
            candidate_min_confidence: 0.35,

            dedup_similarity_threshold: 0.7,
            dedup_window_ms: 30_000,
            dedup_capacity: 50,

            conflict_window_ms: 1_500,
            cooldowns: CooldownConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Fluent builder over [`PipelineConfig`], for hosts that only want to
/// override a handful of tunables without repeating the full struct.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn stabilizer_window_size(mut self, n: usize) -> Self {
        self.config.stabilizer_window_size = n;
        self
    }

    pub fn min_word_confidence(mut self, threshold: f32) -> Self {
        self.config.min_word_confidence = threshold;
        self
    }

    pub fn require_repetition_for_low_confidence(mut self, value: bool) -> Self {
        self.config.require_repetition_for_low_confidence = value;
        self
    }

    pub fn silence_gap_threshold_ms(mut self, ms: Millis) -> Self {
        self.config.silence_gap_threshold_ms = ms;
        self
    }

    pub fn punctuation_pause_threshold_ms(mut self, ms: Millis) -> Self {
        self.config.punctuation_pause_threshold_ms = ms;
        self
    }

    pub fn max_utterance_duration_ms(mut self, ms: Millis) -> Self {
        self.config.max_utterance_duration_ms = ms;
        self
    }

    pub fn max_utterance_length(mut self, n: usize) -> Self {
        self.config.max_utterance_length = n;
        self
    }

    pub fn intent_min_confidence(mut self, threshold: f32) -> Self {
        self.config.intent_min_confidence = threshold;
        self
    }

    pub fn candidate_min_confidence(mut self, threshold: f32) -> Self {
        self.config.candidate_min_confidence = threshold;
        self
    }

    pub fn dedup_similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.dedup_similarity_threshold = threshold;
        self
    }

    pub fn dedup_window_ms(mut self, ms: Millis) -> Self {
        self.config.dedup_window_ms = ms;
        self
    }

    pub fn conflict_window_ms(mut self, ms: Millis) -> Self {
        self.config.conflict_window_ms = ms;
        self
    }

    pub fn cooldowns(mut self, cooldowns: CooldownConfig) -> Self {
        self.config.cooldowns = cooldowns;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
