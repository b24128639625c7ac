use std::sync::LazyLock;

use regex::Regex;

// ── Imperative pattern families ──────────────────────────────────────────

pub static STOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(please\s+)?(stop\b|cancel|never\s*mind)").unwrap());

pub static REPEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(repeat|say that again|what did you say|can you repeat|could you repeat)\b")
        .unwrap()
});

pub static CONTINUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(continue|go on|next|proceed|keep going)\b").unwrap()
});

pub static START_OVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(start over|from the beginning|reset)\b").unwrap());

pub static GENERATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)generate\s+(\d+)\s+questions?\b").unwrap());

/// Politeness prefixes that, when stripped, may reveal an imperative verb
/// underneath a grammatically question-shaped sentence ("can you repeat
/// that" is an `Imperative::Repeat`, not a `Question`).
pub static POLITE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(please|can you|could you|would you)\s+").unwrap());

// ── Question patterns ────────────────────────────────────────────────────

pub static WH_OR_AUX_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(what|why|how|where|when|who|which|is|are|do|does|did|can|could|would|should|will)\b",
    )
    .unwrap()
});

pub static DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(what is|what's|define)\b").unwrap());

pub static HOW_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^how (do|to|can|should)\b").unwrap());

pub static COMPARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(difference between|\bvs\b|\bversus\b|compare)\b").unwrap()
});

pub static TROUBLESHOOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(why (isn't|doesn't|won't)|getting (an? )?error|not working)\b").unwrap()
});

// ── Slot extraction ───────────────────────────────────────────────────────

pub static REFERENCE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(number|line)\s+(\d+)\b").unwrap());

pub static ABOUT_TOPIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\babout\s+(.+?)\s*$").unwrap());

pub static WH_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(what|why|how|where|when|who|which)\b").unwrap());
