use super::patterns;

/// Structured data pulled out of utterance text during classification.
///
/// Only the fields relevant to the matched subtype are populated; the rest
/// stay `None`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Slots {
    pub topic: Option<String>,
    pub count: Option<i64>,
    pub reference: Option<String>,
}

/// `slots.count` / `slots.reference` for `Repeat`: an integer following
/// "number"/"line", plus the matched "number N" / "line N" substring.
pub(super) fn repeat_slots(text: &str) -> Slots {
    match patterns::REFERENCE_NUMBER.captures(text) {
        Some(caps) => Slots {
            topic: None,
            count: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            reference: Some(caps.get(0).unwrap().as_str().to_string()),
        },
        None => Slots::default(),
    }
}

/// `slots.count` / `slots.topic` for `Generate`: the requested question
/// count, plus anything following "about".
pub(super) fn generate_slots(text: &str) -> Slots {
    let count = patterns::GENERATE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());

    Slots {
        topic: about_topic(text),
        count,
        reference: None,
    }
}

/// Text following the word "about", used by `Generate` imperatives.
pub(super) fn about_topic(text: &str) -> Option<String> {
    patterns::ABOUT_TOPIC
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', '?', '!']).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `slots.topic` for `Definition` questions: text between the WH-word and
/// the terminal punctuation or end of string, with leading articles
/// ("a", "an", "the") stripped.
pub(super) fn definition_topic(text: &str) -> Option<String> {
    let after_wh = patterns::WH_WORD.replace(text, "");
    let trimmed = after_wh
        .trim()
        .trim_end_matches(['.', '?', '!'])
        .trim();

    // Strip a leading copula ("is", "'s") left over from "what is"/"what's".
    let stripped = trimmed
        .strip_prefix("is ")
        .or_else(|| trimmed.strip_prefix("'s "))
        .unwrap_or(trimmed);

    let words: Vec<&str> = stripped.split_whitespace().collect();
    let skip = match words.first().map(|w| w.to_lowercase()) {
        Some(w) if w == "a" || w == "an" || w == "the" => 1,
        _ => 0,
    };

    let topic = words[skip..].join(" ");
    if topic.is_empty() { None } else { Some(topic) }
}
