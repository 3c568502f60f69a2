//! Local keyword analysis used when the gateway cannot be reached.
//!
//! Everything is table-driven: categories, their keywords, the canned
//! interpretation sentences and the symbol vocabulary are plain data, scanned
//! in declaration order. Matching is case-insensitive substring membership.

use chrono::Utc;

use super::types::DreamAnalysisResult;

/// Confidence reported by the heuristic path.
pub const HEURISTIC_CONFIDENCE: f64 = 0.3;
pub const MAX_SYMBOLS: usize = 3;

pub struct Category {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub sentence: &'static str,
}

pub const EMOTIONS: &[Category] = &[
    Category {
        name: "fear",
        keywords: &["afraid", "scared", "fear", "terrified", "frightened", "nightmare"],
        sentence: "Fear in dreams often points to a situation in waking life that feels out of your control.",
    },
    Category {
        name: "joy",
        keywords: &["happy", "joy", "excited", "delighted", "laughing", "wonderful"],
        sentence: "Joyful dreams tend to reflect contentment or a recent sense of accomplishment.",
    },
    Category {
        name: "sadness",
        keywords: &["sad", "crying", "tears", "grief", "lonely", "loss"],
        sentence: "Sadness may signal something you are still processing or letting go of.",
    },
    Category {
        name: "anger",
        keywords: &["angry", "furious", "rage", "mad", "yelling", "fight"],
        sentence: "Anger can surface feelings you have held back during the day.",
    },
    Category {
        name: "anxiety",
        keywords: &["anxious", "worried", "nervous", "stress", "panic", "late"],
        sentence: "Anxious dreams often mirror pressure or uncertainty you are carrying.",
    },
];

pub const THEMES: &[Category] = &[
    Category {
        name: "flying",
        keywords: &["flying", "fly", "flew", "soaring", "floating"],
        sentence: "Flying suggests a desire for freedom or a new perspective on a problem.",
    },
    Category {
        name: "falling",
        keywords: &["falling", "fell", "fall", "dropping"],
        sentence: "Falling frequently reflects insecurity or fear of losing your footing.",
    },
    Category {
        name: "chase",
        keywords: &["chased", "chasing", "chase", "running away", "pursued"],
        sentence: "Being chased hints at something you are avoiding confronting.",
    },
    Category {
        name: "water",
        keywords: &["water", "ocean", "sea", "river", "swimming", "rain", "lake"],
        sentence: "Water is commonly tied to emotions and how freely they flow.",
    },
    Category {
        name: "home",
        keywords: &["home", "house", "bedroom", "childhood", "family"],
        sentence: "Home settings relate to your sense of self, safety and belonging.",
    },
];

/// Scanned in this order; the first [`MAX_SYMBOLS`] hits are reported.
pub const SYMBOLS: &[&str] = &[
    "house", "car", "animal", "person", "tree", "water", "fire", "door", "window",
];

pub const GENERIC_SENTENCE: &str = "This dream reflects your subconscious processing the \
    experiences and emotions of recent days. Consider what stood out most and how it made you feel.";

fn matched<'a>(text: &str, categories: &'a [Category]) -> Vec<&'a Category> {
    categories
        .iter()
        .filter(|c| c.keywords.iter().any(|k| text.contains(k)))
        .collect()
}

/// Analyze `dream_text` locally. Never fails.
pub fn analyze(dream_text: &str) -> DreamAnalysisResult {
    let text = dream_text.to_lowercase();
    let emotions = matched(&text, EMOTIONS);
    let themes = matched(&text, THEMES);

    let sentences: Vec<&str> = emotions
        .iter()
        .chain(themes.iter())
        .map(|c| c.sentence)
        .collect();
    let interpretation = if sentences.is_empty() {
        GENERIC_SENTENCE.to_string()
    } else {
        sentences.join(" ")
    };

    let names = |cats: Vec<&Category>, fallback: &str| -> Vec<String> {
        if cats.is_empty() {
            vec![fallback.to_string()]
        } else {
            cats.iter().map(|c| c.name.to_string()).collect()
        }
    };

    let symbols = SYMBOLS
        .iter()
        .filter(|s| text.contains(*s))
        .take(MAX_SYMBOLS)
        .map(|s| s.to_string())
        .collect();

    DreamAnalysisResult {
        emotions: names(emotions, "neutral"),
        themes: names(themes, "general"),
        interpretation,
        symbols,
        confidence: HEURISTIC_CONFIDENCE,
        timestamp_ms: Utc::now().timestamp_millis(),
    }
}
