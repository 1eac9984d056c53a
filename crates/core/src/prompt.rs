//! Prompt text construction.
//!
//! The subject phrase leads the prompt: an explicit or detected color comes
//! first, followed by the cleaned description with that color word removed.
//! Category, style and angle fragments follow, then a fixed quality suffix.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::request::GenerationRequest;

/// Opening phrase of every prompt.
const PROMPT_PREFIX: &str = "professional product photography of";

/// Quality terms appended to every prompt.
const QUALITY_SUFFIX: &str = "high resolution, sharp focus, commercial quality, 8k, highly detailed";

/// Negative prompt sent with every synthesis request.
pub const NEGATIVE_PROMPT: &str = "blurry, low quality, distorted, deformed, disfigured, \
    watermark, text, logo, signature, cropped, out of frame, bad lighting, oversaturated, \
    cartoon, illustration, duplicate";

/// Color words recognised inside a description when no explicit color is given.
const COLOR_WORDS: &[&str] = &[
    "red", "blue", "green", "yellow", "orange", "purple", "pink", "black", "white", "gray",
    "grey", "brown", "beige", "silver", "gold", "navy", "teal", "maroon", "turquoise", "ivory",
    "cream", "burgundy", "olive", "tan", "charcoal",
];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static COLOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", COLOR_WORDS.join("|")))
        .expect("color pattern is valid")
});

/// Prompt pair sent to the synthesis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}

/// Build the prompt pair for a validated request.
pub fn build_prompt(request: &GenerationRequest) -> BuiltPrompt {
    let description = clean_description(&request.description);
    let subject = subject_phrase(&description, request.color.as_deref());

    let prompt = [
        format!("{PROMPT_PREFIX} {subject}"),
        request.category.prompt_fragment().to_string(),
        request.style.prompt_fragment().to_string(),
        request.angle.prompt_fragment().to_string(),
        QUALITY_SUFFIX.to_string(),
    ]
    .join(", ");

    BuiltPrompt {
        prompt,
        negative_prompt: NEGATIVE_PROMPT.to_string(),
    }
}

/// Normalize a free-text description for prompt use.
///
/// Control characters are dropped, whitespace runs collapse to one space,
/// and trailing sentence punctuation is stripped.
pub fn clean_description(raw: &str) -> String {
    let printable: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = WHITESPACE.replace_all(printable.trim(), " ");
    collapsed
        .trim_end_matches(['.', '!', '?', ';', ':', ','])
        .trim()
        .to_string()
}

/// Color first, then the description without the color word.
fn subject_phrase(description: &str, explicit_color: Option<&str>) -> String {
    let color = match explicit_color {
        Some(c) => Some(c.trim().to_string()),
        None => detect_color(description),
    };

    match color {
        Some(color) => {
            let remainder = remove_word(description, &color);
            if remainder.is_empty() {
                color
            } else {
                format!("{color} {remainder}")
            }
        }
        None => description.to_string(),
    }
}

/// First color word in `description`, in its original casing.
pub fn detect_color(description: &str) -> Option<String> {
    COLOR_PATTERN
        .find(description)
        .map(|m| m.as_str().to_string())
}

/// Remove the first whole-word, case-insensitive occurrence of `word`.
fn remove_word(text: &str, word: &str) -> String {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    let stripped = match Regex::new(&pattern) {
        Ok(re) => re.replacen(text, 1, "").into_owned(),
        Err(_) => text.to_string(),
    };
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    collapsed
        .trim_start_matches([',', ';', ':', '-'])
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
