//! Normalization applied to extracted text before it is reported.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Everything except word characters, whitespace and basic punctuation.
static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-\.,;:()\[\]]+").unwrap());

/// How aggressively extracted text is normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCleaning {
    /// Trim leading and trailing whitespace; line structure is kept.
    #[default]
    Trim,
    /// Collapse every whitespace run (newlines included) to a single space.
    Collapse,
    /// `Collapse`, and drop symbols other than basic punctuation.
    Strict,
}

impl FromStr for TextCleaning {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trim" => Ok(TextCleaning::Trim),
            "collapse" => Ok(TextCleaning::Collapse),
            "strict" => Ok(TextCleaning::Strict),
            other => Err(format!(
                "unknown text cleaning mode '{other}' (expected trim, collapse or strict)"
            )),
        }
    }
}

pub fn clean_text(text: &str, mode: TextCleaning) -> String {
    match mode {
        TextCleaning::Trim => text.trim().to_string(),
        TextCleaning::Collapse => collapse_whitespace(text),
        TextCleaning::Strict => {
            let collapsed = collapse_whitespace(text);
            let stripped = DISALLOWED_CHARS.replace_all(&collapsed, "");
            // Removing symbols can leave doubled spaces behind
            collapse_whitespace(&stripped)
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}
