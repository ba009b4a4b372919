//! Profanity filter for generated answers

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Words masked by [`ResponseFilter::default`]
pub const DEFAULT_DISALLOWED: &[&str] = &["fuck", "shit", "damn", "bitch", "ass", "hell", "crap"];

static NON_ALPHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z]").expect("static regex is valid"));

/// Masks disallowed words in answer text.
///
/// Each whitespace-separated token is lower-cased and stripped of everything
/// but ASCII letters before the lookup, so `Damn!` matches `damn`. A matching
/// token is replaced in full: the mask has the token's character count,
/// punctuation included. Tokens are re-joined with single spaces, so runs of
/// whitespace and newlines collapse.
#[derive(Debug, Clone)]
pub struct ResponseFilter {
    disallowed: HashSet<String>,
    mask: char,
}

impl ResponseFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            disallowed: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            mask: '*',
        }
    }

    pub fn filter(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| {
                if self.is_disallowed(token) {
                    self.mask.to_string().repeat(token.chars().count())
                } else {
                    token.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_disallowed(&self, token: &str) -> bool {
        let lowered = token.to_lowercase();
        let cleaned = NON_ALPHA.replace_all(&lowered, "");
        self.disallowed.contains(cleaned.as_ref())
    }
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DISALLOWED)
    }
}
