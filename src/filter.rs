//! Content filter for submitted snippets.
//!
//! DESIGN
//! ======
//! Validation runs in a fixed order: emptiness, then length, then the
//! denylist. An overlong string that also contains a denied word is
//! therefore reported as too long.
//!
//! Denylist matching is case-insensitive and sees through common
//! leetspeak (`sh1t`, `@ss`, `$hit`). Input is folded to lowercase letters
//! and matched against one regex compiled from every pattern. Whole-word
//! patterns treat anything but a letter or the mask as a word edge; `\b`
//! would not, since `*` is not a word character. A `*` in the input stands
//! in for one letter, so `f*ck` still matches, but at most one masked letter
//! is accepted per match.
//!
//! Accepted text is returned trimmed and otherwise untouched.

use regex::Regex;

/// Maximum snippet length in characters.
pub const MAX_TEXT_CHARS: usize = 67;

/// Input character that may stand in for any single letter.
const MASK: char = '*';

/// Anything that ends a word in folded text.
const WORD_EDGE_START: &str = "(?:^|[^a-z*])";
const WORD_EDGE_END: &str = "(?:[^a-z*]|$)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("text is empty")]
    Empty,
    #[error("text is too long ({len} > {max} characters)")]
    TooLong { len: usize, max: usize },
    #[error("text contains blocked language")]
    Profanity,
}

impl crate::frame::ErrorCode for FilterError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty | Self::TooLong { .. } => "E_INVALID_TEXT",
            Self::Profanity => "E_PROFANITY",
        }
    }
}

/// Built-in patterns. Short stems that occur inside innocent words are whole-word only.
const DEFAULT_PATTERNS: &[&str] = &[
    "fuck", "shit", "cunt", "bitch", "asshole", "bastard", "whore", "slut", "wank", "=ass", "=dick", "=cock", "=twat",
    "=piss", "=fag", "=tits",
];

#[derive(Debug, Clone)]
pub struct ContentFilter {
    denylist: Regex,
}

impl ContentFilter {
    /// Filter with the built-in denylist plus `extra` patterns.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the combined denylist cannot be compiled
    /// (only possible when `extra` is large enough to hit the size limit).
    pub fn new<I, S>(extra: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = DEFAULT_PATTERNS
            .iter()
            .copied()
            .map(str::to_owned)
            .chain(extra.into_iter().map(|s| s.as_ref().to_owned()))
            .filter_map(|raw| pattern_source(&raw))
            .collect();
        let denylist = Regex::new(&format!("(?i){}", alternatives.join("|")))?;
        Ok(Self { denylist })
    }

    /// Validate `text`, returning the trimmed snippet to place.
    ///
    /// # Errors
    ///
    /// `Empty` or `TooLong` for length violations, `Profanity` on a denylist hit.
    pub fn check<'a>(&self, text: &'a str) -> Result<&'a str, FilterError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FilterError::Empty);
        }
        let len = trimmed.chars().count();
        if len > MAX_TEXT_CHARS {
            return Err(FilterError::TooLong { len, max: MAX_TEXT_CHARS });
        }
        if self.denylist.is_match(&fold(trimmed)) {
            return Err(FilterError::Profanity);
        }
        Ok(trimmed)
    }
}

/// Regex source for one denylist entry, or `None` if it has no letters.
///
/// `"=word"` matches whole words only; anything else matches anywhere. Each
/// stem also matches with any one of its letters replaced by the mask.
fn pattern_source(raw: &str) -> Option<String> {
    let raw = raw.trim().to_lowercase();
    let (whole_word, body) = match raw.strip_prefix('=') {
        Some(rest) => (true, rest),
        None => (false, raw.as_str()),
    };
    let stem: Vec<char> = body.chars().filter(char::is_ascii_alphabetic).collect();
    if stem.is_empty() {
        return None;
    }

    let mut variants = vec![stem.iter().collect::<String>()];
    for masked in 0..stem.len() {
        let variant: String = stem
            .iter()
            .enumerate()
            .map(|(i, c)| if i == masked { regex::escape(&MASK.to_string()) } else { c.to_string() })
            .collect();
        variants.push(variant);
    }
    let body = variants.join("|");

    Some(if whole_word {
        format!("{WORD_EDGE_START}(?:{body}){WORD_EDGE_END}")
    } else {
        format!("(?:{body})")
    })
}

/// Lowercase and undo leetspeak substitutions.
fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' | '|' => 'i',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' | '+' => 't',
            '8' => 'b',
            '9' => 'g',
            other => other,
        })
        .collect()
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
