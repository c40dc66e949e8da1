//! Wildcard value cleaning.
//!
//! # Responsibilities
//! - Normalise captured values before they are injected into a destination
//! - Optionally split camel-case and letter/digit boundaries
//!
//! # Pipeline
//! ```text
//! raw capture
//!     → camel-case split (enhanced only)
//!     → URL-decode, %uXXXX → HTML entity
//!     → runs outside letter/digit/slash → '-'
//!     → ASCII transliteration
//!     → letter/digit split (enhanced only)
//!     → trim '-', drop anything outside [-\w/]
//!     → lower-case (full clean only)
//! ```

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};

static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)%u([a-f0-9]{3,4})").expect("static pattern"));

static NON_LETTER_DIGIT_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}0-9/]+").expect("static pattern"));

static LETTER_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-z])([0-9])").expect("static pattern"));

static DIGIT_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9])([a-z])").expect("static pattern"));

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^-A-Za-z0-9_/]+").expect("static pattern"));

/// How captured values are cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CleaningMode {
    /// Values are injected verbatim.
    Off,
    /// Cleaned, case preserved.
    SemiClean,
    /// Cleaned and lower-cased.
    #[default]
    FullClean,
}

/// Applies the configured cleaning mode to captured values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cleaner {
    mode: CleaningMode,
    enhanced: bool,
}

impl Cleaner {
    pub fn new(mode: CleaningMode, enhanced: bool) -> Self {
        Self { mode, enhanced }
    }

    pub fn mode(&self) -> CleaningMode {
        self.mode
    }

    /// Clean a value according to the configured mode.
    pub fn apply(&self, value: &str) -> String {
        match self.mode {
            CleaningMode::Off => value.to_string(),
            CleaningMode::SemiClean => self.clean(value, false),
            CleaningMode::FullClean => self.clean(value, true),
        }
    }

    /// Run the cleaning pipeline regardless of mode.
    pub fn clean(&self, input: &str, lower: bool) -> String {
        let mut value = input.to_string();

        if self.enhanced {
            value = split_camel_case(&value);
        }

        let decoded = url_decode(&value);
        value = UNICODE_ESCAPE.replace_all(&decoded, "&#x${1};").into_owned();
        value = NON_LETTER_DIGIT_SLASH.replace_all(&value, "-").into_owned();
        value = deunicode::deunicode_with_tofu(&value, "");

        if self.enhanced {
            value = LETTER_DIGIT.replace_all(&value, "${1}-${2}").into_owned();
            value = DIGIT_LETTER.replace_all(&value, "${1}-${2}").into_owned();
        }

        let trimmed = value.trim_matches('-');
        value = DISALLOWED.replace_all(trimmed, "").into_owned();

        if lower {
            value = value.to_lowercase();
        }
        value
    }
}

/// Decode `+` as space and `%XX` escapes; invalid UTF-8 is replaced.
fn url_decode(value: &str) -> String {
    let plus_decoded = value.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `HTTPServer` → `Http-Server`, `getURL` → `get-Url`.
///
/// An upper-case run of two or more letters keeps its first letter and
/// lower-cases the rest, except that a run followed by a word character
/// leaves its last letter to start the next word. A hyphen is then
/// inserted before every upper-case letter that follows a word character.
fn split_camel_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut folded: Vec<char> = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_uppercase() {
            folded.push(chars[i]);
            i += 1;
            continue;
        }

        let run_end = chars[i..]
            .iter()
            .position(|c| !c.is_ascii_uppercase())
            .map_or(chars.len(), |offset| i + offset);
        let run_len = run_end - i;
        let at_boundary = chars.get(run_end).map_or(true, |&c| !is_word(c));

        let fold_until = if at_boundary && run_len >= 2 {
            run_end
        } else if !at_boundary && run_len >= 3 {
            run_end - 1
        } else {
            i
        };

        if fold_until > i {
            folded.push(chars[i]);
            folded.extend(chars[i + 1..fold_until].iter().map(|c| c.to_ascii_lowercase()));
            folded.extend(&chars[fold_until..run_end]);
        } else {
            folded.extend(&chars[i..run_end]);
        }
        i = run_end;
    }

    let mut out = String::with_capacity(folded.len() + 4);
    let mut prev: Option<char> = None;
    for c in folded {
        if c.is_ascii_uppercase() && prev.is_some_and(is_word) {
            out.push('-');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
