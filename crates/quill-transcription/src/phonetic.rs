//! Phonetic-alphabet interpretation: "Alpha Bravo" → "AB".
//!
//! Text is lowercased, everything except ASCII letters, whitespace and hyphens
//! becomes a space, and the result is split on whitespace. Each token maps to
//! a letter through the [`PhoneticMap`]; failing that, a lone letter stands
//! for itself. Anything else is skipped.

use std::collections::HashMap;
use std::sync::LazyLock;

const STANDARD_WORDS: &[(&str, char)] = &[
    // NATO / ICAO
    ("alpha", 'A'),
    ("alfa", 'A'),
    ("bravo", 'B'),
    ("charlie", 'C'),
    ("delta", 'D'),
    ("echo", 'E'),
    ("foxtrot", 'F'),
    ("golf", 'G'),
    ("hotel", 'H'),
    ("india", 'I'),
    ("juliet", 'J'),
    ("juliett", 'J'),
    ("kilo", 'K'),
    ("lima", 'L'),
    ("mike", 'M'),
    ("november", 'N'),
    ("oscar", 'O'),
    ("papa", 'P'),
    ("quebec", 'Q'),
    ("romeo", 'R'),
    ("sierra", 'S'),
    ("tango", 'T'),
    ("uniform", 'U'),
    ("victor", 'V'),
    ("whiskey", 'W'),
    ("whisky", 'W'),
    ("x-ray", 'X'),
    ("xray", 'X'),
    ("yankee", 'Y'),
    ("zulu", 'Z'),
    // letter names as the recognizer tends to spell them
    ("ay", 'A'),
    ("hey", 'A'),
    ("eight", 'A'),
    ("bee", 'B'),
    ("be", 'B'),
    ("see", 'C'),
    ("sea", 'C'),
    ("dee", 'D'),
    ("ee", 'E'),
    ("ef", 'F'),
    ("gee", 'G'),
    ("jee", 'G'),
    ("ghee", 'G'),
    ("aitch", 'H'),
    ("eye", 'I'),
    ("jay", 'J'),
    ("kay", 'K'),
    ("el", 'L'),
    ("em", 'M'),
    ("en", 'N'),
    ("oh", 'O'),
    ("zero", 'O'),
    ("pee", 'P'),
    ("cue", 'Q'),
    ("queue", 'Q'),
    ("are", 'R'),
    ("ess", 'S'),
    ("tee", 'T'),
    ("you", 'U'),
    ("vee", 'V'),
    ("doubleyou", 'W'),
    ("ex", 'X'),
    ("why", 'Y'),
    ("zee", 'Z'),
    ("zed", 'Z'),
];

static STANDARD: LazyLock<PhoneticMap> =
    LazyLock::new(|| PhoneticMap::from_pairs(STANDARD_WORDS.iter().copied()));

/// Immutable lookup from lowercase spoken word to uppercase letter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhoneticMap {
    words: HashMap<String, char>,
}

impl PhoneticMap {
    /// The process-wide NATO alphabet plus common letter-name spellings.
    pub fn standard() -> &'static PhoneticMap {
        &STANDARD
    }

    /// Build a map from `(word, letter)` pairs. Words are lowercased and
    /// letters uppercased.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, char)>) -> Self {
        let words = pairs
            .into_iter()
            .map(|(word, letter)| (word.to_lowercase(), letter.to_ascii_uppercase()))
            .collect();
        Self { words }
    }

    /// Letter for an already-normalized token.
    pub fn letter(&self, token: &str) -> Option<char> {
        self.words.get(token).copied()
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the map has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate `(word, letter)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, char)> {
        self.words.iter().map(|(w, l)| (w.as_str(), *l))
    }
}

/// Lowercase `text` and blank out everything that is not an ASCII letter,
/// whitespace or a hyphen.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_whitespace() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Interpret `text` as a spelled-out letter sequence.
pub fn interpret(text: &str, map: &PhoneticMap) -> String {
    normalize(text)
        .split_whitespace()
        .filter_map(|token| map.letter(token).or_else(|| single_letter(token)))
        .collect()
}

/// [`interpret`] when `spelling` is set, otherwise `""`.
pub fn interpret_if_requested(text: &str, spelling: bool, map: &PhoneticMap) -> String {
    if spelling {
        interpret(text, map)
    } else {
        String::new()
    }
}

fn single_letter(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}
