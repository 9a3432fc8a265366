//! Lightweight language identification for generated letters.
//!
//! Counts high-frequency function words per language. Good enough to tell a German job ad
//! from an English letter; not a general-purpose detector.

use std::collections::HashSet;
use std::fmt;

/// Minimum stopword hits before a guess is trusted.
const MIN_HITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    German,
    French,
    Spanish,
    Dutch,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::German,
        Language::French,
        Language::Spanish,
        Language::Dutch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::German => "German",
            Language::French => "French",
            Language::Spanish => "Spanish",
            Language::Dutch => "Dutch",
        }
    }

    fn stopwords(self) -> &'static [&'static str] {
        match self {
            Language::English => &[
                "the", "and", "of", "to", "in", "with", "for", "you", "your", "we", "our", "is",
                "are", "will", "have", "this", "that", "as", "on", "be",
            ],
            Language::German => &[
                "der", "die", "das", "und", "mit", "für", "sie", "wir", "ist", "sind", "ein",
                "eine", "einen", "den", "dem", "des", "zu", "von", "auf", "ich", "nicht", "auch",
            ],
            Language::French => &[
                "le", "la", "les", "et", "des", "du", "pour", "avec", "vous", "nous", "est",
                "une", "un", "dans", "sur", "au", "aux", "je", "qui", "que",
            ],
            Language::Spanish => &[
                "el", "los", "las", "y", "con", "para", "usted", "nosotros", "es", "una",
                "del", "por", "en", "que", "se", "su", "como", "yo", "muy",
            ],
            Language::Dutch => &[
                "het", "een", "en", "van", "voor", "met", "wij", "jij", "je", "zijn", "is",
                "op", "naar", "ons", "onze", "bij", "ik", "niet", "ook", "dat",
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Best-guess language of `text`, or `None` when there is too little signal or a tie.
pub fn detect(text: &str) -> Option<Language> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    let mut scores: Vec<(Language, usize)> = Language::ALL
        .iter()
        .map(|lang| {
            let stopwords: HashSet<&str> = lang.stopwords().iter().copied().collect();
            let hits = words.iter().filter(|w| stopwords.contains(*w)).count();
            (*lang, hits)
        })
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    match scores.as_slice() {
        [(best, hits), (_, runner_up), ..] if *hits >= MIN_HITS && hits > runner_up => Some(*best),
        _ => None,
    }
}
