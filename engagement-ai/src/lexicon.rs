/// Fixed phrase lexicons driving edit-delta classification (spec §4.4.3).
/// Deliberately small, literal, and ungrounded in any NLP model — the
/// contract calls for lexicon membership, not semantic similarity.
pub const FORMAL_MARKERS: &[&str] = &[
    "dear",
    "sincerely",
    "regards",
    "kindly",
    "please find",
    "at your earliest convenience",
    "yours truly",
    "respectfully",
    "i would like to",
];

pub const CASUAL_MARKERS: &[&str] = &[
    "hey", "hi there", "thanks!", "cheers", "yeah", "gonna", "wanna", "lol", "btw", "!",
];

pub const CTA_PHRASES: &[&str] = &[
    "let me know",
    "schedule",
    "next step",
    "book a time",
    "click here",
    "follow up",
    "reply to this",
];

pub const PERSONALIZATION_PHRASES: &[&str] = &[
    "i noticed",
    "congrats on",
    "saw that you",
    "noticed you",
    "your recent",
    "following up on our conversation",
    "great meeting you",
];

pub fn count_occurrences(haystack: &str, phrases: &[&str]) -> usize {
    let lower = haystack.to_lowercase();
    phrases.iter().filter(|p| lower.contains(*p)).count()
}

pub fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    phrases.iter().any(|p| lower.contains(*p))
}
