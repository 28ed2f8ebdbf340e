use engagement_core::model::{EditDelta, LengthChange, ToneShift};
use regex::Regex;
use std::sync::OnceLock;

use crate::lexicon::{contains_any, count_occurrences, CASUAL_MARKERS, CTA_PHRASES, FORMAL_MARKERS, PERSONALIZATION_PHRASES};

fn subject_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^(?:subject|re):\s*(.*)$").expect("static regex"))
}

fn subject_line(text: &str) -> Option<String> {
    subject_regex()
        .captures(text)
        .map(|c| c[1].trim().to_lowercase())
}

fn bullet_line_count(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with('-') || trimmed.starts_with('*') || trimmed.starts_with('\u{2022}')
        })
        .count()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}

fn sentence_count(text: &str) -> usize {
    text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count().max(1)
}

/// Crude vowel-group syllable heuristic: count vowel runs, drop a
/// trailing silent `e` when more than one run was found, floor at 1.
fn syllables_in_word(word: &str) -> usize {
    let lower: Vec<char> = word.to_lowercase().chars().filter(|c| c.is_alphabetic()).collect();
    if lower.is_empty() {
        return 1;
    }
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0usize;
    let mut in_group = false;
    for &c in &lower {
        if is_vowel(c) {
            if !in_group {
                groups += 1;
                in_group = true;
            }
        } else {
            in_group = false;
        }
    }
    if groups > 1 && lower.last() == Some(&'e') {
        groups -= 1;
    }
    groups.max(1)
}

fn syllable_count(text: &str) -> usize {
    text.split_whitespace().map(syllables_in_word).sum::<usize>().max(1)
}

/// Flesch–Kincaid-grade-level proxy: higher means harder to read.
fn complexity_score(text: &str) -> f64 {
    let words = word_count(text) as f64;
    let sentences = sentence_count(text) as f64;
    let syllables = syllable_count(text) as f64;
    0.39 * (words / sentences) + 11.8 * (syllables / words) - 15.59
}

/// Diffs an original draft against its edited form (spec §4.4.3).
pub fn classify(original: &str, edited: &str) -> EditDelta {
    let formal_original = count_occurrences(original, FORMAL_MARKERS) as i64 - count_occurrences(original, CASUAL_MARKERS) as i64;
    let formal_edited = count_occurrences(edited, FORMAL_MARKERS) as i64 - count_occurrences(edited, CASUAL_MARKERS) as i64;
    let tone_shift = if formal_edited > formal_original + 1 {
        ToneShift::MoreFormal
    } else if formal_edited < formal_original - 1 {
        ToneShift::MoreCasual
    } else {
        ToneShift::Same
    };

    let original_len = original.chars().count();
    let edited_len = edited.chars().count();
    let length_delta_ratio = if original_len == 0 {
        0.0
    } else {
        (edited_len as f64 - original_len as f64) / original_len as f64
    };
    let length_change = if length_delta_ratio < -0.1 {
        LengthChange::Shorter
    } else if length_delta_ratio > 0.1 {
        LengthChange::Longer
    } else {
        LengthChange::Same
    };
    let length_delta_percent = (length_delta_ratio * 100.0).round() as i32;

    let original_has_cta = contains_any(original, CTA_PHRASES);
    let edited_has_cta = contains_any(edited, CTA_PHRASES);
    let added_cta = !original_has_cta && edited_has_cta;
    let removed_cta = original_has_cta && !edited_has_cta;

    let changed_subject = subject_line(original) != subject_line(edited);

    let original_has_personalization = contains_any(original, PERSONALIZATION_PHRASES);
    let edited_has_personalization = contains_any(edited, PERSONALIZATION_PHRASES);
    let added_personalization = !original_has_personalization && edited_has_personalization;
    let removed_personalization = original_has_personalization && !edited_has_personalization;

    let added_bullet_points = bullet_line_count(edited) > bullet_line_count(original);

    let simplified_language = complexity_score(edited) < 0.9 * complexity_score(original);

    EditDelta {
        tone_shift,
        length_change,
        length_delta_percent,
        added_cta,
        removed_cta,
        changed_subject,
        added_personalization,
        removed_personalization,
        added_bullet_points,
        simplified_language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casual_to_formal_rewrite_is_classified_correctly() {
        let original = "Hey, quick ping — any thoughts?";
        let edited = "Dear Dr. Smith, kindly let me know your thoughts at your earliest convenience. Sincerely, J.";
        let delta = classify(original, edited);
        assert_eq!(delta.tone_shift, ToneShift::MoreFormal);
        assert_eq!(delta.length_change, LengthChange::Longer);
        assert!(delta.length_delta_percent > 10);
        assert!(delta.added_cta);
        assert!(!delta.added_personalization);
        assert!(!delta.simplified_language);
    }

    #[test]
    fn unchanged_length_within_ten_percent_is_same() {
        let original = "Following up on our call, let's set up a time next week.";
        let edited = "Following up on our call, let's find a time next week.";
        let delta = classify(original, edited);
        assert_eq!(delta.length_change, LengthChange::Same);
    }

    #[test]
    fn adding_bullets_is_detected() {
        let original = "Here is the plan for next week.";
        let edited = "Here is the plan for next week:\n- step one\n- step two\n- step three";
        let delta = classify(original, edited);
        assert!(delta.added_bullet_points);
    }

    #[test]
    fn empty_original_never_divides_by_zero() {
        let delta = classify("", "Some new content here.");
        assert_eq!(delta.length_delta_percent, 0);
        assert_eq!(delta.length_change, LengthChange::Same);
    }

    #[test]
    fn subject_line_change_is_detected() {
        let original = "Subject: Quick check-in\n\nHi there.";
        let edited = "Subject: Re: proposal follow-up\n\nHi there.";
        let delta = classify(original, edited);
        assert!(delta.changed_subject);
    }
}
