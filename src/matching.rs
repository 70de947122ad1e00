//! Spoken-answer grading
//!
//! Deliberately permissive: recognition output is noisy and a strict
//! comparison punishes the speaker for the engine's mistakes. A spoken
//! answer matches when either phrase contains the other, or when they
//! share at least one word.

use crate::normalize::normalize;

/// Whether a spoken phrase counts as a match for the expected one
#[must_use]
pub fn answer_matches(spoken: &str, expected: &str) -> bool {
    let spoken = normalize(spoken, true).to_lowercase();
    let expected = normalize(expected, true).to_lowercase();

    if spoken.is_empty() || expected.is_empty() {
        return false;
    }

    if spoken.contains(&expected) || expected.contains(&spoken) {
        return true;
    }

    let expected_words: Vec<&str> = expected.split_whitespace().collect();
    spoken
        .split_whitespace()
        .any(|word| expected_words.contains(&word))
}
