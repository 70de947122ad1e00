//! Transcript normalization
//!
//! Recognition engines routinely emit stretched words ("myyyy") and
//! immediate repeats ("go go to the store") in interim results. The
//! normalizer removes both artifacts deterministically so it can be run on
//! every cumulative transcript without accumulating damage.

/// Normalize a raw transcript.
///
/// Tokenizes on whitespace, drops a token when it is case-insensitively
/// identical to the previously kept token, collapses same-character runs
/// inside each token (length >= 3 down to 2, or >= 2 down to 1 when
/// `aggressive` is set), and rejoins with single spaces.
///
/// Idempotent: `normalize(normalize(s, a), a) == normalize(s, a)`.
#[must_use]
pub fn normalize(raw: &str, aggressive: bool) -> String {
    let mut kept: Vec<String> = Vec::new();

    for token in raw.split_whitespace() {
        let collapsed = collapse_runs(token, aggressive);
        if collapsed.is_empty() {
            continue;
        }
        if let Some(prev) = kept.last()
            && prev.eq_ignore_ascii_case(&collapsed)
        {
            continue;
        }
        kept.push(collapsed);
    }

    kept.join(" ")
}

/// Collapse runs of the same character within a single token.
///
/// Default policy keeps doubled letters ("myyyy" -> "myy", "good" stays
/// "good"); the aggressive policy flattens every run to one character.
fn collapse_runs(token: &str, aggressive: bool) -> String {
    let max_run = if aggressive { 1 } else { 2 };
    let mut out = String::with_capacity(token.len());
    let mut last: Option<char> = None;
    let mut run = 0usize;

    for ch in token.chars() {
        if last == Some(ch) {
            run += 1;
        } else {
            last = Some(ch);
            run = 1;
        }
        if run <= max_run {
            out.push(ch);
        }
    }

    out
}
