//! Text sanitation for synthesis
//!
//! Model output arrives as markdown with the occasional emoji; neither
//! survives a speech engine gracefully. Sanitation also truncates to a
//! bounded length so synthesis latency and cost stay bounded.

use std::sync::LazyLock;

use regex::Regex;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[*_`~]+|^#+\s*|^\s*[-+]\s+").expect("valid regex"));

/// Strip structural markup and pictographs, squeeze whitespace, and
/// truncate to `max_chars` at a word boundary.
#[must_use]
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let text = CODE_FENCE.replace_all(text, " ");
    let text = LINK.replace_all(&text, "$1");
    let text = MARKUP.replace_all(&text, " ");

    let cleaned: String = text.chars().filter(|c| !is_pictographic(*c)).collect();
    let squeezed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    truncate_at_word(&squeezed, max_chars)
}

/// Emoji and symbol ranges a speech engine would read out as garbage
fn is_pictographic(c: char) -> bool {
    matches!(u32::from(c),
        0x1F000..=0x1FAFF    // emoji, symbols, pictographs
        | 0x2600..=0x27BF    // misc symbols, dingbats
        | 0x2B00..=0x2BFF    // arrows and symbols
        | 0xFE00..=0xFE0F    // variation selectors
        | 0x200D             // zero-width joiner
    )
}

/// Cut to at most `max_chars` characters, backing up to the last space so
/// no word is cut in half
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].to_string(),
        _ => cut,
    }
}
