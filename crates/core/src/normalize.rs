use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    disallowed: Regex,
    blank_lines: Regex,
    horizontal_space: Regex,
}

// Compiled once per process; every later call reuses them.
fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        disallowed: Regex::new(r"[^\w\s.,()\-:;]").expect("disallowed pattern is valid"),
        blank_lines: Regex::new(r"\n[^\S\n]*\n(?:[^\S\n]*\n)*")
            .expect("blank line pattern is valid"),
        horizontal_space: Regex::new(r"[^\S\n]+").expect("space pattern is valid"),
    })
}

/// Cleans extracted page text before chunking.
///
/// Anything outside word characters, whitespace and `. , ( ) - : ;` becomes a
/// space. Runs of blank lines shrink to a single paragraph break, runs of
/// spaces to one space, and the result is trimmed. Word characters are
/// Unicode-aware, so accented letters survive.
pub fn normalize_text(raw: &str) -> String {
    let patterns = patterns();
    let cleaned = patterns.disallowed.replace_all(raw, " ");
    let cleaned = patterns.blank_lines.replace_all(&cleaned, "\n\n");
    let cleaned = patterns.horizontal_space.replace_all(&cleaned, " ");
    cleaned.trim().to_string()
}
