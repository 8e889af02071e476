//! Utterance sanitizing
//!
//! Turns one raw markdown display line into the text the synthesizer should
//! say. Structural markers are dropped, emphasis is unwrapped, links collapse
//! to their label and table rows are read cell by cell.
//!
//! An empty result means "nothing to say" and is a normal outcome for blank
//! lines, table separators and horizontal rules.

use once_cell::sync::Lazy;
use regex::Regex;

/// Spoken separator between table cells
pub const CELL_SEPARATOR: &str = ", ";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("sanitizer pattern must compile")
}

/// `---`, `***`, `___` (optionally spaced)
static THEMATIC_BREAK: Lazy<Regex> =
    Lazy::new(|| compile(r"^\s*(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$"));

/// Leading structural markers, stripped repeatedly until none is left
static LEADING_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // blockquote
        compile(r"^\s*>\s?"),
        // heading
        compile(r"^\s*#{1,6}(?:\s+|$)"),
        // bullet, with optional task box
        compile(r"^\s*[-*+]\s+(?:\[[ xX]\]\s+)?"),
        // ordered list
        compile(r"^\s*\d+[.)]\s+"),
    ]
});

/// Inline rewrites applied once, in order
static INLINE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // code spans first, so anything they wrap is still rewritten below
        (compile(r"`+([^`]+?)`+"), "${1}"),
        // images and links keep only the visible label
        (compile(r"!?\[([^\]]*)\]\([^)]*\)"), "${1}"),
        (compile(r"!?\[([^\]]+)\]\[[^\]]*\]"), "${1}"),
        // strong
        (compile(r"\*\*(\S(?:[^*]*?\S)?)\*\*"), "${1}"),
        (compile(r"(^|[^\w])__(\S(?:[^_]*?\S)?)__($|[^\w])"), "${1}${2}${3}"),
        // emphasis
        (compile(r"\*(\S(?:[^*]*?\S)?)\*"), "${1}"),
        (compile(r"(^|[^\w])_(\S(?:[^_]*?\S)?)_($|[^\w])"), "${1}${2}${3}"),
        // strikethrough
        (compile(r"~~([^~]+)~~"), "${1}"),
    ]
});

/// A line made only of pipes, dashes, colons and whitespace
static TABLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| compile(r"^[\s|:\-]+$"));

/// Reduce a raw display line to speakable text
///
/// Returns an empty string when the line carries nothing worth speaking.
pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() || THEMATIC_BREAK.is_match(raw) {
        return String::new();
    }

    let mut text = strip_leading_markers(raw);

    for (re, replacement) in INLINE_RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }

    // Unwrapping can expose a marker, e.g. "**1.** Intro"
    let text = strip_leading_markers(&text);

    if TABLE_SEPARATOR.is_match(&text) {
        return String::new();
    }

    if text.contains('|') {
        return speak_table_row(&text);
    }

    text.trim().to_string()
}

fn strip_leading_markers(line: &str) -> String {
    let mut text = line.to_string();
    loop {
        let before = text.len();
        for re in LEADING_MARKERS.iter() {
            text = re.replace(&text, "").into_owned();
        }
        if text.len() == before {
            return text;
        }
    }
}

/// Read table cells in order, dropping empty ones
fn speak_table_row(row: &str) -> String {
    row.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect::<Vec<_>>()
        .join(CELL_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings() {
        assert_eq!(sanitize("# Title"), "Title");
        assert_eq!(sanitize("###   Deep heading  "), "Deep heading");
        assert_eq!(sanitize("#hashtag"), "#hashtag");
        assert_eq!(sanitize("#"), "");
    }

    #[test]
    fn test_lists() {
        assert_eq!(sanitize("- first"), "first");
        assert_eq!(sanitize("    * nested"), "nested");
        assert_eq!(sanitize("+ plus"), "plus");
        assert_eq!(sanitize("  12. twelfth"), "twelfth");
        assert_eq!(sanitize("3) third"), "third");
        assert_eq!(sanitize("- [x] done"), "done");
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(sanitize("> quoted"), "quoted");
        assert_eq!(sanitize("> > - nested item"), "nested item");
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(sanitize("some **bold** text"), "some bold text");
        assert_eq!(sanitize("an *emphasised* word"), "an emphasised word");
        assert_eq!(sanitize("__strong__ and _em_"), "strong and em");
        assert_eq!(sanitize("run `cargo build` now"), "run cargo build now");
        assert_eq!(sanitize("~~old~~ new"), "old new");
    }

    #[test]
    fn test_emphasis_leaves_arithmetic_and_identifiers() {
        assert_eq!(sanitize("2 * 3 * 4"), "2 * 3 * 4");
        assert_eq!(sanitize("call snake_case_name here"), "call snake_case_name here");
    }

    #[test]
    fn test_links() {
        assert_eq!(sanitize("see [the docs](https://example.com)"), "see the docs");
        assert_eq!(sanitize("![diagram](img/a.png)"), "diagram");
        assert_eq!(sanitize("[label][ref]"), "label");
    }

    #[test]
    fn test_link_inside_code_span() {
        assert_eq!(sanitize("`[a](b)`"), "a");
        assert_eq!(sanitize("use `**strong**` here"), "use strong here");
    }

    #[test]
    fn test_nested_ordered_list_marker() {
        // "- 1986. x" is a bullet holding an ordered list numbered 1986
        assert_eq!(sanitize("- 1986. A good year"), "A good year");
        assert_eq!(sanitize("- 1986 was a good year"), "1986 was a good year");
    }

    #[test]
    fn test_table_separator() {
        assert_eq!(sanitize("|---|---|"), "");
        assert_eq!(sanitize("| :--- | ---: |"), "");
        assert_eq!(sanitize("|:-:|"), "");
    }

    #[test]
    fn test_table_row() {
        assert_eq!(sanitize("| Name | Age |"), "Name, Age");
        assert_eq!(sanitize("a || b |"), "a, b");
    }

    #[test]
    fn test_thematic_break() {
        assert_eq!(sanitize("---"), "");
        assert_eq!(sanitize("* * *"), "");
        assert_eq!(sanitize("___"), "");
    }

    #[test]
    fn test_exposed_marker() {
        assert_eq!(sanitize("**1.** Intro"), "Intro");
        assert_eq!(sanitize("# 1. Intro"), "Intro");
    }
}
