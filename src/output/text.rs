//! Plain-text output.

use std::sync::LazyLock;

use regex::Regex;

use crate::ocr::OcrResult;

/// A Markdown construct, and what to replace it with.
struct Rule {
    re: Regex,
    replacement: &'static str,
}

/// Markdown syntax to strip, applied in order.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    [
        // Fenced code block delimiters.
        (r"(?m)^[ \t]*(```|~~~).*\n?", ""),
        // Images go entirely; their alt text is usually just an ID.
        (r"!\[[^\]]*\]\([^)]*\)", ""),
        (r"\[([^\]]+)\]\([^)]*\)", "$1"),
        (r"(?m)^[ \t]{0,3}#{1,6}[ \t]+", ""),
        (r"(?m)^[ \t]{0,3}(>[ \t]?)+", ""),
        (r"(?m)^[ \t]*([-*_][ \t]*){3,}$", ""),
        (r"\*\*([^*\n]+)\*\*", "$1"),
        (r"__([^_\n]+)__", "$1"),
        (r"~~([^~\n]+)~~", "$1"),
        (r"\*([^*\s][^*\n]*)\*", "$1"),
        (r"`([^`\n]*)`", "$1"),
    ]
    .into_iter()
    .map(|(re, replacement)| Rule {
        re: Regex::new(re).expect("failed to compile regex"),
        replacement,
    })
    .collect()
});

/// Remove Markdown syntax markers, keeping the words.
pub fn strip_markdown(markdown: &str) -> String {
    let mut text = markdown.to_owned();
    for rule in RULES.iter() {
        text = rule.re.replace_all(&text, rule.replacement).into_owned();
    }
    text
}

/// All page texts, stripped, separated by blank lines.
pub fn render_text(result: &OcrResult) -> String {
    let mut out = result
        .page_texts()
        .map(|page| strip_markdown(page).trim().to_owned())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}
