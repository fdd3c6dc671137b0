use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Standalone `PR` / `IN` annotations appended to grade cells.
static ADMIN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:PR|IN)\b").expect("admin tag regex"));
static EMPTY_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(\[{]\s*[)\]}]").expect("empty brackets regex"));
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([/|,;.\-])(?:\s+[/|,;.\-])+").expect("separator run regex"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("multi space regex"));

const EDGE_CHARS: &str = "()[]{}-/|,;.";

/// Comparison key: diacritics removed, lower-cased, trimmed. Never shown to users.
pub fn normalize_for_comparison(s: &str) -> String {
    strip_diacritics(s).to_lowercase().trim().to_string()
}

/// Drops combining marks after canonical decomposition, keeping case.
pub fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Removes administrative tags and the separator debris they leave behind.
///
/// `"8 PR"` becomes `"8"`, `"įsk (IN)"` becomes `"įsk"` and a lone `"PR"`
/// becomes the empty string. Passes repeat until nothing changes, so the
/// result is stable under a second call.
pub fn clean_tagged_value(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn clean_pass(s: &str) -> String {
    let s = ADMIN_TAG.replace_all(s, "");
    let s = EMPTY_BRACKETS.replace_all(&s, "");
    let s = SEPARATOR_RUN.replace_all(&s, "$1");
    let s = MULTI_SPACE.replace_all(&s, " ");
    let s = s.trim_matches(|c: char| c.is_whitespace() || EDGE_CHARS.contains(c));
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}
