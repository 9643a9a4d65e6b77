use regex::Regex;
use std::sync::OnceLock;

/// Matches numbered reference-list lines like "[1] Smith, J. ..."
fn numbered_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\d+\]").expect("valid regex"))
}

/// Split raw input into individual citation strings.
///
/// Keeps non-blank lines that start with a bracketed number; when no line
/// matches, the entire input is treated as a single citation. This is a
/// heuristic for numbered reference lists and deliberately under-extracts
/// citations embedded in free prose.
pub fn extract_citations(text: &str) -> Vec<String> {
    let numbered: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && numbered_line().is_match(line))
        .map(str::to_string)
        .collect();

    if numbered.is_empty() {
        let whole = text.trim();
        if whole.is_empty() {
            Vec::new()
        } else {
            vec![whole.to_string()]
        }
    } else {
        numbered
    }
}
