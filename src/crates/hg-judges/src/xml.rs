//! Minimal extraction of the tagged-XML sections the judge prompts ask for
//! (`<analysis>`, `<valid>`, ... — `§4.6`). The judge models are asked to
//! emit a handful of flat, non-nested tags; a small regex scan is enough
//! and avoids pulling in a full XML parser for output that is really just
//! "structured text with delimiters".

use regex::Regex;
use std::sync::OnceLock;

/// Extract the text content of `<tag>...</tag>` from `text`, if present.
/// Case-sensitive, non-greedy, tolerant of surrounding whitespace.
pub fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{tag}>(.*?)</{tag}>");
    let re = Regex::new(&pattern).ok()?;
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string())
}

/// Extract a boolean tag (`true`/`false`, case-insensitive, optionally with
/// surrounding whitespace).
pub fn extract_bool_tag(text: &str, tag: &str) -> Option<bool> {
    extract_tag(text, tag).and_then(|s| match s.to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    })
}

/// Extract a newline- or comma-separated list tag into its items, dropping
/// blanks. Returns an empty vec (not `None`) for an empty or absent tag —
/// "no redundant premises" is a valid, common answer.
pub fn extract_list_tag(text: &str, tag: &str) -> Vec<String> {
    let Some(body) = extract_tag(text, tag) else {
        return Vec::new();
    };
    body.split(['\n', ','])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .collect()
}

/// Extract a numeric tag, e.g. `<score>7.5</score>`.
pub fn extract_number_tag(text: &str, tag: &str) -> Option<f64> {
    extract_tag(text, tag).and_then(|s| first_number(&s))
}

fn first_number(s: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"-?\d+(\.\d+)?").unwrap());
    re.find(s).and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_tag() {
        let text = "<analysis>Looks valid.</analysis>";
        assert_eq!(extract_tag(text, "analysis").as_deref(), Some("Looks valid."));
    }

    #[test]
    fn extracts_multiline_tag() {
        let text = "<analysis>\nLine one.\nLine two.\n</analysis>";
        assert_eq!(extract_tag(text, "analysis").as_deref(), Some("Line one.\nLine two."));
    }

    #[test]
    fn bool_tag_parses_common_forms() {
        assert_eq!(extract_bool_tag("<valid>true</valid>", "valid"), Some(true));
        assert_eq!(extract_bool_tag("<valid>No</valid>", "valid"), Some(false));
        assert_eq!(extract_bool_tag("<valid>maybe</valid>", "valid"), None);
    }

    #[test]
    fn list_tag_splits_and_drops_none() {
        assert_eq!(extract_list_tag("<redundant_premises>none</redundant_premises>", "redundant_premises"), Vec::<String>::new());
        assert_eq!(
            extract_list_tag("<redundant_premises>c2, c3</redundant_premises>", "redundant_premises"),
            vec!["c2".to_string(), "c3".to_string()]
        );
    }

    #[test]
    fn number_tag_extracts_first_number() {
        assert_eq!(extract_number_tag("<score>7.5 out of 10</score>", "score"), Some(7.5));
    }

    #[test]
    fn missing_tag_returns_none() {
        assert_eq!(extract_tag("no tags here", "analysis"), None);
    }
}
