//! Minimal YAML-style frontmatter reading for deliverable documents.
//!
//! Only flat `key: value` lines are understood. Nested YAML is ignored.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static FRONTMATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
        .expect("frontmatter regex should be valid")
});

/// Parse the leading frontmatter block into a key/value map.
///
/// Returns an empty map when the document has no frontmatter.
pub fn parse_frontmatter(contents: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let Some(caps) = FRONTMATTER.captures(contents) else {
        return fields;
    };
    for line in caps[1].lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        fields.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    fields
}

/// True if `field` is present and its value contains any accepted value,
/// compared case-insensitively.
pub fn has_marker(contents: &str, field: &str, accepted: &[String]) -> bool {
    let fields = parse_frontmatter(contents);
    let Some(value) = fields.get(field) else {
        return false;
    };
    let value = value.to_lowercase();
    accepted
        .iter()
        .any(|want| value.contains(&want.to_lowercase()))
}

/// Required section names absent from the document (case-insensitive).
pub fn missing_sections(contents: &str, sections: &[String]) -> Vec<String> {
    let lowered = contents.to_lowercase();
    sections
        .iter()
        .filter(|section| !lowered.contains(&section.to_lowercase()))
        .cloned()
        .collect()
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        return &value[1..value.len() - 1];
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_fields() {
        let doc = "---\ntitle: Plan\nconsulted_by: \"plan-consultant\"\n---\n# Body\n";
        let fields = parse_frontmatter(doc);
        assert_eq!(fields.get("title").map(String::as_str), Some("Plan"));
        assert_eq!(
            fields.get("consulted_by").map(String::as_str),
            Some("plan-consultant")
        );
    }

    #[test]
    fn missing_frontmatter_is_empty() {
        assert!(parse_frontmatter("# Plan\nconsulted_by: x\n").is_empty());
        assert!(parse_frontmatter("").is_empty());
    }

    #[test]
    fn marker_matches_case_insensitively() {
        let doc = "---\nvalidated_by: Research-Consultant (2026-10-01)\n---\n";
        assert!(has_marker(
            doc,
            "validated_by",
            &["research-consultant".to_string()]
        ));
        assert!(!has_marker(doc, "consulted_by", &["research-consultant".to_string()]));
    }

    #[test]
    fn reports_missing_sections() {
        let doc = "## Summary\nall good\n";
        assert_eq!(
            missing_sections(doc, &["summary".to_string(), "findings".to_string()]),
            vec!["findings".to_string()]
        );
    }
}
