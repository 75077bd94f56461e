//! Question option normalization.
//!
//! The server encodes answer options three different ways depending on how
//! the question was authored: a structured array of option objects, a JSON
//! string containing such an array, or a flat display string like
//! `"A) Strongly Disagree, B) Disagree, ..."`. This module flattens all of
//! them into one canonical, ordered list of [`AnswerOption`]s.

use serde_json::Value;

use crate::model::AnswerOption;

/// Parse a raw option payload into a canonical ordered option list.
///
/// Guarantees: no entry has an empty key or label, keys are single
/// uppercase letters, and input order is preserved. Unrecognized payloads
/// yield an empty list.
pub fn parse_options(raw: &Value) -> Vec<AnswerOption> {
    match raw {
        Value::Array(items) => from_structured(items),
        Value::String(s) => {
            // A stringified JSON array takes priority over flat-string
            // interpretation.
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                let parsed = from_structured(&items);
                if !parsed.is_empty() {
                    return parsed;
                }
            }
            from_flat_string(s)
        }
        _ => Vec::new(),
    }
}

/// The fixed five-point agreement scale used by Likert questions when the
/// server sends no options of its own.
pub fn likert_options() -> Vec<AnswerOption> {
    [
        ("A", "Strongly Disagree"),
        ("B", "Disagree"),
        ("C", "Neutral"),
        ("D", "Agree"),
        ("E", "Strongly Agree"),
    ]
    .iter()
    .map(|(key, label)| AnswerOption {
        key: (*key).to_string(),
        label: (*label).to_string(),
    })
    .collect()
}

/// Normalize an already-structured array of option objects.
fn from_structured(items: &[Value]) -> Vec<AnswerOption> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let key = obj
                .get("key")
                .or_else(|| obj.get("value"))
                .and_then(Value::as_str)?
                .trim()
                .to_uppercase();
            let label = obj
                .get("label")
                .or_else(|| obj.get("text"))
                .and_then(Value::as_str)?
                .trim()
                .to_string();
            // Keys must be single letters, matching the flat-string path.
            if label.is_empty() || key.len() != 1 || !key.as_bytes()[0].is_ascii_alphabetic() {
                return None;
            }
            Some(AnswerOption { key, label })
        })
        .collect()
}

/// Parse a flat display string like `"A) Foo, B. Bar"`.
///
/// Splits on comma boundaries that are followed (after optional spaces) by
/// a single letter and `)` or `.`, so labels that themselves contain commas
/// survive intact. If no segment matches the `letter, delimiter, text`
/// pattern, falls back to a naive comma split.
fn from_flat_string(s: &str) -> Vec<AnswerOption> {
    let segments = split_on_option_boundaries(s);
    let parsed: Vec<AnswerOption> = segments.iter().filter_map(|seg| match_segment(seg)).collect();
    if !parsed.is_empty() {
        return parsed;
    }

    // Fallback: naive comma split with per-segment matching.
    s.split(',').filter_map(match_segment).collect()
}

/// Split `s` at commas immediately preceding an option marker.
fn split_on_option_boundaries(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b',' {
            continue;
        }
        let mut j = i + 1;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        let is_boundary = j + 1 < bytes.len()
            && bytes[j].is_ascii_alphabetic()
            && (bytes[j + 1] == b')' || bytes[j + 1] == b'.');
        if is_boundary {
            segments.push(&s[start..i]);
            start = i + 1;
        }
    }
    segments.push(&s[start..]);
    segments
}

/// Match one segment against the `letter, delimiter, text` pattern.
fn match_segment(segment: &str) -> Option<AnswerOption> {
    let trimmed = segment.trim();
    let mut chars = trimmed.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    let delimiter = chars.next()?;
    if delimiter != ')' && delimiter != '.' {
        return None;
    }
    let label = chars.as_str().trim();
    if label.is_empty() {
        return None;
    }
    Some(AnswerOption {
        key: letter.to_ascii_uppercase().to_string(),
        label: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_structured_array() {
        let raw = json!([
            {"key": "a", "label": " Yes "},
            {"key": "B", "label": "No"},
        ]);
        let options = parse_options(&raw);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].key, "A");
        assert_eq!(options[0].label, "Yes");
        assert_eq!(options[1].key, "B");
    }

    #[test]
    fn parse_structured_drops_empty_labels() {
        let raw = json!([
            {"key": "A", "label": ""},
            {"key": "B", "label": "Kept"},
        ]);
        let options = parse_options(&raw);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].key, "B");
    }

    #[test]
    fn parse_structured_drops_malformed_keys() {
        let raw = json!([
            {"key": "AB", "label": "Two letters"},
            {"key": "1", "label": "Digit"},
            {"key": "c", "label": "Kept"},
        ]);
        let options = parse_options(&raw);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].key, "C");
    }

    #[test]
    fn parse_json_encoded_string() {
        let raw = json!(r#"[{"key": "A", "label": "One"}, {"key": "B", "label": "Two"}]"#);
        let options = parse_options(&raw);
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].label, "Two");
    }

    #[test]
    fn parse_flat_likert_string() {
        let raw =
            json!("A) Strongly Disagree, B) Disagree, C) Neutral, D) Agree, E) Strongly Agree");
        let options = parse_options(&raw);
        let keys: Vec<&str> = options.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(options[0].label, "Strongly Disagree");
        assert_eq!(options[4].label, "Strongly Agree");
    }

    #[test]
    fn parse_flat_string_with_dot_delimiter() {
        let raw = json!("A. First, B. Second");
        let options = parse_options(&raw);
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].key, "B");
        assert_eq!(options[1].label, "Second");
    }

    #[test]
    fn comma_inside_label_is_not_a_boundary() {
        let raw = json!("A) Red, green, and blue, B) Cyan");
        let options = parse_options(&raw);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "Red, green, and blue");
        assert_eq!(options[1].label, "Cyan");
    }

    #[test]
    fn keys_are_uppercased() {
        let raw = json!("a) lower, b) case");
        let options = parse_options(&raw);
        assert_eq!(options[0].key, "A");
        assert_eq!(options[1].key, "B");
    }

    #[test]
    fn unrecognized_payloads_yield_empty() {
        assert!(parse_options(&json!(42)).is_empty());
        assert!(parse_options(&json!(null)).is_empty());
        assert!(parse_options(&json!("no options here")).is_empty());
    }

    #[test]
    fn likert_scale_is_five_points() {
        let options = likert_options();
        assert_eq!(options.len(), 5);
        assert_eq!(options[0].key, "A");
        assert_eq!(options[2].label, "Neutral");
    }
}
