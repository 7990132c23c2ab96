//! Helpers for interpreting free-form language-model replies.

/// Extract the first balanced JSON object embedded in `reply`.
///
/// Models frequently wrap JSON in prose or Markdown fences; this scans for
/// the first `{`, tracks brace depth (ignoring braces inside string
/// literals) and parses the enclosed slice. Returns `None` when no
/// parseable object is found.
pub fn extract_json_object(reply: &str) -> Option<serde_json::Value> {
    let bytes = reply.as_bytes();
    let mut search_from = 0;

    while let Some(rel) = reply[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(end) = matching_brace(bytes, start) {
            if let Ok(value @ serde_json::Value::Object(_)) =
                serde_json::from_str::<serde_json::Value>(&reply[start..=end])
            {
                return Some(value);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Index of the `}` closing the `{` at `start`, if any.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let v = extract_json_object(r#"{"joy": 0.5}"#).unwrap();
        assert_eq!(v["joy"], 0.5);
    }

    #[test]
    fn object_inside_markdown_fence() {
        let reply = "Here you go:\n```json\n{\"sadness\": 0.9, \"note\": \"a } brace\"}\n```";
        let v = extract_json_object(reply).unwrap();
        assert_eq!(v["sadness"], 0.9);
        assert_eq!(v["note"], "a } brace");
    }

    #[test]
    fn skips_unparseable_candidates() {
        let reply = "{not json} then {\"fear\": 0.1}";
        let v = extract_json_object(reply).unwrap();
        assert_eq!(v["fear"], 0.1);
    }

    #[test]
    fn no_object_returns_none() {
        assert!(extract_json_object("I cannot help with that.").is_none());
        assert!(extract_json_object("{ unterminated").is_none());
    }
}
