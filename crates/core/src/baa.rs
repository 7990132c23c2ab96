//! Business Associate Agreement templates.
//!
//! Template bodies are plain text with `{{ variable }}` placeholders. Names
//! follow `[a-z_][a-z0-9_]*` and may be padded with whitespace inside the
//! braces. A stray `{{` or `}}` makes the body invalid.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// Maximum template name length.
pub const NAME_MAX: usize = 200;
/// Maximum template body length in bytes.
pub const BODY_MAX: usize = 100_000;

static PLACEHOLDER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z_][a-z0-9_]*)\s*$").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unbalanced placeholder braces at byte {position}")]
    Unbalanced { position: usize },

    #[error("invalid placeholder '{{{{{text}}}}}'")]
    InvalidPlaceholder { text: String },

    #[error("missing values for template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Var(&'a str),
}

fn scan(body: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = body;
    let mut offset = 0;

    loop {
        let open = rest.find("{{");
        let close = rest.find("}}");
        match (open, close) {
            (None, None) => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest));
                }
                return Ok(segments);
            }
            (None, Some(c)) => return Err(TemplateError::Unbalanced { position: offset + c }),
            (Some(o), Some(c)) if c < o => {
                return Err(TemplateError::Unbalanced { position: offset + c })
            }
            (Some(o), _) => {
                if o > 0 {
                    segments.push(Segment::Text(&rest[..o]));
                }
                let after = &rest[o + 2..];
                let end = after
                    .find("}}")
                    .ok_or(TemplateError::Unbalanced { position: offset + o })?;
                let inner = &after[..end];
                if inner.contains("{{") {
                    return Err(TemplateError::Unbalanced { position: offset + o });
                }
                let caps = PLACEHOLDER_NAME.captures(inner).ok_or_else(|| {
                    TemplateError::InvalidPlaceholder {
                        text: inner.trim().to_string(),
                    }
                })?;
                let name = caps.get(1).map_or("", |m| m.as_str());
                segments.push(Segment::Var(name));

                let consumed = o + 2 + end + 2;
                offset += consumed;
                rest = &rest[consumed..];
            }
        }
    }
}

/// Distinct variable names referenced by `body`, sorted.
pub fn parse_variables(body: &str) -> Result<Vec<String>, TemplateError> {
    let names: BTreeSet<&str> = scan(body)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Var(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect();
    Ok(names.into_iter().map(str::to_string).collect())
}

/// Substitute every placeholder in `body`.
///
/// All referenced variables must be supplied with a non-blank value;
/// otherwise the sorted list of missing names is returned. Extra variables
/// are ignored.
pub fn render(body: &str, variables: &HashMap<String, String>) -> Result<String, TemplateError> {
    let segments = scan(body)?;

    let missing: BTreeSet<&str> = segments
        .iter()
        .filter_map(|s| match s {
            Segment::Var(name)
                if variables
                    .get(*name)
                    .map_or(true, |value| value.trim().is_empty()) =>
            {
                Some(*name)
            }
            _ => None,
        })
        .collect();
    if !missing.is_empty() {
        return Err(TemplateError::MissingVariables(
            missing.into_iter().map(str::to_string).collect(),
        ));
    }

    let mut out = String::with_capacity(body.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Var(name) => {
                if let Some(value) = variables.get(name) {
                    out.push_str(value);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_sorted_distinct_variables() {
        let body = "Between {{ covered_entity }} and {{business_associate}}, \
                    effective {{effective_date}}. Signed: {{covered_entity}}";
        assert_eq!(
            parse_variables(body).unwrap(),
            vec!["business_associate", "covered_entity", "effective_date"]
        );
    }

    #[test]
    fn body_without_placeholders_has_no_variables() {
        assert!(parse_variables("Plain agreement text.").unwrap().is_empty());
        assert!(parse_variables("").unwrap().is_empty());
    }

    #[test]
    fn renders_all_placeholders() {
        let body = "Agreement between {{ a }} and {{b}}.";
        let out = render(body, &vars(&[("a", "Clinic"), ("b", "Vendor"), ("extra", "x")])).unwrap();
        assert_eq!(out, "Agreement between Clinic and Vendor.");
    }

    #[test]
    fn missing_and_blank_variables_are_reported_sorted() {
        let body = "{{zeta}} {{alpha}} {{mid}} {{alpha}}";
        let err = render(body, &vars(&[("mid", "   ")])).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingVariables(vec![
                "alpha".to_string(),
                "mid".to_string(),
                "zeta".to_string()
            ])
        );
        assert_eq!(
            err.to_string(),
            "missing values for template variables: alpha, mid, zeta"
        );
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        assert_matches!(parse_variables("Hello {{name"), Err(TemplateError::Unbalanced { position: 6 }));
        assert_matches!(parse_variables("Hello name}}"), Err(TemplateError::Unbalanced { position: 10 }));
        assert_matches!(
            parse_variables("{{ a {{ b }}"),
            Err(TemplateError::Unbalanced { .. })
        );
    }

    #[test]
    fn invalid_placeholder_names_are_rejected() {
        assert_matches!(
            parse_variables("{{ Name }}"),
            Err(TemplateError::InvalidPlaceholder { text }) if text == "Name"
        );
        assert_matches!(parse_variables("{{1abc}}"), Err(TemplateError::InvalidPlaceholder { .. }));
        assert_matches!(parse_variables("{{}}"), Err(TemplateError::InvalidPlaceholder { .. }));
    }

    #[test]
    fn single_braces_are_literal_text() {
        let out = render("{a} {{x}} }", &vars(&[("x", "1")])).unwrap();
        assert_eq!(out, "{a} 1 }");
    }
}
