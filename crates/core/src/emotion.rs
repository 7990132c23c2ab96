//! Emotion score validation and normalization.
//!
//! A provider returns a map of emotion label to score. Before anything is
//! shown to a clinician or stored, the map goes through a fixed pipeline:
//!
//! 1. Labels are trimmed and lowercased; labels outside [`KNOWN_EMOTIONS`]
//!    are dropped and reported in `discarded_labels`.
//! 2. Each kept score must be a finite number in `[0, 1]`.
//! 3. At least one known emotion with a non-zero score must remain.
//! 4. Scores are normalized to sum to 1.
//! 5. The dominant emotion is the highest score; ties go to the label that
//!    comes first in [`KNOWN_EMOTIONS`]. Confidence is its normalized score.

use serde::Serialize;

/// Recognized emotion labels, in tie-break order.
pub const KNOWN_EMOTIONS: [&str; 9] = [
    "joy",
    "sadness",
    "anger",
    "fear",
    "surprise",
    "disgust",
    "trust",
    "anticipation",
    "neutral",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmotionError {
    #[error("emotion scores must be a JSON object")]
    NotAnObject,

    #[error("score for '{label}' {reason}")]
    InvalidScore { label: String, reason: String },

    #[error("duplicate emotion label '{0}'")]
    DuplicateLabel(String),

    #[error("no recognized emotion scores in analysis")]
    NoKnownEmotions,

    #[error("all emotion scores are zero")]
    ZeroTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionScore {
    pub label: &'static str,
    pub score: f64,
}

/// Validated, normalized emotion analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionAnalysis {
    /// Normalized scores in [`KNOWN_EMOTIONS`] order.
    pub scores: Vec<EmotionScore>,
    pub dominant_emotion: &'static str,
    pub confidence: f64,
    /// Labels the provider returned that are not recognized.
    pub discarded_labels: Vec<String>,
}

/// Run the validation pipeline over a provider's score map.
///
/// Accepts either the bare map or an object wrapping it under `"emotions"`.
pub fn validate_scores(value: &serde_json::Value) -> Result<EmotionAnalysis, EmotionError> {
    let obj = value.as_object().ok_or(EmotionError::NotAnObject)?;
    let obj = match obj.get("emotions") {
        Some(serde_json::Value::Object(inner)) => inner,
        _ => obj,
    };

    let mut raw: Vec<(usize, f64)> = Vec::new();
    let mut discarded_labels = Vec::new();

    for (key, v) in obj {
        let label = key.trim().to_lowercase();
        let Some(index) = KNOWN_EMOTIONS.iter().position(|known| *known == label) else {
            discarded_labels.push(key.clone());
            continue;
        };

        let score = v.as_f64().ok_or_else(|| EmotionError::InvalidScore {
            label: label.clone(),
            reason: "is not a number".to_string(),
        })?;
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(EmotionError::InvalidScore {
                label,
                reason: format!("{score} is outside [0, 1]"),
            });
        }
        if raw.iter().any(|(i, _)| *i == index) {
            return Err(EmotionError::DuplicateLabel(label));
        }
        raw.push((index, score));
    }

    if raw.is_empty() {
        return Err(EmotionError::NoKnownEmotions);
    }

    let total: f64 = raw.iter().map(|(_, s)| s).sum();
    if total <= 0.0 {
        return Err(EmotionError::ZeroTotal);
    }

    raw.sort_by_key(|(i, _)| *i);
    let scores: Vec<EmotionScore> = raw
        .iter()
        .map(|(i, s)| EmotionScore {
            label: KNOWN_EMOTIONS[*i],
            score: s / total,
        })
        .collect();

    // Sorted by label order, so a strict comparison keeps the earliest on ties.
    let mut dominant = &scores[0];
    for candidate in &scores[1..] {
        if candidate.score > dominant.score {
            dominant = candidate;
        }
    }

    discarded_labels.sort();

    Ok(EmotionAnalysis {
        dominant_emotion: dominant.label,
        confidence: dominant.score,
        scores,
        discarded_labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalizes_and_picks_dominant() {
        let analysis = validate_scores(&json!({"joy": 0.6, "sadness": 0.2})).unwrap();
        assert_eq!(analysis.dominant_emotion, "joy");
        assert!(approx(analysis.confidence, 0.75));
        let total: f64 = analysis.scores.iter().map(|s| s.score).sum();
        assert!(approx(total, 1.0));
    }

    #[test]
    fn labels_are_case_insensitive_and_unknowns_dropped() {
        let analysis =
            validate_scores(&json!({"Fear": 0.4, " ANGER ": 0.4, "boredom": 0.9})).unwrap();
        assert_eq!(analysis.scores.len(), 2);
        assert_eq!(analysis.discarded_labels, vec!["boredom".to_string()]);
    }

    #[test]
    fn ties_resolve_in_label_order() {
        let analysis = validate_scores(&json!({"fear": 0.5, "anger": 0.5})).unwrap();
        assert_eq!(analysis.dominant_emotion, "anger");
        assert!(approx(analysis.confidence, 0.5));
    }

    #[test]
    fn accepts_wrapped_object() {
        let analysis = validate_scores(&json!({"emotions": {"neutral": 1.0}})).unwrap();
        assert_eq!(analysis.dominant_emotion, "neutral");
        assert!(approx(analysis.confidence, 1.0));
    }

    #[test]
    fn rejects_out_of_range_scores() {
        assert_matches!(
            validate_scores(&json!({"joy": 1.2})),
            Err(EmotionError::InvalidScore { label, .. }) if label == "joy"
        );
        assert_matches!(
            validate_scores(&json!({"joy": -0.1})),
            Err(EmotionError::InvalidScore { .. })
        );
    }

    #[test]
    fn rejects_non_numeric_scores() {
        assert_matches!(
            validate_scores(&json!({"trust": "high"})),
            Err(EmotionError::InvalidScore { .. })
        );
    }

    #[test]
    fn rejects_duplicate_labels_after_folding() {
        assert_matches!(
            validate_scores(&json!({"joy": 0.2, "JOY": 0.3})),
            Err(EmotionError::DuplicateLabel(l)) if l == "joy"
        );
    }

    #[test]
    fn requires_a_known_nonzero_score() {
        assert_matches!(
            validate_scores(&json!({"boredom": 0.5})),
            Err(EmotionError::NoKnownEmotions)
        );
        assert_matches!(
            validate_scores(&json!({"joy": 0.0, "fear": 0.0})),
            Err(EmotionError::ZeroTotal)
        );
        assert_matches!(validate_scores(&json!([1, 2])), Err(EmotionError::NotAnObject));
    }

    #[test]
    fn scores_are_reported_in_label_order() {
        let analysis =
            validate_scores(&json!({"neutral": 0.1, "joy": 0.1, "surprise": 0.1})).unwrap();
        let labels: Vec<_> = analysis.scores.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["joy", "surprise", "neutral"]);
    }
}
