//! Bias score aggregation for therapeutic session analysis.
//!
//! The per-layer scores come from an external scorer. This module owns the
//! deterministic part: weighting the layers into an overall score, mapping
//! that score to an alert level, and producing review recommendations.

use serde::{Deserialize, Serialize};

use crate::hashing;

/// Analysis layers, in reporting order.
pub const LAYERS: [&str; 4] = ["preprocessing", "model_level", "interactive", "evaluation"];

/// Per-layer bias scores in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerScores {
    pub preprocessing: f64,
    pub model_level: f64,
    pub interactive: f64,
    pub evaluation: f64,
}

impl LayerScores {
    fn get(&self, layer: &str) -> f64 {
        match layer {
            "preprocessing" => self.preprocessing,
            "model_level" => self.model_level,
            "interactive" => self.interactive,
            "evaluation" => self.evaluation,
            _ => 0.0,
        }
    }
}

/// Relative weight of each layer in the overall score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerWeights {
    pub preprocessing: f64,
    pub model_level: f64,
    pub interactive: f64,
    pub evaluation: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            preprocessing: 0.2,
            model_level: 0.3,
            interactive: 0.2,
            evaluation: 0.3,
        }
    }
}

/// Alert level derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Thresholds and weights for bias scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasConfig {
    pub warning_threshold: f64,
    pub high_threshold: f64,
    pub critical_threshold: f64,
    pub weights: LayerWeights,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 0.3,
            high_threshold: 0.6,
            critical_threshold: 0.8,
            weights: LayerWeights::default(),
        }
    }
}

/// Full result of a bias analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasReport {
    pub overall_score: f64,
    pub alert_level: AlertLevel,
    pub layer_scores: LayerScores,
    pub recommendations: Vec<String>,
}

impl BiasConfig {
    /// Weighted sum of the layer scores, clamped to `[0, 1]`.
    pub fn overall_score(&self, scores: &LayerScores) -> f64 {
        let w = &self.weights;
        let total = scores.preprocessing * w.preprocessing
            + scores.model_level * w.model_level
            + scores.interactive * w.interactive
            + scores.evaluation * w.evaluation;
        total.clamp(0.0, 1.0)
    }

    pub fn alert_level(&self, score: f64) -> AlertLevel {
        if score >= self.critical_threshold {
            AlertLevel::Critical
        } else if score >= self.high_threshold {
            AlertLevel::High
        } else if score >= self.warning_threshold {
            AlertLevel::Medium
        } else {
            AlertLevel::Low
        }
    }

    /// Score, classify and recommend.
    pub fn analyze(&self, scores: LayerScores) -> BiasReport {
        let overall_score = self.overall_score(&scores);
        let alert_level = self.alert_level(overall_score);

        let mut recommendations: Vec<String> = LAYERS
            .iter()
            .filter(|layer| scores.get(layer) >= self.warning_threshold)
            .map(|layer| layer_recommendation(layer).to_string())
            .collect();

        if alert_level == AlertLevel::Critical {
            recommendations.insert(
                0,
                "Pause use of this session in training data until a clinician reviews it"
                    .to_string(),
            );
        }

        BiasReport {
            overall_score,
            alert_level,
            layer_scores: scores,
            recommendations,
        }
    }
}

fn layer_recommendation(layer: &str) -> &'static str {
    match layer {
        "preprocessing" => "Review demographic representation and biased terminology in the session content",
        "model_level" => "Check model outcomes for disparities across demographic groups",
        "interactive" => "Compare responses against counterfactual scenarios with altered demographics",
        "evaluation" => "Re-evaluate response quality metrics per demographic group",
        _ => "Review session for potential bias",
    }
}

/// Parse layer scores from the scorer's JSON object.
///
/// Missing layers count as `0.0`. Present layers must be numbers in `[0, 1]`.
pub fn parse_layer_scores(value: &serde_json::Value) -> Result<LayerScores, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "bias scores must be a JSON object".to_string())?;

    let read = |layer: &str| -> Result<f64, String> {
        match obj.get(layer) {
            None | Some(serde_json::Value::Null) => Ok(0.0),
            Some(v) => {
                let score = v
                    .as_f64()
                    .ok_or_else(|| format!("{layer} score must be a number"))?;
                if !(0.0..=1.0).contains(&score) {
                    return Err(format!("{layer} score {score} is outside [0, 1]"));
                }
                Ok(score)
            }
        }
    };

    Ok(LayerScores {
        preprocessing: read("preprocessing")?,
        model_level: read("model_level")?,
        interactive: read("interactive")?,
        evaluation: read("evaluation")?,
    })
}

/// Session identifiers are stored in audit entries only as a SHA-256 digest.
pub fn pseudonymize_session_id(session_id: &str) -> String {
    hashing::sha256_hex(session_id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn overall_score_is_weighted_sum() {
        let config = BiasConfig::default();
        let scores = LayerScores {
            preprocessing: 0.5,
            model_level: 0.4,
            interactive: 0.0,
            evaluation: 1.0,
        };
        // 0.5*0.2 + 0.4*0.3 + 0 + 1.0*0.3 = 0.52
        assert!(approx(config.overall_score(&scores), 0.52));
    }

    #[test]
    fn overall_score_is_clamped() {
        let config = BiasConfig {
            weights: LayerWeights {
                preprocessing: 1.0,
                model_level: 1.0,
                interactive: 1.0,
                evaluation: 1.0,
            },
            ..BiasConfig::default()
        };
        let scores = LayerScores {
            preprocessing: 1.0,
            model_level: 1.0,
            interactive: 1.0,
            evaluation: 1.0,
        };
        assert!(approx(config.overall_score(&scores), 1.0));
    }

    #[test]
    fn alert_level_boundaries() {
        let config = BiasConfig::default();
        assert_eq!(config.alert_level(0.0), AlertLevel::Low);
        assert_eq!(config.alert_level(0.29), AlertLevel::Low);
        assert_eq!(config.alert_level(0.3), AlertLevel::Medium);
        assert_eq!(config.alert_level(0.6), AlertLevel::High);
        assert_eq!(config.alert_level(0.8), AlertLevel::Critical);
        assert_eq!(config.alert_level(1.0), AlertLevel::Critical);
    }

    #[test]
    fn analyze_recommends_for_flagged_layers() {
        let report = BiasConfig::default().analyze(LayerScores {
            preprocessing: 0.1,
            model_level: 0.7,
            interactive: 0.0,
            evaluation: 0.3,
        });
        assert_eq!(report.alert_level, AlertLevel::Medium);
        assert_eq!(report.recommendations.len(), 2);
        assert!(report.recommendations[0].contains("disparities"));
    }

    #[test]
    fn critical_report_leads_with_pause_recommendation() {
        let report = BiasConfig::default().analyze(LayerScores {
            preprocessing: 1.0,
            model_level: 1.0,
            interactive: 1.0,
            evaluation: 1.0,
        });
        assert_eq!(report.alert_level, AlertLevel::Critical);
        assert!(report.recommendations[0].starts_with("Pause"));
        assert_eq!(report.recommendations.len(), 5);
    }

    #[test]
    fn parse_fills_missing_layers_with_zero() {
        let scores = parse_layer_scores(&serde_json::json!({"model_level": 0.4})).unwrap();
        assert_eq!(scores.model_level, 0.4);
        assert_eq!(scores.preprocessing, 0.0);
        assert_eq!(scores.evaluation, 0.0);
    }

    #[test]
    fn parse_rejects_out_of_range_and_non_numeric() {
        assert!(parse_layer_scores(&serde_json::json!({"interactive": 1.5})).is_err());
        assert!(parse_layer_scores(&serde_json::json!({"evaluation": "high"})).is_err());
        assert!(parse_layer_scores(&serde_json::json!([0.1])).is_err());
    }

    #[test]
    fn alert_level_serializes_lowercase() {
        let json = serde_json::to_value(AlertLevel::Critical).unwrap();
        assert_eq!(json, "critical");
    }

    #[test]
    fn pseudonymized_id_is_stable_digest() {
        let a = pseudonymize_session_id("session-1");
        assert_eq!(a, pseudonymize_session_id("session-1"));
        assert_ne!(a, "session-1");
        assert_eq!(a.len(), 64);
    }
}
