//! Public feature-flag listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::FeatureFlags;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FeatureFlag {
    pub enabled: bool,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FeatureList {
    /// Display flag only; no data is processed homomorphically.
    pub fhe: FeatureFlag,
    pub bias_detection: FeatureFlag,
}

impl From<&FeatureFlags> for FeatureList {
    fn from(flags: &FeatureFlags) -> Self {
        Self {
            fhe: FeatureFlag {
                enabled: flags.fhe,
                label: "Homomorphic encryption",
            },
            bias_detection: FeatureFlag {
                enabled: flags.bias_detection,
                label: "Bias detection",
            },
        }
    }
}

/// GET /api/v1/features
pub async fn list_features(State(state): State<AppState>) -> Json<DataResponse<FeatureList>> {
    Json(DataResponse {
        data: FeatureList::from(&state.config.features),
    })
}
