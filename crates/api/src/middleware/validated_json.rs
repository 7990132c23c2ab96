//! JSON body extractor that runs `validator` rules.

use axum::extract::{FromRequest, Request};
use axum::Json;
use empathy_core::validation::into_core_error;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// A JSON body of type `T` that has passed `T::validate()`.
///
/// Unreadable JSON (wrong content type, syntax error, wrong shape) is
/// rejected as `INVALID_BODY`; rule violations as `VALIDATION_ERROR` with the
/// failing fields listed in name order.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidBody(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Core(into_core_error(&errors)))?;
        Ok(ValidatedJson(value))
    }
}
