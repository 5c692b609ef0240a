use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;

use crate::error::{AppError, FieldError};

/// Json body extractor that surfaces malformed payloads (bad syntax, unknown
/// enum variants, missing fields) through the regular validation error shape
/// instead of axum's default 422.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::ValidationFailed(vec![FieldError::new(
                "body",
                rejection.body_text(),
            )])),
        }
    }
}
