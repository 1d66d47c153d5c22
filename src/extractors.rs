use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::ids::UserId;

pub const SHARER_HEADER: &str = "X-Sharer-User-Id";

/// The acting user, taken from the `X-Sharer-User-Id` header.
/// Missing, malformed or non-positive values are rejected as invalid data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharerId(pub UserId);

impl<S> FromRequestParts<S> for SharerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SHARER_HEADER)
            .ok_or_else(|| AppError::InvalidData(format!("Header {} is required", SHARER_HEADER)))?
            .to_str()
            .map_err(|_| AppError::InvalidData(format!("Header {} is not text", SHARER_HEADER)))?;

        parse_sharer_id(raw).map(SharerId)
    }
}

fn parse_sharer_id(raw: &str) -> Result<UserId, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id >= 1 => Ok(UserId(id as u64)),
        _ => Err(AppError::InvalidData(format!(
            "Header {} must be a positive integer, got {}",
            SHARER_HEADER, raw
        ))),
    }
}

/// Numeric `{id}` path segment. Must fit a stored key: 1..=i64::MAX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub u64);

impl<S> FromRequestParts<S> for Id
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidData(rejection.body_text()))?;

        match raw.parse::<i64>() {
            Ok(id) if id >= 1 => Ok(Id(id as u64)),
            _ => Err(AppError::InvalidData(format!(
                "Path id must be a positive integer, got {}",
                raw
            ))),
        }
    }
}

/// Query string extractor that reports malformed input as invalid data.
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::try_from_uri(&parts.uri)
            .map_err(|rejection| AppError::InvalidData(rejection.body_text()))?;
        Ok(Params(value))
    }
}

/// JSON body extractor that reports malformed input as invalid data.
#[derive(Debug, Clone)]
pub struct Body<T>(pub T);

impl<T, S> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidData(rejection.body_text()))?;
        Ok(Body(value))
    }
}
