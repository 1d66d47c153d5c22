use axum::http::{header, Method, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::extractors::SHARER_HEADER;
use crate::ids::UserId;

/// Forwards already-validated requests to the core server and relays its
/// answer unchanged.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    upstream: String,
}

impl GatewayClient {
    pub fn new(upstream: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let upstream = upstream.into().trim_end_matches('/').to_string();
        Ok(Self { http, upstream })
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub async fn forward(
        &self,
        method: Method,
        target: &Uri,
        sharer: Option<UserId>,
    ) -> AppResult<Response> {
        self.send(self.request(method, target, sharer)).await
    }

    pub async fn forward_json<B: Serialize>(
        &self,
        method: Method,
        target: &Uri,
        sharer: Option<UserId>,
        body: &B,
    ) -> AppResult<Response> {
        self.send(self.request(method, target, sharer).json(body))
            .await
    }

    fn request(
        &self,
        method: Method,
        target: &Uri,
        sharer: Option<UserId>,
    ) -> reqwest::RequestBuilder {
        let path = target
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| target.path());
        let builder = self
            .http
            .request(method, format!("{}{}", self.upstream, path));

        match sharer {
            Some(user) => builder.header(SHARER_HEADER, user.to_string()),
            None => builder,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<Response> {
        let upstream = request.send().await.map_err(|e| {
            tracing::error!("Upstream {} unreachable: {}", self.upstream, e);
            AppError::Internal(format!("Upstream request failed: {}", e))
        })?;

        let status = upstream.status();
        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
        let body = upstream.bytes().await.map_err(|e| {
            tracing::error!("Failed to read upstream response: {}", e);
            AppError::Internal(format!("Upstream response unreadable: {}", e))
        })?;

        let mut response = (status, body).into_response();
        if let Some(value) = content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        Ok(response)
    }
}
