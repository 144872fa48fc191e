//! Authenticated request surface.
//!
//! Every outbound call is decorated with the standard headers and the
//! current bearer token. A 401 response triggers one coordinated token
//! refresh and at most one replay of the original request; every other
//! failure passes through untouched.

use std::sync::Arc;

use anyhow::Context;
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::SessionStore;

use super::ApiError;

/// Authenticated API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    session: Arc<SessionStore>,
    forwarded_cookie: Option<header::HeaderValue>,
}

impl ApiClient {
    /// Create a client over an existing session store, sharing its
    /// connection pool and refresh coordinator.
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            client: session.http_client(),
            session,
            forwarded_cookie: None,
        }
    }

    /// Scope this client to a server-rendered request: the inbound
    /// request's session cookie is forwarded verbatim on every upstream
    /// call, so server-issued requests carry the same identity as the
    /// originating browser request.
    pub fn with_forwarded_cookie(&self, cookie: &str) -> Result<Self, ApiError> {
        let value = header::HeaderValue::from_str(cookie)
            .context("Invalid forwarded cookie header")?;
        Ok(Self {
            forwarded_cookie: Some(value),
            ..self.clone()
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Issue an authenticated request and decode the JSON response.
    ///
    /// On a 401 with a refresh token available, one coordinated refresh
    /// runs and the request is replayed once with the new token. A 401
    /// on the replay surfaces as [`ApiError::Unauthorized`] without a
    /// further refresh. A failed refresh surfaces as
    /// [`ApiError::SessionExpired`] with the session already cleared.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method.clone(), path, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::decode(response).await;
        }

        if self.session.refresh_token().await.is_none() {
            return Err(ApiError::Unauthorized);
        }

        debug!(path, "Request returned 401; attempting coordinated refresh");
        if self.session.coordinate_refresh().await.is_err() {
            return Err(ApiError::SessionExpired);
        }

        let retried = self.send(method, path, body).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        Self::decode(retried).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.session.config().api_url, path);
        let mut request = self
            .client
            .request(method, &url)
            .headers(self.request_headers().await?);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Accept, referer, bearer token when present, forwarded cookie
    /// when scoped to a server-rendered request.
    async fn request_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_str(&self.session.config().app_url)
                .context("Invalid app URL for referer header")?,
        );
        if let Some(token) = self.session.access_token().await {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Invalid bearer token for authorization header")?,
            );
        }
        if let Some(cookie) = &self.forwarded_cookie {
            headers.insert(header::COOKIE, cookie.clone());
        }
        Ok(headers)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}
