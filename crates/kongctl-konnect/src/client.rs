//! HTTP client for the Konnect control-plane API
//!
//! A thin typed layer over `reqwest`: bearer auth, JSON bodies, and the two
//! pagination contracts. Calls are serial; every request races the ambient
//! cancellation token. Rate-limit (429) and server (5xx) statuses surface
//! unchanged - retrying is the caller's decision, never the client's.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use kongctl_core::{StoreError, StoreResult};

use crate::dto::{CursorEnvelope, ListEnvelope};

/// Default production region endpoint.
pub const DEFAULT_BASE_URL: &str = "https://us.api.konghq.com";

/// Default page size for list calls.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct KonnectConfig {
    pub base_url: String,
    pub token: String,
    pub page_size: u32,
}

impl KonnectConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Operation context attached to every error.
#[derive(Debug, Clone)]
pub(crate) struct OpCtx {
    pub operation: &'static str,
    pub resource: String,
}

impl OpCtx {
    pub fn new(operation: &'static str, resource: impl Into<String>) -> Self {
        Self {
            operation,
            resource: resource.into(),
        }
    }
}

pub struct KonnectClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    page_size: u32,
    cancel: CancellationToken,
}

impl std::fmt::Debug for KonnectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token stays out of debug output.
        f.debug_struct("KonnectClient")
            .field("base", &self.base.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl KonnectClient {
    pub fn new(config: KonnectConfig, cancel: CancellationToken) -> Result<Self, ConfigError> {
        let mut base_url = config.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("kongctl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            token: config.token,
            page_size: config.page_size,
            cancel,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base.join(path).expect("relative API path")
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&JsonValue>,
        ctx: &OpCtx,
    ) -> StoreResult<Option<T>> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        tracing::debug!(%method, url = %url, operation = ctx.operation, "konnect request");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StoreError::Cancelled),
            response = request.send() => response.map_err(|e| self.transport(ctx, e))?,
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .and_then(|text| extract_message(&text))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                operation: ctx.operation.to_string(),
                resource: ctx.resource.clone(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let parsed = response
            .json::<T>()
            .await
            .map_err(|e| StoreError::ResponseValidation {
                operation: ctx.operation.to_string(),
                resource: ctx.resource.clone(),
                message: e.to_string(),
            })?;
        Ok(Some(parsed))
    }

    /// Request whose response must carry a payload.
    pub(crate) async fn request_payload<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&JsonValue>,
        ctx: &OpCtx,
    ) -> StoreResult<T> {
        self.request(method, url, body, ctx)
            .await?
            .ok_or_else(|| StoreError::ResponseValidation {
                operation: ctx.operation.to_string(),
                resource: ctx.resource.clone(),
                message: "response carried no payload".to_string(),
            })
    }

    fn transport(&self, ctx: &OpCtx, error: reqwest::Error) -> StoreError {
        StoreError::Transport {
            operation: ctx.operation.to_string(),
            resource: ctx.resource.clone(),
            source: Box::new(error),
        }
    }

    /// Page-number pagination: request pages of a fixed size until a page
    /// comes back empty or the cumulative count reaches `meta.page.total`.
    pub(crate) async fn list_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: &OpCtx,
    ) -> StoreResult<Vec<T>> {
        let mut out: Vec<T> = Vec::new();
        let mut number = 1u32;
        loop {
            let mut url = self.endpoint(path);
            url.query_pairs_mut()
                .append_pair("page[size]", &self.page_size.to_string())
                .append_pair("page[number]", &number.to_string());

            let page: ListEnvelope<T> = self
                .request_payload(Method::GET, url, None, ctx)
                .await?;
            let fetched = page.data.len();
            out.extend(page.data);

            let total = page.meta.page.as_ref().map(|p| p.total).unwrap_or(0);
            if fetched == 0 || out.len() as u64 >= total {
                return Ok(out);
            }
            number += 1;
        }
    }

    /// Cursor pagination: follow `meta.next` until it is absent.
    pub(crate) async fn list_cursor<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: &OpCtx,
    ) -> StoreResult<Vec<T>> {
        let mut out: Vec<T> = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut url = self.endpoint(path);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("page[size]", &self.page_size.to_string());
                if let Some(after) = &after {
                    query.append_pair("page[after]", after);
                }
            }

            let page: CursorEnvelope<T> = self
                .request_payload(Method::GET, url, None, ctx)
                .await?;
            out.extend(page.data);

            match page.meta.next {
                Some(next) if !next.is_empty() => after = Some(next),
                _ => return Ok(out),
            }
        }
    }

    pub(crate) async fn create_object<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &JsonMap<String, JsonValue>,
        ctx: &OpCtx,
    ) -> StoreResult<T> {
        self.request_payload(
            Method::POST,
            self.endpoint(path),
            Some(&JsonValue::Object(body.clone())),
            ctx,
        )
        .await
    }

    pub(crate) async fn put_object<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &JsonMap<String, JsonValue>,
        ctx: &OpCtx,
    ) -> StoreResult<T> {
        self.request_payload(
            Method::PUT,
            self.endpoint(path),
            Some(&JsonValue::Object(body.clone())),
            ctx,
        )
        .await
    }

    pub(crate) async fn patch_object<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &JsonMap<String, JsonValue>,
        ctx: &OpCtx,
    ) -> StoreResult<T> {
        self.request_payload(
            Method::PATCH,
            self.endpoint(path),
            Some(&JsonValue::Object(body.clone())),
            ctx,
        )
        .await
    }

    pub(crate) async fn delete_object(
        &self,
        path: &str,
        force: bool,
        ctx: &OpCtx,
    ) -> StoreResult<()> {
        let mut url = self.endpoint(path);
        if force {
            url.query_pairs_mut().append_pair("force", "true");
        }
        self.request::<serde_json::Value>(Method::DELETE, url, None, ctx)
            .await?;
        Ok(())
    }
}

/// Pull a human message out of an error body, tolerating non-JSON payloads.
fn extract_message(text: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<JsonValue>(text)
        && let Some(message) = value.get("message").and_then(JsonValue::as_str)
    {
        return Some(message.to_string());
    }
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
