//! REST implementation of [`TaskGateway`] over `reqwest`.
//!
//! Bodies go through [`taskboard_proto::codec`], so status and priority
//! are normalized (or rejected) before a task ever reaches the caller.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use taskboard_proto::codec;
use taskboard_proto::task::{Task, TaskId};
use taskboard_proto::wire::TaskPatch;
use url::Url;

use super::{GatewayError, TaskGateway, TaskScope};
use crate::tasks::Columns;

/// Gateway that talks to the task REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpGateway {
    /// Creates a gateway rooted at `base_url` (e.g. `http://localhost:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BaseUrl`] if the URL does not parse or cannot
    /// carry path segments, or [`GatewayError::Request`] if the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base = Url::parse(base_url).map_err(|e| GatewayError::BaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::BaseUrl(format!("{base_url} cannot be a base")));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            token: None,
        })
    }

    /// Attaches a bearer credential to every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, scope: &TaskScope, id: Option<&TaskId>) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| GatewayError::BaseUrl(self.base.to_string()))?;
            segments.pop_if_empty();
            segments.extend(scope.collection_segments());
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn with_body(builder: RequestBuilder, patch: &TaskPatch) -> Result<RequestBuilder, GatewayError> {
        let body = codec::encode_patch(patch)?;
        Ok(builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body))
    }

    /// Sends a request and returns the body of a success response.
    async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "api response");
        if status.is_success() {
            return Ok(response.bytes().await?.to_vec());
        }
        Err(status_error(response).await)
    }
}

/// Builds a [`GatewayError::Status`], preferring a JSON `message` field over
/// the raw body.
async fn status_error(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    GatewayError::Status { status, message }
}

impl TaskGateway for HttpGateway {
    async fn fetch_all(&self, scope: &TaskScope) -> Result<Columns, GatewayError> {
        let mut url = self.endpoint(scope, None)?;
        if let Some((key, value)) = scope.list_query() {
            url.query_pairs_mut().append_pair(key, value);
        }
        tracing::debug!(%scope, %url, "fetching tasks");
        let body = self.send(self.request(Method::GET, url)).await?;
        let tasks = codec::decode_tasks(&body, scope.team())?;
        Ok(Columns::from_tasks(tasks))
    }

    async fn create(&self, scope: &TaskScope, patch: &TaskPatch) -> Result<Task, GatewayError> {
        let url = self.endpoint(scope, None)?;
        tracing::debug!(%scope, %url, "creating task");
        let builder = Self::with_body(self.request(Method::POST, url), patch)?;
        let body = self.send(builder).await?;
        Ok(codec::decode_task(&body, scope.team())?)
    }

    async fn update(
        &self,
        scope: &TaskScope,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(scope, Some(id))?;
        tracing::debug!(%scope, %url, "updating task");
        let builder = Self::with_body(self.request(Method::PUT, url), patch)?;
        self.send(builder).await?;
        Ok(())
    }

    async fn remove(&self, scope: &TaskScope, id: &TaskId) -> Result<(), GatewayError> {
        let url = self.endpoint(scope, Some(id))?;
        tracing::debug!(%scope, %url, "deleting task");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
