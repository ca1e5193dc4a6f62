//! The production, HTTP-backed [`StateClient`].
//!
//! Modeled on the gateway-client shape used elsewhere in this codebase for talking to a
//! shared backend service: a base URL, a shared [`reqwest::Client`], an API key header,
//! and a namespace prefix scoping every key to the calling workflow/run so that concurrent
//! runs against the same backend never collide.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use workflow_engine::{StateClient, StateError};

const API_KEY_HEADER: &str = "x-api-key";

/// A [`StateClient`] backed by a shared key/value HTTP service.
///
/// Keys are namespaced as `<namespace>/<key>` so that two runs of the same (or different)
/// workflows never observe each other's state.
#[derive(Debug, Clone)]
pub struct DurableStateClient {
    base_url: String,
    api_key: String,
    namespace: String,
    http: reqwest::Client,
}

impl DurableStateClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            namespace: namespace.into(),
            http: reqwest::Client::new(),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    fn state_url(&self, key: &str) -> String {
        format!("{}/state/{}", self.base_url.trim_end_matches('/'), self.namespaced(key))
    }
}

#[derive(Debug, Deserialize)]
struct GetStateResponse {
    value: Option<Value>,
}

#[derive(Debug, Serialize)]
struct SetStateRequest<'a> {
    value: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GetAllStateResponse {
    values: HashMap<String, Value>,
}

#[async_trait]
impl StateClient for DurableStateClient {
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StateError> {
        debug!(%key, "fetching state key");
        let response = self
            .http
            .get(self.state_url(key))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| StateError::Backend(err.into()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StateError::Backend(anyhow::anyhow!("state backend returned {}", response.status())));
        }

        let body: GetStateResponse = response.json().await.map_err(|_| StateError::Malformed(key.to_string()))?;
        Ok(body.value)
    }

    async fn set_state(&self, key: &str, value: Value) -> Result<(), StateError> {
        debug!(%key, "writing state key");
        let response = self
            .http
            .put(self.state_url(key))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&SetStateRequest { value: &value })
            .send()
            .await
            .map_err(|err| StateError::Backend(err.into()))?;

        if !response.status().is_success() {
            return Err(StateError::Backend(anyhow::anyhow!("state backend returned {}", response.status())));
        }
        Ok(())
    }

    async fn get_all_state(&self) -> Result<HashMap<String, Value>, StateError> {
        let url = format!("{}/state/{}", self.base_url.trim_end_matches('/'), self.namespace);
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| StateError::Backend(err.into()))?;

        if !response.status().is_success() {
            return Err(StateError::Backend(anyhow::anyhow!("state backend returned {}", response.status())));
        }

        let body: GetAllStateResponse = response.json().await.map_err(|_| StateError::Malformed(self.namespace.clone()))?;
        Ok(body.values)
    }
}
