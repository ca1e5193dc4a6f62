//! The production Tool Runner: an HTTP client against the tool gateway's wire contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use workflow_engine::{ToolError, ToolRunner};

const API_KEY_HEADER: &str = "x-api-key";

/// Invokes tools over HTTP: `POST <base>/tool/<toolIdentifier>/use`.
#[derive(Debug, Clone)]
pub struct RealToolRunner {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl RealToolRunner {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolRequest<'a> {
    input: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ToolResponse {
    output: Option<Value>,
}

#[async_trait]
impl ToolRunner for RealToolRunner {
    async fn execute(&self, tool_identifier: &str, input: &Value, _input_schema: &Value, _output_schema: &Value) -> Result<Value, ToolError> {
        let url = format!("{}/tool/{}/use", self.base_url.trim_end_matches('/'), tool_identifier);
        debug!(%tool_identifier, %url, "invoking tool");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&ToolRequest { input })
            .send()
            .await
            .map_err(|err| ToolError::Invocation(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ToolError::Invocation(format!("tool gateway returned {status}")));
        }

        let body: ToolResponse = response.json().await.map_err(|err| ToolError::Invocation(err.to_string()))?;

        match body.output {
            Some(Value::Null) | None => Err(ToolError::NoOutput),
            Some(output) => Ok(output),
        }
    }
}
