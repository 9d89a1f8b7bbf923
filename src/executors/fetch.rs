//! HTTP `fetch` executor.

use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::interpreter::Interpreter;
use crate::op::Op;
use crate::registry::OpRunner;
use crate::template::{resolve, resolve_value};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// `fetch`: one HTTP request.
///
/// Parameters: `url` (template), `method` (default GET), `headers` (object),
/// `body` (strings sent verbatim, anything else as JSON), `responseType`
/// (`json`, the default, or `text`). Non-2xx responses are errors. The
/// request is dropped as soon as the run's abort signal fires.
#[derive(Debug, Clone, Default)]
pub struct Fetch {
    client: reqwest::Client,
}

impl Fetch {
    /// Fetch executor with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, default headers, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request(&self, op: &Op, context: &Context, timeout: Duration) -> Result<RequestBuilder> {
        let url = resolve(op.require_str("url")?, context);
        let method = op
            .str_param("method")?
            .unwrap_or("GET")
            .to_ascii_uppercase()
            .parse::<Method>()
            .map_err(|e| WorkflowError::invalid(&op.kind, "method", e.to_string()))?;

        let mut request = self.client.request(method, &url).timeout(timeout);

        if let Some(headers) = op.param("headers") {
            let Value::Object(headers) = resolve_value(headers, context) else {
                return Err(WorkflowError::invalid(&op.kind, "headers", "expected an object"));
            };
            for (name, value) in headers {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                request = request.header(name, value);
            }
        }

        if let Some(body) = op.param("body") {
            request = match resolve_value(body, context) {
                Value::String(text) => request.body(text),
                other => request.json(&other),
            };
        }

        Ok(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseType {
    Json,
    Text,
}

impl ResponseType {
    fn from_op(op: &Op) -> Result<Self> {
        match op.str_param("responseType")? {
            None | Some("json") => Ok(Self::Json),
            Some("text") => Ok(Self::Text),
            Some(other) => Err(WorkflowError::invalid(
                &op.kind,
                "responseType",
                format!("expected 'json' or 'text', got '{other}'"),
            )),
        }
    }
}

#[async_trait]
impl OpRunner for Fetch {
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value> {
        let response_type = ResponseType::from_op(op)?;
        let timeout = Duration::from_millis(interpreter.config().fetch_timeout_ms);
        let request = self.request(op, context, timeout)?;

        tokio::select! {
            biased;
            _ = interpreter.cancellation().signal().cancelled() => Err(WorkflowError::Cancelled),
            result = send(request, response_type) => result,
        }
    }
}

async fn send(request: RequestBuilder, response_type: ResponseType) -> Result<Value> {
    let response = request.send().await?.error_for_status()?;
    tracing::debug!(status = %response.status(), url = %response.url(), "Fetch completed");

    match response_type {
        ResponseType::Json => Ok(response.json::<Value>().await?),
        ResponseType::Text => Ok(Value::String(response.text().await?)),
    }
}
