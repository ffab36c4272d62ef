use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ContentSource;
use crate::error::FetchError;

const USER_AGENT: &str = "related-news/0.1";

/// Content source speaking GraphQL over HTTP POST.
pub struct GraphqlSource {
    http: reqwest::Client,
    endpoint: String,
    request_timeout: Duration,
}

impl GraphqlSource {
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .context("building content API http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[async_trait]
impl ContentSource for GraphqlSource {
    async fn fetch_content(&self, query: &str, variables: &Value) -> Result<Value, FetchError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .map_err(|e| {
                warn!(target: "content", error = %e, endpoint = %self.endpoint, "content API request failed");
                FetchError::from_reqwest(e, self.request_timeout)
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        check_graphql_errors(body)
    }

    fn name(&self) -> &'static str {
        "graphql"
    }
}

/// GraphQL reports failures in-band. Partial data is kept; errors without
/// any data are a failed fetch.
pub fn check_graphql_errors(body: Value) -> Result<Value, FetchError> {
    let errors = body
        .get("errors")
        .and_then(Value::as_array)
        .filter(|e| !e.is_empty());
    let Some(errors) = errors else {
        return Ok(body);
    };

    let msg = errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .take(3)
        .collect::<Vec<_>>()
        .join("; ");

    let has_data = body.get("data").is_some_and(|d| !d.is_null());
    if has_data {
        debug!(target: "content", errors = %msg, "partial GraphQL response");
        Ok(body)
    } else {
        Err(FetchError::Api(msg))
    }
}
