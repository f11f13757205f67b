//! Validation by polling the telemetry backend.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::RecipeValidator;
use crate::execution::template::render;
use crate::types::{Recipe, RecipeVars};

/// Backend query returning how many telemetry records match.
#[async_trait]
pub trait TelemetryQuery: Send + Sync {
    async fn count(&self, query: &str) -> anyhow::Result<u64>;
}

/// Polls a [`TelemetryQuery`] until it returns data, the timeout elapses or
/// the run is canceled.
pub struct PollingValidator {
    query: Box<dyn TelemetryQuery>,
    timeout: Duration,
    interval: Duration,
    cancel: CancellationToken,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for PollingValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingValidator")
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl PollingValidator {
    pub fn new(query: Box<dyn TelemetryQuery>, cancel: CancellationToken) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create validation runtime")?;

        Ok(Self {
            query,
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(5),
            cancel,
            runtime,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn poll(&self, recipe: &str, query: &str) -> anyhow::Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => anyhow::bail!("validation canceled"),
                result = tokio::time::timeout_at(deadline, self.query.count(query)) => result,
            };

            match result {
                Ok(Ok(count)) if count > 0 => {
                    tracing::debug!(recipe = %recipe, attempt, count, "telemetry found");
                    return Ok(());
                }
                Ok(Ok(_)) => tracing::debug!(recipe = %recipe, attempt, "no telemetry yet"),
                Ok(Err(e)) => tracing::warn!(
                    recipe = %recipe,
                    attempt,
                    error = %format!("{:#}", e),
                    "validation query failed"
                ),
                Err(_) => break,
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => anyhow::bail!("validation canceled"),
                _ = tokio::time::sleep_until((now + self.interval).min(deadline)) => {}
            }
        }

        anyhow::bail!(
            "no telemetry received within {}s ({} attempts)",
            self.timeout.as_secs(),
            attempt
        )
    }
}

impl RecipeValidator for PollingValidator {
    fn validate(&self, recipe: &Recipe, vars: &RecipeVars) -> anyhow::Result<()> {
        let query = render(&recipe.validation_query, vars);
        if query.trim().is_empty() {
            return Ok(());
        }

        tracing::info!(recipe = %recipe.name, "waiting for telemetry");
        self.runtime.block_on(self.poll(&recipe.name, &query))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<u64>,
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    count: u64,
}

/// [`TelemetryQuery`] over HTTP: posts `{accountId, query}` and reads `count`.
pub struct HttpTelemetryClient {
    endpoint: Url,
    api_key: String,
    account_id: Option<u64>,
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpTelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTelemetryClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl HttpTelemetryClient {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        account_id: Option<u64>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid validation endpoint: {}", endpoint))?;
        let http = reqwest::Client::builder()
            .user_agent(crate::recipes::user_agent())
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            account_id,
            http,
        })
    }
}

#[async_trait]
impl TelemetryQuery for HttpTelemetryClient {
    async fn count(&self, query: &str) -> anyhow::Result<u64> {
        let mut request = self.http.post(self.endpoint.clone()).json(&QueryRequest {
            account_id: self.account_id,
            query,
        });
        if !self.api_key.is_empty() {
            request = request.header("Api-Key", &self.api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach telemetry endpoint {}", self.endpoint))?;
        if !response.status().is_success() {
            anyhow::bail!("Telemetry query failed: HTTP {}", response.status());
        }

        let body: QueryResponse = response
            .json()
            .await
            .context("Failed to parse telemetry query response")?;
        Ok(body.count)
    }
}
