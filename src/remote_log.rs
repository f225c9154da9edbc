//! Best-effort shipping of log events to an external ingestion endpoint.
//!
//! Delivery happens on a spawned task. Invalid payloads and failed
//! deliveries are reported through `tracing` and otherwise ignored, so
//! callers never wait on or fail because of the remote collector.

use crate::config::Config;
use crate::error::{LinkError, LinkResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const STACK: &str = "backend";

const BACKEND_PACKAGES: &[&str] = &[
    "cache",
    "controller",
    "cron_job",
    "db",
    "domain",
    "handler",
    "repository",
    "route",
    "service",
];

const COMMON_PACKAGES: &[&str] = &["auth", "config", "middleware", "utils"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogPayload {
    pub stack: String,
    pub level: LogLevel,
    pub package: String,
    pub message: String,
}

impl LogPayload {
    pub fn new(level: LogLevel, package: &str, message: impl Into<String>) -> LinkResult<Self> {
        let package = package.to_lowercase();
        if !BACKEND_PACKAGES.contains(&package.as_str())
            && !COMMON_PACKAGES.contains(&package.as_str())
        {
            return Err(LinkError::Validation(format!(
                "Invalid package '{}' for stack '{}'",
                package, STACK
            )));
        }

        Ok(Self {
            stack: STACK.to_string(),
            level,
            package,
            message: message.into(),
        })
    }
}

struct Endpoint {
    client: reqwest::Client,
    url: String,
    token: String,
}

#[derive(Clone, Default)]
pub struct RemoteLogger {
    endpoint: Option<Arc<Endpoint>>,
}

impl RemoteLogger {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> LinkResult<Self> {
        let (Some(url), Some(token)) = (&config.log_api_url, &config.log_access_token) else {
            return Ok(Self::disabled());
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                LinkError::Configuration(format!("Failed to build remote log client: {}", e))
            })?;

        Ok(Self {
            endpoint: Some(Arc::new(Endpoint {
                client,
                url: url.clone(),
                token: token.clone(),
            })),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Queues a log event for delivery. Never blocks and never fails.
    pub fn log(&self, level: LogLevel, package: &str, message: impl Into<String>) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };

        let payload = match LogPayload::new(level, package, message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping remote log event");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(?payload, "No async runtime, remote log event kept local");
            return;
        };

        runtime.spawn(async move {
            endpoint.send(&payload).await;
        });
    }
}

impl Endpoint {
    async fn send(&self, payload: &LogPayload) {
        let result = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => tracing::debug!(package = %payload.package, "Remote log event delivered"),
            Err(e) => tracing::warn!(
                error = %e,
                ?payload,
                "Failed to deliver remote log event, kept local"
            ),
        }
    }
}
