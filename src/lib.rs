// src/lib.rs
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use thiserror::Error;

pub mod controller;
pub mod measurement;
pub mod page;

pub use crate::controller::{Diagnostics, FlagToggleController, LogDiagnostics, Outcome, Reload};
pub use crate::measurement::{ToggleResponse, FLAG_BUTTON_CLASS, ID_ATTRIBUTE};
pub use crate::page::{ClickEvent, Document, Element, Page};

const BASE_URL: &str = "http://localhost:5000";
const DEFAULT_USER_AGENT: &str = "measurement-flags";

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status}{}", detail(.message))]
    ApiError {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid measurement id: {0:?}")]
    InvalidId(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(" ({})", m),
        None => String::new(),
    }
}

/// Something that can flip the flag on a measurement.
#[async_trait]
pub trait FlagApi: Send + Sync {
    async fn toggle(&self, id: &str) -> Result<ToggleResponse, ToggleError>;
}

pub struct Client {
    base_url: Url,
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// URL of the toggle endpoint for `id`. The id is encoded as a single
    /// path segment; dot-only ids would be dropped as dot segments, so they
    /// are rejected.
    pub fn flag_url(&self, id: &str) -> Result<Url, ToggleError> {
        if id.is_empty() || id.chars().all(|c| c == '.') {
            return Err(ToggleError::InvalidId(id.to_string()));
        }

        let mut url = self.base_url.clone();
        // build() rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(measurement::flag_path(id));
        }
        Ok(url)
    }

    pub async fn toggle_flag(&self, id: &str) -> Result<ToggleResponse, ToggleError> {
        let url = self.flag_url(id)?;
        debug!("POST {}", url);

        let response = self.http_client.post(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .and_then(|body| serde_json::from_str::<ToggleResponse>(&body).ok())
                .and_then(|r| r.error);
            return Err(ToggleError::ApiError { status, message });
        }

        let toggle = response.json::<ToggleResponse>().await?;
        Ok(toggle)
    }
}

#[async_trait]
impl FlagApi for Client {
    async fn toggle(&self, id: &str) -> Result<ToggleResponse, ToggleError> {
        self.toggle_flag(id).await
    }
}

pub struct ClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Request timeout. Without one the transport default applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn build(self) -> Result<Client, ToggleError> {
        let base_url = Url::parse(&self.base_url).map_err(|e| {
            ToggleError::ConfigError(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ToggleError::ConfigError(format!(
                "base URL {} cannot carry a path",
                self.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| ToggleError::ConfigError(format!("invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut http_client = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            http_client = http_client.timeout(timeout);
        }
        let http_client = http_client
            .build()
            .map_err(|e| ToggleError::ConfigError(e.to_string()))?;

        Ok(Client {
            base_url,
            http_client,
            timeout: self.timeout,
        })
    }
}
