//! Minimal HTTP client for the agent's endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::FetchError;
use crate::types::{AgentConfig, AgentConfigUpdate, Health, MetricsSnapshot, ProcessDetail};

pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:17820";

/// Anything that can hand out metrics snapshots. The poller only needs this.
#[async_trait]
pub trait MetricsSource: Send + Sync + 'static {
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError>;
}

/// Source of per-process details, fetched on selection.
#[async_trait]
pub trait DetailSource: Send + Sync + 'static {
    async fn fetch_process(&self, pid: u32) -> Result<ProcessDetail, FetchError>;
}

/// Accepts `host:port`, `http://host:port` or a full base URL with a path.
pub fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let mut url = Url::parse(&with_scheme)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::Url(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    // Endpoints are joined relative to the base; make sure the last path
    // segment is treated as a directory.
    if !url.path().ends_with('/') {
        let p = format!("{}/", url.path());
        url.set_path(&p);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base: Url,
}

impl AgentClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base = parse_base_url(base_url)?;

        // Always ask for fresh data; the agent sits behind nothing, but
        // proxies in between may not.
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        // Connect timeout only: a slow agent delays its own update, it does
        // not fail it.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        Ok(self.base.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.endpoint(path)?;
        trace!(%url, "GET");
        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "agent returned failure status");
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// `GET /metrics`
    pub async fn metrics(&self) -> Result<MetricsSnapshot, FetchError> {
        self.get_json("metrics").await
    }

    /// `GET /process/{pid}`
    pub async fn process(&self, pid: u32) -> Result<ProcessDetail, FetchError> {
        self.get_json(&format!("process/{pid}")).await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<Health, FetchError> {
        self.get_json("health").await
    }

    /// `POST /config`: adjust the agent's own collection interval / push URL.
    pub async fn configure(&self, update: &AgentConfigUpdate) -> Result<AgentConfig, FetchError> {
        let url = self.endpoint("config")?;
        debug!(%url, ?update, "POST");
        let resp = self.http.post(url).json(update).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetricsSource for AgentClient {
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError> {
        self.metrics().await
    }
}

#[async_trait]
impl DetailSource for AgentClient {
    async fn fetch_process(&self, pid: u32) -> Result<ProcessDetail, FetchError> {
        self.process(pid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_normalization() {
        assert_eq!(
            parse_base_url("127.0.0.1:17820").unwrap().as_str(),
            "http://127.0.0.1:17820/"
        );
        assert_eq!(
            parse_base_url("http://host:8000").unwrap().as_str(),
            "http://host:8000/"
        );
        assert_eq!(
            parse_base_url("https://host/agent?x=1").unwrap().as_str(),
            "https://host/agent/"
        );
        assert!(parse_base_url("ws://host/ws").is_err());
        assert!(parse_base_url("http://").is_err());
    }

    #[test]
    fn endpoints_join_onto_base() {
        let c = AgentClient::new("http://127.0.0.1:17820").unwrap();
        assert_eq!(
            c.endpoint("metrics").unwrap().as_str(),
            "http://127.0.0.1:17820/metrics"
        );
        let c = AgentClient::new("http://host/agent").unwrap();
        assert_eq!(
            c.endpoint("process/42").unwrap().as_str(),
            "http://host/agent/process/42"
        );
    }
}
