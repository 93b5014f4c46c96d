//! Website upload client.
//!
//! Snapshots are sent as a multipart `file` part to
//! `{base}/api/data/upload/{data_type}`, authenticated with the `x-api-key` header.
//! Anything but HTTP 200 is reported as a sink failure so the runner can retry.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-api-key";
const HOSTNAME_HEADER: &str = "x-client-hostname";

/// HTTP client for the website's data endpoints
#[derive(Clone, Debug)]
pub struct UploadClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    client_hostname: String,
}

impl UploadClient {
    /// Client for `base_url` with a per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client_hostname: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client_hostname: client_hostname.into(),
        })
    }

    /// Client from the configured website URL, upload key, hostname and timeout
    ///
    /// Fails with a configuration error when the URL or key is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, key) = config.upload_target()?;
        Self::new(url, key, config.client_hostname.clone(), config.request_timeout)
    }

    /// Website base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload endpoint for a data type
    pub fn upload_endpoint(&self, data_type: &str) -> String {
        format!("{}/api/data/upload/{data_type}", self.base_url)
    }

    /// Ask `GET {base}/api/data/health` whether the website is up
    ///
    /// Never fails: the outcome is logged and returned as a flag.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/data/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(url = %url, status = %response.status(), "health check ok");
                true
            }
            Ok(response) => {
                tracing::warn!(url = %url, status = %response.status(), "health check failed");
                false
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "health check failed");
                false
            }
        }
    }

    /// Upload a snapshot file from disk under its own file name
    pub async fn upload_file(&self, path: &Path, data_type: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("no file name in {}", path.display())))?
            .to_string();
        let body = tokio::fs::read(path).await?;
        self.upload_bytes(&file_name, body, data_type).await
    }

    /// Upload an in-memory JSON document as `file_name`
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        body: Vec<u8>,
        data_type: &str,
    ) -> Result<()> {
        let endpoint = self.upload_endpoint(data_type);
        self.health_check().await;

        let part = Part::bytes(body)
            .file_name(file_name.to_string())
            .mime_str("application/json")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .header(HOSTNAME_HEADER, &self.client_hostname)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::sink_unavailable(&endpoint, format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::OK {
            tracing::info!(file = %file_name, endpoint = %endpoint, "uploaded snapshot");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            file = %file_name,
            endpoint = %endpoint,
            status = status.as_u16(),
            "upload rejected"
        );
        Err(Error::SinkUnavailable {
            endpoint,
            message: format!("upload of {file_name} returned {status}: {body}"),
            status_code: Some(status.as_u16()),
        })
    }
}
