//! Observation pipeline wired to a mock source and the real sinks

use super::fixtures::{MAP_OBS_DATA_TYPE, SOURCE_PATH};
use async_trait::async_trait;
use brc_pipeline::observation::{
    ObservationRow, ObservationSnapshot, Station, flatten_observations, validate_snapshot,
};
use brc_pipeline::{
    CanonicalRecord, Config, Error, JsonFileSink, Pipeline, RawPayload, Result, UploadClient,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Body served by the mock source
#[derive(Debug, Deserialize)]
pub struct SourcePayload {
    pub valid_time: DateTime<Utc>,
    pub stations: Vec<Station>,
    pub rows: Vec<ObservationRow>,
}

impl RawPayload for SourcePayload {
    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fetches from `{source_url}/stations/timeseries`, exports a `map_obs` snapshot and
/// uploads it
pub struct ObservationPipeline {
    http: reqwest::Client,
    source_url: String,
    variables: Vec<String>,
    sink: JsonFileSink,
    upload: UploadClient,
    pub fetch_calls: u32,
    pub written: Vec<PathBuf>,
}

impl ObservationPipeline {
    pub fn new(config: &Config, source_url: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            source_url: source_url.to_string(),
            variables: config.observation_variables.clone(),
            sink: JsonFileSink::from_config(config, "map_obs"),
            upload: UploadClient::from_config(config)?,
            fetch_calls: 0,
            written: Vec::new(),
        })
    }
}

#[async_trait]
impl Pipeline for ObservationPipeline {
    type Raw = SourcePayload;

    fn name(&self) -> &str {
        "observations"
    }

    async fn fetch(&mut self) -> Result<Option<SourcePayload>> {
        self.fetch_calls += 1;
        let response = self
            .http
            .get(format!("{}{SOURCE_PATH}", self.source_url))
            .send()
            .await
            .map_err(|e| Error::source_unavailable("mock-synoptic", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceUnavailable {
                source_name: "mock-synoptic".to_string(),
                message: format!("status {status}"),
                status_code: Some(status.as_u16()),
            });
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn process(&mut self, raw: SourcePayload) -> Result<CanonicalRecord> {
        let observations = flatten_observations(&raw.stations, &raw.rows, &self.variables);
        ObservationSnapshot::new(Utc::now(), raw.valid_time, raw.stations.len(), observations)
            .into_record()
    }

    fn validate(&self, processed: &CanonicalRecord) -> Result<()> {
        validate_snapshot(processed)
    }

    async fn push(&mut self, processed: &CanonicalRecord) -> Result<bool> {
        let path = self.sink.write(processed).await?;
        self.written.push(path.clone());
        self.upload.upload_file(&path, MAP_OBS_DATA_TYPE).await?;
        Ok(true)
    }
}
