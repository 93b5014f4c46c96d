//! # brc-pipeline
//!
//! Retrying fetch → process → push pipelines for weather, air-quality and aviation
//! snapshots.
//!
//! ## Design Philosophy
//!
//! - **One trait per source** - a data source implements [`Pipeline`]; everything
//!   else (sequencing, retries, run-state, health) lives in [`PipelineRunner`]
//! - **Errors carry their kind** - retry decisions are made on [`ErrorKind`], so a
//!   configuration error can never be retried into a loop
//! - **Flat snapshots** - processed records land as timestamped JSON files and are
//!   uploaded to the website as-is
//!
//! ## Quick Start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use brc_pipeline::{CanonicalRecord, Config, JsonFileSink, Pipeline, PipelineRunner, Result};
//! use serde_json::{json, Value};
//!
//! struct Outlook {
//!     sink: JsonFileSink,
//! }
//!
//! #[async_trait]
//! impl Pipeline for Outlook {
//!     type Raw = Value;
//!
//!     fn name(&self) -> &str {
//!         "ozone-outlook"
//!     }
//!
//!     async fn fetch(&mut self) -> Result<Option<Value>> {
//!         Ok(Some(json!({"risk": "moderate"})))
//!     }
//!
//!     async fn process(&mut self, raw: Value) -> Result<CanonicalRecord> {
//!         let mut record = CanonicalRecord::new();
//!         record.insert("ozone_risk".into(), raw["risk"].clone());
//!         Ok(record)
//!     }
//!
//!     async fn push(&mut self, processed: &CanonicalRecord) -> Result<bool> {
//!         self.sink.write(processed).await?;
//!         Ok(true)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env_file(".env")?;
//!     brc_pipeline::logging::init_from_config(&config)?;
//!
//!     let pipeline = Outlook {
//!         sink: JsonFileSink::from_config(&config, "outlook"),
//!     };
//!     let mut runner = PipelineRunner::new(pipeline).with_retry_policy(config.retry.clone());
//!     runner.run(false).await?;
//!     println!("{}", serde_json::to_string(&runner.status())?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Structured logging setup
pub mod logging;
/// Observation records and the map snapshot envelope
pub mod observation;
/// Pipeline trait, runner and status
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Snapshot sinks
pub mod sink;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, RetryPolicy};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{
    CanonicalRecord, Health, Phase, Pipeline, PipelineRunner, PipelineStatus, RawPayload, RunState,
};
pub use retry::{Backoff, Classify, retry_with_backoff};
pub use sink::{JsonFileSink, UploadClient};
