//! Fetch → process → push pipelines
//!
//! A data source is wrapped by implementing [`Pipeline`]; a [`PipelineRunner`] then
//! drives the three phases in order, retries the whole run according to its
//! [`RetryPolicy`](crate::config::RetryPolicy), and keeps the run-state that
//! [`PipelineRunner::status`] reports.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use brc_pipeline::pipeline::{CanonicalRecord, Pipeline, PipelineRunner};
//! use brc_pipeline::Result;
//! use serde_json::{json, Value};
//!
//! struct Outlook;
//!
//! #[async_trait]
//! impl Pipeline for Outlook {
//!     type Raw = Value;
//!
//!     fn name(&self) -> &str {
//!         "outlook"
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
//!     async fn push(&mut self, _processed: &CanonicalRecord) -> Result<bool> {
//!         Ok(true)
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let mut runner = PipelineRunner::new(Outlook);
//! let pushed = runner.run(false).await?;
//! println!("pushed={pushed} status={:?}", runner.status());
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

mod runner;
mod status;


pub use runner::{PipelineRunner, RunState};
pub use status::{Health, PipelineStatus};

/// Canonical output of [`Pipeline::process`]: a JSON object with source-specific keys
pub type CanonicalRecord = serde_json::Map<String, Value>;

/// Raw data returned by [`Pipeline::fetch`]
///
/// The only thing the runner needs to know about a raw payload is whether it is
/// empty; an empty payload ends the run without calling `process`.
pub trait RawPayload {
    /// Whether the payload carries no data (default: never)
    fn is_empty(&self) -> bool {
        false
    }
}

impl RawPayload for Value {
    fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            Value::String(s) => s.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

impl RawPayload for CanonicalRecord {
    fn is_empty(&self) -> bool {
        serde_json::Map::is_empty(self)
    }
}

impl<T> RawPayload for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl RawPayload for String {
    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }
}

impl<K, V, S> RawPayload for HashMap<K, V, S> {
    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }
}

impl<K, V> RawPayload for BTreeMap<K, V> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }
}

/// One of the three phases of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Acquire raw data from the source
    Fetch,
    /// Transform raw data into a [`CanonicalRecord`]
    Process,
    /// Deliver the record to its sink
    Push,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Fetch => "fetch",
            Phase::Process => "process",
            Phase::Push => "push",
        })
    }
}

/// A three-phase data pipeline
///
/// Implementations do not catch their own errors: anything a phase returns as
/// `Err` propagates to the runner, which decides whether the whole run is retried.
#[async_trait]
pub trait Pipeline: Send {
    /// Source-specific raw payload handed from `fetch` to `process`
    type Raw: RawPayload + Send;

    /// Pipeline name used in logs and status reports
    fn name(&self) -> &str;

    /// Fetch raw data from the source
    ///
    /// `Ok(None)` means the source had nothing to offer; the run ends as failed
    /// without calling `process`.
    async fn fetch(&mut self) -> Result<Option<Self::Raw>>;

    /// Transform raw data into its canonical shape
    ///
    /// An empty record ends the run as failed without calling `push`.
    async fn process(&mut self, raw: Self::Raw) -> Result<CanonicalRecord>;

    /// Check a processed record before it is pushed (default: accept everything)
    fn validate(&self, _processed: &CanonicalRecord) -> Result<()> {
        Ok(())
    }

    /// Deliver the record to its sink, returning whether delivery succeeded
    async fn push(&mut self, processed: &CanonicalRecord) -> Result<bool>;
}
