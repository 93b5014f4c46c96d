//! Run orchestration: phase sequencing, whole-run retry, run-state tracking.

use super::status::PipelineStatus;
use super::{Phase, Pipeline, RawPayload};
use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Run-state of one pipeline, overwritten by every run and never persisted
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    /// Start time of the most recent attempt
    pub last_run: Option<DateTime<Utc>>,
    /// Start time of the most recent successful attempt
    pub last_success: Option<DateTime<Utc>>,
    /// Failures since the last success
    pub error_count: u32,
    /// Description of the most recent failure
    pub last_error: Option<String>,
}

impl RunState {
    /// Status snapshot for a pipeline with the given name
    pub fn status(&self, name: &str) -> PipelineStatus {
        PipelineStatus::new(name, self)
    }

    /// Count one failed run; the counter sticks at `u32::MAX`
    pub(crate) fn record_failure(&mut self, error: impl Into<String>) {
        self.error_count = self.error_count.saturating_add(1);
        self.last_error = Some(error.into());
    }

    pub(crate) fn record_success(&mut self, started: DateTime<Utc>) {
        self.last_success = Some(started);
        self.error_count = 0;
        self.last_error = None;
    }
}

/// Drives a [`Pipeline`] through fetch → process → push
///
/// The whole run is wrapped in the retry policy: a retryable failure in any phase
/// restarts the run from `fetch`, so a flaky sink re-fetches from the source.
/// `run` takes `&mut self`, so one runner never executes two runs at once.
#[derive(Debug)]
pub struct PipelineRunner<P> {
    pipeline: P,
    retry: RetryPolicy,
    state: RunState,
}

impl<P: Pipeline> PipelineRunner<P> {
    /// Wrap a pipeline with the default retry policy (3 attempts)
    pub fn new(pipeline: P) -> Self {
        tracing::info!(pipeline = pipeline.name(), "initialized pipeline");
        Self {
            pipeline,
            retry: RetryPolicy::default(),
            state: RunState::default(),
        }
    }

    /// Replace the retry policy applied to each run
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute the complete pipeline
    ///
    /// Returns `Ok(true)` when the data was pushed (or, with `dry_run`, would have
    /// been), `Ok(false)` when a phase produced nothing or the sink reported failure,
    /// and `Err` with the last attempt's error when the run failed.
    pub async fn run(&mut self, dry_run: bool) -> Result<bool> {
        let name = self.pipeline.name().to_string();
        let policy = self.retry.clone();
        let mut backoff = policy.backoff();

        loop {
            let attempt = backoff.attempt();
            match self.run_attempt(&name, attempt, dry_run).await {
                Ok(success) => {
                    backoff.on_success(&name);
                    return Ok(success);
                }
                Err(e) => match backoff.after_failure(&e, &name) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => {
                        self.state.record_failure(e.to_string());
                        tracing::error!(
                            pipeline = %name,
                            error = %e,
                            error_count = self.state.error_count,
                            "pipeline run failed"
                        );
                        return Err(e);
                    }
                },
            }
        }
    }

    async fn run_attempt(&mut self, name: &str, attempt: u32, dry_run: bool) -> Result<bool> {
        let started = Utc::now();
        self.state.last_run = Some(started);
        tracing::info!(pipeline = %name, attempt, dry_run, "starting pipeline run");

        tracing::debug!(pipeline = %name, phase = %Phase::Fetch, "fetching data");
        let raw = match self.pipeline.fetch().await {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                tracing::warn!(pipeline = %name, "no data fetched");
                return Ok(false);
            }
            Err(e) => return Err(phase_failed(name, Phase::Fetch, attempt, e)),
        };

        tracing::debug!(pipeline = %name, phase = %Phase::Process, "processing data");
        let processed = match self.pipeline.process(raw).await {
            Ok(processed) if !processed.is_empty() => processed,
            Ok(_) => {
                tracing::warn!(pipeline = %name, "no data after processing");
                return Ok(false);
            }
            Err(e) => return Err(phase_failed(name, Phase::Process, attempt, e)),
        };

        if let Err(e) = self.pipeline.validate(&processed) {
            return Err(phase_failed(name, Phase::Process, attempt, e));
        }

        let success = if dry_run {
            tracing::info!(pipeline = %name, "dry run - skipping push phase");
            true
        } else {
            tracing::debug!(pipeline = %name, phase = %Phase::Push, "pushing data");
            self.pipeline
                .push(&processed)
                .await
                .map_err(|e| phase_failed(name, Phase::Push, attempt, e))?
        };

        if success {
            self.state.record_success(started);
            tracing::info!(pipeline = %name, "pipeline completed successfully");
        } else {
            self.state.record_failure("sink reported failure");
            tracing::error!(pipeline = %name, "pipeline failed at push stage");
        }

        Ok(success)
    }

    /// Snapshot of name, run times, error count and health
    pub fn status(&self) -> PipelineStatus {
        self.state.status(self.pipeline.name())
    }

    /// Current run-state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Retry policy applied to each run
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The wrapped pipeline
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Mutable access to the wrapped pipeline
    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    /// Unwrap the pipeline, discarding run-state
    pub fn into_inner(self) -> P {
        self.pipeline
    }
}

fn phase_failed(name: &str, phase: Phase, attempt: u32, error: Error) -> Error {
    tracing::warn!(
        pipeline = %name,
        phase = %phase,
        attempt,
        kind = %error.kind(),
        error = %error,
        "pipeline phase failed"
    );
    error
}
