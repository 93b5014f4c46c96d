//! End-to-end runs of an observation pipeline against mock source and website servers
//!
//! The source and the website are both `wiremock` servers; snapshots are written to
//! a temporary data root, so these tests need no network access or credentials.

mod common;

use brc_pipeline::observation::MAP_OBSERVATIONS;
use brc_pipeline::utils::parse_snapshot_filename;
use brc_pipeline::{ErrorKind, Health, PipelineRunner};
use common::{
    ObservationPipeline, SOURCE_PATH, TEST_HOSTNAME, TEST_UPLOAD_KEY,
    basin_payload, empty_payload, fast_retry_policy, test_config,
};
use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPLOAD_PATH: &str = "/api/data/upload/map-obs";

async fn mount_source(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/data/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn upload_count(requests: &[wiremock::Request]) -> usize {
    requests
        .iter()
        .filter(|r| r.url.path() == UPLOAD_PATH)
        .count()
}

#[tokio::test]
async fn run_exports_and_uploads_snapshot() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    mount_source(&source, basin_payload()).await;
    mount_health(&website).await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("x-api-key", TEST_UPLOAD_KEY))
        .and(header("x-client-hostname", TEST_HOSTNAME))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&website)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(config.retry.clone());

    assert!(runner.run(false).await.unwrap());

    let status = runner.status();
    assert_eq!(status.status, Health::Healthy);
    assert_eq!(status.error_count, 0);
    assert_eq!(status.last_success, status.last_run);

    let written = &runner.pipeline().written;
    assert_eq!(written.len(), 1);
    let name = written[0].file_name().unwrap().to_str().unwrap();
    let (prefix, _) = parse_snapshot_filename(name).unwrap();
    assert_eq!(prefix, "map_obs");

    let snapshot: Value = serde_json::from_slice(&std::fs::read(&written[0]).unwrap()).unwrap();
    assert_eq!(snapshot["data_type"], MAP_OBSERVATIONS);
    assert_eq!(snapshot["stations"], 2);
    // QV4 air_temp + ozone, UBHSP air_temp + snow_depth; null wind and unknown station dropped
    assert_eq!(snapshot["observations"].as_array().unwrap().len(), 4);
    assert_eq!(snapshot["valid_time"], "2025-01-19T18:00:00Z");
}

#[tokio::test]
async fn flaky_upload_refetches_whole_run() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    mount_source(&source, basin_payload()).await;
    mount_health(&website).await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&website)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&website)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(fast_retry_policy(3));

    assert!(runner.run(false).await.unwrap());
    assert_eq!(runner.pipeline().fetch_calls, 3, "each retry starts again at fetch");
    assert_eq!(upload_count(&website.received_requests().await.unwrap()), 3);
    assert!(runner.status().is_healthy());
}

#[tokio::test]
async fn rejected_upload_exhausts_retries_and_degrades() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    mount_source(&source, basin_payload()).await;
    mount_health(&website).await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .mount(&website)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(fast_retry_policy(3));

    let err = runner.run(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SinkUnavailable);
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(runner.pipeline().fetch_calls, 3);
    assert_eq!(upload_count(&website.received_requests().await.unwrap()), 3);

    let status = runner.status();
    assert_eq!(status.error_count, 1, "one failed run counts once");
    assert_eq!(status.status, Health::Degraded);
    assert!(status.last_error.unwrap().contains("disk full"));
    assert!(status.last_success.is_none());
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    mount_source(&source, basin_payload()).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline);

    assert!(runner.run(true).await.unwrap());
    assert!(runner.pipeline().written.is_empty());
    assert!(website.received_requests().await.unwrap().is_empty());
    assert!(!config.data_root.exists());
    assert!(runner.status().is_healthy());
}

#[tokio::test]
async fn empty_source_ends_run_without_push() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    mount_source(&source, empty_payload()).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(fast_retry_policy(3));

    assert!(!runner.run(false).await.unwrap());
    assert_eq!(runner.pipeline().fetch_calls, 1, "an empty payload is not retried");
    assert!(website.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn source_outage_is_retried_then_reported() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&source)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(fast_retry_policy(2));

    let err = runner.run(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(runner.status().error_count, 1);
}

#[tokio::test]
async fn malformed_source_body_is_not_retried() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&source)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(fast_retry_policy(3));

    let err = runner.run(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataInvalid);
    assert_eq!(runner.pipeline().fetch_calls, 1);
    assert_eq!(runner.status().status, Health::Degraded);
}

#[tokio::test]
async fn recovery_after_failed_run_resets_health() {
    let source = MockServer::start().await;
    let website = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&source)
        .await;
    mount_source(&source, basin_payload()).await;
    mount_health(&website).await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&website)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &website.uri());
    let pipeline = ObservationPipeline::new(&config, &source.uri()).unwrap();
    let mut runner = PipelineRunner::new(pipeline).with_retry_policy(fast_retry_policy(1));

    runner.run(false).await.unwrap_err();
    assert_eq!(runner.status().status, Health::Degraded);

    assert!(runner.run(false).await.unwrap());
    let status = runner.status();
    assert_eq!(status.status, Health::Healthy);
    assert!(status.last_error.is_none());
}
