//! Test configuration helpers

use brc_pipeline::{Config, RetryPolicy};
use std::path::Path;
use std::time::Duration;

/// A valid 64-character upload key
pub const TEST_UPLOAD_KEY: &str =
    "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

/// Hostname sent in the `x-client-hostname` header during tests
pub const TEST_HOSTNAME: &str = "brc-test-host";

/// Retry policy with millisecond delays so retry tests stay fast
pub fn fast_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        ..RetryPolicy::default()
    }
}

/// Configuration pointing at a mock website and a temporary data root
pub fn test_config(data_root: &Path, website_url: &str) -> Config {
    Config {
        upload_api_key: Some(TEST_UPLOAD_KEY.to_string()),
        upload_url: Some(website_url.to_string()),
        client_hostname: TEST_HOSTNAME.to_string(),
        data_root: data_root.join("json"),
        cache_dir: data_root.join("cache"),
        retry: fast_retry_policy(3),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}
