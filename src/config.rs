//! Configuration types for brc-pipeline
//!
//! A [`Config`] is built once at process start, validated, and then passed by
//! reference to whatever needs credentials, directories or retry settings.

use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Length every website upload key must have
pub const UPLOAD_API_KEY_LEN: usize = 64;

/// Station network known to [`Config::station_list`]
pub const UINTA_BASIN: &str = "uinta_basin";

/// Retry behaviour for a whole pipeline run (or any other fallible operation)
///
/// The delay after the k-th failed attempt (0-indexed) is
/// `min(base_delay * exponential_base^k, max_delay)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt (default: 1 second)
    #[serde(default = "default_base_delay", with = "duration_secs_f64")]
    pub base_delay: Duration,

    /// Upper bound for any single delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_secs_f64")]
    pub max_delay: Duration,

    /// Growth factor between consecutive delays (default: 2.0)
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,

    /// Error kinds that trigger another attempt
    ///
    /// `configuration_invalid` is ignored here: configuration errors are always fatal.
    #[serde(default = "default_retry_on")]
    pub retry_on: Vec<ErrorKind>,

    /// Scale each delay by a random factor in [1, 2), still capped at `max_delay` (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            exponential_base: default_exponential_base(),
            retry_on: default_retry_on(),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Policy that runs the operation exactly once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Check the invariants the retry loop relies on
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(Error::config(
                "retry max_attempts must be >= 1",
                "BRC_RETRY_ATTEMPTS",
            ));
        }
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(Error::config(
                format!(
                    "retry exponential_base must be a finite number >= 1, got {}",
                    self.exponential_base
                ),
                "exponential_base",
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(Error::config(
                format!(
                    "retry base_delay ({:?}) exceeds max_delay ({:?})",
                    self.base_delay, self.max_delay
                ),
                "BRC_RETRY_DELAY",
            ));
        }
        Ok(())
    }
}

/// Main configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Synoptic API token (`SYNOPTIC_API_KEY`)
    #[serde(default)]
    pub synoptic_api_key: Option<String>,

    /// FlightAware AeroAPI key (`FLIGHTAWARE_API_KEY`)
    #[serde(default)]
    pub flightaware_api_key: Option<String>,

    /// Website upload key (`DATA_UPLOAD_API_KEY`), 64 characters
    #[serde(default)]
    pub upload_api_key: Option<String>,

    /// Website base URL (`BRC_SERVER_URL` or `~/.config/ubair-website/website_url`)
    #[serde(default)]
    pub upload_url: Option<String>,

    /// Value sent in the `x-client-hostname` upload header
    #[serde(default = "default_client_hostname")]
    pub client_hostname: String,

    /// Root directory for exported snapshots (default: "./data")
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Cache directory (default: "./cache")
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Retry policy applied to each pipeline run
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Per-request HTTP timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_secs_f64")]
    pub request_timeout: Duration,

    /// Log level directive (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file; logs go to stdout when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Default station ids for the Uinta Basin network
    #[serde(default = "default_stations")]
    pub stations: Vec<String>,

    /// Default observation variables requested from Synoptic
    #[serde(default = "default_observation_variables")]
    pub observation_variables: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            synoptic_api_key: None,
            flightaware_api_key: None,
            upload_api_key: None,
            upload_url: None,
            client_hostname: default_client_hostname(),
            data_root: default_data_root(),
            cache_dir: default_cache_dir(),
            retry: RetryPolicy::default(),
            request_timeout: default_request_timeout(),
            log_level: default_log_level(),
            log_file: None,
            stations: default_stations(),
            observation_variables: default_observation_variables(),
        }
    }
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// The upload URL falls back to the first line of
    /// `~/.config/ubair-website/website_url` when `BRC_SERVER_URL` is unset.
    /// The result is validated before it is returned.
    pub fn from_env() -> Result<Self> {
        let url_file = website_url_file();
        let config = Self::from_lookup(|key| std::env::var(key).ok(), url_file.as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Load `env_file` into the environment (if it exists), then call [`Config::from_env`]
    ///
    /// Variables already present in the environment take precedence over the file.
    pub fn from_env_file(env_file: impl AsRef<Path>) -> Result<Self> {
        let env_file = env_file.as_ref();
        if env_file.exists() {
            dotenvy::from_path(env_file).map_err(|e| {
                Error::config(
                    format!("failed to load {}: {e}", env_file.display()),
                    env_file.display().to_string(),
                )
            })?;
            tracing::debug!(path = %env_file.display(), "loaded environment file");
        }
        Self::from_env()
    }

    /// Build a configuration from an arbitrary variable lookup, without validating it
    pub(crate) fn from_lookup<F>(lookup: F, url_file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        config.synoptic_api_key = var("SYNOPTIC_API_KEY");
        config.flightaware_api_key = var("FLIGHTAWARE_API_KEY");
        config.upload_api_key = var("DATA_UPLOAD_API_KEY");

        config.upload_url = match var("BRC_SERVER_URL") {
            Some(url) => Some(url),
            None => match url_file {
                Some(path) if path.exists() => {
                    let url = std::fs::read_to_string(path)?.trim().to_string();
                    (!url.is_empty()).then_some(url)
                }
                _ => None,
            },
        };

        if let Some(host) = var("BRC_CLIENT_HOSTNAME").or_else(|| var("HOSTNAME")) {
            config.client_hostname = host;
        }
        if let Some(root) = var("BRC_DATA_ROOT") {
            config.data_root = PathBuf::from(root);
        }
        if let Some(dir) = var("BRC_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(attempts) = var("BRC_RETRY_ATTEMPTS") {
            config.retry.max_attempts = attempts.parse().map_err(|_| {
                Error::config(
                    format!("BRC_RETRY_ATTEMPTS must be a whole number, got {attempts:?}"),
                    "BRC_RETRY_ATTEMPTS",
                )
            })?;
        }
        if let Some(delay) = var("BRC_RETRY_DELAY") {
            config.retry.base_delay = parse_seconds(&delay, "BRC_RETRY_DELAY")?;
        }
        if let Some(timeout) = var("BRC_REQUEST_TIMEOUT") {
            config.request_timeout = parse_seconds(&timeout, "BRC_REQUEST_TIMEOUT")?;
        }
        if let Some(level) = var("BRC_LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }
        config.log_file = var("BRC_LOG_FILE").map(PathBuf::from);

        Ok(config)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;

        if self.request_timeout.is_zero() {
            return Err(Error::config(
                "request timeout must be greater than zero",
                "BRC_REQUEST_TIMEOUT",
            ));
        }

        if let Some(url) = &self.upload_url {
            validate_http_url(url, "BRC_SERVER_URL")?;
        }

        if let Some(key) = &self.upload_api_key
            && key.len() != UPLOAD_API_KEY_LEN
        {
            return Err(Error::config(
                format!(
                    "API key should be {UPLOAD_API_KEY_LEN} characters, got {}",
                    key.len()
                ),
                "DATA_UPLOAD_API_KEY",
            ));
        }

        Ok(())
    }

    /// Website URL and upload key, or a configuration error naming what is missing
    pub fn upload_target(&self) -> Result<(&str, &str)> {
        let key = self.upload_api_key.as_deref().ok_or_else(|| {
            Error::config(
                "DATA_UPLOAD_API_KEY environment variable not set",
                "DATA_UPLOAD_API_KEY",
            )
        })?;
        let url = self.upload_url.as_deref().ok_or_else(|| {
            Error::config(
                "website URL not configured (set BRC_SERVER_URL or ~/.config/ubair-website/website_url)",
                "BRC_SERVER_URL",
            )
        })?;
        Ok((url, key))
    }

    /// Synoptic token, or a configuration error if it is not set
    pub fn require_synoptic_key(&self) -> Result<&str> {
        self.synoptic_api_key.as_deref().ok_or_else(|| {
            Error::config(
                "SYNOPTIC_API_KEY environment variable is required",
                "SYNOPTIC_API_KEY",
            )
        })
    }

    /// Create the data root and cache directories
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.data_root, &self.cache_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Station ids for a named network
    pub fn station_list(&self, network: &str) -> Result<&[String]> {
        if network == UINTA_BASIN {
            Ok(&self.stations)
        } else {
            Err(Error::config(format!("unknown network: {network}"), "network"))
        }
    }
}

fn validate_http_url(raw: &str, key: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| Error::config(format!("invalid URL {raw:?}: {e}"), key))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::config(
            format!("URL {raw:?} must use http or https, not {other}"),
            key,
        )),
    }
}

fn parse_seconds(raw: &str, key: &str) -> Result<Duration> {
    let secs: f64 = raw.parse().map_err(|_| {
        Error::config(
            format!("{key} must be a number of seconds, got {raw:?}"),
            key,
        )
    })?;
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::config(
            format!("{key} must be a non-negative number, got {raw}"),
            key,
        )
    })
}

fn website_url_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("ubair-website")
            .join("website_url")
    })
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_exponential_base() -> f64 {
    2.0
}

fn default_retry_on() -> Vec<ErrorKind> {
    vec![
        ErrorKind::SourceUnavailable,
        ErrorKind::SinkUnavailable,
        ErrorKind::Network,
    ]
}

fn default_client_hostname() -> String {
    "localhost".to_string()
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stations() -> Vec<String> {
    [
        "A3822",     // Dinosaur National Monument
        "A1633",     // Red Wash
        "UB7ST",     // Seven Sisters
        "UBHSP",     // Horsepool
        "A1622",     // Ouray
        "QV4",       // Vernal
        "A1386",     // Whiterocks
        "QRS",       // Roosevelt OG
        "UBRVT",     // Roosevelt USU
        "A1388",     // Myton
        "UBCSP",     // Castle Peak
        "COOPDINU1", // Dinosaur NM
        "COOPALMU1", // Altamont
        "COOPDSNU1", // Duchesne
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_observation_variables() -> Vec<String> {
    [
        "wind_speed",
        "wind_direction",
        "air_temp",
        "PM_25_concentration",
        "ozone_concentration",
        "sea_level_pressure",
        "snow_depth",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// Duration serialization helper (fractional seconds)
mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
