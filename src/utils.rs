//! Snapshot file naming and JSON clean-up helpers

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Timestamp layout used in snapshot file names (minutes resolution, UTC)
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y%m%d_%H%M";

#[allow(clippy::expect_used)]
static SNAPSHOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>.+)_(?P<stamp>\d{8}_\d{4})Z\.json$").expect("valid snapshot regex")
});

/// Path of the JSON snapshot for `prefix` at `time`
///
/// The convention is `<data_root>/<prefix>_<YYYYMMDD_HHMM>Z.json`; seconds are dropped.
///
/// # Examples
///
/// ```
/// use brc_pipeline::utils::json_output_path;
/// use chrono::{TimeZone, Utc};
/// use std::path::Path;
///
/// let t = Utc.with_ymd_and_hms(2025, 7, 14, 18, 5, 42).unwrap();
/// let path = json_output_path(Path::new("data"), "map_obs", t);
/// assert_eq!(path, Path::new("data/map_obs_20250714_1805Z.json"));
/// ```
pub fn json_output_path(data_root: &Path, prefix: &str, time: DateTime<Utc>) -> PathBuf {
    data_root.join(format!(
        "{prefix}_{}Z.json",
        time.format(SNAPSHOT_TIME_FORMAT)
    ))
}

/// Split a snapshot file name back into its prefix and timestamp
///
/// Returns `None` for names that do not follow the snapshot convention.
pub fn parse_snapshot_filename(file_name: &str) -> Option<(String, DateTime<Utc>)> {
    let caps = SNAPSHOT_NAME.captures(file_name)?;
    let stamp = NaiveDateTime::parse_from_str(&caps["stamp"], SNAPSHOT_TIME_FORMAT).ok()?;
    Some((caps["prefix"].to_string(), stamp.and_utc()))
}

/// Clean a JSON value in place before export
///
/// String values lose stray surrounding double quotes (`"\"QV4\""` becomes `"QV4"`);
/// arrays and objects are cleaned recursively.
pub fn clean_json(value: &mut Value) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim_matches('"');
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(clean_json),
        Value::Object(fields) => fields.values_mut().for_each(clean_json),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
