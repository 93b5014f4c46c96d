//! Surface observation records and the `map_observations` snapshot.
//!
//! Station time series are flattened into one [`ObservationRecord`] per station,
//! time and variable, then wrapped in an [`ObservationSnapshot`] envelope that the
//! website's map view consumes.

use crate::error::{Error, Result};
use crate::pipeline::CanonicalRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// `data_type` of the map snapshot envelope
pub const MAP_OBSERVATIONS: &str = "map_observations";

/// Envelope format version
pub const PROCESSING_VERSION: &str = "1.0";

/// Source label written into snapshots built from Synoptic data
pub const SYNOPTIC_SOURCE: &str = "Synoptic API";

/// Units reported for an observation variable, `"unknown"` when unmapped
pub fn units_for(variable: &str) -> &'static str {
    match variable {
        "air_temp" => "C",
        "wind_speed" => "m/s",
        "wind_direction" => "degrees",
        "PM_25_concentration" => "ug/m3",
        "ozone_concentration" => "ppb",
        "sea_level_pressure" => "hPa",
        "snow_depth" => "mm",
        _ => "unknown",
    }
}

/// Station metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Station id (e.g. "QV4")
    pub stid: String,
    /// Display name
    pub name: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Elevation as reported by the network
    pub elevation: f64,
}

/// One timestamped row of a station time series
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    /// Station id the row belongs to
    pub stid: String,
    /// Observation time
    pub date_time: DateTime<Utc>,
    /// Variable name to value; `None` for missing readings
    pub values: BTreeMap<String, Option<f64>>,
}

/// A single variable reading at a station
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Station id
    pub stid: String,
    /// Station display name
    pub name: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Station elevation
    pub elevation: f64,
    /// Observation time, serialized as RFC 3339 with a `Z` suffix
    pub date_time: DateTime<Utc>,
    /// Variable name
    pub variable: String,
    /// Reading
    pub value: f64,
    /// Units from [`units_for`]
    pub units: String,
}

/// Flatten time series rows into observation records
///
/// Rows from stations missing in `stations` are skipped, as are variables outside
/// `variables` and readings that are missing or not finite. Output follows row
/// order, then the order of `variables`.
pub fn flatten_observations(
    stations: &[Station],
    rows: &[ObservationRow],
    variables: &[String],
) -> Vec<ObservationRecord> {
    let by_id: HashMap<&str, &Station> = stations.iter().map(|s| (s.stid.as_str(), s)).collect();

    let mut records = Vec::new();
    for row in rows {
        let Some(station) = by_id.get(row.stid.as_str()) else {
            tracing::debug!(stid = %row.stid, "skipping row from unknown station");
            continue;
        };
        for variable in variables {
            let Some(Some(value)) = row.values.get(variable) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            records.push(ObservationRecord {
                stid: station.stid.clone(),
                name: station.name.clone(),
                latitude: station.latitude,
                longitude: station.longitude,
                elevation: station.elevation,
                date_time: row.date_time,
                variable: variable.clone(),
                value: *value,
                units: units_for(variable).to_string(),
            });
        }
    }
    records
}

/// The `map_observations` snapshot envelope
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationSnapshot {
    /// Always [`MAP_OBSERVATIONS`]
    pub data_type: String,
    /// When the data was fetched
    pub fetch_time: DateTime<Utc>,
    /// End of the observation window
    pub valid_time: DateTime<Utc>,
    /// Upstream source label
    pub source: String,
    /// Envelope format version
    pub processing_version: String,
    /// Number of stations with metadata
    pub stations: usize,
    /// Flattened readings
    pub observations: Vec<ObservationRecord>,
}

impl ObservationSnapshot {
    /// Envelope for Synoptic observations
    pub fn new(
        fetch_time: DateTime<Utc>,
        valid_time: DateTime<Utc>,
        stations: usize,
        observations: Vec<ObservationRecord>,
    ) -> Self {
        Self {
            data_type: MAP_OBSERVATIONS.to_string(),
            fetch_time,
            valid_time,
            source: SYNOPTIC_SOURCE.to_string(),
            processing_version: PROCESSING_VERSION.to_string(),
            stations,
            observations,
        }
    }

    /// Convert into the record handed to `push`
    pub fn into_record(self) -> Result<CanonicalRecord> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::DataInvalid(format!(
                "snapshot serialized to {other}, expected an object"
            ))),
        }
    }

    /// Parse a pushed record back into a snapshot
    pub fn from_record(record: &CanonicalRecord) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(record.clone()))?)
    }
}

/// Check that a record carries the `map_observations` envelope
pub fn validate_snapshot(record: &CanonicalRecord) -> Result<()> {
    match record.get("data_type").and_then(Value::as_str) {
        Some(MAP_OBSERVATIONS) => {}
        Some(other) => {
            return Err(Error::Validation(format!(
                "unexpected data_type {other:?}, expected {MAP_OBSERVATIONS:?}"
            )));
        }
        None => return Err(Error::Validation("missing data_type".to_string())),
    }
    if !record.get("observations").is_some_and(Value::is_array) {
        return Err(Error::Validation("observations must be an array".to_string()));
    }
    Ok(())
}
