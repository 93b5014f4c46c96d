//! Station and time series fixtures served by the mock source

use serde_json::{Value, json};

/// Path the mock source serves observations on
pub const SOURCE_PATH: &str = "/stations/timeseries";

/// Upload data type used by the observation pipeline
pub const MAP_OBS_DATA_TYPE: &str = "map-obs";

/// Two Uinta Basin stations, one reading row each, plus a row from an unknown station
pub fn basin_payload() -> Value {
    json!({
        "valid_time": "2025-01-19T18:00:00Z",
        "stations": [
            {"stid": "QV4", "name": "Vernal", "latitude": 40.44, "longitude": -109.51, "elevation": 5312.0},
            {"stid": "UBHSP", "name": "Horsepool", "latitude": 40.14, "longitude": -109.47, "elevation": 5128.0}
        ],
        "rows": [
            {
                "stid": "QV4",
                "date_time": "2025-01-19T18:00:00Z",
                "values": {"air_temp": -4.2, "ozone_concentration": 71.0, "wind_speed": null}
            },
            {
                "stid": "UBHSP",
                "date_time": "2025-01-19T18:00:00Z",
                "values": {"air_temp": -6.1, "snow_depth": 180.0}
            },
            {
                "stid": "NOPE1",
                "date_time": "2025-01-19T18:00:00Z",
                "values": {"air_temp": 1.0}
            }
        ]
    })
}

/// Payload with stations but no readings
pub fn empty_payload() -> Value {
    json!({
        "valid_time": "2025-01-19T18:00:00Z",
        "stations": [],
        "rows": []
    })
}
