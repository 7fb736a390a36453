//! ==============================================================================
//! domain.rs - sensor reading types shared by the store and the api
//! ==============================================================================
//!
//! relationships:
//!     - produced by: store.rs, postgres.rs
//!     - serialized by: api.rs
//!
//! ==============================================================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// sensor id stored when an insert omits one
pub const DEFAULT_SENSOR_ID: &str = "default";

/// number of rows returned by the "latest" query
pub const LATEST_LIMIT: usize = 10;

/// one row of the sensor_data table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensorReading {
    /// assigned by the store on insert
    pub id: i32,
    /// insertion time unless the row was written with an explicit null
    pub timestamp: Option<NaiveDateTime>,
    /// temperature in celsius
    pub temperature: Option<f64>,
    /// relative humidity (0-100%)
    pub humidity: Option<f64>,
    /// pressure in hPa
    pub pressure: Option<f64>,
    pub sensor_id: Option<String>,
}

/// insert payload
///
/// every field is optional. a missing `sensor_id` becomes
/// [`DEFAULT_SENSOR_ID`]; an explicit null is stored as NULL.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewReading {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default = "default_sensor_id")]
    pub sensor_id: Option<String>,
}

impl Default for NewReading {
    fn default() -> Self {
        Self {
            temperature: None,
            humidity: None,
            pressure: None,
            sensor_id: default_sensor_id(),
        }
    }
}

fn default_sensor_id() -> Option<String> {
    Some(DEFAULT_SENSOR_ID.to_string())
}

/// identity the store assigned to a freshly inserted reading
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InsertedReading {
    pub id: i32,
    pub timestamp: NaiveDateTime,
}

/// aggregate statistics over every stored reading
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TelemetryStats {
    pub total_records: i64,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub latest_timestamp: Option<NaiveDateTime>,
}

impl TelemetryStats {
    /// build stats from raw aggregates, rounding each mean to 2 decimals
    pub fn from_aggregates(
        total_records: i64,
        avg_temperature: Option<f64>,
        avg_humidity: Option<f64>,
        avg_pressure: Option<f64>,
        latest_timestamp: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            total_records,
            avg_temperature: avg_temperature.map(round2),
            avg_humidity: avg_humidity.map(round2),
            avg_pressure: avg_pressure.map(round2),
            latest_timestamp,
        }
    }
}

/// round to 2 decimal places, ties to even on the exact binary value
///
/// goes through the decimal expansion so 2.675 (stored as 2.67499..) becomes
/// 2.67 and 20.125 becomes 20.12.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_new_reading_defaults_sensor_id() {
        let reading: NewReading = serde_json::from_str(r#"{"temperature": 21.5}"#).unwrap();
        assert_eq!(reading.temperature, Some(21.5));
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.sensor_id.as_deref(), Some("default"));

        let reading: NewReading = serde_json::from_str(r#"{"sensor_id": null}"#).unwrap();
        assert_eq!(reading.sensor_id, None);

        let reading: NewReading = serde_json::from_str("{}").unwrap();
        assert_eq!(reading, NewReading::default());
    }

    #[test]
    fn test_new_reading_rejects_non_numeric_measurement() {
        let result = serde_json::from_str::<NewReading>(r#"{"temperature": "warm"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(21.456), 21.46);
        assert_eq!(round2(40.0), 40.0);
        assert_eq!(round2(-3.333), -3.33);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(20.125), 20.12);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2((20.0 + 20.25) / 2.0), 20.12);
    }

    #[test]
    fn test_stats_keep_zero_average() {
        let stats = TelemetryStats::from_aggregates(2, Some(0.0), None, Some(1013.2049), None);
        assert_eq!(stats.avg_temperature, Some(0.0));
        assert_eq!(stats.avg_humidity, None);
        assert_eq!(stats.avg_pressure, Some(1013.2));

        let halves =
            TelemetryStats::from_aggregates(2, Some((20.0 + 20.25) / 2.0), None, None, None);
        assert_eq!(halves.avg_temperature, Some(20.12));
    }

    #[test]
    fn test_reading_serializes_iso_timestamp() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(12, 30, 5, 250_000)
            .unwrap();
        let reading = SensorReading {
            id: 7,
            timestamp: Some(timestamp),
            temperature: Some(21.5),
            humidity: None,
            pressure: None,
            sensor_id: Some("s1".to_string()),
        };

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T12:30:05.250");
        assert_eq!(json["humidity"], serde_json::Value::Null);

        let empty = SensorReading { timestamp: None, ..reading };
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["timestamp"], serde_json::Value::Null);
    }
}
