// fusion_core/src/messages.rs

use std::fmt;

use nalgebra::{DVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::types::Timestamp;

// =========================================================================
// == Sensor Identification ==
// =========================================================================

/// The two sensor modalities the filter knows how to fuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Linear positional sensor measuring `(x, y)`.
    Lidar,
    /// Nonlinear sensor measuring `(range, bearing, range_rate)`.
    Radar,
}

impl SensorKind {
    /// Number of components in a measurement from this sensor.
    pub const fn measurement_dim(self) -> usize {
        match self {
            SensorKind::Lidar => 2,
            SensorKind::Radar => 3,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Lidar => f.write_str("lidar"),
            SensorKind::Radar => f.write_str("radar"),
        }
    }
}

// =========================================================================
// == Core Message and Data Enums ==
// =========================================================================

/// Raw measurement payload, tagged by the sensor that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementData {
    /// `[x, y]` in meters.
    Lidar(Vector2<f64>),
    /// `[range (m), bearing (rad), range_rate (m/s)]`.
    Radar(Vector3<f64>),
}

impl MeasurementData {
    pub fn kind(&self) -> SensorKind {
        match self {
            MeasurementData::Lidar(_) => SensorKind::Lidar,
            MeasurementData::Radar(_) => SensorKind::Radar,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            MeasurementData::Lidar(z) => z.as_slice(),
            MeasurementData::Radar(z) => z.as_slice(),
        }
    }

    /// The measurement as a dynamically sized vector `z`, as used by the update.
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_column_slice(self.as_slice())
    }

    pub fn is_finite(&self) -> bool {
        self.as_slice().iter().all(|v| v.is_finite())
    }
}

/// A single timestamped observation, the only input the filter consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementMessage {
    /// Time of the observation in microseconds.
    pub timestamp_us: Timestamp,
    pub data: MeasurementData,
}

impl MeasurementMessage {
    pub fn lidar(timestamp_us: Timestamp, x: f64, y: f64) -> Self {
        Self {
            timestamp_us,
            data: MeasurementData::Lidar(Vector2::new(x, y)),
        }
    }

    pub fn radar(timestamp_us: Timestamp, range: f64, bearing: f64, range_rate: f64) -> Self {
        Self {
            timestamp_us,
            data: MeasurementData::Radar(Vector3::new(range, bearing, range_rate)),
        }
    }

    /// Builds a message from an untyped record, as produced by a feed or log parser.
    ///
    /// Rejects records whose length does not match the sensor, or that
    /// contain NaN or infinite values.
    pub fn from_raw(
        kind: SensorKind,
        timestamp_us: Timestamp,
        raw: &[f64],
    ) -> Result<Self, FilterError> {
        let expected = kind.measurement_dim();
        if raw.len() != expected {
            return Err(FilterError::MalformedMeasurement {
                kind,
                expected,
                got: raw.len(),
            });
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(FilterError::NonFiniteMeasurement { kind });
        }

        let data = match kind {
            SensorKind::Lidar => MeasurementData::Lidar(Vector2::from_column_slice(raw)),
            SensorKind::Radar => MeasurementData::Radar(Vector3::from_column_slice(raw)),
        };
        Ok(Self { timestamp_us, data })
    }

    pub fn kind(&self) -> SensorKind {
        self.data.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_builds_typed_payload() {
        let msg = MeasurementMessage::from_raw(SensorKind::Radar, 42, &[2.0, 0.1, -0.5]).unwrap();
        assert_eq!(msg.kind(), SensorKind::Radar);
        assert_eq!(msg.timestamp_us, 42);
        assert_eq!(msg.data.as_slice(), &[2.0, 0.1, -0.5]);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        let err = MeasurementMessage::from_raw(SensorKind::Lidar, 0, &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            FilterError::MalformedMeasurement {
                kind: SensorKind::Lidar,
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn test_from_raw_rejects_non_finite_values() {
        let err = MeasurementMessage::from_raw(SensorKind::Lidar, 0, &[1.0, f64::NAN]).unwrap_err();
        assert_eq!(
            err,
            FilterError::NonFiniteMeasurement {
                kind: SensorKind::Lidar
            }
        );
    }

    #[test]
    fn test_sensor_kind_display_and_dims() {
        assert_eq!(SensorKind::Lidar.to_string(), "lidar");
        assert_eq!(SensorKind::Radar.measurement_dim(), 3);
        assert_eq!(MeasurementMessage::lidar(0, 1.0, 2.0).data.to_dvector().len(), 2);
    }
}
