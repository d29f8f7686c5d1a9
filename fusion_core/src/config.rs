// fusion_core/src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

// =========================================================================
// == Top-Level Filter Configuration ==
// =========================================================================

/// # UkfConfig
/// Everything the filter needs at construction time. Fixed for the lifetime
/// of a filter instance.
///
/// Maps directly onto a `[filter]` table in a scenario TOML file; every
/// field is optional and falls back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UkfConfig {
    /// If false, lidar measurements are ignored entirely (including for initialization).
    pub use_lidar: bool,
    /// If false, radar measurements are ignored entirely (including for initialization).
    pub use_radar: bool,
    pub process_noise: ProcessNoise,
    pub lidar: LidarNoise,
    pub radar: RadarNoise,
}

impl Default for UkfConfig {
    fn default() -> Self {
        Self {
            use_lidar: true,
            use_radar: true,
            process_noise: ProcessNoise::default(),
            lidar: LidarNoise::default(),
            radar: RadarNoise::default(),
        }
    }
}

impl UkfConfig {
    /// Rejects non-positive or non-finite standard deviations, and a
    /// configuration with every sensor disabled.
    pub fn validate(&self) -> Result<(), FilterError> {
        if !self.use_lidar && !self.use_radar {
            return Err(FilterError::InvalidConfig {
                field: "use_lidar/use_radar",
                reason: "at least one sensor must be enabled".to_string(),
            });
        }

        require_positive("process_noise.std_a", self.process_noise.std_a)?;
        require_positive("process_noise.std_yawdd", self.process_noise.std_yawdd)?;
        require_positive("lidar.std_px", self.lidar.std_px)?;
        require_positive("lidar.std_py", self.lidar.std_py)?;
        require_positive("radar.std_range", self.radar.std_range)?;
        require_positive("radar.std_bearing", self.radar.std_bearing)?;
        require_positive("radar.std_range_rate", self.radar.std_range_rate)?;
        Ok(())
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), FilterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidConfig {
            field,
            reason: format!("must be a finite, strictly positive standard deviation (got {value})"),
        })
    }
}

// =========================================================================
// == Noise Sub-Structs ==
// =========================================================================

/// Process noise of the CTRV model. These are the tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessNoise {
    /// Longitudinal acceleration noise standard deviation in m/s^2.
    pub std_a: f64,
    /// Yaw acceleration noise standard deviation in rad/s^2.
    pub std_yawdd: f64,
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self {
            std_a: 2.0,
            std_yawdd: 0.3,
        }
    }
}

/// Lidar measurement noise, as given by the sensor datasheet. Not for tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LidarNoise {
    /// Position x standard deviation in m.
    pub std_px: f64,
    /// Position y standard deviation in m.
    pub std_py: f64,
}

impl Default for LidarNoise {
    fn default() -> Self {
        Self {
            std_px: 0.15,
            std_py: 0.15,
        }
    }
}

/// Radar measurement noise, as given by the sensor datasheet. Not for tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadarNoise {
    /// Range standard deviation in m.
    pub std_range: f64,
    /// Bearing standard deviation in rad.
    pub std_bearing: f64,
    /// Range rate standard deviation in m/s.
    pub std_range_rate: f64,
}

impl Default for RadarNoise {
    fn default() -> Self {
        Self {
            std_range: 0.3,
            std_bearing: 0.03,
            std_range_rate: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(UkfConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_noise() {
        let mut config = UkfConfig::default();
        config.process_noise.std_a = 0.0;
        match config.validate() {
            Err(FilterError::InvalidConfig { field, .. }) => {
                assert_eq!(field, "process_noise.std_a")
            }
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        let mut config = UkfConfig::default();
        config.radar.std_bearing = -0.03;
        assert!(config.validate().is_err());

        let mut config = UkfConfig::default();
        config.lidar.std_py = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_all_sensors_disabled() {
        let config = UkfConfig {
            use_lidar: false,
            use_radar: false,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FilterError::InvalidConfig { .. })
        ));
    }
}
