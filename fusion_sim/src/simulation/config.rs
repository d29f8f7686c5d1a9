// fusion_sim/src/simulation/config.rs

//! Scenario configuration: what the target does, how the sensors sample it,
//! and how the filter is tuned. Loaded from TOML with environment overrides.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use fusion_core::config::{LidarNoise, RadarNoise, UkfConfig};
use fusion_core::error::FilterError;
use fusion_core::estimation::nis::NisThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Prefix for environment overrides, e.g. `FUSION_SIMULATION__SEED=7`.
pub const ENV_PREFIX: &str = "FUSION_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scenario file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("invalid scenario value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// The root of a `scenario.toml` file. Every section is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub simulation: SimulationSettings,
    pub truth: TruthConfig,
    pub sensors: SensorsConfig,
    /// Tuning of the filter under test.
    pub filter: UkfConfig,
    pub nis_thresholds: NisThresholds,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Seed for the pseudo-random number generator. `None` draws from entropy.
    pub seed: Option<u64>,
    pub duration_seconds: f64,
    /// Leading measurements excluded from RMSE and NIS statistics.
    pub warmup_samples: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: Some(42),
            duration_seconds: 25.0,
            warmup_samples: 0,
        }
    }
}

/// The simulated target: a CTRV object driven by constant accelerations plus
/// optional Gaussian jitter on both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TruthConfig {
    /// `[px, py, v, yaw, yaw_rate]` at t = 0.
    pub initial_state: [f64; 5],
    /// Constant longitudinal acceleration (m/s^2).
    pub acceleration: f64,
    /// Constant yaw acceleration (rad/s^2).
    pub yaw_acceleration: f64,
    /// Std dev of the random longitudinal acceleration added every step.
    pub std_a: f64,
    /// Std dev of the random yaw acceleration added every step.
    pub std_yawdd: f64,
}

impl Default for TruthConfig {
    fn default() -> Self {
        Self {
            initial_state: [0.6, 0.6, 5.0, 0.0, 0.3],
            acceleration: 0.0,
            yaw_acceleration: 0.0,
            std_a: 0.0,
            std_yawdd: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorsConfig {
    pub lidar: LidarStream,
    pub radar: RadarStream,
}

/// When a sensor produces readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub period_seconds: f64,
    /// Time of the first sample.
    pub offset_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LidarStream {
    pub enabled: bool,
    pub period_seconds: f64,
    pub offset_seconds: f64,
    /// Noise actually injected into the simulated readings.
    pub noise: LidarNoise,
}

impl Default for LidarStream {
    fn default() -> Self {
        Self {
            enabled: true,
            period_seconds: 0.1,
            offset_seconds: 0.0,
            noise: LidarNoise::default(),
        }
    }
}

impl LidarStream {
    pub fn schedule(&self) -> Option<Schedule> {
        self.enabled.then_some(Schedule {
            period_seconds: self.period_seconds,
            offset_seconds: self.offset_seconds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadarStream {
    pub enabled: bool,
    pub period_seconds: f64,
    pub offset_seconds: f64,
    pub noise: RadarNoise,
}

impl Default for RadarStream {
    fn default() -> Self {
        Self {
            enabled: true,
            period_seconds: 0.1,
            offset_seconds: 0.05,
            noise: RadarNoise::default(),
        }
    }
}

impl RadarStream {
    pub fn schedule(&self) -> Option<Schedule> {
        self.enabled.then_some(Schedule {
            period_seconds: self.period_seconds,
            offset_seconds: self.offset_seconds,
        })
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

impl ScenarioConfig {
    /// Loads a scenario file on top of the defaults, then applies
    /// `FUSION_`-prefixed environment overrides (`__` separates nested keys).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        info!("Loading scenario from: {}", path.display());

        let figment = Self::defaults()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Parses a scenario from an in-memory TOML document. No environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::extract(Self::defaults().merge(Toml::string(toml)))
    }

    /// Renders the fully resolved scenario back to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(ScenarioConfig::default()))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;

        let sim = &self.simulation;
        require(
            "simulation.duration_seconds",
            sim.duration_seconds.is_finite() && sim.duration_seconds > 0.0,
            sim.duration_seconds,
        )?;

        let truth = &self.truth;
        require(
            "truth.initial_state",
            truth.initial_state.iter().all(|v| v.is_finite()),
            "non-finite component",
        )?;
        for (field, value) in [
            ("truth.acceleration", truth.acceleration),
            ("truth.yaw_acceleration", truth.yaw_acceleration),
        ] {
            require(field, value.is_finite(), value)?;
        }
        for (field, value) in [("truth.std_a", truth.std_a), ("truth.std_yawdd", truth.std_yawdd)] {
            require(field, value.is_finite() && value >= 0.0, value)?;
        }

        let lidar = &self.sensors.lidar;
        let radar = &self.sensors.radar;
        for (name, period, offset) in [
            ("sensors.lidar", lidar.period_seconds, lidar.offset_seconds),
            ("sensors.radar", radar.period_seconds, radar.offset_seconds),
        ] {
            require(
                name,
                period.is_finite() && period > 0.0,
                format!("period_seconds = {period}"),
            )?;
            require(
                name,
                offset.is_finite() && offset >= 0.0,
                format!("offset_seconds = {offset}"),
            )?;
        }
        require(
            "sensors",
            lidar.enabled || radar.enabled,
            "every sensor stream is disabled",
        )?;

        let lidar = &lidar.noise;
        let radar = &radar.noise;
        for (field, value) in [
            ("sensors.lidar.noise.std_px", lidar.std_px),
            ("sensors.lidar.noise.std_py", lidar.std_py),
            ("sensors.radar.noise.std_range", radar.std_range),
            ("sensors.radar.noise.std_bearing", radar.std_bearing),
            ("sensors.radar.noise.std_range_rate", radar.std_range_rate),
        ] {
            require(field, value.is_finite() && value >= 0.0, value)?;
        }

        Ok(())
    }
}

fn require(
    field: &'static str,
    ok: bool,
    got: impl std::fmt::Display,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: got.to_string(),
        })
    }
}
