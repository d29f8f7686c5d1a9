// fusion_sim/src/simulation/sensors.rs

use fusion_core::config::{LidarNoise, RadarNoise};
use fusion_core::messages::{MeasurementMessage, SensorKind};
use fusion_core::models::measurement::lidar::LidarModel;
use fusion_core::models::measurement::radar::RadarModel;
use fusion_core::models::measurement::MeasurementModel;
use fusion_core::types::{StateVector, Timestamp, MICROS_PER_SECOND};
use fusion_core::utils::angles::normalize_angle;
use rand_distr::{Distribution, Normal};

use crate::simulation::config::{ConfigError, Schedule};
use crate::simulation::prng::SimulationRng;

fn normal(field: &'static str, std: f64) -> Result<Normal<f64>, ConfigError> {
    Normal::new(0.0, std).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

// =========================================================================
// == Lidar ==
// =========================================================================

/// Reads the true position and adds independent Gaussian noise per axis.
#[derive(Debug, Clone)]
pub struct LidarSimulator {
    model: LidarModel,
    // Store the noise distributions for efficiency
    noise_x: Normal<f64>,
    noise_y: Normal<f64>,
}

impl LidarSimulator {
    pub fn new(noise: LidarNoise) -> Result<Self, ConfigError> {
        Ok(Self {
            model: LidarModel::new(noise),
            noise_x: normal("sensors.lidar.noise.std_px", noise.std_px)?,
            noise_y: normal("sensors.lidar.noise.std_py", noise.std_py)?,
        })
    }

    pub fn measure(
        &self,
        truth: &StateVector,
        timestamp_us: Timestamp,
        rng: &mut SimulationRng,
    ) -> MeasurementMessage {
        let perfect = self.model.project(truth);
        MeasurementMessage::lidar(
            timestamp_us,
            perfect[0] + self.noise_x.sample(&mut rng.0),
            perfect[1] + self.noise_y.sample(&mut rng.0),
        )
    }
}

// =========================================================================
// == Radar ==
// =========================================================================

/// Projects the true state into `(range, bearing, range_rate)` and adds noise.
/// The noisy bearing is wrapped back into (-pi, pi].
#[derive(Debug, Clone)]
pub struct RadarSimulator {
    model: RadarModel,
    noise_range: Normal<f64>,
    noise_bearing: Normal<f64>,
    noise_range_rate: Normal<f64>,
}

impl RadarSimulator {
    pub fn new(noise: RadarNoise) -> Result<Self, ConfigError> {
        Ok(Self {
            model: RadarModel::new(noise),
            noise_range: normal("sensors.radar.noise.std_range", noise.std_range)?,
            noise_bearing: normal("sensors.radar.noise.std_bearing", noise.std_bearing)?,
            noise_range_rate: normal(
                "sensors.radar.noise.std_range_rate",
                noise.std_range_rate,
            )?,
        })
    }

    pub fn measure(
        &self,
        truth: &StateVector,
        timestamp_us: Timestamp,
        rng: &mut SimulationRng,
    ) -> MeasurementMessage {
        let perfect = self.model.project(truth);
        MeasurementMessage::radar(
            timestamp_us,
            perfect[0] + self.noise_range.sample(&mut rng.0),
            normalize_angle(perfect[1] + self.noise_bearing.sample(&mut rng.0)),
            perfect[2] + self.noise_range_rate.sample(&mut rng.0),
        )
    }
}

// =========================================================================
// == Sampling Schedule ==
// =========================================================================

/// Every `(timestamp, sensor)` sample in `[0, duration]`, in time order.
///
/// When both sensors fire at the same instant the lidar sample comes first.
pub fn sample_times(
    duration_seconds: f64,
    lidar: Option<Schedule>,
    radar: Option<Schedule>,
) -> Vec<(Timestamp, SensorKind)> {
    let duration_us = (duration_seconds * MICROS_PER_SECOND).round() as Timestamp;

    let mut samples = Vec::new();
    for (kind, schedule) in [(SensorKind::Lidar, lidar), (SensorKind::Radar, radar)] {
        let Some(schedule) = schedule else { continue };
        let period_us = (schedule.period_seconds * MICROS_PER_SECOND).round() as Timestamp;
        let offset_us = (schedule.offset_seconds * MICROS_PER_SECOND).round() as Timestamp;
        if period_us <= 0 {
            continue;
        }
        samples.extend(
            (0..)
                .map(|k| offset_us + k * period_us)
                .take_while(|&t| t <= duration_us)
                .map(|t| (t, kind)),
        );
    }

    // Stable sort keeps lidar ahead of radar on ties.
    samples.sort_by_key(|&(t, _)| t);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fusion_core::messages::MeasurementData;

    fn schedule(period_seconds: f64, offset_seconds: f64) -> Option<Schedule> {
        Some(Schedule {
            period_seconds,
            offset_seconds,
        })
    }

    #[test]
    fn test_interleaved_schedule() {
        let samples = sample_times(0.2, schedule(0.1, 0.0), schedule(0.1, 0.05));
        assert_eq!(
            samples,
            vec![
                (0, SensorKind::Lidar),
                (50_000, SensorKind::Radar),
                (100_000, SensorKind::Lidar),
                (150_000, SensorKind::Radar),
                (200_000, SensorKind::Lidar),
            ]
        );
    }

    #[test]
    fn test_ties_and_disabled_streams() {
        let samples = sample_times(0.1, schedule(0.1, 0.0), schedule(0.1, 0.0));
        assert_eq!(samples[0], (0, SensorKind::Lidar));
        assert_eq!(samples[1], (0, SensorKind::Radar));

        let samples = sample_times(1.0, None, schedule(0.5, 0.0));
        assert!(samples.iter().all(|&(_, kind)| kind == SensorKind::Radar));
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_noise_free_radar_matches_projection() {
        let sim = RadarSimulator::new(RadarNoise {
            std_range: 0.0,
            std_bearing: 0.0,
            std_range_rate: 0.0,
        })
        .unwrap();
        let mut rng = SimulationRng::new(Some(1));
        let msg = sim.measure(&StateVector::new(3.0, 4.0, 1.0, 0.0, 0.0), 10, &mut rng);

        assert_eq!(msg.timestamp_us, 10);
        let MeasurementData::Radar(z) = msg.data else {
            panic!("expected a radar reading");
        };
        assert_abs_diff_eq!(z[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z[1], 4.0_f64.atan2(3.0), epsilon = 1e-12);
        assert_abs_diff_eq!(z[2], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_lidar_noise_statistics() {
        let sim = LidarSimulator::new(LidarNoise {
            std_px: 0.5,
            std_py: 0.5,
        })
        .unwrap();
        let mut rng = SimulationRng::new(Some(5));
        let truth = StateVector::new(10.0, -4.0, 0.0, 0.0, 0.0);

        let n = 5000;
        let (mut sum, mut sum_sq) = (0.0, 0.0);
        for _ in 0..n {
            let msg = sim.measure(&truth, 0, &mut rng);
            let dx = msg.data.as_slice()[0] - 10.0;
            sum += dx;
            sum_sq += dx * dx;
        }
        let mean = sum / n as f64;
        let std = (sum_sq / n as f64 - mean * mean).sqrt();
        assert!(mean.abs() < 0.05, "mean = {mean}");
        assert!((std - 0.5).abs() < 0.05, "std = {std}");
    }
}
