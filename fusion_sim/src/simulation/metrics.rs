// fusion_sim/src/simulation/metrics.rs

use fusion_core::estimation::nis::NisThresholds;
use fusion_core::messages::SensorKind;
use nalgebra::Vector4;
use std::fmt;

use crate::simulation::truth::CartesianTruth;

/// Running root-mean-square error of `[px, py, vx, vy]`.
#[derive(Debug, Clone, Default)]
pub struct RmseAccumulator {
    sum_sq: Vector4<f64>,
    count: usize,
}

impl RmseAccumulator {
    pub fn push(&mut self, estimate: &CartesianTruth, truth: &CartesianTruth) {
        let diff = estimate - truth;
        self.sum_sq += diff.component_mul(&diff);
        self.count += 1;
    }

    /// `None` until at least one sample has been pushed.
    pub fn rmse(&self) -> Option<Vector4<f64>> {
        (self.count > 0).then(|| (self.sum_sq / self.count as f64).map(f64::sqrt))
    }
}

/// NIS statistics for one sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NisStats {
    pub count: usize,
    pub sum: f64,
    /// Samples above the chi-square threshold.
    pub exceeded: usize,
}

impl NisStats {
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Fraction of samples above the threshold. About 5% for a consistent filter.
    pub fn exceeded_fraction(&self) -> Option<f64> {
        (self.count > 0).then(|| self.exceeded as f64 / self.count as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NisSummary {
    pub thresholds: NisThresholds,
    pub lidar: NisStats,
    pub radar: NisStats,
}

impl NisSummary {
    pub fn new(thresholds: NisThresholds) -> Self {
        Self {
            thresholds,
            ..Default::default()
        }
    }

    pub fn record(&mut self, kind: SensorKind, nis: f64) {
        let exceeded = self.thresholds.exceeds(kind, nis);
        let stats = self.get_mut(kind);
        stats.count += 1;
        stats.sum += nis;
        if exceeded {
            stats.exceeded += 1;
        }
    }

    pub fn get(&self, kind: SensorKind) -> &NisStats {
        match kind {
            SensorKind::Lidar => &self.lidar,
            SensorKind::Radar => &self.radar,
        }
    }

    fn get_mut(&mut self, kind: SensorKind) -> &mut NisStats {
        match kind {
            SensorKind::Lidar => &mut self.lidar,
            SensorKind::Radar => &mut self.radar,
        }
    }
}

impl fmt::Display for NisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in [SensorKind::Lidar, SensorKind::Radar] {
            let stats = self.get(kind);
            match (stats.mean(), stats.exceeded_fraction()) {
                (Some(mean), Some(fraction)) => writeln!(
                    f,
                    "  {kind} NIS: mean {mean:.3} over {} samples, {:.1}% above {:.3}",
                    stats.count,
                    fraction * 100.0,
                    self.thresholds.get(kind)
                )?,
                _ => writeln!(f, "  {kind} NIS: no samples")?,
            }
        }
        Ok(())
    }
}
