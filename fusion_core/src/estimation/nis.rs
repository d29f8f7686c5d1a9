// fusion_core/src/estimation/nis.rs

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::messages::SensorKind;

/// `NIS = y^T S^-1 y` for an innovation `y` and inverse innovation covariance `S^-1`.
pub fn normalized_innovation_squared(innovation: &DVector<f64>, s_inv: &DMatrix<f64>) -> f64 {
    (innovation.transpose() * s_inv * innovation)[(0, 0)]
}

/// Last NIS value per sensor. `None` until that sensor has been fused once.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NisDiagnostics {
    pub lidar: Option<f64>,
    pub radar: Option<f64>,
}

impl NisDiagnostics {
    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Lidar => self.lidar,
            SensorKind::Radar => self.radar,
        }
    }

    pub(crate) fn record(&mut self, kind: SensorKind, nis: f64) {
        match kind {
            SensorKind::Lidar => self.lidar = Some(nis),
            SensorKind::Radar => self.radar = Some(nis),
        }
    }
}

/// Chi-square critical values used to flag inconsistent updates.
///
/// For a consistent filter the NIS of a `k`-dimensional measurement follows
/// a chi-square distribution with `k` degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NisThresholds {
    /// Critical value for the 2-dof lidar NIS.
    pub lidar: f64,
    /// Critical value for the 3-dof radar NIS.
    pub radar: f64,
}

impl NisThresholds {
    /// 95% quantile of chi-square with 2 degrees of freedom.
    pub const CHI2_95_2DOF: f64 = 5.991;
    /// 95% quantile of chi-square with 3 degrees of freedom.
    pub const CHI2_95_3DOF: f64 = 7.815;

    pub fn get(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Lidar => self.lidar,
            SensorKind::Radar => self.radar,
        }
    }

    pub fn exceeds(&self, kind: SensorKind, nis: f64) -> bool {
        nis > self.get(kind)
    }
}

impl Default for NisThresholds {
    fn default() -> Self {
        Self {
            lidar: Self::CHI2_95_2DOF,
            radar: Self::CHI2_95_3DOF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_nis_with_diagonal_covariance() {
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let s_inv = DMatrix::from_diagonal(&DVector::from_vec(vec![0.5, 0.25]));
        assert_abs_diff_eq!(normalized_innovation_squared(&y, &s_inv), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_record_overwrites_only_its_sensor() {
        let mut diagnostics = NisDiagnostics::default();
        assert_eq!(diagnostics.get(SensorKind::Lidar), None);

        diagnostics.record(SensorKind::Lidar, 1.0);
        diagnostics.record(SensorKind::Lidar, 2.5);
        assert_eq!(diagnostics.get(SensorKind::Lidar), Some(2.5));
        assert_eq!(diagnostics.get(SensorKind::Radar), None);
    }

    #[test]
    fn test_thresholds() {
        let thresholds = NisThresholds::default();
        assert!(thresholds.exceeds(SensorKind::Lidar, 6.0));
        assert!(!thresholds.exceeds(SensorKind::Radar, 6.0));
    }
}
