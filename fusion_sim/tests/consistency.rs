// fusion_sim/tests/consistency.rs

//! Scenario-level checks: when the filter's noise model matches the one used
//! to generate the data, its NIS should follow the chi-square distribution.

use fusion_sim::prelude::*;
use std::path::Path;

/// A target whose random accelerations match the filter's process noise.
fn matched_scenario(seed: u64) -> ScenarioConfig {
    let mut config = ScenarioConfig::default();
    config.simulation.seed = Some(seed);
    config.simulation.duration_seconds = 30.0;
    config.simulation.warmup_samples = 20;

    config.truth.initial_state = [30.0, 20.0, 3.0, 0.5, 0.1];
    config.truth.std_a = 0.5;
    config.truth.std_yawdd = 0.2;

    config.sensors.lidar.period_seconds = 0.05;
    config.sensors.radar.period_seconds = 0.05;
    config.sensors.radar.offset_seconds = 0.025;

    config.filter.process_noise = ProcessNoise {
        std_a: 0.5,
        std_yawdd: 0.2,
    };
    config
}

#[test]
fn matched_noise_gives_chi_square_nis() {
    let report = run_scenario(&matched_scenario(7)).unwrap();
    assert_eq!(report.rejected, 0, "{report}");

    // E[NIS] equals the measurement dimension for a consistent filter.
    let lidar = report.nis.get(SensorKind::Lidar);
    let radar = report.nis.get(SensorKind::Radar);
    let lidar_mean = lidar.mean().unwrap();
    let radar_mean = radar.mean().unwrap();
    assert!((1.0..3.5).contains(&lidar_mean), "{report}");
    assert!((1.5..5.0).contains(&radar_mean), "{report}");

    // Roughly 5% of samples above the 95% quantile; allow a generous margin.
    assert!(lidar.exceeded_fraction().unwrap() < 0.2, "{report}");
    assert!(radar.exceeded_fraction().unwrap() < 0.2, "{report}");
}

#[test]
fn overconfident_filter_shows_inflated_nis() {
    let matched = run_scenario(&matched_scenario(11)).unwrap();

    let mut config = matched_scenario(11);
    // The filter now believes lidar is ten times more precise than it is.
    config.filter.lidar = LidarNoise {
        std_px: 0.015,
        std_py: 0.015,
    };
    let overconfident = run_scenario(&config).unwrap();

    let matched_nis = matched.nis.lidar.mean().unwrap();
    let inflated_nis = overconfident.nis.lidar.mean().unwrap_or(f64::INFINITY);
    assert!(
        inflated_nis > 2.0 * matched_nis,
        "matched {matched_nis}, overconfident {inflated_nis}"
    );
}

#[test]
fn fusing_both_sensors_beats_radar_alone() {
    let fused = run_scenario(&matched_scenario(3)).unwrap();

    let mut config = matched_scenario(3);
    config.filter.use_lidar = false;
    let radar_only = run_scenario(&config).unwrap();

    let fused_rmse = fused.rmse.unwrap();
    let radar_rmse = radar_only.rmse.unwrap();
    assert!(fused_rmse[0] < radar_rmse[0], "fused {fused_rmse} radar {radar_rmse}");
    assert!(fused_rmse[1] < radar_rmse[1], "fused {fused_rmse} radar {radar_rmse}");
}

#[test]
fn bundled_scenario_loads_and_runs() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/scenarios/default.toml");
    let config = ScenarioConfig::load(&path).unwrap();
    assert_eq!(config.simulation.seed, Some(42));

    let report = run_scenario(&config).unwrap();
    let rmse = report.rmse.unwrap();
    assert!(rmse[0] < 0.3 && rmse[1] < 0.3, "{report}");
}

#[test]
fn same_seed_same_report() {
    let a = run_scenario(&matched_scenario(5)).unwrap();
    let b = run_scenario(&matched_scenario(5)).unwrap();
    assert_eq!(a.final_state, b.final_state);
    assert_eq!(a.nis, b.nis);
}
