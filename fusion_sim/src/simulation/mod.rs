// fusion_sim/src/simulation/mod.rs

//! Everything needed to exercise the filter offline: synthetic targets and
//! sensors, recorded-log replay, and scoring.

pub mod config;
pub mod metrics;
pub mod prng;
pub mod replay;
pub mod runner;
pub mod sensors;
pub mod truth;
