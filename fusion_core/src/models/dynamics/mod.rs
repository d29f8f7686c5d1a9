// fusion_core/src/models/dynamics/mod.rs

//! Motion models used by the predictor.

pub mod ctrv;
