// fusion_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the fusion_sim crate
// and for the integration tests.
pub mod prelude;

// Command-line surface of the `fusion_sim` binary.
pub mod cli;
// Scenario generation, replay and scoring.
pub mod simulation;
