// fusion_core/src/estimation/filters/ukf.rs

use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

// --- Core Library Imports ---
use crate::config::UkfConfig;
use crate::error::FilterError;
use crate::estimation::nis::{normalized_innovation_squared, NisDiagnostics};
use crate::estimation::sigma_points::{
    augment, generate_augmented_sigma_points, predict_mean_and_covariance, sigma_weights,
    state_residual,
};
use crate::estimation::{ProcessOutcome, StateEstimator};
use crate::messages::{MeasurementMessage, SensorKind};
use crate::models::dynamics::ctrv::CtrvModel;
use crate::models::measurement::lidar::LidarModel;
use crate::models::measurement::radar::RadarModel;
use crate::models::measurement::MeasurementModel;
use crate::state::{CtrvState, StateVariable};
use crate::types::{
    SigmaPoints, SigmaWeights, StateCovariance, StateVector, Timestamp, MICROS_PER_SECOND,
    SIGMA_COUNT, STATE_DIM,
};

/// Result of the prediction stage. Lives only until the update commits.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub state: CtrvState,
    /// The propagated sigma points, reused by the update instead of regenerating.
    pub sigma_points: SigmaPoints,
}

/// Result of the correction stage, not yet committed to the filter.
#[derive(Debug, Clone)]
pub struct Correction {
    pub state: CtrvState,
    pub nis: f64,
}

/// Unscented Kalman Filter over the CTRV state `[px, py, v, yaw, yaw_rate]`,
/// fusing lidar and radar measurements.
///
/// Each instance tracks exactly one object and owns all of its state.
#[derive(Debug, Clone)]
pub struct UnscentedKalmanFilter {
    config: UkfConfig,
    dynamics: CtrvModel,
    // A map from a sensor kind to its update strategy. Only enabled sensors
    // are present, so a missing entry means "ignore this measurement".
    measurement_models: HashMap<SensorKind, Box<dyn MeasurementModel>>,

    // --- UKF-specific internal state ---
    /// Weights for recombining the `2n+1` sigma points.
    weights: SigmaWeights,
    /// `None` until the first accepted measurement.
    state: Option<CtrvState>,
    /// Sigma points of the last committed prediction.
    predicted_sigma_points: Option<SigmaPoints>,
    nis: NisDiagnostics,
}

impl UnscentedKalmanFilter {
    /// Creates an uninitialized filter. Fails if the configuration is invalid.
    pub fn new(config: UkfConfig) -> Result<Self, FilterError> {
        config.validate()?;

        let mut measurement_models: HashMap<SensorKind, Box<dyn MeasurementModel>> =
            HashMap::new();
        if config.use_lidar {
            measurement_models.insert(SensorKind::Lidar, Box::new(LidarModel::new(config.lidar)));
        }
        if config.use_radar {
            measurement_models.insert(SensorKind::Radar, Box::new(RadarModel::new(config.radar)));
        }

        Ok(Self {
            config,
            dynamics: CtrvModel::new(config.process_noise),
            measurement_models,
            weights: sigma_weights(),
            state: None,
            predicted_sigma_points: None,
            nis: NisDiagnostics::default(),
        })
    }

    // --- Accessors ---

    pub fn config(&self) -> &UkfConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Current mean, or `None` before the first measurement.
    pub fn state(&self) -> Option<&StateVector> {
        self.state.as_ref().map(|s| &s.vector)
    }

    /// Current covariance, or `None` before the first measurement.
    pub fn covariance(&self) -> Option<&StateCovariance> {
        self.state.as_ref().map(|s| &s.covariance)
    }

    /// Time of the last processed measurement.
    pub fn timestamp_us(&self) -> Option<Timestamp> {
        self.state.as_ref().map(|s| s.last_update_timestamp)
    }

    /// Last NIS produced by the given sensor.
    pub fn nis(&self, kind: SensorKind) -> Option<f64> {
        self.nis.get(kind)
    }

    pub fn nis_diagnostics(&self) -> &NisDiagnostics {
        &self.nis
    }

    pub fn predicted_sigma_points(&self) -> Option<&SigmaPoints> {
        self.predicted_sigma_points.as_ref()
    }

    /// Forgets the estimate; the next accepted measurement initializes again.
    pub fn reset(&mut self) {
        self.state = None;
        self.predicted_sigma_points = None;
        self.nis = NisDiagnostics::default();
    }

    // --- The Public Entry Point ---

    /// Processes one measurement: initializes on the first accepted one,
    /// otherwise runs predict + update.
    ///
    /// Everything is computed into temporaries; the filter is only mutated
    /// once the whole cycle has succeeded.
    pub fn process_measurement(
        &mut self,
        message: &MeasurementMessage,
    ) -> Result<ProcessOutcome, FilterError> {
        let kind = message.kind();

        // Look up the correct measurement model for the sensor that sent this message.
        let model = match self.measurement_models.get(&kind) {
            Some(m) => m,
            None => {
                // The sensor is disabled, so we ignore its data.
                trace!(sensor = %kind, "ignoring measurement from disabled sensor");
                return Ok(ProcessOutcome::Ignored);
            }
        };

        if !message.data.is_finite() {
            warn!(sensor = %kind, timestamp_us = message.timestamp_us, "rejecting non-finite measurement");
            return Err(FilterError::NonFiniteMeasurement { kind });
        }
        let z = message.data.to_dvector();

        let prior = match &self.state {
            Some(state) => state,
            None => {
                let initial = Self::initialize(model.as_ref(), &z, message.timestamp_us);
                debug!(sensor = %kind, state = ?initial.vector.as_slice(), "filter initialized");
                self.state = Some(initial);
                return Ok(ProcessOutcome::Initialized);
            }
        };

        if message.timestamp_us < prior.last_update_timestamp {
            warn!(
                previous_us = prior.last_update_timestamp,
                current_us = message.timestamp_us,
                "rejecting out-of-order measurement"
            );
            return Err(FilterError::TimestampRegression {
                previous_us: prior.last_update_timestamp,
                current_us: message.timestamp_us,
            });
        }

        // 1. Calculate the time delta since our last update.
        let elapsed_us = message
            .timestamp_us
            .checked_sub(prior.last_update_timestamp)
            .ok_or(FilterError::TimestampOverflow {
                previous_us: prior.last_update_timestamp,
                current_us: message.timestamp_us,
            })?;
        let dt = elapsed_us as f64 / MICROS_PER_SECOND;

        // 2. PREDICT: Advance the state to the exact time of the measurement.
        // 3. UPDATE: Now that we're at the correct time, fuse the measurement.
        let cycle = self
            .predict(prior, dt)
            .and_then(|prediction| {
                self.update(model.as_ref(), &prediction, &z)
                    .map(|correction| (prediction, correction))
            });

        let (prediction, mut correction) = match cycle {
            Ok(result) => result,
            Err(e) => {
                warn!(sensor = %kind, timestamp_us = message.timestamp_us, error = %e, "measurement cycle aborted");
                return Err(e);
            }
        };

        // 4. Commit.
        correction.state.last_update_timestamp = message.timestamp_us;
        let nis = correction.nis;
        debug!(sensor = %kind, dt, nis, "measurement fused");

        self.state = Some(correction.state);
        self.predicted_sigma_points = Some(prediction.sigma_points);
        self.nis.record(kind, nis);

        Ok(ProcessOutcome::Updated { sensor: kind, nis })
    }

    // --- Private Helper Methods for the UKF Algorithm ---

    /// Seeds the state from a single measurement: position from the sensor,
    /// zero speed, heading and yaw rate, identity covariance.
    fn initialize(model: &dyn MeasurementModel, z: &DVector<f64>, timestamp: Timestamp) -> CtrvState {
        let position = model.initial_position(z);
        let mut vector = StateVector::zeros();
        vector[StateVariable::Px.index()] = position.x;
        vector[StateVariable::Py.index()] = position.y;

        CtrvState::new(vector, StateCovariance::identity(), timestamp)
    }

    /// The "predict" step. Advances the state `dt` seconds without touching `self`.
    pub fn predict(&self, prior: &CtrvState, dt: f64) -> Result<Prediction, FilterError> {
        // --- 1. Augment and generate sigma points ---
        let (x_aug, p_aug) = augment(
            &prior.vector,
            &prior.covariance,
            &self.dynamics.noise_covariance(),
        );
        let augmented_points = generate_augmented_sigma_points(&x_aug, &p_aug)?;

        // --- 2. Propagate each point through the NON-LINEAR dynamics model ---
        let sigma_points = self.dynamics.propagate_sigma_points(&augmented_points, dt);

        // --- 3. Recover the predicted mean and covariance ---
        let (vector, covariance) = predict_mean_and_covariance(&sigma_points, &self.weights);

        let mut state = CtrvState::new(vector, covariance, prior.last_update_timestamp);
        state.tidy();

        Ok(Prediction {
            state,
            sigma_points,
        })
    }

    /// The shared "update" step. Fuses measurement `z` into a prediction using
    /// whichever update strategy `model` supplies.
    pub fn update(
        &self,
        model: &dyn MeasurementModel,
        prediction: &Prediction,
        z: &DVector<f64>,
    ) -> Result<Correction, FilterError> {
        let sensor = model.kind();
        let m = model.dim();
        let x = &prediction.state.vector;

        // --- 1. Project the predicted sigma points into measurement space ---
        let z_sigma = model.project_sigma_points(&prediction.sigma_points);

        // --- 2. Recover the predicted measurement and its covariance ---
        let z_pred = model.mean(&z_sigma, &self.weights);

        let mut s_cov = DMatrix::zeros(m, m);
        let mut t_cov = DMatrix::zeros(STATE_DIM, m);
        for i in 0..SIGMA_COUNT {
            let diff_z = model.residual(&z_sigma.column(i).into_owned(), &z_pred);
            let point: StateVector = prediction.sigma_points.column(i).into_owned();
            let diff_x = DVector::from_column_slice(state_residual(&point, x).as_slice());

            s_cov += self.weights[i] * &diff_z * diff_z.transpose();
            t_cov += self.weights[i] * &diff_x * diff_z.transpose();
        }
        s_cov += model.noise_covariance(); // Add measurement noise R

        // --- 3. Kalman gain ---
        let s_inv = s_cov
            .clone()
            .try_inverse()
            .ok_or(FilterError::SingularInnovationCovariance { sensor })?;
        let k_gain = &t_cov * &s_inv;

        // --- 4. Update state and covariance ---
        let innovation = model.residual(z, &z_pred);
        let nis = normalized_innovation_squared(&innovation, &s_inv);

        let dx = &k_gain * &innovation;
        let dp = &k_gain * &s_cov * k_gain.transpose();

        let mut state = prediction.state.clone();
        state.vector += StateVector::from_column_slice(dx.as_slice());
        state.covariance -= StateCovariance::from_column_slice(dp.as_slice());
        state.tidy();

        if !state.is_finite() || !nis.is_finite() {
            return Err(FilterError::NonFiniteState { sensor });
        }

        Ok(Correction { state, nis })
    }
}

// --- The Public Trait Implementation ---
impl StateEstimator for UnscentedKalmanFilter {
    fn process(&mut self, message: &MeasurementMessage) -> Result<ProcessOutcome, FilterError> {
        self.process_measurement(message)
    }

    fn get_state(&self) -> Option<&CtrvState> {
        self.state.as_ref()
    }
}
