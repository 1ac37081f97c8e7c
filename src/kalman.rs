// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A stand-alone scalar (1-D) constant-position Kalman filter.
//!
//! This is not wired into the BBR control path (the path stays on integer
//! fixed-point arithmetic per [`crate::bbr::gain`]); it is a reusable
//! smoother for a caller that wants to denoise some other measurement
//! stream, e.g. a raw RTT sample before it reaches an RTT estimator.

/// Tracks a scalar measurement's estimate `x` and its error covariance `p`
/// given constant process noise `q` and measurement noise `r`.
#[derive(Clone, Copy, Debug)]
pub struct KalmanFilter {
    state: f64,
    covariance: f64,
    process_noise: f64,
    measurement_noise: f64,
    initialized: bool,
}

/// The covariance is never allowed to decay below this floor, which keeps
/// later updates from being swamped to the point of never reacting again.
const MIN_COVARIANCE: f64 = 1e-9;

impl KalmanFilter {
    /// Constructs a new filter with the given initial state, initial
    /// covariance, process noise and measurement noise.
    pub fn new(
        initial_state: f64,
        initial_covariance: f64,
        process_noise: f64,
        measurement_noise: f64,
    ) -> Self {
        Self {
            state: initial_state,
            covariance: initial_covariance,
            process_noise,
            measurement_noise,
            initialized: true,
        }
    }

    /// Constructs a filter that initializes its state from the first
    /// measurement passed to [`Self::update`].
    pub fn uninitialized(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            state: 0.0,
            covariance: 1.0,
            process_noise,
            measurement_noise,
            initialized: false,
        }
    }

    /// Resets the filter to its uninitialized state, keeping the configured
    /// process and measurement noise.
    pub fn reset(&mut self) {
        self.state = 0.0;
        self.covariance = 1.0;
        self.initialized = false;
    }

    /// Returns the current state estimate, or `0.0` if no measurement has
    /// ever been applied.
    pub fn get_estimate(&self) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        self.state
    }

    /// Advances the error covariance by one process step without folding in
    /// a new measurement. Useful when a caller knows time has passed but has
    /// no fresh sample yet.
    pub fn predict(&mut self) {
        if !self.initialized {
            return;
        }
        self.covariance += self.process_noise;
    }

    /// Folds a new measurement `z` into the estimate.
    pub fn update(&mut self, z: f64) {
        if !self.initialized {
            self.state = z;
            self.covariance = self.measurement_noise;
            self.initialized = true;
            return;
        }

        let predicted_covariance = self.covariance + self.process_noise;
        let gain = predicted_covariance / (predicted_covariance + self.measurement_noise);

        self.state += gain * (z - self.state);
        self.covariance = (1.0 - gain) * predicted_covariance;
        if self.covariance < MIN_COVARIANCE {
            self.covariance = MIN_COVARIANCE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_estimate_is_zero() {
        let filter = KalmanFilter::uninitialized(0.01, 1.0);
        assert_eq!(0.0, filter.get_estimate());
    }

    #[test]
    fn first_update_takes_the_measurement_verbatim() {
        let mut filter = KalmanFilter::uninitialized(0.01, 1.0);
        filter.update(42.0);
        assert_eq!(42.0, filter.get_estimate());
    }

    #[test]
    fn converges_toward_a_constant_measurement() {
        let mut filter = KalmanFilter::uninitialized(0.001, 1.0);
        for _ in 0..200 {
            filter.update(10.0);
        }
        assert!((filter.get_estimate() - 10.0).abs() < 0.1);
    }

    #[test]
    fn covariance_floor_is_respected() {
        let mut filter = KalmanFilter::new(0.0, 1.0, 0.0, 1e-12);
        for _ in 0..1000 {
            filter.update(1.0);
        }
        // With process noise at 0 the covariance would otherwise collapse to 0
        assert!(filter.covariance >= MIN_COVARIANCE);
    }

    #[test]
    fn reset_clears_state_and_initialization() {
        let mut filter = KalmanFilter::new(5.0, 2.0, 0.01, 1.0);
        filter.update(9.0);
        filter.reset();
        assert_eq!(0.0, filter.get_estimate());
        assert!(!filter.initialized);
    }

    #[test]
    fn predict_only_inflates_covariance() {
        let mut filter = KalmanFilter::new(1.0, 1.0, 0.5, 1.0);
        filter.predict();
        assert_eq!(1.5, filter.covariance);
        assert_eq!(1.0, filter.get_estimate());
    }
}
