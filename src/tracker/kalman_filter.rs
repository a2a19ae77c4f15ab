//! Constant-velocity Kalman filter over `(cx, cy, aspect, h)` box measurements.
//!
//! The state is 8-dimensional: the four measurement components followed by
//! their velocities. Process and measurement noise scale with box height.

use ndarray::{Array1, Array2};

/// 0.95 quantile of the chi-square distribution with 4 degrees of freedom.
/// Squared Mahalanobis distances above this are considered implausible.
pub const CHI2_GATE_4DOF: f64 = 9.4877;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let ndim = 4;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Create a track state from an unassociated measurement. Velocities start at zero.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(8);
        for i in 0..4 {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];

        (mean, diagonal(&std))
    }

    /// Propagate the state one frame ahead. Uncertainty grows by the motion noise.
    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + diagonal(&std);

        (new_mean, new_covariance)
    }

    /// Project the state into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ];

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + diagonal(&std);

        (mean_proj, covariance_proj)
    }

    /// Correct the state with an observed measurement.
    ///
    /// Returns `None` when the innovation covariance is singular; the caller
    /// keeps its predicted state in that case.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Option<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let s_inv = invert_4x4(&projected_cov)?;

        let innovation = Array1::from_vec(measurement.to_vec()) - projected_mean;

        // H = [I 0], so P * H^T is the first four columns of P.
        let pht = covariance.dot(&self.update_mat.t());
        let kalman_gain = pht.dot(&s_inv);

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Some((new_mean, new_covariance))
    }

    /// Squared Mahalanobis distance between the projected state and each measurement.
    ///
    /// A singular projection yields `f64::INFINITY` for every measurement.
    pub fn gating_distance(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurements: &[[f64; 4]],
    ) -> Vec<f64> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let Some(s_inv) = invert_4x4(&projected_cov) else {
            return vec![f64::INFINITY; measurements.len()];
        };

        measurements
            .iter()
            .map(|m| {
                let d = Array1::from_vec(m.to_vec()) - &projected_mean;
                d.dot(&s_inv.dot(&d))
            })
            .collect()
    }
}

fn diagonal(std: &[f64]) -> Array2<f64> {
    let mut cov = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        cov[[i, i]] = s * s;
    }
    cov
}

/// Invert a 4x4 matrix through nalgebra, keeping the filter free of BLAS/LAPACK.
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((4, 4), |(i, j)| inv[(i, j)]))
}
