//! Bidirectional map between Cartesian vehicle states and Frenet states
//! relative to a curved reference line.
//!
//! Conventions: `s` is arc length along the reference, `d` the signed
//! lateral offset (left positive). The s-condition is `[s, s', s'']` with
//! time derivatives; the d-condition is `[d, d', d'']` with derivatives
//! taken w.r.t. arc length. The transform is singular where
//! `1 - κ_r · d ≤ 0` or the heading deviates from the reference by ~π/2;
//! both cases surface as [`PlanningError::GeometrySingular`] so callers can
//! drop the offending candidate.

use crate::core::math::normalize_angle;
use crate::error::{PlanningError, Result};
use crate::reference::ReferencePoint;

/// Cartesian motion state at a point.
#[derive(Clone, Copy, Debug, Default)]
pub struct CartesianState {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub kappa: f64,
    pub v: f64,
    pub a: f64,
}

const COS_EPS: f64 = 1e-6;

/// Map a Cartesian state to `([s, s', s''], [d, d', d''])` relative to the
/// matched reference point.
pub fn cartesian_to_frenet(
    ref_point: &ReferencePoint,
    state: &CartesianState,
) -> Result<([f64; 3], [f64; 3])> {
    let dx = state.x - ref_point.x;
    let dy = state.y - ref_point.y;

    let cos_theta_r = ref_point.theta.cos();
    let sin_theta_r = ref_point.theta.sin();

    let cross_rd_nd = cos_theta_r * dy - sin_theta_r * dx;
    let d0 = (dx * dx + dy * dy).sqrt().copysign(cross_rd_nd);

    let delta_theta = state.theta - ref_point.theta;
    let cos_delta_theta = delta_theta.cos();
    if cos_delta_theta.abs() < COS_EPS {
        return Err(PlanningError::GeometrySingular(format!(
            "heading orthogonal to reference (delta_theta = {:.3})",
            delta_theta
        )));
    }
    let tan_delta_theta = delta_theta.tan();

    let one_minus_kappa_r_d = 1.0 - ref_point.kappa * d0;
    if one_minus_kappa_r_d <= 0.0 {
        return Err(PlanningError::GeometrySingular(format!(
            "1 - kappa_r * d = {:.4} at s = {:.2}",
            one_minus_kappa_r_d, ref_point.s
        )));
    }

    let d1 = one_minus_kappa_r_d * tan_delta_theta;
    let kappa_r_d_prime = ref_point.dkappa * d0 + ref_point.kappa * d1;
    let d2 = -kappa_r_d_prime * tan_delta_theta
        + one_minus_kappa_r_d / cos_delta_theta / cos_delta_theta
            * (state.kappa * one_minus_kappa_r_d / cos_delta_theta - ref_point.kappa);

    let s0 = ref_point.s;
    let s1 = state.v * cos_delta_theta / one_minus_kappa_r_d;

    let delta_theta_prime = one_minus_kappa_r_d / cos_delta_theta * state.kappa - ref_point.kappa;
    let s2 = (state.a * cos_delta_theta - s1 * s1 * (d1 * delta_theta_prime - kappa_r_d_prime))
        / one_minus_kappa_r_d;

    Ok(([s0, s1, s2], [d0, d1, d2]))
}

/// Inverse of [`cartesian_to_frenet`]. The reference point must be the one
/// at `s_condition[0]`.
pub fn frenet_to_cartesian(
    ref_point: &ReferencePoint,
    s_condition: &[f64; 3],
    d_condition: &[f64; 3],
) -> Result<CartesianState> {
    if (ref_point.s - s_condition[0]).abs() >= 1e-6 {
        return Err(PlanningError::InvalidInput(format!(
            "reference point s {:.6} does not match s condition {:.6}",
            ref_point.s, s_condition[0]
        )));
    }

    let cos_theta_r = ref_point.theta.cos();
    let sin_theta_r = ref_point.theta.sin();

    let x = ref_point.x - sin_theta_r * d_condition[0];
    let y = ref_point.y + cos_theta_r * d_condition[0];

    let one_minus_kappa_r_d = 1.0 - ref_point.kappa * d_condition[0];
    if one_minus_kappa_r_d <= 0.0 {
        return Err(PlanningError::GeometrySingular(format!(
            "1 - kappa_r * d = {:.4} at s = {:.2}",
            one_minus_kappa_r_d, ref_point.s
        )));
    }

    let tan_delta_theta = d_condition[1] / one_minus_kappa_r_d;
    let delta_theta = d_condition[1].atan2(one_minus_kappa_r_d);
    let cos_delta_theta = delta_theta.cos();

    let theta = normalize_angle(delta_theta + ref_point.theta);

    let kappa_r_d_prime = ref_point.dkappa * d_condition[0] + ref_point.kappa * d_condition[1];
    let kappa = (((d_condition[2] + kappa_r_d_prime * tan_delta_theta)
        * cos_delta_theta
        * cos_delta_theta)
        / one_minus_kappa_r_d
        + ref_point.kappa)
        * cos_delta_theta
        / one_minus_kappa_r_d;

    let d_dot = d_condition[1] * s_condition[1];
    let v = (one_minus_kappa_r_d * one_minus_kappa_r_d * s_condition[1] * s_condition[1]
        + d_dot * d_dot)
        .sqrt();

    let delta_theta_prime = one_minus_kappa_r_d / cos_delta_theta * kappa - ref_point.kappa;
    let a = s_condition[2] * one_minus_kappa_r_d / cos_delta_theta
        + s_condition[1] * s_condition[1] / cos_delta_theta
            * (d_condition[1] * delta_theta_prime - kappa_r_d_prime);

    Ok(CartesianState {
        x,
        y,
        theta,
        kappa,
        v,
        a,
    })
}

/// Heading of a Frenet state expressed in world coordinates.
#[inline]
pub fn calc_theta(rtheta: f64, rkappa: f64, l: f64, dl: f64) -> f64 {
    normalize_angle(rtheta + dl.atan2(1.0 - l * rkappa))
}

/// World curvature of a Frenet state. Returns 0 near the singular
/// denominator to avoid division blow-up.
pub fn calc_kappa(rkappa: f64, rdkappa: f64, l: f64, dl: f64, ddl: f64) -> f64 {
    let one_minus = 1.0 - l * rkappa;
    let mut denominator = dl * dl + one_minus * one_minus;
    if denominator.abs() < 1e-8 {
        return 0.0;
    }
    denominator = denominator.powf(1.5);
    let numerator = rkappa + ddl - 2.0 * l * rkappa * rkappa - l * ddl * rkappa
        + l * l * rkappa * rkappa * rkappa
        + l * dl * rdkappa
        + 2.0 * dl * dl * rkappa;
    numerator / denominator
}

/// World position of a lateral offset `l` from a reference pose.
#[inline]
pub fn calc_cartesian_point(rtheta: f64, rx: f64, ry: f64, l: f64) -> (f64, f64) {
    (rx - l * rtheta.sin(), ry + l * rtheta.cos())
}

/// d' of a pose relative to a reference pose.
#[inline]
pub fn calc_lateral_derivative(rtheta: f64, theta: f64, l: f64, rkappa: f64) -> f64 {
    (1.0 - rkappa * l) * (theta - rtheta).tan()
}

/// d'' of a pose relative to a reference pose.
pub fn calc_second_order_lateral_derivative(
    rtheta: f64,
    theta: f64,
    rkappa: f64,
    kappa: f64,
    rdkappa: f64,
    l: f64,
) -> f64 {
    let dl = calc_lateral_derivative(rtheta, theta, l, rkappa);
    let theta_diff = theta - rtheta;
    let cos_theta_diff = theta_diff.cos();
    -(rdkappa * l + rkappa * dl) * theta_diff.tan()
        + (1.0 - rkappa * l) / (cos_theta_diff * cos_theta_diff)
            * (kappa * (1.0 - rkappa * l) / cos_theta_diff - rkappa)
}
