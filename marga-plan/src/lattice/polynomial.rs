//! Quartic and quintic motion polynomials.
//!
//! Both give closed-form position and derivatives over `[0, end_time]`. The
//! quartic fixes the start state and the end velocity/acceleration, leaving
//! the end position free (velocity keeping); the quintic fixes the full
//! boundary (position targeting).

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

use crate::error::{PlanningError, Result};

/// Closed-form 1D motion primitive.
pub trait Polynomial: Send + Sync {
    fn position(&self, t: f64) -> f64;
    fn velocity(&self, t: f64) -> f64;
    fn acceleration(&self, t: f64) -> f64;
    fn jerk(&self, t: f64) -> f64;
    fn end_time(&self) -> f64;

    /// Position reached at the end of the horizon.
    fn end_position(&self) -> f64 {
        self.position(self.end_time())
    }
}

/// Degree-4 polynomial: fixed `(x0, v0, a0)` and `(v1, a1)` at `t = T`.
pub struct QuarticPolynomial {
    coef: [f64; 5],
    end_t: f64,
}

impl QuarticPolynomial {
    pub fn new(x0: f64, v0: f64, a0: f64, v1: f64, a1: f64, end_t: f64) -> Result<Self> {
        if end_t <= 0.0 {
            return Err(PlanningError::InvalidInput(
                "polynomial horizon must be positive".into(),
            ));
        }
        let c0 = x0;
        let c1 = v0;
        let c2 = a0 / 2.0;

        let t2 = end_t * end_t;
        let t3 = t2 * end_t;
        let a = Matrix2::new(3.0 * t2, 4.0 * t3, 6.0 * end_t, 12.0 * t2);
        let b = Vector2::new(v1 - c1 - 2.0 * c2 * end_t, a1 - 2.0 * c2);
        let x = a
            .try_inverse()
            .map(|inv| inv * b)
            .ok_or(PlanningError::InfeasibleTrajectory)?;

        Ok(Self {
            coef: [c0, c1, c2, x[0], x[1]],
            end_t,
        })
    }
}

impl Polynomial for QuarticPolynomial {
    fn position(&self, t: f64) -> f64 {
        let c = &self.coef;
        c[0] + c[1] * t + c[2] * t * t + c[3] * t.powi(3) + c[4] * t.powi(4)
    }

    fn velocity(&self, t: f64) -> f64 {
        let c = &self.coef;
        c[1] + 2.0 * c[2] * t + 3.0 * c[3] * t * t + 4.0 * c[4] * t.powi(3)
    }

    fn acceleration(&self, t: f64) -> f64 {
        let c = &self.coef;
        2.0 * c[2] + 6.0 * c[3] * t + 12.0 * c[4] * t * t
    }

    fn jerk(&self, t: f64) -> f64 {
        let c = &self.coef;
        6.0 * c[3] + 24.0 * c[4] * t
    }

    fn end_time(&self) -> f64 {
        self.end_t
    }
}

/// Degree-5 polynomial: fixed `(x0, v0, a0)` and `(x1, v1, a1)` at `t = T`.
pub struct QuinticPolynomial {
    coef: [f64; 6],
    end_t: f64,
}

impl QuinticPolynomial {
    #[allow(clippy::too_many_arguments)]
    pub fn new(x0: f64, v0: f64, a0: f64, x1: f64, v1: f64, a1: f64, end_t: f64) -> Result<Self> {
        if end_t <= 0.0 {
            return Err(PlanningError::InvalidInput(
                "polynomial horizon must be positive".into(),
            ));
        }
        let c0 = x0;
        let c1 = v0;
        let c2 = a0 / 2.0;

        let t2 = end_t * end_t;
        let t3 = t2 * end_t;
        let t4 = t3 * end_t;
        let t5 = t4 * end_t;
        let a = Matrix3::new(
            t3,
            t4,
            t5,
            3.0 * t2,
            4.0 * t3,
            5.0 * t4,
            6.0 * end_t,
            12.0 * t2,
            20.0 * t3,
        );
        let b = Vector3::new(
            x1 - c0 - c1 * end_t - c2 * t2,
            v1 - c1 - 2.0 * c2 * end_t,
            a1 - 2.0 * c2,
        );
        let x = a
            .try_inverse()
            .map(|inv| inv * b)
            .ok_or(PlanningError::InfeasibleTrajectory)?;

        Ok(Self {
            coef: [c0, c1, c2, x[0], x[1], x[2]],
            end_t,
        })
    }
}

impl Polynomial for QuinticPolynomial {
    fn position(&self, t: f64) -> f64 {
        let c = &self.coef;
        c[0] + c[1] * t + c[2] * t * t + c[3] * t.powi(3) + c[4] * t.powi(4) + c[5] * t.powi(5)
    }

    fn velocity(&self, t: f64) -> f64 {
        let c = &self.coef;
        c[1] + 2.0 * c[2] * t
            + 3.0 * c[3] * t * t
            + 4.0 * c[4] * t.powi(3)
            + 5.0 * c[5] * t.powi(4)
    }

    fn acceleration(&self, t: f64) -> f64 {
        let c = &self.coef;
        2.0 * c[2] + 6.0 * c[3] * t + 12.0 * c[4] * t * t + 20.0 * c[5] * t.powi(3)
    }

    fn jerk(&self, t: f64) -> f64 {
        let c = &self.coef;
        6.0 * c[3] + 24.0 * c[4] * t + 60.0 * c[5] * t * t
    }

    fn end_time(&self) -> f64 {
        self.end_t
    }
}
