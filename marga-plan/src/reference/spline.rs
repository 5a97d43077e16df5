//! Natural cubic spline used to resample route waypoints into a smooth,
//! curvature-annotated reference line.

/// 1D natural cubic spline through `(knots[i], values[i])`.
pub struct CubicSpline1d {
    knots: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl CubicSpline1d {
    /// Fit a natural spline. Requires at least two knots with strictly
    /// increasing positions.
    pub fn new(knots: &[f64], values: &[f64]) -> Self {
        assert_eq!(knots.len(), values.len());
        assert!(knots.len() >= 2);
        let n = knots.len();
        let a = values.to_vec();
        let mut b = vec![0.0; n];
        let mut c = vec![0.0; n];
        let mut d = vec![0.0; n];

        let h: Vec<f64> = (0..n - 1).map(|i| knots[i + 1] - knots[i]).collect();

        let mut alpha = vec![0.0; n];
        for i in 1..n - 1 {
            alpha[i] = 3.0 / h[i] * (a[i + 1] - a[i]) - 3.0 / h[i - 1] * (a[i] - a[i - 1]);
        }

        // Thomas algorithm on the tridiagonal system
        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (knots[i + 1] - knots[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (a[j + 1] - a[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        Self {
            knots: knots.to_vec(),
            a,
            b,
            c,
            d,
        }
    }

    fn segment(&self, t: f64) -> usize {
        match self
            .knots
            .binary_search_by(|k| k.partial_cmp(&t).unwrap_or(std::cmp::Ordering::Equal))
        {
            Ok(i) => i.min(self.knots.len() - 2),
            Err(i) => i.saturating_sub(1).min(self.knots.len() - 2),
        }
    }

    pub fn value(&self, t: f64) -> f64 {
        let i = self.segment(t);
        let dx = t - self.knots[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx * dx + self.d[i] * dx * dx * dx
    }

    pub fn derivative(&self, t: f64) -> f64 {
        let i = self.segment(t);
        let dx = t - self.knots[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx * dx
    }

    pub fn second_derivative(&self, t: f64) -> f64 {
        let i = self.segment(t);
        let dx = t - self.knots[i];
        2.0 * self.c[i] + 6.0 * self.d[i] * dx
    }

    pub fn third_derivative(&self, t: f64) -> f64 {
        let i = self.segment(t);
        6.0 * self.d[i]
    }
}

/// 2D spline parameterized by cumulative chord length.
pub struct CubicSpline2d {
    s: Vec<f64>,
    sx: CubicSpline1d,
    sy: CubicSpline1d,
}

impl CubicSpline2d {
    pub fn new(x: &[f64], y: &[f64]) -> Self {
        let mut s = vec![0.0];
        for i in 1..x.len() {
            let ds = ((x[i] - x[i - 1]).powi(2) + (y[i] - y[i - 1]).powi(2)).sqrt();
            s.push(s[i - 1] + ds);
        }
        let sx = CubicSpline1d::new(&s, x);
        let sy = CubicSpline1d::new(&s, y);
        Self { s, sx, sy }
    }

    pub fn total_length(&self) -> f64 {
        *self.s.last().expect("spline has knots")
    }

    pub fn position(&self, s: f64) -> (f64, f64) {
        (self.sx.value(s), self.sy.value(s))
    }

    pub fn heading(&self, s: f64) -> f64 {
        self.sy.derivative(s).atan2(self.sx.derivative(s))
    }

    pub fn curvature(&self, s: f64) -> f64 {
        let dx = self.sx.derivative(s);
        let ddx = self.sx.second_derivative(s);
        let dy = self.sy.derivative(s);
        let ddy = self.sy.second_derivative(s);
        let denom = (dx * dx + dy * dy).powf(1.5);
        if denom < 1e-12 {
            return 0.0;
        }
        (ddy * dx - ddx * dy) / denom
    }

    /// d(kappa)/ds, from the analytic curvature derivative.
    pub fn curvature_rate(&self, s: f64) -> f64 {
        let dx = self.sx.derivative(s);
        let dy = self.sy.derivative(s);
        let ddx = self.sx.second_derivative(s);
        let ddy = self.sy.second_derivative(s);
        let dddx = self.sx.third_derivative(s);
        let dddy = self.sy.third_derivative(s);
        let g = dx * dx + dy * dy;
        if g < 1e-12 {
            return 0.0;
        }
        let num = dddy * dx - dddx * dy;
        let cross = ddy * dx - ddx * dy;
        let gdot = 2.0 * (dx * ddx + dy * ddy);
        num / g.powf(1.5) - 1.5 * cross * gdot / g.powf(2.5)
    }
}
