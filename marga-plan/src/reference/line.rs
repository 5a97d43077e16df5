//! Arc-length-parameterized lane centerline.
//!
//! A [`ReferenceLine`] is built once per tick from route waypoints and shared
//! read-only by the maneuver planner, the end-condition sampler and the
//! lattice planner. No interior mutation after construction.

use serde::{Deserialize, Serialize};

use super::spline::CubicSpline2d;
use crate::core::math::{angle_lerp, lerp, normalize_angle};
use crate::error::{PlanningError, Result};

/// High-level routing intent attached to a waypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadOption {
    #[default]
    LaneFollow,
    Left,
    Right,
    Straight,
}

/// Lane-change permission encoded in the map at a waypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneChange {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl LaneChange {
    pub fn allows_left(&self) -> bool {
        matches!(self, LaneChange::Left | LaneChange::Both)
    }

    pub fn allows_right(&self) -> bool {
        matches!(self, LaneChange::Right | LaneChange::Both)
    }
}

/// A route waypoint as delivered by the route service.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WayPoint {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub lane_id: i32,
    pub road_option: RoadOption,
    pub lane_change: LaneChange,
    pub has_left_lane: bool,
    pub has_right_lane: bool,
    pub left_lane_width: f64,
    pub right_lane_width: f64,
}

impl Default for WayPoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
            lane_id: 1,
            road_option: RoadOption::LaneFollow,
            lane_change: LaneChange::None,
            has_left_lane: false,
            has_right_lane: false,
            left_lane_width: 1.75,
            right_lane_width: 1.75,
        }
    }
}

/// A resampled point of the reference line.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub x: f64,
    pub y: f64,
    /// Heading, normalized to (-π, π]
    pub theta: f64,
    pub kappa: f64,
    pub dkappa: f64,
    /// Arc length from the line origin
    pub s: f64,
}

/// Lane-relative coordinates: arc length and signed lateral offset
/// (left positive).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SlPoint {
    pub s: f64,
    pub l: f64,
}

/// Smoothed, densely resampled centerline with per-point curvature.
pub struct ReferenceLine {
    points: Vec<ReferencePoint>,
    waypoints: Vec<WayPoint>,
    waypoint_s: Vec<f64>,
    length: f64,
}

impl ReferenceLine {
    /// Build from route waypoints by cubic-spline resampling at `resolution`
    /// spacing. Needs at least two distinct waypoints.
    pub fn from_waypoints(waypoints: &[WayPoint], resolution: f64) -> Result<Self> {
        if !waypoints.iter().all(|w| w.x.is_finite() && w.y.is_finite()) {
            return Err(PlanningError::InvalidInput(
                "non-finite waypoint coordinates".into(),
            ));
        }
        // coincident route points would put a zero-length chord into the
        // spline fit
        let mut waypoints: Vec<WayPoint> = waypoints.to_vec();
        waypoints.dedup_by(|b, a| (a.x - b.x).powi(2) + (a.y - b.y).powi(2) < 1e-12);
        if waypoints.len() < 2 {
            return Err(PlanningError::InvalidInput(
                "reference line needs at least two distinct waypoints".into(),
            ));
        }

        let xs: Vec<f64> = waypoints.iter().map(|w| w.x).collect();
        let ys: Vec<f64> = waypoints.iter().map(|w| w.y).collect();
        let spline = CubicSpline2d::new(&xs, &ys);
        let length = spline.total_length();
        if length < resolution {
            return Err(PlanningError::InvalidInput(
                "reference line is shorter than the resampling resolution".into(),
            ));
        }

        let mut waypoint_s = vec![0.0];
        for i in 1..waypoints.len() {
            let ds = ((xs[i] - xs[i - 1]).powi(2) + (ys[i] - ys[i - 1]).powi(2)).sqrt();
            waypoint_s.push(waypoint_s[i - 1] + ds);
        }

        let steps = (length / resolution).floor() as usize;
        let mut points = Vec::with_capacity(steps + 2);
        for i in 0..=steps {
            let s = i as f64 * resolution;
            points.push(Self::sample(&spline, s));
        }
        if length - points.last().expect("resampled points").s > 1e-6 {
            points.push(Self::sample(&spline, length));
        }

        Ok(Self {
            points,
            waypoints: waypoints.to_vec(),
            waypoint_s,
            length,
        })
    }

    fn sample(spline: &CubicSpline2d, s: f64) -> ReferencePoint {
        let (x, y) = spline.position(s);
        ReferencePoint {
            x,
            y,
            theta: normalize_angle(spline.heading(s)),
            kappa: spline.curvature(s),
            dkappa: spline.curvature_rate(s),
            s,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// Interpolated reference point at arc length `s` (clamped to the line).
    ///
    /// The returned point carries the requested `s` exactly.
    pub fn reference_point(&self, s: f64) -> ReferencePoint {
        let s = s.clamp(0.0, self.length);
        let idx = self.points.partition_point(|p| p.s <= s);
        if idx == 0 {
            let mut p = self.points[0];
            p.s = s;
            return p;
        }
        if idx >= self.points.len() {
            let mut p = *self.points.last().expect("non-empty reference line");
            p.s = s;
            return p;
        }
        let a = &self.points[idx - 1];
        let b = &self.points[idx];
        let t = (s - a.s) / (b.s - a.s);
        ReferencePoint {
            x: lerp(a.x, b.x, t),
            y: lerp(a.y, b.y, t),
            theta: angle_lerp(a.theta, b.theta, t),
            kappa: lerp(a.kappa, b.kappa, t),
            dkappa: lerp(a.dkappa, b.dkappa, t),
            s,
        }
    }

    /// Project `(x, y)` onto the line: nearest dense point, refined by
    /// projecting onto the adjacent polyline segments.
    pub fn matched_point(&self, x: f64, y: f64) -> (ReferencePoint, f64) {
        let mut best = 0;
        let mut best_d2 = f64::INFINITY;
        for (i, p) in self.points.iter().enumerate() {
            let d2 = (p.x - x).powi(2) + (p.y - y).powi(2);
            if d2 < best_d2 {
                best_d2 = d2;
                best = i;
            }
        }

        let mut matched_s = self.points[best].s;
        let mut matched_d2 = best_d2;
        let lo = best.saturating_sub(1);
        let hi = (best + 1).min(self.points.len() - 1);
        for i in lo..hi {
            let a = &self.points[i];
            let b = &self.points[i + 1];
            let abx = b.x - a.x;
            let aby = b.y - a.y;
            let seg_len2 = abx * abx + aby * aby;
            if seg_len2 < 1e-12 {
                continue;
            }
            let t = (((x - a.x) * abx + (y - a.y) * aby) / seg_len2).clamp(0.0, 1.0);
            let px = a.x + t * abx;
            let py = a.y + t * aby;
            let d2 = (px - x).powi(2) + (py - y).powi(2);
            if d2 < matched_d2 {
                matched_d2 = d2;
                matched_s = a.s + t * (b.s - a.s);
            }
        }

        (self.reference_point(matched_s), matched_s)
    }

    /// World to lane-relative coordinates.
    pub fn xy_to_sl(&self, x: f64, y: f64) -> SlPoint {
        let (ref_point, s) = self.matched_point(x, y);
        let dx = x - ref_point.x;
        let dy = y - ref_point.y;
        let cross = ref_point.theta.cos() * dy - ref_point.theta.sin() * dx;
        let l = (dx * dx + dy * dy).sqrt().copysign(cross);
        SlPoint { s, l }
    }

    /// Lane-relative to world coordinates.
    pub fn sl_to_xy(&self, sl: SlPoint) -> (f64, f64) {
        let ref_point = self.reference_point(sl.s);
        crate::frenet::calc_cartesian_point(ref_point.theta, ref_point.x, ref_point.y, sl.l)
    }

    /// Lane half-widths (left, right) at arc length `s`, interpolated
    /// between the enclosing waypoints.
    pub fn lane_width(&self, s: f64) -> (f64, f64) {
        let s = s.clamp(0.0, self.length);
        let idx = self.waypoint_s.partition_point(|&ws| ws <= s);
        if idx == 0 {
            let w = &self.waypoints[0];
            return (w.left_lane_width, w.right_lane_width);
        }
        if idx >= self.waypoints.len() {
            let w = self.waypoints.last().expect("waypoints");
            return (w.left_lane_width, w.right_lane_width);
        }
        let (s0, s1) = (self.waypoint_s[idx - 1], self.waypoint_s[idx]);
        let t = if s1 - s0 > 1e-9 {
            (s - s0) / (s1 - s0)
        } else {
            0.0
        };
        let a = &self.waypoints[idx - 1];
        let b = &self.waypoints[idx];
        (
            lerp(a.left_lane_width, b.left_lane_width, t),
            lerp(a.right_lane_width, b.right_lane_width, t),
        )
    }

    /// The route waypoint closest to arc length `s`.
    pub fn nearest_waypoint(&self, s: f64) -> WayPoint {
        let s = s.clamp(0.0, self.length);
        let idx = self.waypoint_s.partition_point(|&ws| ws <= s);
        if idx == 0 {
            return self.waypoints[0];
        }
        if idx >= self.waypoints.len() {
            return *self.waypoints.last().expect("waypoints");
        }
        if (s - self.waypoint_s[idx - 1]).abs() <= (self.waypoint_s[idx] - s).abs() {
            self.waypoints[idx - 1]
        } else {
            self.waypoints[idx]
        }
    }

    /// Whether a lane-relative point is inside the drivable lane band.
    pub fn is_on_lane(&self, sl: SlPoint) -> bool {
        let (left, right) = self.lane_width(sl.s);
        sl.l < left && sl.l > -right
    }
}
