// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::geom::{Rect, Vec2};
use crate::solve::{solve_cubic, solve_quadratic, Roots};
use crate::{CURVE_TIME_EPSILON, TOLERANCE};

/// Which coordinate a scalar solver operates on.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Axis {
    X,
    Y,
}

/// A cubic Bézier segment described by four absolute points.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CubicBezier {
    pub from: Vec2,
    pub ctrl1: Vec2,
    pub ctrl2: Vec2,
    pub to: Vec2,
}

impl CubicBezier {
    /// Creates a new curve.
    #[inline]
    pub fn new(from: Vec2, ctrl1: Vec2, ctrl2: Vec2, to: Vec2) -> Self {
        CubicBezier {
            from,
            ctrl1,
            ctrl2,
            to,
        }
    }

    /// A straight segment in cubic form. The control points coincide with
    /// the endpoints.
    #[inline]
    pub fn from_line(a: Vec2, b: Vec2) -> Self {
        CubicBezier::new(a, a, b, b)
    }

    fn coord(p: Vec2, axis: Axis) -> f32 {
        match axis {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    /// Evaluates the curve position at `t` using de Casteljau's scheme.
    pub fn point_at(&self, t: f32) -> Vec2 {
        let p01 = self.from.lerp(self.ctrl1, t);
        let p12 = self.ctrl1.lerp(self.ctrl2, t);
        let p23 = self.ctrl2.lerp(self.to, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        p012.lerp(p123, t)
    }

    /// The (unnormalized) first derivative at `t`.
    ///
    /// When a zero handle collapses the derivative at an endpoint, the
    /// direction towards the next distinct control point is used so that
    /// tangents never vanish.
    pub fn derivative_at(&self, t: f32) -> Vec2 {
        let u = 1.0 - t;
        let d = (self.ctrl1 - self.from) * (3.0 * u * u)
            + (self.ctrl2 - self.ctrl1) * (6.0 * u * t)
            + (self.to - self.ctrl2) * (3.0 * t * t);

        if d.length_sq() > 0.0 {
            return d;
        }

        if t < 0.5 {
            if self.ctrl2 != self.from {
                self.ctrl2 - self.from
            } else {
                self.to - self.from
            }
        } else {
            if self.ctrl1 != self.to {
                self.to - self.ctrl1
            } else {
                self.to - self.from
            }
        }
    }

    /// The unit tangent at `t`.
    #[inline]
    pub fn tangent_at(&self, t: f32) -> Vec2 {
        self.derivative_at(t).normalized()
    }

    /// The unit normal at `t` (the tangent rotated clockwise).
    #[inline]
    pub fn normal_at(&self, t: f32) -> Vec2 {
        let tan = self.tangent_at(t);
        Vec2::new(tan.y, -tan.x)
    }

    /// Signed curvature at `t`.
    pub fn curvature_at(&self, t: f32) -> f32 {
        let d1 = self.derivative_at(t);
        // Second derivative of the Bernstein form.
        let u = 1.0 - t;
        let d2 = (self.ctrl2 - self.ctrl1 * 2.0 + self.from) * (6.0 * u)
            + (self.to - self.ctrl2 * 2.0 + self.ctrl1) * (6.0 * t);
        let len = d1.length_sq();
        if len == 0.0 {
            return 0.0;
        }
        d1.cross(d2) / (len * len.sqrt())
    }

    /// The tangent angle at `t` in radians.
    pub fn angle_at(&self, t: f32) -> f32 {
        let tan = self.derivative_at(t);
        tan.y.atan2(tan.x)
    }

    /// Splits the curve at `t` into two sub-curves.
    pub fn split(&self, t: f32) -> (CubicBezier, CubicBezier) {
        let p01 = self.from.lerp(self.ctrl1, t);
        let p12 = self.ctrl1.lerp(self.ctrl2, t);
        let p23 = self.ctrl2.lerp(self.to, t);
        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);
        let p = p012.lerp(p123, t);
        (
            CubicBezier::new(self.from, p01, p012, p),
            CubicBezier::new(p, p123, p23, self.to),
        )
    }

    /// The sub-curve spanning the parameter range `t1..t2`.
    pub fn slice(&self, t1: f32, t2: f32) -> CubicBezier {
        let t1 = t1.max(0.0).min(1.0);
        let t2 = t2.max(0.0).min(1.0);

        let tail = if t1 > 0.0 { self.split(t1).1 } else { *self };
        if t2 < 1.0 {
            let t = (t2 - t1) / (1.0 - t1);
            tail.split(t).0
        } else {
            tail
        }
    }

    /// Parameters within `(t_min, t_max)` where the derivative along `axis`
    /// is zero.
    pub fn extrema(&self, axis: Axis, t_min: f32, t_max: f32) -> Roots {
        let v0 = Self::coord(self.from, axis);
        let v1 = Self::coord(self.ctrl1, axis);
        let v2 = Self::coord(self.ctrl2, axis);
        let v3 = Self::coord(self.to, axis);

        let a = 3.0 * (v1 - v2) - v0 + v3;
        let b = 2.0 * (v0 + v2) - 4.0 * v1;
        let c = v1 - v0;
        solve_quadratic(a, b, c, t_min, t_max)
    }

    /// All x- and y-extrema parameters in `(0, 1)`, sorted.
    pub fn extrema_2d(&self) -> Vec<f32> {
        let t_min = CURVE_TIME_EPSILON;
        let t_max = 1.0 - CURVE_TIME_EPSILON;
        let mut out: Vec<f32> = Vec::new();
        out.extend(self.extrema(Axis::X, t_min, t_max).iter());
        out.extend(self.extrema(Axis::Y, t_min, t_max).iter());
        out.sort_by(|a, b| a.partial_cmp(b).unwrap());
        out.dedup();
        out
    }

    /// Parameters where the squared speed of the curve peaks.
    pub fn peaks(&self) -> Roots {
        let ax = -self.from.x + 3.0 * self.ctrl1.x - 3.0 * self.ctrl2.x + self.to.x;
        let bx = 3.0 * self.from.x - 6.0 * self.ctrl1.x + 3.0 * self.ctrl2.x;
        let cx = -3.0 * self.from.x + 3.0 * self.ctrl1.x;
        let ay = -self.from.y + 3.0 * self.ctrl1.y - 3.0 * self.ctrl2.y + self.to.y;
        let by = 3.0 * self.from.y - 6.0 * self.ctrl1.y + 3.0 * self.ctrl2.y;
        let cy = -3.0 * self.from.y + 3.0 * self.ctrl1.y;

        let t_min = CURVE_TIME_EPSILON;
        let t_max = 1.0 - t_min;
        let mut roots = solve_cubic(
            9.0 * (ax * ax + ay * ay),
            9.0 * (ax * bx + by * ay),
            2.0 * (bx * bx + by * by) + 3.0 * (ax * cx + ay * cy),
            bx * cx + by * cy,
            t_min,
            t_max,
        );
        roots.sort();
        roots
    }

    fn control_polygon_length(&self) -> f32 {
        self.from.distance(self.ctrl1)
            + self.ctrl1.distance(self.ctrl2)
            + self.ctrl2.distance(self.to)
    }

    fn length_rec(&self, depth: u32) -> f32 {
        let chord = self.from.distance(self.to);
        let poly = self.control_polygon_length();
        if poly - chord <= TOLERANCE || depth >= 24 {
            // For a cubic, (2·chord + polygon) / 3 converges one order
            // faster than the plain average.
            (2.0 * chord + poly) / 3.0
        } else {
            let (a, b) = self.split(0.5);
            a.length_rec(depth + 1) + b.length_rec(depth + 1)
        }
    }

    /// Arc length, computed by adaptive subdivision.
    pub fn length(&self) -> f32 {
        self.length_rec(0)
    }

    /// Arc length between two parameters.
    pub fn length_between(&self, t1: f32, t2: f32) -> f32 {
        if t2 <= t1 {
            return 0.0;
        }
        self.slice(t1, t2).length()
    }

    /// The parameter whose arc length from the start equals `offset`.
    pub fn parameter_at_offset(&self, offset: f32) -> f32 {
        if offset <= 0.0 {
            return 0.0;
        }
        let total = self.length();
        if offset >= total {
            return 1.0;
        }

        let mut lo = 0.0f32;
        let mut hi = 1.0f32;
        for _ in 0..32 {
            let mid = (lo + hi) * 0.5;
            if self.length_between(0.0, mid) < offset {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo + hi) * 0.5
    }

    /// The parameter of the curve point closest to `p`, together with the
    /// distance to it.
    pub fn closest_parameter(&self, p: Vec2) -> (f32, f32) {
        const COUNT: u32 = 100;

        let mut min_t = 0.0;
        let mut min_dist_sq = f32::INFINITY;
        for i in 0..=COUNT {
            let t = i as f32 / COUNT as f32;
            let d = (self.point_at(t) - p).length_sq();
            if d < min_dist_sq {
                min_dist_sq = d;
                min_t = t;
            }
        }

        let mut step = 0.5 / COUNT as f32;
        while step > CURVE_TIME_EPSILON {
            let mut refined = false;
            for &t in &[min_t - step, min_t + step] {
                if (0.0..=1.0).contains(&t) {
                    let d = (self.point_at(t) - p).length_sq();
                    if d < min_dist_sq {
                        min_dist_sq = d;
                        min_t = t;
                        refined = true;
                    }
                }
            }
            if !refined {
                step *= 0.5;
            }
        }

        (min_t, min_dist_sq.sqrt())
    }

    /// Tight bounds: endpoints plus the curve points at derivative roots.
    pub fn bounds(&self) -> Rect {
        let mut rect = Rect::new(self.from, self.to);
        for axis in &[Axis::X, Axis::Y] {
            for &t in self.extrema(*axis, 0.0, 1.0).as_slice() {
                rect = rect.merged_point(self.point_at(t));
            }
        }
        rect
    }

    /// Tight bounds padded on every side.
    pub fn bounds_padded(&self, padding: f32) -> Rect {
        self.bounds().expanded(Vec2::new(padding, padding))
    }

    /// The bounds of the control polygon. Cheap and conservative.
    pub fn fast_bounds(&self) -> Rect {
        Rect {
            min: self.from.min(self.ctrl1).min(self.ctrl2).min(self.to),
            max: self.from.max(self.ctrl1).max(self.ctrl2).max(self.to),
        }
    }

    /// The signed area between the curve and the line closing it back to
    /// its start point. Positive for clockwise curves in a y-down space.
    pub fn area(&self) -> f32 {
        let (x0, y0) = (self.from.x, self.from.y);
        let (x1, y1) = (self.ctrl1.x, self.ctrl1.y);
        let (x2, y2) = (self.ctrl2.x, self.ctrl2.y);
        let (x3, y3) = (self.to.x, self.to.y);
        3.0 * ((y3 - y0) * (x1 + x2) - (x3 - x0) * (y1 + y2)
            + y1 * (x0 - x2)
            - x1 * (y0 - y2)
            + y3 * (x2 + x0 / 3.0)
            - x3 * (y2 + y0 / 3.0))
            / 20.0
    }

    /// Solves `coordinate(t) = value` for parameters within `[t_min, t_max]`.
    pub fn solve_for(&self, value: f32, axis: Axis, t_min: f32, t_max: f32) -> Roots {
        let v0 = Self::coord(self.from, axis);
        let v1 = Self::coord(self.ctrl1, axis);
        let v2 = Self::coord(self.ctrl2, axis);
        let v3 = Self::coord(self.to, axis);

        solve_cubic(
            -v0 + 3.0 * v1 - 3.0 * v2 + v3,
            3.0 * v0 - 6.0 * v1 + 3.0 * v2,
            -3.0 * v0 + 3.0 * v1,
            v0 - value,
            t_min,
            t_max,
        )
    }

    /// Returns `true` when both handles coincide with their endpoints.
    pub fn is_linear(&self, epsilon: f32) -> bool {
        self.ctrl1.is_close(self.from, epsilon) && self.ctrl2.is_close(self.to, epsilon)
    }

    /// Returns `true` when all four control points coincide.
    pub fn is_a_point(&self, epsilon: f32) -> bool {
        self.from.is_close(self.ctrl1, epsilon)
            && self.from.is_close(self.ctrl2, epsilon)
            && self.from.is_close(self.to, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;
    use crate::KAPPA;

    fn quarter_circle() -> CubicBezier {
        // Unit quarter circle from (1, 0) to (0, 1).
        CubicBezier::new(
            vec2(1.0, 0.0),
            vec2(1.0, KAPPA),
            vec2(KAPPA, 1.0),
            vec2(0.0, 1.0),
        )
    }

    #[test]
    fn eval_endpoints() {
        let c = quarter_circle();
        assert!(c.point_at(0.0).is_close(vec2(1.0, 0.0), 1e-6));
        assert!(c.point_at(1.0).is_close(vec2(0.0, 1.0), 1e-6));
    }

    #[test]
    fn length_of_quarter_circle() {
        let len = quarter_circle().length();
        assert!((len - std::f32::consts::FRAC_PI_2).abs() < 1e-3, "{}", len);
    }

    #[test]
    fn length_of_line() {
        let c = CubicBezier::from_line(vec2(0.0, 0.0), vec2(3.0, 4.0));
        assert!((c.length() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn split_preserves_shape() {
        let c = quarter_circle();
        let (a, b) = c.split(0.3);
        assert!(a.to.is_close(c.point_at(0.3), 1e-6));
        assert!(a.point_at(0.5).is_close(c.point_at(0.15), 1e-4));
        assert!(b.point_at(0.5).is_close(c.point_at(0.65), 1e-4));
    }

    #[test]
    fn slice_matches_split() {
        let c = quarter_circle();
        let s = c.slice(0.25, 0.75);
        assert!(s.from.is_close(c.point_at(0.25), 1e-5));
        assert!(s.to.is_close(c.point_at(0.75), 1e-5));
        assert!(s.point_at(0.5).is_close(c.point_at(0.5), 1e-4));
    }

    #[test]
    fn bounds_of_arc() {
        let b = quarter_circle().bounds();
        assert!(b.min.is_close(vec2(0.0, 0.0), 1e-3));
        assert!(b.max.is_close(vec2(1.0, 1.0), 1e-3));
    }

    #[test]
    fn parameter_at_half_length() {
        let c = quarter_circle();
        let t = c.parameter_at_offset(c.length() * 0.5);
        // By symmetry the halfway point of a quarter arc is at 45°.
        let p = c.point_at(t);
        assert!(p.is_close(vec2(std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2), 1e-3));
    }

    #[test]
    fn closest_parameter_on_line() {
        let c = CubicBezier::from_line(vec2(0.0, 0.0), vec2(10.0, 0.0));
        let (t, dist) = c.closest_parameter(vec2(5.0, 3.0));
        assert!(c.point_at(t).is_close(vec2(5.0, 0.0), 1e-3));
        assert!((dist - 3.0).abs() < 1e-3);
    }

    #[test]
    fn solve_for_coordinate() {
        let c = quarter_circle();
        let roots = c.solve_for(0.5, Axis::Y, 0.0, 1.0);
        assert_eq!(roots.len(), 1);
        let p = c.point_at(roots.as_slice()[0]);
        assert!((p.y - 0.5).abs() < 1e-4);
        // On a unit circle: x = sqrt(1 - 0.25).
        assert!((p.x - 0.75f32.sqrt()).abs() < 2e-3);
    }

    #[test]
    fn tangent_of_degenerate_handles() {
        let c = CubicBezier::from_line(vec2(0.0, 0.0), vec2(10.0, 0.0));
        assert!(c.tangent_at(0.0).is_close(vec2(1.0, 0.0), 1e-6));
        assert!(c.tangent_at(1.0).is_close(vec2(1.0, 0.0), 1e-6));
    }
}
