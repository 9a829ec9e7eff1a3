// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Least-squares cubic fitting of a point polyline, after Philip J.
//! Schneider's "An Algorithm for Automatically Fitting Digitized Curves".
//! Powers `simplify`.

use crate::geom::Vec2;
use crate::path::{Path, Segment};
use crate::GEOMETRIC_EPSILON;

// The fit runs in f64: the normal equations lose too many digits in f32.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
struct DVec {
    x: f64,
    y: f64,
}

impl DVec {
    fn from_vec2(v: Vec2) -> Self {
        DVec {
            x: v.x as f64,
            y: v.y as f64,
        }
    }

    fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    fn add(self, o: DVec) -> DVec {
        DVec {
            x: self.x + o.x,
            y: self.y + o.y,
        }
    }

    fn sub(self, o: DVec) -> DVec {
        DVec {
            x: self.x - o.x,
            y: self.y - o.y,
        }
    }

    fn scale(self, s: f64) -> DVec {
        DVec {
            x: self.x * s,
            y: self.y * s,
        }
    }

    fn neg(self) -> DVec {
        self.scale(-1.0)
    }

    fn dot(self, o: DVec) -> f64 {
        self.x * o.x + self.y * o.y
    }

    fn distance(self, o: DVec) -> f64 {
        self.sub(o).dot(self.sub(o)).sqrt()
    }

    fn normalized(self) -> DVec {
        let len = self.dot(self).sqrt();
        if len > 0.0 {
            self.scale(1.0 / len)
        } else {
            self
        }
    }

    fn lerp(self, o: DVec, t: f64) -> DVec {
        self.add(o.sub(self).scale(t))
    }
}

// A cubic in f64 for the fitting loop only.
#[derive(Clone, Copy, Debug)]
struct FitCurve {
    p0: DVec,
    c1: DVec,
    c2: DVec,
    p3: DVec,
}

impl FitCurve {
    // de Casteljau evaluation of the first `degree + 1` control points.
    fn evaluate(degree: usize, points: &[DVec; 4], t: f64) -> DVec {
        let mut tmp = *points;
        for i in 1..=degree {
            for j in 0..=(degree - i) {
                tmp[j] = tmp[j].lerp(tmp[j + 1], t);
            }
        }
        tmp[0]
    }

    fn point_at(&self, t: f64) -> DVec {
        Self::evaluate(3, &[self.p0, self.c1, self.c2, self.p3], t)
    }
}

pub(crate) struct PathFitter {
    positions: Vec<DVec>,
    segments: Vec<Segment>,
    error: f64,
    closed: bool,
}

impl PathFitter {
    /// Collects the anchor positions of `path`, filtering out adjacent
    /// duplicates. Closed paths are padded by one wrapped position on
    /// each side so the fit is periodic.
    pub fn new(path: &Path, error: f32) -> Self {
        let mut positions: Vec<DVec> = Vec::with_capacity(path.segment_count() + 2);
        let mut prev: Option<Vec2> = None;
        for seg in path.segments() {
            if prev != Some(seg.position) {
                positions.push(DVec::from_vec2(seg.position));
                prev = Some(seg.position);
            }
        }

        if path.is_closed() && !positions.is_empty() {
            let last = positions[positions.len() - 1];
            positions.insert(0, last);
            positions.push(positions[1]);
        }

        PathFitter {
            positions,
            segments: Vec::new(),
            error: error as f64,
            closed: path.is_closed(),
        }
    }

    /// Runs the fit. Returns the new segment chain, or `None` for an
    /// empty path.
    pub fn fit(mut self) -> Option<Vec<Segment>> {
        if self.positions.is_empty() {
            return None;
        }

        let first = self.positions[0].to_vec2();
        self.segments.push(Segment::point(first));

        if self.positions.len() > 1 {
            let count = self.positions.len();
            let tan1 = self.positions[1].sub(self.positions[0]);
            let tan2 = self.positions[count - 2].sub(self.positions[count - 1]);
            self.fit_cubic(0, count - 1, tan1, tan2);

            if self.closed && self.segments.len() > 2 {
                // Drop the periodic padding again.
                self.segments.remove(0);
                self.segments.pop();
            }
        }

        Some(self.segments)
    }

    fn add_curve(&mut self, p0: DVec, c1: DVec, c2: DVec, p3: DVec) {
        if let Some(last) = self.segments.last_mut() {
            last.handle_out = c1.to_vec2();
        }
        let to = p3.to_vec2();
        self.segments.push(Segment {
            handle_in: c2.to_vec2(),
            position: to,
            handle_out: to,
        });
    }

    fn fit_cubic(&mut self, first: usize, last: usize, tan1: DVec, tan2: DVec) {
        // Two points: place the handles a third of the chord out along
        // the tangents.
        if last - first == 1 {
            let pt1 = self.positions[first];
            let pt2 = self.positions[last];
            let dist = pt1.distance(pt2) / 3.0;
            self.add_curve(
                pt1,
                pt1.add(tan1.normalized().scale(dist)),
                pt2.add(tan2.normalized().scale(dist)),
                pt2,
            );
            return;
        }

        let mut u_prime = self.chord_length_parameterize(first, last);
        let mut max_error = self.error.max(self.error * self.error);
        let mut split = first + (last - first + 1) / 2;
        let mut parameters_in_order = true;

        for _ in 0..=4 {
            let curve = self.generate_bezier(first, last, &u_prime, tan1, tan2);

            let (error, index) = self.find_max_error(first, last, &curve, &u_prime);
            if error < self.error && parameters_in_order {
                self.add_curve(curve.p0, curve.c1, curve.c2, curve.p3);
                return;
            }
            split = index;

            if error >= max_error {
                break;
            }
            parameters_in_order = self.reparameterize(first, last, &mut u_prime, &curve);
            max_error = error;
        }

        // Fitting failed: split at the worst point and fit both halves
        // with a shared center tangent.
        let tan_center = self.positions[split - 1].sub(self.positions[split + 1]);
        self.fit_cubic(first, split, tan1, tan_center);
        self.fit_cubic(split, last, tan_center.neg(), tan2);
    }

    fn generate_bezier(
        &self,
        first: usize,
        last: usize,
        u_prime: &[f64],
        tan1: DVec,
        tan2: DVec,
    ) -> FitCurve {
        let epsilon = GEOMETRIC_EPSILON as f64;
        let pt1 = self.positions[first];
        let pt2 = self.positions[last];

        // Normal equations C·x = X for the two handle lengths.
        let mut c = [[0.0f64; 2]; 2];
        let mut x = [0.0f64; 2];

        for (i, &u) in u_prime.iter().enumerate().take(last - first + 1) {
            let t = 1.0 - u;
            let b = 3.0 * u * t;
            let b0 = t * t * t;
            let b1 = b * t;
            let b2 = b * u;
            let b3 = u * u * u;
            let a1 = tan1.normalized().scale(b1);
            let a2 = tan2.normalized().scale(b2);
            let tmp = self.positions[first + i]
                .sub(pt1.scale(b0 + b1))
                .sub(pt2.scale(b2 + b3));

            c[0][0] += a1.dot(a1);
            c[0][1] += a1.dot(a2);
            c[1][0] = c[0][1];
            c[1][1] += a2.dot(a2);
            x[0] += a1.dot(tmp);
            x[1] += a2.dot(tmp);
        }

        let det_c0_c1 = c[0][0] * c[1][1] - c[1][0] * c[0][1];
        let mut alpha1;
        let mut alpha2;

        if det_c0_c1.abs() > epsilon {
            // Kramer's rule.
            let det_c0_x = c[0][0] * x[1] - c[1][0] * x[0];
            let det_x_c1 = x[0] * c[1][1] - x[1] * c[0][1];
            alpha1 = det_x_c1 / det_c0_c1;
            alpha2 = det_c0_x / det_c0_c1;
        } else {
            // Under-determined: assume both handles the same length.
            let c0 = c[0][0] + c[0][1];
            let c1 = c[1][0] + c[1][1];
            if c0.abs() > epsilon {
                alpha1 = x[0] / c0;
                alpha2 = alpha1;
            } else if c1.abs() > epsilon {
                alpha1 = x[1] / c1;
                alpha2 = alpha1;
            } else {
                alpha1 = 0.0;
                alpha2 = 0.0;
            }
        }

        // Non-positive alphas give coincident control points which break
        // the Newton refinement; fall back to Wu/Barsky.
        let seg_length = pt1.distance(pt2);
        let epsilon = epsilon * seg_length;
        let mut handle1 = DVec::default();
        let mut handle2 = DVec::default();
        if alpha1 < epsilon || alpha2 < epsilon {
            alpha1 = seg_length / 3.0;
            alpha2 = alpha1;
        } else {
            // The handles must project onto the chord in order.
            let line = pt2.sub(pt1);
            handle1 = tan1.normalized().scale(alpha1);
            handle2 = tan2.normalized().scale(alpha2);
            if handle1.dot(line) - handle2.dot(line) > seg_length * seg_length {
                alpha1 = seg_length / 3.0;
                alpha2 = alpha1;
                handle1 = DVec::default();
                handle2 = DVec::default();
            }
        }

        if handle1 == DVec::default() {
            handle1 = tan1.normalized().scale(alpha1);
            handle2 = tan2.normalized().scale(alpha2);
        }

        FitCurve {
            p0: pt1,
            c1: pt1.add(handle1),
            c2: pt2.add(handle2),
            p3: pt2,
        }
    }

    // One Newton-Raphson step per point towards the parameter of its
    // closest curve point. Returns false when the points got reordered.
    fn reparameterize(
        &self,
        first: usize,
        last: usize,
        u: &mut [f64],
        curve: &FitCurve,
    ) -> bool {
        for i in first..=last {
            u[i - first] = self.find_root(curve, self.positions[i], u[i - first]);
        }

        for i in 1..u.len() {
            if u[i] <= u[i - 1] {
                return false;
            }
        }
        true
    }

    fn find_root(&self, curve: &FitCurve, point: DVec, u: f64) -> f64 {
        // Control vertices of Q' and Q''.
        let q1 = [
            curve.c1.sub(curve.p0).scale(3.0),
            curve.c2.sub(curve.c1).scale(3.0),
            curve.p3.sub(curve.c2).scale(3.0),
            DVec::default(),
        ];
        let q2 = [
            q1[1].sub(q1[0]).scale(2.0),
            q1[2].sub(q1[1]).scale(2.0),
            DVec::default(),
            DVec::default(),
        ];

        let pt = curve.point_at(u);
        let pt1 = FitCurve::evaluate(2, &q1, u);
        let pt2 = FitCurve::evaluate(1, &q2, u);
        let diff = pt.sub(point);
        let df = pt1.dot(pt1) + diff.dot(pt2);

        if df.abs() < 1e-12 {
            u
        } else {
            u - diff.dot(pt1) / df
        }
    }

    fn chord_length_parameterize(&self, first: usize, last: usize) -> Vec<f64> {
        let size = last - first;
        let mut u = vec![0.0f64; size + 1];
        for i in (first + 1)..=last {
            u[i - first] = u[i - first - 1] + self.positions[i].distance(self.positions[i - 1]);
        }
        let total = u[size];
        if total > 0.0 {
            for v in u.iter_mut().skip(1) {
                *v /= total;
            }
        }
        u
    }

    // The largest squared deviation of the polyline from the curve, and
    // the index where it happens.
    fn find_max_error(
        &self,
        first: usize,
        last: usize,
        curve: &FitCurve,
        u: &[f64],
    ) -> (f64, usize) {
        let mut index = first + (last - first + 1) / 2;
        let mut max_dist = 0.0f64;
        for i in (first + 1)..last {
            let p = curve.point_at(u[i - first]);
            let v = p.sub(self.positions[i]);
            let dist = v.dot(v);
            if dist >= max_dist {
                max_dist = dist;
                index = i;
            }
        }
        (max_dist, index)
    }
}
