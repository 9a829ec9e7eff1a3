// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cubic–cubic intersection via Bézier clipping, also known as fat-line
//! clipping: recursively restrict each curve to the parameter range that
//! can intersect the fat line of the other until the ranges collapse.

use crate::bezier::{Axis, CubicBezier};
use crate::geom::{Rect, Vec2};
use crate::CURVE_TIME_EPSILON;

// Domain width at which a clipped range is considered a single point.
const DOMAIN_EPSILON: f32 = 1e-6;

// Two intersections closer than this in curve time are the same one.
const DEDUP_EPSILON: f32 = CURVE_TIME_EPSILON;

const MAX_RECURSION: u32 = 60;
const MAX_CALLS: u32 = 4096;

/// Intersections as `(t1, t2)` parameter pairs, at most nine for a pair of
/// cubics.
pub fn curve_intersections(curve1: &CubicBezier, curve2: &CubicBezier) -> Vec<(f32, f32)> {
    let mut result = Vec::new();

    if !rectangles_touch(&curve1.fast_bounds(), &curve2.fast_bounds()) {
        return result;
    }
    // Identical curves overlap everywhere; there is no meaningful point set.
    if curve1 == curve2 || *curve1 == reversed(curve2) {
        return result;
    }
    if curve1.is_a_point(f32::EPSILON) || curve2.is_a_point(f32::EPSILON) {
        return result;
    }

    let linear1 = is_flat(curve1, f32::EPSILON);
    let linear2 = is_flat(curve2, f32::EPSILON);
    if linear1 && !linear2 {
        line_curve_intersections(curve1, curve2, false, &mut result);
    } else if !linear1 && linear2 {
        line_curve_intersections(curve2, curve1, true, &mut result);
    } else if linear1 && linear2 {
        line_line_intersections(curve1, curve2, &mut result);
    } else {
        add_curve_intersections(
            curve1,
            curve2,
            (0.0, 1.0),
            (0.0, 1.0),
            &mut result,
            false,
            0,
            &mut 0,
        );
    }

    result
}

fn reversed(c: &CubicBezier) -> CubicBezier {
    CubicBezier::new(c.to, c.ctrl2, c.ctrl1, c.from)
}

fn signed_line_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    (b - a).normalized().cross(p - a)
}

fn is_flat(c: &CubicBezier, epsilon: f32) -> bool {
    if c.from.is_close(c.to, epsilon) {
        return false;
    }
    signed_line_distance(c.ctrl1, c.from, c.to).abs() <= epsilon
        && signed_line_distance(c.ctrl2, c.from, c.to).abs() <= epsilon
}

fn rectangles_touch(r1: &Rect, r2: &Rect) -> bool {
    r1.min.x <= r2.max.x && r2.min.x <= r1.max.x && r1.min.y <= r2.max.y && r2.min.y <= r1.max.y
}

fn add_intersection(t1: f32, t2: f32, flip: bool, out: &mut Vec<(f32, f32)>) {
    let (t1, t2) = if flip { (t2, t1) } else { (t1, t2) };

    // Endpoint/endpoint touches are connectivity, not intersections.
    let t1_is_end = t1 < DEDUP_EPSILON || t1 > 1.0 - DEDUP_EPSILON;
    let t2_is_end = t2 < DEDUP_EPSILON || t2 > 1.0 - DEDUP_EPSILON;
    if t1_is_end && t2_is_end {
        return;
    }

    for &(a, b) in out.iter() {
        if (t1 - a).abs() < DEDUP_EPSILON && (t2 - b).abs() < DEDUP_EPSILON {
            return;
        }
    }

    if out.len() < 9 {
        out.push((t1, t2));
    }
}

// Parameters of the curve where it crosses the infinite line through
// `a` and `b`.
fn curve_line_crossings(curve: &CubicBezier, a: Vec2, b: Vec2) -> Vec<f32> {
    let d0 = signed_line_distance(curve.from, a, b);
    let d1 = signed_line_distance(curve.ctrl1, a, b);
    let d2 = signed_line_distance(curve.ctrl2, a, b);
    let d3 = signed_line_distance(curve.to, a, b);

    crate::solve::solve_cubic(
        -d0 + 3.0 * d1 - 3.0 * d2 + d3,
        3.0 * d0 - 6.0 * d1 + 3.0 * d2,
        -3.0 * d0 + 3.0 * d1,
        d0,
        0.0,
        1.0,
    )
    .as_slice()
    .to_vec()
}

fn line_curve_intersections(
    line_as_curve: &CubicBezier,
    curve: &CubicBezier,
    flip: bool,
    out: &mut Vec<(f32, f32)>,
) {
    let mostly_vertical = (line_as_curve.from.y - line_as_curve.to.y).abs()
        >= (line_as_curve.from.x - line_as_curve.to.x).abs();

    for curve_t in curve_line_crossings(curve, line_as_curve.from, line_as_curve.to) {
        let line_params = if mostly_vertical {
            line_as_curve.solve_for(curve.point_at(curve_t).y, Axis::Y, 0.0, 1.0)
        } else {
            line_as_curve.solve_for(curve.point_at(curve_t).x, Axis::X, 0.0, 1.0)
        };

        for &line_t in line_params.as_slice() {
            add_intersection(line_t, curve_t, flip, out);
        }
    }
}

fn line_line_intersections(
    curve1: &CubicBezier,
    curve2: &CubicBezier,
    out: &mut Vec<(f32, f32)>,
) {
    let l1 = crate::geom::Line::through(curve1.from, curve1.to);
    let l2 = crate::geom::Line::through(curve2.from, curve2.to);
    let pt = match l1.intersect(&l2) {
        Some(pt) => pt,
        None => return,
    };

    let params_for = |curve: &CubicBezier| -> Vec<f32> {
        let mostly_vertical = (curve.from.y - curve.to.y).abs() >= (curve.from.x - curve.to.x).abs();
        let roots = if mostly_vertical {
            curve.solve_for(pt.y, Axis::Y, 0.0, 1.0)
        } else {
            curve.solve_for(pt.x, Axis::X, 0.0, 1.0)
        };
        roots.as_slice().to_vec()
    };

    let params1 = params_for(curve1);
    if params1.is_empty() {
        return;
    }
    let params2 = params_for(curve2);
    if params2.is_empty() {
        return;
    }

    for &t1 in &params1 {
        for &t2 in &params2 {
            add_intersection(t1, t2, false, out);
        }
    }
}

#[inline]
fn domain_value_at_t(domain: (f32, f32), t: f32) -> f32 {
    domain.0 + (domain.1 - domain.0) * t
}

// The main clipping recursion. `flip` records whether curve1 currently is
// a piece of the original first curve. Domains track the sub-ranges of the
// original curves the current pieces correspond to.
#[allow(clippy::too_many_arguments)]
fn add_curve_intersections(
    curve1: &CubicBezier,
    curve2: &CubicBezier,
    domain1: (f32, f32),
    domain2: (f32, f32),
    out: &mut Vec<(f32, f32)>,
    flip: bool,
    recursion: u32,
    calls: &mut u32,
) {
    *calls += 1;
    if *calls >= MAX_CALLS || recursion >= MAX_RECURSION {
        return;
    }
    let recursion = recursion + 1;

    if domain2.0 == domain2.1 || curve2.is_a_point(0.0) {
        add_point_curve_intersection(curve2.from, false, curve1, domain2, domain1, out, flip);
        return;
    }

    if curve2.from == curve2.to {
        // No baseline to fat-line against, so halve curve2 and retry.
        let mid = (domain2.0 + domain2.1) * 0.5;
        let halves = curve2.split(0.5);
        add_curve_intersections(curve1, &halves.0, domain1, (domain2.0, mid), out, flip, recursion, calls);
        add_curve_intersections(curve1, &halves.1, domain1, (mid, domain2.1), out, flip, recursion, calls);
        return;
    }

    if !rectangles_touch(&curve1.fast_bounds(), &curve2.fast_bounds()) {
        return;
    }

    let (t_min_clip, t_max_clip) = match restrict_curve_to_fat_line(curve1, curve2) {
        Some(clip) => clip,
        None => return,
    };

    let new_domain1 = (
        domain_value_at_t(domain1, t_min_clip),
        domain_value_at_t(domain1, t_max_clip),
    );

    if (domain2.1 - domain2.0).max(new_domain1.1 - new_domain1.0) < DOMAIN_EPSILON {
        let t1 = (new_domain1.0 + new_domain1.1) * 0.5;
        let t2 = (domain2.0 + domain2.1) * 0.5;
        add_intersection(t1, t2, flip, out);
        return;
    }

    let curve1 = curve1.slice(t_min_clip, t_max_clip);

    if new_domain1.0 == new_domain1.1 || curve1.is_a_point(0.0) {
        add_point_curve_intersection(curve1.from, true, curve2, new_domain1, domain2, out, flip);
        return;
    }

    if t_max_clip - t_min_clip > 0.8 {
        // Fat-line clipping stalled; subdivide the curve that converged
        // the least.
        if new_domain1.1 - new_domain1.0 > domain2.1 - domain2.0 {
            let mid = (new_domain1.0 + new_domain1.1) * 0.5;
            let halves = curve1.split(0.5);
            add_curve_intersections(curve2, &halves.0, domain2, (new_domain1.0, mid), out, !flip, recursion, calls);
            add_curve_intersections(curve2, &halves.1, domain2, (mid, new_domain1.1), out, !flip, recursion, calls);
        } else {
            let mid = (domain2.0 + domain2.1) * 0.5;
            let halves = curve2.split(0.5);
            add_curve_intersections(&halves.0, &curve1, (domain2.0, mid), new_domain1, out, !flip, recursion, calls);
            add_curve_intersections(&halves.1, &curve1, (mid, domain2.1), new_domain1, out, !flip, recursion, calls);
        }
    } else if domain2.1 - domain2.0 >= DOMAIN_EPSILON {
        add_curve_intersections(curve2, &curve1, domain2, new_domain1, out, !flip, recursion, calls);
    } else {
        add_curve_intersections(&curve1, curve2, new_domain1, domain2, out, flip, recursion, calls);
    }
}

fn add_point_curve_intersection(
    pt: Vec2,
    pt_is_curve1: bool,
    curve: &CubicBezier,
    pt_domain: (f32, f32),
    curve_domain: (f32, f32),
    out: &mut Vec<(f32, f32)>,
    flip: bool,
) {
    let flip = if pt_is_curve1 { flip } else { !flip };

    let mut t_for_min = 0.0;
    let mut min_dist_sq = f32::EPSILON;
    let mut found = false;
    for i in 0..=10 {
        let t = i as f32 / 10.0;
        let d = (pt - curve.point_at(t)).length_sq();
        if d < min_dist_sq {
            t_for_min = t;
            min_dist_sq = d;
            found = true;
        }
    }

    if !found {
        return;
    }

    let curve_t = domain_value_at_t(curve_domain, t_for_min);
    let pt_t = (pt_domain.0 + pt_domain.1) * 0.5;
    add_intersection(pt_t, curve_t, flip, out);
}

// The (t_min, t_max) range of curve1 that can possibly intersect the fat
// line of curve2. `None` when the hull lies fully outside it.
fn restrict_curve_to_fat_line(curve1: &CubicBezier, curve2: &CubicBezier) -> Option<(f32, f32)> {
    let d0 = signed_line_distance(curve1.from, curve2.from, curve2.to);
    let d1 = signed_line_distance(curve1.ctrl1, curve2.from, curve2.to);
    let d2 = signed_line_distance(curve1.ctrl2, curve2.from, curve2.to);
    let d3 = signed_line_distance(curve1.to, curve2.from, curve2.to);

    let (mut top, mut bottom) = convex_hull_of_distance_curve(d0, d1, d2, d3);
    let (d_min, d_max) = fat_line_min_max(curve2);

    let t_min = walk_convex_hull_start_to_fat_line(&top, &bottom, d_min, d_max)?;
    top.reverse();
    bottom.reverse();
    let t_max = walk_convex_hull_start_to_fat_line(&top, &bottom, d_min, d_max)?;
    Some((t_min, t_max))
}

fn fat_line_min_max(curve: &CubicBezier) -> (f32, f32) {
    let d1 = signed_line_distance(curve.ctrl1, curve.from, curve.to);
    let d2 = signed_line_distance(curve.ctrl2, curve.from, curve.to);
    let factor = if d1 * d2 > 0.0 { 3.0 / 4.0 } else { 4.0 / 9.0 };
    let d_min = factor * d1.min(d2).min(0.0);
    let d_max = factor * d1.max(d2).max(0.0);
    (d_min, d_max)
}

// The convex hull of the graph t -> distance(curve1(t), baseline(curve2)),
// described by its top and bottom vertex chains from left to right.
fn convex_hull_of_distance_curve(d0: f32, d1: f32, d2: f32, d3: f32) -> (Vec<Vec2>, Vec<Vec2>) {
    let p0 = Vec2::new(0.0, d0);
    let p1 = Vec2::new(1.0 / 3.0, d1);
    let p2 = Vec2::new(2.0 / 3.0, d2);
    let p3 = Vec2::new(1.0, d3);

    // Vertical distances of p1 and p2 from the chord [p0, p3].
    let dist1 = d1 - (2.0 * d0 + d3) / 3.0;
    let dist2 = d2 - (d0 + 2.0 * d3) / 3.0;

    let mut hull = if dist1 * dist2 < 0.0 {
        // Opposite sides of the chord: a quadrilateral.
        (vec![p0, p1, p3], vec![p0, p2, p3])
    } else {
        let abs1 = dist1.abs();
        let abs2 = dist2.abs();
        if abs1 >= 2.0 * abs2 {
            (vec![p0, p1, p3], vec![p0, p3])
        } else if abs2 >= 2.0 * abs1 {
            (vec![p0, p2, p3], vec![p0, p3])
        } else {
            (vec![p0, p1, p2, p3], vec![p0, p3])
        }
    };

    if dist1 < 0.0 || (dist1 == 0.0 && dist2 < 0.0) {
        hull = (hull.1, hull.0);
    }

    hull
}

fn walk_convex_hull_start_to_fat_line(
    hull_top: &[Vec2],
    hull_bottom: &[Vec2],
    d_min: f32,
    d_max: f32,
) -> Option<f32> {
    let start = hull_top[0];
    if start.y < d_min {
        walk_convex_hull_edges_to_fat_line(hull_top, true, d_min)
    } else if start.y > d_max {
        walk_convex_hull_edges_to_fat_line(hull_bottom, false, d_max)
    } else {
        Some(start.x)
    }
}

fn walk_convex_hull_edges_to_fat_line(
    hull: &[Vec2],
    hull_is_top: bool,
    threshold: f32,
) -> Option<f32> {
    for i in 0..hull.len() - 1 {
        let p = hull[i];
        let q = hull[i + 1];
        if (hull_is_top && q.y >= threshold) || (!hull_is_top && q.y <= threshold) {
            return if q.y == threshold {
                Some(q.x)
            } else {
                Some(p.x + (threshold - p.y) * (q.x - p.x) / (q.y - p.y))
            };
        }
    }
    // The hull never crosses the threshold: no possible intersection.
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    fn check(c1: &CubicBezier, c2: &CubicBezier, expected: usize) {
        for (a, b) in &[(c1, c2), (c2, c1)] {
            let isects = curve_intersections(a, b);
            assert_eq!(isects.len(), expected);
            for &(t1, t2) in &isects {
                let p1 = a.point_at(t1);
                let p2 = b.point_at(t2);
                assert!(p1.is_close(p2, 0.5), "{:?} vs {:?}", p1, p2);
            }
        }
    }

    #[test]
    fn crossing_arcs() {
        check(
            &CubicBezier::new(vec2(0.0, 0.0), vec2(0.0, 1.0), vec2(0.0, 1.0), vec2(1.0, 1.0)),
            &CubicBezier::new(vec2(0.0, 1.0), vec2(1.0, 1.0), vec2(1.0, 1.0), vec2(1.0, 0.0)),
            1,
        );
    }

    #[test]
    fn two_crossings() {
        check(
            &CubicBezier::new(vec2(0.0, 0.0), vec2(0.5, 1.0), vec2(0.5, 1.0), vec2(1.0, 0.0)),
            &CubicBezier::new(vec2(0.0, 1.0), vec2(0.5, 0.0), vec2(0.5, 0.0), vec2(1.0, 1.0)),
            2,
        );
    }

    #[test]
    fn line_against_curve() {
        let line = CubicBezier::from_line(vec2(0.0, 0.5), vec2(1.0, 0.5));
        let curve =
            CubicBezier::new(vec2(0.0, 0.0), vec2(0.5, 2.0), vec2(0.5, -1.0), vec2(1.0, 1.0));
        let isects = curve_intersections(&line, &curve);
        assert!(!isects.is_empty());
        for &(t1, t2) in &isects {
            assert!(line.point_at(t1).is_close(curve.point_at(t2), 1e-2));
        }
    }

    #[test]
    fn crossing_lines() {
        check(
            &CubicBezier::from_line(vec2(0.0, 0.0), vec2(10.0, 10.0)),
            &CubicBezier::from_line(vec2(0.0, 10.0), vec2(10.0, 0.0)),
            1,
        );
    }

    #[test]
    fn parallel_lines() {
        check(
            &CubicBezier::from_line(vec2(0.0, 0.0), vec2(10.0, 0.0)),
            &CubicBezier::from_line(vec2(0.0, 1.0), vec2(10.0, 1.0)),
            0,
        );
    }

    #[test]
    fn shared_endpoint_is_not_an_intersection() {
        check(
            &CubicBezier::from_line(vec2(0.0, 0.0), vec2(10.0, 0.0)),
            &CubicBezier::from_line(vec2(10.0, 0.0), vec2(10.0, 10.0)),
            0,
        );
    }
}
