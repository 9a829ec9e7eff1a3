// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Point-in-path testing via monotone curves.
//!
//! Every path curve is subdivided at its y-extrema so each piece is
//! monotonic in y; a horizontal ray from the query point then crosses a
//! piece at most once and the crossings can be counted with signs.

use crate::bezier::{Axis, CubicBezier};
use crate::geom::{Transform, Vec2};
use crate::path::Path;
use crate::{CURVE_TIME_EPSILON, GEOMETRIC_EPSILON, WINDING_EPSILON};

// A y-monotonic curve piece with its crossing direction:
// +1 going down, -1 going up, 0 horizontal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MonoCurve {
    pub bezier: CubicBezier,
    pub winding: i32,
}

// The monotone pieces of one path (one loop per path of a compound path).
#[derive(Clone, Debug)]
pub(crate) struct MonoLoop {
    // Maps a document-space query point into path space.
    pub inverse: Option<Transform>,
    pub curves: Vec<MonoCurve>,
    // The last non-horizontal piece, seeding the previous-winding state.
    pub last: Option<MonoCurve>,
}

fn insert_curve(bezier: CubicBezier, target: &mut MonoLoop) {
    let y0 = bezier.from.y;
    let y1 = bezier.to.y;

    let winding = if ((y0 - y1) / (bezier.from.x - bezier.to.x)).abs() < GEOMETRIC_EPSILON {
        0
    } else if y0 > y1 {
        -1
    } else {
        1
    };

    let curve = MonoCurve { bezier, winding };
    target.curves.push(curve);
    if winding != 0 {
        target.last = Some(curve);
    }
}

fn handle_curve(bezier: CubicBezier, target: &mut MonoLoop) {
    if bezier.is_a_point(f32::EPSILON) {
        return;
    }

    let y0 = bezier.from.y;
    let y1 = bezier.ctrl1.y;
    let y2 = bezier.ctrl2.y;
    let y3 = bezier.to.y;

    // Curves whose control points are sorted in y are already monotonic.
    if bezier.is_linear(f32::EPSILON)
        || ((y0 >= y1) == (y1 >= y2) && (y1 >= y2) == (y2 >= y3))
    {
        insert_curve(bezier, target);
        return;
    }

    // Split at the roots of the y-derivative.
    let a = (y1 - y2) * 3.0 - y0 + y3;
    let b = (y0 + y2) * 2.0 - y1 * 4.0;
    let c = y1 - y0;

    let t_min = CURVE_TIME_EPSILON;
    let t_max = 1.0 - t_min;
    let mut roots = crate::solve::solve_quadratic(a, b, c, t_min, t_max);
    if roots.is_empty() {
        insert_curve(bezier, target);
        return;
    }

    roots.sort();
    let t = roots.as_slice()[0];
    let (first, mut rest) = bezier.split(t);
    insert_curve(first, target);
    if roots.len() > 1 {
        // Renormalize the second extremum to the remaining range.
        let t2 = (roots.as_slice()[1] - t) / (1.0 - t);
        let (first2, rest2) = rest.split(t2);
        insert_curve(first2, target);
        rest = rest2;
    }
    insert_curve(rest, target);
}

// Builds the monotone loop of a single path. Open paths get a synthetic
// closing line so winding is well-defined, just like filling works.
pub(crate) fn build_loop(path: &Path, inverse: Option<Transform>) -> MonoLoop {
    let mut target = MonoLoop {
        inverse,
        curves: Vec::new(),
        last: None,
    };

    for i in 0..path.curve_count() {
        handle_curve(path.bezier(i), &mut target);
    }

    if !path.is_closed() && path.segment_count() > 1 {
        let last = path.segments()[path.segment_count() - 1].position;
        let first = path.segments()[0].position;
        handle_curve(CubicBezier::from_line(last, first), &mut target);
    }

    target
}

// The winding number of `point` against a set of monotone loops.
//
// Crossings are accumulated separately to the left and right of the point
// so that a point exactly on a curve can fall back to the on-curve count.
pub(crate) fn winding(point: Vec2, loops: &[MonoLoop], horizontal: bool) -> i32 {
    let epsilon = WINDING_EPSILON;
    let mut winding_left = 0i32;
    let mut winding_right = 0i32;

    if horizontal {
        // A point on a horizontal curve is ambiguous for monotone pieces.
        // Find the nearest non-horizontal intercepts above and below and
        // resolve there.
        let mut y_top = -f32::INFINITY;
        let mut y_bottom = f32::INFINITY;

        for target in loops {
            let p = match target.inverse {
                Some(m) => m.apply(point),
                None => point,
            };
            let y_before = p.y - epsilon;
            let y_after = p.y + epsilon;
            for curve in &target.curves {
                let roots = curve.bezier.solve_for(p.x, Axis::X, 0.0, 1.0);
                for &t in roots.as_slice() {
                    let y = curve.bezier.point_at(t).y;
                    if y < y_before && y > y_top {
                        y_top = y;
                    } else if y > y_after && y < y_bottom {
                        y_bottom = y;
                    }
                }
            }
        }

        y_top = (y_top + point.y) * 0.5;
        y_bottom = (y_bottom + point.y) * 0.5;
        if y_top > -f32::MAX {
            winding_left = winding(Vec2::new(point.x, y_top), loops, false);
        }
        if y_bottom < f32::MAX {
            winding_right = winding(Vec2::new(point.x, y_bottom), loops, false);
        }
    } else {
        let mut wind_left_on_curve = 0i32;
        let mut wind_right_on_curve = 0i32;

        for target in loops {
            let p = match target.inverse {
                Some(m) => m.apply(point),
                None => point,
            };
            let x_before = p.x - epsilon;
            let x_after = p.x + epsilon;

            let mut prev_winding = target.last.map_or(0, |c| c.winding);
            let mut prev_x_end = target.last.map_or(0.0, |c| c.bezier.to.x);
            let mut is_on_curve = false;

            for (i, curve) in target.curves.iter().enumerate() {
                let y_start = curve.bezier.from.y;
                let y_end = curve.bezier.to.y;

                // Monotonicity makes the endpoint comparison sufficient to
                // know whether the ray can hit this piece at all.
                if (p.y >= y_start && p.y <= y_end) || (p.y >= y_end && p.y <= y_start) {
                    if curve.winding != 0 {
                        let mut x = 0.0;
                        let mut got_x = true;
                        if p.y == y_start {
                            x = curve.bezier.from.x;
                        } else if p.y == y_end {
                            x = curve.bezier.to.x;
                        } else {
                            let roots = curve.bezier.solve_for(p.y, Axis::Y, 0.0, 1.0);
                            if roots.len() == 1 {
                                x = curve.bezier.point_at(roots.as_slice()[0]).x;
                            } else {
                                got_x = false;
                            }
                        }

                        if got_x {
                            if x >= x_before && x <= x_after {
                                is_on_curve = true;
                            } else if
                            // Skip a crossing exactly at the start of the
                            // curve unless the winding changed there: the
                            // previous curve already counted it.
                            (p.y != y_start || curve.winding != prev_winding)
                                // Also skip when the point sits on the
                                // horizontal connection between the last
                                // non-horizontal end and this start.
                                && !(p.y == y_start && (p.x - x) * (p.x - prev_x_end) < 0.0)
                            {
                                if x < x_before {
                                    winding_left += curve.winding;
                                } else if x > x_after {
                                    winding_right += curve.winding;
                                }
                            }
                        }

                        prev_winding = curve.winding;
                        prev_x_end = curve.bezier.to.x;
                    } else if (p.x - curve.bezier.from.x) * (p.x - curve.bezier.to.x) <= 0.0 {
                        is_on_curve = true;
                    }
                }

                // A point on some curve of this loop counts as inside when
                // nothing else decides.
                if is_on_curve && i + 1 >= target.curves.len() {
                    wind_left_on_curve += 1;
                    wind_right_on_curve -= 1;
                }
            }
        }

        if winding_left == 0 && winding_right == 0 {
            winding_left = wind_left_on_curve;
            winding_right = wind_right_on_curve;
        }
    }

    winding_left.abs().max(winding_right.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;
    use crate::path::Segment;

    fn unit_square() -> Path {
        let mut path = Path::new();
        path.add_segments(&[
            Segment::point(vec2(0.0, 0.0)),
            Segment::point(vec2(100.0, 0.0)),
            Segment::point(vec2(100.0, 100.0)),
            Segment::point(vec2(0.0, 100.0)),
        ]);
        path.close();
        path
    }

    #[test]
    fn monotone_pieces_of_a_square() {
        let target = build_loop(&unit_square(), None);
        // Two horizontal edges, two vertical ones.
        let horizontals = target.curves.iter().filter(|c| c.winding == 0).count();
        assert_eq!(target.curves.len(), 4);
        assert_eq!(horizontals, 2);
        assert!(target.last.is_some());
    }

    #[test]
    fn winding_inside_square() {
        let loops = vec![build_loop(&unit_square(), None)];
        assert_eq!(winding(vec2(50.0, 50.0), &loops, false), 1);
        assert_eq!(winding(vec2(150.0, 50.0), &loops, false), 0);
        assert_eq!(winding(vec2(-1.0, 50.0), &loops, false), 0);
    }

    #[test]
    fn winding_of_open_path_uses_closing_line() {
        let mut path = Path::new();
        path.add_segments(&[
            Segment::point(vec2(0.0, 0.0)),
            Segment::point(vec2(100.0, 0.0)),
            Segment::point(vec2(50.0, 100.0)),
        ]);
        // Not closed: the synthetic line (50,100) -> (0,0) closes it.
        let loops = vec![build_loop(&path, None)];
        assert_eq!(winding(vec2(50.0, 30.0), &loops, false), 1);
        assert_eq!(winding(vec2(5.0, 80.0), &loops, false), 0);
    }

    #[test]
    fn s_curve_splits_at_extrema() {
        let mut target = MonoLoop {
            inverse: None,
            curves: Vec::new(),
            last: None,
        };
        // An s-shaped curve with two interior y-extrema.
        handle_curve(
            CubicBezier::new(
                vec2(0.0, 0.0),
                vec2(30.0, 120.0),
                vec2(70.0, -120.0),
                vec2(100.0, 0.0),
            ),
            &mut target,
        );
        assert_eq!(target.curves.len(), 3);
        for c in &target.curves {
            // Each piece must be monotone in y.
            let dir = (c.bezier.to.y - c.bezier.from.y).signum();
            let mid = c.bezier.point_at(0.5).y;
            assert!(((mid - c.bezier.from.y) * dir) >= -1e-3);
        }
    }
}
