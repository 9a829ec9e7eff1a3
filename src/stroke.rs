// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cap and join corner math for stroke bounds.
//!
//! All functions here work in "stroke space", a scaling of the geometry in
//! which the stroke radius is exactly 1. Corners are mapped back through
//! `stroke_mat` and, if present, the item transform.

use crate::bezier::CubicBezier;
use crate::geom::{Line, Rect, Transform, Vec2};
use crate::path::Segment;
use crate::{StrokeCap, StrokeJoin};

#[inline]
fn merge_mapped(rect: &mut Rect, p: Vec2, stroke_mat: &Transform, ts: Option<&Transform>) {
    let p = stroke_mat.apply(p);
    let p = match ts {
        Some(m) => m.apply(p),
        None => p,
    };
    *rect = rect.merged_point(p);
}

// The two outer corners of a butt cap or bevel join: one stroke radius to
// either side of the anchor, perpendicular to the tangent.
fn bevel_corners(position: Vec2, direction: Vec2) -> (Vec2, Vec2) {
    let perp = Vec2::new(direction.y, -direction.x);
    (position + perp, position - perp)
}

// The two outer corners of a square cap: the butt corners pushed one
// stroke radius forward along the tangent.
fn square_corners(position: Vec2, direction: Vec2) -> (Vec2, Vec2) {
    let (a, b) = bevel_corners(position, direction);
    (a + direction, b + direction)
}

// The miter apex for the two outward stroke edges, and the ratio of the
// miter length to the stroke radius.
fn miter_apex(
    position: Vec2,
    edge1: Vec2,
    dir1: Vec2,
    edge2: Vec2,
    dir2: Vec2,
) -> Option<(Vec2, f32)> {
    let apex = Line::new(edge1, dir1).intersect(&Line::new(edge2, dir2))?;
    Some((apex, apex.distance(position)))
}

// The half-extents of the stroke circle pushed through `mat`: the bounding
// box of the resulting rotated ellipse.
pub(crate) fn stroke_padding(radius: f32, mat: &Transform) -> Vec2 {
    let hor = mat.apply_direction(Vec2::new(radius, 0.0));
    let ver = mat.apply_direction(Vec2::new(0.0, radius));
    let phi = hor.y.atan2(hor.x);
    let hlen = hor.length();
    let vlen = ver.length();

    // Extrema of the rotated ellipse
    //   x = a·cos(t)·cos(phi) - b·sin(t)·sin(phi)
    //   y = b·sin(t)·cos(phi) + a·cos(t)·sin(phi)
    // solved for dx/dt = 0 and dy/dt = 0.
    let s = phi.sin();
    let c = phi.cos();
    let t = phi.tan();
    let tx = (vlen * t).atan2(hlen);
    let ty = vlen.atan2(t * hlen);
    Vec2::new(
        hlen * tx.cos() * c + vlen * tx.sin() * s,
        vlen * ty.sin() * c + hlen * ty.cos() * s,
    )
    .abs()
}

pub(crate) fn merge_cap(
    rect: &mut Rect,
    cap: StrokeCap,
    a: &Segment,
    b: &Segment,
    at_start: bool,
    padding: Vec2,
    stroke_mat: &Transform,
    ts: Option<&Transform>,
) {
    let curve = CubicBezier::new(a.position, a.handle_out, b.handle_in, b.position);
    let dir = if at_start {
        -curve.tangent_at(0.0)
    } else {
        curve.tangent_at(1.0)
    };
    let pos = if at_start { a.position } else { b.position };

    match cap {
        StrokeCap::Square => {
            let (c, d) = square_corners(pos, dir);
            merge_mapped(rect, c, stroke_mat, ts);
            merge_mapped(rect, d, stroke_mat, ts);
        }
        StrokeCap::Round => {
            let p = stroke_mat.apply(pos);
            let p = match ts {
                Some(m) => m.apply(p),
                None => p,
            };
            *rect = rect.merged(&Rect::new(p - padding, p + padding));
        }
        StrokeCap::Butt => {
            let (min, max) = bevel_corners(pos, dir);
            merge_mapped(rect, min, stroke_mat, ts);
            merge_mapped(rect, max, stroke_mat, ts);
        }
    }
}

pub(crate) fn merge_join(
    rect: &mut Rect,
    join: StrokeJoin,
    miter_limit: f32,
    prev: &Segment,
    current: &Segment,
    next: &Segment,
    padding: Vec2,
    stroke_mat: &Transform,
    ts: Option<&Transform>,
) {
    match join {
        StrokeJoin::Round => {
            let p = stroke_mat.apply(current.position);
            let p = match ts {
                Some(m) => m.apply(p),
                None => p,
            };
            *rect = rect.merged(&Rect::new(p - padding, p + padding));
        }
        StrokeJoin::Miter => {
            let curve_in =
                CubicBezier::new(prev.position, prev.handle_out, current.handle_in, current.position);
            let curve_out =
                CubicBezier::new(current.position, current.handle_out, next.handle_in, next.position);

            let last_dir = curve_in.tangent_at(1.0);
            let next_dir = curve_out.tangent_at(0.0);
            let last_perp = Vec2::new(last_dir.y, -last_dir.x);
            let next_perp = Vec2::new(next_dir.y, -next_dir.x);
            let cross = last_dir.cross(next_dir);

            let pos = current.position;
            let apex = if cross >= 0.0 {
                miter_apex(pos, pos + last_perp, last_dir, pos + next_perp, next_dir)
            } else {
                miter_apex(pos, pos - last_perp, last_dir, pos - next_perp, next_dir)
            };

            if let Some((apex, miter_ratio)) = apex {
                if miter_ratio <= miter_limit {
                    merge_mapped(rect, apex, stroke_mat, ts);
                    return;
                }
            }
            // Over the limit (or parallel edges): bevel.
            merge_bevel_join(rect, prev, current, next, stroke_mat, ts);
        }
        StrokeJoin::Bevel => {
            merge_bevel_join(rect, prev, current, next, stroke_mat, ts);
        }
    }
}

fn merge_bevel_join(
    rect: &mut Rect,
    prev: &Segment,
    current: &Segment,
    next: &Segment,
    stroke_mat: &Transform,
    ts: Option<&Transform>,
) {
    let curve_in =
        CubicBezier::new(prev.position, prev.handle_out, current.handle_in, current.position);
    let curve_out =
        CubicBezier::new(current.position, current.handle_out, next.handle_in, next.position);

    for dir in &[curve_in.tangent_at(1.0), curve_out.tangent_at(0.0)] {
        let (min, max) = bevel_corners(current.position, *dir);
        merge_mapped(rect, min, stroke_mat, ts);
        merge_mapped(rect, max, stroke_mat, ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    #[test]
    fn padding_of_identity_is_the_radius() {
        let p = stroke_padding(10.0, &Transform::identity());
        assert!(p.is_close(vec2(10.0, 10.0), 1e-4));
    }

    #[test]
    fn padding_of_rotation_is_the_radius() {
        // Rotating a circle changes nothing.
        let p = stroke_padding(10.0, &Transform::from_rotation(0.7));
        assert!(p.is_close(vec2(10.0, 10.0), 1e-3));
    }

    #[test]
    fn padding_of_scale_follows_the_axes() {
        let p = stroke_padding(10.0, &Transform::from_scale(2.0, 3.0));
        assert!(p.is_close(vec2(20.0, 30.0), 1e-3));
    }

    #[test]
    fn square_cap_extends_forward() {
        let (a, b) = square_corners(vec2(0.0, 0.0), vec2(1.0, 0.0));
        assert!(a.is_close(vec2(1.0, -1.0), 1e-6) || a.is_close(vec2(1.0, 1.0), 1e-6));
        assert!((a.x - 1.0).abs() < 1e-6 && (b.x - 1.0).abs() < 1e-6);
        assert!((a.y + b.y).abs() < 1e-6);
    }

    #[test]
    fn right_angle_miter_ratio_is_sqrt_two() {
        // Two unit-radius stroke edges meeting at 90°.
        let pos = vec2(0.0, 0.0);
        let last_dir = vec2(1.0, 0.0);
        let next_dir = vec2(0.0, 1.0);
        let last_perp = Vec2::new(last_dir.y, -last_dir.x);
        let next_perp = Vec2::new(next_dir.y, -next_dir.x);
        let (_, ratio) =
            miter_apex(pos, pos - last_perp, last_dir, pos - next_perp, next_dir).unwrap();
        assert!((ratio - std::f32::consts::SQRT_2).abs() < 1e-4);
    }
}
