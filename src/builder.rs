// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Post-script style construction commands over a plain segment buffer.
//!
//! Keeping these as free functions makes them testable on their own and
//! lets the SVG reader accumulate into a local buffer before handing the
//! segments to a path.

use crate::error::Error;
use crate::geom::{Line, Transform, Vec2};
use crate::path::Segment;
use crate::TRIG_EPSILON;

#[inline]
fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Appends a handle-free segment at `to`.
pub fn add_point(segments: &mut Vec<Segment>, to: Vec2) {
    segments.push(Segment::point(to));
}

/// Appends a cubic curve through the two absolute handles to `to`.
pub fn cubic_curve_to(segments: &mut Vec<Segment>, handle1: Vec2, handle2: Vec2, to: Vec2) {
    debug_assert!(!segments.is_empty());
    let current = match segments.last_mut() {
        Some(seg) => seg,
        None => return,
    };

    current.handle_out = handle1;
    segments.push(Segment {
        handle_in: handle2,
        position: to,
        handle_out: to,
    });
}

/// Appends a quadratic curve, converted exactly to a cubic:
/// for quad points A E D the cubic handles are `B = E + (A - E)/3` and
/// `C = E + (D - E)/3`.
pub fn quadratic_curve_to(segments: &mut Vec<Segment>, handle: Vec2, to: Vec2) {
    debug_assert!(!segments.is_empty());
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return,
    };

    cubic_curve_to(
        segments,
        handle + (from - handle) / 3.0,
        handle + (to - handle) / 3.0,
        to,
    );
}

/// Appends a curve that passes through `through` at parameter `t`.
pub fn curve_through(segments: &mut Vec<Segment>, through: Vec2, to: Vec2, t: f32) {
    debug_assert!(!segments.is_empty());
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return,
    };

    let t1 = 1.0 - t;
    let handle = (through - from * (t1 * t1) - to * (t * t)) / (2.0 * t * t1);
    quadratic_curve_to(segments, handle, to);
}

/// Appends a circular arc through `through` ending at `to`.
///
/// The circle is found by intersecting the perpendicular bisectors of the
/// two chords; collinear inputs degrade to a line.
pub fn arc_through(segments: &mut Vec<Segment>, through: Vec2, to: Vec2) -> Result<(), Error> {
    debug_assert!(!segments.is_empty());
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return Ok(()),
    };

    let bisector1 = Line::new((from + through) * 0.5, perpendicular(through - from));
    let bisector2 = Line::new((through + to) * 0.5, perpendicular(to - through));
    let chord = Line::through(from, to);
    let through_side = chord.side(through);

    let center = match bisector1.intersect(&bisector2) {
        Some(center) => center,
        None => {
            if through_side == 0 {
                // All three points are collinear: the arc of the
                // infinitely large circle is the chord itself.
                add_point(segments, to);
                return Ok(());
            }
            return Err(Error::InvalidArgument(format!(
                "cannot put an arc through ({} {}) and ({} {})",
                through.x, through.y, to.x, to.y
            )));
        }
    };

    let vec = from - center;
    let mut extent = vec.directed_angle(to - center).to_degrees();
    let center_side = chord.side(center);
    if center_side == 0 {
        // The center lies on the chord, so the extent sign is ambiguous;
        // use the side the through point is on.
        extent = through_side as f32 * extent.abs();
    } else if through_side == center_side {
        // The arc spans more than 180 degrees.
        extent -= 360.0 * if extent < 0.0 { -1.0 } else { 1.0 };
    }

    arc_helper(segments, extent, vec, to, center, None);
    Ok(())
}

/// Appends a half-circle-ish sweep to `to` in the requested direction.
pub fn arc_to(segments: &mut Vec<Segment>, to: Vec2, clockwise: bool) -> Result<(), Error> {
    debug_assert!(!segments.is_empty());
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return Ok(()),
    };

    let mid = (from + to) * 0.5;
    let dir = mid - from;
    let dir = if clockwise {
        Vec2::new(dir.y, -dir.x)
    } else {
        Vec2::new(-dir.y, dir.x)
    };
    arc_through(segments, mid + dir, to)
}

/// Appends an SVG elliptical arc: endpoint parameterization with radii,
/// x-axis rotation, sweep and large-arc flags, converted to cubics.
pub fn arc_to_with_radii(
    segments: &mut Vec<Segment>,
    to: Vec2,
    radii: Vec2,
    rotation: f32,
    clockwise: bool,
    large: bool,
) -> Result<(), Error> {
    debug_assert!(!segments.is_empty());
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return Ok(()),
    };

    if !radii.is_finite() || !to.is_finite() {
        return Err(Error::InvalidArgument(
            "arc radii and end point must be finite".to_string(),
        ));
    }
    if radii.x.abs() <= TRIG_EPSILON || radii.y.abs() <= TRIG_EPSILON {
        add_point(segments, to);
        return Ok(());
    }

    // SVG 1.1 F.6.5: endpoint to center parameterization.
    let middle = (from + to) * 0.5;
    let pt = (from - middle).rotated(-rotation);
    let mut rx = radii.x.abs();
    let mut ry = radii.y.abs();
    let mut rx_sq = rx * rx;
    let mut ry_sq = ry * ry;
    let x_sq = pt.x * pt.x;
    let y_sq = pt.y * pt.y;

    // Radii too small to span the endpoints are scaled up uniformly.
    let factor = (x_sq / rx_sq + y_sq / ry_sq).sqrt();
    if factor > 1.0 {
        rx *= factor;
        ry *= factor;
        rx_sq = rx * rx;
        ry_sq = ry * ry;
    }

    let mut factor = (rx_sq * ry_sq - rx_sq * y_sq - ry_sq * x_sq) / (rx_sq * y_sq + ry_sq * x_sq);
    if factor.abs() < TRIG_EPSILON {
        factor = 0.0;
    }
    if factor < 0.0 {
        return Err(Error::InvalidArgument(
            "cannot create an arc with the given arguments".to_string(),
        ));
    }

    let center = Vec2::new(rx * pt.y / ry, -ry * pt.x / rx);
    let sign = if large == clockwise { -1.0 } else { 1.0 };
    let center = (center * (sign * factor.sqrt())).rotated(rotation) + middle;

    // A matrix mapping the unit circle onto the ellipse keeps the
    // quarter-segment walk below circular.
    let matrix = Transform::from_translation(center)
        * Transform::from_rotation(rotation)
        * Transform::from_scale(rx, ry);
    let inverse = match matrix.inverse() {
        Some(inv) => inv,
        None => {
            return Err(Error::InvalidArgument(
                "cannot create an arc with the given arguments".to_string(),
            ));
        }
    };

    let vect = inverse.apply(from);
    let mut extent = vect.directed_angle(inverse.apply(to));
    if !clockwise && extent > 0.0 {
        extent -= 2.0 * std::f32::consts::PI;
    } else if clockwise && extent < 0.0 {
        extent += 2.0 * std::f32::consts::PI;
    }

    arc_helper(
        segments,
        extent.to_degrees(),
        vect,
        to,
        center,
        Some(&matrix),
    );
    Ok(())
}

// Walks an arc in at most four quarter-turn cubic segments. `direction`
// points from the center to the start; with a `transform` the walk runs
// on the unit circle and is mapped into place.
pub(crate) fn arc_helper(
    segments: &mut Vec<Segment>,
    extent_deg: f32,
    direction: Vec2,
    to: Vec2,
    center: Vec2,
    transform: Option<&Transform>,
) {
    let ext = extent_deg.abs();
    let count = if ext >= 360.0 {
        4
    } else {
        (ext / 90.0).ceil().max(1.0) as i32
    };
    let inc = extent_deg / count as f32;
    let half = inc.to_radians() * 0.5;
    let z = 4.0 / 3.0 * half.sin() / (1.0 + half.cos());
    let mut dir = direction;

    for i in 0..=count {
        // Use the exact end point for the last segment; accumulating the
        // rotation adds imprecision.
        let mut pt = to;
        let mut out = Vec2::new(-dir.y * z, dir.x * z);
        if i < count {
            match transform {
                Some(m) => {
                    pt = m.apply(dir);
                    out = m.apply(dir + out) - pt;
                }
                None => {
                    pt = center + dir;
                }
            }
        }

        if i == 0 {
            let last = segments.last_mut().unwrap();
            last.handle_out = last.position + out;
        } else {
            let inward = Vec2::new(dir.y * z, -dir.x * z);
            let handle_in = match transform {
                Some(m) => m.apply(dir + inward),
                None => pt + inward,
            };
            segments.push(Segment {
                handle_in,
                position: pt,
                handle_out: if i < count { pt + out } else { pt },
            });
        }

        dir = dir.rotated(inc.to_radians());
    }
}

/// Relative form of [`cubic_curve_to`].
pub fn cubic_curve_by(segments: &mut Vec<Segment>, handle1: Vec2, handle2: Vec2, by: Vec2) {
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return,
    };
    cubic_curve_to(segments, from + handle1, from + handle2, from + by);
}

/// Relative form of [`quadratic_curve_to`].
pub fn quadratic_curve_by(segments: &mut Vec<Segment>, handle: Vec2, by: Vec2) {
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return,
    };
    quadratic_curve_to(segments, from + handle, from + by);
}

/// Relative form of [`curve_through`].
pub fn curve_through_by(segments: &mut Vec<Segment>, through: Vec2, by: Vec2, t: f32) {
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return,
    };
    curve_through(segments, from + through, from + by, t);
}

/// Relative form of [`arc_through`].
pub fn arc_through_by(segments: &mut Vec<Segment>, through: Vec2, by: Vec2) -> Result<(), Error> {
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return Ok(()),
    };
    arc_through(segments, from + through, from + by)
}

/// Relative form of [`arc_to`].
pub fn arc_by(segments: &mut Vec<Segment>, by: Vec2, clockwise: bool) -> Result<(), Error> {
    let from = match segments.last() {
        Some(seg) => seg.position,
        None => return Ok(()),
    };
    arc_to(segments, from + by, clockwise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    #[test]
    fn quadratic_conversion_is_exact() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(0.0, 0.0));
        quadratic_curve_to(&mut segs, vec2(50.0, 100.0), vec2(100.0, 0.0));

        assert_eq!(segs.len(), 2);
        // B = E + (A - E)/3 and C = E + (D - E)/3.
        assert!(segs[0].handle_out.is_close(vec2(100.0 / 3.0, 200.0 / 3.0), 1e-4));
        assert!(segs[1].handle_in.is_close(vec2(200.0 / 3.0, 200.0 / 3.0), 1e-4));
    }

    #[test]
    fn curve_through_passes_through() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(0.0, 0.0));
        let through = vec2(50.0, 80.0);
        curve_through(&mut segs, through, vec2(100.0, 0.0), 0.5);

        let bez = crate::bezier::CubicBezier::new(
            segs[0].position,
            segs[0].handle_out,
            segs[1].handle_in,
            segs[1].position,
        );
        assert!(bez.point_at(0.5).is_close(through, 1e-3));
    }

    #[test]
    fn curve_through_respects_parameter() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(0.0, 0.0));
        let through = vec2(20.0, 40.0);
        curve_through(&mut segs, through, vec2(100.0, 0.0), 0.25);

        let bez = crate::bezier::CubicBezier::new(
            segs[0].position,
            segs[0].handle_out,
            segs[1].handle_in,
            segs[1].position,
        );
        assert!(bez.point_at(0.25).is_close(through, 1e-3));
    }

    #[test]
    fn arc_through_builds_half_circle() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(-100.0, 0.0));
        arc_through(&mut segs, vec2(0.0, 100.0), vec2(100.0, 0.0)).unwrap();

        // Every anchor stays on the radius-100 circle around the origin.
        for seg in &segs {
            assert!((seg.position.length() - 100.0).abs() < 1e-2, "{:?}", seg);
        }
        assert_eq!(segs.last().unwrap().position, vec2(100.0, 0.0));
    }

    #[test]
    fn arc_through_collinear_falls_back_to_line() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(0.0, 0.0));
        arc_through(&mut segs, vec2(50.0, 0.0), vec2(100.0, 0.0)).unwrap();
        assert_eq!(segs.len(), 2);
        assert!(segs[1].is_linear());
    }

    #[test]
    fn elliptical_arc_reaches_endpoint() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(0.0, 0.0));
        arc_to_with_radii(&mut segs, vec2(100.0, 0.0), vec2(50.0, 50.0), 0.0, true, false)
            .unwrap();
        assert_eq!(segs.last().unwrap().position, vec2(100.0, 0.0));
        assert!(segs.len() > 2);
    }

    #[test]
    fn elliptical_arc_scales_small_radii() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(0.0, 0.0));
        // A radius of 10 cannot span 100 units; it must be scaled up.
        arc_to_with_radii(&mut segs, vec2(100.0, 0.0), vec2(10.0, 10.0), 0.0, true, false)
            .unwrap();
        assert_eq!(segs.last().unwrap().position, vec2(100.0, 0.0));
    }

    #[test]
    fn relative_commands_take_the_last_point() {
        let mut segs = Vec::new();
        add_point(&mut segs, vec2(10.0, 10.0));
        cubic_curve_by(&mut segs, vec2(0.0, -10.0), vec2(20.0, -10.0), vec2(20.0, 0.0));
        assert_eq!(segs.last().unwrap().position, vec2(30.0, 10.0));
        assert_eq!(segs[0].handle_out, vec2(10.0, 0.0));
    }
}
