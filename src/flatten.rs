// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reduction of a path's curves to plain positions.
//!
//! Unlike a max-distance flattener, the recursive variant subdivides
//! adaptively: straight stretches stay coarse while bends are refined
//! until the tangent deviation falls under the angle tolerance.

use crate::bezier::CubicBezier;
use crate::geom::Vec2;
use crate::path::Path;

fn is_flat_enough(curve: &CubicBezier, angle_tolerance: f32) -> bool {
    let chord = curve.to - curve.from;
    if chord.length_sq() == 0.0 {
        return true;
    }

    let angle_to = |handle: Vec2| -> f32 {
        if handle.length_sq() == 0.0 {
            0.0
        } else {
            chord.directed_angle(handle).abs()
        }
    };

    angle_to(curve.ctrl1 - curve.from) <= angle_tolerance
        && angle_to(curve.to - curve.ctrl2) <= angle_tolerance
}

#[allow(clippy::too_many_arguments)]
fn flatten_curve(
    curve: &CubicBezier,
    out: &mut Vec<Vec2>,
    angle_tolerance: f32,
    min_distance: f32,
    depth: usize,
    max_depth: usize,
) {
    let chord_len = curve.from.distance(curve.to);
    let stop = depth >= max_depth
        || is_flat_enough(curve, angle_tolerance)
        || (min_distance > 0.0 && chord_len <= min_distance);

    if stop {
        out.push(curve.from);
    } else {
        let (a, b) = curve.split(0.5);
        flatten_curve(&a, out, angle_tolerance, min_distance, depth + 1, max_depth);
        flatten_curve(&b, out, angle_tolerance, min_distance, depth + 1, max_depth);
    }
}

/// Flattens every curve of `path` to positions within the tolerances.
/// Open paths include their final position.
pub(crate) fn flatten_path(
    path: &Path,
    angle_tolerance: f32,
    min_distance: f32,
    max_recursion: usize,
) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(path.segment_count() * 4);

    for i in 0..path.curve_count() {
        let bezier = path.bezier(i);
        flatten_curve(
            &bezier,
            &mut out,
            angle_tolerance,
            min_distance,
            0,
            max_recursion,
        );
    }

    if !path.is_closed() {
        if let Some(last) = path.segments().last() {
            out.push(last.position);
        }
    }

    out
}

/// Flattens `path` to positions spaced by the regular arc-length step
/// `length / ceil(length / max_distance)`.
pub(crate) fn flatten_path_regular(path: &Path, max_distance: f32) -> Vec<Vec2> {
    let len = path.length();
    if len <= 0.0 || max_distance <= 0.0 {
        return path.segments().iter().map(|s| s.position).collect();
    }

    let count = (len / max_distance).ceil().max(1.0) as usize;
    let step = len / count as f32;

    let mut out = Vec::with_capacity(count + 1);
    for i in 0..count {
        if let Some(p) = path.position_at(i as f32 * step) {
            out.push(p);
        }
    }
    if !path.is_closed() {
        if let Some(p) = path.position_at(len) {
            out.push(p);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::geom::vec2;
    use crate::path::Segment;

    fn arc_path() -> Path {
        let mut segs = Vec::new();
        builder::add_point(&mut segs, vec2(-100.0, 0.0));
        builder::arc_through(&mut segs, vec2(0.0, 100.0), vec2(100.0, 0.0)).unwrap();
        let mut path = Path::new();
        path.add_segments(&segs);
        path
    }

    #[test]
    fn lines_stay_lines() {
        let mut path = Path::new();
        path.add_segments(&[
            Segment::point(vec2(0.0, 0.0)),
            Segment::point(vec2(100.0, 0.0)),
            Segment::point(vec2(100.0, 100.0)),
        ]);
        let positions = flatten_path(&path, 0.25, 0.0, 32);
        assert_eq!(
            positions,
            vec![vec2(0.0, 0.0), vec2(100.0, 0.0), vec2(100.0, 100.0)]
        );
    }

    #[test]
    fn arcs_get_subdivided() {
        let positions = flatten_path(&arc_path(), 0.25, 0.0, 32);
        assert!(positions.len() > 8);
        // All positions stay on the circle.
        for p in &positions {
            assert!((p.length() - 100.0).abs() < 2.0, "{:?}", p);
        }
    }

    #[test]
    fn tighter_tolerance_means_more_points() {
        let coarse = flatten_path(&arc_path(), 0.5, 0.0, 32);
        let fine = flatten_path(&arc_path(), 0.05, 0.0, 32);
        assert!(fine.len() > coarse.len());
    }

    #[test]
    fn regular_flattening_spaces_evenly() {
        let path = arc_path();
        let positions = flatten_path_regular(&path, 10.0);
        assert!(positions.len() > 10);

        let mut prev = positions[0];
        for p in positions.iter().skip(1) {
            let d = prev.distance(*p);
            // Chord lengths of an even arc-length sampling stay even.
            assert!(d < 11.0 && d > 5.0, "step {}", d);
            prev = *p;
        }
    }
}
