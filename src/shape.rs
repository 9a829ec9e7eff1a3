// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Recognition of primitive shapes in path geometry, so the SVG writer
//! can emit `<circle>`, `<ellipse>` and `<rect>` elements.

use crate::geom::{Line, Vec2};
use crate::path::Path;
use crate::{KAPPA, TOLERANCE, TRIG_EPSILON};

/// A primitive shape matched from a path outline.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Shape {
    Circle {
        center: Vec2,
        radius: f32,
    },
    Ellipse {
        center: Vec2,
        // Full diameters.
        size: Vec2,
    },
    Rect {
        center: Vec2,
        size: Vec2,
        corner_radius: Vec2,
    },
}

fn handle1(path: &Path, curve: usize) -> Vec2 {
    let seg = path.segments()[curve];
    seg.handle_out - seg.position
}

fn handle2(path: &Path, curve: usize) -> Vec2 {
    let n = path.segment_count();
    let seg = path.segments()[(curve + 1) % n];
    seg.handle_in - seg.position
}

fn curve_is_linear(path: &Path, curve: usize) -> bool {
    handle1(path, curve).is_close(Vec2::ZERO, TOLERANCE)
        && handle2(path, curve).is_close(Vec2::ZERO, TOLERANCE)
}

fn is_orthogonal(a: Vec2, b: Vec2, tolerance: f32) -> bool {
    a.normalized().dot(b.normalized()).abs() <= tolerance
}

fn is_collinear(a: Vec2, b: Vec2, tolerance: f32) -> bool {
    a.normalized().cross(b.normalized()).abs() <= tolerance
}

// A curve is a circular-arc approximation when its handles are orthogonal
// and their lengths relate to the corner distance by kappa.
fn curve_is_arc(path: &Path, curve: usize) -> bool {
    let h1 = handle1(path, curve);
    let h2 = handle2(path, curve);
    if !is_orthogonal(h1, h2, TOLERANCE) {
        return false;
    }

    let bez = path.bezier(curve);
    let line1 = Line::through(bez.from, bez.ctrl1);
    let line2 = Line::through(bez.to, bez.ctrl2);
    let corner = match line1.intersect(&line2) {
        Some(corner) => corner,
        None => return false,
    };

    let d1 = (corner - bez.from).length();
    let d2 = (corner - bez.to).length();
    if d1 <= 0.0 || d2 <= 0.0 {
        return false;
    }

    (h1.length() / d1 - KAPPA).abs() <= TRIG_EPSILON
        && (h2.length() / d2 - KAPPA).abs() <= TRIG_EPSILON
}

fn curves_collinear(path: &Path, a: usize, b: usize) -> bool {
    if !curve_is_linear(path, a) || !curve_is_linear(path, b) {
        return false;
    }
    let ba = path.bezier(a);
    let bb = path.bezier(b);
    is_collinear(ba.from - ba.to, bb.from - bb.to, TOLERANCE)
}

fn curves_orthogonal(path: &Path, a: usize, b: usize) -> bool {
    if !curve_is_linear(path, a) || !curve_is_linear(path, b) {
        return false;
    }
    let ba = path.bezier(a);
    let bb = path.bezier(b);
    is_orthogonal(ba.from - ba.to, bb.from - bb.to, TOLERANCE)
}

/// Tries to classify `path` as a circle, ellipse, rectangle or rounded
/// rectangle. `bounds_center` is the center of the path's fill bounds.
pub(crate) fn match_shape(path: &Path, bounds_center: Vec2) -> Option<Shape> {
    let curves = path.curve_count();
    let segs = path.segments();

    if curves == 4 && (0..4).all(|i| curve_is_arc(path, i)) {
        let d02 = segs[0].position.distance(segs[2].position);
        let d13 = segs[1].position.distance(segs[3].position);
        let center = segs[2].position + (segs[0].position - segs[2].position) * 0.5;
        if (d02 - d13).abs() <= TRIG_EPSILON * d02.max(1.0) {
            return Some(Shape::Circle {
                center,
                radius: d02 * 0.5,
            });
        }
        return Some(Shape::Ellipse {
            center,
            size: Vec2::new(d02, d13),
        });
    }

    if path.is_polygon()
        && curves == 4
        && curves_collinear(path, 0, 2)
        && curves_collinear(path, 1, 3)
        && curves_orthogonal(path, 1, 0)
    {
        let w = segs[0].position.x - segs[3].position.x;
        let h = segs[2].position.y - segs[3].position.y;
        return Some(Shape::Rect {
            center: Vec2::new(
                segs[3].position.x + w * 0.5,
                segs[3].position.y + h * 0.5,
            ),
            size: Vec2::new(w, h),
            corner_radius: Vec2::ZERO,
        });
    }

    if curves == 8
        && [1, 3, 5, 7].iter().all(|&i| curve_is_arc(path, i))
        && curves_collinear(path, 0, 4)
        && curves_collinear(path, 2, 6)
    {
        // Corner radii follow from the arc tangent lengths.
        let rx = handle2(path, 1).length() / KAPPA;
        let ry = handle1(path, 1).length() / KAPPA;
        let edge_x = path.bezier(2).from.distance(path.bezier(2).to);
        let edge_y = path.bezier(0).from.distance(path.bezier(0).to);
        return Some(Shape::Rect {
            center: bounds_center,
            size: Vec2::new(edge_x + 2.0 * rx, edge_y + 2.0 * ry),
            corner_radius: Vec2::new(rx, ry),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;
    use crate::tree::Document;

    #[test]
    fn circle_is_matched() {
        let mut doc = Document::new();
        let id = doc.create_circle(vec2(30.0, 40.0), 25.0, "");
        let path = doc.path(id).unwrap();
        match match_shape(path, doc.bounds(id).center()) {
            Some(Shape::Circle { center, radius }) => {
                assert!(center.is_close(vec2(30.0, 40.0), 1e-3));
                assert!((radius - 25.0).abs() < 1e-3);
            }
            other => panic!("expected a circle, got {:?}", other),
        }
    }

    #[test]
    fn ellipse_is_matched() {
        let mut doc = Document::new();
        let id = doc.create_ellipse(vec2(0.0, 0.0), vec2(100.0, 60.0), "");
        let path = doc.path(id).unwrap();
        match match_shape(path, doc.bounds(id).center()) {
            Some(Shape::Ellipse { center, size }) => {
                assert!(center.is_close(vec2(0.0, 0.0), 1e-3));
                assert!(size.is_close(vec2(100.0, 60.0), 1e-2));
            }
            other => panic!("expected an ellipse, got {:?}", other),
        }
    }

    #[test]
    fn rectangle_is_matched() {
        let mut doc = Document::new();
        let id = doc.create_rectangle(vec2(10.0, 20.0), vec2(110.0, 70.0), "");
        let path = doc.path(id).unwrap();
        match match_shape(path, doc.bounds(id).center()) {
            Some(Shape::Rect { center, size, corner_radius }) => {
                assert!(center.is_close(vec2(60.0, 45.0), 1e-3));
                assert!(size.abs().is_close(vec2(100.0, 50.0), 1e-3));
                assert_eq!(corner_radius, Vec2::ZERO);
            }
            other => panic!("expected a rectangle, got {:?}", other),
        }
    }

    #[test]
    fn rounded_rectangle_is_matched() {
        let mut doc = Document::new();
        let id = doc.create_rounded_rectangle(
            vec2(0.0, 0.0),
            vec2(100.0, 50.0),
            vec2(10.0, 10.0),
            "",
        );
        let path = doc.path(id).unwrap();
        match match_shape(path, doc.bounds(id).center()) {
            Some(Shape::Rect { center, size, corner_radius }) => {
                assert!(center.is_close(vec2(50.0, 25.0), 1e-2));
                assert!(size.is_close(vec2(100.0, 50.0), 1e-2));
                assert!(corner_radius.is_close(vec2(10.0, 10.0), 1e-2));
            }
            other => panic!("expected a rounded rectangle, got {:?}", other),
        }
    }

    #[test]
    fn free_form_path_is_not_matched() {
        let mut doc = Document::new();
        let id = doc.create_path("");
        doc.add_point(id, vec2(0.0, 0.0));
        doc.add_point(id, vec2(100.0, 10.0));
        doc.add_point(id, vec2(40.0, 80.0));
        doc.close_path(id);
        let path = doc.path(id).unwrap();
        assert!(match_shape(path, doc.bounds(id).center()).is_none());
    }
}
