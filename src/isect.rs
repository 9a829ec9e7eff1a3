// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Path-level intersection queries: all curve pairs of two paths (or one
//! path against itself), with adjacency and duplicate filtering.

use crate::bezier_isect::curve_intersections;
use crate::geom::Vec2;
use crate::path::CurveLocation;
use crate::tree::{Document, ItemId};
use crate::{ItemType, CURVE_TIME_EPSILON, GEOMETRIC_EPSILON};

/// A point where two path curves cross.
#[derive(Clone, Copy, Debug)]
pub struct Intersection {
    /// The path the location below belongs to.
    pub path: ItemId,
    /// Where along that path the crossing happens.
    pub location: CurveLocation,
    /// The crossing point.
    pub position: Vec2,
}

// Adjacent curves share an endpoint by construction; a crossing there is
// connectivity, not an intersection.
fn is_adjacent(a: usize, b: usize, curve_count: usize, closed: bool) -> bool {
    b == a + 1 || (closed && a == 0 && b == curve_count - 1)
}

impl Document {
    fn intersect_paths(&self, a: ItemId, b: ItemId, out: &mut Vec<Intersection>) {
        let path_a = match self.path(a) {
            Some(p) => p,
            None => return,
        };
        let path_b = match self.path(b) {
            Some(p) => p,
            None => return,
        };

        let same_path = a == b;
        let count_a = path_a.curve_count();
        let count_b = path_b.curve_count();

        for i in 0..count_a {
            let bez_a = path_a.bezier(i);
            let j0 = if same_path { i + 1 } else { 0 };
            for j in j0..count_b {
                let bez_b = path_b.bezier(j);
                for (t1, t2) in curve_intersections(&bez_a, &bez_b) {
                    if same_path && is_adjacent(i, j, count_a, path_a.is_closed()) {
                        let t1_at_end = (t1 - 1.0).abs() < CURVE_TIME_EPSILON
                            && t2 < CURVE_TIME_EPSILON;
                        // The wraparound case of a closed path, where the
                        // first curve meets the last one.
                        let wrapped = path_a.is_closed()
                            && t1 < CURVE_TIME_EPSILON
                            && (t2 - 1.0).abs() < CURVE_TIME_EPSILON;
                        if t1_at_end || wrapped {
                            continue;
                        }
                    }

                    let offset = path_a.curve_offset(i) + bez_a.length_between(0.0, t1);
                    let location = CurveLocation {
                        curve: i,
                        time: t1,
                        offset,
                    };

                    // Drop crossings that are synonymous with an already
                    // recorded one: same path, offsets within the
                    // geometric epsilon, also modulo the path length.
                    let path_len = path_a.length();
                    let duplicate = out.iter().any(|isect| {
                        if isect.path != a {
                            return false;
                        }
                        let diff = (isect.location.offset - offset).abs();
                        diff < GEOMETRIC_EPSILON || (path_len - diff).abs() < GEOMETRIC_EPSILON
                    });
                    if duplicate {
                        continue;
                    }

                    out.push(Intersection {
                        path: a,
                        location,
                        position: bez_a.point_at(t1),
                    });
                }
            }
        }
    }

    // Depth-first list of a compound path's leaves, root included.
    fn flatten_path_tree(&self, id: ItemId, out: &mut Vec<ItemId>) {
        if self.item_type(id) == ItemType::Path {
            out.push(id);
        }
        for &child in self.children(id) {
            self.flatten_path_tree(child, out);
        }
    }

    /// The self-intersections of a path, considering all leaves of a
    /// compound path against each other and against themselves.
    pub fn self_intersections(&self, id: ItemId) -> Vec<Intersection> {
        let mut paths = Vec::new();
        self.flatten_path_tree(id, &mut paths);

        let mut out = Vec::new();
        for i in 0..paths.len() {
            for j in i..paths.len() {
                self.intersect_paths(paths[i], paths[j], &mut out);
            }
        }
        out
    }

    /// The intersections between two paths (compound paths are recursed
    /// so every leaf is tested against every leaf).
    ///
    /// Curve geometry is compared in each path's local space; locations
    /// are reported along `a`.
    pub fn intersections(&self, a: ItemId, b: ItemId) -> Vec<Intersection> {
        if a == b {
            return self.self_intersections(a);
        }

        let bounds_a = self.bounds(a);
        let bounds_b = self.bounds(b);
        if bounds_a.is_no_bounds() || bounds_b.is_no_bounds() || !bounds_a.overlaps(&bounds_b) {
            return Vec::new();
        }

        let mut leaves_a = Vec::new();
        self.flatten_path_tree(a, &mut leaves_a);
        let mut leaves_b = Vec::new();
        self.flatten_path_tree(b, &mut leaves_b);

        let mut out = Vec::new();
        for &pa in &leaves_a {
            for &pb in &leaves_b {
                self.intersect_paths(pa, pb, &mut out);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    #[test]
    fn line_against_circle() {
        let mut doc = Document::new();
        let circle = doc.create_circle(vec2(100.0, 100.0), 100.0, "");
        let line = doc.create_path("");
        doc.add_point(line, vec2(-100.0, 100.0));
        doc.add_point(line, vec2(300.0, 100.0));

        let isects = doc.intersections(line, circle);
        assert_eq!(isects.len(), 2);

        let mut xs: Vec<f32> = isects.iter().map(|i| i.position.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 0.0).abs() < 1e-3, "{}", xs[0]);
        assert!((xs[1] - 200.0).abs() < 1e-3, "{}", xs[1]);
        for isect in &isects {
            assert!((isect.position.y - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn circle_has_no_self_intersections() {
        let mut doc = Document::new();
        let circle = doc.create_circle(vec2(100.0, 100.0), 100.0, "");
        assert!(doc.self_intersections(circle).is_empty());
    }

    #[test]
    fn bowtie_self_intersection() {
        let mut doc = Document::new();
        let p = doc.create_path("");
        doc.add_point(p, vec2(0.0, 0.0));
        doc.add_point(p, vec2(100.0, 0.0));
        doc.add_point(p, vec2(50.0, 100.0));
        doc.add_point(p, vec2(50.0, -100.0));

        let isects = doc.self_intersections(p);
        assert_eq!(isects.len(), 1);
        assert!(isects[0].position.is_close(vec2(50.0, 0.0), 1e-3));
    }

    #[test]
    fn disjoint_paths_do_not_intersect() {
        let mut doc = Document::new();
        let a = doc.create_circle(vec2(0.0, 0.0), 10.0, "");
        let b = doc.create_circle(vec2(100.0, 0.0), 10.0, "");
        assert!(doc.intersections(a, b).is_empty());
    }

    #[test]
    fn crossing_arcs() {
        let mut doc = Document::new();
        let a = doc.create_path("");
        doc.add_point(a, vec2(100.0, 100.0));
        doc.arc_to(a, vec2(200.0, 100.0), true).unwrap();

        let b = doc.create_path("");
        doc.add_point(b, vec2(100.0, 60.0));
        doc.add_point(b, vec2(200.0, 60.0));

        // The arc through (150, 50) crosses the horizontal line twice.
        let isects = doc.intersections(b, a);
        assert_eq!(isects.len(), 2);
        for isect in &isects {
            assert!((isect.position.y - 60.0).abs() < 1e-2);
        }
    }

    #[test]
    fn compound_path_children_are_tested() {
        let mut doc = Document::new();
        let outer = doc.create_circle(vec2(0.0, 0.0), 100.0, "");
        let inner = doc.create_circle(vec2(0.0, 0.0), 50.0, "");
        doc.add_child(outer, inner);

        let line = doc.create_path("");
        doc.add_point(line, vec2(-200.0, 0.0));
        doc.add_point(line, vec2(200.0, 0.0));

        // Two crossings with each ring.
        let isects = doc.intersections(line, outer);
        assert_eq!(isects.len(), 4);
    }
}
