// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scenario-level tests exercising the whole scene kernel through its
//! public surface.

use std::rc::Rc;

use vellum::{vec2, Color, Document, ItemType, StrokeCap, StrokeJoin, Vec2};

fn rectangle_path(doc: &mut Document) -> vellum::ItemId {
    let p = doc.create_path("");
    doc.add_point(p, vec2(0.0, 0.0));
    doc.add_point(p, vec2(200.0, 0.0));
    doc.add_point(p, vec2(200.0, 100.0));
    doc.add_point(p, vec2(0.0, 100.0));
    doc.close_path(p);
    p
}

#[test]
fn rectangle_length_and_area() {
    let mut doc = Document::new();
    let p = rectangle_path(&mut doc);

    assert!((doc.path_length(p) - 600.0).abs() < 0.01);
    assert!((doc.area(p).abs() - 20000.0).abs() < 1.0);

    let bounds = doc.bounds(p);
    assert!(bounds.min.is_close(vec2(0.0, 0.0), 1e-4));
    assert!(bounds.max.is_close(vec2(200.0, 100.0), 1e-4));
}

#[test]
fn unit_circle_construction() {
    let mut doc = Document::new();
    let c = doc.create_circle(vec2(0.0, 0.0), 100.0, "");

    let path = doc.path(c).unwrap();
    assert_eq!(path.segment_count(), 4);
    // Anchors at the compass positions.
    let positions: Vec<Vec2> = path.segments().iter().map(|s| s.position).collect();
    assert!(positions.contains(&vec2(-100.0, 0.0)));
    assert!(positions.contains(&vec2(100.0, 0.0)));
    assert!(positions.contains(&vec2(0.0, -100.0)));
    assert!(positions.contains(&vec2(0.0, 100.0)));

    assert!((doc.path_length(c) - 628.3185).abs() < 0.1);

    let bounds = doc.bounds(c);
    assert!(bounds.min.is_close(vec2(-100.0, -100.0), 0.01));
    assert!(bounds.max.is_close(vec2(100.0, 100.0), 0.01));

    assert!(doc.contains(c, vec2(0.0, 0.0)));
    assert!(!doc.contains(c, vec2(101.0, 0.0)));
}

#[test]
fn stroke_bounds_on_rotated_square() {
    let mut doc = Document::new();
    let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(100.0, 100.0), "");
    doc.rotate(p, std::f32::consts::FRAC_PI_4);
    doc.set_stroke(p, Color::black());
    doc.set_stroke_width(p, 20.0);
    doc.set_stroke_join(p, StrokeJoin::Round);
    doc.set_stroke_cap(p, StrokeCap::Round);

    // The outline grows by one stroke radius on every side; rotation
    // does not distort the round joins.
    let expected = (2.0f32).sqrt() * 100.0 + 20.0;
    let bounds = doc.stroke_bounds(p);
    assert!((bounds.width() - expected).abs() < 0.01, "{}", bounds.width());
    assert!((bounds.height() - expected).abs() < 0.01, "{}", bounds.height());
}

#[test]
fn property_inheritance() {
    let mut doc = Document::new();
    let group = doc.create_group("");
    let child = doc.create_path("");
    doc.add_child(group, child);

    let red = Color::new(1.0, 0.0, 0.0, 1.0);
    let blue = Color::new(0.0, 0.0, 1.0, 1.0);

    doc.set_fill(group, red);
    assert_eq!(doc.fill(child).as_color(), Some(red));
    assert!(!doc.has_fill(child));

    doc.set_fill(child, blue);
    assert_eq!(doc.fill(child).as_color(), Some(blue));
    assert_eq!(doc.fill(group).as_color(), Some(red));

    // An explicit "no fill" still shadows the inherited red.
    doc.remove_fill(child);
    assert!(doc.has_fill(child));
    assert!(doc.fill(child).is_none());
}

#[test]
fn line_circle_intersections() {
    let mut doc = Document::new();
    let circle = doc.create_circle(vec2(100.0, 100.0), 100.0, "");
    let line = doc.create_path("");
    doc.add_point(line, vec2(-100.0, 100.0));
    doc.add_point(line, vec2(300.0, 100.0));

    let isects = doc.intersections(line, circle);
    assert_eq!(isects.len(), 2);
    let mut xs: Vec<f32> = isects.iter().map(|i| i.position.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert!((xs[0] - 0.0).abs() < 1e-3);
    assert!((xs[1] - 200.0).abs() < 1e-3);
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
fn binary_round_trip_with_shared_gradient() {
    let mut doc = Document::new();
    doc.set_size(400.0, 300.0);
    let group = doc.create_group("content");
    let circle = doc.create_circle(vec2(50.0, 50.0), 25.0, "c1");
    let square = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "c2");
    doc.add_child(group, circle);
    doc.add_child(group, square);

    let grad = doc.create_linear_gradient(vec2(0.0, 0.0), vec2(100.0, 0.0));
    grad.add_stop(Color::new(1.0, 0.0, 0.0, 1.0), 0.0);
    grad.add_stop(Color::new(0.0, 0.0, 1.0, 1.0), 1.0);
    doc.set_fill(circle, grad.clone());
    doc.set_fill(square, grad);

    let data = vellum::binfmt::write(&doc, doc.root()).unwrap();

    let mut re = Document::new();
    vellum::binfmt::parse(&mut re, &data).unwrap();
    assert_eq!(re.width(), 400.0);
    assert_eq!(re.height(), 300.0);

    let c1 = re.find_child(re.root(), "c1").unwrap();
    let c2 = re.find_child(re.root(), "c2").unwrap();

    // Segment triples round-trip to exact bits.
    assert_eq!(
        doc.path(doc.find_child(doc.root(), "c1").unwrap())
            .unwrap()
            .segments(),
        re.path(c1).unwrap().segments()
    );

    // The gradient is one shared instance again after the round trip.
    let f1 = re.fill(c1);
    let f2 = re.fill(c2);
    assert!(Rc::ptr_eq(f1.gradient().unwrap(), f2.gradient().unwrap()));
    assert_eq!(f1.gradient().unwrap().stops().len(), 2);
}

#[test]
fn svg_round_trip_of_path_data() {
    let mut doc = Document::new();
    doc.set_size(200.0, 200.0);
    let result = doc
        .parse_svg(
            "<svg><path d='M10 20 C 30 10, 60 10, 80 20 L 80 60 Q 45 90, 10 60 Z'/></svg>",
            72.0,
        )
        .unwrap();
    let source = doc.children(result.group)[0];
    let source_segments = doc.path(source).unwrap().segments().to_vec();
    let closed = doc.path(source).unwrap().is_closed();

    let svg = doc.to_svg_string(&vellum::svg::XmlOptions::default());

    let mut re = Document::new();
    let reresult = re.parse_svg(&svg, 72.0).unwrap();

    // Dig out the one path again, however deep the groups go.
    fn find_path(doc: &Document, id: vellum::ItemId) -> Option<vellum::ItemId> {
        if doc.item_type(id) == ItemType::Path {
            return Some(id);
        }
        for &child in doc.children(id) {
            if let Some(found) = find_path(doc, child) {
                return Some(found);
            }
        }
        None
    }
    let reimported = find_path(&re, reresult.group).unwrap();

    let path = re.path(reimported).unwrap();
    assert_eq!(path.is_closed(), closed);
    assert_eq!(path.segment_count(), source_segments.len());
    for (a, b) in source_segments.iter().zip(path.segments()) {
        assert!(a.position.is_close(b.position, 1e-3), "{:?} vs {:?}", a, b);
        assert!(a.handle_in.is_close(b.handle_in, 1e-3));
        assert!(a.handle_out.is_close(b.handle_out, 1e-3));
    }
}

#[test]
fn reverse_is_an_involution() {
    let mut doc = Document::new();
    let p = doc.create_path("");
    doc.add_point(p, vec2(0.0, 0.0));
    doc.cubic_curve_to(p, vec2(20.0, -30.0), vec2(60.0, -30.0), vec2(80.0, 0.0));
    doc.add_point(p, vec2(90.0, 40.0));
    doc.close_path(p);

    let original = doc.path(p).unwrap().segments().to_vec();
    doc.reverse(p);
    doc.reverse(p);
    assert_eq!(doc.path(p).unwrap().segments(), original.as_slice());
}

#[test]
fn clockwise_flips_under_reverse() {
    let mut doc = Document::new();
    let p = rectangle_path(&mut doc);
    let cw = doc.is_clockwise(p);
    doc.reverse(p);
    assert_eq!(doc.is_clockwise(p), !cw);
    doc.set_clockwise(p, cw);
    assert_eq!(doc.is_clockwise(p), cw);
}

#[test]
fn contains_agrees_with_geometry_on_a_grid() {
    let mut doc = Document::new();
    let c = doc.create_circle(vec2(0.0, 0.0), 100.0, "");

    // Compare against the analytic circle, far enough from the boundary
    // that the kappa approximation cannot flip the answer.
    for ix in -12..=12 {
        for iy in -12..=12 {
            let p = vec2(ix as f32 * 10.0, iy as f32 * 10.0);
            let r = p.length();
            if (r - 100.0).abs() < 1.0 {
                continue;
            }
            assert_eq!(doc.contains(c, p), r < 100.0, "at {:?}", p);
        }
    }
}

#[test]
fn simplify_reduces_and_preserves_shape() {
    let mut doc = Document::new();
    let p = doc.create_path("");
    for i in 0..=64 {
        let a = std::f32::consts::PI * i as f32 / 64.0;
        doc.add_point(p, vec2(a.cos() * 100.0, a.sin() * 100.0));
    }

    let before = doc.path(p).unwrap().segment_count();
    doc.simplify(p, 2.5);
    let after = doc.path(p).unwrap().segment_count();
    assert!(after < before / 4, "{} -> {}", before, after);

    // The half circle is still a half circle.
    let len = doc.path_length(p);
    assert!((len - std::f32::consts::PI * 100.0).abs() < 5.0, "{}", len);
}

#[test]
fn flattening_approximates_the_curve() {
    let mut doc = Document::new();
    let c = doc.create_circle(vec2(0.0, 0.0), 100.0, "");
    doc.flatten(c, 0.1, false, 0.0, 32);

    let path = doc.path(c).unwrap();
    assert!(path.is_polygon());
    assert!(path.segment_count() > 16);
    assert!((path.length() - 628.3).abs() < 5.0);
}

#[test]
fn slicing_cuts_an_arc() {
    let mut doc = Document::new();
    let c = doc.create_circle(vec2(0.0, 0.0), 100.0, "");
    let quarter = doc.path_length(c) * 0.25;

    let part = doc.slice(c, quarter, quarter * 3.0).unwrap();
    assert!(!doc.path(part).unwrap().is_closed());
    assert!((doc.path_length(part) - quarter * 2.0).abs() < 1.0);
    // The slice sits right above its source.
    assert_eq!(doc.parent(part), doc.parent(c));
}

#[test]
fn symbols_share_geometry() {
    let mut doc = Document::new();
    let rect = doc.create_rectangle(vec2(0.0, 0.0), vec2(20.0, 20.0), "");
    let sym = doc.create_symbol(rect, "").unwrap();
    doc.set_transform(sym, vellum::Transform::from_translation(vec2(100.0, 0.0)));

    assert_eq!(doc.item_type(sym), ItemType::Symbol);
    assert_eq!(doc.symbol_target(sym), Some(rect));
    let b = doc.bounds(sym);
    assert!(b.min.is_close(vec2(100.0, 0.0), 1e-3));

    // Editing the referenced item moves the instance too.
    doc.make_rectangle(rect, vec2(0.0, 0.0), vec2(40.0, 40.0));
    let b = doc.bounds(sym);
    assert!(b.max.is_close(vec2(140.0, 40.0), 1e-3));
}
