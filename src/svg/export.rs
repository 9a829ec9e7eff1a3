// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use xmlwriter::XmlWriter;

use crate::geom::{Color, Transform, Vec2};
use crate::paint::{Gradient, GradientType, Paint};
use crate::path::Path;
use crate::shape::{match_shape, Shape};
use crate::tree::{Document, ItemId};
use crate::{ItemType, StrokeCap, StrokeJoin, WindingRule};

/// SVG writing options.
#[derive(Clone, Copy, Debug)]
pub struct XmlOptions {
    /// Emit `circle`/`ellipse`/`rect` elements for paths that match a
    /// primitive shape.
    pub match_shapes: bool,

    /// `xmlwriter` output options.
    pub writer_opts: xmlwriter::Options,
}

impl Default for XmlOptions {
    fn default() -> Self {
        XmlOptions {
            match_shapes: true,
            writer_opts: xmlwriter::Options::default(),
        }
    }
}

// Everything that must land in <defs> before the content is written.
#[derive(Default)]
struct Session {
    gradients: Vec<(Rc<Gradient>, String)>,
    clips: Vec<(ItemId, String)>,
}

impl Session {
    fn gradient_id(&self, gradient: &Rc<Gradient>) -> Option<&str> {
        self.gradients
            .iter()
            .find(|(g, _)| Rc::ptr_eq(g, gradient))
            .map(|(_, id)| id.as_str())
    }

    fn clip_id(&self, group: ItemId) -> Option<&str> {
        self.clips
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, id)| id.as_str())
    }
}

fn collect(doc: &Document, id: ItemId, session: &mut Session) {
    for paint in &[doc.fill(id), doc.stroke(id)] {
        if let Some(gradient) = paint.gradient() {
            if session.gradient_id(gradient).is_none() {
                let name = format!("grad{}", session.gradients.len());
                session.gradients.push((gradient.clone(), name));
            }
        }
    }

    if doc.is_clipped(id) && !doc.children(id).is_empty() {
        let name = format!("clip-{}", session.clips.len());
        session.clips.push((id, name));
    }

    for &child in doc.children(id) {
        collect(doc, child, session);
    }
}

fn color_to_hex(color: Color) -> String {
    let channel = |v: f32| -> u32 { ((v * 255.0).round() as i32).max(0).min(255) as u32 };
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(color.r),
        channel(color.g),
        channel(color.b)
    )
}

fn write_transform(doc: &Document, id: ItemId, xml: &mut XmlWriter) {
    if doc.has_transform(id) {
        let ts = doc.transform(id);
        xml.write_attribute_fmt(
            "transform",
            format_args!(
                "matrix({}, {}, {}, {}, {}, {})",
                ts.a, ts.b, ts.c, ts.d, ts.e, ts.f
            ),
        );
    }
}

fn write_paint(
    name: &str,
    paint: &Paint,
    session: &Session,
    xml: &mut XmlWriter,
) {
    match paint {
        Paint::None => xml.write_attribute(name, "none"),
        Paint::Color(color) => {
            xml.write_attribute(name, &color_to_hex(*color));
            if color.a < 1.0 {
                xml.write_attribute_fmt(
                    &format!("{}-opacity", name),
                    format_args!("{}", color.a),
                );
            }
        }
        Paint::LinearGradient(ref g) | Paint::RadialGradient(ref g) => {
            if let Some(id) = session.gradient_id(g) {
                xml.write_attribute_fmt(name, format_args!("url(#{})", id));
            }
        }
    }
}

fn write_style(doc: &Document, id: ItemId, session: &Session, xml: &mut XmlWriter) {
    if !doc.is_visible(id) {
        xml.write_attribute("visibility", "hidden");
    }

    write_paint("fill", &doc.fill(id), session, xml);
    xml.write_attribute(
        "fill-rule",
        match doc.winding_rule(id) {
            WindingRule::NonZero => "nonzero",
            WindingRule::EvenOdd => "evenodd",
        },
    );
    write_paint("stroke", &doc.stroke(id), session, xml);

    if doc.has_stroke_width(id) {
        xml.write_attribute("stroke-width", &doc.stroke_width(id));
    }
    if doc.has_stroke_cap(id) {
        xml.write_attribute(
            "stroke-linecap",
            match doc.stroke_cap(id) {
                StrokeCap::Butt => "butt",
                StrokeCap::Square => "square",
                StrokeCap::Round => "round",
            },
        );
    }
    if doc.has_stroke_join(id) {
        xml.write_attribute(
            "stroke-linejoin",
            match doc.stroke_join(id) {
                StrokeJoin::Bevel => "bevel",
                StrokeJoin::Miter => "miter",
                StrokeJoin::Round => "round",
            },
        );
    }
    if doc.has_miter_limit(id) {
        xml.write_attribute("stroke-miterlimit", &doc.miter_limit(id));
    }

    if doc.has_dash_array(id) {
        let dashes = doc.dash_array(id);
        if !dashes.is_empty() {
            let mut list = String::new();
            for (i, dash) in dashes.iter().enumerate() {
                if i > 0 {
                    list.push_str(", ");
                }
                list.push_str(&dash.to_string());
            }
            xml.write_attribute("stroke-dasharray", &list);
        }
    }
    if doc.has_dash_offset(id) {
        xml.write_attribute("stroke-dashoffset", &doc.dash_offset(id));
    }
    if doc.has_scale_stroke(id) && !doc.scale_stroke(id) {
        xml.write_attribute("vector-effect", "non-scaling-stroke");
    }
}

fn push_number(out: &mut String, v: f32) {
    out.push_str(&v.to_string());
}

fn append_curve_data(path: &Path, index: usize, ts: Option<&Transform>, out: &mut String) {
    let bezier = path.bezier(index);
    let map = |p: Vec2| ts.map_or(p, |m| m.apply(p));

    let from = map(bezier.from);
    let to = map(bezier.to);

    if bezier.is_linear(crate::TOLERANCE) {
        out.push_str(" l");
        push_number(out, to.x - from.x);
        out.push(',');
        push_number(out, to.y - from.y);
    } else {
        let h1 = map(bezier.ctrl1);
        let h2 = map(bezier.ctrl2);
        out.push_str(" c");
        push_number(out, h1.x - from.x);
        out.push(',');
        push_number(out, h1.y - from.y);
        out.push(' ');
        push_number(out, h2.x - from.x);
        out.push(',');
        push_number(out, h2.y - from.y);
        out.push(' ');
        push_number(out, to.x - from.x);
        out.push(',');
        push_number(out, to.y - from.y);
    }
}

// One `M…` run. Compound children get their local transform baked into
// the coordinates since a single `d` string carries no transforms.
fn append_path_data(doc: &Document, id: ItemId, compound_child: bool, out: &mut String) {
    let path = match doc.path(id) {
        Some(p) => p,
        None => return,
    };
    if path.curve_count() == 0 {
        return;
    }

    let ts = if compound_child && doc.has_transform(id) {
        Some(doc.transform(id))
    } else {
        None
    };

    let first = match ts {
        Some(m) => m.apply(path.segments()[0].position),
        None => path.segments()[0].position,
    };
    out.push('M');
    push_number(out, first.x);
    out.push(',');
    push_number(out, first.y);

    let count = path.curve_count();
    for i in 0..count {
        // The trailing straight closing curve is implied by `z`.
        if path.is_closed() && i == count - 1 && path.bezier(i).is_linear(crate::TOLERANCE) {
            break;
        }
        append_curve_data(path, i, ts.as_ref(), out);
    }

    if path.is_closed() {
        out.push_str(" z");
    }
}

fn compound_path_data(doc: &Document, id: ItemId) -> String {
    let mut out = String::new();
    append_path_data(doc, id, false, &mut out);
    for &child in doc.children(id) {
        if doc.item_type(child) == ItemType::Path {
            out.push(' ');
            append_path_data(doc, child, true, &mut out);
        }
    }
    out
}

fn write_path_element(
    doc: &Document,
    id: ItemId,
    match_shapes: bool,
    xml: &mut XmlWriter,
) {
    let path = match doc.path(id) {
        Some(p) => p,
        None => return,
    };

    if !doc.children(id).is_empty() {
        xml.start_element("path");
        xml.write_attribute("d", &compound_path_data(doc, id));
        return;
    }

    if match_shapes {
        let center = path
            .compute_fill_bounds(None, 0.0)
            .map_or(Vec2::ZERO, |b| b.center());
        match match_shape(path, center) {
            Some(Shape::Circle { center, radius }) => {
                xml.start_element("circle");
                xml.write_attribute("cx", &center.x);
                xml.write_attribute("cy", &center.y);
                xml.write_attribute("r", &radius);
                return;
            }
            Some(Shape::Ellipse { center, size }) => {
                xml.start_element("ellipse");
                xml.write_attribute("cx", &center.x);
                xml.write_attribute("cy", &center.y);
                xml.write_attribute("rx", &(size.x.abs() * 0.5));
                xml.write_attribute("ry", &(size.y.abs() * 0.5));
                return;
            }
            Some(Shape::Rect {
                center,
                size,
                corner_radius,
            }) => {
                xml.start_element("rect");
                xml.write_attribute("x", &(center.x - size.x.abs() * 0.5));
                xml.write_attribute("y", &(center.y - size.y.abs() * 0.5));
                xml.write_attribute("width", &size.x.abs());
                xml.write_attribute("height", &size.y.abs());
                if corner_radius.x != 0.0 {
                    xml.write_attribute("rx", &corner_radius.x);
                }
                if corner_radius.y != 0.0 {
                    xml.write_attribute("ry", &corner_radius.y);
                }
                return;
            }
            None => {}
        }
    }

    if path.is_polygon() {
        let segments = path.segments();
        if segments.len() > 2 {
            let mut points = String::new();
            for (i, seg) in segments.iter().enumerate() {
                if i > 0 {
                    points.push(' ');
                }
                push_number(&mut points, seg.position.x);
                points.push(',');
                push_number(&mut points, seg.position.y);
            }
            xml.start_element(if path.is_closed() { "polygon" } else { "polyline" });
            xml.write_attribute("points", &points);
            return;
        } else if segments.len() == 2 {
            xml.start_element("line");
            xml.write_attribute("x1", &segments[0].position.x);
            xml.write_attribute("y1", &segments[0].position.y);
            xml.write_attribute("x2", &segments[1].position.x);
            xml.write_attribute("y2", &segments[1].position.y);
            return;
        }
    }

    xml.start_element("path");
    let mut data = String::new();
    append_path_data(doc, id, false, &mut data);
    xml.write_attribute("d", &data);
}

fn write_item(
    doc: &Document,
    id: ItemId,
    session: &Session,
    opt: &XmlOptions,
    xml: &mut XmlWriter,
) {
    match doc.item_type(id) {
        ItemType::Group => {
            if doc.children(id).is_empty() {
                return;
            }

            xml.start_element("g");
            let mut skip = 0;
            if let Some(clip_id) = session.clip_id(id) {
                xml.write_attribute_fmt("clip-path", format_args!("url(#{})", clip_id));
                skip = 1;
            }
            write_transform(doc, id, xml);
            write_style(doc, id, session, xml);
            for &child in doc.children(id).iter().skip(skip) {
                write_item(doc, child, session, opt, xml);
            }
            xml.end_element();
        }
        ItemType::Path => {
            write_path_element(doc, id, opt.match_shapes, xml);
            write_transform(doc, id, xml);
            write_style(doc, id, session, xml);
            xml.end_element();
        }
        ItemType::Symbol => {
            log::warn!("symbols are not representable in SVG and were skipped");
        }
        ItemType::Document => {
            for &child in doc.children(id) {
                write_item(doc, child, session, opt, xml);
            }
        }
    }
}

fn write_gradient_defs(session: &Session, xml: &mut XmlWriter) {
    for (gradient, id) in &session.gradients {
        match gradient.kind() {
            GradientType::Linear => {
                xml.start_element("linearGradient");
                xml.write_attribute("id", id);
                xml.write_attribute("gradientUnits", "userSpaceOnUse");
                xml.write_attribute("x1", &gradient.origin().x);
                xml.write_attribute("y1", &gradient.origin().y);
                xml.write_attribute("x2", &gradient.destination().x);
                xml.write_attribute("y2", &gradient.destination().y);
            }
            GradientType::Radial => {
                xml.start_element("radialGradient");
                xml.write_attribute("id", id);
                xml.write_attribute("gradientUnits", "userSpaceOnUse");
                xml.write_attribute("cx", &gradient.origin().x);
                xml.write_attribute("cy", &gradient.origin().y);
                xml.write_attribute(
                    "r",
                    &(gradient.destination() - gradient.origin()).length(),
                );
                if let Some(focal) = gradient.focal_point_offset() {
                    let f = gradient.origin() + focal;
                    xml.write_attribute("fx", &f.x);
                    xml.write_attribute("fy", &f.y);
                }
            }
        }

        for stop in gradient.stops().iter() {
            xml.start_element("stop");
            xml.write_attribute("offset", &stop.offset);
            xml.write_attribute("stop-color", &color_to_hex(stop.color));
            if stop.color.a < 1.0 {
                xml.write_attribute("stop-opacity", &stop.color.a);
            }
            xml.end_element();
        }

        xml.end_element();
    }
}

fn write_clip_defs(doc: &Document, session: &Session, xml: &mut XmlWriter) {
    for (group, id) in &session.clips {
        let mask = match doc.children(*group).first() {
            Some(&mask) => mask,
            None => continue,
        };
        if doc.item_type(mask) != ItemType::Path {
            log::warn!("a clipping mask must be a path");
            continue;
        }

        xml.start_element("clipPath");
        xml.write_attribute("id", id);
        write_path_element(doc, mask, false, xml);
        write_transform(doc, mask, xml);
        // Only the winding rule matters for clipping.
        xml.write_attribute(
            "fill-rule",
            match doc.winding_rule(mask) {
                WindingRule::NonZero => "nonzero",
                WindingRule::EvenOdd => "evenodd",
            },
        );
        xml.end_element();
        xml.end_element();
    }
}

/// Renders `item` (usually the document root) as an SVG string.
pub fn export(doc: &Document, item: ItemId, opt: &XmlOptions) -> String {
    let mut session = Session::default();
    collect(doc, item, &mut session);

    let mut xml = XmlWriter::new(opt.writer_opts);
    xml.start_element("svg");
    xml.write_attribute("xmlns", "http://www.w3.org/2000/svg");
    xml.write_attribute("width", &doc.width());
    xml.write_attribute("height", &doc.height());
    xml.write_attribute_fmt(
        "viewBox",
        format_args!("0 0 {} {}", doc.width(), doc.height()),
    );

    if !session.gradients.is_empty() || !session.clips.is_empty() {
        xml.start_element("defs");
        write_gradient_defs(&session, &mut xml);
        write_clip_defs(doc, &session, &mut xml);
        xml.end_element();
    }

    if doc.item_type(item) == ItemType::Document && doc.has_transform(item) {
        xml.start_element("g");
        write_transform(doc, item, &mut xml);
        write_item(doc, item, &session, opt, &mut xml);
        xml.end_element();
    } else {
        write_item(doc, item, &session, opt, &mut xml);
    }

    xml.end_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    fn export_default(doc: &Document) -> String {
        doc.to_svg_string(&XmlOptions::default())
    }

    #[test]
    fn circle_is_written_as_primitive() {
        let mut doc = Document::new();
        doc.set_size(200.0, 200.0);
        let c = doc.create_circle(vec2(100.0, 100.0), 50.0, "");
        doc.set_fill(c, Color::new(1.0, 0.0, 0.0, 1.0));

        let svg = export_default(&doc);
        assert!(svg.contains("<circle"), "{}", svg);
        assert!(svg.contains("cx=\"100\""), "{}", svg);
        assert!(svg.contains("r=\"50\""), "{}", svg);
        assert!(svg.contains("fill=\"#ff0000\""), "{}", svg);
    }

    #[test]
    fn shape_matching_can_be_disabled() {
        let mut doc = Document::new();
        doc.create_circle(vec2(0.0, 0.0), 10.0, "");
        let opt = XmlOptions {
            match_shapes: false,
            ..XmlOptions::default()
        };
        let svg = export(&doc, doc.root(), &opt);
        assert!(!svg.contains("<circle"));
        assert!(svg.contains("<path"), "{}", svg);
    }

    #[test]
    fn polygons_and_lines() {
        let mut doc = Document::new();
        let tri = doc.create_path("");
        doc.add_point(tri, vec2(0.0, 0.0));
        doc.add_point(tri, vec2(10.0, 0.0));
        doc.add_point(tri, vec2(5.0, 10.0));
        doc.close_path(tri);

        let line = doc.create_path("");
        doc.add_point(line, vec2(0.0, 20.0));
        doc.add_point(line, vec2(10.0, 20.0));

        let svg = export_default(&doc);
        assert!(svg.contains("<polygon"), "{}", svg);
        assert!(svg.contains("<line"), "{}", svg);
    }

    #[test]
    fn missing_fill_writes_none() {
        let mut doc = Document::new();
        let p = doc.create_path("");
        doc.add_point(p, vec2(0.0, 0.0));
        doc.add_point(p, vec2(1.0, 1.0));
        let svg = export_default(&doc);
        assert!(svg.contains("fill=\"none\""), "{}", svg);
    }

    #[test]
    fn shared_gradient_is_interned_once() {
        let mut doc = Document::new();
        let grad = doc.create_linear_gradient(vec2(0.0, 0.0), vec2(10.0, 0.0));
        grad.add_stop(Color::black(), 0.0);
        grad.add_stop(Color::white(), 1.0);
        let a = doc.create_circle(vec2(0.0, 0.0), 5.0, "");
        let b = doc.create_circle(vec2(20.0, 0.0), 5.0, "");
        doc.set_fill(a, grad.clone());
        doc.set_fill(b, grad);

        let svg = export_default(&doc);
        assert_eq!(svg.matches("<linearGradient").count(), 1, "{}", svg);
        assert_eq!(svg.matches("url(#grad0)").count(), 2, "{}", svg);
    }

    #[test]
    fn clipped_group_references_clip_path() {
        let mut doc = Document::new();
        let grp = doc.create_group("");
        let mask = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "");
        let content = doc.create_circle(vec2(5.0, 5.0), 20.0, "");
        doc.add_child(grp, mask);
        doc.add_child(grp, content);
        doc.set_clipped(grp, true);

        let svg = export_default(&doc);
        assert!(svg.contains("<clipPath"), "{}", svg);
        assert!(svg.contains("clip-path=\"url(#clip-0)\""), "{}", svg);
    }

    #[test]
    fn transform_attribute() {
        let mut doc = Document::new();
        let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "");
        doc.set_transform(p, Transform::new(1.0, 0.0, 0.0, 1.0, 5.0, 7.0));
        let svg = export_default(&doc);
        assert!(svg.contains("matrix(1, 0, 0, 1, 5, 7)"), "{}", svg);
    }

    #[test]
    fn non_scaling_stroke_attribute() {
        let mut doc = Document::new();
        let p = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "");
        doc.set_stroke(p, Color::black());
        doc.set_scale_stroke(p, false);
        let svg = export_default(&doc);
        assert!(svg.contains("vector-effect=\"non-scaling-stroke\""), "{}", svg);
    }
}
