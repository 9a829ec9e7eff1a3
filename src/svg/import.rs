// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use svgtypes::{Length, LengthUnit, SimplePathSegment, SimplifyingPathParser, TransformListToken};

use crate::builder;
use crate::error::Error;
use crate::geom::{Color, Transform, Vec2};
use crate::paint::Gradient;
use crate::path::Segment;
use crate::tree::{Document, ItemId};
use crate::{ItemType, StrokeCap, StrokeJoin, WindingRule};

/// What an SVG import produced: the root group holding the imported
/// elements plus the declared document size.
#[derive(Clone, Copy, Debug)]
pub struct SvgImportResult {
    /// The group corresponding to the `<svg>` element.
    pub group: ItemId,
    /// The `width` attribute, resolved to document units.
    pub width: Option<f32>,
    /// The `height` attribute, resolved to document units.
    pub height: Option<f32>,
}

// Mutable parsing state threaded through one element's attributes.
struct AttrState {
    fill_alpha: f32,
    stroke_alpha: f32,
}

impl Default for AttrState {
    fn default() -> Self {
        AttrState {
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
        }
    }
}

struct Importer<'a> {
    doc: &'a mut Document,
    dpi: f32,
    font_size: f32,
    named: HashMap<String, ItemId>,
    gradients: HashMap<String, Rc<Gradient>>,
    clip_refs: Vec<(ItemId, String)>,
    // defs/clipPath containers only exist during the import.
    tmp_items: Vec<ItemId>,
}

fn parse_url_ref(value: &str) -> Option<&str> {
    let start = value.find('#')? + 1;
    let end = value[start..].find(')')? + start;
    Some(&value[start..end])
}

fn convert_color(c: svgtypes::Color, alpha: f32) -> Color {
    Color::new(
        c.red as f32 / 255.0,
        c.green as f32 / 255.0,
        c.blue as f32 / 255.0,
        (c.alpha as f32 / 255.0) * alpha,
    )
}

impl<'a> Importer<'a> {
    fn length_to_px(&self, len: Length, start: f32, total: f32) -> f32 {
        let n = len.number as f32;
        match len.unit {
            LengthUnit::None | LengthUnit::Px => n,
            LengthUnit::Em => n * self.font_size,
            LengthUnit::Ex => n * self.font_size * 0.5,
            LengthUnit::In => n * self.dpi,
            LengthUnit::Pt => n / 72.0 * self.dpi,
            LengthUnit::Pc => n / 6.0 * self.dpi,
            LengthUnit::Cm => n / 2.54 * self.dpi,
            LengthUnit::Mm => n / 25.4 * self.dpi,
            LengthUnit::Percent => start + n / 100.0 * total,
        }
    }

    fn parse_coordinate(&self, value: &str) -> Option<f32> {
        Length::from_str(value)
            .ok()
            .map(|len| self.length_to_px(len, 0.0, 1.0))
    }

    fn attr_coordinate(&self, node: roxmltree::Node, name: &str, fallback: f32) -> f32 {
        node.attribute(name)
            .and_then(|v| self.parse_coordinate(v))
            .unwrap_or(fallback)
    }

    fn parse_transform_list(&self, value: &str) -> Transform {
        let mut ts = Transform::identity();
        for token in svgtypes::TransformListParser::from(value) {
            let token = match token {
                Ok(token) => token,
                Err(_) => {
                    log::warn!("malformed transform attribute");
                    break;
                }
            };
            let tmp = match token {
                TransformListToken::Matrix { a, b, c, d, e, f } => Transform::new(
                    a as f32, b as f32, c as f32, d as f32, e as f32, f as f32,
                ),
                TransformListToken::Translate { tx, ty } => {
                    Transform::from_translation(Vec2::new(tx as f32, ty as f32))
                }
                TransformListToken::Scale { sx, sy } => {
                    Transform::from_scale(sx as f32, sy as f32)
                }
                TransformListToken::Rotate { angle } => {
                    Transform::from_rotation((angle as f32).to_radians())
                }
                TransformListToken::SkewX { angle } => {
                    Transform::from_skew(Vec2::new((angle as f32).to_radians(), 0.0))
                }
                TransformListToken::SkewY { angle } => {
                    Transform::from_skew(Vec2::new(0.0, (angle as f32).to_radians()))
                }
            };
            // A transform list composes left to right.
            ts = ts * tmp;
        }
        ts
    }

    fn apply_paint_attribute(&mut self, id: ItemId, value: &str, alpha: f32, stroke: bool) {
        if value == "none" {
            if stroke {
                self.doc.remove_stroke(id);
            } else {
                self.doc.remove_fill(id);
            }
            return;
        }

        if value.starts_with("url(") {
            if let Some(name) = parse_url_ref(value) {
                if let Some(gradient) = self.gradients.get(name) {
                    if stroke {
                        self.doc.set_stroke(id, gradient.clone());
                    } else {
                        self.doc.set_fill(id, gradient.clone());
                    }
                } else {
                    log::warn!("unresolved paint reference '{}'", name);
                }
            }
            return;
        }

        match svgtypes::Color::from_str(value) {
            Ok(color) => {
                let color = convert_color(color, alpha);
                if stroke {
                    self.doc.set_stroke(id, color);
                } else {
                    self.doc.set_fill(id, color);
                }
            }
            Err(_) => log::warn!("failed to parse color '{}'", value),
        }
    }

    fn apply_attribute(&mut self, id: ItemId, name: &str, value: &str, state: &mut AttrState) {
        match name {
            "fill" => self.apply_paint_attribute(id, value, state.fill_alpha, false),
            "fill-opacity" => {
                if let Ok(v) = value.trim_end_matches('%').parse::<f32>() {
                    let v = if value.trim().ends_with('%') { v / 100.0 } else { v };
                    state.fill_alpha = v;
                    if let Some(mut c) = self.doc.fill(id).as_color() {
                        if self.doc.has_fill(id) {
                            c.a = v;
                            self.doc.set_fill(id, c);
                        }
                    }
                }
            }
            "fill-rule" => {
                let rule = match value {
                    "nonzero" => Some(WindingRule::NonZero),
                    "evenodd" => Some(WindingRule::EvenOdd),
                    _ => None,
                };
                if let Some(rule) = rule {
                    self.doc.set_winding_rule(id, rule);
                }
            }
            "stroke" => self.apply_paint_attribute(id, value, state.stroke_alpha, true),
            "stroke-opacity" => {
                if let Ok(v) = value.trim_end_matches('%').parse::<f32>() {
                    let v = if value.trim().ends_with('%') { v / 100.0 } else { v };
                    state.stroke_alpha = v;
                    if let Some(mut c) = self.doc.stroke(id).as_color() {
                        if self.doc.has_stroke(id) {
                            c.a = v;
                            self.doc.set_stroke(id, c);
                        }
                    }
                }
            }
            "stroke-width" => {
                if let Some(v) = self.parse_coordinate(value) {
                    self.doc.set_stroke_width(id, v);
                }
            }
            "stroke-linecap" => {
                let cap = match value {
                    "butt" => Some(StrokeCap::Butt),
                    "round" => Some(StrokeCap::Round),
                    "square" => Some(StrokeCap::Square),
                    _ => None,
                };
                if let Some(cap) = cap {
                    self.doc.set_stroke_cap(id, cap);
                }
            }
            "stroke-linejoin" => {
                let join = match value {
                    "miter" => Some(StrokeJoin::Miter),
                    "round" => Some(StrokeJoin::Round),
                    "bevel" => Some(StrokeJoin::Bevel),
                    _ => None,
                };
                if let Some(join) = join {
                    self.doc.set_stroke_join(id, join);
                }
            }
            "stroke-miterlimit" => {
                if let Ok(v) = value.parse::<f32>() {
                    self.doc.set_miter_limit(id, v);
                }
            }
            "stroke-dasharray" => {
                if value == "none" {
                    self.doc.set_dash_array(id, Vec::new());
                } else {
                    let mut dashes = Vec::new();
                    for len in svgtypes::LengthListParser::from(value).flatten() {
                        dashes.push(self.length_to_px(len, 0.0, 1.0));
                    }
                    self.doc.set_dash_array(id, dashes);
                }
            }
            "stroke-dashoffset" => {
                if let Some(v) = self.parse_coordinate(value) {
                    self.doc.set_dash_offset(id, v);
                }
            }
            "vector-effect" => {
                self.doc.set_scale_stroke(id, value != "non-scaling-stroke");
            }
            "font-size" => {
                if let Some(v) = self.parse_coordinate(value) {
                    self.font_size = v;
                }
            }
            "transform" => {
                let ts = self.parse_transform_list(value);
                self.doc.set_transform(id, ts);
            }
            "clip-path" => {
                if let Some(name) = parse_url_ref(value) {
                    self.clip_refs.push((id, name.to_string()));
                }
            }
            "id" => {
                self.doc.set_name(id, value);
                self.named.insert(value.to_string(), id);
            }
            _ => {}
        }
    }

    fn apply_attributes(&mut self, node: roxmltree::Node, id: ItemId) {
        let mut state = AttrState::default();
        for attr in node.attributes() {
            if attr.name() != "style" {
                self.apply_attribute(id, attr.name(), attr.value(), &mut state);
            }
        }

        // Inline style declarations win over presentation attributes.
        if let Some(style) = node.attribute("style") {
            for declaration in style.split(';') {
                let mut parts = declaration.splitn(2, ':');
                if let (Some(name), Some(value)) = (parts.next(), parts.next()) {
                    self.apply_attribute(id, name.trim(), value.trim(), &mut state);
                }
            }
        }
    }

    // Splits a `d` string into its `M…` runs; the first run becomes the
    // path itself, further runs children of a compound path.
    fn import_path_data(&mut self, root: ItemId, data: &str) {
        let mut runs: Vec<(Vec<Segment>, bool)> = Vec::new();
        let mut segs: Vec<Segment> = Vec::new();
        let mut subpath_start: Option<Vec2> = None;

        for segment in SimplifyingPathParser::from(data) {
            let segment = match segment {
                Ok(seg) => seg,
                Err(_) => {
                    log::warn!("malformed path data");
                    break;
                }
            };

            // After a close, drawing continues from the subpath start.
            if segs.is_empty() && !matches!(segment, SimplePathSegment::MoveTo { .. }) {
                if let Some(start) = subpath_start.take() {
                    builder::add_point(&mut segs, start);
                }
            }

            match segment {
                SimplePathSegment::MoveTo { x, y } => {
                    if !segs.is_empty() {
                        runs.push((std::mem::take(&mut segs), false));
                    }
                    builder::add_point(&mut segs, Vec2::new(x as f32, y as f32));
                }
                SimplePathSegment::LineTo { x, y } => {
                    builder::add_point(&mut segs, Vec2::new(x as f32, y as f32));
                }
                SimplePathSegment::Quadratic { x1, y1, x, y } => {
                    builder::quadratic_curve_to(
                        &mut segs,
                        Vec2::new(x1 as f32, y1 as f32),
                        Vec2::new(x as f32, y as f32),
                    );
                }
                SimplePathSegment::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                } => {
                    builder::cubic_curve_to(
                        &mut segs,
                        Vec2::new(x1 as f32, y1 as f32),
                        Vec2::new(x2 as f32, y2 as f32),
                        Vec2::new(x as f32, y as f32),
                    );
                }
                SimplePathSegment::ClosePath => {
                    if !segs.is_empty() {
                        subpath_start = Some(segs[0].position);
                        runs.push((std::mem::take(&mut segs), true));
                    }
                }
            }
        }
        if !segs.is_empty() {
            runs.push((segs, false));
        }

        for (i, (run, closed)) in runs.into_iter().enumerate() {
            let target = if i == 0 {
                root
            } else {
                let child = self.doc.create_path("");
                self.doc.add_child(root, child);
                child
            };
            self.doc.add_segments(target, &run);
            if closed {
                self.doc.close_path(target);
            }
        }
    }

    fn import_gradient(&mut self, node: roxmltree::Node) {
        let id = match node.attribute("id") {
            Some(id) => id,
            None => {
                log::warn!("a gradient without an id cannot be referenced");
                return;
            }
        };

        let gradient = if node.has_tag_name("linearGradient") {
            let x1 = self.attr_coordinate(node, "x1", 0.0);
            let y1 = self.attr_coordinate(node, "y1", 0.0);
            let x2 = self.attr_coordinate(node, "x2", 0.0);
            let y2 = self.attr_coordinate(node, "y2", 0.0);
            Gradient::linear(Vec2::new(x1, y1), Vec2::new(x2, y2))
        } else {
            let cx = self.attr_coordinate(node, "cx", 0.0);
            let cy = self.attr_coordinate(node, "cy", 0.0);
            let r = self.attr_coordinate(node, "r", 0.0);
            let origin = Vec2::new(cx, cy);
            let gradient = Gradient::radial(origin, origin + Vec2::new(r, 0.0));
            let fx = node.attribute("fx").and_then(|v| self.parse_coordinate(v));
            let fy = node.attribute("fy").and_then(|v| self.parse_coordinate(v));
            if fx.is_some() || fy.is_some() {
                let focal = Vec2::new(fx.unwrap_or(cx), fy.unwrap_or(cy)) - origin;
                gradient.set_focal_point_offset(focal);
            }
            gradient
        };

        for stop in node.children().filter(|c| c.has_tag_name("stop")) {
            let offset = stop
                .attribute("offset")
                .and_then(|v| Length::from_str(v).ok())
                .map(|len| match len.unit {
                    LengthUnit::Percent => len.number as f32 / 100.0,
                    _ => len.number as f32,
                })
                .unwrap_or(0.0);

            let mut color = stop
                .attribute("stop-color")
                .and_then(|v| svgtypes::Color::from_str(v).ok())
                .map(|c| convert_color(c, 1.0))
                .unwrap_or_else(Color::black);
            if let Some(opacity) = stop
                .attribute("stop-opacity")
                .and_then(|v| v.parse::<f32>().ok())
            {
                color.a = opacity;
            }

            gradient.add_stop(color, offset);
        }

        self.gradients.insert(id.to_string(), gradient);
    }

    fn import_group(&mut self, node: roxmltree::Node, temporary: bool) -> ItemId {
        let group = self.doc.create_group("");
        if temporary {
            self.tmp_items.push(group);
        }
        self.apply_attributes(node, group);
        for child in node.children().filter(roxmltree::Node::is_element) {
            if let Some(item) = self.import_node(child) {
                self.doc.add_child(group, item);
            }
        }
        group
    }

    fn import_node(&mut self, node: roxmltree::Node) -> Option<ItemId> {
        let tag = node.tag_name().name();
        match tag {
            "svg" | "g" => Some(self.import_group(node, false)),
            "defs" | "clipPath" => Some(self.import_group(node, true)),
            "linearGradient" | "radialGradient" => {
                self.import_gradient(node);
                None
            }
            "path" => {
                let path = self.doc.create_path("");
                self.apply_attributes(node, path);
                match node.attribute("d") {
                    Some(d) => self.import_path_data(path, d),
                    None => log::warn!("an SVG path is missing the d attribute"),
                }
                Some(path)
            }
            "rect" => {
                let path = self.doc.create_path("");
                self.apply_attributes(node, path);
                let x = self.attr_coordinate(node, "x", 0.0);
                let y = self.attr_coordinate(node, "y", 0.0);
                let w = self.attr_coordinate(node, "width", 0.0);
                let h = self.attr_coordinate(node, "height", 0.0);
                let rx = node.attribute("rx").and_then(|v| self.parse_coordinate(v));
                let ry = node.attribute("ry").and_then(|v| self.parse_coordinate(v));
                // A single radius attribute sets both.
                let radius = match (rx, ry) {
                    (Some(rx), Some(ry)) => Vec2::new(rx, ry),
                    (Some(rx), None) => Vec2::new(rx, rx),
                    (None, Some(ry)) => Vec2::new(ry, ry),
                    (None, None) => Vec2::ZERO,
                };
                if radius == Vec2::ZERO {
                    self.doc
                        .make_rectangle(path, Vec2::new(x, y), Vec2::new(x + w, y + h));
                } else {
                    self.doc.make_rounded_rectangle(
                        path,
                        Vec2::new(x, y),
                        Vec2::new(x + w, y + h),
                        radius,
                    );
                }
                Some(path)
            }
            "circle" => {
                let path = self.doc.create_path("");
                self.apply_attributes(node, path);
                let cx = self.attr_coordinate(node, "cx", 0.0);
                let cy = self.attr_coordinate(node, "cy", 0.0);
                let r = self.attr_coordinate(node, "r", 0.0);
                self.doc.make_circle(path, Vec2::new(cx, cy), r);
                Some(path)
            }
            "ellipse" => {
                let path = self.doc.create_path("");
                self.apply_attributes(node, path);
                let cx = self.attr_coordinate(node, "cx", 0.0);
                let cy = self.attr_coordinate(node, "cy", 0.0);
                let rx = self.attr_coordinate(node, "rx", 0.0);
                let ry = self.attr_coordinate(node, "ry", 0.0);
                self.doc
                    .make_ellipse(path, Vec2::new(cx, cy), Vec2::new(rx, ry) * 2.0);
                Some(path)
            }
            "line" => {
                let path = self.doc.create_path("");
                self.apply_attributes(node, path);
                let x1 = self.attr_coordinate(node, "x1", 0.0);
                let y1 = self.attr_coordinate(node, "y1", 0.0);
                let x2 = self.attr_coordinate(node, "x2", 0.0);
                let y2 = self.attr_coordinate(node, "y2", 0.0);
                self.doc.add_point(path, Vec2::new(x1, y1));
                self.doc.add_point(path, Vec2::new(x2, y2));
                Some(path)
            }
            "polyline" | "polygon" => {
                let path = self.doc.create_path("");
                self.apply_attributes(node, path);
                if let Some(points) = node.attribute("points") {
                    for (x, y) in svgtypes::PointsParser::from(points) {
                        self.doc.add_point(path, Vec2::new(x as f32, y as f32));
                    }
                }
                if tag == "polygon" {
                    self.doc.close_path(path);
                }
                Some(path)
            }
            _ => {
                log::warn!("unsupported element '{}' was skipped", tag);
                None
            }
        }
    }

    fn resolve_clip_paths(&mut self) {
        let refs = std::mem::take(&mut self.clip_refs);
        for (group, name) in refs {
            if self.doc.item_type(group) != ItemType::Group {
                log::warn!("clip-path is only supported on groups");
                continue;
            }
            let clip_container = match self.named.get(&name) {
                Some(&item) => item,
                None => {
                    log::warn!("unresolved clip path reference '{}'", name);
                    continue;
                }
            };

            let mask_src = self
                .doc
                .children(clip_container)
                .iter()
                .copied()
                .find(|&c| self.doc.item_type(c) == ItemType::Path);
            let mask_src = match mask_src {
                Some(mask) => mask,
                None => continue,
            };

            if let Some(mask) = self.doc.clone_item(mask_src) {
                self.doc.add_child(group, mask);
                self.doc.send_to_back(mask);
                self.doc.set_clipped(group, true);
            }
        }
    }
}

/// Parses an SVG string into `doc`.
pub fn import(doc: &mut Document, text: &str, dpi: f32) -> Result<SvgImportResult, Error> {
    let xml = roxmltree::Document::parse(text)
        .map_err(|e| Error::ParseFailed(format!("could not parse the xml document: {}", e)))?;

    let root = xml.root_element();
    if !root.has_tag_name("svg") {
        return Err(Error::ParseFailed(
            "the root element is not 'svg'".to_string(),
        ));
    }

    let mut importer = Importer {
        doc,
        dpi,
        font_size: 12.0,
        named: HashMap::new(),
        gradients: HashMap::new(),
        clip_refs: Vec::new(),
        tmp_items: Vec::new(),
    };

    let group = importer.import_group(root, false);
    importer.resolve_clip_paths();

    // Nested containers may already be gone with their parents.
    let tmp = std::mem::take(&mut importer.tmp_items);
    for item in tmp {
        if importer.doc.is_alive(item) {
            importer.doc.remove(item);
        }
    }

    let width = root
        .attribute("width")
        .and_then(|v| importer.parse_coordinate(v));
    let height = root
        .attribute("height")
        .and_then(|v| importer.parse_coordinate(v));

    Ok(SvgImportResult {
        group,
        width,
        height,
    })
}
