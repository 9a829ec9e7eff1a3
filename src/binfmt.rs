// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The compact binary scene format.
//!
//! Little-endian, three length-prefixed sections behind a fixed header:
//! the recursive item hierarchy, the flat segment data of all paths, and
//! the paint data with gradients interned so shared instances stay
//! shared across a round trip.

use std::rc::Rc;

use crate::error::Error;
use crate::geom::{Color, Transform, Vec2};
use crate::paint::{Gradient, GradientType, Paint};
use crate::path::Segment;
use crate::tree::{Document, ItemId};
use crate::{ItemType, StrokeCap, StrokeJoin, WindingRule};

const MAGIC: &[u8; 5] = b"paper";
const VERSION: u32 = 0;
const HEADER_LEN: usize = 5 + 4 + 8 + 8;

// ----------------------------------------------------------------------
// Writing

#[derive(Default)]
struct Body {
    buf: Vec<u8>,
}

impl Body {
    fn position(&self) -> usize {
        self.buf.len()
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn push_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn push_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    fn push_u32(&mut self, v: u32) {
        self.push_bytes(&v.to_le_bytes());
    }

    fn push_u64(&mut self, v: u64) {
        self.push_bytes(&v.to_le_bytes());
    }

    fn push_f32(&mut self, v: f32) {
        self.push_bytes(&v.to_le_bytes());
    }

    fn push_vec2(&mut self, v: Vec2) {
        self.push_f32(v.x);
        self.push_f32(v.y);
    }

    fn push_color(&mut self, c: Color) {
        self.push_f32(c.r);
        self.push_f32(c.g);
        self.push_f32(c.b);
        self.push_f32(c.a);
    }

    fn push_transform(&mut self, ts: &Transform) {
        for v in &[ts.a, ts.b, ts.c, ts.d, ts.e, ts.f] {
            self.push_f32(*v);
        }
    }

    fn push_name(&mut self, name: &str) {
        self.push_bytes(name.as_bytes());
        self.push_u8(0);
    }
}

#[derive(Default)]
struct ExportSession {
    segments: Vec<Segment>,
    gradients: Vec<Rc<Gradient>>,
}

impl ExportSession {
    // Each distinct gradient instance is written exactly once.
    fn intern(&mut self, gradient: &Rc<Gradient>) -> u32 {
        if let Some(pos) = self.gradients.iter().position(|g| Rc::ptr_eq(g, gradient)) {
            return pos as u32;
        }
        self.gradients.push(gradient.clone());
        (self.gradients.len() - 1) as u32
    }
}

fn join_to_u64(v: StrokeJoin) -> u64 {
    match v {
        StrokeJoin::Miter => 0,
        StrokeJoin::Round => 1,
        StrokeJoin::Bevel => 2,
    }
}

fn cap_to_u64(v: StrokeCap) -> u64 {
    match v {
        StrokeCap::Round => 0,
        StrokeCap::Square => 1,
        StrokeCap::Butt => 2,
    }
}

fn push_paint(body: &mut Body, paint: &Paint, session: &mut ExportSession) {
    body.push_bool(true);
    match paint {
        Paint::Color(c) => {
            body.push_u8(0);
            body.push_color(*c);
        }
        Paint::LinearGradient(ref g) => {
            body.push_u8(1);
            let index = session.intern(g);
            body.push_u32(index);
        }
        Paint::RadialGradient(ref g) => {
            body.push_u8(2);
            let index = session.intern(g);
            body.push_u32(index);
        }
        // Callers only pass paints that draw something.
        Paint::None => unreachable!(),
    }
}

fn write_item(
    doc: &Document,
    id: ItemId,
    body: &mut Body,
    session: &mut ExportSession,
) -> Result<(), Error> {
    match doc.item_type(id) {
        ItemType::Document => {
            body.push_u64(0);
            body.push_f32(doc.width());
            body.push_f32(doc.height());
        }
        ItemType::Group => {
            body.push_u64(1);
            body.push_bool(doc.is_clipped(id));
        }
        ItemType::Path => {
            let path = doc.path(id).unwrap();
            body.push_u64(2);
            body.push_bool(path.is_closed());
            body.push_u64(session.segments.len() as u64);
            body.push_u64(path.segment_count() as u64);
            session.segments.extend_from_slice(path.segments());
        }
        ItemType::Symbol => {
            return Err(Error::InvalidOperation(
                "symbols cannot be serialized yet".to_string(),
            ));
        }
    }

    body.push_name(doc.name(id));
    body.push_bool(doc.is_visible(id));

    body.push_bool(doc.has_transform(id));
    if doc.has_transform(id) {
        body.push_transform(&doc.transform(id));
    }

    let locals = doc.style_locals(id).clone();

    // Only an explicit pivot is persisted; the position fallback is
    // derived data.
    let pivot = doc.explicit_pivot(id);
    body.push_bool(pivot.is_some());
    if let Some(p) = pivot {
        body.push_vec2(p);
    }

    // A locally present "no paint" cannot be expressed by the paint-ref
    // encoding; it round-trips as an absent value.
    match locals.fill {
        Some(ref paint) if !paint.is_none() => push_paint(body, paint, session),
        _ => body.push_bool(false),
    }
    match locals.stroke {
        Some(ref paint) if !paint.is_none() => push_paint(body, paint, session),
        _ => body.push_bool(false),
    }

    body.push_bool(locals.stroke_width.is_some());
    if let Some(v) = locals.stroke_width {
        body.push_f32(v);
    }
    body.push_bool(locals.stroke_join.is_some());
    if let Some(v) = locals.stroke_join {
        body.push_u64(join_to_u64(v));
    }
    body.push_bool(locals.stroke_cap.is_some());
    if let Some(v) = locals.stroke_cap {
        body.push_u64(cap_to_u64(v));
    }
    body.push_bool(locals.scale_stroke.is_some());
    if let Some(v) = locals.scale_stroke {
        body.push_bool(v);
    }
    body.push_bool(locals.miter_limit.is_some());
    if let Some(v) = locals.miter_limit {
        body.push_f32(v);
    }

    let dashes = locals.dash_array.as_deref().unwrap_or(&[]);
    body.push_u64(dashes.len() as u64);
    for dash in dashes {
        body.push_f32(*dash);
    }

    body.push_bool(locals.dash_offset.is_some());
    if let Some(v) = locals.dash_offset {
        body.push_f32(v);
    }
    body.push_bool(locals.winding_rule.is_some());
    if let Some(v) = locals.winding_rule {
        body.push_u64(match v {
            WindingRule::EvenOdd => 0,
            WindingRule::NonZero => 1,
        });
    }

    let children = doc.children(id).to_vec();
    body.push_u64(children.len() as u64);
    for child in children {
        write_item(doc, child, body, session)?;
    }
    Ok(())
}

/// Serializes `item` and its subtree.
pub fn write(doc: &Document, item: ItemId) -> Result<Vec<u8>, Error> {
    let mut body = Body::default();
    let mut session = ExportSession::default();

    // 01. hierarchy
    body.push_bytes(b"hr");
    write_item(doc, item, &mut body, &mut session)?;

    // 02. segment data
    let segment_off = body.position();
    body.push_bytes(b"sd");
    body.push_u64(session.segments.len() as u64);
    for seg in &session.segments {
        body.push_vec2(seg.handle_in);
        body.push_vec2(seg.position);
        body.push_vec2(seg.handle_out);
    }

    // 03. paint data
    let paint_off = body.position();
    body.push_bytes(b"pd");
    body.push_u64(session.gradients.len() as u64);
    for gradient in &session.gradients {
        body.push_u64(match gradient.kind() {
            GradientType::Linear => 0,
            GradientType::Radial => 1,
        });
        body.push_vec2(gradient.origin());
        body.push_vec2(gradient.destination());

        if gradient.kind() == GradientType::Radial {
            let focal = gradient.focal_point_offset();
            body.push_bool(focal.is_some());
            if let Some(f) = focal {
                body.push_vec2(f);
            }
            let ratio = gradient.ratio();
            body.push_bool(ratio.is_some());
            if let Some(r) = ratio {
                body.push_f32(r);
            }
        }

        let stops = gradient.stops();
        body.push_u64(stops.len() as u64);
        for stop in stops.iter() {
            body.push_color(stop.color);
            body.push_f32(stop.offset);
        }
    }

    let mut out = Vec::with_capacity(HEADER_LEN + body.buf.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&((segment_off + HEADER_LEN) as u64).to_le_bytes());
    out.extend_from_slice(&((paint_off + HEADER_LEN) as u64).to_le_bytes());
    out.extend_from_slice(&body.buf);
    Ok(out)
}

// ----------------------------------------------------------------------
// Reading

struct Stream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Stream<'a> {
    fn new(data: &'a [u8]) -> Self {
        Stream { data, pos: 0 }
    }

    fn jump(&mut self, pos: u64) -> Result<(), Error> {
        let pos = pos as usize;
        if pos > self.data.len() {
            return Err(Error::ParseFailed("offset out of bounds".to_string()));
        }
        self.pos = pos;
        Ok(())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.pos + len > self.data.len() {
            return Err(Error::ParseFailed("unexpected end of data".to_string()));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_f32(&mut self) -> Result<f32, Error> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_vec2(&mut self) -> Result<Vec2, Error> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    fn read_color(&mut self) -> Result<Color, Error> {
        Ok(Color::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    fn read_name(&mut self) -> Result<&'a str, Error> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != 0 {
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return Err(Error::ParseFailed("unterminated string".to_string()));
        }
        let bytes = &self.data[start..self.pos];
        self.pos += 1; // the NUL
        std::str::from_utf8(bytes)
            .map_err(|_| Error::ParseFailed("name is not valid UTF-8".to_string()))
    }

    fn expect_tag(&mut self, tag: &[u8; 2]) -> Result<(), Error> {
        if self.read_bytes(2)? != tag {
            return Err(Error::ParseFailed(format!(
                "missing '{}{}' section",
                tag[0] as char, tag[1] as char
            )));
        }
        Ok(())
    }
}

struct ImportSession {
    segments: Vec<Segment>,
    gradients: Vec<Rc<Gradient>>,
}

fn join_from_u64(v: u64) -> Result<StrokeJoin, Error> {
    match v {
        0 => Ok(StrokeJoin::Miter),
        1 => Ok(StrokeJoin::Round),
        2 => Ok(StrokeJoin::Bevel),
        _ => Err(Error::ParseFailed("unknown stroke join".to_string())),
    }
}

fn cap_from_u64(v: u64) -> Result<StrokeCap, Error> {
    match v {
        0 => Ok(StrokeCap::Round),
        1 => Ok(StrokeCap::Square),
        2 => Ok(StrokeCap::Butt),
        _ => Err(Error::ParseFailed("unknown stroke cap".to_string())),
    }
}

fn read_paint(s: &mut Stream, session: &ImportSession) -> Result<Option<Paint>, Error> {
    if !s.read_bool()? {
        return Ok(None);
    }

    match s.read_u8()? {
        0 => Ok(Some(Paint::Color(s.read_color()?))),
        1 | 2 => {
            let index = s.read_u32()? as usize;
            let gradient = session
                .gradients
                .get(index)
                .ok_or_else(|| Error::ParseFailed("gradient index out of range".to_string()))?;
            Ok(Some(Paint::from(gradient.clone())))
        }
        _ => Err(Error::ParseFailed("unknown paint kind".to_string())),
    }
}

fn read_item(
    doc: &mut Document,
    parent: Option<ItemId>,
    s: &mut Stream,
    session: &ImportSession,
) -> Result<ItemId, Error> {
    let id = match s.read_u64()? {
        0 => {
            if parent.is_some() {
                return Err(Error::ParseFailed("nested document".to_string()));
            }
            let w = s.read_f32()?;
            let h = s.read_f32()?;
            doc.set_size(w, h);
            doc.root()
        }
        1 => {
            let id = doc.create_group("");
            let clipped = s.read_bool()?;
            doc.set_clipped(id, clipped);
            id
        }
        2 => {
            let id = doc.create_path("");
            let closed = s.read_bool()?;
            let first = s.read_u64()? as usize;
            let count = s.read_u64()? as usize;
            let end = first
                .checked_add(count)
                .ok_or_else(|| Error::ParseFailed("segment range overflow".to_string()))?;
            if end > session.segments.len() {
                return Err(Error::ParseFailed("segment range out of bounds".to_string()));
            }
            doc.add_segments(id, &session.segments[first..end]);
            if closed {
                doc.close_path(id);
            }
            id
        }
        // The symbol branch is reserved; a file carrying one is not
        // readable by this version.
        _ => return Err(Error::ParseFailed("unsupported item type".to_string())),
    };

    let name = s.read_name()?.to_string();
    doc.set_name(id, &name);
    let visible = s.read_bool()?;
    doc.set_visible(id, visible);

    if s.read_bool()? {
        let mut m = [0.0f32; 6];
        for v in m.iter_mut() {
            *v = s.read_f32()?;
        }
        doc.set_transform(id, Transform::new(m[0], m[1], m[2], m[3], m[4], m[5]));
    }

    if s.read_bool()? {
        let pivot = s.read_vec2()?;
        doc.set_pivot(id, pivot);
    }

    if let Some(paint) = read_paint(s, session)? {
        doc.set_fill(id, paint);
    }
    if let Some(paint) = read_paint(s, session)? {
        doc.set_stroke(id, paint);
    }

    if s.read_bool()? {
        let v = s.read_f32()?;
        doc.set_stroke_width(id, v);
    }
    if s.read_bool()? {
        let v = join_from_u64(s.read_u64()?)?;
        doc.set_stroke_join(id, v);
    }
    if s.read_bool()? {
        let v = cap_from_u64(s.read_u64()?)?;
        doc.set_stroke_cap(id, v);
    }
    if s.read_bool()? {
        let v = s.read_bool()?;
        doc.set_scale_stroke(id, v);
    }
    if s.read_bool()? {
        let v = s.read_f32()?;
        doc.set_miter_limit(id, v);
    }

    let dash_count = s.read_u64()? as usize;
    if dash_count > 0 {
        let mut dashes = Vec::with_capacity(dash_count.min(1024));
        for _ in 0..dash_count {
            dashes.push(s.read_f32()?);
        }
        doc.set_dash_array(id, dashes);
    }

    if s.read_bool()? {
        let v = s.read_f32()?;
        doc.set_dash_offset(id, v);
    }
    if s.read_bool()? {
        let v = match s.read_u64()? {
            0 => WindingRule::EvenOdd,
            1 => WindingRule::NonZero,
            _ => return Err(Error::ParseFailed("unknown winding rule".to_string())),
        };
        doc.set_winding_rule(id, v);
    }

    let child_count = s.read_u64()?;
    for _ in 0..child_count {
        read_item(doc, Some(id), s, session)?;
    }

    if let Some(parent) = parent {
        if !doc.add_child(parent, id) {
            return Err(Error::ParseFailed("invalid item nesting".to_string()));
        }
    }

    Ok(id)
}

/// Parses a serialized scene into `doc`, returning the imported root
/// item. A serialized document merges into `doc` itself.
pub fn parse(doc: &mut Document, data: &[u8]) -> Result<ItemId, Error> {
    let mut s = Stream::new(data);

    if s.read_bytes(5)? != MAGIC {
        return Err(Error::ParseFailed("invalid header".to_string()));
    }
    let version = s.read_u32()?;
    if version != VERSION {
        return Err(Error::ParseFailed(format!(
            "unsupported format version {}",
            version
        )));
    }

    let segment_off = s.read_u64()?;
    let paint_off = s.read_u64()?;
    let hierarchy_pos = s.pos as u64;

    // Segment data first: the hierarchy references into it.
    s.jump(segment_off)?;
    s.expect_tag(b"sd")?;
    let segment_count = s.read_u64()? as usize;
    if segment_count.saturating_mul(24) > data.len() {
        return Err(Error::ParseFailed("segment count out of bounds".to_string()));
    }
    let mut segments = Vec::with_capacity(segment_count);
    for _ in 0..segment_count {
        segments.push(Segment {
            handle_in: s.read_vec2()?,
            position: s.read_vec2()?,
            handle_out: s.read_vec2()?,
        });
    }

    // Paint data next, so gradient references resolve.
    s.jump(paint_off)?;
    s.expect_tag(b"pd")?;
    let gradient_count = s.read_u64()? as usize;
    if gradient_count.saturating_mul(24) > data.len() {
        return Err(Error::ParseFailed(
            "gradient count out of bounds".to_string(),
        ));
    }
    let mut gradients = Vec::with_capacity(gradient_count);
    for _ in 0..gradient_count {
        let kind = s.read_u64()?;
        let origin = s.read_vec2()?;
        let destination = s.read_vec2()?;
        let gradient = match kind {
            0 => Gradient::linear(origin, destination),
            1 => {
                let g = Gradient::radial(origin, destination);
                if s.read_bool()? {
                    g.set_focal_point_offset(s.read_vec2()?);
                }
                if s.read_bool()? {
                    g.set_ratio(s.read_f32()?);
                }
                g
            }
            _ => return Err(Error::ParseFailed("unknown gradient type".to_string())),
        };

        let stop_count = s.read_u64()? as usize;
        if stop_count.saturating_mul(20) > data.len() {
            return Err(Error::ParseFailed("stop count out of bounds".to_string()));
        }
        for _ in 0..stop_count {
            let color = s.read_color()?;
            let offset = s.read_f32()?;
            gradient.add_stop(color, offset);
        }
        gradients.push(gradient);
    }

    let session = ImportSession {
        segments,
        gradients,
    };

    s.jump(hierarchy_pos)?;
    s.expect_tag(b"hr")?;
    read_item(doc, None, &mut s, &session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    #[test]
    fn document_round_trip() {
        let mut doc = Document::new();
        doc.set_size(800.0, 600.0);
        let grp = doc.create_group("layer");
        let circle = doc.create_circle(vec2(100.0, 100.0), 50.0, "dot");
        doc.add_child(grp, circle);
        doc.set_fill(circle, Color::new(1.0, 0.25, 0.125, 0.5));
        doc.set_stroke_width(grp, 3.0);
        doc.set_dash_array(circle, vec![4.0, 2.0]);
        doc.set_transform(grp, Transform::new(1.0, 0.5, -0.5, 1.0, 10.0, 20.0));
        doc.set_pivot(circle, vec2(1.0, 2.0));

        let data = write(&doc, doc.root()).unwrap();

        let mut re = Document::new();
        let root = parse(&mut re, &data).unwrap();
        assert_eq!(root, re.root());
        assert_eq!(re.width(), 800.0);
        assert_eq!(re.height(), 600.0);

        let grp2 = re.find_child(re.root(), "layer").unwrap();
        let circle2 = re.find_child(grp2, "dot").unwrap();
        assert_eq!(re.item_type(circle2), ItemType::Path);

        // Exact float bits for segment data.
        let before = doc.path(circle).unwrap().segments();
        let after = re.path(circle2).unwrap().segments();
        assert_eq!(before, after);
        assert!(re.path(circle2).unwrap().is_closed());

        assert_eq!(
            re.fill(circle2).as_color(),
            Some(Color::new(1.0, 0.25, 0.125, 0.5))
        );
        assert_eq!(re.stroke_width(grp2), 3.0);
        assert!(re.has_stroke_width(grp2));
        assert!(!re.has_stroke_width(circle2));
        assert_eq!(re.dash_array(circle2), vec![4.0, 2.0]);
        assert_eq!(re.transform(grp2), Transform::new(1.0, 0.5, -0.5, 1.0, 10.0, 20.0));
        assert_eq!(re.explicit_pivot(circle2), Some(vec2(1.0, 2.0)));
    }

    #[test]
    fn shared_gradients_stay_shared() {
        let mut doc = Document::new();
        let grad = doc.create_linear_gradient(vec2(0.0, 0.0), vec2(100.0, 0.0));
        grad.add_stop(Color::black(), 0.0);
        grad.add_stop(Color::white(), 1.0);

        let a = doc.create_circle(vec2(0.0, 0.0), 10.0, "a");
        let b = doc.create_circle(vec2(50.0, 0.0), 10.0, "b");
        doc.set_fill(a, grad.clone());
        doc.set_fill(b, grad.clone());

        let data = write(&doc, doc.root()).unwrap();
        let mut re = Document::new();
        parse(&mut re, &data).unwrap();

        let a2 = re.find_child(re.root(), "a").unwrap();
        let b2 = re.find_child(re.root(), "b").unwrap();
        let ga = re.fill(a2);
        let gb = re.fill(b2);
        let ga = ga.gradient().unwrap();
        let gb = gb.gradient().unwrap();

        // One instance, referenced twice.
        assert!(Rc::ptr_eq(ga, gb));
        assert_eq!(ga.stops().len(), 2);
        assert_eq!(ga.destination(), vec2(100.0, 0.0));
    }

    #[test]
    fn radial_extras_round_trip() {
        let mut doc = Document::new();
        let grad = doc.create_radial_gradient(vec2(0.0, 0.0), vec2(30.0, 0.0));
        grad.set_focal_point_offset(vec2(5.0, 5.0));
        grad.set_ratio(0.5);
        grad.add_stop(Color::black(), 0.0);
        let p = doc.create_circle(vec2(0.0, 0.0), 30.0, "p");
        doc.set_fill(p, grad);

        let data = write(&doc, doc.root()).unwrap();
        let mut re = Document::new();
        parse(&mut re, &data).unwrap();

        let p2 = re.find_child(re.root(), "p").unwrap();
        let paint = re.fill(p2);
        let g = paint.gradient().unwrap();
        assert_eq!(g.kind(), GradientType::Radial);
        assert_eq!(g.focal_point_offset(), Some(vec2(5.0, 5.0)));
        assert_eq!(g.ratio(), Some(0.5));
    }

    #[test]
    fn symbols_are_rejected() {
        let mut doc = Document::new();
        let rect = doc.create_rectangle(vec2(0.0, 0.0), vec2(10.0, 10.0), "");
        doc.create_symbol(rect, "").unwrap();
        assert!(write(&doc, doc.root()).is_err());
    }

    #[test]
    fn bad_headers_are_rejected() {
        let mut doc = Document::new();
        assert!(parse(&mut doc, b"not a paper file").is_err());
        assert!(parse(&mut doc, b"pa").is_err());

        // Corrupt the magic of an otherwise valid file.
        let mut doc2 = Document::new();
        doc2.set_size(10.0, 10.0);
        let mut data = write(&doc2, doc2.root()).unwrap();
        data[0] = b'x';
        assert!(parse(&mut doc, &data).is_err());
    }

    #[test]
    fn compound_paths_round_trip() {
        let mut doc = Document::new();
        let outer = doc.create_circle(vec2(0.0, 0.0), 100.0, "outer");
        let inner = doc.create_circle(vec2(0.0, 0.0), 50.0, "inner");
        doc.reverse(inner);
        doc.add_child(outer, inner);

        let data = write(&doc, doc.root()).unwrap();
        let mut re = Document::new();
        parse(&mut re, &data).unwrap();

        let outer2 = re.find_child(re.root(), "outer").unwrap();
        assert_eq!(re.children(outer2).len(), 1);
        let inner2 = re.children(outer2)[0];
        assert_eq!(re.item_type(inner2), ItemType::Path);
        assert_eq!(
            re.path(inner2).unwrap().segments(),
            doc.path(inner).unwrap().segments()
        );
    }
}
