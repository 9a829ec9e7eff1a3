// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::cell::{Cell, RefCell};

use crate::bezier::CubicBezier;
use crate::geom::{Rect, Transform, Vec2};
use crate::stroke;
use crate::winding::MonoLoop;
use crate::{StrokeCap, StrokeJoin, TOLERANCE};

/// A path segment: an anchor point with its two handles.
///
/// Handles are absolute positions, not offsets from the anchor.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Segment {
    pub handle_in: Vec2,
    pub position: Vec2,
    pub handle_out: Vec2,
}

impl Segment {
    /// A segment with both handles collapsed onto the anchor.
    #[inline]
    pub fn point(position: Vec2) -> Self {
        Segment {
            handle_in: position,
            position,
            handle_out: position,
        }
    }

    /// Builds a segment from an anchor and handle offsets relative to it.
    #[inline]
    pub fn with_relative_handles(position: Vec2, handle_in: Vec2, handle_out: Vec2) -> Self {
        Segment {
            handle_in: position + handle_in,
            position,
            handle_out: position + handle_out,
        }
    }

    /// The incoming handle as an offset from the anchor.
    #[inline]
    pub fn handle_in_offset(&self) -> Vec2 {
        self.handle_in - self.position
    }

    /// The outgoing handle as an offset from the anchor.
    #[inline]
    pub fn handle_out_offset(&self) -> Vec2 {
        self.handle_out - self.position
    }

    /// Returns `true` when both handles coincide with the anchor.
    pub fn is_linear(&self) -> bool {
        self.handle_in_offset().is_close(Vec2::ZERO, TOLERANCE)
            && self.handle_out_offset().is_close(Vec2::ZERO, TOLERANCE)
    }

    /// The segment with all three points mapped through `ts`.
    pub fn transformed(&self, ts: &Transform) -> Segment {
        Segment {
            handle_in: ts.apply(self.handle_in),
            position: ts.apply(self.position),
            handle_out: ts.apply(self.handle_out),
        }
    }
}

// Derived per-curve values, filled on first use.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct CurveData {
    pub bezier: Option<CubicBezier>,
    pub length: Option<f32>,
    pub bounds: Option<Rect>,
}

/// A position along a path: curve index, curve time and arc-length offset
/// from the path start.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CurveLocation {
    pub curve: usize,
    pub time: f32,
    pub offset: f32,
}

/// The handle smoothing flavors supported by [`Document::smooth`].
///
/// [`Document::smooth`]: crate::Document::smooth
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Smoothing {
    Continuous,
    Asymmetric,
}

// Everything the stroke-bounds math needs to know about the stroke.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StrokeStyle {
    pub width: f32,
    pub join: StrokeJoin,
    pub cap: StrokeCap,
    pub miter_limit: f32,
    pub scale_stroke: bool,
}

/// The geometry of a path item: segments plus lazily derived data.
#[derive(Debug, Default)]
pub struct Path {
    pub(crate) segments: Vec<Segment>,
    pub(crate) curves: RefCell<Vec<CurveData>>,
    pub(crate) closed: bool,
    pub(crate) length: Cell<Option<f32>>,
    pub(crate) mono: RefCell<Vec<MonoLoop>>,
    pub(crate) geometry_dirty: Cell<bool>,
}

impl Clone for Path {
    fn clone(&self) -> Self {
        Path {
            segments: self.segments.clone(),
            curves: RefCell::new(self.curves.borrow().clone()),
            closed: self.closed,
            length: self.length.clone(),
            mono: RefCell::new(Vec::new()),
            geometry_dirty: self.geometry_dirty.clone(),
        }
    }
}

impl Path {
    /// Creates an empty path.
    pub fn new() -> Self {
        Path::default()
    }

    /// The segment list.
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The number of segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The number of curves: `n` for a closed path with `n` segments,
    /// `n - 1` otherwise.
    #[inline]
    pub fn curve_count(&self) -> usize {
        self.curves.borrow().len()
    }

    /// Returns `true` when the last segment connects back to the first.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The cubic Bézier of curve `index`, computed on first use.
    pub fn bezier(&self, index: usize) -> CubicBezier {
        let mut curves = self.curves.borrow_mut();
        let data = &mut curves[index];
        if data.bezier.is_none() {
            let n = self.segments.len();
            let a = &self.segments[index];
            let b = &self.segments[(index + 1) % n];
            data.bezier = Some(CubicBezier::new(
                a.position,
                a.handle_out,
                b.handle_in,
                b.position,
            ));
        }
        data.bezier.unwrap()
    }

    /// The arc length of curve `index`, computed on first use.
    pub fn curve_length(&self, index: usize) -> f32 {
        let bezier = self.bezier(index);
        let mut curves = self.curves.borrow_mut();
        let data = &mut curves[index];
        if data.length.is_none() {
            data.length = Some(bezier.length());
        }
        data.length.unwrap()
    }

    /// The tight bounds of curve `index`, computed on first use.
    pub fn curve_bounds(&self, index: usize) -> Rect {
        let bezier = self.bezier(index);
        let mut curves = self.curves.borrow_mut();
        let data = &mut curves[index];
        if data.bounds.is_none() {
            data.bounds = Some(bezier.bounds());
        }
        data.bounds.unwrap()
    }

    #[cfg(test)]
    pub(crate) fn curve_cache_state(&self, index: usize) -> (bool, bool, bool) {
        let curves = self.curves.borrow();
        let d = &curves[index];
        (d.bezier.is_some(), d.length.is_some(), d.bounds.is_some())
    }

    /// The total arc length, cached.
    pub fn length(&self) -> f32 {
        if let Some(len) = self.length.get() {
            return len;
        }
        let mut len = 0.0;
        for i in 0..self.curve_count() {
            len += self.curve_length(i);
        }
        self.length.set(Some(len));
        len
    }

    /// The signed area enclosed by the path's own curves. Children of a
    /// compound path are added in by the document-level query.
    pub fn area(&self) -> f32 {
        let mut area = 0.0;
        for i in 0..self.curve_count() {
            area += self.bezier(i).area();
        }
        area
    }

    /// Returns `true` when every segment is handle-free.
    pub fn is_polygon(&self) -> bool {
        self.segments.iter().all(Segment::is_linear)
    }

    /// Returns `true` when the path winds clockwise (y-down).
    pub fn is_clockwise(&self) -> bool {
        self.area() >= 0.0
    }

    // Invalidates values derived from the whole path. Item-level bounds
    // are the document's business.
    pub(crate) fn mark_dirty(&self, length_dirty: bool) {
        self.geometry_dirty.set(true);
        self.mono.borrow_mut().clear();
        if length_dirty {
            self.length.set(None);
        }
    }

    /// Returns whether the geometry changed since the last call and
    /// clears the flag. Meant for renderers.
    pub fn clean_dirty_geometry(&self) -> bool {
        self.geometry_dirty.replace(false)
    }

    pub(crate) fn rebuild_curves(&mut self) {
        let n = self.segments.len();
        let count = if n > 1 {
            if self.closed {
                n
            } else {
                n - 1
            }
        } else {
            0
        };
        *self.curves.borrow_mut() = vec![CurveData::default(); count];
        self.mark_dirty(true);
    }

    // Fixes the curve list after segments were appended at the end.
    pub(crate) fn appended_segments(&mut self) {
        let n = self.segments.len();
        if n > 1 {
            let target = if self.closed { n } else { n - 1 };
            let mut curves = self.curves.borrow_mut();
            if self.closed {
                // The closing curve moved; it will be re-added below.
                curves.pop();
            }
            while curves.len() < target {
                curves.push(CurveData::default());
            }
        }
        self.mark_dirty(true);
    }

    // Clears the cached data of the curves touching segment `index`.
    pub(crate) fn segment_changed(&self, index: usize) {
        let mut curves = self.curves.borrow_mut();
        let count = curves.len();
        if count == 0 {
            return;
        }

        // Curve flowing into the segment.
        if index == 0 {
            if self.closed {
                curves[count - 1] = CurveData::default();
            }
        } else if index - 1 < count {
            curves[index - 1] = CurveData::default();
        }

        // Curve flowing out of the segment.
        if index < count {
            curves[index] = CurveData::default();
        }
        drop(curves);

        self.mark_dirty(true);
    }

    /// Appends `segments`, fixing up the curve list.
    pub fn add_segments(&mut self, segments: &[Segment]) {
        self.segments.extend_from_slice(segments);
        self.appended_segments();
    }

    /// Inserts `segments` at `index`.
    pub fn insert_segments(&mut self, index: usize, segments: &[Segment]) {
        if index >= self.segments.len() {
            self.add_segments(segments);
            return;
        }

        self.segments
            .splice(index..index, segments.iter().copied());
        {
            let mut curves = self.curves.borrow_mut();
            let new_len = curves.len() + segments.len();
            curves.resize(new_len, CurveData::default());
            // Everything from the insertion point on shifted.
            for data in curves.iter_mut().skip(index.saturating_sub(1)) {
                *data = CurveData::default();
            }
        }
        self.mark_dirty(true);
    }

    /// Removes the segments in `from..to`.
    pub fn remove_segments(&mut self, from: usize, to: usize) {
        let to = to.min(self.segments.len());
        if from >= to {
            return;
        }
        self.segments.drain(from..to);
        self.rebuild_curves();
    }

    /// Removes all segments and opens the path.
    pub fn clear_segments(&mut self) {
        self.closed = false;
        self.segments.clear();
        self.curves.borrow_mut().clear();
        self.mark_dirty(true);
    }

    /// Replaces the segment list wholesale.
    pub fn swap_segments(&mut self, segments: &mut Vec<Segment>, close: bool) {
        std::mem::swap(&mut self.segments, segments);
        self.closed = close;
        self.rebuild_curves();
    }

    /// Closes the path.
    ///
    /// When the first and last anchors coincide within tolerance the last
    /// segment is dropped and its incoming handle carried over to the
    /// first one.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        let n = self.segments.len();
        if n > 1 {
            let first = self.segments[0];
            let last = self.segments[n - 1];
            if first.position.is_close(last.position, TOLERANCE) {
                self.segments[0].handle_in = first.position + last.handle_in_offset();
                self.segments.pop();
                let mut curves = self.curves.borrow_mut();
                if let Some(last_curve) = curves.last_mut() {
                    // It closes onto segment 0 now.
                    *last_curve = CurveData::default();
                }
            } else {
                self.curves.borrow_mut().push(CurveData::default());
            }
        }

        self.closed = true;
        self.mark_dirty(true);
    }

    /// Reverses the drawing direction. Handles swap roles.
    pub fn reverse(&mut self) {
        for seg in &mut self.segments {
            std::mem::swap(&mut seg.handle_in, &mut seg.handle_out);
        }
        self.segments.reverse();
        self.rebuild_curves();
    }

    /// The arc-length offset of the start of curve `index`.
    pub fn curve_offset(&self, index: usize) -> f32 {
        let mut offset = 0.0;
        for i in 0..index.min(self.curve_count()) {
            offset += self.curve_length(i);
        }
        offset
    }

    /// The location at arc-length `offset` from the path start.
    pub fn location_at(&self, offset: f32) -> Option<CurveLocation> {
        let count = self.curve_count();
        let mut start = 0.0;
        for i in 0..count {
            let len = self.curve_length(i);
            if start + len >= offset {
                let time = self.bezier(i).parameter_at_offset(offset - start);
                return Some(CurveLocation {
                    curve: i,
                    time,
                    offset,
                });
            }
            start += len;
        }

        // The summed lengths may fall just short of the total.
        if count > 0 && offset <= self.length() {
            return Some(CurveLocation {
                curve: count - 1,
                time: 1.0,
                offset,
            });
        }

        None
    }

    /// The location on the path closest to `point`, with its distance.
    pub fn closest_location(&self, point: Vec2) -> Option<(CurveLocation, f32)> {
        let mut best: Option<(usize, f32, f32)> = None;
        for i in 0..self.curve_count() {
            let (t, dist) = self.bezier(i).closest_parameter(point);
            if best.map_or(true, |(_, _, d)| dist < d) {
                best = Some((i, t, dist));
            }
        }

        let (curve, time, dist) = best?;
        let offset = self.curve_offset(curve) + self.bezier(curve).length_between(0.0, time);
        Some((
            CurveLocation {
                curve,
                time,
                offset,
            },
            dist,
        ))
    }

    /// The position at arc-length `offset`.
    pub fn position_at(&self, offset: f32) -> Option<Vec2> {
        let loc = self.location_at(offset)?;
        Some(self.bezier(loc.curve).point_at(loc.time))
    }

    /// The unit tangent at arc-length `offset`.
    pub fn tangent_at(&self, offset: f32) -> Option<Vec2> {
        let loc = self.location_at(offset)?;
        Some(self.bezier(loc.curve).tangent_at(loc.time))
    }

    /// The unit normal at arc-length `offset`.
    pub fn normal_at(&self, offset: f32) -> Option<Vec2> {
        let loc = self.location_at(offset)?;
        Some(self.bezier(loc.curve).normal_at(loc.time))
    }

    /// The curvature at arc-length `offset`.
    pub fn curvature_at(&self, offset: f32) -> Option<f32> {
        let loc = self.location_at(offset)?;
        Some(self.bezier(loc.curve).curvature_at(loc.time))
    }

    /// The tangent angle in radians at arc-length `offset`.
    pub fn angle_at(&self, offset: f32) -> Option<f32> {
        let loc = self.location_at(offset)?;
        Some(self.bezier(loc.curve).angle_at(loc.time))
    }

    /// Splits curve `index` at curve time `t` by inserting a segment.
    /// Returns the index of the newly created curve.
    pub fn divide_curve_at_time(&mut self, index: usize, t: f32) -> Option<usize> {
        if index >= self.curve_count() || t <= 0.0 || t >= 1.0 {
            return None;
        }

        let (first, second) = self.bezier(index).split(t);
        let n = self.segments.len();
        let two = (index + 1) % n;

        self.segments[index].handle_out = first.ctrl1;
        self.segments[two].handle_in = second.ctrl2;
        self.insert_segments(
            index + 1,
            &[Segment {
                handle_in: first.ctrl2,
                position: first.to,
                handle_out: second.ctrl1,
            }],
        );
        self.segment_changed(index);

        Some(index + 1)
    }

    // The segment chain covering `from..to`, both locations on this path
    // with `from` before `to`. Used to cut out a sub-path.
    pub(crate) fn sliced_segments(
        &self,
        from: CurveLocation,
        to: CurveLocation,
    ) -> Option<Vec<Segment>> {
        if from.curve >= self.curve_count() || to.curve >= self.curve_count() {
            return None;
        }
        if from.curve == to.curve && (from.time - to.time).abs() <= f32::EPSILON {
            return None;
        }

        let (head, tail);
        if from.curve != to.curve {
            head = self.bezier(from.curve).slice(from.time, 1.0);
            tail = self.bezier(to.curve).slice(0.0, to.time);
        } else {
            head = self.bezier(from.curve).slice(from.time, to.time);
            tail = head;
        }

        let mut out = Vec::with_capacity(to.curve - from.curve + 2);
        out.push(Segment {
            handle_in: head.from,
            position: head.from,
            handle_out: head.ctrl1,
        });

        // Unmodified segments between the two cut curves.
        let n = self.segments.len();
        for i in (from.curve + 1)..=to.curve {
            let seg = self.segments[i % n];
            let mut handle_in = seg.handle_in;
            let mut handle_out = seg.handle_out;
            if i == from.curve + 1 {
                handle_in = head.ctrl2;
            }
            if i == to.curve {
                handle_out = tail.ctrl1;
            }
            out.push(Segment {
                handle_in,
                position: seg.position,
                handle_out,
            });
        }

        out.push(Segment {
            handle_in: tail.ctrl2,
            position: tail.to,
            handle_out: tail.to,
        });

        Some(out)
    }

    /// Smooths the segment handles in the inclusive index range
    /// `from..=to`. Negative indices address from the end.
    ///
    /// Continuous/asymmetric spline smoothing via the Thomas algorithm,
    /// based on work by Lubos Brieda, Particle In Cell Consulting LLC.
    pub fn smooth_range(&mut self, from: i64, to: i64, kind: Smoothing) {
        let seg_count = self.segments.len() as i64;
        if seg_count < 2 {
            return;
        }

        let clamp_index = |idx: i64| -> i64 {
            let idx = if idx < 0 && self.closed {
                idx % seg_count
            } else if idx < 0 {
                idx + seg_count
            } else {
                idx
            };
            idx.min(seg_count - 1)
        };

        let mut from_idx = clamp_index(from);
        let mut to_idx = clamp_index(to);
        if from_idx > to_idx {
            if self.closed {
                from_idx -= seg_count;
            } else {
                std::mem::swap(&mut from_idx, &mut to_idx);
            }
        }

        let asymmetric = kind == Smoothing::Asymmetric;
        let amount = to_idx - from_idx + 1;
        let mut n = amount - 1;
        let looped = self.closed && from_idx == 0 && to_idx == seg_count - 1;

        // A segment is affected by up to four neighbors on both sides.
        let padding_left = if looped {
            amount.min(4)
        } else {
            1.min(from_idx)
        };
        let padding_right = if looped {
            amount.min(4)
        } else {
            1.min(seg_count - to_idx - 1)
        };

        n += padding_left + padding_right;
        if n <= 1 {
            return;
        }

        let nu = n as usize;
        let mut knots = vec![Vec2::ZERO; nu + 1];
        {
            let mut j = from_idx - padding_left;
            for knot in knots.iter_mut() {
                let idx = (if j < 0 { j + seg_count } else { j } % seg_count) as usize;
                *knot = self.segments[idx].position;
                j += 1;
            }
        }

        let mut x = knots[0].x + 2.0 * knots[1].x;
        let mut y = knots[0].y + 2.0 * knots[1].y;
        let mut f = 2.0f32;
        let n1 = nu - 1;
        let mut rx = vec![0.0f32; nu + 1];
        let mut ry = vec![0.0f32; nu + 1];
        let mut rf = vec![0.0f32; nu + 1];
        rx[0] = x;
        ry[0] = y;
        rf[0] = f;

        let mut px = vec![0.0f32; nu + 1];
        let mut py = vec![0.0f32; nu + 1];

        // Forward sweep of the tridiagonal solve.
        for i in 1..nu {
            let internal = i < n1;
            let a = if internal {
                1.0
            } else if asymmetric {
                1.0
            } else {
                2.0
            };
            let b = if internal {
                4.0
            } else if asymmetric {
                2.0
            } else {
                7.0
            };
            let u = if internal {
                4.0
            } else if asymmetric {
                3.0
            } else {
                8.0
            };
            let v = if internal {
                2.0
            } else if asymmetric {
                0.0
            } else {
                1.0
            };
            let m = a / f;
            f = b - m;
            rf[i] = f;
            x = u * knots[i].x + v * knots[i + 1].x - m * x;
            y = u * knots[i].y + v * knots[i + 1].y - m * y;
            rx[i] = x;
            ry[i] = y;
        }

        px[n1] = rx[n1] / rf[n1];
        py[n1] = ry[n1] / rf[n1];
        for i in (0..n1).rev() {
            px[i] = (rx[i] - px[i + 1]) / rf[i];
            py[i] = (ry[i] - py[i + 1]) / rf[i];
        }
        px[nu] = (3.0 * knots[nu].x - px[n1]) / 2.0;
        py[nu] = (3.0 * knots[nu].y - py[n1]) / 2.0;

        let max = n - padding_right;
        let mut i = padding_left;
        let mut j = from_idx;
        while i <= max {
            let index = (if j < 0 { j + seg_count } else { j } % seg_count) as usize;
            let segment = &mut self.segments[index];
            let control = Vec2::new(px[i as usize], py[i as usize]);
            let offset = control - segment.position;
            if looped || i < max {
                segment.handle_out = control;
            }
            if looped || i > padding_left {
                segment.handle_in = segment.position - offset;
            }
            i += 1;
            j += 1;
        }

        self.rebuild_curves();
    }

    // ------------------------------------------------------------------
    // Bounds

    /// Bounds of the filled outline, optionally padded and transformed.
    pub(crate) fn compute_fill_bounds(
        &self,
        ts: Option<&Transform>,
        padding: f32,
    ) -> Option<Rect> {
        let n = self.segments.len();
        if n == 0 {
            return None;
        }

        if n == 1 {
            let p = match ts {
                Some(m) => m.apply(self.segments[0].position),
                None => self.segments[0].position,
            };
            return Some(Rect::new(p, p));
        }

        let mut rect: Option<Rect> = None;
        match ts {
            None => {
                for i in 0..self.curve_count() {
                    let b = if padding > 0.0 {
                        self.bezier(i).bounds_padded(padding)
                    } else {
                        self.curve_bounds(i)
                    };
                    rect = Some(match rect {
                        Some(r) => r.merged(&b),
                        None => b,
                    });
                }
            }
            Some(m) => {
                // Bring each segment into the target space once, then
                // evaluate the curve bounds there.
                let first = self.segments[0].transformed(m);
                let mut last_position = first.position;
                let mut last_handle = first.handle_out;
                for i in 1..n {
                    let seg = self.segments[i].transformed(m);
                    let bez =
                        CubicBezier::new(last_position, last_handle, seg.handle_in, seg.position);
                    let b = bez.bounds_padded(padding);
                    rect = Some(match rect {
                        Some(r) => r.merged(&b),
                        None => b,
                    });
                    last_handle = seg.handle_out;
                    last_position = seg.position;
                }

                if self.closed {
                    let bez = CubicBezier::new(
                        last_position,
                        last_handle,
                        first.handle_in,
                        first.position,
                    );
                    let b = bez.bounds_padded(padding);
                    rect = Some(match rect {
                        Some(r) => r.merged(&b),
                        None => b,
                    });
                }
            }
        }

        rect
    }

    /// Bounds of the stroked outline: fill bounds padded by the stroke
    /// radius plus the exact cap and join corners.
    pub(crate) fn compute_stroke_bounds(
        &self,
        ts: Option<&Transform>,
        style: Option<&StrokeStyle>,
    ) -> Option<Rect> {
        let style = match style {
            Some(s) => s,
            None => return self.compute_fill_bounds(ts, 0.0),
        };

        let radius = style.width * 0.5;
        let mat = ts.copied().unwrap_or_else(Transform::identity);
        let stroke_mat = if style.scale_stroke {
            Transform::from_scale(radius, radius)
        } else {
            mat.inverse().unwrap_or_else(Transform::identity)
                * Transform::from_scale(radius, radius)
        };
        // With scale-stroke off the stroke is defined in document space,
        // so the padding circle is never distorted.
        let identity = Transform::identity();
        let padding =
            stroke::stroke_padding(radius, if style.scale_stroke { &mat } else { &identity });

        let mut rect = self.compute_fill_bounds(ts, padding.x.max(padding.y))?;

        let inv_stroke_mat = match stroke_mat.inverse() {
            Some(m) => m,
            // A zero-width stroke adds nothing beyond the fill bounds.
            None => return Some(rect),
        };

        let n = self.segments.len();
        if n < 2 {
            return Some(rect);
        }

        // Segments in stroke space, where the stroke radius is 1.
        let stroke_segs: Vec<Segment> = self
            .segments
            .iter()
            .map(|s| s.transformed(&inv_stroke_mat))
            .collect();

        if self.closed {
            for i in 0..n {
                stroke::merge_join(
                    &mut rect,
                    style.join,
                    style.miter_limit,
                    &stroke_segs[(i + n - 1) % n],
                    &stroke_segs[i],
                    &stroke_segs[(i + 1) % n],
                    padding,
                    &stroke_mat,
                    ts,
                );
            }
        } else {
            for i in 1..n - 1 {
                stroke::merge_join(
                    &mut rect,
                    style.join,
                    style.miter_limit,
                    &stroke_segs[i - 1],
                    &stroke_segs[i],
                    &stroke_segs[i + 1],
                    padding,
                    &stroke_mat,
                    ts,
                );
            }

            stroke::merge_cap(
                &mut rect,
                style.cap,
                &stroke_segs[0],
                &stroke_segs[1],
                true,
                padding,
                &stroke_mat,
                ts,
            );
            stroke::merge_cap(
                &mut rect,
                style.cap,
                &stroke_segs[n - 2],
                &stroke_segs[n - 1],
                false,
                padding,
                &stroke_mat,
                ts,
            );
        }

        Some(rect)
    }

    /// Stroke bounds extended to every handle position.
    pub(crate) fn compute_handle_bounds(
        &self,
        ts: Option<&Transform>,
        style: Option<&StrokeStyle>,
    ) -> Option<Rect> {
        let mut rect = self.compute_stroke_bounds(ts, style)?;

        for seg in &self.segments {
            let (hin, hout) = match ts {
                Some(m) => (m.apply(seg.handle_in), m.apply(seg.handle_out)),
                None => (seg.handle_in, seg.handle_out),
            };
            rect = rect.merged_point(hin);
            rect = rect.merged_point(hout);
        }

        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    fn open_zigzag() -> Path {
        let mut path = Path::new();
        path.add_segments(&[
            Segment::point(vec2(0.0, 0.0)),
            Segment::point(vec2(100.0, 0.0)),
            Segment::point(vec2(100.0, 100.0)),
        ]);
        path
    }

    #[test]
    fn curve_count_follows_closed_flag() {
        let mut path = open_zigzag();
        assert_eq!(path.segment_count(), 3);
        assert_eq!(path.curve_count(), 2);
        path.close();
        assert_eq!(path.curve_count(), 3);
    }

    #[test]
    fn close_merges_coincident_endpoints() {
        let mut path = open_zigzag();
        path.add_segments(&[Segment::with_relative_handles(
            vec2(0.0, 0.0),
            vec2(-5.0, 2.0),
            vec2(0.0, 0.0),
        )]);
        assert_eq!(path.segment_count(), 4);
        path.close();
        // The duplicate anchor is dropped, its handle carried over.
        assert_eq!(path.segment_count(), 3);
        assert_eq!(path.curve_count(), 3);
        assert_eq!(path.segments()[0].handle_in, vec2(-5.0, 2.0));
    }

    #[test]
    fn length_of_polyline() {
        let path = open_zigzag();
        assert!((path.length() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn segment_mutation_clears_neighbor_caches() {
        let mut path = open_zigzag();
        path.close();
        for i in 0..path.curve_count() {
            path.curve_length(i);
            path.curve_bounds(i);
        }

        path.segments[0].position = vec2(10.0, 0.0);
        path.segment_changed(0);

        // Curves 2 (closing, flows in) and 0 (flows out) are dirty.
        assert_eq!(path.curve_cache_state(0), (false, false, false));
        assert_ne!(path.curve_cache_state(1), (false, false, false));
        assert_eq!(path.curve_cache_state(2), (false, false, false));
    }

    #[test]
    fn reverse_round_trips() {
        let mut path = open_zigzag();
        path.add_segments(&[Segment::with_relative_handles(
            vec2(50.0, 50.0),
            vec2(-3.0, 0.0),
            vec2(3.0, 0.0),
        )]);
        let original = path.segments().to_vec();
        path.reverse();
        path.reverse();
        assert_eq!(path.segments(), original.as_slice());
    }

    #[test]
    fn reverse_flips_direction() {
        let mut path = open_zigzag();
        path.add_segments(&[Segment::point(vec2(0.0, 100.0))]);
        path.close();
        let cw = path.is_clockwise();
        path.reverse();
        assert_eq!(path.is_clockwise(), !cw);
    }

    #[test]
    fn location_queries() {
        let path = open_zigzag();
        let loc = path.location_at(150.0).unwrap();
        assert_eq!(loc.curve, 1);
        assert!(path.position_at(150.0).unwrap().is_close(vec2(100.0, 50.0), 1e-3));
        assert!(path.tangent_at(150.0).unwrap().is_close(vec2(0.0, 1.0), 1e-3));

        let (closest, dist) = path.closest_location(vec2(50.0, 20.0)).unwrap();
        assert_eq!(closest.curve, 0);
        assert!((dist - 20.0).abs() < 1e-2);
    }

    #[test]
    fn divide_inserts_segment() {
        let mut path = open_zigzag();
        let new_curve = path.divide_curve_at_time(0, 0.5).unwrap();
        assert_eq!(new_curve, 1);
        assert_eq!(path.segment_count(), 4);
        assert!(path.segments()[1].position.is_close(vec2(50.0, 0.0), 1e-3));
        // Total length is unchanged by the split.
        assert!((path.length() - 200.0).abs() < 1e-2);
    }

    #[test]
    fn fill_bounds_ignore_stroke() {
        let mut path = open_zigzag();
        path.close();
        let b = path.compute_fill_bounds(None, 0.0).unwrap();
        assert!(b.min.is_close(vec2(0.0, 0.0), 1e-4));
        assert!(b.max.is_close(vec2(100.0, 100.0), 1e-4));
    }

    #[test]
    fn smooth_produces_handles() {
        let mut path = open_zigzag();
        path.add_segments(&[Segment::point(vec2(0.0, 100.0))]);
        path.smooth_range(0, 3, Smoothing::Asymmetric);
        // Interior segments get real handles.
        assert!(!path.segments()[1].is_linear());
        assert!(!path.segments()[2].is_linear());
    }

    #[test]
    fn slice_extracts_subpath() {
        let path = open_zigzag();
        let from = path.location_at(50.0).unwrap();
        let to = path.location_at(150.0).unwrap();
        let segs = path.sliced_segments(from, to).unwrap();

        let mut sliced = Path::new();
        sliced.add_segments(&segs);
        assert!((sliced.length() - 100.0).abs() < 0.5);
        assert!(segs[0].position.is_close(vec2(50.0, 0.0), 1e-2));
        assert!(segs.last().unwrap().position.is_close(vec2(100.0, 50.0), 1e-2));
    }
}
