// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::geom::{Color, Vec2};

/// The gradient flavor.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GradientType {
    Linear,
    Radial,
}

/// A gradient color stop.
#[derive(Clone, Copy, Debug)]
pub struct ColorStop {
    /// Stop color.
    pub color: Color,
    /// Stop offset in the 0..=1 range.
    pub offset: f32,
}

/// A gradient shared between paints by reference.
///
/// Interior mutability keeps shared instances editable: changing a
/// gradient through one item is visible through every other item
/// referencing it. The dirty flags are consumed by renderers and
/// exporters.
#[derive(Debug)]
pub struct Gradient {
    kind: GradientType,
    origin: Cell<Vec2>,
    destination: Cell<Vec2>,
    stops: RefCell<Vec<ColorStop>>,
    focal_point_offset: Cell<Option<Vec2>>,
    ratio: Cell<Option<f32>>,
    stops_dirty: Cell<bool>,
    positions_dirty: Cell<bool>,
}

impl Gradient {
    fn new(kind: GradientType, origin: Vec2, destination: Vec2) -> Rc<Self> {
        Rc::new(Gradient {
            kind,
            origin: Cell::new(origin),
            destination: Cell::new(destination),
            stops: RefCell::new(Vec::new()),
            focal_point_offset: Cell::new(None),
            ratio: Cell::new(None),
            stops_dirty: Cell::new(true),
            positions_dirty: Cell::new(true),
        })
    }

    /// Creates a linear gradient running from `origin` to `destination`.
    pub fn linear(origin: Vec2, destination: Vec2) -> Rc<Self> {
        Gradient::new(GradientType::Linear, origin, destination)
    }

    /// Creates a radial gradient centered at `origin` whose radius reaches
    /// `destination`.
    pub fn radial(origin: Vec2, destination: Vec2) -> Rc<Self> {
        Gradient::new(GradientType::Radial, origin, destination)
    }

    /// The gradient flavor.
    #[inline]
    pub fn kind(&self) -> GradientType {
        self.kind
    }

    /// The gradient origin.
    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.origin.get()
    }

    /// The gradient destination.
    #[inline]
    pub fn destination(&self) -> Vec2 {
        self.destination.get()
    }

    /// Moves the gradient origin.
    pub fn set_origin(&self, p: Vec2) {
        self.origin.set(p);
        self.positions_dirty.set(true);
    }

    /// Moves the gradient destination.
    pub fn set_destination(&self, p: Vec2) {
        self.destination.set(p);
        self.positions_dirty.set(true);
    }

    /// Moves both gradient positions at once.
    pub fn set_origin_and_destination(&self, origin: Vec2, destination: Vec2) {
        self.origin.set(origin);
        self.destination.set(destination);
        self.positions_dirty.set(true);
    }

    /// Appends a color stop.
    pub fn add_stop(&self, color: Color, offset: f32) {
        self.stops.borrow_mut().push(ColorStop { color, offset });
        self.stops_dirty.set(true);
    }

    /// The ordered color stops.
    pub fn stops(&self) -> Ref<[ColorStop]> {
        Ref::map(self.stops.borrow(), |s| s.as_slice())
    }

    /// The focal point offset of a radial gradient.
    #[inline]
    pub fn focal_point_offset(&self) -> Option<Vec2> {
        self.focal_point_offset.get()
    }

    /// Sets the focal point offset of a radial gradient.
    pub fn set_focal_point_offset(&self, offset: Vec2) {
        self.focal_point_offset.set(Some(offset));
        self.positions_dirty.set(true);
    }

    /// The ratio of a radial gradient.
    #[inline]
    pub fn ratio(&self) -> Option<f32> {
        self.ratio.get()
    }

    /// Sets the ratio of a radial gradient.
    pub fn set_ratio(&self, ratio: f32) {
        self.ratio.set(Some(ratio));
        self.positions_dirty.set(true);
    }

    /// Returns whether the positions changed since the last call and
    /// clears the flag.
    pub fn clean_dirty_positions(&self) -> bool {
        self.positions_dirty.replace(false)
    }

    /// Returns whether the stop list changed since the last call and
    /// clears the flag.
    pub fn clean_dirty_stops(&self) -> bool {
        self.stops_dirty.replace(false)
    }
}

/// What an item is filled or stroked with.
#[derive(Clone, Debug)]
pub enum Paint {
    /// No paint. Drawing with it is a no-op.
    None,
    /// A solid color.
    Color(Color),
    /// A reference-shared linear gradient.
    LinearGradient(Rc<Gradient>),
    /// A reference-shared radial gradient.
    RadialGradient(Rc<Gradient>),
}

impl Paint {
    /// Returns `true` for [`Paint::None`].
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }

    /// The solid color, if any.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Paint::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// The shared gradient, if any.
    pub fn gradient(&self) -> Option<&Rc<Gradient>> {
        match self {
            Paint::LinearGradient(ref g) | Paint::RadialGradient(ref g) => Some(g),
            _ => None,
        }
    }
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::Color(c)
    }
}

impl From<Rc<Gradient>> for Paint {
    fn from(g: Rc<Gradient>) -> Self {
        match g.kind() {
            GradientType::Linear => Paint::LinearGradient(g),
            GradientType::Radial => Paint::RadialGradient(g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec2;

    #[test]
    fn shared_gradient_edits() {
        let grad = Gradient::linear(vec2(0.0, 0.0), vec2(100.0, 0.0));
        let a = Paint::from(grad.clone());
        let b = Paint::from(grad.clone());

        grad.set_destination(vec2(50.0, 0.0));
        for paint in &[a, b] {
            let g = paint.gradient().unwrap();
            assert_eq!(g.destination(), vec2(50.0, 0.0));
        }

        assert!(grad.clean_dirty_positions());
        assert!(!grad.clean_dirty_positions());
    }

    #[test]
    fn gradient_identity() {
        let g1 = Gradient::radial(vec2(0.0, 0.0), vec2(10.0, 0.0));
        let g2 = Gradient::radial(vec2(0.0, 0.0), vec2(10.0, 0.0));
        let p1 = Paint::from(g1.clone());

        assert!(Rc::ptr_eq(p1.gradient().unwrap(), &g1));
        assert!(!Rc::ptr_eq(p1.gradient().unwrap(), &g2));
    }
}
