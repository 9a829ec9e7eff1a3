// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use float_cmp::ApproxEqUlps;

/// A trait for fuzzy/approximate equality comparisons of float numbers.
pub trait FuzzyEq<Rhs: ?Sized = Self> {
    /// Returns `true` if values are approximately equal.
    fn fuzzy_eq(&self, other: &Rhs) -> bool;

    /// Returns `true` if values are not approximately equal.
    #[inline]
    fn fuzzy_ne(&self, other: &Rhs) -> bool {
        !self.fuzzy_eq(other)
    }
}

/// A trait for fuzzy/approximate comparisons of float numbers.
pub trait FuzzyZero: FuzzyEq {
    /// Returns `true` if the number is approximately zero.
    fn is_fuzzy_zero(&self) -> bool;
}

impl FuzzyEq for f32 {
    #[inline]
    fn fuzzy_eq(&self, other: &f32) -> bool {
        self.approx_eq_ulps(other, 4)
    }
}

impl FuzzyEq for f64 {
    #[inline]
    fn fuzzy_eq(&self, other: &f64) -> bool {
        self.approx_eq_ulps(other, 4)
    }
}

impl FuzzyZero for f32 {
    #[inline]
    fn is_fuzzy_zero(&self) -> bool {
        self.fuzzy_eq(&0.0)
    }
}

impl FuzzyZero for f64 {
    #[inline]
    fn is_fuzzy_zero(&self) -> bool {
        self.fuzzy_eq(&0.0)
    }
}

/// A 2D vector.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// A shorthand for [`Vec2::new`].
#[inline]
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

impl Vec2 {
    /// Creates a new vector.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// A vector with both components set to zero.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// The z component of the 3D cross product.
    #[inline]
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Squared length.
    #[inline]
    pub fn length_sq(self) -> f32 {
        self.dot(self)
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Returns a unit-length copy. Zero vectors are returned unchanged.
    #[inline]
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            self
        }
    }

    /// Rotates the vector by `radians` counter-clockwise.
    pub fn rotated(self, radians: f32) -> Vec2 {
        let (s, c) = radians.sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Component-wise absolute value.
    #[inline]
    pub fn abs(self) -> Vec2 {
        Vec2::new(self.x.abs(), self.y.abs())
    }

    /// Linear interpolation towards `other`.
    #[inline]
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }

    /// Returns `true` when both components are within `epsilon` of `other`'s.
    #[inline]
    pub fn is_close(self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }

    /// The signed angle from this vector to `other` in radians.
    pub fn directed_angle(self, other: Vec2) -> f32 {
        self.cross(other).atan2(self.dot(other))
    }

    /// Returns `true` if both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl FuzzyEq for Vec2 {
    #[inline]
    fn fuzzy_eq(&self, other: &Self) -> bool {
        self.x.fuzzy_eq(&other.x) && self.y.fuzzy_eq(&other.y)
    }
}

impl std::fmt::Debug for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Vec2({} {})", self.x, self.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, s: f32) -> Vec2 {
        Vec2::new(self.x / s, self.y / s)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, other: Vec2) {
        *self = *self + other;
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, other: Vec2) {
        *self = *self - other;
    }
}

impl MulAssign<f32> for Vec2 {
    #[inline]
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

/// An RGBA color. Components are in the 0..=1 range.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Creates a new color.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Opaque black.
    #[inline]
    pub fn black() -> Self {
        Color::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Opaque white.
    #[inline]
    pub fn white() -> Self {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }
}

impl FuzzyEq for Color {
    fn fuzzy_eq(&self, other: &Self) -> bool {
        self.r.fuzzy_eq(&other.r)
            && self.g.fuzzy_eq(&other.g)
            && self.b.fuzzy_eq(&other.b)
            && self.a.fuzzy_eq(&other.a)
    }
}

/// A 2×3 affine transform.
///
/// Maps a point as `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Transform {
    /// Constructs a new transform.
    #[inline]
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Transform { a, b, c, d, e, f }
    }

    /// The identity transform.
    #[inline]
    pub fn identity() -> Self {
        Transform::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Constructs a new translate transform.
    #[inline]
    pub fn from_translation(t: Vec2) -> Self {
        Transform::new(1.0, 0.0, 0.0, 1.0, t.x, t.y)
    }

    /// Constructs a new scale transform.
    #[inline]
    pub fn from_scale(sx: f32, sy: f32) -> Self {
        Transform::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Constructs a new rotate transform. The angle is in radians.
    pub fn from_rotation(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Transform::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Constructs a new skew transform. The angles are in radians.
    pub fn from_skew(angles: Vec2) -> Self {
        Transform::new(1.0, angles.y.tan(), angles.x.tan(), 1.0, 0.0, 0.0)
    }

    /// A transform that applies `inner` about the `center` point.
    pub fn around(center: Vec2, inner: Transform) -> Self {
        Transform::from_translation(center) * inner * Transform::from_translation(-center)
    }

    /// Appends `other` to the current transform, so that `other` is applied first.
    #[inline]
    pub fn append(&mut self, other: &Transform) {
        *self = *self * *other;
    }

    /// Prepends `other` to the current transform, so that `other` is applied last.
    #[inline]
    pub fn prepend(&mut self, other: &Transform) {
        *self = *other * *self;
    }

    /// Returns `true` if the transform is the identity, aka `(1 0 0 1 0 0)`.
    pub fn is_identity(&self) -> bool {
        self.a.fuzzy_eq(&1.0)
            && self.b.fuzzy_eq(&0.0)
            && self.c.fuzzy_eq(&0.0)
            && self.d.fuzzy_eq(&1.0)
            && self.e.fuzzy_eq(&0.0)
            && self.f.fuzzy_eq(&0.0)
    }

    /// The determinant of the linear part.
    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Returns the inverse, or `None` for a degenerate transform.
    pub fn inverse(&self) -> Option<Transform> {
        let det = self.determinant();
        if det.is_fuzzy_zero() || !det.is_finite() {
            return None;
        }

        let inv_det = 1.0 / det;
        Some(Transform::new(
            self.d * inv_det,
            -self.b * inv_det,
            -self.c * inv_det,
            self.a * inv_det,
            (self.c * self.f - self.d * self.e) * inv_det,
            (self.b * self.e - self.a * self.f) * inv_det,
        ))
    }

    /// Applies the transform to a point.
    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Applies only the linear part, ignoring the translation.
    #[inline]
    pub fn apply_direction(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Returns the translation part.
    #[inline]
    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.e, self.f)
    }

    /// Decomposes into translation, rotation, scaling and skew.
    pub fn decompose(&self) -> Decomposed {
        let det = self.determinant();
        let sx = (self.a * self.a + self.b * self.b).sqrt();
        let rotation = self.b.atan2(self.a);
        let (sy, skew_x) = if sx != 0.0 {
            (det / sx, (self.a * self.c + self.b * self.d) / det)
        } else {
            ((self.c * self.c + self.d * self.d).sqrt(), 0.0)
        };

        Decomposed {
            translation: self.translation(),
            rotation,
            scaling: Vec2::new(sx, sy),
            skew: Vec2::new(skew_x.atan(), 0.0),
        }
    }
}

impl Default for Transform {
    #[inline]
    fn default() -> Transform {
        Transform::identity()
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }
}

impl FuzzyEq for Transform {
    fn fuzzy_eq(&self, other: &Self) -> bool {
        self.a.fuzzy_eq(&other.a)
            && self.b.fuzzy_eq(&other.b)
            && self.c.fuzzy_eq(&other.c)
            && self.d.fuzzy_eq(&other.d)
            && self.e.fuzzy_eq(&other.e)
            && self.f.fuzzy_eq(&other.f)
    }
}

/// The affine components of a [`Transform`].
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug)]
pub struct Decomposed {
    pub translation: Vec2,
    pub rotation: f32,
    pub scaling: Vec2,
    pub skew: Vec2,
}

/// An axis-aligned rectangle described by its extreme points.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Creates a rectangle from two corner points, normalizing the order.
    #[inline]
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Rect {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a rectangle from position and size.
    #[inline]
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect::new(Vec2::new(x, y), Vec2::new(x + w, y + h))
    }

    /// The "no bounds" sentinel: all components are +∞.
    ///
    /// Distinguishes "the item has no bounds" from "the bounds were
    /// not computed yet" in the per-item caches.
    #[inline]
    pub fn no_bounds() -> Self {
        Rect {
            min: Vec2::new(f32::INFINITY, f32::INFINITY),
            max: Vec2::new(f32::INFINITY, f32::INFINITY),
        }
    }

    /// Returns `true` for the [`Rect::no_bounds`] sentinel.
    #[inline]
    pub fn is_no_bounds(&self) -> bool {
        self.min.x == f32::INFINITY
    }

    /// Rectangle width.
    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Rectangle height.
    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns `true` if the point lies inside or on the boundary.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Returns `true` if both rectangles share any area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// The smallest rectangle containing `self` and the point.
    #[inline]
    pub fn merged_point(&self, p: Vec2) -> Rect {
        Rect {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// The smallest rectangle containing both rectangles.
    #[inline]
    pub fn merged(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grows the rectangle by `padding` on every side.
    #[inline]
    pub fn expanded(&self, padding: Vec2) -> Rect {
        Rect {
            min: self.min - padding,
            max: self.max + padding,
        }
    }
}

impl FuzzyEq for Rect {
    #[inline]
    fn fuzzy_eq(&self, other: &Self) -> bool {
        self.min.fuzzy_eq(&other.min) && self.max.fuzzy_eq(&other.max)
    }
}

impl std::fmt::Debug for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rect({} {} {} {})",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

/// An infinite line described by a point and a direction.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug)]
pub(crate) struct Line {
    pub origin: Vec2,
    pub direction: Vec2,
}

impl Line {
    #[inline]
    pub fn new(origin: Vec2, direction: Vec2) -> Self {
        Line { origin, direction }
    }

    #[inline]
    pub fn through(a: Vec2, b: Vec2) -> Self {
        Line::new(a, b - a)
    }

    /// Intersection point of two infinite lines, if they are not parallel.
    pub fn intersect(&self, other: &Line) -> Option<Vec2> {
        let denom = self.direction.cross(other.direction);
        if denom.abs() <= crate::TRIG_EPSILON {
            return None;
        }

        let t = (other.origin - self.origin).cross(other.direction) / denom;
        Some(self.origin + self.direction * t)
    }

    /// Which side of the directed segment `origin -> origin + direction`
    /// the point lies on: -1, 0 or 1.
    pub fn side(&self, p: Vec2) -> i32 {
        let v = (p - self.origin).cross(self.direction);
        if v.abs() <= crate::TRIG_EPSILON {
            0
        } else if v > 0.0 {
            1
        } else {
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_roundtrip() {
        let ts = Transform::around(
            Vec2::new(50.0, 50.0),
            Transform::from_rotation(std::f32::consts::FRAC_PI_4),
        );
        // The pivot stays put.
        assert!(ts.apply(Vec2::new(50.0, 50.0)).is_close(Vec2::new(50.0, 50.0), 1e-4));

        let inv = ts.inverse().unwrap();
        let p = Vec2::new(12.0, -3.0);
        assert!(inv.apply(ts.apply(p)).is_close(p, 1e-4));
    }

    #[test]
    fn transform_decompose() {
        let ts = Transform::from_rotation(0.5) * Transform::from_scale(2.0, 3.0);
        let dec = ts.decompose();
        assert!((dec.rotation - 0.5).abs() < 1e-5);
        assert!(dec.scaling.is_close(Vec2::new(2.0, 3.0), 1e-4));
    }

    #[test]
    fn rect_merge() {
        let r = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0));
        let r = r.merged_point(Vec2::new(-2.0, 7.0));
        assert_eq!(r.min, Vec2::new(-2.0, 0.0));
        assert_eq!(r.max, Vec2::new(10.0, 7.0));
        assert!(r.overlaps(&Rect::from_xywh(9.0, 6.0, 10.0, 10.0)));
        assert!(!r.overlaps(&Rect::from_xywh(11.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn line_side() {
        let line = Line::through(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert_eq!(line.side(Vec2::new(5.0, 1.0)), -1);
        assert_eq!(line.side(Vec2::new(5.0, -1.0)), 1);
        assert_eq!(line.side(Vec2::new(5.0, 0.0)), 0);
    }
}
