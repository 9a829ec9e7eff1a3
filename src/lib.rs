// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`vellum` is a 2D vector graphics scene model and geometry kernel.

A [`Document`] owns a tree of drawable items: groups, paths and symbols.
Paths are sequences of cubic Bézier segments and support post-script
style construction, boolean and hit queries, length and bounds
computation, flattening, fitting and slicing. Scenes round-trip through
SVG and through a compact binary format.

## Example

```
use vellum::{vec2, Color, Document};

let mut doc = Document::new();
doc.set_size(200.0, 200.0);

let circle = doc.create_circle(vec2(100.0, 100.0), 50.0, "dot");
doc.set_fill(circle, Color::new(1.0, 0.0, 0.0, 1.0));

assert!(doc.contains(circle, vec2(100.0, 100.0)));
let svg = doc.to_svg_string(&vellum::svg::XmlOptions::default());
assert!(svg.contains("<circle"));
```
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::neg_cmp_op_on_partial_ord)]

pub mod binfmt;
pub mod svg;

mod bezier;
mod bezier_isect;
mod builder;
mod error;
mod fitter;
mod flatten;
mod geom;
mod isect;
mod paint;
mod path;
mod render;
mod shape;
mod solve;
mod stroke;
mod tree;
mod winding;

pub use crate::bezier::{Axis, CubicBezier};
pub use crate::error::Error;
pub use crate::geom::{vec2, Color, Decomposed, FuzzyEq, FuzzyZero, Rect, Transform, Vec2};
pub use crate::isect::Intersection;
pub use crate::paint::{ColorStop, Gradient, GradientType, Paint};
pub use crate::path::{CurveLocation, Path, Segment, Smoothing};
pub use crate::render::RenderBackend;
pub use crate::solve::{solve_cubic, solve_quadratic, Roots};
pub use crate::tree::{defaults, Document, ItemId};

/// The kind of a scene item.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ItemType {
    Document,
    Group,
    Path,
    Symbol,
}

/// How stroke ends are drawn.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum StrokeCap {
    Round,
    Square,
    Butt,
}

/// How stroke corners are drawn.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum StrokeJoin {
    Miter,
    Round,
    Bevel,
}

/// How the winding number decides "inside".
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum WindingRule {
    EvenOdd,
    NonZero,
}

/// The handle length approximating a quarter circle with a cubic Bézier,
/// as a fraction of the radius: `4(√2 − 1) / 3`.
pub const KAPPA: f32 = 0.552_284_75;

/// The tolerance curve subdivision converges to.
pub const TOLERANCE: f32 = 1e-4;

/// Curve-time values closer than this are the same parameter.
pub const CURVE_TIME_EPSILON: f32 = 4e-4;

/// Positions closer than this coincide.
pub const GEOMETRIC_EPSILON: f32 = 2e-4;

/// The half-width of the band around a winding ray in which a point
/// counts as lying on the curve.
pub const WINDING_EPSILON: f32 = 2e-4;

/// Tolerance for angle-based checks.
pub const TRIG_EPSILON: f32 = 1e-5;

/// Tolerance of the fat-line clipping convergence.
pub const CLIPPING_EPSILON: f32 = 1e-7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kappa_matches_its_definition() {
        let exact = 4.0 * ((2.0f64).sqrt() - 1.0) / 3.0;
        assert!((KAPPA as f64 - exact).abs() < 1e-7);
    }
}
