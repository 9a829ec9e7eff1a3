// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Polynomial root finding for the curve solvers.
//!
//! Quadratics use the numerically stable citardauq form, cubics a Newton
//! step followed by deflation. Internal math runs in f64 so that roots of
//! f32 geometry stay exact to the last ulp.

const EPSILON: f64 = 1e-12;
const MACHINE_EPSILON: f64 = 1.12e-16;

/// Up to three real roots.
#[derive(Clone, Copy, Debug, Default)]
pub struct Roots {
    values: [f32; 3],
    len: usize,
}

impl Roots {
    #[inline]
    pub(crate) fn push(&mut self, v: f32) {
        debug_assert!(self.len < 3);
        self.values[self.len] = v;
        self.len += 1;
    }

    /// The number of roots found.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no roots were found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The roots as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.len]
    }

    /// Iterates over the roots.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<f32> {
        self.as_slice().iter()
    }

    pub(crate) fn sort(&mut self) {
        self.values[..self.len].sort_by(|a, b| a.partial_cmp(b).unwrap());
    }
}

// Scales coefficients towards 1 when their magnitudes would otherwise
// wreck the discriminant.
fn normalization_factor(values: &[f64]) -> f64 {
    let mut norm: f64 = 0.0;
    for v in values {
        norm = norm.max(v.abs());
    }
    if norm != 0.0 && (norm < 1e-8 || norm > 1e8) {
        (2.0f64).powi(-(norm.log2().round() as i32))
    } else {
        0.0
    }
}

fn push_in_range(roots: &mut Roots, x: f64, min: f64, max: f64) {
    if x.is_finite() && x > min - EPSILON && x < max + EPSILON {
        let clamped = x.max(min).min(max) as f32;
        if !roots.as_slice().contains(&clamped) {
            roots.push(clamped);
        }
    }
}

fn solve_quadratic_f64(a: f64, b: f64, c: f64, min: f64, max: f64) -> Roots {
    let mut a = a;
    let mut b = b;
    let mut c = c;
    let mut x1 = f64::INFINITY;
    let mut x2 = f64::INFINITY;

    if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return Roots::default();
        }
        x1 = -c / b;
    } else {
        b *= -0.5;
        let mut d = b * b - a * c;
        if d != 0.0 && d.abs() < MACHINE_EPSILON {
            let f = normalization_factor(&[a.abs(), b.abs(), c.abs()]);
            if f != 0.0 {
                a *= f;
                b *= f;
                c *= f;
                d = b * b - a * c;
            }
        }

        if d >= -MACHINE_EPSILON {
            let q = if d < 0.0 { 0.0 } else { d.sqrt() };
            let r = b + if b < 0.0 { -q } else { q };
            if r == 0.0 {
                x1 = c / a;
                x2 = -x1;
            } else {
                x1 = r / a;
                x2 = c / r;
            }
        }
    }

    let mut roots = Roots::default();
    push_in_range(&mut roots, x1, min, max);
    if x2 != x1 {
        push_in_range(&mut roots, x2, min, max);
    }
    roots
}

/// Solves `a·t² + b·t + c = 0` for roots within `[min, max]`.
///
/// Roots slightly outside the range are clamped onto it.
pub fn solve_quadratic(a: f32, b: f32, c: f32, min: f32, max: f32) -> Roots {
    solve_quadratic_f64(a as f64, b as f64, c as f64, min as f64, max as f64)
}

/// Solves `a·t³ + b·t² + c·t + d = 0` for roots within `[min, max]`.
pub fn solve_cubic(a: f32, b: f32, c: f32, d: f32, min: f32, max: f32) -> Roots {
    let (mut a, mut b, mut c, mut d) = (a as f64, b as f64, c as f64, d as f64);
    let (min, max) = (min as f64, max as f64);

    let f = normalization_factor(&[a.abs(), b.abs(), c.abs(), d.abs()]);
    if f != 0.0 {
        a *= f;
        b *= f;
        c *= f;
        d *= f;
    }

    let mut x;
    let mut b1;
    let mut c2;

    // Horner evaluation that also yields the deflated quadratic
    // coefficients and the derivative.
    let evaluate = |x0: f64, a: f64, b: f64, c: f64, d: f64| -> (f64, f64, f64, f64) {
        let tmp = a * x0;
        let b1 = tmp + b;
        let c2 = b1 * x0 + c;
        let qd = (tmp + b1) * x0 + c2;
        let q = c2 * x0 + d;
        (b1, c2, qd, q)
    };

    if a.abs() < EPSILON {
        a = b;
        b1 = c;
        c2 = d;
        x = f64::INFINITY;
    } else if d.abs() < EPSILON {
        b1 = b;
        c2 = c;
        x = 0.0;
    } else {
        x = -(b / a) / 3.0;
        let (nb1, nc2, mut qd, mut q) = evaluate(x, a, b, c, d);
        b1 = nb1;
        c2 = nc2;

        let t = q / a;
        let r = t.abs().powf(1.0 / 3.0);
        let s = if t < 0.0 { -1.0 } else { 1.0 };
        let td = -qd / a;
        // See Kahan's notes on why 1.324718 is used.
        let rd = if td > 0.0 {
            1.324717957244746 * r.max(td.sqrt())
        } else {
            r
        };
        let mut x0 = x - s * rd;
        if x0 != x {
            loop {
                let (nb1, nc2, nqd, nq) = evaluate(x0, a, b, c, d);
                x = x0;
                b1 = nb1;
                c2 = nc2;
                qd = nqd;
                q = nq;
                // Newton step towards the single real root.
                x0 = if qd == 0.0 {
                    x
                } else {
                    x - q / qd / (1.0 + MACHINE_EPSILON)
                };
                if s * x0 <= s * x {
                    break;
                }
            }
            if a.abs() * x * x > (d / x).abs() {
                c2 = -d / x;
                b1 = (c2 - c) / x;
            }
        }
    }

    let mut roots = solve_quadratic_f64(a, b1, c2, min, max);
    if roots.len() < 3 {
        push_in_range(&mut roots, x, min, max);
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_simple() {
        // (t - 0.25)(t - 0.75) = t² - t + 0.1875
        let roots = solve_quadratic(1.0, -1.0, 0.1875, 0.0, 1.0);
        assert_eq!(roots.len(), 2);
        let mut r = roots;
        r.sort();
        assert!((r.as_slice()[0] - 0.25).abs() < 1e-6);
        assert!((r.as_slice()[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn quadratic_out_of_range() {
        let roots = solve_quadratic(1.0, -5.0, 6.0, 0.0, 1.0);
        assert_eq!(roots.len(), 0);
    }

    #[test]
    fn quadratic_degenerate_to_linear() {
        let roots = solve_quadratic(0.0, 2.0, -1.0, 0.0, 1.0);
        assert_eq!(roots.len(), 1);
        assert!((roots.as_slice()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cubic_three_roots() {
        // (t - 0.1)(t - 0.5)(t - 0.9) = t³ - 1.5t² + 0.59t - 0.045
        let roots = solve_cubic(1.0, -1.5, 0.59, -0.045, 0.0, 1.0);
        assert_eq!(roots.len(), 3);
        let mut r = roots;
        r.sort();
        assert!((r.as_slice()[0] - 0.1).abs() < 1e-5);
        assert!((r.as_slice()[1] - 0.5).abs() < 1e-5);
        assert!((r.as_slice()[2] - 0.9).abs() < 1e-5);
    }

    #[test]
    fn cubic_single_root() {
        // t³ - 0.125 = 0 -> t = 0.5
        let roots = solve_cubic(1.0, 0.0, 0.0, -0.125, 0.0, 1.0);
        assert_eq!(roots.len(), 1);
        assert!((roots.as_slice()[0] - 0.5).abs() < 1e-6);
    }
}
