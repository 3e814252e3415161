// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Membership functions mapping a crisp value to a degree in `[0, 1]`.

use std::fmt;
use std::str::FromStr;

use crate::FuzzyPidError;

/// Shape of the membership functions of one fuzzy variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Triangular,
    Gaussian,
    Trapezoidal,
}

impl ShapeKind {
    /// Number of parameters describing a single set of this shape.
    pub const fn params_per_set(self) -> usize {
        match self {
            ShapeKind::Triangular => 3,
            ShapeKind::Gaussian => 2,
            ShapeKind::Trapezoidal => 4,
        }
    }

    /// Conventional identifier (`trimf`, `gaussmf`, `trapmf`).
    pub const fn identifier(self) -> &'static str {
        match self {
            ShapeKind::Triangular => "trimf",
            ShapeKind::Gaussian => "gaussmf",
            ShapeKind::Trapezoidal => "trapmf",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ShapeKind {
    type Err = FuzzyPidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "trimf" => Ok(ShapeKind::Triangular),
            "gaussmf" => Ok(ShapeKind::Gaussian),
            "trapmf" => Ok(ShapeKind::Trapezoidal),
            other => Err(FuzzyPidError::InvalidShape(other.to_string())),
        }
    }
}

/// Triangle with feet at `a` and `c` and its peak at `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    a: f64,
    b: f64,
    c: f64,
}

impl Triangle {
    /// Create a triangle, requiring finite breakpoints with `a <= b <= c`
    /// and a non-zero total width.
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self, FuzzyPidError> {
        if !(a.is_finite() && b.is_finite() && c.is_finite()) {
            return Err(FuzzyPidError::InvalidParameter(
                "triangle breakpoints must be finite",
            ));
        }
        if a > b || b > c {
            return Err(FuzzyPidError::InvalidParameter(
                "triangle breakpoints must satisfy a <= b <= c",
            ));
        }
        if a == c {
            return Err(FuzzyPidError::InvalidParameter(
                "triangle must have a non-zero width",
            ));
        }
        Ok(Triangle { a, b, c })
    }

    /// Breakpoints known to be valid at compile time.
    pub(crate) const fn from_breakpoints(a: f64, b: f64, c: f64) -> Self {
        Triangle { a, b, c }
    }

    pub fn breakpoints(&self) -> (f64, f64, f64) {
        (self.a, self.b, self.c)
    }

    /// Degree of membership of `x`.
    ///
    /// A zero-width rising (`a == b`) or falling (`b == c`) segment is a
    /// shoulder: the degree at the peak is 1 instead of `0 / 0`.
    pub fn degree(&self, x: f64) -> f64 {
        let Triangle { a, b, c } = *self;
        if x >= a && x <= b {
            if b == a {
                1.0
            } else {
                (x - a) / (b - a)
            }
        } else if x > b && x <= c {
            // c > b here, so the falling segment has a non-zero width
            (c - x) / (c - b)
        } else {
            0.0
        }
    }
}

/// Gaussian bell `exp(-(x - center)^2 / (2 sigma^2))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    sigma: f64,
    center: f64,
}

impl Gaussian {
    /// Parameters follow the `gaussmf` order: width first, then center.
    pub fn new(sigma: f64, center: f64) -> Result<Self, FuzzyPidError> {
        if !(sigma.is_finite() && center.is_finite()) {
            return Err(FuzzyPidError::InvalidParameter(
                "gaussian parameters must be finite",
            ));
        }
        if sigma <= 0.0 {
            return Err(FuzzyPidError::InvalidParameter(
                "gaussian sigma must be positive",
            ));
        }
        Ok(Gaussian { sigma, center })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn degree(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return 0.0;
        }
        let d = x - self.center;
        (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

/// Trapezoid rising over `[a, b]`, flat over `[b, c]`, falling over `[c, d]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trapezoid {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl Trapezoid {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Result<Self, FuzzyPidError> {
        if ![a, b, c, d].iter().all(|p| p.is_finite()) {
            return Err(FuzzyPidError::InvalidParameter(
                "trapezoid breakpoints must be finite",
            ));
        }
        if a > b || b > c || c > d {
            return Err(FuzzyPidError::InvalidParameter(
                "trapezoid breakpoints must satisfy a <= b <= c <= d",
            ));
        }
        if a == d {
            return Err(FuzzyPidError::InvalidParameter(
                "trapezoid must have a non-zero width",
            ));
        }
        Ok(Trapezoid { a, b, c, d })
    }

    pub fn breakpoints(&self) -> (f64, f64, f64, f64) {
        (self.a, self.b, self.c, self.d)
    }

    pub fn degree(&self, x: f64) -> f64 {
        let Trapezoid { a, b, c, d } = *self;
        if x >= b && x <= c {
            1.0
        } else if x >= a && x < b {
            (x - a) / (b - a)
        } else if x > c && x <= d {
            (d - x) / (d - c)
        } else {
            0.0
        }
    }
}

/// A single fuzzy set's membership function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MembershipFunction {
    Triangular(Triangle),
    Gaussian(Gaussian),
    Trapezoidal(Trapezoid),
}

impl MembershipFunction {
    /// Build a function of the given shape from exactly
    /// [`ShapeKind::params_per_set`] parameters.
    pub fn from_params(kind: ShapeKind, params: &[f64]) -> Result<Self, FuzzyPidError> {
        if params.len() != kind.params_per_set() {
            return Err(FuzzyPidError::ParameterCount {
                expected: kind.params_per_set(),
                actual: params.len(),
            });
        }
        let function = match kind {
            ShapeKind::Triangular => {
                MembershipFunction::Triangular(Triangle::new(params[0], params[1], params[2])?)
            }
            ShapeKind::Gaussian => {
                MembershipFunction::Gaussian(Gaussian::new(params[0], params[1])?)
            }
            ShapeKind::Trapezoidal => MembershipFunction::Trapezoidal(Trapezoid::new(
                params[0], params[1], params[2], params[3],
            )?),
        };
        Ok(function)
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            MembershipFunction::Triangular(_) => ShapeKind::Triangular,
            MembershipFunction::Gaussian(_) => ShapeKind::Gaussian,
            MembershipFunction::Trapezoidal(_) => ShapeKind::Trapezoidal,
        }
    }

    /// Degree of membership of `x`, always within `[0, 1]`.
    pub fn degree(&self, x: f64) -> f64 {
        let degree = match self {
            MembershipFunction::Triangular(t) => t.degree(x),
            MembershipFunction::Gaussian(g) => g.degree(x),
            MembershipFunction::Trapezoidal(t) => t.degree(x),
        };
        if degree.is_nan() {
            0.0
        } else {
            degree.clamp(0.0, 1.0)
        }
    }
}
