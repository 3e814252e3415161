// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linguistic partitions of the fuzzy universes and fuzzification.

use crate::membership::{MembershipFunction, ShapeKind, Triangle};
use crate::FuzzyPidError;

/// Number of linguistic sets partitioning every fuzzy variable.
pub const SET_COUNT: usize = 7;

/// Most sets an overlapping triangular partition can activate at once.
pub const MAX_ACTIVE_SETS: usize = 3;

/// Breakpoints of the standard triangular partition of `[-3, 3]`.
const STANDARD_TRIANGLES: [[f64; 3]; SET_COUNT] = [
    [-3.0, -3.0, -2.0], // NB
    [-3.0, -2.0, -1.0], // NM
    [-2.0, -1.0, 0.0],  // NS
    [-1.0, 0.0, 1.0],   // ZO
    [0.0, 1.0, 2.0],    // PS
    [1.0, 2.0, 3.0],    // PM
    [2.0, 3.0, 3.0],    // PB
];

/// One linguistic set that fired during fuzzification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSet {
    pub index: usize,
    pub degree: f64,
}

/// Result of fuzzifying one crisp value.
///
/// Holds up to [`MAX_ACTIVE_SETS`] sets with a strictly positive degree, in
/// set order. Unused slots stay `None` and carry no weight in inference.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Activation {
    slots: [Option<ActiveSet>; MAX_ACTIVE_SETS],
}

impl Activation {
    pub fn iter(&self) -> impl Iterator<Item = &ActiveSet> + '_ {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    /// Degree of set `index`, 0 when the set did not fire.
    pub fn degree_of(&self, index: usize) -> f64 {
        self.iter()
            .find(|set| set.index == index)
            .map_or(0.0, |set| set.degree)
    }

    fn push(&mut self, set: ActiveSet) -> bool {
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(set);
                true
            }
            None => false,
        }
    }
}

/// The seven ordered fuzzy sets of one variable, all of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LinguisticPartition {
    kind: ShapeKind,
    sets: [MembershipFunction; SET_COUNT],
}

impl LinguisticPartition {
    /// Build a partition from a flat parameter sequence holding
    /// `SET_COUNT * kind.params_per_set()` values, set after set.
    pub fn from_flat(kind: ShapeKind, params: &[f64]) -> Result<Self, FuzzyPidError> {
        let per_set = kind.params_per_set();
        let expected = SET_COUNT * per_set;
        if params.len() != expected {
            return Err(FuzzyPidError::ParameterCount {
                expected,
                actual: params.len(),
            });
        }

        let mut sets = Vec::with_capacity(SET_COUNT);
        for chunk in params.chunks_exact(per_set) {
            sets.push(MembershipFunction::from_params(kind, chunk)?);
        }
        let sets: [MembershipFunction; SET_COUNT] = sets
            .try_into()
            .map_err(|_| FuzzyPidError::InvalidParameter("partition must have seven sets"))?;

        Ok(LinguisticPartition { kind, sets })
    }

    /// Shorthand for a triangular partition (`a, b, c` per set).
    pub fn triangular(params: &[f64]) -> Result<Self, FuzzyPidError> {
        Self::from_flat(ShapeKind::Triangular, params)
    }

    /// Evenly spaced triangles over `[-3, 3]` with shoulders at both ends.
    pub fn standard() -> Self {
        LinguisticPartition {
            kind: ShapeKind::Triangular,
            sets: STANDARD_TRIANGLES.map(|[a, b, c]| {
                MembershipFunction::Triangular(Triangle::from_breakpoints(a, b, c))
            }),
        }
    }

    /// Flat parameters of [`LinguisticPartition::standard`].
    pub fn standard_params() -> Vec<f64> {
        STANDARD_TRIANGLES.concat()
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn sets(&self) -> &[MembershipFunction; SET_COUNT] {
        &self.sets
    }

    /// Degrees of `x` in every set.
    pub fn degrees(&self, x: f64) -> [f64; SET_COUNT] {
        let mut degrees = [0.0; SET_COUNT];
        for (degree, set) in degrees.iter_mut().zip(self.sets.iter()) {
            *degree = set.degree(x);
        }
        degrees
    }

    /// Collect the sets `x` belongs to with a non-zero degree.
    ///
    /// A partition that activates more than [`MAX_ACTIVE_SETS`] sets keeps
    /// the first ones in set order.
    pub fn fuzzify(&self, x: f64) -> Activation {
        let mut activation = Activation::default();
        for (index, degree) in self.degrees(x).into_iter().enumerate() {
            if degree > 0.0 && !activation.push(ActiveSet { index, degree }) {
                break;
            }
        }
        activation
    }
}

impl Default for LinguisticPartition {
    fn default() -> Self {
        Self::standard()
    }
}

/// Partitions of the five fuzzy variables.
///
/// Only `error` and `error_rate` take part in inference; the rule outputs
/// are read straight from the rule tables, so the three delta partitions are
/// kept for configuration parity but never evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partitions {
    pub error: LinguisticPartition,
    pub error_rate: LinguisticPartition,
    pub delta_kp: LinguisticPartition,
    pub delta_ki: LinguisticPartition,
    pub delta_kd: LinguisticPartition,
}

impl Partitions {
    /// Check that the inference inputs use the only shape inference evaluates.
    pub fn validate(&self) -> Result<(), FuzzyPidError> {
        for partition in [&self.error, &self.error_rate] {
            if partition.kind() != ShapeKind::Triangular {
                return Err(FuzzyPidError::UnsupportedShape(partition.kind()));
            }
        }
        Ok(())
    }

    /// Build all five partitions from shape identifiers and flat parameters,
    /// in the order error, error-rate, delta Kp, delta Ki, delta Kd.
    pub fn from_shapes(shapes: [(&str, &[f64]); 5]) -> Result<Self, FuzzyPidError> {
        let [error, error_rate, delta_kp, delta_ki, delta_kd] = shapes;
        let build = |(shape, params): (&str, &[f64])| -> Result<_, FuzzyPidError> {
            LinguisticPartition::from_flat(shape.parse()?, params)
        };

        let partitions = Partitions {
            error: build(error)?,
            error_rate: build(error_rate)?,
            delta_kp: build(delta_kp)?,
            delta_ki: build(delta_ki)?,
            delta_kd: build(delta_kd)?,
        };
        partitions.validate()?;
        Ok(partitions)
    }
}
