// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rule evaluation and centre-of-gravity defuzzification.

use crate::partition::Activation;
use crate::rules::{RuleTable, RuleTables};

/// Adjustment for each of the three gains.
///
/// Depending on where it comes from this is either the normalized rule
/// output in `[-3, 3]` or a scaled gain delta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Adjustment {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Weighted centre of gravity of `table` over the cells activated by the
/// error and error-rate fuzzification.
///
/// Only the (at most 3 x 3) active cells are visited; inactive slots carry no
/// weight. When nothing fires the result is 0.
pub fn defuzzify(table: &RuleTable, error: &Activation, error_rate: &Activation) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for e in error.iter() {
        for de in error_rate.iter() {
            let weight = e.degree * de.degree;
            numerator += weight * table.value(e.index, de.index);
            denominator += weight;
        }
    }

    if denominator <= 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Run all three rule tables against the same fuzzified inputs.
pub fn infer(tables: &RuleTables, error: &Activation, error_rate: &Activation) -> Adjustment {
    Adjustment {
        kp: defuzzify(&tables.kp, error, error_rate),
        ki: defuzzify(&tables.ki, error, error_rate),
        kd: defuzzify(&tables.kd, error, error_rate),
    }
}
