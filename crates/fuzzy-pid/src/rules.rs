// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rule tables mapping (error set, error-rate set) pairs to gain adjustments.

use crate::partition::SET_COUNT;
use crate::FuzzyPidError;

/// Signed linguistic adjustment level, from "negative big" to "positive big".
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    NB,
    NM,
    NS,
    ZO,
    PS,
    PM,
    PB,
}

impl Level {
    /// Position of the level on the normalized universe `[-3, 3]`.
    pub const fn value(self) -> i32 {
        match self {
            Level::NB => -3,
            Level::NM => -2,
            Level::NS => -1,
            Level::ZO => 0,
            Level::PS => 1,
            Level::PM => 2,
            Level::PB => 3,
        }
    }
}

impl TryFrom<i32> for Level {
    type Error = FuzzyPidError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -3 => Ok(Level::NB),
            -2 => Ok(Level::NM),
            -1 => Ok(Level::NS),
            0 => Ok(Level::ZO),
            1 => Ok(Level::PS),
            2 => Ok(Level::PM),
            3 => Ok(Level::PB),
            other => Err(FuzzyPidError::InvalidRuleLevel(other)),
        }
    }
}

use Level::*;

const DEFAULT_KP: [[Level; SET_COUNT]; SET_COUNT] = [
    [PB, PB, PM, PM, PS, ZO, ZO],
    [PB, PB, PM, PS, PS, ZO, NS],
    [PM, PM, PM, PS, ZO, NS, NS],
    [PM, PM, PS, ZO, NS, NM, NM],
    [PS, PS, ZO, NS, NS, NM, NM],
    [PS, ZO, NS, NM, NM, NM, NB],
    [ZO, ZO, NM, NM, NM, NB, NB],
];

const DEFAULT_KI: [[Level; SET_COUNT]; SET_COUNT] = [
    [NB, NB, NM, NM, NS, ZO, ZO],
    [NB, NB, NM, NS, NS, ZO, ZO],
    [NB, NM, NS, NS, ZO, PS, PS],
    [NM, NM, NS, ZO, PS, PM, PM],
    [NM, NS, ZO, PS, PS, PM, PB],
    [ZO, ZO, PS, PS, PM, PB, PB],
    [ZO, ZO, PS, PM, PM, PB, PB],
];

const DEFAULT_KD: [[Level; SET_COUNT]; SET_COUNT] = [
    [PS, NS, NB, NB, NB, NM, PS],
    [PS, NS, NB, NM, NM, NS, ZO],
    [ZO, NS, NM, NM, NS, NS, ZO],
    [ZO, NS, NS, NS, NS, NS, ZO],
    [ZO, ZO, ZO, ZO, ZO, ZO, ZO],
    [PB, NS, PS, PS, PS, PS, PB],
    [PB, PM, PM, PM, PS, PS, PB],
];

/// Immutable grid of adjustment levels, indexed by error set (row) and
/// error-rate set (column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTable {
    cells: [[Level; SET_COUNT]; SET_COUNT],
}

impl RuleTable {
    pub const fn new(cells: [[Level; SET_COUNT]; SET_COUNT]) -> Self {
        RuleTable { cells }
    }

    /// Build a table from rows of signed integer levels in `-3..=3`.
    pub fn from_grid<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self, FuzzyPidError> {
        if rows.len() != SET_COUNT {
            return Err(FuzzyPidError::RuleTableShape {
                rows: rows.len(),
                cols: rows.first().map_or(0, |row| row.as_ref().len()),
            });
        }

        let mut cells = [[ZO; SET_COUNT]; SET_COUNT];
        for (cell_row, row) in cells.iter_mut().zip(rows) {
            let row = row.as_ref();
            if row.len() != SET_COUNT {
                return Err(FuzzyPidError::RuleTableShape {
                    rows: rows.len(),
                    cols: row.len(),
                });
            }
            for (cell, &value) in cell_row.iter_mut().zip(row) {
                *cell = Level::try_from(value)?;
            }
        }
        Ok(RuleTable { cells })
    }

    pub fn level(&self, error_set: usize, error_rate_set: usize) -> Level {
        self.cells[error_set][error_rate_set]
    }

    /// Numeric value of a cell on the normalized universe.
    pub fn value(&self, error_set: usize, error_rate_set: usize) -> f64 {
        f64::from(self.level(error_set, error_rate_set).value())
    }

    pub fn cells(&self) -> &[[Level; SET_COUNT]; SET_COUNT] {
        &self.cells
    }
}

/// One rule table per adapted gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTables {
    pub kp: RuleTable,
    pub ki: RuleTable,
    pub kd: RuleTable,
}

impl Default for RuleTables {
    /// Classic self-tuning tables: Kp is raised and Ki lowered while the
    /// error is large, Kd reacts to the direction of the error rate.
    fn default() -> Self {
        RuleTables {
            kp: RuleTable::new(DEFAULT_KP),
            ki: RuleTable::new(DEFAULT_KI),
            kd: RuleTable::new(DEFAULT_KD),
        }
    }
}
