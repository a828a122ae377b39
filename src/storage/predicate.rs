// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

//! Predicates evaluated against reconstructed values.

use std::fmt;
use std::str::FromStr;

use super::{PrimitiveFixedWidthEncode, StorageError};

/// A predicate over one element.
pub trait Predicate<T> {
    fn eval(&self, value: &T) -> bool;
}

impl<T, F: Fn(&T) -> bool> Predicate<T> for F {
    fn eval(&self, value: &T) -> bool {
        self(value)
    }
}

/// Comparison operators accepted by theta selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThetaOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl FromStr for ThetaOp {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(ThetaOp::Lt),
            "<=" => Ok(ThetaOp::Le),
            ">" => Ok(ThetaOp::Gt),
            ">=" => Ok(ThetaOp::Ge),
            "==" | "=" => Ok(ThetaOp::Eq),
            "!=" | "<>" => Ok(ThetaOp::Ne),
            _ => Err(StorageError::InvalidOperator(s.into())),
        }
    }
}

impl fmt::Display for ThetaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ThetaOp::Lt => "<",
            ThetaOp::Le => "<=",
            ThetaOp::Gt => ">",
            ThetaOp::Ge => ">=",
            ThetaOp::Eq => "==",
            ThetaOp::Ne => "!=",
        };
        write!(f, "{op}")
    }
}

/// Range selection. A missing bound is unbounded; `anti` inverts the match.
/// Null values never match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangePredicate<T> {
    pub low: Option<T>,
    pub high: Option<T>,
    pub low_inclusive: bool,
    pub high_inclusive: bool,
    pub anti: bool,
}

impl<T: PrimitiveFixedWidthEncode> RangePredicate<T> {
    pub fn new(
        low: Option<T>,
        high: Option<T>,
        low_inclusive: bool,
        high_inclusive: bool,
        anti: bool,
    ) -> Self {
        Self {
            low,
            high,
            low_inclusive,
            high_inclusive,
            anti,
        }
    }

    /// `value <op> rhs`
    pub fn theta(op: ThetaOp, rhs: T) -> Self {
        match op {
            ThetaOp::Lt => Self::new(None, Some(rhs), false, false, false),
            ThetaOp::Le => Self::new(None, Some(rhs), false, true, false),
            ThetaOp::Gt => Self::new(Some(rhs), None, false, false, false),
            ThetaOp::Ge => Self::new(Some(rhs), None, true, false, false),
            ThetaOp::Eq => Self::new(Some(rhs), Some(rhs), true, true, false),
            ThetaOp::Ne => Self::new(Some(rhs), Some(rhs), true, true, true),
        }
    }

    pub fn matches(&self, value: &T) -> bool {
        if value.is_null() {
            return false;
        }
        if self.low.is_none() && self.high.is_none() {
            return !self.anti;
        }
        let above_low = match &self.low {
            Some(low) if self.low_inclusive => value >= low,
            Some(low) => value > low,
            None => true,
        };
        let below_high = match &self.high {
            Some(high) if self.high_inclusive => value <= high,
            Some(high) => value < high,
            None => true,
        };
        (above_low && below_high) != self.anti
    }
}

impl<T: PrimitiveFixedWidthEncode> Predicate<T> for RangePredicate<T> {
    fn eval(&self, value: &T) -> bool {
        self.matches(value)
    }
}
