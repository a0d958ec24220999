use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of stored units per whole point. Amounts are kept to two decimal places.
pub const POINTS_SCALE: i64 = 100;

//--------------------------------------       Points        ---------------------------------------------------------
/// A loyalty point amount, stored as a whole number of hundredths of a point.
///
/// On the wire (JSON) points are plain decimal numbers, e.g. `500` or `729.98`. Internally they are integers so that
/// balances can be summed without floating point drift.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[sqlx(transparent)]
pub struct Points(i64);

// Saturating, so that no oracle-supplied amount can overflow a balance
op!(binary Points, Add, add, saturating_add);
op!(binary Points, Sub, sub, saturating_sub);
op!(inplace Points, AddAssign, add_assign, saturating_add);
op!(inplace Points, SubAssign, sub_assign, saturating_sub);
op!(unary Points, Neg, neg, saturating_neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in points: {0}")]
pub struct PointsConversionError(String);

impl Points {
    /// Creates an amount from its raw value in hundredths of a point.
    pub const fn from_hundredths(value: i64) -> Self {
        Self(value)
    }

    pub const fn from_points(points: i64) -> Self {
        Self(points.saturating_mul(POINTS_SCALE))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / POINTS_SCALE as f64
    }
}

impl TryFrom<f64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        let scaled = (value * POINTS_SCALE as f64).round();
        if scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(PointsConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(scaled as i64))
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = POINTS_SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}pts", abs / scale, abs % scale)
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::try_from(value).map_err(de::Error::custom)
    }
}
