use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

//--------------------------------------        Usd          ---------------------------------------------------------
/// A US dollar amount as reported by attribution and store providers.
///
/// Provider exports are not consistent about decimal separators, so amounts are parsed with [`Usd::from_locale_str`],
/// which accepts `12,5` as well as `12.5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usd(f64);

op!(binary Usd, Add, add);
op!(inplace Usd, AddAssign, add_assign);

impl Sum for Usd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a USD amount: {0}")]
pub struct UsdConversionError(String);

impl From<f64> for Usd {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl FromStr for Usd {
    type Err = UsdConversionError;

    /// Strict parse. Comma decimal separators are accepted, but anything that is not a finite number is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(',', ".");
        match normalized.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Self(v)),
            Ok(_) => Err(UsdConversionError(format!("{s} is not a finite amount"))),
            Err(e) => Err(UsdConversionError(format!("{s}: {e}"))),
        }
    }
}

impl Display for Usd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:0.2}", self.0)
    }
}

impl Usd {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    /// Lenient parse used for provider exports. Unparseable (or non-finite) values become zero.
    pub fn from_locale_str(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// `self / denominator`, or zero when the denominator is absent or not positive.
    pub fn ratio(&self, denominator: Option<f64>) -> f64 {
        match denominator {
            Some(d) if d > 0.0 => self.0 / d,
            _ => 0.0,
        }
    }
}
