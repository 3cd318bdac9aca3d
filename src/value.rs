//! Numeric value bound shared by the storage and solver modules.

use std::fmt::{Debug, Display};
use std::ops::Neg;

use num_traits::Num;

/// Scalar type stored in matrices and vectors.
///
/// Blanket-implemented for every type with field-like arithmetic, so both
/// `f64` and exact rationals such as `num_rational::Ratio<i64>` qualify.
pub trait Value:
    Num + Neg<Output = Self> + Clone + PartialOrd + Debug + Display + Send + Sync
{
}

impl<T> Value for T where
    T: Num + Neg<Output = T> + Clone + PartialOrd + Debug + Display + Send + Sync
{
}
