//! Dense vector arithmetic.

use crate::error::{PmcError, Result};
use crate::value::Value;

/// Add `summand` element-wise into `target`.
pub fn add_vectors<T: Value>(target: &mut [T], summand: &[T]) -> Result<()> {
    PmcError::check_len(target.len(), summand.len())?;
    for (value, add) in target.iter_mut().zip(summand) {
        let sum = value.clone() + add.clone();
        *value = sum;
    }
    Ok(())
}

/// Largest absolute element-wise difference between two vectors.
pub fn max_abs_difference<T: Value>(a: &[T], b: &[T]) -> Result<T> {
    PmcError::check_len(a.len(), b.len())?;
    let max = a.iter().zip(b).fold(T::zero(), |max, (x, y)| {
        let diff = x.clone() - y.clone();
        let diff = if diff < T::zero() { -diff } else { diff };
        if diff > max {
            diff
        } else {
            max
        }
    });
    Ok(max)
}

/// Whether two vectors agree within `precision` in every element.
pub fn equal_modulo_precision<T: Value>(a: &[T], b: &[T], precision: &T) -> bool {
    matches!(max_abs_difference(a, b), Ok(diff) if diff <= *precision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_vectors() {
        let mut a = vec![1.0, 2.0];
        add_vectors(&mut a, &[0.5, -2.0]).unwrap();
        assert_eq!(a, vec![1.5, 0.0]);
        assert!(add_vectors(&mut a, &[1.0]).is_err());
    }

    #[test]
    fn test_max_abs_difference() {
        assert_eq!(max_abs_difference(&[1.0, 0.0], &[0.5, 1.0]).unwrap(), 1.0);
        assert!(equal_modulo_precision(&[1.0], &[1.0 + 1e-9], &1e-6));
        assert!(!equal_modulo_precision(&[1.0], &[1.1], &1e-6));
        assert!(!equal_modulo_precision(&[1.0], &[], &1e-6));
    }
}
