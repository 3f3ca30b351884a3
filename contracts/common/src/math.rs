//! Fixed-Point Math
//!
//! 18-decimal fixed-point helpers used by both engines. Products are taken
//! in 256 bits so that `a * b / c` only fails when the final quotient does
//! not fit in `u128`.
//!
//! ## Key Features
//!
//! - **Truncating mul/div**: `mul_truncate` and `div_precisely` round down
//! - **Checked add/sub**: map failures onto `Overflow` / `Underflow`
//! - **Fractional powers**: `pow_scaled` approximates `x^(n / 2^k)` with
//!   repeated integer square roots

use uint::construct_uint;

use crate::constants::precision::FULL_SCALE;
use crate::errors::{MstableError, MstableResult};

construct_uint! {
    /// 256-bit unsigned integer for intermediate products
    pub struct U256(4);
}

// ============================================================================
// Conversions
// ============================================================================

fn to_u128(value: U256) -> MstableResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(MstableError::Overflow);
    }
    Ok(value.low_u128())
}

// ============================================================================
// Core Functions
// ============================================================================

/// Checked addition
pub fn safe_add(a: u128, b: u128) -> MstableResult<u128> {
    a.checked_add(b).ok_or(MstableError::Overflow)
}

/// Checked subtraction
pub fn safe_sub(a: u128, b: u128) -> MstableResult<u128> {
    a.checked_sub(b).ok_or(MstableError::Underflow)
}

/// Checked multiplication
pub fn safe_mul(a: u128, b: u128) -> MstableResult<u128> {
    a.checked_mul(b).ok_or(MstableError::Overflow)
}

/// `a * b / denominator`, rounded down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> MstableResult<u128> {
    if denominator == 0 {
        return Err(MstableError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MstableError::Overflow)?;
    to_u128(product / U256::from(denominator))
}

/// `x * y / 1e18`, rounded down
pub fn mul_truncate(x: u128, y: u128) -> MstableResult<u128> {
    mul_div(x, y, FULL_SCALE)
}

/// `x * 1e18 / y`, rounded down
pub fn div_precisely(x: u128, y: u128) -> MstableResult<u128> {
    mul_div(x, FULL_SCALE, y)
}

/// Fixed-point square root: `sqrt(x / 1e18) * 1e18`
pub fn sqrt_scaled(x: u128) -> MstableResult<u128> {
    let widened = U256::from(x)
        .checked_mul(U256::from(FULL_SCALE))
        .ok_or(MstableError::Overflow)?;
    to_u128(widened.integer_sqrt())
}

/// Fixed-point power with exponent `numerator / 2^root_depth`
///
/// The base is reduced by `root_depth` square roots and the result is then
/// raised to `numerator` by repeated truncating multiplication. Relative
/// error stays far below 0.01% for bases above one unit.
pub fn pow_scaled(x: u128, numerator: u32, root_depth: u32) -> MstableResult<u128> {
    let mut root = x;
    for _ in 0..root_depth {
        root = sqrt_scaled(root)?;
    }

    let mut result = FULL_SCALE;
    for _ in 0..numerator {
        result = mul_truncate(result, root)?;
    }
    Ok(result)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const UNIT: u128 = FULL_SCALE;

    #[test]
    fn test_mul_truncate_rounds_down() {
        assert_eq!(mul_truncate(3 * UNIT, UNIT / 2).unwrap(), 3 * UNIT / 2);
        assert_eq!(mul_truncate(1, UNIT / 2).unwrap(), 0);
        assert_eq!(mul_truncate(0, u128::MAX).unwrap(), 0);
    }

    #[test]
    fn test_div_precisely() {
        assert_eq!(div_precisely(UNIT, 4 * UNIT).unwrap(), UNIT / 4);
        assert_eq!(div_precisely(2, 3).unwrap(), 666_666_666_666_666_666);
        assert!(matches!(div_precisely(1, 0), Err(MstableError::DivisionByZero)));
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e30 overflows u128 but the quotient fits
        let big = 1_000_000_000_000_u128 * UNIT;
        assert_eq!(mul_div(big, big, big).unwrap(), big);
        assert!(matches!(mul_div(u128::MAX, 2, 1), Err(MstableError::Overflow)));
    }

    #[test]
    fn test_safe_ops() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert!(matches!(safe_add(u128::MAX, 1), Err(MstableError::Overflow)));
        assert!(matches!(safe_sub(1, 2), Err(MstableError::Underflow)));
        assert!(matches!(safe_mul(u128::MAX, 2), Err(MstableError::Overflow)));
    }

    #[test]
    fn test_sqrt_scaled() {
        assert_eq!(sqrt_scaled(4 * UNIT).unwrap(), 2 * UNIT);
        assert_eq!(sqrt_scaled(UNIT).unwrap(), UNIT);
        assert_eq!(sqrt_scaled(0).unwrap(), 0);
    }

    #[test]
    fn test_pow_scaled_exact_cases() {
        // 16^(3/4) = 8
        assert_eq!(pow_scaled(16 * UNIT, 3, 2).unwrap(), 8 * UNIT);
        // 256^(7/8) = 128
        assert_eq!(pow_scaled(256 * UNIT, 7, 3).unwrap(), 128 * UNIT);
        // x^0 = 1
        assert_eq!(pow_scaled(5 * UNIT, 0, 2).unwrap(), UNIT);
    }

    proptest! {
        #[test]
        fn pow_scaled_within_a_tenth_of_a_percent(
            units in 1u64..1_000_000_000u64,
            fraction in 0u64..1_000_000u64,
        ) {
            let x = units as u128 * UNIT + fraction as u128 * 1_000_000_000_000;
            let base = x as f64 / 1e18;
            for (numerator, depth) in [(3u32, 2u32), (7, 3)] {
                let exponent = numerator as f64 / (1u32 << depth) as f64;
                let expected = base.powf(exponent) * 1e18;
                let actual = pow_scaled(x, numerator, depth).unwrap() as f64;
                let relative = ((actual - expected) / expected).abs();
                prop_assert!(relative < 1e-3, "x={} exp={} rel={}", x, exponent, relative);
            }
        }
    }
}
