//! Fixed-point arithmetic.
//!
//! Prices are `u128` values scaled by `10^decimals`. Inverting a price needs
//! `10^d * 10^d`, which overflows `u128` for large `d`, so products are
//! carried in a 256-bit intermediate and divided back down.

/// Largest `decimals` for which `10^decimals` fits in a `u128`.
pub const MAX_DECIMALS: u8 = 38;

/// `10^exp`, or `None` if it does not fit.
pub fn pow10(exp: u8) -> Option<u128> {
    10u128.checked_pow(exp as u32)
}

/// `a * b / c` rounded toward zero, computed without intermediate overflow.
///
/// Returns `None` if `c` is zero or the quotient does not fit in a `u128`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let product = U256::mul(a, b);
    if product.high() == 0 {
        return Some(product.low() / c);
    }
    product.div_u128(c)
}

/// Rescale `value` from `from` decimals to `to` decimals.
///
/// Widening multiplies and can overflow (`None`); narrowing truncates.
pub fn adjust_decimals(value: u128, from: u8, to: u8) -> Option<u128> {
    if to >= from {
        value.checked_mul(pow10(to - from)?)
    } else {
        match pow10(from - to) {
            Some(divisor) => Some(value / divisor),
            None => Some(0),
        }
    }
}

/// Unsigned 256-bit integer as four little-endian `u64` limbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct U256([u64; 4]);

impl U256 {
    /// Full product of two `u128` values.
    fn mul(a: u128, b: u128) -> Self {
        let a_lo = a as u64;
        let a_hi = (a >> 64) as u64;
        let b_lo = b as u64;
        let b_hi = (b >> 64) as u64;

        let p0 = (a_lo as u128) * (b_lo as u128);
        let p1 = (a_lo as u128) * (b_hi as u128);
        let p2 = (a_hi as u128) * (b_lo as u128);
        let p3 = (a_hi as u128) * (b_hi as u128);

        let p0_hi = p0 >> 64;

        // p1 + p2 + p0_hi can exceed u128; track the carry separately.
        let (mid, carry_a) = p1.overflowing_add(p2);
        let (mid, carry_b) = mid.overflowing_add(p0_hi);
        let carry = ((carry_a as u128) + (carry_b as u128)) << 64;

        let hi = p3 + (mid >> 64) + carry;

        U256([p0 as u64, mid as u64, hi as u64, (hi >> 64) as u64])
    }

    fn low(&self) -> u128 {
        (self.0[0] as u128) | ((self.0[1] as u128) << 64)
    }

    fn high(&self) -> u128 {
        (self.0[2] as u128) | ((self.0[3] as u128) << 64)
    }

    fn bit(&self, index: usize) -> u128 {
        ((self.0[index / 64] >> (index % 64)) & 1) as u128
    }

    /// Shift-subtract long division. `None` if the quotient exceeds `u128`.
    fn div_u128(&self, divisor: u128) -> Option<u128> {
        // The quotient fits in 128 bits iff the high half is below the divisor.
        if self.high() >= divisor {
            return None;
        }
        let mut rem: u128 = self.high();
        let mut quotient: u128 = 0;
        for index in (0..128).rev() {
            let carry = rem >> 127;
            rem = (rem << 1) | self.bit(index);
            quotient <<= 1;
            if carry == 1 || rem >= divisor {
                rem = rem.wrapping_sub(divisor);
                quotient |= 1;
            }
        }
        Some(quotient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pow10_limits() {
        assert_eq!(pow10(0), Some(1));
        assert_eq!(pow10(18), Some(1_000_000_000_000_000_000));
        assert!(pow10(MAX_DECIMALS).is_some());
        assert!(pow10(MAX_DECIMALS + 1).is_none());
    }

    #[test]
    fn test_mul_div_small() {
        assert_eq!(mul_div(6, 7, 3), Some(14));
        assert_eq!(mul_div(10, 10, 3), Some(33));
        assert_eq!(mul_div(5, 5, 0), None);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        let e18 = pow10(18).unwrap();
        let price = 2000 * e18;
        assert_eq!(mul_div(e18, e18, price), Some(500_000_000_000_000));

        let e38 = pow10(38).unwrap();
        assert_eq!(mul_div(e38, e38, e38), Some(e38));
        assert_eq!(mul_div(e38, e38, 3 * e38), Some(e38 / 3));
    }

    #[test]
    fn test_mul_div_quotient_overflow() {
        assert_eq!(mul_div(u128::MAX, u128::MAX, 1), None);
        assert_eq!(mul_div(u128::MAX, 2, 2), Some(u128::MAX));
    }

    #[test]
    fn test_mul_div_large_divisor() {
        // Divisor with its top bit set exercises the carry path.
        let d = u128::MAX - 1;
        assert_eq!(mul_div(u128::MAX, d, d), Some(u128::MAX));
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
    }

    #[test]
    fn test_adjust_decimals() {
        assert_eq!(adjust_decimals(2000_00000000, 8, 18), Some(2000 * pow10(18).unwrap()));
        assert_eq!(adjust_decimals(123_456, 6, 2), Some(12));
        assert_eq!(adjust_decimals(7, 4, 4), Some(7));
        assert_eq!(adjust_decimals(u128::MAX, 0, 1), None);
        assert_eq!(adjust_decimals(u128::MAX, 60, 0), Some(0));
    }

    proptest! {
        #[test]
        fn test_mul_div_matches_narrow_arithmetic(a in any::<u64>(), b in any::<u64>(), c in 1u64..) {
            let expected = (a as u128) * (b as u128) / (c as u128);
            prop_assert_eq!(mul_div(a as u128, b as u128, c as u128), Some(expected));
        }

        #[test]
        fn test_mul_div_identity(a in any::<u128>(), c in 1u128..) {
            prop_assert_eq!(mul_div(a, c, c), Some(a));
        }
    }
}
