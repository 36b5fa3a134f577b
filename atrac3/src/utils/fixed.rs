//! Fixed-point arithmetic for the decode pipeline.
//!
//! Two fractional widths are in use: [`Q16`] for gains, channel weights and
//! matrix coefficients, [`Q31`] for window, filter and transform
//! coefficients. Every multiply truncates the 64-bit product with an
//! arithmetic shift; nothing rounds. Alternate DSP kernels must reproduce
//! these semantics exactly.

/// Signed fixed point with 16 fractional bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Q16(pub i32);

impl Q16 {
    pub const ONE: Q16 = Q16(1 << 16);

    /// Truncating fixed-point multiply.
    #[inline]
    pub const fn mul(self, rhs: Q16) -> Q16 {
        Q16(((self.0 as i64 * rhs.0 as i64) >> 16) as i32)
    }

    /// Scales a sample word by this factor, truncating.
    #[inline]
    pub const fn scale(self, sample: i32) -> i32 {
        ((sample as i64 * self.0 as i64) >> 16) as i32
    }

    /// Table-construction helper; not used on the decode path.
    pub fn from_f64(value: f64) -> Q16 {
        Q16((value * (1i64 << 16) as f64) as i32)
    }
}

/// Signed fixed point with 31 fractional bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Q31(pub i32);

impl Q31 {
    /// Truncating fixed-point multiply.
    #[inline]
    pub const fn mul(self, rhs: Q31) -> Q31 {
        Q31(((self.0 as i64 * rhs.0 as i64) >> 31) as i32)
    }

    /// Scales a sample word by this factor, truncating.
    #[inline]
    pub const fn scale(self, sample: i32) -> i32 {
        ((sample as i64 * self.0 as i64) >> 31) as i32
    }

    /// Table-construction helper; values at or above 1.0 saturate.
    pub fn from_f64(value: f64) -> Q31 {
        let scaled = value * (1i64 << 31) as f64;
        Q31(scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    }
}

/// Fixed-point square root of a non-negative Q16 value.
#[inline]
pub fn sqrt_q16(value: Q16) -> Q16 {
    debug_assert!(value.0 >= 0);
    Q16(((value.0 as u64) << 16).isqrt() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplies_truncate() {
        // 1.5 * 1.5 = 2.25
        let q = Q16(3 << 15);
        assert_eq!(q.mul(q), Q16(9 << 14));
        // -3 * 0.5 truncates toward negative infinity
        assert_eq!(Q16(-3).mul(Q16(1 << 15)), Q16(-2));
    }

    #[test]
    fn sqrt_of_two() {
        let root = sqrt_q16(Q16(2 << 16));
        // sqrt(2) = 1.41421..., 92681 in Q16
        assert_eq!(root.0, 92681);
        assert_eq!(sqrt_q16(Q16::ONE), Q16::ONE);
    }
}
