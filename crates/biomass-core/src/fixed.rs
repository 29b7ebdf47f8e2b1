use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Masses, seconds and yield units are all carried in this type so that a
/// run is reproducible tick for tick.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
///
/// Panics on NaN, infinities and values outside the Q32.32 range. Untrusted
/// input goes through [`checked_f64_to_fixed64`].
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert an f64 to Fixed64, or `None` if it is not finite or does not fit.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    if !v.is_finite() {
        return None;
    }
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// How far below an integer an amount may sit and still count as that
/// integer. Decimal rates such as 0.7 are not representable in Q32.32 and
/// round down by up to 2^-32 per multiplication.
pub const WHOLE_TOLERANCE: Fixed64 = Fixed64::from_bits(1 << 16);

/// Split a non-negative amount into its whole part (as an integer count) and
/// the fractional remainder. Negative inputs yield `(0, v)`.
///
/// An amount within [`WHOLE_TOLERANCE`] below the next integer rounds up to
/// it and leaves a zero remainder, so the remainder is never negative.
#[inline]
pub fn split_whole(v: Fixed64) -> (u32, Fixed64) {
    if v <= Fixed64::ZERO {
        return (0, v);
    }
    let whole = v.floor();
    let fraction = v - whole;
    if Fixed64::ONE - fraction <= WHOLE_TOLERANCE {
        let whole = whole.saturating_add(Fixed64::ONE);
        return (whole.saturating_to_num::<u32>(), Fixed64::ZERO);
    }
    (whole.saturating_to_num::<u32>(), fraction)
}
