//! Concentrated-liquidity pool math.
//!
//! The pool holds fixed-point reserves `A`, `B` (9-decimal internal
//! scale, fee-inclusive) and a price range `[p_min, p_max]`. Curve
//! liquidity `l` is the economically valid root of the range quadratic;
//! virtual reserves extend the real ones to where the curve would sit
//! with unbounded range.

use crate::{sqrt_via_f64, VirtualReserves};
use rust_decimal::Decimal;

pub struct ClammMath;

impl ClammMath {
    /// Solve curve liquidity for decimal-scaled reserves `a`, `b` within
    /// `[p_min, p_max]`.
    ///
    /// With `p = sqrt(p_min)`, `r = sqrt(p_max)`:
    /// `q = p/r − 1`, `eb = a·p + b/r`, `d = eb² − 4·a·b·q`, and
    /// `l = (−eb − sqrt(d)) / 2q`. The other root is negative and
    /// discarded. `None` when the range is degenerate or the solve has
    /// no usable root.
    pub fn liquidity(a: Decimal, b: Decimal, p_min: Decimal, p_max: Decimal) -> Option<Decimal> {
        if p_min == p_max || p_max <= Decimal::ZERO {
            return None;
        }
        let p = sqrt_via_f64(p_min)?;
        let r = sqrt_via_f64(p_max)?;
        if r.is_zero() {
            return None;
        }
        let q = p / r - Decimal::ONE;
        if q.is_zero() {
            return None;
        }
        let eb = a * p + b / r;
        let d = eb * eb - Decimal::from(4) * a * b * q;
        let sd = sqrt_via_f64(d)?;
        let l = (-eb - sd) / (Decimal::TWO * q);
        (l >= Decimal::ZERO).then_some(l)
    }

    /// Virtual reserves for the range curve. A degenerate range
    /// (`p_min == p_max`) is a single-price pool whose virtual reserves
    /// equal the real ones.
    pub fn virtual_reserves(
        real_a: Decimal,
        real_b: Decimal,
        p_min: Decimal,
        p_max: Decimal,
    ) -> VirtualReserves {
        if p_min == p_max {
            return VirtualReserves {
                a: real_a,
                b: real_b,
                l: None,
            };
        }
        match (
            Self::liquidity(real_a, real_b, p_min, p_max),
            sqrt_via_f64(p_min),
            sqrt_via_f64(p_max),
        ) {
            (Some(l), Some(p), Some(r)) if !r.is_zero() => VirtualReserves {
                a: real_a + l / r,
                b: real_b + l * p,
                l: Some(l),
            },
            // Unsolvable range: price off the real reserves.
            _ => VirtualReserves {
                a: real_a,
                b: real_b,
                l: None,
            },
        }
    }
}
