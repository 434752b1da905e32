//! Stableswap pool math.
//!
//! Reserves are tracked in arbitrary-precision integers because the
//! invariant's intermediate products (`D³`, `Ann·S`) overflow 128 bits
//! at realistic magnitudes. The invariant constant `D` comes from a
//! Newton fixed-point iteration (2-coin specialization); the marginal
//! price from perturbing side A and solving the counterparty balance.
//!
//! Any failure in the solve degrades to `min(real_a, real_b)` on both
//! sides, which forces the reported price to exactly 1:1 (the intended
//! behavior for near-balanced stable pairs with incomplete state).

use crate::{sqrt_via_f64, VirtualReserves};
use num_bigint::{BigInt, BigUint};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// 2-coin specialization: n^n with n = 2.
const NN: u64 = 4;
/// Amplifier fixed-point precision used by the on-chain contracts.
const A_PRECISION: u64 = 1000;
const MAX_ITERATIONS: usize = 64;

pub struct StableSwapMath;

impl StableSwapMath {
    /// Invariant constant `D` for balances `(a, b)` and amplifier `amp`
    /// (already scaled by `A_PRECISION`). `None` when the iteration
    /// cannot run or fails to converge.
    pub fn compute_d(amp: u64, a: u64, b: u64) -> Option<BigUint> {
        if a == 0 || b == 0 {
            return None;
        }
        let ann = BigUint::from(amp.checked_mul(NN)?);
        let a_prec = BigUint::from(A_PRECISION);
        if ann <= a_prec {
            return None;
        }
        let xa = BigUint::from(a);
        let xb = BigUint::from(b);
        let s = &xa + &xb;
        let four = BigUint::from(4u32);
        let prod = &four * &xa * &xb;

        let mut d = s.clone();
        for _ in 0..MAX_ITERATIONS {
            // D_P = D^3 / (4 * a * b)
            let d_p = &d * &d * &d / &prod;
            let numerator = &d * (&ann * &s / &a_prec + &d_p * 2u32);
            let denominator =
                (&ann - &a_prec) * &d / &a_prec + &d_p * 3u32;
            if denominator.bits() == 0 {
                return None;
            }
            let d_next = numerator / denominator;
            let diff = if d_next >= d { &d_next - &d } else { &d - &d_next };
            if diff <= BigUint::from(1u32) {
                return Some(d_next);
            }
            d = d_next;
        }
        None
    }

    /// Counterparty balance `Y` after side A moves to `x`, holding `D`.
    ///
    /// Uses the closed-form root of the stableswap quadratic:
    /// `b = S + D·aPrec/Ann`, `c = D³·aPrec/(4·x·Ann)`,
    /// `Y = (sqrt((D−b)² + 4c) ± (D−b)) / 2` with the sign chosen by
    /// `D ≥ b`.
    pub fn compute_y(amp: u64, d: &BigUint, x: u64) -> Option<BigUint> {
        if x == 0 {
            return None;
        }
        let ann = BigUint::from(amp.checked_mul(NN)?);
        if ann.bits() == 0 {
            return None;
        }
        let a_prec = BigUint::from(A_PRECISION);
        let xb = BigUint::from(x);

        let c = d * d * d * &a_prec / (BigUint::from(4u32) * &xb * &ann);
        let b = &xb + d * &a_prec / &ann;

        let d_i = BigInt::from(d.clone());
        let b_i = BigInt::from(b);
        let diff = &d_i - &b_i;
        let disc = &diff * &diff + BigInt::from(4u32) * BigInt::from(c);
        // diff's sign selects the root: positive adds to the sqrt,
        // negative pulls the root below D.
        let y = (disc.sqrt() + diff) / 2u32;
        y.to_biguint()
    }

    /// Marginal price of A in units of B (human scale), via a small
    /// perturbation of side A.
    pub fn implied_price(
        amp: u64,
        stable_a: u64,
        stable_b: u64,
        dec_a: u32,
        dec_b: u32,
    ) -> Option<Decimal> {
        let d = Self::compute_d(amp, stable_a, stable_b)?;
        let delta = (stable_a / 10_000).max(1);
        let y = Self::compute_y(amp, &d, stable_a.checked_add(delta)?)?;
        let y = y.to_u128()?;
        let sold = (stable_b as u128).checked_sub(y)?;
        let price_base = Decimal::from_u128(sold)? / Decimal::from(delta);
        if price_base <= Decimal::ZERO {
            return None;
        }
        // Rescale from base-unit ratio to human units.
        let scale_a = Decimal::from_i128_with_scale(1, dec_a.min(28));
        let scale_b = Decimal::from_i128_with_scale(1, dec_b.min(28));
        Some(price_base * scale_b / scale_a)
    }

    /// Virtual reserves for the amplified curve.
    ///
    /// Virtual liquidity is `D / 2` (scaled by asset A's decimals);
    /// the reserves split it across the marginal price so that
    /// `virtual_b / virtual_a == price`.
    pub fn virtual_reserves(
        stable_a: u64,
        stable_b: u64,
        amplifier: Option<u64>,
        dec_a: u32,
        dec_b: u32,
        real_a: Decimal,
        real_b: Decimal,
    ) -> VirtualReserves {
        let solved = amplifier.and_then(|amp| {
            let d = Self::compute_d(amp, stable_a, stable_b)?;
            let price = Self::implied_price(amp, stable_a, stable_b, dec_a, dec_b)?;
            let sqrt_price = sqrt_via_f64(price)?;
            if sqrt_price.is_zero() {
                return None;
            }
            let half_d = (d / 2u32).to_u128()?;
            let virtual_liquidity =
                Decimal::from_i128_with_scale(i128::try_from(half_d).ok()?, dec_a.min(28));
            Some(VirtualReserves {
                a: virtual_liquidity / sqrt_price,
                b: virtual_liquidity * sqrt_price,
                l: Some(virtual_liquidity),
            })
        });
        solved.unwrap_or_else(|| Self::fallback(real_a, real_b))
    }

    /// Degraded mode: both virtual reserves collapse to the smaller real
    /// side, forcing a 1:1 reported price.
    fn fallback(real_a: Decimal, real_b: Decimal) -> VirtualReserves {
        let m = real_a.min(real_b);
        VirtualReserves { a: m, b: m, l: Some(m) }
    }
}
