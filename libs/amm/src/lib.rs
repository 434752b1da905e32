//! # AMM Invariant Math
//!
//! Pure functions computing curve-implied ("virtual") reserves, implied
//! prices, and fee splits for the three AMM models the engine tracks:
//! constant product, concentrated liquidity, and stableswap. No I/O, no
//! state.
//!
//! All arithmetic runs on `rust_decimal::Decimal` for exact results,
//! with two deliberate exceptions: square roots route through
//! `f64::sqrt` (matching the deployed pool contracts' stored values; a
//! higher-precision decimal sqrt would diverge from historical data),
//! and the stableswap solver runs on `num_bigint::BigUint` because its
//! intermediate products (`D³`, `Ann·S`) overflow 128 bits at realistic
//! reserve magnitudes.
//!
//! Numeric edge cases (zero divisors, non-convergence, missing
//! amplifier) degrade to documented fallbacks and never panic across
//! this boundary.

pub mod concentrated;
pub mod constant_product;
pub mod stableswap;

pub use concentrated::ClammMath;
pub use constant_product::ConstantProductMath;
pub use stableswap::StableSwapMath;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use types::{AmmType, Pool};

/// Internal fixed-point scale used by the concentrated-liquidity
/// contracts: reserves are stored with 9 decimals regardless of the
/// underlying asset's own decimal count.
pub const CLAMM_SCALE: u32 = 9;

/// Curve-implied reserves for one pool, in human units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualReserves {
    pub a: Decimal,
    pub b: Decimal,
    /// Curve liquidity, where the curve defines one.
    pub l: Option<Decimal>,
}

/// Decimal-adjust a raw base-unit amount. The scale saturates at
/// `Decimal`'s maximum of 28, so a pool record carrying garbage
/// decimals cannot panic the math.
pub fn scale_down(raw: u64, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, decimals.min(28))
}

/// `sqrt` through double precision, converted back to decimal. Matches
/// the rounding behind the deployed pool contracts' stored values.
/// `None` for negative input or conversion failure.
pub fn sqrt_via_f64(value: Decimal) -> Option<Decimal> {
    let v = value.to_f64()?;
    if v < 0.0 {
        return None;
    }
    Decimal::from_f64(v.sqrt())
}

/// Decimal-scaled raw reserves plus fee accumulators, per side.
///
/// The Biatec CLAMM contract stores fee-inclusive reserves at a fixed
/// 9-decimal scale; the other protocols store reserves in asset base
/// units with separate fee accumulators.
pub fn real_amounts(pool: &Pool) -> Option<(Decimal, Decimal)> {
    let a = pool.a?;
    let b = pool.b?;
    if pool.amm_type == AmmType::ConcentratedLiquidity {
        return Some((scale_down(a, CLAMM_SCALE), scale_down(b, CLAMM_SCALE)));
    }
    let dec_a = pool.asset_a_decimals.unwrap_or(6);
    let dec_b = pool.asset_b_decimals.unwrap_or(6);
    let real_a = scale_down(a, dec_a) + scale_down(pool.af.unwrap_or(0), dec_a);
    let real_b = scale_down(b, dec_b) + scale_down(pool.bf.unwrap_or(0), dec_b);
    Some((real_a, real_b))
}

/// Curve-implied reserves for the pool, dispatched on its AMM type.
///
/// Returns `None` only when the pool lacks raw reserves entirely; every
/// in-curve failure degrades to the curve's documented fallback instead.
pub fn virtual_reserves(pool: &Pool) -> Option<VirtualReserves> {
    let (real_a, real_b) = real_amounts(pool)?;
    match pool.amm_type {
        AmmType::OldAmm => Some(ConstantProductMath::virtual_reserves(real_a, real_b)),
        AmmType::ConcentratedLiquidity => Some(ClammMath::virtual_reserves(
            real_a,
            real_b,
            pool.p_min.unwrap_or(Decimal::ZERO),
            pool.p_max.unwrap_or(Decimal::ZERO),
        )),
        AmmType::StableSwap => Some(StableSwapMath::virtual_reserves(
            pool.stable_a.or(pool.a)?,
            pool.stable_b.or(pool.b)?,
            pool.amplifier,
            pool.asset_a_decimals.unwrap_or(6),
            pool.asset_b_decimals.unwrap_or(6),
            real_a,
            real_b,
        )),
    }
}
