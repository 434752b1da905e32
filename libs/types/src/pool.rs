//! Pool record: current AMM state for one deployed pool contract.

use crate::protocol::{DexProtocol, TxState};
use crate::{Liquidity, Trade};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pricing curve deployed by the pool contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmmType {
    /// Plain constant-product pool.
    OldAmm,
    /// Liquidity bounded to a price range `[p_min, p_max]`.
    ConcentratedLiquidity,
    /// Amplified curve for near-1:1 assets.
    StableSwap,
}

/// Unique pool identity: `pool_address + pool_app_id + protocol`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub address: String,
    pub app_id: u64,
    pub protocol: DexProtocol,
}

/// Current AMM state for one deployed pool contract.
///
/// Created on first sighting (trade, liquidity event, or on-chain
/// refresh) and mutated in place on every later confirmed event, gated
/// by the monotonic-timestamp rule in the state manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub pool_address: String,
    pub pool_app_id: u64,
    pub protocol: DexProtocol,
    pub asset_id_a: Option<u64>,
    pub asset_id_b: Option<u64>,
    pub asset_id_lp: Option<u64>,

    /// Raw on-chain reserves in base units.
    pub a: Option<u64>,
    pub b: Option<u64>,
    /// Stableswap-tracked balances, kept separately from the raw
    /// reserves because the amplified curve reads them pre-fee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_a: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_b: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplifier: Option<u64>,

    /// Protocol-fee accumulators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub af: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bf: Option<u64>,
    /// Curve liquidity units.
    pub l: Option<u64>,

    pub amm_type: AmmType,
    /// CLAMM price bounds; equal bounds mean a degenerate single-price
    /// pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_max: Option<Decimal>,

    /// LP fee as a fraction (e.g. 0.003).
    pub lp_fee: Decimal,
    /// Share of the LP fee diverted to the protocol.
    pub protocol_fee_portion: Decimal,

    pub asset_a_decimals: Option<u32>,
    pub asset_b_decimals: Option<u32>,

    /// Content hash of the deployed approval program, used to detect
    /// contract-code mismatches on refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_program_hash: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// USD TVL per side, back-filled after the oracle runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvl_a_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvl_b_usd: Option<Decimal>,
}

impl Pool {
    pub fn key(&self) -> PoolKey {
        PoolKey {
            address: self.pool_address.clone(),
            app_id: self.pool_app_id,
            protocol: self.protocol,
        }
    }

    /// Minimal pool seeded from a trade; reserve fields come from the
    /// trade's post-state, everything curve-specific stays unset until a
    /// refresh fills it.
    pub fn from_trade(trade: &Trade) -> Pool {
        Pool {
            pool_address: trade.pool_address.clone(),
            pool_app_id: trade.pool_app_id,
            protocol: trade.protocol,
            asset_id_a: Some(trade.asset_in_id.min(trade.asset_out_id)),
            asset_id_b: Some(trade.asset_in_id.max(trade.asset_out_id)),
            asset_id_lp: None,
            a: Some(trade.a),
            b: Some(trade.b),
            stable_a: None,
            stable_b: None,
            amplifier: None,
            af: trade.af,
            bf: trade.bf,
            l: Some(trade.l),
            amm_type: default_amm_type(trade.protocol),
            p_min: None,
            p_max: None,
            lp_fee: Decimal::ZERO,
            protocol_fee_portion: Decimal::ZERO,
            asset_a_decimals: None,
            asset_b_decimals: None,
            approval_program_hash: None,
            timestamp: trade.timestamp,
            tvl_a_usd: None,
            tvl_b_usd: None,
        }
    }

    /// Minimal pool seeded from a liquidity event.
    pub fn from_liquidity(liq: &Liquidity) -> Pool {
        Pool {
            pool_address: liq.pool_address.clone(),
            pool_app_id: liq.pool_app_id,
            protocol: liq.protocol,
            asset_id_a: Some(liq.asset_id_a),
            asset_id_b: Some(liq.asset_id_b),
            asset_id_lp: Some(liq.asset_id_lp),
            a: Some(liq.a),
            b: Some(liq.b),
            stable_a: None,
            stable_b: None,
            amplifier: None,
            af: liq.af,
            bf: liq.bf,
            l: Some(liq.l),
            amm_type: default_amm_type(liq.protocol),
            p_min: None,
            p_max: None,
            lp_fee: Decimal::ZERO,
            protocol_fee_portion: Decimal::ZERO,
            asset_a_decimals: None,
            asset_b_decimals: None,
            approval_program_hash: None,
            timestamp: liq.timestamp,
            tvl_a_usd: None,
            tvl_b_usd: None,
        }
    }

    /// Apply a confirmed trade's post-state. Caller enforces the
    /// monotonic-timestamp gate.
    pub fn apply_trade(&mut self, trade: &Trade) {
        self.a = Some(trade.a);
        self.b = Some(trade.b);
        self.l = Some(trade.l);
        if trade.af.is_some() {
            self.af = trade.af;
        }
        if trade.bf.is_some() {
            self.bf = trade.bf;
        }
        self.timestamp = trade.timestamp;
    }

    /// Apply a confirmed liquidity event's post-state.
    pub fn apply_liquidity(&mut self, liq: &Liquidity) {
        self.a = Some(liq.a);
        self.b = Some(liq.b);
        self.l = Some(liq.l);
        if liq.af.is_some() {
            self.af = liq.af;
        }
        if liq.bf.is_some() {
            self.bf = liq.bf;
        }
        if self.asset_id_lp.is_none() {
            self.asset_id_lp = Some(liq.asset_id_lp);
        }
        self.timestamp = liq.timestamp;
    }

    /// Mirror-image pool: every A/B-sided field swapped and the price
    /// bounds inverted as `(1/p_max, 1/p_min)`. Used for canonical-pair
    /// bookkeeping; applying it twice reproduces the original.
    pub fn reverse(&self) -> Pool {
        let invert = |p: Option<Decimal>| {
            p.and_then(|v| {
                if v.is_zero() {
                    None
                } else {
                    Some(Decimal::ONE / v)
                }
            })
        };
        Pool {
            pool_address: self.pool_address.clone(),
            pool_app_id: self.pool_app_id,
            protocol: self.protocol,
            asset_id_a: self.asset_id_b,
            asset_id_b: self.asset_id_a,
            asset_id_lp: self.asset_id_lp,
            a: self.b,
            b: self.a,
            stable_a: self.stable_b,
            stable_b: self.stable_a,
            amplifier: self.amplifier,
            af: self.bf,
            bf: self.af,
            l: self.l,
            amm_type: self.amm_type,
            p_min: invert(self.p_max),
            p_max: invert(self.p_min),
            lp_fee: self.lp_fee,
            protocol_fee_portion: self.protocol_fee_portion,
            asset_a_decimals: self.asset_b_decimals,
            asset_b_decimals: self.asset_a_decimals,
            approval_program_hash: self.approval_program_hash.clone(),
            timestamp: self.timestamp,
            tvl_a_usd: self.tvl_b_usd,
            tvl_b_usd: self.tvl_a_usd,
        }
    }
}

fn default_amm_type(protocol: DexProtocol) -> AmmType {
    match protocol {
        DexProtocol::TinymanV1 | DexProtocol::Pact => AmmType::OldAmm,
        DexProtocol::BiatecClamm => AmmType::ConcentratedLiquidity,
    }
}

/// Gate shared by all pool mutations: only confirmed events at or after
/// the pool's stored timestamp may update state.
pub fn update_allowed(pool_ts: DateTime<Utc>, event_ts: DateTime<Utc>, state: TxState) -> bool {
    state == TxState::Confirmed && event_ts >= pool_ts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::prelude::FromPrimitive;

    fn clamm_pool(p_min: Decimal, p_max: Decimal) -> Pool {
        Pool {
            pool_address: "POOL".into(),
            pool_app_id: 9,
            protocol: DexProtocol::BiatecClamm,
            asset_id_a: Some(0),
            asset_id_b: Some(31566704),
            asset_id_lp: Some(900),
            a: Some(3_000_000_000),
            b: Some(4_000_000_000),
            stable_a: None,
            stable_b: None,
            amplifier: None,
            af: None,
            bf: None,
            l: Some(1),
            amm_type: AmmType::ConcentratedLiquidity,
            p_min: Some(p_min),
            p_max: Some(p_max),
            lp_fee: Decimal::new(3, 3),
            protocol_fee_portion: Decimal::new(2, 1),
            asset_a_decimals: Some(9),
            asset_b_decimals: Some(9),
            approval_program_hash: Some("abcd".into()),
            timestamp: Utc::now(),
            tvl_a_usd: Some(Decimal::new(10, 0)),
            tvl_b_usd: Some(Decimal::new(20, 0)),
        }
    }

    #[test]
    fn reverse_inverts_bounds_and_swaps_sides() {
        let pool = clamm_pool(Decimal::ONE, Decimal::TWO);
        let rev = pool.reverse();
        assert_eq!(rev.p_min, Some(Decimal::ONE / Decimal::TWO));
        assert_eq!(rev.p_max, Some(Decimal::ONE));
        assert_eq!(rev.a, pool.b);
        assert_eq!(rev.asset_id_a, pool.asset_id_b);
        assert_eq!(rev.tvl_a_usd, pool.tvl_b_usd);
    }

    proptest! {
        #[test]
        fn reverse_is_an_involution(p_min_raw in 1u64..1_000_000, span in 0u64..1_000_000) {
            let p_min = Decimal::from_u64(p_min_raw).unwrap() / Decimal::from(1000);
            let p_max = Decimal::from_u64(p_min_raw + span).unwrap() / Decimal::from(1000);
            let pool = clamm_pool(p_min, p_max);
            let back = pool.reverse().reverse();
            // Bounds round-trip through 1/x twice; Decimal division is
            // exact enough for the magnitudes pools actually carry.
            prop_assert_eq!(back.a, pool.a);
            prop_assert_eq!(back.b, pool.b);
            prop_assert_eq!(back.asset_id_a, pool.asset_id_a);
            prop_assert_eq!(back.tvl_a_usd, pool.tvl_a_usd);
            prop_assert_eq!(back.af, pool.af);
        }
    }

    #[test]
    fn gate_drops_pending_and_stale() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(10);
        assert!(update_allowed(earlier, now, TxState::Confirmed));
        assert!(update_allowed(now, now, TxState::Confirmed));
        assert!(!update_allowed(now, earlier, TxState::Confirmed));
        assert!(!update_allowed(earlier, now, TxState::Pending));
    }
}
