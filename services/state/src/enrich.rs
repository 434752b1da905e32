//! USD enrichment of emitted records.
//!
//! Runs after the price oracle: fills the optional USD fields on Trade
//! and Liquidity records in place. Records whose assets have no resolved
//! price pass through untouched.

use rust_decimal::Decimal;
use std::collections::HashMap;
use types::{Liquidity, Pool, Trade};

fn decimals_for(pool: &Pool, asset_id: u64) -> u32 {
    if pool.asset_id_a == Some(asset_id) {
        pool.asset_a_decimals.unwrap_or(6)
    } else if pool.asset_id_b == Some(asset_id) {
        pool.asset_b_decimals.unwrap_or(6)
    } else {
        6
    }
}

fn scaled(amount: u64, decimals: u32) -> Decimal {
    amm::scale_down(amount, decimals)
}

fn side_usd(
    pool: &Pool,
    prices: &HashMap<u64, Decimal>,
    asset_id: u64,
    amount: u64,
) -> Option<Decimal> {
    let units = scaled(amount, decimals_for(pool, asset_id));
    prices.get(&asset_id).map(|p| units * p)
}

/// Fill the USD fields on a trade.
///
/// `value_usd` averages both legs when both are priced (they differ only
/// by fee and slippage), otherwise uses whichever leg is priced.
/// `price_usd` is the USD price of one unit of the canonical base asset
/// (`min` of the two asset ids) implied by this execution, so the
/// mirrored trade reports the same number. Fee fields are derived from
/// the input leg and the pool's fee split.
pub fn enrich_trade(trade: &mut Trade, pool: &Pool, prices: &HashMap<u64, Decimal>) {
    let in_usd = side_usd(pool, prices, trade.asset_in_id, trade.amount_in);
    let out_usd = side_usd(pool, prices, trade.asset_out_id, trade.amount_out);

    trade.value_usd = match (in_usd, out_usd) {
        (Some(i), Some(o)) => Some((i + o) / Decimal::TWO),
        (Some(i), None) => Some(i),
        (None, Some(o)) => Some(o),
        (None, None) => None,
    };

    let base = trade.base_asset_id();
    let (base_amount, base_decimals, counter_usd) = if base == trade.asset_in_id {
        (trade.amount_in, decimals_for(pool, trade.asset_in_id), out_usd)
    } else {
        (trade.amount_out, decimals_for(pool, trade.asset_out_id), in_usd)
    };
    let base_units = scaled(base_amount, base_decimals);
    trade.price_usd = match counter_usd {
        Some(usd) if !base_units.is_zero() => Some(usd / base_units),
        _ => None,
    };

    if let Some(in_usd) = in_usd {
        let fees = in_usd * pool.lp_fee;
        let protocol = fees * pool.protocol_fee_portion;
        trade.fees_usd = Some(fees);
        trade.fees_usd_protocol = Some(protocol);
        trade.fees_usd_provider = Some(fees - protocol);
    }
}

/// Fill the USD fields on a liquidity event.
///
/// Both sides move, so `value_usd` is the sum of the priced legs.
/// `price_usd` reports the oracle price of the canonical base asset.
pub fn enrich_liquidity(liq: &mut Liquidity, pool: &Pool, prices: &HashMap<u64, Decimal>) {
    let usd_a = side_usd(pool, prices, liq.asset_id_a, liq.amount_a);
    let usd_b = side_usd(pool, prices, liq.asset_id_b, liq.amount_b);

    liq.value_usd = match (usd_a, usd_b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    let base = liq.asset_id_a.min(liq.asset_id_b);
    liq.price_usd = prices.get(&base).copied();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::tests::simple_pool;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use types::{DexProtocol, LiquidityDirection, TxState};

    const USDC: u64 = 31_566_704;

    fn trade(asset_in: u64, amount_in: u64, asset_out: u64, amount_out: u64) -> Trade {
        Trade {
            asset_in_id: asset_in,
            asset_out_id: asset_out,
            amount_in,
            amount_out,
            pool_address: "P".into(),
            pool_app_id: 1,
            protocol: DexProtocol::Pact,
            tx_id: "TX".into(),
            top_tx_id: "TOP".into(),
            block_id: 1,
            timestamp: Utc::now(),
            trader: "TRADER".into(),
            state: TxState::Confirmed,
            a: 1,
            b: 2,
            l: 1,
            af: None,
            bf: None,
            value_usd: None,
            price_usd: None,
            fees_usd: None,
            fees_usd_provider: None,
            fees_usd_protocol: None,
        }
    }

    fn prices() -> HashMap<u64, Decimal> {
        HashMap::from([(USDC, dec!(1)), (555, dec!(2))])
    }

    #[test]
    fn trade_value_averages_both_legs() {
        // Sell 1.0 of asset 555 (worth 2 USD) for 1.9 USDC.
        let pool = simple_pool("P", 555, USDC, 1_000_000, 2_000_000);
        let mut t = trade(555, 1_000_000, USDC, 1_900_000);
        enrich_trade(&mut t, &pool, &prices());
        assert_eq!(t.value_usd, Some(dec!(1.95)));
    }

    #[test]
    fn price_usd_is_direction_invariant() {
        let pool = simple_pool("P", 555, USDC, 1_000_000, 2_000_000);
        let mut forward = trade(555, 1_000_000, USDC, 1_900_000);
        let mut backward = forward.mirrored();
        let prices = prices();
        enrich_trade(&mut forward, &pool, &prices);
        enrich_trade(&mut backward, &pool, &prices);
        // Base asset is 555; both directions price it off the USDC leg.
        assert_eq!(forward.price_usd, Some(dec!(1.9)));
        assert_eq!(forward.price_usd, backward.price_usd);
    }

    #[test]
    fn fee_split_follows_pool_config() {
        // lp_fee 0.003, protocol portion 0.2 (from the fixture pool).
        let pool = simple_pool("P", 555, USDC, 1_000_000, 2_000_000);
        let mut t = trade(USDC, 1_000_000, 555, 490_000);
        enrich_trade(&mut t, &pool, &prices());
        assert_eq!(t.fees_usd, Some(dec!(0.003)));
        assert_eq!(t.fees_usd_protocol, Some(dec!(0.0006)));
        assert_eq!(t.fees_usd_provider, Some(dec!(0.0024)));
    }

    #[test]
    fn unpriced_assets_leave_fields_unset() {
        let pool = simple_pool("P", 700, 701, 1_000_000, 2_000_000);
        let mut t = trade(700, 1_000_000, 701, 1_000_000);
        enrich_trade(&mut t, &pool, &prices());
        assert_eq!(t.value_usd, None);
        assert_eq!(t.price_usd, None);
        assert_eq!(t.fees_usd, None);
    }

    #[test]
    fn liquidity_value_sums_both_sides() {
        let pool = simple_pool("P", 555, USDC, 1_000_000, 2_000_000);
        let mut liq = Liquidity {
            asset_id_a: 555,
            asset_id_b: USDC,
            asset_id_lp: 77_000,
            amount_a: 1_000_000,
            amount_b: 2_000_000,
            amount_lp: 1_400_000,
            direction: LiquidityDirection::Deposit,
            pool_address: "P".into(),
            pool_app_id: 1,
            protocol: DexProtocol::Pact,
            tx_id: "TX".into(),
            top_tx_id: "TOP".into(),
            block_id: 1,
            timestamp: Utc::now(),
            trader: "TRADER".into(),
            state: TxState::Confirmed,
            a: 1,
            b: 2,
            l: 1,
            af: None,
            bf: None,
            value_usd: None,
            price_usd: None,
        };
        enrich_liquidity(&mut liq, &pool, &prices());
        // 1.0 * 2 USD + 2.0 * 1 USD.
        assert_eq!(liq.value_usd, Some(dec!(4)));
        assert_eq!(liq.price_usd, Some(dec!(2)));
    }
}
