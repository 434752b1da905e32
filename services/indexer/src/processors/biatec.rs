//! Biatec CLAMM processors.
//!
//! ARC-4 contract: methods are dispatched by 4-byte selectors and every
//! numeric global-state value is a 256-bit big-endian byte string, of
//! which only the low 64 bits are meaningful here. Values are stored at
//! a fixed 9-decimal scale and the raw reserves are fee-inclusive.

use super::{
    add_shape, build_liquidity, build_trade, pool_account, remove_shape, swap_shape,
    LiquidityProcessor, PoolRefresher, Reserves, SwapProcessor,
};
use crate::window::TxWindow;
use amm::{scale_down, CLAMM_SCALE};
use rust_decimal::Decimal;
use types::{
    AmmType, AppCallFields, DexProtocol, Liquidity, LiquidityDirection, Pool, Trade,
    NATIVE_ASSET_ID,
};

/// ARC-4 method selectors of the deployed pool contract.
pub const SWAP_SELECTOR: &[u8] = &[0x18, 0x01, 0xe9, 0xbb];
pub const ADD_LIQUIDITY_SELECTOR: &[u8] = &[0xab, 0xc5, 0x3c, 0x3f];
pub const REMOVE_LIQUIDITY_SELECTOR: &[u8] = &[0xd6, 0x0d, 0x18, 0x01];

const KEY_RESERVE_A: &[u8] = b"a";
const KEY_RESERVE_B: &[u8] = b"b";
const KEY_LIQUIDITY: &[u8] = b"L";
const KEY_PRICE_MIN: &[u8] = b"pMin";
const KEY_PRICE_MAX: &[u8] = b"pMax";
const KEY_FEE: &[u8] = b"fee";

fn read_reserves(app: &AppCallFields) -> Option<Reserves> {
    let delta = &app.global_state_delta;
    Some(Reserves {
        a: delta.get_uint256(KEY_RESERVE_A)?,
        b: delta.get_uint256(KEY_RESERVE_B)?,
        l: delta.get_uint256(KEY_LIQUIDITY)?,
        af: None,
        bf: None,
    })
}

pub struct BiatecSwap;

impl SwapProcessor for BiatecSwap {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::BiatecClamm
    }

    fn process(&self, win: &TxWindow<'_>) -> Option<Trade> {
        let app = win.current.app_call.as_ref()?;
        if app.selector() != Some(SWAP_SELECTOR) {
            return None;
        }
        let shape = swap_shape(win)?;
        let reserves = if shape.pending_stub {
            Reserves::pending()
        } else {
            read_reserves(app)?
        };
        Some(build_trade(win, &shape, reserves, DexProtocol::BiatecClamm))
    }
}

pub struct BiatecLiquidity;

impl LiquidityProcessor for BiatecLiquidity {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::BiatecClamm
    }

    fn process(&self, win: &TxWindow<'_>) -> Option<Liquidity> {
        let app = win.current.app_call.as_ref()?;
        match app.selector()? {
            s if s == ADD_LIQUIDITY_SELECTOR => {
                let shape = add_shape(win)?;
                let reserves = if shape.pending_stub {
                    Reserves::pending()
                } else {
                    read_reserves(app)?
                };
                Some(build_liquidity(
                    win,
                    shape.pool,
                    (shape.asset_id_a, shape.amount_a, shape.asset_id_b, shape.amount_b),
                    (shape.asset_id_lp, shape.amount_lp),
                    LiquidityDirection::Deposit,
                    reserves,
                    DexProtocol::BiatecClamm,
                ))
            }
            s if s == REMOVE_LIQUIDITY_SELECTOR => {
                let shape = remove_shape(win, false)?;
                let reserves = read_reserves(app)?;
                Some(build_liquidity(
                    win,
                    shape.pool,
                    (shape.asset_id_a, shape.amount_a, shape.asset_id_b, shape.amount_b),
                    (shape.asset_id_lp, shape.amount_lp),
                    LiquidityDirection::Withdraw,
                    reserves,
                    DexProtocol::BiatecClamm,
                ))
            }
            _ => None,
        }
    }
}

pub struct BiatecRefresher;

impl PoolRefresher for BiatecRefresher {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::BiatecClamm
    }

    fn refresh(&self, win: &TxWindow<'_>) -> Option<Pool> {
        let app = win.current.app_call.as_ref()?;
        let pool = pool_account(win)?;
        let reserves = read_reserves(app)?;
        let asset_id_a = app.foreign_assets.first().copied()?;
        let asset_id_b = app.foreign_assets.get(1).copied().unwrap_or(NATIVE_ASSET_ID);

        let delta = &app.global_state_delta;
        let p_min = delta
            .get_uint256(KEY_PRICE_MIN)
            .map(|raw| scale_down(raw, CLAMM_SCALE))?;
        let p_max = delta
            .get_uint256(KEY_PRICE_MAX)
            .map(|raw| scale_down(raw, CLAMM_SCALE))?;
        let lp_fee = delta
            .get_uint256(KEY_FEE)
            .map(|raw| scale_down(raw, CLAMM_SCALE))
            .unwrap_or(Decimal::ZERO);

        Some(Pool {
            pool_address: pool.to_string(),
            pool_app_id: app.app_id,
            protocol: DexProtocol::BiatecClamm,
            asset_id_a: Some(asset_id_a),
            asset_id_b: Some(asset_id_b),
            asset_id_lp: app.foreign_assets.get(2).copied(),
            a: Some(reserves.a),
            b: Some(reserves.b),
            stable_a: None,
            stable_b: None,
            amplifier: None,
            af: None,
            bf: None,
            l: Some(reserves.l),
            amm_type: AmmType::ConcentratedLiquidity,
            p_min: Some(p_min),
            p_max: Some(p_max),
            lp_fee,
            protocol_fee_portion: Decimal::ZERO,
            asset_a_decimals: Some(CLAMM_SCALE),
            asset_b_decimals: Some(CLAMM_SCALE),
            approval_program_hash: None,
            timestamp: win.block.timestamp,
            tvl_a_usd: None,
            tvl_b_usd: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use rust_decimal_macros::dec;
    use types::TxState;

    #[test]
    fn swap_decodes_uint256_reserves() {
        let transfer = pay("CAROL", "CLAMMPOOL", 1_000_000_000);
        let call = appcall("CAROL", 11, SWAP_SELECTOR)
            .inner(axfer("CLAMMPOOL", "CAROL", 31, 500_000_000))
            .global_u256(&[
                (b"a", 3_000_000_000),
                (b"b", 4_000_000_000),
                (b"L", 21_780_889_000),
            ])
            .build();
        let block = block_at(1_700_000_000);
        let win = window(&call, Some(&transfer), None, &block, TxState::Confirmed);

        let trade = BiatecSwap.process(&win).unwrap();
        assert_eq!(trade.protocol, DexProtocol::BiatecClamm);
        assert_eq!(trade.a, 3_000_000_000);
        assert_eq!(trade.b, 4_000_000_000);
        assert_eq!(trade.l, 21_780_889_000);
    }

    #[test]
    fn base64_encoded_state_values_decode_too() {
        let transfer = pay("CAROL", "CLAMMPOOL", 1);
        let call = appcall("CAROL", 11, SWAP_SELECTOR)
            .inner(pay("CLAMMPOOL", "CAROL", 1))
            .global_u256_b64(&[(b"a", 7), (b"b", 8), (b"L", 9)])
            .build();
        let block = block_at(1_700_000_000);
        let win = window(&call, Some(&transfer), None, &block, TxState::Confirmed);

        let trade = BiatecSwap.process(&win).unwrap();
        assert_eq!((trade.a, trade.b, trade.l), (7, 8, 9));
    }

    #[test]
    fn wrong_selector_is_ignored() {
        let transfer = pay("CAROL", "CLAMMPOOL", 1);
        let call = appcall("CAROL", 11, &[0xde, 0xad, 0xbe, 0xef])
            .inner(pay("CLAMMPOOL", "CAROL", 1))
            .global_u256(&[(b"a", 1), (b"b", 2), (b"L", 3)])
            .build();
        let block = block_at(1_700_000_000);
        let win = window(&call, Some(&transfer), None, &block, TxState::Confirmed);
        assert!(BiatecSwap.process(&win).is_none());
    }

    #[test]
    fn refresher_scales_price_bounds_to_decimal() {
        let transfer = pay("CAROL", "CLAMMPOOL", 1);
        let call = appcall("CAROL", 11, SWAP_SELECTOR)
            .foreign(&[31])
            .global_u256(&[
                (b"a", 3_000_000_000),
                (b"b", 4_000_000_000),
                (b"L", 1),
                (b"pMin", 1_000_000_000),
                (b"pMax", 2_000_000_000),
            ])
            .build();
        let block = block_at(1_700_000_000);
        let win = window(&call, Some(&transfer), None, &block, TxState::Confirmed);

        let pool = BiatecRefresher.refresh(&win).unwrap();
        assert_eq!(pool.p_min, Some(dec!(1)));
        assert_eq!(pool.p_max, Some(dec!(2)));
        assert_eq!(pool.amm_type, AmmType::ConcentratedLiquidity);
        assert_eq!(pool.asset_a_decimals, Some(9));
    }
}
