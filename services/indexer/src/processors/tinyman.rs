//! Tinyman V1-style processors.
//!
//! Reserves live in the pool account's local state (keys `s1`, `s2`,
//! `ilt`), not global state. A missing local-state delta for the pool
//! account means the call is not this protocol's, never "zero
//! reserves".

use super::{
    add_shape, build_liquidity, build_trade, pool_account, remove_shape, swap_shape, AddShape,
    LiquidityProcessor, PoolRefresher, Reserves, SwapProcessor,
};
use crate::window::TxWindow;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::{
    AmmType, AppCallFields, DexProtocol, Liquidity, LiquidityDirection, Pool, Trade,
    NATIVE_ASSET_ID,
};

pub const SWAP_SELECTOR: &[u8] = b"swap";
pub const MINT_SELECTOR: &[u8] = b"mint";
pub const BURN_SELECTOR: &[u8] = b"burn";

const KEY_RESERVE_1: &[u8] = b"s1";
const KEY_RESERVE_2: &[u8] = b"s2";
const KEY_ISSUED_LIQUIDITY: &[u8] = b"ilt";

/// Total swap fee charged by the V1 contracts, all of it to providers.
const LP_FEE: Decimal = dec!(0.003);

fn read_reserves(app: &AppCallFields, pool: &str) -> Option<Reserves> {
    let delta = app.local_delta(pool)?;
    Some(Reserves {
        a: delta.get_uint(KEY_RESERVE_1)?,
        b: delta.get_uint(KEY_RESERVE_2)?,
        l: delta.get_uint(KEY_ISSUED_LIQUIDITY)?,
        af: None,
        bf: None,
    })
}

pub struct TinymanSwap;

impl SwapProcessor for TinymanSwap {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::TinymanV1
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
            read_reserves(app, shape.pool)?
        };
        Some(build_trade(win, &shape, reserves, DexProtocol::TinymanV1))
    }
}

pub struct TinymanLiquidity;

impl TinymanLiquidity {
    fn mint(&self, win: &TxWindow<'_>) -> Option<Liquidity> {
        let app = win.current.app_call.as_ref()?;
        let shape: AddShape<'_> = add_shape(win)?;
        let reserves = if shape.pending_stub {
            Reserves::pending()
        } else {
            read_reserves(app, shape.pool)?
        };
        Some(build_liquidity(
            win,
            shape.pool,
            (shape.asset_id_a, shape.amount_a, shape.asset_id_b, shape.amount_b),
            (shape.asset_id_lp, shape.amount_lp),
            LiquidityDirection::Deposit,
            reserves,
            DexProtocol::TinymanV1,
        ))
    }

    fn burn(&self, win: &TxWindow<'_>) -> Option<Liquidity> {
        let app = win.current.app_call.as_ref()?;
        let shape = remove_shape(win, false)?;
        let reserves = read_reserves(app, shape.pool)?;
        Some(build_liquidity(
            win,
            shape.pool,
            (shape.asset_id_a, shape.amount_a, shape.asset_id_b, shape.amount_b),
            (shape.asset_id_lp, shape.amount_lp),
            LiquidityDirection::Withdraw,
            reserves,
            DexProtocol::TinymanV1,
        ))
    }
}

impl LiquidityProcessor for TinymanLiquidity {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::TinymanV1
    }

    fn process(&self, win: &TxWindow<'_>) -> Option<Liquidity> {
        match win.current.app_call.as_ref()?.selector()? {
            s if s == MINT_SELECTOR => self.mint(win),
            s if s == BURN_SELECTOR => self.burn(win),
            _ => None,
        }
    }
}

pub struct TinymanRefresher;

impl PoolRefresher for TinymanRefresher {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::TinymanV1
    }

    fn refresh(&self, win: &TxWindow<'_>) -> Option<Pool> {
        let app = win.current.app_call.as_ref()?;
        let pool = pool_account(win)?;
        let reserves = read_reserves(app, pool)?;
        let asset_id_a = app.foreign_assets.first().copied()?;
        let asset_id_b = app.foreign_assets.get(1).copied().unwrap_or(NATIVE_ASSET_ID);
        Some(Pool {
            pool_address: pool.to_string(),
            pool_app_id: app.app_id,
            protocol: DexProtocol::TinymanV1,
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
            amm_type: AmmType::OldAmm,
            p_min: None,
            p_max: None,
            lp_fee: LP_FEE,
            protocol_fee_portion: Decimal::ZERO,
            asset_a_decimals: None,
            asset_b_decimals: None,
            approval_program_hash: None,
            timestamp: win.block.timestamp,
            tvl_a_usd: None,
            tvl_b_usd: None,
        })
    }
}
