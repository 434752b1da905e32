//! Pact-style processors.
//!
//! Reserves live in the app's global state under `A`, `B`, `L` as plain
//! uints, alongside the protocol-fee accumulators. Withdrawals pay the
//! two sides back in reverse order relative to the Tinyman encoding.
//! Stableswap deployments additionally publish an amplifier.

use super::{
    add_shape, build_liquidity, build_trade, pool_account, remove_shape, swap_shape,
    LiquidityProcessor, PoolRefresher, Reserves, SwapProcessor,
};
use crate::window::TxWindow;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::{
    AmmType, AppCallFields, DexProtocol, Liquidity, LiquidityDirection, Pool, Trade,
    NATIVE_ASSET_ID,
};

pub const SWAP_SELECTOR: &[u8] = b"SWAP";
pub const ADD_LIQUIDITY_SELECTOR: &[u8] = b"ADDLIQ";
pub const REMOVE_LIQUIDITY_SELECTOR: &[u8] = b"REMLIQ";

const KEY_RESERVE_A: &[u8] = b"A";
const KEY_RESERVE_B: &[u8] = b"B";
const KEY_LIQUIDITY: &[u8] = b"L";
const KEY_FEE_A: &[u8] = b"FA";
const KEY_FEE_B: &[u8] = b"FB";
const KEY_FEE_BPS: &[u8] = b"FEE_BPS";
const KEY_AMPLIFIER: &[u8] = b"AMP";

const DEFAULT_LP_FEE: Decimal = dec!(0.003);

fn read_reserves(app: &AppCallFields) -> Option<Reserves> {
    let delta = &app.global_state_delta;
    Some(Reserves {
        a: delta.get_uint(KEY_RESERVE_A)?,
        b: delta.get_uint(KEY_RESERVE_B)?,
        l: delta.get_uint(KEY_LIQUIDITY)?,
        af: delta.get_uint(KEY_FEE_A),
        bf: delta.get_uint(KEY_FEE_B),
    })
}

pub struct PactSwap;

impl SwapProcessor for PactSwap {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::Pact
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
        Some(build_trade(win, &shape, reserves, DexProtocol::Pact))
    }
}

pub struct PactLiquidity;

impl LiquidityProcessor for PactLiquidity {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::Pact
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
                    DexProtocol::Pact,
                ))
            }
            s if s == REMOVE_LIQUIDITY_SELECTOR => {
                let shape = remove_shape(win, true)?;
                let reserves = read_reserves(app)?;
                Some(build_liquidity(
                    win,
                    shape.pool,
                    (shape.asset_id_a, shape.amount_a, shape.asset_id_b, shape.amount_b),
                    (shape.asset_id_lp, shape.amount_lp),
                    LiquidityDirection::Withdraw,
                    reserves,
                    DexProtocol::Pact,
                ))
            }
            _ => None,
        }
    }
}

pub struct PactRefresher;

impl PoolRefresher for PactRefresher {
    fn protocol(&self) -> DexProtocol {
        DexProtocol::Pact
    }

    fn refresh(&self, win: &TxWindow<'_>) -> Option<Pool> {
        let app = win.current.app_call.as_ref()?;
        let pool = pool_account(win)?;
        let reserves = read_reserves(app)?;
        let asset_id_a = app.foreign_assets.first().copied()?;
        let asset_id_b = app.foreign_assets.get(1).copied().unwrap_or(NATIVE_ASSET_ID);

        let delta = &app.global_state_delta;
        let amplifier = delta.get_uint(KEY_AMPLIFIER);
        let lp_fee = delta
            .get_uint(KEY_FEE_BPS)
            .map(|bps| Decimal::new(bps as i64, 4))
            .unwrap_or(DEFAULT_LP_FEE);
        let amm_type = if amplifier.is_some() {
            AmmType::StableSwap
        } else {
            AmmType::OldAmm
        };

        Some(Pool {
            pool_address: pool.to_string(),
            pool_app_id: app.app_id,
            protocol: DexProtocol::Pact,
            asset_id_a: Some(asset_id_a),
            asset_id_b: Some(asset_id_b),
            asset_id_lp: app.foreign_assets.get(2).copied(),
            a: Some(reserves.a),
            b: Some(reserves.b),
            stable_a: amplifier.map(|_| reserves.a),
            stable_b: amplifier.map(|_| reserves.b),
            amplifier,
            af: reserves.af,
            bf: reserves.bf,
            l: Some(reserves.l),
            amm_type,
            p_min: None,
            p_max: None,
            lp_fee,
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
