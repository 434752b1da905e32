//! Pair-level pool aggregation.
//!
//! Reduces every pool trading an ordered asset pair into one
//! [`AggregatedPool`]. Aggregates are directional: each pool contributes
//! to `(A, B)` as-is and to `(B, A)` through its mirror image, so the
//! two documents stay consistent by construction.

use crate::oracle::TrustConfig;
use amm::{real_amounts, virtual_reserves};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::trace;
use types::{AggregatedPool, Pool};

fn fold(acc: &mut HashMap<(u64, u64), AggregatedPool>, pool: &Pool, cfg: &TrustConfig, now: DateTime<Utc>) {
    let (Some(asset_a), Some(asset_b)) = (pool.asset_id_a, pool.asset_id_b) else {
        return;
    };
    let Some(v) = virtual_reserves(pool) else {
        return;
    };
    let Some((real_a, real_b)) = real_amounts(pool) else {
        return;
    };

    let agg = acc
        .entry((asset_a, asset_b))
        .or_insert_with(|| AggregatedPool {
            asset_id_a: asset_a,
            asset_id_b: asset_b,
            virtual_a_level1: Decimal::ZERO,
            virtual_b_level1: Decimal::ZERO,
            virtual_a_level2: Decimal::ZERO,
            virtual_b_level2: Decimal::ZERO,
            real_a: Decimal::ZERO,
            real_b: Decimal::ZERO,
            tvl_a: Decimal::ZERO,
            tvl_b: Decimal::ZERO,
            pool_count: 0,
            last_updated: now,
        });

    // Level 1 admits only pools whose counter side is itself trusted;
    // level 2 admits every pool of the pair.
    if cfg.stability(asset_b) > 0 {
        agg.virtual_a_level1 += v.a;
        agg.virtual_b_level1 += v.b;
    }
    agg.virtual_a_level2 += v.a;
    agg.virtual_b_level2 += v.b;
    agg.real_a += real_a;
    agg.real_b += real_b;
    agg.tvl_a += real_a;
    agg.tvl_b += real_b;
    agg.pool_count += 1;
    trace!(asset_a, asset_b, pool = %pool.pool_address, "folded pool into aggregate");
}

/// Reduce a pool snapshot into directional pair aggregates.
///
/// Pools missing assets or reserves are skipped. Output order follows the
/// pair key, so repeated runs over the same snapshot are identical.
pub fn aggregate_pools(pools: &[Pool], cfg: &TrustConfig, now: DateTime<Utc>) -> Vec<AggregatedPool> {
    let mut acc: HashMap<(u64, u64), AggregatedPool> = HashMap::new();
    for pool in pools {
        fold(&mut acc, pool, cfg, now);
        fold(&mut acc, &pool.reverse(), cfg, now);
    }
    let mut out: Vec<AggregatedPool> = acc.into_values().collect();
    out.sort_by_key(|a| (a.asset_id_a, a.asset_id_b));
    out
}
