//! Price oracle.
//!
//! Assigns a USD price to every asset reachable from the trusted
//! reference set by propagating through the pool graph, and folds pool
//! reserves into per-asset TVL. Pure functions of a pool snapshot plus
//! the trust configuration.

use amm::{real_amounts, virtual_reserves};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use types::{Asset, Pool};

/// One configured reference asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedAsset {
    pub asset_id: u64,
    /// Higher = more authoritative price reference. Assets at the top
    /// configured level are USD pegs whose price is exactly 1.
    pub stability_index: u32,
}

/// Trust configuration for price propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    pub trusted: Vec<TrustedAsset>,
    /// Relaxation ceiling; bounds propagation on cyclic pool graphs.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

fn default_max_hops() -> usize {
    8
}

impl Default for TrustConfig {
    fn default() -> Self {
        // Mainnet defaults: USDC-class stables anchor the graph, the
        // native asset sits one level below.
        Self {
            trusted: vec![
                TrustedAsset { asset_id: 31_566_704, stability_index: 1000 },
                TrustedAsset { asset_id: 312_769, stability_index: 900 },
                TrustedAsset { asset_id: types::NATIVE_ASSET_ID, stability_index: 100 },
            ],
            max_hops: default_max_hops(),
        }
    }
}

impl TrustConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn stability(&self, asset_id: u64) -> u32 {
        self.trusted
            .iter()
            .find(|t| t.asset_id == asset_id)
            .map(|t| t.stability_index)
            .unwrap_or(0)
    }

    fn top_level(&self) -> u32 {
        self.trusted
            .iter()
            .map(|t| t.stability_index)
            .max()
            .unwrap_or(0)
    }

    /// USD pegs: assets at the top configured stability level.
    pub fn is_usd_peg(&self, asset_id: u64) -> bool {
        let top = self.top_level();
        top > 0 && self.stability(asset_id) == top
    }
}

/// One pool edge prepared for propagation.
struct Edge {
    asset_a: u64,
    asset_b: u64,
    virtual_a: Decimal,
    virtual_b: Decimal,
}

fn edges(pools: &[Pool]) -> Vec<Edge> {
    pools
        .iter()
        .filter_map(|pool| {
            let asset_a = pool.asset_id_a?;
            let asset_b = pool.asset_id_b?;
            let v = virtual_reserves(pool)?;
            if v.a.is_zero() || v.b.is_zero() {
                return None;
            }
            Some(Edge {
                asset_a,
                asset_b,
                virtual_a: v.a,
                virtual_b: v.b,
            })
        })
        .collect()
}

/// USD price per asset, propagated from the trusted set through the
/// pool graph by iterative relaxation.
///
/// Each round prices only still-unpriced assets; among multiple
/// candidate pools the one with the more stable source wins, ties
/// broken by the larger priced-side virtual reserve. The hop ceiling
/// keeps cyclic graphs terminating.
pub fn compute_prices(pools: &[Pool], cfg: &TrustConfig) -> HashMap<u64, Decimal> {
    let mut prices: HashMap<u64, Decimal> = HashMap::new();
    for t in &cfg.trusted {
        if cfg.is_usd_peg(t.asset_id) {
            prices.insert(t.asset_id, Decimal::ONE);
        }
    }

    let edges = edges(pools);
    for _hop in 0..cfg.max_hops {
        // candidate: asset -> (source stability, source virtual, price)
        let mut candidates: HashMap<u64, (u32, Decimal, Decimal)> = HashMap::new();
        for e in &edges {
            for (unknown, known, v_unknown, v_known) in [
                (e.asset_a, e.asset_b, e.virtual_a, e.virtual_b),
                (e.asset_b, e.asset_a, e.virtual_b, e.virtual_a),
            ] {
                if prices.contains_key(&unknown) {
                    continue;
                }
                let Some(&known_price) = prices.get(&known) else {
                    continue;
                };
                let derived = known_price * v_known / v_unknown;
                let rank = (cfg.stability(known), v_known);
                match candidates.get(&unknown) {
                    Some(&(s, v, _)) if (s, v) >= rank => {}
                    _ => {
                        candidates.insert(unknown, (rank.0, rank.1, derived));
                    }
                }
            }
        }
        if candidates.is_empty() {
            break;
        }
        for (asset, (_, _, price)) in candidates {
            debug!(asset, %price, "resolved asset price");
            prices.insert(asset, price);
        }
    }
    prices
}

/// Per-asset TVL summary derived from the snapshot and resolved prices.
///
/// `tvl_usd` counts only the trusted-side contribution of each pool
/// containing the asset (the counter side, when it is more stable);
/// `total_tvl_usd` counts both sides of every such pool. Recomputed from
/// scratch, never patched incrementally.
pub fn compute_asset_stats(
    pools: &[Pool],
    cfg: &TrustConfig,
    prices: &HashMap<u64, Decimal>,
    now: DateTime<Utc>,
) -> Vec<Asset> {
    let mut tvl: HashMap<u64, Decimal> = HashMap::new();
    let mut total: HashMap<u64, Decimal> = HashMap::new();

    for pool in pools {
        let (Some(asset_a), Some(asset_b)) = (pool.asset_id_a, pool.asset_id_b) else {
            continue;
        };
        let Some(v) = virtual_reserves(pool) else {
            continue;
        };
        let usd_a = prices.get(&asset_a).map(|p| v.a * p);
        let usd_b = prices.get(&asset_b).map(|p| v.b * p);
        let both = match (usd_a, usd_b) {
            (Some(a), Some(b)) => Some(a + b),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        for (asset, counter, counter_usd) in
            [(asset_a, asset_b, usd_b), (asset_b, asset_a, usd_a)]
        {
            if let Some(counter_usd) = counter_usd {
                if cfg.stability(counter) > cfg.stability(asset) {
                    *tvl.entry(asset).or_default() += counter_usd;
                }
            }
            if let Some(both) = both {
                *total.entry(asset).or_default() += both;
            }
        }
    }

    let mut ids: Vec<u64> = prices
        .keys()
        .copied()
        .chain(tvl.keys().copied())
        .chain(total.keys().copied())
        .chain(std::iter::once(types::NATIVE_ASSET_ID))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .map(|index| Asset {
            index,
            price_usd: prices.get(&index).copied(),
            tvl_usd: tvl.get(&index).copied().unwrap_or_default(),
            total_tvl_usd: total.get(&index).copied().unwrap_or_default(),
            timestamp: now,
        })
        .collect()
}

/// USD TVL per pool side, for back-filling onto Pool records.
pub fn pool_tvl_usd(pool: &Pool, prices: &HashMap<u64, Decimal>) -> (Option<Decimal>, Option<Decimal>) {
    let Some((real_a, real_b)) = real_amounts(pool) else {
        return (None, None);
    };
    let tvl_a = pool
        .asset_id_a
        .and_then(|id| prices.get(&id))
        .map(|p| real_a * p);
    let tvl_b = pool
        .asset_id_b
        .and_then(|id| prices.get(&id))
        .map(|p| real_b * p);
    (tvl_a, tvl_b)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use types::{AmmType, DexProtocol};

    const USDC: u64 = 31_566_704;

    pub(crate) fn simple_pool(
        address: &str,
        asset_a: u64,
        asset_b: u64,
        a: u64,
        b: u64,
    ) -> Pool {
        Pool {
            pool_address: address.into(),
            pool_app_id: 1,
            protocol: DexProtocol::Pact,
            asset_id_a: Some(asset_a),
            asset_id_b: Some(asset_b),
            asset_id_lp: Some(77_000),
            a: Some(a),
            b: Some(b),
            stable_a: None,
            stable_b: None,
            amplifier: None,
            af: None,
            bf: None,
            l: Some(1),
            amm_type: AmmType::OldAmm,
            p_min: None,
            p_max: None,
            lp_fee: dec!(0.003),
            protocol_fee_portion: dec!(0.2),
            asset_a_decimals: Some(6),
            asset_b_decimals: Some(6),
            approval_program_hash: None,
            timestamp: Utc::now(),
            tvl_a_usd: None,
            tvl_b_usd: None,
        }
    }

    #[test]
    fn direct_stablecoin_pairing_prices_the_asset() {
        // Reference scenario: 1.0 of the asset vs 2.0 USDC.
        let pools = vec![simple_pool("P", 555, USDC, 1_000_000, 2_000_000)];
        let cfg = TrustConfig::default();
        let prices = compute_prices(&pools, &cfg);

        assert_eq!(prices[&USDC], dec!(1));
        assert_eq!(prices[&555], dec!(2));

        let assets = compute_asset_stats(&pools, &cfg, &prices, Utc::now());
        let asset = assets.iter().find(|a| a.index == 555).unwrap();
        assert_eq!(asset.tvl_usd, dec!(2));
        assert_eq!(asset.total_tvl_usd, dec!(4));
    }

    #[test]
    fn one_hop_propagation_through_native() {
        // 555 only pairs with the native asset; native pairs with USDC
        // at 4 USDC per native.
        let pools = vec![
            simple_pool("P1", 0, USDC, 1_000_000, 4_000_000),
            simple_pool("P2", 555, 0, 2_000_000, 1_000_000),
        ];
        let cfg = TrustConfig::default();
        let prices = compute_prices(&pools, &cfg);

        assert_eq!(prices[&0], dec!(4));
        // 2.0 of 555 vs 1.0 native => 0.5 native each => 2 USD.
        assert_eq!(prices[&555], dec!(2));
    }

    #[test]
    fn more_stable_source_wins_over_deeper_reserve() {
        // 555 pairs with both USDC (priced 3) and native (priced 5 via a
        // skewed pool). The stablecoin pairing must win even though the
        // native pool is deeper.
        let pools = vec![
            simple_pool("N", 0, USDC, 1_000_000, 1_000_000),
            simple_pool("P1", 555, USDC, 1_000_000, 3_000_000),
            simple_pool("P2", 555, 0, 10_000_000, 50_000_000),
        ];
        let cfg = TrustConfig::default();
        let prices = compute_prices(&pools, &cfg);
        assert_eq!(prices[&555], dec!(3));
    }

    #[test]
    fn cyclic_graph_terminates() {
        // Three untrusted assets in a triangle, none reachable from a
        // peg: no prices, no hang.
        let pools = vec![
            simple_pool("A", 1, 2, 1_000_000, 1_000_000),
            simple_pool("B", 2, 3, 1_000_000, 1_000_000),
            simple_pool("C", 3, 1, 1_000_000, 1_000_000),
        ];
        let cfg = TrustConfig::default();
        let prices = compute_prices(&pools, &cfg);
        assert_eq!(prices.len(), 1); // just the seeded peg
    }

    #[test]
    fn trust_config_loads_from_toml() {
        let cfg = TrustConfig::from_toml_str(
            r#"
            max_hops = 4

            [[trusted]]
            asset_id = 42
            stability_index = 1000

            [[trusted]]
            asset_id = 0
            stability_index = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_hops, 4);
        assert!(cfg.is_usd_peg(42));
        assert!(!cfg.is_usd_peg(0));
    }

    #[test]
    fn zero_reserve_pools_are_ignored() {
        let pools = vec![simple_pool("P", 555, USDC, 0, 2_000_000)];
        let prices = compute_prices(&pools, &TrustConfig::default());
        assert!(!prices.contains_key(&555));
    }
}
