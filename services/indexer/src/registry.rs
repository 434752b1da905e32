//! Selector-keyed processor registry, built once at startup.

use crate::processors::{
    biatec, pact, tinyman, LiquidityProcessor, PoolRefresher, SwapProcessor,
};
use std::collections::HashMap;
use std::sync::Arc;
use types::DexProtocol;

#[derive(Default)]
pub struct ProcessorRegistry {
    swaps: HashMap<Vec<u8>, Arc<dyn SwapProcessor>>,
    liquidity: HashMap<Vec<u8>, Arc<dyn LiquidityProcessor>>,
    refreshers: HashMap<DexProtocol, Arc<dyn PoolRefresher>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering all three supported protocols.
    pub fn standard() -> Self {
        let mut r = Self::new();

        r.register_swap(tinyman::SWAP_SELECTOR, Arc::new(tinyman::TinymanSwap));
        r.register_liquidity(tinyman::MINT_SELECTOR, Arc::new(tinyman::TinymanLiquidity));
        r.register_liquidity(tinyman::BURN_SELECTOR, Arc::new(tinyman::TinymanLiquidity));
        r.register_refresher(Arc::new(tinyman::TinymanRefresher));

        r.register_swap(pact::SWAP_SELECTOR, Arc::new(pact::PactSwap));
        r.register_liquidity(pact::ADD_LIQUIDITY_SELECTOR, Arc::new(pact::PactLiquidity));
        r.register_liquidity(pact::REMOVE_LIQUIDITY_SELECTOR, Arc::new(pact::PactLiquidity));
        r.register_refresher(Arc::new(pact::PactRefresher));

        r.register_swap(biatec::SWAP_SELECTOR, Arc::new(biatec::BiatecSwap));
        r.register_liquidity(biatec::ADD_LIQUIDITY_SELECTOR, Arc::new(biatec::BiatecLiquidity));
        r.register_liquidity(
            biatec::REMOVE_LIQUIDITY_SELECTOR,
            Arc::new(biatec::BiatecLiquidity),
        );
        r.register_refresher(Arc::new(biatec::BiatecRefresher));

        r
    }

    pub fn register_swap(&mut self, selector: &[u8], processor: Arc<dyn SwapProcessor>) {
        self.swaps.insert(selector.to_vec(), processor);
    }

    pub fn register_liquidity(&mut self, selector: &[u8], processor: Arc<dyn LiquidityProcessor>) {
        self.liquidity.insert(selector.to_vec(), processor);
    }

    pub fn register_refresher(&mut self, refresher: Arc<dyn PoolRefresher>) {
        self.refreshers.insert(refresher.protocol(), refresher);
    }

    pub fn swap(&self, selector: &[u8]) -> Option<&Arc<dyn SwapProcessor>> {
        self.swaps.get(selector)
    }

    pub fn liquidity(&self, selector: &[u8]) -> Option<&Arc<dyn LiquidityProcessor>> {
        self.liquidity.get(selector)
    }

    pub fn refresher(&self, protocol: DexProtocol) -> Option<&Arc<dyn PoolRefresher>> {
        self.refreshers.get(&protocol)
    }

    pub fn knows_selector(&self, selector: &[u8]) -> bool {
        self.swaps.contains_key(selector) || self.liquidity.contains_key(selector)
    }
}
