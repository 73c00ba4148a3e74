use crate::chain::{Chain, SharedChain};
use crate::clock::{SharedClock, SystemClock};
use crate::config::LabConfig;
use crate::events::{ChainScope, EventBus};
use crate::ledger::MultiLedger;
use crate::miner::{CancelToken, Miner};
use crate::workbench::SingleParams;
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the HTTP surface drives: one user chain, one multi-ledger
/// simulation and the miner they share
pub struct AppState {
    pub config: LabConfig,
    pub miner: Miner,
    pub clock: SharedClock,
    pub single: SingleParams,
    /// Token of the workbench search in progress, if any
    pub single_search: Mutex<Option<CancelToken>>,
    pub chain: SharedChain,
    pub ledger: MultiLedger,
}

impl AppState {
    /// Build state from config with the wall clock
    pub async fn new(config: LabConfig) -> Result<Arc<Self>> {
        let clock: SharedClock = Arc::new(SystemClock::new(config.clock.utc_offset_minutes));
        Self::with_clock(config, clock).await
    }

    /// Build state with an explicit clock. Mines the three genesis blocks.
    pub async fn with_clock(config: LabConfig, clock: SharedClock) -> Result<Arc<Self>> {
        let bus = EventBus::new(config.miner.event_capacity);
        let miner = Miner::sha256(config.miner.threads, bus.clone())?;

        let chain = SharedChain::new(Chain::new(ChainScope::User, config.chain_params(), bus));
        let ledger = MultiLedger::new(&config.ledger_params(), &miner, clock.as_ref()).await?;
        tracing::info!(
            chain_pattern = %config.chain.pattern,
            ledger_pattern = %config.ledger.pattern,
            "lab state ready"
        );

        Ok(Arc::new(Self {
            single: config.single_params(),
            single_search: Mutex::new(None),
            config,
            miner,
            clock,
            chain,
            ledger,
        }))
    }

    pub fn bus(&self) -> &EventBus {
        self.miner.bus()
    }
}
