//! Miner handle shared by every mining call site
//!
//! Bundles the digest pool and the event bus so chains, the workbench and
//! the ledger simulation all mine through the same engine.

use crate::digest::{DigestPool, Digester};
use crate::errors::{DigestError, MiningError};
use crate::events::EventBus;
use crate::miner::search::{search, CancelToken, SearchRequest, Solution};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Miner {
    pool: DigestPool,
    bus: EventBus,
}

impl Miner {
    pub fn new(pool: DigestPool, bus: EventBus) -> Self {
        Self { pool, bus }
    }

    /// SHA-256 miner with `threads` digest workers (None = all cores)
    pub fn sha256(threads: Option<usize>, bus: EventBus) -> Result<Self, DigestError> {
        let pool = DigestPool::new(Arc::new(crate::digest::Sha256Digester), threads)?;
        Ok(Self::new(pool, bus))
    }

    /// Miner over a custom digest primitive
    pub fn with_digester(
        digester: Arc<dyn Digester>,
        threads: Option<usize>,
        bus: EventBus,
    ) -> Result<Self, DigestError> {
        Ok(Self::new(DigestPool::new(digester, threads)?, bus))
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn pool(&self) -> &DigestPool {
        &self.pool
    }

    /// Digest one text with the miner's primitive
    pub fn digest(&self, text: &str) -> Result<String, DigestError> {
        self.pool.digest(text)
    }

    pub async fn mine(
        &self,
        request: &SearchRequest,
        cancel: &CancelToken,
    ) -> Result<Solution, MiningError> {
        search(&self.pool, request, cancel, &self.bus).await
    }
}
