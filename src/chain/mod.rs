//! Hash-linked chain of blocks
//!
//! A chain owns its blocks. Every block after the first carries its
//! predecessor's fingerprint; any change to a block's data or seal resets
//! that block's descendants to unmined. Mining is split into
//! `begin_mining` / `commit_mining` so the chain never has to stay borrowed
//! across a search: a per-block generation counter rejects results that
//! arrive after the block was edited or re-mined.

pub mod block;
pub mod verify;

pub use block::{Block, BlockState, SENTINEL_FINGERPRINT};
pub use verify::ChainIssue;

use crate::clock::Clock;
use crate::errors::{ChainError, MiningError};
use crate::events::{ChainScope, EventBus, LabEvent, MiningTarget};
use crate::miner::{CancelToken, Miner, SearchRequest, Solution};
use crate::pow::{DifficultyPattern, PreimageVersion};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-chain mining parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub pattern: DifficultyPattern,
    pub batch_size: u64,
    #[serde(default)]
    pub preimage: PreimageVersion,
}

/// Serializable view of a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub scope: ChainScope,
    pub pattern: DifficultyPattern,
    pub blocks: Vec<Block>,
}

/// A mining attempt handed out by `begin_mining`
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: usize,
    pub generation: u64,
    pub timestamp: String,
    pub request: SearchRequest,
    pub cancel: CancelToken,
}

#[derive(Debug)]
pub struct Chain {
    scope: ChainScope,
    params: ChainParams,
    blocks: Vec<Block>,
    generations: Vec<u64>,
    in_flight: Vec<Option<CancelToken>>,
    bus: EventBus,
}

impl Chain {
    /// Chain with no blocks; the first `append` links to the sentinel
    pub fn new(scope: ChainScope, params: ChainParams, bus: EventBus) -> Self {
        Self {
            scope,
            params,
            blocks: Vec::new(),
            generations: Vec::new(),
            in_flight: Vec::new(),
            bus,
        }
    }

    /// Chain seeded with an already mined genesis block
    pub fn with_genesis(scope: ChainScope, params: ChainParams, bus: EventBus, genesis: Block) -> Self {
        let mut chain = Self::new(scope, params, bus);
        chain.blocks.push(Block { index: 0, ..genesis });
        chain.generations.push(0);
        chain.in_flight.push(None);
        chain
    }

    pub fn scope(&self) -> ChainScope {
        self.scope
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Result<&Block, ChainError> {
        self.blocks.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.blocks.len(),
        })
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            scope: self.scope,
            pattern: self.params.pattern.clone(),
            blocks: self.blocks.clone(),
        }
    }

    /// Append an empty block at the tail
    pub fn append(&mut self) -> &Block {
        let index = self.blocks.len();
        let previous = match self.blocks.last() {
            Some(tail) => tail.fingerprint.clone(),
            None => SENTINEL_FINGERPRINT.to_string(),
        };
        self.blocks.push(Block::empty(index, previous));
        self.generations.push(0);
        self.in_flight.push(None);
        tracing::debug!(scope = ?self.scope, index, "block appended");
        self.bus.publish(LabEvent::BlockAppended {
            scope: self.scope,
            index,
        });
        &self.blocks[index]
    }

    /// Replace the data of block `index`, resetting it and every later block.
    /// Returns how many blocks were reset. Never mines.
    pub fn edit_data(&mut self, index: usize, data: impl Into<String>) -> Result<usize, ChainError> {
        self.block(index)?;
        self.blocks[index].data = data.into();
        let invalidated = self.invalidate_from(index);
        tracing::debug!(scope = ?self.scope, index, invalidated, "block data edited");
        self.bus.publish(LabEvent::BlockEdited {
            scope: self.scope,
            index,
            invalidated,
        });
        Ok(invalidated)
    }

    /// Set or clear the presentational `invalid` marker on `index` and its
    /// descendants
    pub fn mark_invalid_from(&mut self, index: usize, invalid: bool) {
        for block in self.blocks.iter_mut().skip(index) {
            block.invalid = invalid;
        }
    }

    /// Reset blocks `from..` to unmined, relink each to its (now stale)
    /// predecessor and cancel their searches
    fn invalidate_from(&mut self, from: usize) -> usize {
        for i in from..self.blocks.len() {
            self.blocks[i].reset();
            if i > 0 {
                self.blocks[i].previous_fingerprint = self.blocks[i - 1].fingerprint.clone();
            }
            self.bump_generation(i);
        }
        self.blocks.len().saturating_sub(from)
    }

    fn bump_generation(&mut self, index: usize) {
        self.generations[index] += 1;
        if let Some(cancel) = self.in_flight[index].take() {
            cancel.cancel();
        }
    }

    /// Prepare a search for block `index`: checks the predecessor is mined,
    /// relinks the block to it, captures a fresh timestamp and supersedes any
    /// search already running on this block.
    pub fn begin_mining(&mut self, index: usize, clock: &dyn Clock) -> Result<MiningJob, ChainError> {
        self.block(index)?;
        let previous = if index == 0 {
            SENTINEL_FINGERPRINT.to_string()
        } else {
            let prev = &self.blocks[index - 1];
            if !prev.is_mined() {
                return Err(ChainError::StalePredecessor {
                    index,
                    previous: index - 1,
                });
            }
            prev.fingerprint.clone()
        };

        // Old seal and everything built on it are gone
        self.invalidate_from(index);

        let timestamp = clock.timestamp();
        let block = &mut self.blocks[index];
        block.previous_fingerprint = previous;
        block.timestamp = timestamp.clone();
        block.state = BlockState::Mining;

        let request = SearchRequest {
            prefix: block.prefix(self.params.preimage, &timestamp),
            pattern: self.params.pattern.clone(),
            batch_size: self.params.batch_size,
            target: MiningTarget::Block {
                scope: self.scope,
                index,
            },
        };
        let cancel = CancelToken::new();
        self.in_flight[index] = Some(cancel.clone());

        Ok(MiningJob {
            index,
            generation: self.generations[index],
            timestamp,
            request,
            cancel,
        })
    }

    /// Apply the outcome of a search started with `begin_mining`
    pub fn commit_mining(
        &mut self,
        job: MiningJob,
        outcome: Result<Solution, MiningError>,
    ) -> Result<&Block, ChainError> {
        let index = job.index;
        let current = self.generations.get(index).copied();
        if current != Some(job.generation) {
            tracing::warn!(scope = ?self.scope, index, "discarding late mining result");
            return Err(ChainError::Superseded { index });
        }
        self.in_flight[index] = None;

        let solution = match outcome {
            Ok(solution) => solution,
            Err(e) => {
                self.blocks[index].reset();
                return Err(e.into());
            }
        };

        if let Some(next) = self.blocks.get_mut(index + 1) {
            next.previous_fingerprint = solution.fingerprint.clone();
        }
        self.blocks[index].seal(job.timestamp, solution.nonce, solution.fingerprint);
        Ok(&self.blocks[index])
    }

    /// Undo `begin_mining` for a job whose outcome will never be committed:
    /// the block goes back to `Empty` and its search slot is freed. Returns
    /// false if the job had already been superseded.
    pub fn abort_mining(&mut self, job: &MiningJob) -> bool {
        let index = job.index;
        if self.generations.get(index).copied() != Some(job.generation) {
            return false;
        }
        self.blocks[index].reset();
        self.bump_generation(index);
        tracing::debug!(scope = ?self.scope, index, "mining abandoned, block reset");
        self.bus.publish(LabEvent::MiningAborted {
            target: job.request.target,
            reason: "abandoned".into(),
        });
        true
    }

    /// Mine block `index` in place. Dropping the future before it resolves
    /// leaves the block `Empty`.
    pub async fn mine_block(
        &mut self,
        index: usize,
        miner: &Miner,
        clock: &dyn Clock,
    ) -> Result<&Block, ChainError> {
        let job = self.begin_mining(index, clock)?;
        let pending = AbortOnDrop::new(|| {
            self.abort_mining(&job);
        });
        let outcome = miner.mine(&job.request, &job.cancel).await;
        pending.disarm();
        self.commit_mining(job, outcome)
    }

    /// Cancel the search running on `index`, if any
    pub fn cancel_mining(&mut self, index: usize) -> Result<bool, ChainError> {
        self.block(index)?;
        Ok(match self.in_flight[index].take() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        })
    }

    pub fn verify(&self, digest: impl Fn(&str) -> String) -> Vec<ChainIssue> {
        verify::verify_chain(self, digest)
    }

    pub fn is_valid(&self, digest: impl Fn(&str) -> String) -> bool {
        self.verify(digest).is_empty()
    }
}

/// Chain shared between tasks. The lock is released while a search runs and
/// re-taken to commit, so edits can land mid-search and supersede it.
#[derive(Debug, Clone)]
pub struct SharedChain {
    inner: Arc<Mutex<Chain>>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// Run `f` with the chain locked
    pub fn with<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn append(&self) -> Block {
        self.inner.lock().append().clone()
    }

    pub fn edit_data(&self, index: usize, data: impl Into<String>) -> Result<usize, ChainError> {
        self.inner.lock().edit_data(index, data)
    }

    pub async fn mine_block(
        &self,
        index: usize,
        miner: &Miner,
        clock: &dyn Clock,
    ) -> Result<Block, ChainError> {
        let job = self.inner.lock().begin_mining(index, clock)?;
        let pending = AbortOnDrop::new(|| {
            self.with(|chain| chain.abort_mining(&job));
        });
        let outcome = miner.mine(&job.request, &job.cancel).await;
        pending.disarm();
        self.with(|chain| chain.commit_mining(job, outcome).cloned())
    }

    pub fn cancel_mining(&self, index: usize) -> Result<bool, ChainError> {
        self.inner.lock().cancel_mining(index)
    }
}

/// Runs its closure on drop unless disarmed first
struct AbortOnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> AbortOnDrop<F> {
    fn new(abort: F) -> Self {
        Self(Some(abort))
    }

    fn disarm(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for AbortOnDrop<F> {
    fn drop(&mut self) {
        if let Some(abort) = self.0.take() {
            abort();
        }
    }
}
