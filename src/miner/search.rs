//! Batched proof-of-work search
//!
//! Nonces 0, 1, 2, ... are tried in consecutive batches. Every digest of a
//! batch is computed on the digest pool, then the batch is scanned in nonce
//! order so the lowest qualifying nonce wins no matter which worker finished
//! first. Between batches the task yields, reports progress and checks its
//! cancel token.

use crate::digest::DigestPool;
use crate::errors::MiningError;
use crate::events::{EventBus, LabEvent, MiningTarget};
use crate::miner::stats::HashrateTracker;
use crate::pow::DifficultyPattern;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Minimum nonces between two progress events
const PROGRESS_MIN_NONCES: u64 = 1000;

/// Largest batch a search accepts. Every digest of a batch is held in memory
/// at once.
pub const MAX_BATCH_SIZE: u64 = 1 << 20;

/// Shared flag that stops a search at its next batch boundary
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether both handles control the same search
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One search job
#[derive(Clone, Debug)]
pub struct SearchRequest {
    /// Preimage text before the nonce
    pub prefix: String,
    pub pattern: DifficultyPattern,
    pub batch_size: u64,
    pub target: MiningTarget,
}

/// Winning nonce plus search diagnostics
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub nonce: u64,
    pub fingerprint: String,
    pub batches: u64,
    pub hashes: u64,
    pub elapsed: Duration,
    pub hashrate: f64,
}

/// Run a search to completion, cancellation or digest failure
pub async fn search(
    pool: &DigestPool,
    request: &SearchRequest,
    cancel: &CancelToken,
    bus: &EventBus,
) -> Result<Solution, MiningError> {
    if request.batch_size == 0 {
        return Err(MiningError::ZeroBatchSize);
    }
    if request.batch_size > MAX_BATCH_SIZE {
        return Err(MiningError::BatchTooLarge {
            batch: request.batch_size,
            max: MAX_BATCH_SIZE,
        });
    }

    bus.publish(LabEvent::MiningStarted {
        target: request.target,
        pattern: request.pattern.to_string(),
        batch_size: request.batch_size,
    });

    match run(pool, request, cancel, bus).await {
        Ok(solution) => {
            tracing::info!(
                mining_target = ?request.target,
                nonce = solution.nonce,
                fingerprint = %solution.fingerprint,
                batches = solution.batches,
                elapsed_ms = solution.elapsed.as_millis() as u64,
                "mining complete"
            );
            bus.publish(LabEvent::MiningSucceeded {
                target: request.target,
                nonce: solution.nonce,
                fingerprint: solution.fingerprint.clone(),
                elapsed_ms: solution.elapsed.as_millis() as u64,
            });
            Ok(solution)
        }
        Err(e) => {
            tracing::warn!(mining_target = ?request.target, error = %e, "mining aborted");
            bus.publish(LabEvent::MiningAborted {
                target: request.target,
                reason: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn run(
    pool: &DigestPool,
    request: &SearchRequest,
    cancel: &CancelToken,
    bus: &EventBus,
) -> Result<Solution, MiningError> {
    let prefix: Arc<str> = Arc::from(request.prefix.as_str());
    let mut tracker = HashrateTracker::new(5);
    let mut next: u64 = 0;
    let mut batches: u64 = 0;
    let mut last_progress: u64 = 0;

    // Empty pattern: nonce 0 always qualifies
    let batch_size = if request.pattern.is_trivial() {
        1
    } else {
        request.batch_size
    };

    loop {
        if cancel.is_cancelled() {
            return Err(MiningError::Cancelled { batches });
        }

        let len = match next.checked_add(batch_size) {
            Some(_) => batch_size,
            None => u64::MAX - next,
        };
        if len == 0 {
            return Err(MiningError::NonceExhausted);
        }

        let results = pool
            .digest_batch(prefix.clone(), next, len as usize)
            .await
            .map_err(|source| MiningError::Digest {
                nonce: next,
                source,
            })?;

        for (i, result) in results.into_iter().enumerate() {
            let nonce = next + i as u64;
            let fingerprint = result.map_err(|source| MiningError::Digest { nonce, source })?;
            if request.pattern.is_met_by(&fingerprint) {
                tracker.record(i as u64 + 1);
                return Ok(Solution {
                    nonce,
                    fingerprint,
                    batches: batches + 1,
                    hashes: tracker.total_hashes(),
                    elapsed: tracker.elapsed(),
                    hashrate: tracker.lifetime_hashrate(),
                });
            }
        }

        tracker.record(len);
        batches += 1;
        next += len;

        if next - last_progress >= PROGRESS_MIN_NONCES {
            last_progress = next;
            tracing::debug!(mining_target = ?request.target, nonce = next, batches, "mining...");
            bus.publish(LabEvent::MiningProgress {
                target: request.target,
                nonce: next,
                batches,
                hashrate: tracker.hashrate(),
            });
        }

        tokio::task::yield_now().await;
    }
}
