//! Single-block workbench
//!
//! A standalone block with no predecessor: `data + timestamp + nonce` is
//! mined with a batch size scaled by a speed multiplier. Manual nonce entry
//! is previewed as `digest(data + nonce)`.

use crate::clock::Clock;
use crate::errors::{DigestError, MiningError};
use crate::events::MiningTarget;
use crate::miner::{CancelToken, Miner, SearchRequest, MAX_BATCH_SIZE};
use crate::pow::{preview_preimage, standalone_prefix, DifficultyPattern};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleParams {
    pub pattern: DifficultyPattern,
    /// Batch size at speed 1
    pub base_batch: u64,
    pub max_speed_multiplier: u64,
}

impl Default for SingleParams {
    fn default() -> Self {
        Self {
            pattern: DifficultyPattern::leading_zeros(4),
            base_batch: 1000,
            max_speed_multiplier: 100,
        }
    }
}

impl SingleParams {
    /// Effective batch for a multiplier; multipliers above the maximum are
    /// clamped, as is the product to `MAX_BATCH_SIZE`. Zero is rejected.
    pub fn batch_for(&self, speed_multiplier: u64) -> Result<u64, MiningError> {
        if speed_multiplier == 0 {
            return Err(MiningError::ZeroSpeedMultiplier);
        }
        let speed = speed_multiplier.min(self.max_speed_multiplier.max(1));
        let batch = self.base_batch.saturating_mul(speed).min(MAX_BATCH_SIZE);
        if batch == 0 {
            return Err(MiningError::ZeroBatchSize);
        }
        Ok(batch)
    }
}

/// Result of mining on the workbench
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleBlock {
    pub data: String,
    pub timestamp: String,
    pub nonce: u64,
    pub fingerprint: String,
    pub batch_size: u64,
    pub elapsed_ms: u64,
}

/// Fingerprint of `data` with a hand-picked nonce (no timestamp)
pub fn preview_fingerprint(miner: &Miner, data: &str, nonce: u64) -> Result<String, DigestError> {
    miner.digest(&preview_preimage(data, nonce))
}

/// Mine a standalone block. Without a `cancel` token the search runs until
/// it finds a nonce.
pub async fn mine_single(
    params: &SingleParams,
    data: &str,
    speed_multiplier: u64,
    miner: &Miner,
    clock: &dyn Clock,
    cancel: Option<&CancelToken>,
) -> Result<SingleBlock, MiningError> {
    let batch_size = params.batch_for(speed_multiplier)?;
    let timestamp = clock.timestamp();
    let request = SearchRequest {
        prefix: standalone_prefix(data, &timestamp),
        pattern: params.pattern.clone(),
        batch_size,
        target: MiningTarget::Single,
    };
    let cancel = cancel.cloned().unwrap_or_default();
    let solution = miner.mine(&request, &cancel).await?;
    Ok(SingleBlock {
        data: data.to_string(),
        timestamp,
        nonce: solution.nonce,
        fingerprint: solution.fingerprint,
        batch_size,
        elapsed_ms: solution.elapsed.as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::digest::sha256_hex;
    use crate::events::EventBus;

    fn miner() -> Miner {
        Miner::sha256(Some(2), EventBus::default()).unwrap()
    }

    #[test]
    fn preview_is_data_then_nonce() {
        assert_eq!(
            preview_fingerprint(&miner(), "hello", 7).unwrap(),
            sha256_hex("hello7")
        );
    }

    #[test]
    fn batch_scales_with_speed() {
        let p = SingleParams::default();
        assert_eq!(p.batch_for(1).unwrap(), 1000);
        assert_eq!(p.batch_for(10).unwrap(), 10_000);
        assert_eq!(p.batch_for(1_000).unwrap(), 100_000);
        assert_eq!(p.batch_for(0), Err(MiningError::ZeroSpeedMultiplier));

        let wide = SingleParams {
            base_batch: 500_000,
            max_speed_multiplier: u64::MAX,
            ..SingleParams::default()
        };
        assert_eq!(wide.batch_for(u64::MAX).unwrap(), MAX_BATCH_SIZE);
    }

    #[tokio::test]
    async fn mined_single_block_meets_pattern() {
        let params = SingleParams {
            pattern: DifficultyPattern::new("00").unwrap(),
            ..SingleParams::default()
        };
        let clock = FixedClock("1/2/2025, 3:04:05 PM".into());
        let block = mine_single(&params, "hello", 2, &miner(), &clock, None)
            .await
            .unwrap();
        assert_eq!(block.batch_size, 2000);
        assert!(block.fingerprint.starts_with("00"));
        assert_eq!(
            block.fingerprint,
            sha256_hex(&format!("hello1/2/2025, 3:04:05 PM{}", block.nonce))
        );
    }

    #[tokio::test]
    async fn cancelled_token_stops_single_mining() {
        let params = SingleParams {
            pattern: DifficultyPattern::new("0".repeat(64)).unwrap(),
            ..SingleParams::default()
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = mine_single(&params, "hello", 1, &miner(), &FixedClock("t".into()), Some(&cancel))
            .await
            .unwrap_err();
        assert_eq!(err, MiningError::Cancelled { batches: 0 });
    }
}
