//! Genesis blocks for the participant ledgers
//!
//! Each participant mines its own genesis block against the sentinel
//! back-link with the lighter genesis difficulty, one nonce at a time. The
//! timestamp is taken per participant, so the three genesis blocks are not
//! expected to agree.

use crate::chain::{Block, SENTINEL_FINGERPRINT};
use crate::clock::Clock;
use crate::errors::MiningError;
use crate::events::MiningTarget;
use crate::ledger::Participant;
use crate::miner::{CancelToken, Miner, SearchRequest};
use crate::pow::{DifficultyPattern, PreimageVersion};
use serde::{Deserialize, Serialize};

/// Payload of every genesis block
pub const GENESIS_PAYLOAD: &str = "Genesis Block: 100 coins";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisParams {
    pub pattern: DifficultyPattern,
    /// Genesis mining runs unbatched by default
    pub batch_size: u64,
    pub payload: String,
    #[serde(default)]
    pub preimage: PreimageVersion,
}

impl Default for GenesisParams {
    fn default() -> Self {
        Self {
            pattern: DifficultyPattern::leading_zeros(3),
            batch_size: 1,
            payload: GENESIS_PAYLOAD.to_string(),
            preimage: PreimageVersion::V1,
        }
    }
}

/// Mine the genesis block for `participant`
pub async fn create_genesis(
    participant: Participant,
    params: &GenesisParams,
    miner: &Miner,
    clock: &dyn Clock,
) -> Result<Block, MiningError> {
    let mut block = Block::empty(0, SENTINEL_FINGERPRINT);
    block.data = params.payload.clone();
    let timestamp = clock.timestamp();

    let request = SearchRequest {
        prefix: block.prefix(params.preimage, &timestamp),
        pattern: params.pattern.clone(),
        batch_size: params.batch_size,
        target: MiningTarget::Genesis { participant },
    };
    let solution = miner.mine(&request, &CancelToken::new()).await?;

    tracing::info!(
        %participant,
        nonce = solution.nonce,
        fingerprint = %solution.fingerprint,
        "genesis mined"
    );
    block.seal(timestamp, solution.nonce, solution.fingerprint);
    Ok(block)
}
