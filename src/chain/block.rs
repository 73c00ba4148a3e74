//! Block record and its mining state

use crate::pow::{DifficultyPattern, PreimageVersion};
use serde::{Deserialize, Serialize};

/// Back-link of the first block in every chain
pub const SENTINEL_FINGERPRINT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Mining state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    Empty,
    Mining,
    Mined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: usize,
    /// Sentinel for block 0, predecessor's fingerprint otherwise (empty while
    /// the predecessor is unmined)
    pub previous_fingerprint: String,
    pub data: String,
    /// Captured when mining starts; empty while unmined
    pub timestamp: String,
    pub nonce: u64,
    /// Qualifying digest; empty while unmined
    pub fingerprint: String,
    /// Presentational marker set by the ledger simulation on edited blocks
    #[serde(default)]
    pub invalid: bool,
    pub state: BlockState,
}

impl Block {
    /// Unmined block linked to `previous_fingerprint`
    pub fn empty(index: usize, previous_fingerprint: impl Into<String>) -> Self {
        Self {
            index,
            previous_fingerprint: previous_fingerprint.into(),
            data: String::new(),
            timestamp: String::new(),
            nonce: 0,
            fingerprint: String::new(),
            invalid: false,
            state: BlockState::Empty,
        }
    }

    pub fn is_mined(&self) -> bool {
        self.state == BlockState::Mined
    }

    /// Back to the unmined state; data and back-link are kept
    pub fn reset(&mut self) {
        self.timestamp.clear();
        self.nonce = 0;
        self.fingerprint.clear();
        self.state = BlockState::Empty;
    }

    /// Record a successful search
    pub fn seal(&mut self, timestamp: String, nonce: u64, fingerprint: String) {
        self.timestamp = timestamp;
        self.nonce = nonce;
        self.fingerprint = fingerprint;
        self.invalid = false;
        self.state = BlockState::Mined;
    }

    /// Preimage text before the nonce, for a given timestamp
    pub fn prefix(&self, version: PreimageVersion, timestamp: &str) -> String {
        version.prefix(&self.previous_fingerprint, &self.data, timestamp)
    }

    /// Full preimage with the block's own timestamp and nonce
    pub fn preimage(&self, version: PreimageVersion) -> String {
        version.preimage(
            &self.previous_fingerprint,
            &self.data,
            &self.timestamp,
            self.nonce,
        )
    }

    /// Recompute the block's digest and check it against the stored
    /// fingerprint and the difficulty
    pub fn seal_holds(
        &self,
        version: PreimageVersion,
        pattern: &DifficultyPattern,
        digest: impl Fn(&str) -> String,
    ) -> bool {
        self.is_mined()
            && digest(&self.preimage(version)) == self.fingerprint
            && pattern.is_met_by(&self.fingerprint)
    }
}
