//! Whole-chain validation: linkage, recomputed fingerprints, difficulty

use super::{Block, Chain, SENTINEL_FINGERPRINT};
use serde::{Deserialize, Serialize};

/// One problem found while walking a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ChainIssue {
    Unmined { index: usize },
    BrokenLink { index: usize, expected: String, found: String },
    FingerprintMismatch { index: usize, recomputed: String },
    DifficultyNotMet { index: usize },
}

impl ChainIssue {
    pub fn index(&self) -> usize {
        match self {
            ChainIssue::Unmined { index }
            | ChainIssue::BrokenLink { index, .. }
            | ChainIssue::FingerprintMismatch { index, .. }
            | ChainIssue::DifficultyNotMet { index } => *index,
        }
    }
}

/// Walk every block and collect issues; empty means valid
pub fn verify_chain(chain: &Chain, digest: impl Fn(&str) -> String) -> Vec<ChainIssue> {
    let params = chain.params();
    let mut issues = Vec::new();
    let mut previous: Option<&Block> = None;

    for block in chain.blocks() {
        let index = block.index;
        let expected_link = match previous {
            None => SENTINEL_FINGERPRINT,
            Some(p) => p.fingerprint.as_str(),
        };
        if block.previous_fingerprint != expected_link {
            issues.push(ChainIssue::BrokenLink {
                index,
                expected: expected_link.to_string(),
                found: block.previous_fingerprint.clone(),
            });
        }

        if !block.is_mined() {
            issues.push(ChainIssue::Unmined { index });
        } else {
            let recomputed = digest(&block.preimage(params.preimage));
            if recomputed != block.fingerprint {
                issues.push(ChainIssue::FingerprintMismatch { index, recomputed });
            }
            if !params.pattern.is_met_by(&block.fingerprint) {
                issues.push(ChainIssue::DifficultyNotMet { index });
            }
        }
        previous = Some(block);
    }
    issues
}
