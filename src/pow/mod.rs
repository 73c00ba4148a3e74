//! Proof-of-work primitives
//!
//! Difficulty patterns and the preimage layout shared by miner and verifier.

pub mod difficulty;
pub mod encoding;

pub use difficulty::DifficultyPattern;
pub use encoding::{append_nonce, preview_preimage, standalone_prefix, PreimageVersion};
