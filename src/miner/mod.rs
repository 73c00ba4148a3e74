//! Mining engine: batched nonce search, cancellation and hashrate stats

pub mod manager;
pub mod search;
pub mod stats;

pub use manager::Miner;
pub use search::{CancelToken, SearchRequest, Solution, MAX_BATCH_SIZE};
pub use stats::HashrateTracker;
