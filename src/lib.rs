//! Proof-of-work and hash-chain teaching lab
//!
//! Digest primitive, batched nonce search, hash-linked chains with cascade
//! invalidation, and a three-participant ledger simulation, plus an HTTP
//! surface and CLI over them.

pub mod app_state;
pub mod chain;
pub mod clock;
pub mod config;
pub mod digest;
pub mod errors;
pub mod events;
pub mod genesis;
pub mod ledger;
pub mod miner;
pub mod pow;
pub mod routes;
pub mod signature;
pub mod transfer;
pub mod workbench;

pub use chain::{Block, Chain, SharedChain};
pub use errors::{ChainError, LedgerError, MiningError};
pub use events::{EventBus, LabEvent};
pub use ledger::{MultiLedger, Participant};
pub use miner::Miner;
