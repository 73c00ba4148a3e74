//! Domain-specific error types for hashchain-lab
//!
//! Every mining/chain failure is returned to the immediate caller; nothing
//! here is retried automatically.

use thiserror::Error;

/// Failure of the underlying digest primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest primitive unavailable: {0}")]
    Unavailable(String),

    #[error("digest worker failed: {0}")]
    Worker(String),
}

/// Proof-of-work search errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    #[error("malformed difficulty pattern {pattern:?}: {reason}")]
    MalformedPattern { pattern: String, reason: &'static str },

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("batch size {batch} exceeds the limit of {max}")]
    BatchTooLarge { batch: u64, max: u64 },

    #[error("speed multiplier must be at least 1")]
    ZeroSpeedMultiplier,

    #[error("search cancelled after {batches} batch(es)")]
    Cancelled { batches: u64 },

    #[error("nonce space exhausted")]
    NonceExhausted,

    #[error("digest failed at nonce {nonce}: {source}")]
    Digest {
        nonce: u64,
        #[source]
        source: DigestError,
    },
}

/// Chain manipulation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("no block at index {index} (chain length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("block {index} cannot be mined: block {previous} is not mined")]
    StalePredecessor { index: usize, previous: usize },

    #[error("mining result for block {index} discarded: block changed while mining")]
    Superseded { index: usize },

    #[error(transparent)]
    Mining(#[from] MiningError),
}

/// Multi-ledger simulation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("transfer pool is empty")]
    EmptyPool,

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Mining(#[from] MiningError),
}

/// Transfer parsing and balance errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("invalid transfer syntax {0:?}, expected \"A -> B: amount\"")]
    InvalidSyntax(String),

    #[error("sender and recipient are both {0}")]
    SelfTransfer(String),

    #[error("transfer amount must be positive")]
    ZeroAmount,

    #[error("insufficient balance for {participant}: required {required}, available {available}")]
    InsufficientBalance {
        participant: String,
        required: u64,
        available: u64,
    },
}

/// ECDSA demo errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("{0} is empty")]
    MissingField(&'static str),

    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid DER signature: {0}")]
    InvalidSignature(String),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("{key} = {value} exceeds the batch limit of {max}")]
    BatchTooLarge { key: &'static str, value: u64, max: u64 },

    #[error(transparent)]
    Mining(#[from] MiningError),
}
