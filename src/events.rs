//! Lab event bus
//!
//! Mining and chain mutations are announced here; presentation layers
//! (CLI printer, WebSocket stream) subscribe instead of being called from
//! inside the engine.

use crate::ledger::Participant;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which chain a block event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "participant", rename_all = "snake_case")]
pub enum ChainScope {
    /// The single user chain
    User,
    /// One of the multi-ledger participants
    Ledger(Participant),
}

/// What a search is mining for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MiningTarget {
    /// Standalone block on the workbench
    Single,
    /// Genesis block of a participant ledger
    Genesis { participant: Participant },
    /// Block `index` of a chain
    Block { scope: ChainScope, index: usize },
}

/// Lab event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LabEvent {
    MiningStarted {
        target: MiningTarget,
        pattern: String,
        batch_size: u64,
    },
    /// `nonce` is the next nonce to try
    MiningProgress {
        target: MiningTarget,
        nonce: u64,
        batches: u64,
        hashrate: f64,
    },
    MiningSucceeded {
        target: MiningTarget,
        nonce: u64,
        fingerprint: String,
        elapsed_ms: u64,
    },
    MiningAborted {
        target: MiningTarget,
        reason: String,
    },
    BlockAppended {
        scope: ChainScope,
        index: usize,
    },
    /// Data changed on `index`; `invalidated` blocks were reset
    BlockEdited {
        scope: ChainScope,
        index: usize,
        invalidated: usize,
    },
    TransferQueued {
        from: Participant,
        to: Participant,
        amount: u64,
    },
}

/// Event with its publication time (unix seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: LabEvent,
    pub timestamp: i64,
}

/// Broadcast fan-out of lab events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: LabEvent) {
        let envelope = EventEnvelope {
            event,
            timestamp: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = self.sender.send(envelope) {
            tracing::trace!("no subscribers for {:?}", e.0.event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
