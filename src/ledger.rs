//! Multi-ledger simulation
//!
//! Three participants keep independent chains, each seeded with its own
//! mined genesis block. Nothing synchronizes them: divergence is the point
//! of the exercise. A shared transfer pool and balance sheet let the
//! participants record the same transfers (or not) in their own chains.

use crate::chain::{Block, Chain, ChainParams, ChainSnapshot, SharedChain};
use crate::clock::Clock;
use crate::errors::{ChainError, LedgerError};
use crate::events::{ChainScope, EventBus, LabEvent};
use crate::genesis::{create_genesis, GenesisParams};
use crate::miner::Miner;
use crate::transfer::{render_pool, Balances, Transfer};
use futures_util::future::try_join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Participant {
    A,
    B,
    C,
}

impl Participant {
    pub const ALL: [Participant; 3] = [Participant::A, Participant::B, Participant::C];

    pub fn as_str(self) -> &'static str {
        match self {
            Participant::A => "A",
            Participant::B => "B",
            Participant::C => "C",
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Participant {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Participant::A),
            "B" | "b" => Ok(Participant::B),
            "C" | "c" => Ok(Participant::C),
            other => Err(LedgerError::UnknownParticipant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    pub chain: ChainParams,
    pub genesis: GenesisParams,
    pub initial_balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub chains: BTreeMap<Participant, ChainSnapshot>,
    pub balances: Balances,
    pub pool: Vec<Transfer>,
}

#[derive(Debug)]
struct TransferBook {
    balances: Balances,
    pool: Vec<Transfer>,
}

#[derive(Debug)]
pub struct MultiLedger {
    chains: BTreeMap<Participant, SharedChain>,
    book: Mutex<TransferBook>,
    bus: EventBus,
}

impl MultiLedger {
    /// Mine the three genesis blocks (interleaved, independently timestamped)
    /// and build the ledgers
    pub async fn new(
        params: &LedgerParams,
        miner: &Miner,
        clock: &dyn Clock,
    ) -> Result<Self, LedgerError> {
        let genesis = try_join_all(
            Participant::ALL
                .iter()
                .map(|p| create_genesis(*p, &params.genesis, miner, clock)),
        )
        .await?;

        let chains = Participant::ALL
            .iter()
            .zip(genesis)
            .map(|(p, block)| {
                let chain = Chain::with_genesis(
                    ChainScope::Ledger(*p),
                    params.chain.clone(),
                    miner.bus().clone(),
                    block,
                );
                (*p, SharedChain::new(chain))
            })
            .collect();

        Ok(Self {
            chains,
            book: Mutex::new(TransferBook {
                balances: Balances::new(params.initial_balance),
                pool: Vec::new(),
            }),
            bus: miner.bus().clone(),
        })
    }

    pub fn chain(&self, participant: Participant) -> Result<&SharedChain, LedgerError> {
        self.chains
            .get(&participant)
            .ok_or_else(|| LedgerError::UnknownParticipant(participant.to_string()))
    }

    pub fn append(&self, participant: Participant) -> Result<Block, LedgerError> {
        Ok(self.chain(participant)?.append())
    }

    /// Edit data on one participant's chain; the edited block and its
    /// descendants are reset and flagged invalid until re-mined
    pub fn edit_data(
        &self,
        participant: Participant,
        index: usize,
        data: impl Into<String>,
    ) -> Result<usize, LedgerError> {
        let data = data.into();
        self.chain(participant)?.with(|chain| {
            let reset = chain.edit_data(index, data)?;
            chain.mark_invalid_from(index, true);
            Ok::<_, LedgerError>(reset)
        })
    }

    pub async fn mine_block(
        &self,
        participant: Participant,
        index: usize,
        miner: &Miner,
        clock: &dyn Clock,
    ) -> Result<Block, LedgerError> {
        Ok(self.chain(participant)?.mine_block(index, miner, clock).await?)
    }

    /// Stop the search running on one participant's block, if any
    pub fn cancel_mining(&self, participant: Participant, index: usize) -> Result<bool, LedgerError> {
        Ok(self.chain(participant)?.cancel_mining(index)?)
    }

    /// Parse, check against balances and queue a transfer
    pub fn submit_transfer(&self, line: &str) -> Result<Transfer, LedgerError> {
        let transfer: Transfer = line.parse()?;
        {
            let mut book = self.book.lock();
            book.balances.apply(&transfer)?;
            book.pool.push(transfer);
        }
        tracing::info!(%transfer, "transfer queued");
        self.bus.publish(LabEvent::TransferQueued {
            from: transfer.from,
            to: transfer.to,
            amount: transfer.amount,
        });
        Ok(transfer)
    }

    pub fn balances(&self) -> Balances {
        self.book.lock().balances.clone()
    }

    pub fn pool(&self) -> Vec<Transfer> {
        self.book.lock().pool.clone()
    }

    /// Take every queued transfer
    pub fn drain_pool(&self) -> Vec<Transfer> {
        std::mem::take(&mut self.book.lock().pool)
    }

    /// Append a block to `participant`'s chain carrying the queued transfers.
    /// The pool is emptied; the block still has to be mined.
    pub fn record_pool(&self, participant: Participant) -> Result<Block, LedgerError> {
        let chain = self.chain(participant)?;
        let transfers = {
            let mut book = self.book.lock();
            if book.pool.is_empty() {
                return Err(LedgerError::EmptyPool);
            }
            std::mem::take(&mut book.pool)
        };
        let data = render_pool(&transfers);
        let block = chain.with(|c| -> Result<Block, ChainError> {
            let index = c.append().index;
            c.edit_data(index, data)?;
            c.block(index).cloned()
        })?;
        Ok(block)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let book = self.book.lock();
        LedgerSnapshot {
            chains: self
                .chains
                .iter()
                .map(|(p, c)| (*p, c.snapshot()))
                .collect(),
            balances: book.balances.clone(),
            pool: book.pool.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SENTINEL_FINGERPRINT;
    use crate::clock::{FixedClock, SystemClock};
    use crate::digest::sha256_hex;
    use crate::errors::TransferError;
    use crate::pow::{DifficultyPattern, PreimageVersion};

    fn params() -> LedgerParams {
        LedgerParams {
            chain: ChainParams {
                pattern: DifficultyPattern::new("00").unwrap(),
                batch_size: 128,
                preimage: PreimageVersion::V1,
            },
            genesis: GenesisParams {
                pattern: DifficultyPattern::new("00").unwrap(),
                ..GenesisParams::default()
            },
            initial_balance: 100,
        }
    }

    fn miner() -> Miner {
        Miner::sha256(Some(4), EventBus::default()).unwrap()
    }

    #[tokio::test]
    async fn every_participant_gets_a_valid_genesis() {
        let miner = miner();
        let ledger = MultiLedger::new(&params(), &miner, &SystemClock::default())
            .await
            .unwrap();
        for p in Participant::ALL {
            let snap = ledger.chain(p).unwrap().snapshot();
            assert_eq!(snap.blocks.len(), 1);
            let g = &snap.blocks[0];
            assert_eq!(g.previous_fingerprint, SENTINEL_FINGERPRINT);
            assert!(g.seal_holds(PreimageVersion::V1, &params().genesis.pattern, sha256_hex));
        }
        // Divergence between participants is allowed, not asserted either way.
    }

    #[tokio::test]
    async fn participants_diverge_independently() {
        let miner = miner();
        let clock = FixedClock("t".into());
        let ledger = MultiLedger::new(&params(), &miner, &clock).await.unwrap();

        ledger.append(Participant::A).unwrap();
        ledger.edit_data(Participant::A, 1, "A only").unwrap();
        ledger.mine_block(Participant::A, 1, &miner, &clock).await.unwrap();

        let snap = ledger.snapshot();
        assert_eq!(snap.chains[&Participant::A].blocks.len(), 2);
        assert_eq!(snap.chains[&Participant::B].blocks.len(), 1);
        assert_eq!(snap.chains[&Participant::C].blocks.len(), 1);
    }

    #[tokio::test]
    async fn edits_flag_blocks_invalid_until_remined() {
        let miner = miner();
        let clock = FixedClock("t".into());
        let ledger = MultiLedger::new(&params(), &miner, &clock).await.unwrap();

        ledger.edit_data(Participant::B, 0, "rewritten genesis").unwrap();
        let g = ledger.chain(Participant::B).unwrap().snapshot().blocks[0].clone();
        assert!(g.invalid);
        assert!(!g.is_mined());

        let g = ledger.mine_block(Participant::B, 0, &miner, &clock).await.unwrap();
        assert!(!g.invalid);
        assert!(g.fingerprint.starts_with("00"));
    }

    #[tokio::test]
    async fn unmined_predecessor_blocks_mining() {
        let miner = miner();
        let clock = FixedClock("t".into());
        let ledger = MultiLedger::new(&params(), &miner, &clock).await.unwrap();
        ledger.edit_data(Participant::C, 0, "x").unwrap();
        ledger.append(Participant::C).unwrap();
        let err = ledger
            .mine_block(Participant::C, 1, &miner, &clock)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Chain(ChainError::StalePredecessor { index: 1, previous: 0 })
        );
    }

    #[tokio::test]
    async fn transfers_update_balances_and_land_in_a_block() {
        let miner = miner();
        let clock = FixedClock("t".into());
        let ledger = MultiLedger::new(&params(), &miner, &clock).await.unwrap();

        ledger.submit_transfer("A -> B: 40").unwrap();
        ledger.submit_transfer("B -> C: 10").unwrap();
        let err = ledger.submit_transfer("A -> C: 61").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transfer(TransferError::InsufficientBalance { .. })
        ));

        let balances = ledger.balances();
        assert_eq!(balances.get(Participant::A), 60);
        assert_eq!(balances.get(Participant::B), 130);
        assert_eq!(balances.get(Participant::C), 110);

        let block = ledger.record_pool(Participant::A).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.data, "A -> B: 40\nB -> C: 10");
        assert!(ledger.pool().is_empty());
        assert_eq!(ledger.record_pool(Participant::A).unwrap_err(), LedgerError::EmptyPool);

        let mined = ledger.mine_block(Participant::A, 1, &miner, &clock).await.unwrap();
        let genesis = ledger.chain(Participant::A).unwrap().snapshot().blocks[0].clone();
        assert_eq!(mined.previous_fingerprint, genesis.fingerprint);
    }

    #[test]
    fn participant_names_parse() {
        assert_eq!("b".parse::<Participant>().unwrap(), Participant::B);
        assert!(matches!(
            "D".parse::<Participant>(),
            Err(LedgerError::UnknownParticipant(_))
        ));
    }
}
