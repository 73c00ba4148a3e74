//! Transfers between participants and the balances they move
//!
//! Syntax is `"A -> B: 10"`. Balances start equal for everyone; a transfer
//! is accepted only if the sender can cover it.

use crate::errors::TransferError;
use crate::ledger::Participant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Participant,
    pub to: Participant,
    pub amount: u64,
}

impl FromStr for Transfer {
    type Err = TransferError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = || TransferError::InvalidSyntax(line.to_string());

        let (from, rest) = line.trim().split_once("->").ok_or_else(invalid)?;
        let (to, amount) = rest.split_once(':').ok_or_else(invalid)?;

        let from = parse_party(from).ok_or_else(invalid)?;
        let to = parse_party(to).ok_or_else(invalid)?;
        let amount = amount.trim();
        if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let amount: u64 = amount.parse().map_err(|_| invalid())?;

        if from == to {
            return Err(TransferError::SelfTransfer(from.to_string()));
        }
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }
        Ok(Transfer { from, to, amount })
    }
}

/// Exactly one uppercase participant letter
fn parse_party(s: &str) -> Option<Participant> {
    match s.trim() {
        "A" => Some(Participant::A),
        "B" => Some(Participant::B),
        "C" => Some(Participant::C),
        _ => None,
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}

/// Coin balance per participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances(BTreeMap<Participant, u64>);

impl Balances {
    pub fn new(initial: u64) -> Self {
        Self(Participant::ALL.iter().map(|p| (*p, initial)).collect())
    }

    pub fn get(&self, participant: Participant) -> u64 {
        self.0.get(&participant).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Participant, u64)> + '_ {
        self.0.iter().map(|(p, b)| (*p, *b))
    }

    /// Move funds; leaves balances untouched on error
    pub fn apply(&mut self, transfer: &Transfer) -> Result<(), TransferError> {
        let available = self.get(transfer.from);
        if available < transfer.amount {
            return Err(TransferError::InsufficientBalance {
                participant: transfer.from.to_string(),
                required: transfer.amount,
                available,
            });
        }
        *self.0.entry(transfer.from).or_insert(0) -= transfer.amount;
        let to = self.0.entry(transfer.to).or_insert(0);
        *to = to.saturating_add(transfer.amount);
        Ok(())
    }
}

/// Render queued transfers as block data, one per line
pub fn render_pool(transfers: &[Transfer]) -> String {
    transfers
        .iter()
        .map(Transfer::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_flexible_spacing() {
        let t: Transfer = "A -> B: 10".parse().unwrap();
        assert_eq!(
            t,
            Transfer {
                from: Participant::A,
                to: Participant::B,
                amount: 10
            }
        );
        let t: Transfer = "C->A:7".parse().unwrap();
        assert_eq!(t.to_string(), "C -> A: 7");
    }

    #[test]
    fn rejects_malformed_lines() {
        for bad in ["", "A -> D: 1", "a -> b: 1", "A -> B", "A -> B: -3", "A -> B: 1.5", "AB -> C: 1"] {
            assert!(
                matches!(bad.parse::<Transfer>(), Err(TransferError::InvalidSyntax(_))),
                "{bad:?} should not parse"
            );
        }
        assert_eq!(
            "B -> B: 5".parse::<Transfer>(),
            Err(TransferError::SelfTransfer("B".into()))
        );
        assert_eq!("A -> C: 0".parse::<Transfer>(), Err(TransferError::ZeroAmount));
    }

    #[test]
    fn balances_move_and_refuse_overdraft() {
        let mut b = Balances::new(100);
        b.apply(&"A -> B: 30".parse().unwrap()).unwrap();
        assert_eq!(b.get(Participant::A), 70);
        assert_eq!(b.get(Participant::B), 130);

        let err = b.apply(&"A -> C: 71".parse().unwrap()).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { available: 70, .. }));
        assert_eq!(b.get(Participant::A), 70);
        assert_eq!(b.get(Participant::C), 100);
    }

    #[test]
    fn pool_renders_one_transfer_per_line() {
        let pool = vec!["A -> B: 1".parse().unwrap(), "B -> C: 2".parse().unwrap()];
        assert_eq!(render_pool(&pool), "A -> B: 1\nB -> C: 2");
    }
}
