//! Voting-Balance Oracle
//!
//! Read-only source of governance voting weight used by the boost curve.

use std::{collections::BTreeMap, fmt};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use mstable_common::types::{Address, Amount};

pub trait VotingBalanceOracle: fmt::Debug {
    /// Current voting weight of `account`
    fn balance_of(&self, account: &Address) -> Amount;
}

/// Oracle for vaults without governance weight: everyone has zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoVotingPower;

impl VotingBalanceOracle for NoVotingPower {
    fn balance_of(&self, _account: &Address) -> Amount {
        0
    }
}

/// Voting weights kept in a table, updated by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VotingBalanceTable {
    balances: BTreeMap<Address, Amount>,
}

impl VotingBalanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, account: Address, weight: Amount) {
        if weight == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, weight);
        }
    }
}

impl VotingBalanceOracle for VotingBalanceTable {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}
