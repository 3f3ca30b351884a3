//! Savings Manager
//!
//! Source of interest for the savings contract. Before deposits and
//! redemptions the contract asks its manager to collect; whatever the
//! manager stages is pulled in through the same path as `deposit_interest`.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mstable_common::{
    errors::{MstableError, MstableResult},
    ledger::FungibleLedger,
    types::{is_zero_address, Address, Amount, Timestamp},
};

/// Interest source polled by the savings contract
pub trait SavingsManager: fmt::Debug {
    /// Account that holds the staged interest and the savings-manager role
    fn address(&self) -> Address;

    /// Stage pending interest and approve `savings` to pull it
    ///
    /// Returns the staged amount (zero when nothing is pending).
    fn collect_and_distribute_interest(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        savings: &Address,
        now: Timestamp,
    ) -> MstableResult<Amount>;
}

/// Manager that forwards its whole ledger balance as interest
///
/// Anything credited to the manager account (platform fees, lending
/// income) becomes interest on the next collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InterestSweeper {
    address: Address,
    /// Time of the last non-empty collection
    pub last_collection: Timestamp,
    /// Total interest forwarded so far
    pub total_collected: Amount,
}

impl InterestSweeper {
    pub fn new(address: Address) -> MstableResult<Self> {
        if is_zero_address(&address) {
            return Err(MstableError::InvalidAddress { reason: "savings manager must be non-zero" });
        }
        Ok(Self {
            address,
            last_collection: 0,
            total_collected: 0,
        })
    }
}

impl SavingsManager for InterestSweeper {
    fn address(&self) -> Address {
        self.address
    }

    fn collect_and_distribute_interest(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        savings: &Address,
        now: Timestamp,
    ) -> MstableResult<Amount> {
        let pending = underlying.balance_of(&self.address);
        if pending == 0 {
            return Ok(0);
        }

        underlying.approve(&self.address, savings, pending)?;
        self.last_collection = now;
        self.total_collected = self.total_collected.saturating_add(pending);
        debug!(amount = pending, "interest staged for collection");
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mstable_token::{TokenLedger, TokenMetadata};

    fn manager_account() -> Address {
        [7u8; 32]
    }

    fn savings() -> Address {
        [5u8; 32]
    }

    #[test]
    fn test_nothing_pending() {
        let mut underlying = TokenLedger::new(TokenMetadata::new("mStable USD", "mUSD", 18));
        let mut sweeper = InterestSweeper::new(manager_account()).unwrap();

        let staged = sweeper
            .collect_and_distribute_interest(&mut underlying, &savings(), 100)
            .unwrap();
        assert_eq!(staged, 0);
        assert_eq!(sweeper.last_collection, 0);
    }

    #[test]
    fn test_stages_balance_and_approves() {
        let mut underlying = TokenLedger::new(TokenMetadata::new("mStable USD", "mUSD", 18));
        underlying.mint(&manager_account(), 42).unwrap();
        let mut sweeper = InterestSweeper::new(manager_account()).unwrap();

        let staged = sweeper
            .collect_and_distribute_interest(&mut underlying, &savings(), 100)
            .unwrap();
        assert_eq!(staged, 42);
        assert_eq!(underlying.allowance(&manager_account(), &savings()), 42);
        assert_eq!(sweeper.total_collected, 42);
        assert_eq!(sweeper.last_collection, 100);
    }

    #[test]
    fn test_zero_address_rejected() {
        assert!(matches!(
            InterestSweeper::new([0u8; 32]),
            Err(MstableError::InvalidAddress { .. })
        ));
    }
}
