//! Yield Connectors
//!
//! A connector holds part of the savings contract's idle collateral in an
//! external yield source. The savings contract only relies on the narrow
//! interface below and verifies the reported balance on every poke.

use std::fmt;

use tracing::debug;

use mstable_common::{
    errors::MstableResult,
    ledger::FungibleLedger,
    types::{is_zero_address, Address, Amount},
    MstableError,
};

/// Pluggable yield source
///
/// Balances live on the underlying ledger, so every call receives it.
/// `savings` is the savings contract's own account, the only one a
/// connector accepts deposits from and pays withdrawals to.
pub trait YieldConnector: fmt::Debug {
    /// Account holding the connector's funds
    fn address(&self) -> Address;

    /// Savings contract this connector serves
    fn savings(&self) -> Address;

    /// Pull `amount` from `savings` (the caller approves beforehand)
    fn deposit(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        savings: &Address,
        amount: Amount,
    ) -> MstableResult<()>;

    /// Return `amount` to `savings`
    fn withdraw(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        savings: &Address,
        amount: Amount,
    ) -> MstableResult<()>;

    /// Return everything to `savings`
    fn withdraw_all(&mut self, underlying: &mut dyn FungibleLedger, savings: &Address) -> MstableResult<()>;

    /// Value currently attributable to `savings`
    fn check_balance(&self, underlying: &dyn FungibleLedger) -> Amount;
}

/// Connector that parks funds in its own ledger account
///
/// Any yield credited to that account (for example by a lending market
/// paying out) shows up in `check_balance` on the next poke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConnector {
    address: Address,
    savings: Address,
}

impl LedgerConnector {
    /// Bind a connector account to one savings contract
    pub fn new(address: Address, savings: Address) -> MstableResult<Self> {
        if is_zero_address(&address) || is_zero_address(&savings) {
            return Err(MstableError::InvalidAddress { reason: "connector accounts must be non-zero" });
        }
        Ok(Self { address, savings })
    }

    fn require_savings(&self, savings: &Address) -> MstableResult<()> {
        if *savings != self.savings {
            return Err(MstableError::InvalidAddress { reason: "connector is bound to another savings contract" });
        }
        Ok(())
    }
}

impl YieldConnector for LedgerConnector {
    fn address(&self) -> Address {
        self.address
    }

    fn savings(&self) -> Address {
        self.savings
    }

    fn deposit(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        savings: &Address,
        amount: Amount,
    ) -> MstableResult<()> {
        self.require_savings(savings)?;
        underlying.transfer_from(&self.address, savings, &self.address, amount)?;
        debug!(amount, "connector deposit");
        Ok(())
    }

    fn withdraw(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        savings: &Address,
        amount: Amount,
    ) -> MstableResult<()> {
        self.require_savings(savings)?;
        underlying.transfer(&self.address, savings, amount)?;
        debug!(amount, "connector withdrawal");
        Ok(())
    }

    fn withdraw_all(&mut self, underlying: &mut dyn FungibleLedger, savings: &Address) -> MstableResult<()> {
        self.require_savings(savings)?;
        let balance = underlying.balance_of(&self.address);
        if balance > 0 {
            underlying.transfer(&self.address, savings, balance)?;
        }
        debug!(amount = balance, "connector drained");
        Ok(())
    }

    fn check_balance(&self, underlying: &dyn FungibleLedger) -> Amount {
        underlying.balance_of(&self.address)
    }
}
