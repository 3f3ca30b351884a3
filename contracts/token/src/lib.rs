//! Token Ledger
//!
//! In-memory ERC20-style ledger. It stands in for the underlying asset and
//! the reward tokens, and it is the credit ledger embedded in the savings
//! contract (so credits can be transferred and staked like any token).
//!
//! Mints and burns are not part of `FungibleLedger`; only the owner of the
//! ledger value (the savings contract for credits, a test harness for the
//! underlying) can call them.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::trace;

use mstable_common::{
    errors::{MstableError, MstableResult},
    events::{EventLog, MstableEvent},
    ledger::{validate_allowance, validate_transfer, FungibleLedger, TransferRequest},
    math::{safe_add, safe_sub},
    types::{is_zero_address, Address, Amount, ZERO_ADDRESS},
};

// ============ Token Metadata ============

/// Static token description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}

// ============ Token Ledger ============

/// Balances, allowances and supply of one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TokenLedger {
    /// Name, symbol and decimals
    pub metadata: TokenMetadata,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
    #[serde(skip)]
    #[borsh(skip)]
    events: EventLog,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new(metadata: TokenMetadata) -> Self {
        Self {
            metadata,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: 0,
            events: EventLog::new(),
        }
    }

    /// Create units for `to`
    pub fn mint(&mut self, to: &Address, amount: Amount) -> MstableResult<()> {
        if is_zero_address(to) {
            return Err(MstableError::InvalidAddress { reason: "mint to the zero address" });
        }
        let new_supply = safe_add(self.total_supply, amount)?;
        let new_balance = safe_add(self.balance_of(to), amount)?;

        self.total_supply = new_supply;
        self.set_balance(to, new_balance);
        self.events.emit(MstableEvent::Transfer {
            from: ZERO_ADDRESS,
            to: *to,
            value: amount,
        });
        trace!(symbol = %self.metadata.symbol, amount, "minted");
        Ok(())
    }

    /// Destroy units held by `from`
    pub fn burn(&mut self, from: &Address, amount: Amount) -> MstableResult<()> {
        if is_zero_address(from) {
            return Err(MstableError::InvalidAddress { reason: "burn from the zero address" });
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(MstableError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.total_supply = safe_sub(self.total_supply, amount)?;
        self.set_balance(from, available - amount);
        self.events.emit(MstableEvent::Transfer {
            from: *from,
            to: ZERO_ADDRESS,
            value: amount,
        });
        trace!(symbol = %self.metadata.symbol, amount, "burned");
        Ok(())
    }

    /// Accounts with a non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Events recorded by this ledger
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Remove and return the recorded events
    pub fn take_events(&mut self) -> Vec<MstableEvent> {
        self.events.drain()
    }

    fn set_balance(&mut self, account: &Address, balance: Amount) {
        if balance == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, balance);
        }
    }

    fn move_units(&mut self, from: &Address, to: &Address, amount: Amount) -> MstableResult<()> {
        let request = TransferRequest::new(*from, *to, amount);
        validate_transfer(&request, self.balance_of(from))?;

        let from_balance = self.balance_of(from) - amount;
        self.set_balance(from, from_balance);
        let to_balance = safe_add(self.balance_of(to), amount)?;
        self.set_balance(to, to_balance);

        self.events.emit(MstableEvent::Transfer {
            from: *from,
            to: *to,
            value: amount,
        });
        Ok(())
    }
}

impl FungibleLedger for TokenLedger {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> MstableResult<()> {
        if is_zero_address(owner) || is_zero_address(spender) {
            return Err(MstableError::InvalidAddress { reason: "approve with the zero address" });
        }
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
        self.events.emit(MstableEvent::Approval {
            owner: *owner,
            spender: *spender,
            value: amount,
        });
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> MstableResult<()> {
        self.move_units(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> MstableResult<()> {
        let allowance = self.allowance(from, spender);
        validate_allowance(allowance, amount)?;
        self.move_units(from, to, amount)?;

        // max allowance is treated as infinite
        if allowance != Amount::MAX {
            let remaining = allowance - amount;
            if remaining == 0 {
                self.allowances.remove(&(*from, *spender));
            } else {
                self.allowances.insert((*from, *spender), remaining);
            }
        }
        Ok(())
    }
}

// ============ Tests ============
