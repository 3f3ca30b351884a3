//! Fungible Ledger Interface
//!
//! The value-transfer surface both engines consume: the underlying asset,
//! the reward tokens and the engines' own receipt units all satisfy it.
//!
//! ## Key Features
//!
//! - **ERC20 Semantics**: balances, allowances, `transfer` and `transfer_from`
//! - **Zero-Address Guards**: transfers to or from the null account fail
//! - **Request Validation**: shared pre-checks for transfer requests

use crate::errors::{AmountErrorReason, MstableError, MstableResult};
use crate::types::{is_zero_address, Address, Amount};

// ============================================================================
// Types
// ============================================================================

/// ERC20-like ledger consumed by the engines
///
/// `transfer` moves units out of `from`; the engines only ever pass an
/// account they control (their own address or a derived sub-account).
pub trait FungibleLedger {
    fn balance_of(&self, account: &Address) -> Amount;

    fn total_supply(&self) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> MstableResult<()>;

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> MstableResult<()>;

    /// Move units from `from` to `to` using the allowance granted to `spender`
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> MstableResult<()>;
}

/// Transfer request checked before touching balances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn new(from: Address, to: Address, amount: Amount) -> Self {
        Self { from, to, amount }
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Validate endpoints and funds for a transfer
pub fn validate_transfer(request: &TransferRequest, available: Amount) -> MstableResult<()> {
    if is_zero_address(&request.from) {
        return Err(MstableError::InvalidAddress { reason: "transfer from the zero address" });
    }
    if is_zero_address(&request.to) {
        return Err(MstableError::InvalidAddress { reason: "transfer to the zero address" });
    }
    if available < request.amount {
        return Err(MstableError::InsufficientBalance {
            available,
            requested: request.amount,
        });
    }
    Ok(())
}

/// Validate that `spender` may move `amount` on the owner's behalf
pub fn validate_allowance(allowance: Amount, amount: Amount) -> MstableResult<()> {
    if allowance < amount {
        return Err(MstableError::InsufficientAllowance {
            available: allowance,
            requested: amount,
        });
    }
    Ok(())
}

/// Reject zero amounts at the API boundary of the engines
pub fn require_non_zero(amount: Amount) -> MstableResult<()> {
    if amount == 0 {
        return Err(MstableError::InvalidAmount {
            amount,
            reason: AmountErrorReason::Zero,
        });
    }
    Ok(())
}
