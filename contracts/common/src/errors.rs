//! Error Types for the Savings and Rewards Engines
//!
//! Typed errors with stable codes. Every failure aborts the whole operation;
//! the engines never retry or auto-correct.

use core::fmt;

use thiserror::Error;

use crate::access_control::Role;
use crate::types::{Address, Amount};

/// Result type alias for protocol operations
pub type MstableResult<T> = Result<T, MstableError>;

/// Main error enum for all protocol errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MstableError {
    // ============ Amount Errors ============
    /// Amount is zero or outside its accepted range
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: AmountErrorReason },

    /// Holder does not own enough units
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Amount, requested: Amount },

    /// Spender was not approved for enough units
    #[error("insufficient allowance: available {available}, requested {requested}")]
    InsufficientAllowance { available: Amount, requested: Amount },

    /// Reward funding above the sanity ceiling
    #[error("funding {amount} exceeds the maximum of {maximum}")]
    ExcessiveFunding { amount: Amount, maximum: Amount },

    // ============ Authorization Errors ============
    /// Caller lacks the required role
    #[error("caller is not the {role}")]
    Unauthorized { role: Role, caller: Address },

    /// Zero or otherwise unusable account
    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },

    // ============ Lifecycle Errors ============
    /// Operation attempted outside its valid lifecycle window
    #[error("invalid state: {reason}")]
    InvalidState { reason: StateErrorReason },

    /// Post-condition on collateral or exchange rate failed
    #[error("exchange rate violation: {reason}")]
    ExchangeRateViolation { reason: RateViolationReason },

    /// Minimum interval between operations not yet elapsed
    #[error("rate limited: {elapsed}s elapsed, more than {required}s required")]
    RateLimited { elapsed: u64, required: u64 },

    /// Configuration rejected at construction
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
}

/// Reasons for invalid amount errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountErrorReason {
    /// Amount is zero when non-zero required
    Zero,
    /// Amount exceeds maximum
    TooLarge,
}

impl fmt::Display for AmountErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("must be greater than zero"),
            Self::TooLarge => f.write_str("above the permitted maximum"),
        }
    }
}

/// Reasons for lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateErrorReason {
    /// Pre-deposits are only accepted before interest has been collected
    StreamingStarted,
    /// Poke requires outstanding credits
    NothingToPoke,
    /// Emergency path requires an active connector
    NoConnector,
    /// Claim range skips unclaimed earlier tranches
    InvalidFirstArg,
    /// Claim range is out of bounds or already claimed
    InvalidEpoch,
    /// Call timestamp is earlier than one already processed
    ClockRegression,
    /// Dual-reward operation without the platform ledger
    MissingPlatformLedger,
}

impl fmt::Display for StateErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::StreamingStarted => "can only use this method before streaming begins",
            Self::NothingToPoke => "must have something to poke",
            Self::NoConnector => "no connector is active",
            Self::InvalidFirstArg => "invalid first arg: must claim earlier entries",
            Self::InvalidEpoch => "invalid epoch",
            Self::ClockRegression => "timestamp moved backwards",
            Self::MissingPlatformLedger => "platform token ledger required",
        };
        f.write_str(text)
    }
}

/// Reasons for exchange-rate violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateViolationReason {
    /// Connector balance fell since the last poke
    InvalidYield,
    /// Connector yield implies an implausible APY
    ExcessiveYield,
    /// Connector holds less than the target after rebalancing
    SystemInvariant,
    /// Held collateral is below what credits are worth
    RateDecrease,
}

impl fmt::Display for RateViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidYield => "invalid yield",
            Self::ExcessiveYield => "interest protected from inflating past max APY",
            Self::SystemInvariant => "enforce system invariant",
            Self::RateDecrease => "exchange rate must increase",
        };
        f.write_str(text)
    }
}

impl MstableError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "E001_INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "E002_INSUFFICIENT_BALANCE",
            Self::InsufficientAllowance { .. } => "E003_INSUFFICIENT_ALLOWANCE",
            Self::ExcessiveFunding { .. } => "E004_EXCESSIVE_FUNDING",
            Self::Unauthorized { .. } => "E010_UNAUTHORIZED",
            Self::InvalidAddress { .. } => "E011_INVALID_ADDRESS",
            Self::InvalidState { .. } => "E020_INVALID_STATE",
            Self::ExchangeRateViolation { .. } => "E021_EXCHANGE_RATE_VIOLATION",
            Self::RateLimited { .. } => "E022_RATE_LIMITED",
            Self::InvalidConfig { .. } => "E030_INVALID_CONFIG",
            Self::Overflow => "E090_OVERFLOW",
            Self::Underflow => "E091_UNDERFLOW",
            Self::DivisionByZero => "E092_DIVISION_BY_ZERO",
        }
    }

    /// Check if the caller can succeed by retrying later or with other inputs
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InsufficientAllowance { .. }
                | Self::RateLimited { .. }
        )
    }
}
