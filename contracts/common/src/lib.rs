//! mStable Common Library
//!
//! Shared types, constants, and utilities for the savings exchange-rate
//! engine and the boosted reward vaults.
//!
//! ## Execution Model
//!
//! Both engines are in-process accounting cores:
//! - **Serialized calls**: one state-mutating call completes before the next
//! - **Explicit clock**: every call carries its own timestamp (`Call`)
//! - **All-or-nothing**: a failed call leaves engine state untouched
//! - **Injected collaborators**: ledgers, connectors, oracles and access
//!   control are trait objects supplied by the host
//!
//! ## Modules
//!
//! - **Constants**: fixed-point scale, time units, savings and boost parameters
//! - **Errors**: `MstableError` with stable codes
//! - **Math**: 256-bit mul/div, fixed-point square root and fractional powers
//! - **Events**: `MstableEvent` and the `EventLog` collector
//! - **Access Control**: `AccessControl` trait and the `ModuleRegistry`
//! - **Rate Limiter**: minimum-interval gate used by the poke
//! - **Ledger**: the `FungibleLedger` interface

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod access_control;
pub mod rate_limiter;
pub mod ledger;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use access_control::*;
pub use rate_limiter::*;
pub use ledger::*;
