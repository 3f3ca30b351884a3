//! Core Types
//!
//! Account identifiers, amounts, timestamps and the call envelope that every
//! state-mutating operation receives.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 32-byte account identifier
pub type Address = [u8; 32];

/// Token amount in base units (18 decimals)
pub type Amount = u128;

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// The null account
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Returns true for the null account
pub fn is_zero_address(address: &Address) -> bool {
    *address == ZERO_ADDRESS
}

/// Derive a deterministic account from a human-readable label
pub fn address_from_label(label: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    let result = hasher.finalize();
    let mut address = [0u8; 32];
    address.copy_from_slice(&result);
    address
}

/// Derive a sub-account owned by `parent`
pub fn derive_address(parent: &Address, label: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(parent);
    hasher.update(label.as_bytes());
    let result = hasher.finalize();
    let mut address = [0u8; 32];
    address.copy_from_slice(&result);
    address
}

/// Caller and clock reading for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Call {
    /// Account invoking the operation
    pub caller: Address,
    /// Block timestamp sampled when the call started
    pub timestamp: Timestamp,
}

impl Call {
    pub fn new(caller: Address, timestamp: Timestamp) -> Self {
        Self { caller, timestamp }
    }
}
