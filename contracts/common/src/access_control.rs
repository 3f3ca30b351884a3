//! Access Control Module
//!
//! Role-based capability checks for the savings and rewards engines.
//! Engines receive an `AccessControl` trait object at construction, so the
//! registry can be swapped for a fake in tests.
//!
//! ## Key Features
//!
//! - **Module Registry**: governor and savings-manager grants, editable by the governor
//! - **Local Roles**: poker and rewards distributor are stored by each engine
//!   and checked with `require_account`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{MstableError, MstableResult};
use crate::types::{is_zero_address, Address};

// ============================================================================
// Types
// ============================================================================

/// Protocol roles
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum Role {
    /// Sets parameters, connectors and emergency actions
    Governor,
    /// Deposits interest into the savings contract
    SavingsManager,
    /// Triggers connector rebalancing
    Poker,
    /// Funds reward periods
    RewardsDistributor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Governor => "governor",
            Role::SavingsManager => "savings manager",
            Role::Poker => "poker",
            Role::RewardsDistributor => "rewards distributor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability check consulted before privileged operations
pub trait AccessControl: fmt::Debug {
    /// True when `account` holds `role`
    fn has_role(&self, role: Role, account: &Address) -> bool;

    fn is_governor(&self, account: &Address) -> bool {
        self.has_role(Role::Governor, account)
    }

    fn is_savings_manager(&self, account: &Address) -> bool {
        self.has_role(Role::SavingsManager, account)
    }
}

/// Role table shared by protocol modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ModuleRegistry {
    grants: BTreeMap<Role, BTreeSet<Address>>,
}

impl ModuleRegistry {
    /// Create a registry governed by `governor`
    pub fn new(governor: Address) -> Self {
        let mut grants = BTreeMap::new();
        grants.insert(Role::Governor, BTreeSet::from([governor]));
        Self { grants }
    }

    /// Builder-style grant of the savings-manager role
    pub fn with_savings_manager(mut self, manager: Address) -> Self {
        self.grants
            .entry(Role::SavingsManager)
            .or_default()
            .insert(manager);
        self
    }

    /// Grant `role` to `account` (governor only)
    pub fn grant(&mut self, caller: &Address, role: Role, account: Address) -> MstableResult<()> {
        require_role(&*self, Role::Governor, caller)?;
        if is_zero_address(&account) {
            return Err(MstableError::InvalidAddress { reason: "cannot grant a role to the zero address" });
        }
        self.grants.entry(role).or_default().insert(account);
        info!(role = %role, "role granted");
        Ok(())
    }

    /// Revoke `role` from `account` (governor only)
    pub fn revoke(&mut self, caller: &Address, role: Role, account: &Address) -> MstableResult<()> {
        require_role(&*self, Role::Governor, caller)?;
        if let Some(holders) = self.grants.get_mut(&role) {
            holders.remove(account);
        }
        info!(role = %role, "role revoked");
        Ok(())
    }

    /// Accounts currently holding `role`
    pub fn holders(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.grants.get(&role).into_iter().flat_map(|set| set.iter())
    }
}

impl AccessControl for ModuleRegistry {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.grants
            .get(&role)
            .map_or(false, |holders| holders.contains(account))
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Fail unless `caller` holds `role` in `access`
pub fn require_role(access: &dyn AccessControl, role: Role, caller: &Address) -> MstableResult<()> {
    if access.has_role(role, caller) {
        Ok(())
    } else {
        Err(MstableError::Unauthorized { role, caller: *caller })
    }
}

/// Fail unless `caller` is the account stored for a local role
pub fn require_account(expected: &Address, role: Role, caller: &Address) -> MstableResult<()> {
    if expected == caller {
        Ok(())
    } else {
        Err(MstableError::Unauthorized { role, caller: *caller })
    }
}

// ============================================================================
// Tests
// ============================================================================
