//! Vault Configuration
//!
//! Both vault flavours share one engine; they differ only in the numbers
//! below. `VaultConfig::savings_vault` is the single-reward vault used for
//! staked savings credits, `VaultConfig::dual_vault` adds the platform
//! token stream.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use mstable_common::{
    constants::{
        boost::{dual, single, DEFAULT_PRICE_COEFF},
        precision::FULL_SCALE,
        rewards::{DUAL_UNLOCK, DURATION, LOCKUP, MAX_FUNDING, SINGLE_UNLOCK},
    },
    errors::{MstableError, MstableResult},
    types::{is_zero_address, Address},
};

/// Label of the sub-account holding platform tokens between notifications
pub const PLATFORM_VENDOR_LABEL: &str = "platform-token-vendor";

/// Deepest square-root chain `pow_scaled` is asked for
const MAX_ROOT_DEPTH: u32 = 8;

// ============ Boost Config ============

/// Parameters of the boost curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BoostConfig {
    pub min_boost: u128,
    pub max_boost: u128,
    /// Constant term added before clamping
    pub floor: u128,
    /// Voting-weight multiplier, applied as `coeff / 10`
    pub coeff: u128,
    /// Exponent numerator, exponent is `numerator / 2^root_depth`
    pub exponent_numerator: u32,
    pub exponent_root_depth: u32,
    /// Voting weight above this counts as this
    pub max_voting_weight: Option<u128>,
    /// Converts staked units into their underlying value
    pub price_coeff: u128,
}

impl BoostConfig {
    pub fn single() -> Self {
        Self {
            min_boost: single::MIN_BOOST,
            max_boost: single::MAX_BOOST,
            floor: single::FLOOR,
            coeff: single::COEFF,
            exponent_numerator: single::EXPONENT_NUMERATOR,
            exponent_root_depth: single::EXPONENT_ROOT_DEPTH,
            max_voting_weight: None,
            price_coeff: DEFAULT_PRICE_COEFF,
        }
    }

    pub fn dual() -> Self {
        Self {
            min_boost: dual::MIN_BOOST,
            max_boost: dual::MAX_BOOST,
            floor: dual::FLOOR,
            coeff: dual::COEFF,
            exponent_numerator: dual::EXPONENT_NUMERATOR,
            exponent_root_depth: dual::EXPONENT_ROOT_DEPTH,
            max_voting_weight: Some(dual::MAX_VOTING_WEIGHT),
            price_coeff: DEFAULT_PRICE_COEFF,
        }
    }

    pub fn validate(&self) -> MstableResult<()> {
        if self.min_boost == 0 || self.min_boost > self.max_boost {
            return Err(MstableError::InvalidConfig { reason: "boost bounds must satisfy 0 < min <= max" });
        }
        if self.exponent_root_depth > MAX_ROOT_DEPTH || self.exponent_numerator == 0 {
            return Err(MstableError::InvalidConfig { reason: "unsupported boost exponent" });
        }
        if self.price_coeff == 0 {
            return Err(MstableError::InvalidConfig { reason: "price coefficient must be positive" });
        }
        Ok(())
    }
}

// ============ Vault Config ============

/// Static parameters of a boosted vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultConfig {
    /// The vault's own account on the staking and reward ledgers
    pub address: Address,
    /// Share of each accrual paid out immediately
    pub unlock_fraction: u128,
    /// Length of one reward period
    pub duration: u64,
    /// Delay before locked rewards start vesting
    pub lockup: u64,
    /// Largest single funding accepted
    pub max_funding: u128,
    /// Stream a second token weighted by raw stake
    pub platform_rewards: bool,
    pub boost: BoostConfig,
}

impl VaultConfig {
    /// Single-reward vault for staked savings credits
    pub fn savings_vault(address: Address) -> Self {
        Self {
            address,
            unlock_fraction: SINGLE_UNLOCK,
            duration: DURATION,
            lockup: LOCKUP,
            max_funding: MAX_FUNDING,
            platform_rewards: false,
            boost: BoostConfig::single(),
        }
    }

    /// Vault with an extra, fully unlocked platform reward stream
    pub fn dual_vault(address: Address) -> Self {
        Self {
            address,
            unlock_fraction: DUAL_UNLOCK,
            duration: DURATION,
            lockup: LOCKUP,
            max_funding: MAX_FUNDING,
            platform_rewards: true,
            boost: BoostConfig::dual(),
        }
    }

    pub fn validate(&self) -> MstableResult<()> {
        if is_zero_address(&self.address) {
            return Err(MstableError::InvalidAddress { reason: "vault address must be non-zero" });
        }
        if self.unlock_fraction > FULL_SCALE {
            return Err(MstableError::InvalidConfig { reason: "unlock fraction above 100%" });
        }
        if self.duration == 0 {
            return Err(MstableError::InvalidConfig { reason: "reward duration must be positive" });
        }
        self.boost.validate()
    }
}
