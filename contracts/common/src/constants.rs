//! Protocol Constants
//!
//! All magic numbers for the savings engine and the boosted reward vaults.
//! Fixed-point values use an 18-decimal scale (`1e18 == 100%` / `1.0`).

/// Fixed-point precision
pub mod precision {
    /// 1.0 in 18-decimal fixed point
    pub const FULL_SCALE: u128 = 1_000_000_000_000_000_000;
}

/// Time units, in seconds
pub mod time {
    pub const ONE_MINUTE: u64 = 60;
    pub const ONE_HOUR: u64 = 60 * ONE_MINUTE;
    pub const ONE_DAY: u64 = 24 * ONE_HOUR;
    pub const ONE_WEEK: u64 = 7 * ONE_DAY;
    /// 365 days
    pub const ONE_YEAR: u64 = 365 * ONE_DAY;
}

/// Savings exchange-rate engine parameters
pub mod savings {
    use super::precision::FULL_SCALE;
    use super::time::{ONE_HOUR, ONE_MINUTE};

    /// Credits start at 0.1 underlying units each
    pub const INITIAL_EXCHANGE_RATE: u128 = FULL_SCALE / 10;

    /// Upper bound for the share of collateral held by a connector (50%)
    pub const MAX_FRACTION: u128 = FULL_SCALE / 2;

    /// Share of collateral targeted for the connector after construction (20%)
    pub const DEFAULT_FRACTION: u128 = FULL_SCALE / 5;

    /// Extra share the connector may hold before a redemption forces a rebalance (20%)
    pub const CONNECTOR_HEADROOM: u128 = FULL_SCALE / 5;

    /// Minimum interval between two pokes
    pub const POKE_CADENCE: u64 = 4 * ONE_HOUR;

    /// Highest extrapolated APY a connector may report (400%)
    pub const MAX_APY: u128 = 4 * FULL_SCALE;

    /// Below this interval the APY is not extrapolated
    pub const SHORT_COLLECTION_WINDOW: u64 = 30 * ONE_MINUTE;

    /// Largest increase accepted inside the short window (10 bps)
    pub const MAX_SHORT_WINDOW_INCREASE: u128 = FULL_SCALE / 1_000;
}

/// Boosted reward vault parameters
pub mod rewards {
    use super::precision::FULL_SCALE;
    use super::time::ONE_WEEK;

    /// Length of one funded reward period
    pub const DURATION: u64 = ONE_WEEK;

    /// Delay before locked rewards start vesting
    pub const LOCKUP: u64 = 26 * ONE_WEEK;

    /// Sanity ceiling on a single funding (one million units)
    pub const MAX_FUNDING: u128 = 1_000_000 * FULL_SCALE;

    /// Unlocked share of each accrual in the single-reward vault (20%)
    pub const SINGLE_UNLOCK: u128 = FULL_SCALE / 5;

    /// Unlocked share of each accrual in the dual-reward vault (33%)
    pub const DUAL_UNLOCK: u128 = 330_000_000_000_000_000;
}

/// Boost curve presets
pub mod boost {
    use super::precision::FULL_SCALE;

    /// Default price coefficient (one staking unit is worth 0.1 units of account)
    pub const DEFAULT_PRICE_COEFF: u128 = FULL_SCALE / 10;

    /// Single-reward vault
    pub mod single {
        use super::FULL_SCALE;

        pub const MIN_BOOST: u128 = FULL_SCALE / 2;
        pub const MAX_BOOST: u128 = 3 * FULL_SCALE / 2;
        pub const FLOOR: u128 = MIN_BOOST;
        pub const COEFF: u128 = 60;
        /// Exponent 7/8
        pub const EXPONENT_NUMERATOR: u32 = 7;
        pub const EXPONENT_ROOT_DEPTH: u32 = 3;
    }

    /// Dual-reward vault
    pub mod dual {
        use super::FULL_SCALE;

        pub const MIN_BOOST: u128 = FULL_SCALE;
        pub const MAX_BOOST: u128 = 3 * FULL_SCALE;
        pub const FLOOR: u128 = 980_000_000_000_000_000;
        pub const COEFF: u128 = 9;
        /// Exponent 3/4
        pub const EXPONENT_NUMERATOR: u32 = 3;
        pub const EXPONENT_ROOT_DEPTH: u32 = 2;
        /// Voting weight above this cap earns no extra boost
        pub const MAX_VOTING_WEIGHT: u128 = 600_000 * FULL_SCALE;
    }
}

/// Credit token metadata
pub mod credits {
    pub const NAME: &str = "Interest bearing mUSD";
    pub const SYMBOL: &str = "imUSD";
    pub const DECIMALS: u8 = 18;
}
