//! Rate Limiter Module
//!
//! Minimum-interval gate for periodic maintenance operations such as the
//! savings contract's connector poke.
//!
//! ## Key Features
//!
//! - **Strict Cadence**: an action is allowed once more than `min_interval`
//!   seconds passed since the last recorded one
//! - **Governance Override**: privileged paths can bypass the cadence while
//!   still recording the action time

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{MstableError, MstableResult};
use crate::types::Timestamp;

// ============================================================================
// Types
// ============================================================================

/// Tracks the last execution of a rate-limited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CadenceLimiter {
    /// Seconds that must strictly elapse between actions
    pub min_interval: u64,
    /// Time of the last recorded action (0 if never)
    pub last_action: Timestamp,
}

impl CadenceLimiter {
    /// Create a limiter that has never fired
    pub fn new(min_interval: u64) -> Self {
        Self {
            min_interval,
            last_action: 0,
        }
    }

    /// Seconds since the last recorded action
    pub fn elapsed(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.last_action)
    }

    /// True when an action at `now` would pass the cadence check
    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.elapsed(now) > self.min_interval
    }

    /// Check the cadence (unless `ignore_cadence`) and record `now`
    ///
    /// Returns the seconds elapsed since the previous action.
    pub fn check_and_record(&mut self, now: Timestamp, ignore_cadence: bool) -> MstableResult<u64> {
        let elapsed = self.elapsed(now);
        if !ignore_cadence && elapsed <= self.min_interval {
            return Err(MstableError::RateLimited {
                elapsed,
                required: self.min_interval,
            });
        }
        self.last_action = now;
        Ok(elapsed)
    }
}
