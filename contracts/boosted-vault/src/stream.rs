//! Reward Streams
//!
//! A stream pays `reward_rate` tokens per second until `period_finish`,
//! shared pro rata by the stream's supply. Accrual is tracked as a running
//! reward-per-token sum so each staker only needs the value at their last
//! checkpoint.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use mstable_common::{
    constants::precision::FULL_SCALE,
    errors::{MstableError, MstableResult},
    math::{mul_div, safe_add, safe_mul},
    types::{Amount, Timestamp},
};

/// Accumulator of one reward token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RewardStream {
    /// Tokens released per second
    pub reward_rate: u128,
    /// End of the current period
    pub period_finish: Timestamp,
    /// Time `reward_per_token_stored` was last brought up to date
    pub last_update_time: Timestamp,
    /// Rewards per staked unit since the vault started, 1e18 scale
    pub reward_per_token_stored: u128,
}

impl RewardStream {
    pub fn last_time_reward_applicable(&self, now: Timestamp) -> Timestamp {
        now.min(self.period_finish)
    }

    /// Current reward-per-token for a stream shared by `supply`
    pub fn reward_per_token(&self, now: Timestamp, supply: Amount) -> MstableResult<u128> {
        let elapsed = self.last_time_reward_applicable(now).saturating_sub(self.last_update_time);
        if elapsed == 0 || supply == 0 {
            return Ok(self.reward_per_token_stored);
        }
        let released = safe_mul(self.reward_rate, u128::from(elapsed))?;
        if released == 0 {
            return Ok(self.reward_per_token_stored);
        }
        safe_add(self.reward_per_token_stored, mul_div(released, FULL_SCALE, supply)?)
    }

    /// Store a freshly computed reward-per-token
    pub fn checkpoint(&mut self, reward_per_token: u128, now: Timestamp) {
        self.reward_per_token_stored = reward_per_token;
        self.last_update_time = self.last_time_reward_applicable(now);
    }

    /// Start a new period funded with `amount` plus whatever is left
    ///
    /// The caller checkpoints the stream first.
    pub fn notify(&mut self, amount: Amount, now: Timestamp, duration: u64) -> MstableResult<()> {
        if duration == 0 {
            return Err(MstableError::DivisionByZero);
        }
        let leftover = if now < self.period_finish {
            safe_mul(u128::from(self.period_finish - now), self.reward_rate)?
        } else {
            0
        };

        self.reward_rate = safe_add(amount, leftover)? / u128::from(duration);
        self.last_update_time = now;
        self.period_finish = now.checked_add(duration).ok_or(MstableError::Overflow)?;
        Ok(())
    }

    /// Tokens released over one full period at the current rate
    pub fn reward_for_duration(&self, duration: u64) -> MstableResult<Amount> {
        safe_mul(self.reward_rate, u128::from(duration))
    }
}
