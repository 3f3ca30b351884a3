//! Vesting Tranches
//!
//! Every checkpoint that accrues locked rewards appends a tranche that
//! vests linearly over the same span as the accrual, shifted by the lockup.
//! Tranches are append-only and claimed left to right; a user's claim
//! checkpoint only moves forward.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use mstable_common::{
    errors::{MstableError, MstableResult, StateErrorReason},
    math::{safe_add, safe_mul},
    types::{Amount, Timestamp},
};

/// Locked rewards released at `rate` per second over `[start, finish]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RewardTranche {
    pub start: Timestamp,
    pub finish: Timestamp,
    pub rate: u128,
}

impl RewardTranche {
    /// Amount vested between the claim checkpoint and `now`
    fn vested_since(&self, last_claim: Timestamp, now: Timestamp) -> MstableResult<Amount> {
        let from = self.start.max(last_claim);
        let to = self.finish.min(now);
        safe_mul(u128::from(to.saturating_sub(from)), self.rate)
    }
}

/// Range of tranches with anything left to claim
///
/// `first` is the last tranche starting before the claim checkpoint,
/// `last` the last tranche starting before `now` (both default to 0).
pub fn unclaimed_range(tranches: &[RewardTranche], last_claim: Timestamp, now: Timestamp) -> (usize, usize) {
    let first = tranches.partition_point(|t| t.start < last_claim).saturating_sub(1);
    let last = tranches.partition_point(|t| t.start < now).saturating_sub(1);
    (first, last)
}

/// Vested amount in `tranches[first..=last]` and the new claim checkpoint
pub fn unclaimed_in_range(
    tranches: &[RewardTranche],
    last_claim: Timestamp,
    now: Timestamp,
    first: usize,
    last: usize,
) -> MstableResult<(Amount, Timestamp)> {
    // Nothing has started vesting yet
    if first == 0 && last == 0 && tranches.first().map_or(true, |t| now <= t.start) {
        return Ok((0, now));
    }

    if first > last || last >= tranches.len() {
        return Err(MstableError::InvalidState { reason: StateErrorReason::InvalidEpoch });
    }
    if first > 0 && last_claim < tranches[first - 1].finish {
        return Err(MstableError::InvalidState { reason: StateErrorReason::InvalidFirstArg });
    }

    let mut amount: Amount = 0;
    for tranche in &tranches[first..=last] {
        if now <= tranche.start || last_claim > tranche.finish {
            return Err(MstableError::InvalidState { reason: StateErrorReason::InvalidEpoch });
        }
        amount = safe_add(amount, tranche.vested_since(last_claim, now)?)?;
    }

    Ok((amount, now.min(tranches[last].finish)))
}
