//! Boost Curve
//!
//! A staker's boost grows with voting weight and shrinks with the value of
//! the stake:
//!
//! `boost = floor + (voting * coeff / 10) / scaled^exponent`
//!
//! clamped to `[min_boost, max_boost]`. Stakes worth less than one unit or
//! stakers without voting weight get `min_boost`.

use mstable_common::{
    constants::precision::FULL_SCALE,
    errors::MstableResult,
    math::{mul_div, mul_truncate, pow_scaled, safe_add, safe_mul},
    types::Amount,
};

use crate::config::BoostConfig;

/// Boost multiplier (1e18 scale) for `raw` staked with `voting` weight
pub fn compute_boost(config: &BoostConfig, raw: Amount, voting: Amount) -> MstableResult<u128> {
    let scaled = mul_truncate(raw, config.price_coeff)?;
    if scaled < FULL_SCALE || voting == 0 {
        return Ok(config.min_boost);
    }

    let voting = config.max_voting_weight.map_or(voting, |cap| voting.min(cap));
    let numerator = safe_mul(voting, config.coeff)? / 10;
    let denominator = pow_scaled(scaled, config.exponent_numerator, config.exponent_root_depth)?;
    let boost = safe_add(config.floor, mul_div(numerator, FULL_SCALE, denominator)?)?;

    Ok(boost.clamp(config.min_boost, config.max_boost))
}

/// Balance counted towards the reward stream
pub fn boosted_balance(raw: Amount, boost: u128) -> MstableResult<Amount> {
    mul_truncate(raw, boost)
}
