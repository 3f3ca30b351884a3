//! Boosted Reward Vault
//!
//! Stakers share a weekly reward stream in proportion to their boosted
//! balance. Part of every accrual is claimable at once; the rest is locked
//! and vests linearly after a 26-week delay.
//!
//! ## Key Features
//!
//! - **Boost**: governance voting weight multiplies the staked balance
//!   (within preset bounds), diminishing as the stake grows
//! - **Vesting tranches**: locked rewards are recorded per checkpoint and
//!   claimed left to right, either automatically or by explicit range
//! - **Dual rewards**: the dual preset streams a second platform token,
//!   weighted by raw stake and fully unlocked
//! - **Atomic calls**: each mutator works on a copy of the state and only
//!   commits it when the whole call succeeds

use std::{collections::BTreeMap, mem};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod boost;
pub mod config;
pub mod oracle;
pub mod stream;
pub mod tranche;

#[cfg(test)]
mod integration_tests;

pub use boost::{boosted_balance, compute_boost};
pub use config::{BoostConfig, VaultConfig, PLATFORM_VENDOR_LABEL};
pub use oracle::{NoVotingPower, VotingBalanceOracle, VotingBalanceTable};
pub use stream::RewardStream;
pub use tranche::RewardTranche;

use mstable_common::{
    access_control::{require_account, require_role, AccessControl, Role},
    errors::{AmountErrorReason, MstableError, MstableResult, StateErrorReason},
    events::{EventLog, MstableEvent},
    ledger::{require_non_zero, validate_transfer, FungibleLedger, TransferRequest},
    math::{mul_truncate, safe_add, safe_sub},
    types::{derive_address, is_zero_address, Address, Amount, Call, Timestamp},
};

// ============ Vault State ============

/// Per-staker accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UserData {
    /// Tokens staked
    pub raw_balance: Amount,
    /// Stake counted towards the primary stream
    pub boosted_balance: Amount,
    /// Multiplier applied at the last boost update
    pub boost: u128,
    pub reward_per_token_paid: u128,
    /// Unlocked rewards waiting to be claimed
    pub rewards: Amount,
    pub platform_reward_per_token_paid: u128,
    /// Platform rewards waiting to be claimed
    pub platform_rewards: Amount,
    /// Time of the last checkpoint
    pub last_action: Timestamp,
    /// Tranches are vested up to this time
    pub last_claim: Timestamp,
    pub tranches: Vec<RewardTranche>,
}

impl UserData {
    /// Settle accrual since the last checkpoint
    ///
    /// The unlocked share lands in `rewards`, the locked share becomes a new
    /// tranche covering `[last_action, now]` shifted by the lockup.
    fn checkpoint(
        &mut self,
        config: &VaultConfig,
        reward_per_token: u128,
        platform_reward_per_token: Option<u128>,
        now: Timestamp,
    ) -> MstableResult<()> {
        if reward_per_token > self.reward_per_token_paid {
            let earned = mul_truncate(self.boosted_balance, reward_per_token - self.reward_per_token_paid)?;
            if earned > 0 {
                let unlocked = mul_truncate(earned, config.unlock_fraction)?;
                let locked = earned - unlocked;
                if locked > 0 {
                    let elapsed = now.saturating_sub(self.last_action).max(1);
                    self.tranches.push(RewardTranche {
                        start: self.last_action.saturating_add(config.lockup),
                        finish: now.saturating_add(config.lockup),
                        rate: locked / u128::from(elapsed),
                    });
                }
                self.rewards = safe_add(self.rewards, unlocked)?;
                debug!(earned, unlocked, locked, "rewards accrued");
            }
            self.reward_per_token_paid = reward_per_token;
        }

        if let Some(platform_reward_per_token) = platform_reward_per_token {
            if platform_reward_per_token > self.platform_reward_per_token_paid {
                let earned = mul_truncate(
                    self.raw_balance,
                    platform_reward_per_token - self.platform_reward_per_token_paid,
                )?;
                self.platform_rewards = safe_add(self.platform_rewards, earned)?;
                self.platform_reward_per_token_paid = platform_reward_per_token;
            }
        }

        self.last_action = now;
        Ok(())
    }
}

/// Aggregate vault accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultState {
    /// Sum of boosted balances
    pub total_supply: Amount,
    /// Sum of raw balances
    pub total_raw: Amount,
    pub stream: RewardStream,
    /// Present only for dual vaults
    pub platform_stream: Option<RewardStream>,
    pub users: BTreeMap<Address, UserData>,
    /// Account allowed to fund the vault
    pub rewards_distributor: Address,
    /// Latest timestamp seen by the vault
    pub last_timestamp: Timestamp,
}

/// Primary and (dual vaults only) platform amounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RewardAmounts {
    pub reward: Amount,
    pub platform_reward: Option<Amount>,
}

// ============ Vault Context ============

/// Ledgers and oracle the vault works against during one call
pub struct VaultContext<'a> {
    pub staking_token: &'a mut dyn FungibleLedger,
    pub rewards_token: &'a mut dyn FungibleLedger,
    /// Required by dual vaults when funding or paying platform rewards
    pub platform_token: Option<&'a mut dyn FungibleLedger>,
    pub voting: &'a dyn VotingBalanceOracle,
}

impl<'a> VaultContext<'a> {
    pub fn new(
        staking_token: &'a mut dyn FungibleLedger,
        rewards_token: &'a mut dyn FungibleLedger,
        voting: &'a dyn VotingBalanceOracle,
    ) -> Self {
        Self {
            staking_token,
            rewards_token,
            platform_token: None,
            voting,
        }
    }

    pub fn with_platform_token(mut self, platform_token: &'a mut dyn FungibleLedger) -> Self {
        self.platform_token = Some(platform_token);
        self
    }
}

// ============ Boosted Vault ============

#[derive(Debug)]
pub struct BoostedVault {
    config: VaultConfig,
    access: Box<dyn AccessControl>,
    state: VaultState,
    events: EventLog,
}

impl BoostedVault {
    pub fn new(config: VaultConfig, access: Box<dyn AccessControl>, rewards_distributor: Address) -> MstableResult<Self> {
        config.validate()?;
        if is_zero_address(&rewards_distributor) {
            return Err(MstableError::InvalidAddress { reason: "rewards distributor must be non-zero" });
        }
        let state = VaultState {
            total_supply: 0,
            total_raw: 0,
            stream: RewardStream::default(),
            platform_stream: config.platform_rewards.then(RewardStream::default),
            users: BTreeMap::new(),
            rewards_distributor,
            last_timestamp: 0,
        };
        Ok(Self {
            config,
            access,
            state,
            events: EventLog::new(),
        })
    }

    // ============ Staking ============

    pub fn stake(&mut self, call: &Call, ctx: &mut VaultContext<'_>, amount: Amount) -> MstableResult<()> {
        self.stake_for(call, ctx, &call.caller, amount)
    }

    /// Stake the caller's tokens on behalf of `beneficiary`
    pub fn stake_for(
        &mut self,
        call: &Call,
        ctx: &mut VaultContext<'_>,
        beneficiary: &Address,
        amount: Amount,
    ) -> MstableResult<()> {
        self.transact(call, |this, log| {
            // 1. Validate the request
            require_non_zero(amount)?;
            if is_zero_address(beneficiary) {
                return Err(MstableError::InvalidAddress { reason: "Invalid beneficiary address" });
            }

            // 2. Settle accrual at the old balance
            this.update_reward(Some(beneficiary), call.timestamp)?;

            // 3. Credit and re-weight
            let user = this.user_mut(beneficiary);
            user.raw_balance = safe_add(user.raw_balance, amount)?;
            this.state.total_raw = safe_add(this.state.total_raw, amount)?;
            this.set_boost(beneficiary, ctx.voting)?;

            // 4. Pull the stake
            let vault = this.config.address;
            ctx.staking_token.transfer_from(&vault, &call.caller, &vault, amount)?;

            log.emit(MstableEvent::Staked {
                user: *beneficiary,
                amount,
                payer: call.caller,
            });
            debug!(amount, total_raw = this.state.total_raw, "staked");
            Ok(())
        })
    }

    pub fn withdraw(&mut self, call: &Call, ctx: &mut VaultContext<'_>, amount: Amount) -> MstableResult<()> {
        self.transact(call, |this, log| {
            this.withdraw_internal(call, amount, ctx.voting, log)?;
            this.pay(ctx, &call.caller, amount, 0, None, log)?;
            Ok(())
        })
    }

    /// Checkpoint `account` and recompute its boost from current voting weight
    pub fn poke_boost(&mut self, call: &Call, ctx: &mut VaultContext<'_>, account: &Address) -> MstableResult<()> {
        self.transact(call, |this, log| {
            this.update_reward(Some(account), call.timestamp)?;
            this.set_boost(account, ctx.voting)?;
            log.emit(MstableEvent::BoostPoked { user: *account });
            Ok(())
        })
    }

    // ============ Claiming ============

    /// Pay unlocked rewards (and platform rewards) without touching tranches
    pub fn claim_reward(&mut self, call: &Call, ctx: &mut VaultContext<'_>) -> MstableResult<RewardAmounts> {
        self.transact(call, |this, log| {
            let account = call.caller;
            this.update_reward(Some(&account), call.timestamp)?;

            let platform_enabled = this.config.platform_rewards;
            let user = this.user_mut(&account);
            let reward = mem::take(&mut user.rewards);
            let platform_reward = platform_enabled.then(|| mem::take(&mut user.platform_rewards));
            this.pay(ctx, &account, 0, reward, platform_reward, log)
        })
    }

    /// Pay unlocked rewards plus everything vested in the tranches
    pub fn claim_rewards(&mut self, call: &Call, ctx: &mut VaultContext<'_>) -> MstableResult<RewardAmounts> {
        self.transact(call, |this, log| {
            let account = call.caller;
            this.update_reward(Some(&account), call.timestamp)?;
            let (first, last) = this.automatic_range(&account, call.timestamp);
            this.claim_range_internal(call, ctx, first, last, 0, log)
        })
    }

    /// Like [`BoostedVault::claim_rewards`] over an explicit tranche range
    pub fn claim_rewards_range(
        &mut self,
        call: &Call,
        ctx: &mut VaultContext<'_>,
        first: usize,
        last: usize,
    ) -> MstableResult<RewardAmounts> {
        self.transact(call, |this, log| {
            let account = call.caller;
            this.update_reward(Some(&account), call.timestamp)?;
            this.claim_range_internal(call, ctx, first, last, 0, log)
        })
    }

    /// Withdraw the whole stake and claim everything claimable
    pub fn exit(&mut self, call: &Call, ctx: &mut VaultContext<'_>) -> MstableResult<RewardAmounts> {
        self.transact(call, |this, log| {
            let account = call.caller;
            let unstaked = this.withdraw_all_internal(call, ctx.voting, log)?;
            let (first, last) = this.automatic_range(&account, call.timestamp);
            this.claim_range_internal(call, ctx, first, last, unstaked, log)
        })
    }

    pub fn exit_range(
        &mut self,
        call: &Call,
        ctx: &mut VaultContext<'_>,
        first: usize,
        last: usize,
    ) -> MstableResult<RewardAmounts> {
        self.transact(call, |this, log| {
            let unstaked = this.withdraw_all_internal(call, ctx.voting, log)?;
            this.claim_range_internal(call, ctx, first, last, unstaked, log)
        })
    }

    // ============ Funding ============

    /// Start a new reward period with `amount` (plus any leftover)
    ///
    /// Dual vaults also forward their airdropped platform balance to the
    /// platform vendor and stream it over the same period.
    pub fn notify_reward_amount(
        &mut self,
        call: &Call,
        ctx: &mut VaultContext<'_>,
        amount: Amount,
    ) -> MstableResult<()> {
        self.transact(call, |this, log| {
            require_account(&this.state.rewards_distributor, Role::RewardsDistributor, &call.caller)?;
            if amount > this.config.max_funding {
                return Err(MstableError::ExcessiveFunding {
                    amount,
                    maximum: this.config.max_funding,
                });
            }

            let now = call.timestamp;
            this.update_reward(None, now)?;
            this.state.stream.notify(amount, now, this.config.duration)?;

            let vault = this.config.address;
            let platform_reward = match this.state.platform_stream.as_mut() {
                Some(platform_stream) => {
                    let ledger = ctx
                        .platform_token
                        .as_deref()
                        .ok_or(MstableError::InvalidState { reason: StateErrorReason::MissingPlatformLedger })?;
                    let airdropped = ledger.balance_of(&vault);
                    platform_stream.notify(airdropped, now, this.config.duration)?;
                    Some(airdropped)
                }
                None => None,
            };

            // Forward the airdrop once both streams are funded
            let airdropped = platform_reward.unwrap_or(0);
            if airdropped > 0 {
                if let Some(ledger) = ctx.platform_token.as_mut() {
                    let vendor = derive_address(&vault, PLATFORM_VENDOR_LABEL);
                    ledger.transfer(&vault, &vendor, airdropped)?;
                }
            }

            log.emit(MstableEvent::RewardAdded { reward: amount, platform_reward });
            info!(amount, ?platform_reward, period_finish = this.state.stream.period_finish, "reward period funded");
            Ok(())
        })
    }

    pub fn set_rewards_distribution(&mut self, call: &Call, distributor: Address) -> MstableResult<()> {
        self.transact(call, |this, log| {
            require_role(this.access.as_ref(), Role::Governor, &call.caller)?;
            if is_zero_address(&distributor) {
                return Err(MstableError::InvalidAddress { reason: "rewards distributor must be non-zero" });
            }
            this.state.rewards_distributor = distributor;
            log.emit(MstableEvent::RewardsDistributorUpdated { distributor });
            info!(distributor = ?distributor, "rewards distributor updated");
            Ok(())
        })
    }

    // ============ Views ============

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    /// Boosted balance
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.users.get(account).map_or(0, |user| user.boosted_balance)
    }

    pub fn raw_balance_of(&self, account: &Address) -> Amount {
        self.state.users.get(account).map_or(0, |user| user.raw_balance)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.total_supply
    }

    pub fn total_raw(&self) -> Amount {
        self.state.total_raw
    }

    /// Boost applied at the account's last update (0 if never staked)
    pub fn boost(&self, account: &Address) -> u128 {
        self.state.users.get(account).map_or(0, |user| user.boost)
    }

    pub fn rewards_distributor(&self) -> Address {
        self.state.rewards_distributor
    }

    /// Account holding the platform tokens being streamed
    pub fn platform_vendor(&self) -> Address {
        derive_address(&self.config.address, PLATFORM_VENDOR_LABEL)
    }

    pub fn last_time_reward_applicable(&self, now: Timestamp) -> Timestamp {
        self.state.stream.last_time_reward_applicable(now)
    }

    /// Primary and platform reward-per-token at `now`
    pub fn reward_per_token(&self, now: Timestamp) -> MstableResult<(u128, Option<u128>)> {
        let reward_per_token = self.state.stream.reward_per_token(now, self.state.total_supply)?;
        let platform_reward_per_token = match &self.state.platform_stream {
            Some(stream) => Some(stream.reward_per_token(now, self.state.total_raw)?),
            None => None,
        };
        Ok((reward_per_token, platform_reward_per_token))
    }

    /// Claimable without touching tranches: unlocked rewards so far plus
    /// the unlocked share of what has accrued since the last checkpoint
    pub fn earned(&self, account: &Address, now: Timestamp) -> MstableResult<RewardAmounts> {
        let (reward_per_token, platform_reward_per_token) = self.reward_per_token(now)?;
        let Some(user) = self.state.users.get(account) else {
            return Ok(RewardAmounts {
                reward: 0,
                platform_reward: platform_reward_per_token.map(|_| 0),
            });
        };

        let accrued = mul_truncate(
            user.boosted_balance,
            reward_per_token.saturating_sub(user.reward_per_token_paid),
        )?;
        let reward = safe_add(user.rewards, mul_truncate(accrued, self.config.unlock_fraction)?)?;

        let platform_reward = match platform_reward_per_token {
            Some(value) => {
                let accrued = mul_truncate(
                    user.raw_balance,
                    value.saturating_sub(user.platform_reward_per_token_paid),
                )?;
                Some(safe_add(user.platform_rewards, accrued)?)
            }
            None => None,
        };
        Ok(RewardAmounts { reward, platform_reward })
    }

    /// What `claim_rewards` would pay at `now`, with the tranche range used
    pub fn unclaimed_rewards(&self, account: &Address, now: Timestamp) -> MstableResult<(Amount, usize, usize)> {
        let mut user = self.state.users.get(account).cloned().unwrap_or_default();
        let (reward_per_token, platform_reward_per_token) = self.reward_per_token(now)?;
        user.checkpoint(&self.config, reward_per_token, platform_reward_per_token, now)?;

        let (first, last) = tranche::unclaimed_range(&user.tranches, user.last_claim, now);
        let (vested, _) = tranche::unclaimed_in_range(&user.tranches, user.last_claim, now, first, last)?;
        Ok((safe_add(vested, user.rewards)?, first, last))
    }

    pub fn user_data(&self, account: &Address) -> Option<&UserData> {
        self.state.users.get(account)
    }

    pub fn user_tranche(&self, account: &Address, index: usize) -> Option<&RewardTranche> {
        self.state.users.get(account).and_then(|user| user.tranches.get(index))
    }

    pub fn user_tranche_count(&self, account: &Address) -> usize {
        self.state.users.get(account).map_or(0, |user| user.tranches.len())
    }

    /// Rewards released over one full period at the current rates
    pub fn get_reward_for_duration(&self) -> MstableResult<RewardAmounts> {
        let reward = self.state.stream.reward_for_duration(self.config.duration)?;
        let platform_reward = match &self.state.platform_stream {
            Some(stream) => Some(stream.reward_for_duration(self.config.duration)?),
            None => None,
        };
        Ok(RewardAmounts { reward, platform_reward })
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<MstableEvent> {
        self.events.drain()
    }

    // ============ Internal ============

    /// Run `op` all-or-nothing
    ///
    /// State is restored and the call's events are dropped when `op` fails.
    /// Ledgers are not rolled back, so every operation moves tokens last.
    fn transact<T>(
        &mut self,
        call: &Call,
        op: impl FnOnce(&mut Self, &mut EventLog) -> MstableResult<T>,
    ) -> MstableResult<T> {
        if call.timestamp < self.state.last_timestamp {
            return Err(MstableError::InvalidState { reason: StateErrorReason::ClockRegression });
        }

        let snapshot = self.state.clone();
        let mut log = EventLog::new();
        match op(self, &mut log) {
            Ok(value) => {
                self.state.last_timestamp = call.timestamp;
                self.events.append(log);
                Ok(value)
            }
            Err(err) => {
                self.state = snapshot;
                debug!(code = err.code(), "vault call reverted");
                Err(err)
            }
        }
    }

    fn user_mut(&mut self, account: &Address) -> &mut UserData {
        self.state.users.entry(*account).or_default()
    }

    fn automatic_range(&self, account: &Address, now: Timestamp) -> (usize, usize) {
        self.state
            .users
            .get(account)
            .map_or((0, 0), |user| tranche::unclaimed_range(&user.tranches, user.last_claim, now))
    }

    /// Bring both streams up to `now`, then settle `account` if given
    fn update_reward(&mut self, account: Option<&Address>, now: Timestamp) -> MstableResult<()> {
        let (reward_per_token, platform_reward_per_token) = self.reward_per_token(now)?;

        if reward_per_token > 0 || platform_reward_per_token.unwrap_or(0) > 0 {
            self.state.stream.checkpoint(reward_per_token, now);
            if let (Some(stream), Some(value)) = (self.state.platform_stream.as_mut(), platform_reward_per_token) {
                stream.checkpoint(value, now);
            }
        }

        if let Some(account) = account {
            let user = self.state.users.entry(*account).or_default();
            user.checkpoint(&self.config, reward_per_token, platform_reward_per_token, now)?;
        }
        Ok(())
    }

    fn set_boost(&mut self, account: &Address, voting: &dyn VotingBalanceOracle) -> MstableResult<()> {
        let weight = voting.balance_of(account);
        let user = self.state.users.entry(*account).or_default();
        let boost = compute_boost(&self.config.boost, user.raw_balance, weight)?;
        let boosted = boosted_balance(user.raw_balance, boost)?;

        user.boost = boost;
        let previous = mem::replace(&mut user.boosted_balance, boosted);
        self.state.total_supply = safe_add(safe_sub(self.state.total_supply, previous)?, boosted)?;
        debug!(boost, boosted, "boost updated");
        Ok(())
    }

    /// Debit `amount` from the caller's stake; the tokens move in [`Self::pay`]
    fn withdraw_internal(
        &mut self,
        call: &Call,
        amount: Amount,
        voting: &dyn VotingBalanceOracle,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        require_non_zero(amount)?;
        let account = call.caller;
        self.update_reward(Some(&account), call.timestamp)?;

        let user = self.user_mut(&account);
        if amount > user.raw_balance {
            return Err(MstableError::InsufficientBalance {
                available: user.raw_balance,
                requested: amount,
            });
        }
        user.raw_balance -= amount;
        self.state.total_raw = safe_sub(self.state.total_raw, amount)?;
        self.set_boost(&account, voting)?;

        log.emit(MstableEvent::Withdrawn { user: account, amount });
        debug!(amount, total_raw = self.state.total_raw, "withdrawn");
        Ok(())
    }

    fn withdraw_all_internal(
        &mut self,
        call: &Call,
        voting: &dyn VotingBalanceOracle,
        log: &mut EventLog,
    ) -> MstableResult<Amount> {
        let raw = self.raw_balance_of(&call.caller);
        if raw == 0 {
            return Err(MstableError::InvalidAmount {
                amount: 0,
                reason: AmountErrorReason::Zero,
            });
        }
        self.withdraw_internal(call, raw, voting, log)?;
        Ok(raw)
    }

    fn claim_range_internal(
        &mut self,
        call: &Call,
        ctx: &mut VaultContext<'_>,
        first: usize,
        last: usize,
        unstaked: Amount,
        log: &mut EventLog,
    ) -> MstableResult<RewardAmounts> {
        let account = &call.caller;
        let platform_enabled = self.config.platform_rewards;
        let user = self.user_mut(account);
        let (vested, checkpoint) =
            tranche::unclaimed_in_range(&user.tranches, user.last_claim, call.timestamp, first, last)?;
        user.last_claim = checkpoint;
        let reward = safe_add(vested, mem::take(&mut user.rewards))?;
        let platform_reward = platform_enabled.then(|| mem::take(&mut user.platform_rewards));
        self.pay(ctx, account, unstaked, reward, platform_reward, log)
    }

    /// Send `unstaked` staking tokens and the rewards to `account`
    ///
    /// Every leg is checked before the first transfer, so a payout lands
    /// in full or not at all.
    fn pay(
        &self,
        ctx: &mut VaultContext<'_>,
        account: &Address,
        unstaked: Amount,
        reward: Amount,
        platform_reward: Option<Amount>,
        log: &mut EventLog,
    ) -> MstableResult<RewardAmounts> {
        let vault = self.config.address;
        let vendor = self.platform_vendor();
        let platform_paid = platform_reward.unwrap_or(0);

        // 1. Preflight
        validate_transfer(
            &TransferRequest::new(vault, *account, unstaked),
            ctx.staking_token.balance_of(&vault),
        )?;
        validate_transfer(
            &TransferRequest::new(vault, *account, reward),
            ctx.rewards_token.balance_of(&vault),
        )?;
        if platform_paid > 0 {
            let ledger = ctx
                .platform_token
                .as_deref()
                .ok_or(MstableError::InvalidState { reason: StateErrorReason::MissingPlatformLedger })?;
            validate_transfer(&TransferRequest::new(vendor, *account, platform_paid), ledger.balance_of(&vendor))?;
        }

        // 2. Transfer
        if unstaked > 0 {
            ctx.staking_token.transfer(&vault, account, unstaked)?;
        }
        if reward > 0 {
            ctx.rewards_token.transfer(&vault, account, reward)?;
        }
        if platform_paid > 0 {
            if let Some(ledger) = ctx.platform_token.as_mut() {
                ledger.transfer(&vendor, account, platform_paid)?;
            }
        }

        if reward > 0 || platform_paid > 0 {
            log.emit(MstableEvent::RewardPaid {
                user: *account,
                reward,
                platform_reward,
            });
            debug!(reward, platform_paid, "rewards paid");
        }
        Ok(RewardAmounts { reward, platform_reward })
    }
}

// ============ Tests ============
