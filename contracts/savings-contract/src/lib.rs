//! Savings Contract
//!
//! Interest-bearing savings on top of an underlying stablecoin. Deposits
//! mint credits at the current exchange rate; interest raises the rate so
//! each credit redeems for more underlying over time.
//!
//! ## Key Features
//!
//! - **Credits**: an embedded fungible ledger (`imUSD`) that can be
//!   transferred, approved and staked in a boosted vault
//! - **Exchange rate**: starts at 0.1 and only rises, except when an
//!   emergency withdrawal writes off a connector
//! - **Yield connector**: an optional fraction (at most 50%) of the held
//!   underlying is parked with an external yield source; every poke checks
//!   the reported balance before the gain is socialised
//! - **Atomic calls**: each mutator works on a copy of the state and only
//!   commits it when the whole call succeeds

use std::mem;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub mod connector;
pub mod manager;


pub use connector::{LedgerConnector, YieldConnector};
pub use manager::{InterestSweeper, SavingsManager};

use mstable_common::{
    access_control::{require_account, require_role, AccessControl, Role},
    constants::{
        credits,
        precision::FULL_SCALE,
        savings::{
            CONNECTOR_HEADROOM, DEFAULT_FRACTION, INITIAL_EXCHANGE_RATE, MAX_APY, MAX_FRACTION,
            MAX_SHORT_WINDOW_INCREASE, POKE_CADENCE, SHORT_COLLECTION_WINDOW,
        },
        time::ONE_YEAR,
    },
    errors::{AmountErrorReason, MstableError, MstableResult, RateViolationReason, StateErrorReason},
    events::{EventLog, MstableEvent},
    ledger::{require_non_zero, validate_allowance, validate_transfer, FungibleLedger, TransferRequest},
    math::{div_precisely, mul_div, mul_truncate, safe_add, safe_sub},
    rate_limiter::CadenceLimiter,
    types::{is_zero_address, Address, Amount, Call, Timestamp, ZERO_ADDRESS},
};
use mstable_token::{TokenLedger, TokenMetadata};

// ============ Conversions ============

/// Credits minted for `amount` underlying at `exchange_rate`
///
/// One extra unit is added so the credits always redeem for at least the
/// deposited amount.
pub fn underlying_to_credits(amount: Amount, exchange_rate: u128) -> MstableResult<Amount> {
    safe_add(mul_div(amount, FULL_SCALE, exchange_rate)?, 1)
}

/// Underlying owed for `credits` at `exchange_rate`, rounded down
pub fn credits_to_underlying(credits: Amount, exchange_rate: u128) -> MstableResult<Amount> {
    mul_truncate(credits, exchange_rate)
}

/// Exchange rate at which `total_credits` are backed by `collateral`
pub fn calc_exchange_rate(collateral: Amount, total_credits: Amount) -> MstableResult<u128> {
    mul_div(collateral, FULL_SCALE, safe_sub(total_credits, 1)?)
}

// ============ Savings Config ============

/// Static parameters of a savings contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SavingsConfig {
    /// The contract's own account on the underlying ledger
    pub address: Address,
    /// Rate before any interest arrives
    pub initial_exchange_rate: u128,
    /// Ceiling for the connector fraction
    pub max_fraction: u128,
    /// Seconds that must pass between two pokes
    pub poke_cadence: u64,
    /// Extra share the connector may hold before a redemption forces a poke
    pub connector_headroom: u128,
    /// Highest extrapolated APY a connector may report
    pub max_apy: u128,
    /// Collections closer together than this are checked by raw increase
    pub short_collection_window: u64,
    /// Highest raw increase accepted inside the short window
    pub max_short_window_increase: u128,
}

impl SavingsConfig {
    /// Protocol defaults for the contract at `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            initial_exchange_rate: INITIAL_EXCHANGE_RATE,
            max_fraction: MAX_FRACTION,
            poke_cadence: POKE_CADENCE,
            connector_headroom: CONNECTOR_HEADROOM,
            max_apy: MAX_APY,
            short_collection_window: SHORT_COLLECTION_WINDOW,
            max_short_window_increase: MAX_SHORT_WINDOW_INCREASE,
        }
    }

    pub fn validate(&self) -> MstableResult<()> {
        if is_zero_address(&self.address) {
            return Err(MstableError::InvalidAddress { reason: "savings contract address must be non-zero" });
        }
        if self.initial_exchange_rate == 0 {
            return Err(MstableError::InvalidConfig { reason: "initial exchange rate must be positive" });
        }
        if self.max_fraction > FULL_SCALE {
            return Err(MstableError::InvalidConfig { reason: "max fraction above 100%" });
        }
        if self.max_apy == 0 || self.max_short_window_increase == 0 {
            return Err(MstableError::InvalidConfig { reason: "yield ceilings must be positive" });
        }
        Ok(())
    }
}

// ============ Savings State ============

/// Mutable accounting of one savings contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SavingsState {
    /// Underlying per credit, 1e18 scale
    pub exchange_rate: u128,
    /// Share of collateral targeted for the connector
    pub fraction: u128,
    /// Connector balance recorded at the last poke
    pub last_balance: Amount,
    /// Poke cadence and the time of the last poke
    pub cadence: CadenceLimiter,
    /// Account allowed to poke
    pub poker: Address,
    /// Collect from the savings manager before deposits and redemptions
    pub automate_interest_collection: bool,
    /// Latest timestamp seen by the contract
    pub last_timestamp: Timestamp,
    /// Credit balances
    pub credits: TokenLedger,
}

impl SavingsState {
    fn new(config: &SavingsConfig, poker: Address) -> Self {
        Self {
            exchange_rate: config.initial_exchange_rate,
            fraction: DEFAULT_FRACTION.min(config.max_fraction),
            last_balance: 0,
            cadence: CadenceLimiter::new(config.poke_cadence),
            poker,
            automate_interest_collection: true,
            last_timestamp: 0,
            credits: TokenLedger::new(TokenMetadata::new(credits::NAME, credits::SYMBOL, credits::DECIMALS)),
        }
    }
}

// ============ Savings Contract ============

/// Savings exchange-rate engine
#[derive(Debug)]
pub struct SavingsContract {
    config: SavingsConfig,
    access: Box<dyn AccessControl>,
    state: SavingsState,
    connector: Option<Box<dyn YieldConnector>>,
    manager: Option<Box<dyn SavingsManager>>,
    /// Connector balance after funds moved in the current call
    connector_sync: Option<Amount>,
    events: EventLog,
}

impl SavingsContract {
    pub fn new(config: SavingsConfig, access: Box<dyn AccessControl>, poker: Address) -> MstableResult<Self> {
        config.validate()?;
        if is_zero_address(&poker) {
            return Err(MstableError::InvalidAddress { reason: "Invalid poker" });
        }
        let state = SavingsState::new(&config, poker);
        Ok(Self {
            config,
            access,
            state,
            connector: None,
            manager: None,
            connector_sync: None,
            events: EventLog::new(),
        })
    }

    /// Attach the interest source polled when automation is on
    pub fn with_savings_manager(mut self, manager: Box<dyn SavingsManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    // ============ Deposits ============

    /// Deposit before any interest has been streamed
    ///
    /// Skips interest collection so early depositors all enter at the
    /// initial rate.
    pub fn pre_deposit(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
        beneficiary: &Address,
    ) -> MstableResult<Amount> {
        self.transact(call, |this, log| {
            if this.state.exchange_rate != this.config.initial_exchange_rate {
                return Err(MstableError::InvalidState { reason: StateErrorReason::StreamingStarted });
            }
            this.deposit_internal(call, underlying, amount, beneficiary, false, log)
        })
    }

    /// Deposit `amount` underlying and mint credits to `beneficiary`
    pub fn deposit_savings(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
        beneficiary: &Address,
    ) -> MstableResult<Amount> {
        self.transact(call, |this, log| {
            this.deposit_internal(call, underlying, amount, beneficiary, true, log)
        })
    }

    /// Deposit and record the referrer
    pub fn deposit_savings_with_referrer(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
        beneficiary: &Address,
        referrer: &Address,
    ) -> MstableResult<Amount> {
        self.transact(call, |this, log| {
            log.emit(MstableEvent::Referral {
                referrer: *referrer,
                beneficiary: *beneficiary,
                amount,
            });
            this.deposit_internal(call, underlying, amount, beneficiary, true, log)
        })
    }

    /// Savings manager deposits interest, raising the exchange rate
    pub fn deposit_interest(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
    ) -> MstableResult<()> {
        self.transact(call, |this, log| this.apply_interest(&call.caller, underlying, amount, log))
    }

    // ============ Redemptions ============

    /// Burn `credits` and receive the underlying they are worth
    ///
    /// Returns the underlying paid out.
    pub fn redeem_credits(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        credits: Amount,
    ) -> MstableResult<Amount> {
        self.transact(call, |this, log| {
            require_non_zero(credits)?;
            let available = this.credit_balance(&call.caller);
            if available < credits {
                return Err(MstableError::InsufficientBalance {
                    available,
                    requested: credits,
                });
            }
            this.collect_interest(call, underlying, log)?;
            let payout = credits_to_underlying(credits, this.state.exchange_rate)?;
            this.redeem_internal(call, underlying, credits, payout, log)?;
            Ok(payout)
        })
    }

    /// Alias of [`SavingsContract::redeem_credits`]
    pub fn redeem(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        credits: Amount,
    ) -> MstableResult<Amount> {
        self.redeem_credits(call, underlying, credits)
    }

    /// Receive exactly `amount` underlying, burning the credits it costs
    ///
    /// Returns the credits burned.
    pub fn redeem_underlying(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
    ) -> MstableResult<Amount> {
        self.transact(call, |this, log| {
            require_non_zero(amount)?;
            this.collect_interest(call, underlying, log)?;
            let credits = underlying_to_credits(amount, this.state.exchange_rate)?;
            this.redeem_internal(call, underlying, credits, amount, log)?;
            Ok(credits)
        })
    }

    // ============ Connector Management ============

    /// Rebalance the connector and refresh the exchange rate
    pub fn poke(&mut self, call: &Call, underlying: &mut dyn FungibleLedger) -> MstableResult<()> {
        self.transact(call, |this, log| {
            require_account(&this.state.poker, Role::Poker, &call.caller)?;
            this.poke_internal(call, underlying, false, 0, log)
        })
    }

    /// Change the share of collateral held by the connector
    pub fn set_fraction(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        fraction: u128,
    ) -> MstableResult<()> {
        self.transact(call, |this, log| {
            require_role(this.access.as_ref(), Role::Governor, &call.caller)?;
            if fraction > this.config.max_fraction {
                return Err(MstableError::InvalidAmount {
                    amount: fraction,
                    reason: AmountErrorReason::TooLarge,
                });
            }

            this.state.fraction = fraction;
            this.poke_internal(call, underlying, true, 0, log)?;
            log.emit(MstableEvent::FractionUpdated { fraction });
            info!(fraction, "connector fraction updated");
            Ok(())
        })
    }

    /// Replace (or clear) the yield connector
    ///
    /// The old connector is drained first, then the new one is filled to
    /// the current fraction. Returns the previous connector.
    pub fn set_connector(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        connector: Option<Box<dyn YieldConnector>>,
    ) -> MstableResult<Option<Box<dyn YieldConnector>>> {
        self.transact(call, move |this, log| {
            require_role(this.access.as_ref(), Role::Governor, &call.caller)?;
            // 1. Validate the replacement before any funds move
            let new_address = match &connector {
                Some(next) if is_zero_address(&next.address()) => {
                    return Err(MstableError::InvalidAddress { reason: "connector address must be non-zero" });
                }
                Some(next) if next.savings() != this.config.address => {
                    return Err(MstableError::InvalidAddress { reason: "connector is bound to another savings contract" });
                }
                Some(next) => next.address(),
                None => ZERO_ADDRESS,
            };

            // 2. Sweep everything out of the current connector
            let fraction = this.state.fraction;
            this.state.fraction = 0;
            this.poke_internal(call, underlying, true, 0, log)?;
            this.state.fraction = fraction;

            // 3. Install and fill the new one
            let previous = mem::replace(&mut this.connector, connector);
            log.emit(MstableEvent::ConnectorUpdated { connector: new_address });
            if let Err(err) = this.poke_internal(call, underlying, true, 0, log) {
                // Keep whichever connector holds the funds
                let stranded = this
                    .connector
                    .as_ref()
                    .map_or(0, |next| next.check_balance(&*underlying));
                if stranded == 0 {
                    this.connector = previous;
                } else {
                    warn!(stranded, connector = ?new_address, "replacement kept after a failed fill");
                }
                return Err(err);
            }

            info!(connector = ?new_address, "connector updated");
            Ok(previous)
        })
    }

    /// Pull `amount` out of the connector and write the rest off
    ///
    /// The connector is removed, the fraction drops to zero and the rate is
    /// refreshed from the held balance without the increase check, so it
    /// may go down. Returns the removed connector.
    pub fn emergency_withdraw(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
    ) -> MstableResult<Box<dyn YieldConnector>> {
        self.transact(call, |this, log| {
            require_role(this.access.as_ref(), Role::Governor, &call.caller)?;
            let mut connector = this
                .connector
                .take()
                .ok_or(MstableError::InvalidState { reason: StateErrorReason::NoConnector })?;

            match this.write_off_connector(underlying, &mut *connector, amount, log) {
                Ok(()) => {
                    warn!(amount, rate = this.state.exchange_rate, "connector written off");
                    Ok(connector)
                }
                Err(err) => {
                    this.connector = Some(connector);
                    Err(err)
                }
            }
        })
    }

    // ============ Governance ============

    pub fn set_poker(&mut self, call: &Call, poker: Address) -> MstableResult<()> {
        self.transact(call, |this, log| {
            require_role(this.access.as_ref(), Role::Governor, &call.caller)?;
            if is_zero_address(&poker) || poker == this.state.poker {
                return Err(MstableError::InvalidAddress { reason: "Invalid poker" });
            }
            this.state.poker = poker;
            log.emit(MstableEvent::PokerUpdated { poker });
            info!(poker = ?poker, "poker updated");
            Ok(())
        })
    }

    pub fn set_automate_interest_collection(&mut self, call: &Call, enabled: bool) -> MstableResult<()> {
        self.transact(call, |this, log| {
            require_role(this.access.as_ref(), Role::Governor, &call.caller)?;
            this.state.automate_interest_collection = enabled;
            log.emit(MstableEvent::AutomaticInterestCollectionSwitched { automation_enabled: enabled });
            info!(enabled, "automatic interest collection switched");
            Ok(())
        })
    }

    // ============ Credit Token ============

    pub fn transfer_credits(&mut self, call: &Call, to: &Address, amount: Amount) -> MstableResult<()> {
        self.transact(call, |this, _| this.state.credits.transfer(&call.caller, to, amount))
    }

    pub fn approve_credits(&mut self, call: &Call, spender: &Address, amount: Amount) -> MstableResult<()> {
        self.transact(call, |this, _| this.state.credits.approve(&call.caller, spender, amount))
    }

    pub fn transfer_credits_from(
        &mut self,
        call: &Call,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> MstableResult<()> {
        self.transact(call, |this, _| {
            this.state.credits.transfer_from(&call.caller, from, to, amount)
        })
    }

    // ============ Views ============

    pub fn config(&self) -> &SavingsConfig {
        &self.config
    }

    pub fn state(&self) -> &SavingsState {
        &self.state
    }

    pub fn exchange_rate(&self) -> u128 {
        self.state.exchange_rate
    }

    pub fn credit_balance(&self, account: &Address) -> Amount {
        self.state.credits.balance_of(account)
    }

    pub fn total_credits(&self) -> Amount {
        self.state.credits.total_supply()
    }

    /// Underlying `account` could redeem right now
    pub fn balance_of_underlying(&self, account: &Address) -> MstableResult<Amount> {
        credits_to_underlying(self.credit_balance(account), self.state.exchange_rate)
    }

    pub fn credits_to_underlying(&self, credits: Amount) -> MstableResult<Amount> {
        credits_to_underlying(credits, self.state.exchange_rate)
    }

    pub fn underlying_to_credits(&self, amount: Amount) -> MstableResult<Amount> {
        underlying_to_credits(amount, self.state.exchange_rate)
    }

    pub fn fraction(&self) -> u128 {
        self.state.fraction
    }

    pub fn last_poke(&self) -> Timestamp {
        self.state.cadence.last_action
    }

    pub fn last_balance(&self) -> Amount {
        self.state.last_balance
    }

    pub fn connector_address(&self) -> Option<Address> {
        self.connector.as_ref().map(|connector| connector.address())
    }

    pub fn poker(&self) -> Address {
        self.state.poker
    }

    pub fn automate_interest_collection(&self) -> bool {
        self.state.automate_interest_collection
    }

    /// Held plus connector balance covers every outstanding credit
    pub fn is_collateral_sufficient(&self, underlying: &dyn FungibleLedger) -> MstableResult<bool> {
        let held = underlying.balance_of(&self.config.address);
        let in_connector = self
            .connector
            .as_ref()
            .map(|connector| connector.check_balance(underlying))
            .unwrap_or(0);
        let owed = credits_to_underlying(self.total_credits(), self.state.exchange_rate)?;
        Ok(safe_add(held, in_connector)? >= owed)
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
    /// Ledger moves come last in every operation; the one exception is the
    /// connector balance, which keeps whatever a failed rebalance moved.
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
        self.connector_sync = None;
        match op(self, &mut log) {
            Ok(value) => {
                self.connector_sync = None;
                drain_credit_events(&mut self.state.credits, &mut log);
                self.state.last_timestamp = call.timestamp;
                self.events.append(log);
                Ok(value)
            }
            Err(err) => {
                self.state = snapshot;
                // Funds that already moved to or from the connector stay moved
                if let Some(balance) = self.connector_sync.take() {
                    self.state.last_balance = balance;
                    warn!(balance, "connector balance kept after a failed call");
                }
                debug!(code = err.code(), "savings call reverted");
                Err(err)
            }
        }
    }

    fn deposit_internal(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
        beneficiary: &Address,
        collect_interest: bool,
        log: &mut EventLog,
    ) -> MstableResult<Amount> {
        // 1. Validate the request
        require_non_zero(amount)?;
        if is_zero_address(beneficiary) {
            return Err(MstableError::InvalidAddress { reason: "Invalid beneficiary address" });
        }

        // 2. The deposit must be pullable before any interest moves
        let savings = self.config.address;
        validate_allowance(underlying.allowance(&call.caller, &savings), amount)?;
        validate_transfer(
            &TransferRequest::new(call.caller, savings, amount),
            underlying.balance_of(&call.caller),
        )?;

        // 3. Bring the rate up to date
        if collect_interest {
            self.collect_interest(call, underlying, log)?;
        }

        // 4. Mint at the current rate, then pull the underlying
        let credits_issued = underlying_to_credits(amount, self.state.exchange_rate)?;
        self.state.credits.mint(beneficiary, credits_issued)?;
        drain_credit_events(&mut self.state.credits, log);
        underlying.transfer_from(&savings, &call.caller, &savings, amount)?;

        log.emit(MstableEvent::SavingsDeposited {
            saver: *beneficiary,
            savings_deposited: amount,
            credits_issued,
        });
        debug!(amount, credits_issued, rate = self.state.exchange_rate, "savings deposited");
        Ok(credits_issued)
    }

    fn redeem_internal(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        credits: Amount,
        payout: Amount,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        // 1. Burn, and make sure the payout is on hand
        let savings = self.config.address;
        self.state.credits.burn(&call.caller, credits)?;
        drain_credit_events(&mut self.state.credits, log);
        let held = underlying.balance_of(&savings);
        if held < payout {
            return Err(MstableError::InsufficientBalance {
                available: held,
                requested: payout,
            });
        }
        log.emit(MstableEvent::CreditsRedeemed {
            redeemer: call.caller,
            credits_redeemed: credits,
            savings_credited: payout,
        });

        // 2. Too much of the remaining collateral sitting in the connector
        let total = credits_to_underlying(self.total_credits(), self.state.exchange_rate)?;
        let limit = mul_truncate(total, safe_add(self.state.fraction, self.config.connector_headroom)?)?;
        let in_connector = total.saturating_sub(held - payout);
        if in_connector > limit {
            self.poke_internal(call, underlying, false, payout, log)?;
        }

        // 3. Pay out
        underlying.transfer(&savings, &call.caller, payout)?;
        debug!(credits, payout, "credits redeemed");
        Ok(())
    }

    fn collect_interest(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        if !self.state.automate_interest_collection {
            return Ok(());
        }
        let Some(manager) = self.manager.as_mut() else {
            return Ok(());
        };

        let manager_address = manager.address();
        let collected = manager.collect_and_distribute_interest(underlying, &self.config.address, call.timestamp)?;
        if collected > 0 {
            self.apply_interest(&manager_address, underlying, collected, log)?;
        }
        Ok(())
    }

    fn apply_interest(
        &mut self,
        caller: &Address,
        underlying: &mut dyn FungibleLedger,
        amount: Amount,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        require_role(self.access.as_ref(), Role::SavingsManager, caller)?;
        require_non_zero(amount)?;

        let total_credits = self.total_credits();
        if total_credits > 0 {
            let collateral = safe_add(credits_to_underlying(total_credits, self.state.exchange_rate)?, amount)?;
            let new_exchange_rate = calc_exchange_rate(collateral, total_credits)?;
            self.state.exchange_rate = new_exchange_rate;
            log.emit(MstableEvent::ExchangeRateUpdated {
                new_exchange_rate,
                interest_collected: amount,
            });
            debug!(amount, rate = new_exchange_rate, "interest deposited");
        }

        let savings = self.config.address;
        underlying.transfer_from(&savings, caller, &savings, amount)?;
        Ok(())
    }

    /// Refresh the rate and move the connector towards its target
    ///
    /// `outflow` is underlying the caller pays out after the poke; it is
    /// not counted as held.
    fn poke_internal(
        &mut self,
        call: &Call,
        underlying: &mut dyn FungibleLedger,
        ignore_cadence: bool,
        outflow: Amount,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        if self.total_credits() == 0 {
            return Err(MstableError::InvalidState { reason: StateErrorReason::NothingToPoke });
        }
        let elapsed = self.state.cadence.check_and_record(call.timestamp, ignore_cadence)?;

        let savings = self.config.address;
        let held = underlying.balance_of(&savings).saturating_sub(outflow);

        let Some(connector) = self.connector.as_ref() else {
            self.state.last_balance = 0;
            self.refresh_exchange_rate(held, false, log)?;
            log.emit(MstableEvent::PokedRaw);
            return Ok(());
        };

        // 1. Verify the reported balance
        let old_balance = self.state.last_balance;
        let balance = connector.check_balance(underlying);
        if balance < old_balance {
            return Err(MstableError::ExchangeRateViolation { reason: RateViolationReason::InvalidYield });
        }
        let interest_detected = balance - old_balance;
        if balance > 0 && old_balance > 0 {
            validate_collection(&self.config, interest_detected, old_balance, elapsed)?;
        }

        // 2. Settle the books before any funds move
        let sum = safe_add(held, balance)?;
        let ideal = mul_truncate(sum, self.state.fraction)?;
        self.state.last_balance = ideal;
        self.refresh_exchange_rate(sum, false, log)?;
        log.emit(MstableEvent::Poked {
            old_balance,
            new_balance: ideal,
            interest_detected,
        });

        // 3. Move funds towards the target
        self.rebalance_connector(underlying, balance, ideal)?;
        debug!(old_balance, new_balance = ideal, interest_detected, "connector poked");
        Ok(())
    }

    /// Deposit into or withdraw from the connector until it holds `ideal`
    ///
    /// Whenever funds moved, the connector's actual balance is recorded so a
    /// failure later in the call cannot restore a stale `last_balance`.
    fn rebalance_connector(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        balance: Amount,
        ideal: Amount,
    ) -> MstableResult<()> {
        let savings = self.config.address;
        let Some(connector) = self.connector.as_mut() else {
            return Ok(());
        };

        let moved = if ideal > balance {
            let shortfall = ideal - balance;
            match underlying.approve(&savings, &connector.address(), shortfall) {
                Ok(()) => connector.deposit(underlying, &savings, shortfall),
                Err(err) => Err(err),
            }
        } else if balance > ideal {
            if ideal == 0 {
                connector.withdraw_all(underlying, &savings)
            } else {
                connector.withdraw(underlying, &savings, balance - ideal)
            }
        } else {
            Ok(())
        };

        let actual = connector.check_balance(underlying);
        if actual != balance {
            self.connector_sync = Some(actual);
        }
        moved?;

        // The connector must hold at least the target
        if actual < ideal {
            return Err(MstableError::ExchangeRateViolation { reason: RateViolationReason::SystemInvariant });
        }
        Ok(())
    }

    fn refresh_exchange_rate(
        &mut self,
        collateral: Amount,
        ignore_validation: bool,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        let total_credits = self.total_credits();
        let credited = credits_to_underlying(total_credits, self.state.exchange_rate)?;
        if !ignore_validation && collateral < credited {
            return Err(MstableError::ExchangeRateViolation { reason: RateViolationReason::RateDecrease });
        }

        let mut new_exchange_rate = calc_exchange_rate(collateral, total_credits)?;
        if !ignore_validation {
            new_exchange_rate = new_exchange_rate.max(self.state.exchange_rate);
        }
        self.state.exchange_rate = new_exchange_rate;
        log.emit(MstableEvent::ExchangeRateUpdated {
            new_exchange_rate,
            interest_collected: collateral.saturating_sub(credited),
        });
        Ok(())
    }

    fn write_off_connector(
        &mut self,
        underlying: &mut dyn FungibleLedger,
        connector: &mut dyn YieldConnector,
        amount: Amount,
        log: &mut EventLog,
    ) -> MstableResult<()> {
        // 1. Settle the books as if `amount` were already back
        let savings = self.config.address;
        log.emit(MstableEvent::ConnectorUpdated { connector: ZERO_ADDRESS });
        self.state.fraction = 0;
        log.emit(MstableEvent::FractionUpdated { fraction: 0 });
        self.state.last_balance = 0;

        if self.total_credits() > 0 {
            let held = safe_add(underlying.balance_of(&savings), amount)?;
            self.refresh_exchange_rate(held, true, log)?;
        }
        log.emit(MstableEvent::EmergencyUpdate);

        // 2. Pull the funds
        connector.withdraw(underlying, &savings, amount)?;
        Ok(())
    }
}

/// Credits are a token in their own right: the boosted vault stakes them
/// through this impl
impl FungibleLedger for SavingsContract {
    fn balance_of(&self, account: &Address) -> Amount {
        self.state.credits.balance_of(account)
    }

    fn total_supply(&self) -> Amount {
        self.state.credits.total_supply()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state.credits.allowance(owner, spender)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> MstableResult<()> {
        self.state.credits.approve(owner, spender, amount)?;
        drain_credit_events(&mut self.state.credits, &mut self.events);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> MstableResult<()> {
        self.state.credits.transfer(from, to, amount)?;
        drain_credit_events(&mut self.state.credits, &mut self.events);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> MstableResult<()> {
        self.state.credits.transfer_from(spender, from, to, amount)?;
        drain_credit_events(&mut self.state.credits, &mut self.events);
        Ok(())
    }
}

/// Surface the credit ledger's Transfer and Approval events in `log`
fn drain_credit_events(credits: &mut TokenLedger, log: &mut EventLog) {
    for event in credits.take_events() {
        log.emit(event);
    }
}

/// Reject connector gains that are too large to be genuine yield
fn validate_collection(
    config: &SavingsConfig,
    interest: Amount,
    last_balance: Amount,
    elapsed: u64,
) -> MstableResult<()> {
    let increase = div_precisely(interest, last_balance)?;
    let years = div_precisely(u128::from(elapsed.max(1)), u128::from(ONE_YEAR))?;
    let apy = div_precisely(increase, years)?;

    let within_limit = if elapsed > config.short_collection_window {
        apy < config.max_apy
    } else {
        increase < config.max_short_window_increase
    };
    if !within_limit {
        return Err(MstableError::ExchangeRateViolation { reason: RateViolationReason::ExcessiveYield });
    }
    Ok(())
}

// ============ Tests ============
