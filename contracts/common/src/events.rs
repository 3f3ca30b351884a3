//! Protocol Events
//!
//! Events are recorded during execution and can be indexed off-chain.
//! Argument lists mirror the public event signatures of the savings contract,
//! the boosted vaults and the credit/reward token ledgers.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Savings Events (0x01 - 0x1F)
    ExchangeRateUpdated = 0x01,
    SavingsDeposited = 0x02,
    CreditsRedeemed = 0x03,
    Referral = 0x04,
    Poked = 0x05,
    PokedRaw = 0x06,
    ConnectorUpdated = 0x07,
    FractionUpdated = 0x08,
    PokerUpdated = 0x09,
    AutomaticInterestCollectionSwitched = 0x0A,
    EmergencyUpdate = 0x0B,

    // Vault Events (0x20 - 0x3F)
    Staked = 0x20,
    Withdrawn = 0x21,
    RewardAdded = 0x22,
    RewardPaid = 0x23,
    BoostPoked = 0x24,
    RewardsDistributorUpdated = 0x25,

    // Token Events (0x40 - 0x5F)
    Transfer = 0x40,
    Approval = 0x41,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum MstableEvent {
    // ============ Savings Events ============

    /// Exchange rate changed
    ExchangeRateUpdated { new_exchange_rate: u128, interest_collected: Amount },

    /// Underlying deposited and credits issued
    SavingsDeposited { saver: Address, savings_deposited: Amount, credits_issued: Amount },

    /// Credits burned and underlying paid out
    CreditsRedeemed { redeemer: Address, credits_redeemed: Amount, savings_credited: Amount },

    /// Deposit made on behalf of a referrer
    Referral { referrer: Address, beneficiary: Address, amount: Amount },

    /// Connector balance rebalanced to its target
    Poked { old_balance: Amount, new_balance: Amount, interest_detected: Amount },

    /// Rate refreshed without a connector
    PokedRaw,

    /// Active connector changed (zero when cleared)
    ConnectorUpdated { connector: Address },

    /// Connector fraction changed
    FractionUpdated { fraction: u128 },

    /// Poker role moved
    PokerUpdated { poker: Address },

    /// Savings-manager interest collection toggled
    AutomaticInterestCollectionSwitched { automation_enabled: bool },

    /// Emergency withdrawal completed
    EmergencyUpdate,

    // ============ Vault Events ============

    /// Tokens staked for `user`, paid by `payer`
    Staked { user: Address, amount: Amount, payer: Address },

    /// Raw stake withdrawn
    Withdrawn { user: Address, amount: Amount },

    /// New reward period funded
    RewardAdded { reward: Amount, platform_reward: Option<Amount> },

    /// Rewards transferred to a user
    RewardPaid { user: Address, reward: Amount, platform_reward: Option<Amount> },

    /// Boost recomputed for a user
    BoostPoked { user: Address },

    /// Funding account changed
    RewardsDistributorUpdated { distributor: Address },

    // ============ Token Events ============

    /// Units moved (zero `from` for mints, zero `to` for burns)
    Transfer { from: Address, to: Address, value: Amount },

    /// Allowance set
    Approval { owner: Address, spender: Address, value: Amount },
}

impl MstableEvent {
    /// Get the event type
    pub fn event_type(&self) -> EventType {
        match self {
            Self::ExchangeRateUpdated { .. } => EventType::ExchangeRateUpdated,
            Self::SavingsDeposited { .. } => EventType::SavingsDeposited,
            Self::CreditsRedeemed { .. } => EventType::CreditsRedeemed,
            Self::Referral { .. } => EventType::Referral,
            Self::Poked { .. } => EventType::Poked,
            Self::PokedRaw => EventType::PokedRaw,
            Self::ConnectorUpdated { .. } => EventType::ConnectorUpdated,
            Self::FractionUpdated { .. } => EventType::FractionUpdated,
            Self::PokerUpdated { .. } => EventType::PokerUpdated,
            Self::AutomaticInterestCollectionSwitched { .. } => {
                EventType::AutomaticInterestCollectionSwitched
            }
            Self::EmergencyUpdate => EventType::EmergencyUpdate,
            Self::Staked { .. } => EventType::Staked,
            Self::Withdrawn { .. } => EventType::Withdrawn,
            Self::RewardAdded { .. } => EventType::RewardAdded,
            Self::RewardPaid { .. } => EventType::RewardPaid,
            Self::BoostPoked { .. } => EventType::BoostPoked,
            Self::RewardsDistributorUpdated { .. } => EventType::RewardsDistributorUpdated,
            Self::Transfer { .. } => EventType::Transfer,
            Self::Approval { .. } => EventType::Approval,
        }
    }

    /// Serialize event to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EventLog {
    events: Vec<MstableEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: MstableEvent) {
        self.events.push(event);
    }

    /// Move every event of `other` to the end of this log
    pub fn append(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Get all events
    pub fn events(&self) -> &[MstableEvent] {
        &self.events
    }

    /// Most recent event
    pub fn last(&self) -> Option<&MstableEvent> {
        self.events.last()
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<MstableEvent> {
        self.events
    }

    /// Remove and return all events, leaving the log empty
    pub fn drain(&mut self) -> Vec<MstableEvent> {
        std::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&MstableEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = MstableEvent::Staked { user: [1u8; 32], amount: 100, payer: [2u8; 32] };
        assert_eq!(event.event_type(), EventType::Staked);
        assert_eq!(MstableEvent::PokedRaw.event_type(), EventType::PokedRaw);
    }

    #[test]
    fn test_event_serialization() {
        let event = MstableEvent::RewardPaid {
            user: [3u8; 32],
            reward: 1_000,
            platform_reward: Some(25),
        };

        let bytes = event.to_bytes();
        let restored = MstableEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        log.emit(MstableEvent::FractionUpdated { fraction: 0 });
        log.emit(MstableEvent::ConnectorUpdated { connector: [0u8; 32] });
        log.emit(MstableEvent::FractionUpdated { fraction: 1 });

        assert_eq!(log.len(), 3);
        assert!(log.has_events());
        assert_eq!(log.filter_by_type(EventType::FractionUpdated).len(), 2);

        let mut other = EventLog::new();
        other.emit(MstableEvent::EmergencyUpdate);
        log.append(other);
        assert_eq!(log.last(), Some(&MstableEvent::EmergencyUpdate));

        let drained = log.drain();
        assert_eq!(drained.len(), 4);
        assert!(log.is_empty());
    }
}
