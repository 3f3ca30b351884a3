//! Vault scenarios spanning the vault, its reward ledgers, voting weight
//! and the savings credits it stakes.

use super::*;
use mstable_common::{
    access_control::ModuleRegistry,
    constants::{
        precision::FULL_SCALE,
        rewards::{LOCKUP, SINGLE_UNLOCK},
        time::{ONE_DAY, ONE_WEEK},
    },
    events::EventType,
    types::address_from_label,
};
use mstable_savings::{SavingsConfig, SavingsContract};
use mstable_token::{TokenLedger, TokenMetadata};
use proptest::prelude::*;

const UNIT: Amount = FULL_SCALE;
const START: Timestamp = 1_700_000_000;

// ============ Fixtures ============

fn governor() -> Address {
    address_from_label("governor")
}

fn distributor() -> Address {
    address_from_label("rewards-distributor")
}

fn alice() -> Address {
    address_from_label("alice")
}

fn bob() -> Address {
    address_from_label("bob")
}

fn vault_address() -> Address {
    address_from_label("boosted-vault")
}

fn registry() -> Box<ModuleRegistry> {
    Box::new(ModuleRegistry::new(governor()))
}

/// Ledgers and voting weights, kept apart from the vault so a context can
/// borrow them while the vault is borrowed mutably
struct Ledgers {
    staking: TokenLedger,
    rewards: TokenLedger,
    platform: TokenLedger,
    voting: VotingBalanceTable,
    dual: bool,
}

impl Ledgers {
    fn context(&mut self) -> VaultContext<'_> {
        let ctx = VaultContext::new(&mut self.staking, &mut self.rewards, &self.voting);
        if self.dual {
            ctx.with_platform_token(&mut self.platform)
        } else {
            ctx
        }
    }
}

struct Env {
    vault: BoostedVault,
    ledgers: Ledgers,
}

impl Env {
    fn with_config(config: VaultConfig) -> Self {
        let vault = BoostedVault::new(config, registry(), distributor()).unwrap();

        let mut staking = TokenLedger::new(TokenMetadata::new("Interest bearing mUSD", "imUSD", 18));
        for account in [alice(), bob()] {
            staking.mint(&account, 1_000_000 * UNIT).unwrap();
            staking.approve(&account, &vault_address(), Amount::MAX).unwrap();
        }

        let ledgers = Ledgers {
            staking,
            rewards: TokenLedger::new(TokenMetadata::new("Meta", "MTA", 18)),
            platform: TokenLedger::new(TokenMetadata::new("Wrapped Matic", "WMATIC", 18)),
            voting: VotingBalanceTable::new(),
            dual: config.platform_rewards,
        };
        Self { vault, ledgers }
    }

    fn single() -> Self {
        Self::with_config(VaultConfig::savings_vault(vault_address()))
    }

    fn dual() -> Self {
        Self::with_config(VaultConfig::dual_vault(vault_address()))
    }

    fn stake(&mut self, who: Address, amount: Amount, at: Timestamp) {
        let mut ctx = self.ledgers.context();
        self.vault.stake(&Call::new(who, at), &mut ctx, amount).unwrap();
    }

    /// Mint `amount` to the vault and start a period with it
    fn fund(&mut self, amount: Amount, at: Timestamp) {
        self.ledgers.rewards.mint(&vault_address(), amount).unwrap();
        let mut ctx = self.ledgers.context();
        self.vault
            .notify_reward_amount(&Call::new(distributor(), at), &mut ctx, amount)
            .unwrap();
    }

    fn poke(&mut self, account: Address, at: Timestamp) {
        let mut ctx = self.ledgers.context();
        self.vault.poke_boost(&Call::new(bob(), at), &mut ctx, &account).unwrap();
    }
}

// ============ Accrual ============

#[test]
fn test_one_day_of_unlocked_rewards() {
    let mut env = Env::single();
    env.stake(alice(), 100 * UNIT, START);
    assert_eq!(env.vault.balance_of(&alice()), 50 * UNIT);
    env.fund(UNIT, START);

    let now = START + ONE_DAY;
    let (reward_per_token, platform) = env.vault.reward_per_token(now).unwrap();
    assert_eq!(platform, None);
    assert_eq!(
        reward_per_token,
        env.vault.state().stream.reward_rate * u128::from(ONE_DAY) * UNIT / (50 * UNIT)
    );

    let accrued = mul_truncate(50 * UNIT, reward_per_token).unwrap();
    let expected = mul_truncate(accrued, SINGLE_UNLOCK).unwrap();
    assert_eq!(env.vault.earned(&alice(), now).unwrap().reward, expected);
}

#[test]
fn test_refunding_mid_period_rolls_over() {
    let mut env = Env::single();
    let first = 100_000 * UNIT;
    let second = 100_000 * UNIT;

    env.fund(first, START);
    env.stake(alice(), UNIT, START);
    env.fund(second, START + ONE_WEEK / 2);
    assert_eq!(env.vault.state().stream.period_finish, START + ONE_WEEK / 2 + ONE_WEEK);

    let ceiling = mul_truncate(first + second, SINGLE_UNLOCK).unwrap();
    let earned = env.vault.earned(&alice(), START + 2 * ONE_WEEK).unwrap().reward;
    assert!(earned <= ceiling);
    assert!(earned >= ceiling / 10_000 * 9_999, "{} vs {}", earned, ceiling);
}

#[test]
fn test_accrual_split_between_stakers() {
    let mut env = Env::single();
    env.stake(alice(), 100 * UNIT, START);
    env.stake(bob(), 300 * UNIT, START);
    env.fund(UNIT, START);

    let now = START + ONE_WEEK;
    let alice_earned = env.vault.earned(&alice(), now).unwrap().reward;
    let bob_earned = env.vault.earned(&bob(), now).unwrap().reward;
    // bob holds three times the boosted balance
    assert!(bob_earned / 3 <= alice_earned + 1 && alice_earned <= bob_earned / 3 + 1);
}

// ============ Tranches ============

#[test]
fn test_tranches_claimed_in_order() {
    let mut env = Env::single();
    env.stake(alice(), 100 * UNIT, START);
    env.fund(UNIT, START);
    env.poke(alice(), START + ONE_DAY);
    env.poke(alice(), START + 2 * ONE_DAY);

    assert_eq!(env.vault.user_tranche_count(&alice()), 2);
    let first = *env.vault.user_tranche(&alice(), 0).unwrap();
    let second = *env.vault.user_tranche(&alice(), 1).unwrap();
    assert_eq!(first.start, START + LOCKUP);
    assert_eq!(first.finish, START + ONE_DAY + LOCKUP);
    assert_eq!(second.start, first.finish);
    assert_eq!(second.finish, START + 2 * ONE_DAY + LOCKUP);

    let now = START + LOCKUP + 3 * ONE_DAY;
    let call = Call::new(alice(), now);
    let mut ctx = env.ledgers.context();
    let skipped = env.vault.claim_rewards_range(&call, &mut ctx, 1, 1);
    assert!(matches!(
        skipped,
        Err(MstableError::InvalidState { reason: StateErrorReason::InvalidFirstArg })
    ));
    assert_eq!(env.vault.user_tranche_count(&alice()), 2);

    let unlocked = env.vault.earned(&alice(), now).unwrap().reward;
    let mut ctx = env.ledgers.context();
    let paid = env.vault.claim_rewards_range(&call, &mut ctx, 0, 1).unwrap();

    let vested = first.rate * u128::from(ONE_DAY) + second.rate * u128::from(ONE_DAY);
    assert_eq!(paid.reward, vested + unlocked);
    assert_eq!(env.ledgers.rewards.balance_of(&alice()), paid.reward);
    assert_eq!(env.vault.user_data(&alice()).unwrap().last_claim, second.finish);
}

#[test]
fn test_invalid_range_reverts() {
    let mut env = Env::single();
    env.stake(alice(), 100 * UNIT, START);
    env.fund(UNIT, START);
    env.poke(alice(), START + ONE_DAY);

    let call = Call::new(alice(), START + LOCKUP + 2 * ONE_DAY);
    let mut ctx = env.ledgers.context();
    assert!(matches!(
        env.vault.claim_rewards_range(&call, &mut ctx, 0, 5),
        Err(MstableError::InvalidState { reason: StateErrorReason::InvalidEpoch })
    ));
    assert_eq!(env.vault.user_data(&alice()).unwrap().last_claim, 0);
}

#[test]
fn test_full_vesting_pays_the_funding() {
    let mut env = Env::single();
    env.stake(alice(), 100 * UNIT, START);
    env.fund(UNIT, START);
    env.poke(alice(), START + ONE_WEEK);

    let call = Call::new(alice(), START + LOCKUP + ONE_WEEK);
    let mut ctx = env.ledgers.context();
    let paid = env.vault.claim_rewards(&call, &mut ctx).unwrap();

    assert!(paid.reward <= UNIT);
    assert!(paid.reward >= UNIT / 10_000 * 9_999);
    assert_eq!(env.ledgers.rewards.balance_of(&alice()), paid.reward);
    assert_eq!(env.vault.events().filter_by_type(EventType::RewardPaid).len(), 1);
}

#[test]
fn test_unclaimed_matches_claim() {
    let mut env = Env::single();
    env.ledgers.voting.set(alice(), 10 * UNIT);
    env.stake(alice(), 1_000 * UNIT, START);
    env.fund(10 * UNIT, START);
    env.poke(alice(), START + ONE_DAY);
    env.poke(alice(), START + 3 * ONE_DAY);

    let now = START + LOCKUP + 2 * ONE_DAY;
    let (expected, first, last) = env.vault.unclaimed_rewards(&alice(), now).unwrap();
    assert_eq!((first, last), (0, 1));

    let mut ctx = env.ledgers.context();
    let paid = env.vault.claim_rewards(&Call::new(alice(), now), &mut ctx).unwrap();
    assert_eq!(paid.reward, expected);
    assert_eq!(env.vault.unclaimed_rewards(&alice(), now).unwrap().0, 0);
}

#[test]
fn test_exit_before_lockup() {
    let mut env = Env::single();
    env.stake(alice(), 100 * UNIT, START);
    env.fund(UNIT, START);

    let now = START + ONE_WEEK;
    let unlocked = env.vault.earned(&alice(), now).unwrap().reward;
    let mut ctx = env.ledgers.context();
    let paid = env.vault.exit(&Call::new(alice(), now), &mut ctx).unwrap();

    assert_eq!(paid.reward, unlocked);
    assert_eq!(env.vault.raw_balance_of(&alice()), 0);
    assert_eq!(env.vault.total_supply(), 0);
    assert_eq!(env.ledgers.staking.balance_of(&alice()), 1_000_000 * UNIT);
    // the locked share is still owed
    assert_eq!(env.vault.user_tranche_count(&alice()), 1);
}

// ============ Boost ============

#[test]
fn test_poke_boost_is_idempotent() {
    let mut env = Env::single();
    env.ledgers.voting.set(alice(), 50 * UNIT);
    env.stake(alice(), 10_000 * UNIT, START);
    env.fund(UNIT, START);

    env.poke(alice(), START + ONE_DAY);
    let user = env.vault.user_data(&alice()).cloned();
    let supply = env.vault.total_supply();

    env.poke(alice(), START + ONE_DAY);
    assert_eq!(env.vault.user_data(&alice()).cloned(), user);
    assert_eq!(env.vault.total_supply(), supply);
    assert_eq!(env.vault.events().filter_by_type(EventType::BoostPoked).len(), 2);
}

#[test]
fn test_losing_voting_weight_drops_boost() {
    let mut env = Env::single();
    env.ledgers.voting.set(alice(), 1_000 * UNIT);
    env.stake(alice(), 100 * UNIT, START);
    assert_eq!(env.vault.balance_of(&alice()), 150 * UNIT);

    env.ledgers.voting.set(alice(), 0);
    env.poke(alice(), START + 1);
    assert_eq!(env.vault.balance_of(&alice()), 50 * UNIT);
    assert_eq!(env.vault.total_supply(), 50 * UNIT);
}

// ============ Dual Rewards ============

#[test]
fn test_platform_airdrop_moves_to_vendor() {
    let mut env = Env::dual();
    env.stake(alice(), 100 * UNIT, START);
    assert_eq!(env.vault.balance_of(&alice()), 100 * UNIT);

    env.ledgers.platform.mint(&vault_address(), 50 * UNIT).unwrap();
    env.fund(10 * UNIT, START);

    let vendor = env.vault.platform_vendor();
    assert_eq!(env.ledgers.platform.balance_of(&vault_address()), 0);
    assert_eq!(env.ledgers.platform.balance_of(&vendor), 50 * UNIT);
    assert_eq!(
        env.vault.events().last(),
        Some(&MstableEvent::RewardAdded {
            reward: 10 * UNIT,
            platform_reward: Some(50 * UNIT),
        })
    );

    let for_duration = env.vault.get_reward_for_duration().unwrap();
    assert!(for_duration.platform_reward.unwrap() <= 50 * UNIT);
}

#[test]
fn test_dual_claim_pays_both_tokens() {
    let mut env = Env::dual();
    env.stake(alice(), 100 * UNIT, START);
    env.ledgers.platform.mint(&vault_address(), 50 * UNIT).unwrap();
    env.fund(10 * UNIT, START);

    let now = START + ONE_WEEK;
    let earned = env.vault.earned(&alice(), now).unwrap();
    let mut ctx = env.ledgers.context();
    let paid = env.vault.claim_reward(&Call::new(alice(), now), &mut ctx).unwrap();

    assert_eq!(paid, earned);
    let platform_paid = paid.platform_reward.unwrap();
    assert!(platform_paid <= 50 * UNIT && platform_paid >= 50 * UNIT - 1_000_000);
    assert_eq!(env.ledgers.platform.balance_of(&alice()), platform_paid);
    assert_eq!(
        env.ledgers.platform.balance_of(&env.vault.platform_vendor()),
        50 * UNIT - platform_paid
    );
}

#[test]
fn test_platform_stream_weighted_by_raw_stake() {
    let mut env = Env::dual();
    env.ledgers.voting.set(alice(), 100 * UNIT);
    env.stake(alice(), 100 * UNIT, START);
    env.stake(bob(), 100 * UNIT, START);
    assert!(env.vault.balance_of(&alice()) > env.vault.balance_of(&bob()));

    env.ledgers.platform.mint(&vault_address(), 50 * UNIT).unwrap();
    env.fund(10 * UNIT, START);

    let now = START + ONE_WEEK;
    let alice_earned = env.vault.earned(&alice(), now).unwrap();
    let bob_earned = env.vault.earned(&bob(), now).unwrap();
    assert_eq!(alice_earned.platform_reward, bob_earned.platform_reward);
    assert!(alice_earned.reward > bob_earned.reward);
}

#[test]
fn test_dual_vault_needs_platform_ledger() {
    let mut env = Env::dual();
    let call = Call::new(distributor(), START);
    let mut ctx = VaultContext::new(&mut env.ledgers.staking, &mut env.ledgers.rewards, &env.ledgers.voting);
    assert!(matches!(
        env.vault.notify_reward_amount(&call, &mut ctx, UNIT),
        Err(MstableError::InvalidState { reason: StateErrorReason::MissingPlatformLedger })
    ));
    assert_eq!(env.vault.state().stream, RewardStream::default());
}

#[test]
fn test_dual_claim_without_platform_ledger_pays_nothing() {
    let mut env = Env::dual();
    env.stake(alice(), 100 * UNIT, START);
    env.ledgers.platform.mint(&vault_address(), 50 * UNIT).unwrap();
    env.fund(10 * UNIT, START);

    let now = START + ONE_WEEK;
    let earned = env.vault.earned(&alice(), now).unwrap();
    let call = Call::new(alice(), now);
    let mut ctx = VaultContext::new(&mut env.ledgers.staking, &mut env.ledgers.rewards, &env.ledgers.voting);
    assert!(matches!(
        env.vault.claim_reward(&call, &mut ctx),
        Err(MstableError::InvalidState { reason: StateErrorReason::MissingPlatformLedger })
    ));
    assert_eq!(env.ledgers.rewards.balance_of(&alice()), 0);
    assert_eq!(env.vault.earned(&alice(), now).unwrap(), earned);

    // retrying with the platform ledger pays exactly once
    let mut ctx = env.ledgers.context();
    let paid = env.vault.claim_reward(&call, &mut ctx).unwrap();
    assert_eq!(paid, earned);
    assert_eq!(env.ledgers.rewards.balance_of(&alice()), earned.reward);
    assert_eq!(env.ledgers.platform.balance_of(&alice()), earned.platform_reward.unwrap());

    let mut ctx = env.ledgers.context();
    let again = env.vault.claim_reward(&call, &mut ctx).unwrap();
    assert_eq!(again.reward, 0);
    assert_eq!(env.ledgers.rewards.balance_of(&alice()), earned.reward);
}

#[test]
fn test_failed_exit_keeps_stake_in_vault() {
    let mut env = Env::dual();
    env.stake(alice(), 100 * UNIT, START);
    env.ledgers.platform.mint(&vault_address(), 50 * UNIT).unwrap();
    env.fund(10 * UNIT, START);

    let call = Call::new(alice(), START + ONE_WEEK);
    let mut ctx = VaultContext::new(&mut env.ledgers.staking, &mut env.ledgers.rewards, &env.ledgers.voting);
    assert!(matches!(
        env.vault.exit(&call, &mut ctx),
        Err(MstableError::InvalidState { reason: StateErrorReason::MissingPlatformLedger })
    ));
    assert_eq!(env.vault.raw_balance_of(&alice()), 100 * UNIT);
    assert_eq!(env.ledgers.staking.balance_of(&vault_address()), 100 * UNIT);
    assert_eq!(env.ledgers.rewards.balance_of(&alice()), 0);

    let mut ctx = env.ledgers.context();
    env.vault.exit(&call, &mut ctx).unwrap();
    assert_eq!(env.vault.raw_balance_of(&alice()), 0);
    assert_eq!(env.ledgers.staking.balance_of(&alice()), 1_000_000 * UNIT);
}

// ============ Staking Savings Credits ============

#[test]
fn test_stake_savings_credits() {
    let savings_address = address_from_label("savings-contract");
    let mut underlying = TokenLedger::new(TokenMetadata::new("mStable USD", "mUSD", 18));
    underlying.mint(&alice(), 1_000 * UNIT).unwrap();
    underlying.approve(&alice(), &savings_address, Amount::MAX).unwrap();

    let mut savings = SavingsContract::new(
        SavingsConfig::new(savings_address),
        registry(),
        address_from_label("poker"),
    )
    .unwrap();
    savings
        .deposit_savings(&Call::new(alice(), START), &mut underlying, 100 * UNIT, &alice())
        .unwrap();
    savings
        .approve_credits(&Call::new(alice(), START), &vault_address(), Amount::MAX)
        .unwrap();

    let mut env = Env::single();
    let mut ctx = VaultContext::new(&mut savings, &mut env.ledgers.rewards, &env.ledgers.voting);
    env.vault
        .stake(&Call::new(alice(), START), &mut ctx, 500 * UNIT)
        .unwrap();
    env.vault
        .withdraw(&Call::new(alice(), START + ONE_DAY), &mut ctx, 200 * UNIT)
        .unwrap();

    assert_eq!(env.vault.raw_balance_of(&alice()), 300 * UNIT);
    assert_eq!(savings.credit_balance(&vault_address()), 300 * UNIT);
    assert_eq!(savings.credit_balance(&alice()), 700 * UNIT + 1);
}

// ============ Properties ============

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rewards_paid_never_exceed_funding(
        alice_stake in 1u128..100_000u128,
        bob_stake in 1u128..100_000u128,
        alice_votes in 0u128..10_000u128,
        funding in 1u128..500_000u128,
        bob_delay in 0u64..ONE_WEEK,
        refund_delay in 0u64..ONE_WEEK,
    ) {
        let mut env = Env::single();
        env.ledgers.voting.set(alice(), alice_votes * UNIT);
        env.stake(alice(), alice_stake * UNIT, START);
        env.fund(funding * UNIT, START);
        env.stake(bob(), bob_stake * UNIT, START + bob_delay);
        env.fund(funding * UNIT, START + bob_delay.max(refund_delay));
        env.poke(alice(), START + 3 * ONE_WEEK);
        env.poke(bob(), START + 3 * ONE_WEEK);

        let now = START + LOCKUP + 4 * ONE_WEEK;
        let mut total_paid = 0;
        for who in [alice(), bob()] {
            let mut ctx = env.ledgers.context();
            let paid = env.vault.exit(&Call::new(who, now), &mut ctx).unwrap();
            total_paid += paid.reward;
        }

        prop_assert!(total_paid <= 2 * funding * UNIT);
        prop_assert_eq!(env.vault.total_supply(), 0);
        prop_assert_eq!(env.vault.total_raw(), 0);
        prop_assert_eq!(env.ledgers.rewards.balance_of(&vault_address()), 2 * funding * UNIT - total_paid);
    }
}
