// programs/matrix_core/src/instructions/cycle.rs
//
// The cycle processor. Seven queued entries are matched and resolved
// into fixed positions: rank 0 RECEIVER (exits, paid 2x entry), ranks
// 2 and 4 ADVANCE (move to the next level's queue), ranks 1/3/6
// REENTRY (stay, reentries + 1), rank 5 BONUS SOURCE (stays; its
// owner's referrer earns the referral bonus). Queue effects and cash
// settlement are pure functions so the whole state machine is unit
// testable; the instruction handler wires them to accounts and the
// Solana runtime provides the all-or-nothing transaction boundary.

use anchor_lang::prelude::*;

use crate::errors::MatrixError;
use crate::events::{
    BonusPaid, CycleProcessed, JupiterPoolDeposit, JupiterPoolWithdrawal, LevelHalted,
    LevelResumed, QueueScoresUpdated, SurplusAllocated,
};
use crate::levels::{self, MAX_LEVEL};
use crate::score::calculate_score;
use crate::state::{
    GlobalConfig, JupiterPool, LevelState, QueueEntry, SystemFunds, UserAccount, UserStatus,
    CYCLE_SIZE,
};

/// Cash a level retains after settlement before surplus is skimmed:
/// four entry values, enough to cover the next cycle's worst-case
/// outflow (2x reward + bonus) twice over.
pub const RESERVE_FLOOR_MULTIPLIER: u64 = 4;

/// Surplus skim split, in percent. The profit share takes the
/// rounding remainder so the split is exact.
pub const SKIM_POOL_PCT: u64 = 60;
pub const SKIM_RESERVE_PCT: u64 = 20;
pub const SKIM_OPERATIONAL_PCT: u64 = 10;

/// Referral bonus rate for a cycling level, in basis points of the
/// entry value. Tiers: suspended/pending referrers earn nothing;
/// active referrers earn the base rate; active referrers who hold a
/// quota at the cycling level themselves earn the qualified rate.
pub fn referral_bonus_rate(config: &GlobalConfig, referrer: &UserAccount, level: u8) -> u16 {
    if referrer.status != UserStatus::Active {
        return 0;
    }
    if referrer.quota_count(level) > 0 {
        config.qualified_bonus_bps
    } else {
        config.base_bonus_bps
    }
}

/// Cash movements of one cycle, computed before anything mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleLedger {
    pub reward: u64,
    pub bonus: u64,
    pub pool_draw: u64,
    pub pool_deposit: u64,
    pub to_reserve: u64,
    pub to_operational: u64,
    pub to_profit: u64,
    pub cash_after: u64,
}

impl CycleLedger {
    /// Cross-check the ledger before any state moves. The payout
    /// figures are re-derived by the caller from the level table and
    /// the bonus rate, not read back from the ledger, and every unit
    /// leaving the level's cash must be accounted for:
    /// cash_before + pool_draw == cash_after + payouts + skims.
    pub fn verify(&self, cash_before: u64, reward: u64, bonus: u64) -> Result<()> {
        require!(
            self.reward == reward && self.bonus == bonus,
            MatrixError::IntegrityViolation
        );
        let inflow = cash_before as u128 + self.pool_draw as u128;
        let outflow = self.cash_after as u128
            + self.reward as u128
            + self.bonus as u128
            + self.pool_deposit as u128
            + self.to_reserve as u128
            + self.to_operational as u128
            + self.to_profit as u128;
        require!(inflow == outflow, MatrixError::IntegrityViolation);
        Ok(())
    }
}

/// Settle the cash side of a cycle. Shortfall beyond the level's cash
/// is drawn from the Jupiter pool; surplus above the reserve floor is
/// skimmed to the pool and the system compartments.
pub fn settle_cycle_cash(
    entry_value: u64,
    reward: u64,
    bonus: u64,
    cash_before: u64,
    pool_before: u64,
) -> Result<CycleLedger> {
    let outflow = reward
        .checked_add(bonus)
        .ok_or(MatrixError::NumericOverflow)?;

    let (mut cash, pool_draw) = if cash_before >= outflow {
        (cash_before - outflow, 0)
    } else {
        let shortfall = outflow - cash_before;
        require!(
            pool_before >= shortfall,
            MatrixError::InsufficientPoolLiquidity
        );
        (0, shortfall)
    };

    let floor = entry_value.saturating_mul(RESERVE_FLOOR_MULTIPLIER);
    let (pool_deposit, to_reserve, to_operational, to_profit) = if cash > floor {
        let excess = cash - floor;
        cash = floor;
        let pool_cut = excess * SKIM_POOL_PCT / 100;
        let reserve_cut = excess * SKIM_RESERVE_PCT / 100;
        let operational_cut = excess * SKIM_OPERATIONAL_PCT / 100;
        let profit_cut = excess - pool_cut - reserve_cut - operational_cut;
        (pool_cut, reserve_cut, operational_cut, profit_cut)
    } else {
        (0, 0, 0, 0)
    };

    Ok(CycleLedger {
        reward,
        bonus,
        pool_draw,
        pool_deposit,
        to_reserve,
        to_operational,
        to_profit,
        cash_after: cash,
    })
}

/// Queue-side outcome of one cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub receiver: QueueEntry,
    pub advanced: [QueueEntry; 2],
    pub advanced_to: u8,
    pub reentry_ids: [u64; 3],
    pub bonus_source: QueueEntry,
}

/// Apply the queue effects of one cycle: remove the receiver and the
/// two advance entries, bump and rescore the three reentry entries,
/// admit the advancers at the target level. The bonus-source entry
/// stays queued untouched apart from its cycle counter, so its wait
/// time keeps accruing. Pass `next` as None only at the terminal
/// level, where advancers re-enter the level's own queue.
pub fn apply_cycle_queue(
    level: &mut LevelState,
    mut next: Option<&mut LevelState>,
    now: i64,
) -> Result<CycleOutcome> {
    let selection = level.select_cycle().ok_or(MatrixError::CycleNotReady)?;

    let receiver = level.queue[selection.receiver].clone();
    let advanced = [
        level.queue[selection.advance[0]].clone(),
        level.queue[selection.advance[1]].clone(),
    ];
    let bonus_source = level.queue[selection.bonus_source].clone();
    let reentry_ids = [
        level.queue[selection.reentry[0]].entry_id,
        level.queue[selection.reentry[1]].entry_id,
        level.queue[selection.reentry[2]].entry_id,
    ];

    // Capacity for the two advancers is checked before any mutation.
    if let Some(ref next_level) = next {
        require!(
            next_level.queue.len() + 2 <= LevelState::MAX_QUEUE_LEN,
            MatrixError::QueueFull
        );
    }

    level.remove_indices(&mut [
        selection.receiver,
        selection.advance[0],
        selection.advance[1],
    ]);

    for entry in level.queue.iter_mut() {
        if reentry_ids.contains(&entry.entry_id) {
            entry.reentries = entry.reentries.saturating_add(1);
            entry.cycles_completed = entry.cycles_completed.saturating_add(1);
            entry.score = calculate_score(now, entry.entered_at, entry.reentries);
        } else if entry.entry_id == bonus_source.entry_id {
            entry.cycles_completed = entry.cycles_completed.saturating_add(1);
        }
    }

    let advanced_to = levels::advance_target(level.level)?;
    for entry in advanced.iter() {
        match next {
            Some(ref mut next_level) => admit_advanced(next_level, entry, now)?,
            None => admit_advanced(level, entry, now)?,
        }
    }

    level.total_cycles = level.total_cycles.saturating_add(1);

    Ok(CycleOutcome {
        receiver,
        advanced,
        advanced_to,
        reentry_ids,
        bonus_source,
    })
}

/// Admit an advancing entry at its target level: a new queue entry
/// (fresh admission time and score) that keeps the original quota
/// number and cycle history.
fn admit_advanced(target: &mut LevelState, from: &QueueEntry, now: i64) -> Result<()> {
    target.add_entry(from.user, from.quota_number, now)?;
    if let Some(entry) = target.queue.last_mut() {
        entry.cycles_completed = from.cycles_completed.saturating_add(1);
    }
    Ok(())
}

/// Read-only cycle eligibility check
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct CanProcessCycle<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        seeds = [LevelState::SEED_PREFIX, &[level]],
        bump = level_state.bump,
    )]
    pub level_state: Box<Account<'info, LevelState>>,
}

pub fn can_process_cycle(ctx: Context<CanProcessCycle>, _level: u8) -> Result<bool> {
    let level_state = &ctx.accounts.level_state;
    Ok(!ctx.accounts.global_config.paused
        && !level_state.halted
        && level_state.queue.len() >= CYCLE_SIZE)
}

/// Process one cycle at a level. Permissionless crank: the caller
/// computes the expected selection off-chain and passes the matching
/// user accounts; a stale view fails with AccountMismatch and the
/// cranker retries against fresh state.
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct ProcessCycle<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
        constraint = !global_config.paused @ MatrixError::ProtocolPaused
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [LevelState::SEED_PREFIX, &[level]],
        bump = level_state.bump,
    )]
    pub level_state: Box<Account<'info, LevelState>>,

    /// The level the advance positions move to. Required for levels
    /// 1..=9; must be omitted at the terminal level, where advancers
    /// re-enter the same queue.
    #[account(mut)]
    pub next_level_state: Option<Box<Account<'info, LevelState>>>,

    #[account(
        mut,
        seeds = [SystemFunds::SEED_PREFIX],
        bump = system_funds.bump,
    )]
    pub system_funds: Account<'info, SystemFunds>,

    #[account(
        mut,
        seeds = [JupiterPool::SEED_PREFIX],
        bump = jupiter_pool.bump,
    )]
    pub jupiter_pool: Account<'info, JupiterPool>,

    /// User account of the rank-0 entry's owner
    #[account(
        mut,
        seeds = [UserAccount::SEED_PREFIX, receiver_user.wallet.as_ref()],
        bump = receiver_user.bump,
    )]
    pub receiver_user: Box<Account<'info, UserAccount>>,

    /// User account of the rank-5 entry's owner; read for its
    /// referrer back-reference
    #[account(
        seeds = [UserAccount::SEED_PREFIX, bonus_source_user.wallet.as_ref()],
        bump = bonus_source_user.bump,
    )]
    pub bonus_source_user: Box<Account<'info, UserAccount>>,

    /// The bonus source's referrer, when one exists and is not also
    /// the receiver (that aliasing case is credited through
    /// `receiver_user` to keep a single writable account per user)
    #[account(
        mut,
        seeds = [UserAccount::SEED_PREFIX, referrer_user.wallet.as_ref()],
        bump = referrer_user.bump,
    )]
    pub referrer_user: Option<Box<Account<'info, UserAccount>>>,

    pub cranker: Signer<'info>,
}

pub fn process_cycle(ctx: Context<ProcessCycle>, level: u8) -> Result<()> {
    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    let level_state = &mut ctx.accounts.level_state;

    require!(!level_state.halted, MatrixError::LevelHalted);
    require!(
        level_state.queue.len() >= CYCLE_SIZE,
        MatrixError::CycleNotReady
    );

    // Validate the next-level account against the advance target.
    match &ctx.accounts.next_level_state {
        Some(next) => {
            require!(level < MAX_LEVEL, MatrixError::WrongNextLevel);
            require!(next.level == level + 1, MatrixError::WrongNextLevel);
        }
        None => require!(level == MAX_LEVEL, MatrixError::MissingNextLevel),
    }

    // Fresh scores for this selection; entries selected here are
    // locked for the rest of the transaction by the runtime.
    level_state.rescore(now);

    let entry_value = levels::entry_value(level)?;
    let reward = levels::reward_value(level)?;

    // Peek the selection without touching the queue;
    // apply_cycle_queue re-derives the same ranking later.
    let selection = level_state
        .select_cycle()
        .ok_or(MatrixError::CycleNotReady)?;
    let receiver_wallet = level_state.queue[selection.receiver].user;
    let bonus_source_wallet = level_state.queue[selection.bonus_source].user;

    // The cranker must have passed the accounts the ranking selected.
    require!(
        ctx.accounts.receiver_user.wallet == receiver_wallet,
        MatrixError::AccountMismatch
    );
    require!(
        ctx.accounts.bonus_source_user.wallet == bonus_source_wallet,
        MatrixError::AccountMismatch
    );

    // Referral bonus: rate depends on the referrer's own standing.
    let bonus_referrer = ctx.accounts.bonus_source_user.referrer;
    let (bonus, rate_bps) = match bonus_referrer {
        None => (0, 0),
        Some(referrer_wallet) => {
            let rate = if referrer_wallet == ctx.accounts.receiver_user.wallet {
                referral_bonus_rate(&ctx.accounts.global_config, &ctx.accounts.receiver_user, level)
            } else {
                let referrer = ctx
                    .accounts
                    .referrer_user
                    .as_ref()
                    .ok_or(MatrixError::AccountMismatch)?;
                require!(
                    referrer.wallet == referrer_wallet,
                    MatrixError::AccountMismatch
                );
                referral_bonus_rate(&ctx.accounts.global_config, referrer, level)
            };
            (entry_value * rate as u64 / 10_000, rate)
        }
    };

    let ledger = settle_cycle_cash(
        entry_value,
        reward,
        bonus,
        level_state.cash_balance,
        ctx.accounts.jupiter_pool.balance,
    )?;

    // Reconciliation gate, ahead of every mutation: a ledger that
    // fails the cross-check halts the level. The halt must commit, so
    // this path returns Ok with the queue and all balances untouched.
    if ledger
        .verify(level_state.cash_balance, reward, bonus)
        .is_err()
    {
        level_state.halted = true;
        emit!(LevelHalted {
            level,
            timestamp: now,
        });
        return Ok(());
    }

    let next_level = ctx.accounts.next_level_state.as_mut().map(|n| &mut ***n);
    let outcome = apply_cycle_queue(level_state, next_level, now)?;

    // Receiver payout.
    let receiver = &mut ctx.accounts.receiver_user;
    receiver.balance = receiver
        .balance
        .checked_add(ledger.reward)
        .ok_or(MatrixError::NumericOverflow)?;
    receiver.total_earned = receiver.total_earned.saturating_add(ledger.reward);

    // Bonus credit, routed through the receiver account when the
    // referrer and receiver are the same user.
    if ledger.bonus > 0 {
        if Some(receiver.wallet) == bonus_referrer {
            receiver.balance = receiver
                .balance
                .checked_add(ledger.bonus)
                .ok_or(MatrixError::NumericOverflow)?;
            receiver.total_bonus = receiver.total_bonus.saturating_add(ledger.bonus);
        } else if let Some(referrer) = ctx.accounts.referrer_user.as_mut() {
            referrer.balance = referrer
                .balance
                .checked_add(ledger.bonus)
                .ok_or(MatrixError::NumericOverflow)?;
            referrer.total_bonus = referrer.total_bonus.saturating_add(ledger.bonus);
        }
    }

    // Level cash, pool and compartment updates.
    level_state.cash_balance = ledger.cash_after;

    let pool = &mut ctx.accounts.jupiter_pool;
    if ledger.pool_draw > 0 {
        pool.balance -= ledger.pool_draw;
        pool.total_withdrawn = pool.total_withdrawn.saturating_add(ledger.pool_draw);
        emit!(JupiterPoolWithdrawal {
            level,
            amount: ledger.pool_draw,
            pool_balance_after: pool.balance,
            timestamp: now,
        });
    }
    if ledger.pool_deposit > 0 {
        pool.balance = pool
            .balance
            .checked_add(ledger.pool_deposit)
            .ok_or(MatrixError::NumericOverflow)?;
        pool.total_deposited = pool.total_deposited.saturating_add(ledger.pool_deposit);
        emit!(JupiterPoolDeposit {
            level,
            amount: ledger.pool_deposit,
            pool_balance_after: pool.balance,
            timestamp: now,
        });
    }

    if ledger.to_reserve > 0 || ledger.to_operational > 0 || ledger.to_profit > 0 {
        let funds = &mut ctx.accounts.system_funds;
        funds.reserve = funds.reserve.saturating_add(ledger.to_reserve);
        funds.operational = funds.operational.saturating_add(ledger.to_operational);
        funds.profit = funds.profit.saturating_add(ledger.to_profit);
        emit!(SurplusAllocated {
            level,
            to_reserve: ledger.to_reserve,
            to_operational: ledger.to_operational,
            to_profit: ledger.to_profit,
            timestamp: now,
        });
    }

    if ledger.bonus > 0 {
        emit!(BonusPaid {
            referrer: bonus_referrer.unwrap_or_default(),
            source: outcome.bonus_source.user,
            level,
            rate_bps,
            amount: ledger.bonus,
            timestamp: now,
        });
    }

    emit!(CycleProcessed {
        level,
        cycle_number: level_state.total_cycles,
        receiver: outcome.receiver.user,
        reward_paid: ledger.reward,
        advanced: [outcome.advanced[0].user, outcome.advanced[1].user],
        advanced_to: outcome.advanced_to,
        reentry_entry_ids: outcome.reentry_ids,
        bonus_source: outcome.bonus_source.user,
        bonus_referrer,
        bonus_paid: ledger.bonus,
        pool_draw: ledger.pool_draw,
        pool_deposit: ledger.pool_deposit,
        cash_balance_after: level_state.cash_balance,
        timestamp: now,
    });

    Ok(())
}

/// Batch score recompute for one level; the off-chain scheduler loops
/// all ten levels to refresh the whole system.
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct UpdateQueueScores<'info> {
    #[account(
        mut,
        seeds = [LevelState::SEED_PREFIX, &[level]],
        bump = level_state.bump,
    )]
    pub level_state: Box<Account<'info, LevelState>>,

    pub cranker: Signer<'info>,
}

pub fn update_queue_scores(ctx: Context<UpdateQueueScores>, level: u8) -> Result<u64> {
    let clock = Clock::get()?;
    let updated = ctx.accounts.level_state.rescore(clock.unix_timestamp);

    emit!(QueueScoresUpdated {
        level,
        entries_updated: updated,
        timestamp: clock.unix_timestamp,
    });

    Ok(updated)
}

/// Operator path out of an integrity halt
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct ResumeLevel<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [LevelState::SEED_PREFIX, &[level]],
        bump = level_state.bump,
    )]
    pub level_state: Box<Account<'info, LevelState>>,

    #[account(
        constraint = authority.key() == global_config.authority @ MatrixError::Unauthorized
    )]
    pub authority: Signer<'info>,
}

pub fn resume_level(ctx: Context<ResumeLevel>, level: u8) -> Result<()> {
    let clock = Clock::get()?;
    let level_state = &mut ctx.accounts.level_state;

    require!(level_state.halted, MatrixError::LevelNotHalted);
    level_state.halted = false;

    emit!(LevelResumed {
        level,
        authority: ctx.accounts.authority.key(),
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::VALUE_UNIT;

    fn empty_level(level: u8) -> LevelState {
        LevelState {
            level,
            cash_balance: 0,
            total_cycles: 0,
            total_users: 0,
            next_entry_id: 0,
            halted: false,
            bump: 255,
            queue: Vec::new(),
        }
    }

    fn wallet(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn config() -> GlobalConfig {
        GlobalConfig {
            authority: Pubkey::default(),
            usdc_mint: Pubkey::default(),
            total_users: 0,
            max_quotas_per_level: 10,
            qualified_bonus_bps: 4_000,
            base_bonus_bps: 2_000,
            paused: false,
            bump: 255,
        }
    }

    fn user(n: u8, status: UserStatus) -> UserAccount {
        UserAccount {
            wallet: wallet(n),
            user_id: n as u64,
            status,
            balance: 0,
            total_deposited: 0,
            total_earned: 0,
            total_bonus: 0,
            total_withdrawn: 0,
            referrer: None,
            quota_counts: [0; 10],
            pin_hash: [0; 32],
            bump: 255,
        }
    }

    /// Seed a level as seven one-quota purchases would: entries in
    /// admission order (so ranks follow wallet index after rescoring)
    /// and seven entry values of cash.
    fn seeded_level(level: u8, entry_value: u64) -> LevelState {
        let mut state = empty_level(level);
        for i in 0..7 {
            state.add_entry(wallet(i), 1, (i as i64) * 10).unwrap();
        }
        state.rescore(1_000);
        state.cash_balance = entry_value * 7;
        state
    }

    // ==================== BONUS RATE TESTS ====================

    #[test]
    fn test_bonus_rate_inactive_referrer_zero() {
        assert_eq!(referral_bonus_rate(&config(), &user(1, UserStatus::Pending), 1), 0);
        assert_eq!(
            referral_bonus_rate(&config(), &user(1, UserStatus::Suspended), 1),
            0
        );
    }

    #[test]
    fn test_bonus_rate_active_without_quota_base_tier() {
        let referrer = user(1, UserStatus::Active);
        assert_eq!(referral_bonus_rate(&config(), &referrer, 3), 2_000);
    }

    #[test]
    fn test_bonus_rate_qualified_tier() {
        let mut referrer = user(1, UserStatus::Active);
        referrer.quota_counts[2] = 1;
        assert_eq!(referral_bonus_rate(&config(), &referrer, 3), 4_000);
        // Qualification is per level.
        assert_eq!(referral_bonus_rate(&config(), &referrer, 4), 2_000);
    }

    // ==================== SETTLEMENT TESTS ====================

    #[test]
    fn test_settle_covered_by_level_cash() {
        let entry = 10 * VALUE_UNIT;
        let ledger = settle_cycle_cash(entry, 2 * entry, 0, 7 * entry, 0).unwrap();
        assert_eq!(ledger.pool_draw, 0);
        // 5 entries of cash remain, 1 above the 4-entry floor: skimmed.
        assert_eq!(ledger.cash_after, 4 * entry);
        let skimmed =
            ledger.pool_deposit + ledger.to_reserve + ledger.to_operational + ledger.to_profit;
        assert_eq!(skimmed, entry);
        assert!(ledger.verify(7 * entry, 2 * entry, 0).is_ok());
    }

    #[test]
    fn test_settle_skim_split_exact() {
        let entry = 10 * VALUE_UNIT;
        let ledger = settle_cycle_cash(entry, 2 * entry, 0, 7 * entry, 0).unwrap();
        assert_eq!(ledger.pool_deposit, entry * 60 / 100);
        assert_eq!(ledger.to_reserve, entry * 20 / 100);
        assert_eq!(ledger.to_operational, entry * 10 / 100);
        assert_eq!(
            ledger.to_profit,
            entry - ledger.pool_deposit - ledger.to_reserve - ledger.to_operational
        );
    }

    #[test]
    fn test_settle_shortfall_draws_pool() {
        let entry = 10 * VALUE_UNIT;
        // Level holds one entry of cash against a 2.4-entry outflow.
        let bonus = entry * 40 / 100;
        let ledger = settle_cycle_cash(entry, 2 * entry, bonus, entry, 100 * entry).unwrap();
        assert_eq!(ledger.pool_draw, entry + bonus);
        assert_eq!(ledger.cash_after, 0);
        assert_eq!(ledger.pool_deposit, 0);
        assert!(ledger.verify(entry, 2 * entry, bonus).is_ok());
    }

    #[test]
    fn test_settle_pool_exhausted_fails() {
        let entry = 10 * VALUE_UNIT;
        assert!(settle_cycle_cash(entry, 2 * entry, 0, 0, entry).is_err());
    }

    #[test]
    fn test_settle_reconciles_across_inputs() {
        let entry = 10 * VALUE_UNIT;
        for cash in [0, entry, 4 * entry, 7 * entry, 20 * entry] {
            for bonus in [0, entry / 5, entry * 2 / 5] {
                let ledger =
                    settle_cycle_cash(entry, 2 * entry, bonus, cash, 1_000 * entry).unwrap();
                assert!(
                    ledger.verify(cash, 2 * entry, bonus).is_ok(),
                    "cash={} bonus={}",
                    cash,
                    bonus
                );
            }
        }
    }

    #[test]
    fn test_ledger_verify_rejects_tampered_split() {
        let entry = 10 * VALUE_UNIT;
        let good = settle_cycle_cash(entry, 2 * entry, 0, 7 * entry, 0).unwrap();

        // A lost or conjured unit anywhere in the split trips the gate.
        let mut lost = good.clone();
        lost.to_profit -= 1;
        assert!(lost.verify(7 * entry, 2 * entry, 0).is_err());

        let mut conjured = good.clone();
        conjured.pool_deposit += 1;
        assert!(conjured.verify(7 * entry, 2 * entry, 0).is_err());

        let mut wrong_cash = good;
        wrong_cash.cash_after += 1;
        assert!(wrong_cash.verify(7 * entry, 2 * entry, 0).is_err());
    }

    #[test]
    fn test_ledger_verify_rejects_foreign_payout_figures() {
        // The gate checks the ledger's payouts against figures the
        // caller derives from the level table, not ledger echoes.
        let entry = 10 * VALUE_UNIT;
        let ledger = settle_cycle_cash(entry, 2 * entry, 0, 7 * entry, 0).unwrap();
        assert!(ledger.verify(7 * entry, 2 * entry + 1, 0).is_err());
        assert!(ledger.verify(7 * entry, 2 * entry, entry / 5).is_err());
    }

    // ==================== QUEUE EFFECT TESTS ====================

    #[test]
    fn test_cycle_positions_and_survivors() {
        let entry = 10 * VALUE_UNIT;
        let mut level1 = seeded_level(1, entry);
        let mut level2 = empty_level(2);

        let outcome = apply_cycle_queue(&mut level1, Some(&mut level2), 2_000).unwrap();

        assert_eq!(outcome.receiver.user, wallet(0));
        assert_eq!(outcome.advanced[0].user, wallet(2));
        assert_eq!(outcome.advanced[1].user, wallet(4));
        assert_eq!(outcome.bonus_source.user, wallet(5));
        assert_eq!(outcome.advanced_to, 2);

        // Receiver and advancers left level 1; reentries and the
        // bonus source stayed.
        let survivors: Vec<Pubkey> = level1.queue.iter().map(|e| e.user).collect();
        assert_eq!(
            survivors,
            vec![wallet(1), wallet(3), wallet(5), wallet(6)]
        );
        assert_eq!(level1.total_cycles, 1);

        // Advancers were admitted at level 2 as fresh entries.
        let promoted: Vec<Pubkey> = level2.queue.iter().map(|e| e.user).collect();
        assert_eq!(promoted, vec![wallet(2), wallet(4)]);
        assert_eq!(level2.queue[0].reentries, 0);
        assert_eq!(level2.queue[0].entered_at, 2_000);
        assert_eq!(level2.queue[0].cycles_completed, 1);
    }

    #[test]
    fn test_cycle_reentry_counts() {
        let entry = 10 * VALUE_UNIT;
        let mut level1 = seeded_level(1, entry);
        let mut level2 = empty_level(2);

        apply_cycle_queue(&mut level1, Some(&mut level2), 2_000).unwrap();

        // Exactly three entries carry reentries == 1; the bonus source
        // stays but its reentry count is untouched.
        let bumped: Vec<Pubkey> = level1
            .queue
            .iter()
            .filter(|e| e.reentries == 1)
            .map(|e| e.user)
            .collect();
        assert_eq!(bumped, vec![wallet(1), wallet(3), wallet(6)]);
        let bonus_entry = level1.queue.iter().find(|e| e.user == wallet(5)).unwrap();
        assert_eq!(bonus_entry.reentries, 0);
        assert_eq!(bonus_entry.cycles_completed, 1);
    }

    #[test]
    fn test_cycle_requires_seven() {
        let mut level1 = empty_level(1);
        for i in 0..6 {
            level1.add_entry(wallet(i), 1, 0).unwrap();
        }
        let mut level2 = empty_level(2);
        assert!(apply_cycle_queue(&mut level1, Some(&mut level2), 100).is_err());
    }

    #[test]
    fn test_cycle_terminal_level_reenters_own_queue() {
        let entry = 5_120 * VALUE_UNIT;
        let mut level10 = seeded_level(10, entry);

        let outcome = apply_cycle_queue(&mut level10, None, 2_000).unwrap();

        assert_eq!(outcome.advanced_to, 10);
        // 7 - 1 receiver - 2 advanced + 2 readmitted = 6 queued.
        assert_eq!(level10.queue.len(), 6);
        let readmitted: Vec<&QueueEntry> = level10
            .queue
            .iter()
            .filter(|e| e.entered_at == 2_000)
            .collect();
        assert_eq!(readmitted.len(), 2);
        assert_eq!(readmitted[0].user, wallet(2));
        assert_eq!(readmitted[1].user, wallet(4));
    }

    #[test]
    fn test_cycle_next_level_capacity_checked_upfront() {
        let entry = 10 * VALUE_UNIT;
        let mut level1 = seeded_level(1, entry);
        let mut level2 = empty_level(2);
        for _ in 0..(LevelState::MAX_QUEUE_LEN - 1) {
            level2.add_entry(wallet(99), 1, 0).unwrap();
        }

        let before = level1.queue.clone();
        assert!(apply_cycle_queue(&mut level1, Some(&mut level2), 2_000).is_err());
        // Nothing moved: the failed attempt left the queue untouched.
        assert_eq!(level1.queue, before);
    }

    #[test]
    fn test_cycle_selection_consumes_top_scores_first() {
        // Two cycles in a row must settle in strict score order.
        let entry = 10 * VALUE_UNIT;
        let mut level1 = empty_level(1);
        for i in 0..14 {
            level1.add_entry(wallet(i), 1, (i as i64) * 10).unwrap();
        }
        level1.rescore(10_000);
        level1.cash_balance = entry * 14;

        let first = apply_cycle_queue(&mut level1, Some(&mut empty_level(2)), 10_000).unwrap();
        assert_eq!(first.receiver.user, wallet(0));

        level1.rescore(10_000);
        let second = apply_cycle_queue(&mut level1, Some(&mut empty_level(2)), 10_000).unwrap();
        // wallet(1) re-entered with a boost and the longest wait among
        // survivors, so it heads the second cycle.
        assert_eq!(second.receiver.user, wallet(1));
    }

    // ==================== END-TO-END LEDGER TESTS ====================

    /// The §cash view of the end-to-end scenario: seven users fund
    /// level 1 with one quota each, one cycle runs, and every unit is
    /// still accounted for afterward.
    #[test]
    fn test_end_to_end_zero_leakage() {
        let entry = 10 * VALUE_UNIT;
        let reward = 2 * entry;
        let bonus = entry * 2_000 / 10_000; // base-tier referrer

        let mut users: Vec<UserAccount> = (0..8)
            .map(|i| {
                let mut u = user(i, UserStatus::Active);
                u.balance = entry;
                u
            })
            .collect();
        // Every user deposited `entry`; user 7 is a referrer who only
        // deposited, never bought.
        let total_in: u64 = entry * 8;

        let mut level1 = empty_level(1);
        let mut level2 = empty_level(2);
        for i in 0..7 {
            users[i].balance -= entry;
            level1.cash_balance += entry;
            level1.add_entry(users[i].wallet, 1, (i as i64) * 10).unwrap();
        }
        level1.rescore(1_000);

        // Settlement is computed and verified before the queue moves,
        // matching the handler's order.
        let ledger = settle_cycle_cash(entry, reward, bonus, level1.cash_balance, 0).unwrap();
        assert!(ledger.verify(level1.cash_balance, reward, bonus).is_ok());
        let outcome = apply_cycle_queue(&mut level1, Some(&mut level2), 2_000).unwrap();

        // Apply the money side the way process_cycle does.
        let receiver_idx = users
            .iter()
            .position(|u| u.wallet == outcome.receiver.user)
            .unwrap();
        users[receiver_idx].balance += ledger.reward;
        users[receiver_idx].total_earned += ledger.reward;
        users[7].balance += ledger.bonus;
        users[7].total_bonus += ledger.bonus;
        level1.cash_balance = ledger.cash_after;
        let pool_balance = ledger.pool_deposit;
        let funds = ledger.to_reserve + ledger.to_operational + ledger.to_profit;

        // Receiver got exactly 2x entry.
        assert_eq!(users[0].balance, reward);
        assert_eq!(users[0].total_earned, reward);
        // Level counters match the scenario.
        assert_eq!(level1.total_cycles, 1);
        assert_eq!(level2.queue.len(), 2);
        assert!(level1.queue.len() < CYCLE_SIZE);

        // Zero leakage: balances + level cash + compartments + pool
        // equal everything that ever crossed the boundary.
        let user_sum: u64 = users.iter().map(|u| u.balance).sum();
        let system_total =
            user_sum + level1.cash_balance + level2.cash_balance + pool_balance + funds;
        assert_eq!(system_total, total_in);
    }

    #[test]
    fn test_end_to_end_shortfall_funded_by_pool() {
        // A level carrying almost no cash still pays the receiver in
        // full; the pool covers the difference and shrinks by it.
        let entry = 10 * VALUE_UNIT;
        let reward = 2 * entry;
        let mut level1 = seeded_level(1, entry);
        level1.cash_balance = entry; // drained by earlier cycles
        let pool_before = 50 * entry;

        let ledger = settle_cycle_cash(entry, reward, 0, level1.cash_balance, pool_before).unwrap();
        assert!(ledger.verify(level1.cash_balance, reward, 0).is_ok());
        apply_cycle_queue(&mut level1, Some(&mut empty_level(2)), 2_000).unwrap();

        assert_eq!(ledger.pool_draw, reward - entry);
        let pool_after = pool_before - ledger.pool_draw + ledger.pool_deposit;
        assert_eq!(pool_after, pool_before - entry);
    }

    #[test]
    fn test_failed_gate_leaves_queue_intact() {
        // The handler's order: selection is peeked and the ledger
        // verified before apply_cycle_queue runs, so a halt commits
        // with the queue and cash exactly as they were.
        let entry = 10 * VALUE_UNIT;
        let mut level1 = seeded_level(1, entry);
        let queue_before = level1.queue.clone();
        let cash_before = level1.cash_balance;

        let selection = level1.select_cycle().unwrap();
        assert_eq!(level1.queue[selection.receiver].user, wallet(0));

        let mut ledger = settle_cycle_cash(entry, 2 * entry, 0, cash_before, 0).unwrap();
        ledger.to_profit += 1;
        assert!(ledger.verify(cash_before, 2 * entry, 0).is_err());

        // Nothing up to the gate has touched the level.
        assert_eq!(level1.queue, queue_before);
        assert_eq!(level1.cash_balance, cash_before);
        assert_eq!(level1.total_cycles, 0);
    }
}
