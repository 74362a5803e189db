// programs/matrix_core/src/instructions/quota.rs

use anchor_lang::prelude::*;

use crate::errors::MatrixError;
use crate::events::QuotaPurchased;
use crate::levels;
use crate::state::{GlobalConfig, LevelState, UserAccount, UserStatus};

/// Read-only purchase check. Advisory only: `purchase_quota` runs the
/// same validation again inside its own transaction and never trusts
/// a prior check across a time gap.
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct CanPurchaseQuota<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        seeds = [LevelState::SEED_PREFIX, &[level]],
        bump = level_state.bump,
    )]
    pub level_state: Account<'info, LevelState>,

    #[account(
        seeds = [UserAccount::SEED_PREFIX, user_account.wallet.as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum PurchaseBlocker {
    Paused,
    UserNotActive,
    InsufficientBalance,
    QuotaLimitExceeded,
    QueueFull,
}

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct PurchaseCheck {
    pub allowed: bool,
    pub reason: Option<PurchaseBlocker>,
    pub entry_value: u64,
    pub quotas_held: u8,
}

/// Shared validation used by both the check view and the purchase
/// itself. `entry_value` is derived from the level number by the
/// caller, which also covers the InvalidLevel case.
pub fn validate_purchase(
    config: &GlobalConfig,
    level_state: &LevelState,
    user: &UserAccount,
    entry_value: u64,
) -> std::result::Result<(), PurchaseBlocker> {
    if config.paused {
        return Err(PurchaseBlocker::Paused);
    }
    if user.status != UserStatus::Active {
        return Err(PurchaseBlocker::UserNotActive);
    }
    if user.quota_count(level_state.level) >= config.max_quotas_per_level {
        return Err(PurchaseBlocker::QuotaLimitExceeded);
    }
    if user.balance < entry_value {
        return Err(PurchaseBlocker::InsufficientBalance);
    }
    if level_state.queue.len() >= LevelState::MAX_QUEUE_LEN {
        return Err(PurchaseBlocker::QueueFull);
    }
    Ok(())
}

pub fn can_purchase_quota(ctx: Context<CanPurchaseQuota>, level: u8) -> Result<PurchaseCheck> {
    let config = &ctx.accounts.global_config;
    let level_state = &ctx.accounts.level_state;
    let user = &ctx.accounts.user_account;

    let entry_value = levels::entry_value(level)?;
    let check = match validate_purchase(config, level_state, user, entry_value) {
        Ok(()) => PurchaseCheck {
            allowed: true,
            reason: None,
            entry_value,
            quotas_held: user.quota_count(level),
        },
        Err(blocker) => PurchaseCheck {
            allowed: false,
            reason: Some(blocker),
            entry_value,
            quotas_held: user.quota_count(level),
        },
    };

    Ok(check)
}

/// Purchase one quota at a level: debit the internal balance by the
/// entry value and admit a fresh-scored queue entry. All mutations
/// land in one transaction; any failure aborts them all.
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct PurchaseQuota<'info> {
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
    pub level_state: Account<'info, LevelState>,

    #[account(
        mut,
        seeds = [UserAccount::SEED_PREFIX, wallet.key().as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,

    pub wallet: Signer<'info>,
}

pub fn purchase_quota(ctx: Context<PurchaseQuota>, level: u8) -> Result<()> {
    let clock = Clock::get()?;
    let config = &ctx.accounts.global_config;
    let level_state = &mut ctx.accounts.level_state;
    let user = &mut ctx.accounts.user_account;

    let entry_value = levels::entry_value(level)?;
    match validate_purchase(config, level_state, user, entry_value) {
        Ok(()) => {}
        Err(PurchaseBlocker::Paused) => return err!(MatrixError::ProtocolPaused),
        Err(PurchaseBlocker::UserNotActive) => return err!(MatrixError::UserNotActive),
        Err(PurchaseBlocker::InsufficientBalance) => {
            return err!(MatrixError::InsufficientBalance)
        }
        Err(PurchaseBlocker::QuotaLimitExceeded) => return err!(MatrixError::QuotaLimitExceeded),
        Err(PurchaseBlocker::QueueFull) => return err!(MatrixError::QueueFull),
    }

    // Debit the user and credit the level's cash. This is an internal
    // movement: SystemFunds.total_in moved when the money was
    // deposited, not here.
    user.balance -= entry_value;
    user.total_deposited = user.total_deposited.saturating_add(entry_value);
    user.quota_counts[(level - 1) as usize] += 1;
    let quota_number = user.quota_count(level) as u16;

    level_state.cash_balance = level_state
        .cash_balance
        .checked_add(entry_value)
        .ok_or(MatrixError::NumericOverflow)?;
    let entry_id = level_state.add_entry(user.wallet, quota_number, clock.unix_timestamp)?;

    emit!(QuotaPurchased {
        wallet: user.wallet,
        level,
        entry_id,
        quota_number,
        entry_value,
        level_cash_balance: level_state.cash_balance,
        queue_length: level_state.queue.len() as u32,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

// ==================== UNIT TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GlobalConfig {
        GlobalConfig {
            authority: Pubkey::default(),
            usdc_mint: Pubkey::default(),
            total_users: 0,
            max_quotas_per_level: GlobalConfig::DEFAULT_MAX_QUOTAS,
            qualified_bonus_bps: GlobalConfig::DEFAULT_QUALIFIED_BONUS_BPS,
            base_bonus_bps: GlobalConfig::DEFAULT_BASE_BONUS_BPS,
            paused: false,
            bump: 255,
        }
    }

    fn level(level: u8) -> LevelState {
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

    fn active_user(balance: u64) -> UserAccount {
        UserAccount {
            wallet: Pubkey::new_from_array([1; 32]),
            user_id: 1,
            status: UserStatus::Active,
            balance,
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

    fn check(cfg: &GlobalConfig, lvl: &LevelState, user: &UserAccount)
        -> std::result::Result<(), PurchaseBlocker> {
        validate_purchase(cfg, lvl, user, levels::entry_value(lvl.level).unwrap())
    }

    // ==================== VALIDATION TESTS ====================

    #[test]
    fn test_validate_purchase_allows_funded_active_user() {
        let user = active_user(10 * levels::VALUE_UNIT);
        assert!(check(&config(), &level(1), &user).is_ok());
    }

    #[test]
    fn test_validate_purchase_insufficient_balance() {
        // Balance of 5 against a level-1 entry value of 10 must fail
        // and leave the snapshot untouched.
        let user = active_user(5 * levels::VALUE_UNIT);
        assert_eq!(
            check(&config(), &level(1), &user),
            Err(PurchaseBlocker::InsufficientBalance)
        );
        assert_eq!(user.balance, 5 * levels::VALUE_UNIT);
    }

    #[test]
    fn test_validate_purchase_pending_user_blocked() {
        let mut user = active_user(100 * levels::VALUE_UNIT);
        user.status = UserStatus::Pending;
        assert_eq!(
            check(&config(), &level(1), &user),
            Err(PurchaseBlocker::UserNotActive)
        );
    }

    #[test]
    fn test_validate_purchase_quota_cap() {
        let mut user = active_user(10_000 * levels::VALUE_UNIT);
        user.quota_counts[2] = GlobalConfig::DEFAULT_MAX_QUOTAS;
        assert_eq!(
            check(&config(), &level(3), &user),
            Err(PurchaseBlocker::QuotaLimitExceeded)
        );
        // The cap is per level: level 4 is still open.
        assert!(check(&config(), &level(4), &user).is_ok());
    }

    #[test]
    fn test_validate_purchase_paused() {
        let mut cfg = config();
        cfg.paused = true;
        let user = active_user(100 * levels::VALUE_UNIT);
        assert_eq!(
            check(&cfg, &level(1), &user),
            Err(PurchaseBlocker::Paused)
        );
    }

    #[test]
    fn test_validate_purchase_queue_full() {
        let mut lvl = level(1);
        for _ in 0..LevelState::MAX_QUEUE_LEN {
            lvl.add_entry(Pubkey::default(), 1, 0).unwrap();
        }
        let user = active_user(100 * levels::VALUE_UNIT);
        assert_eq!(
            check(&config(), &lvl, &user),
            Err(PurchaseBlocker::QueueFull)
        );
    }

    #[test]
    fn test_validate_purchase_balance_checked_against_level_value() {
        // 40 USDC covers levels 1..3 (10/20/40) but not level 4 (80).
        let user = active_user(40 * levels::VALUE_UNIT);
        assert!(check(&config(), &level(3), &user).is_ok());
        assert_eq!(
            check(&config(), &level(4), &user),
            Err(PurchaseBlocker::InsufficientBalance)
        );
    }
}
