// programs/matrix_core/src/instructions/users.rs

use anchor_lang::prelude::*;

use crate::errors::MatrixError;
use crate::events::{UserRegistered, UserStatusChanged};
use crate::state::{GlobalConfig, UserAccount, UserStatus};

/// Register a new user, optionally under a referrer. The referrer
/// edge is a back-reference only; a two-party loop (A refers B while
/// B refers A) is rejected here, at admission time, rather than
/// assumed away.
#[derive(Accounts)]
pub struct RegisterUser<'info> {
    #[account(
        mut,
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        init,
        payer = wallet,
        space = 8 + UserAccount::INIT_SPACE,
        seeds = [UserAccount::SEED_PREFIX, wallet.key().as_ref()],
        bump
    )]
    pub user_account: Account<'info, UserAccount>,

    /// The referrer's user account, when a referrer is claimed.
    /// Requiring the account proves the referrer actually exists.
    #[account(
        seeds = [UserAccount::SEED_PREFIX, referrer_account.wallet.as_ref()],
        bump = referrer_account.bump,
    )]
    pub referrer_account: Option<Account<'info, UserAccount>>,

    #[account(mut)]
    pub wallet: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn register_user(ctx: Context<RegisterUser>) -> Result<()> {
    let clock = Clock::get()?;
    let config = &mut ctx.accounts.global_config;

    let referrer = match &ctx.accounts.referrer_account {
        Some(referrer_account) => {
            require!(
                referrer_account.wallet != ctx.accounts.wallet.key(),
                MatrixError::SelfReferral
            );
            // Two-party loop check: the claimed referrer must not
            // itself be referred by the registering wallet.
            if let Some(upstream) = referrer_account.referrer {
                require!(
                    upstream != ctx.accounts.wallet.key(),
                    MatrixError::ReferralLoop
                );
            }
            Some(referrer_account.wallet)
        }
        None => None,
    };

    config.total_users = config.total_users.saturating_add(1);

    let user = &mut ctx.accounts.user_account;
    user.wallet = ctx.accounts.wallet.key();
    user.user_id = config.total_users;
    user.status = UserStatus::Pending;
    user.balance = 0;
    user.total_deposited = 0;
    user.total_earned = 0;
    user.total_bonus = 0;
    user.total_withdrawn = 0;
    user.referrer = referrer;
    user.quota_counts = [0; 10];
    user.pin_hash = [0; 32];
    user.bump = ctx.bumps.user_account;

    emit!(UserRegistered {
        wallet: user.wallet,
        user_id: user.user_id,
        referrer,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

/// Authority-controlled status transitions (activation, suspension)
#[derive(Accounts)]
pub struct SetUserStatus<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [UserAccount::SEED_PREFIX, user_account.wallet.as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,

    #[account(
        constraint = authority.key() == global_config.authority @ MatrixError::Unauthorized
    )]
    pub authority: Signer<'info>,
}

pub fn set_user_status(ctx: Context<SetUserStatus>, new_status: UserStatus) -> Result<()> {
    let clock = Clock::get()?;
    let user = &mut ctx.accounts.user_account;

    let old_status = user.status;
    user.status = new_status;

    emit!(UserStatusChanged {
        wallet: user.wallet,
        old_status,
        new_status,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
