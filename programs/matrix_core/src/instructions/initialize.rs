// programs/matrix_core/src/instructions/initialize.rs

use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::errors::MatrixError;
use crate::events::{LevelInitialized, PauseToggled, ProtocolInitialized};
use crate::levels::{self, MAX_LEVEL, MIN_LEVEL};
use crate::state::{GlobalConfig, JupiterPool, LevelState, SystemFunds, VaultAuthority};

#[derive(Accounts)]
pub struct InitializeProtocol<'info> {
    #[account(
        init,
        payer = authority,
        space = 8 + GlobalConfig::INIT_SPACE,
        seeds = [GlobalConfig::SEED_PREFIX],
        bump
    )]
    pub global_config: Box<Account<'info, GlobalConfig>>,

    #[account(
        init,
        payer = authority,
        space = 8 + SystemFunds::INIT_SPACE,
        seeds = [SystemFunds::SEED_PREFIX],
        bump
    )]
    pub system_funds: Box<Account<'info, SystemFunds>>,

    #[account(
        init,
        payer = authority,
        space = 8 + JupiterPool::INIT_SPACE,
        seeds = [JupiterPool::SEED_PREFIX],
        bump
    )]
    pub jupiter_pool: Box<Account<'info, JupiterPool>>,

    #[account(
        init,
        payer = authority,
        space = 8 + VaultAuthority::INIT_SPACE,
        seeds = [VaultAuthority::SEED_PREFIX],
        bump
    )]
    pub vault_authority: Box<Account<'info, VaultAuthority>>,

    /// Protocol USDC vault; holds every dollar the internal ledgers
    /// account for
    #[account(
        init,
        payer = authority,
        token::mint = usdc_mint,
        token::authority = vault_authority,
        seeds = [b"vault"],
        bump
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    pub usdc_mint: Account<'info, Mint>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct InitializeProtocolParams {
    pub max_quotas_per_level: Option<u8>,
    pub qualified_bonus_bps: Option<u16>,
    pub base_bonus_bps: Option<u16>,
}

pub fn handler(ctx: Context<InitializeProtocol>, params: InitializeProtocolParams) -> Result<()> {
    let clock = Clock::get()?;

    let qualified_bps = params
        .qualified_bonus_bps
        .unwrap_or(GlobalConfig::DEFAULT_QUALIFIED_BONUS_BPS);
    let base_bps = params
        .base_bonus_bps
        .unwrap_or(GlobalConfig::DEFAULT_BASE_BONUS_BPS);
    require!(qualified_bps <= 10_000, MatrixError::InvalidAmount);
    require!(base_bps <= qualified_bps, MatrixError::InvalidAmount);

    let config = &mut ctx.accounts.global_config;
    config.authority = ctx.accounts.authority.key();
    config.usdc_mint = ctx.accounts.usdc_mint.key();
    config.total_users = 0;
    config.max_quotas_per_level = params
        .max_quotas_per_level
        .unwrap_or(GlobalConfig::DEFAULT_MAX_QUOTAS);
    config.qualified_bonus_bps = qualified_bps;
    config.base_bonus_bps = base_bps;
    config.paused = false;
    config.bump = ctx.bumps.global_config;

    let funds = &mut ctx.accounts.system_funds;
    funds.reserve = 0;
    funds.operational = 0;
    funds.profit = 0;
    funds.total_in = 0;
    funds.total_out = 0;
    funds.bump = ctx.bumps.system_funds;

    let pool = &mut ctx.accounts.jupiter_pool;
    pool.balance = 0;
    pool.total_deposited = 0;
    pool.total_withdrawn = 0;
    pool.bump = ctx.bumps.jupiter_pool;

    let vault_authority = &mut ctx.accounts.vault_authority;
    vault_authority.vault = ctx.accounts.vault.key();
    vault_authority.bump = ctx.bumps.vault_authority;

    emit!(ProtocolInitialized {
        authority: ctx.accounts.authority.key(),
        usdc_mint: ctx.accounts.usdc_mint.key(),
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

/// Seed one of the ten level accounts. Run once per level at system
/// initialization; level accounts are never closed afterward.
#[derive(Accounts)]
#[instruction(level: u8)]
pub struct InitializeLevel<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        init,
        payer = authority,
        space = 8 + LevelState::INIT_SPACE,
        seeds = [LevelState::SEED_PREFIX, &[level]],
        bump
    )]
    pub level_state: Account<'info, LevelState>,

    #[account(
        mut,
        constraint = authority.key() == global_config.authority @ MatrixError::Unauthorized
    )]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn initialize_level(ctx: Context<InitializeLevel>, level: u8) -> Result<()> {
    let clock = Clock::get()?;

    require!(
        (MIN_LEVEL..=MAX_LEVEL).contains(&level),
        MatrixError::InvalidLevel
    );

    let state = &mut ctx.accounts.level_state;
    state.level = level;
    state.cash_balance = 0;
    state.total_cycles = 0;
    state.total_users = 0;
    state.next_entry_id = 0;
    state.halted = false;
    state.bump = ctx.bumps.level_state;
    state.queue = Vec::new();

    emit!(LevelInitialized {
        level,
        entry_value: levels::entry_value(level)?,
        reward_value: levels::reward_value(level)?,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

/// Global pause control
#[derive(Accounts)]
pub struct SetPaused<'info> {
    #[account(
        mut,
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        constraint = authority.key() == global_config.authority @ MatrixError::Unauthorized
    )]
    pub authority: Signer<'info>,
}

pub fn set_paused(ctx: Context<SetPaused>, paused: bool) -> Result<()> {
    let clock = Clock::get()?;

    ctx.accounts.global_config.paused = paused;

    emit!(PauseToggled {
        paused,
        authority: ctx.accounts.authority.key(),
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
