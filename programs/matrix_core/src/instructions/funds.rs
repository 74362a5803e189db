// programs/matrix_core/src/instructions/funds.rs
//
// Every instruction here moves value across the protocol boundary and
// therefore touches SystemFunds.total_in / total_out. Internal
// movements (purchases, payouts, bonuses, transfers) never do.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount};

use crate::errors::MatrixError;
use crate::events::{FundsDeposited, FundsWithdrawn, PoolLiquidityChanged};
use crate::state::{GlobalConfig, JupiterPool, SystemFunds, UserAccount, VaultAuthority};

/// Deposit USDC into the protocol, crediting the internal balance
#[derive(Accounts)]
pub struct Deposit<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
        constraint = !global_config.paused @ MatrixError::ProtocolPaused
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [UserAccount::SEED_PREFIX, wallet.key().as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,

    #[account(
        mut,
        seeds = [SystemFunds::SEED_PREFIX],
        bump = system_funds.bump,
    )]
    pub system_funds: Account<'info, SystemFunds>,

    #[account(
        seeds = [VaultAuthority::SEED_PREFIX],
        bump = vault_authority.bump,
    )]
    pub vault_authority: Account<'info, VaultAuthority>,

    #[account(
        mut,
        constraint = vault.key() == vault_authority.vault @ MatrixError::AccountMismatch
    )]
    pub vault: Account<'info, TokenAccount>,

    /// Depositor's USDC token account
    #[account(
        mut,
        constraint = user_token_account.mint == global_config.usdc_mint @ MatrixError::AccountMismatch,
        constraint = user_token_account.owner == wallet.key() @ MatrixError::Unauthorized
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    pub wallet: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn deposit(ctx: Context<Deposit>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;

    require!(amount > 0, MatrixError::InvalidAmount);

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.user_token_account.to_account_info(),
                to: ctx.accounts.vault.to_account_info(),
                authority: ctx.accounts.wallet.to_account_info(),
            },
        ),
        amount,
    )?;

    let user = &mut ctx.accounts.user_account;
    user.balance = user
        .balance
        .checked_add(amount)
        .ok_or(MatrixError::NumericOverflow)?;

    let funds = &mut ctx.accounts.system_funds;
    funds.total_in = funds.total_in.saturating_add(amount);

    emit!(FundsDeposited {
        wallet: user.wallet,
        amount,
        new_balance: user.balance,
        total_in: funds.total_in,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

/// Withdraw USDC out of the protocol
#[derive(Accounts)]
pub struct Withdraw<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
        constraint = !global_config.paused @ MatrixError::ProtocolPaused
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [UserAccount::SEED_PREFIX, wallet.key().as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,

    #[account(
        mut,
        seeds = [SystemFunds::SEED_PREFIX],
        bump = system_funds.bump,
    )]
    pub system_funds: Account<'info, SystemFunds>,

    #[account(
        seeds = [VaultAuthority::SEED_PREFIX],
        bump = vault_authority.bump,
    )]
    pub vault_authority: Account<'info, VaultAuthority>,

    #[account(
        mut,
        constraint = vault.key() == vault_authority.vault @ MatrixError::AccountMismatch
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = user_token_account.mint == global_config.usdc_mint @ MatrixError::AccountMismatch,
        constraint = user_token_account.owner == wallet.key() @ MatrixError::Unauthorized
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    pub wallet: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let user = &mut ctx.accounts.user_account;

    require!(amount > 0, MatrixError::InvalidAmount);
    require!(user.balance >= amount, MatrixError::InsufficientBalance);

    let seeds = &[
        VaultAuthority::SEED_PREFIX,
        &[ctx.accounts.vault_authority.bump],
    ];
    let signer_seeds = &[&seeds[..]];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.user_token_account.to_account_info(),
                authority: ctx.accounts.vault_authority.to_account_info(),
            },
            signer_seeds,
        ),
        amount,
    )?;

    user.balance -= amount;
    user.total_withdrawn = user.total_withdrawn.saturating_add(amount);

    let funds = &mut ctx.accounts.system_funds;
    funds.total_out = funds.total_out.saturating_add(amount);

    emit!(FundsWithdrawn {
        wallet: user.wallet,
        amount,
        new_balance: user.balance,
        total_out: funds.total_out,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

/// Authority-gated external liquidity into or out of the Jupiter pool
#[derive(Accounts)]
pub struct ManagePoolLiquidity<'info> {
    #[account(
        seeds = [GlobalConfig::SEED_PREFIX],
        bump = global_config.bump,
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [JupiterPool::SEED_PREFIX],
        bump = jupiter_pool.bump,
    )]
    pub jupiter_pool: Account<'info, JupiterPool>,

    #[account(
        mut,
        seeds = [SystemFunds::SEED_PREFIX],
        bump = system_funds.bump,
    )]
    pub system_funds: Account<'info, SystemFunds>,

    #[account(
        seeds = [VaultAuthority::SEED_PREFIX],
        bump = vault_authority.bump,
    )]
    pub vault_authority: Account<'info, VaultAuthority>,

    #[account(
        mut,
        constraint = vault.key() == vault_authority.vault @ MatrixError::AccountMismatch
    )]
    pub vault: Account<'info, TokenAccount>,

    /// Authority's USDC token account
    #[account(
        mut,
        constraint = authority_token_account.mint == global_config.usdc_mint @ MatrixError::AccountMismatch,
        constraint = authority_token_account.owner == authority.key() @ MatrixError::Unauthorized
    )]
    pub authority_token_account: Account<'info, TokenAccount>,

    #[account(
        constraint = authority.key() == global_config.authority @ MatrixError::Unauthorized
    )]
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn fund_jupiter_pool(ctx: Context<ManagePoolLiquidity>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;

    require!(amount > 0, MatrixError::InvalidAmount);

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.authority_token_account.to_account_info(),
                to: ctx.accounts.vault.to_account_info(),
                authority: ctx.accounts.authority.to_account_info(),
            },
        ),
        amount,
    )?;

    let pool = &mut ctx.accounts.jupiter_pool;
    pool.balance = pool
        .balance
        .checked_add(amount)
        .ok_or(MatrixError::NumericOverflow)?;
    pool.total_deposited = pool.total_deposited.saturating_add(amount);

    let funds = &mut ctx.accounts.system_funds;
    funds.total_in = funds.total_in.saturating_add(amount);

    emit!(PoolLiquidityChanged {
        delta_in: amount,
        delta_out: 0,
        pool_balance_after: pool.balance,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}

pub fn drain_jupiter_pool(ctx: Context<ManagePoolLiquidity>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let pool = &mut ctx.accounts.jupiter_pool;

    require!(amount > 0, MatrixError::InvalidAmount);
    require!(
        pool.balance >= amount,
        MatrixError::InsufficientPoolLiquidity
    );

    let seeds = &[
        VaultAuthority::SEED_PREFIX,
        &[ctx.accounts.vault_authority.bump],
    ];
    let signer_seeds = &[&seeds[..]];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            token::Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.authority_token_account.to_account_info(),
                authority: ctx.accounts.vault_authority.to_account_info(),
            },
            signer_seeds,
        ),
        amount,
    )?;

    pool.balance -= amount;
    pool.total_withdrawn = pool.total_withdrawn.saturating_add(amount);

    let funds = &mut ctx.accounts.system_funds;
    funds.total_out = funds.total_out.saturating_add(amount);

    emit!(PoolLiquidityChanged {
        delta_in: 0,
        delta_out: amount,
        pool_balance_after: pool.balance,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
