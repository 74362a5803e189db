// programs/matrix_core/src/lib.rs
//
// Matrix Core Program
// ===================
// Tiered participation matrix over a USDC vault:
// - Ten levels with doubling entry values
// - Score-ordered level queues cycled in groups of seven
// - Receiver payouts, advances, reentries and referral bonuses
// - Jupiter pool liquidity backstop and surplus skimming
// - Internal balances with PIN-gated transfers

use anchor_lang::prelude::*;

pub mod errors;
pub mod events;
pub mod instructions;
pub mod levels;
pub mod score;
pub mod state;

use instructions::*;
use state::UserStatus;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

#[program]
pub mod matrix_core {
    use super::*;

    // ==================== INITIALIZATION ====================

    /// Initialize global config, system funds, Jupiter pool and vault
    pub fn initialize_protocol(
        ctx: Context<InitializeProtocol>,
        params: InitializeProtocolParams,
    ) -> Result<()> {
        instructions::initialize::handler(ctx, params)
    }

    /// Initialize one level's queue state
    pub fn initialize_level(ctx: Context<InitializeLevel>, level: u8) -> Result<()> {
        instructions::initialize::initialize_level(ctx, level)
    }

    /// Set the global pause flag
    pub fn set_paused(ctx: Context<SetPaused>, paused: bool) -> Result<()> {
        instructions::initialize::set_paused(ctx, paused)
    }

    // ==================== USERS ====================

    /// Register a user account, optionally under a referrer
    pub fn register_user(ctx: Context<RegisterUser>) -> Result<()> {
        instructions::users::register_user(ctx)
    }

    /// Change a user's lifecycle status
    pub fn set_user_status(ctx: Context<SetUserStatus>, new_status: UserStatus) -> Result<()> {
        instructions::users::set_user_status(ctx, new_status)
    }

    // ==================== FUNDS ====================

    /// Deposit USDC into the vault and credit the internal balance
    pub fn deposit(ctx: Context<Deposit>, amount: u64) -> Result<()> {
        instructions::funds::deposit(ctx, amount)
    }

    /// Withdraw from the internal balance back to the user's wallet
    pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
        instructions::funds::withdraw(ctx, amount)
    }

    /// Add external liquidity to the Jupiter pool
    pub fn fund_jupiter_pool(ctx: Context<ManagePoolLiquidity>, amount: u64) -> Result<()> {
        instructions::funds::fund_jupiter_pool(ctx, amount)
    }

    /// Remove liquidity from the Jupiter pool
    pub fn drain_jupiter_pool(ctx: Context<ManagePoolLiquidity>, amount: u64) -> Result<()> {
        instructions::funds::drain_jupiter_pool(ctx, amount)
    }

    // ==================== QUOTAS ====================

    /// Check whether a quota purchase would succeed, and why not
    pub fn can_purchase_quota(
        ctx: Context<CanPurchaseQuota>,
        level: u8,
    ) -> Result<PurchaseCheck> {
        instructions::quota::can_purchase_quota(ctx, level)
    }

    /// Buy one queue position at a level with internal balance
    pub fn purchase_quota(ctx: Context<PurchaseQuota>, level: u8) -> Result<()> {
        instructions::quota::purchase_quota(ctx, level)
    }

    // ==================== CYCLES ====================

    /// Check whether a level holds a full cycle
    pub fn can_process_cycle(ctx: Context<CanProcessCycle>, level: u8) -> Result<bool> {
        instructions::cycle::can_process_cycle(ctx, level)
    }

    /// Resolve one seven-entry cycle at a level
    pub fn process_cycle(ctx: Context<ProcessCycle>, level: u8) -> Result<()> {
        instructions::cycle::process_cycle(ctx, level)
    }

    /// Recompute every queued score at a level
    pub fn update_queue_scores(ctx: Context<UpdateQueueScores>, level: u8) -> Result<u64> {
        instructions::cycle::update_queue_scores(ctx, level)
    }

    /// Clear an integrity halt on a level
    pub fn resume_level(ctx: Context<ResumeLevel>, level: u8) -> Result<()> {
        instructions::cycle::resume_level(ctx, level)
    }

    // ==================== TRANSFERS ====================

    /// Set or rotate the transfer PIN
    pub fn set_transfer_pin(ctx: Context<SetTransferPin>, pin: String) -> Result<()> {
        instructions::transfer::set_transfer_pin(ctx, pin)
    }

    /// Move internal balance to another registered user
    pub fn transfer(ctx: Context<Transfer>, amount: u64, pin: String) -> Result<()> {
        instructions::transfer::transfer(ctx, amount, pin)
    }
}
