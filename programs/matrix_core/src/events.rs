// programs/matrix_core/src/events.rs

use anchor_lang::prelude::*;

use crate::state::UserStatus;

/// Emitted when the protocol is initialized
#[event]
pub struct ProtocolInitialized {
    pub authority: Pubkey,
    pub usdc_mint: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a level account is seeded
#[event]
pub struct LevelInitialized {
    pub level: u8,
    pub entry_value: u64,
    pub reward_value: u64,
    pub timestamp: i64,
}

/// Emitted when a user registers
#[event]
pub struct UserRegistered {
    pub wallet: Pubkey,
    pub user_id: u64,
    pub referrer: Option<Pubkey>,
    pub timestamp: i64,
}

/// Emitted when a user's status changes
#[event]
pub struct UserStatusChanged {
    pub wallet: Pubkey,
    pub old_status: UserStatus,
    pub new_status: UserStatus,
    pub timestamp: i64,
}

/// Emitted when value crosses into the protocol boundary
#[event]
pub struct FundsDeposited {
    pub wallet: Pubkey,
    pub amount: u64,
    pub new_balance: u64,
    pub total_in: u64,
    pub timestamp: i64,
}

/// Emitted when value leaves the protocol boundary
#[event]
pub struct FundsWithdrawn {
    pub wallet: Pubkey,
    pub amount: u64,
    pub new_balance: u64,
    pub total_out: u64,
    pub timestamp: i64,
}

/// Emitted when a quota purchase admits a new queue entry
#[event]
pub struct QuotaPurchased {
    pub wallet: Pubkey,
    pub level: u8,
    pub entry_id: u64,
    pub quota_number: u16,
    pub entry_value: u64,
    pub level_cash_balance: u64,
    pub queue_length: u32,
    pub timestamp: i64,
}

/// Append-only cycle record; one per completed cycle
#[event]
pub struct CycleProcessed {
    pub level: u8,
    pub cycle_number: u64,
    pub receiver: Pubkey,
    pub reward_paid: u64,
    pub advanced: [Pubkey; 2],
    pub advanced_to: u8,
    pub reentry_entry_ids: [u64; 3],
    pub bonus_source: Pubkey,
    pub bonus_referrer: Option<Pubkey>,
    pub bonus_paid: u64,
    pub pool_draw: u64,
    pub pool_deposit: u64,
    pub cash_balance_after: u64,
    pub timestamp: i64,
}

/// Append-only referral bonus record
#[event]
pub struct BonusPaid {
    pub referrer: Pubkey,
    pub source: Pubkey,
    pub level: u8,
    pub rate_bps: u16,
    pub amount: u64,
    pub timestamp: i64,
}

/// Emitted when a cycle shortfall is covered by the Jupiter pool
#[event]
pub struct JupiterPoolWithdrawal {
    pub level: u8,
    pub amount: u64,
    pub pool_balance_after: u64,
    pub timestamp: i64,
}

/// Emitted when level surplus is skimmed into the Jupiter pool
#[event]
pub struct JupiterPoolDeposit {
    pub level: u8,
    pub amount: u64,
    pub pool_balance_after: u64,
    pub timestamp: i64,
}

/// Emitted when cycle surplus is allocated to the system compartments
#[event]
pub struct SurplusAllocated {
    pub level: u8,
    pub to_reserve: u64,
    pub to_operational: u64,
    pub to_profit: u64,
    pub timestamp: i64,
}

/// Emitted when a batch score recompute runs for a level
#[event]
pub struct QueueScoresUpdated {
    pub level: u8,
    pub entries_updated: u64,
    pub timestamp: i64,
}

/// Append-only internal transfer record
#[event]
pub struct TransferExecuted {
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: u64,
    pub timestamp: i64,
}

/// Emitted when the transfer PIN digest is set or rotated
#[event]
pub struct TransferPinUpdated {
    pub wallet: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a level is halted on reconciliation failure
#[event]
pub struct LevelHalted {
    pub level: u8,
    pub timestamp: i64,
}

/// Emitted when the operator resumes a halted level
#[event]
pub struct LevelResumed {
    pub level: u8,
    pub authority: Pubkey,
    pub timestamp: i64,
}

/// Emitted when the pause flag changes
#[event]
pub struct PauseToggled {
    pub paused: bool,
    pub authority: Pubkey,
    pub timestamp: i64,
}

/// Emitted when external liquidity moves in or out of the Jupiter pool
#[event]
pub struct PoolLiquidityChanged {
    pub delta_in: u64,
    pub delta_out: u64,
    pub pool_balance_after: u64,
    pub timestamp: i64,
}
