// programs/matrix_core/src/state.rs

use anchor_lang::prelude::*;

use crate::errors::MatrixError;
use crate::score::{calculate_score, rank_order};

/// Global protocol configuration
/// PDA seeds: ["global_config"]
#[account]
#[derive(InitSpace)]
pub struct GlobalConfig {
    /// Protocol authority
    pub authority: Pubkey,

    /// USDC mint
    pub usdc_mint: Pubkey,

    /// Total registered users
    pub total_users: u64,

    /// Maximum quotas one user may purchase at one level
    pub max_quotas_per_level: u8,

    /// Referral bonus rate for a qualified referrer (basis points of
    /// the entry value). A referrer is qualified when they are active
    /// and hold a quota at the cycling level.
    pub qualified_bonus_bps: u16,

    /// Referral bonus rate for an active but unqualified referrer
    pub base_bonus_bps: u16,

    /// Global kill switch: blocks purchases, cycles and transfers
    pub paused: bool,

    /// Bump seed
    pub bump: u8,
}

impl GlobalConfig {
    pub const SEED_PREFIX: &'static [u8] = b"global_config";

    pub const DEFAULT_MAX_QUOTAS: u8 = 10;
    pub const DEFAULT_QUALIFIED_BONUS_BPS: u16 = 4_000; // 40%
    pub const DEFAULT_BASE_BONUS_BPS: u16 = 2_000; // 20%
}

/// One queued position at a level. A user may hold several entries at
/// the same level (one per purchased quota, up to the cap).
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq, InitSpace)]
pub struct QueueEntry {
    /// Stable id, unique within the level, assigned at admission.
    /// Final ranking tiebreak after score and entry time.
    pub entry_id: u64,

    /// Owning user's wallet
    pub user: Pubkey,

    /// Sequence index among the owner's quotas at this level
    pub quota_number: u16,

    /// Admission timestamp; preserved across reentries so that time in
    /// queue keeps accruing for the same position
    pub entered_at: i64,

    /// Times this entry has cycled as a REENTRY position
    pub reentries: u16,

    /// Cached ranking score, refreshed by score recomputes and cycles
    pub score: u64,

    /// Cycles this entry has participated in
    pub cycles_completed: u16,
}

/// Result of ranking a level queue and assigning the seven cycle
/// positions. Indices point into `LevelState.queue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSelection {
    /// Position 0: exits the queue and is paid 2x entry value
    pub receiver: usize,
    /// Positions 2 and 4: move to the next level's queue
    pub advance: [usize; 2],
    /// Positions 1, 3 and 6: stay queued with reentries + 1
    pub reentry: [usize; 3],
    /// Position 5: triggers the referral bonus for its owner's referrer
    pub bonus_source: usize,
}

/// Number of queue entries consumed by one cycle.
pub const CYCLE_SIZE: usize = 7;

/// Per-level state including the FIFO-with-score queue
/// PDA seeds: ["level", level_number]
#[account]
#[derive(InitSpace)]
pub struct LevelState {
    /// Level number (1..=10)
    pub level: u8,

    /// Cash held by this level, funded by quota purchases and drained
    /// by receiver payouts and referral bonuses
    pub cash_balance: u64,

    /// Completed cycles at this level
    pub total_cycles: u64,

    /// Quotas ever admitted to this level
    pub total_users: u64,

    /// Next queue entry id; monotonically increasing, never reused
    pub next_entry_id: u64,

    /// Halted after a failed ledger reconciliation; cycles are blocked
    /// until the operator resumes the level
    pub halted: bool,

    /// Bump seed
    pub bump: u8,

    /// The level's queue, ordered by insertion; ranking is computed
    /// over scores at selection time
    #[max_len(100)]
    pub queue: Vec<QueueEntry>,
}

impl LevelState {
    pub const SEED_PREFIX: &'static [u8] = b"level";

    pub const MAX_QUEUE_LEN: usize = 100;

    /// Admit a new entry at tail position with a freshly computed
    /// score. Shared by quota purchase and advance handling.
    pub fn add_entry(&mut self, user: Pubkey, quota_number: u16, now: i64) -> Result<u64> {
        require!(
            self.queue.len() < Self::MAX_QUEUE_LEN,
            MatrixError::QueueFull
        );
        let entry_id = self.next_entry_id;
        self.next_entry_id = self
            .next_entry_id
            .checked_add(1)
            .ok_or(MatrixError::NumericOverflow)?;
        self.queue.push(QueueEntry {
            entry_id,
            user,
            quota_number,
            entered_at: now,
            reentries: 0,
            score: calculate_score(now, now, 0),
            cycles_completed: 0,
        });
        self.total_users = self.total_users.saturating_add(1);
        Ok(entry_id)
    }

    /// Queue indices sorted by rank (best first). Deterministic for a
    /// given queue state.
    pub fn ranked_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.queue.len()).collect();
        indices.sort_by(|&a, &b| rank_order(&self.queue[a], &self.queue[b]));
        indices
    }

    /// Assign the seven cycle positions from the current ranking.
    /// Returns None while fewer than seven entries are queued. Rank i
    /// takes position i: 0 RECEIVER, 1/3/6 REENTRY, 2/4 ADVANCE,
    /// 5 BONUS SOURCE.
    pub fn select_cycle(&self) -> Option<CycleSelection> {
        if self.queue.len() < CYCLE_SIZE {
            return None;
        }
        let ranked = self.ranked_indices();
        Some(CycleSelection {
            receiver: ranked[0],
            reentry: [ranked[1], ranked[3], ranked[6]],
            advance: [ranked[2], ranked[4]],
            bonus_source: ranked[5],
        })
    }

    /// Refresh every queued entry's score. Returns the number updated.
    pub fn rescore(&mut self, now: i64) -> u64 {
        for entry in self.queue.iter_mut() {
            entry.score = calculate_score(now, entry.entered_at, entry.reentries);
        }
        self.queue.len() as u64
    }

    /// Remove a set of entries by queue index, highest index first so
    /// earlier removals do not shift later ones.
    pub fn remove_indices(&mut self, indices: &mut [usize]) -> Vec<QueueEntry> {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.iter().map(|&i| self.queue.remove(i)).collect()
    }
}

/// User status lifecycle
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub enum UserStatus {
    /// Registered, not yet cleared to participate
    Pending,
    /// Full participant
    Active,
    /// Blocked from purchases, cycles still settle owned entries
    Suspended,
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Pending
    }
}

/// Per-user ledger account
/// PDA seeds: ["user", wallet]
#[account]
#[derive(InitSpace)]
pub struct UserAccount {
    /// Owning wallet
    pub wallet: Pubkey,

    /// Sequential user id
    pub user_id: u64,

    /// Lifecycle status
    pub status: UserStatus,

    /// Spendable internal balance (USDC base units)
    pub balance: u64,

    /// Value committed to quota purchases, all-time
    pub total_deposited: u64,

    /// Receiver payouts earned, all-time
    pub total_earned: u64,

    /// Referral bonuses earned, all-time
    pub total_bonus: u64,

    /// Value withdrawn out of the protocol, all-time
    pub total_withdrawn: u64,

    /// Referrer back-reference; lookup-only, never an ownership edge
    pub referrer: Option<Pubkey>,

    /// Lifetime quotas purchased per level (index = level - 1);
    /// the purchase cap is enforced against these counts
    pub quota_counts: [u8; 10],

    /// SHA-256 digest of the transfer PIN; all-zero until set
    pub pin_hash: [u8; 32],

    /// Bump seed
    pub bump: u8,
}

impl UserAccount {
    pub const SEED_PREFIX: &'static [u8] = b"user";

    pub fn quota_count(&self, level: u8) -> u8 {
        self.quota_counts[(level - 1) as usize]
    }

    pub fn has_pin(&self) -> bool {
        self.pin_hash != [0u8; 32]
    }
}

/// System-wide funds ledger (singleton)
/// PDA seeds: ["system_funds"]
#[account]
#[derive(InitSpace)]
pub struct SystemFunds {
    /// Reserve compartment, fed by cycle surplus skims
    pub reserve: u64,

    /// Operational compartment
    pub operational: u64,

    /// Profit compartment
    pub profit: u64,

    /// Value that has entered the protocol boundary (deposits)
    pub total_in: u64,

    /// Value that has left the protocol boundary (withdrawals)
    pub total_out: u64,

    /// Bump seed
    pub bump: u8,
}

impl SystemFunds {
    pub const SEED_PREFIX: &'static [u8] = b"system_funds";
}

/// External liquidity pool absorbing level surpluses and funding
/// payout shortfalls
/// PDA seeds: ["jupiter_pool"]
#[account]
#[derive(InitSpace)]
pub struct JupiterPool {
    /// Current pool balance
    pub balance: u64,

    /// Value ever deposited into the pool
    pub total_deposited: u64,

    /// Value ever withdrawn from the pool
    pub total_withdrawn: u64,

    /// Bump seed
    pub bump: u8,
}

impl JupiterPool {
    pub const SEED_PREFIX: &'static [u8] = b"jupiter_pool";
}

/// Authority PDA owning the protocol USDC vault
/// PDA seeds: ["vault_authority"]
#[account]
#[derive(InitSpace)]
pub struct VaultAuthority {
    /// The vault token account
    pub vault: Pubkey,

    /// Bump seed
    pub bump: u8,
}

impl VaultAuthority {
    pub const SEED_PREFIX: &'static [u8] = b"vault_authority";
}

// ==================== UNIT TESTS ====================
