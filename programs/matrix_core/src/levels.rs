// programs/matrix_core/src/levels.rs

use anchor_lang::prelude::*;

use crate::errors::MatrixError;

/// Lowest level number.
pub const MIN_LEVEL: u8 = 1;
/// Highest (terminal) level number. ADVANCE positions at this level
/// re-enter the level's own queue instead of moving up.
pub const MAX_LEVEL: u8 = 10;

/// USDC uses 6 decimals; all monetary amounts are u64 base units.
pub const VALUE_UNIT: u64 = 1_000_000;

/// Level 1 entry value: 10 USDC. Each level doubles the previous one.
pub const BASE_ENTRY_VALUE: u64 = 10 * VALUE_UNIT;

/// Bonus value as a fraction of the entry value (maximum tier).
pub const BONUS_RATE_BPS: u64 = 4_000; // 40%

/// Entry value for a level: 10 USDC * 2^(level-1).
/// Level 10 tops out at 5120 USDC.
pub fn entry_value(level: u8) -> Result<u64> {
    require!(
        (MIN_LEVEL..=MAX_LEVEL).contains(&level),
        MatrixError::InvalidLevel
    );
    Ok(BASE_ENTRY_VALUE << (level - 1))
}

/// Reward paid to the RECEIVER position: 2x the entry value.
pub fn reward_value(level: u8) -> Result<u64> {
    Ok(entry_value(level)?.saturating_mul(2))
}

/// Maximum referral bonus for a level: 40% of the entry value.
/// The actual bonus paid is scaled by the referrer's qualification
/// tier (0 / 20 / 40%), see `referral_bonus_rate`.
pub fn bonus_value(level: u8) -> Result<u64> {
    Ok(entry_value(level)? * BONUS_RATE_BPS / 10_000)
}

/// The level an ADVANCE position moves to. Level 10 is terminal and
/// maps to itself.
pub fn advance_target(level: u8) -> Result<u8> {
    require!(
        (MIN_LEVEL..=MAX_LEVEL).contains(&level),
        MatrixError::InvalidLevel
    );
    Ok(if level == MAX_LEVEL { MAX_LEVEL } else { level + 1 })
}

// ==================== UNIT TESTS ====================
