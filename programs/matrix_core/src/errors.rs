// programs/matrix_core/src/errors.rs

use anchor_lang::prelude::*;

#[error_code]
pub enum MatrixError {
    #[msg("Unauthorized: caller lacks permission")]
    Unauthorized,

    #[msg("Protocol is paused")]
    ProtocolPaused,

    #[msg("Level number must be between 1 and 10")]
    InvalidLevel,

    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Insufficient balance")]
    InsufficientBalance,

    #[msg("Quota limit reached for this level")]
    QuotaLimitExceeded,

    #[msg("Level queue is full")]
    QueueFull,

    #[msg("User is not active")]
    UserNotActive,

    #[msg("Referrer cannot be the user themselves")]
    SelfReferral,

    #[msg("Referral relationship would form a loop")]
    ReferralLoop,

    #[msg("Cannot transfer to yourself")]
    SelfTransfer,

    #[msg("Transfer PIN has not been set")]
    PinNotSet,

    #[msg("Invalid transfer PIN")]
    InvalidPin,

    #[msg("Fewer than seven entries queued at this level")]
    CycleNotReady,

    #[msg("Level is halted pending operator review")]
    LevelHalted,

    #[msg("Level is not halted")]
    LevelNotHalted,

    #[msg("Cycle ledger reconciliation failed")]
    IntegrityViolation,

    #[msg("Jupiter pool cannot cover the shortfall")]
    InsufficientPoolLiquidity,

    #[msg("Next level account required for advance positions")]
    MissingNextLevel,

    #[msg("Next level account does not match level + 1")]
    WrongNextLevel,

    #[msg("Passed account does not match the selected entry")]
    AccountMismatch,

    #[msg("Arithmetic overflow")]
    NumericOverflow,
}
