// programs/matrix_core/src/instructions/mod.rs

pub mod cycle;
pub mod funds;
pub mod initialize;
pub mod quota;
pub mod transfer;
pub mod users;

pub use cycle::*;
pub use funds::*;
pub use initialize::*;
pub use quota::*;
pub use transfer::*;
pub use users::*;
