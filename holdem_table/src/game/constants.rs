//! Table-wide defaults.

use super::entities::Chips;

/// Seats at a table.
pub const MAX_PLAYERS: usize = 7;

/// Hands played before the match settles.
pub const DEFAULT_MAX_ROUNDS: u32 = 20;

pub const DEFAULT_STARTING_STACK: Chips = 1000;
pub const DEFAULT_REBUY_AMOUNT: Chips = 1000;
pub const DEFAULT_SMALL_BLIND: Chips = 10;
pub const DEFAULT_BIG_BLIND: Chips = 20;

/// Seconds a player has to act before the table may force a fold.
pub const DEFAULT_TURN_TIME_LIMIT_SECS: u64 = 120;

/// Upper bound on identity tokens and names accepted from callers.
pub const MAX_USER_INPUT_LENGTH: usize = 64;
