//! Table engine error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    entities::{Chips, DeckError, Phase, SeatIndex, UnknownAction},
    functional::EvalError,
};

/// How an error should be treated by whoever drives the table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// An illegal player action. Nothing changed.
    Rejection,
    /// The operation isn't valid in the table's current state. Nothing
    /// changed.
    Precondition,
    /// An invariant broke. Money accounting can't be trusted; the table
    /// must be shut down.
    Fatal,
}

/// Errors that can occur during table operations
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TableError {
    #[error("table is full")]
    RoomFull,
    #[error("already seated at this table")]
    AlreadyJoined,
    #[error("player not found")]
    PlayerNotFound,
    #[error("need 2+ ready players with chips")]
    NotEnoughPlayers,
    #[error("no betting round in progress")]
    NotBettingPhase,
    #[error("not your turn")]
    NotYourTurn,
    #[error("you've already folded or are all-in")]
    InvalidStatus,
    #[error("must call or fold")]
    MustCallOrFold,
    #[error("raise must be at least {min}")]
    BelowMinRaise { min: Chips },
    #[error("need {needed} chips, have {available}")]
    InsufficientChips { needed: Chips, available: Chips },
    #[error("betting wasn't reopened; call or fold")]
    RaiseNotReopened,
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("still have chips; no rebuy needed")]
    StillHasChips,
    #[error("not allowed during {phase}")]
    NotAllowedNow { phase: Phase },
    #[error("nobody is on the clock")]
    NoActiveTurn,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("seat {0} is corrupted")]
    CorruptSeat(SeatIndex),
    #[error("hand evaluation failed: {0}")]
    Evaluation(String),
}

impl TableError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotYourTurn
            | Self::InvalidStatus
            | Self::MustCallOrFold
            | Self::BelowMinRaise { .. }
            | Self::InsufficientChips { .. }
            | Self::RaiseNotReopened
            | Self::UnknownAction(_) => ErrorKind::Rejection,
            Self::RoomFull
            | Self::AlreadyJoined
            | Self::PlayerNotFound
            | Self::NotEnoughPlayers
            | Self::NotBettingPhase
            | Self::StillHasChips
            | Self::NotAllowedNow { .. }
            | Self::NoActiveTurn => ErrorKind::Precondition,
            Self::DeckExhausted | Self::CorruptSeat(_) | Self::Evaluation(_) => ErrorKind::Fatal,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

impl From<DeckError> for TableError {
    fn from(value: DeckError) -> Self {
        match value {
            DeckError::Exhausted => Self::DeckExhausted,
        }
    }
}

impl From<EvalError> for TableError {
    fn from(value: EvalError) -> Self {
        Self::Evaluation(value.to_string())
    }
}

impl From<UnknownAction> for TableError {
    fn from(value: UnknownAction) -> Self {
        Self::UnknownAction(value.0)
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TableError::NotYourTurn.kind(), ErrorKind::Rejection);
        assert_eq!(
            TableError::NotAllowedNow {
                phase: Phase::Flop
            }
            .kind(),
            ErrorKind::Precondition
        );
        assert!(TableError::DeckExhausted.is_fatal());
        assert!(!TableError::RoomFull.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = TableError::InsufficientChips {
            needed: 120,
            available: 80,
        };
        assert_eq!(err.to_string(), "need 120 chips, have 80");
        assert_eq!(
            TableError::NotAllowedNow {
                phase: Phase::River
            }
            .to_string(),
            "not allowed during river"
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(TableError::from(DeckError::Exhausted), TableError::DeckExhausted);
        assert_eq!(
            TableError::from(UnknownAction("bet".into())),
            TableError::UnknownAction("bet".into())
        );
    }
}
