//! Session layer errors.

use thiserror::Error;

use super::TableId;
use crate::game::{ErrorKind, TableError};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    #[error("table {0} not found")]
    TableNotFound(TableId),
    #[error("table is closed")]
    TableClosed,
    #[error("not seated at any table")]
    NotSeated,
    #[error("already seated at a table")]
    AlreadySeated,
    #[error("no disconnected seat to reclaim")]
    NoDisconnectRecord,
    #[error("invalid table config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

impl SessionError {
    /// The engine error behind this one, if any.
    #[must_use]
    pub fn table_error(&self) -> Option<&TableError> {
        match self {
            Self::Table(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this is an ordinary rejected move rather than a broken
    /// table or session.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.table_error()
            .is_some_and(|err| err.kind() == ErrorKind::Rejection)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
