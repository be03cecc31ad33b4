//! Hold'em game engine.
//!
//! This module provides:
//! - Cards, the deck, and the shuffle seam
//! - Hand evaluation and comparison
//! - Pot layering into side pots
//! - The table state machine (phases, betting, showdown, settlement)
//! - Per-viewer snapshots of the table

pub mod clock;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod functional;
pub mod pot;
pub mod state_machine;
pub mod view;

pub use errors::{ErrorKind, TableError, TableResult};
pub use state_machine::{
    ActionOutcome, Confirmation, Departure, GameSettings, HandResults, NextHand, SeatResult,
    SettlementEntry, Table, TableEvent, Transition,
};
pub use view::{PlayerView, TableView};
