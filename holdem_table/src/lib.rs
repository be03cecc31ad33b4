//! # Hold'em Table
//!
//! A fixed-seat Texas Hold'em table engine.
//!
//! The engine plays a match of a configured number of hands at up to seven
//! seats: it deals, posts blinds, enforces betting rules, splits the pot
//! into side pots at showdown, and reports a settlement of every player's
//! profit once the round cap is reached. Players may rebuy between hands,
//! disconnect and reconnect, or leave mid-hand.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, hand evaluation, side pots, and the table state machine
//! - [`table`]: one async actor per table plus a manager that tracks which
//!   identity sits at which table
//!
//! ## Example
//!
//! ```
//! use holdem_table::{Action, PlayerId, Table};
//!
//! let mut table = Table::default();
//! for name in ["ann", "bo"] {
//!     table.add_player(PlayerId::new(name), name).unwrap();
//!     table.set_ready(&PlayerId::new(name), true).unwrap();
//! }
//! table.start_hand().unwrap();
//! let seat = table.current_seat().unwrap();
//! let id = table.seat(seat).unwrap().id.clone();
//! table.act(&id, Action::Fold).unwrap();
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    ErrorKind, GameSettings, Table, TableError, TableEvent, TableView,
    constants::{self, MAX_PLAYERS},
    entities::{self, Action, Card, Chips, Phase, PlayerId, SeatIndex},
    functional,
};

/// Async table actors and the session manager.
pub mod table;
