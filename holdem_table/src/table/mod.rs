//! Table module providing multi-table support with an async actor model.
//!
//! This module implements:
//! - TableActor: async actor owning a single table
//! - TableManager: spawns actors, maps identities to tables, and evicts
//!   players whose disconnect grace period ran out
//! - Message-based communication with tokio channels
//! - Table configuration
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox, so
//! engine calls for one table are applied one at a time in arrival order.
//! The actor's periodic tick folds a player whose turn clock ran out.
//!
//! ## Example
//!
//! ```no_run
//! use holdem_table::table::{TableConfig, TableManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = TableManager::default();
//!     let handle = manager.create_table(TableConfig::named("main")).await.unwrap();
//!     let seat = manager.join(handle.table_id(), "conn-1".into(), "ann").await.unwrap();
//!     println!("ann sat at seat {seat}");
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;

/// Table identifier assigned by the manager.
pub type TableId = uuid::Uuid;

pub use actor::{TableActor, TableHandle};
pub use config::TableConfig;
pub use errors::{SessionError, SessionResult};
pub use manager::{TableManager, TableMetadata, short_id};
pub use messages::{StateChangeNotification, TableMessage, TableSummary};
