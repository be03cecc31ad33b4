//! Table actor message types.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::TableId;
use crate::game::{
    ActionOutcome, Confirmation, Departure, NextHand, SettlementEntry, TableEvent, TableResult,
    TableView, Transition,
    entities::{Action, Chips, Phase, PlayerId, SeatIndex},
};

/// Reply channel carrying an engine result.
pub type Reply<T> = oneshot::Sender<TableResult<T>>;

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Take a seat
    Join {
        id: PlayerId,
        name: String,
        response: Reply<SeatIndex>,
    },

    SetReady {
        id: PlayerId,
        ready: bool,
        response: Reply<bool>,
    },

    /// Deal a hand from the waiting phase
    StartHand { response: Reply<Transition> },

    /// Player action (fold, check, call, raise, all-in)
    Act {
        id: PlayerId,
        action: Action,
        response: Reply<ActionOutcome>,
    },

    ConfirmNextHand {
        id: PlayerId,
        response: Reply<NextHand>,
    },

    ConfirmSettlement {
        id: PlayerId,
        response: Reply<Confirmation>,
    },

    Rebuy {
        id: PlayerId,
        response: Reply<Chips>,
    },

    Restart { response: oneshot::Sender<()> },

    /// Transport lost the player
    Disconnect {
        id: PlayerId,
        response: Reply<Departure>,
    },

    /// Swap a disconnected player's identity for a fresh one
    Reconnect {
        old: PlayerId,
        new: PlayerId,
        response: Reply<SeatIndex>,
    },

    /// Leave the table for good
    Leave {
        id: PlayerId,
        response: Reply<Departure>,
    },

    /// Snapshot as seen by `viewer` (`None` for a spectator)
    GetView {
        viewer: Option<PlayerId>,
        response: oneshot::Sender<TableView>,
    },

    GetSettlement {
        response: oneshot::Sender<Vec<SettlementEntry>>,
    },

    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },

    /// Internal: check the turn clock (also driven by the actor's timer)
    Tick,

    /// Subscribe to state change notifications
    Subscribe {
        subscriber: String,
        sender: mpsc::Sender<StateChangeNotification>,
    },

    /// Unsubscribe from state change notifications
    Unsubscribe { subscriber: String },

    Close { response: oneshot::Sender<()> },
}

/// Notification sent when table state changes
#[derive(Debug, Clone)]
pub enum StateChangeNotification {
    /// Something happened at the table
    Event(TableEvent),
    /// The table shut down and accepts no more messages
    Closed { reason: String },
}

/// Lightweight description of a table for listings
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table_id: TableId,
    pub table_name: String,
    pub phase: Phase,
    pub round: u32,
    pub max_rounds: u32,
    pub player_count: usize,
    pub max_players: usize,
    /// Display names of seated players that are still connected
    pub players: Vec<String>,
}
