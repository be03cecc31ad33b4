//! Table actor implementation with async message handling.

use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    time::interval,
};

use super::{
    TableId,
    config::TableConfig,
    errors::{SessionError, SessionResult},
    messages::{StateChangeNotification, TableMessage, TableSummary},
};
use crate::game::{
    ActionOutcome, Confirmation, Departure, NextHand, SettlementEntry, Table, TableError,
    TableResult, TableView, Transition,
    entities::{Action, Chips, PlayerId, SeatIndex},
};

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Whether the actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> SessionResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SessionError::TableClosed)
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> SessionResult<T> {
        let (response, rx) = oneshot::channel();
        self.send(message(response)).await?;
        rx.await.map_err(|_| SessionError::TableClosed)
    }

    pub async fn join(&self, id: PlayerId, name: &str) -> SessionResult<SeatIndex> {
        let name = name.to_string();
        Ok(self
            .request(|response| TableMessage::Join { id, name, response })
            .await??)
    }

    pub async fn set_ready(&self, id: PlayerId, ready: bool) -> SessionResult<bool> {
        Ok(self
            .request(|response| TableMessage::SetReady {
                id,
                ready,
                response,
            })
            .await??)
    }

    pub async fn start_hand(&self) -> SessionResult<Transition> {
        Ok(self
            .request(|response| TableMessage::StartHand { response })
            .await??)
    }

    pub async fn act(&self, id: PlayerId, action: Action) -> SessionResult<ActionOutcome> {
        Ok(self
            .request(|response| TableMessage::Act {
                id,
                action,
                response,
            })
            .await??)
    }

    pub async fn confirm_next_hand(&self, id: PlayerId) -> SessionResult<NextHand> {
        Ok(self
            .request(|response| TableMessage::ConfirmNextHand { id, response })
            .await??)
    }

    pub async fn confirm_settlement(&self, id: PlayerId) -> SessionResult<Confirmation> {
        Ok(self
            .request(|response| TableMessage::ConfirmSettlement { id, response })
            .await??)
    }

    pub async fn rebuy(&self, id: PlayerId) -> SessionResult<Chips> {
        Ok(self
            .request(|response| TableMessage::Rebuy { id, response })
            .await??)
    }

    pub async fn restart(&self) -> SessionResult<()> {
        self.request(|response| TableMessage::Restart { response })
            .await
    }

    pub async fn disconnect(&self, id: PlayerId) -> SessionResult<Departure> {
        Ok(self
            .request(|response| TableMessage::Disconnect { id, response })
            .await??)
    }

    pub async fn reconnect(&self, old: PlayerId, new: PlayerId) -> SessionResult<SeatIndex> {
        Ok(self
            .request(|response| TableMessage::Reconnect { old, new, response })
            .await??)
    }

    pub async fn leave(&self, id: PlayerId) -> SessionResult<Departure> {
        Ok(self
            .request(|response| TableMessage::Leave { id, response })
            .await??)
    }

    pub async fn view(&self, viewer: Option<PlayerId>) -> SessionResult<TableView> {
        self.request(|response| TableMessage::GetView { viewer, response })
            .await
    }

    pub async fn settlement(&self) -> SessionResult<Vec<SettlementEntry>> {
        self.request(|response| TableMessage::GetSettlement { response })
            .await
    }

    pub async fn summary(&self) -> SessionResult<TableSummary> {
        self.request(|response| TableMessage::GetSummary { response })
            .await
    }

    pub async fn subscribe(
        &self,
        subscriber: &str,
        sender: mpsc::Sender<StateChangeNotification>,
    ) -> SessionResult<()> {
        self.send(TableMessage::Subscribe {
            subscriber: subscriber.to_string(),
            sender,
        })
        .await
    }

    pub async fn close(&self) -> SessionResult<()> {
        self.request(|response| TableMessage::Close { response })
            .await
    }
}

/// Table actor owning a single table. Every engine call goes through its
/// inbox, so calls are applied one at a time in arrival order.
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// Table state machine
    table: Table,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Why the table stopped, once it has
    close_reason: Option<String>,

    /// Subscribers for state change notifications
    subscribers: HashMap<String, mpsc::Sender<StateChangeNotification>>,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `id` - Table ID
    /// * `config` - Table configuration
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(id: TableId, config: TableConfig) -> (Self, TableHandle) {
        let table = Table::new(config.settings.clone());
        Self::with_table(id, config, table)
    }

    /// Create an actor around a prebuilt table (custom shuffler or clock).
    pub fn with_table(id: TableId, config: TableConfig, table: Table) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let actor = Self {
            id,
            config,
            table,
            inbox,
            close_reason: None,
            subscribers: HashMap::new(),
        };
        (actor, TableHandle::new(sender, id))
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Table {} '{}' starting", self.id, self.config.name);

        let mut tick_interval = interval(self.config.tick_interval);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        // Every handle is gone.
                        None => break,
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick();
                }
            }

            if self.is_closed() {
                break;
            }
        }

        let reason = self
            .close_reason
            .take()
            .unwrap_or_else(|| "all handles dropped".to_string());
        self.notify(StateChangeNotification::Closed { reason });
        log::info!("Table {} '{}' closed", self.id, self.config.name);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join { id, name, response } => {
                let result = self.table.add_player(id, &name);
                self.reply(response, result);
                self.maybe_auto_start();
            }

            TableMessage::SetReady {
                id,
                ready,
                response,
            } => {
                let result = self.table.set_ready(&id, ready);
                self.reply(response, result);
                self.maybe_auto_start();
            }

            TableMessage::StartHand { response } => {
                let result = self.table.start_hand();
                self.reply(response, result);
            }

            TableMessage::Act {
                id,
                action,
                response,
            } => {
                let result = self.table.act(&id, action);
                self.reply(response, result);
            }

            TableMessage::ConfirmNextHand { id, response } => {
                let result = self.table.confirm_next_hand(&id);
                self.reply(response, result);
            }

            TableMessage::ConfirmSettlement { id, response } => {
                let result = self.table.confirm_settlement(&id);
                self.reply(response, result);
            }

            TableMessage::Rebuy { id, response } => {
                let result = self.table.rebuy(&id);
                self.reply(response, result);
                self.maybe_auto_start();
            }

            TableMessage::Restart { response } => {
                self.table.restart();
                self.publish_events();
                let _ = response.send(());
            }

            TableMessage::Disconnect { id, response } => {
                let result = self.table.mark_disconnected(&id);
                self.reply(response, result);
            }

            TableMessage::Reconnect { old, new, response } => {
                let result = self.table.reconnect(&old, new);
                self.reply(response, result);
                self.maybe_auto_start();
            }

            TableMessage::Leave { id, response } => {
                let result = self.table.remove_player(&id);
                self.reply(response, result);
            }

            TableMessage::GetView { viewer, response } => {
                let _ = response.send(self.table.view(viewer.as_ref()));
            }

            TableMessage::GetSettlement { response } => {
                let _ = response.send(self.table.settlement());
            }

            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }

            TableMessage::Tick => {
                self.tick();
            }

            TableMessage::Subscribe { subscriber, sender } => {
                log::debug!("{subscriber} subscribed to table {} state changes", self.id);
                self.subscribers.insert(subscriber, sender);
            }

            TableMessage::Unsubscribe { subscriber } => {
                self.subscribers.remove(&subscriber);
                log::debug!("{subscriber} unsubscribed from table {} state changes", self.id);
            }

            TableMessage::Close { response } => {
                self.close_reason = Some("closed by request".to_string());
                let _ = response.send(());
            }
        }
    }

    /// Send an engine result back to the caller, shutting the table down
    /// if it was fatal.
    fn reply<T>(&mut self, response: oneshot::Sender<TableResult<T>>, result: TableResult<T>) {
        if let Err(err) = &result {
            if err.is_fatal() {
                self.abort(err);
            } else {
                log::debug!("Table {}: rejected: {err}", self.id);
            }
        }
        self.publish_events();
        let _ = response.send(result);
    }

    fn maybe_auto_start(&mut self) {
        if self.is_closed() || !self.config.auto_start || !self.table.can_start() {
            return;
        }
        match self.table.start_hand() {
            Ok(_) => {}
            Err(err) if err.is_fatal() => self.abort(&err),
            Err(err) => log::warn!("Table {}: auto-start failed: {err}", self.id),
        }
        self.publish_events();
    }

    /// Fold whoever let their turn clock run out.
    fn tick(&mut self) {
        if self.is_closed() || !self.table.turn_expired() {
            return;
        }
        match self.table.force_timeout() {
            Ok(_) => {}
            Err(err) if err.is_fatal() => self.abort(&err),
            Err(err) => log::warn!("Table {}: timeout failed: {err}", self.id),
        }
        self.publish_events();
    }

    fn is_closed(&self) -> bool {
        self.close_reason.is_some()
    }

    fn abort(&mut self, err: &TableError) {
        log::error!("Table {}: fatal error, closing: {err}", self.id);
        self.close_reason = Some(err.to_string());
    }

    fn publish_events(&mut self) {
        let events = self.table.drain_events();
        if events.is_empty() {
            return;
        }
        log::debug!("Table {} generated {} events", self.id, events.len());
        for event in events {
            self.notify(StateChangeNotification::Event(event));
        }
    }

    /// Broadcast state change notification to all subscribers
    fn notify(&mut self, notification: StateChangeNotification) {
        self.subscribers.retain(|subscriber, sender| {
            match sender.try_send(notification.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Subscriber {subscriber} channel full, dropping notification");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Subscriber {subscriber} disconnected, removing");
                    false
                }
            }
        });
    }

    fn summary(&self) -> TableSummary {
        TableSummary {
            table_id: self.id,
            table_name: self.config.name.clone(),
            phase: self.table.phase(),
            round: self.table.round(),
            max_rounds: self.table.settings().max_rounds,
            player_count: self.table.seated_count(),
            max_players: self.table.settings().max_players,
            players: self
                .table
                .players()
                .filter(|p| p.connected)
                .map(|p| p.name.clone())
                .collect(),
        }
    }
}
