//! Table manager for spawning table actors and tracking who sits where.

use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle, time::interval};
use uuid::Uuid;

use super::{
    TableId,
    actor::{TableActor, TableHandle},
    config::TableConfig,
    errors::{SessionError, SessionResult},
};
use crate::game::{
    Departure, Table, TableError,
    clock::{Clock, SystemClock},
    entities::{Phase, PlayerId, SeatIndex, sanitize_name},
};

/// Table metadata for discovery
#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub id: TableId,
    pub short_id: String,
    pub name: String,
    pub phase: Phase,
    pub round: u32,
    pub max_rounds: u32,
    pub player_count: usize,
    pub max_players: usize,
}

/// Eight hex digits identifying a table in logs and listings.
#[must_use]
pub fn short_id(id: &TableId) -> String {
    id.simple().to_string()[..8].to_string()
}

#[derive(Debug, Clone)]
struct TableEntry {
    handle: TableHandle,
    name: String,
    disconnect_grace: Duration,
}

#[derive(Debug, Clone)]
struct SeatRecord {
    table_id: TableId,
    name: String,
}

#[derive(Debug, Clone)]
struct DisconnectRecord {
    table_id: TableId,
    name: String,
    deadline: DateTime<Utc>,
}

/// Owns every table actor, the identity -> table mapping, and disconnect
/// deadlines.
pub struct TableManager {
    /// Active tables
    tables: Arc<RwLock<HashMap<TableId, TableEntry>>>,

    /// Table each connected or disconnected identity is seated at
    seats: Arc<RwLock<HashMap<PlayerId, SeatRecord>>>,

    /// Identities whose connection dropped, keyed by their old token
    disconnected: Arc<RwLock<HashMap<PlayerId, DisconnectRecord>>>,

    clock: Arc<dyn Clock>,
}

impl Default for TableManager {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TableManager {
    /// Create a new table manager reading disconnect deadlines from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            seats: Arc::new(RwLock::new(HashMap::new())),
            disconnected: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Create a table and spawn its actor
    pub async fn create_table(&self, config: TableConfig) -> SessionResult<TableHandle> {
        let table = Table::new(config.settings.clone());
        self.create_table_with(config, table).await
    }

    /// Spawn an actor around a prebuilt table (custom shuffler or clock).
    pub async fn create_table_with(
        &self,
        config: TableConfig,
        table: Table,
    ) -> SessionResult<TableHandle> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let table_id = Uuid::new_v4();
        let entry = TableEntry {
            name: config.name.clone(),
            disconnect_grace: config.disconnect_grace,
            handle: {
                let (actor, handle) = TableActor::with_table(table_id, config, table);
                tokio::spawn(actor.run());
                handle
            },
        };
        let handle = entry.handle.clone();

        let mut tables = self.tables.write().await;
        tables.insert(table_id, entry);
        drop(tables);

        log::info!("Created and spawned table {}", short_id(&table_id));
        Ok(handle)
    }

    /// Get a table handle
    pub async fn get_table(&self, table_id: TableId) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(&table_id).map(|entry| entry.handle.clone())
    }

    /// Look a table up by the prefix shown in listings.
    pub async fn find_table(&self, short: &str) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables
            .iter()
            .find(|(id, _)| short_id(id).starts_with(short))
            .map(|(_, entry)| entry.handle.clone())
    }

    /// List all open tables
    pub async fn list_tables(&self) -> Vec<TableMetadata> {
        let entries: Vec<TableEntry> = {
            let tables = self.tables.read().await;
            tables.values().cloned().collect()
        };

        let mut metadata = Vec::with_capacity(entries.len());
        for entry in entries {
            let Ok(summary) = entry.handle.summary().await else {
                continue;
            };
            metadata.push(TableMetadata {
                id: summary.table_id,
                short_id: short_id(&summary.table_id),
                name: entry.name,
                phase: summary.phase,
                round: summary.round,
                max_rounds: summary.max_rounds,
                player_count: summary.player_count,
                max_players: summary.max_players,
            });
        }
        metadata.sort_by(|a, b| a.name.cmp(&b.name));
        metadata
    }

    /// Close a table and forget everyone seated there.
    pub async fn close_table(&self, table_id: TableId) -> SessionResult<()> {
        let entry = {
            let mut tables = self.tables.write().await;
            tables.remove(&table_id)
        }
        .ok_or(SessionError::TableNotFound(table_id))?;

        // An actor that already shut itself down is fine.
        let _ = entry.handle.close().await;
        self.seats
            .write()
            .await
            .retain(|_, record| record.table_id != table_id);
        self.disconnected
            .write()
            .await
            .retain(|_, record| record.table_id != table_id);

        log::info!("Closed table {}", short_id(&table_id));
        Ok(())
    }

    /// Seat `id` at a table. A disconnected seat at that table with the
    /// same display name is handed back instead of taking a new seat.
    pub async fn join(
        &self,
        table_id: TableId,
        id: PlayerId,
        name: &str,
    ) -> SessionResult<SeatIndex> {
        let handle = self
            .get_table(table_id)
            .await
            .ok_or(SessionError::TableNotFound(table_id))?;
        let name = sanitize_name(name);

        // Hold the identity while the actor seats it so a concurrent join
        // elsewhere sees it as taken.
        {
            let mut seats = self.seats.write().await;
            if seats.contains_key(&id) {
                return Err(SessionError::AlreadySeated);
            }
            seats.insert(
                id.clone(),
                SeatRecord {
                    table_id,
                    name: name.clone(),
                },
            );
        }

        let result = self.seat_reserved(&handle, id.clone(), name).await;
        if result.is_err() {
            let mut seats = self.seats.write().await;
            if seats.get(&id).is_some_and(|record| record.table_id == table_id) {
                seats.remove(&id);
            }
        }
        result
    }

    async fn seat_reserved(
        &self,
        handle: &TableHandle,
        id: PlayerId,
        name: String,
    ) -> SessionResult<SeatIndex> {
        let table_id = handle.table_id();
        let reclaim = {
            let disconnected = self.disconnected.read().await;
            disconnected
                .iter()
                .find(|(_, record)| record.table_id == table_id && record.name == name)
                .map(|(old, _)| old.clone())
        };
        if let Some(old) = reclaim {
            return self.reconnect(&old, id).await;
        }

        handle.join(id, &name).await
    }

    /// Handle of the table `id` is seated at.
    pub async fn table_for(&self, id: &PlayerId) -> SessionResult<TableHandle> {
        let table_id = self
            .seats
            .read()
            .await
            .get(id)
            .map(|record| record.table_id)
            .ok_or(SessionError::NotSeated)?;
        self.get_table(table_id)
            .await
            .ok_or(SessionError::TableNotFound(table_id))
    }

    /// Record a dropped connection and start its grace period.
    pub async fn disconnect(&self, id: &PlayerId) -> SessionResult<Departure> {
        let record = self
            .seats
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(SessionError::NotSeated)?;
        let (handle, grace) = {
            let tables = self.tables.read().await;
            let entry = tables
                .get(&record.table_id)
                .ok_or(SessionError::TableNotFound(record.table_id))?;
            (entry.handle.clone(), entry.disconnect_grace)
        };

        let departure = handle.disconnect(id.clone()).await?;
        let deadline = chrono::Duration::from_std(grace)
            .ok()
            .and_then(|grace| self.clock.now().checked_add_signed(grace))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        log::info!(
            "{} disconnected from table {}; seat held until {deadline}",
            record.name,
            short_id(&record.table_id)
        );
        self.disconnected.write().await.insert(
            id.clone(),
            DisconnectRecord {
                table_id: record.table_id,
                name: record.name,
                deadline,
            },
        );
        Ok(departure)
    }

    /// Give a disconnected seat a fresh identity.
    pub async fn reconnect(&self, old: &PlayerId, new: PlayerId) -> SessionResult<SeatIndex> {
        let record = self
            .disconnected
            .read()
            .await
            .get(old)
            .cloned()
            .ok_or(SessionError::NoDisconnectRecord)?;
        let handle = self
            .get_table(record.table_id)
            .await
            .ok_or(SessionError::TableNotFound(record.table_id))?;

        let seat = handle.reconnect(old.clone(), new.clone()).await?;
        self.disconnected.write().await.remove(old);
        let mut seats = self.seats.write().await;
        seats.remove(old);
        seats.insert(
            new,
            SeatRecord {
                table_id: record.table_id,
                name: record.name,
            },
        );
        Ok(seat)
    }

    /// Leave for good.
    pub async fn leave(&self, id: &PlayerId) -> SessionResult<Departure> {
        let handle = self.table_for(id).await?;
        let departure = handle.leave(id.clone()).await?;
        self.seats.write().await.remove(id);
        self.disconnected.write().await.remove(id);
        Ok(departure)
    }

    /// Evict players whose grace period ran out, close tables they left
    /// empty, and drop tables whose actor has stopped. Returns the number
    /// of evicted players.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<(PlayerId, DisconnectRecord)> = {
            let disconnected = self.disconnected.read().await;
            disconnected
                .iter()
                .filter(|(_, record)| record.deadline <= now)
                .map(|(id, record)| (id.clone(), record.clone()))
                .collect()
        };

        let mut evicted = 0;
        let mut touched: Vec<TableId> = Vec::new();
        for (id, record) in expired {
            self.disconnected.write().await.remove(&id);
            self.seats.write().await.remove(&id);
            let Some(handle) = self.get_table(record.table_id).await else {
                continue;
            };
            match handle.leave(id).await {
                Ok(_) | Err(SessionError::Table(TableError::PlayerNotFound)) => {}
                Err(err) => log::warn!("evicting {} failed: {err}", record.name),
            }
            log::info!(
                "evicted {} from table {} after grace period",
                record.name,
                short_id(&record.table_id)
            );
            evicted += 1;
            if !touched.contains(&record.table_id) {
                touched.push(record.table_id);
            }
        }

        for table_id in touched {
            let Some(handle) = self.get_table(table_id).await else {
                continue;
            };
            if handle
                .summary()
                .await
                .is_ok_and(|summary| summary.player_count == 0)
            {
                let _ = self.close_table(table_id).await;
            }
        }

        let stopped: Vec<TableId> = {
            let tables = self.tables.read().await;
            tables
                .iter()
                .filter(|(_, entry)| entry.handle.is_closed())
                .map(|(id, _)| *id)
                .collect()
        };
        for table_id in stopped {
            let _ = self.close_table(table_id).await;
        }

        evicted
    }

    /// Run [`Self::sweep`] every `period` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let evicted = manager.sweep().await;
                if evicted > 0 {
                    log::debug!("sweeper evicted {evicted} players");
                }
            }
        })
    }

    /// Get active table count
    pub async fn active_table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.len()
    }
}
