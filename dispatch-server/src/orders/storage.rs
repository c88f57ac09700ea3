//! redb-based storage layer for order event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(order_id, sequence)` | `OrderEvent` | Event stream (append-only) |
//! | `snapshots` | `order_id` | `OrderSnapshot` | Snapshot cache |
//! | `active_orders` | `order_id` | `()` | Non-terminal order index |
//! | `pending_pool` | `order_id` | `created_at` | Pending and unassigned orders |
//! | `processed_commands` | `command_id` | `order_id` | Idempotency check |
//! | `sequence_counter` | `&str` | `u64` | Global and ledger sequences |
//! | `wallet_ledger` | `(driver_id, entry_seq)` | `WalletTransaction` | Driver ledger (append-only) |
//! | `settled_orders` | `order_id` | `transaction_id` | One credit per delivered order |
//! | `rejections` | `(order_id, sequence)` | `RejectionLogEntry` | Rejection log (append-only) |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns the
//! order snapshot, its events and any ledger entry written in the same
//! transaction are on disk together, or none of them are.
//!
//! # Concurrency
//!
//! redb admits one write transaction at a time. Every check-then-write in the
//! engine (assignment, settlement, withdrawal) happens inside a single write
//! transaction and is therefore atomic.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::order::{OrderEvent, OrderSnapshot};
use shared::rejection::RejectionLogEntry;
use shared::wallet::WalletTransaction;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing events: key = (order_id, sequence), value = JSON-serialized OrderEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Table for storing snapshots: key = order_id, value = JSON-serialized OrderSnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Table for tracking non-terminal orders: key = order_id, value = empty (existence check)
const ACTIVE_ORDERS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_orders");

/// Table for the pending pool: key = order_id, value = created_at (oldest first on read)
const PENDING_POOL_TABLE: TableDefinition<&str, i64> = TableDefinition::new("pending_pool");

/// Table for tracking processed commands: key = command_id, value = order the command acted on
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("processed_commands");

/// Table for sequence counters: key = counter name, value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Table for the wallet ledger: key = (driver_id, entry_seq), value = JSON-serialized WalletTransaction
const WALLET_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("wallet_ledger");

/// Table for settlement markers: key = order_id, value = credit transaction id
const SETTLED_ORDERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("settled_orders");

/// Table for the rejection log: key = (order_id, sequence), value = JSON-serialized RejectionLogEntry
const REJECTIONS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("rejections");

const SEQUENCE_KEY: &str = "seq";
const WALLET_SEQUENCE_KEY: &str = "wallet_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    /// Create all tables and the sequence counters if they don't exist
    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PENDING_POOL_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(WALLET_TABLE)?;
            let _ = write_txn.open_table(SETTLED_ORDERS_TABLE)?;
            let _ = write_txn.open_table(REJECTIONS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            for key in [SEQUENCE_KEY, WALLET_SEQUENCE_KEY] {
                if seq_table.get(key)?.is_none() {
                    seq_table.insert(key, 0u64)?;
                }
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get the next sequence number (does NOT increment - use within transaction)
    pub fn get_next_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        Ok(self.get_current_sequence_txn(txn)? + 1)
    }

    /// Increment and return the global sequence number
    pub fn increment_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        Self::increment_counter(txn, SEQUENCE_KEY)
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Get current sequence (within transaction)
    pub fn get_current_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    ///
    /// Called once per command with the highest sequence its events used.
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    fn increment_counter(txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Order a processed command acted on (used to answer duplicates)
    pub fn get_processed_order_id(&self, command_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.map(|guard| guard.value().to_string()))
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, order_id)?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &OrderEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.order_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for an order
    pub fn get_events_for_order(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events since a given sequence (across all orders)
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events for non-terminal orders since a given sequence
    pub fn get_active_events_since(&self, since_sequence: u64) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let active_table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;

        let mut events = Vec::new();
        for result in active_table.iter()? {
            let (key, _value) = result?;
            let order_id = key.value();
            for result in events_table.range((order_id, since_sequence + 1)..=(order_id, u64::MAX))? {
                let (_key, value) = result?;
                let event: OrderEvent = serde_json::from_slice(value.value())?;
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Snapshot Operations ==========

    /// Store a snapshot
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &OrderSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.order_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a snapshot by order ID
    pub fn get_snapshot(&self, order_id: &str) -> StorageResult<Option<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => {
                let snapshot: OrderSnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get a snapshot by order ID (within transaction)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => {
                let snapshot: OrderSnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get all snapshots
    pub fn get_all_snapshots(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let snapshot: OrderSnapshot = serde_json::from_slice(value.value())?;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    // ========== Active Orders ==========

    /// Mark an order as active (non-terminal)
    pub fn mark_order_active(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.insert(order_id, ())?;
        Ok(())
    }

    /// Mark an order as inactive
    pub fn mark_order_inactive(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Check if an order is active
    pub fn is_order_active(&self, order_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        Ok(table.get(order_id)?.is_some())
    }

    /// Get all active order IDs
    pub fn get_active_order_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;

        let mut order_ids: Vec<String> = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            order_ids.push(key.value().to_string());
        }

        Ok(order_ids)
    }

    /// Get all active order snapshots
    pub fn get_active_orders(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let active_table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in active_table.iter()? {
            let (key, _) = result?;
            if let Some(value) = snapshots_table.get(key.value())? {
                snapshots.push(serde_json::from_slice(value.value())?);
            }
        }

        Ok(snapshots)
    }

    // ========== Pending Pool ==========

    /// Put an order into the pending pool
    pub fn add_to_pending_pool(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        created_at: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_POOL_TABLE)?;
        table.insert(order_id, created_at)?;
        Ok(())
    }

    /// Take an order out of the pending pool
    pub fn remove_from_pending_pool(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_POOL_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Pending pool snapshots, oldest first
    ///
    /// Index and snapshots are read from one MVCC snapshot, so an order
    /// accepted by another driver never shows up here once that commit lands.
    pub fn get_pending_pool(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let pool_table = read_txn.open_table(PENDING_POOL_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut snapshots: Vec<OrderSnapshot> = Vec::new();
        for result in pool_table.iter()? {
            let (key, _created_at) = result?;
            if let Some(value) = snapshots_table.get(key.value())? {
                snapshots.push(serde_json::from_slice(value.value())?);
            }
        }
        // A pending order's last sequence is its creation sequence
        snapshots.sort_by_key(|s| (s.created_at, s.last_sequence));

        Ok(snapshots)
    }

    // ========== Wallet Ledger ==========

    /// Append a ledger entry (within transaction)
    pub fn append_wallet_entry(
        &self,
        txn: &WriteTransaction,
        entry: &WalletTransaction,
    ) -> StorageResult<u64> {
        let entry_seq = Self::increment_counter(txn, WALLET_SEQUENCE_KEY)?;
        let mut table = txn.open_table(WALLET_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert((entry.driver_id.as_str(), entry_seq), value.as_slice())?;
        Ok(entry_seq)
    }

    /// All ledger entries for a driver, in insertion order
    pub fn get_wallet_entries(&self, driver_id: &str) -> StorageResult<Vec<WalletTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((driver_id, 0u64)..=(driver_id, u64::MAX))? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// All ledger entries for a driver (within transaction)
    pub fn get_wallet_entries_txn(
        &self,
        txn: &WriteTransaction,
        driver_id: &str,
    ) -> StorageResult<Vec<WalletTransaction>> {
        let table = txn.open_table(WALLET_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((driver_id, 0u64)..=(driver_id, u64::MAX))? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Settlement credit already recorded for this order (within transaction)
    pub fn get_settlement_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(SETTLED_ORDERS_TABLE)?;
        Ok(table.get(order_id)?.map(|guard| guard.value().to_string()))
    }

    /// Settlement credit recorded for this order
    pub fn get_settlement(&self, order_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTLED_ORDERS_TABLE)?;
        Ok(table.get(order_id)?.map(|guard| guard.value().to_string()))
    }

    /// Record that an order has been settled by the given credit
    pub fn mark_order_settled(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        transaction_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SETTLED_ORDERS_TABLE)?;
        table.insert(order_id, transaction_id)?;
        Ok(())
    }

    // ========== Rejection Log ==========

    /// Append a rejection entry (within transaction)
    pub fn store_rejection(
        &self,
        txn: &WriteTransaction,
        entry: &RejectionLogEntry,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(REJECTIONS_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert((entry.order_id.as_str(), entry.sequence), value.as_slice())?;
        Ok(())
    }

    /// Rejections for one order, oldest first
    pub fn get_rejections_for_order(&self, order_id: &str) -> StorageResult<Vec<RejectionLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REJECTIONS_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Whole rejection log, ordered by sequence
    pub fn get_all_rejections(&self) -> StorageResult<Vec<RejectionLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REJECTIONS_TABLE)?;

        let mut entries: Vec<RejectionLogEntry> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        let active_table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let pool_table = read_txn.open_table(PENDING_POOL_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let wallet_table = read_txn.open_table(WALLET_TABLE)?;
        let rejections_table = read_txn.open_table(REJECTIONS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            event_count: events_table.len()?,
            snapshot_count: snapshots_table.len()?,
            active_order_count: active_table.len()?,
            pending_pool_count: pool_table.len()?,
            processed_command_count: commands_table.len()?,
            wallet_entry_count: wallet_table.len()?,
            rejection_count: rejections_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub event_count: u64,
    pub snapshot_count: u64,
    pub active_order_count: u64,
    pub pending_pool_count: u64,
    pub processed_command_count: u64,
    pub wallet_entry_count: u64,
    pub rejection_count: u64,
    pub current_sequence: u64,
}
