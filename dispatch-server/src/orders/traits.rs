//! Core traits of the command/event pipeline
//!
//! - [`CommandHandler`]: validates a command against current state and emits events
//! - [`EventApplier`]: folds one event into a snapshot (pure)
//! - [`CommandContext`]: transaction-scoped view used by handlers

use std::collections::HashMap;

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use thiserror::Error;

use super::appliers::{
    DeliveryCompletedApplier, DeliveryStartedApplier, DriverAssignedApplier, EventAction,
    IssueReportedApplier, OrderCancelledApplier, OrderCreatedApplier, PickedUpApplier,
};
use super::storage::{OrderStorage, StorageError};
use shared::Role;
use shared::order::{OrderEvent, OrderSnapshot, OrderStatus};

/// Errors raised while handling a command
///
/// Checked in this order: not found, transition, ownership, payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order already assigned: {0}")]
    AlreadyAssigned(String),

    #[error("Driver not eligible: {0}")]
    NotEligible(String),

    #[error("Order {0} is not assigned to this driver")]
    NotAssignedDriver(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        OrderError::Storage(err.to_string())
    }
}

impl OrderError {
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Self {
        OrderError::InvalidTransition { from, to }
    }
}

/// Caller information attached to every event a command produces
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_role: Role,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
}

/// Transaction-scoped state for one command
///
/// Snapshots loaded or saved here shadow storage until the manager writes
/// them back; sequence numbers are handed out from the value read at the
/// start of the transaction.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    current_sequence: u64,
    snapshots: HashMap<String, OrderSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            current_sequence,
            snapshots: HashMap::new(),
        }
    }

    /// Load a snapshot, preferring one already modified in this command
    pub fn load_snapshot(&self, order_id: &str) -> Result<OrderSnapshot, OrderError> {
        if let Some(snapshot) = self.snapshots.get(order_id) {
            return Ok(snapshot.clone());
        }
        self.storage
            .get_snapshot_txn(self.txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    pub fn save_snapshot(&mut self, snapshot: OrderSnapshot) {
        self.snapshots.insert(snapshot.order_id.clone(), snapshot);
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.current_sequence += 1;
        self.current_sequence
    }

    pub fn current_sequence(&self) -> u64 {
        self.current_sequence
    }

    pub fn modified_snapshots(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.snapshots.values()
    }

    pub fn txn(&self) -> &'a WriteTransaction {
        self.txn
    }

    pub fn storage(&self) -> &'a OrderStorage {
        self.storage
    }
}

/// Command handler: validate against current state, return events
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError>;
}

/// Event applier: pure fold of one event into a snapshot
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent);
}
