//! OrdersManager - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional)
//! - Snapshot and index updates
//! - Wallet settlement for delivered orders
//! - Notification broadcasting
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Pre-checks outside the transaction (eligibility, reject cooldown)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Create CommandContext
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events, snapshots and indexes
//!     ├─ 8. Settle delivered orders into the wallet ledger
//!     ├─ 9. Mark command processed
//!     ├─ 10. Commit transaction
//!     ├─ 11. Broadcast notifications
//!     └─ 12. Return response
//! ```
//!
//! redb admits one write transaction at a time, so steps 3 to 10 run
//! serialised across every caller. That is what makes driver assignment
//! and settlement race-free.

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::{self, EventAction};
use super::ledger::WalletLedger;
use super::policy::DispatchPolicy;
use super::storage::{OrderStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use crate::profiles::ProfileDirectory;
use rust_decimal::Decimal;
use shared::order::{
    CommandResponse, DeliveryAddress, OrderCommand, OrderCommandPayload, OrderEvent, OrderFilter,
    OrderItem, OrderSnapshot, OrderStatus,
};
use shared::rejection::{RejectionFilter, RejectionLogEntry};
use shared::wallet::{WalletBalance, WalletTransaction};
use shared::{DispatchNotification, Role};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Notification broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 65536;

/// Operator id used by maintenance jobs
pub const SYSTEM_OPERATOR: &str = "system";

/// OrdersManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and trigger full resync.
pub struct OrdersManager {
    storage: OrderStorage,
    ledger: WalletLedger,
    profiles: Arc<dyn ProfileDirectory>,
    policy: DispatchPolicy,
    event_tx: broadcast::Sender<DispatchNotification>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("policy", &self.policy)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Result of one committed command
struct Processed {
    response: CommandResponse,
    notifications: Vec<DispatchNotification>,
    credits: Vec<WalletTransaction>,
}

impl OrdersManager {
    /// Create a new OrdersManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        profiles: Arc<dyn ProfileDirectory>,
    ) -> ManagerResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        let manager = Self::from_parts(storage, profiles);
        tracing::info!(epoch = %manager.epoch, "OrdersManager started with new epoch");
        Ok(manager)
    }

    /// Create an OrdersManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: OrderStorage, profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self::from_parts(storage, profiles)
    }

    fn from_parts(storage: OrderStorage, profiles: Arc<dyn ProfileDirectory>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ledger: WalletLedger::new(storage.clone()),
            storage,
            profiles,
            policy: DispatchPolicy::default(),
            event_tx,
            epoch: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Replace the dispatch policy
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to notification broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchNotification> {
        self.event_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileDirectory> {
        &self.profiles
    }

    // ========== Command Execution ==========

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: OrderCommand) -> CommandResponse {
        match self.process_with_retry(&cmd) {
            Ok(processed) => self.publish(processed),
            Err(err) => CommandResponse::error(cmd.command_id, err.into()),
        }
    }

    /// Execute a command and return the post-transition order
    ///
    /// A repeated command id returns the current order and applies nothing.
    pub fn execute(&self, cmd: OrderCommand) -> ManagerResult<OrderSnapshot> {
        let processed = self.process_with_retry(&cmd)?;
        let response = self.publish(processed);
        response.order.ok_or_else(|| {
            ManagerError::Internal(format!(
                "command {} finished without an order",
                response.command_id
            ))
        })
    }

    /// Broadcast after commit, then log ledger movements
    fn publish(&self, processed: Processed) -> CommandResponse {
        let Processed {
            response,
            notifications,
            credits,
        } = processed;

        for credit in &credits {
            crate::audit_log!(
                credit.driver_id.as_str(),
                "wallet.settle",
                credit.order_id.as_deref().unwrap_or_default(),
                format!("credit {}", credit.amount)
            );
        }
        self.broadcast(notifications);
        response
    }

    fn broadcast(&self, notifications: Vec<DispatchNotification>) {
        for notification in notifications {
            if self.event_tx.send(notification).is_err() {
                tracing::debug!("Notification broadcast skipped: no active receivers");
                break;
            }
        }
    }

    /// Run a command, retrying storage failures of settling commands
    fn process_with_retry(&self, cmd: &OrderCommand) -> ManagerResult<Processed> {
        if !cmd.payload.settles_wallet() {
            return self.process_command(cmd);
        }
        retry_settlement(&self.policy, &cmd.command_id, || self.process_command(cmd))
    }

    /// Process command and return the committed result
    ///
    /// Uses the action-based architecture:
    /// 1. Convert command to CommandAction
    /// 2. Execute action to generate events
    /// 3. Apply events to snapshots via EventApplier
    /// 4. Persist everything atomically, including ledger entries
    fn process_command(&self, cmd: &OrderCommand) -> ManagerResult<Processed> {
        tracing::debug!(command_id = %cmd.command_id, command = cmd.payload.name(), "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return self.duplicate(cmd);
        }

        // 2. Pre-checks that read outside the order store
        if let OrderCommandPayload::AcceptOrder {
            order_id,
            driver_id,
        } = &cmd.payload
        {
            self.ensure_eligible(driver_id)?;
            self.ensure_no_recent_rejection(order_id, driver_id)?;
        }

        // 3. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self.storage.is_command_processed_txn(&txn, &cmd.command_id)? {
            drop(txn);
            return self.duplicate(cmd);
        }

        // 4. Get current sequence for context initialization
        let current_sequence = self.storage.get_current_sequence_txn(&txn)?;

        // 5. Create context and metadata
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_role: cmd.operator_role,
            timestamp: cmd.timestamp,
        };

        // 6. Convert to action and execute
        let action: CommandAction = cmd.into();
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        // 7. Apply events to snapshots
        for event in &events {
            let mut snapshot = ctx
                .load_snapshot(&event.order_id)
                .unwrap_or_else(|_| OrderSnapshot::new(event.order_id.clone()));

            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);

            ctx.save_snapshot(snapshot);
        }

        // 8. Persist events
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }

        // 9. Persist snapshots, maintain indexes, settle deliveries
        let mut credits = Vec::new();
        let mut notifications = Vec::new();
        let modified: Vec<OrderSnapshot> = ctx.modified_snapshots().cloned().collect();
        for snapshot in &modified {
            self.storage.store_snapshot(&txn, snapshot)?;

            if snapshot.is_open_for_dispatch() {
                self.storage
                    .add_to_pending_pool(&txn, &snapshot.order_id, snapshot.created_at)?;
            } else {
                self.storage
                    .remove_from_pending_pool(&txn, &snapshot.order_id)?;
            }

            if snapshot.status.is_terminal() {
                self.storage.mark_order_inactive(&txn, &snapshot.order_id)?;
            } else {
                self.storage.mark_order_active(&txn, &snapshot.order_id)?;
            }

            if let Some(credit) = self.ledger.settle_in_txn(&txn, snapshot)? {
                credits.push(credit);
            }

            notifications.push(DispatchNotification::OrderChanged {
                sequence: snapshot.last_sequence,
                order: snapshot.clone(),
            });
        }

        // 10. Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 11. Mark command processed
        let order = modified.into_iter().next();
        let order_id = order.as_ref().map(|o| o.order_id.as_str()).unwrap_or_default();
        self.storage
            .mark_command_processed(&txn, &cmd.command_id, order_id)?;

        // 12. Commit transaction
        drop(ctx);
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            command_id = %cmd.command_id,
            command = cmd.payload.name(),
            order_id = %order_id,
            event_count = events.len(),
            "Command processed successfully"
        );

        let response = match order {
            Some(order) => CommandResponse::success(cmd.command_id.clone(), order),
            None => CommandResponse::duplicate(cmd.command_id.clone(), None),
        };

        Ok(Processed {
            response,
            notifications,
            credits,
        })
    }

    /// Acknowledge a repeated command id with the order's current state
    fn duplicate(&self, cmd: &OrderCommand) -> ManagerResult<Processed> {
        let order = match self.storage.get_processed_order_id(&cmd.command_id)? {
            Some(order_id) => self.storage.get_snapshot(&order_id)?,
            None => None,
        };
        Ok(Processed {
            response: CommandResponse::duplicate(cmd.command_id.clone(), order),
            notifications: Vec::new(),
            credits: Vec::new(),
        })
    }

    /// Eligibility gate: approved and not blocked
    fn ensure_eligible(&self, driver_id: &str) -> ManagerResult<()> {
        if self.profiles.is_eligible(driver_id) {
            Ok(())
        } else {
            tracing::info!(driver_id = %driver_id, "Driver failed eligibility gate");
            Err(ManagerError::NotEligible(driver_id.to_string()))
        }
    }

    /// Reject cooldown policy hook
    fn ensure_no_recent_rejection(&self, order_id: &str, driver_id: &str) -> ManagerResult<()> {
        let Some(cooldown) = self.policy.reject_cooldown else {
            return Ok(());
        };
        let since = shared::util::now_millis() - cooldown.as_millis() as i64;
        let recent = self
            .storage
            .get_rejections_for_order(order_id)?
            .into_iter()
            .any(|r| r.driver_id == driver_id && r.created_at >= since);
        if recent {
            return Err(ManagerError::NotEligible(format!(
                "{} rejected order {} less than {}s ago",
                driver_id,
                order_id,
                cooldown.as_secs()
            )));
        }
        Ok(())
    }

    // ========== Typed Operations ==========

    pub fn create_order(
        &self,
        client_id: &str,
        client_name: &str,
        items: Vec<OrderItem>,
        delivery_address: DeliveryAddress,
        pickup_address: Option<DeliveryAddress>,
        delivery_fee: Decimal,
    ) -> ManagerResult<OrderSnapshot> {
        self.execute(OrderCommand::new(
            client_id.to_string(),
            Role::Client,
            OrderCommandPayload::CreateOrder {
                client_id: client_id.to_string(),
                client_name: client_name.to_string(),
                items,
                delivery_address,
                pickup_address,
                delivery_fee,
            },
        ))
    }

    /// Driver takes a pending order; exactly one concurrent caller wins
    pub fn accept_order(&self, order_id: &str, driver_id: &str) -> ManagerResult<OrderSnapshot> {
        let order = self.execute(OrderCommand::new(
            driver_id.to_string(),
            Role::Driver,
            OrderCommandPayload::AcceptOrder {
                order_id: order_id.to_string(),
                driver_id: driver_id.to_string(),
            },
        ))?;
        crate::audit_log!(driver_id, "order.accept", order_id);
        Ok(order)
    }

    /// Record a driver decline; the order itself is untouched
    pub fn reject_order(
        &self,
        order_id: &str,
        driver_id: &str,
        reason: &str,
    ) -> ManagerResult<RejectionLogEntry> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ManagerError::Validation(
                "rejection reason is required".to_string(),
            ));
        }
        if self.storage.get_snapshot(order_id)?.is_none() {
            return Err(ManagerError::OrderNotFound(order_id.to_string()));
        }
        self.ensure_eligible(driver_id)?;

        let txn = self.storage.begin_write()?;
        let sequence = self.storage.increment_sequence(&txn)?;
        let entry = RejectionLogEntry {
            id: shared::util::new_id(),
            sequence,
            order_id: order_id.to_string(),
            driver_id: driver_id.to_string(),
            reason: reason.to_string(),
            created_at: shared::util::now_millis(),
        };
        self.storage.store_rejection(&txn, &entry)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order_id, driver_id = %driver_id, sequence, "Rejection logged");
        crate::audit_log!(driver_id, "order.reject", order_id, entry.reason.as_str());
        self.broadcast(vec![DispatchNotification::RejectionLogged {
            sequence,
            entry: entry.clone(),
        }]);
        Ok(entry)
    }

    /// Admin override, no eligibility gate
    pub fn assign_driver(
        &self,
        order_id: &str,
        driver_id: &str,
        admin_id: &str,
    ) -> ManagerResult<OrderSnapshot> {
        let order = self.execute(OrderCommand::new(
            admin_id.to_string(),
            Role::Admin,
            OrderCommandPayload::AssignDriver {
                order_id: order_id.to_string(),
                driver_id: driver_id.to_string(),
            },
        ))?;
        crate::audit_log!(admin_id, "order.assign", order_id, driver_id);
        Ok(order)
    }

    pub fn mark_picked_up(
        &self,
        order_id: &str,
        driver_id: &str,
        pickup_photo_url: Option<&str>,
    ) -> ManagerResult<OrderSnapshot> {
        self.execute(OrderCommand::new(
            driver_id.to_string(),
            Role::Driver,
            OrderCommandPayload::MarkPickedUp {
                order_id: order_id.to_string(),
                driver_id: driver_id.to_string(),
                pickup_photo_url: pickup_photo_url.map(str::to_string),
            },
        ))
    }

    pub fn start_delivery(
        &self,
        order_id: &str,
        driver_id: &str,
        pickup_photo_url: Option<&str>,
    ) -> ManagerResult<OrderSnapshot> {
        self.execute(OrderCommand::new(
            driver_id.to_string(),
            Role::Driver,
            OrderCommandPayload::StartDelivery {
                order_id: order_id.to_string(),
                driver_id: driver_id.to_string(),
                pickup_photo_url: pickup_photo_url.map(str::to_string),
            },
        ))
    }

    /// Deliver and settle in one commit
    pub fn complete_delivery(
        &self,
        order_id: &str,
        driver_id: &str,
        delivery_photo_url: Option<&str>,
        signature_data: Option<&str>,
        notes: Option<&str>,
    ) -> ManagerResult<OrderSnapshot> {
        self.execute(OrderCommand::new(
            driver_id.to_string(),
            Role::Driver,
            OrderCommandPayload::CompleteDelivery {
                order_id: order_id.to_string(),
                driver_id: driver_id.to_string(),
                delivery_photo_url: delivery_photo_url.map(str::to_string),
                signature_data: signature_data.map(str::to_string),
                notes: notes.map(str::to_string),
            },
        ))
    }

    pub fn cancel_order(
        &self,
        order_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> ManagerResult<OrderSnapshot> {
        self.cancel_as(order_id, admin_id, Role::Admin, reason)
    }

    fn cancel_as(
        &self,
        order_id: &str,
        operator_id: &str,
        role: Role,
        reason: &str,
    ) -> ManagerResult<OrderSnapshot> {
        let order = self.execute(OrderCommand::new(
            operator_id.to_string(),
            role,
            OrderCommandPayload::CancelOrder {
                order_id: order_id.to_string(),
                reason: reason.to_string(),
            },
        ))?;
        crate::audit_log!(operator_id, "order.cancel", order_id, reason);
        Ok(order)
    }

    pub fn report_issue(
        &self,
        order_id: &str,
        driver_id: &str,
        note: &str,
    ) -> ManagerResult<OrderSnapshot> {
        self.execute(OrderCommand::new(
            driver_id.to_string(),
            Role::Driver,
            OrderCommandPayload::ReportIssue {
                order_id: order_id.to_string(),
                driver_id: driver_id.to_string(),
                note: note.to_string(),
            },
        ))
    }

    // ========== Wallet ==========

    pub fn get_balance(&self, driver_id: &str) -> ManagerResult<WalletBalance> {
        Ok(self.ledger.balance(driver_id)?)
    }

    pub fn get_wallet_history(&self, driver_id: &str) -> ManagerResult<Vec<WalletTransaction>> {
        Ok(self.ledger.history(driver_id)?)
    }

    pub fn record_withdrawal(
        &self,
        driver_id: &str,
        amount: Decimal,
        description: &str,
    ) -> ManagerResult<WalletTransaction> {
        let debit = self.ledger.withdraw(driver_id, amount, description)?;
        tracing::info!(driver_id = %driver_id, amount = %debit.amount, "Withdrawal recorded");
        crate::audit_log!(
            driver_id,
            "wallet.withdraw",
            debit.id.as_str(),
            format!("debit {}", debit.amount)
        );
        Ok(debit)
    }

    /// Settle delivered orders that lack a ledger credit
    pub fn reconcile_settlements(&self) -> ManagerResult<usize> {
        let repaired = self.ledger.reconcile()?;
        for credit in &repaired {
            crate::audit_log!(
                credit.driver_id.as_str(),
                "wallet.reconcile",
                credit.order_id.as_deref().unwrap_or_default(),
                format!("credit {}", credit.amount)
            );
        }
        Ok(repaired.len())
    }

    // ========== Maintenance ==========

    /// Cancel orders stuck past the configured expiry
    ///
    /// Returns the cancelled orders. Orders that moved on between the scan
    /// and the cancel are skipped.
    pub fn sweep_stale_orders(&self, now_millis: i64) -> ManagerResult<Vec<OrderSnapshot>> {
        if !self.policy.sweeper_enabled() {
            return Ok(Vec::new());
        }

        let mut cancelled = Vec::new();
        for order in self.storage.get_active_orders()? {
            let (limit, since) = match order.status {
                OrderStatus::Pending => (self.policy.pending_expiry, order.created_at),
                OrderStatus::DriverAssigned => (self.policy.assigned_expiry, order.updated_at),
                _ => continue,
            };
            let Some(limit) = limit else { continue };
            if now_millis - since < limit.as_millis() as i64 {
                continue;
            }

            let reason = format!(
                "Expired after {} seconds in {}",
                limit.as_secs(),
                order.status
            );
            match self.cancel_as(&order.order_id, SYSTEM_OPERATOR, Role::System, &reason) {
                Ok(snapshot) => {
                    tracing::info!(order_id = %order.order_id, reason = %reason, "Stale order cancelled");
                    cancelled.push(snapshot);
                }
                Err(ManagerError::InvalidTransition { .. }) => {
                    tracing::debug!(order_id = %order.order_id, "Order moved on before sweep");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(cancelled)
    }

    // ========== Public Query Methods ==========

    /// Get a snapshot by order ID
    pub fn get_snapshot(&self, order_id: &str) -> ManagerResult<Option<OrderSnapshot>> {
        Ok(self.storage.get_snapshot(order_id)?)
    }

    pub fn get_order(&self, order_id: &str) -> ManagerResult<OrderSnapshot> {
        self.get_snapshot(order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))
    }

    /// Pending and unassigned, oldest first
    pub fn list_pending_orders(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        Ok(self.storage.get_pending_pool()?)
    }

    /// Filtered orders, newest first
    pub fn list_orders(&self, filter: &OrderFilter) -> ManagerResult<Vec<OrderSnapshot>> {
        let mut orders: Vec<OrderSnapshot> = self
            .storage
            .get_all_snapshots()?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.last_sequence.cmp(&a.last_sequence))
        });
        Ok(orders)
    }

    pub fn get_order_events(&self, order_id: &str) -> ManagerResult<Vec<OrderEvent>> {
        let events = self.storage.get_events_for_order(order_id)?;
        if events.is_empty() {
            return Err(ManagerError::OrderNotFound(order_id.to_string()));
        }
        Ok(events)
    }

    pub fn list_rejections(&self, filter: &RejectionFilter) -> ManagerResult<Vec<RejectionLogEntry>> {
        let entries = match filter.order_id.as_deref() {
            Some(order_id) => self.storage.get_rejections_for_order(order_id)?,
            None => self.storage.get_all_rejections()?,
        };
        Ok(entries.into_iter().filter(|e| filter.matches(e)).collect())
    }

    /// Get all active order snapshots
    pub fn get_active_orders(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        Ok(self.storage.get_active_orders()?)
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<OrderEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Get events for active orders since a given sequence
    pub fn get_active_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<OrderEvent>> {
        Ok(self.storage.get_active_events_since(since_sequence)?)
    }

    /// Rebuild a snapshot from events (for verification)
    pub fn rebuild_snapshot(&self, order_id: &str) -> ManagerResult<OrderSnapshot> {
        let events = self.get_order_events(order_id)?;
        Ok(appliers::replay(order_id, &events))
    }
}

/// Retry storage failures with doubling backoff
///
/// Each failed attempt is reported as a settlement inconsistency; when the
/// budget runs out the last storage error is returned unchanged.
fn retry_settlement<T>(
    policy: &DispatchPolicy,
    command_id: &str,
    mut op: impl FnMut() -> ManagerResult<T>,
) -> ManagerResult<T> {
    let mut backoff = policy.settlement_backoff;
    let mut attempt = 0;
    loop {
        match op() {
            Err(ManagerError::Storage(e)) if attempt < policy.settlement_max_retries => {
                attempt += 1;
                let inconsistency = ManagerError::SettlementInconsistency(e.to_string());
                tracing::warn!(
                    command_id = %command_id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %inconsistency,
                    "Settlement commit failed, retrying"
                );
                std::thread::sleep(backoff);
                backoff = backoff.saturating_mul(2);
            }
            Err(ManagerError::Storage(e)) => {
                tracing::error!(command_id = %command_id, attempts = attempt + 1, error = %e, "Settlement retries exhausted");
                return Err(ManagerError::Storage(e));
            }
            other => return other,
        }
    }
}

// Make OrdersManager Clone-able via Arc
impl Clone for OrdersManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            ledger: self.ledger.clone(),
            profiles: self.profiles.clone(),
            policy: self.policy.clone(),
            event_tx: self.event_tx.clone(),
            epoch: self.epoch.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
