//! Catch-up API for polling observers
//!
//! Client tracking screens, driver dashboards and the admin console each
//! keep their own view of the orders they care about. After a disconnect
//! (or on a poll tick) they ask for everything past their last sequence.
//!
//! # Protocol
//!
//! 1. Observer sends its last known sequence and the epoch it saw
//! 2. Server calculates the gap
//! 3. If the gap is small, return incremental events and rejections
//! 4. If the gap is large or the epoch changed, return a full sync with all
//!    active orders
//!
//! # Guarantees
//!
//! - Events and rejections share one global sequence
//! - Notifications carry that sequence, so an observer can detect gaps
//! - Full sync is always available as fallback

use super::manager::{ManagerError, OrdersManager};
use serde::{Deserialize, Serialize};
use shared::DispatchNotification;
use shared::order::{OrderEvent, OrderSnapshot};
use shared::rejection::RejectionLogEntry;

/// Maximum events to return in incremental sync
/// If gap exceeds this, full sync is recommended
const MAX_INCREMENTAL_EVENTS: usize = 1000;

/// Sync request from an observer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Observer's last known sequence number
    #[serde(default)]
    pub since_sequence: u64,
    /// Epoch the observer last synced against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
}

/// Sync response to an observer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Events since the requested sequence
    pub events: Vec<OrderEvent>,
    /// Rejection log entries since the requested sequence
    pub rejections: Vec<RejectionLogEntry>,
    /// Current active order snapshots (full sync only)
    pub active_orders: Vec<OrderSnapshot>,
    /// Server's current sequence number
    pub server_sequence: u64,
    /// Whether full sync is required (gap too large)
    pub requires_full_sync: bool,
    /// Server instance epoch (UUID generated on startup)
    /// Used to detect server restarts - if epoch changes, observer must full sync
    pub server_epoch: String,
}

impl SyncResponse {
    /// Create a full sync response
    pub fn full_sync(active_orders: Vec<OrderSnapshot>, server_sequence: u64, epoch: String) -> Self {
        Self {
            events: vec![],
            rejections: vec![],
            active_orders,
            server_sequence,
            requires_full_sync: true,
            server_epoch: epoch,
        }
    }

    /// Create an incremental sync response
    pub fn incremental(
        events: Vec<OrderEvent>,
        rejections: Vec<RejectionLogEntry>,
        server_sequence: u64,
        epoch: String,
    ) -> Self {
        Self {
            events,
            rejections,
            active_orders: vec![],
            server_sequence,
            requires_full_sync: false,
            server_epoch: epoch,
        }
    }
}

/// Sync service for polling observers
#[derive(Debug, Clone)]
pub struct SyncService {
    manager: OrdersManager,
}

impl SyncService {
    pub fn new(manager: OrdersManager) -> Self {
        Self { manager }
    }

    /// Handle a sync request
    ///
    /// Incremental responses include terminal transitions (delivered,
    /// cancelled) so observers can drop those orders from their views.
    pub fn sync(&self, request: SyncRequest) -> Result<SyncResponse, ManagerError> {
        let server_sequence = self.manager.get_current_sequence()?;
        let epoch = self.manager.epoch().to_string();

        // Server restarted since the observer last synced
        if request.epoch.as_deref().is_some_and(|e| e != epoch) {
            let active_orders = self.manager.get_active_orders()?;
            return Ok(SyncResponse::full_sync(active_orders, server_sequence, epoch));
        }

        // If observer is up to date, return empty response
        if request.since_sequence >= server_sequence {
            return Ok(SyncResponse::incremental(
                vec![],
                vec![],
                server_sequence,
                epoch,
            ));
        }

        // If gap is large, recommend full sync
        let gap = server_sequence - request.since_sequence;
        if gap > MAX_INCREMENTAL_EVENTS as u64 {
            let active_orders = self.manager.get_active_orders()?;
            return Ok(SyncResponse::full_sync(active_orders, server_sequence, epoch));
        }

        let events = self.manager.get_events_since(request.since_sequence)?;

        // Double-check: if we got too many events, fall back to full sync
        if events.len() > MAX_INCREMENTAL_EVENTS {
            let active_orders = self.manager.get_active_orders()?;
            return Ok(SyncResponse::full_sync(active_orders, server_sequence, epoch));
        }

        let rejections = self
            .manager
            .storage()
            .get_all_rejections()?
            .into_iter()
            .filter(|r| r.sequence > request.since_sequence)
            .collect();

        Ok(SyncResponse::incremental(
            events,
            rejections,
            server_sequence,
            epoch,
        ))
    }

    /// Get all active orders (for initial connection or full sync)
    pub fn get_all_active_orders(&self) -> Result<Vec<OrderSnapshot>, ManagerError> {
        self.manager.get_active_orders()
    }

    pub fn get_server_sequence(&self) -> Result<u64, ManagerError> {
        self.manager.get_current_sequence()
    }

    /// Verify snapshot integrity by rebuilding from events
    pub fn verify_snapshot(&self, order_id: &str) -> Result<bool, ManagerError> {
        let stored = self.manager.get_snapshot(order_id)?;
        let rebuilt = match self.manager.rebuild_snapshot(order_id) {
            Ok(snapshot) => Some(snapshot),
            Err(ManagerError::OrderNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        match (stored, rebuilt) {
            (Some(s), Some(r)) => Ok(s.verify_checksum()
                && s.state_checksum == r.state_checksum
                && s.status == r.status
                && s.driver_id == r.driver_id
                && s.total == r.total),
            (None, None) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Verify all active order snapshots
    pub fn verify_all_snapshots(&self) -> Result<Vec<(String, bool)>, ManagerError> {
        let active_orders = self.manager.get_active_orders()?;
        let mut results = Vec::with_capacity(active_orders.len());

        for order in active_orders {
            let is_valid = self.verify_snapshot(&order.order_id)?;
            if !is_valid {
                tracing::warn!(order_id = %order.order_id, "Snapshot drift detected");
            }
            results.push((order.order_id, is_valid));
        }

        Ok(results)
    }
}

/// Observer-side sync state tracker
#[derive(Debug, Default)]
pub struct ClientSyncState {
    /// Last processed sequence
    pub last_sequence: u64,
    /// Epoch of the last sync response
    pub epoch: Option<String>,
    pub connected: bool,
    pub needs_full_sync: bool,
}

impl ClientSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(&mut self) {
        self.connected = true;
    }

    pub fn on_disconnect(&mut self) {
        self.connected = false;
    }

    /// Process a sync response
    pub fn on_sync_response(&mut self, response: &SyncResponse) {
        if self
            .epoch
            .as_deref()
            .is_some_and(|e| e != response.server_epoch)
            && !response.requires_full_sync
        {
            // Restarted server answered incrementally; our view is stale
            self.needs_full_sync = true;
        } else {
            self.needs_full_sync = false;
        }
        self.epoch = Some(response.server_epoch.clone());
        self.last_sequence = response.server_sequence;
    }

    /// Process a realtime notification
    ///
    /// Repeats (sequence already seen) are ignored; a jump past the next
    /// sequence means something was missed.
    pub fn on_notification(&mut self, notification: &DispatchNotification) {
        let sequence = notification.sequence();
        if sequence <= self.last_sequence {
            return;
        }
        if sequence > self.last_sequence + 1 {
            self.needs_full_sync = true;
        }
        self.last_sequence = sequence;
    }

    pub fn should_sync(&self) -> bool {
        !self.connected || self.needs_full_sync
    }

    pub fn create_sync_request(&self) -> SyncRequest {
        SyncRequest {
            since_sequence: self.last_sequence,
            epoch: self.epoch.clone(),
        }
    }
}
