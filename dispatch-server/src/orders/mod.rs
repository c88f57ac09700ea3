//! Order lifecycle and driver dispatch
//!
//! - **manager**: Core OrdersManager for command processing and event generation
//! - **storage**: redb-based persistence for events, snapshots, indexes, ledger and rejection log
//! - **actions** / **appliers**: command handlers and event appliers
//! - **ledger**: driver wallet, credited exactly once per delivered order
//! - **sync**: catch-up API for polling observers
//! - **sweeper**: stale order expiry and settlement reconciliation
//!
//! # Architecture
//!
//! ```text
//! Command → OrdersManager → Event → Storage (redb)
//!                 ↓                      ↓
//!           Notification         Snapshot + Ledger Update
//!                 ↓
//!           All Observers
//! ```

pub mod actions;
pub mod appliers;
pub mod ledger;
pub mod manager;
pub mod policy;
pub mod storage;
pub mod sweeper;
pub mod sync;
pub mod traits;

// Re-exports
pub use ledger::WalletLedger;
pub use manager::{ManagerError, ManagerResult, OrdersManager};
pub use policy::DispatchPolicy;
pub use storage::OrderStorage;
pub use sweeper::StaleOrderSweeper;
pub use sync::{SyncRequest, SyncResponse, SyncService};

// Re-export shared types for convenience
pub use shared::order::{
    CommandError, CommandErrorCode, CommandResponse, EventPayload, OrderCommand,
    OrderCommandPayload, OrderEvent, OrderEventType, OrderSnapshot, OrderStatus,
};
