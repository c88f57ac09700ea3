//! Shared types for the courier dispatch workspace
//!
//! Domain types used by the dispatch server and by any client that talks to
//! it: orders, commands and events, the driver wallet ledger, rejection log
//! entries, identities and realtime notifications.

pub mod identity;
pub mod notification;
pub mod order;
pub mod rejection;
pub mod util;
pub mod wallet;

// Re-exports
pub use identity::{DriverProfile, Role};
pub use notification::DispatchNotification;
pub use rejection::RejectionLogEntry;
pub use serde::{Deserialize, Serialize};
pub use wallet::{TransactionType, WalletTransaction};
