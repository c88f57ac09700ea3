//! Courier Dispatch Server - order lifecycle and driver dispatch engine
//!
//! # Overview
//!
//! - **Orders** (`orders`): event-sourced order state machine on redb,
//!   race-free driver assignment, rejection log, driver wallet ledger
//! - **HTTP API** (`api`): JSON endpoints, sync and SSE for observers
//! - **Identity** (`auth`): caller identity forwarded by the gateway
//! - **Profiles** (`profiles`): driver approval and block flags
//!
//! # Layout
//!
//! ```text
//! dispatch-server/src/
//! ├── core/          # config, state, server, background tasks
//! ├── auth/          # identity headers, role checks
//! ├── api/           # HTTP routes and handlers
//! ├── utils/         # errors, logging
//! ├── profiles.rs    # driver profile directory
//! └── orders/        # dispatch engine
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod orders;
pub mod profiles;
pub mod utils;

// Re-exports
pub use auth::CurrentUser;
pub use core::{Config, Server, ServerState};
pub use orders::{DispatchPolicy, OrderStorage, OrdersManager, SyncService};
pub use profiles::{InMemoryProfiles, ProfileDirectory};
pub use utils::{AppError, AppResult};
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Load `.env` and initialise logging
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = if config.log_to_file {
        let dir = config.log_dir();
        std::fs::create_dir_all(&dir)?;
        Some(dir)
    } else {
        None
    };

    init_logger_with_file(&config.log_level, config.log_json, log_dir.as_deref())
}

pub fn print_banner() {
    println!(
        r#"
    ____  _                  __       __
   / __ \(_)________  ____ _/ /______/ /_
  / / / / / ___/ __ \/ __ `/ __/ ___/ __ \
 / /_/ / (__  ) /_/ / /_/ / /_/ /__/ / / /
/_____/_/____/ .___/\__,_/\__/\___/_/ /_/
            /_/
    "#
    );
}
