//! Server state
//!
//! [`ServerState`] holds every service the HTTP handlers and background tasks
//! need. Cloning is cheap (shared handles).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::orders::{ManagerResult, OrdersManager, StaleOrderSweeper, SyncService};
use crate::profiles::{InMemoryProfiles, ProfileDirectory};
use crate::utils::AppResult;

/// How often old application logs are pruned
const LOG_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub orders: OrdersManager,
    pub sync: SyncService,
}

impl ServerState {
    /// Open the order store under the work directory
    ///
    /// Driver profiles start empty; admins populate them through
    /// `PUT /api/drivers/{id}/profile`.
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(anyhow::Error::from)?;

        let profiles: Arc<dyn ProfileDirectory> = Arc::new(InMemoryProfiles::new());
        let orders = OrdersManager::new(config.database_path(), profiles)?
            .with_policy(config.dispatch_policy());

        tracing::info!(
            database = %config.database_path().display(),
            sequence = orders.get_current_sequence()?,
            "Order store ready"
        );

        Ok(Self::with_orders(config.clone(), orders))
    }

    /// Assemble state around an existing manager (tests, embedding)
    pub fn with_orders(config: Config, orders: OrdersManager) -> Self {
        Self {
            sync: SyncService::new(orders.clone()),
            config,
            orders,
        }
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileDirectory> {
        self.orders.profiles()
    }

    /// Run a blocking engine call off the async runtime
    pub async fn blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(OrdersManager) -> ManagerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let orders = self.orders.clone();
        Ok(tokio::task::spawn_blocking(move || f(orders)).await??)
    }

    /// Start background tasks
    ///
    /// - stale order sweeper and settlement reconciliation (Periodic)
    /// - notification listener (Listener)
    /// - log cleanup when file logging is on (Periodic)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let sweeper = StaleOrderSweeper::new(
            self.orders.clone(),
            self.config.sweep_interval(),
            tasks.shutdown_token(),
        );
        tasks.spawn("stale_order_sweeper", TaskKind::Periodic, sweeper.run());

        let listener_token = tasks.shutdown_token();
        tasks.spawn(
            "notification_listener",
            TaskKind::Listener,
            notification_listener(self.orders.subscribe(), listener_token),
        );

        if self.config.log_to_file {
            let log_dir = self.config.log_dir();
            let shutdown = tasks.shutdown_token();
            tasks.spawn("log_cleanup", TaskKind::Periodic, async move {
                let mut ticker = tokio::time::interval(LOG_CLEANUP_INTERVAL);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = shutdown.cancelled() => return,
                    }
                    if let Err(e) = crate::utils::logger::cleanup_old_logs(&log_dir) {
                        tracing::warn!(error = %e, "Log cleanup failed");
                    }
                }
            });
        }

        tasks.log_summary();
        tasks
    }
}

/// Trace every committed change; report observers falling behind
async fn notification_listener(
    mut rx: broadcast::Receiver<shared::DispatchNotification>,
    shutdown: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            received = rx.recv() => received,
            _ = shutdown.cancelled() => return,
        };

        match received {
            Ok(notification) => {
                tracing::debug!(
                    event = notification.event_name(),
                    order_id = %notification.order_id(),
                    sequence = notification.sequence(),
                    "Dispatch notification"
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notification listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
