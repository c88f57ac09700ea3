//! Stale order sweeper
//!
//! On startup, repairs delivered orders whose ledger credit is missing. Then,
//! on every tick, cancels orders that sat in `pending` or `driver_assigned`
//! past the configured expiry.
//!
//! Registered as `TaskKind::Periodic` in `start_background_tasks()`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::manager::OrdersManager;

pub struct StaleOrderSweeper {
    manager: OrdersManager,
    interval: Duration,
    shutdown: CancellationToken,
}

impl StaleOrderSweeper {
    pub fn new(manager: OrdersManager, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// Main loop: startup reconciliation, then periodic sweeps
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Stale order sweeper started");

        self.reconcile().await;

        if self.manager.policy().sweeper_enabled() {
            self.periodic_loop().await;
        } else {
            tracing::info!("No order expiry configured, sweeper idle");
            self.shutdown.cancelled().await;
        }

        tracing::info!("Stale order sweeper stopped");
    }

    async fn reconcile(&self) {
        let manager = self.manager.clone();
        match tokio::task::spawn_blocking(move || manager.reconcile_settlements()).await {
            Ok(Ok(0)) => tracing::debug!("Wallet ledger consistent"),
            Ok(Ok(repaired)) => tracing::warn!(repaired, "Settlement reconciliation repaired orders"),
            Ok(Err(e)) => tracing::error!(error = %e, "Settlement reconciliation failed"),
            Err(e) => tracing::error!(error = %e, "Settlement reconciliation task panicked"),
        }
    }

    async fn periodic_loop(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Stale order sweeper received shutdown signal");
                    return;
                }
            }

            self.sweep_once().await;
        }
    }

    async fn sweep_once(&self) {
        let manager = self.manager.clone();
        let now = shared::util::now_millis();
        match tokio::task::spawn_blocking(move || manager.sweep_stale_orders(now)).await {
            Ok(Ok(cancelled)) if cancelled.is_empty() => {}
            Ok(Ok(cancelled)) => {
                tracing::info!(count = cancelled.len(), "Cancelled stale orders");
            }
            Ok(Err(e)) => tracing::error!(error = %e, "Stale order sweep failed"),
            Err(e) => tracing::error!(error = %e, "Stale order sweep task panicked"),
        }
    }
}
