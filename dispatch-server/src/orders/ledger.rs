//! Driver wallet ledger
//!
//! Append-only. A delivered order produces exactly one credit for its
//! delivery fee, written in the same redb transaction as the delivery event
//! and guarded by the `settled_orders` index. Balances are folded from the
//! entries on every read.

use rust_decimal::Decimal;
use thiserror::Error;

use super::storage::{OrderStorage, StorageError, StorageResult};
use redb::WriteTransaction;
use shared::order::{OrderSnapshot, OrderStatus};
use shared::util::round_money;
use shared::wallet::{self, WalletBalance, WalletTransaction};

/// Marker stored for delivered orders whose fee was zero (nothing to credit)
const NO_CREDIT_MARKER: &str = "-";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Withdrawal amount must be positive")]
    InvalidAmount,

    #[error("Insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance { balance: Decimal, requested: Decimal },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct WalletLedger {
    storage: OrderStorage,
}

impl WalletLedger {
    pub fn new(storage: OrderStorage) -> Self {
        Self { storage }
    }

    /// Credit the delivery fee for a delivered order, at most once
    ///
    /// Returns the credit written by this call, `None` when the order is not
    /// delivered or was already settled.
    pub fn settle_in_txn(
        &self,
        txn: &WriteTransaction,
        order: &OrderSnapshot,
    ) -> StorageResult<Option<WalletTransaction>> {
        if order.status != OrderStatus::Delivered {
            return Ok(None);
        }
        let Some(driver_id) = order.driver_id.as_deref() else {
            tracing::warn!(order_id = %order.order_id, "Delivered order has no driver, skipping settlement");
            return Ok(None);
        };
        if self.storage.get_settlement_txn(txn, &order.order_id)?.is_some() {
            tracing::debug!(order_id = %order.order_id, "Order already settled");
            return Ok(None);
        }

        if order.delivery_fee <= Decimal::ZERO {
            self.storage
                .mark_order_settled(txn, &order.order_id, NO_CREDIT_MARKER)?;
            return Ok(None);
        }

        let credit = WalletTransaction::credit(
            driver_id,
            order.delivery_fee,
            Some(order.order_id.clone()),
            format!("Delivery fee for order {}", order.order_id),
        );
        self.storage.append_wallet_entry(txn, &credit)?;
        self.storage
            .mark_order_settled(txn, &order.order_id, &credit.id)?;

        Ok(Some(credit))
    }

    pub fn balance(&self, driver_id: &str) -> StorageResult<WalletBalance> {
        let entries = self.storage.get_wallet_entries(driver_id)?;
        Ok(WalletBalance::from_entries(driver_id, &entries))
    }

    /// Entries in insertion order
    pub fn history(&self, driver_id: &str) -> StorageResult<Vec<WalletTransaction>> {
        self.storage.get_wallet_entries(driver_id)
    }

    /// Append a debit if the balance covers it
    ///
    /// Balance check and append share one write transaction.
    pub fn withdraw(
        &self,
        driver_id: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<WalletTransaction, LedgerError> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let txn = self.storage.begin_write()?;
        let entries = self.storage.get_wallet_entries_txn(&txn, driver_id)?;
        let balance = wallet::balance(&entries);
        if amount > balance {
            return Err(LedgerError::InsufficientBalance {
                balance,
                requested: amount,
            });
        }

        let description = match description.trim() {
            "" => "Withdrawal",
            d => d,
        };
        let debit = WalletTransaction::debit(driver_id, amount, description);
        self.storage.append_wallet_entry(&txn, &debit)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(debit)
    }

    /// Settle every delivered order missing from the settlement index
    pub fn reconcile(&self) -> StorageResult<Vec<WalletTransaction>> {
        let delivered: Vec<OrderSnapshot> = self
            .storage
            .get_all_snapshots()?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .collect();
        if delivered.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.storage.begin_write()?;
        let mut repaired = Vec::new();
        for order in &delivered {
            if let Some(credit) = self.settle_in_txn(&txn, order)? {
                tracing::warn!(
                    order_id = %order.order_id,
                    driver_id = %credit.driver_id,
                    amount = %credit.amount,
                    "Repaired missing settlement"
                );
                repaired.push(credit);
            }
        }
        txn.commit()?;

        Ok(repaired)
    }
}
