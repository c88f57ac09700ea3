//! Driver wallet ledger types
//!
//! The ledger is append-only. Amounts are always stored positive and the
//! sign comes from [`TransactionType`]. A balance is never stored; it is
//! folded from the entries every time it is asked for.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger entry direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
}

/// Immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletTransaction {
    pub id: String,
    pub driver_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Always positive
    pub amount: Decimal,
    /// Back-reference for settlement credits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub description: String,
    pub created_at: i64,
}

impl WalletTransaction {
    pub fn credit(
        driver_id: impl Into<String>,
        amount: Decimal,
        order_id: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::entry(TransactionType::Credit, driver_id, amount, order_id, description)
    }

    pub fn debit(
        driver_id: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self::entry(TransactionType::Debit, driver_id, amount, None, description)
    }

    fn entry(
        kind: TransactionType,
        driver_id: impl Into<String>,
        amount: Decimal,
        order_id: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::util::new_id(),
            driver_id: driver_id.into(),
            kind,
            amount,
            order_id,
            description: description.into(),
            created_at: crate::util::now_millis(),
        }
    }

    /// Amount with the sign implied by the entry type
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}

/// Σ credit − Σ debit
pub fn balance<'a>(entries: impl IntoIterator<Item = &'a WalletTransaction>) -> Decimal {
    entries
        .into_iter()
        .fold(Decimal::ZERO, |acc, tx| acc + tx.signed_amount())
}

/// Balance read model returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletBalance {
    pub driver_id: String,
    pub balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub transaction_count: usize,
}

impl WalletBalance {
    pub fn from_entries(driver_id: impl Into<String>, entries: &[WalletTransaction]) -> Self {
        let (credits, debits) =
            entries
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(c, d), tx| match tx.kind {
                    TransactionType::Credit => (c + tx.amount, d),
                    TransactionType::Debit => (c, d + tx.amount),
                });
        Self {
            driver_id: driver_id.into(),
            balance: credits - debits,
            total_credits: credits,
            total_debits: debits,
            transaction_count: entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_is_credits_minus_debits() {
        let entries = vec![
            WalletTransaction::credit("d1", dec!(10.00), Some("o1".into()), "fee"),
            WalletTransaction::credit("d1", dec!(12.50), Some("o2".into()), "fee"),
            WalletTransaction::debit("d1", dec!(5.25), "withdrawal"),
        ];
        assert_eq!(balance(&entries), dec!(17.25));

        let reversed: Vec<_> = entries.iter().rev().cloned().collect();
        assert_eq!(balance(&reversed), dec!(17.25));
    }

    #[test]
    fn test_empty_ledger_is_zero() {
        assert_eq!(balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_wallet_balance_summary() {
        let entries = vec![
            WalletTransaction::credit("d1", dec!(10), None, "fee"),
            WalletTransaction::debit("d1", dec!(4), "withdrawal"),
        ];
        let summary = WalletBalance::from_entries("d1", &entries);
        assert_eq!(summary.balance, dec!(6));
        assert_eq!(summary.total_credits, dec!(10));
        assert_eq!(summary.total_debits, dec!(4));
        assert_eq!(summary.transaction_count, 2);
    }

    #[test]
    fn test_transaction_type_serializes_snake_case() {
        let tx = WalletTransaction::debit("d1", dec!(1), "w");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "debit");
    }
}
