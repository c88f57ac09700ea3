use super::super::ledger::LedgerError;
use super::super::storage::StorageError;
use super::super::traits::OrderError;
use rust_decimal::Decimal;
use shared::order::{CommandError, CommandErrorCode, OrderStatus};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

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

    #[error("Insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance { balance: Decimal, requested: Decimal },

    /// A delivery commit failed before the ledger entry landed; retried internally
    #[error("Settlement inconsistency: {0}")]
    SettlementInconsistency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Map storage failures to an error code (clients localise)
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::OrderNotFound(_) => return CommandErrorCode::OrderNotFound,
        _ => {}
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // Database/Transaction/Table/Storage/Commit
    CommandErrorCode::SystemBusy
}

impl ManagerError {
    pub fn code(&self) -> CommandErrorCode {
        match self {
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::OrderNotFound(_) => CommandErrorCode::OrderNotFound,
            ManagerError::InvalidTransition { .. } => CommandErrorCode::InvalidTransition,
            ManagerError::AlreadyAssigned(_) => CommandErrorCode::AlreadyAssigned,
            ManagerError::NotEligible(_) => CommandErrorCode::NotEligible,
            ManagerError::NotAssignedDriver(_) => CommandErrorCode::NotAssignedDriver,
            ManagerError::Validation(_) => CommandErrorCode::ValidationError,
            ManagerError::InsufficientBalance { .. } => CommandErrorCode::InsufficientBalance,
            ManagerError::SettlementInconsistency(_) => CommandErrorCode::SettlementInconsistency,
            ManagerError::Internal(_) => CommandErrorCode::InternalError,
        }
    }
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let code = err.code();
        if let ManagerError::Storage(e) = &err {
            tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
        }
        CommandError::new(code, err.to_string())
    }
}

impl From<OrderError> for ManagerError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(id) => ManagerError::OrderNotFound(id),
            OrderError::InvalidTransition { from, to } => {
                ManagerError::InvalidTransition { from, to }
            }
            OrderError::AlreadyAssigned(id) => ManagerError::AlreadyAssigned(id),
            OrderError::NotEligible(id) => ManagerError::NotEligible(id),
            OrderError::NotAssignedDriver(id) => ManagerError::NotAssignedDriver(id),
            OrderError::Validation(msg) => ManagerError::Validation(msg),
            OrderError::Storage(msg) => ManagerError::Internal(msg),
        }
    }
}

impl From<LedgerError> for ManagerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount => ManagerError::Validation(err.to_string()),
            LedgerError::InsufficientBalance { balance, requested } => {
                ManagerError::InsufficientBalance { balance, requested }
            }
            LedgerError::Storage(e) => ManagerError::Storage(e),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_keeps_its_code() {
        let err: ManagerError =
            OrderError::transition(OrderStatus::Delivered, OrderStatus::Delivered).into();
        let wire: CommandError = err.into();
        assert_eq!(wire.code, CommandErrorCode::InvalidTransition);
        assert_eq!(wire.message, "Invalid transition: delivered -> delivered");
    }

    #[test]
    fn test_storage_errors_are_classified() {
        let err = ManagerError::Storage(StorageError::OrderNotFound("o1".into()));
        assert_eq!(err.code(), CommandErrorCode::OrderNotFound);

        let err = ManagerError::Storage(StorageError::Serialization(
            serde_json::from_str::<u8>("x").unwrap_err(),
        ));
        assert_eq!(err.code(), CommandErrorCode::InternalError);
    }

    #[test]
    fn test_ledger_errors() {
        let err: ManagerError = LedgerError::InvalidAmount.into();
        assert_eq!(err.code(), CommandErrorCode::ValidationError);
    }
}
