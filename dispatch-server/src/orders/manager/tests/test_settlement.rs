use super::*;
use shared::TransactionType;
use std::time::Duration;

#[test]
fn test_delivery_credits_fee_once() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");
    let mut rx = manager.subscribe();

    deliver(&manager, &order_id, "d1");

    let history = manager.get_wallet_history("d1").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionType::Credit);
    assert_eq!(history[0].amount, dec!(10.00));
    assert_eq!(history[0].order_id.as_deref(), Some(order_id.as_str()));
    assert_eq!(
        history[0].description,
        format!("Delivery fee for order {}", order_id)
    );

    // Notification for the delivery carries the committed state
    match rx.try_recv().unwrap() {
        DispatchNotification::OrderChanged { order, .. } => {
            assert_eq!(order.status, OrderStatus::Delivered)
        }
        other => panic!("unexpected notification: {other:?}"),
    }

    // Nothing left for reconciliation to repair
    assert_eq!(manager.reconcile_settlements().unwrap(), 0);
    assert_eq!(manager.get_wallet_history("d1").unwrap().len(), 1);
}

#[test]
fn test_duplicate_completion_command_does_not_double_credit() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");

    let cmd = OrderCommand::new(
        "d1".to_string(),
        Role::Driver,
        OrderCommandPayload::CompleteDelivery {
            order_id: order_id.clone(),
            driver_id: "d1".to_string(),
            delivery_photo_url: Some("door.jpg".to_string()),
            signature_data: Some("sig".to_string()),
            notes: None,
        },
    );

    let first = manager.execute_command(cmd.clone());
    let second = manager.execute_command(cmd);
    assert!(first.success);
    assert!(second.success);
    assert!(second.duplicate);
    assert_eq!(
        second.order.map(|o| o.status),
        Some(OrderStatus::Delivered)
    );

    let balance = manager.get_balance("d1").unwrap();
    assert_eq!(balance.balance, dec!(10.00));
    assert_eq!(balance.transaction_count, 1);
}

#[test]
fn test_zero_fee_delivery_writes_no_credit() {
    let manager = create_test_manager();
    let response = manager.execute_command(create_order_cmd("c1", Decimal::ZERO));
    let order_id = response.order_id.unwrap();
    manager.accept_order(&order_id, "d1").unwrap();
    manager
        .start_delivery(&order_id, "d1", Some("p.jpg"))
        .unwrap();
    deliver(&manager, &order_id, "d1");

    assert!(manager.get_wallet_history("d1").unwrap().is_empty());
    assert!(manager.storage().get_settlement(&order_id).unwrap().is_some());
    assert_eq!(manager.reconcile_settlements().unwrap(), 0);
}

#[test]
fn test_balance_across_deliveries_and_withdrawal() {
    let manager = create_test_manager();
    for _ in 0..3 {
        let order_id = create_in_transit_order(&manager, "d1");
        deliver(&manager, &order_id, "d1");
    }
    let other = create_in_transit_order(&manager, "d2");
    deliver(&manager, &other, "d2");

    assert_eq!(manager.get_balance("d1").unwrap().balance, dec!(30.00));
    assert_eq!(manager.get_balance("d2").unwrap().balance, dec!(10.00));

    let debit = manager
        .record_withdrawal("d1", dec!(12.345), "Weekly payout")
        .unwrap();
    assert_eq!(debit.kind, TransactionType::Debit);
    assert_eq!(debit.amount, dec!(12.35));

    let balance = manager.get_balance("d1").unwrap();
    assert_eq!(balance.balance, dec!(17.65));
    assert_eq!(balance.total_credits, dec!(30.00));
    assert_eq!(balance.total_debits, dec!(12.35));
    assert_eq!(balance.transaction_count, 4);
}

#[test]
fn test_withdrawal_over_balance() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");
    deliver(&manager, &order_id, "d1");

    let err = manager
        .record_withdrawal("d1", dec!(10.01), "")
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InsufficientBalance { balance, requested }
            if balance == dec!(10.00) && requested == dec!(10.01)
    ));
    assert_eq!(err.code(), CommandErrorCode::InsufficientBalance);

    assert!(matches!(
        manager.record_withdrawal("d1", dec!(-1), ""),
        Err(ManagerError::Validation(_))
    ));
    assert_eq!(manager.get_wallet_history("d1").unwrap().len(), 1);
}

#[test]
fn test_reconcile_repairs_delivered_without_credit() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");

    // Delivered snapshot persisted without going through settlement
    let mut order = manager.get_order(&order_id).unwrap();
    order.status = OrderStatus::Delivered;
    let txn = manager.storage().begin_write().unwrap();
    manager.storage().store_snapshot(&txn, &order).unwrap();
    txn.commit().unwrap();
    assert_eq!(manager.get_balance("d1").unwrap().balance, Decimal::ZERO);

    assert_eq!(manager.reconcile_settlements().unwrap(), 1);
    assert_eq!(manager.get_balance("d1").unwrap().balance, dec!(10.00));
    assert_eq!(manager.reconcile_settlements().unwrap(), 0);
}

// ========================================================================
// Settlement retry
// ========================================================================

fn storage_failure() -> ManagerError {
    ManagerError::Storage(StorageError::OrderNotFound("simulated".to_string()))
}

fn fast_policy(max_retries: u32) -> DispatchPolicy {
    DispatchPolicy::default().with_settlement_retries(max_retries, 1)
}

#[test]
fn test_retry_settlement_recovers() {
    let mut calls = 0;
    let result = retry_settlement(&fast_policy(3), "cmd-1", || {
        calls += 1;
        if calls < 3 { Err(storage_failure()) } else { Ok(calls) }
    });

    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls, 3);
}

#[test]
fn test_retry_settlement_exhausted() {
    let mut calls = 0;
    let result: ManagerResult<()> = retry_settlement(&fast_policy(2), "cmd-1", || {
        calls += 1;
        Err(storage_failure())
    });

    assert!(matches!(result, Err(ManagerError::Storage(_))));
    assert_eq!(calls, 3);
}

#[test]
fn test_retry_settlement_skips_domain_errors() {
    let mut calls = 0;
    let result: ManagerResult<()> = retry_settlement(&fast_policy(5), "cmd-1", || {
        calls += 1;
        Err(ManagerError::Validation("signature is required".to_string()))
    });

    assert!(matches!(result, Err(ManagerError::Validation(_))));
    assert_eq!(calls, 1);
}

#[test]
fn test_retry_backoff_doubles() {
    let policy = fast_policy(2);
    let started = std::time::Instant::now();
    let _: ManagerResult<()> = retry_settlement(&policy, "cmd-1", || Err(storage_failure()));
    // 1ms + 2ms
    assert!(started.elapsed() >= Duration::from_millis(3));
}
