use super::*;
use shared::order::OrderOwner;

// ========================================================================
// Full lifecycle
// ========================================================================

#[test]
fn test_delivery_scenario() {
    let manager = create_test_manager();
    let order_id = create_pending_order(&manager);

    let order = manager.get_order(&order_id).unwrap();
    assert_eq!(order.subtotal, dec!(100.00));
    assert_eq!(order.total, dec!(110.00));

    manager.accept_order(&order_id, "d1").unwrap();

    // No photo reference
    let err = manager.start_delivery(&order_id, "d1", None).unwrap_err();
    assert!(matches!(err, ManagerError::Validation(_)));
    assert_eq!(
        manager.get_order(&order_id).unwrap().status,
        OrderStatus::DriverAssigned
    );

    let order = manager
        .start_delivery(&order_id, "d1", Some("photos/pickup.jpg"))
        .unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);
    assert_eq!(order.pickup_photo_url.as_deref(), Some("photos/pickup.jpg"));

    let before = manager.get_balance("d1").unwrap().balance;
    let order = deliver(&manager, &order_id, "d1");
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.driver_id.as_deref(), Some("d1"));
    assert!(order.invariants_hold());
    assert_eq!(
        manager.get_balance("d1").unwrap().balance,
        before + dec!(10.00)
    );

    // Second completion is rejected, balance unchanged
    let err = manager
        .complete_delivery(&order_id, "d1", Some("p.jpg"), Some("sig"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Delivered
        }
    ));
    assert_eq!(manager.get_balance("d1").unwrap().balance, dec!(10.00));
    assert!(manager.get_active_orders().unwrap().is_empty());
}

#[test]
fn test_picked_up_path() {
    let manager = create_test_manager();
    let order_id = create_assigned_order(&manager, "d2");

    let order = manager
        .mark_picked_up(&order_id, "d2", Some("photos/shelf.jpg"))
        .unwrap();
    assert_eq!(order.status, OrderStatus::PickedUp);

    // picked_up cannot go to out_for_delivery
    let err = manager
        .start_delivery(&order_id, "d2", Some("photos/shelf.jpg"))
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidTransition { .. }));

    let order = deliver(&manager, &order_id, "d2");
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(manager.get_balance("d2").unwrap().balance, dec!(10.00));
}

#[test]
fn test_only_assigned_driver_progresses() {
    let manager = create_test_manager();
    let order_id = create_assigned_order(&manager, "d1");

    let err = manager
        .start_delivery(&order_id, "d2", Some("p.jpg"))
        .unwrap_err();
    assert!(matches!(err, ManagerError::NotAssignedDriver(_)));

    let err = manager.report_issue(&order_id, "d2", "wrong address").unwrap_err();
    assert!(matches!(err, ManagerError::NotAssignedDriver(_)));
}

#[test]
fn test_complete_delivery_requires_proof() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");

    let err = manager
        .complete_delivery(&order_id, "d1", Some("door.jpg"), None, None)
        .unwrap_err();
    assert!(matches!(err, ManagerError::Validation(_)));
    assert_eq!(manager.get_balance("d1").unwrap().balance, Decimal::ZERO);
    assert_eq!(
        manager.get_order(&order_id).unwrap().status,
        OrderStatus::OutForDelivery
    );
}

#[test]
fn test_delivery_notes_appended() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");
    manager
        .report_issue(&order_id, "d1", "Gate code missing")
        .unwrap();

    let order = manager
        .complete_delivery(
            &order_id,
            "d1",
            Some("door.jpg"),
            Some("sig"),
            Some("Left with concierge"),
        )
        .unwrap();
    assert!(order.issue_reported);
    assert_eq!(
        order.driver_notes.as_deref(),
        Some("[Issue reported] Gate code missing\nLeft with concierge")
    );
}

// ========================================================================
// Cancellation
// ========================================================================

#[test]
fn test_cancel_pending_order() {
    let manager = create_test_manager();
    let order_id = create_pending_order(&manager);

    let order = manager
        .cancel_order(&order_id, "admin-1", "Client called")
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.driver_id.is_none());
    assert_eq!(
        order.driver_notes.as_deref(),
        Some("[Cancelled by admin admin-1] Client called")
    );
    assert!(manager.list_pending_orders().unwrap().is_empty());
    assert!(manager.get_active_orders().unwrap().is_empty());
}

#[test]
fn test_cancel_by_admin_named_system_keeps_admin_role() {
    let manager = create_test_manager();
    let order_id = create_pending_order(&manager);

    let order = manager
        .cancel_order(&order_id, SYSTEM_OPERATOR, "Duplicate order")
        .unwrap();
    assert_eq!(
        order.driver_notes.as_deref(),
        Some("[Cancelled by admin system] Duplicate order")
    );

    let events = manager.get_order_events(&order_id).unwrap();
    assert_eq!(events.last().unwrap().operator_role, Role::Admin);
}

#[test]
fn test_cancel_in_transit_order() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");

    let order = manager
        .cancel_order(&order_id, "admin-1", "Vehicle breakdown")
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.invariants_hold());
    // Cancelled orders are never paid
    assert_eq!(manager.get_balance("d1").unwrap().transaction_count, 0);
}

#[test]
fn test_terminal_orders_are_frozen() {
    let manager = create_test_manager();
    let order_id = create_pending_order(&manager);
    manager.cancel_order(&order_id, "admin-1", "dup").unwrap();

    assert!(matches!(
        manager.cancel_order(&order_id, "admin-1", "again"),
        Err(ManagerError::InvalidTransition { .. })
    ));
    assert!(matches!(
        manager.accept_order(&order_id, "d1"),
        Err(ManagerError::InvalidTransition { .. })
    ));
    assert!(matches!(
        manager.assign_driver(&order_id, "d1", "admin-1"),
        Err(ManagerError::AlreadyAssigned(_))
    ));
}

// ========================================================================
// Reads
// ========================================================================

#[test]
fn test_list_orders_filtering() {
    let manager = create_test_manager();
    let o1 = create_pending_order(&manager);
    let o2 = create_assigned_order(&manager, "d1");
    let o3 = create_in_transit_order(&manager, "d2");

    let all = manager.list_orders(&OrderFilter::default()).unwrap();
    let ids: Vec<&str> = all.iter().map(|o| o.order_id.as_str()).collect();
    // Newest first
    assert_eq!(ids, vec![o3.as_str(), o2.as_str(), o1.as_str()]);

    let assigned = manager
        .list_orders(&OrderFilter {
            status: Some(OrderStatus::DriverAssigned),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].order_id, o2);

    let mine = manager
        .list_orders(&OrderFilter {
            owner: Some(OrderOwner::Driver("d2".to_string())),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].order_id, o3);

    let searched = manager
        .list_orders(&OrderFilter {
            search: Some("colón".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(searched.len(), 3);
}

#[test]
fn test_pending_pool_oldest_first() {
    let manager = create_test_manager();
    let o1 = create_pending_order(&manager);
    let o2 = create_pending_order(&manager);
    let o3 = create_pending_order(&manager);
    manager.accept_order(&o2, "d1").unwrap();

    let pool: Vec<String> = manager
        .list_pending_orders()
        .unwrap()
        .into_iter()
        .map(|o| o.order_id)
        .collect();
    assert_eq!(pool, vec![o1, o3]);
}

#[test]
fn test_rebuild_matches_stored_snapshot() {
    let manager = create_test_manager();
    let order_id = create_in_transit_order(&manager, "d1");
    manager.report_issue(&order_id, "d1", "Dog in yard").unwrap();
    deliver(&manager, &order_id, "d1");

    let stored = manager.get_order(&order_id).unwrap();
    let rebuilt = manager.rebuild_snapshot(&order_id).unwrap();
    assert_eq!(stored.state_checksum, rebuilt.state_checksum);
    assert_eq!(stored.status, rebuilt.status);
    assert_eq!(stored.driver_notes, rebuilt.driver_notes);

    let events = manager.get_order_events(&order_id).unwrap();
    let types: Vec<OrderEventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            OrderEventType::OrderCreated,
            OrderEventType::DriverAssigned,
            OrderEventType::DeliveryStarted,
            OrderEventType::IssueReported,
            OrderEventType::DeliveryCompleted,
        ]
    );
}

#[test]
fn test_rebuild_unknown_order() {
    let manager = create_test_manager();
    assert!(matches!(
        manager.rebuild_snapshot("missing"),
        Err(ManagerError::OrderNotFound(_))
    ));
}

// ========================================================================
// Stale order sweeper
// ========================================================================

#[test]
fn test_sweep_disabled_by_default() {
    let manager = create_test_manager();
    create_pending_order(&manager);

    let far_future = shared::util::now_millis() + 365 * 24 * 3600 * 1000;
    assert!(manager.sweep_stale_orders(far_future).unwrap().is_empty());
}

#[test]
fn test_sweep_cancels_expired_orders() {
    let manager = create_test_manager_with_policy(DispatchPolicy::from_secs(0, 600, 1800));
    let pending = create_pending_order(&manager);
    let assigned = create_assigned_order(&manager, "d1");
    let in_transit = create_in_transit_order(&manager, "d2");

    // Not old enough yet
    let now = shared::util::now_millis();
    assert!(manager.sweep_stale_orders(now).unwrap().is_empty());

    // Pending expired, assigned not yet
    let cancelled = manager.sweep_stale_orders(now + 601_000).unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].order_id, pending);
    assert_eq!(
        cancelled[0].driver_notes.as_deref(),
        Some("[Cancelled by system] Expired after 600 seconds in pending")
    );

    let cancelled = manager.sweep_stale_orders(now + 1_801_000).unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].order_id, assigned);

    // In-transit orders are never swept
    assert_eq!(
        manager.get_order(&in_transit).unwrap().status,
        OrderStatus::OutForDelivery
    );

    let events = manager.get_order_events(&pending).unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.operator_id, SYSTEM_OPERATOR);
    assert_eq!(last.operator_role, Role::System);
}
