use super::*;
use crate::profiles::InMemoryProfiles;
use rust_decimal_macros::dec;
use shared::DriverProfile;
use shared::order::{CommandErrorCode, OrderEventType};

fn test_profiles() -> Arc<dyn ProfileDirectory> {
    Arc::new(InMemoryProfiles::with_profiles([
        DriverProfile::new("d1", true, false),
        DriverProfile::new("d2", true, false),
        // Not approved yet
        DriverProfile::new("d3", false, false),
        // Approved but blocked
        DriverProfile::new("d4", true, true),
    ]))
}

fn create_test_manager() -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    OrdersManager::with_storage(storage, test_profiles())
}

fn create_test_manager_with_policy(policy: DispatchPolicy) -> OrdersManager {
    create_test_manager().with_policy(policy)
}

fn address(street: &str) -> DeliveryAddress {
    DeliveryAddress {
        street: street.to_string(),
        city: "Valencia".to_string(),
        postal_code: Some("46001".to_string()),
        instructions: None,
    }
}

fn simple_item(product_id: &str, name: &str, quantity: u32, unit_price: Decimal) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        name: name.to_string(),
        quantity,
        unit_price,
    }
}

fn create_order_cmd(client_id: &str, delivery_fee: Decimal) -> OrderCommand {
    OrderCommand::new(
        client_id.to_string(),
        Role::Client,
        OrderCommandPayload::CreateOrder {
            client_id: client_id.to_string(),
            client_name: "Ana García".to_string(),
            items: vec![simple_item("p1", "Paella", 2, dec!(50.00))],
            delivery_address: address("Calle Colón 5"),
            pickup_address: Some(address("Mercado Central")),
            delivery_fee,
        },
    )
}

// ========================================================================
// Helper: create an order and walk it to the requested status
// ========================================================================

fn create_pending_order(manager: &OrdersManager) -> String {
    let response = manager.execute_command(create_order_cmd("c1", dec!(10.00)));
    assert!(response.success, "Failed to create order");
    response.order_id.unwrap()
}

fn create_assigned_order(manager: &OrdersManager, driver_id: &str) -> String {
    let order_id = create_pending_order(manager);
    manager.accept_order(&order_id, driver_id).unwrap();
    order_id
}

fn create_in_transit_order(manager: &OrdersManager, driver_id: &str) -> String {
    let order_id = create_assigned_order(manager, driver_id);
    manager
        .start_delivery(&order_id, driver_id, Some("photos/pickup.jpg"))
        .unwrap();
    order_id
}

fn deliver(manager: &OrdersManager, order_id: &str, driver_id: &str) -> OrderSnapshot {
    manager
        .complete_delivery(
            order_id,
            driver_id,
            Some("photos/door.jpg"),
            Some("sig-base64"),
            None,
        )
        .unwrap()
}

mod test_flows;
mod test_settlement;
