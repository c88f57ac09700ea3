//! CreateOrder command handler
//!
//! Checkout hands a priced cart to the engine. The order enters `pending`
//! with no driver and totals fixed for the rest of its life.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use rust_decimal::Decimal;
use shared::order::{DeliveryAddress, EventPayload, OrderEvent, OrderEventType, OrderItem};
use shared::util::{new_id, round_money};

/// Maximum unit price per item
const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Maximum quantity per item
const MAX_QUANTITY: u32 = 9999;
/// Maximum number of cart lines
const MAX_ITEMS: usize = 200;
/// Maximum delivery fee
const MAX_DELIVERY_FEE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// CreateOrder action
#[derive(Debug, Clone)]
pub struct CreateOrderAction {
    pub client_id: String,
    pub client_name: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub pickup_address: Option<DeliveryAddress>,
    pub delivery_fee: Decimal,
}

impl CreateOrderAction {
    fn validate(&self) -> Result<(), OrderError> {
        if self.client_id.trim().is_empty() {
            return Err(OrderError::Validation("client_id is required".to_string()));
        }
        if self.items.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        if self.items.len() > MAX_ITEMS {
            return Err(OrderError::Validation(format!(
                "order exceeds maximum of {} items",
                MAX_ITEMS
            )));
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for {} must be positive",
                    item.product_id
                )));
            }
            if item.quantity > MAX_QUANTITY {
                return Err(OrderError::Validation(format!(
                    "quantity for {} exceeds maximum allowed ({})",
                    item.product_id, MAX_QUANTITY
                )));
            }
            if item.unit_price.is_sign_negative() {
                return Err(OrderError::Validation(format!(
                    "unit price for {} must not be negative",
                    item.product_id
                )));
            }
            if item.unit_price > MAX_UNIT_PRICE {
                return Err(OrderError::Validation(format!(
                    "unit price for {} exceeds maximum allowed ({})",
                    item.product_id, MAX_UNIT_PRICE
                )));
            }
        }
        if self.delivery_fee.is_sign_negative() {
            return Err(OrderError::Validation(
                "delivery fee must not be negative".to_string(),
            ));
        }
        if self.delivery_fee > MAX_DELIVERY_FEE {
            return Err(OrderError::Validation(format!(
                "delivery fee exceeds maximum allowed ({})",
                MAX_DELIVERY_FEE
            )));
        }
        if !self.delivery_address.is_complete() {
            return Err(OrderError::Validation(
                "delivery address needs street and city".to_string(),
            ));
        }
        if let Some(pickup) = &self.pickup_address
            && !pickup.is_complete()
        {
            return Err(OrderError::Validation(
                "pickup address needs street and city".to_string(),
            ));
        }
        Ok(())
    }

    fn price(&self) -> Result<(Decimal, Decimal, Decimal), OrderError> {
        let overflow = || OrderError::Validation("order total out of range".to_string());
        let mut subtotal = Decimal::ZERO;
        for item in &self.items {
            let line = item.line_total().ok_or_else(overflow)?;
            subtotal = subtotal.checked_add(line).ok_or_else(overflow)?;
        }
        let subtotal = round_money(subtotal);
        let delivery_fee = round_money(self.delivery_fee);
        let total = subtotal.checked_add(delivery_fee).ok_or_else(overflow)?;
        Ok((subtotal, delivery_fee, total))
    }
}

#[async_trait]
impl CommandHandler for CreateOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate cart and addresses
        self.validate()?;

        // 2. Price the order
        let (subtotal, delivery_fee, total) = self.price()?;

        // 3. Allocate id and sequence
        let order_id = new_id();
        let seq = ctx.next_sequence();

        let event = OrderEvent::new(
            seq,
            order_id,
            metadata.operator_id.clone(),
            metadata.operator_role,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated {
                client_id: self.client_id.trim().to_string(),
                client_name: self.client_name.trim().to_string(),
                items: self.items.clone(),
                subtotal,
                delivery_fee,
                total,
                delivery_address: self.delivery_address.clone(),
                pickup_address: self.pickup_address.clone(),
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use rust_decimal_macros::dec;
    use shared::Role;

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            operator_id: "client-1".to_string(),
            operator_role: Role::Client,
            timestamp: 1234567890,
        }
    }

    fn item(product_id: &str, quantity: u32, unit_price: Decimal) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            name: format!("Product {}", product_id),
            quantity,
            unit_price,
        }
    }

    fn create_action(items: Vec<OrderItem>, delivery_fee: Decimal) -> CreateOrderAction {
        CreateOrderAction {
            client_id: "client-1".to_string(),
            client_name: "Ana".to_string(),
            items,
            delivery_address: DeliveryAddress {
                street: "Calle Mayor 1".to_string(),
                city: "Madrid".to_string(),
                postal_code: None,
                instructions: None,
            },
            pickup_address: None,
            delivery_fee,
        }
    }

    #[tokio::test]
    async fn test_create_order_prices_cart() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let current_seq = storage.get_current_sequence_txn(&txn).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, current_seq);

        let action = create_action(
            vec![item("p1", 2, dec!(30.00)), item("p2", 1, dec!(40.00))],
            dec!(10.00),
        );
        let events = action
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.sequence, 1);
        assert!(!event.order_id.is_empty());
        assert_eq!(event.event_type, OrderEventType::OrderCreated);

        if let EventPayload::OrderCreated {
            subtotal,
            delivery_fee,
            total,
            ..
        } = &event.payload
        {
            assert_eq!(*subtotal, dec!(100.00));
            assert_eq!(*delivery_fee, dec!(10.00));
            assert_eq!(*total, dec!(110.00));
        } else {
            panic!("Expected OrderCreated payload");
        }
    }

    #[tokio::test]
    async fn test_create_order_rounds_to_cents() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = create_action(vec![item("p1", 3, dec!(3.335))], dec!(2.005));
        let events = action
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        if let EventPayload::OrderCreated {
            subtotal,
            delivery_fee,
            total,
            ..
        } = &events[0].payload
        {
            assert_eq!(*subtotal, dec!(10.01));
            assert_eq!(*delivery_fee, dec!(2.01));
            assert_eq!(*total, dec!(12.02));
        } else {
            panic!("Expected OrderCreated payload");
        }
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_cart() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = create_action(vec![], dec!(5))
            .execute(&mut ctx, &create_test_metadata())
            .await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(ctx.current_sequence(), 0);
    }

    #[tokio::test]
    async fn test_create_order_rejects_zero_quantity() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = create_action(vec![item("p1", 0, dec!(5))], dec!(5))
            .execute(&mut ctx, &create_test_metadata())
            .await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_negative_fee() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = create_action(vec![item("p1", 1, dec!(5))], dec!(-1))
            .execute(&mut ctx, &create_test_metadata())
            .await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_incomplete_address() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut action = create_action(vec![item("p1", 1, dec!(5))], dec!(1));
        action.delivery_address.city = "  ".to_string();
        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_oversized_amounts() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let metadata = create_test_metadata();

        let cases = [
            create_action(vec![item("p1", 10, Decimal::MAX)], dec!(1)),
            create_action(vec![item("p1", 1, dec!(1000000.01))], dec!(1)),
            create_action(vec![item("p1", 10_000, dec!(1))], dec!(1)),
            create_action(vec![item("p1", 1, dec!(5))], Decimal::MAX),
            create_action(vec![item("p1", 1, dec!(1)); 201], dec!(1)),
        ];
        for action in cases {
            let result = action.execute(&mut ctx, &metadata).await;
            assert!(matches!(result, Err(OrderError::Validation(_))));
        }
        assert_eq!(ctx.current_sequence(), 0);
    }

    #[tokio::test]
    async fn test_create_order_accepts_largest_cart() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = create_action(
            vec![item("p1", MAX_QUANTITY, MAX_UNIT_PRICE); MAX_ITEMS],
            MAX_DELIVERY_FEE,
        );
        let events = action
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        if let EventPayload::OrderCreated { total, .. } = &events[0].payload {
            assert_eq!(*total, dec!(1999800000000) + dec!(10000));
        } else {
            panic!("Expected OrderCreated payload");
        }
    }
}
