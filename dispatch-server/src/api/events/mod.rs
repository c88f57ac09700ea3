//! Realtime notification stream (Server-Sent Events)
//!
//! `GET /api/events` streams one event per committed change the caller may
//! see. The SSE `id` is the global sequence; an observer that receives a
//! `resync` event fell behind and should call `/api/sync`.
//!
//! | Role | Sees |
//! |------|------|
//! | admin | everything |
//! | client | changes to own orders |
//! | driver | pending pool movements, own orders, own rejections |

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::Stream;
use shared::order::OrderStatus;
use shared::{DispatchNotification, Role};
use tokio::sync::broadcast;

use crate::auth::CurrentUser;
use crate::core::ServerState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events", get(stream))
}

async fn stream(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %user.user_id, role = %user.role, "Event stream opened");
    let rx = state.orders.subscribe();
    Sse::new(notification_stream(rx, user))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn notification_stream(
    rx: broadcast::Receiver<DispatchNotification>,
    user: CurrentUser,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold((rx, user), |(mut rx, user)| async move {
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    if !is_visible_to(&user, &notification) {
                        continue;
                    }
                    return Some((Ok::<_, Infallible>(to_event(&notification)), (rx, user)));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user.user_id, skipped, "Event stream lagged");
                    let event = Event::default()
                        .event("resync")
                        .data(skipped.to_string());
                    return Some((Ok::<_, Infallible>(event), (rx, user)));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

fn to_event(notification: &DispatchNotification) -> Event {
    let data = serde_json::to_string(notification).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode notification");
        "{}".to_string()
    });
    Event::default()
        .event(notification.event_name())
        .id(notification.sequence().to_string())
        .data(data)
}

/// Per-role notification visibility
pub fn is_visible_to(user: &CurrentUser, notification: &DispatchNotification) -> bool {
    match (user.role, notification) {
        (Role::Admin | Role::System, _) => true,
        (Role::Client, DispatchNotification::OrderChanged { order, .. }) => {
            order.client_id == user.user_id
        }
        (Role::Client, DispatchNotification::RejectionLogged { .. }) => false,
        (Role::Driver, DispatchNotification::OrderChanged { order, .. }) => {
            order.is_assigned_to(&user.user_id)
                // Entering or leaving the pending pool
                || matches!(
                    order.status,
                    OrderStatus::Pending | OrderStatus::DriverAssigned | OrderStatus::Cancelled
                )
        }
        (Role::Driver, DispatchNotification::RejectionLogged { entry, .. }) => {
            entry.driver_id == user.user_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::RejectionLogEntry;
    use shared::order::OrderSnapshot;

    fn changed(client: &str, driver: Option<&str>, status: OrderStatus) -> DispatchNotification {
        let mut order = OrderSnapshot::new("o1".to_string());
        order.client_id = client.to_string();
        order.driver_id = driver.map(str::to_string);
        order.status = status;
        DispatchNotification::OrderChanged { sequence: 1, order }
    }

    #[test]
    fn test_visibility_by_role() {
        let admin = CurrentUser::new("a1", Role::Admin);
        let client = CurrentUser::new("c1", Role::Client);
        let driver = CurrentUser::new("d1", Role::Driver);

        let own = changed("c1", Some("d1"), OrderStatus::OutForDelivery);
        let other = changed("c2", Some("d2"), OrderStatus::OutForDelivery);
        let pool = changed("c2", None, OrderStatus::Pending);

        assert!(is_visible_to(&admin, &other));
        assert!(is_visible_to(&client, &own));
        assert!(!is_visible_to(&client, &other));
        assert!(is_visible_to(&driver, &own));
        assert!(!is_visible_to(&driver, &other));
        assert!(is_visible_to(&driver, &pool));

        let rejection = DispatchNotification::RejectionLogged {
            sequence: 2,
            entry: RejectionLogEntry {
                id: "r1".to_string(),
                sequence: 2,
                order_id: "o1".to_string(),
                driver_id: "d2".to_string(),
                reason: "too far".to_string(),
                created_at: 0,
            },
        };
        assert!(is_visible_to(&admin, &rejection));
        assert!(!is_visible_to(&driver, &rejection));
        assert!(!is_visible_to(&client, &rejection));
    }
}
