//! # Order Confirmations
//!
//! Customer confirmations are sent after the order's unit of work has
//! committed, off the request path.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/orders                                                       │
//! │       │                                                                 │
//! │       ├── fulfill_order() ── COMMIT                                    │
//! │       │                                                                 │
//! │       ├── Notifier::notify() ── try_send ──┐   (never blocks; a full   │
//! │       │                                    │    queue drops + warns)   │
//! │       ▼                                    ▼                            │
//! │  201 Created                     ┌──────────────────┐                  │
//! │                                  │  worker task     │                  │
//! │                                  │  sink.deliver()  │── email, log ... │
//! │                                  └──────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed delivery is logged and never affects the committed order.

use std::future::Future;

use serde::Serialize;
use strand_core::{Currency, DeliveryMethod, Money, Order, OrderStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// What a customer confirmation needs to know about an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub order_number: String,
    pub email: String,
    pub first_name: String,
    pub total: Money,
    pub currency: Currency,
    pub status: OrderStatus,
    pub delivery_method: DeliveryMethod,
    pub pickup_point: Option<String>,
}

impl From<&Order> for OrderConfirmation {
    fn from(order: &Order) -> Self {
        OrderConfirmation {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            email: order.customer.email.clone(),
            first_name: order.customer.first_name.clone(),
            total: order.total,
            currency: order.currency,
            status: order.status,
            delivery_method: order.shipping.delivery_method,
            pickup_point: order.shipping.pickup_point.clone(),
        }
    }
}

/// Delivers confirmations: mail provider, webhook, log.
pub trait ConfirmationSink: Send + Sync + 'static {
    fn deliver(&self, confirmation: &OrderConfirmation) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Default sink: records the confirmation in the log.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl ConfirmationSink for TracingSink {
    async fn deliver(&self, confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        info!(
            order_number = %confirmation.order_number,
            email = %confirmation.email,
            total = %confirmation.total.display_in(confirmation.currency),
            "Order confirmation dispatched"
        );
        Ok(())
    }
}

/// Handle for queueing confirmations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::Sender<OrderConfirmation>>,
}

impl Notifier {
    /// A notifier that drops everything (notifications disabled).
    pub fn disabled() -> Self {
        Notifier { tx: None }
    }

    /// Starts the worker. It exits once every `Notifier` clone is dropped
    /// and the queue has drained.
    pub fn spawn<S: ConfirmationSink>(sink: S, capacity: usize) -> (Notifier, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<OrderConfirmation>(capacity);

        let worker = tokio::spawn(async move {
            while let Some(confirmation) = rx.recv().await {
                if let Err(e) = sink.deliver(&confirmation).await {
                    warn!(
                        order_number = %confirmation.order_number,
                        error = %e,
                        "Order confirmation not delivered"
                    );
                }
            }
            debug!("Notification worker stopped");
        });

        (Notifier { tx: Some(tx) }, worker)
    }

    /// Queues a confirmation without waiting.
    pub fn notify(&self, confirmation: OrderConfirmation) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(confirmation) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(order_number = %dropped.order_number, "Notification queue full, confirmation dropped");
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(order_number = %dropped.order_number, "Notification worker gone, confirmation dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        delivered: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl ConfirmationSink for RecordingSink {
        async fn deliver(&self, confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Delivery("smtp unavailable".to_string()));
            }
            self.delivered.lock().unwrap().push(confirmation.order_number.clone());
            Ok(())
        }
    }

    fn confirmation(number: &str) -> OrderConfirmation {
        OrderConfirmation {
            order_id: format!("id-{}", number),
            order_number: number.to_string(),
            email: "eva@example.cz".to_string(),
            first_name: "Eva".to_string(),
            total: Money::from_minor(108_900),
            currency: Currency::Czk,
            status: OrderStatus::Pending,
            delivery_method: DeliveryMethod::PickupPoint,
            pickup_point: Some("Z-BOX Ostrava 1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let sink = RecordingSink::default();
        let (notifier, worker) = Notifier::spawn(sink.clone(), 8);

        notifier.notify(confirmation("2025-000001"));
        notifier.notify(confirmation("2025-000002"));
        drop(notifier);
        worker.await.unwrap();

        assert_eq!(*sink.delivered.lock().unwrap(), vec!["2025-000001", "2025-000002"]);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_worker_alive() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let (notifier, worker) = Notifier::spawn(sink.clone(), 8);

        notifier.notify(confirmation("2025-000003"));
        notifier.notify(confirmation("2025-000004"));
        drop(notifier);

        // Worker drains the queue and exits normally
        worker.await.unwrap();
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_notifier_is_noop() {
        Notifier::disabled().notify(confirmation("2025-000005"));
    }
}
