use crate::models::{Order, OrderDraft, OrderItem, OrderStatus, OrderUpdate};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {0} is {1:?} and can no longer be modified")]
    Immutable(Uuid, OrderStatus),

    #[error("Order transport failure: {0}")]
    Transport(String),
}

/// Persistence port for the pending order. `replace_pending_items` is the
/// idempotent wholesale-replacement operation the sync controller leans on:
/// calling it twice with the same item list yields the same order.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderError>;

    async fn update_order(&self, id: Uuid, update: OrderUpdate) -> Result<Order, OrderError>;

    async fn replace_pending_items(
        &self,
        id: Uuid,
        items: Vec<OrderItem>,
        discount_cents: i64,
    ) -> Result<Order, OrderError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, OrderError>;
}

/// In-memory gateway used across the workspace's tests. Mirrors the remote
/// contract: wholesale replacement, Pending-only mutation, totals recomputed
/// server-side from the submitted items.
pub struct InMemoryOrderGateway {
    orders: Mutex<HashMap<Uuid, Order>>,
    replace_calls: AtomicUsize,
}

impl InMemoryOrderGateway {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            replace_calls: AtomicUsize::new(0),
        }
    }

    pub fn replace_call_count(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// Flip an order's status the way the remote backend does during
    /// payment confirmation. Not part of the gateway port.
    pub fn set_status(&self, id: Uuid, status: OrderStatus) -> bool {
        let mut orders = self.orders.lock().expect("order gateway lock");
        match orders.get_mut(&id) {
            Some(order) => {
                order.status = status;
                order.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryOrderGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderGateway for InMemoryOrderGateway {
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderError> {
        let now = Utc::now();
        let subtotal_cents: i64 = draft.items.iter().map(|i| i.subtotal_cents).sum();
        let order = Order {
            id: Uuid::new_v4(),
            event_id: draft.event_id,
            status: OrderStatus::Pending,
            subtotal_cents,
            discount_cents: draft.discount_cents,
            total_cents: (subtotal_cents - draft.discount_cents).max(0),
            items: draft.items,
            customer_email: draft.customer_email,
            customer_name: draft.customer_name,
            form_submission_id: draft.form_submission_id,
            created_at: now,
            updated_at: now,
        };

        self.orders
            .lock()
            .expect("order gateway lock")
            .insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order(&self, id: Uuid, update: OrderUpdate) -> Result<Order, OrderError> {
        let mut orders = self.orders.lock().expect("order gateway lock");
        let order = orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;

        if order.is_paid() {
            return Err(OrderError::Immutable(id, order.status));
        }

        if let Some(email) = update.customer_email {
            order.customer_email = email;
        }
        if let Some(name) = update.customer_name {
            order.customer_name = name;
        }
        if let Some(submission_id) = update.form_submission_id {
            order.form_submission_id = Some(submission_id);
        }
        match (update.items, update.discount_cents) {
            (Some(items), discount) => {
                let discount = discount.unwrap_or(order.discount_cents);
                order.apply_items(items, discount);
            }
            (None, Some(discount)) => {
                let items = order.items.clone();
                order.apply_items(items, discount);
            }
            (None, None) => order.updated_at = Utc::now(),
        }

        Ok(order.clone())
    }

    async fn replace_pending_items(
        &self,
        id: Uuid,
        items: Vec<OrderItem>,
        discount_cents: i64,
    ) -> Result<Order, OrderError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);

        let mut orders = self.orders.lock().expect("order gateway lock");
        let order = orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;

        if order.is_paid() {
            return Err(OrderError::Immutable(id, order.status));
        }

        order.apply_items(items, discount_cents);
        Ok(order.clone())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        Ok(self
            .orders
            .lock()
            .expect("order gateway lock")
            .get(&id)
            .cloned())
    }
}
