use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the checkout lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

/// One line on the order: either a ticket or an upselling offer. Items with
/// custom fields are emitted one line per completed unit (quantity 1 each),
/// carrying that unit's answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub ticket_id: Option<Uuid>,
    pub upselling_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub custom_fields: serde_json::Value,
}

impl OrderItem {
    pub fn for_ticket(
        ticket_id: Uuid,
        quantity: i32,
        unit_price_cents: i64,
        custom_fields: serde_json::Value,
    ) -> Self {
        Self {
            ticket_id: Some(ticket_id),
            upselling_id: None,
            quantity,
            unit_price_cents,
            subtotal_cents: quantity as i64 * unit_price_cents,
            custom_fields,
        }
    }

    pub fn for_upselling(
        upselling_id: Uuid,
        quantity: i32,
        unit_price_cents: i64,
        custom_fields: serde_json::Value,
    ) -> Self {
        Self {
            ticket_id: None,
            upselling_id: Some(upselling_id),
            quantity,
            unit_price_cents,
            subtotal_cents: quantity as i64 * unit_price_cents,
            custom_fields,
        }
    }
}

/// The server-owned aggregate for one checkout attempt. Safe to replace
/// wholesale while Pending; immutable once Paid except for appended
/// post-checkout items on the charge-stored-method path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub event_id: Uuid,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub items: Vec<OrderItem>,
    pub customer_email: String,
    pub customer_name: String,
    pub form_submission_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    /// Replace the line items wholesale and recompute published totals
    pub fn apply_items(&mut self, items: Vec<OrderItem>, discount_cents: i64) {
        self.subtotal_cents = items.iter().map(|i| i.subtotal_cents).sum();
        self.discount_cents = discount_cents;
        self.total_cents = (self.subtotal_cents - discount_cents).max(0);
        self.items = items;
        self.updated_at = Utc::now();
    }
}

/// Input for the initial order creation
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub event_id: Uuid,
    pub customer_email: String,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub discount_cents: i64,
    pub form_submission_id: Option<Uuid>,
}

/// Partial update against a pending order
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub items: Option<Vec<OrderItem>>,
    pub discount_cents: Option<i64>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub form_submission_id: Option<Uuid>,
}
