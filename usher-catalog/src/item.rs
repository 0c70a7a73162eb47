use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// When an upselling offer is shown in the checkout flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStrategy {
    PreCheckout,
    PostCheckout,
}

/// Policy bounding how many units of an offer a buyer may select
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantityRule {
    UserCanChange,
    OnlyOne,
    MatchesTicketCount,
}

/// Offer-level discount against the ticket subtotal. Percent values are
/// whole percentages (10.0 = 10%), Fixed values are cents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferDiscount {
    None,
    Percent(f64),
    Fixed(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SalesWindow {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    Select,
    Checkbox,
    Date,
}

/// A dynamic form question answered once per purchased unit.
/// `label` is the answer key and must be unique within the item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub quantity_total: i32,
    pub quantity_sold: i32,
    pub sales_window: SalesWindow,
    #[serde(default)]
    pub custom_fields: Vec<FieldSpec>,
}

impl Ticket {
    /// Units still sellable; never negative even if oversold upstream
    pub fn available(&self) -> i32 {
        (self.quantity_total - self.quantity_sold).max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsellingOffer {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub quantity_total: i32,
    pub quantity_sold: i32,
    pub sales_window: SalesWindow,
    #[serde(default)]
    pub custom_fields: Vec<FieldSpec>,
    pub strategy: OfferStrategy,
    pub quantity_rule: QuantityRule,
    pub discount: OfferDiscount,
}

impl UpsellingOffer {
    pub fn available(&self) -> i32 {
        (self.quantity_total - self.quantity_sold).max(0)
    }

    pub fn has_discount(&self) -> bool {
        !matches!(self.discount, OfferDiscount::None)
    }
}

/// The purchasable items loaded for one event, in display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub tickets: Vec<Ticket>,
    pub offers: Vec<UpsellingOffer>,
}

impl Catalog {
    pub fn new(tickets: Vec<Ticket>, offers: Vec<UpsellingOffer>) -> Self {
        Self { tickets, offers }
    }

    pub fn ticket(&self, id: Uuid) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn offer(&self, id: Uuid) -> Option<&UpsellingOffer> {
        self.offers.iter().find(|o| o.id == id)
    }

    pub fn has_tickets(&self) -> bool {
        !self.tickets.is_empty()
    }

    /// Custom-field schema for any item, ticket or offer
    pub fn custom_fields(&self, item_id: Uuid) -> Option<&[FieldSpec]> {
        if let Some(ticket) = self.ticket(item_id) {
            return Some(&ticket.custom_fields);
        }
        self.offer(item_id).map(|o| o.custom_fields.as_slice())
    }

    /// Offers a buyer can still take for a step: matching strategy, sales
    /// window open, at least one unit available.
    pub fn eligible_offers(
        &self,
        strategy: OfferStrategy,
        now: DateTime<Utc>,
    ) -> Vec<&UpsellingOffer> {
        self.offers
            .iter()
            .filter(|o| o.strategy == strategy && o.sales_window.is_open(now) && o.available() > 0)
            .collect()
    }
}
