use crate::item::{Ticket, UpsellingOffer};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog fetch failed: {0}")]
    Fetch(String),
}

/// Read side of the catalog. Implementations return items already filtered
/// for an open sales window and availability above zero.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn tickets_by_event(&self, event_id: Uuid) -> Result<Vec<Ticket>, CatalogError>;

    async fn upsellings_by_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<UpsellingOffer>, CatalogError>;
}

/// Fixed catalog used by tests and local development.
pub struct StaticCatalogSource {
    tickets: Vec<Ticket>,
    offers: Vec<UpsellingOffer>,
}

impl StaticCatalogSource {
    pub fn new(tickets: Vec<Ticket>, offers: Vec<UpsellingOffer>) -> Self {
        Self { tickets, offers }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn tickets_by_event(&self, _event_id: Uuid) -> Result<Vec<Ticket>, CatalogError> {
        let now = Utc::now();
        Ok(self
            .tickets
            .iter()
            .filter(|t| t.sales_window.is_open(now) && t.available() > 0)
            .cloned()
            .collect())
    }

    async fn upsellings_by_event(
        &self,
        _event_id: Uuid,
    ) -> Result<Vec<UpsellingOffer>, CatalogError> {
        let now = Utc::now();
        Ok(self
            .offers
            .iter()
            .filter(|o| o.sales_window.is_open(now) && o.available() > 0)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{OfferDiscount, OfferStrategy, QuantityRule, SalesWindow};
    use chrono::Duration;

    #[tokio::test]
    async fn test_static_source_filters_closed_windows() {
        let now = Utc::now();
        let closed = Ticket {
            id: Uuid::new_v4(),
            name: "Early bird".to_string(),
            price_cents: 4000,
            quantity_total: 10,
            quantity_sold: 0,
            sales_window: SalesWindow {
                start: now - Duration::days(30),
                end: now - Duration::days(1),
            },
            custom_fields: Vec::new(),
        };
        let open = Ticket {
            sales_window: SalesWindow {
                start: now - Duration::hours(1),
                end: now + Duration::hours(1),
            },
            ..closed.clone()
        };
        let sold_out_offer = UpsellingOffer {
            id: Uuid::new_v4(),
            name: "Parking".to_string(),
            price_cents: 1500,
            quantity_total: 5,
            quantity_sold: 5,
            sales_window: SalesWindow {
                start: now - Duration::hours(1),
                end: now + Duration::hours(1),
            },
            custom_fields: Vec::new(),
            strategy: OfferStrategy::PreCheckout,
            quantity_rule: QuantityRule::UserCanChange,
            discount: OfferDiscount::None,
        };

        let source = StaticCatalogSource::new(vec![closed, open], vec![sold_out_offer]);

        let tickets = source.tickets_by_event(Uuid::new_v4()).await.unwrap();
        assert_eq!(tickets.len(), 1);

        let offers = source.upsellings_by_event(Uuid::new_v4()).await.unwrap();
        assert!(offers.is_empty());
    }
}
