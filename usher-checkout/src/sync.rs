use crate::validity;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use usher_catalog::{Catalog, PricingEngine, Selection};
use usher_core::discount::AppliedDiscountCode;
use usher_order::{Order, OrderError, OrderGateway, OrderItem};
use uuid::Uuid;

/// Build the full replacement item list for the current selection. Items
/// without custom fields collapse to one line with their quantity; items
/// with custom fields emit one quantity-1 line per COMPLETED unit, carrying
/// that unit's answers. Incomplete units are left off the order entirely.
pub fn build_replacement_items(catalog: &Catalog, selection: &Selection) -> Vec<OrderItem> {
    let mut items = Vec::new();

    for ticket in &catalog.tickets {
        let qty = selection.ticket_qty(ticket.id);
        if qty <= 0 {
            continue;
        }
        if ticket.custom_fields.is_empty() {
            items.push(OrderItem::for_ticket(
                ticket.id,
                qty,
                ticket.price_cents,
                serde_json::Value::Null,
            ));
        } else {
            for unit in completed_units(&ticket.custom_fields, selection, ticket.id, qty) {
                items.push(OrderItem::for_ticket(ticket.id, 1, ticket.price_cents, unit));
            }
        }
    }

    for offer in &catalog.offers {
        let qty = selection.offer_qty(offer.id);
        if qty <= 0 {
            continue;
        }
        if offer.custom_fields.is_empty() {
            items.push(OrderItem::for_upselling(
                offer.id,
                qty,
                offer.price_cents,
                serde_json::Value::Null,
            ));
        } else {
            for unit in completed_units(&offer.custom_fields, selection, offer.id, qty) {
                items.push(OrderItem::for_upselling(offer.id, 1, offer.price_cents, unit));
            }
        }
    }

    items
}

fn completed_units(
    fields: &[usher_catalog::FieldSpec],
    selection: &Selection,
    item_id: Uuid,
    qty: i32,
) -> Vec<serde_json::Value> {
    let units = selection.answers_for(item_id);
    let mut out = Vec::new();
    for index in 0..qty as usize {
        let Some(answers) = units.get(index) else {
            continue;
        };
        if validity::unit_complete(fields, answers) {
            out.push(serde_json::to_value(answers).unwrap_or(serde_json::Value::Null));
        }
    }
    out
}

/// One pending write against the server order
#[derive(Debug, Clone)]
pub struct SyncPayload {
    pub order_id: Uuid,
    pub items: Vec<OrderItem>,
    pub discount_cents: i64,
}

impl SyncPayload {
    /// Snapshot the selection into a payload, recomputing the engine
    /// discount so the server line matches the local one.
    pub fn from_selection(
        order_id: Uuid,
        catalog: &Catalog,
        selection: &Selection,
        code: Option<&AppliedDiscountCode>,
    ) -> Self {
        let items = build_replacement_items(catalog, selection);
        let totals = PricingEngine::compute_totals(catalog, selection, code);
        Self {
            order_id,
            items,
            discount_cents: totals.discount_cents,
        }
    }
}

struct SyncShared {
    order: Option<Order>,
    queued: Option<SyncPayload>,
    last_error: Option<String>,
}

/// Trailing-edge debounced writer for the pending order. At most one timer
/// task is alive at a time; each `schedule` replaces the queued payload and
/// restarts the window, so a burst of mutations lands as a single wholesale
/// replacement carrying the final state.
pub struct OrderSyncController {
    gateway: Arc<dyn OrderGateway>,
    window: Duration,
    shared: Arc<Mutex<SyncShared>>,
    pending: Option<JoinHandle<()>>,
}

impl OrderSyncController {
    pub fn new(gateway: Arc<dyn OrderGateway>, window: Duration) -> Self {
        Self {
            gateway,
            window,
            shared: Arc::new(Mutex::new(SyncShared {
                order: None,
                queued: None,
                last_error: None,
            })),
            pending: None,
        }
    }

    /// Attach the server order this controller writes against
    pub fn set_order(&self, order: Order) {
        self.shared.lock().expect("sync state lock").order = Some(order);
    }

    pub fn order(&self) -> Option<Order> {
        self.shared.lock().expect("sync state lock").order.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared
            .lock()
            .expect("sync state lock")
            .last_error
            .clone()
    }

    /// Queue a payload and restart the debounce window
    pub fn schedule(&mut self, payload: SyncPayload) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.shared.lock().expect("sync state lock").queued = Some(payload);

        let gateway = Arc::clone(&self.gateway);
        let shared = Arc::clone(&self.shared);
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let queued = shared.lock().expect("sync state lock").queued.take();
            if let Some(payload) = queued {
                let _ = run_payload(&gateway, &shared, payload).await;
            }
        }));
    }

    /// Cancel any pending timer and run the queued payload now. Step
    /// transitions call this so the server order reflects the selection
    /// before anything downstream reads it.
    pub async fn flush(&mut self) -> Result<Option<Order>, OrderError> {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let queued = self.shared.lock().expect("sync state lock").queued.take();
        match queued {
            Some(payload) => run_payload(&self.gateway, &self.shared, payload).await,
            None => Ok(self.order()),
        }
    }

    /// Drop the timer and the queued payload without writing
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.shared.lock().expect("sync state lock").queued = None;
    }
}

impl Drop for OrderSyncController {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

async fn run_payload(
    gateway: &Arc<dyn OrderGateway>,
    shared: &Arc<Mutex<SyncShared>>,
    payload: SyncPayload,
) -> Result<Option<Order>, OrderError> {
    // No order yet, or the order already settled: nothing to write.
    {
        let state = shared.lock().expect("sync state lock");
        match &state.order {
            None => return Ok(None),
            Some(order) if order.is_paid() => return Ok(Some(order.clone())),
            Some(_) => {}
        }
    }

    match gateway
        .replace_pending_items(payload.order_id, payload.items, payload.discount_cents)
        .await
    {
        Ok(order) => {
            let mut state = shared.lock().expect("sync state lock");
            state.order = Some(order.clone());
            state.last_error = None;
            Ok(Some(order))
        }
        Err(err) => {
            tracing::warn!(order_id = %payload.order_id, error = %err, "order sync failed");
            shared.lock().expect("sync state lock").last_error = Some(err.to_string());
            Err(err)
        }
    }
}
