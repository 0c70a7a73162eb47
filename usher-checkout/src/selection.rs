use crate::validity;
use usher_catalog::{Catalog, OrderTotals, PricingEngine, QuantityRule, Selection, UnitAnswers};
use usher_core::discount::AppliedDiscountCode;
use uuid::Uuid;

/// What a mutation did, so the caller knows whether to schedule a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationOutcome {
    pub changed: bool,
    pub needs_sync: bool,
}

impl MutationOutcome {
    fn noop() -> Self {
        Self::default()
    }

    fn synced() -> Self {
        Self {
            changed: true,
            needs_sync: true,
        }
    }
}

/// Owns the buyer's selection, the applied discount code and the contact
/// fields. Every mutation clamps quantities, keeps per-unit answers sized
/// to the selection, and synchronously recomputes totals and validity —
/// the recompute is pure and cheap, so it runs on every change.
pub struct SelectionStore {
    catalog: Catalog,
    selection: Selection,
    applied_code: Option<AppliedDiscountCode>,
    email: String,
    totals: OrderTotals,
    valid: bool,
}

impl SelectionStore {
    pub fn new(catalog: Catalog) -> Self {
        let mut store = Self {
            catalog,
            selection: Selection::default(),
            applied_code: None,
            email: String::new(),
            totals: OrderTotals::default(),
            valid: false,
        };
        store.recompute();
        store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn applied_code(&self) -> Option<&AppliedDiscountCode> {
        self.applied_code.as_ref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = email.to_string();
        self.recompute();
    }

    /// Set a ticket quantity, clamped to `[0, available]`. Any
    /// MATCHES_TICKET_COUNT offer above the new ticket total is clamped
    /// down with it (never up).
    pub fn set_ticket_qty(&mut self, ticket_id: Uuid, qty: i32) -> MutationOutcome {
        let Some(ticket) = self.catalog.ticket(ticket_id) else {
            return MutationOutcome::noop();
        };
        let clamped = qty.clamp(0, ticket.available());
        let has_fields = !ticket.custom_fields.is_empty();

        let mut changed = false;
        if self.selection.ticket_qty(ticket_id) != clamped {
            self.selection.tickets.insert(ticket_id, clamped);
            if has_fields {
                self.resize_answers(ticket_id, clamped);
            }
            changed = true;
        }

        changed |= self.clamp_matching_offers();
        if !changed {
            return MutationOutcome::noop();
        }

        self.recompute();
        MutationOutcome::synced()
    }

    /// Set an offer quantity, clamped per its quantity rule.
    pub fn set_offer_qty(&mut self, offer_id: Uuid, qty: i32) -> MutationOutcome {
        let Some(offer) = self.catalog.offer(offer_id) else {
            return MutationOutcome::noop();
        };

        let ceiling = match offer.quantity_rule {
            QuantityRule::UserCanChange => offer.available(),
            QuantityRule::OnlyOne => offer.available().min(1),
            QuantityRule::MatchesTicketCount => {
                offer.available().min(self.selection.total_tickets())
            }
        };
        let clamped = qty.clamp(0, ceiling);
        let has_fields = !offer.custom_fields.is_empty();

        if self.selection.offer_qty(offer_id) == clamped {
            return MutationOutcome::noop();
        }

        self.selection.offers.insert(offer_id, clamped);
        if has_fields {
            self.resize_answers(offer_id, clamped);
        }
        self.recompute();
        MutationOutcome::synced()
    }

    /// Set one unit's answer. Unknown item, unknown label or an index past
    /// the selected quantity is a caller error and a silent no-op.
    pub fn set_custom_field(
        &mut self,
        item_id: Uuid,
        unit_index: usize,
        label: &str,
        value: &str,
    ) -> MutationOutcome {
        let Some(fields) = self.catalog.custom_fields(item_id) else {
            return MutationOutcome::noop();
        };
        if !fields.iter().any(|f| f.label == label) {
            return MutationOutcome::noop();
        }
        let Some(units) = self.selection.answers.get_mut(&item_id) else {
            return MutationOutcome::noop();
        };
        let Some(unit) = units.get_mut(unit_index) else {
            return MutationOutcome::noop();
        };

        unit.insert(label.to_string(), value.to_string());
        self.recompute();
        MutationOutcome::synced()
    }

    pub fn apply_discount_code(&mut self, code: AppliedDiscountCode) -> MutationOutcome {
        self.applied_code = Some(code);
        self.recompute();
        MutationOutcome::synced()
    }

    pub fn clear_discount_code(&mut self) -> MutationOutcome {
        if self.applied_code.is_none() {
            return MutationOutcome::noop();
        }
        self.applied_code = None;
        self.recompute();
        MutationOutcome::synced()
    }

    /// Clamp MATCHES_TICKET_COUNT offers down to the current ticket total.
    fn clamp_matching_offers(&mut self) -> bool {
        let total_tickets = self.selection.total_tickets();
        let mut to_clamp = Vec::new();

        for offer in &self.catalog.offers {
            if offer.quantity_rule != QuantityRule::MatchesTicketCount {
                continue;
            }
            let qty = self.selection.offer_qty(offer.id);
            if qty > total_tickets {
                to_clamp.push((offer.id, total_tickets, !offer.custom_fields.is_empty()));
            }
        }

        for (offer_id, new_qty, has_fields) in &to_clamp {
            self.selection.offers.insert(*offer_id, *new_qty);
            if *has_fields {
                self.resize_answers(*offer_id, *new_qty);
            }
        }
        !to_clamp.is_empty()
    }

    /// Keep the per-unit answers array sized to the quantity. Decreases
    /// truncate from the tail only, so earlier units never shift index.
    fn resize_answers(&mut self, item_id: Uuid, qty: i32) {
        let units = self.selection.answers.entry(item_id).or_default();
        let target = qty.max(0) as usize;
        if units.len() > target {
            units.truncate(target);
        } else {
            while units.len() < target {
                units.push(UnitAnswers::new());
            }
        }
    }

    fn recompute(&mut self) {
        self.totals =
            PricingEngine::compute_totals(&self.catalog, &self.selection, self.applied_code.as_ref());
        self.valid = validity::check(&self.catalog, &self.selection, &self.email);
    }
}
