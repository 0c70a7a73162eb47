use crate::item::{Catalog, OfferDiscount, QuantityRule};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use usher_core::discount::{AppliedDiscountCode, CodeDiscount};
use usher_core::money::{percent_of, round_cents};

/// Published totals for the current selection. Every field is whole cents;
/// rounding has already happened at the documented boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub tickets_subtotal_cents: i64,
    pub upsellings_subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

/// Pure order-total calculator. No I/O, deterministic, cheap enough to
/// run on every selection mutation.
pub struct PricingEngine;

impl PricingEngine {
    /// Compute subtotals, the combined discount and the final total.
    ///
    /// Rounding order: the offer-discount contributions are summed exactly
    /// and rounded once; the code discount is rounded once; the total is
    /// integer arithmetic over those published values.
    pub fn compute_totals(
        catalog: &Catalog,
        selection: &Selection,
        code: Option<&AppliedDiscountCode>,
    ) -> OrderTotals {
        let tickets_subtotal: i64 = catalog
            .tickets
            .iter()
            .map(|t| t.price_cents * selection.ticket_qty(t.id) as i64)
            .sum();

        let upsellings_subtotal: i64 = catalog
            .offers
            .iter()
            .map(|o| o.price_cents * selection.offer_qty(o.id) as i64)
            .sum();

        // A validated code suppresses offer-level discounts entirely.
        let offer_discount = if code.is_some() {
            0
        } else {
            Self::compute_upsell_discount(catalog, selection, tickets_subtotal)
        };

        // The code applies to the ticket subtotal only, and only when there
        // is a ticket subtotal to discount.
        let code_discount = match code.map(|c| &c.discount) {
            Some(CodeDiscount::Percent(value)) if tickets_subtotal > 0 => {
                round_cents(percent_of(tickets_subtotal, *value))
            }
            Some(CodeDiscount::Amount(amount)) if tickets_subtotal > 0 => {
                (*amount).min(tickets_subtotal)
            }
            _ => 0,
        };

        let discount_cents = offer_discount + code_discount;
        let total_cents = (tickets_subtotal + upsellings_subtotal - discount_cents).max(0);

        OrderTotals {
            tickets_subtotal_cents: tickets_subtotal,
            upsellings_subtotal_cents: upsellings_subtotal,
            discount_cents,
            total_cents,
        }
    }

    /// Offer-level discount against the ticket subtotal, summed exactly
    /// across selected offers and rounded to cents once at the end.
    fn compute_upsell_discount(
        catalog: &Catalog,
        selection: &Selection,
        tickets_subtotal_cents: i64,
    ) -> i64 {
        let total_tickets = selection.total_tickets();
        let mut raw = 0.0_f64;

        for offer in &catalog.offers {
            let qty = selection.offer_qty(offer.id);
            if qty == 0 {
                continue;
            }

            match &offer.discount {
                OfferDiscount::None => {}
                OfferDiscount::Percent(value) => match offer.quantity_rule {
                    QuantityRule::UserCanChange => {
                        // One discounted ticket per offer unit, capped at the
                        // number of tickets in the selection.
                        if total_tickets > 0 {
                            let applications = total_tickets.min(qty);
                            let per_ticket = percent_of(tickets_subtotal_cents, *value)
                                / total_tickets as f64;
                            raw += applications as f64 * per_ticket;
                        }
                    }
                    _ => raw += percent_of(tickets_subtotal_cents, *value),
                },
                OfferDiscount::Fixed(value_cents) => match offer.quantity_rule {
                    QuantityRule::UserCanChange => {
                        raw += (total_tickets.min(qty) as i64 * value_cents) as f64
                    }
                    _ => raw += *value_cents as f64,
                },
            }
        }

        round_cents(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{OfferStrategy, SalesWindow, Ticket, UpsellingOffer};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn window() -> SalesWindow {
        let now = Utc::now();
        SalesWindow {
            start: now - Duration::hours(1),
            end: now + Duration::hours(1),
        }
    }

    fn ticket(price_cents: i64) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            name: "General admission".to_string(),
            price_cents,
            quantity_total: 100,
            quantity_sold: 0,
            sales_window: window(),
            custom_fields: Vec::new(),
        }
    }

    fn offer(price_cents: i64, rule: QuantityRule, discount: OfferDiscount) -> UpsellingOffer {
        UpsellingOffer {
            id: Uuid::new_v4(),
            name: "T-shirt".to_string(),
            price_cents,
            quantity_total: 50,
            quantity_sold: 0,
            sales_window: window(),
            custom_fields: Vec::new(),
            strategy: OfferStrategy::PreCheckout,
            quantity_rule: rule,
            discount,
        }
    }

    fn select(catalog: &Catalog, ticket_qty: i32, offer_qty: i32) -> Selection {
        let mut selection = Selection::default();
        if let Some(t) = catalog.tickets.first() {
            selection.tickets.insert(t.id, ticket_qty);
        }
        if let Some(o) = catalog.offers.first() {
            selection.offers.insert(o.id, offer_qty);
        }
        selection
    }

    #[test]
    fn test_scenario_a_percent_user_can_change() {
        // 2 tickets @ $50, one PERCENT/10/USER_CAN_CHANGE offer @ $20 qty 1
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2000, QuantityRule::UserCanChange, OfferDiscount::Percent(10.0))],
        );
        let selection = select(&catalog, 2, 1);

        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.tickets_subtotal_cents, 10000);
        assert_eq!(totals.upsellings_subtotal_cents, 2000);
        // 1 application * (10000/2 * 10%) = 500
        assert_eq!(totals.discount_cents, 500);
        assert_eq!(totals.total_cents, 11500);
    }

    #[test]
    fn test_scenario_b_code_suppresses_offer_discount() {
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2000, QuantityRule::UserCanChange, OfferDiscount::Percent(10.0))],
        );
        let selection = select(&catalog, 2, 1);
        let code = AppliedDiscountCode {
            id: Uuid::new_v4(),
            code: "SAVE30".to_string(),
            discount: CodeDiscount::Amount(3000),
        };

        let totals = PricingEngine::compute_totals(&catalog, &selection, Some(&code));
        // Offer discount is exactly 0 whenever a code is applied
        assert_eq!(totals.discount_cents, 3000);
        assert_eq!(totals.total_cents, 9000);
    }

    #[test]
    fn test_percent_discount_other_rules_applies_once() {
        // ONLY_ONE: full ticket-subtotal percentage, not scaled by quantity
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2000, QuantityRule::OnlyOne, OfferDiscount::Percent(10.0))],
        );
        let selection = select(&catalog, 3, 1);

        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.discount_cents, 1500); // 15000 * 10%
        assert_eq!(totals.total_cents, 15000 + 2000 - 1500);
    }

    #[test]
    fn test_fixed_discount_user_can_change_scales_with_applications() {
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2000, QuantityRule::UserCanChange, OfferDiscount::Fixed(300))],
        );

        // 2 tickets, 3 offer units: applications capped at ticket count
        let selection = select(&catalog, 2, 3);
        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.discount_cents, 600);
    }

    #[test]
    fn test_fixed_discount_other_rules_applies_once() {
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(
                2000,
                QuantityRule::MatchesTicketCount,
                OfferDiscount::Fixed(300),
            )],
        );
        let selection = select(&catalog, 2, 2);
        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.discount_cents, 300);
    }

    #[test]
    fn test_percent_user_can_change_degenerates_with_no_tickets() {
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2000, QuantityRule::UserCanChange, OfferDiscount::Percent(10.0))],
        );
        let selection = select(&catalog, 0, 1);

        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 2000);
    }

    #[test]
    fn test_unselected_offer_contributes_no_discount() {
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2000, QuantityRule::UserCanChange, OfferDiscount::Percent(50.0))],
        );
        let selection = select(&catalog, 2, 0);

        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.discount_cents, 0);
    }

    #[test]
    fn test_amount_code_capped_at_ticket_subtotal() {
        let catalog = Catalog::new(vec![ticket(2000)], Vec::new());
        let selection = select(&catalog, 1, 0);
        let code = AppliedDiscountCode {
            id: Uuid::new_v4(),
            code: "BIG".to_string(),
            discount: CodeDiscount::Amount(99999),
        };

        let totals = PricingEngine::compute_totals(&catalog, &selection, Some(&code));
        assert_eq!(totals.discount_cents, 2000);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_code_never_discounts_upsellings() {
        // 100% code zeroes the tickets but the offer price survives
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2500, QuantityRule::UserCanChange, OfferDiscount::None)],
        );
        let selection = select(&catalog, 1, 1);
        let code = AppliedDiscountCode {
            id: Uuid::new_v4(),
            code: "FREE".to_string(),
            discount: CodeDiscount::Percent(100.0),
        };

        let totals = PricingEngine::compute_totals(&catalog, &selection, Some(&code));
        assert_eq!(totals.discount_cents, 5000);
        assert_eq!(totals.total_cents, 2500);
    }

    #[test]
    fn test_code_ignored_when_no_tickets_selected() {
        let catalog = Catalog::new(
            vec![ticket(5000)],
            vec![offer(2500, QuantityRule::UserCanChange, OfferDiscount::None)],
        );
        let selection = select(&catalog, 0, 1);
        let code = AppliedDiscountCode {
            id: Uuid::new_v4(),
            code: "SAVE".to_string(),
            discount: CodeDiscount::Amount(1000),
        };

        let totals = PricingEngine::compute_totals(&catalog, &selection, Some(&code));
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 2500);
    }

    #[test]
    fn test_total_never_negative() {
        let catalog = Catalog::new(
            vec![ticket(1000)],
            vec![offer(0, QuantityRule::OnlyOne, OfferDiscount::Fixed(5000))],
        );
        let selection = select(&catalog, 1, 1);

        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_percent_rounding_happens_once_at_the_boundary() {
        // 3 tickets @ $33.33, 10% per-ticket discount, 2 offer units:
        // exact sum 2 * (9999 * 0.10 / 3) = 666.6 -> 667 after one rounding
        let catalog = Catalog::new(
            vec![ticket(3333)],
            vec![offer(100, QuantityRule::UserCanChange, OfferDiscount::Percent(10.0))],
        );
        let selection = select(&catalog, 3, 2);

        let totals = PricingEngine::compute_totals(&catalog, &selection, None);
        assert_eq!(totals.discount_cents, 667);
    }
}
