use crate::config::CheckoutConfig;
use crate::error::CheckoutError;
use crate::finalize::{ConfirmationTarget, FreeOrderCompleter, PostPaymentFinalizer, RedirectConfig};
use crate::selection::{MutationOutcome, SelectionStore};
use crate::session::PaymentSessionCoordinator;
use crate::sync::{build_replacement_items, OrderSyncController, SyncPayload};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use usher_catalog::{Catalog, OfferStrategy, OrderTotals};
use usher_core::discount::DiscountValidator;
use usher_core::forms::FormSubmissionStore;
use usher_core::payment::{PaymentProvider, PaymentSession};
use usher_order::{Order, OrderDraft, OrderGateway};
use uuid::Uuid;

/// Steps of the checkout flow, in forward order. Upsell steps are skipped
/// dynamically when no eligible offer exists for them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStep {
    TicketSelect,
    PreCheckoutUpsell,
    Payment,
    PostCheckoutUpsell,
    Confirmed,
}

/// Static identity of one checkout run
#[derive(Debug, Clone)]
pub struct CheckoutContext {
    pub event_id: Uuid,
    pub form_id: Uuid,
    pub redirect: RedirectConfig,
}

/// Where a successful card payment lands: either the post-checkout upsell
/// step, or straight at the confirmation target.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    PostCheckoutUpsell,
    Confirmed(ConfirmationTarget),
}

/// The checkout state machine. Owns the selection, the debounced order
/// writer and the session coordinator; enforces forward-only transitions
/// with an explicit flush at every boundary so the server order is current
/// before anything downstream reads it.
pub struct CheckoutFlow {
    context: CheckoutContext,
    step: CheckoutStep,
    store: SelectionStore,
    customer_name: String,
    sync: OrderSyncController,
    sessions: PaymentSessionCoordinator,
    gateway: Arc<dyn OrderGateway>,
    provider: Arc<dyn PaymentProvider>,
    forms: Arc<dyn FormSubmissionStore>,
    validator: Arc<dyn DiscountValidator>,
    finalizer: PostPaymentFinalizer,
    free: FreeOrderCompleter,
    submission_id: Option<Uuid>,
}

impl CheckoutFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: CheckoutContext,
        config: &CheckoutConfig,
        catalog: Catalog,
        gateway: Arc<dyn OrderGateway>,
        provider: Arc<dyn PaymentProvider>,
        forms: Arc<dyn FormSubmissionStore>,
        validator: Arc<dyn DiscountValidator>,
    ) -> Self {
        let finalizer = PostPaymentFinalizer::new(context.redirect.clone());
        let free = FreeOrderCompleter::new(Arc::clone(&provider), Arc::clone(&gateway));
        Self {
            context,
            step: CheckoutStep::TicketSelect,
            store: SelectionStore::new(catalog),
            customer_name: String::new(),
            sync: OrderSyncController::new(
                Arc::clone(&gateway),
                Duration::from_millis(config.debounce_ms),
            ),
            sessions: PaymentSessionCoordinator::new(Arc::clone(&provider)),
            gateway,
            provider,
            forms,
            validator,
            finalizer,
            free,
            submission_id: None,
        }
    }

    // ===== Read surface =====

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn totals(&self) -> OrderTotals {
        self.store.totals()
    }

    pub fn is_valid(&self) -> bool {
        self.store.is_valid()
    }

    pub fn order(&self) -> Option<Order> {
        self.sync.order()
    }

    pub fn sync_error(&self) -> Option<String> {
        self.sync.last_error()
    }

    pub fn payment_session(&self) -> Option<&PaymentSession> {
        self.sessions.session()
    }

    /// Whether the card step applies at the current total
    pub fn requires_payment(&self) -> bool {
        match self.sync.order() {
            Some(order) => order.total_cents > 0,
            None => self.store.totals().total_cents > 0,
        }
    }

    // ===== Selection mutations =====

    pub fn set_ticket_qty(&mut self, ticket_id: Uuid, qty: i32) {
        let outcome = self.store.set_ticket_qty(ticket_id, qty);
        self.after_mutation(outcome);
    }

    pub fn set_offer_qty(&mut self, offer_id: Uuid, qty: i32) {
        let outcome = self.store.set_offer_qty(offer_id, qty);
        self.after_mutation(outcome);
    }

    pub fn set_custom_field(&mut self, item_id: Uuid, unit_index: usize, label: &str, value: &str) {
        let outcome = self.store.set_custom_field(item_id, unit_index, label, value);
        self.after_mutation(outcome);
    }

    pub fn set_email(&mut self, email: &str) {
        self.store.set_email(email);
    }

    pub fn set_name(&mut self, name: &str) {
        self.customer_name = name.to_string();
    }

    /// Validate and apply a discount code. `Ok(false)` means the code was
    /// rejected and any previously applied code was cleared; a transport
    /// failure leaves the applied code as it was.
    pub async fn apply_discount_code(&mut self, code: &str) -> Result<bool, CheckoutError> {
        let validated = self
            .validator
            .validate_code(code, self.context.event_id)
            .await?;

        let outcome = match validated {
            Some(applied) => {
                let outcome = self.store.apply_discount_code(applied);
                self.after_mutation(outcome);
                return Ok(true);
            }
            None => self.store.clear_discount_code(),
        };
        self.after_mutation(outcome);
        Ok(false)
    }

    pub fn clear_discount_code(&mut self) {
        let outcome = self.store.clear_discount_code();
        self.after_mutation(outcome);
    }

    fn after_mutation(&mut self, outcome: MutationOutcome) {
        if !outcome.needs_sync {
            return;
        }
        let Some(order) = self.sync.order() else {
            // No server order yet: the selection is local-only until the
            // buyer leaves the ticket step.
            return;
        };
        let payload = SyncPayload::from_selection(
            order.id,
            self.store.catalog(),
            self.store.selection(),
            self.store.applied_code(),
        );
        self.sync.schedule(payload);
    }

    // ===== Transitions =====

    /// Leave the ticket step: submit the attendee form, create the server
    /// order, and open a payment session if one will be needed. Lands on
    /// the pre-checkout upsell step, or directly on payment when no offer
    /// is eligible.
    pub async fn advance_from_ticket_select(
        &mut self,
        responses: serde_json::Value,
    ) -> Result<CheckoutStep, CheckoutError> {
        self.expect_step(CheckoutStep::TicketSelect)?;
        if !self.store.is_valid() {
            return Err(CheckoutError::Validation(
                "selection or contact details are incomplete".to_string(),
            ));
        }

        // 1. Form submission first, so the order can reference it
        let submission_id = self
            .forms
            .submit_form(self.context.form_id, responses, self.store.email())
            .await?;
        self.submission_id = Some(submission_id);

        // 2. Create the server order from the current selection
        let items = build_replacement_items(self.store.catalog(), self.store.selection());
        let totals = self.store.totals();
        let order = self
            .gateway
            .create_order(OrderDraft {
                event_id: self.context.event_id,
                customer_email: self.store.email().to_string(),
                customer_name: self.customer_name.clone(),
                items,
                discount_cents: totals.discount_cents,
                form_submission_id: Some(submission_id),
            })
            .await?;
        self.sync.set_order(order.clone());

        // 3. Open the session early; failures are held until payment
        self.sessions.ensure_session(Some(&order)).await;

        let has_pre_offers = !self
            .store
            .catalog()
            .eligible_offers(OfferStrategy::PreCheckout, Utc::now())
            .is_empty();
        self.step = if has_pre_offers {
            CheckoutStep::PreCheckoutUpsell
        } else {
            self.enter_payment().await?
        };
        Ok(self.step)
    }

    /// Leave the pre-checkout upsell step for payment
    pub async fn advance_to_payment(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.expect_step(CheckoutStep::PreCheckoutUpsell)?;
        self.step = self.enter_payment().await?;
        Ok(self.step)
    }

    async fn enter_payment(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let order = self.sync.flush().await?;
        self.sessions.ensure_session(order.as_ref()).await;

        // A held session error surfaces here, where the buyer needs it
        if self.requires_payment() && self.sessions.session().is_none() {
            let reason = self
                .sessions
                .last_error()
                .unwrap_or("payment session unavailable")
                .to_string();
            return Err(CheckoutError::Session(reason));
        }
        Ok(CheckoutStep::Payment)
    }

    /// Complete a zero-total order without a card step
    pub async fn complete_free_order(&mut self) -> Result<ConfirmationTarget, CheckoutError> {
        self.expect_step(CheckoutStep::Payment)?;
        let order = self.sync.flush().await?.ok_or_else(|| {
            CheckoutError::InvalidTransition("no order to complete".to_string())
        })?;

        let settled = self.free.complete(&order).await?;
        self.sync.set_order(settled.clone());
        self.step = CheckoutStep::Confirmed;
        Ok(self.finalizer.resolve_redirect(&settled))
    }

    /// Confirm a card payment. On success the refreshed order is Paid and
    /// the flow moves to the post-checkout upsell step when an eligible
    /// offer exists, or straight to confirmation otherwise.
    pub async fn handle_payment_success(
        &mut self,
        payload: serde_json::Value,
    ) -> Result<PaymentOutcome, CheckoutError> {
        self.expect_step(CheckoutStep::Payment)?;
        let order = self.sync.flush().await?.ok_or_else(|| {
            CheckoutError::InvalidTransition("no order to confirm".to_string())
        })?;

        self.provider
            .confirm_payment(order.id, payload)
            .await
            .map_err(|err| {
                tracing::error!(order_id = %order.id, error = %err, "payment confirmation failed");
                CheckoutError::PaymentConfirmation(err.to_string())
            })?;

        // Read the settled order back; totals and status are server truth
        let settled = self
            .gateway
            .get_order(order.id)
            .await?
            .ok_or_else(|| {
                CheckoutError::PaymentConfirmation(format!(
                    "order {} disappeared after confirmation",
                    order.id
                ))
            })?;
        self.sync.set_order(settled.clone());

        let has_post_offers = !self
            .store
            .catalog()
            .eligible_offers(OfferStrategy::PostCheckout, Utc::now())
            .is_empty();
        if has_post_offers {
            self.step = CheckoutStep::PostCheckoutUpsell;
            Ok(PaymentOutcome::PostCheckoutUpsell)
        } else {
            self.step = CheckoutStep::Confirmed;
            Ok(PaymentOutcome::Confirmed(
                self.finalizer.resolve_redirect(&settled),
            ))
        }
    }

    /// Leave the post-checkout upsell step for the confirmation target
    pub async fn finish_post_checkout(&mut self) -> Result<ConfirmationTarget, CheckoutError> {
        self.expect_step(CheckoutStep::PostCheckoutUpsell)?;
        let order = self.sync.order().ok_or_else(|| {
            CheckoutError::InvalidTransition("no order to confirm".to_string())
        })?;
        self.step = CheckoutStep::Confirmed;
        Ok(self.finalizer.resolve_redirect(&order))
    }

    /// Patch the attendee submission after confirmation, e.g. contact
    /// details collected on the confirmation screen.
    pub async fn complete_contact_info(
        &mut self,
        patch: serde_json::Value,
    ) -> Result<(), CheckoutError> {
        let submission_id = self.submission_id.ok_or_else(|| {
            CheckoutError::Validation("no form submission to update".to_string())
        })?;
        self.forms.update_submission(submission_id, patch).await?;
        Ok(())
    }

    /// Drop timers and the held session. The flow is unusable afterwards.
    pub fn teardown(&mut self) {
        self.sync.cancel();
        self.sessions.reset();
    }

    fn expect_step(&self, step: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step != step {
            return Err(CheckoutError::InvalidTransition(format!(
                "expected step {:?}, currently at {:?}",
                step, self.step
            )));
        }
        Ok(())
    }
}
