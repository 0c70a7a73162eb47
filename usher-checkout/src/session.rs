use std::sync::Arc;
use usher_core::payment::{PaymentProvider, PaymentSession};
use usher_order::Order;

/// Guards the at-most-one-session-per-order invariant. The provider
/// rejects a second session for the same order id, so this coordinator is
/// the only place sessions are created, and it never asks twice.
pub struct PaymentSessionCoordinator {
    provider: Arc<dyn PaymentProvider>,
    session: Option<PaymentSession>,
    last_error: Option<String>,
}

impl PaymentSessionCoordinator {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            provider,
            session: None,
            last_error: None,
        }
    }

    pub fn session(&self) -> Option<&PaymentSession> {
        self.session.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Create the session if the order needs one and none exists yet.
    /// Creation failure is deliberately not surfaced here: the buyer may
    /// still be on an earlier step, so the error is held and shown only
    /// when the payment step actually needs the session.
    pub async fn ensure_session(&mut self, order: Option<&Order>) -> Option<&PaymentSession> {
        if self.session.is_some() {
            return self.session.as_ref();
        }

        let order = order?;
        if order.is_paid() || order.total_cents <= 0 {
            return None;
        }

        match self.provider.create_session(order.id).await {
            Ok(session) => {
                self.session = Some(session);
                self.last_error = None;
            }
            Err(err) => {
                tracing::debug!(order_id = %order.id, error = %err, "payment session deferred");
                self.last_error = Some(err.to_string());
            }
        }
        self.session.as_ref()
    }

    /// Forget the held session, e.g. when the flow is torn down
    pub fn reset(&mut self) {
        self.session = None;
        self.last_error = None;
    }
}
