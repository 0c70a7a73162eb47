use crate::error::CheckoutError;
use serde::Serialize;
use std::sync::Arc;
use url::Url;
use usher_core::money::format_cents;
use usher_core::payment::PaymentProvider;
use usher_order::{Order, OrderGateway};
use uuid::Uuid;

/// Where a finished checkout may send the buyer. Override beats the
/// form-configured URL, which beats the engine's own confirmation path.
#[derive(Debug, Clone, Default)]
pub struct RedirectConfig {
    pub override_url: Option<String>,
    pub form_url: Option<String>,
    pub default_path: String,
    /// When embedded in a host page, navigation is delegated to the host
    /// via a frame message instead of performed directly.
    pub embedded: bool,
}

/// Structured message handed to the host page in embedded mode
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameMessage {
    pub kind: String,
    pub order_id: Uuid,
    pub total: String,
    pub redirect_url: String,
}

/// The resolved end state of a checkout: a URL, and in embedded mode the
/// message the host uses to perform the navigation itself.
#[derive(Debug, Clone)]
pub struct ConfirmationTarget {
    pub url: String,
    pub frame_message: Option<FrameMessage>,
}

/// Resolves the post-payment destination for a confirmed order
pub struct PostPaymentFinalizer {
    redirect: RedirectConfig,
}

impl PostPaymentFinalizer {
    pub fn new(redirect: RedirectConfig) -> Self {
        Self { redirect }
    }

    pub fn resolve_redirect(&self, order: &Order) -> ConfirmationTarget {
        let base = self
            .redirect
            .override_url
            .as_deref()
            .or(self.redirect.form_url.as_deref())
            .unwrap_or(&self.redirect.default_path);

        let url = with_order_params(base, order);

        let frame_message = self.redirect.embedded.then(|| FrameMessage {
            kind: "CHECKOUT_CONFIRMED".to_string(),
            order_id: order.id,
            total: format_cents(order.total_cents),
            redirect_url: url.clone(),
        });

        ConfirmationTarget { url, frame_message }
    }
}

/// Append the order reference to the destination so the landing page can
/// show a receipt. Relative paths get a hand-assembled query string since
/// they have no base to parse against.
fn with_order_params(base: &str, order: &Order) -> String {
    let pairs = [
        ("order", order.id.to_string()),
        ("email", order.customer_email.clone()),
        ("total", format_cents(order.total_cents)),
    ];

    match Url::parse(base) {
        Ok(mut parsed) => {
            {
                let mut query = parsed.query_pairs_mut();
                for (key, value) in &pairs {
                    query.append_pair(key, value);
                }
            }
            parsed.to_string()
        }
        Err(_) => {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &pairs {
                serializer.append_pair(key, value);
            }
            let query = serializer.finish();
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}{query}")
        }
    }
}

/// Completes zero-total orders without a card step. Confirmation and the
/// status read-back are one unit: the order is only reported complete once
/// the refetched copy shows it settled.
pub struct FreeOrderCompleter {
    provider: Arc<dyn PaymentProvider>,
    gateway: Arc<dyn OrderGateway>,
}

impl FreeOrderCompleter {
    pub fn new(provider: Arc<dyn PaymentProvider>, gateway: Arc<dyn OrderGateway>) -> Self {
        Self { provider, gateway }
    }

    pub async fn complete(&self, order: &Order) -> Result<Order, CheckoutError> {
        if order.total_cents > 0 {
            return Err(CheckoutError::Validation(format!(
                "order {} has a positive total and requires payment",
                order.id
            )));
        }

        self.provider
            .confirm_free_payment(order.id)
            .await
            .map_err(|err| {
                tracing::error!(order_id = %order.id, error = %err, "free order confirmation failed");
                CheckoutError::FreeOrderCompletion(err.to_string())
            })?;

        match self.gateway.get_order(order.id).await? {
            Some(updated) => Ok(updated),
            None => Err(CheckoutError::FreeOrderCompletion(format!(
                "order {} disappeared after confirmation",
                order.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::Ordering;
    use usher_core::payment::{MockPaymentProvider, PaymentError, PaymentSession, ProviderConfig};
    use usher_order::{InMemoryOrderGateway, OrderDraft, OrderStatus};

    fn order(total_cents: i64) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            subtotal_cents: total_cents,
            discount_cents: 0,
            total_cents,
            items: Vec::new(),
            customer_email: "buyer@example.com".to_string(),
            customer_name: "Buyer".to_string(),
            form_submission_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_redirect_precedence() {
        let order = order(2500);

        let finalizer = PostPaymentFinalizer::new(RedirectConfig {
            override_url: Some("https://host.example/thanks".to_string()),
            form_url: Some("https://form.example/done".to_string()),
            default_path: "/checkout/confirmed".to_string(),
            embedded: false,
        });
        assert!(finalizer
            .resolve_redirect(&order)
            .url
            .starts_with("https://host.example/thanks?"));

        let finalizer = PostPaymentFinalizer::new(RedirectConfig {
            override_url: None,
            form_url: Some("https://form.example/done".to_string()),
            default_path: "/checkout/confirmed".to_string(),
            embedded: false,
        });
        assert!(finalizer
            .resolve_redirect(&order)
            .url
            .starts_with("https://form.example/done?"));

        let finalizer = PostPaymentFinalizer::new(RedirectConfig {
            override_url: None,
            form_url: None,
            default_path: "/checkout/confirmed".to_string(),
            embedded: false,
        });
        assert!(finalizer
            .resolve_redirect(&order)
            .url
            .starts_with("/checkout/confirmed?"));
    }

    #[test]
    fn test_redirect_carries_order_params() {
        let order = order(2500);
        let finalizer = PostPaymentFinalizer::new(RedirectConfig {
            override_url: Some("https://host.example/thanks?ref=email".to_string()),
            form_url: None,
            default_path: "/checkout/confirmed".to_string(),
            embedded: false,
        });

        let target = finalizer.resolve_redirect(&order);
        let parsed = Url::parse(&target.url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("ref".to_string(), "email".to_string())));
        assert!(pairs.contains(&("order".to_string(), order.id.to_string())));
        assert!(pairs.contains(&("email".to_string(), "buyer@example.com".to_string())));
        assert!(pairs.contains(&("total".to_string(), "25.00".to_string())));
    }

    #[test]
    fn test_embedded_mode_emits_frame_message() {
        let order = order(2500);
        let finalizer = PostPaymentFinalizer::new(RedirectConfig {
            override_url: None,
            form_url: None,
            default_path: "/checkout/confirmed".to_string(),
            embedded: true,
        });

        let target = finalizer.resolve_redirect(&order);
        let message = target.frame_message.expect("embedded target has a message");
        assert_eq!(message.kind, "CHECKOUT_CONFIRMED");
        assert_eq!(message.order_id, order.id);
        assert_eq!(message.total, "25.00");
        assert_eq!(message.redirect_url, target.url);
    }

    /// Provider double that settles the order in the gateway on
    /// confirmation, like the real backend does.
    struct SettlingProvider {
        inner: MockPaymentProvider,
        gateway: Arc<InMemoryOrderGateway>,
    }

    #[async_trait]
    impl PaymentProvider for SettlingProvider {
        async fn get_providers(&self) -> Result<ProviderConfig, PaymentError> {
            self.inner.get_providers().await
        }

        async fn create_session(&self, order_id: Uuid) -> Result<PaymentSession, PaymentError> {
            self.inner.create_session(order_id).await
        }

        async fn confirm_payment(
            &self,
            order_id: Uuid,
            payload: serde_json::Value,
        ) -> Result<(), PaymentError> {
            self.inner.confirm_payment(order_id, payload).await?;
            self.gateway.set_status(order_id, OrderStatus::Paid);
            Ok(())
        }

        async fn confirm_free_payment(&self, order_id: Uuid) -> Result<(), PaymentError> {
            self.inner.confirm_free_payment(order_id).await?;
            self.gateway.set_status(order_id, OrderStatus::Paid);
            Ok(())
        }
    }

    async fn seeded_free_order(gateway: &InMemoryOrderGateway) -> Order {
        gateway
            .create_order(OrderDraft {
                event_id: Uuid::new_v4(),
                customer_email: "buyer@example.com".to_string(),
                customer_name: "Buyer".to_string(),
                items: Vec::new(),
                discount_cents: 0,
                form_submission_id: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_free_order_completion_settles_order() {
        let gateway = Arc::new(InMemoryOrderGateway::new());
        let provider = Arc::new(SettlingProvider {
            inner: MockPaymentProvider::new(),
            gateway: gateway.clone(),
        });
        let order = seeded_free_order(&gateway).await;

        let completer = FreeOrderCompleter::new(provider.clone(), gateway.clone());
        let settled = completer.complete(&order).await.unwrap();

        assert_eq!(settled.status, OrderStatus::Paid);
        assert_eq!(provider.inner.confirmed_orders(), vec![order.id]);
    }

    #[tokio::test]
    async fn test_free_order_completion_rejects_positive_total() {
        let gateway = Arc::new(InMemoryOrderGateway::new());
        let provider = Arc::new(MockPaymentProvider::new());
        let completer =
            FreeOrderCompleter::new(provider.clone(), gateway.clone());

        let result = completer.complete(&order(2500)).await;
        assert!(matches!(result, Err(CheckoutError::Validation(_))));
        assert!(provider.confirmed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_free_order_completion_failure_leaves_order_pending() {
        let gateway = Arc::new(InMemoryOrderGateway::new());
        let inner = MockPaymentProvider::new();
        inner.fail_confirmations.store(true, Ordering::SeqCst);
        let provider = Arc::new(SettlingProvider {
            inner,
            gateway: gateway.clone(),
        });
        let order = seeded_free_order(&gateway).await;

        let completer = FreeOrderCompleter::new(provider, gateway.clone());
        let result = completer.complete(&order).await;

        assert!(matches!(result, Err(CheckoutError::FreeOrderCompletion(_))));
        let stored = gateway.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }
}
