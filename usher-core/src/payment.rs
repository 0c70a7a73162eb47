use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// A card-payment session created by the provider, keyed by order id.
/// The provider forbids a second session for the same order id, so one
/// session lives for the whole order lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub session_token: String,
    pub pre_session_data: serde_json::Value,
}

/// Provider configuration handed to the payment UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    pub publishable_key: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Session rejected by provider: {0}")]
    SessionRejected(String),

    #[error("Payment confirmation failed: {0}")]
    ConfirmationFailed(String),

    #[error("Provider transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch provider configuration for the payment UI
    async fn get_providers(&self) -> Result<ProviderConfig, PaymentError>;

    /// Create a payment session keyed by the order id
    async fn create_session(&self, order_id: Uuid) -> Result<PaymentSession, PaymentError>;

    /// Confirm a card payment. Must succeed before the order may be
    /// treated as paid anywhere.
    async fn confirm_payment(
        &self,
        order_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<(), PaymentError>;

    /// Confirm a zero-amount order without a card step
    async fn confirm_free_payment(&self, order_id: Uuid) -> Result<(), PaymentError>;
}

/// In-memory provider used by tests and local development.
pub struct MockPaymentProvider {
    pub sessions_created: AtomicUsize,
    pub fail_sessions: AtomicBool,
    pub fail_confirmations: AtomicBool,
    confirmed: Mutex<Vec<Uuid>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            sessions_created: AtomicUsize::new(0),
            fail_sessions: AtomicBool::new(false),
            fail_confirmations: AtomicBool::new(false),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn confirmed_orders(&self) -> Vec<Uuid> {
        self.confirmed.lock().expect("mock provider lock").clone()
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_providers(&self) -> Result<ProviderConfig, PaymentError> {
        Ok(ProviderConfig {
            provider: "mock".to_string(),
            publishable_key: Some("mock_pk_123".to_string()),
            metadata: serde_json::json!({}),
        })
    }

    async fn create_session(&self, order_id: Uuid) -> Result<PaymentSession, PaymentError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(PaymentError::SessionRejected(
                "simulated provider rejection".to_string(),
            ));
        }
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentSession {
            session_token: format!("mock_cs_{}", order_id.simple()),
            pre_session_data: serde_json::json!({ "order_id": order_id }),
        })
    }

    async fn confirm_payment(
        &self,
        order_id: Uuid,
        _payload: serde_json::Value,
    ) -> Result<(), PaymentError> {
        if self.fail_confirmations.load(Ordering::SeqCst) {
            return Err(PaymentError::ConfirmationFailed(
                "simulated gateway failure".to_string(),
            ));
        }
        self.confirmed
            .lock()
            .expect("mock provider lock")
            .push(order_id);
        Ok(())
    }

    async fn confirm_free_payment(&self, order_id: Uuid) -> Result<(), PaymentError> {
        if self.fail_confirmations.load(Ordering::SeqCst) {
            return Err(PaymentError::ConfirmationFailed(
                "simulated gateway failure".to_string(),
            ));
        }
        self.confirmed
            .lock()
            .expect("mock provider lock")
            .push(order_id);
        Ok(())
    }
}
