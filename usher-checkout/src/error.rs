use usher_core::CoreError;
use usher_order::OrderError;

/// Error taxonomy for the checkout flow. Validation errors are local and
/// block transitions without any network call; sync errors are recoverable
/// banners; confirmation errors are fatal to the attempt but retryable and
/// never leave the order in an ambiguous status.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order sync failed: {0}")]
    Sync(String),

    #[error("Payment session unavailable: {0}")]
    Session(String),

    #[error("Payment confirmation failed: {0}")]
    PaymentConfirmation(String),

    #[error("Free order completion failed: {0}")]
    FreeOrderCompletion(String),

    #[error("Step transition not allowed: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
