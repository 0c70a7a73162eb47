pub mod config;
pub mod error;
pub mod finalize;
pub mod machine;
pub mod selection;
pub mod session;
pub mod sync;
pub mod validity;

pub use config::CheckoutConfig;
pub use error::CheckoutError;
pub use finalize::{ConfirmationTarget, FrameMessage, FreeOrderCompleter, PostPaymentFinalizer, RedirectConfig};
pub use machine::{CheckoutContext, CheckoutFlow, CheckoutStep, PaymentOutcome};
pub use selection::{MutationOutcome, SelectionStore};
pub use session::PaymentSessionCoordinator;
pub use sync::{build_replacement_items, OrderSyncController, SyncPayload};
