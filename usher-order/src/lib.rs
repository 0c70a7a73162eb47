pub mod gateway;
pub mod models;

pub use gateway::{InMemoryOrderGateway, OrderError, OrderGateway};
pub use models::{Order, OrderDraft, OrderItem, OrderStatus, OrderUpdate};
