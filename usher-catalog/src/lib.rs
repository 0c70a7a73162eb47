pub mod item;
pub mod pricing;
pub mod selection;
pub mod source;

pub use item::{
    Catalog, FieldSpec, FieldType, OfferDiscount, OfferStrategy, QuantityRule, SalesWindow,
    Ticket, UpsellingOffer,
};
pub use pricing::{OrderTotals, PricingEngine};
pub use selection::{Selection, UnitAnswers};
pub use source::{CatalogError, CatalogSource, StaticCatalogSource};
