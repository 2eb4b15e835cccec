pub mod models;
pub mod negotiation;

pub use models::{Offer, OfferStatus};
pub use negotiation::{NegotiationEngine, OfferError};
