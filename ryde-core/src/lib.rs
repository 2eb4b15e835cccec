pub mod store;

pub use store::{Auth, AuthError, EntityKind, EntityStore, Record, Sort, StoreError};
