mod api;
mod snapshot;
mod store;

pub mod error;
pub use api::ChainStateLookup;
pub use snapshot::{BlockReference, StateSnapshot, compute_state_root};
pub use store::Store;
