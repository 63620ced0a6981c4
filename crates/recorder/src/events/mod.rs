//! Category routing for host notifications.
//!
//! Every [`world_core::EventKind`] belongs to exactly one [`Category`]; the
//! [`HostAdapter`] decodes wire lines and filters notifications down to the
//! subscribed categories before they reach the extractor tables.

mod adapter;
mod category;

pub use adapter::{AdapterError, HostAdapter, Route, SkipReason};
pub use category::Category;
