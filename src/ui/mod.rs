//! Session-aware UI
//!
//! - `element`: element tree and HTML rendering
//! - `provider`: session context provider
//! - `source`: session sources providers subscribe to

mod element;
mod provider;
mod source;

pub use element::{Component, Element};
pub use provider::{MountedProvider, SessionContext, SessionContextProvider};
pub use source::{SessionHub, SessionSource, SubscriptionId};
