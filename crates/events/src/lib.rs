//! Studio event bus and change notification.
//!
//! - [`EventBus`]: in-process publish/subscribe hub for generation
//!   lifecycle events, backed by `tokio::sync::broadcast`.
//! - [`StudioEvent`]: the event envelope.
//! - [`ChangeChannel`]: key-scoped storage change notification, with the
//!   synchronous [`InProcessChannel`] implementation.

pub mod bus;
pub mod channel;

pub use bus::{EventBus, StudioEvent};
pub use channel::{ChangeChannel, ChangeHandler, InProcessChannel, StorageChange, Subscription};
