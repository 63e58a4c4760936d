//! Outbound signal plumbing for the dispatch engine.
//!
//! The engine decides *what* to tell the outside world; this crate carries
//! it there without ever feeding back into dispatch state:
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`OutboundEvent`]: the envelope every signal travels in.
//! - [`NotificationIntent`] and [`EscalationSignal`]: the two signal kinds
//!   handed to external collaborators.
//! - [`EventPersistence`]: background service writing every signal to
//!   `dispatch_events`.
//! - [`SignalForwarder`]: background service handing signals to the
//!   configured webhooks through [`WebhookDelivery`].

pub mod bus;
pub mod delivery;
pub mod forwarder;
pub mod persistence;
pub mod signals;

pub use bus::{EventBus, OutboundEvent};
pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use forwarder::{ForwarderConfig, SignalForwarder};
pub use persistence::EventPersistence;
pub use signals::{EscalationSignal, NotificationIntent};
