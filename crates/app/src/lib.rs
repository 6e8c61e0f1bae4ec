//! Editor rich presence companion.

pub mod events;
pub mod host;
pub mod session;

pub use events::{IdleTimer, Throttle, ThrottleConfig, ThrottleDecision};
pub use session::{Flow, PresenceSession};
