//! Topic-based event bus for runtime events.
//!
//! Every outbound game notification is published to exactly one topic, and
//! consumers subscribe only to the topics they need.

mod bus;
mod types;

pub use bus::{EventBus, Topic};
pub use types::{Event, FactoryReport};
