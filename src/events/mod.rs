//! Engine notifications
//!
//! An explicit publish-subscribe object: create one [`EventBus`], pass it by
//! reference to the engine, and subscribe wherever progress is displayed.

mod bus;
mod event;

pub use bus::{EventBus, EventSubscriber};
pub use event::EngineEvent;
