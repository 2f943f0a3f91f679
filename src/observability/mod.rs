//! Logging for the server and the CLI
//!
//! The store itself never logs; failures travel up as `StoreError` and are
//! logged by whoever handles them.
//!
//! ```ignore
//! use modb::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::StoreOpened, &[("datastore", "redb")]);
//!
//! let scope = ObservationScope::new("DUMP");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Level, Logger};
pub use scope::ObservationScope;

/// Logs `event` at its own level.
pub fn log_event(event: Event) {
    Logger::log(event.level(), event.as_str(), &[]);
}

pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.level(), event.as_str(), fields);
}
