//! Observable events
//!
//! Events are explicit and typed; their names are stable strings.

use std::fmt;

use super::logger::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    StartupBegin,
    StartupComplete,
    ShutdownStart,
    ShutdownComplete,
    ConfigLoaded,

    // Store
    StoreOpened,
    StoreClosed,
    StoreWriteFailed,
    StoreReadFailed,
    /// A log entry failed to decode
    StoreCorruption,

    // Server
    Serving,
    ConnectionAccepted,
    ConnectionClosed,
    ConnectionFailed,
    CommandRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StartupBegin => "MODB_STARTUP_BEGIN",
            Event::StartupComplete => "MODB_STARTUP_COMPLETE",
            Event::ShutdownStart => "MODB_SHUTDOWN_BEGIN",
            Event::ShutdownComplete => "MODB_SHUTDOWN_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::StoreOpened => "STORE_OPENED",
            Event::StoreClosed => "STORE_CLOSED",
            Event::StoreWriteFailed => "STORE_WRITE_FAILED",
            Event::StoreReadFailed => "STORE_READ_FAILED",
            Event::StoreCorruption => "STORE_CORRUPTION",

            Event::Serving => "MODB_SERVING",
            Event::ConnectionAccepted => "CONNECTION_ACCEPTED",
            Event::ConnectionClosed => "CONNECTION_CLOSED",
            Event::ConnectionFailed => "CONNECTION_FAILED",
            Event::CommandRejected => "COMMAND_REJECTED",
        }
    }

    /// Level the event is logged at
    pub fn level(&self) -> Level {
        match self {
            Event::StoreCorruption => Level::Fatal,
            Event::StoreWriteFailed | Event::StoreReadFailed | Event::ConnectionFailed => {
                Level::Error
            }
            Event::CommandRejected => Level::Warn,
            Event::ConnectionAccepted | Event::ConnectionClosed => Level::Trace,
            _ => Level::Info,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.level() == Level::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
