//! Observation scopes
//!
//! A scope brackets one unit of work (a dump, a signature, serving):
//! `<NAME>_BEGIN` on creation, then exactly one of `_COMPLETE`, `_FAILED`,
//! or `_INCOMPLETE` if the scope is dropped without being closed.

use std::time::Instant;

use super::logger::{Level, Logger};

pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    closed: bool,
}

impl ObservationScope {
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, Vec::new())
    }

    pub fn with_fields(name: &'static str, fields: Vec<(&'static str, String)>) -> Self {
        let scope = Self {
            name,
            fields,
            started: Instant::now(),
            closed: false,
        };
        scope.emit(Level::Info, "BEGIN", &[]);
        scope
    }

    pub fn complete(self) {
        self.complete_with(&[]);
    }

    pub fn complete_with(mut self, extra: &[(&'static str, String)]) {
        self.closed = true;
        self.emit(Level::Info, "COMPLETE", extra);
    }

    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        self.emit(Level::Error, "FAILED", &[("reason", reason.to_string())]);
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    fn emit(&self, level: Level, suffix: &str, extra: &[(&'static str, String)]) {
        let event = format!("{}_{}", self.name, suffix);
        let elapsed = self.elapsed_ms().to_string();

        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .chain(extra.iter())
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        if suffix != "BEGIN" {
            fields.push(("elapsed_ms", &elapsed));
        }

        Logger::log(level, &event, &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.closed {
            self.emit(Level::Warn, "INCOMPLETE", &[]);
        }
    }
}
