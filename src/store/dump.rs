//! Raw namespace dumps

use std::fmt;
use std::str::FromStr;

use super::contract::{EntryIter, LogStore};
use super::errors::StoreResult;

/// One of the two key namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Log,
    Data,
}

impl Namespace {
    /// Heading used when the namespace is printed
    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Log => "Log",
            Namespace::Data => "Data",
        }
    }

    pub fn scan<'a>(&self, store: &'a dyn LogStore) -> StoreResult<EntryIter<'a>> {
        match self {
            Namespace::Log => store.iterate_log(),
            Namespace::Data => store.iterate_data(),
        }
    }
}

/// What a dump covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpTarget {
    #[default]
    All,
    Log,
    Data,
}

impl DumpTarget {
    /// Namespaces in the order they are dumped
    pub fn namespaces(&self) -> &'static [Namespace] {
        match self {
            DumpTarget::All => &[Namespace::Log, Namespace::Data],
            DumpTarget::Log => &[Namespace::Log],
            DumpTarget::Data => &[Namespace::Data],
        }
    }
}

impl fmt::Display for DumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DumpTarget::All => "all",
            DumpTarget::Log => "log",
            DumpTarget::Data => "data",
        })
    }
}

impl FromStr for DumpTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(DumpTarget::All),
            "log" => Ok(DumpTarget::Log),
            "data" => Ok(DumpTarget::Data),
            _ => Err("unknown target".to_string()),
        }
    }
}
