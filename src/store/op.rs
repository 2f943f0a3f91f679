//! Operation kinds and the decoded change record

use std::fmt;
use std::str::FromStr;

/// The kind of mutation recorded in a log entry.
///
/// The tag is what the log value starts with; nothing else in the encoding
/// distinguishes one kind from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Full replacement of the document
    Put,
    /// Bump each listed field by one
    Inc,
    /// Add an integer delta to each listed field
    IncBy,
    /// Tombstone; the payload is advisory only
    Del,
}

impl OpKind {
    /// Returns the tag stored in the log value
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Put => "put",
            OpKind::Inc => "inc",
            OpKind::IncBy => "incby",
            OpKind::Del => "del",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "put" => Ok(OpKind::Put),
            "inc" => Ok(OpKind::Inc),
            "incby" => Ok(OpKind::IncBy),
            "del" => Ok(OpKind::Del),
            other => Err(format!("unknown operation kind '{}'", other)),
        }
    }
}

/// One decoded log entry for a document key.
///
/// `op` is kept as the literal tag so that kinds added later still decode;
/// `diff` is the payload text exactly as it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub key: String,
    pub id: String,
    pub op: String,
    pub diff: String,
}

impl Change {
    /// Parses `op` into a known kind, if it is one
    pub fn kind(&self) -> Option<OpKind> {
        self.op.parse().ok()
    }
}
