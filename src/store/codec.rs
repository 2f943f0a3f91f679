//! Operation codec
//!
//! Log entry layout:
//!
//! ```text
//! key:   <log_prefix><document key><separator><id>
//! value: <kind><separator><json>
//! ```
//!
//! The json may contain the separator, so the value is split on its first
//! occurrence. The id is the last separator-delimited component of the key.
//! Document keys may not contain the separator at all, which makes the
//! bounded prefix `<log_prefix><key><separator>` select exactly one key's
//! history, in id order.

use super::errors::{StoreError, StoreResult};
use super::op::{Change, OpKind};

/// Namespace prefixes and the field separator.
///
/// Passed to every backend at construction so tests and deployments can vary
/// them independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    /// Prefix of every op-log key
    pub log_prefix: String,
    /// Prefix reserved for materialized document state
    pub data_prefix: String,
    /// Separator between key, id, kind and payload
    pub separator: char,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            log_prefix: "log:".to_string(),
            data_prefix: "data:".to_string(),
            separator: ':',
        }
    }
}

impl Namespaces {
    /// Checks the two namespaces cannot overlap in a shared keyspace
    pub fn validate(&self) -> StoreResult<()> {
        if self.log_prefix.is_empty() || self.data_prefix.is_empty() {
            return Err(StoreError::validation("namespace prefixes must be non-empty"));
        }
        if self.log_prefix.starts_with(&self.data_prefix)
            || self.data_prefix.starts_with(&self.log_prefix)
        {
            return Err(StoreError::validation(format!(
                "namespace prefixes overlap: '{}' and '{}'",
                self.log_prefix, self.data_prefix
            )));
        }
        if self.separator.is_alphanumeric() {
            return Err(StoreError::validation(format!(
                "separator '{}' must not be alphanumeric",
                self.separator
            )));
        }
        Ok(())
    }
}

/// Encodes operations into log entries and decodes them back.
#[derive(Debug, Clone)]
pub struct Codec {
    namespaces: Namespaces,
}

impl Codec {
    pub fn new(namespaces: Namespaces) -> Self {
        Self { namespaces }
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Rejects keys the layout cannot represent unambiguously.
    pub fn validate_key(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::validation("key must not be empty"));
        }
        if key.contains(self.namespaces.separator) {
            return Err(StoreError::validation(format!(
                "key '{}' contains the reserved separator '{}'",
                key, self.namespaces.separator
            )));
        }
        Ok(())
    }

    /// Renders one operation as a `(log key, log value)` pair.
    ///
    /// The key must already have passed [`Codec::validate_key`].
    pub fn encode(&self, key: &str, kind: OpKind, id: &str, json: &str) -> (Vec<u8>, Vec<u8>) {
        debug_assert!(!id.contains(self.namespaces.separator));

        let sep = self.namespaces.separator;
        let log_key = format!("{}{}{}{}", self.namespaces.log_prefix, key, sep, id);
        let log_value = format!("{}{}{}", kind.as_str(), sep, json);
        (log_key.into_bytes(), log_value.into_bytes())
    }

    /// Prefix of every op-log entry
    pub fn log_prefix(&self) -> &[u8] {
        self.namespaces.log_prefix.as_bytes()
    }

    /// Prefix of the materialized data namespace
    pub fn data_prefix(&self) -> &[u8] {
        self.namespaces.data_prefix.as_bytes()
    }

    /// Prefix bounding one document key's history
    pub fn changes_prefix(&self, key: &str) -> Vec<u8> {
        let mut prefix = String::with_capacity(self.namespaces.log_prefix.len() + key.len() + 1);
        prefix.push_str(&self.namespaces.log_prefix);
        prefix.push_str(key);
        prefix.push(self.namespaces.separator);
        prefix.into_bytes()
    }

    /// Decodes a raw log entry.
    ///
    /// Any deviation from the layout is a corrupt entry; nothing is guessed.
    pub fn decode(&self, log_key: &[u8], log_value: &[u8]) -> StoreResult<Change> {
        let sep = self.namespaces.separator;

        let rest = log_key
            .strip_prefix(self.log_prefix())
            .ok_or_else(|| StoreError::corrupt_entry(log_key, "key is outside the log namespace"))?;
        let rest = std::str::from_utf8(rest)
            .map_err(|_| StoreError::corrupt_entry(log_key, "key is not valid UTF-8"))?;
        let (key, id) = rest
            .rsplit_once(sep)
            .ok_or_else(|| StoreError::corrupt_entry(log_key, "key has no id component"))?;
        if key.is_empty() || id.is_empty() {
            return Err(StoreError::corrupt_entry(log_key, "key or id component is empty"));
        }

        let value = std::str::from_utf8(log_value)
            .map_err(|_| StoreError::corrupt_entry(log_key, "value is not valid UTF-8"))?;
        let (op, diff) = value
            .split_once(sep)
            .ok_or_else(|| StoreError::corrupt_entry(log_key, "value has no kind separator"))?;
        if op.is_empty() {
            return Err(StoreError::corrupt_entry(log_key, "value has an empty kind"));
        }

        Ok(Change {
            key: key.to_string(),
            id: id.to_string(),
            op: op.to_string(),
            diff: diff.to_string(),
        })
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Namespaces::default())
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// `None` when no such bound exists (prefix is empty or all `0xff`).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::errors::StoreErrorCode;

    #[test]
    fn test_encode_layout() {
        let codec = Codec::default();
        let (key, value) = codec.encode("chilts", OpKind::Put, "0001", r#"{"name":"Andrew"}"#);
        assert_eq!(key, b"log:chilts:0001");
        assert_eq!(value, br#"put:{"name":"Andrew"}"#);
    }

    #[test]
    fn test_decode_splits_value_on_first_separator() {
        let codec = Codec::default();
        let change = codec
            .decode(b"log:chilts:0001", br#"put:{"url":"http://x:80"}"#)
            .unwrap();
        assert_eq!(change.key, "chilts");
        assert_eq!(change.id, "0001");
        assert_eq!(change.op, "put");
        assert_eq!(change.diff, r#"{"url":"http://x:80"}"#);
    }

    #[test]
    fn test_decode_rejects_malformed_entries() {
        let codec = Codec::default();
        let cases: [(&[u8], &[u8]); 5] = [
            (b"data:chilts:0001", b"put:{}"),
            (b"log:chilts", b"put:{}"),
            (b"log::0001", b"put:{}"),
            (b"log:chilts:0001", b"put{}"),
            (b"log:chilts:0001", b":{}"),
        ];
        for (key, value) in cases {
            let err = codec.decode(key, value).unwrap_err();
            assert_eq!(err.code(), StoreErrorCode::CorruptEntry);
        }
    }

    #[test]
    fn test_validate_key() {
        let codec = Codec::default();
        assert!(codec.validate_key("chilts").is_ok());
        assert_eq!(
            codec.validate_key("").unwrap_err().code(),
            StoreErrorCode::Validation
        );
        assert_eq!(
            codec.validate_key("a:b").unwrap_err().code(),
            StoreErrorCode::Validation
        );
    }

    #[test]
    fn test_changes_prefix_does_not_match_longer_keys() {
        let codec = Codec::default();
        let prefix = codec.changes_prefix("ab");
        let (other, _) = codec.encode("abc", OpKind::Put, "0001", "{}");
        let (own, _) = codec.encode("ab", OpKind::Put, "0001", "{}");
        assert!(!other.starts_with(&prefix));
        assert!(own.starts_with(&prefix));
    }

    #[test]
    fn test_custom_namespaces() {
        let codec = Codec::new(Namespaces {
            log_prefix: "L|".to_string(),
            data_prefix: "D|".to_string(),
            separator: '|',
        });
        let (key, value) = codec.encode("chilts", OpKind::Del, "0002", "{}");
        assert_eq!(key, b"L|chilts|0002");
        assert_eq!(value, b"del|{}");
        assert_eq!(codec.decode(&key, &value).unwrap().op, "del");
    }

    #[test]
    fn test_overlapping_namespaces_rejected() {
        let ns = Namespaces {
            log_prefix: "log:".to_string(),
            data_prefix: "log:data:".to_string(),
            separator: ':',
        };
        assert!(ns.validate().is_err());
        assert!(Namespaces::default().validate().is_ok());
    }

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound(b"log:"), Some(b"log;".to_vec()));
        assert_eq!(prefix_upper_bound(&[0x61, 0xff]), Some(vec![0x62]));
        assert_eq!(prefix_upper_bound(&[0xff, 0xff]), None);
        assert_eq!(prefix_upper_bound(b""), None);
    }
}
