//! Key-value sets
//!
//! An ordered column name → value mapping identifying a row, typically by its
//! primary key. The key hash is computed lazily and cached.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::OnceLock;
use indexmap::IndexMap;

use crate::crypto::{HashComputer, KeyHash};
use crate::error::{CoreError, Result};
use super::column::Column;
use super::value::Value;

/// Ordered set of column values identifying a row
#[derive(Debug, Clone, Default)]
pub struct KeyValues {
    entries: IndexMap<String, Value>,
    hash: OnceLock<(HashComputer, KeyHash)>,
}

impl PartialEq for KeyValues {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl KeyValues {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value. Names compare case-insensitively and a
    /// replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        self.hash = OnceLock::new();
        match self.entries.keys().position(|k| k.eq_ignore_ascii_case(&name)) {
            Some(pos) => {
                if let Some((_, slot)) = self.entries.get_index_mut(pos) {
                    *slot = value;
                }
            }
            None => {
                self.entries.insert(name, value);
            }
        }
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Column names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether every value is null
    pub fn all_null(&self) -> bool {
        self.entries.values().all(Value::is_null)
    }

    /// Key hash under `computer`. Cached for the first computer asked.
    pub fn hash(&self, computer: &HashComputer) -> KeyHash {
        if let Some((cached_for, hash)) = self.hash.get() {
            if cached_for == computer {
                return hash.clone();
            }
            return computer.compute(self.iter());
        }
        let hash = computer.compute(self.iter());
        let _ = self.hash.set((*computer, hash.clone()));
        hash
    }

    /// Compare against a row's values using semantic-type equality.
    ///
    /// Key values are coerced to the column type before comparison, so a
    /// textual key matches a numeric column. A key value that cannot be
    /// coerced never matches.
    pub fn matches(&self, columns: &[Column], values: &[Value]) -> Result<bool> {
        for (name, expected) in self.iter() {
            let pos = columns
                .iter()
                .position(|c| c.matches_name(name))
                .ok_or_else(|| CoreError::UnknownColumn(name.to_string()))?;
            let actual = values
                .get(pos)
                .ok_or_else(|| CoreError::ShapeError(format!("row has no value for column {}", name)))?;
            let expected = match columns[pos].column_type().coerce(expected.clone()) {
                Ok(v) => v,
                Err(_) => return Ok(false),
            };
            if !expected.semantic_eq(actual) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Display for KeyValues {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match value {
                Value::Null => write!(f, "{}=NULL", name)?,
                Value::Text(_) | Value::Json(_) | Value::Uuid(_) | Value::Timestamp(_) => {
                    write!(f, "{}='{}'", name, value)?
                }
                _ => write!(f, "{}={}", name, value)?,
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for KeyValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut kv = KeyValues::new();
        for (k, v) in iter {
            kv.insert(k, v);
        }
        kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashAlgorithm;
    use crate::models::ColumnType;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("ID", ColumnType::BigInt),
            Column::new("NAME", ColumnType::VarChar(20)),
        ]
    }

    #[test]
    fn test_insert_replaces_case_insensitively() {
        let mut kv = KeyValues::new().with("ID", 1).with("NAME", "a");
        kv.insert("id", 2);
        assert_eq!(kv.len(), 2);
        assert_eq!(kv.get("Id"), Some(&Value::Integer(2)));
        assert_eq!(kv.names().collect::<Vec<_>>(), vec!["ID", "NAME"]);
    }

    #[test]
    fn test_display() {
        let kv = KeyValues::new().with("ID", 1).with("NAME", "a").with("NOTE", Value::Null);
        assert_eq!(kv.to_string(), "ID=1, NAME='a', NOTE=NULL");
    }

    #[test]
    fn test_hash_is_cached_and_reset() {
        let computer = HashComputer::new(HashAlgorithm::Sha256, true);
        let mut kv = KeyValues::new().with("ID", 1);
        let first = kv.hash(&computer);
        assert_eq!(first, kv.hash(&computer));

        kv.insert("ID", 2);
        assert_ne!(first, kv.hash(&computer));

        let other = HashComputer::new(HashAlgorithm::Blake2s, true);
        assert_ne!(kv.hash(&other), kv.hash(&computer));
    }

    #[test]
    fn test_matches_with_semantic_equality() {
        let cols = columns();
        let row = vec![Value::BigInt(1), Value::Text("abc".into())];

        assert!(KeyValues::new().with("ID", 1).matches(&cols, &row).unwrap());
        assert!(KeyValues::new().with("id", "1").matches(&cols, &row).unwrap());
        assert!(KeyValues::new().with("NAME", "abc  ").matches(&cols, &row).unwrap());
        assert!(!KeyValues::new().with("ID", 2).matches(&cols, &row).unwrap());
        assert!(!KeyValues::new().with("ID", "x").matches(&cols, &row).unwrap());
    }

    #[test]
    fn test_matches_unknown_column() {
        let err = KeyValues::new()
            .with("MISSING", 1)
            .matches(&columns(), &[Value::BigInt(1), Value::Null])
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownColumn(_)));
    }
}
