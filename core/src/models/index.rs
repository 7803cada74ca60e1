//! Secondary indices
//!
//! An index covers an ordered subset of a table's columns. Unique indices
//! (the primary index included) keep a multiset of key hashes, one entry
//! per row, and use it to reject duplicates. Non-unique indices keep no
//! hashes at all.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

use crate::crypto::{HashComputer, KeyHash};
use crate::error::{CoreError, Result};
use super::column::Column;
use super::key_values::KeyValues;
use super::value::Value;

/// Kind of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// The table's primary key
    Primary,

    /// Rejects duplicate keys
    Unique,

    /// Lookup only
    NonUnique,
}

impl IndexKind {
    /// Whether the kind enforces uniqueness
    pub fn is_unique(&self) -> bool {
        !matches!(self, IndexKind::NonUnique)
    }
}

/// Declarative index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name
    pub name: String,

    /// Covered column names, in key order
    pub columns: Vec<String>,

    /// Index kind
    pub kind: IndexKind,
}

impl IndexDef {
    /// Create a definition
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>, kind: IndexKind) -> Self {
        IndexDef {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind,
        }
    }
}

/// Hash transition of one row inside one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChange {
    /// Hash before the change
    pub old: KeyHash,

    /// Hash after the change
    pub new: KeyHash,
}

/// Index over a subset of a table's columns
#[derive(Debug, Clone)]
pub struct Index {
    name: String,
    kind: IndexKind,
    columns: Vec<usize>,
    hashes: HashMap<KeyHash, usize>,
    computer: HashComputer,
}

impl Index {
    /// Resolve a definition against the table's columns
    pub fn new(def: &IndexDef, columns: &[Column], computer: HashComputer) -> Result<Self> {
        let positions = def
            .columns
            .iter()
            .map(|name| {
                columns
                    .iter()
                    .position(|c| c.matches_name(name))
                    .ok_or_else(|| CoreError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Index {
            name: def.name.clone(),
            kind: def.kind,
            columns: positions,
            hashes: HashMap::new(),
            computer,
        })
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index kind
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Whether duplicates are rejected
    pub fn is_unique(&self) -> bool {
        self.kind.is_unique()
    }

    /// Covered column positions, in key order
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Whether the index covers a column position
    pub fn covers(&self, column: usize) -> bool {
        self.columns.contains(&column)
    }

    /// Hash computer used for this index
    pub fn computer(&self) -> &HashComputer {
        &self.computer
    }

    /// Number of tracked hashes, duplicates included
    pub fn len(&self) -> usize {
        self.hashes.values().sum()
    }

    /// Whether no hash is tracked
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Whether a hash is tracked
    pub fn contains(&self, hash: &KeyHash) -> bool {
        self.hashes.contains_key(hash)
    }

    /// Covered values of a row as a key-value set
    pub fn key_values(&self, columns: &[Column], values: &[Value]) -> KeyValues {
        self.columns
            .iter()
            .map(|&c| (columns[c].name().to_string(), values[c].clone()))
            .collect()
    }

    /// Key hash of a row.
    ///
    /// A row still carrying the placeholder of an auto-generated key column
    /// hashes to EMPTY, since its real key is unknown until the store
    /// assigns one.
    pub fn hash_of(&self, columns: &[Column], values: &[Value]) -> KeyHash {
        self.hash_pairs(columns, |c| &values[c])
    }

    /// Key hash of a row with one column's value substituted
    pub fn hash_with_substitution(&self, columns: &[Column], values: &[Value], changed: usize, new_value: &Value) -> KeyHash {
        self.hash_pairs(columns, |c| if c == changed { new_value } else { &values[c] })
    }

    fn hash_pairs<'a, F>(&self, columns: &'a [Column], value_at: F) -> KeyHash
    where
        F: Fn(usize) -> &'a Value,
    {
        if self
            .columns
            .iter()
            .any(|&c| columns[c].is_pending_auto_value(value_at(c)))
        {
            return KeyHash::EMPTY;
        }
        self.computer
            .compute(self.columns.iter().map(|&c| (columns[c].name(), value_at(c))))
    }

    fn duplicate(&self, columns: &[Column], values: &[Value]) -> CoreError {
        CoreError::DuplicateKey {
            index: self.name.clone(),
            key: self.key_values(columns, values).to_string(),
        }
    }

    /// Fail with `DuplicateKey` if the row would collide. Does not modify
    /// the index.
    pub fn check_insert(&self, columns: &[Column], values: &[Value]) -> Result<KeyHash> {
        let hash = self.hash_of(columns, values);
        if self.is_unique() && !hash.is_empty() && self.contains(&hash) {
            return Err(self.duplicate(columns, values));
        }
        Ok(hash)
    }

    /// Record a row. Returns false when a unique index already held the
    /// hash; the row is recorded regardless and the caller decides whether
    /// the collision is an error. EMPTY hashes are always accepted.
    pub fn try_insert(&mut self, columns: &[Column], values: &[Value]) -> bool {
        let hash = self.hash_of(columns, values);
        self.insert_hash(hash)
    }

    fn insert_hash(&mut self, hash: KeyHash) -> bool {
        if !self.is_unique() || hash.is_empty() {
            return true;
        }
        let count = self.hashes.entry(hash).or_insert(0);
        *count += 1;
        *count == 1
    }

    fn remove_hash(&mut self, hash: &KeyHash) {
        if hash.is_empty() {
            return;
        }
        if let Some(count) = self.hashes.get_mut(hash) {
            *count -= 1;
            if *count == 0 {
                self.hashes.remove(hash);
            }
        }
    }

    /// Work out the hash transition for a single-column change without
    /// touching the index. `None` when the column is not covered or the
    /// hash does not move.
    pub fn plan_column_change(
        &self,
        columns: &[Column],
        values: &[Value],
        changed: usize,
        new_value: &Value,
        enforce_unique: bool,
    ) -> Result<Option<IndexChange>> {
        if !self.covers(changed) {
            return Ok(None);
        }
        let old = self.hash_of(columns, values);
        let new = self.hash_with_substitution(columns, values, changed, new_value);
        if old == new {
            return Ok(None);
        }
        if enforce_unique && self.is_unique() && !new.is_empty() && self.contains(&new) {
            let mut values = values.to_vec();
            values[changed] = new_value.clone();
            return Err(self.duplicate(columns, &values));
        }
        Ok(Some(IndexChange { old, new }))
    }

    /// Apply a planned transition
    pub fn apply_change(&mut self, change: IndexChange) {
        self.remove_hash(&change.old);
        self.insert_hash(change.new);
    }

    /// Swap a row's hash for the one it gets after `changed` takes
    /// `new_value`. Call before the row itself is written. Returns false on a
    /// unique collision, which is recorded anyway.
    pub fn recompute_on_column_change(&mut self, columns: &[Column], values: &[Value], changed: usize, new_value: &Value) -> bool {
        if !self.covers(changed) {
            return true;
        }
        let old = self.hash_of(columns, values);
        let new = self.hash_with_substitution(columns, values, changed, new_value);
        self.remove_hash(&old);
        self.insert_hash(new)
    }

    /// Forget a row
    pub fn remove(&mut self, columns: &[Column], values: &[Value]) {
        let hash = self.hash_of(columns, values);
        self.remove_hash(&hash);
    }

    /// Drop a column position from the index and shift later positions.
    /// Returns whether the index covered it; the caller rebuilds hashes.
    pub fn remove_column(&mut self, column: usize) -> bool {
        let covered = self.covers(column);
        self.columns.retain(|&c| c != column);
        for c in self.columns.iter_mut() {
            if *c > column {
                *c -= 1;
            }
        }
        covered
    }

    /// Recompute every hash from scratch. Returns the number of rows that
    /// collided with an earlier row.
    pub fn rebuild<'a, I>(&mut self, columns: &[Column], rows: I) -> usize
    where
        I: IntoIterator<Item = &'a [Value]>,
    {
        self.hashes.clear();
        let mut collisions = 0;
        for values in rows {
            if !self.try_insert(columns, values) {
                collisions += 1;
            }
        }
        collisions
    }

    /// Forget every hash
    pub fn clear(&mut self) {
        self.hashes.clear();
    }
}
