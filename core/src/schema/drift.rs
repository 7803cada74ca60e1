//! Structural drift between declared columns and the backing store
//!
//! The store reports its own view of a table's columns; any disagreement
//! with the declared columns is drift. A [`DriftPolicy`] decides whether
//! drift is tolerated, repaired by dropping columns, or fatal.

use std::fmt::{Display, Formatter, Result as FmtResult};
use log::{info, warn};
use serde::{Serialize, Deserialize};

use crate::error::{CoreError, Result};
use crate::models::{Column, ColumnType, Table};

/// A column as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreColumn {
    /// Column name
    pub name: String,

    /// Mapped type, `None` when the store type has no mapping
    pub column_type: Option<ColumnType>,

    /// Whether the store accepts nulls
    pub nullable: bool,
}

/// Reaction to detected drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftPolicy {
    /// Log and keep the declared columns
    #[default]
    Accept,

    /// Remove declared columns the store does not have
    Drop,

    /// Refuse to work with the table
    Fail,
}

/// One difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drift {
    /// Declared persistent column absent from the store
    MissingInStore(String),

    /// Store column nobody declared
    ExtraInStore(String),

    /// Incompatible types
    TypeMismatch {
        /// Column name
        column: String,
        /// Declared type
        declared: ColumnType,
        /// Store type
        store: ColumnType,
    },

    /// Declared NOT NULL but the store accepts nulls, or the reverse
    NullabilityMismatch {
        /// Column name
        column: String,
        /// Declared nullability
        declared: bool,
    },
}

impl Display for Drift {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Drift::MissingInStore(c) => write!(f, "{} missing in store", c),
            Drift::ExtraInStore(c) => write!(f, "{} not declared", c),
            Drift::TypeMismatch { column, declared, store } => {
                write!(f, "{} declared {} but stored as {}", column, declared, store)
            }
            Drift::NullabilityMismatch { column, declared } => {
                let word = |nullable: bool| if nullable { "nullable" } else { "not null" };
                write!(f, "{} declared {} but stored {}", column, word(*declared), word(!*declared))
            }
        }
    }
}

/// Differences found for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Table name
    pub table: String,

    /// Differences in declaration order, extras last
    pub drifts: Vec<Drift>,
}

impl DriftReport {
    /// Whether declaration and store agree
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }

    /// Declared columns the store lacks
    pub fn missing_in_store(&self) -> impl Iterator<Item = &str> {
        self.drifts.iter().filter_map(|d| match d {
            Drift::MissingInStore(c) => Some(c.as_str()),
            _ => None,
        })
    }
}

impl Display for DriftReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let parts: Vec<String> = self.drifts.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Compare declared columns with the store's. Non-persistent columns are
/// not expected in the store.
pub fn detect(table: &str, declared: &[Column], store: &[StoreColumn]) -> DriftReport {
    let mut drifts = Vec::new();

    for column in declared.iter().filter(|c| c.is_persistent()) {
        let found = store.iter().find(|s| column.matches_name(&s.name));
        let found = match found {
            Some(found) => found,
            None => {
                drifts.push(Drift::MissingInStore(column.name().to_string()));
                continue;
            }
        };
        if let Some(store_type) = found.column_type {
            if !column.column_type().is_compatible_with(&store_type) {
                drifts.push(Drift::TypeMismatch {
                    column: column.name().to_string(),
                    declared: *column.column_type(),
                    store: store_type,
                });
            }
        }
        if !column.is_auto_generated() && column.is_nullable() != found.nullable {
            drifts.push(Drift::NullabilityMismatch {
                column: column.name().to_string(),
                declared: column.is_nullable(),
            });
        }
    }

    for extra in store
        .iter()
        .filter(|s| !declared.iter().any(|c| c.matches_name(&s.name)))
    {
        drifts.push(Drift::ExtraInStore(extra.name.clone()));
    }

    DriftReport { table: table.to_string(), drifts }
}

/// Detect drift and apply the policy to the table
pub fn reconcile(table: &mut Table, store: &[StoreColumn], policy: DriftPolicy) -> Result<DriftReport> {
    let report = detect(table.name(), table.columns(), store);
    if report.is_clean() {
        return Ok(report);
    }

    match policy {
        DriftPolicy::Fail => {
            return Err(CoreError::StructuralDrift {
                table: report.table.clone(),
                details: report.to_string(),
            });
        }
        DriftPolicy::Accept => {
            for drift in &report.drifts {
                warn!("{}: accepted drift: {}", report.table, drift);
            }
        }
        DriftPolicy::Drop => {
            let missing: Vec<String> = report.missing_in_store().map(str::to_string).collect();
            for column in missing {
                info!("{}: dropping column {} missing in store", report.table, column);
                table.remove_column(&column)?;
            }
            for drift in report.drifts.iter().filter(|d| !matches!(d, Drift::MissingInStore(_))) {
                warn!("{}: accepted drift: {}", report.table, drift);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnLink;

    fn table() -> Table {
        Table::builder("users")
            .column(Column::new("ID", ColumnType::BigInt).not_null())
            .column(Column::new("NAME", ColumnType::VarChar(20)))
            .column(Column::new("NICK", ColumnType::Text))
            .column(Column::new("CITY", ColumnType::Text).linked(ColumnLink {
                table: "cities".into(),
                column: "name".into(),
                via: "city_id".into(),
            }))
            .primary_key(["ID"])
            .build()
            .unwrap()
    }

    fn store(nick: bool) -> Vec<StoreColumn> {
        let mut cols = vec![
            StoreColumn { name: "id".into(), column_type: Some(ColumnType::Integer), nullable: false },
            StoreColumn { name: "name".into(), column_type: Some(ColumnType::Text), nullable: true },
        ];
        if nick {
            cols.push(StoreColumn { name: "nick".into(), column_type: None, nullable: true });
        }
        cols
    }

    #[test]
    fn test_clean() {
        let report = detect("users", table().columns(), &store(true));
        assert!(report.is_clean(), "{}", report);
    }

    #[test]
    fn test_detect_all_kinds() {
        let mut cols = store(false);
        cols[0].column_type = Some(ColumnType::Text);
        cols[1].nullable = false;
        cols.push(StoreColumn { name: "extra".into(), column_type: None, nullable: true });

        let report = detect("users", table().columns(), &cols);
        assert_eq!(
            report.drifts,
            vec![
                Drift::TypeMismatch { column: "ID".into(), declared: ColumnType::BigInt, store: ColumnType::Text },
                Drift::NullabilityMismatch { column: "NAME".into(), declared: true },
                Drift::MissingInStore("NICK".into()),
                Drift::ExtraInStore("extra".into()),
            ]
        );
        assert_eq!(report.missing_in_store().collect::<Vec<_>>(), vec!["NICK"]);
    }

    #[test]
    fn test_policies() {
        let mut t = table();
        let report = reconcile(&mut t, &store(false), DriftPolicy::Accept).unwrap();
        assert!(!report.is_clean());
        assert_eq!(t.column_count(), 4);

        let err = reconcile(&mut t, &store(false), DriftPolicy::Fail).unwrap_err();
        assert_eq!(err.to_string(), "Structural drift in table users: NICK missing in store");

        reconcile(&mut t, &store(false), DriftPolicy::Drop).unwrap();
        assert_eq!(t.column_count(), 3);
        assert!(t.column_index("NICK").is_none());
        assert!(reconcile(&mut t, &store(false), DriftPolicy::Fail).unwrap().is_clean());
    }

    #[test]
    fn test_policy_serde() {
        let policy: DriftPolicy = serde_json::from_str("\"drop\"").unwrap();
        assert_eq!(policy, DriftPolicy::Drop);
        assert_eq!(DriftPolicy::default(), DriftPolicy::Accept);
    }
}
