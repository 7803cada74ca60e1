//! Conversions between engine values and SQLite values
//!
//! SQLite has five storage classes. Booleans are stored as 0/1, UUIDs,
//! timestamps and JSON as text. Values read back are widened (integers to
//! `BigInt`) and left for the table's column types to coerce.

use rusqlite::types::{Value as SqlValue, ValueRef};

use rowbound_core::models::{ColumnType, Value};
use crate::error::{to_conversion_error, Result};

/// SQLite value for an engine value
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(v) => SqlValue::Integer(*v),
        Value::Float(v) => SqlValue::Real(*v),
        Value::Text(v) | Value::Json(v) => SqlValue::Text(v.clone()),
        Value::Binary(v) => SqlValue::Blob(v.clone()),
        Value::Boolean(v) => SqlValue::Integer(i64::from(*v)),
        Value::Uuid(v) => SqlValue::Text(v.to_string()),
        Value::Timestamp(v) => SqlValue::Text(v.to_rfc3339()),
    }
}

/// Engine value for a value read from SQLite
pub fn from_sql(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::BigInt(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) => Value::Text(std::str::from_utf8(bytes).map_err(to_conversion_error)?.to_string()),
        ValueRef::Blob(bytes) => Value::Binary(bytes.to_vec()),
    })
}

/// Engine column type for a declared SQLite column type.
///
/// Names the engine writes itself map back exactly; anything else follows
/// SQLite's affinity rules. An empty declaration has no mapping.
pub fn column_type_from_decl(decl: &str) -> Option<ColumnType> {
    let upper = decl.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    let length = || {
        upper
            .split_once('(')
            .and_then(|(_, rest)| rest.trim_end_matches(')').split(',').next())
            .and_then(|n| n.trim().parse::<usize>().ok())
    };

    let mapped = if upper.starts_with("BOOL") {
        ColumnType::Boolean
    } else if upper.starts_with("UUID") {
        ColumnType::Uuid
    } else if upper.starts_with("JSON") {
        ColumnType::Json
    } else if upper.starts_with("TIMESTAMP") || upper.starts_with("DATE") {
        ColumnType::Timestamp
    } else if upper.starts_with("BIGINT") {
        ColumnType::BigInt
    } else if upper.contains("INT") {
        ColumnType::Integer
    } else if upper.starts_with("VARCHAR") {
        length().map(ColumnType::VarChar).unwrap_or(ColumnType::Text)
    } else if upper.starts_with("CHAR") {
        length().map(ColumnType::Char).unwrap_or(ColumnType::Text)
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        ColumnType::Text
    } else if upper.contains("BLOB") || upper.starts_with("BINARY") {
        ColumnType::Binary
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        ColumnType::Float
    } else if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") {
        let (precision, scale) = upper
            .split_once('(')
            .map(|(_, rest)| {
                let mut parts = rest.trim_end_matches(')').split(',').map(|p| p.trim().parse::<u8>().ok());
                (parts.next().flatten(), parts.next().flatten())
            })
            .unwrap_or((None, None));
        match precision {
            Some(precision) => ColumnType::Decimal { precision, scale: scale.unwrap_or(0) },
            None => ColumnType::Float,
        }
    } else {
        return None;
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    #[test]
    fn test_to_sql() {
        assert_eq!(to_sql(&Value::Boolean(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&Value::Integer(-4)), SqlValue::Integer(-4));
        let id = Uuid::nil();
        assert_eq!(to_sql(&Value::Uuid(id)), SqlValue::Text(id.to_string()));
        assert_eq!(to_sql(&Value::Null), SqlValue::Null);
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(to_sql(&Value::Timestamp(epoch)), SqlValue::Text("1970-01-01T00:00:00+00:00".into()));
    }

    #[test]
    fn test_from_sql() {
        assert_eq!(from_sql(ValueRef::Integer(7)).unwrap(), Value::BigInt(7));
        assert_eq!(from_sql(ValueRef::Text(b"abc")).unwrap(), Value::Text("abc".into()));
        assert!(from_sql(ValueRef::Text(&[0xff, 0xfe])).is_err());
        assert_eq!(from_sql(ValueRef::Blob(&[1, 2])).unwrap(), Value::Binary(vec![1, 2]));
    }

    #[rstest]
    #[case("INTEGER", Some(ColumnType::Integer))]
    #[case("bigint", Some(ColumnType::BigInt))]
    #[case("VARCHAR(20)", Some(ColumnType::VarChar(20)))]
    #[case("CHAR(3)", Some(ColumnType::Char(3)))]
    #[case("NVARCHAR", Some(ColumnType::Text))]
    #[case("TEXT", Some(ColumnType::Text))]
    #[case("DECIMAL(10,2)", Some(ColumnType::Decimal { precision: 10, scale: 2 }))]
    #[case("DOUBLE PRECISION", Some(ColumnType::Float))]
    #[case("BOOLEAN", Some(ColumnType::Boolean))]
    #[case("DATETIME", Some(ColumnType::Timestamp))]
    #[case("BLOB", Some(ColumnType::Binary))]
    #[case("", None)]
    #[case("GEOMETRY", None)]
    fn test_column_type_from_decl(#[case] decl: &str, #[case] expected: Option<ColumnType>) {
        assert_eq!(column_type_from_decl(decl), expected);
    }
}
