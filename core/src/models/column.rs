//! Column descriptors
//!
//! A column descriptor is the static metadata of one table column. It owns
//! the validation pipeline every incoming value goes through: type
//! coercion, nullability, length limits and user validators.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::error::{validation_error, Result};
use crate::utils::StringUtils;
use super::value::{ColumnType, Value};

/// Placeholder stored in auto-generated numeric columns until the store
/// hands out the real value.
pub const AUTO_VALUE_SENTINEL: i64 = -1;

/// User-supplied value check; the error string becomes the validation message
pub type Validator = Arc<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

/// Join path of a linked column: its value lives in `column` of `table`,
/// reached through the local foreign-key column `via`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLink {
    /// Table holding the value
    pub table: String,

    /// Column in that table
    pub column: String,

    /// Local column referencing the other table's primary key
    pub via: String,
}

/// Definition of a column in a table
#[derive(Clone)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    auto_generated: bool,
    default_value: Option<Value>,
    persistent: bool,
    link: Option<ColumnLink>,
    truncate: bool,
    validators: Vec<Validator>,
}

impl Debug for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .field("nullable", &self.nullable)
            .field("auto_generated", &self.auto_generated)
            .field("default_value", &self.default_value)
            .field("persistent", &self.persistent)
            .field("link", &self.link)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Column {
    /// Create a nullable, persistent column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            column_type,
            nullable: true,
            auto_generated: false,
            default_value: None,
            persistent: true,
            link: None,
            truncate: false,
            validators: Vec::new(),
        }
    }

    /// Reject nulls
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Value is generated by the store on insert
    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    /// Value used for new rows when none is supplied
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Value is pulled from another table and never written
    pub fn linked(mut self, link: ColumnLink) -> Self {
        self.link = Some(link);
        self.persistent = false;
        self
    }

    /// Include or exclude the column from store writes
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Cut over-long strings instead of rejecting them
    pub fn truncating(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Add a user validator
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Semantic type
    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    /// Whether nulls are accepted
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the store generates the value
    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }

    /// Default for new rows
    pub fn default(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Join path, for linked columns
    pub fn link(&self) -> Option<&ColumnLink> {
        self.link.as_ref()
    }

    /// Whether the column takes part in store writes
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Maximum length for bounded text columns
    pub fn length(&self) -> Option<usize> {
        self.column_type.max_length()
    }

    /// Scale for decimal columns
    pub fn scale(&self) -> Option<u8> {
        self.column_type.scale()
    }

    /// Case-insensitive name match, also accepting a qualified `table.name`
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || name
                .rsplit_once('.')
                .map(|(_, bare)| self.name.eq_ignore_ascii_case(bare))
                .unwrap_or(false)
    }

    /// Whether `value` is the unassigned placeholder of this auto column
    pub fn is_pending_auto_value(&self, value: &Value) -> bool {
        self.auto_generated
            && (value.is_null() || (self.column_type.is_numeric() && value.as_i64() == Some(AUTO_VALUE_SENTINEL)))
    }

    /// Value a freshly created row carries in this column
    pub fn initial_value(&self) -> Value {
        if self.auto_generated {
            return match self.column_type {
                ColumnType::Integer => Value::Integer(AUTO_VALUE_SENTINEL as i32),
                ColumnType::BigInt => Value::BigInt(AUTO_VALUE_SENTINEL),
                ColumnType::Float | ColumnType::Decimal { .. } => Value::Float(AUTO_VALUE_SENTINEL as f64),
                _ => Value::Null,
            };
        }
        self.default_value.clone().unwrap_or(Value::Null)
    }

    /// Run a value through coercion, nullability, length and validators.
    ///
    /// `truncate_strings` is the table-wide truncation policy; the column's
    /// own flag also enables truncation.
    pub fn prepare(&self, value: Value, truncate_strings: bool) -> Result<Value> {
        let value = self
            .column_type
            .coerce(value)
            .map_err(|e| validation_error(&self.name, e))?;

        if value.is_null() {
            if !self.nullable && !self.auto_generated {
                return Err(validation_error(&self.name, "null value in non-nullable column"));
            }
            return Ok(value);
        }

        let value = match (value, self.length()) {
            (Value::Text(text), Some(max)) if text.chars().count() > max => {
                if self.truncate || truncate_strings {
                    Value::Text(StringUtils::truncate_chars(&text, max))
                } else {
                    return Err(validation_error(
                        &self.name,
                        format!("length {} exceeds limit {}", text.chars().count(), max),
                    ));
                }
            }
            (value, _) => value,
        };

        for validator in &self.validators {
            validator(&value).map_err(|msg| validation_error(&self.name, msg))?;
        }
        Ok(value)
    }
}
