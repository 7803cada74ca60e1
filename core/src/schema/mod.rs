//! Table definition checks
//!
//! Validation of table definitions before a table is built, and
//! reconciliation of declared columns against the structure the backing
//! store reports.

mod validator;
pub mod drift;

pub use validator::{SchemaValidator, ValidationResult, ValidationError};
pub use drift::{detect, reconcile, Drift, DriftPolicy, DriftReport, StoreColumn};
