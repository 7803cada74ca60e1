/// Rowbound - in-memory data tables bound to a relational store
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `rowbound-core`: the in-memory table engine and synchronization protocol
/// - `rowbound-sqlite`: SQLite statement builder and connection for the engine

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
