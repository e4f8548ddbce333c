//! A structural validation engine for parsed JSON.
//!
//! An expected-schema tree is built programmatically from [`schema::Builder`]
//! (no schema-description language is parsed at runtime), then an input
//! document is validated against it with [`Engine::validate`], producing a
//! boolean verdict plus a stream of severity-tagged diagnostics and
//! hierarchical statistics.
//!
//! ```
//! use structural_validator::{schema::Builder, validate_from_str_default};
//!
//! let expected = Builder::object()
//!     .field("name", Builder::string(), true)
//!     .build();
//! let (ok, reports, _stats) = validate_from_str_default(r#"{"name": "alice"}"#, &expected).unwrap();
//! assert!(ok);
//! assert!(reports.messages().is_empty());
//! ```
//!
//! Diagnostics and faults are kept separate (§7): a diagnostic is a
//! recoverable finding routed to a [`report::Reports`] sink while traversal
//! continues; a [`error::ValidationFault`] means the engine could not
//! complete at all (malformed path expression, dangling redirect, recursion
//! past the configured depth limit) and is returned instead of a verdict.
pub mod bitmask;
pub mod engine;
pub mod error;
pub mod path;
pub mod predicate;
pub mod prettify;
pub mod registry;
pub mod report;
pub mod schema;
pub mod stats;
pub mod value;

pub use engine::{Engine, EngineOptions};
pub use error::ValidationFault;
pub use report::{Reports, VecReports};
pub use stats::{Stats, TreeStats};
pub use value::Arena;

/// Parses `json_text`, wraps it in a `Root` I-node (§3.1), and validates it
/// against `expected` with a fresh, default-configured [`Engine`].
///
/// # Errors
/// Returns a [`ValidationFault`] if `json_text` does not parse as JSON, or
/// if validation itself faults (dangling redirect, recursion past the
/// configured depth limit).
pub fn validate_from_str(
    json_text: &str,
    expected: &schema::Node,
    reports: &mut dyn report::Reports,
    stats: &mut dyn stats::Stats,
) -> Result<bool, ValidationFault> {
    let value: serde_json::Value = serde_json::from_str(json_text)?;
    let (arena, root_id) = Arena::from_value(value);
    let engine = Engine::new();
    engine.validate(&arena, root_id, expected, reports, stats)
}

/// Convenience wrapper over [`validate_from_str`] using the default
/// in-memory sinks, for callers who do not need a custom [`report::Reports`]
/// or [`stats::Stats`] implementation.
///
/// # Errors
/// See [`validate_from_str`].
pub fn validate_from_str_default(
    json_text: &str,
    expected: &schema::Node,
) -> Result<(bool, VecReports, TreeStats), ValidationFault> {
    let mut reports = VecReports::new();
    let mut stats = TreeStats::new();
    let ok = validate_from_str(json_text, expected, &mut reports, &mut stats)?;
    Ok((ok, reports, stats))
}
