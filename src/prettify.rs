//! The prettifier collaborator (§6.3). Purely for rendering diagnostic
//! context; never participates in validation logic.
use crate::schema::Node as SchemaNode;
use serde_json::Value;

/// Renders context fragments for diagnostics. A null prettifier (see
/// [`CanonicalPrettifier`]) falls back to canonical JSON encoding.
pub trait Prettifier {
    fn prettify(&self, s: &str) -> String;
    fn prettify_key(&self, s: &str) -> String;
    fn prettify_value(&self, s: &Value) -> String;
    fn prettify_object(&self, raw: &Value, expected: Option<&SchemaNode>) -> String;
    fn prettify_array(&self, raw: &Value, expected: Option<&SchemaNode>) -> String;
}

/// The default [`Prettifier`]: falls back to canonical JSON encoding for
/// every method, per §6.3.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalPrettifier;

impl Prettifier for CanonicalPrettifier {
    fn prettify(&self, s: &str) -> String {
        s.to_string()
    }

    fn prettify_key(&self, s: &str) -> String {
        s.to_string()
    }

    fn prettify_value(&self, s: &Value) -> String {
        s.to_string()
    }

    fn prettify_object(&self, raw: &Value, _expected: Option<&SchemaNode>) -> String {
        raw.to_string()
    }

    fn prettify_array(&self, raw: &Value, _expected: Option<&SchemaNode>) -> String {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_prettifier_falls_back_to_json() {
        let p = CanonicalPrettifier;
        assert_eq!(p.prettify_value(&json!(42)), "42");
        assert_eq!(p.prettify_object(&json!({"a": 1}), None), "{\"a\":1}");
    }
}
