//! Predicates (silent tests) and audits (their loud twin) — §4.8.
use crate::{
    path::{self, Path},
    report::{Message, Reports, Severity},
    value::{Arena, Kind, NodeId},
};
use serde_json::Value;
use std::sync::Arc;

/// The outcome of testing a [`Predicate`]: whether it succeeded, and any
/// issues accumulated while evaluating it — the "issue buffer" of §4.8,
/// returned by value rather than mutated in place so predicates stay
/// `Send + Sync` without interior mutability.
#[derive(Debug, Clone)]
pub struct PredicateResult {
    pub success: bool,
    pub issues: Vec<Message>,
}

impl PredicateResult {
    #[must_use]
    pub fn ok() -> Self {
        PredicateResult {
            success: true,
            issues: Vec::new(),
        }
    }

    #[must_use]
    pub fn fail(issues: Vec<Message>) -> Self {
        PredicateResult {
            success: false,
            issues,
        }
    }
}

/// A silent boolean test over an I-node.
pub trait Predicate: Send + Sync {
    fn test(&self, arena: &Arena, input: NodeId) -> PredicateResult;
}

/// The loud twin of a [`Predicate`]: invoked after the structural rule; on
/// failure its issues are routed into the reports sink.
pub trait Audit: Send + Sync {
    /// Runs the audit, routing any issues into `reports` on failure, and
    /// returns whether it succeeded.
    fn audit(&self, arena: &Arena, input: NodeId, reports: &mut dyn Reports) -> bool;
}

/// Derives an [`Audit`] from any [`Predicate`] by draining its issues into
/// the reports sink on failure.
pub struct PredicateAudit<P>(pub P);

impl<P: Predicate> Audit for PredicateAudit<P> {
    fn audit(&self, arena: &Arena, input: NodeId, reports: &mut dyn Reports) -> bool {
        let result = self.0.test(arena, input);
        if !result.success {
            for issue in result.issues {
                reports.add_report(issue);
            }
        }
        result.success
    }
}

/// Succeeds iff `path` evaluates without error on the current input.
pub struct TargetExists {
    pub path: Arc<Path>,
}

impl TargetExists {
    #[must_use]
    pub fn new(path: Arc<Path>) -> Self {
        TargetExists { path }
    }
}

impl Predicate for TargetExists {
    fn test(&self, arena: &Arena, input: NodeId) -> PredicateResult {
        match path::find(arena, &self.path, input) {
            Ok(_) => PredicateResult::ok(),
            Err(err) => PredicateResult::fail(vec![Message::new(
                Severity::Error,
                Some(input),
                "target %s does not exist: %s",
                vec![self.path.raw().to_string(), err.to_string()],
            )]),
        }
    }
}

/// Succeeds iff the target exists, is a scalar, and its value is one of
/// `accepted`.
pub struct TargetHasValue {
    pub path: Arc<Path>,
    pub accepted: Vec<Value>,
}

impl TargetHasValue {
    #[must_use]
    pub fn new(path: Arc<Path>, accepted: Vec<Value>) -> Self {
        TargetHasValue { path, accepted }
    }
}

impl Predicate for TargetHasValue {
    fn test(&self, arena: &Arena, input: NodeId) -> PredicateResult {
        let target_id = match path::find(arena, &self.path, input) {
            Ok(id) => id,
            Err(err) => {
                return PredicateResult::fail(vec![Message::new(
                    Severity::Error,
                    Some(input),
                    "target %s does not exist: %s",
                    vec![self.path.raw().to_string(), err.to_string()],
                )])
            }
        };
        let target = arena.get(target_id);
        let is_scalar = matches!(
            target.kind(),
            Kind::Boolean(_) | Kind::Integer(_) | Kind::Double(_) | Kind::String(_)
        );
        if !is_scalar {
            return PredicateResult::fail(vec![Message::new(
                Severity::Error,
                Some(target_id),
                "invalid type %s for target %s, should be a scalar",
                vec![target.type_name().to_string(), self.path.raw().to_string()],
            )]);
        }
        if self.accepted.iter().any(|v| v == target.raw()) {
            PredicateResult::ok()
        } else {
            let options = self
                .accepted
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            PredicateResult::fail(vec![Message::new(
                Severity::Warn,
                Some(target_id),
                "invalid value %s, should be one of %s",
                vec![target.raw().to_string(), options],
            )])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_exists_succeeds() {
        let (arena, root_id) = Arena::from_value(json!({"kind": "foo"}));
        let path = Arc::new(Path::parse("@.kind").unwrap());
        let predicate = TargetExists::new(path);
        assert!(predicate.test(&arena, root_id).success);
    }

    #[test]
    fn test_target_has_value_matches_s5() {
        let (arena, root_id) = Arena::from_value(json!({"kind": "foo", "fooData": 7}));
        let path = Arc::new(Path::parse("@.kind").unwrap());
        let predicate = TargetHasValue::new(path, vec![json!("foo")]);
        assert!(predicate.test(&arena, root_id).success);
    }

    #[test]
    fn test_target_has_value_rejects_other_value() {
        let (arena, root_id) = Arena::from_value(json!({"kind": "bar"}));
        let path = Arc::new(Path::parse("@.kind").unwrap());
        let predicate = TargetHasValue::new(path, vec![json!("foo")]);
        let result = predicate.test(&arena, root_id);
        assert!(!result.success);
        assert_eq!(result.issues.len(), 1);
    }
}
