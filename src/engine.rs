//! The validation engine (§4): the recursive comparison of an input value
//! against an expected-schema node tree.
use crate::{
    bitmask,
    error::{FaultKind, ValidationFault},
    predicate::{Audit, Predicate},
    registry::{self, Registry},
    report::{Message, Reports, Severity},
    schema::{self, Field, Node as SchemaNode, ObjectShape},
    stats::Stats,
    value::{Arena, Kind as ValueKind, Node as ValueNode, NodeId},
};
use ahash::AHashMap;
use std::sync::Arc;

/// Default maximum recursion depth (§5), guarding against pathological
/// `ERedirect` cycles that terminate on finite input but may still nest
/// unboundedly through `Mixed`/`Object` wrappers.
pub const DEFAULT_MAX_DEPTH: usize = 256;

type GlobalIgnore = dyn Fn(&str) -> bool + Send + Sync;

/// Configuration for an [`Engine`], built fluently, e.g.
/// `Engine::options().max_depth(64).build()`.
pub struct EngineOptions {
    max_depth: usize,
    global_ignore: Arc<GlobalIgnore>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            global_ignore: Arc::new(|key: &str| key.to_lowercase().contains("comment")),
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the recursion depth limit.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Overrides the predicate used to decide whether an otherwise-unexpected
    /// object key is globally accepted (§4.4 step 5). Default: a
    /// case-insensitive substring match on `"comment"`.
    #[must_use]
    pub fn global_ignore(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.global_ignore = Arc::new(predicate);
        self
    }

    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            registry: Registry::new(),
            options: self,
        }
    }

    #[must_use]
    pub fn build_with_registry(self, registry: Registry) -> Engine {
        Engine {
            registry,
            options: self,
        }
    }
}

/// The validation engine: recursively compares an input value tree against
/// an expected-schema node tree.
pub struct Engine {
    registry: Registry,
    options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        EngineOptions::default().build()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn options() -> EngineOptions {
        EngineOptions::new()
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Entry point (§4.1): validates `input` against `expected`, recording
    /// diagnostics in `reports` and counters in `stats`.
    ///
    /// # Errors
    /// Returns a [`ValidationFault`] if an `ERedirect` resolves to an
    /// unknown identifier or recursion exceeds the configured depth limit.
    pub fn validate(
        &self,
        arena: &Arena,
        input: NodeId,
        expected: &SchemaNode,
        reports: &mut dyn Reports,
        stats: &mut dyn Stats,
    ) -> Result<bool, ValidationFault> {
        self.validate_at_depth(arena, input, expected, reports, stats, 0)
    }

    fn validate_at_depth(
        &self,
        arena: &Arena,
        input_id: NodeId,
        expected: &SchemaNode,
        reports: &mut dyn Reports,
        stats: &mut dyn Stats,
        depth: usize,
    ) -> Result<bool, ValidationFault> {
        if depth > self.options.max_depth {
            return Err(ValidationFault::new(FaultKind::DepthExceeded {
                limit: self.options.max_depth,
            }));
        }
        let expected = registry::resolve(expected, &self.registry)?;
        let input = arena.get(input_id);

        // `ERoot`/`IRoot` are unwrapped transparently wherever they appear,
        // not only when both sides happen to be `Root` (§4.6, §9: Root
        // wrapping exists to make parent-walking uniform, so the common
        // case is a Root-wrapped input validated against a non-Root
        // top-level schema).
        if let schema::Kind::Root(expected_child) = &expected.kind {
            if let ValueKind::Root(input_child) = input.kind() {
                record_root_visit(arena, *input_child, stats);
                return self.validate_at_depth(
                    arena,
                    *input_child,
                    expected_child,
                    reports,
                    stats,
                    depth + 1,
                );
            }
            return self.validate_at_depth(arena, input_id, expected_child, reports, stats, depth + 1);
        }
        if let ValueKind::Root(input_child) = input.kind() {
            record_root_visit(arena, *input_child, stats);
            return self.validate_at_depth(arena, *input_child, expected, reports, stats, depth + 1);
        }

        stats.add_stat(1, &["types", input.type_name().as_str()]);

        // Step 1: nullable short-circuit.
        if matches!(input.kind(), ValueKind::Null) && expected.is_nullable() {
            return Ok(true);
        }

        // `EMixed` performs its own type-compatibility check with its own
        // "must have been one of" wording (§4.5) instead of the generic
        // step-2 message, so it is special-cased ahead of the generic check.
        if let schema::Kind::Mixed(alternatives) = &expected.kind {
            let structural_ok = self.mixed_compare(arena, input_id, alternatives, reports, stats, depth)?;
            let audits_ok = run_audits(expected, arena, input_id, reports);
            return Ok(structural_ok && audits_ok);
        }

        // Step 2: generic type compatibility.
        if !bitmask::compatible(input.type_bit(), expected.type_bitmask()) {
            emit_type_mismatch(arena, input_id, input, expected, reports);
            return Ok(false);
        }

        // Step 3: structural dispatch.
        let structural_ok = match &expected.kind {
            schema::Kind::Null
            | schema::Kind::Boolean(_)
            | schema::Kind::Integer(_)
            | schema::Kind::Double(_)
            | schema::Kind::String(_)
            | schema::Kind::Scalar => scalar_compare(arena, input_id, expected, reports, stats),
            schema::Kind::Array(templates) => {
                self.array_compare(arena, input_id, templates, reports, stats, depth)?
            }
            schema::Kind::Object(shape) => {
                self.object_compare(arena, input_id, shape, reports, stats, depth)?
            }
            schema::Kind::Mixed(_) | schema::Kind::Redirect(_) | schema::Kind::Root(_) => {
                unreachable!("handled above")
            }
        };

        // Step 4: audits (always run, even if structural comparison failed).
        let audits_ok = run_audits(expected, arena, input_id, reports);

        // Step 5.
        Ok(structural_ok && audits_ok)
    }

    fn array_compare(
        &self,
        arena: &Arena,
        input_id: NodeId,
        templates: &[SchemaNode],
        reports: &mut dyn Reports,
        stats: &mut dyn Stats,
        depth: usize,
    ) -> Result<bool, ValidationFault> {
        let input = arena.get(input_id);
        let ValueKind::Array(children) = input.kind() else {
            unreachable!("array_compare called on a non-array input")
        };
        let mut ok = true;
        for (index, child_id) in children.iter().enumerate() {
            let child = arena.get(*child_id);
            let mut matched = Vec::new();
            for template in templates {
                let resolved = registry::resolve(template, &self.registry)?;
                if bitmask::compatible(child.type_bit(), resolved.type_bitmask()) {
                    matched.push(resolved);
                }
            }
            if matched.is_empty() {
                let label = field_label(arena, input_id);
                let position = itoa::Buffer::new().format(index).to_string();
                let message = match label {
                    Some(owner) => Message::new(
                        Severity::Warn,
                        Some(*child_id),
                        "unexpected array element at position %s in field %s",
                        vec![position, owner],
                    ),
                    None => Message::new(
                        Severity::Warn,
                        Some(*child_id),
                        "unexpected array element at position %s",
                        vec![position],
                    ),
                };
                reports.add_report(message);
                ok = false;
            } else {
                stats.add_stat(1, &["elements", child.type_name().as_str()]);
                for template in matched {
                    let result =
                        self.validate_at_depth(arena, *child_id, template, reports, stats, depth + 1)?;
                    ok = ok && result;
                }
            }
        }
        Ok(ok)
    }

    fn object_compare(
        &self,
        arena: &Arena,
        input_id: NodeId,
        shape: &ObjectShape,
        reports: &mut dyn Reports,
        stats: &mut dyn Stats,
        depth: usize,
    ) -> Result<bool, ValidationFault> {
        let input = arena.get(input_id);
        let ValueKind::Object(input_fields) = input.kind() else {
            unreachable!("object_compare called on a non-object input")
        };

        // Step 1: active field set, base fields then successful branches.
        let mut active_named: Vec<&Field> = Vec::new();
        let mut named_index: AHashMap<&str, usize> = AHashMap::new();
        let mut active_placeholders: Vec<&Field> = Vec::new();
        push_fields(&shape.fields, &mut active_named, &mut named_index, &mut active_placeholders);
        for branch in &shape.branches {
            let result = branch.predicate.test(arena, input_id);
            if result.success {
                reports.add_report(Message::new(
                    Severity::Debug,
                    Some(input_id),
                    "Successfully branched to: %s",
                    vec![branch.label.clone()],
                ));
                push_fields(
                    &branch.outcomes,
                    &mut active_named,
                    &mut named_index,
                    &mut active_placeholders,
                );
            }
        }

        let mut consumed = vec![false; input_fields.len()];
        let mut ok = true;

        // Step 3: named fields, in declaration order.
        for field in &active_named {
            let found = input_fields.iter().position(|(key, _)| key == &field.key);
            match found {
                None if field.required => {
                    let message = match field_label(arena, input_id) {
                        Some(owner) => Message::new(
                            Severity::Error,
                            Some(input_id),
                            "missing required nested field %s for object %s",
                            vec![field.key.clone(), owner],
                        ),
                        None => Message::new(
                            Severity::Error,
                            Some(input_id),
                            "missing required field %s",
                            vec![field.key.clone()],
                        ),
                    };
                    reports.add_report(message);
                    ok = false;
                }
                None => {}
                Some(idx) => {
                    let (_, child_id) = &input_fields[idx];
                    let child_id = *child_id;
                    let resolved = registry::resolve(&field.value, &self.registry)?;
                    let result =
                        self.validate_at_depth(arena, child_id, resolved, reports, stats, depth + 1)?;
                    ok = ok && result;
                    stats.add_stat(1, &["fields", arena.get(child_id).type_name().as_str()]);
                    stats.add_stat(1, &["keys", &field.key]);
                    consumed[idx] = true;
                }
            }
        }

        // Step 4: placeholders, in declaration order; each claims any
        // still-unconsumed key whose value overlaps its type bitmask.
        for placeholder in &active_placeholders {
            let resolved = registry::resolve(&placeholder.value, &self.registry)?;
            for idx in 0..input_fields.len() {
                if consumed[idx] {
                    continue;
                }
                let (_, child_id) = &input_fields[idx];
                let child_id = *child_id;
                let child = arena.get(child_id);
                if bitmask::compatible(child.type_bit(), resolved.type_bitmask()) {
                    let result =
                        self.validate_at_depth(arena, child_id, resolved, reports, stats, depth + 1)?;
                    ok = ok && result;
                    consumed[idx] = true;
                }
            }
        }

        // Step 5: globally-accepted keys.
        let mut ignored = Vec::new();
        for (idx, (key, _)) in input_fields.iter().enumerate() {
            if !consumed[idx] && (self.options.global_ignore)(key) {
                consumed[idx] = true;
                ignored.push(key.clone());
            }
        }
        if !ignored.is_empty() {
            reports.add_report(Message::new(
                Severity::Info,
                Some(input_id),
                "ignoring globally-accepted key(s): %s",
                vec![ignored.join(", ")],
            ));
        }

        // Step 6: whatever remains is unexpected.
        let unexpected: Vec<&str> = input_fields
            .iter()
            .enumerate()
            .filter(|(idx, _)| !consumed[*idx])
            .map(|(_, (key, _))| key.as_str())
            .collect();
        if !unexpected.is_empty() {
            let accepted: Vec<&str> = active_named.iter().map(|f| f.key.as_str()).collect();
            reports.add_report(Message::new(
                Severity::Warn,
                Some(input_id),
                "unexpected key(s) %s, accepted keys are %s",
                vec![unexpected.join(", "), accepted.join(", ")],
            ));
            ok = false;
        }

        Ok(ok)
    }

    fn mixed_compare(
        &self,
        arena: &Arena,
        input_id: NodeId,
        alternatives: &[SchemaNode],
        reports: &mut dyn Reports,
        stats: &mut dyn Stats,
        depth: usize,
    ) -> Result<bool, ValidationFault> {
        let input = arena.get(input_id);
        let mut mask = 0;
        for alternative in alternatives {
            let resolved = registry::resolve(alternative, &self.registry)?;
            mask |= resolved.type_bitmask();
            if bitmask::compatible(input.type_bit(), resolved.type_bitmask()) {
                return self.validate_at_depth(arena, input_id, resolved, reports, stats, depth + 1);
            }
        }
        reports.add_report(Message::new(
            Severity::Error,
            Some(input_id),
            "invalid type %s, must have been one of: %s",
            vec![input.type_name().to_string(), bitmask::describe(mask)],
        ));
        Ok(false)
    }
}

fn push_fields<'a>(
    fields: &'a [Field],
    active_named: &mut Vec<&'a Field>,
    named_index: &mut AHashMap<&'a str, usize>,
    active_placeholders: &mut Vec<&'a Field>,
) {
    for field in fields {
        if field.placeholder {
            active_placeholders.push(field);
        } else if let Some(&idx) = named_index.get(field.key.as_str()) {
            active_named[idx] = field;
        } else {
            named_index.insert(field.key.as_str(), active_named.len());
            active_named.push(field);
        }
    }
}

fn run_audits(expected: &SchemaNode, arena: &Arena, input_id: NodeId, reports: &mut dyn Reports) -> bool {
    let mut ok = true;
    for audit in expected.audits() {
        let result = audit.audit(arena, input_id, reports);
        ok = ok && result;
    }
    ok
}

fn record_root_visit(arena: &Arena, child_id: NodeId, stats: &mut dyn Stats) {
    let type_name = arena.get(child_id).type_name();
    stats.add_stat(1, &["root", "type", type_name.as_str()]);
}

/// Returns the name of the nearest enclosing object field, if any — either
/// `node` itself is a field's value, or `node` is an array element whose
/// array is. Used to distinguish "contained" vs. "uncontained" diagnostic
/// wording (§4.1 step 2, §4.2, §4.3).
fn field_label(arena: &Arena, id: NodeId) -> Option<String> {
    let node = arena.get(id);
    if let Some(key) = node.field_key() {
        return Some(key.to_string());
    }
    if let Some(parent_id) = node.parent() {
        if let Some(key) = arena.get(parent_id).field_key() {
            return Some(key.to_string());
        }
    }
    None
}

fn emit_type_mismatch(
    arena: &Arena,
    input_id: NodeId,
    input: &ValueNode,
    expected: &SchemaNode,
    reports: &mut dyn Reports,
) {
    let expected_names = bitmask::describe(expected.type_bitmask());
    let message = match field_label(arena, input_id) {
        Some(owner) => Message::new(
            Severity::Error,
            Some(input_id),
            "type %s for field %s, should be %s",
            vec![input.type_name().to_string(), owner, expected_names],
        ),
        None => Message::new(
            Severity::Error,
            Some(input_id),
            "type %s, should be %s",
            vec![input.type_name().to_string(), expected_names],
        ),
    };
    reports.add_report(message);
}

/// Renders a scalar I-node's value the way diagnostics and statistics keys
/// expect: unquoted, e.g. `world` rather than `"world"`.
fn display_scalar(node: &ValueNode) -> String {
    match node.kind() {
        ValueKind::Null => "null".to_string(),
        ValueKind::Boolean(b) => b.to_string(),
        ValueKind::Integer(i) => i.to_string(),
        ValueKind::Double(d) => d.to_string(),
        ValueKind::String(s) => s.clone(),
        _ => node.raw().to_string(),
    }
}

fn literal_matches(expected: &schema::Kind, input: &ValueNode) -> bool {
    match (expected, input.kind()) {
        (schema::Kind::Boolean(Some(lit)), ValueKind::Boolean(actual)) => lit == actual,
        (schema::Kind::Integer(Some(lit)), ValueKind::Integer(actual)) => lit == actual,
        (schema::Kind::Double(Some(lit)), ValueKind::Double(actual)) => lit == actual,
        (schema::Kind::String(Some(lit)), ValueKind::String(actual)) => lit == actual,
        _ => true,
    }
}

fn literal_display(expected: &schema::Kind) -> Option<String> {
    match expected {
        schema::Kind::Boolean(Some(v)) => Some(v.to_string()),
        schema::Kind::Integer(Some(v)) => Some(v.to_string()),
        schema::Kind::Double(Some(v)) => Some(v.to_string()),
        schema::Kind::String(Some(v)) => Some(v.clone()),
        _ => None,
    }
}

fn scalar_compare(
    arena: &Arena,
    input_id: NodeId,
    expected: &SchemaNode,
    reports: &mut dyn Reports,
    stats: &mut dyn Stats,
) -> bool {
    let input = arena.get(input_id);
    let rendered = display_scalar(input);
    stats.add_stat(1, &["values", input.type_name().as_str(), &rendered]);
    if literal_matches(&expected.kind, input) {
        return true;
    }
    if let Some(expected_value) = literal_display(&expected.kind) {
        reports.add_report(Message::new(
            Severity::Warn,
            Some(input_id),
            "Value %s does not match the expected value %s",
            vec![display_scalar(input), expected_value],
        ));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{report::VecReports, schema::Builder, stats::TreeStats};
    use serde_json::json;
    use std::sync::Arc as StdArc;

    fn run(input: serde_json::Value, expected: &SchemaNode) -> (bool, VecReports, TreeStats) {
        let (arena, root_id) = Arena::from_value(input);
        let engine = Engine::new();
        let mut reports = VecReports::new();
        let mut stats = TreeStats::new();
        let ok = engine
            .validate(&arena, root_id, expected, &mut reports, &mut stats)
            .unwrap();
        (ok, reports, stats)
    }

    #[test]
    fn test_s1_scalar_literal_match() {
        let expected = Builder::string_eq("hello");
        let (ok, reports, _) = run(json!("hello"), &expected);
        assert!(ok);
        assert!(reports.messages().is_empty());
    }

    #[test]
    fn test_s1_scalar_literal_mismatch() {
        let expected = Builder::string_eq("hello");
        let (ok, reports, _) = run(json!("world"), &expected);
        assert!(!ok);
        assert_eq!(reports.messages().len(), 1);
        assert_eq!(
            reports.messages()[0].render(),
            "Value world does not match the expected value hello"
        );
    }

    #[test]
    fn test_s2_missing_required_field() {
        let expected = Builder::object().field("a", Builder::integer(), true).build();
        let (ok, reports, _) = run(json!({}), &expected);
        assert!(!ok);
        assert_eq!(reports.messages().len(), 1);
        assert!(reports.messages()[0].render().contains('a'));
    }

    #[test]
    fn test_s3_unexpected_key_with_comment_ignore() {
        let expected = Builder::object().field("x", Builder::boolean(), true).build();
        let (ok, reports, _) = run(
            json!({"x": true, "__comment": "note", "extra": 1}),
            &expected,
        );
        assert!(!ok);
        let infos: Vec<_> = reports
            .messages()
            .iter()
            .filter(|m| m.severity == Severity::Info)
            .collect();
        let warns: Vec<_> = reports
            .messages()
            .iter()
            .filter(|m| m.severity == Severity::Warn)
            .collect();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].render().contains("__comment"));
        assert_eq!(warns.len(), 1);
        assert!(warns[0].render().contains("extra"));
    }

    #[test]
    fn test_s4_placeholder_matches_any_key() {
        let expected = Builder::object()
            .placeholder("any", Builder::string(), true)
            .build();
        let (ok, _, _) = run(json!({"any": "s1", "other": "s2"}), &expected);
        assert!(ok);

        let (ok2, reports, _) = run(json!({"any": 3}), &expected);
        assert!(!ok2);
        assert_eq!(reports.messages().len(), 1);
    }

    #[test]
    fn test_s5_branch_activation() {
        use crate::{path::Path, predicate::TargetHasValue};

        let make_expected = || {
            Builder::object().field("kind", Builder::string(), true).add_branch(
                "whenFoo",
                StdArc::new(TargetHasValue::new(
                    StdArc::new(Path::parse("@.kind").unwrap()),
                    vec![json!("foo")],
                )),
                vec![Field::new("fooData", Builder::integer(), true)],
            )
        };

        let expected = make_expected().build();
        let (ok, reports, _) = run(json!({"kind": "foo", "fooData": 7}), &expected);
        assert!(ok);
        assert!(reports
            .messages()
            .iter()
            .any(|m| m.severity == Severity::Debug && m.render().contains("whenFoo")));

        let expected = make_expected().build();
        let (ok, _, _) = run(json!({"kind": "foo"}), &expected);
        assert!(!ok);

        let expected = make_expected().build();
        let (ok, _, _) = run(json!({"kind": "bar"}), &expected);
        assert!(ok);
    }

    #[test]
    fn test_s6_mixed() {
        let expected = Builder::mixed(vec![Builder::integer(), Builder::string()]);
        let (ok, _, _) = run(json!(5), &expected);
        assert!(ok);
        let (ok, _, _) = run(json!("x"), &expected);
        assert!(ok);
        let (ok, reports, _) = run(json!(true), &expected);
        assert!(!ok);
        assert_eq!(
            reports.messages()[0].render(),
            "invalid type boolean, must have been one of: integer, string"
        );
    }

    #[test]
    fn test_nullable_short_circuits() {
        let expected = Builder::string().nullable();
        let (ok, reports, _) = run(json!(null), &expected);
        assert!(ok);
        assert!(reports.messages().is_empty());
    }

    #[test]
    fn test_array_lenient_matching() {
        let expected = Builder::array(vec![Builder::integer(), Builder::string()]);
        let (ok, reports, _) = run(json!([1, "a", 2]), &expected);
        assert!(ok);
        assert!(reports.messages().is_empty());
    }

    #[test]
    fn test_array_unexpected_element() {
        let expected = Builder::array(vec![Builder::integer()]);
        let (ok, reports, _) = run(json!([1, true]), &expected);
        assert!(!ok);
        assert_eq!(reports.messages().len(), 1);
        assert!(reports.messages()[0].render().contains("position 1"));
    }

    #[test]
    fn test_redirect_fixed_point() {
        let registry = Registry::new();
        registry
            .register("user_name", StdArc::new(Builder::string()))
            .unwrap();
        let engine = Engine::options().build_with_registry(registry);

        let via_redirect = Builder::redirect("user_name");
        let via_direct = Builder::string();

        let (arena, root_id) = Arena::from_value(json!("alice"));
        let mut r1 = VecReports::new();
        let mut s1 = TreeStats::new();
        let ok1 = engine
            .validate(&arena, root_id, &via_redirect, &mut r1, &mut s1)
            .unwrap();
        let mut r2 = VecReports::new();
        let mut s2 = TreeStats::new();
        let ok2 = engine
            .validate(&arena, root_id, &via_direct, &mut r2, &mut s2)
            .unwrap();
        assert_eq!(ok1, ok2);
    }

    #[test]
    fn test_depth_exceeded_is_a_fault() {
        let engine = Engine::options().max_depth(2).build();
        let expected = Builder::object()
            .field(
                "a",
                Builder::object()
                    .field("b", Builder::object().field("c", Builder::integer(), true).build(), true)
                    .build(),
                true,
            )
            .build();
        let (arena, root_id) = Arena::from_value(json!({"a": {"b": {"c": 1}}}));
        let mut reports = VecReports::new();
        let mut stats = TreeStats::new();
        let result = engine.validate(&arena, root_id, &expected, &mut reports, &mut stats);
        assert!(result.is_err());
    }
}
