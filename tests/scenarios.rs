use serde_json::json;
use std::sync::Arc;
use structural_validator::{
    path::Path,
    predicate::TargetHasValue,
    report::Severity,
    schema::{Builder, Field},
    validate_from_str_default,
};

#[test]
fn s1_scalar_literal_mismatch_reports_a_single_warning() {
    let expected = Builder::string_eq("hello");
    let (ok, reports, _) = validate_from_str_default(r#""world""#, &expected).unwrap();
    assert!(!ok);
    assert_eq!(reports.messages().len(), 1);
    assert_eq!(
        reports.messages()[0].render(),
        "Value world does not match the expected value hello"
    );
}

#[test]
fn s1_scalar_literal_match_is_silent() {
    let expected = Builder::string_eq("hello");
    let (ok, reports, _) = validate_from_str_default(r#""hello""#, &expected).unwrap();
    assert!(ok);
    assert!(reports.messages().is_empty());
}

#[test]
fn s2_missing_required_field_fails_with_one_error() {
    let expected = Builder::object().field("a", Builder::integer(), true).build();
    let (ok, reports, _) = validate_from_str_default("{}", &expected).unwrap();
    assert!(!ok);
    assert_eq!(reports.messages().len(), 1);
    assert_eq!(reports.messages()[0].severity, Severity::Error);
    assert!(reports.messages()[0].render().contains('a'));
}

#[test]
fn s3_unexpected_key_warns_while_comment_is_globally_ignored() {
    let expected = Builder::object().field("x", Builder::boolean(), true).build();
    let (ok, reports, _) = validate_from_str_default(
        r#"{"x": true, "__comment": "why this field exists", "extra": 1}"#,
        &expected,
    )
    .unwrap();
    assert!(!ok);

    let infos: Vec<_> = reports
        .messages()
        .iter()
        .filter(|m| m.severity == Severity::Info)
        .collect();
    assert_eq!(infos.len(), 1);
    assert!(infos[0].render().contains("__comment"));

    let warns: Vec<_> = reports
        .messages()
        .iter()
        .filter(|m| m.severity == Severity::Warn)
        .collect();
    assert_eq!(warns.len(), 1);
    assert!(warns[0].render().contains("extra"));
    assert!(!warns[0].render().contains("__comment"));
}

#[test]
fn s4_placeholder_absorbs_any_conforming_key() {
    let expected = Builder::object()
        .placeholder("anyStringField", Builder::string(), true)
        .build();

    let (ok, reports, stats) =
        validate_from_str_default(r#"{"one": "a", "two": "b"}"#, &expected).unwrap();
    assert!(ok);
    assert!(reports.messages().is_empty());
    assert_eq!(stats.get("types.string"), 2);

    let (ok, reports, _) = validate_from_str_default(r#"{"one": 1}"#, &expected).unwrap();
    assert!(!ok);
    assert_eq!(reports.messages().len(), 1);
}

#[test]
fn s5_branch_activates_on_discriminator_and_adds_required_field() {
    let build = || {
        Builder::object()
            .field("kind", Builder::string(), true)
            .add_branch(
                "whenFoo",
                Arc::new(TargetHasValue::new(
                    Arc::new(Path::parse("@.kind").unwrap()),
                    vec![json!("foo")],
                )),
                vec![Field::new("fooData", Builder::integer(), true)],
            )
            .build()
    };

    let (ok, reports, _) =
        validate_from_str_default(r#"{"kind": "foo", "fooData": 9}"#, &build()).unwrap();
    assert!(ok);
    assert!(reports
        .messages()
        .iter()
        .any(|m| m.severity == Severity::Debug && m.render().contains("whenFoo")));

    let (ok, _, _) = validate_from_str_default(r#"{"kind": "foo"}"#, &build()).unwrap();
    assert!(!ok, "fooData is required once the branch activates");

    let (ok, _, _) = validate_from_str_default(r#"{"kind": "bar"}"#, &build()).unwrap();
    assert!(ok, "fooData is not required when the branch never activates");
}

#[test]
fn s6_mixed_accepts_any_alternative_and_reports_the_full_set_on_mismatch() {
    let expected = Builder::mixed(vec![Builder::integer(), Builder::string()]);

    let (ok, _, _) = validate_from_str_default("5", &expected).unwrap();
    assert!(ok);
    let (ok, _, _) = validate_from_str_default(r#""five""#, &expected).unwrap();
    assert!(ok);

    let (ok, reports, _) = validate_from_str_default("true", &expected).unwrap();
    assert!(!ok);
    assert_eq!(
        reports.messages()[0].render(),
        "invalid type boolean, must have been one of: integer, string"
    );
}

#[test]
fn s7_path_traversal_resolves_absolute_and_relative_forms_to_the_same_node() {
    use structural_validator::value::{Arena, Kind};

    let (arena, root_id) = Arena::from_value(json!({"outer": {"inner": {"leaf": 1}}}));
    let absolute = Path::parse("$.outer.inner.leaf").unwrap();
    let via_root = structural_validator::path::find(&arena, &absolute, root_id).unwrap();
    assert_eq!(arena.get(via_root).raw(), &json!(1));

    let Kind::Root(obj_id) = *arena.get(root_id).kind() else {
        panic!("expected a root wrapper")
    };
    let Kind::Object(top_fields) = arena.get(obj_id).kind() else {
        panic!("expected an object")
    };
    let outer_id = top_fields.iter().find(|(k, _)| k == "outer").unwrap().1;
    let Kind::Object(outer_fields) = arena.get(outer_id).kind() else {
        panic!("expected an object")
    };
    let inner_id = outer_fields.iter().find(|(k, _)| k == "inner").unwrap().1;

    let relative = Path::parse("@^.inner.leaf").unwrap();
    let via_relative = structural_validator::path::find(&arena, &relative, inner_id).unwrap();
    assert_eq!(via_relative, via_root);
}

#[test]
fn nested_object_validation_reports_depth_first() {
    let expected = Builder::object()
        .field(
            "user",
            Builder::object()
                .field("name", Builder::string(), true)
                .field("age", Builder::integer(), true)
                .build(),
            true,
        )
        .build();

    let (ok, reports, stats) =
        validate_from_str_default(r#"{"user": {"name": "alice", "age": "thirty"}}"#, &expected)
            .unwrap();
    assert!(!ok);
    assert_eq!(reports.messages().len(), 1);
    assert_eq!(stats.get("keys.name"), 1);
}
