//! Field type conversion and schema compatibility through the public API.

mod common;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use wit_core::WitError;
use wit_core::model::{
    CodebaseContent, EnumType, FieldDefinition, FieldType, FieldValue, Kind, MarkupContent,
    MarkupLanguage, WorkItemType,
};

#[test]
fn list_of_integers_converts_numeric_strings() {
    let _log = common::test_log("list_of_integers_converts_numeric_strings");
    let list = FieldType::list(Kind::Integer);

    let stored = list
        .convert_to_model(&FieldValue::from(vec!["1", "2", "3"]))
        .unwrap();
    assert_eq!(stored, json!([1, 2, 3]));

    let err = list
        .convert_to_model(&FieldValue::from(vec!["1", "2", "3.5"]))
        .unwrap_err();
    assert!(
        matches!(err, WitError::ListElement { index: 2, .. }),
        "{err}"
    );
}

#[test]
fn enum_accepts_only_allowed_values() {
    let _log = common::test_log("enum_accepts_only_allowed_values");
    let priority = FieldType::enumeration(Kind::Integer, [1_i64, 2, 3]).unwrap();

    assert_eq!(
        priority.convert_to_model(&FieldValue::Integer(2)).unwrap(),
        json!(2)
    );
    assert!(matches!(
        priority.convert_to_model(&FieldValue::Integer(4)),
        Err(WitError::NotInEnum { .. })
    ));
    assert!(matches!(
        priority.convert_to_model(&FieldValue::from("2x")),
        Err(WitError::TypeMismatch { .. })
    ));
    // Null falls back to the first allowed value.
    assert_eq!(priority.convert_to_model(&FieldValue::Null).unwrap(), json!(1));
}

#[test]
fn enum_enclosing_is_a_superset_check() {
    let _log = common::test_log("enum_enclosing_is_a_superset_check");
    let small = EnumType::new(Kind::String, ["open", "closed"]).unwrap();
    let large = EnumType::new(Kind::String, ["open", "closed", "blocked"]).unwrap();
    let other_base = EnumType::new(Kind::Label, ["open", "closed", "blocked"]).unwrap();

    assert!(small.equal_enclosing(&small));
    assert!(large.equal_enclosing(&small));
    assert!(!small.equal_enclosing(&large));
    assert!(!other_base.equal_enclosing(&small));
    assert!(!large.clone().rewritable(true).equal_enclosing(&small));

    // Rewritable enums may drop values on both sides.
    let old = small.rewritable(true);
    let new = EnumType::new(Kind::String, ["todo"]).unwrap().rewritable(true);
    assert!(new.equal_value(&old));
}

#[test]
fn structured_kinds_keep_their_stored_shape() {
    let _log = common::test_log("structured_kinds_keep_their_stored_shape");
    let markup = FieldType::simple(Kind::Markup);
    let stored = markup
        .convert_to_model(&FieldValue::Markup(MarkupContent::new(
            "**hi**",
            MarkupLanguage::Markdown,
        )))
        .unwrap();
    assert_eq!(stored["content"], json!("**hi**"));
    assert_eq!(stored["markup"], json!("Markdown"));

    let codebase = FieldType::simple(Kind::Codebase);
    let value = FieldValue::Codebase(
        CodebaseContent::new("https://github.com/example/repo.git")
            .with_branch("main")
            .with_file("src/lib.rs", 12),
    );
    let stored = codebase.convert_to_model(&value).unwrap();
    assert!(stored.is_object());
    assert_eq!(codebase.convert_from_model(&stored).unwrap(), value);

    let instant = FieldType::simple(Kind::Instant);
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let stored = instant.convert_to_model(&FieldValue::Instant(at)).unwrap();
    assert!(stored.is_i64());
    assert_eq!(
        instant.convert_from_model(&stored).unwrap(),
        FieldValue::Instant(at)
    );
}

#[test]
fn required_fields_reject_blank_and_missing_values() {
    let _log = common::test_log("required_fields_reject_blank_and_missing_values");
    let title = FieldDefinition::new(FieldType::simple(Kind::String), true);

    assert!(matches!(
        title.convert_to_model("system_title", &FieldValue::from("  ")),
        Err(WitError::RequiredField { .. })
    ));
    assert!(matches!(
        title.convert_to_model("system_title", &FieldValue::Null),
        Err(WitError::RequiredField { .. })
    ));
    assert!(matches!(
        title.convert_from_model("system_title", &Value::Null),
        Err(WitError::RequiredField { .. })
    ));

    let err = title
        .convert_to_model("system_title", &FieldValue::Integer(3))
        .unwrap_err();
    assert!(err.to_string().contains("system_title"), "{err}");
}

#[test]
fn system_template_round_trips_a_full_item() {
    let _log = common::test_log("system_template_round_trips_a_full_item");
    let task = WorkItemType::with_system_fields("task");
    task.validate().unwrap();

    let fields = common::fixtures::fields(&[
        ("system_title", "Fix login".into()),
        ("system_state", "open".into()),
        ("system_labels", vec!["bug", "ui"].into()),
        ("system_order", FieldValue::Float(1.5)),
        ("not_declared", "dropped".into()),
    ]);
    let document = task.convert_to_model(&fields).unwrap();
    assert!(!document.contains_key("not_declared"));
    assert_eq!(document["system_labels"], json!(["bug", "ui"]));

    let back = task.convert_from_model(&document).unwrap();
    assert_eq!(back["system_title"], FieldValue::from("Fix login"));
    assert_eq!(back["system_order"], FieldValue::Float(1.5));
    assert_eq!(back["system_area"], FieldValue::Null);
}

#[test]
fn type_extension_inherits_and_checks_fields() {
    let _log = common::test_log("type_extension_inherits_and_checks_fields");
    let base = common::fixtures::story();

    let child = WorkItemType::new("epic")
        .with_field(
            "business_value",
            FieldDefinition::new(FieldType::simple(Kind::Float), false),
        )
        .extend(&base)
        .unwrap();
    assert_eq!(child.extended_type_id, Some(base.id));
    assert!(child.field("system_title").is_some());
    assert!(child.field("business_value").is_some());

    let conflicting = WorkItemType::new("epic")
        .with_field(
            "points",
            FieldDefinition::new(FieldType::simple(Kind::String), false),
        )
        .extend(&base)
        .unwrap_err();
    assert!(matches!(conflicting, WitError::Incompatible { ref field, .. } if field == "points"));
}

#[test]
fn evolution_may_only_widen() {
    let _log = common::test_log("evolution_may_only_widen");
    let old = WorkItemType::new("task").with_field(
        "status",
        FieldDefinition::new(
            FieldType::enumeration(Kind::String, ["open", "done"]).unwrap(),
            false,
        ),
    );

    let widened = old.clone().with_field(
        "status",
        FieldDefinition::new(
            FieldType::enumeration(Kind::String, ["open", "done", "wontfix"]).unwrap(),
            false,
        ),
    );
    widened.check_evolution(&old).unwrap();

    let narrowed = old.clone().with_field(
        "status",
        FieldDefinition::new(
            FieldType::enumeration(Kind::String, ["open"]).unwrap(),
            false,
        ),
    );
    assert!(narrowed.check_evolution(&old).is_err());

    let mut removed = old.clone();
    removed.fields.clear();
    assert!(matches!(
        removed.check_evolution(&old),
        Err(WitError::Incompatible { .. })
    ));
}

#[test]
fn cross_type_conversion_reshapes_lists() {
    let _log = common::test_log("cross_type_conversion_reshapes_lists");
    let labels = FieldType::list(Kind::Label);
    let label = FieldType::simple(Kind::Label);

    assert_eq!(
        label
            .convert_to_model_with_type(&labels, &json!("bug"))
            .unwrap(),
        json!(["bug"])
    );
    assert_eq!(
        labels
            .convert_to_model_with_type(&label, &json!(["bug"]))
            .unwrap(),
        json!("bug")
    );
    assert!(matches!(
        labels.convert_to_model_with_type(&label, &json!(["bug", "ui"])),
        Err(WitError::TypeConversion { .. })
    ));

    let text = FieldType::simple(Kind::String);
    let number = FieldType::simple(Kind::Integer);
    assert_eq!(
        text.convert_to_model_with_type(&number, &json!("42"))
            .unwrap(),
        json!(42)
    );
    assert!(text
        .convert_to_model_with_type(&number, &json!("forty-two"))
        .is_err());
}

#[test]
fn definitions_deserialize_from_yaml() {
    let _log = common::test_log("definitions_deserialize_from_yaml");
    let yaml = r"
name: incident
fields:
  system_title:
    type:
      kind: string
    required: true
  severity:
    type:
      kind: enum
      base_type:
        kind: string
      values: [sev1, sev2, sev3]
      default_value: sev3
  watchers:
    type:
      kind: list
      component_type:
        kind: user
";
    let incident: WorkItemType = serde_yaml::from_str(yaml).unwrap();
    incident.validate().unwrap();
    assert_eq!(incident.version, 1);
    assert!(incident.can_construct);
    let severity = &incident.field("severity").unwrap().field_type;
    assert_eq!(severity.default_value(), Some(&json!("sev3")));
    assert_eq!(
        incident.field("watchers").unwrap().field_type.kind(),
        Kind::List
    );
}

#[test]
fn declared_values_are_stored_in_written_form() {
    let _log = common::test_log("declared_values_are_stored_in_written_form");
    let yaml = r"
kind: enum
base_type:
  kind: float
values: [1, 2.5]
default_value: 1
";
    let points: FieldType = serde_yaml::from_str(yaml).unwrap();
    points.validate().unwrap();
    assert_eq!(points.default_value(), Some(&json!(1.0)));
    assert_eq!(
        points.convert_to_model(&FieldValue::Integer(1)).unwrap(),
        json!(1.0)
    );
    assert_eq!(
        points.convert_to_model(&FieldValue::Float(2.5)).unwrap(),
        json!(2.5)
    );
    assert!(matches!(
        points.convert_to_model(&FieldValue::Integer(2)),
        Err(WitError::NotInEnum { .. })
    ));

    // The same values written as floats give an equal type.
    let written_as_floats: FieldType =
        serde_yaml::from_str("kind: enum\nbase_type:\n  kind: float\nvalues: [1.0, 2.5]\n")
            .unwrap();
    assert!(written_as_floats.equal_value(&points));
}

#[test]
fn unwritable_declared_values_fail_validation() {
    let _log = common::test_log("unwritable_declared_values_fail_validation");
    for yaml in [
        "kind: enum\nbase_type:\n  kind: url\nvalues: [\"not a url\"]\n",
        "kind: url\ndefault_value: nope\n",
        "kind: enum\nbase_type:\n  kind: integer\nvalues: [1, 2.5]\n",
        "kind: list\ncomponent_type:\n  kind: boolean\ndefault_value: [true, maybe]\n",
    ] {
        let field_type: FieldType = serde_yaml::from_str(yaml).unwrap();
        let err = field_type.validate().unwrap_err();
        assert!(
            matches!(err, WitError::InvalidFieldType { .. }),
            "{yaml}: {err}"
        );
    }

    let enum_of_urls: FieldType = serde_yaml::from_str(
        "kind: enum\nbase_type:\n  kind: url\nvalues: [\"https://example.org/a\"]\n",
    )
    .unwrap();
    enum_of_urls.validate().unwrap();
    assert_eq!(
        enum_of_urls
            .convert_to_model(&"https://example.org/a".into())
            .unwrap(),
        json!("https://example.org/a")
    );
}
