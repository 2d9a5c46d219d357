use insta::assert_snapshot;

use pipelinec::{validate, CompileError, Options, Pipeline, Reason};

use super::pipeline::{catalog, compile};

#[test]
fn test_lookup_errors() {
    let err = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "relate", "relation": {"as": "x", "relation": "r_missing", "table": "t_customers"}}
            ]
        }"#,
    )
    .unwrap_err();

    let CompileError::Pipeline(error) = &err else {
        panic!("expected a pipeline error, got {err}");
    };
    assert!(matches!(
        &error.reason,
        Reason::NotFound { name, namespace } if name == "r_missing" && namespace == "relation"
    ));
}

#[test]
fn test_unsupported_input() {
    let err = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "filter", "logicalOperator": "and", "conditions": [
                    {"column": {"table": "t_orders", "name": "total"}, "operator": "between", "value": 1}
                ]}
            ]
        }"#,
    )
    .unwrap_err();

    let messages = err.into_messages();
    assert_eq!(messages.inner.len(), 1);
    assert!(messages.inner[0].reason.starts_with("unexpected pipeline document:"));
}

#[test]
fn test_downstream_errors_are_kept() {
    // The aggregate drops `orders__total`, so the select after it refers to a
    // column the downstream compiler cannot find.
    let err = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "aggregate", "operation": "count", "column": {"table": "t_orders", "name": "id"}, "as": "n"},
                {"type": "select", "select": [{"table": "t_orders", "name": "total"}]}
            ]
        }"#,
    )
    .unwrap_err();

    let CompileError::Script(messages) = &err else {
        panic!("expected downstream diagnostics, got {err}");
    };
    assert!(!messages.inner.is_empty());
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_validate_before_compile() {
    let pipeline = Pipeline::from_json(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "filter", "logicalOperator": "and", "conditions": [
                    {"column": {"table": "t_orders", "name": "total"}, "operator": "like", "value": "1"}
                ]},
                {"type": "aggregate", "operation": "sum", "column": {"table": "t_orders", "name": "status"}, "as": "s"}
            ]
        }"#,
    )
    .unwrap();

    let errors = validate(&pipeline, &catalog()).unwrap_err();
    assert_snapshot!(errors.to_string(), @r"
    Error: `like` needs a text column, but `total` is float
    ↳ Hint: compare with `equal` instead
    Error: `sum` needs a numeric column, but `status` is string
    ");

    let messages = pipelinec::to_messages(errors);
    assert_eq!(messages.inner.len(), 2);

    // The compiler itself does not enforce these.
    pipelinec::compile_to_script(&pipeline, &catalog()).unwrap();
}

#[test]
fn test_plain_display() {
    let err = pipelinec::script_to_sql("from x | select {", &Options::default()).unwrap_err();
    let display = err.inner[0].display.clone().unwrap_or_default();
    assert!(!display.contains('\u{1b}'), "{display}");
}
