use pipelinec::{Catalog, CompileError, Dialect, Options, Pipeline};

/// A shop database: orders placed by customers in regions, and students
/// enrolled in courses.
pub(crate) fn catalog() -> Catalog {
    serde_json::from_str(
        r#"{
            "tables": [
                {"id": "t_orders", "external_name": "orders", "schema": "public", "database_id": "shop"},
                {"id": "t_customers", "external_name": "customers", "schema": "public", "database_id": "shop"},
                {"id": "t_regions", "external_name": "regions", "schema": "public", "database_id": "shop"},
                {"id": "t_students", "external_name": "students", "schema": "school", "database_id": "shop"},
                {"id": "t_courses", "external_name": "courses", "schema": "school", "database_id": "shop"},
                {"id": "t_enrollments", "external_name": "enrollments", "schema": "school", "database_id": "shop"}
            ],
            "relations": [
                {"id": "r_customer", "type": "one_to_many",
                 "table_1": "t_customers", "column_1": "id", "table_2": "t_orders", "column_2": "customer_id"},
                {"id": "r_region", "type": "one_to_many",
                 "table_1": "t_regions", "column_1": "id", "table_2": "t_customers", "column_2": "region_id"},
                {"id": "r_enrollment", "type": "many_to_many",
                 "table_1": "t_students", "column_1": "id", "table_2": "t_courses", "column_2": "id",
                 "join_table": "t_enrollments", "join_column_1": "student_id", "join_column_2": "course_id"}
            ],
            "columns": {
                "t_orders": [
                    {"name": "id", "type": "number", "is_identity": true},
                    {"name": "total", "type": "float", "is_nullable": true},
                    {"name": "status", "type": "string"},
                    {"name": "customer_id", "type": "number"}
                ],
                "t_customers": [
                    {"name": "id", "type": "number", "is_identity": true},
                    {"name": "name", "type": "string"},
                    {"name": "region_id", "type": "number", "is_nullable": true}
                ],
                "t_regions": [
                    {"name": "id", "type": "number", "is_identity": true},
                    {"name": "name", "type": "string"}
                ],
                "t_students": [
                    {"name": "id", "type": "number", "is_identity": true},
                    {"name": "name", "type": "string"}
                ],
                "t_courses": [
                    {"name": "id", "type": "number", "is_identity": true},
                    {"name": "title", "type": "string"}
                ],
                "t_enrollments": [
                    {"name": "student_id", "type": "number"},
                    {"name": "course_id", "type": "number"}
                ]
            }
        }"#,
    )
    .unwrap()
}

pub(crate) fn compile(json: &str) -> Result<String, CompileError> {
    let pipeline = Pipeline::from_json(json)?;
    pipelinec::compile(&pipeline, &catalog(), &Options::default())
}

pub(crate) fn compile_to_script(json: &str) -> String {
    let pipeline = Pipeline::from_json(json).unwrap();
    pipelinec::compile_to_script(&pipeline, &catalog()).unwrap()
}

const ORDERS: &str = r#"{
    "from": "t_orders",
    "steps": [
        {"type": "select", "select": [
            {"table": "t_orders", "name": "id"},
            {"table": "t_orders", "name": "total"}
        ]},
        {"type": "filter", "logicalOperator": "and", "conditions": [
            {"column": {"table": "t_orders", "name": "total"}, "operator": "greater_than", "value": 100}
        ]},
        {"type": "take", "limit": 10}
    ]
}"#;

#[test]
fn test_orders() {
    let sql = compile(ORDERS).unwrap();

    assert!(sql.contains("orders__id"), "{sql}");
    assert!(sql.contains("orders__total"), "{sql}");
    assert!(sql.contains("> 100"), "{sql}");
    assert!(sql.contains("LIMIT 10"), "{sql}");
}

#[test]
fn test_deterministic() {
    assert_eq!(compile(ORDERS).unwrap(), compile(ORDERS).unwrap());
    assert_eq!(compile_to_script(ORDERS), compile_to_script(ORDERS));
}

#[test]
fn test_final_projection() {
    let script = compile_to_script(ORDERS);
    assert!(script.ends_with("from step_3\nselect {this.orders__id, this.orders__total}\n"));
}

#[test]
fn test_no_steps() {
    let sql = compile(r#"{"from": "t_regions"}"#).unwrap();
    assert!(sql.contains("regions__id"), "{sql}");
    assert!(sql.contains("regions__name"), "{sql}");
    assert!(sql.contains("public.regions"), "{sql}");
}

#[test]
fn test_pagination() {
    let sql = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "order", "order": [{"column": {"table": "t_orders", "name": "total"}, "direction": "desc"}]},
                {"type": "take", "limit": 10, "offset": 20}
            ]
        }"#,
    )
    .unwrap();

    assert!(sql.contains("DESC"), "{sql}");
    assert!(sql.contains("LIMIT 10"), "{sql}");
    assert!(sql.contains("OFFSET 20"), "{sql}");
}

#[test]
fn test_aggregate() {
    let sql = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "aggregate", "group": [{"table": "t_orders", "name": "status"}],
                 "operation": "sum", "column": {"table": "t_orders", "name": "total"}, "as": "total_sales"}
            ]
        }"#,
    )
    .unwrap();

    assert!(sql.contains("SUM("), "{sql}");
    assert!(sql.contains("total_sales"), "{sql}");
    assert!(sql.contains("GROUP BY"), "{sql}");
}

#[test]
fn test_filter_operators() {
    let sql = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "filter", "logicalOperator": "or", "conditions": [
                    {"column": {"table": "t_orders", "name": "status"}, "operator": "like", "value": "pai"},
                    {"column": {"table": "t_orders", "name": "status"}, "operator": "equal", "value": "it's new"},
                    {"column": {"table": "t_orders", "name": "total"}, "operator": "is_null"}
                ]}
            ]
        }"#,
    )
    .unwrap();

    assert!(sql.contains("LIKE '%pai%'"), "{sql}");
    assert!(sql.contains("= 'it''s new'"), "{sql}");
    assert!(sql.contains("IS NULL"), "{sql}");
    assert!(sql.contains(" OR "), "{sql}");
}

#[test]
fn test_dialect() {
    let pipeline = Pipeline::from_json(
        r#"{"from": "t_orders", "steps": [{"type": "take", "limit": 3}]}"#,
    )
    .unwrap();

    let options = Options::default().with_dialect(Dialect::MsSql);
    let sql = pipelinec::compile(&pipeline, &catalog(), &options).unwrap();
    assert!(!sql.contains("LIMIT"), "{sql}");
}

#[test]
fn test_filter_text_is_kept_verbatim() {
    let sql = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "filter", "logicalOperator": "or", "conditions": [
                    {"column": {"table": "t_orders", "name": "status"}, "operator": "equal", "value": "C:\\path\\x"},
                    {"column": {"table": "t_orders", "name": "status"}, "operator": "like", "value": "a\\nb"},
                    {"column": {"table": "t_orders", "name": "status"}, "operator": "equal", "value": "say \"hi\" {x} it's \\"}
                ]}
            ]
        }"#,
    )
    .unwrap();

    assert!(sql.contains(r#"= 'C:\path\x'"#), "{sql}");
    assert!(sql.contains(r#"LIKE '%a\nb%'"#), "{sql}");
    assert!(sql.contains(r#"= 'say "hi" {x} it''s \'"#), "{sql}");
}

#[test]
fn test_take_out_of_bounds() {
    let err = compile(
        r#"{
            "from": "t_orders",
            "steps": [{"type": "take", "limit": 18446744073709551615, "offset": 5}]
        }"#,
    )
    .unwrap_err();

    let CompileError::Pipeline(error) = &err else {
        panic!("expected a pipeline error, got {err}");
    };
    assert_eq!(error.reason.to_string(), "take range is out of bounds");
}

#[test]
fn test_large_integer_literal() {
    let sql = compile(
        r#"{
            "from": "t_orders",
            "steps": [
                {"type": "filter", "logicalOperator": "and", "conditions": [
                    {"column": {"table": "t_orders", "name": "id"}, "operator": "less_than", "value": 18446744073709551615}
                ]}
            ]
        }"#,
    )
    .unwrap();

    assert!(sql.contains("< 18446744073709551615"), "{sql}");
}
