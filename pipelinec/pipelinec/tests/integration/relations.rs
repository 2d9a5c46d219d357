use super::pipeline::{compile, compile_to_script};

const ORDERS_WITH_CUSTOMER: &str = r#"{
    "from": "t_orders",
    "steps": [
        {"type": "relate", "relation": {"as": "buyer", "relation": "r_customer", "table": "t_customers"}},
        {"type": "select", "select": [
            {"table": "t_orders", "name": "id"},
            {"table": "t_customers", "name": "name",
             "relation": {"as": "buyer", "relation": "r_customer", "table": "t_customers"}}
        ]}
    ]
}"#;

#[test]
fn test_orders_to_customers() {
    let script = compile_to_script(ORDERS_WITH_CUSTOMER);
    assert!(script.contains("join side:left buyer = (from public.customers"));
    assert!(script.contains("(this.orders__customer_id == that.buyer__id)"));

    let sql = compile(ORDERS_WITH_CUSTOMER).unwrap();
    assert!(sql.contains("LEFT JOIN"), "{sql}");
    assert!(sql.contains("buyer__name"), "{sql}");
}

#[test]
fn test_customers_to_orders() {
    // The same relation, walked from the other side.
    let json = r#"{
        "from": "t_customers",
        "steps": [
            {"type": "relate", "relation": {"as": "purchase", "relation": "r_customer", "table": "t_orders"}}
        ]
    }"#;

    let script = compile_to_script(json);
    assert!(script.contains("(this.customers__id == that.purchase__customer_id)"));
    compile(json).unwrap();
}

#[test]
fn test_chained_relations() {
    let json = r#"{
        "from": "t_orders",
        "steps": [
            {"type": "relate", "relation": {"as": "buyer", "relation": "r_customer", "table": "t_customers"}},
            {"type": "relate", "relation": {"as": "area", "relation": "r_region", "table": "t_regions",
                "on": {"relation": {"as": "buyer", "relation": "r_customer", "table": "t_customers"}}}},
            {"type": "filter", "logicalOperator": "and", "conditions": [
                {"column": {"table": "t_regions", "name": "name",
                            "relation": {"as": "area", "relation": "r_region", "table": "t_regions"}},
                 "operator": "equal", "value": "north"}
            ]}
        ]
    }"#;

    let script = compile_to_script(json);
    assert!(script.contains("(this.buyer__region_id == that.area__id)"));

    let sql = compile(json).unwrap();
    assert!(sql.contains("= 'north'"), "{sql}");
    assert!(sql.contains("area__name"), "{sql}");
}

#[test]
fn test_same_table_twice() {
    // Two aliases of one table never clash.
    let json = r#"{
        "from": "t_orders",
        "steps": [
            {"type": "relate", "relation": {"as": "buyer", "relation": "r_customer", "table": "t_customers"}},
            {"type": "relate", "relation": {"as": "payer", "relation": "r_customer", "table": "t_customers"}}
        ]
    }"#;

    let sql = compile(json).unwrap();
    assert!(sql.contains("buyer__id"), "{sql}");
    assert!(sql.contains("payer__id"), "{sql}");
}

#[test]
fn test_many_to_many() {
    let json = r#"{
        "from": "t_students",
        "steps": [
            {"type": "relate", "relation": {"as": "course", "relation": "r_enrollment", "table": "t_courses"}}
        ]
    }"#;

    let script = compile_to_script(json);
    assert!(script.contains("join side:left course_join_table = (from school.enrollments"));
    assert!(script.contains("(this.students__id == that.course_join_table__student_id)"));
    assert!(script.contains("(this.course_join_table__course_id == that.course__id)"));

    let projection = script.lines().last().unwrap();
    assert_eq!(
        projection,
        "select {this.students__id, this.students__name, this.course__id, this.course__title}"
    );

    let sql = compile(json).unwrap();
    assert_eq!(sql.matches("LEFT JOIN").count(), 2, "{sql}");
    assert!(sql.contains("course__title"), "{sql}");
}

#[test]
fn test_many_to_many_from_the_other_side() {
    let json = r#"{
        "from": "t_courses",
        "steps": [
            {"type": "relate", "relation": {"as": "student", "relation": "r_enrollment", "table": "t_students"}}
        ]
    }"#;

    let script = compile_to_script(json);
    assert!(script.contains("(this.courses__id == that.student_join_table__course_id)"));
    assert!(script.contains("(this.student_join_table__student_id == that.student__id)"));
    assert!(!script.lines().last().unwrap().contains("_join_table__"));

    compile(json).unwrap();
}
