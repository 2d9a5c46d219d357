use insta::assert_snapshot;

use pipelinec::{build_table_query, Options, TableQueryRequest};

use super::pipeline::catalog;

fn request(json: &str) -> TableQueryRequest {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_browse_with_defaults() {
    let catalog = catalog();
    let table = catalog.table(&"t_customers".into()).unwrap();

    let query = build_table_query(table, &request("{}"), &Options::default()).unwrap();
    assert_snapshot!(query.sql, @r#"SELECT * FROM "public"."customers" LIMIT 100"#);
    assert_eq!(query.discarded_result_sets, 0);
}

#[test]
fn test_browse_with_search() {
    let catalog = catalog();
    let table = catalog.table(&"t_customers".into()).unwrap();

    let query = build_table_query(
        table,
        &request(
            r#"{
                "filter": {"logicalOperator": "and", "conditions": [
                    {"column": {"table": "t_customers", "name": "name"}, "operator": "like", "value": "abc"},
                    {"column": {"table": "t_customers", "name": "region_id"}, "operator": "equal", "value": 3}
                ]},
                "order": {"order": [{"column": {"table": "t_customers", "name": "name"}, "direction": "asc"}]},
                "take": {"limit": 10, "offset": 5}
            }"#,
        ),
        &Options::default(),
    )
    .unwrap();

    assert_snapshot!(query.sql, @r#"PREPARE table_query(text) AS SELECT * FROM "public"."customers" WHERE "name" LIKE $1 AND "region_id" = 3 ORDER BY "name" LIMIT 10 OFFSET 5; EXECUTE table_query($1)"#);
    assert_eq!(query.params, ["%abc%"]);
    assert_eq!(query.discarded_result_sets, 1);
}
