//! End-to-end behaviour of the conversion pipeline.

use pretty_assertions::assert_eq;
use sqlport::prelude::*;

fn unformatted(catalog: TableCatalog) -> Converter {
    Converter::new(catalog).format(false)
}

#[test]
fn test_formatting_converted_output_again_changes_nothing() {
    let catalog = TableCatalog::new()
        .with_table("raw_events", "analytics.events")
        .with_table("users", "analytics.users");
    let script = "select e.id, collect_list(nvl(e.x, 0)) as xs, case when u.vip then 'SELECT' else 'no' end as tier \
                  from raw_events e join users u on e.uid = u.id \
                  where e.day >= '2024-01-01' group by e.id, u.vip order by e.id;";

    let once = sqlport::convert(script, catalog.clone()).unwrap();
    let twice = sqlport::convert(&once.text, catalog).unwrap();
    assert_eq!(once.text, twice.text);
    assert!(twice.warnings.is_empty());
}

#[test]
fn test_keyword_literals_are_never_touched() {
    let catalog = TableCatalog::new().with_table("t", "t");
    let result = sqlport::convert(
        "SELECT nvl(a, 'nvl(b, 1)') FROM t WHERE name = 'SELECT' AND note = 'from x join y';",
        catalog,
    )
    .unwrap();

    assert!(result.text.contains("COALESCE(a, 'nvl(b, 1)')"));
    assert!(result.text.contains("name = 'SELECT' AND note = 'from x join y'"));
    for line in result.text.lines() {
        assert!(!line.trim_start().starts_with("x join"), "break inside literal: {line}");
    }
}

#[test]
fn test_split_ignores_semicolons_in_literals() {
    let statements = split("INSERT INTO t VALUES ('a;b'); SELECT 1;").unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].text, "INSERT INTO t VALUES ('a;b');");
    assert_eq!(statements[1].text, "SELECT 1;");
}

#[test]
fn test_nested_calls_rewrite_inner_and_outer() {
    let catalog = TableCatalog::new().with_table("t", "t");
    let result = unformatted(catalog)
        .convert("SELECT collect_list(nvl(x, 0)) FROM t;")
        .unwrap();
    assert_eq!(result.text, "SELECT ARRAY_AGG(COALESCE(x, 0)) FROM t;");
}

#[test]
fn test_unmapped_table_passes_through_with_one_warning() {
    let result = unformatted(TableCatalog::new())
        .convert("SELECT * FROM raw_events;")
        .unwrap();
    assert_eq!(result.text, "SELECT * FROM raw_events;");
    let table_warnings: Vec<&Warning> = result.warnings_in(WarningCategory::TableMapping).collect();
    assert_eq!(table_warnings.len(), 1);
    assert!(table_warnings[0].message.contains("no mapping found"));
}

#[test]
fn test_mapped_table_is_replaced_without_warnings() {
    let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
    let result = unformatted(catalog)
        .convert("SELECT * FROM raw_events;")
        .unwrap();
    assert_eq!(result.text, "SELECT * FROM analytics.events;");
    assert!(result.warnings.is_empty());
}

#[test]
fn test_insert_overwrite_becomes_truncate_then_insert() {
    let result = unformatted(TableCatalog::new())
        .convert("INSERT OVERWRITE TABLE t SELECT * FROM s;")
        .unwrap();
    let statements = split(&result.text).unwrap();
    let texts: Vec<&str> = statements.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["TRUNCATE TABLE t;", "INSERT INTO t SELECT * FROM s;"]);
    assert_eq!(result.statements, 2);
}

#[test]
fn test_unterminated_literal_is_fatal() {
    let err = sqlport::convert("SELECT 'abc", TableCatalog::new()).unwrap_err();
    assert_eq!(err.offset(), Some(7));
    assert!(split("SELECT 'abc").is_err());
}

#[test]
fn test_hive_ddl_converts_to_warehouse_ddl() {
    let script = "CREATE EXTERNAL TABLE IF NOT EXISTS raw_events (\n\
                  id BIGINT COMMENT 'event id',\n\
                  payload STRING,\n\
                  tags ARRAY<STRING>\n\
                  )\n\
                  PARTITIONED BY (dt STRING)\n\
                  STORED AS ORC\n\
                  LOCATION 'hdfs:///warehouse/raw_events';";
    let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
    let result = Converter::new(catalog).convert(script).unwrap();

    assert!(result.text.starts_with("CREATE OR REPLACE TABLE analytics.events ("));
    assert!(result.text.contains("payload VARCHAR"));
    assert!(result.text.contains("tags ARRAY"));
    assert!(result.text.contains("dt VARCHAR"));
    assert!(!result.text.contains("STORED AS"));
    assert!(!result.text.contains("hdfs://"));
    assert_eq!(result.warnings_in(WarningCategory::Unconverted).count(), 0);
    assert!(result.warnings_in(WarningCategory::DdlRestructure).count() >= 3);
}

#[test]
fn test_lateral_view_becomes_flatten() {
    let catalog = TableCatalog::new().with_table("orders", "sales.orders");
    let result = unformatted(catalog)
        .convert("SELECT o.id, item FROM orders o LATERAL VIEW explode(o.items) e AS item;")
        .unwrap();
    assert!(result.text.contains("CROSS JOIN LATERAL FLATTEN(input => o.items)"));
    assert!(!result.text.contains("LATERAL VIEW"));
    assert_eq!(result.warnings_in(WarningCategory::Unconverted).count(), 0);
}

#[test]
fn test_comments_survive_conversion() {
    let catalog = TableCatalog::new().with_table("t", "t");
    let result = unformatted(catalog)
        .convert("-- daily load\nSELECT a /* keep */ FROM t;")
        .unwrap();
    assert!(result.text.contains("-- daily load"));
    assert!(result.text.contains("/* keep */"));
}

#[test]
fn test_every_table_in_from_list_is_mapped() {
    let catalog = TableCatalog::new().with_table("a", "db.a").with_table("b", "db.b");
    let result = unformatted(catalog)
        .convert("SELECT * FROM a, b WHERE a.id = b.id;")
        .unwrap();
    assert_eq!(result.text, "SELECT * FROM db.a, db.b WHERE a.id = b.id;");
    assert!(result.warnings.is_empty());

    let result = unformatted(TableCatalog::new())
        .convert("SELECT * FROM a, b WHERE a.id = b.id;")
        .unwrap();
    assert_eq!(result.warnings_in(WarningCategory::TableMapping).count(), 2);
}

#[test]
fn test_date_sub_keeps_compound_offsets_intact() {
    let catalog = TableCatalog::new().with_table("t", "t");
    let result = unformatted(catalog)
        .convert("SELECT date_sub(d, -x + 1) FROM t;")
        .unwrap();
    assert_eq!(result.text, "SELECT DATEADD(DAY, -(-x + 1), d) FROM t;");
}
