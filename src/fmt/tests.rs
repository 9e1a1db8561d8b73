use super::{Formatter, format_sql};
use pretty_assertions::assert_eq;

fn fmt(sql: &str) -> String {
    Formatter::new().format(sql).unwrap()
}

#[test]
fn test_fmt_simple_select() {
    let expected = r#"
SELECT
    a,
    b
FROM
    t
WHERE
    x = 1 AND y = 'from'
"#;
    assert_eq!(
        fmt("select a, b from t where x = 1 and y = 'from'"),
        expected.trim()
    );
}

#[test]
fn test_fmt_keyword_literal_untouched() {
    let output = fmt("SELECT * FROM t WHERE name = 'SELECT' OR note = 'group by x'");
    assert!(output.contains("name = 'SELECT' OR note = 'group by x'"));
    assert_eq!(output.lines().count(), 6);
}

#[test]
fn test_fmt_joins_and_grouping() {
    let expected = r#"
SELECT
    a.id,
    COUNT(*) AS n
FROM
    a
LEFT JOIN b ON a.id = b.id
GROUP BY
    a.id
ORDER BY
    n DESC
LIMIT 10
"#;
    assert_eq!(
        fmt("select a.id, COUNT(*) as n from a left join b on a.id = b.id group by a.id order by n desc limit 10"),
        expected.trim()
    );
}

#[test]
fn test_fmt_subquery() {
    let expected = r#"
SELECT
    a
FROM
    (
        SELECT
            b
        FROM
            t
    ) s
WHERE
    x IN (
        SELECT
            y
        FROM
            u
    )
"#;
    assert_eq!(
        fmt("SELECT a FROM (SELECT b FROM t) s WHERE x IN (SELECT y FROM u)"),
        expected.trim()
    );
}

#[test]
fn test_fmt_case_block() {
    let expected = r#"
SELECT
    CASE
        WHEN a = 1 THEN 'x'
        WHEN a = 2 THEN 'y'
        ELSE 'z'
    END AS c
FROM
    t
"#;
    assert_eq!(
        fmt("select case when a = 1 then 'x' when a = 2 then 'y' else 'z' end as c from t"),
        expected.trim()
    );
}

#[test]
fn test_fmt_case_inside_call_stays_inline() {
    let output = fmt("SELECT COALESCE(CASE WHEN a THEN b END, 0) FROM t");
    assert!(output.contains("COALESCE(CASE WHEN a THEN b END, 0)"));
}

#[test]
fn test_fmt_window_stays_inline() {
    let output = fmt("SELECT ROW_NUMBER() OVER (PARTITION BY a ORDER BY b) AS rn FROM t");
    assert!(output.contains("ROW_NUMBER() OVER (PARTITION BY a ORDER BY b) AS rn"));
}

#[test]
fn test_fmt_create_table_columns() {
    let expected = r#"
CREATE OR REPLACE TABLE t (
    id INTEGER,
    amount NUMBER(10,2)
) COMMENT = 'x'
"#;
    assert_eq!(
        fmt("create or replace table t (id INTEGER, amount NUMBER(10,2)) comment = 'x'"),
        expected.trim()
    );
}

#[test]
fn test_fmt_comments() {
    let expected = r#"
-- header
SELECT
    a
    -- trailing
FROM
    t

    /* block */

WHERE
    b
"#;
    assert_eq!(
        fmt("-- header\nselect a -- trailing\nfrom t /* block */ where b"),
        expected.trim()
    );
}

#[test]
fn test_fmt_union_and_cte() {
    let expected = r#"
WITH x AS (
    SELECT
        1 AS a
)
SELECT
    a
FROM
    x
UNION ALL
SELECT
    2
"#;
    assert_eq!(
        fmt("with x as (select 1 as a) select a from x union all select 2"),
        expected.trim()
    );
}

#[test]
fn test_fmt_is_distinct_from_does_not_break() {
    let output = fmt("SELECT a FROM t WHERE a IS DISTINCT FROM b");
    assert!(output.ends_with("a IS DISTINCT FROM b"));
}

#[test]
fn test_fmt_indent_width() {
    let output = Formatter::with_indent(2).format("select a from t").unwrap();
    assert_eq!(output, "SELECT\n  a\nFROM\n  t");
}

#[test]
fn test_fmt_is_idempotent() {
    let inputs = [
        "select a, b from t where x = 1",
        "SELECT a FROM (SELECT b FROM t) s WHERE x IN (SELECT y FROM u)",
        "select case when a = 1 then 'x' else case when b then 'y' end end from t",
        "create or replace table t (id INTEGER, amount NUMBER(10,2))",
        "-- header\nselect a -- trailing\nfrom t /* block */ where b",
        "INSERT INTO t (a, b) VALUES (1, 'it''s')",
        "SELECT f.value FROM t CROSS JOIN LATERAL FLATTEN(input => t.xs) AS f",
    ];
    for input in inputs {
        let once = format_sql(input).unwrap();
        let twice = format_sql(&once).unwrap();
        assert_eq!(once, twice, "not idempotent for {input:?}");
    }
}

#[test]
fn test_fmt_unterminated_literal_fails() {
    assert!(format_sql("SELECT 'abc").is_err());
}
