//! DML restructuring: INSERT OVERWRITE, CTE-first inserts and the
//! Hive-only query clauses.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tables::TABLE_IDENT;
use crate::scanner::Statement;
use crate::scanner::segment::{COMMENT_PATTERN, GuardedSql};
use crate::transformer::calls::{depth_at, is_word_byte, matching_paren};
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

static LEADING: Lazy<Regex> = Lazy::new(|| pattern(&format!(r"^(?:\s|{COMMENT_PATTERN})*")));

static COMMENTS: Lazy<Regex> = Lazy::new(|| pattern(COMMENT_PATTERN));

static WITH_START: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^WITH\b"));

static INSERT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\bINSERT\s+(?:OVERWRITE|INTO)\b"));

static INSERT_HEAD: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?is)^INSERT\s+(OVERWRITE|INTO)\s+(?:(?:TABLE|INTO)\s+)?({TABLE_IDENT})"
    ))
});

static PARTITION: Lazy<Regex> = Lazy::new(|| pattern(r"(?is)^\s*PARTITION\s*\("));

static IF_NOT_EXISTS: Lazy<Regex> = Lazy::new(|| pattern(r"(?is)^\s*IF\s+NOT\s+EXISTS\b"));

/// `INSERT OVERWRITE|INTO [TABLE] t [PARTITION (..)] [IF NOT EXISTS]`.
#[derive(Debug)]
struct InsertHeader<'a> {
    overwrite: bool,
    table: &'a str,
    partition: Option<&'a str>,
    if_not_exists: bool,
    len: usize,
}

impl<'a> InsertHeader<'a> {
    fn parse(code: &'a str) -> Option<Self> {
        let caps = INSERT_HEAD.captures(code)?;
        let mut len = caps.get(0)?.end();
        let mut partition = None;

        if let Some(m) = PARTITION.find(&code[len..]) {
            let open = len + m.end() - 1;
            let close = matching_paren(code, open)?;
            partition = Some(&code[open + 1..close]);
            len = close + 1;
        }
        let if_not_exists = match IF_NOT_EXISTS.find(&code[len..]) {
            Some(m) => {
                len += m.end();
                true
            }
            None => false,
        };

        Some(Self {
            overwrite: caps[1].eq_ignore_ascii_case("overwrite"),
            table: caps.get(2)?.as_str(),
            partition,
            if_not_exists,
            len,
        })
    }

    fn targets_directory(&self) -> bool {
        self.table.eq_ignore_ascii_case("directory") || self.table.eq_ignore_ascii_case("local")
    }
}

/// `INSERT OVERWRITE TABLE t ...` to `TRUNCATE TABLE t; INSERT INTO t ...`.
///
/// A Hive CTE-first insert (`WITH .. INSERT ..`) gets its header hoisted in
/// front of the CTE first. Static `PARTITION (..)` specs are dropped.
pub struct InsertOverwriteRule;

impl RewriteRule for InsertOverwriteRule {
    fn id(&self) -> &'static str {
        "insert-overwrite"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::DdlRestructure
    }

    fn priority(&self) -> u32 {
        300
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let code = sql.code();
        let lead_len = LEADING.find(code).map_or(0, |m| m.end());
        let (leading, body) = code.split_at(lead_len);

        let (cte, insert_at) = if WITH_START.is_match(body) {
            match INSERT_KEYWORD
                .find_iter(body)
                .find(|m| depth_at(body, m.start()) == 0)
            {
                Some(m) => (body[..m.start()].trim(), m.start()),
                None => return sql,
            }
        } else {
            ("", 0)
        };

        let Some(header) = InsertHeader::parse(&body[insert_at..]) else {
            return sql;
        };
        if header.overwrite && header.targets_directory() {
            ctx.warn(
                RuleCategory::DdlRestructure,
                "INSERT OVERWRITE DIRECTORY has no warehouse equivalent; left unconverted",
            );
            return sql;
        }
        if !header.overwrite
            && cte.is_empty()
            && header.partition.is_none()
            && !header.if_not_exists
        {
            return sql;
        }

        if let Some(spec) = header.partition {
            let spec = sql.restore_fragment(spec.trim());
            ctx.warn(
                RuleCategory::DdlRestructure,
                format!("dropped PARTITION ({spec}) from INSERT into {}", header.table),
            );
        }

        let rest = body[insert_at + header.len..].trim_start();
        let query = if cte.is_empty() {
            rest.to_string()
        } else {
            format!("{cte} {rest}")
        };

        let mut out = leading.to_string();
        if header.overwrite {
            out.push_str(&format!("TRUNCATE TABLE {};\n", header.table));
        }
        out.push_str(format!("INSERT INTO {} {}", header.table, query).trim_end());
        sql.with_code(out)
    }
}

static HIVE_CLAUSE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(DISTRIBUTE|SORT|CLUSTER)\s+BY\b"));

static DDL_START: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(r"(?i)^(?:\s|{COMMENT_PATTERN})*(?:CREATE|ALTER)\b"))
});

/// Words that end a DISTRIBUTE BY expression list.
const CLAUSE_STOP: &[&str] = &[
    "LIMIT", "UNION", "INTERSECT", "EXCEPT", "MINUS", "SORT", "DISTRIBUTE", "CLUSTER", "ORDER",
    "WINDOW", "INSERT", "HAVING", "SELECT", "FROM", "WHERE",
];

/// End of the clause body starting at `from`, and whether a keyword ended it.
fn clause_end(code: &str, from: usize) -> (usize, bool) {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return (i, false),
            },
            b';' if depth == 0 => return (i, false),
            b if depth == 0 && is_word_byte(b) => {
                let end = i + bytes[i..].iter().take_while(|b| is_word_byte(**b)).count();
                if CLAUSE_STOP.contains(&code[i..end].to_ascii_uppercase().as_str()) {
                    return (i, true);
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    (bytes.len(), false)
}

/// Drops `DISTRIBUTE BY`; `SORT BY` and `CLUSTER BY` become `ORDER BY`.
pub struct QueryClauseRule;

impl RewriteRule for QueryClauseRule {
    fn id(&self) -> &'static str {
        "query-clauses"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::DdlRestructure
    }

    fn priority(&self) -> u32 {
        150
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let mut code = sql.code().to_string();
        let is_ddl = DDL_START.is_match(&code);
        let mut from = 0;

        while let Some(caps) = HIVE_CLAUSE.captures_at(&code, from) {
            let Some(m) = caps.get(0) else {
                break;
            };
            let (start, end) = (m.start(), m.end());

            match caps[1].to_ascii_uppercase().as_str() {
                "DISTRIBUTE" => {
                    let (stop, at_keyword) = clause_end(&code, end);
                    let expr = sql.restore_fragment(code[end..stop].trim());
                    let cut = if at_keyword {
                        start
                    } else {
                        code[..start].trim_end().len()
                    };
                    code.replace_range(cut..stop, "");
                    ctx.warn(
                        RuleCategory::DdlRestructure,
                        format!("dropped DISTRIBUTE BY {expr}"),
                    );
                    from = cut;
                }
                "SORT" => {
                    code.replace_range(start..end, "ORDER BY");
                    ctx.warn(
                        RuleCategory::DdlRestructure,
                        "SORT BY replaced by ORDER BY (total ordering)",
                    );
                    from = start + "ORDER BY".len();
                }
                _ if is_ddl => from = end,
                _ => {
                    code.replace_range(start..end, "ORDER BY");
                    ctx.warn(
                        RuleCategory::DdlRestructure,
                        "CLUSTER BY replaced by ORDER BY; distribution dropped",
                    );
                    from = start + "ORDER BY".len();
                }
            }
        }

        sql.with_code(code)
    }
}

static DELETE_ALL: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(r"(?is)^DELETE\s+FROM\s+({TABLE_IDENT})\s*;?$"))
});

static INSERT_INTO: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?is)^(?:\s|{COMMENT_PATTERN})*INSERT\s+INTO\s+(?:TABLE\s+)?({TABLE_IDENT})"
    ))
});

/// Rewrite `DELETE FROM t;` directly followed by `INSERT INTO t ...` into
/// `TRUNCATE TABLE t;`. Returns the indices of the rewritten statements.
pub fn collapse_delete_insert(statements: &mut [Statement]) -> Vec<usize> {
    let mut collapsed = Vec::new();

    for i in 0..statements.len().saturating_sub(1) {
        let Ok(delete) = GuardedSql::new(&statements[i].text) else {
            continue;
        };
        let bare = COMMENTS.replace_all(delete.code(), "");
        let Some(table) = DELETE_ALL.captures(bare.trim()).map(|c| c[1].to_string()) else {
            continue;
        };

        let inserts_same_table = GuardedSql::new(&statements[i + 1].text)
            .ok()
            .and_then(|next| {
                INSERT_INTO
                    .captures(next.code())
                    .map(|c| c[1].eq_ignore_ascii_case(&table))
            })
            .unwrap_or(false);
        if !inserts_same_table {
            continue;
        }

        let mut code: Vec<&str> = COMMENTS.find_iter(delete.code()).map(|m| m.as_str()).collect();
        let truncate = format!("TRUNCATE TABLE {table};");
        code.push(&truncate);
        let text = delete.clone().with_code(code.join("\n")).restore();
        statements[i] = statements[i].with_text(text);
        collapsed.push(i);
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableCatalog;
    use crate::scanner::split;
    use crate::transformer::traits::RuleOptions;
    use pretty_assertions::assert_eq;

    fn run(rule: &dyn RewriteRule, sql: &str) -> (String, Vec<String>) {
        let catalog = TableCatalog::new();
        let mut ctx = RuleContext::new(&catalog, RuleOptions::default());
        let out = rule.rewrite(GuardedSql::new(sql).unwrap(), &mut ctx);
        let warnings = ctx.warnings().iter().map(|w| w.message.clone()).collect();
        (out.restore(), warnings)
    }

    #[test]
    fn test_insert_overwrite_expands() {
        let (out, warnings) = run(&InsertOverwriteRule, "INSERT OVERWRITE TABLE t SELECT * FROM s");
        assert_eq!(out, "TRUNCATE TABLE t;\nINSERT INTO t SELECT * FROM s");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_partition_spec_dropped() {
        let (out, warnings) = run(
            &InsertOverwriteRule,
            "-- daily load\nINSERT OVERWRITE TABLE t PARTITION (dt = '2024-01-01') IF NOT EXISTS\nSELECT a FROM s",
        );
        assert_eq!(
            out,
            "-- daily load\nTRUNCATE TABLE t;\nINSERT INTO t SELECT a FROM s"
        );
        assert_eq!(
            warnings,
            vec!["dropped PARTITION (dt = '2024-01-01') from INSERT into t"]
        );
    }

    #[test]
    fn test_cte_first_insert_hoisted() {
        let (out, _) = run(
            &InsertOverwriteRule,
            "WITH x AS (SELECT 1 AS a) INSERT OVERWRITE TABLE t SELECT a FROM x",
        );
        assert_eq!(
            out,
            "TRUNCATE TABLE t;\nINSERT INTO t WITH x AS (SELECT 1 AS a) SELECT a FROM x"
        );
    }

    #[test]
    fn test_plain_insert_untouched() {
        let sql = "INSERT INTO t  (a, b)\nVALUES (1, 'INSERT OVERWRITE')";
        let (out, warnings) = run(&InsertOverwriteRule, sql);
        assert_eq!(out, sql);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_overwrite_directory_is_flagged() {
        let sql = "INSERT OVERWRITE LOCAL DIRECTORY '/tmp/out' SELECT * FROM t";
        let (out, warnings) = run(&InsertOverwriteRule, sql);
        assert_eq!(out, sql);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_hive_query_clauses() {
        let (out, warnings) = run(
            &QueryClauseRule,
            "SELECT * FROM (SELECT a FROM t DISTRIBUTE BY a SORT BY b) s DISTRIBUTE BY a",
        );
        assert_eq!(out, "SELECT * FROM (SELECT a FROM t ORDER BY b) s");
        assert_eq!(
            warnings,
            vec![
                "dropped DISTRIBUTE BY a",
                "SORT BY replaced by ORDER BY (total ordering)",
            ]
        );
    }

    #[test]
    fn test_cluster_by_query() {
        let (out, _) = run(&QueryClauseRule, "SELECT a FROM t CLUSTER BY a LIMIT 5");
        assert_eq!(out, "SELECT a FROM t ORDER BY a LIMIT 5");
    }

    #[test]
    fn test_delete_then_insert_collapses() {
        let mut statements =
            split("DELETE FROM t; INSERT INTO t SELECT 1; DELETE FROM u WHERE x = 1; INSERT INTO u SELECT 2;")
                .unwrap();
        let collapsed = collapse_delete_insert(&mut statements);
        assert_eq!(collapsed, vec![0]);
        assert_eq!(statements[0].text, "TRUNCATE TABLE t;");
        assert_eq!(statements[2].text, "DELETE FROM u WHERE x = 1;");
    }
}
