//! Table reference mapping against the catalog.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner::segment::{COMMENT_PATTERN, GuardedSql};
use crate::transformer::calls::{enclosing_call, matching_paren, word_before};
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

/// A table identifier, including `${hivevar:env}_name` forms.
pub const TABLE_IDENT: &str = r"(?:[\w.`]*\$\{hivevar:\w+\}_\w+|[A-Za-z_`][\w.`]*)";

static TABLE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)\b(CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMPORARY\s+)?(?:EXTERNAL\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?|FROM\s+|JOIN\s+|INSERT\s+(?:INTO|OVERWRITE)\s+(?:(?:TABLE|INTO)\s+)?|TRUNCATE\s+(?:TABLE\s+)?)({TABLE_IDENT})"
    ))
});

static INSERT_INTO_TABLE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^INSERT\s+INTO\s+TABLE\s+$"));

static CTE_NAME: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)(?:\bWITH\s+(?:RECURSIVE\s+)?|,\s*)(\w+)\s+AS\s*\("));

static LIST_ALIAS: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(r"^(?:\s|{COMMENT_PATTERN})+(?i:AS(?:\s|{COMMENT_PATTERN})+)?(\w+)"))
});

static LIST_NEXT: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"^(?:\s|{COMMENT_PATTERN})*,(?:\s|{COMMENT_PATTERN})*(?:(\()|({TABLE_IDENT}))"
    ))
});

/// Words that end a `FROM` item instead of aliasing it.
const LIST_STOP_WORDS: &[&str] = &[
    "where", "group", "order", "having", "limit", "join", "inner", "left", "right", "full",
    "cross", "outer", "on", "using", "lateral", "union", "distribute", "sort", "cluster",
    "window", "qualify", "tablesample",
];

/// Words that can follow `FROM`/`JOIN` without being a table.
const NOT_TABLES: &[&str] = &[
    "select", "lateral", "unnest", "table", "values", "where", "group", "order", "having",
    "limit", "dual", "directory", "local",
];

/// `FROM` inside these calls is part of the call syntax.
const FROM_CALLS: &[&str] = &["extract", "trim", "substring", "substr", "position", "overlay"];

/// Replaces source table identifiers with catalog targets.
pub struct TableReferenceRule;

impl TableReferenceRule {
    fn cte_names(code: &str) -> HashSet<String> {
        CTE_NAME
            .captures_iter(code)
            .map(|c| c[1].to_ascii_lowercase())
            .collect()
    }

    /// Identifiers after the first one in `FROM a [alias], b [alias], ...`.
    /// Parenthesized items are skipped whole. The walk stops at anything else.
    fn from_list(code: &str, mut pos: usize) -> Vec<Range<usize>> {
        let mut tables = Vec::new();
        loop {
            if let Some(caps) = LIST_ALIAS.captures(&code[pos..])
                && let (Some(all), Some(alias)) = (caps.get(0), caps.get(1))
                && !LIST_STOP_WORDS.contains(&alias.as_str().to_ascii_lowercase().as_str())
            {
                pos += all.end();
            }

            let Some(caps) = LIST_NEXT.captures(&code[pos..]) else {
                break;
            };
            if let Some(open) = caps.get(1) {
                let Some(close) = matching_paren(code, pos + open.start()) else {
                    break;
                };
                pos = close + 1;
            } else if let Some(ident) = caps.get(2) {
                tables.push(pos + ident.start()..pos + ident.end());
                pos += ident.end();
            } else {
                break;
            }
        }
        tables
    }

    fn map_name(name: &str, ctx: &mut RuleContext<'_>) -> String {
        // Names that already are targets pass silently, so output converts to itself.
        match ctx
            .catalog
            .resolve(name)
            .or_else(|| ctx.catalog.lookup_target(name))
        {
            Some(table) => {
                tracing::debug!(source = name, target = %table.target, "mapped table");
                table.target.clone()
            }
            None => {
                ctx.warn(
                    RuleCategory::TableMapping,
                    format!("no mapping found for table '{name}'"),
                );
                name.to_string()
            }
        }
    }

    fn is_reference(code: &str, keyword_at: usize, context: &str, ident: &str) -> bool {
        let lower = ident.to_ascii_lowercase();
        if NOT_TABLES.contains(&lower.as_str()) {
            return false;
        }
        let is_from = context.len() >= 4 && context[..4].eq_ignore_ascii_case("from");
        if is_from {
            if let Some(call) = enclosing_call(code, keyword_at)
                && FROM_CALLS.contains(&call.to_ascii_lowercase().as_str())
            {
                return false;
            }
            if let Some(prev) = word_before(code, keyword_at)
                && prev.eq_ignore_ascii_case("distinct")
            {
                return false;
            }
        }
        true
    }
}

impl RewriteRule for TableReferenceRule {
    fn id(&self) -> &'static str {
        "table-references"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::TableMapping
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let code = sql.code();
        let ctes = Self::cte_names(code);
        let mut edits: Vec<(Range<usize>, Option<&'static str>)> = Vec::new();

        for caps in TABLE_CONTEXT.captures_iter(code) {
            let (Some(context), Some(ident)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if !Self::is_reference(code, context.start(), context.as_str(), ident.as_str())
                || ctes.contains(&ident.as_str().to_ascii_lowercase())
            {
                continue;
            }

            if INSERT_INTO_TABLE.is_match(context.as_str()) {
                edits.push((context.range(), Some("INSERT INTO ")));
            }
            edits.push((ident.range(), None));

            if context
                .as_str()
                .get(..4)
                .is_some_and(|word| word.eq_ignore_ascii_case("from"))
            {
                for next in Self::from_list(code, ident.end()) {
                    let name = &code[next.clone()];
                    if !NOT_TABLES.contains(&name.to_ascii_lowercase().as_str())
                        && !ctes.contains(&name.to_ascii_lowercase())
                    {
                        edits.push((next, None));
                    }
                }
            }
        }
        edits.sort_by_key(|(range, _)| range.start);

        let mut out = String::with_capacity(code.len());
        let mut last = 0;
        for (range, replacement) in edits {
            if range.start < last {
                continue;
            }
            out.push_str(&code[last..range.start]);
            match replacement {
                Some(text) => out.push_str(text),
                None => out.push_str(&Self::map_name(&code[range.clone()], ctx)),
            }
            last = range.end;
        }

        out.push_str(&code[last..]);
        sql.with_code(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableCatalog;
    use crate::transformer::traits::RuleOptions;
    use pretty_assertions::assert_eq;

    fn map(catalog: &TableCatalog, sql: &str) -> (String, Vec<String>) {
        let mut ctx = RuleContext::new(catalog, RuleOptions::default());
        let out = TableReferenceRule.rewrite(GuardedSql::new(sql).unwrap(), &mut ctx);
        let warnings = ctx.warnings().iter().map(|w| w.message.clone()).collect();
        (out.restore(), warnings)
    }

    #[test]
    fn test_unmapped_table_passes_through_with_warning() {
        let (out, warnings) = map(&TableCatalog::new(), "SELECT * FROM raw_events");
        assert_eq!(out, "SELECT * FROM raw_events");
        assert_eq!(warnings, vec!["no mapping found for table 'raw_events'"]);
    }

    #[test]
    fn test_mapped_table_rewritten() {
        let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
        let (out, warnings) = map(&catalog, "SELECT * FROM raw_events");
        assert_eq!(out, "SELECT * FROM analytics.events");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_all_positions() {
        let catalog = TableCatalog::new()
            .with_table("a", "db.a")
            .with_table("b", "db.b")
            .with_table("c", "db.c");
        let (out, warnings) = map(
            &catalog,
            "INSERT INTO TABLE c SELECT * FROM a JOIN b ON a.id = b.id",
        );
        assert_eq!(out, "INSERT INTO db.c SELECT * FROM db.a JOIN db.b ON a.id = b.id");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_comma_separated_from_list_maps_every_table() {
        let catalog = TableCatalog::new().with_table("a", "db.a").with_table("b", "db.b");
        let (out, warnings) = map(&catalog, "SELECT * FROM a, b WHERE a.id = b.id");
        assert_eq!(out, "SELECT * FROM db.a, db.b WHERE a.id = b.id");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_comma_separated_from_list_warns_for_every_table() {
        let (out, warnings) = map(&TableCatalog::new(), "SELECT * FROM a, b WHERE a.id = b.id");
        assert_eq!(out, "SELECT * FROM a, b WHERE a.id = b.id");
        assert_eq!(
            warnings,
            vec![
                "no mapping found for table 'a'",
                "no mapping found for table 'b'"
            ]
        );
    }

    #[test]
    fn test_from_list_with_aliases_and_subquery() {
        let catalog = TableCatalog::new()
            .with_table("a", "db.a")
            .with_table("b", "db.b")
            .with_table("c", "db.c");
        let (out, warnings) = map(
            &catalog,
            "SELECT * FROM a x, (SELECT id FROM b) s, c AS z GROUP BY x.id, z.id",
        );
        assert_eq!(
            out,
            "SELECT * FROM db.a x, (SELECT id FROM db.b) s, db.c AS z GROUP BY x.id, z.id"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_hivevar_prefixed_name() {
        let catalog = TableCatalog::new().with_table("orders", "sales.orders");
        let (out, _) = map(&catalog, "TRUNCATE TABLE ${hivevar:env}_orders");
        assert_eq!(out, "TRUNCATE TABLE sales.orders");
    }

    #[test]
    fn test_self_reference_resolved_per_occurrence() {
        let catalog = TableCatalog::new().with_table("t", "x.t");
        let (out, _) = map(&catalog, "CREATE TABLE IF NOT EXISTS t AS SELECT * FROM t");
        assert_eq!(out, "CREATE TABLE IF NOT EXISTS x.t AS SELECT * FROM x.t");
    }

    #[test]
    fn test_target_name_passes_silently() {
        let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
        let (out, warnings) = map(&catalog, "SELECT * FROM analytics.events");
        assert_eq!(out, "SELECT * FROM analytics.events");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_non_table_from_is_ignored() {
        let (out, warnings) = map(
            &TableCatalog::new(),
            "WITH recent AS (SELECT EXTRACT(YEAR FROM d) y FROM (SELECT 1) s) SELECT * FROM recent WHERE name = 'FROM x'",
        );
        assert_eq!(
            out,
            "WITH recent AS (SELECT EXTRACT(YEAR FROM d) y FROM (SELECT 1) s) SELECT * FROM recent WHERE name = 'FROM x'"
        );
        assert!(warnings.is_empty());
    }
}
