//! `LATERAL VIEW` to `CROSS JOIN LATERAL`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::functions::json_accessor;
use crate::scanner::segment::GuardedSql;
use crate::transformer::calls::{matching_paren, split_args};
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

static LATERAL_VIEW: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\bLATERAL\s+VIEW\s+(OUTER\s+)?(\w+)\s*\("));

static ALIASES: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^\s+(?:(\w+)\s+)?AS\s+(\w+(?:\s*,\s*\w+)*)")
});

static TABLE_ALIAS: Lazy<Regex> = Lazy::new(|| pattern(r"^\s+(\w+)"));

/// Words that cannot be a table alias after the generator call.
const NOT_ALIASES: &[&str] = &[
    "where", "group", "order", "having", "limit", "lateral", "join", "cross", "left", "inner",
    "union", "window", "sort", "distribute", "cluster",
];

/// One `LATERAL VIEW [OUTER] udtf(args) alias [AS c1, c2]`.
struct LateralView {
    outer: bool,
    generator: String,
    args: Vec<String>,
    alias: Option<String>,
    columns: Vec<String>,
    /// Byte range of the whole construct.
    start: usize,
    end: usize,
}

impl LateralView {
    fn parse_at(code: &str, from: usize) -> Option<Self> {
        let caps = LATERAL_VIEW.captures_at(code, from)?;
        let whole = caps.get(0)?;
        let open = whole.end() - 1;
        let close = matching_paren(code, open)?;
        let args = split_args(&code[open + 1..close])
            .into_iter()
            .map(str::to_string)
            .collect();

        let tail = &code[close + 1..];
        let (alias, columns, len) = if let Some(c) = ALIASES.captures(tail) {
            let columns = c[2].split(',').map(|s| s.trim().to_string()).collect();
            (c.get(1).map(|m| m.as_str().to_string()), columns, c.get(0)?.end())
        } else {
            match TABLE_ALIAS.captures(tail) {
                Some(c) if !NOT_ALIASES.contains(&c[1].to_ascii_lowercase().as_str()) => {
                    (Some(c[1].to_string()), Vec::new(), c.get(0)?.end())
                }
                _ => (None, Vec::new(), 0),
            }
        };

        Some(Self {
            outer: caps.get(1).is_some(),
            generator: caps[2].to_ascii_lowercase(),
            args,
            alias,
            columns,
            start: whole.start(),
            end: close + 1 + len,
        })
    }

    fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or("f")
    }

    fn flatten(&self) -> Option<String> {
        let [input] = self.args.as_slice() else {
            return None;
        };
        let outer = if self.outer { ", OUTER => TRUE" } else { "" };
        let columns = match (self.generator.as_str(), self.columns.as_slice()) {
            (_, []) => String::new(),
            ("explode", [item]) => format!("(SEQ, KEY, PATH, INDEX, {item})"),
            ("explode", [key, value]) => format!("(SEQ, {key}, PATH, INDEX, {value})"),
            ("posexplode", [pos, item]) => format!("(SEQ, KEY, PATH, {pos}, {item})"),
            _ => return None,
        };
        Some(format!(
            "CROSS JOIN LATERAL FLATTEN(input => {input}{outer}) AS {}{columns}",
            self.alias()
        ))
    }

    fn json_tuple(&self, sql: &GuardedSql, ctx: &mut RuleContext<'_>) -> Option<String> {
        let (json, fields) = self.args.split_first()?;
        if fields.is_empty() || (!self.columns.is_empty() && self.columns.len() != fields.len()) {
            return None;
        }

        let mut selected = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let Some(path) = sql.literal_body(field) else {
                ctx.warn(
                    RuleCategory::DdlRestructure,
                    "json_tuple with a non-literal field name left unconverted",
                );
                return None;
            };
            let accessor = json_accessor(path)?;
            let name = match self.columns.get(i) {
                Some(name) => name.clone(),
                None => format!("c{i}"),
            };
            selected.push(format!("PARSE_JSON({json}){accessor} AS {name}"));
        }

        Some(format!(
            "CROSS JOIN LATERAL (SELECT {}) {}",
            selected.join(", "),
            self.alias()
        ))
    }
}

/// Rewrites `LATERAL VIEW` generators.
///
/// `explode` and `posexplode` become `FLATTEN`; `json_tuple` becomes a
/// lateral subquery with one JSON accessor per field.
pub struct LateralViewRule;

impl RewriteRule for LateralViewRule {
    fn id(&self) -> &'static str {
        "lateral-view"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::DdlRestructure
    }

    fn priority(&self) -> u32 {
        200
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let mut code = sql.code().to_string();
        let mut from = 0;

        while let Some(view) = LateralView::parse_at(&code, from) {
            let replacement = match view.generator.as_str() {
                "explode" | "posexplode" => view.flatten(),
                "json_tuple" => view.json_tuple(&sql, ctx),
                _ => None,
            };
            match replacement {
                Some(text) => {
                    code.replace_range(view.start..view.end, &text);
                    from = view.start + text.len();
                }
                None => {
                    ctx.warn(
                        RuleCategory::DdlRestructure,
                        format!("LATERAL VIEW {} left unconverted", view.generator),
                    );
                    from = view.end;
                }
            }
        }

        sql.with_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableCatalog;
    use crate::transformer::traits::RuleOptions;
    use pretty_assertions::assert_eq;

    fn run(sql: &str) -> (String, Vec<String>) {
        let catalog = TableCatalog::new();
        let mut ctx = RuleContext::new(&catalog, RuleOptions::default());
        let out = LateralViewRule.rewrite(GuardedSql::new(sql).unwrap(), &mut ctx);
        let warnings = ctx.warnings().iter().map(|w| w.message.clone()).collect();
        (out.restore(), warnings)
    }

    #[test]
    fn test_explode() {
        let (out, warnings) =
            run("SELECT a.id, t.item FROM a LATERAL VIEW explode(a.tags) t AS item");
        assert_eq!(
            out,
            "SELECT a.id, t.item FROM a CROSS JOIN LATERAL FLATTEN(input => a.tags) AS t(SEQ, KEY, PATH, INDEX, item)"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_outer_explode_of_map() {
        let (out, _) = run(
            "SELECT k, v FROM a LATERAL VIEW OUTER EXPLODE(a.attrs) m AS k, v WHERE k IS NOT NULL",
        );
        assert_eq!(
            out,
            "SELECT k, v FROM a CROSS JOIN LATERAL FLATTEN(input => a.attrs, OUTER => TRUE) AS m(SEQ, k, PATH, INDEX, v) WHERE k IS NOT NULL"
        );
    }

    #[test]
    fn test_posexplode_surfaces_position() {
        let (out, _) = run("SELECT pos, x FROM a LATERAL VIEW posexplode(xs) p AS pos, x");
        assert_eq!(
            out,
            "SELECT pos, x FROM a CROSS JOIN LATERAL FLATTEN(input => xs) AS p(SEQ, KEY, PATH, pos, x)"
        );
    }

    #[test]
    fn test_json_tuple() {
        let (out, _) = run(
            "SELECT j.name, j.city FROM e LATERAL VIEW json_tuple(e.payload, 'name', 'address.city') j AS name, city",
        );
        assert_eq!(
            out,
            "SELECT j.name, j.city FROM e CROSS JOIN LATERAL (SELECT PARSE_JSON(e.payload):name AS name, PARSE_JSON(e.payload):address.city AS city) j"
        );
    }

    #[test]
    fn test_chained_views() {
        let (out, _) = run(
            "SELECT y FROM t LATERAL VIEW explode(xs) a AS x LATERAL VIEW explode(x.ys) b AS y",
        );
        assert_eq!(
            out,
            "SELECT y FROM t CROSS JOIN LATERAL FLATTEN(input => xs) AS a(SEQ, KEY, PATH, INDEX, x) CROSS JOIN LATERAL FLATTEN(input => x.ys) AS b(SEQ, KEY, PATH, INDEX, y)"
        );
    }

    #[test]
    fn test_unsupported_generator_warns() {
        let sql = "SELECT * FROM t LATERAL VIEW inline(arr) i AS a, b";
        let (out, warnings) = run(sql);
        assert_eq!(out, sql);
        assert_eq!(warnings, vec!["LATERAL VIEW inline left unconverted"]);
    }
}
