//! CREATE TABLE restructuring.
//!
//! Storage, serde, bucketing and location clauses describe Hadoop file
//! layouts and are dropped. Partition columns become ordinary columns.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tables::TABLE_IDENT;
use crate::scanner::segment::{COMMENT_PATTERN, GuardedSql, LITERAL_PATTERN};
use crate::transformer::calls::matching_paren;
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

static CREATE_HEAD: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?is)^((?:\s|{COMMENT_PATTERN})*)CREATE\s+(OR\s+REPLACE\s+)?(TEMPORARY\s+)?(EXTERNAL\s+)?TABLE\s+(IF\s+NOT\s+EXISTS\s+)?({TABLE_IDENT})"
    ))
});

static TABLE_COMMENT: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"(?is)^COMMENT\s*=?\s*({LITERAL_PATTERN})")));

static LEADING_COMMENT: Lazy<Regex> = Lazy::new(|| pattern(&format!("^{COMMENT_PATTERN}")));

static QUERY_TAIL: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^(?:AS|LIKE)\b"));

/// How far a matched clause extends.
#[derive(Clone, Copy)]
enum Extent {
    /// Exactly the regex match.
    Match,
    /// The match ends with `(`; the clause runs to the matching `)`.
    Paren,
}

struct Clause {
    label: &'static str,
    head: Regex,
    extent: Extent,
}

impl Clause {
    fn new(label: &'static str, head: &str, extent: Extent) -> Self {
        Self {
            label,
            head: pattern(&format!("(?is)^{head}")),
            extent,
        }
    }

    /// Length of this clause at the start of `rest`.
    fn measure(&self, rest: &str) -> Option<usize> {
        let m = self.head.find(rest)?;
        match self.extent {
            Extent::Match => Some(m.end()),
            Extent::Paren => matching_paren(rest, m.end() - 1).map(|close| close + 1),
        }
    }
}

/// Clauses dropped from CREATE TABLE, in match order.
static DROPPED_CLAUSES: Lazy<Vec<Clause>> = Lazy::new(|| {
    let lit = LITERAL_PATTERN;
    vec![
        Clause::new("CLUSTERED BY", r"CLUSTERED\s+BY\s*\(", Extent::Paren),
        Clause::new("CLUSTERED BY", r"SORTED\s+BY\s*\(", Extent::Paren),
        Clause::new("CLUSTERED BY", r"INTO\s+\d+\s+BUCKETS\b", Extent::Match),
        Clause::new("SKEWED BY", r"SKEWED\s+BY\s*\(", Extent::Paren),
        Clause::new("SKEWED BY", r"ON\s*\(", Extent::Paren),
        Clause::new("SKEWED BY", r"STORED\s+AS\s+DIRECTORIES\b", Extent::Match),
        Clause::new("ROW FORMAT SERDE", &format!(r"ROW\s+FORMAT\s+SERDE\s+{lit}"), Extent::Match),
        Clause::new("ROW FORMAT DELIMITED", r"ROW\s+FORMAT\s+DELIMITED\b", Extent::Match),
        Clause::new(
            "ROW FORMAT DELIMITED",
            &format!(r"FIELDS\s+TERMINATED\s+BY\s+{lit}(?:\s+ESCAPED\s+BY\s+{lit})?"),
            Extent::Match,
        ),
        Clause::new(
            "ROW FORMAT DELIMITED",
            &format!(r"COLLECTION\s+ITEMS\s+TERMINATED\s+BY\s+{lit}"),
            Extent::Match,
        ),
        Clause::new(
            "ROW FORMAT DELIMITED",
            &format!(r"MAP\s+KEYS\s+TERMINATED\s+BY\s+{lit}"),
            Extent::Match,
        ),
        Clause::new(
            "ROW FORMAT DELIMITED",
            &format!(r"LINES\s+TERMINATED\s+BY\s+{lit}"),
            Extent::Match,
        ),
        Clause::new(
            "ROW FORMAT DELIMITED",
            &format!(r"NULL\s+DEFINED\s+AS\s+{lit}"),
            Extent::Match,
        ),
        Clause::new("WITH SERDEPROPERTIES", r"WITH\s+SERDEPROPERTIES\s*\(", Extent::Paren),
        Clause::new(
            "STORED AS INPUTFORMAT",
            &format!(r"STORED\s+AS\s+INPUTFORMAT\s+{lit}\s+OUTPUTFORMAT\s+{lit}"),
            Extent::Match,
        ),
        Clause::new("STORED BY", &format!(r"STORED\s+BY\s+{lit}"), Extent::Match),
        Clause::new("STORED AS", r"STORED\s+AS\s+\w+", Extent::Match),
        Clause::new("LOCATION", &format!(r"LOCATION\s+{lit}"), Extent::Match),
        Clause::new("TBLPROPERTIES", r"TBLPROPERTIES\s*\(", Extent::Paren),
    ]
});

static PARTITIONED_BY: Lazy<Clause> =
    Lazy::new(|| Clause::new("PARTITIONED BY", r"PARTITIONED\s+BY\s*\(", Extent::Paren));

/// A CREATE TABLE statement taken apart.
#[derive(Debug, Default)]
struct CreateTable<'a> {
    leading: &'a str,
    temporary: bool,
    external: bool,
    if_not_exists: bool,
    name: &'a str,
    columns: Option<&'a str>,
    partition_columns: Option<&'a str>,
    comment: Option<&'a str>,
    /// `AS query` or `LIKE other`, kept verbatim.
    tail: Option<&'a str>,
    /// Comments found between clauses.
    comments: Vec<&'a str>,
    dropped: Vec<&'static str>,
    /// Unrecognised text, kept verbatim.
    unknown: Option<&'a str>,
}

impl<'a> CreateTable<'a> {
    fn parse(code: &'a str) -> Option<Self> {
        let head = CREATE_HEAD.captures(code)?;
        let mut table = CreateTable {
            leading: head.get(1).map_or("", |m| m.as_str()),
            temporary: head.get(3).is_some(),
            external: head.get(4).is_some(),
            if_not_exists: head.get(5).is_some(),
            name: head.get(6)?.as_str(),
            ..Self::default()
        };

        let mut rest = &code[head.get(0)?.end()..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with('(') {
            let close = matching_paren(trimmed, 0)?;
            table.columns = Some(&trimmed[1..close]);
            rest = &trimmed[close + 1..];
        }

        loop {
            let current = rest.trim_start();
            if current.is_empty() {
                break;
            }
            if QUERY_TAIL.is_match(current) {
                table.tail = Some(current.trim_end());
                break;
            }
            if let Some(caps) = TABLE_COMMENT.captures(current) {
                table.comment = caps.get(1).map(|m| m.as_str());
                rest = &current[caps.get(0)?.end()..];
                continue;
            }
            if let Some(m) = LEADING_COMMENT.find(current) {
                table.comments.push(m.as_str());
                rest = &current[m.end()..];
                continue;
            }
            if let Some(len) = PARTITIONED_BY.measure(current) {
                let open = current[..len].find('(')?;
                table.partition_columns = Some(&current[open + 1..len - 1]);
                rest = &current[len..];
                continue;
            }
            match DROPPED_CLAUSES
                .iter()
                .find_map(|c| c.measure(current).map(|len| (c.label, len)))
            {
                Some((label, len)) => {
                    if !table.dropped.contains(&label) {
                        table.dropped.push(label);
                    }
                    rest = &current[len..];
                }
                None => {
                    table.unknown = Some(current.trim_end());
                    break;
                }
            }
        }

        Some(table)
    }

    fn column_list(&self, ctx: &RuleContext<'_>) -> Option<String> {
        // Catalog columns win over the declared ones, except for CTAS.
        if self.tail.is_none()
            && let Some(known) = ctx
                .catalog
                .lookup_target(self.name)
                .or_else(|| ctx.catalog.resolve(self.name))
            && !known.columns.is_empty()
        {
            let columns: Vec<String> = known
                .all_columns()
                .map(|c| format!("{} {}", c.name, c.data_type))
                .collect();
            return Some(columns.join(", "));
        }

        let parts: Vec<&str> = [self.columns, self.partition_columns]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    fn render(&self, ctx: &RuleContext<'_>) -> String {
        let mut out = String::from(self.leading);
        out.push_str("CREATE OR REPLACE ");
        if self.temporary {
            out.push_str("TEMPORARY ");
        }
        out.push_str("TABLE ");
        out.push_str(self.name);
        if let Some(columns) = self.column_list(ctx) {
            out.push_str(" (");
            out.push_str(&columns);
            out.push(')');
        }
        if let Some(comment) = self.comment {
            out.push_str(" COMMENT = ");
            out.push_str(comment);
        }
        for comment in &self.comments {
            out.push(' ');
            out.push_str(comment);
        }
        for tail in [self.unknown, self.tail].into_iter().flatten() {
            out.push(' ');
            out.push_str(tail);
        }
        out
    }
}

/// `CREATE [EXTERNAL] TABLE ... STORED AS ... LOCATION ...` to
/// `CREATE OR REPLACE TABLE ...`.
pub struct CreateTableRule;

impl RewriteRule for CreateTableRule {
    fn id(&self) -> &'static str {
        "create-table"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::DdlRestructure
    }

    fn priority(&self) -> u32 {
        250
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let Some(table) = CreateTable::parse(sql.code()) else {
            return sql;
        };

        if table.external {
            ctx.warn(
                RuleCategory::DdlRestructure,
                format!("external table {} converted to a managed table", table.name),
            );
        }
        if table.if_not_exists {
            ctx.warn(
                RuleCategory::DdlRestructure,
                format!("IF NOT EXISTS on {} replaced by OR REPLACE", table.name),
            );
        }
        if table.partition_columns.is_some() {
            ctx.warn(
                RuleCategory::DdlRestructure,
                "dropped PARTITIONED BY; partition columns moved into the column list",
            );
        }
        for label in &table.dropped {
            ctx.warn(
                RuleCategory::DdlRestructure,
                format!("dropped {label} clause"),
            );
        }
        if table.unknown.is_some() {
            ctx.warn(
                RuleCategory::DdlRestructure,
                "unrecognised CREATE TABLE clause kept as written",
            );
        }

        let code = table.render(ctx);
        sql.with_code(code)
    }
}
