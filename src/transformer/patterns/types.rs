//! Column type mapping.
//!
//! Type tokens are parsed with nom:
//!
//! ```text
//! type    := name [ '(' digits { ',' digits } ')' ] [ '<' ... '>' ]
//! ```
//!
//! and rewritten in `CREATE TABLE` column lists, `PARTITIONED BY` lists,
//! `ADD COLUMNS` lists and `CAST(x AS type)`.

use nom::{
    IResult,
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0},
    combinator::opt,
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
};
use once_cell::sync::Lazy;
use regex::Regex;

use super::tables::TABLE_IDENT;
use crate::scanner::segment::GuardedSql;
use crate::transformer::calls::{depth_at, matching_paren, rewrite_calls};
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

/// A parsed type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr<'a> {
    pub name: &'a str,
    pub params: Vec<&'a str>,
    /// Text between the outer `<` and `>`.
    pub generic: Option<&'a str>,
}

/// Result of mapping one type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    pub target: String,
    /// Set when the mapping loses information.
    pub note: Option<String>,
}

impl MappedType {
    fn exact(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            note: None,
        }
    }
}

fn parse_type_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn parse_params(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(
        multispace0,
        delimited(
            char('('),
            separated_list1(char(','), delimited(multispace0, digit1, multispace0)),
            char(')'),
        ),
    )(input)
}

/// Balanced `<...>`; returns the text between the outer brackets.
fn parse_generic(input: &str) -> IResult<&str, &str> {
    let (input, _) = pair(multispace0, char('<'))(input)?;
    let mut depth = 1;
    for (i, c) in input.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..i]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// Parse a type token at the start of `input`.
pub fn parse_type(input: &str) -> IResult<&str, TypeExpr<'_>> {
    let (input, name) = parse_type_name(input)?;
    let (input, params) = opt(parse_params)(input)?;
    let (input, generic) = opt(parse_generic)(input)?;
    Ok((
        input,
        TypeExpr {
            name,
            params: params.unwrap_or_default(),
            generic,
        },
    ))
}

/// Map a source type to its warehouse type; `None` when the type is unknown.
pub fn map_type(ty: &TypeExpr<'_>) -> Option<MappedType> {
    let params = ty.params.join(",");
    let with_params = |base: &str| {
        if ty.params.is_empty() {
            base.to_string()
        } else {
            format!("{base}({params})")
        }
    };

    let mapped = match ty.name.to_ascii_lowercase().as_str() {
        "string" | "text" => MappedType::exact("VARCHAR"),
        "varchar" => MappedType::exact(with_params("VARCHAR")),
        "char" | "character" => MappedType::exact(with_params("CHAR")),
        "tinyint" | "smallint" => MappedType::exact("SMALLINT"),
        "int" | "integer" => MappedType::exact("INTEGER"),
        "bigint" => MappedType::exact("BIGINT"),
        "float" | "double" | "real" => MappedType::exact("FLOAT"),
        "decimal" | "numeric" if ty.params.is_empty() => MappedType::exact("NUMBER(10,0)"),
        "decimal" | "numeric" | "number" => MappedType::exact(with_params("NUMBER")),
        "boolean" => MappedType::exact("BOOLEAN"),
        "binary" => MappedType::exact("BINARY"),
        "timestamp" => MappedType::exact("TIMESTAMP"),
        "date" => MappedType::exact("DATE"),
        "timestamp_ntz" | "timestamp_ltz" | "timestamp_tz" | "time" | "variant" | "geography" => {
            MappedType::exact(ty.name.to_ascii_uppercase())
        }
        "array" => MappedType::exact("ARRAY"),
        "map" | "object" => MappedType::exact("OBJECT"),
        "struct" => MappedType::exact("VARIANT"),
        "uniontype" => MappedType {
            target: "VARIANT".to_string(),
            note: Some(format!(
                "uniontype<{}> mapped to VARIANT",
                ty.generic.unwrap_or_default()
            )),
        },
        _ => return None,
    };
    Some(mapped)
}

/// Words that start a table constraint rather than a column.
const CONSTRAINT_WORDS: &[&str] = &[
    "primary", "constraint", "unique", "foreign", "key", "index", "check",
];

/// Byte ranges of the entries of a column list, split on top-level commas.
fn column_spans(list: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, b) in list.bytes().enumerate() {
        match b {
            b'(' | b'<' => depth += 1,
            b')' | b'>' => depth -= 1,
            b',' if depth == 0 => {
                spans.push((start, i));
                start = i + 1;
            }
            _ => {}
        }
    }
    spans.push((start, list.len()));
    spans
}

/// Rewrite the type of every column definition in `list`.
pub fn map_column_list(list: &str, ctx: &mut RuleContext<'_>) -> String {
    let mut out = list.to_string();

    for (start, end) in column_spans(list).into_iter().rev() {
        let column = &list[start..end];
        let lead = column.len() - column.trim_start().len();
        let body = column.trim_start();

        let name_len = if let Some(quoted) = body.strip_prefix('`') {
            match quoted.find('`') {
                Some(p) => p + 2,
                None => continue,
            }
        } else {
            body.bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                .count()
        };
        if name_len == 0
            || CONSTRAINT_WORDS.contains(&body[..name_len].to_ascii_lowercase().as_str())
        {
            continue;
        }

        let after_name = &body[name_len..];
        let type_text = after_name.trim_start();
        if type_text.len() == after_name.len() {
            continue;
        }
        let Ok((rest, ty)) = parse_type(type_text) else {
            continue;
        };
        let type_len = type_text.len() - rest.len();
        let type_start = start + lead + name_len + (after_name.len() - type_text.len());

        match map_type(&ty) {
            Some(mapped) => {
                if let Some(note) = mapped.note {
                    ctx.warn(RuleCategory::TypeMapping, note);
                }
                out.replace_range(type_start..type_start + type_len, &mapped.target);
            }
            None => ctx.warn(
                RuleCategory::TypeMapping,
                format!("unknown type '{}' passed through", &type_text[..type_len]),
            ),
        }
    }

    out
}

static COLUMN_LISTS: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)\b(?:CREATE\s+(?:OR\s+REPLACE\s+)?(?:TEMPORARY\s+)?(?:EXTERNAL\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{TABLE_IDENT}|PARTITIONED\s+BY|ADD\s+COLUMNS|REPLACE\s+COLUMNS)\s*\("
    ))
});

static CAST_AS: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\s+AS\s+"));

/// Maps types in column definition lists.
pub struct ColumnTypeRule;

impl RewriteRule for ColumnTypeRule {
    fn id(&self) -> &'static str {
        "column-types"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::TypeMapping
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let mut code = sql.code().to_string();
        let mut from = 0;

        while let Some(m) = COLUMN_LISTS.find_at(&code, from) {
            let open = m.end() - 1;
            let Some(close) = matching_paren(&code, open) else {
                break;
            };
            let mapped = map_column_list(&code[open + 1..close], ctx);
            code.replace_range(open + 1..close, &mapped);
            from = open + 1 + mapped.len();
        }

        sql.with_code(code)
    }
}

/// Maps the target type of `CAST` and `TRY_CAST`.
pub struct CastTypeRule;

impl RewriteRule for CastTypeRule {
    fn id(&self) -> &'static str {
        "cast-types"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::TypeMapping
    }

    fn priority(&self) -> u32 {
        90
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let code = sql.code().to_string();
        let rewritten = rewrite_calls(&code, &mut |site| {
            let name = site.name.to_ascii_lowercase();
            if !matches!(name.as_str(), "cast" | "try_cast") || site.args.len() != 1 {
                return None;
            }
            let arg = &site.args[0];
            let split = CAST_AS
                .find_iter(arg)
                .filter(|m| depth_at(arg, m.start()) == 0)
                .last()?;
            let type_text = arg[split.end()..].trim();
            let ty = match parse_type(type_text) {
                Ok(("", ty)) => ty,
                _ => return None,
            };
            let Some(mapped) = map_type(&ty) else {
                ctx.warn(
                    RuleCategory::TypeMapping,
                    format!("unknown type '{type_text}' passed through"),
                );
                return None;
            };
            if let Some(note) = mapped.note {
                ctx.warn(RuleCategory::TypeMapping, note);
            }
            if mapped.target == type_text {
                return None;
            }
            Some(format!(
                "{}({} AS {})",
                site.name,
                &arg[..split.start()],
                mapped.target
            ))
        });
        sql.with_code(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableCatalog;
    use crate::transformer::traits::RuleOptions;
    use pretty_assertions::assert_eq;

    fn run(rule: &dyn RewriteRule, sql: &str) -> (String, Vec<String>) {
        let catalog = TableCatalog::new();
        let mut ctx = RuleContext::new(&catalog, RuleOptions::default());
        let out = rule.rewrite(GuardedSql::new(sql).unwrap(), &mut ctx);
        let warnings = ctx.warnings().iter().map(|w| w.message.clone()).collect();
        (out.restore(), warnings)
    }

    fn mapped(token: &str) -> Option<String> {
        let (_, ty) = parse_type(token).ok()?;
        map_type(&ty).map(|m| m.target)
    }

    #[test]
    fn test_parse_type() {
        let (rest, ty) = parse_type("decimal(10, 2) COMMENT").unwrap();
        assert_eq!(ty.name, "decimal");
        assert_eq!(ty.params, vec!["10", "2"]);
        assert_eq!(rest, " COMMENT");

        let (_, ty) = parse_type("map<string,array<int>>").unwrap();
        assert_eq!(ty.generic, Some("string,array<int>"));
    }

    #[test]
    fn test_scalar_and_parameterized_types() {
        assert_eq!(mapped("string").as_deref(), Some("VARCHAR"));
        assert_eq!(mapped("tinyint").as_deref(), Some("SMALLINT"));
        assert_eq!(mapped("decimal").as_deref(), Some("NUMBER(10,0)"));
        assert_eq!(mapped("DECIMAL(18, 4)").as_deref(), Some("NUMBER(18,4)"));
        assert_eq!(mapped("varchar(64)").as_deref(), Some("VARCHAR(64)"));
        assert_eq!(mapped("array<string>").as_deref(), Some("ARRAY"));
        assert_eq!(mapped("map<string,int>").as_deref(), Some("OBJECT"));
        assert_eq!(mapped("struct<a:int,b:string>").as_deref(), Some("VARIANT"));
        assert_eq!(mapped("geometry"), None);
    }

    #[test]
    fn test_target_types_are_identities() {
        for target in [
            "VARCHAR",
            "NUMBER(10,0)",
            "INTEGER",
            "FLOAT",
            "OBJECT",
            "VARIANT",
            "ARRAY",
        ] {
            assert_eq!(mapped(target).as_deref(), Some(target));
        }
    }

    #[test]
    fn test_create_table_columns() {
        let (out, warnings) = run(
            &ColumnTypeRule,
            "CREATE TABLE t (id bigint, name string COMMENT 'full, name', tags array<string>, m map<string, int>) PARTITIONED BY (dt string)",
        );
        assert_eq!(
            out,
            "CREATE TABLE t (id BIGINT, name VARCHAR COMMENT 'full, name', tags ARRAY, m OBJECT) PARTITIONED BY (dt VARCHAR)"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_and_union_types_warn() {
        let (out, warnings) = run(
            &ColumnTypeRule,
            "CREATE TABLE t (g geometry, u uniontype<int,string>)",
        );
        assert_eq!(out, "CREATE TABLE t (g geometry, u VARIANT)");
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_cast_target() {
        let (out, _) = run(
            &CastTypeRule,
            "SELECT CAST(a AS string), cast(b as decimal(5,2)), CAST(c AS INTEGER) FROM t",
        );
        assert_eq!(
            out,
            "SELECT CAST(a AS VARCHAR), cast(b AS NUMBER(5,2)), CAST(c AS INTEGER) FROM t"
        );
    }
}
