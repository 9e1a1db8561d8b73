//! Function mapper
//!
//! Declarative table of source functions and their warehouse equivalents,
//! applied innermost-first over balanced call expressions and repeated until
//! the statement stops changing.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::time_format::java_to_warehouse;
use crate::scanner::segment::{GuardedSql, LITERAL_CLOSE, LITERAL_OPEN, LITERAL_PATTERN};
use crate::transformer::calls::{
    CallSite, is_word_byte, matching_open, matching_paren, render_call, rewrite_calls,
};
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

/// Everything a transform can touch while rewriting one call.
pub struct CallEnv<'s, 'c> {
    pub sql: &'s mut GuardedSql,
    pub ctx: &'s mut RuleContext<'c>,
}

impl CallEnv<'_, '_> {
    /// Convert a Java date-format argument, adding the converted literal.
    fn date_format(&mut self, arg: &str) -> String {
        match self.sql.literal_body(arg).map(java_to_warehouse) {
            Some(converted) => self.sql.push_literal(&converted),
            None => {
                self.ctx.warn(
                    RuleCategory::FunctionMapping,
                    "non-literal date format passed through unconverted",
                );
                arg.to_string()
            }
        }
    }

    fn literal(&mut self, body: &str) -> String {
        self.sql.push_literal(body)
    }
}

/// Transform callback: arguments in, replacement out; `None` keeps the call.
pub type TransformFn = fn(&[String], &mut CallEnv<'_, '_>) -> Option<String>;

/// A translation rule for one source function.
#[derive(Clone, Copy)]
pub enum Translation {
    /// Same arguments, new name.
    Rename(&'static str),
    Transform(TransformFn),
}

/// Registry of function translations.
pub struct FunctionMapper {
    rules: HashMap<&'static str, Translation>,
}

impl std::fmt::Debug for FunctionMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionMapper")
            .field("rules_count", &self.rules.len())
            .finish()
    }
}

impl Default for FunctionMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionMapper {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn rename(mut self, from: &'static str, to: &'static str) -> Self {
        self.rules.insert(from, Translation::Rename(to));
        self
    }

    pub fn transform(mut self, from: &'static str, f: TransformFn) -> Self {
        self.rules.insert(from, Translation::Transform(f));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Translate one call. `name` must already be lowercase.
    pub fn translate(
        &self,
        name: &str,
        args: &[String],
        env: &mut CallEnv<'_, '_>,
    ) -> Option<String> {
        match self.rules.get(name)? {
            Translation::Rename(target) => Some(render_call(target, args)),
            Translation::Transform(f) => f(args, env),
        }
    }

    /// Hive to Snowflake function table.
    pub fn hive_to_snowflake() -> Self {
        Self::new()
            // Unix time
            .transform("unix_timestamp", unix_timestamp)
            .transform("to_unix_timestamp", unix_timestamp)
            .transform("str_to_unix", unix_timestamp)
            .transform("from_unixtime", from_unixtime)
            .transform("date_format", date_format)
            // Date arithmetic
            .transform("date_add", date_add)
            .transform("date_sub", date_sub)
            .transform("datediff", datediff)
            .transform("year", |a, _| date_part("YEAR", a))
            .transform("month", |a, _| date_part("MONTH", a))
            .transform("day", |a, _| date_part("DAY", a))
            .transform("dayofmonth", |a, _| date_part("DAY", a))
            .transform("hour", |a, _| date_part("HOUR", a))
            .transform("minute", |a, _| date_part("MINUTE", a))
            .transform("second", |a, _| date_part("SECOND", a))
            .transform("weekofyear", |a, _| date_part("WEEKISO", a))
            // JSON
            .transform("get_json_object", get_json_object)
            // Arrays and maps
            .transform("collect_list", |a, _| {
                (a.len() == 1).then(|| render_call("ARRAY_AGG", a))
            })
            .transform("collect_set", |a, _| {
                (a.len() == 1).then(|| format!("ARRAY_AGG(DISTINCT {})", a[0]))
            })
            .rename("size", "ARRAY_SIZE")
            .rename("sort_array", "ARRAY_SORT")
            .transform("array_contains", array_contains)
            .rename("map_keys", "OBJECT_KEYS")
            .rename("named_struct", "OBJECT_CONSTRUCT")
            .rename("map", "OBJECT_CONSTRUCT")
            .rename("array", "ARRAY_CONSTRUCT")
            // Strings
            .transform("concat_ws", concat_ws)
            .transform("regexp_extract", regexp_extract)
            .transform("instr", |a, _| {
                (a.len() == 2).then(|| render_call("CHARINDEX", &[&a[1], &a[0]]))
            })
            .rename("lcase", "LOWER")
            .rename("ucase", "UPPER")
            // Aggregates
            .transform("percentile", |a, _| {
                (a.len() == 2)
                    .then(|| format!("PERCENTILE_CONT({}) WITHIN GROUP (ORDER BY {})", a[1], a[0]))
            })
            .transform("percentile_approx", |a, _| {
                (a.len() >= 2).then(|| render_call("APPROX_PERCENTILE", &a[..2]))
            })
            // Conditionals
            .transform("nvl", |a, _| {
                (a.len() == 2).then(|| render_call("COALESCE", a))
            })
            .transform("if", |a, _| (a.len() == 3).then(|| render_call("IFF", a)))
            .transform("rand", |a, _| match a {
                [] => Some("UNIFORM(0::FLOAT, 1::FLOAT, RANDOM())".to_string()),
                [seed] => Some(format!("UNIFORM(0::FLOAT, 1::FLOAT, RANDOM({seed}))")),
                _ => None,
            })
    }
}

fn unix_timestamp(args: &[String], env: &mut CallEnv<'_, '_>) -> Option<String> {
    let ts = match args {
        [] => "CURRENT_TIMESTAMP()".to_string(),
        [value] => format!("TO_TIMESTAMP({value})"),
        [value, fmt] => {
            let fmt = env.date_format(fmt);
            format!("TO_TIMESTAMP({value}, {fmt})")
        }
        _ => return None,
    };
    Some(format!("DATE_PART(EPOCH_SECOND, {ts})"))
}

fn from_unixtime(args: &[String], env: &mut CallEnv<'_, '_>) -> Option<String> {
    let fmt = match args {
        [_] => env.literal("YYYY-MM-DD HH24:MI:SS"),
        [_, fmt] => env.date_format(fmt),
        _ => return None,
    };
    Some(format!("TO_VARCHAR(TO_TIMESTAMP({}), {})", args[0], fmt))
}

fn date_format(args: &[String], env: &mut CallEnv<'_, '_>) -> Option<String> {
    let [value, fmt] = args else {
        return None;
    };
    let fmt = env.date_format(fmt);
    Some(format!("TO_VARCHAR(TO_TIMESTAMP({value}), {fmt})"))
}

fn date_add(args: &[String], _: &mut CallEnv<'_, '_>) -> Option<String> {
    let [date, days] = args else {
        return None;
    };
    Some(format!("DATEADD(DAY, {days}, {date})"))
}

fn date_sub(args: &[String], _: &mut CallEnv<'_, '_>) -> Option<String> {
    let [date, days] = args else {
        return None;
    };
    Some(format!("DATEADD(DAY, {}, {date})", negate(days)))
}

fn datediff(args: &[String], _: &mut CallEnv<'_, '_>) -> Option<String> {
    // Three arguments means it is already in warehouse form.
    let [end, start] = args else {
        return None;
    };
    Some(format!("DATEDIFF(DAY, {start}, {end})"))
}

fn date_part(unit: &str, args: &[String]) -> Option<String> {
    let [value] = args else {
        return None;
    };
    Some(format!("DATE_PART({unit}, {value})"))
}

/// `-n` for plain numbers, `-(expr)` otherwise.
pub fn negate(expr: &str) -> String {
    let expr = expr.trim();
    if let Some(rest) = expr.strip_prefix('-') {
        let rest = rest.trim_start();
        if is_atom(rest) {
            return rest.to_string();
        }
        return format!("-({expr})");
    }
    if !expr.is_empty() && expr.bytes().all(|b| b.is_ascii_digit()) {
        format!("-{expr}")
    } else {
        format!("-({expr})")
    }
}

/// A number, a column reference or one parenthesized group spanning the whole text.
fn is_atom(expr: &str) -> bool {
    if expr.is_empty() {
        return false;
    }
    if expr.starts_with('(') {
        return matching_paren(expr, 0) == Some(expr.len() - 1);
    }
    expr.bytes().all(|b| is_word_byte(b) || b == b'.')
}

fn get_json_object(args: &[String], env: &mut CallEnv<'_, '_>) -> Option<String> {
    let [json, path] = args else {
        return None;
    };
    let Some(body) = env.sql.literal_body(path) else {
        env.ctx.warn(
            RuleCategory::FunctionMapping,
            "get_json_object with a non-literal path left unconverted",
        );
        return None;
    };
    match json_accessor(body) {
        Some(accessor) => Some(format!("PARSE_JSON({json}){accessor}")),
        None => {
            env.ctx.warn(
                RuleCategory::FunctionMapping,
                format!("unsupported JSON path '{body}' left unconverted"),
            );
            None
        }
    }
}

/// Turn a `$.a.b[0]` JSON path into a `:a.b[0]` accessor.
///
/// Paths without the leading `$` are read as dotted key paths (`a.b`).
pub fn json_accessor(path: &str) -> Option<String> {
    let rest = match path.strip_prefix('$') {
        Some(rest) => rest.to_string(),
        None if path.is_empty() => return None,
        None => format!(".{path}"),
    };

    let mut out = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&k) = chars.peek() {
                    if k == '.' || k == '[' {
                        break;
                    }
                    key.push(k);
                    chars.next();
                }
                if key.is_empty() {
                    return None;
                }
                out.push(if out.is_empty() { ':' } else { '.' });
                if key.chars().all(|k| k.is_ascii_alphanumeric() || k == '_') {
                    out.push_str(&key);
                } else {
                    out.push('"');
                    out.push_str(&key);
                    out.push('"');
                }
            }
            '[' => {
                let mut index = String::new();
                for k in chars.by_ref() {
                    if k == ']' {
                        break;
                    }
                    index.push(k);
                }
                if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                out.push('[');
                out.push_str(&index);
                out.push(']');
            }
            _ => return None,
        }
    }
    Some(out)
}

fn array_contains(args: &[String], _: &mut CallEnv<'_, '_>) -> Option<String> {
    let [array, value] = args else {
        return None;
    };
    // Already swapped and cast.
    if array.to_ascii_uppercase().ends_with("::VARIANT") {
        return None;
    }
    let cast = if value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        || value.starts_with('\u{E000}')
    {
        format!("{value}::VARIANT")
    } else {
        format!("({value})::VARIANT")
    };
    Some(format!("ARRAY_CONTAINS({cast}, {array})"))
}

/// Calls whose result is already an array.
const ARRAY_PRODUCERS: &[&str] = &[
    "ARRAY_AGG(",
    "ARRAY_CONSTRUCT(",
    "ARRAY_SORT(",
    "ARRAY_DISTINCT(",
    "ARRAY_COMPACT(",
    "SPLIT(",
    "OBJECT_KEYS(",
];

fn concat_ws(args: &[String], _: &mut CallEnv<'_, '_>) -> Option<String> {
    let (separator, values) = args.split_first()?;
    if values.is_empty() {
        return None;
    }
    let array = match values {
        [single]
            if ARRAY_PRODUCERS
                .iter()
                .any(|p| single.to_ascii_uppercase().starts_with(p)) =>
        {
            single.clone()
        }
        _ => render_call("ARRAY_CONSTRUCT", values),
    };
    Some(format!("ARRAY_TO_STRING({array}, {separator})"))
}

fn regexp_extract(args: &[String], env: &mut CallEnv<'_, '_>) -> Option<String> {
    let (subject, pattern, group) = match args {
        [s, p] => (s, p, "1"),
        [s, p, g] => (s, p, g.as_str()),
        _ => return None,
    };
    if group == "0" {
        return Some(render_call("REGEXP_SUBSTR", &[subject, pattern]));
    }
    let flags = env.literal("e");
    Some(format!(
        "REGEXP_SUBSTR({subject}, {pattern}, 1, 1, {flags}, {group})"
    ))
}

/// Source functions with no warehouse counterpart.
const UNSUPPORTED: &[&str] = &[
    "str_to_map",
    "map_values",
    "inline",
    "stack",
    "parse_url_tuple",
    "reflect",
    "java_method",
    "xpath",
    "xpath_string",
    "xpath_int",
    "xpath_long",
    "xpath_double",
    "xpath_boolean",
    "sentences",
    "ngrams",
    "context_ngrams",
    "histogram_numeric",
    "explode",
    "posexplode",
    "json_tuple",
    "in_file",
];

/// Functions valid in both dialects, plus everything the table above emits.
const KNOWN: &[&str] = &[
    "abs", "acos", "approx_count_distinct", "approx_percentile", "array_agg",
    "array_compact", "array_construct", "array_contains", "array_distinct", "array_size",
    "array_slice", "array_sort", "array_to_string", "ascii", "asin", "atan", "atan2", "avg",
    "base64", "bigint", "binary", "bool_and", "bool_or", "boolean", "cast", "cbrt", "ceil",
    "ceiling", "char", "charindex", "coalesce", "concat", "contains", "corr", "cos",
    "count", "count_if", "covar_pop", "covar_samp", "cume_dist", "current_date",
    "current_timestamp", "date", "date_part", "date_trunc", "dateadd", "datediff",
    "decimal", "decode", "degrees", "dense_rank", "double", "endswith", "exp",
    "first_value", "flatten", "float", "floor", "from_utc_timestamp", "greatest",
    "hash", "hex", "iff", "ilike", "initcap", "int", "integer", "is_null_value",
    "lag", "last_day", "last_value", "lead", "least", "left", "length", "listagg", "ln",
    "locate", "log", "lower", "lpad", "ltrim", "max", "md5", "min", "mod", "months_between",
    "next_day", "nth_value", "ntile", "nullif", "number", "numeric", "nvl2",
    "object_construct", "object_keys", "parse_json", "percent_rank", "percentile_cont",
    "percentile_disc", "pi", "pow", "power", "radians", "random", "rank", "regexp_like",
    "regexp_replace", "regexp_substr", "repeat", "replace", "reverse", "right", "round",
    "row_number", "rpad", "rtrim", "sha1", "sha2", "sign", "sin", "smallint", "space",
    "split", "split_part", "sqrt", "startswith", "stddev", "stddev_pop", "stddev_samp",
    "string", "substr", "substring", "sum", "tan", "timestamp", "tinyint", "to_char",
    "to_date", "to_decimal", "to_double", "to_number", "to_timestamp", "to_utc_timestamp",
    "to_varchar", "translate", "trim", "trunc", "try_cast", "try_to_number", "uniform",
    "unbase64", "upper", "var_pop", "var_samp", "variance", "varchar", "weekiso",
    "extract", "position", "overlay", "nvl", "get", "get_path", "variant", "object",
    "array", "struct", "map", "typeof", "uuid_string", "zeroifnull", "nullifzero",
    "ifnull", "array_append", "array_cat", "array_position", "array_intersection",
    "to_array", "to_object", "to_variant", "to_json", "object_insert", "sysdate",
    "getdate", "current_user", "localtimestamp", "datetime", "format_number",
];

/// Words followed by `(` that are syntax rather than calls.
const KEYWORDS: &[&str] = &[
    "all", "and", "any", "as", "between", "by", "case", "cube", "distinct", "else", "end",
    "except", "exists", "filter", "for", "from", "group", "grouping", "having", "in",
    "intersect", "interval", "into", "is", "join", "lateral", "like", "limit", "not",
    "on", "or", "order", "over", "partition", "partitioned", "clustered", "sorted",
    "qualify", "rlike", "rollup", "rows", "range", "select", "sets", "skewed", "table",
    "tblproperties", "serdeproperties", "then", "union", "using", "values", "when",
    "where", "window", "with", "within", "set", "if", "input", "outer", "key", "unique",
    "check", "references", "options", "returns", "recursive",
];

/// Words after which `name(` is a table, alias or CTE, not a call.
///
/// `view` and `outer` cover generators inside `LATERAL VIEW [OUTER]`, which
/// belong to the lateral rewrite.
const NON_CALL_CONTEXT: &[&str] = &[
    "table", "into", "from", "join", "as", "exists", "update", "view", "outer",
    "function", "overwrite", "with",
];

static FUNCTIONS: Lazy<FunctionMapper> = Lazy::new(FunctionMapper::hive_to_snowflake);

static KNOWN_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| KNOWN.iter().chain(KEYWORDS.iter()).copied().collect());

/// Rewrites source function calls to warehouse equivalents.
pub struct FunctionCallRule;

impl FunctionCallRule {
    fn visit(
        site: &CallSite<'_>,
        env: &mut CallEnv<'_, '_>,
        reported: &mut HashSet<String>,
    ) -> Option<String> {
        if site.qualified {
            return None;
        }
        let name = site.name.to_ascii_lowercase();
        let prev = site.prev_word.map(str::to_ascii_lowercase);

        if prev.as_deref().is_some_and(|p| NON_CALL_CONTEXT.contains(&p)) {
            return None;
        }

        if FUNCTIONS.contains(&name) {
            return FUNCTIONS.translate(&name, &site.args, env);
        }

        let message = if UNSUPPORTED.contains(&name.as_str()) {
            format!("function '{}' has no warehouse equivalent; passed through", site.name)
        } else if !KNOWN_SET.contains(name.as_str()) {
            format!("unrecognised function '{}' passed through", site.name)
        } else {
            return None;
        };
        if reported.insert(name) {
            env.ctx.warn(RuleCategory::FunctionMapping, message);
        }
        None
    }
}

impl RewriteRule for FunctionCallRule {
    fn id(&self) -> &'static str {
        "function-calls"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::FunctionMapping
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let mut sql = sql;
        let mut reported = HashSet::new();

        for _ in 0..ctx.options.max_rewrite_passes.max(1) {
            let code = sql.code().to_string();
            let rewritten = {
                let mut env = CallEnv {
                    sql: &mut sql,
                    ctx: &mut *ctx,
                };
                rewrite_calls(&code, &mut |site| Self::visit(site, &mut env, &mut reported))
            };
            if rewritten == code {
                break;
            }
            sql = sql.with_code(rewritten);
        }

        sql
    }
}

static INTERVAL: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"(?i)([+-])\s*INTERVAL\s+({LITERAL_PATTERN}|-?\d+)\s+(YEAR|MONTH|WEEK|DAY|HOUR|MINUTE|SECOND)S?\b"
    ))
});

/// `x ± INTERVAL 'n' UNIT` to `DATEADD(UNIT, ±n, x)`.
pub struct IntervalArithmeticRule;

impl IntervalArithmeticRule {
    /// Start of the operand ending right before `end`.
    fn operand_start(code: &str, end: usize) -> Option<usize> {
        let trimmed = code[..end].trim_end();
        let bytes = trimmed.as_bytes();
        let mut start = trimmed.len();
        if bytes.last() == Some(&b')') {
            start = matching_open(trimmed, trimmed.len() - 1)?;
        } else if trimmed.ends_with(LITERAL_CLOSE) {
            return trimmed.rfind(LITERAL_OPEN);
        }
        while start > 0 {
            let b = bytes[start - 1];
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                start -= 1;
            } else {
                break;
            }
        }
        (start < trimmed.len()).then_some(start)
    }
}

impl RewriteRule for IntervalArithmeticRule {
    fn id(&self) -> &'static str {
        "interval-arithmetic"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::FunctionMapping
    }

    fn priority(&self) -> u32 {
        90
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let mut code = sql.code().to_string();
        let mut from = 0;

        // Left to right, so a chained interval wraps the DATEADD before it.
        while let Some(caps) = INTERVAL.captures_at(&code, from) {
            let (start, end) = match caps.get(0) {
                Some(m) => (m.start(), m.end()),
                None => break,
            };
            let sign = caps[1].to_string();
            let unit = caps[3].to_ascii_uppercase();
            let amount = match sql.literal_body(&caps[2]) {
                Some(body) => body.trim().to_string(),
                None => caps[2].to_string(),
            };

            if amount.parse::<i64>().is_err() {
                ctx.warn(
                    RuleCategory::FunctionMapping,
                    format!("INTERVAL '{amount}' {unit} left unconverted"),
                );
                from = end;
                continue;
            }
            let Some(operand_start) = Self::operand_start(&code, start) else {
                from = end;
                continue;
            };

            let operand = code[operand_start..start].trim_end().to_string();
            let amount = if sign == "-" { negate(&amount) } else { amount };
            let replacement = format!("DATEADD({unit}, {amount}, {operand})");
            code.replace_range(operand_start..end, &replacement);
            from = operand_start + replacement.len();
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

    fn convert(sql: &str) -> (String, Vec<String>) {
        let catalog = TableCatalog::new();
        let mut ctx = RuleContext::new(&catalog, RuleOptions::default());
        let guarded = GuardedSql::new(sql).unwrap();
        let guarded = FunctionCallRule.rewrite(guarded, &mut ctx);
        let guarded = IntervalArithmeticRule.rewrite(guarded, &mut ctx);
        let warnings = ctx.warnings().iter().map(|w| w.message.clone()).collect();
        (guarded.restore(), warnings)
    }

    #[test]
    fn test_nested_calls_rewrite_both_levels() {
        let (out, _) = convert("SELECT collect_list(nvl(x, 0)) FROM t");
        assert_eq!(out, "SELECT ARRAY_AGG(COALESCE(x, 0)) FROM t");
    }

    #[test]
    fn test_date_arithmetic() {
        let (out, _) = convert("SELECT date_add(d, 7), date_sub(d, n + 1), datediff(a, b)");
        assert_eq!(
            out,
            "SELECT DATEADD(DAY, 7, d), DATEADD(DAY, -(n + 1), d), DATEDIFF(DAY, b, a)"
        );
    }

    #[test]
    fn test_date_sub_negates_whole_expression() {
        let (out, _) =
            convert("SELECT date_sub(d, -n - 1), date_sub(d, -x + 1), date_sub(d, -7)");
        assert_eq!(
            out,
            "SELECT DATEADD(DAY, -(-n - 1), d), DATEADD(DAY, -(-x + 1), d), DATEADD(DAY, 7, d)"
        );
    }

    #[test]
    fn test_negate_strips_sign_only_from_atoms() {
        assert_eq!(negate("-n"), "n");
        assert_eq!(negate("-(a - b)"), "(a - b)");
        assert_eq!(negate("-(a) - (b)"), "-(-(a) - (b))");
        assert_eq!(negate("-x + 1"), "-(-x + 1)");
        assert_eq!(negate("3"), "-3");
    }

    #[test]
    fn test_unix_time_conversions() {
        let (out, _) = convert("SELECT unix_timestamp(ts, 'yyyy-MM-dd'), from_unixtime(e)");
        assert_eq!(
            out,
            "SELECT DATE_PART(EPOCH_SECOND, TO_TIMESTAMP(ts, 'YYYY-MM-DD')), \
             TO_VARCHAR(TO_TIMESTAMP(e), 'YYYY-MM-DD HH24:MI:SS')"
        );
    }

    #[test]
    fn test_get_json_object_paths() {
        let (out, _) =
            convert("SELECT get_json_object(j, '$.user.id'), get_json_object(j, '$[0]')");
        assert_eq!(out, "SELECT PARSE_JSON(j):user.id, PARSE_JSON(j)[0]");
    }

    #[test]
    fn test_get_json_object_dynamic_path_warns() {
        let (out, warnings) = convert("SELECT get_json_object(j, p)");
        assert_eq!(out, "SELECT get_json_object(j, p)");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_argument_reordering() {
        let (out, _) = convert(
            "SELECT array_contains(tags, 'x'), instr(s, 'a'), percentile(v, 0.5), concat_ws('-', a, b)",
        );
        assert_eq!(
            out,
            "SELECT ARRAY_CONTAINS('x'::VARIANT, tags), CHARINDEX('a', s), \
             PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY v), \
             ARRAY_TO_STRING(ARRAY_CONSTRUCT(a, b), '-')"
        );
    }

    #[test]
    fn test_concat_ws_over_collected_set() {
        let (out, _) = convert("SELECT concat_ws(',', collect_set(x))");
        assert_eq!(out, "SELECT ARRAY_TO_STRING(ARRAY_AGG(DISTINCT x), ',')");
    }

    #[test]
    fn test_regexp_extract_adds_flags_literal() {
        let (out, _) = convert("SELECT regexp_extract(s, 'id=(\\d+)', 1)");
        assert_eq!(out, "SELECT REGEXP_SUBSTR(s, 'id=(\\d+)', 1, 1, 'e', 1)");
    }

    #[test]
    fn test_rules_are_idempotent() {
        let (once, _) = convert(
            "SELECT if(a > 1, datediff(x, y), array_contains(arr, v)), rand(), date_format(d, 'yyyy')",
        );
        let (twice, _) = convert(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_literals_are_not_rewritten() {
        let (out, warnings) = convert("SELECT 'nvl(a, b)' AS s FROM t");
        assert_eq!(out, "SELECT 'nvl(a, b)' AS s FROM t");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unsupported_function_warns_once() {
        let (out, warnings) = convert("SELECT str_to_map(a), str_to_map(b), my_udf(c)");
        assert_eq!(out, "SELECT str_to_map(a), str_to_map(b), my_udf(c)");
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_table_names_are_not_calls() {
        let (out, warnings) = convert("INSERT INTO map (a, b) SELECT a, b FROM array");
        assert_eq!(out, "INSERT INTO map (a, b) SELECT a, b FROM array");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_interval_arithmetic() {
        let (out, _) = convert("SELECT dt - INTERVAL '7' DAY, to_date(x) + INTERVAL 1 HOUR");
        assert_eq!(
            out,
            "SELECT DATEADD(DAY, -7, dt), DATEADD(HOUR, 1, to_date(x))"
        );
    }

    #[test]
    fn test_json_accessor() {
        assert_eq!(json_accessor("$.a.b").as_deref(), Some(":a.b"));
        assert_eq!(json_accessor("$.items[2].sku").as_deref(), Some(":items[2].sku"));
        assert_eq!(json_accessor("a.b").as_deref(), Some(":a.b"));
        assert_eq!(json_accessor("$.my-key").as_deref(), Some(":\"my-key\""));
        assert_eq!(json_accessor("$.a[*]"), None);
    }
}
