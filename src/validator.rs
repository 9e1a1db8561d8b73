//! Residual-pattern lint for converted SQL.
//!
//! Flags source-dialect constructs that survived conversion. Matching runs
//! on guarded text, so literals and comments never produce findings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::SqlPortResult;
use crate::scanner::segment::{GuardedSql, LITERAL_PATTERN};
use crate::transformer::pattern;

/// One leftover construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// 1-based line in the validated text.
    pub line: usize,
    pub pattern: &'static str,
    /// Matched text, literals restored.
    pub matched: String,
    pub suggestion: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

struct Check {
    pattern: &'static str,
    re: Regex,
    suggestion: &'static str,
    /// Capture 1 is a literal whose body must start with this prefix.
    literal_prefix: Option<&'static str>,
}

fn check(name: &'static str, re: &str, suggestion: &'static str) -> Check {
    Check {
        pattern: name,
        re: pattern(&format!("(?i){re}")),
        suggestion,
        literal_prefix: None,
    }
}

static CHECKS: Lazy<Vec<Check>> = Lazy::new(|| {
    let storage = "remove; the warehouse manages storage";
    vec![
        check("ADD JAR", r"\bADD\s+(?:JAR|FILE|ARCHIVE)\b", "register UDFs as warehouse functions"),
        check(
            "LOAD DATA INPATH",
            r"\bLOAD\s+DATA\s+(?:LOCAL\s+)?INPATH\b",
            "load files with COPY INTO from a stage",
        ),
        check("INPUTFORMAT", r"\bINPUTFORMAT\b", storage),
        check("OUTPUTFORMAT", r"\bOUTPUTFORMAT\b", storage),
        check("SERDE", r"\bSERDE(?:PROPERTIES)?\b", "describe files with a FILE FORMAT"),
        check("ROW FORMAT", r"\bROW\s+FORMAT\b", "describe files with a FILE FORMAT"),
        check("STORED AS", r"\bSTORED\s+(?:AS|BY)\b", storage),
        check("TBLPROPERTIES", r"\bTBLPROPERTIES\b", storage),
        check(
            "PARTITIONED BY",
            r"\bPARTITIONED\s+BY\b",
            "move partition columns into the column list",
        ),
        check("CLUSTERED BY", r"\bCLUSTERED\s+BY\b", "use CLUSTER BY on the table if needed"),
        check("BUCKETS", r"\bINTO\s+\d+\s+BUCKETS\b", storage),
        check("SKEWED BY", r"\bSKEWED\s+BY\b", storage),
        Check {
            pattern: "LOCATION 'hdfs://'",
            re: pattern(&format!(r"(?i)\bLOCATION\s+({LITERAL_PATTERN})")),
            suggestion: "use an external stage",
            literal_prefix: Some("hdfs://"),
        },
        check(
            "LATERAL VIEW",
            r"\bLATERAL\s+VIEW\b",
            "use CROSS JOIN LATERAL FLATTEN(input => ...)",
        ),
        check("INSERT OVERWRITE", r"\bINSERT\s+OVERWRITE\b", "use TRUNCATE TABLE then INSERT INTO"),
        check("DISTRIBUTE BY", r"\bDISTRIBUTE\s+BY\b", "remove"),
        check("SORT BY", r"\bSORT\s+BY\b", "use ORDER BY"),
        check("collect_list(", r"(?:^|[^.\w])collect_list\s*\(", "use ARRAY_AGG"),
        check("collect_set(", r"(?:^|[^.\w])collect_set\s*\(", "use ARRAY_AGG(DISTINCT ...)"),
        check("nvl(", r"(?:^|[^.\w])nvl\s*\(", "use COALESCE"),
        check(
            "get_json_object(",
            r"(?:^|[^.\w])get_json_object\s*\(",
            "use PARSE_JSON(x):path",
        ),
        check("json_tuple(", r"(?:^|[^.\w])json_tuple\s*\(", "use PARSE_JSON(x):field per field"),
        check("from_unixtime(", r"(?:^|[^.\w])from_unixtime\s*\(", "use TO_TIMESTAMP"),
        check(
            "unix_timestamp(",
            r"(?:^|[^.\w])unix_timestamp\s*\(",
            "use DATE_PART(EPOCH_SECOND, ...)",
        ),
        check("explode(", r"(?:^|[^.\w])(?:pos)?explode\s*\(", "use LATERAL FLATTEN"),
        check(
            "= NULL",
            r"\b(?:WHERE|AND|OR|ON|WHEN)\s+[\w.]+\s*(?:=|!=|<>)\s*NULL\b",
            "use IS [NOT] NULL",
        ),
    ]
});

/// Lints converted SQL for leftover source-dialect constructs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, sql: &str) -> SqlPortResult<ValidationReport> {
        let guarded = GuardedSql::new(sql)?;
        let code = guarded.code();
        let mut issues: Vec<ValidationIssue> = Vec::new();

        for check in CHECKS.iter() {
            for caps in check.re.captures_iter(code) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                if let Some(prefix) = check.literal_prefix {
                    let body = caps.get(1).and_then(|m| guarded.literal_body(m.as_str()));
                    if !body.is_some_and(|b| b.starts_with(prefix)) {
                        continue;
                    }
                }

                let issue = ValidationIssue {
                    line: guarded.line_at(whole.start()),
                    pattern: check.pattern,
                    matched: guarded.restore_fragment(whole.as_str().trim()),
                    suggestion: check.suggestion,
                };
                if !issues
                    .iter()
                    .any(|i| i.line == issue.line && i.pattern == issue.pattern)
                {
                    issues.push(issue);
                }
            }
        }

        issues.sort_by_key(|i| i.line);
        Ok(ValidationReport { issues })
    }
}
