//! Session commands and optimizer hints with no warehouse counterpart.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner::segment::{COMMENT_PATTERN, GuardedSql};
use crate::transformer::pattern;
use crate::transformer::traits::{RewriteRule, RuleCategory, RuleContext};

static COMMENTS: Lazy<Regex> = Lazy::new(|| pattern(COMMENT_PATTERN));

static SET_COMMAND: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?is)^SET\s+([\w.:${}\-]+)(?:\s*=.*)?$"));

/// Statements dropped outright, with the label used in the warning.
static SESSION_COMMANDS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("ADD JAR/FILE", pattern(r"(?is)^ADD\s+(?:JAR|FILE|ARCHIVE)S?\b")),
        ("CREATE TEMPORARY FUNCTION", pattern(r"(?is)^CREATE\s+TEMPORARY\s+(?:MACRO|FUNCTION)\b")),
        ("MSCK REPAIR TABLE", pattern(r"(?is)^MSCK\s+REPAIR\s+TABLE\b")),
        ("ANALYZE TABLE", pattern(r"(?is)^ANALYZE\s+TABLE\b.*\bCOMPUTE\s+STATISTICS\b")),
        ("RESET", pattern(r"(?is)^RESET\b")),
    ]
});

/// Removes `SET` statements and other session-level commands.
pub struct SessionCommandRule;

impl RewriteRule for SessionCommandRule {
    fn id(&self) -> &'static str {
        "session-commands"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CommandRemoval
    }

    fn priority(&self) -> u32 {
        200
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let bare = COMMENTS.replace_all(sql.code(), "");
        let bare = bare.trim();

        let removed = if let Some(caps) = SET_COMMAND.captures(bare) {
            ctx.options
                .strip_set_commands
                .then(|| format!("removed session setting SET {}", &caps[1]))
        } else {
            SESSION_COMMANDS
                .iter()
                .find(|(_, re)| re.is_match(bare))
                .map(|(label, _)| format!("removed {label} command"))
        };

        let Some(message) = removed else {
            return sql;
        };
        ctx.warn(RuleCategory::CommandRemoval, message);

        // Comments around the command survive as a comment-only statement.
        let kept: Vec<&str> = COMMENTS
            .find_iter(sql.code())
            .map(|m| m.as_str())
            .collect();
        let code = kept.join("\n");
        sql.with_code(code)
    }
}

/// Hint comments, matched against the full comment text.
static HINTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("optimizer hint", pattern(r"^/\*\+")),
        ("MAPJOIN hint", pattern(r"(?i)^--\s*MAPJOIN\(")),
        ("STREAMTABLE hint", pattern(r"(?i)^--\s*STREAMTABLE\(")),
        ("hive setting comment", pattern(r"(?i)^/\*\s*hive\.")),
        ("hive setting comment", pattern(r"(?i)^--\s*set\s+hive\.")),
        ("distribution hint", pattern(r"(?i)^--\s*distribute\s+by")),
        ("clustering hint", pattern(r"(?i)^--\s*cluster\s+by")),
        ("sorting hint", pattern(r"(?i)^--\s*sort\s+by")),
    ]
});

/// Drops engine hints carried in comments.
pub struct HintCommentRule;

impl RewriteRule for HintCommentRule {
    fn id(&self) -> &'static str {
        "hint-comments"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CommandRemoval
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql {
        let hints: Vec<(usize, &'static str, String)> = sql
            .comments()
            .filter_map(|(i, text)| {
                HINTS
                    .iter()
                    .find(|(_, re)| re.is_match(text))
                    .map(|(label, _)| (i, *label, text.trim().to_string()))
            })
            .collect();

        let mut sql = sql;
        for (index, label, text) in hints {
            if sql.drop_comment(index) {
                ctx.warn(
                    RuleCategory::CommandRemoval,
                    format!("removed {label}: {text}"),
                );
            }
        }
        sql
    }
}
