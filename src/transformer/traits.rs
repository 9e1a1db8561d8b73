//! Core traits for the rewrite pipeline

use std::fmt;

use crate::catalog::TableLookup;
use crate::diagnostics::{Warning, WarningCategory};
use crate::scanner::segment::GuardedSql;

/// Pipeline stage a rule belongs to. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleCategory {
    CommandRemoval,
    TableMapping,
    FunctionMapping,
    TypeMapping,
    DdlRestructure,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 5] = [
        RuleCategory::CommandRemoval,
        RuleCategory::TableMapping,
        RuleCategory::FunctionMapping,
        RuleCategory::TypeMapping,
        RuleCategory::DdlRestructure,
    ];

    pub fn warning_category(&self) -> WarningCategory {
        match self {
            Self::CommandRemoval => WarningCategory::CommandRemoval,
            Self::TableMapping => WarningCategory::TableMapping,
            Self::FunctionMapping => WarningCategory::FunctionMapping,
            Self::TypeMapping => WarningCategory::TypeMapping,
            Self::DdlRestructure => WarningCategory::DdlRestructure,
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.warning_category().as_str())
    }
}

/// Tunables the rules read.
#[derive(Debug, Clone, Copy)]
pub struct RuleOptions {
    /// Upper bound on fixed-point passes for nested rewrites.
    pub max_rewrite_passes: usize,
    pub strip_set_commands: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            max_rewrite_passes: 8,
            strip_set_commands: true,
        }
    }
}

/// Per-statement state shared by the rules.
///
/// The catalog is the only external state a rule may read; warnings are local
/// to the statement and merged by the engine in statement order.
pub struct RuleContext<'a> {
    pub catalog: &'a dyn TableLookup,
    pub options: RuleOptions,
    warnings: Vec<Warning>,
}

impl<'a> RuleContext<'a> {
    pub fn new(catalog: &'a dyn TableLookup, options: RuleOptions) -> Self {
        Self {
            catalog,
            options,
            warnings: Vec::new(),
        }
    }

    /// Record a warning. Repeats of the same warning within a statement are dropped.
    pub fn warn(&mut self, category: RuleCategory, message: impl Into<String>) {
        let warning = Warning::new(category.warning_category(), message);
        if self.warnings.contains(&warning) {
            return;
        }
        tracing::debug!(%warning, "rule warning");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A pure rewrite of one statement's guarded text.
///
/// Rules must be idempotent on their own output: the function and type stages
/// run a second time after a restructuring rule changes a statement.
pub trait RewriteRule: Send + Sync {
    fn id(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// Order within the category, highest first.
    fn priority(&self) -> u32 {
        100
    }

    fn rewrite(&self, sql: GuardedSql, ctx: &mut RuleContext<'_>) -> GuardedSql;
}
