//! Rule registry for statement rewriting

use std::cmp::Reverse;

use super::patterns::*;
use super::traits::*;
use crate::scanner::segment::GuardedSql;

/// Registry of rewrite rules, ordered by stage and then priority.
pub struct RuleRegistry {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.ids())
            .finish()
    }
}

impl RuleRegistry {
    /// Create a registry with the Hive to Snowflake rule set
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Box::new(SessionCommandRule));
        registry.register(Box::new(HintCommentRule));
        registry.register(Box::new(TableReferenceRule));
        registry.register(Box::new(FunctionCallRule));
        registry.register(Box::new(IntervalArithmeticRule));
        registry.register(Box::new(ColumnTypeRule));
        registry.register(Box::new(CastTypeRule));
        registry.register(Box::new(InsertOverwriteRule));
        registry.register(Box::new(CreateTableRule));
        registry.register(Box::new(LateralViewRule));
        registry.register(Box::new(QueryClauseRule));

        registry
    }

    /// A registry with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a new rule
    pub fn register(&mut self, rule: Box<dyn RewriteRule>) {
        self.rules.push(rule);
        // Stable: equal priorities keep registration order.
        self.rules
            .sort_by_key(|r| (r.category(), Reverse(r.priority())));
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule of one stage over `sql`.
    pub fn apply_stage(
        &self,
        category: RuleCategory,
        sql: GuardedSql,
        ctx: &mut RuleContext<'_>,
    ) -> GuardedSql {
        let mut sql = sql;
        for rule in self.rules.iter().filter(|r| r.category() == category) {
            let before = sql.code().to_string();
            sql = rule.rewrite(sql, ctx);
            if sql.code() != before {
                tracing::debug!(rule = rule.id(), stage = %category, "rule rewrote statement");
            }
        }
        sql
    }

    /// Run several stages in the given order.
    pub fn apply_stages(
        &self,
        stages: &[RuleCategory],
        sql: GuardedSql,
        ctx: &mut RuleContext<'_>,
    ) -> GuardedSql {
        stages
            .iter()
            .fold(sql, |sql, stage| self.apply_stage(*stage, sql, ctx))
    }
}
