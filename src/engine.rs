//! Script conversion engine.
//!
//! Ties the pipeline together: split the script, run the rule stages over
//! each statement, re-split what restructuring produced, then format and lint
//! the pieces.
//!
//! ```rust,ignore
//! let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
//! let result = Converter::new(catalog).convert("SELECT * FROM raw_events;")?;
//! assert_eq!(result.text, "SELECT\n    *\nFROM\n    analytics.events;");
//! ```

use std::sync::Arc;

use rayon::prelude::*;

use crate::catalog::{TableCatalog, TableLookup};
use crate::config::ConverterConfig;
use crate::diagnostics::{ConversionResult, Warning, WarningCategory};
use crate::error::SqlPortResult;
use crate::fmt::Formatter;
use crate::scanner::segment::{GuardedSql, SegmentKind, tokenize};
use crate::scanner::{Statement, split};
use crate::transformer::{
    RuleCategory, RuleContext, RuleOptions, RuleRegistry, collapse_delete_insert,
};
use crate::validator::Validator;

/// Stages that run before restructuring.
const MAPPING_STAGES: [RuleCategory; 4] = [
    RuleCategory::CommandRemoval,
    RuleCategory::TableMapping,
    RuleCategory::FunctionMapping,
    RuleCategory::TypeMapping,
];

/// Stages re-run over statements that restructuring changed.
const REMAP_STAGES: [RuleCategory; 2] = [RuleCategory::FunctionMapping, RuleCategory::TypeMapping];

/// Converts scripts against one catalog and rule set.
///
/// Holds no per-script state; a single converter can serve many scripts and
/// threads.
pub struct Converter {
    catalog: Arc<dyn TableLookup>,
    registry: RuleRegistry,
    options: RuleOptions,
    format: bool,
    indent_width: usize,
    parallel: bool,
    validate: bool,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(TableCatalog::new())
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .field("format", &self.format)
            .field("indent_width", &self.indent_width)
            .field("parallel", &self.parallel)
            .field("validate", &self.validate)
            .finish_non_exhaustive()
    }
}

/// One source statement after the rule stages.
struct Converted {
    pieces: Vec<Statement>,
    warnings: Vec<Warning>,
}

impl Converter {
    pub fn new(catalog: impl TableLookup + 'static) -> Self {
        Self::with_lookup(Arc::new(catalog))
    }

    /// Share a catalog that other converters also read.
    pub fn with_lookup(catalog: Arc<dyn TableLookup>) -> Self {
        Self {
            catalog,
            registry: RuleRegistry::new(),
            options: RuleOptions::default(),
            format: true,
            indent_width: 4,
            parallel: false,
            validate: true,
        }
    }

    /// Build a converter from configuration, loading the catalog it names.
    pub fn from_config(config: &ConverterConfig) -> SqlPortResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => TableCatalog::load(path)?,
            None => TableCatalog::new(),
        };
        tracing::debug!(tables = catalog.len(), "catalog loaded");

        Ok(Self::new(catalog)
            .options(config.rule_options())
            .format(config.format)
            .indent_width(config.indent_width)
            .parallel(config.parallel)
            .validate(config.validate))
    }

    pub fn registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(mut self, options: RuleOptions) -> Self {
        self.options = options;
        self
    }

    /// Pretty-print output statements. When off, statements keep their
    /// rewritten layout.
    pub fn format(mut self, enabled: bool) -> Self {
        self.format = enabled;
        self
    }

    pub fn indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    pub fn catalog(&self) -> &dyn TableLookup {
        self.catalog.as_ref()
    }

    /// Convert a whole script.
    ///
    /// The only error is a fatal scanner error (unterminated literal or block
    /// comment); everything else degrades to a warning on the result.
    pub fn convert(&self, script: &str) -> SqlPortResult<ConversionResult> {
        let statements = split(script)?;
        tracing::debug!(statements = statements.len(), "script split");

        let converted: Vec<Converted> = if self.parallel {
            statements
                .par_iter()
                .map(|stmt| self.convert_statement(stmt))
                .collect::<SqlPortResult<_>>()?
        } else {
            statements
                .iter()
                .map(|stmt| self.convert_statement(stmt))
                .collect::<SqlPortResult<_>>()?
        };

        let mut pieces = Vec::new();
        let mut warnings = Vec::new();
        for item in converted {
            pieces.extend(item.pieces);
            warnings.extend(item.warnings);
        }

        for index in collapse_delete_insert(&mut pieces) {
            let stmt = &pieces[index];
            warnings.push(
                Warning::new(
                    WarningCategory::DdlRestructure,
                    "DELETE FROM followed by INSERT INTO the same table replaced by TRUNCATE TABLE",
                )
                .at(stmt.offset, stmt.line),
            );
        }

        let mut rendered = Vec::with_capacity(pieces.len());
        let mut statements = 0;
        for piece in &pieces {
            let Some(output) = self.render(piece)? else {
                continue;
            };
            if output.terminated {
                statements += 1;
            }
            if self.validate {
                warnings.extend(self.lint(&output.text, piece)?);
            }
            rendered.push(output.text);
        }

        // Stable: warnings of one statement keep the order they were raised in.
        warnings.sort_by_key(|w| w.source_offset);

        Ok(ConversionResult {
            text: rendered.join("\n\n"),
            warnings,
            success: true,
            statements,
        })
    }

    /// Convert a script, turning a fatal error into a failed result.
    pub fn convert_or_report(&self, script: &str) -> ConversionResult {
        match self.convert(script) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "conversion failed");
                let offset = e.offset().unwrap_or(0);
                let line = script[..offset.min(script.len())].matches('\n').count() + 1;
                ConversionResult {
                    text: String::new(),
                    warnings: vec![
                        Warning::new(WarningCategory::Unconverted, e.to_string()).at(offset, line),
                    ],
                    success: false,
                    statements: 0,
                }
            }
        }
    }

    fn convert_statement(&self, stmt: &Statement) -> SqlPortResult<Converted> {
        let mut ctx = RuleContext::new(self.catalog.as_ref(), self.options);

        let guarded = GuardedSql::new(stmt.body())?;
        let mapped = self.registry.apply_stages(&MAPPING_STAGES, guarded, &mut ctx);

        let before = mapped.code().to_string();
        let mut rewritten = self
            .registry
            .apply_stage(RuleCategory::DdlRestructure, mapped, &mut ctx);
        if rewritten.code() != before {
            rewritten = self.registry.apply_stages(&REMAP_STAGES, rewritten, &mut ctx);
        }

        // Restructuring may emit several statements; all of them answer to
        // the source statement's position.
        let pieces = split(&rewritten.restore())?
            .into_iter()
            .map(|piece| Statement::new(piece.text, stmt.offset, stmt.line))
            .collect();
        let warnings = ctx
            .into_warnings()
            .into_iter()
            .map(|w| w.at(stmt.offset, stmt.line))
            .collect();

        Ok(Converted { pieces, warnings })
    }

    fn render(&self, piece: &Statement) -> SqlPortResult<Option<Rendered>> {
        let body = piece.body().trim();
        if body.is_empty() {
            return Ok(None);
        }

        let text = if self.format {
            Formatter::with_indent(self.indent_width).format(body)?
        } else {
            body.to_string()
        };

        if GuardedSql::new(&text)?.is_comment_only() {
            return Ok(Some(Rendered {
                text,
                terminated: false,
            }));
        }

        let last = tokenize(&text)?
            .into_iter()
            .rev()
            .find(|s| s.kind != SegmentKind::Code || !s.text.trim().is_empty())
            .map(|s| s.kind);
        let text = if last == Some(SegmentKind::LineComment) {
            format!("{text}\n;")
        } else {
            format!("{text};")
        };

        Ok(Some(Rendered {
            text,
            terminated: true,
        }))
    }

    fn lint(&self, text: &str, piece: &Statement) -> SqlPortResult<Vec<Warning>> {
        let report = Validator::new().validate(text)?;
        Ok(report
            .issues
            .into_iter()
            .map(|issue| {
                Warning::new(
                    WarningCategory::Unconverted,
                    format!("{} left in output ({})", issue.matched, issue.suggestion),
                )
                .at(piece.offset, piece.line)
            })
            .collect())
    }
}

struct Rendered {
    text: String,
    terminated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlPortError;
    use pretty_assertions::assert_eq;

    fn plain(catalog: TableCatalog) -> Converter {
        Converter::new(catalog).format(false)
    }

    #[test]
    fn test_convert_maps_tables_and_functions() {
        let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
        let result = plain(catalog)
            .convert("SELECT nvl(a, 0) FROM raw_events;")
            .unwrap();
        assert_eq!(result.text, "SELECT COALESCE(a, 0) FROM analytics.events;");
        assert!(result.warnings.is_empty());
        assert!(result.success);
        assert_eq!(result.statements, 1);
    }

    #[test]
    fn test_convert_formats_by_default() {
        let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
        let result = Converter::new(catalog)
            .convert("select a from raw_events")
            .unwrap();
        assert_eq!(result.text, "SELECT\n    a\nFROM\n    analytics.events;");
    }

    #[test]
    fn test_insert_overwrite_splits_into_two_statements() {
        let catalog = TableCatalog::new().with_table("t", "t").with_table("s", "s");
        let result = plain(catalog)
            .convert("INSERT OVERWRITE TABLE t SELECT * FROM s;")
            .unwrap();
        assert_eq!(result.text, "TRUNCATE TABLE t;\n\nINSERT INTO t SELECT * FROM s;");
        assert_eq!(result.statements, 2);
    }

    #[test]
    fn test_set_command_removed_comment_kept() {
        let catalog = TableCatalog::new().with_table("t", "t");
        let result = plain(catalog)
            .convert("-- tuning\nSET hive.exec.parallel=true;\nSELECT 1 FROM t;")
            .unwrap();
        assert_eq!(result.text, "-- tuning\n\nSELECT 1 FROM t;");
        assert_eq!(result.statements, 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].category, WarningCategory::CommandRemoval);
    }

    #[test]
    fn test_trailing_line_comment_gets_terminator_on_next_line() {
        let catalog = TableCatalog::new().with_table("t", "t");
        let result = plain(catalog).convert("SELECT 1 FROM t -- done\n;").unwrap();
        assert_eq!(result.text, "SELECT 1 FROM t -- done\n;");
    }

    #[test]
    fn test_warnings_follow_statement_order() {
        let script = "SELECT * FROM b_table;\nSELECT * FROM a_table;";
        for parallel in [false, true] {
            let result = plain(TableCatalog::new())
                .parallel(parallel)
                .convert(script)
                .unwrap();
            let offsets: Vec<usize> = result.warnings.iter().map(|w| w.source_offset).collect();
            assert_eq!(offsets, vec![0, 23]);
            assert_eq!(result.warnings[1].line, Some(2));
            assert!(result.warnings[1].message.contains("a_table"));
        }
    }

    #[test]
    fn test_delete_then_insert_collapses() {
        let catalog = TableCatalog::new().with_table("t", "t").with_table("s", "s");
        let result = plain(catalog)
            .convert("DELETE FROM t;\nINSERT INTO t SELECT * FROM s;")
            .unwrap();
        assert_eq!(result.text, "TRUNCATE TABLE t;\n\nINSERT INTO t SELECT * FROM s;");
        assert_eq!(result.warnings_in(WarningCategory::DdlRestructure).count(), 1);
    }

    #[test]
    fn test_residual_constructs_reported() {
        let catalog = TableCatalog::new().with_table("t", "t");
        let result = plain(catalog)
            .convert("SELECT a FROM t WHERE b = NULL;")
            .unwrap();
        let unconverted: Vec<&Warning> = result.warnings_in(WarningCategory::Unconverted).collect();
        assert_eq!(unconverted.len(), 1);
        assert!(unconverted[0].message.starts_with("WHERE b = NULL"));
    }

    #[test]
    fn test_unterminated_literal_is_fatal() {
        let err = plain(TableCatalog::new()).convert("SELECT 'abc").unwrap_err();
        assert!(matches!(err, SqlPortError::UnterminatedLiteral { offset: 7, .. }));

        let result = plain(TableCatalog::new()).convert_or_report("SELECT 1;\nSELECT 'abc");
        assert!(!result.success);
        assert_eq!(result.text, "");
        assert_eq!(result.warnings[0].source_offset, 17);
        assert_eq!(result.warnings[0].line, Some(2));
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.toml");
        std::fs::write(&path, "[tables.raw_events]\ntarget = \"analytics.events\"\n").unwrap();
        let config = ConverterConfig::builder().catalog(&path).format(false).build();

        let converter = Converter::from_config(&config).unwrap();
        let result = converter.convert("SELECT * FROM raw_events").unwrap();
        assert_eq!(result.text, "SELECT * FROM analytics.events;");
    }
}
