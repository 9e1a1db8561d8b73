//! # sqlport: statement-aware Hive to Snowflake conversion
//!
//! Rewrites HiveQL scripts into Snowflake SQL without a full grammar: a
//! quote- and comment-aware scanner splits the script, an ordered set of
//! rewrite rules maps tables, functions, types and statement shapes, and a
//! formatter re-renders each statement.
//!
//! ## Quick Example
//!
//! ```
//! use sqlport::prelude::*;
//!
//! let catalog = TableCatalog::new().with_table("raw_events", "analytics.events");
//! let result = sqlport::convert("select collect_list(nvl(x, 0)) from raw_events", catalog).unwrap();
//! assert_eq!(
//!     result.text,
//!     "SELECT\n    ARRAY_AGG(COALESCE(x, 0))\nFROM\n    analytics.events;"
//! );
//! assert!(result.warnings.is_empty());
//! ```
//!
//! ## Pipeline
//!
//! | Step       | Module          | Does                                         |
//! |------------|-----------------|----------------------------------------------|
//! | Scan       | [`scanner`]     | splits statements, guards literals/comments  |
//! | Rewrite    | [`transformer`] | staged rules over guarded code               |
//! | Format     | [`fmt`]         | keyword casing, clause breaks, indentation   |
//! | Lint       | [`validator`]   | flags source-dialect leftovers               |

pub mod batch;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fmt;
pub mod scanner;
pub mod transformer;
pub mod validator;

pub mod prelude {
    pub use crate::batch::{BatchReport, FileReport, convert_dir};
    pub use crate::catalog::{ColumnDef, TableCatalog, TableLookup, TargetTable};
    pub use crate::config::ConverterConfig;
    pub use crate::diagnostics::{ConversionResult, Warning, WarningCategory};
    pub use crate::engine::Converter;
    pub use crate::error::*;
    pub use crate::fmt::format_sql;
    pub use crate::scanner::{Statement, split};
    pub use crate::transformer::{RewriteRule, RuleCategory, RuleContext, RuleRegistry};
    pub use crate::validator::{ValidationReport, Validator};
}

/// Convert a script with default settings against `catalog`.
///
/// # Example
///
/// ```
/// use sqlport::catalog::TableCatalog;
///
/// let result = sqlport::convert("SET hive.exec.parallel=true;", TableCatalog::new()).unwrap();
/// assert_eq!(result.text, "");
/// assert_eq!(result.warnings.len(), 1);
/// ```
pub fn convert(
    script: &str,
    catalog: impl catalog::TableLookup + 'static,
) -> Result<diagnostics::ConversionResult, error::SqlPortError> {
    engine::Converter::new(catalog).convert(script)
}
