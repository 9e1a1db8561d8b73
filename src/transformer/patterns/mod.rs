//! Rewrite rule implementations

mod commands;
mod ddl;
mod dml;
mod functions;
mod lateral;
mod tables;
mod time_format;
mod types;

pub use commands::{HintCommentRule, SessionCommandRule};
pub use ddl::CreateTableRule;
pub use dml::{InsertOverwriteRule, QueryClauseRule, collapse_delete_insert};
pub use functions::{FunctionCallRule, FunctionMapper, IntervalArithmeticRule, json_accessor};
pub use lateral::LateralViewRule;
pub use tables::{TABLE_IDENT, TableReferenceRule};
pub use time_format::java_to_warehouse;
pub use types::{CastTypeRule, ColumnTypeRule, MappedType, TypeExpr, map_type, parse_type};
