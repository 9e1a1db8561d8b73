//! Statement rewriting
//!
//! Each statement runs through an ordered set of pure rules grouped in
//! stages. Rules only see guarded code: literals and comments are
//! placeholders.
//!
//! ## Stages
//!
//! ```text
//! CommandRemoval → TableMapping → FunctionMapping → TypeMapping → DdlRestructure
//! ```

mod traits;
mod patterns;
mod registry;
pub mod calls;

pub use traits::*;
pub use patterns::*;
pub use registry::*;

use regex::Regex;

/// Compile a pattern that is known at build time.
pub(crate) fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("invalid pattern {re:?}: {e}"))
}
