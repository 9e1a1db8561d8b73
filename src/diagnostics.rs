//! Warnings and the conversion result.

use std::fmt;

use serde::Serialize;

/// What kind of heuristic or unmapped construct produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningCategory {
    CommandRemoval,
    TableMapping,
    FunctionMapping,
    TypeMapping,
    DdlRestructure,
    /// Source-dialect construct left in the output.
    Unconverted,
}

impl WarningCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandRemoval => "command-removal",
            Self::TableMapping => "table-mapping",
            Self::FunctionMapping => "function-mapping",
            Self::TypeMapping => "type-mapping",
            Self::DdlRestructure => "ddl-restructure",
            Self::Unconverted => "unconverted",
        }
    }
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub category: WarningCategory,
    pub message: String,
    /// Byte offset of the statement that produced the warning.
    pub source_offset: usize,
    /// 1-based source line of that statement, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Warning {
    pub fn new(category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            source_offset: 0,
            line: None,
        }
    }

    pub fn at(mut self, offset: usize, line: usize) -> Self {
        self.source_offset = offset;
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.category, line, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

/// Output of converting one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub text: String,
    pub warnings: Vec<Warning>,
    pub success: bool,
    /// Number of statements in the output text.
    pub statements: usize,
}

impl ConversionResult {
    pub fn warnings_in(&self, category: WarningCategory) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.category == category)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let w =
            Warning::new(WarningCategory::TableMapping, "no mapping found for table 'a'").at(10, 2);
        assert_eq!(
            w.to_string(),
            "[table-mapping] line 2: no mapping found for table 'a'"
        );
    }

    #[test]
    fn test_warning_serializes_category_kebab_case() {
        let w = Warning::new(WarningCategory::DdlRestructure, "dropped LOCATION");
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["category"], "ddl-restructure");
        assert!(json.get("line").is_none());
    }
}
