//! Source-to-target table catalog.
//!
//! The catalog is loaded once per run and only ever read afterwards. Keys are
//! source identifiers, matched case-insensitively.
//!
//! ```toml
//! [tables.raw_events]
//! target = "analytics.events"
//! columns = [
//!     { name = "event_id", type = "VARCHAR" },
//!     { name = "payload", type = "VARIANT" },
//! ]
//! partition_columns = [{ name = "dt", type = "DATE" }]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SqlPortError, SqlPortResult};

/// A column with its target-dialect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Where a source table lives in the target warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTable {
    /// Fully qualified target name.
    pub target: String,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub partition_columns: Vec<ColumnDef>,
}

impl TargetTable {
    pub fn named(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            columns: Vec::new(),
            partition_columns: Vec::new(),
        }
    }

    /// Columns followed by partition columns, the order a target DDL lists them.
    pub fn all_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().chain(self.partition_columns.iter())
    }
}

/// Read-only table lookup injected into the rewrite pipeline.
pub trait TableLookup: Send + Sync {
    /// Exact lookup of a normalised (lowercase) source identifier.
    fn lookup(&self, key: &str) -> Option<&TargetTable>;

    /// Reverse lookup by target name.
    fn lookup_target(&self, target: &str) -> Option<&TargetTable>;

    /// Resolve an identifier as written in a script.
    ///
    /// Tries the identifier itself, then the base name behind a
    /// `${hivevar:..}_` prefix, then the unqualified part of `db.table`.
    fn resolve(&self, identifier: &str) -> Option<&TargetTable> {
        let key = identifier.trim_matches('`').to_ascii_lowercase();
        if let Some(table) = self.lookup(&key) {
            return Some(table);
        }
        if key.starts_with("${")
            && let Some(pos) = key.find("}_")
            && let Some(table) = self.lookup(&key[pos + 2..])
        {
            return Some(table);
        }
        match key.rsplit_once('.') {
            Some((_, base)) => self.lookup(base.trim_matches('`')),
            None => None,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default)]
    tables: BTreeMap<String, TargetTable>,
}

/// In-memory catalog backed by a hash map.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: HashMap<String, TargetTable>,
    by_target: HashMap<String, String>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, table: TargetTable) {
        let key = source.to_ascii_lowercase();
        self.by_target
            .insert(table.target.to_ascii_lowercase(), key.clone());
        self.tables.insert(key, table);
    }

    /// Builder-style insert of a name-only mapping.
    pub fn with_table(mut self, source: &str, target: &str) -> Self {
        self.insert(source, TargetTable::named(target));
        self
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn from_toml_str(content: &str) -> SqlPortResult<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Ok(Self::from_file(file))
    }

    pub fn from_json_str(content: &str) -> SqlPortResult<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Ok(Self::from_file(file))
    }

    /// Load a catalog file; `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: &Path) -> SqlPortResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SqlPortError::Catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    fn from_file(file: CatalogFile) -> Self {
        let mut catalog = Self::new();
        for (source, table) in file.tables {
            catalog.insert(&source, table);
        }
        catalog
    }
}

impl TableLookup for TableCatalog {
    fn lookup(&self, key: &str) -> Option<&TargetTable> {
        self.tables.get(key)
    }

    fn lookup_target(&self, target: &str) -> Option<&TargetTable> {
        let source = self.by_target.get(&target.to_ascii_lowercase())?;
        self.tables.get(source)
    }
}
