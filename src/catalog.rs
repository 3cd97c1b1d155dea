//! Named SQL catalog.
//!
//! Statements are registered under a name in configuration (`queries:`) and
//! looked up by the `*_named` session methods. A paging entry carries the count
//! and data statements used by `query_page`. Lookups ignore case.

use crate::error::{SqlKitError, SqlKitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One catalog entry: a single statement or a count/data pair for paging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Statement(String),
    Paging { count: String, data: String },
}

impl CatalogEntry {
    pub fn statement(sql: impl Into<String>) -> Self {
        Self::Statement(sql.into())
    }

    pub fn paging(count: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Paging {
            count: count.into(),
            data: data.into(),
        }
    }

    /// True when no SQL text in the entry is blank
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Statement(sql) => !sql.trim().is_empty(),
            Self::Paging { count, data } => !count.trim().is_empty() && !data.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqlCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl SqlCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &HashMap<String, CatalogEntry>) -> Self {
        entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect()
    }

    pub fn register(&mut self, name: impl AsRef<str>, entry: CatalogEntry) {
        self.entries.insert(name.as_ref().to_lowercase(), entry);
    }

    pub fn with(mut self, name: impl AsRef<str>, entry: CatalogEntry) -> Self {
        self.register(name, entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// SQL text of a single-statement entry
    pub fn get_sql(&self, name: &str) -> SqlKitResult<&str> {
        match self.lookup(name)? {
            CatalogEntry::Statement(sql) => Ok(sql),
            CatalogEntry::Paging { .. } => Err(SqlKitError::configuration(format!(
                "Catalog entry '{name}' is a paging pair, not a single statement"
            ))),
        }
    }

    /// `(count_sql, data_sql)` of a paging entry
    pub fn get_paging_sql(&self, name: &str) -> SqlKitResult<(&str, &str)> {
        match self.lookup(name)? {
            CatalogEntry::Paging { count, data } => Ok((count, data)),
            CatalogEntry::Statement(_) => Err(SqlKitError::configuration(format!(
                "Catalog entry '{name}' has no count/data pair for paging"
            ))),
        }
    }

    fn lookup(&self, name: &str) -> SqlKitResult<&CatalogEntry> {
        self.entries.get(&name.to_lowercase()).ok_or_else(|| {
            SqlKitError::configuration(format!("No SQL registered under the name '{name}'"))
        })
    }
}

impl<K: AsRef<str>> FromIterator<(K, CatalogEntry)> for SqlCatalog {
    fn from_iter<I: IntoIterator<Item = (K, CatalogEntry)>>(iter: I) -> Self {
        let mut catalog = SqlCatalog::new();
        for (name, entry) in iter {
            catalog.register(name, entry);
        }
        catalog
    }
}
