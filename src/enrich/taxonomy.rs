use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MigrationError;
use crate::wp::types::TaxonomyTerm;

/// Read-only id -> term lookup, shared by every post pipeline.
#[derive(Debug, Default)]
pub struct TermTable {
    kind: &'static str,
    by_id: HashMap<u64, TaxonomyTerm>,
}

impl TermTable {
    pub fn new(kind: &'static str, terms: Vec<TaxonomyTerm>) -> Self {
        Self { kind, by_id: terms.into_iter().map(|t| (t.id, t)).collect() }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn get(&self, id: u64) -> Result<&TaxonomyTerm, MigrationError> {
        self.by_id.get(&id).ok_or(MigrationError::DataIntegrity { kind: self.kind, id })
    }

    /// Terms for `ids` in input order; an unknown id is a data-integrity error.
    pub fn resolve(&self, ids: &[u64]) -> Result<Vec<&TaxonomyTerm>, MigrationError> {
        ids.iter().map(|id| self.get(*id)).collect()
    }
}

pub fn resolve_tags(ids: &[u64], tags: &TermTable) -> Result<Vec<String>, MigrationError> {
    Ok(tags.resolve(ids)?.into_iter().map(|t| t.name.clone()).collect())
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryRow {
    id: Value,
    label: String,
}

/// Static mapping of category label -> target document id.
#[derive(Debug, Default)]
pub struct CategoryTable {
    by_label: HashMap<String, String>,
}

impl CategoryTable {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<CategoryRow> = serde_json::from_str(raw)?;
        let mut by_label = HashMap::new();
        for row in rows {
            let id = match row.id {
                Value::String(s) => s,
                other => other.to_string(),
            };
            by_label.entry(row.label).or_insert(id);
        }
        Ok(Self { by_label })
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn document_id(&self, label: &str) -> Option<&str> {
        self.by_label.get(label).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLink {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lang: String,
    #[serde(rename = "isBroken")]
    pub is_broken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRef {
    pub category: DocumentLink,
}

/// Resolve category ids to names, then to document references. Unknown ids
/// fail; names missing from the static table are dropped.
pub fn resolve_categories(
    ids: &[u64],
    categories: &TermTable,
    table: &CategoryTable,
    mask: &str,
    lang: &str,
) -> Result<Vec<CategoryRef>, MigrationError> {
    let terms = categories.resolve(ids)?;
    Ok(terms
        .into_iter()
        .filter_map(|term| table.document_id(&term.name))
        .map(|id| CategoryRef {
            category: DocumentLink { id: id.to_string(), kind: mask.to_string(), lang: lang.to_string(), is_broken: false },
        })
        .collect())
}
