use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::telemetry;

use super::php::{decode_groups, RecipeGroup};

const META_INSTRUCTIONS: &str = "wprm_instructions";
const META_INGREDIENTS: &str = "wprm_ingredients";
const META_SERVINGS: &str = "wprm_servings";
const META_SERVINGS_UNIT: &str = "wprm_servings_unit";
const META_PREP_TIME: &str = "wprm_prep_time";
const META_COOK_TIME: &str = "wprm_cook_time";
const META_TOTAL_TIME: &str = "wprm_total_time";
const META_NOTES: &str = "wprm_notes";

static PARAGRAPH_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?p(?:\s[^>]*)?>").unwrap());

// Export file layout: { channel: { item: [ { title, postmeta: [ {meta_key, meta_value} ] } ] } }

#[derive(Deserialize)]
struct ExportFile {
    channel: ExportChannel,
}

#[derive(Deserialize)]
struct ExportChannel {
    #[serde(default)]
    item: OneOrMany<ExportItem>,
}

#[derive(Deserialize)]
struct ExportItem {
    #[serde(default)]
    title: Value,
    #[serde(default)]
    postmeta: OneOrMany<ExportMeta>,
}

#[derive(Deserialize)]
struct ExportMeta {
    meta_key: String,
    #[serde(default)]
    meta_value: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

/// One recipe from the export with its meta fields in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeExportEntry {
    pub title: String,
    pub meta: Vec<(String, String)>,
}

impl RecipeExportEntry {
    /// First value stored under `key`, as the plugin never repeats keys.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Recipe export indexed by exact title; on duplicate titles the first entry wins.
#[derive(Debug, Default)]
pub struct RecipeExport {
    by_title: HashMap<String, RecipeExportEntry>,
}

impl RecipeExport {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: ExportFile = serde_json::from_str(raw)?;
        let mut by_title = HashMap::new();
        for item in file.channel.item.into_vec() {
            let Some(title) = value_text(&item.title) else { continue };
            let meta = item
                .postmeta
                .into_vec()
                .into_iter()
                .filter_map(|m| value_text(&m.meta_value).map(|v| (m.meta_key, v)))
                .collect();
            by_title.entry(title.clone()).or_insert(RecipeExportEntry { title, meta });
        }
        Ok(Self { by_title })
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn find(&self, title: &str) -> Option<&RecipeExportEntry> {
        self.by_title.get(title)
    }
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InstructionEntry {
    Heading { instruction_heading: String },
    Item { instruction_text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IngredientEntry {
    Heading { ingredient_heading: String },
    Item { ingredient_amount: String, ingredient_unit: String, ingredient_name: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RecipeBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_instructions: Option<Vec<InstructionEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_ingredients: Option<Vec<IngredientEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_notes: Option<String>,
}

/// Look the post title up in the export. A miss is "no recipe", never an error.
pub fn resolve_recipe(title: &str, export: &RecipeExport) -> Option<RecipeBlock> {
    let entry = export.find(title)?;
    Some(RecipeBlock {
        recipe_instructions: decoded(entry, META_INSTRUCTIONS, "instructions")
            .and_then(|groups| flatten_instructions(&groups)),
        recipe_ingredients: decoded(entry, META_INGREDIENTS, "ingredients")
            .and_then(|groups| flatten_ingredients(&groups)),
        servings: scalar(entry, META_SERVINGS),
        servings_unit: scalar(entry, META_SERVINGS_UNIT),
        prep_time: scalar(entry, META_PREP_TIME),
        cook_time: scalar(entry, META_COOK_TIME),
        total_time: scalar(entry, META_TOTAL_TIME),
        recipe_notes: scalar(entry, META_NOTES),
    })
}

fn scalar(entry: &RecipeExportEntry, key: &str) -> Option<String> {
    entry.meta(key).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn decoded(entry: &RecipeExportEntry, key: &str, items_key: &str) -> Option<Vec<RecipeGroup>> {
    let raw = entry.meta(key)?;
    if raw.trim().is_empty() {
        return None;
    }
    match decode_groups(raw, items_key) {
        Ok(groups) => Some(groups),
        Err(e) => {
            telemetry::migrate().warn_kv("recipe meta skipped", [("title", entry.title.clone()), ("key", key.to_string()), ("error", e.to_string())]);
            None
        }
    }
}

/// Named groups emit a heading followed by their items; unnamed groups emit only items.
/// An empty result is `None` so "no data" stays distinct from a populated list.
pub fn flatten_groups<E>(
    groups: &[RecipeGroup],
    heading: impl Fn(&str) -> E,
    item: impl Fn(&HashMap<String, String>) -> Option<E>,
) -> Option<Vec<E>> {
    let mut out = Vec::new();
    for group in groups {
        if let Some(name) = &group.name {
            out.push(heading(name));
        }
        out.extend(group.items.iter().filter_map(&item));
    }
    if out.is_empty() { None } else { Some(out) }
}

pub fn flatten_instructions(groups: &[RecipeGroup]) -> Option<Vec<InstructionEntry>> {
    flatten_groups(
        groups,
        |name| InstructionEntry::Heading { instruction_heading: name.to_string() },
        |item| {
            let text = item.get("text")?;
            Some(InstructionEntry::Item { instruction_text: strip_paragraphs(text) })
        },
    )
}

pub fn flatten_ingredients(groups: &[RecipeGroup]) -> Option<Vec<IngredientEntry>> {
    flatten_groups(
        groups,
        |name| IngredientEntry::Heading { ingredient_heading: name.to_string() },
        |item| {
            let field = |k: &str| item.get(k).cloned().unwrap_or_default();
            Some(IngredientEntry::Item {
                ingredient_amount: field("amount"),
                ingredient_unit: field("unit"),
                ingredient_name: field("name"),
            })
        },
    )
}

fn strip_paragraphs(text: &str) -> String {
    PARAGRAPH_TAG.replace_all(text, "").trim().to_string()
}
