//! Catalog-driven initial state.
//!
//! Walks a component catalog, infers a typed default for every bound path, and
//! materializes those defaults as grouped `dataModelUpdate` contents so that a
//! freshly opened surface never reads an undefined path.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::data_model::{join_path, normalize_path, split_path};
use super::message::{ComponentDefinition, ComponentType, DataContent};
use super::value::{BindRef, StringValue};

/// Kind of value a bound path is expected to hold.
///
/// Ordered by precedence: when two components bind the same path, the
/// higher-ranked kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitKind {
    String,
    Bool,
    Number,
    JsonArray,
}

impl InitKind {
    pub fn rank(&self) -> u8 {
        match self {
            InitKind::String => 1,
            InitKind::Bool => 2,
            InitKind::Number => 3,
            InitKind::JsonArray => 4,
        }
    }

    /// Default entry for a path of this kind
    pub fn default_content(&self, key: &str) -> DataContent {
        match self {
            InitKind::String => DataContent::string(key, ""),
            InitKind::Bool => DataContent::boolean(key, false),
            InitKind::Number => DataContent::number(key, -1.0),
            InitKind::JsonArray => DataContent::json(key, Value::Array(Vec::new())),
        }
    }
}

/// One bound path and its inferred kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitItem {
    pub base: String,
    pub key: String,
    pub kind: InitKind,
}

impl InitItem {
    pub fn full_path(&self) -> String {
        join_path(&self.base, &self.key)
    }
}

/// One grouped mutation unit: every initialized key under `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataModelPatch {
    pub path: String,
    pub contents: Vec<DataContent>,
}

/// Infer init items from a catalog.
///
/// Output follows the first-seen order of each full path.
pub fn infer_init<'a>(
    components: impl IntoIterator<Item = &'a ComponentDefinition>,
) -> Vec<InitItem> {
    let mut best: IndexMap<String, InitItem> = IndexMap::new();

    for component in components {
        for (path, kind) in bound_paths(&component.component) {
            if !path.starts_with('/') {
                continue;
            }
            let Some((base, key)) = split_path(path) else {
                continue;
            };

            let full_path = join_path(&base, &key);
            match best.get_mut(&full_path) {
                Some(current) if kind.rank() > current.kind.rank() => current.kind = kind,
                Some(_) => {}
                None => {
                    best.insert(full_path, InitItem { base, key, kind });
                }
            }
        }
    }

    best.into_values().collect()
}

/// Turn init items into grouped patches.
///
/// `overrides` maps full paths to literal defaults that replace the kind default.
/// One patch is produced per base path, in first-seen base order.
pub fn materialize(items: &[InitItem], overrides: &Map<String, Value>) -> Vec<DataModelPatch> {
    let overrides: IndexMap<String, &Value> = overrides
        .iter()
        .map(|(path, value)| (normalize_path(path), value))
        .collect();

    let mut grouped: IndexMap<String, Vec<DataContent>> = IndexMap::new();
    for item in items {
        if item.key.is_empty() {
            continue;
        }

        let entry = match overrides.get(&item.full_path()) {
            Some(literal) => DataContent::from_literal(&item.key, literal),
            None => item.kind.default_content(&item.key),
        };
        grouped.entry(item.base.clone()).or_default().push(entry);
    }

    grouped
        .into_iter()
        .map(|(path, contents)| DataModelPatch { path, contents })
        .collect()
}

fn bound_paths(component: &ComponentType) -> Vec<(&str, InitKind)> {
    fn string_path(value: Option<&StringValue>) -> Option<(&str, InitKind)> {
        Some((value?.as_path()?, InitKind::String))
    }
    fn bind_path(bind: Option<&BindRef>, kind: InitKind) -> Option<(&str, InitKind)> {
        Some((bind?.path.as_str(), kind))
    }

    let found = match component {
        ComponentType::TextField(field) => vec![string_path(Some(&field.text))],
        ComponentType::Select(select) => vec![
            bind_path(select.options.as_ref(), InitKind::JsonArray),
            bind_path(select.selected_index.as_ref(), InitKind::Number),
        ],
        ComponentType::Image(image) => vec![string_path(image.src.as_ref())],
        ComponentType::Card(card) => vec![string_path(card.body.as_ref())],
        ComponentType::Text(text) => vec![string_path(Some(&text.text))],
        _ => Vec::new(),
    };

    found.into_iter().flatten().collect()
}
