//! Catalog and bindings files.
//!
//! The catalog describes the components of the surface. The bindings map the
//! coordinator's work onto data-model paths: which action submits a query,
//! which agents to call, where their results land and where errors go.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use relay_kit::a2ui::{ComponentDefinition, DetailBinding, SurfaceCatalog};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::AgentOverride;

const DEFAULT_ROOT: &str = "root";

fn default_submit_action() -> String {
    "submit".to_string()
}

fn default_query_path() -> String {
    "/form/query".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bindings {
    /// Root component id, preferred over the catalog's
    #[serde(default)]
    pub root: Option<String>,

    /// Action name that triggers a fan-out
    #[serde(default = "default_submit_action")]
    pub submit_action: String,

    /// Where the submitted query is echoed back
    #[serde(default = "default_query_path")]
    pub query_path: String,

    /// Full path to literal, replacing inferred initial values
    #[serde(default)]
    pub defaults: Map<String, Value>,

    /// Paths that receive `ERROR: <message>` when a fan-out fails
    #[serde(default)]
    pub error_paths: Vec<String>,

    #[serde(default)]
    pub agents: Vec<AgentBinding>,
}

impl Default for Bindings {
    fn default() -> Self {
        Bindings {
            root: None,
            submit_action: default_submit_action(),
            query_path: default_query_path(),
            defaults: Map::new(),
            error_paths: Vec::new(),
            agents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBinding {
    pub name: String,
    pub url: String,

    /// Literals written before the agent is called
    #[serde(default)]
    pub loading: Map<String, Value>,

    #[serde(default)]
    pub results: Vec<ResultBinding>,

    /// Selection made once the results are written
    #[serde(default)]
    pub select: Option<SelectBinding>,
}

/// Selects the first entry of a result list, as a `Select` click would.
///
/// ```text
/// {"options": "/flights/options", "selectedIndex": "/flights/selectedIndex",
///  "details": [{"path": "/flights/detail_image", "field": "image_url"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBinding {
    /// Path of the option list, filled by one of the agent's results
    pub options: String,
    pub selected_index: String,
    #[serde(default)]
    pub details: Vec<DetailBinding>,
}

/// Copies part of an artifact's data into the data model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultBinding {
    /// Full data-model path
    pub path: String,

    /// JSON pointer into the artifact data; empty selects all of it
    #[serde(default)]
    pub pointer: String,
}

impl ResultBinding {
    pub fn project<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        data.pointer(&self.pointer)
    }
}

impl Bindings {
    /// Replace agent addresses by name.
    pub fn apply_overrides(&mut self, overrides: &[AgentOverride]) {
        for agent_override in overrides {
            match self.agents.iter_mut().find(|a| a.name == agent_override.name) {
                Some(agent) => {
                    ::log::info!(
                        "Agent {} address overridden: {}",
                        agent.name,
                        agent_override.url
                    );
                    agent.url = agent_override.url.to_string();
                }
                None => {
                    ::log::warn!(
                        "Ignoring override for unknown agent {}",
                        agent_override.name
                    );
                }
            }
        }
    }
}

/// Component catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub root: Option<String>,
    pub components: Vec<ComponentDefinition>,
}

/// Read the bindings file. A missing file yields the defaults.
pub fn load_bindings(path: &Path) -> Result<Bindings> {
    if !path.exists() {
        ::log::warn!("Bindings file {} not found, using defaults", path.display());
        return Ok(Bindings::default());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read bindings file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse bindings file {}", path.display()))
}

pub fn load_catalog(path: &Path) -> Result<CatalogFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse catalog file {}", path.display()))
}

/// Combine the catalog with the bindings' root and defaults.
pub fn surface_catalog(catalog: CatalogFile, bindings: &Bindings) -> SurfaceCatalog {
    let root = bindings
        .root
        .clone()
        .or(catalog.root)
        .unwrap_or_else(|| DEFAULT_ROOT.to_string());

    SurfaceCatalog {
        root,
        components: catalog.components,
        defaults: bindings.defaults.clone(),
    }
}
