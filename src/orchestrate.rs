//! Handling of user actions: the submit flow.

use std::sync::Arc;
use std::time::Duration;

use relay_kit::a2a::{AgentCall, AgentClient, AgentError, Artifact, run_all};
use relay_kit::a2ui::{
    NoActiveStreamError, SurfaceEmitter, UserAction, detail_value, normalize_path,
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::bindings::{AgentBinding, Bindings, SelectBinding};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    NoActiveStream(#[from] NoActiveStreamError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("ERROR: {0}")]
    Agents(#[source] AgentError),
}

/// Runs submitted queries against the configured agents and writes the
/// results into the submitting surface.
#[derive(Clone)]
pub struct Orchestrator {
    emitter: SurfaceEmitter,
    client: AgentClient,
    bindings: Arc<Bindings>,
    rpc_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        emitter: SurfaceEmitter,
        client: AgentClient,
        bindings: Bindings,
        rpc_timeout: Duration,
    ) -> Self {
        Orchestrator {
            emitter,
            client,
            bindings: Arc::new(bindings),
            rpc_timeout,
        }
    }

    pub fn emitter(&self) -> &SurfaceEmitter {
        &self.emitter
    }

    /// Handle one user action.
    ///
    /// Actions other than the submit action are acknowledged and ignored.
    pub async fn handle_action(&self, action: &UserAction) -> Result<(), ActionError> {
        let surface_id = action.surface_id.as_str();
        if !self.emitter.registry().is_active(surface_id) {
            return Err(NoActiveStreamError {
                surface_id: surface_id.to_string(),
            }
            .into());
        }

        if action.name != self.bindings.submit_action {
            ::log::debug!("Action {:?} on {surface_id} acknowledged", action.name);
            return Ok(());
        }

        let query = query_text(action.context.get("query"));
        if query.trim().is_empty() {
            return Err(ActionError::EmptyQuery);
        }

        ::log::info!("Surface {surface_id}: submit {query:?}");
        self.submit(surface_id, &query).await
    }

    async fn submit(&self, surface_id: &str, query: &str) -> Result<(), ActionError> {
        for agent in &self.bindings.agents {
            for (path, value) in &agent.loading {
                self.emitter.write(surface_id, path, value)?;
            }
        }
        self.emitter.write(surface_id, &self.bindings.query_path, &json!(query))?;

        let calls = self
            .bindings
            .agents
            .iter()
            .map(|agent| {
                AgentCall::new(&agent.name, &agent.url, json!({ "query": query }))
                    .with_timeout(self.rpc_timeout)
            })
            .collect();

        match run_all(&self.client, calls).await {
            Ok(artifacts) => {
                for (agent, artifact) in self.bindings.agents.iter().zip(&artifacts) {
                    self.write_results(surface_id, agent, artifact)?;
                }
                Ok(())
            }
            Err(e) => {
                let error = ActionError::Agents(e);
                ::log::error!("Surface {surface_id}: {error}");

                let message = json!(error.to_string());
                for path in &self.bindings.error_paths {
                    if let Err(e) = self.emitter.write(surface_id, path, &message) {
                        ::log::warn!("Error state not delivered: {e}");
                        break;
                    }
                }
                Err(error)
            }
        }
    }

    fn write_results(
        &self,
        surface_id: &str,
        agent: &AgentBinding,
        artifact: &Artifact,
    ) -> Result<(), NoActiveStreamError> {
        let mut written = Vec::with_capacity(agent.results.len());
        for result in &agent.results {
            let value = result.project(&artifact.data).cloned().unwrap_or_else(|| {
                ::log::warn!(
                    "{} artifact has nothing at {:?}, clearing {}",
                    agent.name,
                    result.pointer,
                    result.path
                );
                Value::Null
            });
            self.emitter.write(surface_id, &result.path, &value)?;
            written.push((normalize_path(&result.path), value));
        }

        if let Some(select) = &agent.select {
            let options_path = normalize_path(&select.options);
            let options = written
                .iter()
                .find(|(path, _)| *path == options_path)
                .and_then(|(_, value)| value.as_array());
            self.write_selection(surface_id, select, options.map(Vec::as_slice))?;
        }
        Ok(())
    }

    /// Select the first option, or none when the list is empty or missing.
    fn write_selection(
        &self,
        surface_id: &str,
        select: &SelectBinding,
        options: Option<&[Value]>,
    ) -> Result<(), NoActiveStreamError> {
        let first = options.and_then(<[Value]>::first);
        let index = if first.is_some() { 0 } else { -1 };

        self.emitter.write(surface_id, &select.selected_index, &json!(index))?;
        for detail in &select.details {
            self.emitter.write(surface_id, &detail.path, &detail_value(first, detail))?;
        }
        Ok(())
    }
}

fn query_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}
