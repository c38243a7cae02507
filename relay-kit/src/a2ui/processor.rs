//! Surface Processor
//!
//! Client-side reconciliation for one surface: applies incoming frames to the
//! component registry and data model, rebuilds the render tree, and turns user
//! interactions into data-model writes and [`UserAction`]s.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{
    data_model::{DataModel, join_path, normalize_path},
    message::*,
    registry::ComponentRegistry,
    render::{RenderNode, build_tree, selected_index, value_text},
    value::{BooleanValue, NumberValue, StringValue},
};

/// Action name used when a button defines none.
const DEFAULT_ACTION_NAME: &str = "action";

/// Event emitted when rendering starts (or is re-anchored)
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCreatedEvent {
    pub surface_id: String,
    pub root: String,
}

/// Event emitted when components are added or replaced
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceUpdatedEvent {
    pub surface_id: String,
    pub updated_components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDeletedEvent {
    pub surface_id: String,
}

/// Keys written by one `dataModelUpdate`
#[derive(Debug, Clone, PartialEq)]
pub struct DataModelUpdatedEvent {
    pub surface_id: String,
    pub updated_paths: Vec<String>,
}

/// What changed after applying a frame
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorEvent {
    SurfaceCreated(SurfaceCreatedEvent),
    SurfaceUpdated(SurfaceUpdatedEvent),
    SurfaceDeleted(SurfaceDeletedEvent),
    DataModelUpdated(DataModelUpdatedEvent),
    /// The render tree was rebuilt; read it with [`SurfaceProcessor::tree`]
    Rendered { surface_id: String },
}

/// Lifecycle of a surface on the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No root yet: frames are applied but nothing is rendered
    Uninitialized,
    Rendering,
}

/// A user interaction that could not be applied.
#[derive(Debug, Error, PartialEq)]
pub enum InteractionError {
    #[error("no component with id {0}")]
    UnknownComponent(String),

    #[error("component {id} is a {actual}, expected {expected}")]
    WrongType {
        id: String,
        expected: &'static str,
        actual: String,
    },

    #[error("component {0} is not bound to a data model path")]
    Unbound(String),
}

/// The A2UI message processor for one surface.
///
/// # Example
///
/// ```rust,ignore
/// let mut processor = SurfaceProcessor::new("main");
///
/// let json = r#"{"beginRendering": {"surfaceId": "main", "root": "root"}}"#;
/// for event in processor.process_json(json)? {
///     if let ProcessorEvent::Rendered { .. } = event {
///         println!("{}", processor.tree().unwrap().outline());
///     }
/// }
/// ```
#[derive(Debug)]
pub struct SurfaceProcessor {
    surface_id: String,

    /// Component catalog by id
    registry: ComponentRegistry,

    data_model: DataModel,

    /// Root component ID, set by `beginRendering`
    root: Option<String>,

    /// Last render tree, `None` until a root is known
    tree: Option<RenderNode>,

    /// Clicked actions not yet taken by the host
    pending_actions: Vec<UserAction>,
}

impl SurfaceProcessor {
    pub fn new(surface_id: impl Into<String>) -> Self {
        SurfaceProcessor {
            surface_id: surface_id.into(),
            registry: ComponentRegistry::new(),
            data_model: DataModel::new(),
            root: None,
            tree: None,
            pending_actions: Vec::new(),
        }
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn state(&self) -> SurfaceState {
        if self.root.is_some() {
            SurfaceState::Rendering
        } else {
            SurfaceState::Uninitialized
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn data_model(&self) -> &DataModel {
        &self.data_model
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// The current render tree
    pub fn tree(&self) -> Option<&RenderNode> {
        self.tree.as_ref()
    }

    /// Parse and process one frame payload.
    ///
    /// A malformed frame is logged and returned as an error; the processor state
    /// is left untouched.
    pub fn process_json(&mut self, json: &str) -> Result<Vec<ProcessorEvent>, ProtocolFrameError> {
        match parse_frame(json) {
            Ok(message) => Ok(self.process_message(message)),
            Err(e) => {
                ::log::warn!("[A2UI processor] Dropping frame: {e}");
                Err(e)
            }
        }
    }

    /// Apply one frame addressed to this surface.
    ///
    /// Frames for other surfaces are ignored and yield no events.
    pub fn process_message(&mut self, message: A2uiMessage) -> Vec<ProcessorEvent> {
        if message.surface_id() != self.surface_id {
            ::log::debug!(
                "[A2UI processor] Ignoring frame for surface {}",
                message.surface_id()
            );
            return Vec::new();
        }

        match message {
            A2uiMessage::BeginRendering(msg) => self.process_begin_rendering(msg),
            A2uiMessage::SurfaceUpdate(msg) => self.process_surface_update(msg),
            A2uiMessage::DataModelUpdate(msg) => self.process_data_model_update(msg),
            A2uiMessage::DeleteSurface(_) => self.process_delete_surface(),
            A2uiMessage::UserAction(msg) => {
                // Normally sent by the client, kept for the host to forward
                self.pending_actions.push(msg);
                vec![]
            }
        }
    }

    // ========================================================================
    // Interactions
    // ========================================================================

    /// Write text typed into a `TextField` to its bound path.
    pub fn input_text(
        &mut self,
        component_id: &str,
        text: &str,
    ) -> Result<Vec<ProcessorEvent>, InteractionError> {
        let path = match self.component(component_id)? {
            ComponentType::TextField(field) => field
                .text
                .as_path()
                .map(str::to_string)
                .ok_or_else(|| InteractionError::Unbound(component_id.to_string()))?,
            other => return Err(wrong_type(component_id, "TextField", other)),
        };

        self.data_model.set(&path, Value::String(text.to_string()));
        Ok(self.data_changed(vec![normalize_path(&path)]))
    }

    /// Select option `index` of a `Select` and recompute its detail paths.
    pub fn select_option(
        &mut self,
        component_id: &str,
        index: usize,
    ) -> Result<Vec<ProcessorEvent>, InteractionError> {
        let select = match self.component(component_id)? {
            ComponentType::Select(select) => select.clone(),
            other => return Err(wrong_type(component_id, "Select", other)),
        };
        let index_path = select
            .selected_index
            .as_ref()
            .map(|bind| bind.path.clone())
            .ok_or_else(|| InteractionError::Unbound(component_id.to_string()))?;

        self.data_model.set(&index_path, Value::from(index));
        let mut updated = vec![normalize_path(&index_path)];

        let option = selected_index(&select, &self.data_model).and_then(|i| {
            let options = self.data_model.get_array(&select.options.as_ref()?.path)?;
            options.get(i).cloned()
        });

        for detail in &select.details {
            self.data_model.set(&detail.path, detail_value(option.as_ref(), detail));
            updated.push(normalize_path(&detail.path));
        }

        Ok(self.data_changed(updated))
    }

    /// Click a `Button`: resolve its action context and queue the action.
    pub fn click(&mut self, component_id: &str) -> Result<UserAction, InteractionError> {
        let action_def = match self.component(component_id)? {
            ComponentType::Button(button) => button.action.clone().unwrap_or_default(),
            other => return Err(wrong_type(component_id, "Button", other)),
        };

        let action = self.create_action(component_id, &action_def);
        self.pending_actions.push(action.clone());
        Ok(action)
    }

    /// Create a user action, resolving context values from the data model
    pub fn create_action(&self, component_id: &str, action_def: &ActionDefinition) -> UserAction {
        let mut context = Map::new();
        for item in &action_def.context {
            context.insert(item.key.clone(), self.resolve_action_value(&item.value));
        }

        let name = if action_def.name.is_empty() {
            DEFAULT_ACTION_NAME.to_string()
        } else {
            action_def.name.clone()
        };

        UserAction {
            surface_id: self.surface_id.clone(),
            name,
            context,
            component_id: Some(component_id.to_string()),
        }
    }

    /// Drain queued actions in click order.
    pub fn take_pending_actions(&mut self) -> Vec<UserAction> {
        std::mem::take(&mut self.pending_actions)
    }

    fn process_begin_rendering(&mut self, msg: BeginRendering) -> Vec<ProcessorEvent> {
        if msg.root.is_empty() {
            ::log::warn!("[A2UI processor] beginRendering without root ignored");
            return Vec::new();
        }

        self.root = Some(msg.root.clone());
        let mut events = vec![ProcessorEvent::SurfaceCreated(SurfaceCreatedEvent {
            surface_id: msg.surface_id,
            root: msg.root,
        })];
        events.extend(self.rebuild());
        events
    }

    fn process_surface_update(&mut self, msg: SurfaceUpdate) -> Vec<ProcessorEvent> {
        let mut updated_ids = Vec::new();

        for component in msg.components {
            if component.id.is_empty() || component.component.type_name().is_empty() {
                ::log::warn!("[A2UI processor] Skipping component without id or type");
                continue;
            }
            updated_ids.push(component.id.clone());
            self.registry.upsert(component);
        }

        let mut events = vec![ProcessorEvent::SurfaceUpdated(SurfaceUpdatedEvent {
            surface_id: msg.surface_id,
            updated_components: updated_ids,
        })];
        events.extend(self.rebuild());
        events
    }

    fn process_data_model_update(&mut self, msg: DataModelUpdate) -> Vec<ProcessorEvent> {
        let updated_paths = msg
            .contents
            .iter()
            .map(|content| join_path(&msg.path, &content.key))
            .collect();

        self.data_model.apply_updates(&msg.path, &msg.contents);
        self.data_changed(updated_paths)
    }

    fn process_delete_surface(&mut self) -> Vec<ProcessorEvent> {
        self.registry.clear();
        self.data_model.clear();
        self.root = None;
        self.tree = None;

        vec![ProcessorEvent::SurfaceDeleted(SurfaceDeletedEvent {
            surface_id: self.surface_id.clone(),
        })]
    }

    fn data_changed(&mut self, updated_paths: Vec<String>) -> Vec<ProcessorEvent> {
        let mut events = vec![ProcessorEvent::DataModelUpdated(DataModelUpdatedEvent {
            surface_id: self.surface_id.clone(),
            updated_paths,
        })];
        events.extend(self.rebuild());
        events
    }

    /// Rebuild the render tree if a root is known.
    fn rebuild(&mut self) -> Option<ProcessorEvent> {
        let root = self.root.as_deref()?;
        self.tree = Some(build_tree(root, &self.registry, &self.data_model));
        Some(ProcessorEvent::Rendered {
            surface_id: self.surface_id.clone(),
        })
    }

    fn component(&self, id: &str) -> Result<&ComponentType, InteractionError> {
        self.registry
            .get_type(id)
            .ok_or_else(|| InteractionError::UnknownComponent(id.to_string()))
    }

    fn resolve_action_value(&self, value: &ActionValue) -> Value {
        let path = match value {
            ActionValue::String(StringValue::Literal { literal_string }) => {
                return Value::String(literal_string.clone());
            }
            ActionValue::String(StringValue::Plain(s)) => return Value::String(s.clone()),
            ActionValue::Number(NumberValue::Literal { literal_number }) => {
                return serde_json::json!(*literal_number);
            }
            ActionValue::Boolean(BooleanValue::Literal { literal_boolean }) => {
                return Value::Bool(*literal_boolean);
            }
            ActionValue::String(StringValue::Path { path })
            | ActionValue::Number(NumberValue::Path { path })
            | ActionValue::Boolean(BooleanValue::Path { path }) => path,
        };

        self.data_model.get(path).cloned().unwrap_or(Value::Null)
    }
}

fn wrong_type(id: &str, expected: &'static str, actual: &ComponentType) -> InteractionError {
    InteractionError::WrongType {
        id: id.to_string(),
        expected,
        actual: actual.type_name().to_string(),
    }
}

/// Value written at a detail path for the selected option.
///
/// The named field of the option, or a `key: value` listing of all its fields
/// in their original order. No option, or a missing field, yields `""`.
pub fn detail_value(option: Option<&Value>, detail: &DetailBinding) -> Value {
    match (option, detail.field.as_deref()) {
        (None, _) => Value::String(String::new()),
        (Some(option), Some(field)) => option
            .get(field)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        (Some(option), None) => Value::String(describe_option(option)),
    }
}

/// `key: value` lines for an object option, plain text otherwise.
fn describe_option(option: &Value) -> String {
    match option {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{key}: {}", value_text(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => value_text(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CATALOG: &str = r#"{"surfaceUpdate": {"surfaceId": "main", "components": [
        {"id": "root", "component": {"Column": {"children": {"explicitList": ["query", "go", "weather", "pick"]}}}},
        {"id": "query", "component": {"TextField": {"text": {"path": "/form/query"}}}},
        {"id": "go_label", "component": {"Text": {"text": {"literalString": "Search"}}}},
        {"id": "go", "component": {"Button": {"child": "go_label", "action": {"name": "submit", "context": [
            {"key": "query", "value": {"path": "/form/query"}},
            {"key": "source", "value": {"literalString": "web"}}
        ]}}}},
        {"id": "weather", "component": {"Card": {"title": {"literalString": "Weather"}, "body": {"path": "/weather/temp_text"}}}},
        {"id": "pick", "component": {"Select": {
            "options": {"path": "/flights/options"},
            "selectedIndex": {"path": "/flights/selectedIndex"},
            "optionLabel": "airline",
            "details": [
                {"path": "/flights/selected_image", "field": "image_url"},
                {"path": "/flights/selected_detail"}
            ]
        }}}
    ]}}"#;

    fn rendering_processor() -> SurfaceProcessor {
        let mut processor = SurfaceProcessor::new("main");
        processor.process_json(CATALOG).unwrap();
        processor
            .process_json(r#"{"beginRendering": {"surfaceId": "main", "root": "root"}}"#)
            .unwrap();
        processor
    }

    #[test]
    fn test_begin_rendering_creates_surface() {
        let mut processor = SurfaceProcessor::new("main");
        assert_eq!(processor.state(), SurfaceState::Uninitialized);

        let events = processor.process_message(A2uiMessage::BeginRendering(BeginRendering {
            surface_id: "main".to_string(),
            root: "root".to_string(),
        }));

        assert!(matches!(
            &events[0],
            ProcessorEvent::SurfaceCreated(e) if e.surface_id == "main" && e.root == "root"
        ));
        assert_eq!(processor.state(), SurfaceState::Rendering);
        assert_eq!(
            processor.tree(),
            Some(&RenderNode::Placeholder { id: "root".to_string() })
        );
    }

    #[test]
    fn test_empty_root_ignored() {
        let mut processor = SurfaceProcessor::new("main");
        let events = processor
            .process_json(r#"{"beginRendering": {"surfaceId": "main", "root": ""}}"#)
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(processor.state(), SurfaceState::Uninitialized);
    }

    #[test]
    fn test_other_surface_ignored() {
        let mut processor = SurfaceProcessor::new("main");
        let events = processor
            .process_json(r#"{"beginRendering": {"surfaceId": "side", "root": "root"}}"#)
            .unwrap();

        assert!(events.is_empty());
        assert!(processor.root().is_none());
    }

    #[test]
    fn test_malformed_frame_dropped() {
        let mut processor = rendering_processor();
        let before = processor.tree().cloned();

        assert!(processor.process_json("{not json").is_err());
        assert!(processor.process_json(r#"{"unknown": 1}"#).is_err());
        assert_eq!(processor.tree().cloned(), before);
    }

    #[test]
    fn test_placeholder_then_recovery() {
        let mut processor = SurfaceProcessor::new("main");
        processor
            .process_json(r#"{"surfaceUpdate": {"surfaceId": "main", "components": [
                {"id": "root", "component": {"Column": {"children": {"explicitList": ["late"]}}}}
            ]}}"#)
            .unwrap();
        processor
            .process_json(r#"{"beginRendering": {"surfaceId": "main", "root": "root"}}"#)
            .unwrap();

        let tree = processor.tree().unwrap();
        assert_eq!(
            tree.find("late"),
            Some(&RenderNode::Placeholder { id: "late".to_string() })
        );

        let events = processor
            .process_json(r#"{"surfaceUpdate": {"surfaceId": "main", "components": [
                {"id": "late", "component": {"Text": {"text": {"literalString": "here"}}}}
            ]}}"#)
            .unwrap();

        assert!(events.contains(&ProcessorEvent::Rendered {
            surface_id: "main".to_string()
        }));
        assert!(matches!(
            processor.tree().unwrap().find("late"),
            Some(RenderNode::Text { text, .. }) if text == "here"
        ));
    }

    #[test]
    fn test_data_model_update_rerenders() {
        let mut processor = rendering_processor();

        let events = processor
            .process_json(r#"{"dataModelUpdate": {"surfaceId": "main", "path": "/weather", "contents": [
                {"key": "temp_text", "valueString": "18 ~ 24 °C"}
            ]}}"#)
            .unwrap();

        assert_eq!(
            events[0],
            ProcessorEvent::DataModelUpdated(DataModelUpdatedEvent {
                surface_id: "main".to_string(),
                updated_paths: vec!["/weather/temp_text".to_string()],
            })
        );
        assert_eq!(
            processor.data_model().get_string("/weather/temp_text"),
            Some("18 ~ 24 °C")
        );
        assert!(matches!(
            processor.tree().unwrap().find("weather"),
            Some(RenderNode::Card { body, .. }) if body == "18 ~ 24 °C"
        ));
    }

    #[test]
    fn test_data_model_update_before_root_does_not_render() {
        let mut processor = SurfaceProcessor::new("main");
        let events = processor
            .process_json(r#"{"dataModelUpdate": {"surfaceId": "main", "contents": [{"key": "a"}]}}"#)
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(processor.data_model().get_string("/a"), Some(""));
        assert!(processor.tree().is_none());
    }

    #[test]
    fn test_input_text_then_click() {
        let mut processor = rendering_processor();

        processor.input_text("query", "Tokyo").unwrap();
        let action = processor.click("go").unwrap();

        assert_eq!(action.name, "submit");
        assert_eq!(action.surface_id, "main");
        assert_eq!(action.context.get("query"), Some(&json!("Tokyo")));
        assert_eq!(action.context.get("source"), Some(&json!("web")));
        assert_eq!(processor.take_pending_actions(), vec![action]);
        assert!(processor.take_pending_actions().is_empty());
    }

    #[test]
    fn test_interaction_errors() {
        let mut processor = rendering_processor();

        assert_eq!(
            processor.input_text("nope", "x"),
            Err(InteractionError::UnknownComponent("nope".to_string()))
        );
        assert!(matches!(
            processor.click("query"),
            Err(InteractionError::WrongType { expected: "Button", .. })
        ));
    }

    #[test]
    fn test_select_option_recomputes_details() {
        let mut processor = rendering_processor();
        processor
            .process_json(r#"{"dataModelUpdate": {"surfaceId": "main", "path": "/flights", "contents": [
                {"key": "options", "valueJson": [
                    {"airline": "A1", "image_url": "http://img/a1.png"},
                    {"airline": "B2", "image_url": "http://img/b2.png"}
                ]}
            ]}}"#)
            .unwrap();

        processor.select_option("pick", 1).unwrap();

        let model = processor.data_model();
        assert_eq!(model.get_number("/flights/selectedIndex"), Some(1.0));
        assert_eq!(
            model.get_string("/flights/selected_image"),
            Some("http://img/b2.png")
        );
        assert_eq!(
            model.get_string("/flights/selected_detail"),
            Some("airline: B2\nimage_url: http://img/b2.png")
        );

        processor.select_option("pick", 7).unwrap();
        assert_eq!(processor.data_model().get_string("/flights/selected_image"), Some(""));
    }

    #[test]
    fn test_detail_listing_keeps_field_order() {
        let option = json!({"price_cny": 980, "airline": "MU", "depart": "08:10"});
        let listing = DetailBinding {
            path: "/flights/detail_text".to_string(),
            field: None,
        };

        assert_eq!(
            detail_value(Some(&option), &listing),
            json!("price_cny: 980\nairline: MU\ndepart: 08:10")
        );
        assert_eq!(detail_value(None, &listing), json!(""));
    }

    #[test]
    fn test_delete_surface_resets() {
        let mut processor = rendering_processor();

        let events = processor
            .process_json(r#"{"deleteSurface": {"surfaceId": "main"}}"#)
            .unwrap();

        assert_eq!(
            events,
            vec![ProcessorEvent::SurfaceDeleted(SurfaceDeletedEvent {
                surface_id: "main".to_string()
            })]
        );
        assert!(processor.registry().is_empty());
        assert!(processor.tree().is_none());
        assert_eq!(processor.state(), SurfaceState::Uninitialized);
    }
}
