//! Frames of the UI stream and the event posted back.
//!
//! Each frame is a JSON object with a single key naming its kind. Components
//! are sent as a flat adjacency list and refer to each other by id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::registry::ComponentKind;
use super::value::{BindRef, BooleanValue, NumberValue, StringValue};

/// Keys that identify a frame on the UI stream.
const FRAME_KINDS: [&str; 5] = [
    "beginRendering",
    "surfaceUpdate",
    "dataModelUpdate",
    "deleteSurface",
    "userAction",
];

/// A frame that could not be turned into an [`A2uiMessage`].
///
/// Always recovered locally: the frame is logged and dropped.
#[derive(Debug, Error)]
pub enum ProtocolFrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("frame has no recognised kind (keys: {0:?})")]
    UnknownKind(Vec<String>),

    #[error("malformed {kind} frame: {source}")]
    Shape {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one `data:` payload from the UI stream.
pub fn parse_frame(text: &str) -> Result<A2uiMessage, ProtocolFrameError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolFrameError::Json)?;

    let kind = value
        .as_object()
        .and_then(|obj| FRAME_KINDS.iter().find(|k| obj.contains_key(**k)))
        .copied();

    let Some(kind) = kind else {
        let keys = value
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();
        return Err(ProtocolFrameError::UnknownKind(keys));
    };

    serde_json::from_value(value).map_err(|source| ProtocolFrameError::Shape {
        kind: kind.to_string(),
        source,
    })
}

/// One frame, keyed by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum A2uiMessage {
    /// Root is known, the client may render
    BeginRendering(BeginRendering),

    /// Component definitions, merged by id
    SurfaceUpdate(SurfaceUpdate),

    /// Keys written under a base path
    DataModelUpdate(DataModelUpdate),

    /// Forget everything about a surface
    DeleteSurface(DeleteSurface),

    /// Client to server only
    UserAction(UserAction),
}

impl A2uiMessage {
    pub fn surface_id(&self) -> &str {
        match self {
            A2uiMessage::BeginRendering(m) => &m.surface_id,
            A2uiMessage::SurfaceUpdate(m) => &m.surface_id,
            A2uiMessage::DataModelUpdate(m) => &m.surface_id,
            A2uiMessage::DeleteSurface(m) => &m.surface_id,
            A2uiMessage::UserAction(m) => &m.surface_id,
        }
    }
}

/// Tell the client which component is the root.
///
/// ```text
/// {"beginRendering": {"surfaceId": "main", "root": "root"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRendering {
    pub surface_id: String,

    /// ID of the root component. Empty is tolerated on the wire and ignored.
    #[serde(default)]
    pub root: String,
}

/// Components to merge into the surface's registry.
///
/// ```text
/// {
///   "surfaceUpdate": {
///     "surfaceId": "main",
///     "components": [
///       {"id": "root", "component": {"Column": {"children": {"explicitList": ["title"]}}}}
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceUpdate {
    pub surface_id: String,

    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

/// One node of the component adjacency list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawComponentDefinition", into = "RawComponentDefinition")]
pub struct ComponentDefinition {
    /// Unique component ID
    pub id: String,

    pub component: ComponentType,
}

impl ComponentDefinition {
    pub fn new(id: impl Into<String>, component: ComponentType) -> Self {
        ComponentDefinition {
            id: id.into(),
            component,
        }
    }
}

/// Wire shape: `{"id": ..., "component": {"<Type>": payload}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawComponentDefinition {
    #[serde(default)]
    id: String,
    #[serde(default)]
    component: Map<String, Value>,
}

impl From<RawComponentDefinition> for ComponentDefinition {
    fn from(raw: RawComponentDefinition) -> Self {
        let (type_name, payload) = raw
            .component
            .into_iter()
            .next()
            .unwrap_or_else(|| (String::new(), Value::Null));

        ComponentDefinition {
            component: ComponentType::from_parts(&raw.id, &type_name, payload),
            id: raw.id,
        }
    }
}

impl From<ComponentDefinition> for RawComponentDefinition {
    fn from(def: ComponentDefinition) -> Self {
        let (type_name, payload) = def.component.into_parts();
        let mut component = Map::new();
        component.insert(type_name, payload);
        RawComponentDefinition {
            id: def.id,
            component,
        }
    }
}

/// Closed set of component payloads.
///
/// Types outside the catalog map to [`ComponentType::Unsupported`] instead of
/// failing the whole frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentType {
    // Layout components
    Column(ContainerComponent),
    Row(ContainerComponent),
    Card(CardComponent),

    // Display components
    Text(TextComponent),
    Image(ImageComponent),

    // Interactive components
    Button(ButtonComponent),
    TextField(TextFieldComponent),
    Select(SelectComponent),

    Unsupported { type_name: String, payload: Value },
}

impl ComponentType {
    /// The wire name of this component type
    pub fn type_name(&self) -> &str {
        match self {
            ComponentType::Unsupported { type_name, .. } => type_name,
            other => other.kind().map(|k| k.name()).unwrap_or_default(),
        }
    }

    /// Catalog kind, `None` for unsupported types
    pub fn kind(&self) -> Option<ComponentKind> {
        Some(match self {
            ComponentType::Column(_) => ComponentKind::Column,
            ComponentType::Row(_) => ComponentKind::Row,
            ComponentType::Card(_) => ComponentKind::Card,
            ComponentType::Text(_) => ComponentKind::Text,
            ComponentType::Image(_) => ComponentKind::Image,
            ComponentType::Button(_) => ComponentKind::Button,
            ComponentType::TextField(_) => ComponentKind::TextField,
            ComponentType::Select(_) => ComponentKind::Select,
            ComponentType::Unsupported { .. } => return None,
        })
    }

    fn from_parts(id: &str, type_name: &str, payload: Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(
            id: &str,
            type_name: &str,
            payload: Value,
            wrap: fn(T) -> ComponentType,
        ) -> ComponentType {
            // A null payload means "all defaults".
            let source = if payload.is_null() {
                Value::Object(Map::new())
            } else {
                payload.clone()
            };
            match serde_json::from_value::<T>(source) {
                Ok(p) => wrap(p),
                Err(e) => {
                    log::warn!("[A2UI] Component {id}: bad {type_name} payload: {e}");
                    ComponentType::Unsupported {
                        type_name: type_name.to_string(),
                        payload,
                    }
                }
            }
        }

        match ComponentKind::from_name(type_name) {
            Some(ComponentKind::Column) => typed(id, type_name, payload, ComponentType::Column),
            Some(ComponentKind::Row) => typed(id, type_name, payload, ComponentType::Row),
            Some(ComponentKind::Card) => typed(id, type_name, payload, ComponentType::Card),
            Some(ComponentKind::Text) => typed(id, type_name, payload, ComponentType::Text),
            Some(ComponentKind::Image) => typed(id, type_name, payload, ComponentType::Image),
            Some(ComponentKind::Button) => typed(id, type_name, payload, ComponentType::Button),
            Some(ComponentKind::TextField) => {
                typed(id, type_name, payload, ComponentType::TextField)
            }
            Some(ComponentKind::Select) => typed(id, type_name, payload, ComponentType::Select),
            None => ComponentType::Unsupported {
                type_name: type_name.to_string(),
                payload,
            },
        }
    }

    fn into_parts(self) -> (String, Value) {
        let type_name = self.type_name().to_string();
        let payload = match self {
            ComponentType::Column(p) | ComponentType::Row(p) => serde_json::to_value(p),
            ComponentType::Card(p) => serde_json::to_value(p),
            ComponentType::Text(p) => serde_json::to_value(p),
            ComponentType::Image(p) => serde_json::to_value(p),
            ComponentType::Button(p) => serde_json::to_value(p),
            ComponentType::TextField(p) => serde_json::to_value(p),
            ComponentType::Select(p) => serde_json::to_value(p),
            ComponentType::Unsupported { payload, .. } => Ok(payload),
        };
        (type_name, payload.unwrap_or_default())
    }
}

/// Child references of a container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenRef {
    #[serde(default)]
    pub explicit_list: Vec<String>,
}

// ============================================================================
// Layout Components
// ============================================================================

/// Vertical (`Column`) or horizontal (`Row`) container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerComponent {
    #[serde(default)]
    pub children: ChildrenRef,
}

/// Card with a title, a text body and an optional child component
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<StringValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<StringValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<String>,
}

// ============================================================================
// Display Components
// ============================================================================

/// Static or bound text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextComponent {
    #[serde(default)]
    pub text: StringValue,

    /// Usage hint for styling (h1, h2, body, caption, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_hint: Option<TextUsageHint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageComponent {
    /// Image source URL (literal or path-bound)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<StringValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<StringValue>,
}

// ============================================================================
// Interactive Components
// ============================================================================

/// Button, captioned by a child component or a label
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonComponent {
    /// Child component ID (usually a `Text` used as the caption)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<String>,

    /// Caption used when there is no child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<StringValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDefinition>,
}

/// Single-line text input
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFieldComponent {
    /// Bound path, written on every keystroke
    #[serde(default)]
    pub text: StringValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<StringValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<StringValue>,
}

/// Selection from a data-bound option list
///
/// ```text
/// {"Select": {
///   "options": {"path": "/flights/options"},
///   "selectedIndex": {"path": "/flights/selectedIndex"},
///   "optionLabel": "airline",
///   "details": [{"path": "/flights/selected_detail_image", "field": "image_url"}]
/// }}
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectComponent {
    /// Path of the JSON array holding the options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BindRef>,

    /// Path of the selected index (-1 for none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<BindRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<StringValue>,

    /// Field of an option object used as its display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_label: Option<String>,

    /// Paths derived locally from the selected option
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailBinding>,
}

/// A path written from the selected option whenever the selection changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailBinding {
    pub path: String,

    /// Option field to copy. `None` writes a `key: value` listing of the whole option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Styling hint; unknown hints are kept as `Unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextUsageHint {
    H1,
    H2,
    H3,
    #[default]
    Body,
    Caption,
    Code,
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Action & Data Model
// ============================================================================

/// Named action and the bound values sent with it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Action name (e.g., "submit")
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub context: Vec<ActionContextItem>,
}

/// One `key` of an action context.
///
/// Fields are defaulted to make deserialization lenient towards generated catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContextItem {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub value: ActionValue,
}

/// Literal or bound value of a context entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    String(StringValue),
    Number(NumberValue),
    Boolean(BooleanValue),
}

impl Default for ActionValue {
    fn default() -> Self {
        Self::String(StringValue::default())
    }
}

/// Flat key writes under one base path.
///
/// ```text
/// {
///   "dataModelUpdate": {
///     "surfaceId": "main",
///     "path": "/weather",
///     "contents": [{"key": "temp_text", "valueString": "18 ~ 24 °C"}]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelUpdate {
    pub surface_id: String,

    /// Contents' keys are relative to this path
    #[serde(default = "default_path")]
    pub path: String,

    pub contents: Vec<DataContent>,
}

fn default_path() -> String {
    "/".to_string()
}

/// A single `{key, value*}` entry of a mutation unit.
///
/// Exactly one value tag is expected. When several are present the first of
/// string, number, bool, json wins; when none is, an empty string is stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContent {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_number: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_bool: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_json: Option<Value>,
}

impl DataContent {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        DataContent {
            key: key.into(),
            value_string: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn number(key: impl Into<String>, value: f64) -> Self {
        DataContent {
            key: key.into(),
            value_number: Some(number_from_f64(value)),
            ..Default::default()
        }
    }

    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        DataContent {
            key: key.into(),
            value_bool: Some(value),
            ..Default::default()
        }
    }

    pub fn json(key: impl Into<String>, value: Value) -> Self {
        DataContent {
            key: key.into(),
            value_json: Some(value),
            ..Default::default()
        }
    }

    /// Project an arbitrary literal into the matching value slot.
    ///
    /// `null` degrades to an empty string.
    pub fn from_literal(key: impl Into<String>, literal: &Value) -> Self {
        match literal {
            Value::Null => DataContent::string(key, ""),
            Value::String(s) => DataContent::string(key, s.clone()),
            Value::Number(n) => DataContent {
                key: key.into(),
                value_number: Some(n.clone()),
                ..Default::default()
            },
            Value::Bool(b) => DataContent::boolean(key, *b),
            other => DataContent::json(key, other.clone()),
        }
    }

    /// The value to store, resolved by tag precedence.
    pub fn value(&self) -> DataValue {
        if let Some(s) = &self.value_string {
            DataValue::String(s.clone())
        } else if let Some(n) = &self.value_number {
            DataValue::Number(n.clone())
        } else if let Some(b) = self.value_bool {
            DataValue::Bool(b)
        } else if let Some(v) = &self.value_json {
            DataValue::Json(v.clone())
        } else {
            DataValue::String(String::new())
        }
    }
}

/// Data value types held by data model leaves
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    String(String),
    Number(Number),
    Bool(bool),
    Json(Value),
}

impl DataValue {
    pub fn into_json(self) -> Value {
        match self {
            DataValue::String(s) => Value::String(s),
            DataValue::Number(n) => Value::Number(n),
            DataValue::Bool(b) => Value::Bool(b),
            DataValue::Json(v) => v,
        }
    }
}

/// Integral values are kept as integers so they print as `2`, not `2.0`.
fn number_from_f64(value: f64) -> Number {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Number::from(value as i64)
    } else {
        Number::from_f64(value).unwrap_or_else(|| Number::from(0))
    }
}

/// Drop a surface and all its state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSurface {
    pub surface_id: String,
}

/// Intent posted to `/ui/event` as `{"userAction": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    /// Source surface ID
    pub surface_id: String,

    /// Action name
    pub name: String,

    /// Resolved at click time
    #[serde(default)]
    pub context: Map<String, Value>,

    /// Source component ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_begin_rendering_frames() {
        let msg = parse_frame(r#"{"beginRendering": {"surfaceId": "trip", "root": "page"}}"#).unwrap();
        assert_eq!(msg.surface_id(), "trip");
        assert!(matches!(msg, A2uiMessage::BeginRendering(ref begin) if begin.root == "page"));

        let msg = parse_frame(r#"{"beginRendering": {"surfaceId": "trip"}}"#).unwrap();
        assert!(matches!(msg, A2uiMessage::BeginRendering(ref begin) if begin.root.is_empty()));
    }

    #[test]
    fn test_parse_surface_update() {
        let json = r#"{"surfaceUpdate": {"surfaceId": "main", "components": [
            {"id": "title", "component": {"Text": {"text": {"literalString": "Hello"}, "usageHint": "h2"}}},
            {"id": "pick", "component": {"Select": {"options": {"path": "/flights/options"}, "selectedIndex": {"path": "/flights/selectedIndex"}}}}
        ]}}"#;

        let msg = parse_frame(json).unwrap();
        let A2uiMessage::SurfaceUpdate(su) = msg else {
            panic!("Expected SurfaceUpdate");
        };
        assert_eq!(su.components.len(), 2);
        assert_eq!(su.components[0].id, "title");
        assert!(matches!(
            &su.components[0].component,
            ComponentType::Text(t) if t.usage_hint == Some(TextUsageHint::H2)
        ));
        let ComponentType::Select(select) = &su.components[1].component else {
            panic!("Expected Select");
        };
        assert_eq!(select.options, Some(BindRef::new("/flights/options")));
    }

    #[test]
    fn test_unknown_component_type_is_unsupported() {
        let json = r#"{"id": "x", "component": {"Slider": {"value": {"path": "/v"}}}}"#;
        let def: ComponentDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(def.component.type_name(), "Slider");
        assert!(def.component.kind().is_none());
    }

    #[test]
    fn test_component_definition_round_trip_shape() {
        let def = ComponentDefinition::new(
            "query",
            ComponentType::TextField(TextFieldComponent {
                text: StringValue::path("/form/query"),
                ..Default::default()
            }),
        );
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": "query", "component": {"TextField": {"text": {"path": "/form/query"}}}})
        );
    }

    #[test]
    fn test_parse_data_model_update_tags() {
        let json = r#"{"dataModelUpdate": {"surfaceId": "main", "path": "/flights", "contents": [
            {"key": "options_text", "valueString": "none"},
            {"key": "selectedIndex", "valueNumber": -1},
            {"key": "loaded", "valueBool": false},
            {"key": "options", "valueJson": []},
            {"key": "empty"}
        ]}}"#;

        let A2uiMessage::DataModelUpdate(dm) = parse_frame(json).unwrap() else {
            panic!("Expected DataModelUpdate");
        };
        let values: Vec<Value> = dm.contents.iter().map(|c| c.value().into_json()).collect();
        assert_eq!(
            values,
            vec![
                serde_json::json!("none"),
                serde_json::json!(-1),
                serde_json::json!(false),
                serde_json::json!([]),
                serde_json::json!(""),
            ]
        );
    }

    #[test]
    fn test_from_literal_projection() {
        let c = DataContent::from_literal("selectedIndex", &serde_json::json!(2));
        assert_eq!(c.value_number.as_ref().and_then(Number::as_f64), Some(2.0));
        assert!(c.value_string.is_none());

        let c = DataContent::from_literal("x", &Value::Null);
        assert_eq!(c.value_string.as_deref(), Some(""));

        let c = DataContent::from_literal("x", &serde_json::json!({"a": 1}));
        assert_eq!(c.value_json, Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_user_action_envelope() {
        let msg = A2uiMessage::UserAction(UserAction {
            surface_id: "main".to_string(),
            name: "submit".to_string(),
            context: Map::new(),
            component_id: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"userAction": {"surfaceId": "main", "name": "submit", "context": {}}})
        );
    }

    #[test]
    fn test_parse_frame_errors() {
        assert!(matches!(parse_frame("not json"), Err(ProtocolFrameError::Json(_))));
        assert!(matches!(
            parse_frame(r#"{"somethingElse": {}}"#),
            Err(ProtocolFrameError::UnknownKind(keys)) if keys == vec!["somethingElse".to_string()]
        ));
        assert!(matches!(
            parse_frame(r#"{"dataModelUpdate": {"surfaceId": "main"}}"#),
            Err(ProtocolFrameError::Shape { kind, .. }) if kind == "dataModelUpdate"
        ));
    }
}
