//! Render tree
//!
//! A resolved, data-bound snapshot of a surface, built from the component
//! registry and the data model starting at the root id.

use std::collections::HashSet;

use serde_json::Value;

use super::data_model::DataModel;
use super::message::{ComponentType, SelectComponent, TextUsageHint};
use super::registry::ComponentRegistry;
use super::value::StringValue;

/// One node of the render tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Column {
        id: String,
        children: Vec<RenderNode>,
    },
    Row {
        id: String,
        children: Vec<RenderNode>,
    },
    Text {
        id: String,
        text: String,
        usage_hint: TextUsageHint,
    },
    TextField {
        id: String,
        label: String,
        placeholder: String,
        value: String,
    },
    Button {
        id: String,
        label: String,
        action: Option<String>,
    },
    Select {
        id: String,
        label: String,
        options: Vec<String>,
        selected: Option<usize>,
    },
    Image {
        id: String,
        src: String,
        alt: String,
    },
    Card {
        id: String,
        title: String,
        body: String,
        child: Option<Box<RenderNode>>,
    },
    /// A referenced id with no definition yet, or a reference that closes a cycle
    Placeholder { id: String },
    /// A defined component whose type is outside the catalog
    Unsupported { id: String, type_name: String },
}

impl RenderNode {
    pub fn id(&self) -> &str {
        match self {
            RenderNode::Column { id, .. }
            | RenderNode::Row { id, .. }
            | RenderNode::Text { id, .. }
            | RenderNode::TextField { id, .. }
            | RenderNode::Button { id, .. }
            | RenderNode::Select { id, .. }
            | RenderNode::Image { id, .. }
            | RenderNode::Card { id, .. }
            | RenderNode::Placeholder { id }
            | RenderNode::Unsupported { id, .. } => id,
        }
    }

    /// Direct children in display order
    pub fn children(&self) -> Vec<&RenderNode> {
        match self {
            RenderNode::Column { children, .. } | RenderNode::Row { children, .. } => {
                children.iter().collect()
            }
            RenderNode::Card { child, .. } => child.iter().map(Box::as_ref).collect(),
            _ => Vec::new(),
        }
    }

    /// Depth-first search by component id
    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        if self.id() == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(id))
    }

    /// Plain-text outline, one node per line, indented by depth.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        let line = match self {
            RenderNode::Column { .. } | RenderNode::Row { .. } => String::new(),
            RenderNode::Text {
                text, usage_hint, ..
            } => styled_text(text, *usage_hint),
            RenderNode::TextField { label, value, .. } => format!("{label}: [{value}]"),
            RenderNode::Button { label, .. } => format!("<{label}>"),
            RenderNode::Select {
                label,
                options,
                selected,
                ..
            } => {
                let current = selected
                    .and_then(|i| options.get(i))
                    .map(String::as_str)
                    .unwrap_or("-");
                format!("{label}: {current} ({} options)", options.len())
            }
            RenderNode::Image { src, alt, .. } => format!("[image {alt}] {src}"),
            RenderNode::Card { title, body, .. } => format!("## {title}\n{body}"),
            RenderNode::Placeholder { id } => format!("[Unknown component: {id}]"),
            RenderNode::Unsupported { type_name, .. } => {
                format!("[Unsupported type: {type_name}]")
            }
        };

        let indent = "  ".repeat(depth);
        for text in line.lines().filter(|l| !l.is_empty()) {
            out.push_str(&indent);
            out.push_str(text);
            out.push('\n');
        }

        for child in self.children() {
            child.write_outline(depth + 1, out);
        }
    }
}

/// Outline form of a `Text`: headings get `#` marks, captions are
/// parenthesized and every line of code is prefixed with `| `.
fn styled_text(text: &str, hint: TextUsageHint) -> String {
    match hint {
        TextUsageHint::H1 => format!("# {text}"),
        TextUsageHint::H2 => format!("## {text}"),
        TextUsageHint::H3 => format!("### {text}"),
        TextUsageHint::Caption => format!("({text})"),
        TextUsageHint::Code => text.lines().map(|line| format!("| {line}\n")).collect(),
        TextUsageHint::Body | TextUsageHint::Unknown => text.to_string(),
    }
}

/// Build the render tree reachable from `root`.
pub fn build_tree(root: &str, registry: &ComponentRegistry, model: &DataModel) -> RenderNode {
    let mut builder = TreeBuilder {
        registry,
        model,
        visiting: HashSet::new(),
    };
    builder.build(root)
}

struct TreeBuilder<'a> {
    registry: &'a ComponentRegistry,
    model: &'a DataModel,
    /// Ids on the path from the root to the node being built
    visiting: HashSet<String>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, id: &str) -> RenderNode {
        let registry = self.registry;
        let Some(definition) = registry.get(id) else {
            return RenderNode::Placeholder { id: id.to_string() };
        };
        if !self.visiting.insert(id.to_string()) {
            ::log::warn!("[A2UI render] Cycle through component {id}, cut");
            return RenderNode::Placeholder { id: id.to_string() };
        }

        let model = self.model;
        let id_owned = id.to_string();
        let node = match &definition.component {
            ComponentType::Column(c) => RenderNode::Column {
                id: id_owned,
                children: self.build_all(&c.children.explicit_list),
            },
            ComponentType::Row(c) => RenderNode::Row {
                id: id_owned,
                children: self.build_all(&c.children.explicit_list),
            },
            ComponentType::Text(t) => RenderNode::Text {
                id: id_owned,
                text: resolve_string_value(&t.text, model),
                usage_hint: t.usage_hint.unwrap_or_default(),
            },
            ComponentType::TextField(f) => RenderNode::TextField {
                id: id_owned,
                label: resolve_or(f.label.as_ref(), model, "Input"),
                placeholder: resolve_or(f.placeholder.as_ref(), model, ""),
                value: resolve_string_value(&f.text, model),
            },
            ComponentType::Button(b) => RenderNode::Button {
                id: id_owned,
                label: self.button_label(b.child.as_deref(), b.label.as_ref()),
                action: b.action.as_ref().map(|a| a.name.clone()),
            },
            ComponentType::Select(s) => {
                let options = option_labels(s, model);
                let selected = selected_index(s, model).filter(|i| *i < options.len());
                RenderNode::Select {
                    id: id_owned,
                    label: resolve_or(s.label.as_ref(), model, ""),
                    options,
                    selected,
                }
            }
            ComponentType::Image(i) => RenderNode::Image {
                id: id_owned,
                src: resolve_or(i.src.as_ref(), model, ""),
                alt: resolve_or(i.alt.as_ref(), model, ""),
            },
            ComponentType::Card(c) => RenderNode::Card {
                id: id_owned,
                title: resolve_or(c.title.as_ref(), model, "Card"),
                body: resolve_or(c.body.as_ref(), model, ""),
                child: c.child.as_deref().map(|child| Box::new(self.build(child))),
            },
            ComponentType::Unsupported { type_name, .. } => RenderNode::Unsupported {
                id: id_owned,
                type_name: type_name.clone(),
            },
        };

        self.visiting.remove(id);
        node
    }

    fn build_all(&mut self, ids: &[String]) -> Vec<RenderNode> {
        ids.iter().map(|child| self.build(child)).collect()
    }

    /// A button is captioned by its child `Text`, else its own label.
    fn button_label(&self, child: Option<&str>, label: Option<&StringValue>) -> String {
        let from_child = child
            .and_then(|child| self.registry.get_type(child))
            .and_then(|component| match component {
                ComponentType::Text(t) => Some(resolve_string_value(&t.text, self.model)),
                _ => None,
            });

        from_child
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| resolve_or(label, self.model, "Button"))
    }
}

fn resolve_or(value: Option<&StringValue>, model: &DataModel, fallback: &str) -> String {
    value
        .map(|v| resolve_string_value(v, model))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Display text of every option of a `Select`
pub fn option_labels(select: &SelectComponent, model: &DataModel) -> Vec<String> {
    let Some(options) = select
        .options
        .as_ref()
        .and_then(|bind| model.get_array(&bind.path))
    else {
        return Vec::new();
    };

    options
        .iter()
        .map(|option| {
            let labelled = select
                .option_label
                .as_deref()
                .and_then(|field| option.get(field));
            value_text(labelled.unwrap_or(option))
        })
        .collect()
}

/// Currently selected index of a `Select`; negative or missing means none.
pub fn selected_index(select: &SelectComponent, model: &DataModel) -> Option<usize> {
    let index = model.get_number(&select.selected_index.as_ref()?.path)?;
    (index >= 0.0).then_some(index as usize)
}

/// Display text of a JSON value: strings unquoted, null empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve a StringValue to an actual string using the data model
pub fn resolve_string_value(value: &StringValue, data_model: &DataModel) -> String {
    match value {
        StringValue::Literal { literal_string } => literal_string.clone(),
        StringValue::Plain(s) => s.clone(),
        StringValue::Path { path } => data_model.get_text(path),
    }
}
