//! Bound values.
//!
//! Most payload fields of a component carry either a fixed value or a bind
//! reference (`{"path": ...}`) resolved against the surface's data model at
//! render time. Literals are wrapped per type: `literalString`,
//! `literalNumber`, `literalBoolean`.

use serde::{Deserialize, Serialize};

/// A bind reference into the data model.
///
/// For fields that are meaningless unbound, such as the option list of a
/// `Select`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BindRef {
    pub path: String,
}

impl BindRef {
    pub fn new(path: impl Into<String>) -> Self {
        BindRef { path: path.into() }
    }
}

/// Text field of a component.
///
/// Generated catalogs sometimes put a bare string where a wrapped literal is
/// expected, so all three forms are accepted:
///
/// ```json
/// {"literalString": "Weather"}
/// {"path": "/weather/summary"}
/// "Weather"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringValue {
    Literal {
        #[serde(rename = "literalString")]
        literal_string: String,
    },
    Path {
        path: String,
    },
    Plain(String),
}

impl StringValue {
    pub fn literal(text: impl Into<String>) -> Self {
        StringValue::Literal {
            literal_string: text.into(),
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        StringValue::Path { path: path.into() }
    }

    pub fn is_literal(&self) -> bool {
        !self.is_path()
    }

    pub fn is_path(&self) -> bool {
        matches!(self, StringValue::Path { .. })
    }

    pub fn as_path(&self) -> Option<&str> {
        if let StringValue::Path { path } = self {
            Some(path)
        } else {
            None
        }
    }

    /// Fixed text, whether wrapped or bare.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            StringValue::Literal { literal_string: text } | StringValue::Plain(text) => Some(text),
            StringValue::Path { .. } => None,
        }
    }
}

impl Default for StringValue {
    fn default() -> Self {
        StringValue::literal("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    Literal {
        #[serde(rename = "literalNumber")]
        literal_number: f64,
    },
    Path {
        path: String,
    },
}

impl NumberValue {
    pub fn literal(number: f64) -> Self {
        NumberValue::Literal {
            literal_number: number,
        }
    }

    pub fn as_literal(&self) -> Option<f64> {
        if let NumberValue::Literal { literal_number } = self {
            Some(*literal_number)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BooleanValue {
    Literal {
        #[serde(rename = "literalBoolean")]
        literal_boolean: bool,
    },
    Path {
        path: String,
    },
}

impl BooleanValue {
    pub fn literal(flag: bool) -> Self {
        BooleanValue::Literal {
            literal_boolean: flag,
        }
    }

    pub fn as_literal(&self) -> Option<bool> {
        if let BooleanValue::Literal { literal_boolean } = self {
            Some(*literal_boolean)
        } else {
            None
        }
    }
}
