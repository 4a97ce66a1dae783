//! Common types used throughout Gridview RS

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record of a dataset.
///
/// Rows carry no fixed schema; attributes are looked up by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a row from a JSON value, `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Set a field (builder pattern)
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Stable identifier held in `id_field`; null counts as missing
    pub fn id(&self, id_field: &str) -> Option<&Value> {
        self.get(id_field).filter(|v| !v.is_null())
    }

    /// Text form of a field, empty when absent
    pub fn text(&self, field: &str) -> Cow<'_, str> {
        self.get(field).map(value_text).unwrap_or(Cow::Borrowed(""))
    }

    /// Iterate over all field values
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Text form of a JSON value as a user would read it in a cell
pub fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Kind of value held by a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
}

impl ValueKind {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "number" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" | "datetime" => Some(Self::Date),
            _ => None,
        }
    }
}

/// A column of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Field id, unique within the table
    pub field_id: String,
    /// Header label, also used as the export key
    pub display_label: String,
    #[serde(default = "default_filterable")]
    pub is_filterable: bool,
    #[serde(default)]
    pub value_kind: ValueKind,
}

fn default_filterable() -> bool {
    true
}

impl ColumnDescriptor {
    /// Create a filterable text column
    pub fn text(field_id: impl Into<String>, display_label: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            display_label: display_label.into(),
            is_filterable: true,
            value_kind: ValueKind::Text,
        }
    }

    /// Create a filterable number column
    pub fn number(field_id: impl Into<String>, display_label: impl Into<String>) -> Self {
        Self {
            value_kind: ValueKind::Number,
            ..Self::text(field_id, display_label)
        }
    }

    /// Set filterable flag
    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.is_filterable = filterable;
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.value_kind == ValueKind::Number
    }
}
