use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Required,
    Shape,
    UnknownBlockType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldError {
    pub fn required() -> Self {
        Self {
            kind: ErrorKind::Required,
            message: None,
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Shape,
            message: Some(message.into()),
        }
    }

    pub fn unknown_block_type(block_type: Option<&str>) -> Self {
        let message = match block_type {
            Some(block_type) => format!("unknown block type '{block_type}'"),
            None => "missing blockType".to_string(),
        };
        Self {
            kind: ErrorKind::UnknownBlockType,
            message: Some(message),
        }
    }
}

/// Snapshot of one node's value and status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeState {
    pub value: Value,
    pub errors: Vec<FieldError>,
    pub touched: bool,
    pub dirty: bool,
}

impl NodeState {
    pub fn invalid(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Accessor every node kind implements; the tree never hands out raw cells.
pub trait NodeAccess {
    fn state(&self) -> NodeState;
    fn value(&self) -> Value;
    fn set_value(&mut self, value: Value);
    fn mark_touched(&mut self);
    /// Clears status and restores `value` (or the current baseline) as the
    /// new clean baseline.
    fn reset(&mut self, value: Option<Value>);
    fn set_errors(&mut self, errors: Vec<FieldError>);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NodeMeta {
    pub(crate) errors: Vec<FieldError>,
    pub(crate) touched: bool,
}

impl NodeMeta {
    pub(crate) fn snapshot(&self, value: Value, baseline: &Value) -> NodeState {
        let dirty = &value != baseline;
        NodeState {
            value,
            errors: self.errors.clone(),
            touched: self.touched,
            dirty,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.errors.clear();
        self.touched = false;
    }
}
