use serde_json::Value;

use crate::domain::FieldType;
use crate::form::{EntrySlot, FieldEntry, NodeAccess, ObjectNode};

/// Everything a renderer gets to see of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub path: String,
    pub label: String,
    pub field_type: Option<FieldType>,
    /// `None` when the key is absent from the document.
    pub value: Option<Value>,
    pub block_type: Option<String>,
    pub invalid: bool,
    pub depth: usize,
}

impl FieldView {
    pub fn from_entry(entry: &FieldEntry<'_, '_>) -> Self {
        let state = entry.node.map(|node| node.state());
        let block_type = match entry.slot {
            EntrySlot::BlockItem { .. } => entry
                .node
                .and_then(|node| node.as_object())
                .and_then(ObjectNode::block_type)
                .map(str::to_string),
            _ => None,
        };
        Self {
            path: entry.path.to_string(),
            label: entry.label(),
            field_type: entry.field_type(),
            invalid: state.as_ref().is_some_and(|state| state.invalid()),
            value: state.map(|state| state.value),
            block_type,
            depth: entry.depth,
        }
    }
}
