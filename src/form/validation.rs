use jsonschema::validator_for;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{FieldDefinition, FieldKind};

use super::node::{FieldError, NodeAccess};
use super::path::{FieldPath, resolve_mut};
use super::tree::FormNode;
use super::walk::{EntrySlot, walk_fields};

const EMAIL_PATTERN: &str = r"^$|^[^@\s]+@[^@\s]+\.[^@\s]+$";
const SLUG_PATTERN: &str = r"^$|^[a-z0-9]+(?:-[a-z0-9]+)*$";

/// JSON Schema fragment describing the values a field may hold.
pub fn schema_fragment(def: &FieldDefinition) -> Value {
    match &def.kind {
        FieldKind::Text | FieldKind::Textarea => json!({"type": ["string", "null"]}),
        FieldKind::RichText => json!({"type": ["string", "array", "object", "null"]}),
        FieldKind::Email => json!({"type": ["string", "null"], "pattern": EMAIL_PATTERN}),
        FieldKind::Slug => json!({"type": ["string", "null"], "pattern": SLUG_PATTERN}),
        FieldKind::Number => json!({"type": ["number", "null"]}),
        FieldKind::Select { options, has_many } => {
            let values: Vec<&str> = options.iter().map(|option| option.value()).collect();
            if *has_many {
                json!({"type": ["array", "null"], "items": {"enum": values}})
            } else {
                let mut allowed: Vec<Value> = values.into_iter().map(Value::from).collect();
                allowed.push(Value::Null);
                json!({"enum": allowed})
            }
        }
        FieldKind::Checkbox => json!({"type": ["boolean", "null"]}),
        FieldKind::Date => json!({"type": ["string", "null"]}),
        FieldKind::Upload { .. } => json!({"type": ["string", "number", "object", "null"]}),
        FieldKind::Relationship { has_many, .. } => {
            let single = json!({"type": ["string", "number", "object"]});
            if *has_many {
                json!({"type": ["array", "null"], "items": single})
            } else {
                json!({"anyOf": [single, {"type": "null"}]})
            }
        }
        FieldKind::Json => json!({}),
        FieldKind::Group { .. } => json!({"type": "object"}),
        FieldKind::Array { .. } | FieldKind::Blocks { .. } => json!({"type": "array"}),
        FieldKind::Tabs { .. } | FieldKind::Collapsible { .. } | FieldKind::Row { .. } => {
            json!({})
        }
    }
}

/// Structural check of one value against its definition.
pub fn validate_leaf(def: &FieldDefinition, value: &Value) -> Vec<FieldError> {
    if def.required && is_empty(value) {
        return vec![FieldError::required()];
    }
    let fragment = schema_fragment(def);
    match validator_for(&fragment) {
        Ok(validator) => {
            let errors: Vec<FieldError> = validator
                .iter_errors(value)
                .map(|error| FieldError::shape(error.to_string()))
                .collect();
            errors
        }
        Err(err) => vec![FieldError::shape(format!("invalid field schema: {err}"))],
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: FieldPath,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().map(|issue| issue.errors.len()).sum()
    }
}

/// Checks every visible entry below `root`. Hidden fields and fields whose
/// condition fails are skipped along with everything nested in them.
pub fn validate_tree(fields: &[FieldDefinition], root: &FormNode) -> ValidationReport {
    let mut issues = Vec::new();
    walk_fields(fields, Some(root), &FieldPath::root(), &mut |entry| {
        if !entry.visible || !entry.owns_data() {
            return;
        }
        let errors = match entry.slot {
            EntrySlot::Field(def) => match entry.node {
                Some(node) => validate_leaf(def, &node.value()),
                None if def.required => vec![FieldError::required()],
                None => Vec::new(),
            },
            EntrySlot::BlockItem { definition: None } => {
                let block_type = entry
                    .node
                    .and_then(FormNode::as_object)
                    .and_then(|object| object.block_type());
                vec![FieldError::unknown_block_type(block_type)]
            }
            EntrySlot::Tab(_) | EntrySlot::ArrayItem | EntrySlot::BlockItem { .. } => Vec::new(),
        };
        if !errors.is_empty() {
            issues.push(ValidationIssue {
                path: entry.path,
                errors,
            });
        }
    });
    debug!(issues = issues.len(), "validation finished");
    ValidationReport { issues }
}

/// Replaces the errors stored in the tree with the ones in `report`. Issues
/// for absent keys have no node to land on and stay in the report only.
pub fn apply_report(root: &mut FormNode, report: &ValidationReport) {
    clear_errors(root);
    for issue in &report.issues {
        if let Some(node) = resolve_mut(root, &issue.path) {
            node.set_errors(issue.errors.clone());
        }
    }
}

fn clear_errors(node: &mut FormNode) {
    node.set_errors(Vec::new());
    match node {
        FormNode::Object(object) => object.children_mut().for_each(clear_errors),
        FormNode::Array(array) => array.items_mut().for_each(clear_errors),
        FormNode::Leaf(_) => {}
    }
}
