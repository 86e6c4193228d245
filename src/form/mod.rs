mod blocks;
mod defaults;
mod error;
mod node;
mod normalize;
mod path;
mod tree;
mod validation;
mod walk;

pub use crate::domain::BLOCK_TYPE_KEY;
pub use blocks::{BlockChange, BlockEditor, BlockRows, EditorState};
pub use defaults::{BlockItem, default_for, default_for_slot, default_object};
pub use error::FormError;
pub use node::{ErrorKind, FieldError, NodeAccess, NodeState};
pub use normalize::{Normalized, normalize_blocks, normalize_tree};
pub use path::{
    FieldPath, PathSegment, get_sub_node, get_sub_node_mut, resolve, resolve_mut, resolve_state,
};
pub use tree::{ArrayNode, FormNode, ItemShape, LeafNode, ObjectNode};
pub use validation::{
    ValidationIssue, ValidationReport, apply_report, schema_fragment, validate_leaf,
    validate_tree,
};
pub use walk::{EntrySlot, FieldEntry, collect_entries, walk_fields};
