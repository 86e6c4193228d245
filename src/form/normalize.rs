use serde_json::Value;
use tracing::debug;

use crate::domain::{BLOCK_TYPE_KEY, BlockCatalogue, data_fields};

use super::defaults::default_for_slot;
use super::node::NodeAccess;
use super::tree::FormNode;

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub normalized: Vec<Value>,
    pub changed: bool,
}

/// Backfills every declared field that is absent as an own key of a block
/// item. Items that are not objects, or whose `blockType` is missing or
/// unknown, pass through untouched. Running it twice changes nothing.
pub fn normalize_blocks(items: &[Value], catalogue: &BlockCatalogue) -> Normalized {
    let mut changed = false;
    let normalized = items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            let Some(map) = item.as_object_mut() else {
                return item;
            };
            let Some(definition) = map
                .get(BLOCK_TYPE_KEY)
                .and_then(Value::as_str)
                .and_then(|slug| catalogue.get(slug))
            else {
                return item;
            };
            for slot in data_fields(&definition.fields) {
                let Some(key) = slot.key() else { continue };
                if !map.contains_key(key) {
                    map.insert(key.to_string(), default_for_slot(slot));
                    changed = true;
                }
            }
            item
        })
        .collect();
    Normalized {
        normalized,
        changed,
    }
}

/// Normalizes every blocks cell below `root`, parents before children, and
/// returns how many cells were written back.
pub fn normalize_tree(root: &mut FormNode) -> usize {
    let mut written = 0;
    settle(root, &mut written);
    written
}

fn settle(node: &mut FormNode, written: &mut usize) {
    if let FormNode::Array(array) = node {
        let repaired = array.catalogue().and_then(|catalogue| {
            let items: Vec<Value> = array.items().iter().map(FormNode::value).collect();
            let result = normalize_blocks(&items, catalogue);
            result.changed.then_some(result.normalized)
        });
        if let Some(normalized) = repaired {
            debug!(items = normalized.len(), "backfilled block defaults");
            array.set_value(Value::Array(normalized));
            *written += 1;
        }
    }
    match node {
        FormNode::Object(object) => object
            .children_mut()
            .for_each(|child| settle(child, written)),
        FormNode::Array(array) => array.items_mut().for_each(|item| settle(item, written)),
        FormNode::Leaf(_) => {}
    }
}
