use serde_json::{Map, Value};

use crate::domain::{BlockDefinition, FieldDefinition, FieldKind, FieldType, TabConfig};

use super::node::NodeAccess;
use super::path::FieldPath;
use super::tree::{FormNode, ObjectNode};

/// What produced a [`FieldEntry`].
#[derive(Debug, Clone, Copy)]
pub enum EntrySlot<'s> {
    Field(&'s FieldDefinition),
    Tab(&'s TabConfig),
    ArrayItem,
    /// `definition` is `None` when the item's `blockType` is unknown.
    BlockItem {
        definition: Option<&'s BlockDefinition>,
    },
}

#[derive(Debug, Clone)]
pub struct FieldEntry<'s, 'n> {
    pub path: FieldPath,
    pub slot: EntrySlot<'s>,
    pub node: Option<&'n FormNode>,
    pub visible: bool,
    pub depth: usize,
}

impl FieldEntry<'_, '_> {
    /// False for rows, collapsibles and tab sets, which share their parent's
    /// path and hold no value of their own.
    pub fn owns_data(&self) -> bool {
        match self.slot {
            EntrySlot::Field(def) => def.requires_name(),
            _ => true,
        }
    }

    pub fn field_type(&self) -> Option<FieldType> {
        match self.slot {
            EntrySlot::Field(def) => Some(def.field_type()),
            EntrySlot::Tab(_) => Some(FieldType::Tabs),
            EntrySlot::ArrayItem | EntrySlot::BlockItem { .. } => None,
        }
    }

    pub fn label(&self) -> String {
        match self.slot {
            EntrySlot::Field(def) => def.display_label(),
            EntrySlot::Tab(tab) => tab
                .label
                .clone()
                .or_else(|| tab.name.clone())
                .unwrap_or_default(),
            EntrySlot::ArrayItem => format!("Item {}", self.item_number()),
            EntrySlot::BlockItem {
                definition: Some(block),
            } => format!("{} {}", block.singular_label(), self.item_number()),
            EntrySlot::BlockItem { definition: None } => {
                format!("Unknown block {}", self.item_number())
            }
        }
    }

    fn item_number(&self) -> String {
        match self.path.segments().last() {
            Some(segment) => segment.to_string(),
            None => String::new(),
        }
    }
}

/// Visits every entry below `base` in schema order, applying the addressing
/// rule and evaluating visibility against sibling values. `node` is the data
/// object described by `fields`.
pub fn walk_fields<'s, 'n, F>(
    fields: &'s [FieldDefinition],
    node: Option<&'n FormNode>,
    base: &FieldPath,
    visit: &mut F,
) where
    F: FnMut(FieldEntry<'s, 'n>),
{
    walk_level(fields, node, base, true, 0, visit);
}

pub fn collect_entries<'s, 'n>(
    fields: &'s [FieldDefinition],
    root: &'n FormNode,
) -> Vec<FieldEntry<'s, 'n>> {
    let mut entries = Vec::new();
    walk_fields(fields, Some(root), &FieldPath::root(), &mut |entry| {
        entries.push(entry)
    });
    entries
}

fn walk_level<'s, 'n, F>(
    fields: &'s [FieldDefinition],
    container: Option<&'n FormNode>,
    base: &FieldPath,
    parent_visible: bool,
    depth: usize,
    visit: &mut F,
) where
    F: FnMut(FieldEntry<'s, 'n>),
{
    let siblings = match container.map(|node| node.value()) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let object = container.and_then(FormNode::as_object);

    for def in fields {
        let visible = parent_visible
            && !def.admin.hidden
            && def
                .admin
                .condition
                .as_ref()
                .is_none_or(|condition| condition.evaluate(&siblings));

        match &def.kind {
            FieldKind::Row { fields } | FieldKind::Collapsible { fields } => {
                visit(FieldEntry {
                    path: base.clone(),
                    slot: EntrySlot::Field(def),
                    node: None,
                    visible,
                    depth,
                });
                walk_level(fields, container, base, visible, depth + 1, visit);
            }
            FieldKind::Tabs { tabs } => {
                visit(FieldEntry {
                    path: base.clone(),
                    slot: EntrySlot::Field(def),
                    node: None,
                    visible,
                    depth,
                });
                for tab in tabs {
                    if tab.name.is_some() {
                        let path = base.for_tab(tab);
                        let node = child_of(object, tab.name.as_deref());
                        visit(FieldEntry {
                            path: path.clone(),
                            slot: EntrySlot::Tab(tab),
                            node,
                            visible,
                            depth: depth + 1,
                        });
                        walk_level(&tab.fields, node, &path, visible, depth + 2, visit);
                    } else {
                        walk_level(&tab.fields, container, base, visible, depth + 1, visit);
                    }
                }
            }
            _ => {
                let path = base.for_field(def);
                let node = child_of(object, def.name());
                visit(FieldEntry {
                    path: path.clone(),
                    slot: EntrySlot::Field(def),
                    node,
                    visible,
                    depth,
                });
                walk_nested(def, node, &path, visible, depth + 1, visit);
            }
        }
    }
}

fn walk_nested<'s, 'n, F>(
    def: &'s FieldDefinition,
    node: Option<&'n FormNode>,
    path: &FieldPath,
    visible: bool,
    depth: usize,
    visit: &mut F,
) where
    F: FnMut(FieldEntry<'s, 'n>),
{
    match &def.kind {
        FieldKind::Group { fields } => walk_level(fields, node, path, visible, depth, visit),
        FieldKind::Array { fields, .. } => {
            let items = node.and_then(FormNode::as_array).map(|array| array.items());
            for (index, item) in items.unwrap_or_default().iter().enumerate() {
                let item_path = path.index(index);
                visit(FieldEntry {
                    path: item_path.clone(),
                    slot: EntrySlot::ArrayItem,
                    node: Some(item),
                    visible,
                    depth,
                });
                walk_level(fields, Some(item), &item_path, visible, depth + 1, visit);
            }
        }
        FieldKind::Blocks { .. } => {
            let items = node.and_then(FormNode::as_array).map(|array| array.items());
            for (index, item) in items.unwrap_or_default().iter().enumerate() {
                let item_path = path.index(index);
                let definition = item
                    .as_object()
                    .and_then(ObjectNode::block_type)
                    .and_then(|slug| def.block(slug));
                visit(FieldEntry {
                    path: item_path.clone(),
                    slot: EntrySlot::BlockItem { definition },
                    node: Some(item),
                    visible,
                    depth,
                });
                if let Some(block) = definition {
                    walk_level(&block.fields, Some(item), &item_path, visible, depth + 1, visit);
                }
            }
        }
        _ => {}
    }
}

fn child_of<'n>(object: Option<&'n ObjectNode>, key: Option<&str>) -> Option<&'n FormNode> {
    object.zip(key).and_then(|(object, key)| object.child(key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::parse_fields;

    fn fields() -> Vec<FieldDefinition> {
        parse_fields(&json!([
            {"name": "kind", "type": "select", "options": ["post", "link"]},
            {"name": "url", "type": "text", "admin": {"condition": {"op": "equals", "field": "kind", "value": "link"}}},
            {"type": "collapsible", "label": "Advanced", "fields": [
                {"name": "secret", "type": "text", "admin": {"hidden": true}}
            ]},
            {"type": "tabs", "tabs": [
                {"name": "seo", "fields": [{"name": "title", "type": "text"}]},
                {"label": "Body", "fields": [
                    {"name": "layout", "type": "blocks", "blocks": [
                        {"slug": "hero", "fields": [{"name": "heading", "type": "text"}]}
                    ]}
                ]}
            ]}
        ]))
        .expect("fields parsed")
    }

    #[test]
    fn applies_addressing_rule_and_visibility() {
        let document = json!({
            "kind": "post",
            "url": "",
            "secret": "x",
            "seo": {"title": "T"},
            "layout": [{"blockType": "hero", "heading": "Hi"}, {"blockType": "gone"}]
        });
        let fields = fields();
        let root = FormNode::build(&fields, &document);
        let entries = collect_entries(&fields, &root);
        let summary: Vec<(String, bool, bool)> = entries
            .iter()
            .filter(|entry| entry.owns_data())
            .map(|entry| (entry.path.to_string(), entry.visible, entry.node.is_some()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("kind".to_string(), true, true),
                ("url".to_string(), false, true),
                ("secret".to_string(), false, true),
                ("seo".to_string(), true, true),
                ("seo.title".to_string(), true, true),
                ("layout".to_string(), true, true),
                ("layout.0".to_string(), true, true),
                ("layout.0.heading".to_string(), true, true),
                ("layout.1".to_string(), true, true),
            ]
        );
        let unknown = entries
            .iter()
            .find(|entry| entry.path.to_string() == "layout.1")
            .expect("unknown block entry");
        assert!(matches!(
            unknown.slot,
            EntrySlot::BlockItem { definition: None }
        ));
        assert_eq!(unknown.label(), "Unknown block 1");
    }

    #[test]
    fn absent_keys_yield_entries_without_nodes() {
        let fields = fields();
        let root = FormNode::build(&fields, &json!({"kind": "link"}));
        let entries = collect_entries(&fields, &root);
        let url = entries
            .iter()
            .find(|entry| entry.path.to_string() == "url")
            .expect("url entry");
        assert!(url.visible);
        assert!(url.node.is_none());
    }
}
