use std::fmt;

use serde::{Serialize, Serializer};

use crate::domain::{FieldDefinition, FieldKind, TabConfig};

use super::node::{NodeAccess, NodeState};
use super::tree::FormNode;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Only canonical decimals are indices; `01` stays a key.
    fn parse(raw: &str) -> Self {
        let canonical = raw == "0" || !raw.starts_with('0');
        if canonical
            && !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && let Ok(index) = raw.parse::<usize>()
        {
            return PathSegment::Index(index);
        }
        PathSegment::Key(raw.to_string())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Dot/index address of a node, e.g. `content.2.heading`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(PathSegment::parse)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn child(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Key(key.to_string()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Index(index));
        next
    }

    /// The first `len` segments of this path.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &FieldPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// Path under which the data of `field` lives when its parent container
    /// is addressed by `self`. Unnamed wrappers keep the parent path.
    pub fn for_field(&self, field: &FieldDefinition) -> Self {
        match (&field.kind, field.name.as_deref()) {
            (FieldKind::Row { .. } | FieldKind::Collapsible { .. } | FieldKind::Tabs { .. }, _) => {
                self.clone()
            }
            (_, Some(name)) => self.child(name),
            (_, None) => self.clone(),
        }
    }

    pub fn for_tab(&self, tab: &TabConfig) -> Self {
        match tab.name.as_deref() {
            Some(name) => self.child(name),
            None => self.clone(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        FieldPath::parse(raw)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

/// One resolver step. Objects accept keys (and numeric-looking keys of
/// untyped data), arrays accept indices; anything else is `None`.
pub fn get_sub_node<'a>(node: &'a FormNode, segment: &PathSegment) -> Option<&'a FormNode> {
    match (node, segment) {
        (FormNode::Object(object), PathSegment::Key(key)) => object.child(key),
        (FormNode::Object(object), PathSegment::Index(index)) => object.child(&index.to_string()),
        (FormNode::Array(array), PathSegment::Index(index)) => array.item(*index),
        _ => None,
    }
}

pub fn get_sub_node_mut<'a>(
    node: &'a mut FormNode,
    segment: &PathSegment,
) -> Option<&'a mut FormNode> {
    match (node, segment) {
        (FormNode::Object(object), PathSegment::Key(key)) => object.child_mut(key),
        (FormNode::Object(object), PathSegment::Index(index)) => {
            object.child_mut(&index.to_string())
        }
        (FormNode::Array(array), PathSegment::Index(index)) => array.item_mut(*index),
        _ => None,
    }
}

pub fn resolve<'a>(root: &'a FormNode, path: &FieldPath) -> Option<&'a FormNode> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| get_sub_node(node, segment))
}

pub fn resolve_mut<'a>(root: &'a mut FormNode, path: &FieldPath) -> Option<&'a mut FormNode> {
    let mut current = root;
    for segment in path.segments() {
        current = get_sub_node_mut(current, segment)?;
    }
    Some(current)
}

pub fn resolve_state(root: &FormNode, path: &FieldPath) -> Option<NodeState> {
    resolve(root, path).map(|node| node.state())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::parse_fields;

    #[test]
    fn parses_indices_and_keys() {
        let path = FieldPath::parse("content.2.heading");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("content".into()),
                PathSegment::Index(2),
                PathSegment::Key("heading".into()),
            ]
        );
        assert_eq!(path.to_string(), "content.2.heading");
        assert!(FieldPath::parse("").is_root());
    }

    #[test]
    fn leading_zeros_do_not_address_items() {
        assert_eq!(FieldPath::parse("content.0").segments()[1], PathSegment::Index(0));
        assert_eq!(
            FieldPath::parse("content.01.heading").segments()[1],
            PathSegment::Key("01".into())
        );
        let fields = parse_fields(&json!([
            {"name": "content", "type": "blocks", "blocks": [
                {"slug": "hero", "fields": [{"name": "heading", "type": "text"}]}
            ]}
        ]))
        .expect("fields parsed");
        let root = FormNode::build(
            &fields,
            &json!({"content": [{"blockType": "hero", "heading": "a"}, {"blockType": "hero", "heading": "b"}]}),
        );
        assert!(resolve(&root, &FieldPath::parse("content.1.heading")).is_some());
        assert!(resolve(&root, &FieldPath::parse("content.01.heading")).is_none());
    }

    #[test]
    fn unnamed_wrappers_keep_parent_path() {
        let fields = parse_fields(&json!([
            {"type": "row", "fields": [{"name": "title", "type": "text"}]},
            {"name": "meta", "type": "group", "fields": [{"name": "title", "type": "text"}]},
            {"type": "tabs", "tabs": [
                {"name": "seo", "fields": []},
                {"label": "Plain", "fields": []}
            ]}
        ]))
        .expect("fields parsed");
        let base = FieldPath::parse("content.2");
        assert_eq!(base.for_field(&fields[0]).to_string(), "content.2");
        assert_eq!(base.for_field(&fields[1]).to_string(), "content.2.meta");
        assert_eq!(base.for_field(&fields[2]).to_string(), "content.2");
        let FieldKind::Tabs { tabs } = &fields[2].kind else {
            panic!("expected tabs");
        };
        assert_eq!(base.for_tab(&tabs[0]).to_string(), "content.2.seo");
        assert_eq!(base.for_tab(&tabs[1]).to_string(), "content.2");
    }

    #[test]
    fn descendant_check_is_strict() {
        let outer = FieldPath::parse("content");
        assert!(FieldPath::parse("content.1.items").is_descendant_of(&outer));
        assert!(!outer.is_descendant_of(&outer));
        assert!(!FieldPath::parse("contents.1").is_descendant_of(&outer));
    }
}
