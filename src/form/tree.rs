use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::{
    BLOCK_TYPE_KEY, BlockCatalogue, DataSlot, FieldDefinition, FieldKind, FieldType, data_fields,
};

use super::node::{FieldError, NodeAccess, NodeMeta, NodeState};

/// A node of the document tree. Keys absent from the data have no node.
#[derive(Debug, Clone)]
pub enum FormNode {
    Leaf(LeafNode),
    Object(ObjectNode),
    Array(ArrayNode),
}

#[derive(Debug, Clone)]
pub struct LeafNode {
    field_type: Option<FieldType>,
    /// Container shape to rebuild when a matching value is written back.
    template: Option<Template>,
    value: Value,
    baseline: Value,
    meta: NodeMeta,
}

#[derive(Debug, Clone)]
pub struct ObjectNode {
    field_type: Option<FieldType>,
    fields: Option<Arc<[FieldDefinition]>>,
    children: IndexMap<String, FormNode>,
    baseline: Value,
    meta: NodeMeta,
}

#[derive(Debug, Clone)]
pub enum ItemShape {
    Untyped,
    Fields(Arc<[FieldDefinition]>),
    Blocks(Arc<BlockCatalogue>),
}

#[derive(Debug, Clone)]
enum Template {
    Object(Arc<[FieldDefinition]>),
    Array(ItemShape),
}

#[derive(Debug, Clone)]
pub struct ArrayNode {
    field_type: Option<FieldType>,
    shape: ItemShape,
    items: Vec<FormNode>,
    baseline: Value,
    meta: NodeMeta,
}

impl FormNode {
    /// Builds the tree for a whole document described by `fields`.
    pub fn build(fields: &[FieldDefinition], document: &Value) -> FormNode {
        object_or_leaf(Arc::from(fields.to_vec()), None, document)
    }

    /// Node for data the schema says nothing about; shape follows the value.
    pub fn untyped(value: &Value) -> FormNode {
        match value {
            Value::Object(map) => FormNode::Object(ObjectNode::new(None, None, map)),
            Value::Array(items) => {
                FormNode::Array(ArrayNode::new(None, ItemShape::Untyped, items))
            }
            other => FormNode::Leaf(LeafNode::new(None, other.clone())),
        }
    }

    pub(crate) fn for_slot(slot: DataSlot<'_>, value: &Value) -> FormNode {
        let def = match slot {
            DataSlot::Tab(tab) => {
                return object_or_leaf(
                    Arc::from(tab.fields.clone()),
                    Some(FieldType::Tabs),
                    value,
                );
            }
            DataSlot::Field(def) => def,
        };
        let field_type = Some(def.field_type());
        match &def.kind {
            FieldKind::Group { fields } => {
                object_or_leaf(Arc::from(fields.clone()), field_type, value)
            }
            FieldKind::Array { fields, .. } => {
                array_or_leaf(ItemShape::Fields(Arc::from(fields.clone())), field_type, value)
            }
            FieldKind::Blocks { blocks, .. } => array_or_leaf(
                ItemShape::Blocks(Arc::new(BlockCatalogue::new(blocks.iter().cloned()))),
                field_type,
                value,
            ),
            _ => FormNode::Leaf(LeafNode::new(field_type, value.clone())),
        }
    }

    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FormNode::Leaf(leaf) => leaf.field_type,
            FormNode::Object(object) => object.field_type,
            FormNode::Array(array) => array.field_type,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            FormNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            FormNode::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            FormNode::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayNode> {
        match self {
            FormNode::Array(array) => Some(array),
            _ => None,
        }
    }

    fn baseline(&self) -> &Value {
        match self {
            FormNode::Leaf(leaf) => &leaf.baseline,
            FormNode::Object(object) => &object.baseline,
            FormNode::Array(array) => &array.baseline,
        }
    }

    fn meta(&self) -> &NodeMeta {
        match self {
            FormNode::Leaf(leaf) => &leaf.meta,
            FormNode::Object(object) => &object.meta,
            FormNode::Array(array) => &array.meta,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FormNode::Object(_) => value.is_object(),
            FormNode::Array(_) => value.is_array(),
            FormNode::Leaf(leaf) => match &leaf.template {
                Some(Template::Object(_)) => !value.is_object(),
                Some(Template::Array(_)) => !value.is_array(),
                None => leaf.field_type.is_some() || !(value.is_object() || value.is_array()),
            },
        }
    }

    fn template(&self) -> Option<Template> {
        match self {
            FormNode::Leaf(leaf) => leaf.template.clone(),
            FormNode::Object(object) => object.fields.clone().map(Template::Object),
            FormNode::Array(array) => match &array.shape {
                ItemShape::Untyped => None,
                shape => Some(Template::Array(shape.clone())),
            },
        }
    }

    /// Fresh node of the kind `value` needs, keeping this node's typing.
    fn reshape(&self, value: &Value) -> FormNode {
        let field_type = self.field_type();
        match (self.template(), value) {
            (Some(Template::Object(fields)), Value::Object(map)) => {
                FormNode::Object(ObjectNode::new(field_type, Some(fields), map))
            }
            (Some(Template::Array(shape)), Value::Array(items)) => {
                FormNode::Array(ArrayNode::new(field_type, shape, items))
            }
            (Some(template), other) => {
                FormNode::Leaf(LeafNode::new(field_type, other.clone()).with_template(template))
            }
            (None, other) => FormNode::untyped(other),
        }
    }

    fn as_access(&self) -> &dyn NodeAccess {
        match self {
            FormNode::Leaf(leaf) => leaf,
            FormNode::Object(object) => object,
            FormNode::Array(array) => array,
        }
    }

    fn as_access_mut(&mut self) -> &mut dyn NodeAccess {
        match self {
            FormNode::Leaf(leaf) => leaf,
            FormNode::Object(object) => object,
            FormNode::Array(array) => array,
        }
    }
}

impl NodeAccess for FormNode {
    fn state(&self) -> NodeState {
        self.as_access().state()
    }

    fn value(&self) -> Value {
        self.as_access().value()
    }

    /// A value whose shape the node cannot hold swaps the node kind, keeping
    /// the baseline and status so `dirty` stays meaningful.
    fn set_value(&mut self, value: Value) {
        if self.accepts(&value) {
            self.as_access_mut().set_value(value);
            return;
        }
        let baseline = self.baseline().clone();
        let meta = self.meta().clone();
        let mut replacement = self.reshape(&value);
        match &mut replacement {
            FormNode::Leaf(leaf) => {
                leaf.baseline = baseline;
                leaf.meta = meta;
            }
            FormNode::Object(object) => {
                object.baseline = baseline;
                object.meta = meta;
            }
            FormNode::Array(array) => {
                array.baseline = baseline;
                array.meta = meta;
            }
        }
        *self = replacement;
    }

    fn mark_touched(&mut self) {
        self.as_access_mut().mark_touched();
    }

    fn reset(&mut self, value: Option<Value>) {
        match value {
            Some(value) if !self.accepts(&value) => {
                self.set_value(value.clone());
                self.as_access_mut().reset(Some(value));
            }
            other => self.as_access_mut().reset(other),
        }
    }

    fn set_errors(&mut self, errors: Vec<FieldError>) {
        self.as_access_mut().set_errors(errors);
    }
}

impl LeafNode {
    fn new(field_type: Option<FieldType>, value: Value) -> Self {
        Self {
            field_type,
            template: None,
            baseline: value.clone(),
            value,
            meta: NodeMeta::default(),
        }
    }

    fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }
}

impl NodeAccess for LeafNode {
    fn state(&self) -> NodeState {
        self.meta.snapshot(self.value.clone(), &self.baseline)
    }

    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    fn mark_touched(&mut self) {
        self.meta.touched = true;
    }

    fn reset(&mut self, value: Option<Value>) {
        if let Some(value) = value {
            self.baseline = value;
        }
        self.value = self.baseline.clone();
        self.meta.clear();
    }

    fn set_errors(&mut self, errors: Vec<FieldError>) {
        self.meta.errors = errors;
    }
}

impl ObjectNode {
    fn new(
        field_type: Option<FieldType>,
        fields: Option<Arc<[FieldDefinition]>>,
        map: &Map<String, Value>,
    ) -> Self {
        let children = build_children(fields.as_deref(), map);
        Self {
            field_type,
            fields,
            children,
            baseline: Value::Object(map.clone()),
            meta: NodeMeta::default(),
        }
    }

    pub fn child(&self, key: &str) -> Option<&FormNode> {
        self.children.get(key)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut FormNode> {
        self.children.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn fields(&self) -> Option<&[FieldDefinition]> {
        self.fields.as_deref()
    }

    pub(crate) fn children_mut(&mut self) -> impl Iterator<Item = &mut FormNode> {
        self.children.values_mut()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn block_type(&self) -> Option<&str> {
        self.children
            .get(BLOCK_TYPE_KEY)
            .and_then(FormNode::as_leaf)
            .and_then(|leaf| leaf.value.as_str())
    }

    /// Existing children keep their status; new keys get fresh nodes and
    /// keys missing from `map` are dropped.
    fn assign(&mut self, map: Map<String, Value>) {
        let slots = self.fields.as_deref().map(data_fields).unwrap_or_default();
        let mut next = IndexMap::with_capacity(map.len());
        for (key, value) in map {
            let node = match self.children.shift_remove(&key) {
                Some(mut existing) => {
                    existing.set_value(value);
                    existing
                }
                None => node_for_key(&slots, &key, &value),
            };
            next.insert(key, node);
        }
        self.children = next;
    }
}

impl NodeAccess for ObjectNode {
    fn state(&self) -> NodeState {
        self.meta.snapshot(self.value(), &self.baseline)
    }

    fn value(&self) -> Value {
        Value::Object(
            self.children
                .iter()
                .map(|(key, child)| (key.clone(), child.value()))
                .collect(),
        )
    }

    fn set_value(&mut self, value: Value) {
        match value {
            Value::Object(map) => self.assign(map),
            _ => self.children.clear(),
        }
    }

    fn mark_touched(&mut self) {
        self.meta.touched = true;
    }

    fn reset(&mut self, value: Option<Value>) {
        let value = value.unwrap_or_else(|| self.baseline.clone());
        let map = match &value {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        self.children = build_children(self.fields.as_deref(), &map);
        self.baseline = Value::Object(map);
        self.meta.clear();
    }

    fn set_errors(&mut self, errors: Vec<FieldError>) {
        self.meta.errors = errors;
    }
}

impl ArrayNode {
    fn new(field_type: Option<FieldType>, shape: ItemShape, items: &[Value]) -> Self {
        let nodes = items.iter().map(|item| build_item(&shape, item)).collect();
        Self {
            field_type,
            shape,
            items: nodes,
            baseline: Value::Array(items.to_vec()),
            meta: NodeMeta::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&FormNode> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut FormNode> {
        self.items.get_mut(index)
    }

    pub fn items(&self) -> &[FormNode] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> impl Iterator<Item = &mut FormNode> {
        self.items.iter_mut()
    }

    pub fn shape(&self) -> &ItemShape {
        &self.shape
    }

    pub fn catalogue(&self) -> Option<&BlockCatalogue> {
        match &self.shape {
            ItemShape::Blocks(catalogue) => Some(catalogue),
            _ => None,
        }
    }

    pub(crate) fn insert_item(&mut self, index: usize, value: &Value) {
        let node = build_item(&self.shape, value);
        self.items.insert(index, node);
    }

    pub(crate) fn remove_item(&mut self, index: usize) -> FormNode {
        self.items.remove(index)
    }

    pub(crate) fn move_item(&mut self, from: usize, to: usize) {
        let node = self.items.remove(from);
        self.items.insert(to, node);
    }
}

impl NodeAccess for ArrayNode {
    fn state(&self) -> NodeState {
        self.meta.snapshot(self.value(), &self.baseline)
    }

    fn value(&self) -> Value {
        Value::Array(self.items.iter().map(FormNode::value).collect())
    }

    fn set_value(&mut self, value: Value) {
        self.items = match &value {
            Value::Array(items) => items.iter().map(|item| build_item(&self.shape, item)).collect(),
            _ => Vec::new(),
        };
    }

    fn mark_touched(&mut self) {
        self.meta.touched = true;
    }

    fn reset(&mut self, value: Option<Value>) {
        if let Some(value) = value {
            self.baseline = match value {
                Value::Array(_) => value,
                _ => Value::Array(Vec::new()),
            };
        }
        let baseline = self.baseline.clone();
        self.set_value(baseline);
        self.meta.clear();
    }

    fn set_errors(&mut self, errors: Vec<FieldError>) {
        self.meta.errors = errors;
    }
}

fn object_or_leaf(
    fields: Arc<[FieldDefinition]>,
    field_type: Option<FieldType>,
    value: &Value,
) -> FormNode {
    match value {
        Value::Object(map) => FormNode::Object(ObjectNode::new(field_type, Some(fields), map)),
        other => FormNode::Leaf(
            LeafNode::new(field_type, other.clone()).with_template(Template::Object(fields)),
        ),
    }
}

fn array_or_leaf(shape: ItemShape, field_type: Option<FieldType>, value: &Value) -> FormNode {
    match value {
        Value::Array(items) => FormNode::Array(ArrayNode::new(field_type, shape, items)),
        other => FormNode::Leaf(
            LeafNode::new(field_type, other.clone()).with_template(Template::Array(shape)),
        ),
    }
}

fn build_children(
    fields: Option<&[FieldDefinition]>,
    map: &Map<String, Value>,
) -> IndexMap<String, FormNode> {
    let slots = fields.map(data_fields).unwrap_or_default();
    map.iter()
        .map(|(key, value)| (key.clone(), node_for_key(&slots, key, value)))
        .collect()
}

fn node_for_key(slots: &[DataSlot<'_>], key: &str, value: &Value) -> FormNode {
    match slots.iter().find(|slot| slot.key() == Some(key)) {
        Some(slot) => FormNode::for_slot(*slot, value),
        None => FormNode::untyped(value),
    }
}

fn build_item(shape: &ItemShape, value: &Value) -> FormNode {
    match shape {
        ItemShape::Untyped => FormNode::untyped(value),
        ItemShape::Fields(fields) => object_or_leaf(Arc::clone(fields), None, value),
        ItemShape::Blocks(catalogue) => {
            let fields = value
                .get(BLOCK_TYPE_KEY)
                .and_then(Value::as_str)
                .and_then(|slug| catalogue.fields_for(slug));
            match fields {
                Some(fields) => object_or_leaf(fields, None, value),
                None => FormNode::untyped(value),
            }
        }
    }
}
