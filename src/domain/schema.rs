use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level schema document: the field list of one editable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

/// One node of the declarative field schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Data key. Required for everything except rows, collapsibles and tab sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Overrides the type-appropriate default used for new blocks and backfill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub admin: AdminHints,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Textarea,
    RichText,
    Email,
    Slug,
    Number,
    Select {
        options: Vec<SelectOption>,
        #[serde(default, rename = "hasMany")]
        has_many: bool,
    },
    Checkbox,
    Date,
    Upload {
        #[serde(rename = "relationTo")]
        relation_to: String,
    },
    Relationship {
        #[serde(rename = "relationTo")]
        relation_to: String,
        #[serde(default, rename = "hasMany")]
        has_many: bool,
    },
    Json,
    Group {
        fields: Vec<FieldDefinition>,
    },
    Array {
        fields: Vec<FieldDefinition>,
        #[serde(default, rename = "minRows", skip_serializing_if = "Option::is_none")]
        min_rows: Option<usize>,
        #[serde(default, rename = "maxRows", skip_serializing_if = "Option::is_none")]
        max_rows: Option<usize>,
    },
    Blocks {
        blocks: Vec<BlockDefinition>,
        #[serde(default, rename = "minRows", skip_serializing_if = "Option::is_none")]
        min_rows: Option<usize>,
        #[serde(default, rename = "maxRows", skip_serializing_if = "Option::is_none")]
        max_rows: Option<usize>,
    },
    Tabs {
        tabs: Vec<TabConfig>,
    },
    Collapsible {
        fields: Vec<FieldDefinition>,
    },
    Row {
        fields: Vec<FieldDefinition>,
    },
}

/// Discriminator of [`FieldKind`] without its payload; keys the renderer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Text,
    Textarea,
    RichText,
    Email,
    Slug,
    Number,
    Select,
    Checkbox,
    Date,
    Upload,
    Relationship,
    Json,
    Group,
    Array,
    Blocks,
    Tabs,
    Collapsible,
    Row,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::RichText => "richText",
            FieldType::Email => "email",
            FieldType::Slug => "slug",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Upload => "upload",
            FieldType::Relationship => "relationship",
            FieldType::Json => "json",
            FieldType::Group => "group",
            FieldType::Array => "array",
            FieldType::Blocks => "blocks",
            FieldType::Tabs => "tabs",
            FieldType::Collapsible => "collapsible",
            FieldType::Row => "row",
        }
    }

    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Textarea
                | FieldType::RichText
                | FieldType::Email
                | FieldType::Slug
        )
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            FieldType::Group
                | FieldType::Array
                | FieldType::Blocks
                | FieldType::Tabs
                | FieldType::Collapsible
                | FieldType::Row
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SelectOption {
    Value(String),
    Labeled { label: String, value: String },
}

impl SelectOption {
    pub fn value(&self) -> &str {
        match self {
            SelectOption::Value(value) => value,
            SelectOption::Labeled { value, .. } => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SelectOption::Value(value) => value,
            SelectOption::Labeled { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminHints {
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Visibility predicate evaluated against the sibling data object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// Declarative predicate over sibling values. `field` may be a dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Condition {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    Truthy { field: String },
    Not { condition: Box<Condition> },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
}

impl Condition {
    pub fn evaluate(&self, siblings: &Map<String, Value>) -> bool {
        match self {
            Condition::Equals { field, value } => lookup(siblings, field) == Some(value),
            Condition::NotEquals { field, value } => lookup(siblings, field) != Some(value),
            Condition::Truthy { field } => lookup(siblings, field).is_some_and(is_truthy),
            Condition::Not { condition } => !condition.evaluate(siblings),
            Condition::All { conditions } => conditions.iter().all(|c| c.evaluate(siblings)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.evaluate(siblings)),
        }
    }
}

fn lookup<'a>(siblings: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    let mut segments = field.split('.');
    let mut current = siblings.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(num) => num.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TabConfig {
    /// Named tabs nest their data under `name`; unnamed tabs are flat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockDefinition {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BlockLabels>,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockLabels {
    pub singular: String,
    pub plural: String,
}

impl BlockDefinition {
    pub fn singular_label(&self) -> String {
        self.labels
            .as_ref()
            .map(|labels| labels.singular.clone())
            .unwrap_or_else(|| prettify_label(&self.slug))
    }
}

impl FieldDefinition {
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rows, collapsibles and tab sets never own a data key.
    pub fn requires_name(&self) -> bool {
        !matches!(
            self.kind,
            FieldKind::Row { .. } | FieldKind::Collapsible { .. } | FieldKind::Tabs { .. }
        )
    }

    pub fn display_label(&self) -> String {
        match (&self.label, &self.name) {
            (Some(label), _) => label.clone(),
            (None, Some(name)) => prettify_label(name),
            (None, None) => prettify_label(self.field_type().as_str()),
        }
    }

    pub fn min_rows(&self) -> usize {
        match self.kind {
            FieldKind::Array { min_rows, .. } | FieldKind::Blocks { min_rows, .. } => {
                min_rows.unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn max_rows(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Array { max_rows, .. } | FieldKind::Blocks { max_rows, .. } => max_rows,
            _ => None,
        }
    }

    /// Block definition for `slug` when this is a blocks field.
    pub fn block(&self, slug: &str) -> Option<&BlockDefinition> {
        match &self.kind {
            FieldKind::Blocks { blocks, .. } => blocks.iter().find(|block| block.slug == slug),
            _ => None,
        }
    }
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Text => FieldType::Text,
            FieldKind::Textarea => FieldType::Textarea,
            FieldKind::RichText => FieldType::RichText,
            FieldKind::Email => FieldType::Email,
            FieldKind::Slug => FieldType::Slug,
            FieldKind::Number => FieldType::Number,
            FieldKind::Select { .. } => FieldType::Select,
            FieldKind::Checkbox => FieldType::Checkbox,
            FieldKind::Date => FieldType::Date,
            FieldKind::Upload { .. } => FieldType::Upload,
            FieldKind::Relationship { .. } => FieldType::Relationship,
            FieldKind::Json => FieldType::Json,
            FieldKind::Group { .. } => FieldType::Group,
            FieldKind::Array { .. } => FieldType::Array,
            FieldKind::Blocks { .. } => FieldType::Blocks,
            FieldKind::Tabs { .. } => FieldType::Tabs,
            FieldKind::Collapsible { .. } => FieldType::Collapsible,
            FieldKind::Row { .. } => FieldType::Row,
        }
    }
}

/// Discriminator key every block item carries.
pub const BLOCK_TYPE_KEY: &str = "blockType";

/// A definition that owns a key in its enclosing data object.
#[derive(Debug, Clone, Copy)]
pub enum DataSlot<'a> {
    Field(&'a FieldDefinition),
    Tab(&'a TabConfig),
}

impl<'a> DataSlot<'a> {
    pub fn key(&self) -> Option<&'a str> {
        match self {
            DataSlot::Field(def) => def.name.as_deref(),
            DataSlot::Tab(tab) => tab.name.as_deref(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            DataSlot::Field(def) => def.field_type(),
            DataSlot::Tab(_) => FieldType::Tabs,
        }
    }

    pub fn label(&self) -> String {
        match self {
            DataSlot::Field(def) => def.display_label(),
            DataSlot::Tab(tab) => tab
                .label
                .clone()
                .or_else(|| tab.name.as_deref().map(prettify_label))
                .unwrap_or_default(),
        }
    }

    /// Nested field list for slots whose data is an object of their own.
    pub fn object_fields(&self) -> Option<&'a [FieldDefinition]> {
        match self {
            DataSlot::Field(def) => match &def.kind {
                FieldKind::Group { fields } => Some(fields),
                _ => None,
            },
            DataSlot::Tab(tab) => Some(&tab.fields),
        }
    }
}

/// Fields owning a key in the data object described by `fields`, with rows,
/// collapsibles and unnamed tabs flattened into their parent scope.
pub fn data_fields(fields: &[FieldDefinition]) -> Vec<DataSlot<'_>> {
    let mut slots = Vec::new();
    collect_data_fields(fields, &mut slots);
    slots
}

fn collect_data_fields<'a>(fields: &'a [FieldDefinition], acc: &mut Vec<DataSlot<'a>>) {
    for field in fields {
        match &field.kind {
            FieldKind::Row { fields } | FieldKind::Collapsible { fields } => {
                collect_data_fields(fields, acc)
            }
            FieldKind::Tabs { tabs } => {
                for tab in tabs {
                    if tab.name.is_some() {
                        acc.push(DataSlot::Tab(tab));
                    } else {
                        collect_data_fields(&tab.fields, acc);
                    }
                }
            }
            _ => {
                if field.name.is_some() {
                    acc.push(DataSlot::Field(field));
                }
            }
        }
    }
}

/// Looks up a data key, searching through unnamed wrappers.
pub fn find_field<'a>(fields: &'a [FieldDefinition], name: &str) -> Option<DataSlot<'a>> {
    data_fields(fields)
        .into_iter()
        .find(|slot| slot.key() == Some(name))
}

pub fn prettify_label(raw: &str) -> String {
    let mut label = String::with_capacity(raw.len());
    let mut prev_lower = false;
    for (idx, ch) in raw.chars().enumerate() {
        if ch == '_' || ch == '-' {
            label.push(' ');
            prev_lower = false;
            continue;
        }
        if idx == 0 {
            label.extend(ch.to_uppercase());
        } else if ch.is_uppercase() && prev_lower {
            label.push(' ');
            label.push(ch);
        } else {
            label.push(ch);
        }
        prev_lower = ch.is_lowercase();
    }
    label
}
