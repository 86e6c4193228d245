use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    BLOCK_TYPE_KEY, BlockDefinition, DataSlot, FieldDefinition, FieldType, data_fields,
};

/// Type-appropriate empty value for `def`, or its configured `default_value`.
pub fn default_for(def: &FieldDefinition) -> Value {
    if let Some(value) = &def.default_value {
        return value.clone();
    }
    empty_value(def.field_type())
}

pub fn default_for_slot(slot: DataSlot<'_>) -> Value {
    match slot {
        DataSlot::Field(def) => default_for(def),
        DataSlot::Tab(_) => Value::Object(Map::new()),
    }
}

fn empty_value(field_type: FieldType) -> Value {
    match field_type {
        kind if kind.is_text_like() => Value::String(String::new()),
        FieldType::Checkbox => Value::Bool(false),
        FieldType::Array | FieldType::Blocks => Value::Array(Vec::new()),
        FieldType::Group | FieldType::Json | FieldType::Tabs => Value::Object(Map::new()),
        _ => Value::Null,
    }
}

/// Object holding a default for every data key of `fields`.
pub fn default_object(fields: &[FieldDefinition]) -> Map<String, Value> {
    data_fields(fields)
        .into_iter()
        .filter_map(|slot| Some((slot.key()?.to_string(), default_for_slot(slot))))
        .collect()
}

/// One item of a blocks collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockItem {
    #[serde(rename = "blockType")]
    pub block_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BlockItem {
    /// Fresh item of `definition` with every declared field defaulted.
    pub fn from_definition(definition: &BlockDefinition) -> Self {
        Self {
            block_type: definition.slug.clone(),
            fields: default_object(&definition.fields),
        }
    }

    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert(BLOCK_TYPE_KEY.to_string(), Value::String(self.block_type));
        map.extend(self.fields);
        Value::Object(map)
    }

    /// `None` for non-objects and objects without a string `blockType`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let block_type = map.get(BLOCK_TYPE_KEY)?.as_str()?.to_string();
        let fields = map
            .iter()
            .filter(|(key, _)| key.as_str() != BLOCK_TYPE_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Self { block_type, fields })
    }
}
