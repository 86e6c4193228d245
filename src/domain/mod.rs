mod catalogue;
mod parser;
mod schema;

pub use catalogue::BlockCatalogue;
pub use parser::{SchemaError, parse_fields, parse_form_schema};
pub use schema::{
    AdminHints, BLOCK_TYPE_KEY, BlockDefinition, BlockLabels, Condition, DataSlot, FieldDefinition, FieldKind,
    FieldType, FormSchema, SelectOption, TabConfig, data_fields, find_field, prettify_label,
};
