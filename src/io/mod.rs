mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{parse_document_str, parse_schema_str, read_document};
pub use output::{OutputTarget, serialize_document, write_document};
