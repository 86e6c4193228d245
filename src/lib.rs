#![deny(rust_2018_idioms)]

pub mod app;
pub mod domain;
pub mod form;
pub mod io;
pub mod presentation;
mod runtime;

pub use app::{
    ComboError, EditorOptions, ElementKind, KeyCombo, KeyOrigin, KeyboardController, Keymap,
    KeymapError,
};
pub use domain::{
    BlockCatalogue, BlockDefinition, FieldDefinition, FieldType, FormSchema, SchemaError,
};
pub use form::{
    BlockChange, BlockEditor, EditorState, FieldPath, FormError, FormNode, NodeAccess, NodeState,
    ValidationReport,
};
pub use presentation::{FieldRenderer, FieldView, RendererTable};
pub use io::{
    DocumentFormat, OutputTarget, parse_document_str, parse_schema_str, read_document,
    serialize_document, write_document,
};
pub use runtime::{BlockForm, FormSession};

pub mod prelude {
    pub use super::{
        BlockChange, BlockForm, EditorOptions, FieldPath, FormSession, KeyOrigin, NodeAccess,
    };
}
