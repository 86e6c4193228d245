use thiserror::Error;

use super::path::FieldPath;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("document root must be an object")]
    DocumentNotObject,
    #[error("no value at '{0}'")]
    UnknownPath(FieldPath),
    #[error("'{0}' is not a blocks field")]
    NotBlocks(FieldPath),
}
