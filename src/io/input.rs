use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::domain::{FormSchema, parse_form_schema};

use super::DocumentFormat;

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).context("failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).context("failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => contents
            .parse::<toml::Value>()
            .context("failed to parse TOML document")
            .and_then(|value| {
                serde_json::to_value(value).context("failed to convert TOML to JSON")
            }),
    }
}

/// Reads a file, taking the format from its extension unless `format` is set.
/// Files without a recognised extension are read as JSON.
pub fn read_document(path: &Path, format: Option<DocumentFormat>) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let format = format
        .or_else(|| DocumentFormat::from_path(path))
        .unwrap_or(DocumentFormat::Json);
    parse_document_str(&contents, format).with_context(|| format!("in {}", path.display()))
}

/// Parses and checks a field schema document.
pub fn parse_schema_str(contents: &str, format: DocumentFormat) -> Result<FormSchema> {
    let value = parse_document_str(contents, format)?;
    parse_form_schema(&value).context("invalid field schema")
}
