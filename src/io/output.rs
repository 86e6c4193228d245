use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

use super::DocumentFormat;

/// Where a serialized document goes.
#[derive(Debug, Clone, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

pub fn serialize_document(value: &Value, format: DocumentFormat, pretty: bool) -> Result<String> {
    match format {
        DocumentFormat::Json if pretty => {
            serde_json::to_string_pretty(value).context("failed to serialize JSON")
        }
        DocumentFormat::Json => serde_json::to_string(value).context("failed to serialize JSON"),
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => serde_yaml::to_string(value).context("failed to serialize YAML"),
        #[cfg(feature = "toml")]
        DocumentFormat::Toml if pretty => {
            toml::to_string_pretty(value).context("failed to serialize TOML")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::to_string(value).context("failed to serialize TOML"),
    }
}

/// Serializes `value` and writes it, newline-terminated, to `target`.
pub fn write_document(
    value: &Value,
    format: DocumentFormat,
    pretty: bool,
    target: &OutputTarget,
) -> Result<()> {
    let mut payload = serialize_document(value, format, pretty)?;
    if !payload.ends_with('\n') {
        payload.push('\n');
    }
    match target {
        OutputTarget::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(payload.as_bytes())
                .and_then(|_| stdout.flush())
                .context("failed to write to stdout")
        }
        OutputTarget::File(path) => fs::write(path, payload)
            .with_context(|| format!("failed to write to file {}", path.display())),
    }
}
