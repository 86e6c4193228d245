use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::schema::{
    BLOCK_TYPE_KEY, FieldDefinition, FieldKind, FieldType, FormSchema, data_fields,
};

/// Names and slugs must not look like array indices, otherwise `content.2`
/// would be ambiguous in a path.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid identifier pattern"));

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed field schema: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{kind} field in '{scope}' requires a name")]
    MissingName { kind: FieldType, scope: String },
    #[error("invalid field name '{name}' in '{scope}'")]
    InvalidName { name: String, scope: String },
    #[error("duplicate field name '{name}' in '{scope}'")]
    DuplicateName { name: String, scope: String },
    #[error("invalid block slug '{slug}' in '{scope}'")]
    InvalidSlug { slug: String, scope: String },
    #[error("duplicate block slug '{slug}' in '{scope}'")]
    DuplicateSlug { slug: String, scope: String },
    #[error("field name '{name}' is reserved in '{scope}'")]
    ReservedName { name: String, scope: String },
}

/// Parse a schema document into a validated [`FormSchema`].
pub fn parse_form_schema(value: &Value) -> Result<FormSchema, SchemaError> {
    let schema: FormSchema = serde_json::from_value(value.clone())?;
    validate_fields(&schema.fields, "<root>")?;
    Ok(schema)
}

/// Parse a bare field list (no title/description envelope).
pub fn parse_fields(value: &Value) -> Result<Vec<FieldDefinition>, SchemaError> {
    let fields: Vec<FieldDefinition> = serde_json::from_value(value.clone())?;
    validate_fields(&fields, "<root>")?;
    Ok(fields)
}

fn validate_fields(fields: &[FieldDefinition], scope: &str) -> Result<(), SchemaError> {
    for field in fields {
        check_field(field, scope)?;
    }

    let mut seen = HashSet::new();
    for slot in data_fields(fields) {
        if let Some(key) = slot.key()
            && !seen.insert(key)
        {
            return Err(SchemaError::DuplicateName {
                name: key.to_string(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

fn check_field(field: &FieldDefinition, scope: &str) -> Result<(), SchemaError> {
    match field.name.as_deref() {
        Some(name) if !IDENTIFIER.is_match(name) => {
            return Err(SchemaError::InvalidName {
                name: name.to_string(),
                scope: scope.to_string(),
            });
        }
        None if field.requires_name() => {
            return Err(SchemaError::MissingName {
                kind: field.field_type(),
                scope: scope.to_string(),
            });
        }
        _ => {}
    }

    let nested_scope = match field.name.as_deref() {
        Some(name) if scope == "<root>" => name.to_string(),
        Some(name) => format!("{scope}.{name}"),
        None => scope.to_string(),
    };

    match &field.kind {
        FieldKind::Group { fields } | FieldKind::Array { fields, .. } => {
            validate_fields(fields, &nested_scope)
        }
        // Wrappers share the parent's data scope; duplicates are caught there.
        FieldKind::Row { fields } | FieldKind::Collapsible { fields } => {
            for child in fields {
                check_field(child, scope)?;
            }
            Ok(())
        }
        FieldKind::Tabs { tabs } => {
            for tab in tabs {
                match tab.name.as_deref() {
                    Some(name) if !IDENTIFIER.is_match(name) => {
                        return Err(SchemaError::InvalidName {
                            name: name.to_string(),
                            scope: scope.to_string(),
                        });
                    }
                    Some(name) => {
                        let tab_scope = if scope == "<root>" {
                            name.to_string()
                        } else {
                            format!("{scope}.{name}")
                        };
                        validate_fields(&tab.fields, &tab_scope)?;
                    }
                    None => {
                        for child in &tab.fields {
                            check_field(child, scope)?;
                        }
                    }
                }
            }
            Ok(())
        }
        FieldKind::Blocks { blocks, .. } => {
            let mut slugs = HashSet::new();
            for block in blocks {
                if !IDENTIFIER.is_match(&block.slug) {
                    return Err(SchemaError::InvalidSlug {
                        slug: block.slug.clone(),
                        scope: nested_scope,
                    });
                }
                if !slugs.insert(block.slug.as_str()) {
                    return Err(SchemaError::DuplicateSlug {
                        slug: block.slug.clone(),
                        scope: nested_scope,
                    });
                }
                let block_scope = format!("{nested_scope}.{}", block.slug);
                validate_fields(&block.fields, &block_scope)?;
                if data_fields(&block.fields)
                    .iter()
                    .any(|slot| slot.key() == Some(BLOCK_TYPE_KEY))
                {
                    return Err(SchemaError::ReservedName {
                        name: BLOCK_TYPE_KEY.to_string(),
                        scope: block_scope,
                    });
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_nested_blocks_schema() {
        let schema = json!({
            "title": "Page",
            "fields": [
                {"name": "title", "type": "text", "required": true},
                {"type": "row", "fields": [
                    {"name": "publishedAt", "type": "date"},
                    {"name": "featured", "type": "checkbox"}
                ]},
                {"name": "content", "type": "blocks", "minRows": 1, "blocks": [
                    {"slug": "hero", "fields": [
                        {"name": "heading", "type": "text"},
                        {"name": "style", "type": "select", "options": ["light", {"label": "Dark", "value": "dark"}]}
                    ]}
                ]}
            ]
        });
        let parsed = parse_form_schema(&schema).expect("schema parsed");
        assert_eq!(parsed.fields.len(), 3);
        let content = &parsed.fields[2];
        assert_eq!(content.field_type(), FieldType::Blocks);
        assert_eq!(content.min_rows(), 1);
        let hero = content.block("hero").expect("hero block");
        match &hero.fields[1].kind {
            FieldKind::Select { options, has_many } => {
                assert!(!has_many);
                assert_eq!(options[1].value(), "dark");
                assert_eq!(options[1].label(), "Dark");
            }
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn named_fields_require_a_name() {
        let schema = json!({"fields": [{"type": "text"}]});
        let err = parse_form_schema(&schema).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingName {
                kind: FieldType::Text,
                ..
            }
        ));
    }

    #[test]
    fn numeric_names_are_rejected() {
        let schema = json!({"fields": [{"name": "2", "type": "text"}]});
        let err = parse_form_schema(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidName { .. }), "{err}");
    }

    #[test]
    fn duplicates_across_unnamed_wrappers_are_rejected() {
        let schema = json!({"fields": [
            {"name": "title", "type": "text"},
            {"type": "collapsible", "fields": [{"name": "title", "type": "textarea"}]}
        ]});
        let err = parse_form_schema(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { ref name, .. } if name == "title"));
    }

    #[test]
    fn same_name_under_named_tabs_is_allowed() {
        let schema = json!({"fields": [
            {"type": "tabs", "tabs": [
                {"name": "seo", "fields": [{"name": "title", "type": "text"}]},
                {"label": "Content", "fields": [{"name": "title", "type": "text"}]}
            ]}
        ]});
        assert!(parse_form_schema(&schema).is_ok());
    }

    #[test]
    fn duplicate_block_slugs_are_rejected() {
        let schema = json!({"fields": [
            {"name": "content", "type": "blocks", "blocks": [
                {"slug": "hero", "fields": []},
                {"slug": "hero", "fields": []}
            ]}
        ]});
        let err = parse_form_schema(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateSlug { ref scope, .. } if scope == "content"));
    }

    #[test]
    fn block_fields_cannot_shadow_the_discriminator() {
        let schema = json!({"fields": [
            {"name": "content", "type": "blocks", "blocks": [
                {"slug": "hero", "fields": [
                    {"type": "row", "fields": [{"name": "blockType", "type": "text"}]}
                ]}
            ]}
        ]});
        let err = parse_form_schema(&schema).unwrap_err();
        assert!(
            matches!(err, SchemaError::ReservedName { ref scope, .. } if scope == "content.hero"),
            "{err}"
        );
        let top_level = json!({"fields": [{"name": "blockType", "type": "text"}]});
        assert!(parse_form_schema(&top_level).is_ok());
    }
}
