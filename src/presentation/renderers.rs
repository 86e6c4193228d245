use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::domain::FieldType;

use super::summary::{SUMMARY_WIDTH, summarize_value, truncate_to_width};
use super::view::FieldView;

/// Turns one resolved entry into presentation output.
pub trait FieldRenderer: Send + Sync + Debug {
    fn render(&self, view: &FieldView) -> String;
}

/// Renderer lookup keyed by field type, with a fallback for unmapped types
/// and for collection items.
#[derive(Debug, Clone)]
pub struct RendererTable {
    renderers: IndexMap<FieldType, Arc<dyn FieldRenderer>>,
    fallback: Arc<dyn FieldRenderer>,
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RendererTable {
    pub fn new(fallback: impl FieldRenderer + 'static) -> Self {
        Self {
            renderers: IndexMap::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// One-line text summaries for every built-in field type.
    pub fn standard() -> Self {
        let text: Arc<dyn FieldRenderer> = Arc::new(TextSummary);
        let collection: Arc<dyn FieldRenderer> = Arc::new(CollectionSummary);
        let container: Arc<dyn FieldRenderer> = Arc::new(ContainerSummary);
        let mut table = Self::new(ValueSummary);
        for field_type in [
            FieldType::Text,
            FieldType::Textarea,
            FieldType::Email,
            FieldType::Slug,
            FieldType::Date,
        ] {
            table.renderers.insert(field_type, Arc::clone(&text));
        }
        for field_type in [FieldType::Array, FieldType::Blocks] {
            table.renderers.insert(field_type, Arc::clone(&collection));
        }
        for field_type in [
            FieldType::Group,
            FieldType::Tabs,
            FieldType::Row,
            FieldType::Collapsible,
        ] {
            table.renderers.insert(field_type, Arc::clone(&container));
        }
        table
            .with_renderer(FieldType::Checkbox, CheckboxSummary)
            .with_renderer(FieldType::Select, ChoiceSummary)
            .with_renderer(FieldType::RichText, RichTextSummary)
    }

    pub fn with_renderer(
        mut self,
        field_type: FieldType,
        renderer: impl FieldRenderer + 'static,
    ) -> Self {
        self.renderers.insert(field_type, Arc::new(renderer));
        self
    }

    pub fn with_fallback(mut self, renderer: impl FieldRenderer + 'static) -> Self {
        self.fallback = Arc::new(renderer);
        self
    }

    pub fn renderer_for(&self, field_type: Option<FieldType>) -> &dyn FieldRenderer {
        field_type
            .and_then(|field_type| self.renderers.get(&field_type))
            .map(|renderer| renderer.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    pub fn render(&self, view: &FieldView) -> String {
        self.renderer_for(view.field_type).render(view)
    }
}

const ABSENT: &str = "—";

#[derive(Debug, Clone, Copy)]
struct ValueSummary;

impl FieldRenderer for ValueSummary {
    fn render(&self, view: &FieldView) -> String {
        match (&view.block_type, &view.value) {
            (Some(block_type), Some(Value::Object(map))) => {
                format!("{block_type} ({} fields)", map.len().saturating_sub(1))
            }
            (_, Some(value)) => summarize_value(value),
            (_, None) => ABSENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TextSummary;

impl FieldRenderer for TextSummary {
    fn render(&self, view: &FieldView) -> String {
        match &view.value {
            Some(Value::String(text)) if text.is_empty() => "\"\"".to_string(),
            Some(value) => summarize_value(value),
            None => ABSENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CheckboxSummary;

impl FieldRenderer for CheckboxSummary {
    fn render(&self, view: &FieldView) -> String {
        match &view.value {
            Some(Value::Bool(true)) => "[x]".to_string(),
            Some(Value::Bool(false)) | Some(Value::Null) => "[ ]".to_string(),
            Some(other) => summarize_value(other),
            None => ABSENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChoiceSummary;

impl FieldRenderer for ChoiceSummary {
    fn render(&self, view: &FieldView) -> String {
        match &view.value {
            Some(Value::String(choice)) => choice.clone(),
            Some(Value::Array(choices)) => {
                let joined = choices
                    .iter()
                    .map(|choice| match choice {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}]", truncate_to_width(&joined, SUMMARY_WIDTH))
            }
            Some(Value::Null) | None => ABSENT.to_string(),
            Some(other) => summarize_value(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RichTextSummary;

impl FieldRenderer for RichTextSummary {
    fn render(&self, view: &FieldView) -> String {
        match &view.value {
            Some(value @ Value::String(_)) => summarize_value(value),
            Some(Value::Null) | None => ABSENT.to_string(),
            Some(_) => "rich text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CollectionSummary;

impl FieldRenderer for CollectionSummary {
    fn render(&self, view: &FieldView) -> String {
        let noun = match view.field_type {
            Some(FieldType::Blocks) => "block",
            _ => "item",
        };
        match &view.value {
            Some(Value::Array(items)) if items.len() == 1 => format!("1 {noun}"),
            Some(Value::Array(items)) => format!("{} {noun}s", items.len()),
            Some(other) => summarize_value(other),
            None => ABSENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ContainerSummary;

impl FieldRenderer for ContainerSummary {
    fn render(&self, view: &FieldView) -> String {
        match &view.value {
            Some(Value::Object(map)) => format!("{{{} keys}}", map.len()),
            Some(other) => summarize_value(other),
            None => view.label.clone(),
        }
    }
}
