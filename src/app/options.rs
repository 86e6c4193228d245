use std::sync::Arc;

use super::keymap::{Keymap, KeymapError};
use crate::domain::FieldType;
use crate::presentation::{FieldRenderer, RendererTable};

#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// Disables every block editor of the session.
    pub read_only: bool,
    /// Re-run validation after each value or structural change.
    pub auto_validate: bool,
    pub(crate) keymap: Arc<Keymap>,
    pub(crate) renderers: Arc<RendererTable>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            auto_validate: true,
            keymap: Keymap::shared_default(),
            renderers: Arc::new(RendererTable::standard()),
        }
    }
}

impl EditorOptions {
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_auto_validate(mut self, enabled: bool) -> Self {
        self.auto_validate = enabled;
        self
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = Arc::new(keymap);
        self
    }

    pub fn with_keymap_json(self, source: &str) -> Result<Self, KeymapError> {
        let keymap = Keymap::from_json(source)?;
        Ok(self.with_keymap(keymap))
    }

    pub fn with_renderer_table(mut self, table: RendererTable) -> Self {
        self.renderers = Arc::new(table);
        self
    }

    pub fn with_renderer(self, field_type: FieldType, renderer: impl FieldRenderer + 'static) -> Self {
        self.map_renderers(|table| table.with_renderer(field_type, renderer))
    }

    pub fn keymap(&self) -> Arc<Keymap> {
        Arc::clone(&self.keymap)
    }

    pub fn renderers(&self) -> Arc<RendererTable> {
        Arc::clone(&self.renderers)
    }

    fn map_renderers(mut self, map: impl FnOnce(RendererTable) -> RendererTable) -> Self {
        let updated = map((*self.renderers).clone());
        self.renderers = Arc::new(updated);
        self
    }
}
