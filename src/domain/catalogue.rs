use std::sync::Arc;

use indexmap::IndexMap;

use super::schema::{BlockDefinition, FieldDefinition};

/// Slug-indexed view over the block variants a blocks field accepts.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalogue {
    entries: IndexMap<String, CatalogueEntry>,
}

#[derive(Debug, Clone)]
struct CatalogueEntry {
    definition: BlockDefinition,
    fields: Arc<[FieldDefinition]>,
}

impl BlockCatalogue {
    /// Later definitions with a repeated slug are ignored; the parser rejects
    /// such schemas before they get here.
    pub fn new(definitions: impl IntoIterator<Item = BlockDefinition>) -> Self {
        let mut entries = IndexMap::new();
        for definition in definitions {
            let fields: Arc<[FieldDefinition]> = Arc::from(definition.fields.clone());
            entries
                .entry(definition.slug.clone())
                .or_insert(CatalogueEntry { definition, fields });
        }
        Self { entries }
    }

    pub fn get(&self, slug: &str) -> Option<&BlockDefinition> {
        self.entries.get(slug).map(|entry| &entry.definition)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.entries.contains_key(slug)
    }

    pub(crate) fn fields_for(&self, slug: &str) -> Option<Arc<[FieldDefinition]>> {
        self.entries.get(slug).map(|entry| Arc::clone(&entry.fields))
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.entries.values().map(|entry| &entry.definition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
