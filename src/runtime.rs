use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crossterm::event::KeyEvent;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::app::{EditorOptions, KeyOrigin, KeyboardController};
use crate::domain::{
    DataSlot, FieldDefinition, FieldKind, FormSchema, SchemaError, parse_form_schema,
};
use crate::form::{
    ArrayNode, BlockChange, BlockEditor, EditorState, EntrySlot, FieldEntry, FieldPath,
    FormError, FormNode, NodeAccess, NodeState, PathSegment, ValidationReport, apply_report,
    collect_entries, get_sub_node, normalize_tree, resolve, resolve_mut, validate_tree,
    walk_fields,
};
use crate::presentation::FieldView;

/// Entry point: a parsed schema plus the options every session inherits.
#[derive(Debug, Clone)]
pub struct BlockForm {
    schema: FormSchema,
    options: EditorOptions,
}

impl BlockForm {
    pub fn new(schema: FormSchema) -> Self {
        Self {
            schema,
            options: EditorOptions::default(),
        }
    }

    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        parse_form_schema(schema).map(Self::new)
    }

    pub fn with_options(mut self, options: EditorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Builds the node tree for `document` and backfills block defaults.
    /// Backfilled values become the clean baseline.
    pub fn load(&self, document: &Value) -> Result<FormSession, FormError> {
        if !document.is_object() {
            return Err(FormError::DocumentNotObject);
        }
        let mut root = FormNode::build(&self.schema.fields, document);
        let backfilled = normalize_tree(&mut root);
        if backfilled > 0 {
            let settled = root.value();
            root.reset(Some(settled));
        }
        debug!(backfilled, "session loaded");
        Ok(FormSession {
            schema: self.schema.clone(),
            controller: KeyboardController::new(self.options.keymap()),
            options: self.options.clone(),
            root,
            editors: HashMap::new(),
            report: ValidationReport::default(),
            backfilled,
        })
    }
}

/// One document being edited. Block editors are opened lazily per blocks
/// path and dropped once their rows may have moved underneath them.
#[derive(Debug)]
pub struct FormSession {
    schema: FormSchema,
    options: EditorOptions,
    controller: KeyboardController,
    root: FormNode,
    editors: HashMap<FieldPath, BlockEditor>,
    report: ValidationReport,
    backfilled: usize,
}

impl FormSession {
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn root(&self) -> &FormNode {
        &self.root
    }

    pub fn resolve(&self, path: impl Into<FieldPath>) -> Option<&FormNode> {
        resolve(&self.root, &path.into())
    }

    pub fn state(&self, path: impl Into<FieldPath>) -> Option<NodeState> {
        self.resolve(path).map(NodeAccess::state)
    }

    pub fn value(&self) -> Value {
        self.root.value()
    }

    pub fn into_value(self) -> Value {
        self.root.value()
    }

    pub fn is_dirty(&self) -> bool {
        self.root.state().dirty
    }

    /// Number of blocks cells rewritten by normalization at load time.
    pub fn backfilled(&self) -> usize {
        self.backfilled
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Writes `value` at `path`. Block items inside the written value get
    /// their missing fields backfilled; unlike at load, those count as edits.
    pub fn set_value(&mut self, path: impl Into<FieldPath>, value: Value) -> Result<(), FormError> {
        let path = path.into();
        if path.is_root() && !value.is_object() {
            return Err(FormError::DocumentNotObject);
        }
        let node =
            resolve_mut(&mut self.root, &path).ok_or_else(|| FormError::UnknownPath(path.clone()))?;
        node.set_value(value);
        let backfilled = normalize_tree(node);
        trace!(%path, backfilled, "value set");
        self.settle_editors(&path);
        self.after_change();
        Ok(())
    }

    pub fn mark_touched(&mut self, path: impl Into<FieldPath>) -> Result<(), FormError> {
        let path = path.into();
        resolve_mut(&mut self.root, &path)
            .ok_or(FormError::UnknownPath(path))?
            .mark_touched();
        Ok(())
    }

    /// Restores the baseline below `path` and clears its status.
    pub fn reset(&mut self, path: impl Into<FieldPath>) -> Result<(), FormError> {
        let path = path.into();
        let node =
            resolve_mut(&mut self.root, &path).ok_or_else(|| FormError::UnknownPath(path.clone()))?;
        node.reset(None);
        normalize_tree(node);
        self.settle_editors(&path);
        self.after_change();
        Ok(())
    }

    pub fn editor(&self, path: impl Into<FieldPath>) -> Option<&BlockEditor> {
        self.editors.get(&path.into())
    }

    pub fn editor_state(&self, path: impl Into<FieldPath>) -> Option<&EditorState> {
        self.editor(path).map(BlockEditor::state)
    }

    pub fn add_block(
        &mut self,
        path: impl Into<FieldPath>,
        block_type: &str,
        at_index: usize,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), true, |editor, rows, _| {
            editor.add_block(rows, block_type, at_index)
        })
    }

    pub fn remove_block(
        &mut self,
        path: impl Into<FieldPath>,
        index: usize,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), true, |editor, rows, _| {
            editor.remove_block(rows, index)
        })
    }

    pub fn move_block(
        &mut self,
        path: impl Into<FieldPath>,
        from: usize,
        to: usize,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), true, |editor, rows, _| {
            editor.move_block(rows, from, to)
        })
    }

    pub fn on_drop(
        &mut self,
        path: impl Into<FieldPath>,
        previous: isize,
        current: isize,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), true, |editor, rows, _| {
            editor.on_drop(rows, previous, current)
        })
    }

    pub fn duplicate_block(
        &mut self,
        path: impl Into<FieldPath>,
        index: usize,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), true, |editor, rows, _| {
            editor.duplicate_block(rows, index)
        })
    }

    pub fn toggle_block_collapse(
        &mut self,
        path: impl Into<FieldPath>,
        index: usize,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), false, |editor, _, _| {
            editor.toggle_block_collapse(index)
        })
    }

    pub fn set_all_collapsed(
        &mut self,
        path: impl Into<FieldPath>,
        collapsed: bool,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), false, |editor, rows, _| {
            editor.set_all_collapsed(&*rows, collapsed)
        })
    }

    pub fn select_block(
        &mut self,
        path: impl Into<FieldPath>,
        index: Option<usize>,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), false, |editor, rows, _| {
            editor.select_block(&*rows, index)
        })
    }

    pub fn set_hovered(
        &mut self,
        path: impl Into<FieldPath>,
        index: Option<usize>,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), false, |editor, _, _| editor.set_hovered(index))
    }

    /// Routes a key press to the editor of the blocks field at `path`.
    pub fn handle_key(
        &mut self,
        path: impl Into<FieldPath>,
        key: &KeyEvent,
        origin: &KeyOrigin,
    ) -> Result<Option<BlockChange>, FormError> {
        self.edit_blocks(path.into(), false, |editor, rows, controller| {
            controller.handle(editor, rows, key, origin)
        })
    }

    pub fn help_text(&self) -> String {
        self.controller.keymap().help_text()
    }

    pub fn validate(&mut self) -> &ValidationReport {
        self.report = validate_tree(&self.schema.fields, &self.root);
        apply_report(&mut self.root, &self.report);
        &self.report
    }

    /// Every entry of the document in schema order, layout wrappers included.
    pub fn entries(&self) -> Vec<FieldEntry<'_, '_>> {
        collect_entries(&self.schema.fields, &self.root)
    }

    /// Visible data entries as renderer input.
    pub fn views(&self) -> Vec<FieldView> {
        self.entries()
            .iter()
            .filter(|entry| entry.visible && entry.owns_data())
            .map(FieldView::from_entry)
            .collect()
    }

    pub fn render(&self, view: &FieldView) -> String {
        self.options.renderers().render(view)
    }

    fn edit_blocks<F>(
        &mut self,
        path: FieldPath,
        structural: bool,
        op: F,
    ) -> Result<Option<BlockChange>, FormError>
    where
        F: FnOnce(&mut BlockEditor, &mut ArrayNode, &KeyboardController) -> Option<BlockChange>,
    {
        let editor = match self.editors.entry(path.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(open_editor(
                &self.schema.fields,
                &self.root,
                &path,
                self.options.read_only,
            )?),
        };
        if structural && editor.is_disabled() {
            trace!(%path, "structural edit ignored: editor disabled");
            return Ok(None);
        }
        let change = match resolve_mut(&mut self.root, &path).and_then(FormNode::as_array_mut) {
            Some(rows) => {
                let change = op(editor, rows, &self.controller);
                if change.as_ref().is_some_and(BlockChange::is_structural) {
                    rows.mark_touched();
                }
                change
            }
            // Null or absent cell: edit an empty list and store it once rows exist.
            None => {
                let mut rows = empty_rows(&self.schema.fields, &self.root, &path)?;
                let change = op(editor, &mut rows, &self.controller);
                if change.as_ref().is_some_and(BlockChange::is_structural) {
                    create_null_cell(&mut self.root, &path)?;
                    let stored = resolve_mut(&mut self.root, &path)
                        .ok_or_else(|| FormError::UnknownPath(path.clone()))?;
                    stored.set_value(rows.value());
                    stored.mark_touched();
                    debug!(%path, "blocks cell created");
                }
                change
            }
        };
        let Some(change) = change else {
            return Ok(None);
        };
        if change.is_structural() {
            self.editors
                .retain(|editor_path, _| !editor_path.is_descendant_of(&path));
            self.after_change();
        }
        Ok(Some(change))
    }

    /// Editors below `changed` lose their rows; the editor at `changed`
    /// keeps its state clamped to the new row count.
    fn settle_editors(&mut self, changed: &FieldPath) {
        let root = &self.root;
        self.editors.retain(|path, editor| {
            if path.is_descendant_of(changed) {
                return false;
            }
            if path != changed {
                return true;
            }
            match resolve(root, path).and_then(FormNode::as_array) {
                Some(rows) => {
                    editor.reconcile(rows.len());
                    true
                }
                None => false,
            }
        });
    }

    fn after_change(&mut self) {
        if self.options.auto_validate {
            self.validate();
        }
    }
}

fn open_editor(
    fields: &[FieldDefinition],
    root: &FormNode,
    path: &FieldPath,
    read_only: bool,
) -> Result<BlockEditor, FormError> {
    let stored = resolve(root, path);
    if stored.is_some_and(|node| node.as_array().is_none() && !node.value().is_null()) {
        return Err(FormError::NotBlocks(path.clone()));
    }
    let Some((def, inherited)) = blocks_definition(fields, root, path) else {
        return Err(match stored {
            Some(_) => FormError::NotBlocks(path.clone()),
            None => FormError::UnknownPath(path.clone()),
        });
    };
    let editor = BlockEditor::for_field(def).ok_or_else(|| FormError::NotBlocks(path.clone()))?;
    let editor = if read_only || inherited {
        editor.with_disabled(true)
    } else {
        editor
    };
    debug!(%path, disabled = editor.is_disabled(), "block editor opened");
    Ok(editor)
}

/// Detached empty rows for a blocks field whose cell is null or absent.
fn empty_rows(
    fields: &[FieldDefinition],
    root: &FormNode,
    path: &FieldPath,
) -> Result<ArrayNode, FormError> {
    writable_depth(root, path)?;
    let (def, _) =
        blocks_definition(fields, root, path).ok_or_else(|| FormError::NotBlocks(path.clone()))?;
    match FormNode::for_slot(DataSlot::Field(def), &Value::Array(Vec::new())) {
        FormNode::Array(rows) => Ok(rows),
        _ => Err(FormError::NotBlocks(path.clone())),
    }
}

/// Depth of the deepest node on `path`, provided a value can be stored at
/// `path` from there: the node is null or an object and only keys remain.
fn writable_depth(root: &FormNode, path: &FieldPath) -> Result<usize, FormError> {
    let mut node = root;
    let mut depth = 0;
    for segment in path.segments() {
        let Some(next) = get_sub_node(node, segment) else {
            break;
        };
        node = next;
        depth += 1;
    }
    let open = node.value().is_null() || (depth < path.len() && node.as_object().is_some());
    let keyed = path.segments()[depth..]
        .iter()
        .all(|segment| matches!(segment, PathSegment::Key(_)));
    if open && keyed {
        Ok(depth)
    } else {
        Err(FormError::NotBlocks(path.clone()))
    }
}

/// Stores `null` at `path`, creating the objects missing above it. Nodes
/// created here keep `null` as their baseline, so rows written later are edits.
fn create_null_cell(root: &mut FormNode, path: &FieldPath) -> Result<(), FormError> {
    let depth = writable_depth(root, path)?;
    let mut nested = Value::Null;
    for segment in path.segments()[depth..].iter().rev() {
        let PathSegment::Key(key) = segment else {
            return Err(FormError::NotBlocks(path.clone()));
        };
        nested = Value::Object(Map::from_iter([(key.clone(), nested)]));
    }
    let anchor = resolve_mut(root, &path.prefix(depth))
        .ok_or_else(|| FormError::UnknownPath(path.clone()))?;
    let merged = match (anchor.value(), nested) {
        (Value::Object(mut map), Value::Object(patch)) => {
            map.extend(patch);
            Value::Object(map)
        }
        (_, nested) => nested,
    };
    anchor.set_value(merged);
    Ok(())
}

/// Definition of the blocks field at `path`, and whether a read-only
/// ancestor field locks it.
fn blocks_definition<'s>(
    fields: &'s [FieldDefinition],
    root: &FormNode,
    path: &FieldPath,
) -> Option<(&'s FieldDefinition, bool)> {
    let mut found = None;
    let mut inherited = false;
    walk_fields(fields, Some(root), &FieldPath::root(), &mut |entry| {
        let EntrySlot::Field(def) = entry.slot else {
            return;
        };
        if def.admin.read_only && entry.owns_data() && path.is_descendant_of(&entry.path) {
            inherited = true;
        }
        if found.is_none() && entry.path == *path && matches!(def.kind, FieldKind::Blocks { .. }) {
            found = Some(def);
        }
    });
    found.map(|def| (def, inherited))
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};
    use serde_json::json;

    use super::*;
    use crate::app::ElementKind;

    fn form() -> BlockForm {
        BlockForm::from_value(&json!({
            "title": "Page",
            "fields": [
                {"name": "title", "type": "text", "required": true},
                {"name": "layout", "type": "blocks", "blocks": [
                    {"slug": "hero", "fields": [
                        {"name": "heading", "type": "text"},
                        {"name": "cta", "type": "checkbox"}
                    ]},
                    {"slug": "gallery", "fields": [
                        {"name": "images", "type": "blocks", "blocks": [
                            {"slug": "image", "fields": [{"name": "alt", "type": "text"}]}
                        ]}
                    ]}
                ]},
                {"name": "archive", "type": "blocks", "admin": {"readOnly": true}, "blocks": [
                    {"slug": "hero", "fields": []}
                ]}
            ]
        }))
        .expect("schema parsed")
    }

    #[test]
    fn load_backfills_into_a_clean_baseline() {
        let session = form()
            .load(&json!({"title": "Home", "layout": [{"blockType": "hero"}]}))
            .expect("session loaded");
        assert_eq!(session.backfilled(), 1);
        assert!(!session.is_dirty());
        assert_eq!(
            session.value()["layout"][0],
            json!({"blockType": "hero", "heading": "", "cta": false})
        );
    }

    #[test]
    fn load_rejects_non_object_documents() {
        assert!(matches!(
            form().load(&json!([1, 2])),
            Err(FormError::DocumentNotObject)
        ));
    }

    #[test]
    fn structural_edits_mark_the_blocks_field() {
        let mut session = form()
            .load(&json!({"title": "Home", "layout": []}))
            .expect("session loaded");
        let change = session.add_block("layout", "hero", 0).expect("blocks path");
        assert!(matches!(change, Some(BlockChange::Added { index: 0, .. })));
        let state = session.state("layout").expect("layout state");
        assert!(state.dirty && state.touched);
        assert!(session.is_dirty());
        assert_eq!(
            session.editor_state("layout").and_then(|state| state.selected_index),
            Some(0)
        );
    }

    #[test]
    fn editors_need_a_blocks_field() {
        let mut session = form()
            .load(&json!({"title": "Home"}))
            .expect("session loaded");
        assert!(matches!(
            session.add_block("title", "hero", 0),
            Err(FormError::NotBlocks(_))
        ));
        assert!(matches!(
            session.add_block("missing", "hero", 0),
            Err(FormError::UnknownPath(_))
        ));
    }

    #[test]
    fn null_or_absent_blocks_start_empty() {
        for document in [json!({"title": "Home", "layout": null}), json!({"title": "Home"})] {
            let mut session = form().load(&document).expect("session loaded");
            assert_eq!(
                session.select_block("layout", Some(0)).expect("blocks path"),
                None
            );
            assert_eq!(session.value(), document);
            assert!(!session.is_dirty());

            let change = session.add_block("layout", "hero", 0).expect("blocks path");
            assert!(matches!(change, Some(BlockChange::Added { index: 0, .. })));
            assert_eq!(
                session.value()["layout"],
                json!([{"blockType": "hero", "heading": "", "cta": false}])
            );
            assert!(session.state("layout").is_some_and(|state| state.dirty && state.touched));
            assert_eq!(
                session.state("layout.0.heading").map(|state| state.value),
                Some(json!(""))
            );
            session.move_block("layout", 0, 0).expect("blocks path");
            assert_eq!(
                session.editor_state("layout").and_then(|state| state.selected_index),
                Some(0)
            );
        }
    }

    #[test]
    fn absent_group_is_created_for_nested_blocks() {
        let form = BlockForm::from_value(&json!({"fields": [
            {"name": "meta", "type": "group", "fields": [
                {"name": "badges", "type": "blocks", "blocks": [
                    {"slug": "badge", "fields": [{"name": "text", "type": "text"}]}
                ]}
            ]}
        ]}))
        .expect("schema parsed");
        let mut session = form.load(&json!({})).expect("session loaded");
        session.add_block("meta.badges", "badge", 0).expect("blocks path");
        assert_eq!(
            session.value(),
            json!({"meta": {"badges": [{"blockType": "badge", "text": ""}]}})
        );
        assert!(session.resolve("meta.badges.0.text").is_some());

        let mut scalar = form.load(&json!({"meta": 3})).expect("session loaded");
        assert!(matches!(
            scalar.add_block("meta.badges", "badge", 0),
            Err(FormError::NotBlocks(_))
        ));
        assert_eq!(scalar.value(), json!({"meta": 3}));
    }

    #[test]
    fn written_blocks_are_backfilled() {
        let mut session = form()
            .load(&json!({"title": "Home", "layout": []}))
            .expect("session loaded");
        session
            .set_value("layout", json!([{"blockType": "hero", "heading": "Hi"}]))
            .expect("layout exists");
        assert_eq!(
            session.value()["layout"],
            json!([{"blockType": "hero", "heading": "Hi", "cta": false}])
        );
        assert_eq!(
            session.state("layout.0.cta").map(|state| state.value),
            Some(json!(false))
        );
        assert!(session.is_dirty());

        session
            .set_value(
                FieldPath::root(),
                json!({"layout": [{"blockType": "gallery", "images": [{"blockType": "image"}]}]}),
            )
            .expect("root exists");
        assert_eq!(
            session.value()["layout"][0]["images"][0],
            json!({"blockType": "image", "alt": ""})
        );
        session.reset(FieldPath::root()).expect("root exists");
        assert!(!session.is_dirty());
        assert_eq!(session.value(), json!({"title": "Home", "layout": []}));
    }

    #[test]
    fn read_only_fields_refuse_structural_edits() {
        let mut session = form()
            .load(&json!({"archive": [{"blockType": "hero"}]}))
            .expect("session loaded");
        assert_eq!(session.remove_block("archive", 0).expect("blocks path"), None);
        assert!(session.editor("archive").is_some_and(BlockEditor::is_disabled));
        assert!(session.toggle_block_collapse("archive", 0).expect("blocks path").is_some());
        assert_eq!(session.value()["archive"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn nested_editors_are_dropped_when_rows_move() {
        let mut session = form()
            .load(&json!({"layout": [
                {"blockType": "gallery", "images": [{"blockType": "image", "alt": "a"}]},
                {"blockType": "hero"}
            ]}))
            .expect("session loaded");
        session
            .select_block("layout.0.images", Some(0))
            .expect("nested blocks path");
        assert!(session.editor("layout.0.images").is_some());
        session.move_block("layout", 0, 1).expect("blocks path");
        assert!(session.editor("layout.0.images").is_none());
        assert_eq!(
            session.state("layout.1.images.0.alt").map(|state| state.value),
            Some(json!("a"))
        );
    }

    #[test]
    fn replacing_rows_clamps_editor_state() {
        let mut session = form()
            .load(&json!({"layout": [{"blockType": "hero"}, {"blockType": "hero"}]}))
            .expect("session loaded");
        session.select_block("layout", Some(1)).expect("blocks path");
        session.toggle_block_collapse("layout", 1).expect("blocks path");
        session
            .set_value("layout", json!([{"blockType": "hero"}]))
            .expect("layout exists");
        let state = session.editor_state("layout").expect("editor kept");
        assert_eq!(state.selected_index, Some(0));
        assert!(state.collapsed.is_empty());
    }

    #[test]
    fn keys_drive_the_editor() {
        let mut session = form()
            .load(&json!({"layout": [{"blockType": "hero"}, {"blockType": "hero"}]}))
            .expect("session loaded");
        let origin = KeyOrigin::new(ElementKind::Button);
        session.select_block("layout", Some(0)).expect("blocks path");
        let delete = KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE);
        let change = session.handle_key("layout", &delete, &origin).expect("blocks path");
        assert_eq!(change, Some(BlockChange::Removed { index: 0 }));
        let typing = KeyOrigin::new(ElementKind::Input);
        assert_eq!(session.handle_key("layout", &delete, &typing).expect("blocks path"), None);
        assert_eq!(session.value()["layout"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn auto_validation_follows_edits() {
        let mut session = form()
            .load(&json!({"title": "Home"}))
            .expect("session loaded");
        session.set_value("title", json!("")).expect("title exists");
        assert!(!session.report().is_valid());
        assert!(session.state("title").is_some_and(|state| state.invalid()));

        let mut quiet = form()
            .with_options(EditorOptions::default().with_auto_validate(false))
            .load(&json!({"title": "Home"}))
            .expect("session loaded");
        quiet.set_value("title", json!("")).expect("title exists");
        assert!(quiet.report().is_valid());
        assert!(!quiet.validate().is_valid());
    }
}
