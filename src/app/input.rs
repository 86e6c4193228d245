use std::sync::Arc;

use crossterm::event::{KeyEvent, KeyEventKind};
use tracing::trace;

use crate::form::{BlockChange, BlockEditor, BlockRows};

use super::keymap::Keymap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    SelectStep(isize),
    ClearSelection,
    RemoveSelected,
    ToggleCollapse,
    MoveSelected(isize),
    DuplicateSelected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementKind {
    #[default]
    Other,
    Input,
    Textarea,
    Select,
    Button,
}

/// Where a key press came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOrigin {
    pub element: ElementKind,
    pub content_editable: bool,
    pub within_rich_text: bool,
}

impl KeyOrigin {
    pub fn new(element: ElementKind) -> Self {
        Self {
            element,
            ..Self::default()
        }
    }

    pub fn with_content_editable(mut self, editable: bool) -> Self {
        self.content_editable = editable;
        self
    }

    pub fn with_rich_text(mut self, within: bool) -> Self {
        self.within_rich_text = within;
        self
    }

    /// Keys from text-entry widgets belong to the widget, not the list.
    pub fn accepts_text(&self) -> bool {
        self.content_editable
            || self.within_rich_text
            || matches!(
                self.element,
                ElementKind::Input | ElementKind::Textarea | ElementKind::Select
            )
    }
}

/// Translates key presses into block-editor calls.
#[derive(Debug, Clone)]
pub struct KeyboardController {
    keymap: Arc<Keymap>,
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::new(Keymap::shared_default())
    }
}

impl KeyboardController {
    pub fn new(keymap: Arc<Keymap>) -> Self {
        Self { keymap }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn handle<R: BlockRows + ?Sized>(
        &self,
        editor: &mut BlockEditor,
        rows: &mut R,
        key: &KeyEvent,
        origin: &KeyOrigin,
    ) -> Option<BlockChange> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if origin.accepts_text() {
            trace!(code = ?key.code, "key left to text widget");
            return None;
        }
        let action = self.keymap.classify(key)?;
        trace!(?action, "key classified");
        match action {
            EditorAction::SelectStep(delta) => editor.select_step(rows, delta),
            EditorAction::ClearSelection => editor.clear_selection(),
            EditorAction::RemoveSelected => {
                let selected = editor.selected_index()?;
                if !editor.can_remove_block(rows.row_count()) {
                    return None;
                }
                editor.remove_block(rows, selected)
            }
            EditorAction::ToggleCollapse => {
                let selected = editor.selected_index()?;
                editor.toggle_block_collapse(selected)
            }
            EditorAction::MoveSelected(delta) => {
                if editor.is_disabled() {
                    return None;
                }
                let selected = editor.selected_index()?;
                let target = selected.checked_add_signed(delta)?;
                editor.move_block(rows, selected, target)
            }
            EditorAction::DuplicateSelected => {
                let selected = editor.selected_index()?;
                if !editor.can_add_block(rows.row_count()) {
                    return None;
                }
                editor.duplicate_block(rows, selected)
            }
        }
    }
}
