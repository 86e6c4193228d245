use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::domain::{BlockCatalogue, FieldDefinition, FieldKind};

use super::defaults::BlockItem;
use super::node::NodeAccess;
use super::tree::ArrayNode;

/// Positional storage a [`BlockEditor`] can mutate. Callers guarantee that
/// indices are in range; the editor checks before delegating.
pub trait BlockRows {
    fn row_count(&self) -> usize;
    fn insert_block(&mut self, index: usize, item: BlockItem);
    fn remove_row(&mut self, index: usize);
    /// Removes the row at `from` and reinserts it at `to`.
    fn move_row(&mut self, from: usize, to: usize);
    /// Inserts a copy of `index` right after it.
    fn duplicate_row(&mut self, index: usize);
}

impl BlockRows for Vec<Value> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn insert_block(&mut self, index: usize, item: BlockItem) {
        self.insert(index, item.into_value());
    }

    fn remove_row(&mut self, index: usize) {
        self.remove(index);
    }

    fn move_row(&mut self, from: usize, to: usize) {
        let row = self.remove(from);
        self.insert(to, row);
    }

    fn duplicate_row(&mut self, index: usize) {
        let copy = self[index].clone();
        self.insert(index + 1, copy);
    }
}

impl BlockRows for Vec<BlockItem> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn insert_block(&mut self, index: usize, item: BlockItem) {
        self.insert(index, item);
    }

    fn remove_row(&mut self, index: usize) {
        self.remove(index);
    }

    fn move_row(&mut self, from: usize, to: usize) {
        let row = self.remove(from);
        self.insert(to, row);
    }

    fn duplicate_row(&mut self, index: usize) {
        let copy = self[index].clone();
        self.insert(index + 1, copy);
    }
}

impl BlockRows for ArrayNode {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn insert_block(&mut self, index: usize, item: BlockItem) {
        self.insert_item(index, &item.into_value());
    }

    fn remove_row(&mut self, index: usize) {
        self.remove_item(index);
    }

    fn move_row(&mut self, from: usize, to: usize) {
        self.move_item(from, to);
    }

    fn duplicate_row(&mut self, index: usize) {
        if let Some(value) = self.item(index).map(|item| item.value()) {
            self.insert_item(index + 1, &value);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub selected_index: Option<usize>,
    pub hovered_index: Option<usize>,
    pub collapsed: BTreeSet<usize>,
}

/// What a successful editor call changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockChange {
    Added { index: usize, block_type: String },
    Removed { index: usize },
    Moved { from: usize, to: usize },
    Duplicated { source: usize, index: usize },
    CollapseToggled { index: usize, collapsed: bool },
    CollapseAll { collapsed: bool },
    Selected { index: Option<usize> },
    Hovered { index: Option<usize> },
}

impl BlockChange {
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BlockChange::Added { .. }
                | BlockChange::Removed { .. }
                | BlockChange::Moved { .. }
                | BlockChange::Duplicated { .. }
        )
    }
}

/// Structural editor for one blocks collection. Keeps the rows, the
/// selection cursor and the collapsed set consistent within every call.
#[derive(Debug, Clone)]
pub struct BlockEditor {
    catalogue: Arc<BlockCatalogue>,
    disabled: bool,
    min_rows: usize,
    max_rows: Option<usize>,
    state: EditorState,
}

impl BlockEditor {
    pub fn new(catalogue: Arc<BlockCatalogue>) -> Self {
        Self {
            catalogue,
            disabled: false,
            min_rows: 0,
            max_rows: None,
            state: EditorState::default(),
        }
    }

    /// Editor configured from a blocks field; `None` for any other kind.
    pub fn for_field(def: &FieldDefinition) -> Option<Self> {
        let FieldKind::Blocks { blocks, .. } = &def.kind else {
            return None;
        };
        let catalogue = Arc::new(BlockCatalogue::new(blocks.iter().cloned()));
        Some(
            Self::new(catalogue)
                .with_min_rows(def.min_rows())
                .with_max_rows(def.max_rows())
                .with_disabled(def.admin.read_only),
        )
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn catalogue(&self) -> &BlockCatalogue {
        &self.catalogue
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.selected_index
    }

    pub fn is_collapsed(&self, index: usize) -> bool {
        self.state.collapsed.contains(&index)
    }

    pub fn can_remove_block(&self, count: usize) -> bool {
        !self.disabled && count > self.min_rows
    }

    /// Capacity hint for presentation; `add_block` never consults it.
    pub fn can_add_block(&self, count: usize) -> bool {
        !self.disabled && self.max_rows.is_none_or(|max| count < max)
    }

    pub fn add_block<R: BlockRows + ?Sized>(
        &mut self,
        rows: &mut R,
        block_type: &str,
        at_index: usize,
    ) -> Option<BlockChange> {
        let Some(definition) = self.catalogue.get(block_type) else {
            trace!(block_type, "add ignored: unknown block type");
            return None;
        };
        let len = rows.row_count();
        if at_index > len {
            trace!(at_index, len, "add ignored: index out of range");
            return None;
        }
        rows.insert_block(at_index, BlockItem::from_definition(definition));
        self.shift_collapsed_up(at_index);
        self.state.selected_index = Some(at_index);
        self.state.hovered_index = None;
        debug!(block_type, at_index, "block added");
        Some(BlockChange::Added {
            index: at_index,
            block_type: block_type.to_string(),
        })
    }

    pub fn remove_block<R: BlockRows + ?Sized>(
        &mut self,
        rows: &mut R,
        index: usize,
    ) -> Option<BlockChange> {
        let len = rows.row_count();
        if index >= len {
            trace!(index, len, "remove ignored: index out of range");
            return None;
        }
        rows.remove_row(index);
        let new_len = len - 1;
        self.state.collapsed = std::mem::take(&mut self.state.collapsed)
            .into_iter()
            .filter(|&flag| flag != index)
            .map(|flag| if flag > index { flag - 1 } else { flag })
            .collect();
        self.state.selected_index = match self.state.selected_index {
            Some(selected) if selected == index => {
                (new_len > 0).then(|| index.min(new_len - 1))
            }
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        self.state.hovered_index = None;
        debug!(index, remaining = new_len, "block removed");
        Some(BlockChange::Removed { index })
    }

    /// Rotation move. Only the collapse flags of the two endpoints trade
    /// places; rows in between keep theirs.
    pub fn move_block<R: BlockRows + ?Sized>(
        &mut self,
        rows: &mut R,
        from: usize,
        to: usize,
    ) -> Option<BlockChange> {
        let len = rows.row_count();
        if from >= len || to >= len {
            trace!(from, to, len, "move ignored: index out of range");
            return None;
        }
        if from == to {
            return self.select_block(rows, Some(to));
        }
        rows.move_row(from, to);
        let from_collapsed = self.state.collapsed.contains(&from);
        let to_collapsed = self.state.collapsed.contains(&to);
        self.set_flag(from, to_collapsed);
        self.set_flag(to, from_collapsed);
        self.state.selected_index = Some(to);
        self.state.hovered_index = None;
        debug!(from, to, "block moved");
        Some(BlockChange::Moved { from, to })
    }

    /// Drop handler of a drag gesture. Negative indices come from drops
    /// outside the list and are ignored.
    pub fn on_drop<R: BlockRows + ?Sized>(
        &mut self,
        rows: &mut R,
        previous: isize,
        current: isize,
    ) -> Option<BlockChange> {
        let (Ok(from), Ok(to)) = (usize::try_from(previous), usize::try_from(current)) else {
            trace!(previous, current, "drop ignored: negative index");
            return None;
        };
        self.move_block(rows, from, to)
    }

    pub fn duplicate_block<R: BlockRows + ?Sized>(
        &mut self,
        rows: &mut R,
        index: usize,
    ) -> Option<BlockChange> {
        let len = rows.row_count();
        if index >= len {
            trace!(index, len, "duplicate ignored: index out of range");
            return None;
        }
        let target = index + 1;
        let source_collapsed = self.is_collapsed(index);
        rows.duplicate_row(index);
        self.shift_collapsed_up(target);
        self.set_flag(target, source_collapsed);
        self.state.selected_index = Some(target);
        self.state.hovered_index = None;
        debug!(index, target, "block duplicated");
        Some(BlockChange::Duplicated {
            source: index,
            index: target,
        })
    }

    /// Flips the flag of `index` whether or not such a row exists.
    pub fn toggle_block_collapse(&mut self, index: usize) -> Option<BlockChange> {
        let collapsed = !self.state.collapsed.remove(&index);
        if collapsed {
            self.state.collapsed.insert(index);
        }
        debug!(index, collapsed, "block collapse toggled");
        Some(BlockChange::CollapseToggled { index, collapsed })
    }

    pub fn set_all_collapsed<R: BlockRows + ?Sized>(
        &mut self,
        rows: &R,
        collapsed: bool,
    ) -> Option<BlockChange> {
        let next: BTreeSet<usize> = if collapsed {
            (0..rows.row_count()).collect()
        } else {
            BTreeSet::new()
        };
        if next == self.state.collapsed {
            return None;
        }
        self.state.collapsed = next;
        debug!(collapsed, "collapse state set for all blocks");
        Some(BlockChange::CollapseAll { collapsed })
    }

    pub fn select_block<R: BlockRows + ?Sized>(
        &mut self,
        rows: &R,
        index: Option<usize>,
    ) -> Option<BlockChange> {
        if index.is_some_and(|index| index >= rows.row_count()) {
            return None;
        }
        if self.state.selected_index == index {
            return None;
        }
        self.state.selected_index = index;
        trace!(?index, "block selected");
        Some(BlockChange::Selected { index })
    }

    /// Moves the cursor by `delta`. Nothing happens without a current
    /// selection or when the target falls outside the rows.
    pub fn select_step<R: BlockRows + ?Sized>(
        &mut self,
        rows: &R,
        delta: isize,
    ) -> Option<BlockChange> {
        let selected = self.state.selected_index?;
        let target = selected.checked_add_signed(delta)?;
        if target >= rows.row_count() {
            return None;
        }
        self.select_block(rows, Some(target))
    }

    pub fn clear_selection(&mut self) -> Option<BlockChange> {
        self.state.selected_index.take()?;
        Some(BlockChange::Selected { index: None })
    }

    pub fn set_hovered(&mut self, index: Option<usize>) -> Option<BlockChange> {
        if self.state.hovered_index == index {
            return None;
        }
        self.state.hovered_index = index;
        Some(BlockChange::Hovered { index })
    }

    /// Drops state that points past `row_count`, used after the rows were
    /// replaced from outside the editor.
    pub fn reconcile(&mut self, row_count: usize) {
        self.state.collapsed.retain(|&index| index < row_count);
        if self
            .state
            .selected_index
            .is_some_and(|index| index >= row_count)
        {
            self.state.selected_index = row_count.checked_sub(1);
        }
        if self
            .state
            .hovered_index
            .is_some_and(|index| index >= row_count)
        {
            self.state.hovered_index = None;
        }
    }

    fn shift_collapsed_up(&mut self, from: usize) {
        self.state.collapsed = std::mem::take(&mut self.state.collapsed)
            .into_iter()
            .map(|flag| if flag >= from { flag + 1 } else { flag })
            .collect();
    }

    fn set_flag(&mut self, index: usize, collapsed: bool) {
        if collapsed {
            self.state.collapsed.insert(index);
        } else {
            self.state.collapsed.remove(&index);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::BlockDefinition;

    fn editor() -> BlockEditor {
        let blocks: Vec<BlockDefinition> = serde_json::from_value(json!([
            {"slug": "hero", "fields": [
                {"name": "heading", "type": "text"},
                {"name": "subheading", "type": "text"}
            ]},
            {"slug": "quote", "fields": [{"name": "cite", "type": "relationship", "relationTo": "people"}]}
        ]))
        .expect("blocks parsed");
        BlockEditor::new(Arc::new(BlockCatalogue::new(blocks)))
    }

    fn rows(tags: &[&str]) -> Vec<Value> {
        tags.iter()
            .map(|tag| json!({"blockType": "hero", "heading": tag}))
            .collect()
    }

    fn headings(rows: &[Value]) -> Vec<&str> {
        rows.iter()
            .map(|row| row["heading"].as_str().unwrap_or_default())
            .collect()
    }

    #[test]
    fn removing_the_only_block_clears_selection() {
        let mut editor = editor();
        let mut blocks = rows(&["A"]);
        editor.select_block(&blocks, Some(0));
        assert!(editor.remove_block(&mut blocks, 0).is_some());
        assert!(blocks.is_empty());
        assert_eq!(editor.selected_index(), None);
    }

    #[test]
    fn removing_shifts_collapse_flags_down() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B", "C"]);
        editor.toggle_block_collapse(2);
        editor.remove_block(&mut blocks, 0);
        assert_eq!(editor.state().collapsed, BTreeSet::from([1]));
        assert_eq!(headings(&blocks), ["B", "C"]);
    }

    #[test]
    fn adding_at_front_selects_the_new_block() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B"]);
        let change = editor.add_block(&mut blocks, "hero", 0);
        assert_eq!(
            change,
            Some(BlockChange::Added {
                index: 0,
                block_type: "hero".into()
            })
        );
        assert_eq!(
            blocks[0],
            json!({"blockType": "hero", "heading": "", "subheading": ""})
        );
        assert_eq!(headings(&blocks), ["", "A", "B"]);
        assert_eq!(editor.selected_index(), Some(0));
    }

    #[test]
    fn add_shifts_collapsed_indices_at_or_after_insert_point() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B", "C"]);
        editor.toggle_block_collapse(0);
        editor.toggle_block_collapse(1);
        editor.toggle_block_collapse(2);
        editor.add_block(&mut blocks, "quote", 1);
        assert_eq!(editor.state().collapsed, BTreeSet::from([0, 2, 3]));
        assert_eq!(blocks[1], json!({"blockType": "quote", "cite": null}));
    }

    #[test]
    fn add_rejects_unknown_types_and_out_of_range_indices() {
        let mut editor = editor();
        let mut blocks = rows(&["A"]);
        assert!(editor.add_block(&mut blocks, "missing", 0).is_none());
        assert!(editor.add_block(&mut blocks, "hero", 2).is_none());
        assert_eq!(blocks.len(), 1);
        assert_eq!(editor.state(), &EditorState::default());
        assert!(editor.add_block(&mut blocks, "hero", 1).is_some());
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn add_ignores_max_rows() {
        let mut editor = editor().with_max_rows(Some(1));
        let mut blocks = rows(&["A"]);
        assert!(!editor.can_add_block(blocks.len()));
        assert!(editor.add_block(&mut blocks, "hero", 1).is_some());
        assert_eq!(blocks.len(), 2);
    }

    fn selection_after_remove(selected: usize, removed: usize) -> Option<usize> {
        let mut blocks = rows(&["A", "B", "C"]);
        let mut editor = editor();
        editor.select_block(&blocks, Some(selected));
        editor.remove_block(&mut blocks, removed);
        editor.selected_index()
    }

    #[test]
    fn remove_selection_algebra() {
        assert_eq!(selection_after_remove(2, 2), Some(1));
        assert_eq!(selection_after_remove(1, 1), Some(1));
        assert_eq!(selection_after_remove(2, 0), Some(1));
        assert_eq!(selection_after_remove(0, 1), Some(0));
    }

    #[test]
    fn remove_out_of_range_is_a_no_op() {
        let mut editor = editor();
        let mut blocks = rows(&["A"]);
        assert!(editor.remove_block(&mut blocks, 1).is_none());
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn move_rotates_rows_and_swaps_only_endpoint_flags() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B", "C", "D"]);
        editor.toggle_block_collapse(0);
        editor.toggle_block_collapse(1);
        let change = editor.move_block(&mut blocks, 0, 3);
        assert_eq!(change, Some(BlockChange::Moved { from: 0, to: 3 }));
        assert_eq!(headings(&blocks), ["B", "C", "D", "A"]);
        // Row B now sits at 0 but index 1 keeps its flag.
        assert_eq!(editor.state().collapsed, BTreeSet::from([1, 3]));
        assert_eq!(editor.selected_index(), Some(3));
    }

    #[test]
    fn move_requires_both_indices_in_range() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B"]);
        assert!(editor.move_block(&mut blocks, 0, 2).is_none());
        assert!(editor.move_block(&mut blocks, 2, 0).is_none());
        assert_eq!(headings(&blocks), ["A", "B"]);
        assert_eq!(editor.selected_index(), None);
    }

    #[test]
    fn drop_rejects_negative_indices() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B"]);
        assert!(editor.on_drop(&mut blocks, -1, 0).is_none());
        assert!(editor.on_drop(&mut blocks, 0, -1).is_none());
        assert!(editor.on_drop(&mut blocks, 1, 0).is_some());
        assert_eq!(headings(&blocks), ["B", "A"]);
    }

    #[test]
    fn duplicate_inherits_collapse_flag() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B", "C"]);
        editor.toggle_block_collapse(1);
        editor.toggle_block_collapse(2);
        let change = editor.duplicate_block(&mut blocks, 1);
        assert_eq!(change, Some(BlockChange::Duplicated { source: 1, index: 2 }));
        assert_eq!(headings(&blocks), ["A", "B", "B", "C"]);
        assert_eq!(editor.state().collapsed, BTreeSet::from([1, 2, 3]));
        assert_eq!(editor.selected_index(), Some(2));
    }

    #[test]
    fn toggle_has_no_bounds_check() {
        let mut editor = editor();
        assert_eq!(
            editor.toggle_block_collapse(9),
            Some(BlockChange::CollapseToggled {
                index: 9,
                collapsed: true
            })
        );
        assert!(editor.is_collapsed(9));
        editor.toggle_block_collapse(9);
        assert!(!editor.is_collapsed(9));
    }

    #[test]
    fn collapse_all_and_show_all() {
        let mut editor = editor();
        let blocks = rows(&["A", "B"]);
        assert!(editor.set_all_collapsed(&blocks, true).is_some());
        assert_eq!(editor.state().collapsed, BTreeSet::from([0, 1]));
        assert!(editor.set_all_collapsed(&blocks, true).is_none());
        assert!(editor.set_all_collapsed(&blocks, false).is_some());
        assert!(editor.state().collapsed.is_empty());
    }

    #[test]
    fn select_step_stays_within_rows() {
        let mut editor = editor();
        let blocks = rows(&["A", "B"]);
        assert!(editor.select_step(&blocks, 1).is_none());
        editor.select_block(&blocks, Some(0));
        assert!(editor.select_step(&blocks, -1).is_none());
        assert!(editor.select_step(&blocks, 1).is_some());
        assert!(editor.select_step(&blocks, 1).is_none());
        assert_eq!(editor.selected_index(), Some(1));
        assert!(editor.select_block(&blocks, Some(5)).is_none());
    }

    #[test]
    fn structural_changes_clear_hover() {
        let mut editor = editor();
        let mut blocks = rows(&["A", "B"]);
        editor.set_hovered(Some(1));
        editor.move_block(&mut blocks, 1, 0);
        assert_eq!(editor.state().hovered_index, None);
    }

    #[test]
    fn remove_guard_honours_min_rows_and_disabled() {
        let editor = editor().with_min_rows(1);
        assert!(!editor.can_remove_block(1));
        assert!(editor.can_remove_block(2));
        let editor = editor.with_disabled(true);
        assert!(!editor.can_remove_block(5));
        assert!(!editor.can_add_block(0));
    }

    #[test]
    fn reconcile_drops_stale_indices() {
        let mut editor = editor();
        let blocks = rows(&["A", "B", "C"]);
        editor.select_block(&blocks, Some(2));
        editor.toggle_block_collapse(2);
        editor.toggle_block_collapse(0);
        editor.reconcile(1);
        assert_eq!(editor.selected_index(), Some(0));
        assert_eq!(editor.state().collapsed, BTreeSet::from([0]));
    }

    #[test]
    fn works_on_typed_block_items() {
        let mut editor = editor();
        let mut items: Vec<BlockItem> = Vec::new();
        editor.add_block(&mut items, "hero", 0);
        editor.duplicate_block(&mut items, 0);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].block_type, "hero");
    }
}
