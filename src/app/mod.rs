mod input;
mod keymap;
mod options;

pub use input::{EditorAction, ElementKind, KeyOrigin, KeyboardController};
pub use keymap::{ComboError, KeyCombo, Keymap, KeymapError};
pub use options::EditorOptions;
