use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;
use thiserror::Error;

use super::input::EditorAction;

macro_rules! keymap_source {
    () => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/keymap/default.keymap.json"
        ))
    };
}

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("malformed keymap: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("keymap entry {id} must declare combos")]
    MissingCombos { id: String },
    #[error("failed to parse combo '{combo}' for {id}: {reason}")]
    InvalidCombo {
        id: String,
        combo: String,
        reason: ComboError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    #[error("combo has no key")]
    MissingKey,
    #[error("unsupported modifier '{0}'")]
    Modifier(String),
    #[error("unsupported key '{0}'")]
    Key(String),
}

#[derive(Deserialize)]
struct RawEntry {
    id: String,
    description: String,
    action: RawAction,
    combos: Vec<String>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum RawAction {
    SelectStep { delta: isize },
    ClearSelection,
    RemoveSelected,
    ToggleCollapse,
    MoveSelected { delta: isize },
    DuplicateSelected,
}

impl RawAction {
    fn into_action(self) -> EditorAction {
        match self {
            RawAction::SelectStep { delta } => EditorAction::SelectStep(delta),
            RawAction::ClearSelection => EditorAction::ClearSelection,
            RawAction::RemoveSelected => EditorAction::RemoveSelected,
            RawAction::ToggleCollapse => EditorAction::ToggleCollapse,
            RawAction::MoveSelected { delta } => EditorAction::MoveSelected(delta),
            RawAction::DuplicateSelected => EditorAction::DuplicateSelected,
        }
    }
}

/// Named keys a combo may end with; anything else must be a single character.
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("Up", KeyCode::Up),
    ("Down", KeyCode::Down),
    ("Left", KeyCode::Left),
    ("Right", KeyCode::Right),
    ("Home", KeyCode::Home),
    ("End", KeyCode::End),
    ("Esc", KeyCode::Esc),
    ("Enter", KeyCode::Enter),
    ("Tab", KeyCode::Tab),
    ("Delete", KeyCode::Delete),
    ("Backspace", KeyCode::Backspace),
    ("Space", KeyCode::Char(' ')),
];

const KEY_ALIASES: &[(&str, &str)] = &[("escape", "Esc"), ("del", "Delete")];

/// A key plus the modifiers it needs, written `Ctrl+Down`, `Shift+Tab` or `d`.
/// Letters are stored lowercase and tolerate an extra Shift when matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCombo {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyCombo {
    pub fn code(&self) -> KeyCode {
        self.code
    }

    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    /// The press this combo describes.
    pub fn to_event(&self) -> KeyEvent {
        KeyEvent::new(self.code, self.modifiers)
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        if !key.modifiers.contains(self.modifiers) {
            return false;
        }
        let extra = key.modifiers.difference(self.modifiers);
        match (self.code, key.code) {
            (KeyCode::Char(expected), KeyCode::Char(actual)) if expected.is_ascii_alphabetic() => {
                actual.to_ascii_lowercase() == expected
                    && extra.difference(KeyModifiers::SHIFT).is_empty()
            }
            (expected, actual) => expected == actual && extra.is_empty(),
        }
    }
}

impl FromStr for KeyCombo {
    type Err = ComboError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut tokens: Vec<&str> = raw.split('+').map(str::trim).collect();
        let key = tokens
            .pop()
            .filter(|key| !key.is_empty())
            .ok_or(ComboError::MissingKey)?;
        let mut modifiers = KeyModifiers::NONE;
        for token in tokens {
            modifiers |= match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "shift" => KeyModifiers::SHIFT,
                "alt" => KeyModifiers::ALT,
                _ => return Err(ComboError::Modifier(token.to_string())),
            };
        }
        Ok(Self {
            code: key_code(key)?,
            modifiers,
        })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, label) in [
            (KeyModifiers::CONTROL, "Ctrl+"),
            (KeyModifiers::ALT, "Alt+"),
            (KeyModifiers::SHIFT, "Shift+"),
        ] {
            if self.modifiers.contains(flag) {
                f.write_str(label)?;
            }
        }
        match NAMED_KEYS.iter().find(|(_, code)| *code == self.code) {
            Some((name, _)) => f.write_str(name),
            None => match self.code {
                KeyCode::Char(ch) => write!(f, "{}", ch.to_ascii_uppercase()),
                other => write!(f, "{other:?}"),
            },
        }
    }
}

fn key_code(token: &str) -> Result<KeyCode, ComboError> {
    let lowered = token.to_ascii_lowercase();
    let name = KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map_or(lowered.as_str(), |(_, name)| *name);
    if let Some((_, code)) = NAMED_KEYS
        .iter()
        .find(|(named, _)| named.eq_ignore_ascii_case(name))
    {
        return Ok(*code);
    }
    let mut chars = lowered.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(KeyCode::Char(ch)),
        _ => Err(ComboError::Key(token.to_string())),
    }
}

#[derive(Debug, Clone)]
struct KeyBinding {
    id: String,
    action: EditorAction,
    combos: Vec<KeyCombo>,
    snippet: String,
}

impl KeyBinding {
    fn from_raw(raw: RawEntry) -> Result<Self, KeymapError> {
        let combos = raw
            .combos
            .iter()
            .map(|combo| {
                combo.parse::<KeyCombo>().map_err(|reason| KeymapError::InvalidCombo {
                    id: raw.id.clone(),
                    combo: combo.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if combos.is_empty() {
            return Err(KeymapError::MissingCombos { id: raw.id });
        }
        let keys = combos
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/");
        Ok(Self {
            snippet: format!("{keys} -> {}", raw.description),
            id: raw.id,
            action: raw.action.into_action(),
            combos,
        })
    }

    fn matches(&self, key: &KeyEvent) -> Option<EditorAction> {
        self.combos
            .iter()
            .any(|combo| combo.matches(key))
            .then_some(self.action)
    }
}

/// Ordered key bindings; the first matching entry wins.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

static DEFAULT_KEYMAP: LazyLock<Arc<Keymap>> = LazyLock::new(|| {
    Arc::new(Keymap::from_json(keymap_source!()).expect("invalid keymap/default.keymap.json"))
});

impl Keymap {
    pub fn from_json(source: &str) -> Result<Self, KeymapError> {
        let raw_entries: Vec<RawEntry> = serde_json::from_str(source)?;
        let bindings = raw_entries
            .into_iter()
            .map(KeyBinding::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bindings })
    }

    /// The bindings shipped in `keymap/default.keymap.json`.
    pub fn shared_default() -> Arc<Keymap> {
        Arc::clone(&DEFAULT_KEYMAP)
    }

    pub fn classify(&self, key: &KeyEvent) -> Option<EditorAction> {
        self.bindings.iter().find_map(|binding| binding.matches(key))
    }

    pub fn binding_ids(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.id.as_str())
    }

    pub fn help_text(&self) -> String {
        self.bindings
            .iter()
            .map(|binding| binding.snippet.as_str())
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn default_keymap_covers_navigation_and_removal() {
        let keymap = Keymap::shared_default();
        assert_eq!(
            keymap.classify(&press(KeyCode::Up, KeyModifiers::NONE)),
            Some(EditorAction::SelectStep(-1))
        );
        assert_eq!(
            keymap.classify(&press(KeyCode::Down, KeyModifiers::NONE)),
            Some(EditorAction::SelectStep(1))
        );
        assert_eq!(
            keymap.classify(&press(KeyCode::Esc, KeyModifiers::NONE)),
            Some(EditorAction::ClearSelection)
        );
        assert_eq!(
            keymap.classify(&press(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(EditorAction::RemoveSelected)
        );
        assert_eq!(
            keymap.classify(&press(KeyCode::Delete, KeyModifiers::NONE)),
            Some(EditorAction::RemoveSelected)
        );
        assert_eq!(keymap.classify(&press(KeyCode::Enter, KeyModifiers::NONE)), None);
        assert_eq!(keymap.classify(&press(KeyCode::Up, KeyModifiers::CONTROL)), None);
    }

    #[test]
    fn custom_keymap_with_modifiers() {
        let keymap = Keymap::from_json(
            r#"[{"id": "move", "description": "Move down", "action": {"kind": "moveSelected", "delta": 1}, "combos": ["Ctrl+Down"]},
                {"id": "dup", "description": "Duplicate", "action": {"kind": "duplicateSelected"}, "combos": ["Ctrl+D"]}]"#,
        )
        .expect("keymap parsed");
        assert_eq!(
            keymap.classify(&press(KeyCode::Down, KeyModifiers::CONTROL)),
            Some(EditorAction::MoveSelected(1))
        );
        assert_eq!(
            keymap.classify(&press(KeyCode::Char('D'), KeyModifiers::CONTROL | KeyModifiers::SHIFT)),
            Some(EditorAction::DuplicateSelected)
        );
        assert_eq!(keymap.classify(&press(KeyCode::Down, KeyModifiers::NONE)), None);
        assert_eq!(keymap.help_text(), "Ctrl+Down -> Move down • Ctrl+D -> Duplicate");
    }

    #[test]
    fn combos_parse_and_print_canonically() {
        let combo: KeyCombo = "control + d".parse().expect("combo parsed");
        assert_eq!(combo.to_event(), press(KeyCode::Char('d'), KeyModifiers::CONTROL));
        assert_eq!(combo.to_string(), "Ctrl+D");
        let escape: KeyCombo = "escape".parse().expect("combo parsed");
        assert_eq!(escape.code(), KeyCode::Esc);
        assert_eq!(escape.to_string(), "Esc");
        assert_eq!("Shift+Tab".parse::<KeyCombo>().map(|c| c.modifiers()), Ok(KeyModifiers::SHIFT));
        assert_eq!("Ctrl+".parse::<KeyCombo>(), Err(ComboError::MissingKey));
        assert_eq!("Hyper+Up".parse::<KeyCombo>(), Err(ComboError::Modifier("Hyper".into())));
        assert_eq!("PageUp".parse::<KeyCombo>(), Err(ComboError::Key("PageUp".into())));
    }

    #[test]
    fn extra_shift_only_tolerated_on_letters() {
        let letter: KeyCombo = "d".parse().expect("combo parsed");
        assert!(letter.matches(&press(KeyCode::Char('D'), KeyModifiers::SHIFT)));
        assert!(!letter.matches(&press(KeyCode::Char('d'), KeyModifiers::CONTROL)));
        let space: KeyCombo = "Space".parse().expect("combo parsed");
        assert!(space.matches(&press(KeyCode::Char(' '), KeyModifiers::NONE)));
        assert!(!space.matches(&press(KeyCode::Char(' '), KeyModifiers::SHIFT)));
    }

    #[test]
    fn rejects_bad_combos() {
        let err = Keymap::from_json(
            r#"[{"id": "x", "description": "x", "action": {"kind": "clearSelection"}, "combos": ["Hyper+Up"]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, KeymapError::InvalidCombo { .. }), "{err}");
        let err = Keymap::from_json(
            r#"[{"id": "x", "description": "x", "action": {"kind": "clearSelection"}, "combos": []}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, KeymapError::MissingCombos { .. }));
    }
}
