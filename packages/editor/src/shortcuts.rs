//! Keyboard shortcuts: defaults plus user overrides.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    Undo,
    Redo,
    Save,
    Format,
    ToggleSidebar,
    CreateIdea,
}

impl ShortcutAction {
    /// Order in which bindings are tried against a key event
    pub const ALL: [ShortcutAction; 6] = [
        ShortcutAction::Save,
        ShortcutAction::Undo,
        ShortcutAction::Redo,
        ShortcutAction::Format,
        ShortcutAction::CreateIdea,
        ShortcutAction::ToggleSidebar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShortcutAction::Undo => "undo",
            ShortcutAction::Redo => "redo",
            ShortcutAction::Save => "save",
            ShortcutAction::Format => "format",
            ShortcutAction::ToggleSidebar => "toggle_sidebar",
            ShortcutAction::CreateIdea => "create_idea",
        }
    }
}

impl FromStr for ShortcutAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShortcutAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown shortcut action '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyBinding {
    pub fn ctrl(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: true,
            ..Default::default()
        }
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl and Cmd are interchangeable; the key compares case-insensitively
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.key.eq_ignore_ascii_case(&self.key)
            && self.ctrl == (event.ctrl || event.meta)
            && self.shift == event.shift
            && self.alt == event.alt
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.meta {
            parts.push("Cmd".to_string());
        }
        if self.alt {
            parts.push("Alt".to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        parts.push(self.key.to_uppercase());
        f.write_str(&parts.join("+"))
    }
}

/// Key press as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn ctrl(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: true,
            ..Default::default()
        }
    }

    pub fn plain(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }
}

/// Binding per action; `None` disables an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShortcutMap {
    bindings: BTreeMap<ShortcutAction, Option<KeyBinding>>,
}

impl Default for ShortcutMap {
    fn default() -> Self {
        let bindings = BTreeMap::from([
            (ShortcutAction::Undo, Some(KeyBinding::ctrl("z"))),
            (ShortcutAction::Redo, Some(KeyBinding::ctrl("y"))),
            (ShortcutAction::Save, Some(KeyBinding::ctrl("s"))),
            (ShortcutAction::Format, Some(KeyBinding::ctrl("l").with_alt())),
            (ShortcutAction::ToggleSidebar, Some(KeyBinding::ctrl("b"))),
            (ShortcutAction::CreateIdea, Some(KeyBinding::ctrl("i"))),
        ]);
        Self { bindings }
    }
}

impl ShortcutMap {
    /// Overrides win; actions they do not mention keep their defaults
    pub fn merged(mut self, overrides: BTreeMap<ShortcutAction, Option<KeyBinding>>) -> Self {
        self.bindings.extend(overrides);
        self
    }

    pub fn binding(&self, action: ShortcutAction) -> Option<&KeyBinding> {
        self.bindings.get(&action).and_then(Option::as_ref)
    }

    pub fn set(&mut self, action: ShortcutAction, binding: Option<KeyBinding>) {
        self.bindings.insert(action, binding);
    }

    pub fn is_match(&self, event: &KeyEvent, action: ShortcutAction) -> bool {
        self.binding(action).is_some_and(|binding| binding.matches(event))
    }

    /// First action bound to `event`
    pub fn action_for(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        ShortcutAction::ALL
            .into_iter()
            .find(|action| self.is_match(event, *action))
    }
}

impl<'de> Deserialize<'de> for ShortcutMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let saved = BTreeMap::<String, Option<KeyBinding>>::deserialize(deserializer)?;
        let overrides = saved
            .into_iter()
            .filter_map(|(name, binding)| match name.parse::<ShortcutAction>() {
                Ok(action) => Some((action, binding)),
                Err(err) => {
                    tracing::debug!(%err, "ignoring saved shortcut");
                    None
                }
            })
            .collect();
        Ok(ShortcutMap::default().merged(overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let map = ShortcutMap::default();
        assert_eq!(map.action_for(&KeyEvent::ctrl("z")), Some(ShortcutAction::Undo));
        assert_eq!(map.action_for(&KeyEvent::ctrl("Y")), Some(ShortcutAction::Redo));
        assert_eq!(map.action_for(&KeyEvent::plain("z")), None);

        let format = KeyEvent {
            alt: true,
            ..KeyEvent::ctrl("l")
        };
        assert_eq!(map.action_for(&format), Some(ShortcutAction::Format));
    }

    #[test]
    fn test_meta_counts_as_ctrl() {
        let map = ShortcutMap::default();
        let cmd_s = KeyEvent {
            meta: true,
            ..KeyEvent::plain("s")
        };
        assert_eq!(map.action_for(&cmd_s), Some(ShortcutAction::Save));
    }

    #[test]
    fn test_shift_must_match() {
        let map = ShortcutMap::default();
        let shifted = KeyEvent {
            shift: true,
            ..KeyEvent::ctrl("z")
        };
        assert_eq!(map.action_for(&shifted), None);
    }

    #[test]
    fn test_saved_overrides_merge_over_defaults() {
        let map: ShortcutMap = serde_json::from_str(
            r#"{
                "redo": {"key": "z", "ctrl": true, "shift": true},
                "create_idea": null,
                "enter_focus": {"key": "Enter"}
            }"#,
        )
        .unwrap();

        let redo = KeyEvent {
            shift: true,
            ..KeyEvent::ctrl("z")
        };
        assert_eq!(map.action_for(&redo), Some(ShortcutAction::Redo));
        assert_eq!(map.action_for(&KeyEvent::ctrl("i")), None);
        assert_eq!(map.action_for(&KeyEvent::ctrl("s")), Some(ShortcutAction::Save));
    }

    #[test]
    fn test_binding_display() {
        let binding = KeyBinding::ctrl("l").with_alt();
        assert_eq!(binding.to_string(), "Ctrl+Alt+L");
    }
}
