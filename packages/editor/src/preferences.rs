//! Editor preferences, persisted as camelCase JSON.
//!
//! Every field has its own default, so a partial or older preferences file
//! still loads.

use crate::composer::{DEFAULT_CANDIDATE_LIMIT, DEFAULT_TRIGGER};
use crate::format::Language;
use crate::history::HistoryConfig;
use crate::shortcuts::ShortcutMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Edits closer together than this merge into one undo step
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Auto-format language code; `zh` or anything else for English rules
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_word_count_delay_ms")]
    pub word_count_delay_ms: u64,

    /// Character that opens reference completion
    #[serde(default = "default_trigger")]
    pub trigger: char,

    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    #[serde(default)]
    pub shortcuts: ShortcutMap,
}

fn default_debounce_ms() -> u64 {
    800
}

fn default_max_history() -> usize {
    100
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_word_count_delay_ms() -> u64 {
    1500
}

fn default_trigger() -> char {
    DEFAULT_TRIGGER
}

fn default_candidate_limit() -> usize {
    DEFAULT_CANDIDATE_LIMIT
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_history: default_max_history(),
            language: default_language(),
            word_count_delay_ms: default_word_count_delay_ms(),
            trigger: default_trigger(),
            candidate_limit: default_candidate_limit(),
            shortcuts: ShortcutMap::default(),
        }
    }
}

impl EditorConfig {
    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            max_history: self.max_history,
        }
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language)
    }

    pub fn word_count_delay(&self) -> Duration {
        Duration::from_millis(self.word_count_delay_ms)
    }
}
