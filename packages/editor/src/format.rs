//! # Auto-Format
//!
//! Whitespace and punctuation normalization for one text run, in order:
//!
//! 1. collapse runs of ASCII spaces
//! 2. trim every line
//! 3. language punctuation:
//!    - `zh`: ASCII `, . ? ! : ;` next to an ideograph become full-width,
//!      any whitespace around full-width punctuation is removed (line breaks
//!      included), dot runs become `……`
//!    - otherwise: full-width punctuation becomes ASCII plus a space
//! 4. collapse repeated terminal punctuation
//! 5. uppercase the first ASCII letter of every sentence and line
//!
//! The passes are repeated until the text stops changing, so formatting
//! formatted text is a no-op.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;

/// Upper bound on pipeline repetitions; each pass only shrinks the text or
/// replaces characters monotonically, so this is never reached in practice
const MAX_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    /// `zh` formats as Chinese, every other code as English
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("zh") {
            Language::Zh
        } else {
            Language::En
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("valid space regex"));
static SPACE_BEFORE_CJK_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([，。？！：；、])").expect("valid punctuation regex"));
static SPACE_AFTER_CJK_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([，。？！：；、])\s+").expect("valid punctuation regex"));
static DOT_ELLIPSIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{3,}|。{2,}").expect("valid ellipsis regex"));
static LONG_DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{4,}").expect("valid dots regex"));
static REPEATED_TERMINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"，{2,}|。{2,}|？{2,}|！{2,}|,{2,}|\?{2,}|!{2,}").expect("valid terminal regex")
});

/// Format one text run
pub fn format_text(text: &str, language: Language) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_PASSES {
        let next = format_once(&current, language);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn format_once(text: &str, language: Language) -> String {
    let collapsed = SPACES.replace_all(text, " ");
    let mut result = trim_lines(&collapsed);

    result = match language {
        Language::Zh => {
            let converted = to_full_width(&result);
            let stripped = SPACE_BEFORE_CJK_PUNCT.replace_all(&converted, "$1");
            let stripped = SPACE_AFTER_CJK_PUNCT.replace_all(&stripped, "$1");
            DOT_ELLIPSIS.replace_all(&stripped, "……").into_owned()
        }
        Language::En => {
            let converted = to_ascii_punctuation(&result);
            let collapsed = SPACES.replace_all(&converted, " ");
            trim_lines(&collapsed)
        }
    };

    let result = LONG_DOTS.replace_all(&result, "...");
    let result = collapse_terminal(&result);
    capitalize_sentences(&result)
}

fn trim_lines(text: &str) -> String {
    text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n")
}

fn collapse_terminal(text: &str) -> Cow<'_, str> {
    REPEATED_TERMINAL.replace_all(text, |caps: &regex::Captures| {
        caps[0].chars().next().map(String::from).unwrap_or_default()
    })
}

fn is_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

fn full_width(c: char) -> Option<char> {
    match c {
        ',' => Some('，'),
        '.' => Some('。'),
        '?' => Some('？'),
        '!' => Some('！'),
        ':' => Some('：'),
        ';' => Some('；'),
        _ => None,
    }
}

/// ASCII punctuation whose nearest non-whitespace neighbour is an ideograph
/// becomes full-width. Runs of three or more dots are left for the ellipsis
/// rule, and a dot converted because of the ideograph on its left must not
/// be followed by a digit.
fn to_full_width(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let Some(wide) = full_width(c) else {
            out.push(c);
            continue;
        };
        if c == '.' && dot_run_len(&chars, i) >= 3 {
            out.push(c);
            continue;
        }

        let left = chars[..i].iter().rev().find(|c| !c.is_whitespace());
        let right = chars[i + 1..].iter().find(|c| !c.is_whitespace());
        let right_ideograph = right.is_some_and(|&c| is_ideograph(c));
        let left_ideograph = left.is_some_and(|&c| is_ideograph(c));
        let before_digit = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());

        let convert = right_ideograph || (left_ideograph && !(c == '.' && before_digit));
        out.push(if convert { wide } else { c });
    }
    out
}

fn dot_run_len(chars: &[char], i: usize) -> usize {
    let before = chars[..i].iter().rev().take_while(|&&c| c == '.').count();
    let after = chars[i..].iter().take_while(|&&c| c == '.').count();
    before + after
}

fn to_ascii_punctuation(text: &str) -> String {
    text.replace('，', ", ")
        .replace('。', ". ")
        .replace("……", "...")
        .replace('？', "? ")
        .replace('！', "! ")
        .replace('：', ": ")
        .replace('；', "; ")
}

/// Uppercase `a-z` at the start of the text, of a line, or after sentence
/// punctuation plus optional whitespace
fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut sentence_start = true;
    for c in text.chars() {
        if sentence_start && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
            sentence_start = false;
            continue;
        }
        out.push(c);
        if matches!(c, '.' | '?' | '!' | '。' | '？' | '！' | '\n') {
            sentence_start = true;
        } else if !c.is_whitespace() {
            sentence_start = false;
        }
    }
    out
}
