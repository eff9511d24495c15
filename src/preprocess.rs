//! Regex text cleanup applied to one text field of a record before the core sees it.

use crate::record::{Comment, Record};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();
static NON_WORD: OnceLock<Regex> = OnceLock::new();
static DIGITS: OnceLock<Regex> = OnceLock::new();

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Trim both ends and collapse internal whitespace runs to one space.
pub fn collapse_whitespace(s: &str) -> String {
    cached(&WHITESPACE, r"\s+").replace_all(s.trim(), " ").into_owned()
}

/// Replace runs of non-word characters with a space.
pub fn keep_alnum(s: &str) -> String {
    cached(&NON_WORD, r"\W+").replace_all(s, " ").into_owned()
}

pub fn strip_digits(s: &str) -> String {
    cached(&DIGITS, r"\d+").replace_all(s, " ").into_owned()
}

/// Length of a text field: characters of a string, elements of a token array.
pub fn text_length(record: &Record, field: &str) -> usize {
    match record.get(field) {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

/// Which cleanup steps to run. Steps apply in field order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preprocess {
    pub strip_specials: bool,
    pub strip_digits: bool,
    pub trim_whitespace: bool,
    pub to_lower: bool,
    /// Split on whitespace into a JSON array of tokens.
    pub tokenize: bool,
}

impl Preprocess {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_str(&self, s: &str) -> Value {
        let mut text = s.to_string();
        if self.strip_specials {
            text = keep_alnum(&text);
        }
        if self.strip_digits {
            text = strip_digits(&text);
        }
        if self.trim_whitespace {
            text = collapse_whitespace(&text);
        }
        if self.to_lower {
            text = text.to_lowercase();
        }
        if self.tokenize {
            Value::Array(text.split_whitespace().map(|t| Value::String(t.to_string())).collect())
        } else {
            Value::String(text)
        }
    }

    /// Rewrite `field` of `record`; non-string values pass through untouched.
    pub fn apply(&self, record: Record, field: &str) -> Record {
        if self.is_noop() {
            return record;
        }
        record.map_field(field, |v| match v {
            Value::String(s) => self.apply_str(&s),
            other => other,
        })
    }

    pub fn apply_comment(&self, comment: Comment, field: &str) -> Comment {
        comment.map_record(|r| self.apply(r, field))
    }
}
