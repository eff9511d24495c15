//! Vocabulary encoder: stable first-seen indices for tokens plus occurrence counts.
//! Expects sentences that were already tokenized.

use crate::accumulate::Accumulator;
use crate::error::{Error, Result};
use crate::record::{Comment, Record};
use ahash::AHashMap;
use serde_json::Value;

/// Sort key for vocabulary listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VocabOrder {
    #[default]
    Index,
    Count,
    Token,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabEntry {
    pub token: String,
    pub index: usize,
    pub count: u64,
}

#[derive(Clone, Debug)]
pub struct Vocabulary {
    w2i: AHashMap<String, usize>,
    i2w: Vec<String>,
    i2count: Vec<u64>,
    field: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::for_field("body")
    }

    /// As an accumulator, read tokens from `field` (a JSON array of strings).
    pub fn for_field(field: impl Into<String>) -> Self {
        Self { w2i: AHashMap::new(), i2w: Vec::new(), i2count: Vec::new(), field: field.into() }
    }

    /// Register unseen tokens, bump counts for every token, and return the indices.
    pub fn encode<S: AsRef<str>>(&mut self, sentence: &[S]) -> Vec<usize> {
        sentence.iter().map(|w| self.register(w.as_ref())).collect()
    }

    fn register(&mut self, word: &str) -> usize {
        let index = match self.w2i.get(word) {
            Some(&i) => i,
            None => {
                let i = self.i2w.len();
                self.i2w.push(word.to_string());
                self.w2i.insert(word.to_string(), i);
                self.i2count.push(0);
                i
            }
        };
        self.i2count[index] += 1;
        index
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.i2w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2w.is_empty()
    }

    /// Sum of all occurrence counts.
    pub fn total_count(&self) -> u64 {
        self.i2count.iter().sum()
    }

    pub fn tokens(&self) -> &[String] {
        &self.i2w
    }

    pub fn index(&self, token: &str) -> Result<usize> {
        self.w2i.get(token).copied().ok_or_else(|| Error::UnknownToken(token.to_string()))
    }

    pub fn token(&self, index: usize) -> Result<&str> {
        self.i2w.get(index).map(String::as_str).ok_or(Error::UnknownIndex(index))
    }

    pub fn count_index(&self, index: usize) -> Result<u64> {
        self.i2count.get(index).copied().ok_or(Error::UnknownIndex(index))
    }

    pub fn count_token(&self, token: &str) -> Result<u64> {
        self.count_index(self.index(token)?)
    }

    pub fn listing(&self, order: VocabOrder, reverse: bool) -> Vec<VocabEntry> {
        let mut entries: Vec<VocabEntry> = self
            .i2w
            .iter()
            .zip(&self.i2count)
            .enumerate()
            .map(|(index, (token, &count))| VocabEntry { token: token.clone(), index, count })
            .collect();
        match order {
            VocabOrder::Index => {}
            // Stable sort: equal counts keep index order.
            VocabOrder::Count => entries.sort_by_key(|e| e.count),
            VocabOrder::Token => entries.sort_by(|a, b| a.token.cmp(&b.token)),
        }
        if reverse {
            entries.reverse();
        }
        entries
    }

    /// `token = index (count)` entries, comma separated.
    pub fn render_listing(&self, order: VocabOrder, reverse: bool) -> String {
        self.listing(order, reverse)
            .iter()
            .map(|e| format!("{} = {} ({})", e.token, e.index, e.count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn render_brief(&self) -> String {
        format!("vocab size: {}\ntotal word count: {}", self.len(), self.total_count())
    }

    /// Token arrays are read as-is; plain strings are split on whitespace.
    fn observe_record(&mut self, record: &Record) {
        match record.get(&self.field) {
            Some(Value::Array(items)) => {
                for word in items.iter().filter_map(Value::as_str) {
                    self.register(word);
                }
            }
            Some(Value::String(s)) => {
                for word in s.split_whitespace() {
                    self.register(word);
                }
            }
            _ => {}
        }
    }
}

impl Accumulator<Record> for Vocabulary {
    fn observe(&mut self, record: &Record) {
        self.observe_record(record);
    }
}

impl Accumulator<Comment> for Vocabulary {
    fn observe(&mut self, comment: &Comment) {
        self.observe_record(comment.record());
    }
}
