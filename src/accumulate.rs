//! Transparent stateful filters: accumulators observe every element flowing through a
//! stream and update counters, without dropping or changing the element.
//! Create one before building the pipeline, wire it in with `Stream::observe`, and read
//! it after the terminal operation has drained the stream.

use crate::record::{Comment, Record};
use ahash::AHashMap;
use serde_json::Value;
use std::fmt::Write as _;

pub trait Accumulator<T: ?Sized> {
    fn observe(&mut self, item: &T);
}

/// Per-field frequency counter, with optional per-field value histograms.
#[derive(Debug, Default)]
pub struct FieldStats {
    fields: AHashMap<String, u64>,
    track_values: bool,
    field_values: AHashMap<String, AHashMap<String, u64>>,
}

impl FieldStats {
    pub fn new(track_values: bool) -> Self {
        Self { track_values, ..Default::default() }
    }

    pub fn field_count(&self, field: &str) -> u64 {
        self.fields.get(field).copied().unwrap_or(0)
    }

    /// How often `field` carried `value`, keyed by the value's JSON text
    /// (strings unquoted). Zero unless value tracking is on.
    pub fn value_count(&self, field: &str, value: &str) -> u64 {
        self.field_values
            .get(field)
            .and_then(|m| m.get(value))
            .copied()
            .unwrap_or(0)
    }

    /// Fields ordered by ascending frequency (ties by name).
    pub fn sorted_fields(&self) -> Vec<(&str, u64)> {
        let mut items: Vec<(&str, u64)> = self.fields.iter().map(|(k, n)| (k.as_str(), *n)).collect();
        items.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        items
    }

    pub fn report(&self, show_count: bool) -> String {
        let mut out = String::new();
        for (key, n) in self.sorted_fields() {
            if show_count {
                let _ = writeln!(out, "{key}: {n}");
            } else {
                let _ = writeln!(out, "{key}");
            }
            if let Some(values) = self.field_values.get(key) {
                let mut vs: Vec<(&String, &u64)> = values.iter().collect();
                vs.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
                for (value, count) in vs {
                    let _ = writeln!(out, "  {value}: {count}");
                }
            }
        }
        out
    }

    fn observe_fields<'r>(&mut self, fields: impl Iterator<Item = (&'r String, &'r Value)>) {
        for (key, value) in fields {
            *self.fields.entry(key.clone()).or_insert(0) += 1;
            if self.track_values {
                *self
                    .field_values
                    .entry(key.clone())
                    .or_default()
                    .entry(value_key(value))
                    .or_insert(0) += 1;
            }
        }
    }
}

fn value_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Accumulator<Record> for FieldStats {
    fn observe(&mut self, record: &Record) {
        self.observe_fields(record.fields());
    }
}

impl Accumulator<Comment> for FieldStats {
    fn observe(&mut self, comment: &Comment) {
        self.observe_fields(comment.record().fields());
    }
}

/// Forum metadata summary: comment/deleted/reply counts and per-subreddit tallies.
#[derive(Debug, Default)]
pub struct ForumStats {
    pub comments: u64,
    pub deleted: u64,
    /// Comments replying directly to a submission (no addressable parent).
    pub on_posts: u64,
    /// Comments replying to another comment.
    pub on_comments: u64,
    pub inconsistent: u64,
    subreddit_posts: AHashMap<String, u64>,
    subreddit_names: AHashMap<String, String>,
}

impl ForumStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subreddit_count(&self) -> usize {
        self.subreddit_posts.len()
    }

    pub fn posts_in(&self, subreddit_id: &str) -> u64 {
        self.subreddit_posts.get(subreddit_id).copied().unwrap_or(0)
    }

    pub fn subreddit_name(&self, subreddit_id: &str) -> Option<&str> {
        self.subreddit_names.get(subreddit_id).map(String::as_str)
    }

    /// Subreddit ids ordered by ascending post count (ties by id).
    pub fn sorted_subreddits(&self) -> Vec<(&str, u64)> {
        let mut items: Vec<(&str, u64)> =
            self.subreddit_posts.iter().map(|(k, n)| (k.as_str(), *n)).collect();
        items.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        items
    }

    pub fn report(&self) -> String {
        let rule = "=".repeat(80);
        let thin = "-".repeat(40);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}\nMetadata summary\n{rule}");
        let _ = writeln!(out, "Subreddit (id): #posts\n{thin}");
        for (id, n) in self.sorted_subreddits() {
            let name = self.subreddit_name(id).unwrap_or("");
            let _ = writeln!(out, "{name} ({id}): {n}");
        }
        let _ = writeln!(out, "{thin}");
        let _ = writeln!(out, "Subreddits: {}", self.subreddit_count());
        let _ = writeln!(out, "Deleted comments: {}", self.deleted);
        let _ = writeln!(out, "On original posts: {}", self.on_posts);
        let _ = writeln!(out, "Comment-reply pairs: {}", self.on_comments);
        let _ = writeln!(out, "Total comments: {}", self.comments);
        if self.inconsistent > 0 {
            let _ = writeln!(out, "Inconsistent subreddit mappings: {}", self.inconsistent);
        }
        out
    }
}

impl Accumulator<Comment> for ForumStats {
    fn observe(&mut self, c: &Comment) {
        self.comments += 1;
        if c.is_deleted() {
            self.deleted += 1;
        }
        if c.has_addressable_parent() {
            self.on_comments += 1;
        } else {
            self.on_posts += 1;
        }
        let (Some(sid), Some(name)) = (c.subreddit_id(), c.subreddit()) else { return };
        *self.subreddit_posts.entry(sid.to_string()).or_insert(0) += 1;
        match self.subreddit_names.get(sid) {
            None => {
                self.subreddit_names.insert(sid.to_string(), name.to_string());
            }
            Some(known) if known != name => {
                self.inconsistent += 1;
                tracing::warn!(
                    "inconsistent subreddit mapping: {} is '{}' but comment {} says '{}'",
                    sid, known, c.id(), name
                );
            }
            Some(_) => {}
        }
    }
}
