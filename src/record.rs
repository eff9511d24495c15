//! Record model: a flat JSON object per line, and the decoded `Comment` view the
//! correlator works on.

use crate::correlate::{normalize_parent_id, ParentRef};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Fields every forum comment must carry besides `id` and `parent_id`.
pub const REQUIRED_FIELDS: [&str; 4] = ["body", "subreddit", "subreddit_id", "author"];

/// Body text Reddit substitutes for deleted comments.
pub const DELETED_BODY: &str = "[deleted]";

/// Unix-second fields rendered as RFC 3339 by `Record::with_human_timestamps`.
pub const TIMESTAMP_FIELDS: [&str; 3] = ["created_utc", "retrieved_on", "edited"];

/// One decoded JSON object. Transforms consume the record and return a new one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Text of a field: a string as-is, or a token array joined by single spaces.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Rewrite one field through `f`; a missing field stays missing.
    pub fn map_field(mut self, key: &str, f: impl FnOnce(Value) -> Value) -> Self {
        if let Some(v) = self.0.remove(key) {
            self.0.insert(key.to_string(), f(v));
        }
        self
    }

    pub fn keep_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.0.retain(|k, _| fields.iter().any(|f| f.as_ref() == k));
        self
    }

    pub fn strip_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.0.retain(|k, _| !fields.iter().any(|f| f.as_ref() == k));
        self
    }

    /// Rewrite numeric timestamps (numbers or digit strings) as RFC 3339 strings.
    /// `edited` is often `false`; non-numeric values stay as they are.
    pub fn with_human_timestamps(mut self) -> Self {
        for key in TIMESTAMP_FIELDS {
            if let Some(v) = self.0.get_mut(key) {
                let secs = match v {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.parse::<i64>().ok(),
                    _ => None,
                };
                if let Some(secs) = secs {
                    if let Ok(dt) = OffsetDateTime::from_unix_timestamp(secs) {
                        if let Ok(s) = dt.format(&Rfc3339) {
                            *v = Value::String(s);
                        }
                    }
                }
            }
        }
        self
    }

    /// Replace a tagged `parent_id` by its bare id. A missing or malformed value is
    /// left alone.
    pub fn with_bare_parent_id(self) -> Self {
        let bare = match self.str_field("parent_id").map(normalize_parent_id) {
            Some(Ok(id)) => Some(id.to_string()),
            _ => None,
        };
        match bare {
            Some(id) => self.with_field("parent_id", id),
            None => self,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A record that passed forum decoding: its id and parsed parent reference are held
/// beside the raw fields, so later field rewrites cannot break correlation.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    id: String,
    parent: ParentRef,
    record: Record,
}

impl Comment {
    /// Decode a forum comment. Missing required fields and malformed parent ids are fatal.
    pub fn from_record(record: Record) -> Result<Self> {
        let id = record
            .str_field("id")
            .ok_or_else(|| Error::MissingField { id: "<unknown>".to_string(), field: "id" })?
            .to_string();
        let raw_parent = record
            .str_field("parent_id")
            .ok_or_else(|| Error::MissingField { id: id.clone(), field: "parent_id" })?;
        let parent = ParentRef::parse(raw_parent)?;
        if let Some(&field) = REQUIRED_FIELDS.iter().find(|f| record.get(f).is_none()) {
            return Err(Error::MissingField { id, field });
        }
        Ok(Self { id, parent, record })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> &ParentRef {
        &self.parent
    }

    /// Normalized (bare) parent id.
    pub fn parent_id(&self) -> &str {
        self.parent.id()
    }

    /// True when the parent is itself a comment that could appear in the stream.
    pub fn has_addressable_parent(&self) -> bool {
        self.parent.is_addressable()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn body(&self) -> Option<&str> {
        self.record.str_field("body")
    }

    pub fn author(&self) -> Option<&str> {
        self.record.str_field("author")
    }

    pub fn subreddit(&self) -> Option<&str> {
        self.record.str_field("subreddit")
    }

    pub fn subreddit_id(&self) -> Option<&str> {
        self.record.str_field("subreddit_id")
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.record.text(field)
    }

    pub fn is_deleted(&self) -> bool {
        self.body() == Some(DELETED_BODY)
    }

    /// A copy of the record whose `parent_id` is the bare parent id.
    pub fn normalized_record(&self) -> Record {
        self.record.clone().with_field("parent_id", self.parent.id())
    }

    /// Rewrite the underlying record; id and parent reference are kept.
    pub fn map_record(self, f: impl FnOnce(Record) -> Record) -> Self {
        Self { record: f(self.record), ..self }
    }
}
