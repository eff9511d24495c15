//! Reply correlation over a flat comment stream.
//!
//! Every pass relies on the ordering invariant of the monthly dumps: a comment's parent,
//! when it is in the input at all, appears earlier than the comment. A single forward
//! pass that remembers what it has seen therefore finds every (child, parent) edge
//! without lookahead.
//!
//! Memory: id pairing keeps one id per comment seen; record and body pairing keep the
//! whole comment / its text for every id, since any later reply may point back at any
//! earlier comment. The two-phase variants bound the second pass to the comments that
//! take part in at least one edge.

use crate::error::{Error, Result};
use crate::record::Comment;
use crate::stream::Stream;
use ahash::{AHashMap, AHashSet};
use std::fmt;
use std::rc::Rc;

/// Type tag of a comment fullname (`t1_<id>`).
pub const COMMENT_TAG: &str = "t1";
/// Type tag of a submission fullname (`t3_<id>`).
pub const SUBMISSION_TAG: &str = "t3";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentKind {
    Comment,
    Submission,
    Other,
}

impl ParentKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            COMMENT_TAG => ParentKind::Comment,
            SUBMISSION_TAG => ParentKind::Submission,
            _ => ParentKind::Other,
        }
    }
}

/// A parsed `parent_id` (`<tag>_<id>`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentRef {
    tag: String,
    id: String,
    kind: ParentKind,
}

impl ParentRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let (tag, id) = raw
            .split_once('_')
            .ok_or_else(|| Error::MalformedParentId(raw.to_string()))?;
        Ok(Self { tag: tag.to_string(), id: id.to_string(), kind: ParentKind::from_tag(tag) })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Bare id, without tag and separator.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ParentKind {
        self.kind
    }

    /// Only comments can show up in a comment stream; submissions never do.
    pub fn is_addressable(&self) -> bool {
        self.kind == ParentKind::Comment
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tag, self.id)
    }
}

/// Strip the type tag: `"t1_c0ffee"` -> `"c0ffee"`. Input without `_` is malformed.
pub fn normalize_parent_id(raw: &str) -> Result<&str> {
    raw.split_once('_')
        .map(|(_, id)| id)
        .ok_or_else(|| Error::MalformedParentId(raw.to_string()))
}

/// Keep pair fields on one line: tabs and line breaks become spaces.
fn one_line(s: &str) -> String {
    s.replace(['\t', '\r', '\n'], " ")
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdPair {
    pub child: String,
    pub parent: String,
}

impl fmt::Display for IdPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.child, self.parent)
    }
}

#[derive(Clone, Debug)]
pub struct RecordPair {
    pub child: Rc<Comment>,
    pub parent: Rc<Comment>,
}

/// Text pair; the parent comes first, as in a (prompt, reply) corpus.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyPair {
    pub parent: String,
    pub child: String,
}

impl fmt::Display for BodyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", one_line(&self.parent), one_line(&self.child))
    }
}

/// Backward-looking index shared by all pairing passes: remembers a value per comment
/// id and, for each new comment with an addressable parent, hands back the value stored
/// for that parent.
#[derive(Debug)]
pub struct ReplyIndex<V> {
    seen: AHashMap<String, V>,
}

impl<V> Default for ReplyIndex<V> {
    fn default() -> Self {
        Self { seen: AHashMap::new() }
    }
}

impl<V: Clone> ReplyIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look the parent up, then record `value` under the comment's own id.
    pub fn step(&mut self, comment: &Comment, value: V) -> Option<V> {
        let hit = if comment.has_addressable_parent() {
            self.seen.get(comment.parent_id()).cloned()
        } else {
            None
        };
        self.seen.insert(comment.id().to_string(), value);
        hit
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Pairing passes over a comment stream.
#[derive(Clone, Debug)]
pub struct Correlator {
    text_field: String,
}

impl Default for Correlator {
    fn default() -> Self {
        Self { text_field: "body".to_string() }
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field whose text `body_pairs` emits (string, or token array joined by spaces).
    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    pub fn text_field(&self) -> &str {
        &self.text_field
    }

    /// Single pass, id set only: `(child id, parent id)` for every reply whose parent
    /// was seen earlier.
    pub fn id_pairs<'a>(&self, comments: Stream<'a, Comment>) -> Stream<'a, IdPair> {
        let mut index: ReplyIndex<()> = ReplyIndex::new();
        comments.flat_map(move |c| {
            index.step(&c, ()).map(|()| IdPair {
                child: c.id().to_string(),
                parent: c.parent_id().to_string(),
            })
        })
    }

    /// Single pass keeping every comment: full `(child, parent)` comments.
    pub fn record_pairs<'a>(&self, comments: Stream<'a, Comment>) -> Stream<'a, RecordPair> {
        let mut index: ReplyIndex<Rc<Comment>> = ReplyIndex::new();
        comments.flat_map(move |c| {
            let child = Rc::new(c);
            index
                .step(&child, Rc::clone(&child))
                .map(|parent| RecordPair { child, parent })
        })
    }

    /// Single pass keeping only text: `(parent text, child text)`.
    pub fn body_pairs<'a>(&self, comments: Stream<'a, Comment>) -> Stream<'a, BodyPair> {
        let field = self.text_field.clone();
        let mut index: ReplyIndex<String> = ReplyIndex::new();
        comments.flat_map(move |c| {
            let body = c.text(&field).unwrap_or_default();
            index
                .step(&c, body.clone())
                .map(|parent| BodyPair { parent, child: body })
        })
    }

    /// Ids of every comment on at least one edge: one that found its parent, or one that
    /// a later comment found as its parent. Strictly backward-looking, one pass.
    pub fn paired_ids(&self, comments: Stream<'_, Comment>) -> AHashSet<String> {
        self.id_pairs(comments)
            .flat_map(|p| [p.child, p.parent])
            .to_set()
    }

    /// Pass one collects `paired_ids` from `open()`; pass two re-opens the source, keeps
    /// only participating comments and pairs their text. The first source error ends the
    /// stream and lands in `slot`.
    pub fn two_phase_body_pairs<'a, E, F>(&self, open: F, slot: &'a mut Option<E>) -> Stream<'a, BodyPair>
    where
        E: 'a,
        F: FnMut() -> Stream<'a, std::result::Result<Comment, E>>,
    {
        let second = self.known_paired(open, slot);
        self.body_pairs(second)
    }

    /// Like `two_phase_body_pairs`, but pass two emits full comments.
    pub fn two_phase_record_pairs<'a, E, F>(&self, open: F, slot: &'a mut Option<E>) -> Stream<'a, RecordPair>
    where
        E: 'a,
        F: FnMut() -> Stream<'a, std::result::Result<Comment, E>>,
    {
        let second = self.known_paired(open, slot);
        self.record_pairs(second)
    }

    fn known_paired<'a, E, F>(&self, mut open: F, slot: &'a mut Option<E>) -> Stream<'a, Comment>
    where
        E: 'a,
        F: FnMut() -> Stream<'a, std::result::Result<Comment, E>>,
    {
        let mut first_err = None;
        let paired = self.paired_ids(open().until_err(&mut first_err));
        if let Some(e) = first_err {
            *slot = Some(e);
            return Stream::empty();
        }
        tracing::info!("pre-pass: {} comments take part in a reply pair", paired.len());
        open().until_err(slot).filter(move |c| paired.contains(c.id()))
    }
}
