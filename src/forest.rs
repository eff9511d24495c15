//! Conversation tree reconstruction for bounded, fully materialized comment sets.
//!
//! Not streaming-safe: the whole collection is held in memory (O(n)). Children are
//! grouped by normalized parent id once, up front, into an index-addressed arena, and
//! nodes are marked visited instead of being removed, so each comment is printed once.

use crate::preprocess::collapse_whitespace;
use crate::record::Comment;
use crate::stream::Stream;
use ahash::AHashMap;
use std::io::{self, Write};

/// One node reached by a walk: arena index and depth below the walk's root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visit {
    pub index: usize,
    pub depth: usize,
}

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Print `id, author:` above each body.
    pub show_header: bool,
    /// Trim and collapse whitespace in bodies.
    pub clean: bool,
    pub text_field: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { show_header: true, clean: true, text_field: "body".to_string() }
    }
}

pub struct ThreadForest {
    comments: Vec<Comment>,
    children: AHashMap<String, Vec<usize>>,
    visited: Vec<bool>,
}

impl ThreadForest {
    pub fn new(comments: Vec<Comment>) -> Self {
        let mut children: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (i, c) in comments.iter().enumerate() {
            children.entry(c.parent_id().to_string()).or_default().push(i);
        }
        let visited = vec![false; comments.len()];
        Self { comments, children, visited }
    }

    /// Drain a stream into a forest.
    pub fn from_stream(stream: Stream<'_, Comment>) -> Self {
        Self::new(stream.to_list())
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Comments not yet visited by any walk.
    pub fn remaining(&self) -> usize {
        self.visited.iter().filter(|v| !**v).count()
    }

    pub fn comment(&self, index: usize) -> Option<&Comment> {
        self.comments.get(index)
    }

    /// Arena index of the first comment with this id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.comments.iter().position(|c| c.id() == id)
    }

    /// Pre-order walk of the thread rooted at `root`, children in input order.
    /// Every node reached is marked visited; visited nodes are never reached again, so
    /// a second walk from the same root returns nothing.
    pub fn walk(&mut self, root: usize) -> Vec<Visit> {
        let mut out = Vec::new();
        if root >= self.comments.len() {
            return out;
        }
        let mut stack = vec![Visit { index: root, depth: 0 }];
        while let Some(v) = stack.pop() {
            if self.visited[v.index] {
                continue;
            }
            self.visited[v.index] = true;
            out.push(v);
            if let Some(kids) = self.children.get(self.comments[v.index].id()) {
                for &k in kids.iter().rev() {
                    if !self.visited[k] {
                        stack.push(Visit { index: k, depth: v.depth + 1 });
                    }
                }
            }
        }
        out
    }

    /// Walk from every still-unvisited comment in input order until none remain,
    /// at most `limit` threads. Under the ordering invariant each walk starts at a
    /// comment whose parent is absent from the set.
    pub fn threads(&mut self, limit: Option<usize>) -> Vec<Vec<Visit>> {
        let mut out = Vec::new();
        for i in 0..self.comments.len() {
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
            if !self.visited[i] {
                out.push(self.walk(i));
            }
        }
        out
    }

    /// Print the thread rooted at `root`. Returns the number of comments printed.
    pub fn render_thread<W: Write>(&mut self, root: usize, opts: &RenderOptions, w: &mut W) -> io::Result<usize> {
        let visits = self.walk(root);
        for v in &visits {
            self.render_visit(*v, opts, w)?;
        }
        Ok(visits.len())
    }

    /// Print every remaining thread (at most `limit`). Returns the number of threads.
    pub fn render_all<W: Write>(&mut self, limit: Option<usize>, opts: &RenderOptions, w: &mut W) -> io::Result<usize> {
        let threads = self.threads(limit);
        for t in &threads {
            for v in t {
                self.render_visit(*v, opts, w)?;
            }
        }
        tracing::debug!("rendered {} threads, {} comments left", threads.len(), self.remaining());
        Ok(threads.len())
    }

    fn render_visit<W: Write>(&self, v: Visit, opts: &RenderOptions, w: &mut W) -> io::Result<()> {
        let c = &self.comments[v.index];
        let indent = "    ".repeat(v.depth);
        let mut body = c.text(&opts.text_field).unwrap_or_default();
        if opts.clean {
            body = collapse_whitespace(&body);
        }
        if opts.show_header {
            let author = c.author().unwrap_or("");
            writeln!(w, "{indent}- {}, {author}:\n  {indent}{body}", c.id())
        } else {
            writeln!(w, "{indent}- {body}")
        }
    }
}
