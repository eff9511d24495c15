//! Lazy, single-consumption streams with composable combinators.
//!
//! A `Stream` wraps a boxed iterator chain. Combinators return a new stream around the
//! composed (not yet executed) chain; nothing runs until a terminal operation pulls.
//! Terminals take `self` by value, so a drained handle cannot be reused.
//!
//! Only `distinct` and the materializing terminals (`to_list`, `to_dict*`, `to_set`)
//! hold more than one element at a time.

use crate::accumulate::Accumulator;
use crate::error::{Error, Result};
use ahash::{AHashMap, AHashSet};
use std::fmt::{Display, Write as _};
use std::hash::Hash;

pub struct Stream<'a, T> {
    inner: Box<dyn Iterator<Item = T> + 'a>,
}

impl<'a, T: 'a> Stream<'a, T> {
    pub fn new<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        Self { inner: Box::new(iter.into_iter()) }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Build a stream from a generator closure; `None` ends the stream.
    pub fn from_fn(f: impl FnMut() -> Option<T> + 'a) -> Self {
        Self::new(std::iter::from_fn(f))
    }

    // -------- Combinators (lazy) --------

    pub fn map<U: 'a>(self, f: impl FnMut(T) -> U + 'a) -> Stream<'a, U> {
        Stream::new(self.inner.map(f))
    }

    pub fn filter(self, p: impl FnMut(&T) -> bool + 'a) -> Self {
        Stream::new(self.inner.filter(p))
    }

    /// Map every element to a sub-sequence and concatenate the results.
    pub fn flat_map<U, I>(self, f: impl FnMut(T) -> I + 'a) -> Stream<'a, U>
    where
        U: 'a,
        I: IntoIterator<Item = U> + 'a,
        I::IntoIter: 'a,
    {
        Stream::new(self.inner.flat_map(f))
    }

    /// Run `f` for its side effect; the element passes through unchanged.
    pub fn peek(self, f: impl FnMut(&T) + 'a) -> Self {
        Stream::new(self.inner.inspect(f))
    }

    /// Wire an accumulator in as a transparent stage. The accumulator stays borrowed
    /// until the stream is drained; read it afterwards.
    pub fn observe<A>(self, acc: &'a mut A) -> Self
    where
        A: Accumulator<T> + ?Sized,
    {
        self.peek(move |item| acc.observe(item))
    }

    pub fn take(self, n: usize) -> Self {
        Stream::new(self.inner.take(n))
    }

    pub fn drop(self, n: usize) -> Self {
        Stream::new(self.inner.skip(n))
    }

    pub fn take_while(self, p: impl FnMut(&T) -> bool + 'a) -> Self {
        Stream::new(self.inner.take_while(p))
    }

    pub fn drop_while(self, p: impl FnMut(&T) -> bool + 'a) -> Self {
        Stream::new(self.inner.skip_while(p))
    }

    /// Suppress elements equal to one already emitted, keeping first-seen order.
    /// Memory grows with the number of distinct elements.
    pub fn distinct(self) -> Self
    where
        T: Eq + Hash + Clone,
    {
        let mut seen: AHashSet<T> = AHashSet::new();
        self.filter(move |item| {
            if seen.contains(item) {
                return false;
            }
            seen.insert(item.clone());
            true
        })
    }

    pub fn concat(self, other: Stream<'a, T>) -> Self {
        Stream::new(self.inner.chain(other.inner))
    }

    // -------- Terminals (drain the stream) --------

    pub fn count(self) -> usize {
        self.inner.count()
    }

    /// Left fold seeded with the first element. Fails on an empty stream.
    pub fn reduce(self, op: impl FnMut(T, T) -> T) -> Result<T> {
        self.inner.reduce(op).ok_or(Error::EmptyReduce)
    }

    /// Left fold from an explicit seed; an empty stream yields the seed.
    pub fn reduce_from<U>(self, seed: U, op: impl FnMut(U, T) -> U) -> U {
        self.inner.fold(seed, op)
    }

    pub fn to_list(self) -> Vec<T> {
        self.inner.collect()
    }

    /// Build a map; on key collision the later value overwrites the earlier one.
    pub fn to_dict<K, V>(
        self,
        mut key_fn: impl FnMut(&T) -> K,
        mut val_fn: impl FnMut(T) -> V,
    ) -> AHashMap<K, V>
    where
        K: Eq + Hash,
    {
        let mut map = AHashMap::new();
        for item in self.inner {
            let key = key_fn(&item);
            map.insert(key, val_fn(item));
        }
        map
    }

    /// Build a map; on key collision the stored value becomes `merge(old, new)`.
    pub fn to_dict_with<K, V>(
        self,
        mut key_fn: impl FnMut(&T) -> K,
        mut val_fn: impl FnMut(T) -> V,
        mut merge: impl FnMut(V, V) -> V,
    ) -> AHashMap<K, V>
    where
        K: Eq + Hash,
    {
        let mut map: AHashMap<K, V> = AHashMap::new();
        for item in self.inner {
            let key = key_fn(&item);
            let val = val_fn(item);
            let merged = match map.remove(&key) {
                Some(old) => merge(old, val),
                None => val,
            };
            map.insert(key, merged);
        }
        map
    }

    pub fn to_set(self) -> AHashSet<T>
    where
        T: Eq + Hash,
    {
        self.inner.collect()
    }

    /// Render every element with `Display`, separated by `sep`.
    pub fn join(self, sep: &str) -> String
    where
        T: Display,
    {
        let mut out = String::new();
        for (i, item) in self.inner.enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            let _ = write!(out, "{item}");
        }
        out
    }
}

impl<'a, T: 'a, E: 'a> Stream<'a, Result<T, E>> {
    /// Yield the `Ok` values; stop at the first `Err` and park it in `slot`.
    /// Check `slot` once the downstream terminal has returned.
    pub fn until_err(self, slot: &'a mut Option<E>) -> Stream<'a, T> {
        let mut inner = self.inner;
        Stream::from_fn(move || {
            if slot.is_some() {
                return None;
            }
            match inner.next()? {
                Ok(v) => Some(v),
                Err(e) => {
                    *slot = Some(e);
                    None
                }
            }
        })
    }
}

impl<T> Iterator for Stream<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
