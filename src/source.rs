//! Line-delimited JSON record source over `.zst` dumps and plain `.jsonl` files.
//!
//! Files are opened one at a time, only when the stream reaches them, and closed as
//! soon as they are exhausted or the stream is dropped.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::stream::Stream;
use indicatif::ProgressBar;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder;

/// Fallback capacity when callers pass something smaller.
pub const MIN_READ_BUFFER: usize = 8 * 1024;

/// A `Read` wrapper that advances the progress bar by the on-disk bytes read.
struct CountingReader<R: Read> {
    inner: R,
    progress: Option<ProgressBar>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(pb) = &self.progress {
            pb.inc(n as u64);
        }
        Ok(n)
    }
}

fn is_zstd(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("zst"))
}

fn open_reader(path: &Path, read_buf: usize, progress: Option<ProgressBar>) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let counted = CountingReader { inner: file, progress };
    let cap = read_buf.max(MIN_READ_BUFFER);
    if is_zstd(path) {
        let mut decoder = Decoder::new(counted)?;
        // Monthly dumps are compressed with long windows.
        decoder.window_log_max(31)?;
        Ok(Box::new(BufReader::with_capacity(cap, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(cap, counted)))
    }
}

/// Decode one line into a record. Line numbers are 1-based.
pub fn parse_record(path: &Path, line: u64, text: &str) -> Result<Record> {
    let value: Value = serde_json::from_str(text).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        line,
        source,
    })?;
    Record::from_value(value).ok_or_else(|| Error::NotAnObject { path: path.to_path_buf(), line })
}

/// Records of one file. A failed open surfaces as the first (and only) item.
pub struct RecordLines {
    path: PathBuf,
    reader: Option<Box<dyn BufRead>>,
    pending: Option<Error>,
    line: u64,
    buf: String,
}

impl RecordLines {
    pub fn open(path: PathBuf, read_buf: usize, progress: Option<ProgressBar>) -> Self {
        tracing::debug!("reading {}", path.display());
        let (reader, pending) = match open_reader(&path, read_buf, progress) {
            Ok(r) => (Some(r), None),
            Err(e) => (None, Some(Error::Io(e))),
        };
        Self { path, reader, pending, line: 0, buf: String::with_capacity(16 * 1024) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for RecordLines {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            return Some(Err(e));
        }
        let reader = self.reader.as_mut()?;
        loop {
            self.buf.clear();
            match reader.read_line(&mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.reader = None;
                    return Some(Err(Error::Io(e)));
                }
            }
            self.line += 1;
            if self.buf.ends_with('\n') {
                self.buf.pop();
                if self.buf.ends_with('\r') {
                    self.buf.pop();
                }
            }
            if self.buf.trim().is_empty() {
                continue;
            }
            return Some(parse_record(&self.path, self.line, &self.buf));
        }
    }
}

/// Lazily chain the records of every file in order.
///
/// With a progress bar the bar advances by compressed bytes and is finished once the
/// last file is exhausted.
pub fn read_records(paths: &[PathBuf], read_buf: usize, progress: Option<ProgressBar>) -> Stream<'static, Result<Record>> {
    let bar = progress.clone();
    let records = Stream::new(paths.to_vec()).flat_map(move |p| RecordLines::open(p, read_buf, bar.clone()));
    match progress {
        Some(pb) => records.concat(Stream::from_fn(move || {
            if !pb.is_finished() {
                pb.finish_with_message("done");
            }
            None
        })),
        None => records,
    }
}
