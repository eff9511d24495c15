//! Tab-separated pair corpus output.
//!
//! Lines go to `<out>.part` first; `finish` flushes and renames over `<out>`, so an
//! interrupted run never leaves a truncated corpus under the final name.

use anyhow::{Context, Result};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct PairWriter {
    tmp: PathBuf,
    dest: PathBuf,
    w: BufWriter<File>,
    lines: u64,
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

impl PairWriter {
    pub fn create(dest: &Path, buf_bytes: usize) -> Result<Self> {
        if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = part_path(dest);
        let f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        Ok(Self {
            tmp,
            dest: dest.to_path_buf(),
            w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f),
            lines: 0,
        })
    }

    /// One pair per line; the pair's `Display` provides the tab-separated fields.
    pub fn write_pair(&mut self, pair: &impl Display) -> Result<()> {
        writeln!(self.w, "{pair}").with_context(|| format!("write {}", self.tmp.display()))?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flush, then promote the temp file to the destination. Returns the line count.
    /// The temp file is removed when either step fails.
    pub fn finish(mut self) -> Result<u64> {
        let promoted = self
            .w
            .flush()
            .with_context(|| format!("flush {}", self.tmp.display()))
            .and_then(|()| {
                fs::rename(&self.tmp, &self.dest)
                    .with_context(|| format!("rename {} -> {}", self.tmp.display(), self.dest.display()))
            });
        if let Err(e) = promoted {
            let _ = fs::remove_file(&self.tmp);
            return Err(e);
        }
        Ok(self.lines)
    }

    /// Drop the partial output; the destination is left untouched.
    pub fn abandon(self) {
        let Self { tmp, w, .. } = self;
        drop(w);
        let _ = fs::remove_file(&tmp);
    }
}

/// Write every pair of `pairs` to `dest`. On failure no file is left under either name.
pub fn write_pairs<P, I>(dest: &Path, pairs: I) -> Result<u64>
where
    P: Display,
    I: IntoIterator<Item = P>,
{
    let mut w = PairWriter::create(dest, 256 * 1024)?;
    for p in pairs {
        if let Err(e) = w.write_pair(&p) {
            w.abandon();
            return Err(e);
        }
    }
    w.finish()
}
