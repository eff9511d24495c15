//! Input discovery: explicit files as given, directories scanned for monthly comment dumps.

use crate::date::YearMonth;
use crate::error::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

static MONTHLY: OnceLock<Regex> = OnceLock::new();

fn monthly_re() -> &'static Regex {
    MONTHLY.get_or_init(|| Regex::new(r"^RC_(\d{4})-(\d{2})\.(zst|jsonl|json)$").expect("static regex"))
}

/// Month encoded in an `RC_YYYY-MM.{zst,jsonl,json}` file name.
pub fn month_of(path: &Path) -> Option<YearMonth> {
    let name = path.file_name()?.to_str()?;
    let caps = monthly_re().captures(name)?;
    YearMonth::new(caps[1].parse().ok()?, caps[2].parse().ok()?)
}

/// Monthly files directly inside `dir`, oldest first (ties by file name).
fn discover_months(dir: &Path, start: Option<YearMonth>, end: Option<YearMonth>) -> Vec<PathBuf> {
    let mut map: BTreeMap<(YearMonth, String), PathBuf> = BTreeMap::new();
    for ent in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().flatten() {
        let Some(ym) = month_of(ent.path()) else { continue };
        if !ym.within(start, end) {
            continue;
        }
        let name = ent.file_name().to_string_lossy().into_owned();
        map.insert((ym, name), ent.path().to_path_buf());
    }
    map.into_values().collect()
}

/// Expand inputs in order. Files are kept as given (no date filtering); directories
/// contribute their monthly dumps within `[start, end]`. Missing paths are an error.
pub fn discover_inputs(
    inputs: &[PathBuf],
    start: Option<YearMonth>,
    end: Option<YearMonth>,
) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for p in inputs {
        let meta = fs::metadata(p)?;
        if meta.is_dir() {
            let found = discover_months(p, start, end);
            if found.is_empty() {
                tracing::warn!("no RC_YYYY-MM files in {} for the selected months", p.display());
            }
            out.extend(found);
        } else {
            out.push(p.clone());
        }
    }
    Ok(out)
}
