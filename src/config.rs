use crate::date::YearMonth;
use crate::preprocess::Preprocess;
use crate::record::Record;
use crate::source::MIN_READ_BUFFER;
use crate::util::normalize_subreddit;
use ahash::AHashSet;
use std::path::{Path, PathBuf};

/// Which subreddits pass. Names are compared normalized (lowercase, no `r/`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubredditFilter {
    #[default]
    All,
    Keep(AHashSet<String>),
    Strip(AHashSet<String>),
}

impl SubredditFilter {
    pub fn keep<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Keep(names.into_iter().map(|s| normalize_subreddit(s.as_ref())).collect())
    }

    pub fn strip<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Strip(names.into_iter().map(|s| normalize_subreddit(s.as_ref())).collect())
    }

    /// Records without a subreddit only pass `All` and `Strip`.
    pub fn accepts(&self, subreddit: Option<&str>) -> bool {
        match self {
            SubredditFilter::All => true,
            SubredditFilter::Keep(set) => subreddit.is_some_and(|s| set.contains(&normalize_subreddit(s))),
            SubredditFilter::Strip(set) => !subreddit.is_some_and(|s| set.contains(&normalize_subreddit(s))),
        }
    }
}

/// Fields that correlation depends on; never removed by a field filter.
pub const PROTECTED_FIELDS: [&str; 2] = ["id", "parent_id"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldFilter {
    #[default]
    All,
    Keep(Vec<String>),
    Strip(Vec<String>),
}

impl FieldFilter {
    pub fn apply(&self, record: Record) -> Record {
        match self {
            FieldFilter::All => record,
            FieldFilter::Keep(fields) => {
                let mut keep = fields.clone();
                keep.extend(PROTECTED_FIELDS.iter().map(|f| f.to_string()));
                record.keep_fields(&keep)
            }
            FieldFilter::Strip(fields) => {
                let strip: Vec<&String> = fields
                    .iter()
                    .filter(|f| !PROTECTED_FIELDS.contains(&f.as_str()))
                    .collect();
                record.strip_fields(&strip)
            }
        }
    }
}

/// Pipeline options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Files, or directories holding `RC_YYYY-MM` dumps.
    pub inputs: Vec<PathBuf>,
    pub start: Option<YearMonth>, // inclusive, directories only
    pub end: Option<YearMonth>,   // inclusive, directories only
    /// Records read from the source, before deleted filtering.
    pub read_max: Option<usize>,
    /// Records kept after deleted filtering.
    pub process_max: Option<usize>,
    pub ignore_deleted: bool,
    pub subreddits: SubredditFilter,
    pub fields: FieldFilter,
    pub text_field: String,
    pub preprocess: Preprocess,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,

    pub read_buffer_bytes: usize,
    pub progress: bool,
    pub progress_label: Option<String>,
    pub human_readable_timestamps: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            start: None,
            end: None,
            read_max: None,
            process_max: None,
            ignore_deleted: false,
            subreddits: SubredditFilter::All,
            fields: FieldFilter::All,
            text_field: "body".to_string(),
            preprocess: Preprocess::default(),
            min_length: None,
            max_length: None,
            read_buffer_bytes: 256 * 1024,
            progress: false,
            progress_label: None,
            human_readable_timestamps: false,
        }
    }
}

impl PipelineOptions {
    pub fn with_input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }
    pub fn with_inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inputs.extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }
    pub fn with_date_range(mut self, start: Option<YearMonth>, end: Option<YearMonth>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
    pub fn with_read_max(mut self, n: usize) -> Self {
        self.read_max = Some(n);
        self
    }
    pub fn with_process_max(mut self, n: usize) -> Self {
        self.process_max = Some(n);
        self
    }
    pub fn with_ignore_deleted(mut self, yes: bool) -> Self {
        self.ignore_deleted = yes;
        self
    }
    pub fn with_subreddits(mut self, filter: SubredditFilter) -> Self {
        self.subreddits = filter;
        self
    }
    pub fn with_fields(mut self, filter: FieldFilter) -> Self {
        self.fields = filter;
        self
    }
    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }
    pub fn with_preprocess(mut self, pre: Preprocess) -> Self {
        self.preprocess = pre;
        self
    }
    pub fn with_length_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(MIN_READ_BUFFER);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_human_timestamps(mut self, yes: bool) -> Self {
        self.human_readable_timestamps = yes;
        self
    }

    /// Length of the text field within `[min_length, max_length]`.
    pub fn length_ok(&self, len: usize) -> bool {
        self.min_length.map_or(true, |m| len >= m) && self.max_length.map_or(true, |m| len <= m)
    }
}
