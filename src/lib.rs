mod config;
mod date;
mod paths;
mod source;
mod progress;
mod util;
mod pipeline;
mod pairs;

pub mod error;
pub mod stream;
pub mod accumulate;
pub mod record;
pub mod correlate;
pub mod forest;
pub mod vocab;
pub mod preprocess;

pub use crate::error::{Error, Result};
pub use crate::stream::Stream;
pub use crate::accumulate::{Accumulator, FieldStats, ForumStats};
pub use crate::record::{Comment, Record};
pub use crate::correlate::{
    normalize_parent_id, BodyPair, Correlator, IdPair, ParentKind, ParentRef, RecordPair, ReplyIndex,
};
pub use crate::forest::{RenderOptions, ThreadForest, Visit};
pub use crate::vocab::{VocabEntry, VocabOrder, Vocabulary};
pub use crate::preprocess::Preprocess;

pub use crate::config::{FieldFilter, PipelineOptions, SubredditFilter};
pub use crate::date::YearMonth;
pub use crate::pipeline::{Pipeline, Report, Tasks};

// Input discovery and reading, usable without a `Pipeline`.
pub use crate::paths::{discover_inputs, month_of};
pub use crate::source::{parse_record, read_records, RecordLines};

pub use crate::progress::{make_progress_bar_labeled, total_size};
pub use crate::util::{init_tracing_once, normalize_subreddit};

// Pair corpus output.
pub use crate::pairs::{write_pairs, PairWriter};
