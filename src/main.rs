use anyhow::Result;
use clap::{ArgGroup, Parser};
use rcthread::{
    init_tracing_once, FieldFilter, FieldStats, ForumStats, Pipeline, PipelineOptions, Preprocess,
    RenderOptions, SubredditFilter, Tasks, VocabOrder, Vocabulary, YearMonth,
};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rcthread",
    version,
    about = "Stream forum comment dumps: filter, count, pair replies, rebuild threads",
    group(ArgGroup::new("subs").args(["keep_subreddits", "strip_subreddits"])),
    group(ArgGroup::new("field_filter").args(["keep_fields", "strip_fields"])),
    group(ArgGroup::new("order").args(["by_count", "by_index", "by_word"]))
)]
struct Args {
    /// Comment files (.zst, .jsonl) or directories of RC_YYYY-MM dumps.
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// First month (YYYY-MM) taken from input directories.
    #[arg(long, value_name = "YYYY-MM")]
    start: Option<YearMonth>,

    /// Last month (YYYY-MM) taken from input directories.
    #[arg(long, value_name = "YYYY-MM")]
    end: Option<YearMonth>,

    /// Read at most this many records.
    #[arg(long, value_name = "N")]
    read_max: Option<usize>,

    /// Process at most this many records after deleted comments are dropped.
    #[arg(long, value_name = "N")]
    process_max: Option<usize>,

    /// Drop comments whose body is `[deleted]`.
    #[arg(long)]
    ignore_deleted: bool,

    /// Field holding the comment text.
    #[arg(long, default_value = "body")]
    text_field: String,

    /// Keep only comments from these subreddits.
    #[arg(long, num_args = 1.., value_name = "NAME")]
    keep_subreddits: Vec<String>,

    /// Drop comments from these subreddits.
    #[arg(long, num_args = 1.., value_name = "NAME")]
    strip_subreddits: Vec<String>,

    /// Keep only these fields (`id` and `parent_id` are always kept).
    #[arg(long, num_args = 1.., value_name = "FIELD")]
    keep_fields: Vec<String>,

    /// Remove these fields (`id` and `parent_id` are never removed).
    #[arg(long, num_args = 1.., value_name = "FIELD")]
    strip_fields: Vec<String>,

    /// Replace runs of special characters in the text with a space.
    #[arg(long)]
    strip_specials: bool,

    /// Replace runs of digits in the text with a space.
    #[arg(long)]
    strip_digits: bool,

    /// Trim the text and collapse inner whitespace.
    #[arg(long)]
    trim_whitespace: bool,

    #[arg(long)]
    to_lower: bool,

    /// Split the text into a token array.
    #[arg(long)]
    tokenize: bool,

    /// Minimum text length (characters, or tokens once tokenized).
    #[arg(long, value_name = "N")]
    min_length: Option<usize>,

    /// Maximum text length (characters, or tokens once tokenized).
    #[arg(long, value_name = "N")]
    max_length: Option<usize>,

    /// Print every record as a JSON line.
    #[arg(long)]
    show_records: bool,

    /// Render unix timestamps in printed records as RFC 3339.
    #[arg(long)]
    human_timestamps: bool,

    /// Print `child<TAB>parent` id pairs.
    #[arg(long)]
    pairs: bool,

    /// Keep the tagged parent id (`t1_..`) in printed records and id pairs.
    #[arg(long)]
    keep_parent: bool,

    /// Rebuild and print conversation threads (holds all comments in memory).
    #[arg(long)]
    conversations: bool,

    /// Print at most this many threads.
    #[arg(long, value_name = "N", requires = "conversations")]
    max_threads: Option<usize>,

    /// Leave out the `id, author:` line above each comment.
    #[arg(long)]
    no_header: bool,

    /// Print the vocabulary of the text field.
    #[arg(long)]
    vocab: bool,

    #[arg(long)]
    by_count: bool,

    #[arg(long)]
    by_index: bool,

    #[arg(long)]
    by_word: bool,

    #[arg(long)]
    reverse: bool,

    /// Only print vocabulary size and total word count.
    #[arg(long)]
    brief: bool,

    /// Print per-subreddit comment counts and reply statistics.
    #[arg(long)]
    summary: bool,

    /// Print the set of fields.
    #[arg(long)]
    list_fields: bool,

    /// Print how often each field occurs.
    #[arg(long)]
    count_fields: bool,

    /// Print the values each field takes (can use a lot of memory).
    #[arg(long)]
    count_field_values: bool,

    /// Write parent/child body pairs to this file (two passes over the input).
    #[arg(long, value_name = "OUT", conflicts_with_all = ["pairs", "conversations", "show_records"])]
    dump_pairs: Option<PathBuf>,

    /// Show a byte progress bar on stderr.
    #[arg(long)]
    progress: bool,

    /// Reader buffer size in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = 256 * 1024)]
    read_buffer: usize,
}

impl Args {
    fn options(&self) -> PipelineOptions {
        let subreddits = if !self.keep_subreddits.is_empty() {
            SubredditFilter::keep(&self.keep_subreddits)
        } else if !self.strip_subreddits.is_empty() {
            SubredditFilter::strip(&self.strip_subreddits)
        } else {
            SubredditFilter::All
        };
        let fields = if !self.keep_fields.is_empty() {
            FieldFilter::Keep(self.keep_fields.clone())
        } else if !self.strip_fields.is_empty() {
            FieldFilter::Strip(self.strip_fields.clone())
        } else {
            FieldFilter::All
        };
        let preprocess = Preprocess {
            strip_specials: self.strip_specials,
            strip_digits: self.strip_digits,
            trim_whitespace: self.trim_whitespace,
            to_lower: self.to_lower,
            tokenize: self.tokenize,
        };
        let mut opts = PipelineOptions::default()
            .with_inputs(&self.inputs)
            .with_date_range(self.start, self.end)
            .with_ignore_deleted(self.ignore_deleted)
            .with_subreddits(subreddits)
            .with_fields(fields)
            .with_text_field(self.text_field.clone())
            .with_preprocess(preprocess)
            .with_length_bounds(self.min_length, self.max_length)
            .with_io_read_buffer(self.read_buffer)
            .with_progress(self.progress)
            .with_human_timestamps(self.human_timestamps);
        if let Some(n) = self.read_max {
            opts = opts.with_read_max(n);
        }
        if let Some(n) = self.process_max {
            opts = opts.with_process_max(n);
        }
        opts
    }

    fn tasks(&self) -> Tasks {
        let want_fields = self.list_fields || self.count_fields || self.count_field_values;
        Tasks {
            summary: self.summary.then(ForumStats::new),
            fields: want_fields.then(|| FieldStats::new(self.count_field_values)),
            vocab: self.vocab.then(|| Vocabulary::for_field(self.text_field.clone())),
            show_records: self.show_records,
            keep_parent: self.keep_parent,
            pairs: self.pairs,
            conversations: self.conversations,
            thread_limit: self.max_threads,
            render: RenderOptions {
                show_header: !self.no_header,
                clean: true,
                text_field: self.text_field.clone(),
            },
        }
    }

    fn vocab_order(&self) -> VocabOrder {
        if self.by_count {
            VocabOrder::Count
        } else if self.by_word {
            VocabOrder::Token
        } else {
            VocabOrder::Index
        }
    }
}

fn main() -> Result<()> {
    init_tracing_once();
    let args = Args::parse();
    let pipeline = Pipeline::from_options(args.options());

    if let Some(out) = &args.dump_pairs {
        let n = pipeline.progress_label("Dumping pairs").dump_body_pairs(out)?;
        println!("wrote {n} pairs to {}", out.display());
        return Ok(());
    }

    let mut tasks = args.tasks();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let report = pipeline.run(&mut tasks, &mut out)?;
    tracing::debug!("{:?}", report);

    if let Some(vocab) = &tasks.vocab {
        if args.brief {
            writeln!(out, "{}", vocab.render_brief())?;
        } else {
            writeln!(out, "{}", vocab.render_listing(args.vocab_order(), args.reverse))?;
        }
    }
    if let Some(summary) = &tasks.summary {
        write!(out, "{}", summary.report())?;
    }
    if let Some(fields) = &tasks.fields {
        write!(out, "{}", fields.report(args.count_fields || args.count_field_values))?;
    }
    out.flush()?;
    Ok(())
}
