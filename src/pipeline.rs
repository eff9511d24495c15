use crate::accumulate::{FieldStats, ForumStats};
use crate::config::{FieldFilter, PipelineOptions, SubredditFilter};
use crate::correlate::{Correlator, IdPair, ReplyIndex};
use crate::date::YearMonth;
use crate::error::Error;
use crate::forest::{RenderOptions, ThreadForest};
use crate::pairs::PairWriter;
use crate::paths::discover_inputs;
use crate::preprocess::{text_length, Preprocess};
use crate::progress::{make_progress_bar_labeled, total_size};
use crate::record::{Comment, Record};
use crate::source::read_records;
use crate::stream::Stream;
use crate::util::init_tracing_once;
use crate::vocab::Vocabulary;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Builder over `PipelineOptions`; runs the comment pipeline against the configured inputs.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    pub(crate) opts: PipelineOptions,
}

/// What a `run` does besides draining the stream. Accumulators are read back afterwards.
#[derive(Debug, Default)]
pub struct Tasks {
    pub summary: Option<ForumStats>,
    pub fields: Option<FieldStats>,
    pub vocab: Option<Vocabulary>,
    /// Print each record as one JSON line.
    pub show_records: bool,
    /// Keep `parent_id` as `<tag>_<id>` in printed records and id pairs.
    pub keep_parent: bool,
    /// Print `child<TAB>parent` id pairs as they are found.
    pub pairs: bool,
    /// Materialize the comments and print their conversation trees.
    pub conversations: bool,
    pub thread_limit: Option<usize>,
    pub render: RenderOptions,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Records that reached the end of the pipeline.
    pub comments: u64,
    pub pairs: u64,
    pub threads: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn from_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn input(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input(path); self }
    pub fn inputs<I, P>(mut self, paths: I) -> Self where I: IntoIterator<Item = P>, P: AsRef<Path> { self.opts = self.opts.with_inputs(paths); self }
    pub fn date_range(mut self, start: Option<YearMonth>, end: Option<YearMonth>) -> Self { self.opts = self.opts.with_date_range(start, end); self }
    pub fn read_max(mut self, n: usize) -> Self { self.opts = self.opts.with_read_max(n); self }
    pub fn process_max(mut self, n: usize) -> Self { self.opts = self.opts.with_process_max(n); self }
    pub fn ignore_deleted(mut self, yes: bool) -> Self { self.opts = self.opts.with_ignore_deleted(yes); self }
    pub fn subreddits(mut self, filter: SubredditFilter) -> Self { self.opts = self.opts.with_subreddits(filter); self }
    pub fn fields(mut self, filter: FieldFilter) -> Self { self.opts = self.opts.with_fields(filter); self }
    pub fn text_field(mut self, field: impl Into<String>) -> Self { self.opts = self.opts.with_text_field(field); self }
    pub fn preprocess(mut self, pre: Preprocess) -> Self { self.opts = self.opts.with_preprocess(pre); self }
    pub fn length_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self { self.opts = self.opts.with_length_bounds(min, max); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn timestamps_human_readable(mut self, yes: bool) -> Self { self.opts = self.opts.with_human_timestamps(yes); self }

    /// Input files in reading order.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let files = discover_inputs(&self.opts.inputs, self.opts.start, self.opts.end)
            .context("discover inputs")?;
        tracing::info!("planned {} input files", files.len());
        Ok(files)
    }

    fn progress_bar(&self, files: &[PathBuf], label: Option<&str>) -> Option<ProgressBar> {
        if !self.opts.progress {
            return None;
        }
        let label = label.or(self.opts.progress_label.as_deref());
        Some(make_progress_bar_labeled(total_size(files), label))
    }

    /// True when a task or filter reads forum fields. Such runs decode every record
    /// into a `Comment`; the rest treat the input as generic JSON objects.
    fn needs_comments(&self, tasks: &Tasks) -> bool {
        tasks.summary.is_some()
            || tasks.pairs
            || tasks.conversations
            || self.opts.ignore_deleted
            || self.opts.subreddits != SubredditFilter::All
    }

    /// Raw records after the read and process limits and the field filter.
    fn record_results(&self, files: &[PathBuf], progress: Option<ProgressBar>) -> Stream<'static, crate::Result<Record>> {
        let opts = &self.opts;
        let mut records = read_records(files, opts.read_buffer_bytes, progress);
        if let Some(n) = opts.read_max {
            records = records.take(n);
        }
        if let Some(n) = opts.process_max {
            records = records.take(n);
        }
        if opts.fields != FieldFilter::All {
            let fields = opts.fields.clone();
            records = records.map(move |r| r.map(|rec| fields.apply(rec)));
        }
        records
    }

    /// Decoded comments after limits, deleted filtering, subreddit and field filters.
    /// Source and decode errors stay in the stream.
    fn comment_results(&self, files: &[PathBuf], progress: Option<ProgressBar>) -> Stream<'static, crate::Result<Comment>> {
        let opts = &self.opts;
        let mut records = read_records(files, opts.read_buffer_bytes, progress);
        if let Some(n) = opts.read_max {
            records = records.take(n);
        }
        let mut comments = records.map(|r| r.and_then(Comment::from_record));
        if opts.ignore_deleted {
            comments = comments.filter(|r| !matches!(r, Ok(c) if c.is_deleted()));
        }
        if let Some(n) = opts.process_max {
            comments = comments.take(n);
        }
        if opts.subreddits != SubredditFilter::All {
            let subs = opts.subreddits.clone();
            comments = comments.filter(move |r| r.as_ref().map_or(true, |c| subs.accepts(c.subreddit())));
        }
        if opts.fields != FieldFilter::All {
            let fields = opts.fields.clone();
            comments = comments.map(move |r| r.map(|c| c.map_record(|rec| fields.apply(rec))));
        }
        comments
    }

    /// Preprocessing of the text field followed by the length filters.
    fn record_stage(&self) -> impl FnMut(Record) -> Option<Record> + 'static {
        let opts = self.opts.clone();
        move |r| {
            let r = opts.preprocess.apply(r, &opts.text_field);
            let len = text_length(&r, &opts.text_field);
            opts.length_ok(len).then_some(r)
        }
    }

    fn text_stage(&self) -> impl FnMut(Comment) -> Option<Comment> + 'static {
        let opts = self.opts.clone();
        move |c| {
            let c = opts.preprocess.apply_comment(c, &opts.text_field);
            let len = text_length(c.record(), &opts.text_field);
            opts.length_ok(len).then_some(c)
        }
    }

    /// The filtered comment stream, before preprocessing. The first source or decode
    /// error ends the stream and is parked in `failure`.
    pub fn comments<'a>(&self, failure: &'a mut Option<Error>) -> Result<Stream<'a, Comment>> {
        let files = self.files()?;
        let pb = self.progress_bar(&files, None);
        Ok(self.comment_results(&files, pb).until_err(failure))
    }

    /// The limited, field-filtered record stream. No forum field is required.
    pub fn records<'a>(&self, failure: &'a mut Option<Error>) -> Result<Stream<'a, Record>> {
        let files = self.files()?;
        let pb = self.progress_bar(&files, None);
        Ok(self.record_results(&files, pb).until_err(failure))
    }

    /// Run one pass: accumulators, optional record and pair printing, then either
    /// conversation rendering or a plain drain. Runs without a forum task accept any
    /// JSON objects.
    pub fn run<W: Write>(&self, tasks: &mut Tasks, out: &mut W) -> Result<Report> {
        init_tracing_once();
        if self.needs_comments(tasks) {
            self.run_comments(tasks, out)
        } else {
            self.run_records(tasks, out)
        }
    }

    fn run_records<W: Write>(&self, tasks: &mut Tasks, out: &mut W) -> Result<Report> {
        let mut report = Report::default();
        let mut failure = None;
        let show_records = tasks.show_records;
        let keep_parent = tasks.keep_parent;
        let human_ts = self.opts.human_readable_timestamps;
        {
            let mut stream = self.records(&mut failure)?;
            if let Some(fields) = tasks.fields.as_mut() {
                stream = stream.observe(fields);
            }
            stream = stream.flat_map(self.record_stage());
            if let Some(vocab) = tasks.vocab.as_mut() {
                stream = stream.observe(vocab);
            }
            for rec in stream {
                report.comments += 1;
                if show_records {
                    let rec = if keep_parent { rec } else { rec.with_bare_parent_id() };
                    let rec = if human_ts { rec.with_human_timestamps() } else { rec };
                    writeln!(out, "{}", serde_json::to_string(&rec)?)?;
                }
            }
        }
        if let Some(e) = failure {
            return Err(e).context("reading records");
        }
        tracing::info!("processed {} records", report.comments);
        out.flush()?;
        Ok(report)
    }

    fn run_comments<W: Write>(&self, tasks: &mut Tasks, out: &mut W) -> Result<Report> {
        let mut report = Report::default();
        let mut failure = None;
        let show_records = tasks.show_records;
        let keep_parent = tasks.keep_parent;
        let pairs = tasks.pairs;
        let conversations = tasks.conversations;
        let human_ts = self.opts.human_readable_timestamps;
        let mut kept: Vec<Comment> = Vec::new();
        {
            let mut stream = self.comments(&mut failure)?;
            if let Some(summary) = tasks.summary.as_mut() {
                stream = stream.observe(summary);
            }
            if let Some(fields) = tasks.fields.as_mut() {
                stream = stream.observe(fields);
            }
            stream = stream.flat_map(self.text_stage());
            if let Some(vocab) = tasks.vocab.as_mut() {
                stream = stream.observe(vocab);
            }

            let mut index: ReplyIndex<()> = ReplyIndex::new();
            for c in stream {
                report.comments += 1;
                if show_records {
                    let rec = if keep_parent { c.record().clone() } else { c.normalized_record() };
                    let rec = if human_ts { rec.with_human_timestamps() } else { rec };
                    writeln!(out, "{}", serde_json::to_string(&rec)?)?;
                }
                if pairs && index.step(&c, ()).is_some() {
                    let parent = if keep_parent { c.parent().to_string() } else { c.parent_id().to_string() };
                    let pair = IdPair { child: c.id().to_string(), parent };
                    writeln!(out, "{pair}")?;
                    report.pairs += 1;
                }
                if conversations {
                    kept.push(c);
                }
            }
        }
        if let Some(e) = failure {
            return Err(e).context("reading comments");
        }
        tracing::info!("processed {} comments", report.comments);
        if conversations {
            let mut forest = ThreadForest::new(kept);
            report.threads = forest
                .render_all(tasks.thread_limit, &tasks.render, out)
                .context("render conversations")?;
        }
        out.flush()?;
        Ok(report)
    }

    /// Two-phase body pair extraction into a tab separated corpus at `dest`.
    /// Reads the inputs twice; pass two only keeps comments that take part in a pair.
    /// Returns the number of pairs written.
    pub fn dump_body_pairs(&self, dest: &Path) -> Result<u64> {
        init_tracing_once();
        let files = self.files()?;
        let correlator = Correlator::new().with_text_field(self.opts.text_field.clone());
        let mut writer = PairWriter::create(dest, self.opts.read_buffer_bytes)?;
        let mut failure = None;
        let mut pass = 0;
        let mut write_err = None;
        {
            let pairs = correlator.two_phase_body_pairs(
                || {
                    pass += 1;
                    let name = self.opts.progress_label.as_deref().unwrap_or("pairs");
                    let label = format!("{name} (pass {pass}/2)");
                    let mut stage = self.text_stage();
                    self.comment_results(&files, self.progress_bar(&files, Some(label.as_str())))
                        .flat_map(move |r| match r {
                            Ok(c) => stage(c).map(Ok),
                            Err(e) => Some(Err(e)),
                        })
                },
                &mut failure,
            );
            for p in pairs {
                if let Err(e) = writer.write_pair(&p) {
                    write_err = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = write_err {
            writer.abandon();
            return Err(e);
        }
        if let Some(e) = failure {
            writer.abandon();
            return Err(e).context("reading comments");
        }
        let n = writer.finish()?;
        tracing::info!("wrote {} body pairs to {}", n, dest.display());
        Ok(n)
    }
}
