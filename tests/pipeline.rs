#[path = "common/mod.rs"]
mod common;

use common::*;
use rcthread::{
    discover_inputs, read_records, Correlator, Error, FieldStats, ForumStats, Pipeline, Preprocess,
    SubredditFilter, Tasks, Vocabulary, YearMonth,
};
use serde_json::{json, Value};
use std::path::PathBuf;

fn corpus() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("comments");
    write_monthly_corpus(&dir);
    (tmp, dir)
}

fn run_lines(pipeline: &Pipeline, tasks: &mut Tasks) -> (rcthread::Report, Vec<String>) {
    let mut out = Vec::new();
    let report = pipeline.run(tasks, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    (report, text.lines().map(String::from).collect())
}

/// Directories contribute their RC_YYYY-MM dumps in month order (not name or creation
/// order), clipped to the date range; other names are ignored.
#[test]
fn discover_orders_months_and_applies_range() {
    let (_tmp, dir) = corpus();
    write_plain_lines(&dir.join("notes.txt"), &["x".to_string()]);
    write_plain_lines(&dir.join("RC_2006-13.jsonl"), &["{}".to_string()]);

    let all = discover_inputs(&[dir.clone()], None, None).unwrap();
    let names: Vec<String> = all.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, vec!["RC_2006-01.zst", "RC_2006-02.zst"]);

    let feb = discover_inputs(&[dir.clone()], YearMonth::new(2006, 2), None).unwrap();
    assert_eq!(feb, vec![dir.join("RC_2006-02.zst")]);

    // Explicit files are kept as given, even outside the range.
    let explicit = discover_inputs(&[dir.join("notes.txt")], YearMonth::new(2007, 1), None).unwrap();
    assert_eq!(explicit, vec![dir.join("notes.txt")]);

    assert!(discover_inputs(&[dir.join("absent")], None, None).is_err());
}

/// Plain JSONL input: CRLF endings are stripped and blank lines skipped.
#[test]
fn read_plain_jsonl_with_blank_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("sample.jsonl");
    let mut lines = vec![comment("a", "t3_p").to_string() + "\r", String::new(), "   ".to_string()];
    lines.push(comment("b", "t1_a").to_string());
    write_plain_lines(&path, &lines);

    let records: Vec<_> = read_records(&[path], 8 * 1024, None).map(|r| r.unwrap()).to_list();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].str_field("id"), Some("a"));
    assert_eq!(records[1].str_field("parent_id"), Some("t1_a"));
}

/// Decode failures carry the file and the 1-based line number; non-object lines are
/// rejected too.
#[test]
fn read_reports_decode_errors_with_line_numbers() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.jsonl");
    write_plain_lines(&path, &[comment("a", "t3_p").to_string(), "{not json".to_string(), "[1, 2]".to_string()]);

    let items = read_records(&[path.clone()], 8 * 1024, None).to_list();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    match &items[1] {
        Err(Error::Decode { path: p, line, .. }) => {
            assert_eq!(p, &path);
            assert_eq!(*line, 2);
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(matches!(items[2], Err(Error::NotAnObject { line: 3, .. })));
}

/// A file that cannot be opened surfaces as an I/O error item.
#[test]
fn read_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let items = read_records(&[tmp.path().join("gone.zst")], 8 * 1024, None).to_list();
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(Error::Io(_))));
}

/// Files are chained in order across `.zst` dumps.
#[test]
fn read_zst_corpus_in_month_order() {
    let (_tmp, dir) = corpus();
    let files = discover_inputs(&[dir], None, None).unwrap();
    let ids: Vec<String> = read_records(&files, 64 * 1024, None)
        .map(|r| r.unwrap().str_field("id").unwrap().to_string())
        .to_list();
    assert_eq!(ids, vec!["c1", "c2", "c3", "c4", "c8", "c5", "c6", "c7"]);
}

/// `--pairs`: one `child<TAB>parent` line per reply whose parent came earlier, across
/// month boundaries.
#[test]
fn run_prints_id_pairs() {
    let (_tmp, dir) = corpus();
    let mut tasks = Tasks { pairs: true, ..Tasks::default() };
    let (report, lines) = run_lines(&Pipeline::new().input(&dir), &mut tasks);
    assert_eq!(report.comments, 8);
    assert_eq!(report.pairs, 5);
    assert_eq!(lines, vec!["c2\tc1", "c3\tc1", "c4\tc2", "c5\tc2", "c7\tc6"]);
}

/// Ignoring deleted comments drops them before pairing.
#[test]
fn run_ignores_deleted() {
    let (_tmp, dir) = corpus();
    let mut tasks = Tasks { pairs: true, ..Tasks::default() };
    let (report, lines) = run_lines(&Pipeline::new().input(&dir).ignore_deleted(true), &mut tasks);
    assert_eq!(report.comments, 7);
    assert!(!lines.contains(&"c7\tc6".to_string()));
}

/// Printed records carry the bare parent id unless the tagged one is asked for, and
/// timestamps can be rendered as RFC 3339.
#[test]
fn run_shows_records() {
    let (_tmp, dir) = corpus();
    let pipeline = Pipeline::new().input(&dir).read_max(2).timestamps_human_readable(true);
    let mut tasks = Tasks { show_records: true, ..Tasks::default() };
    let (_, lines) = run_lines(&pipeline, &mut tasks);
    assert_eq!(lines.len(), 2);
    let first: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(first["parent_id"], "post");
    assert_eq!(first["created_utc"], "2006-01-01T00:00:00Z");

    let mut tasks = Tasks { show_records: true, keep_parent: true, ..Tasks::default() };
    let (_, lines) = run_lines(&Pipeline::new().input(&dir).read_max(2), &mut tasks);
    let second: Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(second["parent_id"], "t1_c1");
    assert_eq!(second["created_utc"], 1136073600);
}

/// `read_max` caps records read, `process_max` caps records kept, and subreddit
/// filters apply after both.
#[test]
fn run_limits_and_subreddit_filter() {
    let (_tmp, dir) = corpus();
    let (r, _) = run_lines(&Pipeline::new().input(&dir).read_max(3), &mut Tasks::default());
    assert_eq!(r.comments, 3);
    let (r, _) = run_lines(&Pipeline::new().input(&dir).process_max(2), &mut Tasks::default());
    assert_eq!(r.comments, 2);
    let rust = Pipeline::new().input(&dir).subreddits(SubredditFilter::keep(["r/Rust"]));
    let (r, _) = run_lines(&rust, &mut Tasks::default());
    assert_eq!(r.comments, 1);
    let no_rust = Pipeline::new().input(&dir).subreddits(SubredditFilter::strip(["rust"]));
    let (r, _) = run_lines(&no_rust, &mut Tasks::default());
    assert_eq!(r.comments, 7);
}

/// Accumulators wired into a run are readable afterwards; the vocabulary sees the
/// preprocessed text and length filters drop comments after preprocessing.
#[test]
fn run_feeds_accumulators() {
    let (_tmp, dir) = corpus();
    let pipeline = Pipeline::new()
        .input(&dir)
        .preprocess(Preprocess { tokenize: true, to_lower: true, ..Preprocess::default() })
        .length_bounds(None, Some(2));
    let mut tasks = Tasks {
        summary: Some(ForumStats::new()),
        fields: Some(FieldStats::new(false)),
        vocab: Some(Vocabulary::new()),
        ..Tasks::default()
    };
    let (report, _) = run_lines(&pipeline, &mut tasks);
    // Only "Hello Rust" and "[deleted]" have at most two tokens.
    assert_eq!(report.comments, 2);
    let summary = tasks.summary.as_ref().unwrap();
    assert_eq!(summary.comments, 8);
    assert_eq!(summary.deleted, 1);
    assert_eq!(tasks.fields.as_ref().unwrap().field_count("id"), 8);
    let vocab = tasks.vocab.as_ref().unwrap();
    assert_eq!(vocab.tokens(), ["hello", "rust", "[deleted]"]);
}

/// `--conversations` prints every thread in input order, each comment once.
#[test]
fn run_renders_conversations() {
    let (_tmp, dir) = corpus();
    let mut tasks = Tasks { conversations: true, ..Tasks::default() };
    let (report, lines) = run_lines(&Pipeline::new().input(&dir), &mut tasks);
    assert_eq!(report.threads, 3);
    let headers: Vec<&str> = lines.iter().map(String::as_str).filter(|l| l.trim_start().starts_with("- ")).collect();
    assert_eq!(headers, vec![
        "- c1, user_c1:",
        "    - c2, user_c2:",
        "        - c4, user_c4:",
        "        - c5, user_c5:",
        "    - c3, user_c3:",
        "- c8, dana:",
        "- c6, user_c6:",
        "    - c7, [deleted]:",
    ]);

    let mut tasks = Tasks { conversations: true, thread_limit: Some(1), ..Tasks::default() };
    let (report, _) = run_lines(&Pipeline::new().input(&dir), &mut tasks);
    assert_eq!(report.threads, 1);
}

/// The two-phase dump writes the same tab separated pairs as a single pass, parent text
/// first, and leaves no temp file behind.
#[test]
fn dump_body_pairs_matches_single_pass() {
    let (tmp, dir) = corpus();
    let out = tmp.path().join("out").join("pairs.tsv");
    let n = Pipeline::new().input(&dir).dump_body_pairs(&out).unwrap();
    assert_eq!(n, 5);

    let files = discover_inputs(&[dir], None, None).unwrap();
    let mut failure = None;
    let single: Vec<String> = Correlator::new()
        .body_pairs(
            read_records(&files, 8 * 1024, None)
                .map(|r| r.and_then(rcthread::Comment::from_record))
                .until_err(&mut failure),
        )
        .map(|p| p.to_string())
        .to_list();
    assert!(failure.is_none());
    assert_eq!(read_lines(&out), single);
    assert_eq!(single[0], "body of c1\tbody of c2");
    assert!(!tmp.path().join("out").join("pairs.tsv.part").exists());
}

/// A malformed parent id stops the run with an error instead of being skipped; a failed
/// dump leaves neither the output nor its temp file.
#[test]
fn malformed_input_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("RC_2006-01.jsonl");
    write_plain_lines(&path, &lines_of(&[comment("c1", "t3_p"), comment("bad", "nounderscore"), comment("c2", "t1_c1")]));

    let mut out = Vec::new();
    let err = Pipeline::new().input(&path).run(&mut Tasks { pairs: true, ..Tasks::default() }, &mut out).unwrap_err();
    assert!(err.chain().any(|e| e.to_string().contains("malformed parent id 'nounderscore'")));

    let dest = tmp.path().join("pairs.tsv");
    assert!(Pipeline::new().input(&path).dump_body_pairs(&dest).is_err());
    assert!(!dest.exists());
    assert!(!tmp.path().join("pairs.tsv.part").exists());
}

/// `write_pairs` writes one line per pair through the temp file and reports the count.
#[test]
fn write_pairs_renames_into_place() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("ids.tsv");
    let pairs = Correlator::new().id_pairs(stream_of(thread_values()));
    let n = rcthread::write_pairs(&dest, pairs).unwrap();
    assert_eq!(n, 3);
    assert_eq!(read_lines(&dest), vec!["c2\tc1", "c3\tc1", "c4\tc2"]);
    assert!(!tmp.path().join("ids.tsv.part").exists());
}

/// Runs without a forum task accept JSON objects that carry no forum fields: field
/// stats, preprocessing and the vocabulary work on any text field. Asking for the
/// summary over the same input still requires `id`.
#[test]
fn run_accepts_generic_json() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("data.jsonl");
    write_plain_lines(
        &path,
        &lines_of(&[json!({"title": "hello world", "score": 3}), json!({"title": "Hello there", "score": 5})]),
    );
    let pipeline = Pipeline::new()
        .input(&path)
        .text_field("title")
        .preprocess(Preprocess { tokenize: true, to_lower: true, ..Preprocess::default() });
    let mut tasks = Tasks {
        fields: Some(FieldStats::new(true)),
        vocab: Some(Vocabulary::for_field("title")),
        show_records: true,
        ..Tasks::default()
    };
    let (report, lines) = run_lines(&pipeline, &mut tasks);
    assert_eq!(report.comments, 2);
    let fields = tasks.fields.as_ref().unwrap();
    assert_eq!(fields.field_count("title"), 2);
    assert_eq!(fields.value_count("score", "3"), 1);
    assert_eq!(tasks.vocab.as_ref().unwrap().tokens(), ["hello", "world", "there"]);
    let first: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(first, json!({"title": ["hello", "world"], "score": 3}));

    let mut out = Vec::new();
    let mut forum = Tasks { summary: Some(ForumStats::new()), ..Tasks::default() };
    let err = pipeline.run(&mut forum, &mut out).unwrap_err();
    assert!(err.chain().any(|e| e.to_string().contains("'id'")));
}

/// `keep_parent` prints the tagged parent id in id pairs as well.
#[test]
fn run_prints_tagged_parents_when_kept() {
    let (_tmp, dir) = corpus();
    let mut tasks = Tasks { pairs: true, keep_parent: true, ..Tasks::default() };
    let (_, lines) = run_lines(&Pipeline::new().input(&dir), &mut tasks);
    assert_eq!(lines[0], "c2\tt1_c1");
    assert_eq!(lines.len(), 5);
}

/// When the corpus cannot be moved into place, `write_pairs` fails and removes its
/// temp file.
#[test]
fn write_pairs_failure_leaves_no_temp_file() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("ids.tsv");
    write_plain_lines(&dest.join("occupied"), &["x".to_string()]);
    let pairs = Correlator::new().id_pairs(stream_of(thread_values()));
    assert!(rcthread::write_pairs(&dest, pairs).is_err());
    assert!(dest.is_dir());
    assert!(!tmp.path().join("ids.tsv.part").exists());
}
