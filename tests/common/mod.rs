#![allow(dead_code)]

use rcthread::{Comment, Record, Stream};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// A comment record in r/programming (`t5_x`) with a body derived from its id.
pub fn comment(id: &str, parent_id: &str) -> Value {
    json!({
        "id": id, "parent_id": parent_id,
        "author": format!("user_{id}"), "body": format!("body of {id}"),
        "subreddit": "programming", "subreddit_id": "t5_x",
        "created_utc": 1136073600
    })
}

pub fn comment_with(id: &str, parent_id: &str, author: &str, body: &str, subreddit: &str, subreddit_id: &str) -> Value {
    json!({
        "id": id, "parent_id": parent_id, "author": author, "body": body,
        "subreddit": subreddit, "subreddit_id": subreddit_id
    })
}

pub fn record(v: Value) -> Record {
    Record::from_value(v).unwrap()
}

pub fn decode(v: Value) -> Comment {
    Comment::from_record(record(v)).unwrap()
}

pub fn comments(values: Vec<Value>) -> Vec<Comment> {
    values.into_iter().map(decode).collect()
}

pub fn stream_of(values: Vec<Value>) -> Stream<'static, Comment> {
    Stream::new(comments(values))
}

/// The reply chain used across tests: c1 on a post, c2 and c3 on c1, c4 on c2.
pub fn thread_values() -> Vec<Value> {
    vec![
        comment("c1", "t3_post"),
        comment("c2", "t1_c1"),
        comment("c3", "t1_c1"),
        comment("c4", "t1_c2"),
    ]
}

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_plain_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(f, "{}", l).unwrap();
    }
}

pub fn lines_of(values: &[Value]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// Two monthly dumps in one directory, out of name order on purpose:
/// - RC_2006-02.zst: c5 replying to c2 from January, c6 on a post, c7 deleted reply to c6
/// - RC_2006-01.zst: the c1..c4 chain plus c8 in r/rust (`t5_y`)
pub fn write_monthly_corpus(dir: &Path) {
    let jan = vec![
        comment("c1", "t3_post"),
        comment("c2", "t1_c1"),
        comment("c3", "t1_c1"),
        comment("c4", "t1_c2"),
        comment_with("c8", "t3_other", "dana", "Hello Rust", "rust", "t5_y"),
    ];
    let feb = vec![
        comment("c5", "t1_c2"),
        comment("c6", "t3_post2"),
        comment_with("c7", "t1_c6", "[deleted]", "[deleted]", "programming", "t5_x"),
    ];
    write_zst_lines(&dir.join("RC_2006-02.zst"), &lines_of(&feb));
    write_zst_lines(&dir.join("RC_2006-01.zst"), &lines_of(&jan));
}
