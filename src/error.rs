use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for stream terminals, comment decoding, vocabulary lookups and input decoding.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed parent id '{0}': expected '<tag>_<id>'")]
    MalformedParentId(String),
    #[error("record {id} is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },
    #[error("reduce called on an empty stream without a seed")]
    EmptyReduce,
    #[error("token '{0}' is not in the vocabulary")]
    UnknownToken(String),
    #[error("index {0} is not in the vocabulary")]
    UnknownIndex(usize),
    #[error("{}:{line}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}:{line}: expected a JSON object", .path.display())]
    NotAnObject { path: PathBuf, line: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
