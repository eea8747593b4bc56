use std::path::PathBuf;

use thiserror::Error;

use crate::canonical::Signature;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// One half of a coloring has no isomorphic match in the population.
    #[error("lookup failed on {host}: the {side} half of coloring {red} / {blue} is not in the population")]
    LookupFailure {
        host: String,
        side: &'static str,
        red: Signature,
        blue: Signature,
    },

    #[error("{graph} has no embedding into host {host}")]
    NotEmbeddable { host: String, graph: Signature },

    #[error("{phase}: expected partial artifact {part} of {expected}, found none")]
    PartialArtifactMissing {
        phase: String,
        part: String,
        expected: usize,
    },

    #[error("{phase}: partial artifact {part} is corrupt: {reason}")]
    PartialArtifactCorrupt {
        phase: String,
        part: String,
        reason: String,
    },

    /// The no-op partial leaked out of aggregation as if it were a result.
    #[error("aggregation ambiguity: {0}")]
    AggregationAmbiguity(String),

    #[error("unknown host graph name `{0}`")]
    UnknownHostGraph(String),

    #[error("graph has {found} vertices, at most {max} are supported")]
    TooManyVertices { found: usize, max: usize },

    #[error("invalid graph6 string `{input}`: {reason}")]
    InvalidGraph6 { input: String, reason: String },

    #[error("self loop on vertex {0}")]
    SelfLoop(usize),

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Annotates any failure with the host graph and phase that raised it.
    #[error("{phase} phase failed for host {host}")]
    Phase {
        host: String,
        phase: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Strips `Phase` wrappers, returning the error that actually stopped the run.
    pub fn root(&self) -> &Error {
        match self {
            Error::Phase { source, .. } => source.root(),
            other => other,
        }
    }
}
