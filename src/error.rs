//! Error type shared by the parser, the tour primitives and the benchmark
//! driver.

use thiserror::Error as ThisError;

use crate::edge::Edge;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("problem file does not declare a DIMENSION")]
    MissingDimension,
    #[error("unsupported EDGE_WEIGHT_TYPE: {0}")]
    UnsupportedEdgeWeightType(String),
    #[error("unsupported EDGE_WEIGHT_FORMAT: {0}")]
    UnsupportedEdgeWeightFormat(String),
    #[error("invalid distance matrix: {0}")]
    InvalidMatrix(String),
    #[error("not a permutation of 0..{dimension}: {reason}")]
    NotPermutation { dimension: usize, reason: String },
    #[error("edge {0} is not present in the edge set")]
    MissingEdge(Edge),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_matrix(message: impl Into<String>) -> Self {
        Self::InvalidMatrix(message.into())
    }

    pub fn not_permutation(dimension: usize, reason: impl Into<String>) -> Self {
        Self::NotPermutation {
            dimension,
            reason: reason.into(),
        }
    }
}
