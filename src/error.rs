use ndarray_npy::ReadNpyError;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Bad argument list or JSON parameters.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse '{token}' in {} as a number", .path.display())]
    Parse { path: PathBuf, token: String },

    #[error("could not read npy matrix: {0}")]
    Npy(#[from] ReadNpyError),

    /// One of the companion inputs does not line up with the word list.
    #[error("{input} input is misaligned with the vocabulary: expected {expected} values, found {found}")]
    MisalignedInput {
        input: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("control token '{0}' is not in the vocabulary")]
    MissingControlToken(String),

    #[error("pre-indexed token '{0}' is not a valid index")]
    InvalidIndex(String),

    #[error("pre-indexed token {index} is outside the vocabulary of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("could not raise the open file limit to {required}: {source}")]
    DescriptorLimit {
        required: u64,
        #[source]
        source: io::Error,
    },

    #[error("descriptor budget of {granted} cannot hold {required} output files")]
    InsufficientBudget { granted: u64, required: u64 },

    #[error("could not create output file {}: {source}", .path.display())]
    SinkCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} holds {len} bytes, not a whole number of {dim}-dim records", .path.display())]
    Corrupt { path: PathBuf, len: u64, dim: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
