mod config;
mod context;
mod corpus;
mod error;
mod limits;
mod pipeline;
mod sinks;
mod vocabulary;
mod window;

pub use config::{files_handling, Config, ExtractParams};
pub use context::{compute_context, compute_context_into};
pub use corpus::{CorpusWalker, WalkSettings, WalkStats};
pub use error::{ExtractError, Result};
pub use limits::{raise_open_file_limit, DescriptorBudget, DESCRIPTOR_HEADROOM};
pub use pipeline::Pipeline;
pub use sinks::{read_records, ActiveRange, QuotaPolicy, SinkPool, SinkSummary, SINK_EXTENSION};
pub use vocabulary::{ControlTokens, TokenMode, Vocabulary};
pub use window::{ContextWindow, Slot};
