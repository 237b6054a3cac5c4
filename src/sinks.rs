use crate::error::{ExtractError, Result};
use crate::limits::DescriptorBudget;
use ndarray::{Array2, ArrayView1};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SINK_EXTENSION: &str = "vectors";


/// The contiguous block of vocabulary indices that get an output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveRange {
    from: usize,
    len: usize,
}

impl ActiveRange {

    /// `[from, from + min(prune, vocab_size - from))`, where a `prune` of 0 keeps the whole tail.
    pub fn new(vocab_size: usize, from: usize, prune: usize) -> Result<ActiveRange> {
        if from > vocab_size {
            return Err(ExtractError::Config(format!("from {} is past the vocabulary size {}", from, vocab_size)));
        }
        let mut len = vocab_size - from;
        if prune > 0 && prune < len {
            len = prune;
        }
        Ok(Self { from, len })
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn indices(&self) -> Range<usize> {
        self.from..self.from + self.len
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }

    /// Position of `index` in the sink arena.
    pub fn slot(&self, index: usize) -> Option<usize> {
        if self.contains(index) { Some(index - self.from) } else { None }
    }
}


/// Per-word cap on emitted contexts. One index, by default 0, gets `boost_factor` times the cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub max_contexts: usize, // 0 = unlimited
    pub boosted_index: usize,
    pub boost_factor: usize,
}

impl QuotaPolicy {

    pub fn new(max_contexts: usize) -> Self {
        Self { max_contexts, boosted_index: 0, boost_factor: 2 }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn quota_for(&self, index: usize) -> Option<usize> {
        match self.max_contexts {
            0 => None,
            n if index == self.boosted_index => Some(n.saturating_mul(self.boost_factor)),
            n => Some(n)
        }
    }
}


struct Sink {
    writer: Option<BufWriter<File>>, // None once the quota closed it
    emitted: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub opened: usize,
    pub closed_by_quota: usize,
    pub records: usize,
}

/// One append-only output file per active index, created up front.
pub struct SinkPool {
    range: ActiveRange,
    sinks: Vec<Sink>,
    quota: QuotaPolicy,
    dim: usize,
    flush_every: usize,
}

impl SinkPool {

    pub fn sink_path(output_dir: &Path, index: usize) -> PathBuf {
        output_dir.join(format!("{}.{}", index, SINK_EXTENSION))
    }

    /// Creates `<output_dir>/<index>.vectors` for every index of `range`. Any file that
    /// cannot be created aborts the whole pool.
    pub fn open(budget: &DescriptorBudget, range: ActiveRange, output_dir: &Path, dim: usize, quota: QuotaPolicy, flush_every: usize) -> Result<SinkPool> {

        let required = range.len() as u64;
        if budget.granted() < required {
            return Err(ExtractError::InsufficientBudget { granted: budget.granted(), required });
        }

        let mut sinks = Vec::with_capacity(range.len());
        for index in range.indices() {
            let path = SinkPool::sink_path(output_dir, index);
            let f = File::create(&path).map_err(|source| ExtractError::SinkCreate { path, source })?;
            sinks.push(Sink { writer: Some(BufWriter::new(f)), emitted: 0 });
        }

        info!("opened {} output files in {}", sinks.len(), output_dir.display());
        Ok(Self {
            range,
            sinks,
            quota,
            dim,
            flush_every: flush_every.max(1),
        })
    }

    pub fn range(&self) -> ActiveRange {
        self.range
    }

    pub fn emitted(&self, index: usize) -> usize {
        self.range.slot(index).map_or(0, |slot| self.sinks[slot].emitted)
    }

    /// Whether a context for `index` would be written. Checked before computing it.
    pub fn accepts(&self, index: usize) -> bool {
        match self.range.slot(index) {
            Some(slot) => self.sinks[slot].writer.is_some(),
            None => false
        }
    }

    /// Appends `vector` to the file of `index`. Returns false, writing nothing, when
    /// the index is outside the range or its quota is used up.
    pub fn emit(&mut self, index: usize, vector: ArrayView1<f32>) -> Result<bool> {

        debug_assert_eq!(vector.len(), self.dim);
        let slot = match self.range.slot(index) {
            Some(slot) => slot,
            None => return Ok(false)
        };
        let quota = self.quota.quota_for(index);
        let flush_every = self.flush_every;
        let sink = &mut self.sinks[slot];

        let writer = match sink.writer.as_mut() {
            Some(writer) => writer,
            None => return Ok(false)
        };
        for value in vector.iter() {
            writer.write_all(&value.to_le_bytes())?;
        }
        sink.emitted += 1;
        if sink.emitted % flush_every == 0 {
            writer.flush()?;
        }

        if quota == Some(sink.emitted) {
            if let Some(mut writer) = sink.writer.take() {
                writer.flush()?;
            }
            debug!("finished word {}", index);
        }
        Ok(true)
    }

    /// Flushes and closes every sink still open.
    pub fn finish(self) -> Result<SinkSummary> {

        let mut summary = SinkSummary { opened: self.sinks.len(), ..Default::default() };
        for sink in self.sinks {
            summary.records += sink.emitted;
            match sink.writer {
                Some(mut writer) => writer.flush()?,
                None => summary.closed_by_quota += 1
            }
        }
        Ok(summary)
    }

}


/// Reads an output file back as a `(records, dim)` matrix.
pub fn read_records(path: &Path, dim: usize) -> Result<Array2<f32>> {

    let bytes = fs::read(path).map_err(|source| ExtractError::Read { path: path.to_path_buf(), source })?;
    let corrupt = || ExtractError::Corrupt { path: path.to_path_buf(), len: bytes.len() as u64, dim };
    let width = match dim.checked_mul(4) {
        Some(width) if width > 0 => width,
        _ => return Err(corrupt())
    };
    if bytes.len() % width != 0 {
        return Err(corrupt());
    }

    let values: Vec<f32> = bytes
    .chunks_exact(4)
    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    .collect();
    let records = values.len() / dim;

    Array2::from_shape_vec((records, dim), values).map_err(|_| corrupt())
}
