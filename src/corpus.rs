// imports
use crate::context::compute_context_into;
use crate::error::{ExtractError, Result};
use crate::sinks::SinkPool;
use crate::vocabulary::{ControlTokens, TokenMode, Vocabulary};
use crate::window::ContextWindow;

use flate2::read::GzDecoder;
use ndarray::Array1;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;


#[derive(Clone, Debug)]
pub struct WalkSettings {
    pub context_size: usize,
    pub mode: TokenMode,
    pub eod_marker: String,
    pub controls: ControlTokens,
    pub progress_every: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files: usize,
    pub documents: usize,
    pub tokens: usize,
    pub unresolved: usize,
    pub centers: usize, // centers visited, before range and quota filtering
    pub emitted: usize,
}

// the token itself stays in the walker's line buffer
enum Line {
    Token,
    EndOfDocument,
}

// lifecycle of one document
enum Phase {
    Prime,
    Stream,
    Drain,
    Done,
}

/// Streams corpus files document by document through a context window and hands
/// every centered token to the sink pool.
pub struct CorpusWalker<'a> {
    vocab: &'a Vocabulary,
    settings: WalkSettings,
    window: ContextWindow,
    context: Array1<f32>,
    pending: usize, // real tokens pushed into the window and not centered yet
    doc_tokens: usize,
    line: Vec<u8>,
    stats: WalkStats,
}

impl<'a> CorpusWalker<'a> {

    pub fn new(vocab: &'a Vocabulary, settings: WalkSettings) -> Self {
        Self {
            vocab,
            window: ContextWindow::new(settings.context_size),
            context: Array1::zeros(vocab.dim()),
            pending: 0,
            doc_tokens: 0,
            line: Vec::new(),
            stats: WalkStats::default(),
            settings,
        }
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Corpus files of `dir` named `*.<extension>` or `*.<extension>.gz`, in path order.
    pub fn corpus_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {

        let read_err = |source| ExtractError::Read { path: dir.to_path_buf(), source };
        let plain = format!(".{}", extension);
        let gzipped = format!(".{}.gz", extension);

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            if path.is_file() && (name.ends_with(&plain) || name.ends_with(&gzipped)) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn walk_dir(&mut self, dir: &Path, extension: &str, sinks: &mut SinkPool) -> Result<WalkStats> {
        for path in CorpusWalker::corpus_files(dir, extension)? {
            self.walk_file(&path, sinks)?;
        }
        Ok(self.stats)
    }

    pub fn walk_file(&mut self, path: &Path, sinks: &mut SinkPool) -> Result<()> {

        info!("reading corpus file {}", path.display());
        let f = File::open(path).map_err(|source| ExtractError::Read { path: path.to_path_buf(), source })?;

        let is_gz = path.extension().map_or(false, |ext| ext == "gz");
        if is_gz {
            self.walk_reader(BufReader::new(GzDecoder::new(f)), sinks)?;
        } else {
            self.walk_reader(BufReader::new(f), sinks)?;
        }
        self.stats.files += 1;
        Ok(())
    }

    /// Walks every document of one token-per-line stream.
    pub fn walk_reader<R: BufRead>(&mut self, mut reader: R, sinks: &mut SinkPool) -> Result<()> {
        let mut exhausted = false;
        while !exhausted {
            exhausted = self.walk_document(&mut reader, sinks)?;
        }
        Ok(())
    }

    // returns true once the stream has no lines left
    fn walk_document<R: BufRead>(&mut self, reader: &mut R, sinks: &mut SinkPool) -> Result<bool> {

        let half_width = self.settings.context_size;
        let ControlTokens { start, end } = self.settings.controls;
        let mut exhausted = false;
        let mut phase = Phase::Prime;

        loop {
            phase = match phase {

                Phase::Prime => {
                    self.window.clear();
                    self.pending = 0;
                    self.doc_tokens = 0;
                    for _ in 0..half_width {
                        self.window.push_back(Some(start));
                    }

                    let mut next = Phase::Stream;
                    for _ in 0..=half_width {
                        match self.next_line(reader)? {
                            Some(Line::Token) => self.push_token()?,
                            Some(Line::EndOfDocument) => { next = Phase::Drain; break }
                            None => { exhausted = true; next = Phase::Drain; break }
                        }
                    }
                    next
                }

                Phase::Stream => {
                    loop {
                        match self.next_line(reader)? {
                            Some(Line::Token) => {
                                self.emit_center(sinks)?;
                                self.window.pop_front();
                                self.push_token()?;
                            }
                            Some(Line::EndOfDocument) => break,
                            None => { exhausted = true; break }
                        }
                    }
                    Phase::Drain
                }

                // pad with end sentinels and rotate until the last real token was centered
                Phase::Drain => {
                    while self.pending > 0 {
                        while !self.window.is_full() {
                            self.window.push_back(Some(end));
                        }
                        self.emit_center(sinks)?;
                        self.window.pop_front();
                        self.window.push_back(Some(end));
                    }
                    Phase::Done
                }

                Phase::Done => {
                    if self.doc_tokens > 0 {
                        self.stats.documents += 1;
                        if self.stats.documents % self.settings.progress_every.max(1) == 0 {
                            info!("{} documents processed", self.stats.documents);
                        }
                    }
                    break
                }
            };
        }

        Ok(exhausted)
    }

    // lines are raw bytes, a line that is not utf-8 is still a token
    fn next_line<R: BufRead>(&mut self, reader: &mut R) -> Result<Option<Line>> {
        self.line.clear();
        if reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None)
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        if self.line == self.settings.eod_marker.as_bytes() {
            Ok(Some(Line::EndOfDocument))
        } else {
            Ok(Some(Line::Token))
        }
    }

    fn push_token(&mut self) -> Result<()> {
        let slot = self.vocab.resolve_bytes(&self.line, self.settings.mode)?;
        if slot.is_none() {
            self.stats.unresolved += 1;
        }
        self.stats.tokens += 1;
        self.doc_tokens += 1;
        self.pending += 1;
        self.window.push_back(slot);
        Ok(())
    }

    // the range and quota check runs before the (expensive) weighted sum
    fn emit_center(&mut self, sinks: &mut SinkPool) -> Result<()> {

        self.pending -= 1;
        self.stats.centers += 1;

        let center = match self.window.center() {
            Some(Some(index)) => index,
            _ => return Ok(())
        };
        if !sinks.accepts(center) {
            return Ok(())
        }

        compute_context_into(&self.window, self.vocab.idf(), self.vocab.embeddings(), &mut self.context);
        if sinks.emit(center, self.context.view())? {
            self.stats.emitted += 1;
        }
        Ok(())
    }

}
