// imports
use crate::config::{files_handling, Config, ExtractParams};
use crate::corpus::{CorpusWalker, WalkSettings, WalkStats};
use crate::error::Result;
use crate::limits::{raise_open_file_limit, DESCRIPTOR_HEADROOM};
use crate::sinks::{ActiveRange, SinkPool, SinkSummary};
use crate::vocabulary::Vocabulary;

use std::env;
use std::error::Error;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub struct Pipeline {}

impl Pipeline {

    // runs the main procedure of 3 steps -
    // -> configuration of arguments
    // -> vocabulary building
    // -> context extraction over the corpus

    pub fn run() -> std::result::Result<(), Box<dyn Error>> {

        info!("entering program...");
        let args: Vec<String> = env::args().collect();

        info!("building parameters...");
        let params = Config::new(&args)?.get_params();
        info!("{}", params);

        Pipeline::extract(&params)?;
        Ok(())
    }

    pub fn extract(params: &ExtractParams) -> Result<(WalkStats, SinkSummary)> {

        let timer = Instant::now();
        info!("starting vocab building...");
        let vocab = Pipeline::load_vocabulary(params)?;
        let controls = vocab.control_tokens(&params.start_marker, &params.end_marker)?;
        info!("loaded {} words of dimension {}, took {} seconds ...", vocab.len(), vocab.dim(), timer.elapsed().as_secs());

        // every output file stays open for the whole run
        let range = ActiveRange::new(vocab.len(), params.from, params.prune)?;
        let budget = raise_open_file_limit(range.len() as u64 + DESCRIPTOR_HEADROOM)?;
        let mut sinks = SinkPool::open(
            &budget,
            range,
            Path::new(&params.output_dir),
            vocab.dim(),
            params.quota_policy(),
            params.flush_every,
        )?;

        let timer = Instant::now();
        info!("extracting contexts for words {:?}...", range.indices());
        let settings = WalkSettings {
            context_size: params.context_size,
            mode: params.token_mode(),
            eod_marker: params.eod_marker.clone(),
            controls,
            progress_every: params.progress_every,
        };
        let mut walker = CorpusWalker::new(&vocab, settings);
        let stats = walker.walk_dir(Path::new(&params.corpus_dir), &params.corpus_extension, &mut sinks)?;

        info!("closing files");
        let summary = sinks.finish()?;
        info!(
            "finished {} files, {} documents, {} tokens ({} unknown), wrote {} contexts, {} words reached quota. Took {} seconds ...",
            stats.files, stats.documents, stats.tokens, stats.unresolved, summary.records, summary.closed_by_quota, timer.elapsed().as_secs()
        );

        Ok((stats, summary))
    }

    fn load_vocabulary(params: &ExtractParams) -> Result<Vocabulary> {
        let words = files_handling::read_input::<Vec<String>>(Path::new(&params.vocab_file))?;
        let idf = files_handling::read_input::<Vec<f32>>(Path::new(&params.idf_file))?;
        let components = files_handling::read_embeddings(Path::new(&params.vectors_file), params.embedding_dim)?;
        Vocabulary::build(words, idf, components, params.embedding_dim)
    }

}
