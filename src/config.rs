use crate::error::{ExtractError, Result};
use crate::sinks::QuotaPolicy;
use crate::vocabulary::TokenMode;
use serde_json::Value;
use std::{fmt::Display, fs::File, io::BufReader, path::Path};


#[derive(Clone, Debug, PartialEq)]
pub struct ExtractParams {
    pub vocab_file: String,
    pub idf_file: String,
    pub vectors_file: String,
    pub corpus_dir: String,
    pub output_dir: String,
    pub embedding_dim: usize,
    pub context_size: usize,
    pub eod_marker: String,
    pub preindexed: bool,
    pub prune: usize,
    pub from: usize,
    pub max_contexts: usize,
    pub start_marker: String,
    pub end_marker: String,
    pub corpus_extension: String,
    pub quota_boost_index: usize,
    pub quota_boost_factor: usize,
    pub flush_every: usize,
    pub progress_every: usize,
}

impl ExtractParams {

    pub fn token_mode(&self) -> TokenMode {
        if self.preindexed { TokenMode::Preindexed } else { TokenMode::Dictionary }
    }

    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            max_contexts: self.max_contexts,
            boosted_index: self.quota_boost_index,
            boost_factor: self.quota_boost_factor,
        }
    }
}

impl Display for ExtractParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using parameters:
        vocab_file: {}
        idf_file: {}
        vectors_file: {}
        corpus_dir: {}
        output_dir: {}
        embedding_dim: {}
        context_size: {}
        eod_marker: {}
        preindexed: {}
        prune: {}
        from: {}
        max_contexts: {} (index {} x{})
        markers: {} {}
        corpus_extension: {}",
        self.vocab_file, self.idf_file, self.vectors_file, self.corpus_dir, self.output_dir,
        self.embedding_dim, self.context_size, self.eod_marker, self.preindexed, self.prune, self.from,
        self.max_contexts, self.quota_boost_index, self.quota_boost_factor,
        self.start_marker, self.end_marker, self.corpus_extension)
    }
}

pub struct Config {
    params: ExtractParams
}

impl Config {

    pub fn get_params(&self) -> ExtractParams {
        self.params.clone()
    }

    /// `args` is the process argument list; its only argument is the path to a json parameter file.
    pub fn new(args: &[String]) -> Result<Config> {

        if args.len() != 2 {
            return Err(ExtractError::Config("input should be a path to json file only".to_string()));
        }

        let f = File::open(&args[1]).map_err(|e| ExtractError::Config(format!("cannot open json file {}: {}", args[1], e)))?;
        let json: Value = serde_json::from_reader(BufReader::new(f))
        .map_err(|e| ExtractError::Config(format!("cannot read json file {}: {}", args[1], e)))?;

        Config::from_json(&json)
    }

    pub fn from_json(json: &Value) -> Result<Config> {

        // required paths
        let vocab_file = required_str(json, "vocab_file")?;
        let idf_file = required_str(json, "idf_file")?;
        let vectors_file = required_str(json, "vectors_file")?;
        let corpus_dir = required_str(json, "corpus_dir")?;
        let output_dir = required_str(json, "output_dir")?;

        for dir in [&corpus_dir, &output_dir] {
            if !Path::new(dir).is_dir() {
                return Err(ExtractError::Config(format!("{} is not a directory", dir)));
            }
        }

        // handle default vs input parameters
        let params = ExtractParams {
            embedding_dim: optional_usize(json, "embedding_dim", 50)?,
            context_size: optional_usize(json, "context_size", 5)?,
            eod_marker: optional_str(json, "eod_marker", "eeeoddd")?,
            preindexed: match json.get("preindexed") {
                Some(preindexed) => preindexed.as_bool().ok_or_else(|| invalid("preindexed", "a boolean"))?,
                None => false
            },
            prune: optional_usize(json, "prune", 0)?,
            from: optional_usize(json, "from", 0)?,
            max_contexts: optional_usize(json, "max_contexts", 0)?,
            start_marker: optional_str(json, "start_marker", "<s>")?,
            end_marker: optional_str(json, "end_marker", "<\\s>")?,
            corpus_extension: optional_str(json, "corpus_extension", "txt")?,
            quota_boost_index: optional_usize(json, "quota_boost_index", 0)?,
            quota_boost_factor: optional_usize(json, "quota_boost_factor", 2)?,
            flush_every: optional_usize(json, "flush_every", 1000)?,
            progress_every: optional_usize(json, "progress_every", 100000)?,
            vocab_file,
            idf_file,
            vectors_file,
            corpus_dir,
            output_dir,
        };

        for (key, value) in [
            ("embedding_dim", params.embedding_dim),
            ("quota_boost_factor", params.quota_boost_factor),
            ("flush_every", params.flush_every),
            ("progress_every", params.progress_every),
        ] {
            if value == 0 {
                return Err(invalid(key, "a positive number"));
            }
        }

        Ok(Self { params })
    }

}

fn invalid(key: &str, expected: &str) -> ExtractError {
    ExtractError::Config(format!("given {} is not {}", key, expected))
}

fn required_str(json: &Value, key: &str) -> Result<String> {
    match json.get(key) {
        Some(value) => value.as_str().map(|s| s.to_owned()).ok_or_else(|| invalid(key, "a string")),
        None => Err(ExtractError::Config(format!("{} was not supplied through json", key)))
    }
}

fn optional_str(json: &Value, key: &str, default: &str) -> Result<String> {
    match json.get(key) {
        Some(value) => value.as_str().map(|s| s.to_owned()).ok_or_else(|| invalid(key, "a string")),
        None => Ok(default.to_owned())
    }
}

fn optional_usize(json: &Value, key: &str, default: usize) -> Result<usize> {
    match json.get(key) {
        Some(value) => value.as_u64().map(|n| n as usize).ok_or_else(|| invalid(key, "a non-negative integer")),
        None => Ok(default)
    }
}


pub mod files_handling {

    use crate::error::{ExtractError, Result};
    use ndarray::Array2;
    use ndarray_npy::read_npy;
    use std::fs::{self, File};
    use std::io::{BufRead, BufReader};
    use std::path::Path;

    pub fn read_input<R: ReadFile>(file_path: &Path) -> Result<R> {
        R::read_file(file_path)
    }

    pub trait ReadFile: Sized {
        fn read_file(file_path: &Path) -> Result<Self>;
    }

    fn read_err(file_path: &Path) -> impl FnOnce(std::io::Error) -> ExtractError + '_ {
        move |source| ExtractError::Read { path: file_path.to_path_buf(), source }
    }

    // one word per line
    impl ReadFile for Vec<String> {
        fn read_file(file_path: &Path) -> Result<Self> {
            let f = File::open(file_path).map_err(read_err(file_path))?;
            let mut words = Vec::new();
            for line in BufReader::new(f).lines() {
                words.push(line.map_err(read_err(file_path))?);
            }
            Ok(words)
        }
    }

    // whitespace separated scalars, line breaks carry no meaning
    impl ReadFile for Vec<f32> {
        fn read_file(file_path: &Path) -> Result<Self> {
            let text = fs::read_to_string(file_path).map_err(read_err(file_path))?;
            text.split_whitespace()
            .map(|token| token.parse::<f32>().map_err(|_| ExtractError::Parse {
                path: file_path.to_path_buf(),
                token: token.to_string(),
            }))
            .collect()
        }
    }

    impl ReadFile for Array2<f32> {
        fn read_file(file_path: &Path) -> Result<Self> {
            Ok(read_npy(file_path)?)
        }
    }

    /// Embedding components in vocabulary order, `dim` per word. A `.npy` file holds a
    /// `(vocab_size, dim)` matrix, anything else is read as text.
    pub fn read_embeddings(file_path: &Path, dim: usize) -> Result<Vec<f32>> {

        if file_path.extension().map_or(false, |ext| ext == "npy") {
            let w = read_input::<Array2<f32>>(file_path)?;
            if w.ncols() != dim {
                return Err(ExtractError::Config(format!(
                    "{} holds {}-dim vectors, expected {}", file_path.display(), w.ncols(), dim
                )));
            }
            // logical (row-major) order is word after word whatever the memory layout
            return Ok(w.iter().copied().collect());
        }
        read_input::<Vec<f32>>(file_path)
    }

}


#[cfg(test)]
mod tests {

    use super::files_handling::{read_embeddings, read_input};
    use super::Config;
    use crate::error::ExtractError;
    use crate::vocabulary::TokenMode;
    use ndarray::array;
    use ndarray_npy::write_npy;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_fill_in() {

        let dir = tempdir().unwrap();
        let d = dir.path().to_str().unwrap();
        let json = json!({
            "vocab_file": "vocab.txt",
            "idf_file": "idf.txt",
            "vectors_file": "vecs.txt",
            "corpus_dir": d,
            "output_dir": d
        });

        let params = Config::from_json(&json).unwrap().get_params();
        assert_eq!(params.embedding_dim, 50);
        assert_eq!(params.context_size, 5);
        assert_eq!(params.eod_marker, "eeeoddd");
        assert_eq!(params.token_mode(), TokenMode::Dictionary);
        assert_eq!(params.max_contexts, 0);
        assert_eq!(params.quota_policy().quota_for(0), None);
        assert_eq!(params.start_marker, "<s>");
        assert_eq!(params.end_marker, "<\\s>");
        assert_eq!(params.flush_every, 1000);
    }

    #[test]
    fn overrides_and_validation() {

        let dir = tempdir().unwrap();
        let d = dir.path().to_str().unwrap();
        let mut json = json!({
            "vocab_file": "vocab.txt",
            "idf_file": "idf.txt",
            "vectors_file": "vecs.txt",
            "corpus_dir": d,
            "output_dir": d,
            "embedding_dim": 3,
            "preindexed": true,
            "max_contexts": 10,
            "from": 4,
            "prune": 2
        });

        let params = Config::from_json(&json).unwrap().get_params();
        assert_eq!(params.embedding_dim, 3);
        assert_eq!(params.token_mode(), TokenMode::Preindexed);
        assert_eq!(params.quota_policy().quota_for(0), Some(20));
        assert_eq!(params.quota_policy().quota_for(4), Some(10));
        assert_eq!((params.from, params.prune), (4, 2));

        json["embedding_dim"] = json!(0);
        assert!(matches!(Config::from_json(&json), Err(ExtractError::Config(_))));

        json["embedding_dim"] = json!("fifty");
        assert!(matches!(Config::from_json(&json), Err(ExtractError::Config(_))));

        json["embedding_dim"] = json!(3);
        json["corpus_dir"] = json!(dir.path().join("missing").to_str().unwrap());
        assert!(matches!(Config::from_json(&json), Err(ExtractError::Config(_))));
    }

    #[test]
    fn missing_required_key() {
        let json = json!({ "vocab_file": "vocab.txt" });
        match Config::from_json(&json) {
            Err(ExtractError::Config(message)) => assert!(message.contains("idf_file")),
            _ => panic!("expected a configuration error")
        }
    }

    #[test]
    fn args_must_be_single_path() {
        let args = vec!["context_extractor".to_string()];
        assert!(matches!(Config::new(&args), Err(ExtractError::Config(_))));
    }

    #[test]
    fn reads_text_inputs() {

        let dir = tempdir().unwrap();
        let words = dir.path().join("vocab.txt");
        let scalars = dir.path().join("idf.txt");
        fs::write(&words, "<s>\n<\\s>\ncat\n").unwrap();
        fs::write(&scalars, "1.5 2\n-0.25\n\n3e2").unwrap();

        assert_eq!(read_input::<Vec<String>>(&words).unwrap(), vec!["<s>", "<\\s>", "cat"]);
        assert_eq!(read_input::<Vec<f32>>(&scalars).unwrap(), vec![1.5, 2.0, -0.25, 300.0]);

        fs::write(&scalars, "1.0 x").unwrap();
        match read_input::<Vec<f32>>(&scalars) {
            Err(ExtractError::Parse { token, .. }) => assert_eq!(token, "x"),
            _ => panic!("expected a parse error")
        }

        assert!(matches!(read_input::<Vec<String>>(&dir.path().join("absent")), Err(ExtractError::Read { .. })));
    }

    #[test]
    fn npy_embeddings_follow_word_order() {

        let dir = tempdir().unwrap();
        let path = dir.path().join("vecs.npy");
        write_npy(&path, &array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();

        assert_eq!(read_embeddings(&path, 2).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(matches!(read_embeddings(&path, 3), Err(ExtractError::Config(_))));
    }

}
