use crate::error::{ExtractError, Result};
use crate::window::Slot;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::collections::HashMap;


/// How corpus tokens map to vocabulary indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenMode {
    /// look each token up in the word list
    Dictionary,
    /// the corpus already holds decimal vocabulary indices
    Preindexed,
}

/// Indices of the document-start and document-end sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlTokens {
    pub start: usize,
    pub end: usize,
}

/// Read-only word list with its IDF weights and one embedding column per word.
#[derive(Clone, Debug, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
    t2i: HashMap<String, usize>,
    idf: Array1<f32>,
    embeddings: Array2<f32>, // shape (dim, vocab_size)
}

impl Vocabulary {

    /// Builds the vocabulary by walking the three inputs in lock-step: one IDF value and
    /// `dim` embedding components per word. Any input that runs short of, or past,
    /// the word list is rejected.
    pub fn build<W, I, E>(words: W, idf: I, components: E, dim: usize) -> Result<Vocabulary>
    where
        W: IntoIterator<Item = String>,
        I: IntoIterator<Item = f32>,
        E: IntoIterator<Item = f32>,
    {
        if dim == 0 {
            return Err(ExtractError::Config("embedding dimension must be positive".to_string()));
        }

        let mut idf = idf.into_iter();
        let mut components = components.into_iter();

        let mut vocab: Vec<String> = Vec::new();
        let mut t2i: HashMap<String, usize> = HashMap::new();
        let mut weights: Vec<f32> = Vec::new();
        let mut columns: Vec<f32> = Vec::new();

        for (index, word) in words.into_iter().enumerate() {

            match idf.next() {
                Some(weight) => weights.push(weight),
                None => return Err(ExtractError::MisalignedInput { input: "idf", expected: index + 1, found: index })
            }

            for _ in 0..dim {
                match components.next() {
                    Some(value) => columns.push(value),
                    None => return Err(ExtractError::MisalignedInput {
                        input: "vectors",
                        expected: (index + 1) * dim,
                        found: columns.len(),
                    })
                }
            }

            // a repeated word resolves to its last occurrence
            t2i.insert(word.clone(), index);
            vocab.push(word);
        }

        let size = vocab.len();
        let extra_idf = idf.count();
        if extra_idf > 0 {
            return Err(ExtractError::MisalignedInput { input: "idf", expected: size, found: size + extra_idf });
        }
        let extra_components = components.count();
        if extra_components > 0 {
            return Err(ExtractError::MisalignedInput {
                input: "vectors",
                expected: size * dim,
                found: size * dim + extra_components,
            });
        }

        // rows of the read order are words, transposing gives one column per word
        let embeddings = Array2::from_shape_vec((size, dim), columns)
        .map_err(|e| ExtractError::Config(format!("cannot shape embedding matrix: {}", e)))?
        .reversed_axes();

        Ok(Self {
            words: vocab,
            t2i,
            idf: Array1::from_vec(weights),
            embeddings,
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.embeddings.nrows()
    }

    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(|w| w.as_str())
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.t2i.get(word).copied()
    }

    pub fn idf(&self) -> ArrayView1<f32> {
        self.idf.view()
    }

    pub fn embeddings(&self) -> ArrayView2<f32> {
        self.embeddings.view()
    }

    /// Resolves a corpus token. Unknown words are `None` in dictionary mode; in
    /// pre-indexed mode the token must be a decimal index inside the vocabulary.
    pub fn resolve(&self, token: &str, mode: TokenMode) -> Result<Slot> {
        match mode {
            TokenMode::Dictionary => Ok(self.index_of(token)),
            TokenMode::Preindexed => {
                let index: usize = token
                .trim()
                .parse()
                .map_err(|_| ExtractError::InvalidIndex(token.to_string()))?;
                if index >= self.len() {
                    return Err(ExtractError::IndexOutOfRange { index, size: self.len() });
                }
                Ok(Some(index))
            }
        }
    }

    /// Resolves a raw corpus line. Bytes that are not utf-8 can match no word, so they are
    /// unresolved in dictionary mode and an invalid index in pre-indexed mode.
    pub fn resolve_bytes(&self, token: &[u8], mode: TokenMode) -> Result<Slot> {
        match std::str::from_utf8(token) {
            Ok(token) => self.resolve(token, mode),
            Err(_) => match mode {
                TokenMode::Dictionary => Ok(None),
                TokenMode::Preindexed => Err(ExtractError::InvalidIndex(String::from_utf8_lossy(token).into_owned()))
            }
        }
    }

    /// Looks up the document sentinels, always by word.
    pub fn control_tokens(&self, start: &str, end: &str) -> Result<ControlTokens> {
        let lookup = |marker: &str| {
            self.index_of(marker).ok_or_else(|| ExtractError::MissingControlToken(marker.to_string()))
        };
        Ok(ControlTokens {
            start: lookup(start)?,
            end: lookup(end)?,
        })
    }

}


#[cfg(test)]
mod tests {

    use super::{ControlTokens, TokenMode, Vocabulary};
    use crate::error::ExtractError;
    use ndarray::array;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn toy() -> Vocabulary {
        Vocabulary::build(
            words(&["<s>", "<\\s>", "cat", "sat"]),
            vec![0.5, 0.25, 2.0, 3.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            2,
        ).unwrap()
    }

    #[test]
    fn build_aligns_columns() {

        let vocab = toy();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.dim(), 2);
        assert_eq!(vocab.word(2), Some("cat"));
        assert_eq!(vocab.index_of("sat"), Some(3));
        assert_eq!(vocab.idf(), array![0.5, 0.25, 2.0, 3.0]);

        // each word's components land in its own column
        assert_eq!(vocab.embeddings().column(0), array![1.0, 2.0]);
        assert_eq!(vocab.embeddings().column(3), array![7.0, 8.0]);
    }

    #[test]
    fn rebuild_is_identical() {
        assert_eq!(toy(), toy());
    }

    #[test]
    fn short_idf_fails() {
        let result = Vocabulary::build(words(&["a", "b", "c"]), vec![1.0, 1.0], vec![0.0; 3], 1);
        assert!(matches!(result, Err(ExtractError::MisalignedInput { input: "idf", expected: 3, found: 2 })));
    }

    #[test]
    fn short_vectors_fail() {
        let result = Vocabulary::build(words(&["a", "b"]), vec![1.0, 1.0], vec![0.0; 5], 3);
        assert!(matches!(result, Err(ExtractError::MisalignedInput { input: "vectors", expected: 6, found: 5 })));
    }

    #[test]
    fn leftover_inputs_fail() {

        let result = Vocabulary::build(words(&["a"]), vec![1.0, 2.0], vec![0.0; 2], 2);
        assert!(matches!(result, Err(ExtractError::MisalignedInput { input: "idf", expected: 1, found: 2 })));

        let result = Vocabulary::build(words(&["a"]), vec![1.0], vec![0.0; 3], 2);
        assert!(matches!(result, Err(ExtractError::MisalignedInput { input: "vectors", expected: 2, found: 3 })));
    }

    #[test]
    fn repeated_word_maps_to_last() {
        let vocab = Vocabulary::build(words(&["a", "b", "a"]), vec![1.0; 3], vec![0.0; 3], 1).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.index_of("a"), Some(2));
    }

    #[test]
    fn resolve_dictionary() {
        let vocab = toy();
        assert_eq!(vocab.resolve("cat", TokenMode::Dictionary).unwrap(), Some(2));
        assert_eq!(vocab.resolve("dog", TokenMode::Dictionary).unwrap(), None);
        // numbers are plain words in dictionary mode
        assert_eq!(vocab.resolve("2", TokenMode::Dictionary).unwrap(), None);
    }

    #[test]
    fn resolve_preindexed() {

        let vocab = toy();
        assert_eq!(vocab.resolve("3", TokenMode::Preindexed).unwrap(), Some(3));
        assert!(matches!(
            vocab.resolve("4", TokenMode::Preindexed),
            Err(ExtractError::IndexOutOfRange { index: 4, size: 4 })
        ));
        assert!(matches!(vocab.resolve("cat", TokenMode::Preindexed), Err(ExtractError::InvalidIndex(_))));
        assert!(matches!(vocab.resolve("-1", TokenMode::Preindexed), Err(ExtractError::InvalidIndex(_))));
    }

    #[test]
    fn resolve_raw_bytes() {

        let vocab = toy();
        assert_eq!(vocab.resolve_bytes(b"sat", TokenMode::Dictionary).unwrap(), Some(3));
        assert_eq!(vocab.resolve_bytes(b"caf\xe9", TokenMode::Dictionary).unwrap(), None);
        assert_eq!(vocab.resolve_bytes(b"2", TokenMode::Preindexed).unwrap(), Some(2));
        assert!(matches!(vocab.resolve_bytes(b"\xff1", TokenMode::Preindexed), Err(ExtractError::InvalidIndex(_))));
    }

    #[test]
    fn control_tokens_by_word() {

        let vocab = toy();
        assert_eq!(vocab.control_tokens("<s>", "<\\s>").unwrap(), ControlTokens { start: 0, end: 1 });

        match vocab.control_tokens("<s>", "</s>") {
            Err(ExtractError::MissingControlToken(marker)) => assert_eq!(marker, "</s>"),
            other => panic!("unexpected result {:?}", other)
        }
    }

}
