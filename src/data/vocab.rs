//! Recognition vocabulary.
//!
//! One token per line; `<space>` stands for a literal space. `<unk>` is
//! appended when the file lacks it. Token `i` is model class `i + 1`, class 0
//! is the CTC blank.

use crate::core::errors::OCRError;
use std::collections::HashMap;
use std::path::Path;

pub const SPACE_TOKEN: &str = "<space>";
pub const UNK_TOKEN: &str = "<unk>";

/// Class reserved for the CTC blank.
pub const BLANK_CLASS: usize = 0;

#[derive(Debug, Clone)]
pub struct Vocab {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
    unk: usize,
}

impl Vocab {
    /// Builds a vocabulary from raw token lines.
    ///
    /// Empty lines are skipped and duplicate tokens keep their first position.
    pub fn from_tokens<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        let mut index = HashMap::new();
        for line in lines {
            let line = line.as_ref().trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            let token = normalize_token(line);
            if !index.contains_key(&token) {
                index.insert(token.clone(), tokens.len());
                tokens.push(token);
            }
        }
        let unk = match index.get(UNK_TOKEN) {
            Some(&idx) => idx,
            None => {
                index.insert(UNK_TOKEN.to_string(), tokens.len());
                tokens.push(UNK_TOKEN.to_string());
                tokens.len() - 1
            }
        };
        Self { tokens, index, unk }
    }

    /// Reads a vocabulary file.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidInput` if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, OCRError> {
        let content = std::fs::read_to_string(path).map_err(|e| OCRError::InvalidInput {
            message: format!("Failed to read vocabulary from '{}': {}", path.display(), e),
        })?;
        let vocab = Self::from_tokens(content.lines());
        tracing::debug!("Loaded {} tokens from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Number of tokens, `<unk>` included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of model output classes, blank included.
    pub fn num_classes(&self) -> usize {
        self.tokens.len() + 1
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Model class of a token; unknown tokens map to `<unk>`.
    pub fn class_of(&self, token: &str) -> usize {
        let token = normalize_token(token);
        self.index.get(&token).copied().unwrap_or(self.unk) + 1
    }

    /// Encodes a token sequence into model classes.
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<usize> {
        tokens.iter().map(|t| self.class_of(t.as_ref())).collect()
    }

    /// Token text of a model class; `None` for the blank and out-of-range classes.
    pub fn token(&self, class: usize) -> Option<&str> {
        class
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(String::as_str)
    }
}

fn normalize_token(token: &str) -> String {
    if token == SPACE_TOKEN {
        " ".to_string()
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_classes_are_shifted_by_blank() {
        let vocab = Vocab::from_tokens(["a", "b", "<space>"]);
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.num_classes(), 5);
        assert_eq!(vocab.class_of("a"), 1);
        assert_eq!(vocab.class_of("<space>"), 3);
        assert_eq!(vocab.class_of(" "), 3);
        assert_eq!(vocab.token(BLANK_CLASS), None);
        assert_eq!(vocab.token(3), Some(" "));
        assert_eq!(vocab.token(4), Some(UNK_TOKEN));
        assert_eq!(vocab.token(5), None);
    }

    #[test]
    fn test_unknown_tokens_map_to_unk() {
        let vocab = Vocab::from_tokens(["x", "<unk>", "y"]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.encode(&["y", "z", "x"]), vec![3, 2, 1]);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "中").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "国").unwrap();
        let vocab = Vocab::from_file(file.path()).unwrap();
        assert_eq!(vocab.tokens(), &["中", "国", "<unk>"]);
    }

    #[test]
    fn test_missing_file() {
        let err = Vocab::from_file(Path::new("/nonexistent/vocab.txt")).unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { .. }));
    }
}
