//! Parsing options
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default limit of a rebuilt matrix dimension
pub const DEFAULT_MAX_MATRIX_DIMENSION: usize = 10_000;

/// Header validation mode
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Validation {
    /// Missing mandatory markers are reported as warnings.
    /// Maximizes data extraction from non conformant files.
    #[default]
    Lenient,
    /// Missing mandatory markers are hard failures.
    /// For producers validating their own files.
    Strict,
}

/// Input text encoding
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    /// UTF-8, falling back to Latin-1 on a per line basis
    #[default]
    Auto,
    /// Strict UTF-8: invalid content is fatal
    Utf8,
    /// ISO 8859-1
    Latin1,
}

/// [ParsingOptions] configure one parse
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParsingOptions {
    pub validation: Validation,
    pub encoding: Encoding,
    /// Name of the source, used in diagnostics
    pub source: String,
    /// Largest matrix dimension we accept to allocate
    pub max_matrix_dimension: usize,
}

impl Default for ParsingOptions {
    fn default() -> Self {
        Self {
            validation: Validation::default(),
            encoding: Encoding::default(),
            source: String::from("<memory>"),
            max_matrix_dimension: DEFAULT_MAX_MATRIX_DIMENSION,
        }
    }
}

impl ParsingOptions {
    pub fn with_validation(&self, validation: Validation) -> Self {
        let mut s = self.clone();
        s.validation = validation;
        s
    }
    /// Shortcut for [Validation::Strict]
    pub fn strict(&self) -> Self {
        self.with_validation(Validation::Strict)
    }
    pub fn with_encoding(&self, encoding: Encoding) -> Self {
        let mut s = self.clone();
        s.encoding = encoding;
        s
    }
    pub fn with_source(&self, source: &str) -> Self {
        let mut s = self.clone();
        s.source = source.to_string();
        s
    }
    pub fn with_max_matrix_dimension(&self, dim: usize) -> Self {
        let mut s = self.clone();
        s.max_matrix_dimension = dim;
        s
    }
    pub fn is_strict(&self) -> bool {
        self.validation == Validation::Strict
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn builders() {
        let opts = ParsingOptions::default();
        assert!(!opts.is_strict());
        assert_eq!(opts.encoding, Encoding::Auto);
        let strict = opts.strict().with_source("igs21826.snx");
        assert!(strict.is_strict());
        assert_eq!(strict.source, "igs21826.snx");
        assert_eq!(strict.max_matrix_dimension, DEFAULT_MAX_MATRIX_DIMENSION);
        // builders never alter the original
        assert_eq!(opts.source, "<memory>");
    }
    #[test]
    #[cfg(feature = "serde")]
    fn serdes() {
        let opts = ParsingOptions::default()
            .strict()
            .with_encoding(Encoding::Latin1)
            .with_max_matrix_dimension(500);
        let content = serde_json::to_string(&opts).unwrap();
        let parsed: ParsingOptions = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, opts);
    }
}
