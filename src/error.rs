//! Parsing errors
use thiserror::Error;

/// Raw field content could not be converted to its declared type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse \"{raw}\" as {target}")]
pub struct ConversionError {
    /// Offending (stripped) substring
    pub raw: String,
    /// Name of the target type
    pub target: &'static str,
}

impl ConversionError {
    pub(crate) fn new(raw: &str, target: &'static str) -> Self {
        Self {
            raw: raw.to_string(),
            target,
        }
    }
}

/// Errors that may rise when rebuilding a symmetric matrix
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    /// Matrix dimension exceeds the allowed allocation
    #[error("matrix dimension {size} exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },
    /// Row and column indexes are 1-based
    #[error("null matrix index at ({row}, {col})")]
    NullIndex { row: usize, col: usize },
    /// Entry does not fit in the matrix
    #[error("matrix index ({row}, {col}) out of bounds for {size}x{size} matrix")]
    OutOfBounds { row: usize, col: usize, size: usize },
    /// No entries and no companion size
    #[error("no matrix entries to rebuild from")]
    Empty,
}

/// Errors in user provided Block or Record definitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("record \"{record}\": field \"{first}\" overlaps field \"{second}\"")]
    OverlappingFields {
        record: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("record \"{record}\": empty column span for field \"{field}\"")]
    EmptySpan { record: String, field: &'static str },
}

/// Errors that may rise in Parsing process
#[derive(Error, Debug)]
pub enum ParsingError {
    /// I/O error on the input source
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Field conversion error: a wrong type is never silently accepted
    #[error("line {line}: field \"{field}\": {source}")]
    Conversion {
        line: usize,
        field: &'static str,
        #[source]
        source: ConversionError,
    },
    /// Conversion error rising outside of a field context
    #[error(transparent)]
    Value(#[from] ConversionError),
    /// Invalid definitions
    #[error("invalid definition: {0}")]
    Definition(#[from] DefinitionError),
    /// Matrix reconstruction failure
    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),
    /// Mandatory marker never dispatched (strict mode)
    #[error("{source_name}: missing mandatory marker \"{marker}\"")]
    MissingMandatory { marker: String, source_name: String },
    /// Line is not valid in requested encoding
    #[error("line {0}: invalid utf-8 content")]
    Encoding(usize),
    /// Warnings promoted to errors, see [crate::Parsed::strict]
    #[error("{count} warning(s), first: {first}")]
    Strict { count: usize, first: String },
    /// Format specific structural failure
    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },
}
