//! Diagnostics channel
use std::fmt::{Display, Formatter, Result as FmtResult};

#[cfg(feature = "log")]
use log::{debug, error, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostic severity
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// Dispatch traces
    Debug,
    /// Recoverable non-conformity
    Warning,
    /// Unrecoverable failure, the parse is aborted
    Fatal,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Warning => write!(f, "warning"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// What triggered a [Diagnostic]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiagnosticKind {
    /// Line skipped by the block skip predicate
    SkippedLine,
    /// Label has no matching record definition
    StructuralMismatch,
    /// Mandatory header marker never dispatched
    MissingMandatory(String),
    /// Marker is neither mandatory nor optional
    UnknownMarker(String),
    /// Input ended before these blocks were visited
    UnseenBlocks(Vec<String>),
    /// Matrix dimension guessed from the highest row index
    MatrixSizeInferred(usize),
    /// Unknown triangle orientation flag
    MatrixOrientation(String),
    /// Parse aborted
    Failure,
    /// Format specific remark
    Other,
}

/// One diagnostic message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Absolute (0-based) line index, when relevant
    pub line: Option<usize>,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.severity, line, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// [Diagnostics] collects everything a parse had to say.
/// Each entry is forwarded to the `log` facade when the "log" feature is enabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    inner: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Stores a new [Diagnostic]
    pub fn push(&mut self, diag: Diagnostic) {
        #[cfg(feature = "log")]
        match diag.severity {
            Severity::Debug => debug!("{}", diag),
            Severity::Warning => warn!("{}", diag),
            Severity::Fatal => error!("{}", diag),
        }
        self.inner.push(diag);
    }

    pub fn debug(&mut self, kind: DiagnosticKind, line: Option<usize>, message: String) {
        self.push(Diagnostic {
            severity: Severity::Debug,
            kind,
            line,
            message,
        });
    }

    pub fn warning(&mut self, kind: DiagnosticKind, line: Option<usize>, message: String) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            line,
            message,
        });
    }

    pub fn fatal(&mut self, line: Option<usize>, message: String) {
        self.push(Diagnostic {
            severity: Severity::Fatal,
            kind: DiagnosticKind::Failure,
            line,
            message,
        });
    }

    /// Iterates all diagnostics, in emission order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.inner.iter()
    }

    /// Iterates diagnostics of given [Severity] only
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.inner.iter().filter(move |d| d.severity == severity)
    }

    /// Iterates [Severity::Warning] diagnostics
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    /// Returns true if a diagnostic of this kind was emitted
    pub fn contains(&self, kind: &DiagnosticKind) -> bool {
        self.inner.iter().any(|d| &d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
