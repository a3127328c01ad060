#![doc(html_logo_url = "https://raw.githubusercontent.com/georust/meta/master/logo/logo.png")]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::type_complexity)]

extern crate gnss_rs as gnss;

#[macro_use]
extern crate lazy_static;

pub mod block;
pub mod cache;
pub mod converter;
pub mod diagnostics;
pub mod fields;
pub mod matrix;
pub mod options;
pub mod parser;
pub mod reader;
pub mod record;
pub mod rinex;
pub mod sinex;
pub mod state;
pub mod validator;

mod error;

#[cfg(test)]
mod tests;

pub mod prelude {
    // export
    pub use crate::{
        block::{BlockDef, Label, Sequence},
        cache::Cache,
        converter::{Converter, EpochFormat, Value},
        diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity},
        error::{ConversionError, DefinitionError, MatrixError, ParsingError},
        fields::{FieldDef, Fields, Span, Strip},
        matrix::{MatrixEntry, Triangle},
        options::{Encoding, ParsingOptions, Validation},
        parser::{BlockReport, ChainParser, Failure, Parsed},
        record::{Context, RecordDef},
        state::{DataItem, ParseState, Row},
        validator::HeaderValidator,
    };
    // pub re-export
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::DMatrix;
}

pub use error::{ConversionError, DefinitionError, MatrixError, ParsingError};
pub use parser::{ChainParser, Failure, Parsed};
