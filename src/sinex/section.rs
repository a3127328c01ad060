//! SINEX sections and their column layouts
use crate::{
    converter::{Converter, EpochFormat},
    fields::FieldDef,
    matrix::Triangle,
};

use hifitime::TimeScale;
use regex::Regex;

use std::fmt::{Display, Formatter, Result as FmtResult};

lazy_static! {
    /// "+NAME [L|U] [CORR|COVA|INFO]" or "-NAME"
    static ref TITLE: Regex =
        Regex::new(r"^[+-](\S+)(?:\s+(\S+))?(?:\s+(\S+))?").unwrap();
}

fn sinex_epoch() -> Converter {
    Converter::Epoch(EpochFormat::YearDaySeconds, TimeScale::UTC)
}

lazy_static! {
    static ref FILE_REFERENCE: Vec<FieldDef> = vec![
        FieldDef::new("descriptor", 1, Some(19)),
        FieldDef::new("information", 19, None),
    ];
    static ref TEXT: Vec<FieldDef> = vec![FieldDef::new("text", 0, None)];
    static ref SITE_ID: Vec<FieldDef> = vec![
        FieldDef::new("code", 1, Some(5)),
        FieldDef::new("point", 6, Some(8)),
        FieldDef::new("domes", 9, Some(18)),
        FieldDef::new("technique", 19, Some(20)),
        FieldDef::new("description", 21, Some(43)),
        FieldDef::new("longitude", 44, Some(55)).with_converter(Converter::DmsDegrees),
        FieldDef::new("latitude", 56, Some(67)).with_converter(Converter::DmsDegrees),
        FieldDef::new("height", 68, Some(75)).with_converter(Converter::Float),
    ];
    static ref SOLUTION_EPOCHS: Vec<FieldDef> = vec![
        FieldDef::new("code", 1, Some(5)),
        FieldDef::new("point", 6, Some(8)),
        FieldDef::new("solution", 9, Some(13)),
        FieldDef::new("technique", 14, Some(15)),
        FieldDef::new("start", 16, Some(28)).with_converter(sinex_epoch()),
        FieldDef::new("end", 29, Some(41)).with_converter(sinex_epoch()),
        FieldDef::new("mean", 42, Some(54)).with_converter(sinex_epoch()),
    ];
    static ref SOLUTION_VALUES: Vec<FieldDef> = vec![
        FieldDef::new("index", 1, Some(6)).with_converter(Converter::Integer),
        FieldDef::new("type", 7, Some(13)),
        FieldDef::new("code", 14, Some(18)),
        FieldDef::new("point", 19, Some(21)),
        FieldDef::new("solution", 22, Some(26)),
        FieldDef::new("epoch", 27, Some(39)).with_converter(sinex_epoch()),
        FieldDef::new("unit", 40, Some(44)),
        FieldDef::new("constraint", 45, Some(46)).with_converter(Converter::Integer),
        FieldDef::new("value", 47, Some(68)).with_converter(Converter::FloatD),
        FieldDef::new("std_dev", 69, Some(80)).with_converter(Converter::FloatD),
    ];
    static ref MATRIX: Vec<FieldDef> = vec![
        FieldDef::new("row", 1, Some(6)).with_converter(Converter::Integer),
        FieldDef::new("col", 7, Some(12)).with_converter(Converter::Integer),
        FieldDef::new("v1", 13, Some(34)).with_converter(Converter::FloatD),
        FieldDef::new("v2", 35, Some(56)).with_converter(Converter::FloatD),
        FieldDef::new("v3", 57, Some(78)).with_converter(Converter::FloatD),
    ];
}

/// Section title: "+SOLUTION/MATRIX_ESTIMATE L CORR"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub name: String,
    /// Triangle flag, matrix sections only
    pub triangle: Option<String>,
    /// Matrix type (CORR, COVA, INFO), matrix sections only
    pub kind: Option<String>,
}

impl Title {
    /// Parses an opening or closing line
    pub fn parse(line: &str) -> Option<Self> {
        let captures = TITLE.captures(line)?;
        Some(Self {
            name: captures.get(1)?.as_str().to_string(),
            triangle: captures.get(2).map(|m| m.as_str().to_string()),
            kind: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }
    /// Stored triangle, lower by default
    pub fn triangle(&self) -> Triangle {
        match &self.triangle {
            Some(flag) => flag.parse().unwrap_or_default(),
            None => Triangle::default(),
        }
    }
}

/// Known SINEX sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    FileReference,
    FileComment,
    InputAcknowledgments,
    SiteId,
    SolutionEpochs,
    SolutionEstimate,
    SolutionApriori,
    MatrixEstimate,
    MatrixApriori,
    Unknown(String),
}

impl From<&str> for Section {
    fn from(name: &str) -> Self {
        match name {
            "FILE/REFERENCE" => Self::FileReference,
            "FILE/COMMENT" => Self::FileComment,
            "INPUT/ACKNOWLEDGMENTS" => Self::InputAcknowledgments,
            "SITE/ID" => Self::SiteId,
            "SOLUTION/EPOCHS" => Self::SolutionEpochs,
            "SOLUTION/ESTIMATE" => Self::SolutionEstimate,
            "SOLUTION/APRIORI" => Self::SolutionApriori,
            "SOLUTION/MATRIX_ESTIMATE" => Self::MatrixEstimate,
            "SOLUTION/MATRIX_APRIORI" => Self::MatrixApriori,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Section {
    pub fn name(&self) -> &str {
        match self {
            Self::FileReference => "FILE/REFERENCE",
            Self::FileComment => "FILE/COMMENT",
            Self::InputAcknowledgments => "INPUT/ACKNOWLEDGMENTS",
            Self::SiteId => "SITE/ID",
            Self::SolutionEpochs => "SOLUTION/EPOCHS",
            Self::SolutionEstimate => "SOLUTION/ESTIMATE",
            Self::SolutionApriori => "SOLUTION/APRIORI",
            Self::MatrixEstimate => "SOLUTION/MATRIX_ESTIMATE",
            Self::MatrixApriori => "SOLUTION/MATRIX_APRIORI",
            Self::Unknown(name) => name,
        }
    }
    /// Column layout of data lines. Unknown sections have none.
    pub fn layout(&self) -> Option<&'static [FieldDef]> {
        match self {
            Self::FileReference => Some(FILE_REFERENCE.as_slice()),
            Self::FileComment | Self::InputAcknowledgments => Some(TEXT.as_slice()),
            Self::SiteId => Some(SITE_ID.as_slice()),
            Self::SolutionEpochs => Some(SOLUTION_EPOCHS.as_slice()),
            Self::SolutionEstimate | Self::SolutionApriori => Some(SOLUTION_VALUES.as_slice()),
            Self::MatrixEstimate | Self::MatrixApriori => Some(MATRIX.as_slice()),
            Self::Unknown(_) => None,
        }
    }
    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::MatrixEstimate | Self::MatrixApriori)
    }
    /// Table whose row count sizes this matrix
    pub fn companion(&self) -> Option<Section> {
        match self {
            Self::MatrixEstimate => Some(Self::SolutionEstimate),
            Self::MatrixApriori => Some(Self::SolutionApriori),
            _ => None,
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.name())
    }
}
