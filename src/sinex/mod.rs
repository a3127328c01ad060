//! SINEX (Solution INdependent EXchange) definitions
pub mod section;

use crate::{
    block::{BlockDef, Sequence},
    converter::{Converter, EpochFormat, Value},
    diagnostics::{DiagnosticKind, Diagnostics},
    error::ParsingError,
    fields::{FieldDef, Fields, Strip},
    matrix::{reconstruct, MatrixEntry, Triangle},
    parser::ChainParser,
    record::{Context, Handler, RecordDef},
    state::{DataItem, ParseState, Row},
};

use hifitime::TimeScale;
use nalgebra::DMatrix;

use std::fmt::{Display, Formatter, Result as FmtResult};

pub use section::{Section, Title};

/// SINEX line labels
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SinexLine {
    /// "%=SNX" first line
    Header,
    /// "+NAME"
    Open,
    /// "-NAME"
    Close,
    /// Section content
    Data,
    /// "%ENDSNX"
    Trailer,
}

impl Display for SinexLine {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Header => write!(f, "%=SNX"),
            Self::Open => write!(f, "+SECTION"),
            Self::Close => write!(f, "-SECTION"),
            Self::Data => write!(f, "DATA"),
            Self::Trailer => write!(f, "%ENDSNX"),
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('*') || line.trim().is_empty()
}

fn sinex_label(line: &str, _: usize) -> Option<SinexLine> {
    if line.starts_with("%=SNX") {
        Some(SinexLine::Header)
    } else if line.starts_with("%ENDSNX") {
        Some(SinexLine::Trailer)
    } else if line.starts_with('+') {
        Some(SinexLine::Open)
    } else if line.starts_with('-') {
        Some(SinexLine::Close)
    } else {
        Some(SinexLine::Data)
    }
}

/// Header block is the first line only
fn end_of_header(_: &str, n: usize, _: Option<&str>) -> bool {
    n == 1
}

fn end_of_section(line: &str, _: usize, _: Option<&str>) -> bool {
    line.starts_with('-') || line.starts_with("%ENDSNX")
}

fn sinex_epoch() -> Converter {
    Converter::Epoch(EpochFormat::YearDaySeconds, TimeScale::UTC)
}

fn header(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    for (name, value) in fields.iter() {
        if !value.is_missing() {
            ctx.state.set_meta(name, value.clone());
        }
    }
    Ok(())
}

fn missing_header(fields: &Fields, _: &mut Context<ParseState>) -> Result<(), ParsingError> {
    Err(ParsingError::Format {
        line: fields.index,
        reason: "missing \"%=SNX\" header line".to_string(),
    })
}

fn open(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let title = Title::parse(&fields.line).ok_or_else(|| ParsingError::Format {
        line: fields.index,
        reason: format!("invalid section title \"{}\"", fields.line.trim()),
    })?;
    let section = Section::from(title.name.as_str());
    if section.layout().is_none() {
        ctx.diagnostics.debug(
            DiagnosticKind::StructuralMismatch,
            Some(fields.index),
            format!("unknown section \"{}\": content dropped", section),
        );
    }
    ctx.cache.set("section", Value::Text(title.name));
    if let Some(triangle) = title.triangle {
        ctx.cache.set("triangle", Value::Text(triangle));
    }
    if let Some(kind) = title.kind {
        ctx.cache.set("kind", Value::Text(kind));
    }
    Ok(())
}

fn close(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let title = Title::parse(&fields.line).ok_or_else(|| ParsingError::Format {
        line: fields.index,
        reason: format!("invalid section title \"{}\"", fields.line.trim()),
    })?;
    let opened = ctx.cache.text("section").map(|s| s.to_string());
    match opened {
        Some(opened) if opened == title.name => {
            ctx.cache.set("closed", Value::Integer(1));
            Ok(())
        },
        opened => Err(ParsingError::Format {
            line: fields.index,
            reason: format!(
                "section \"{}\" closed while \"{}\" is open",
                title.name,
                opened.as_deref().unwrap_or("none")
            ),
        }),
    }
}

fn trailer(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    if let Some(section) = ctx.cache.text("section") {
        if !ctx.cache.contains("closed") {
            return Err(ParsingError::Format {
                line: fields.index,
                reason: format!("\"%ENDSNX\" while \"{}\" is open", section),
            });
        }
    }
    ctx.state.set_meta("complete", Value::Integer(1));
    Ok(())
}

fn extend_list(state: &mut ParseState, key: &str, item: &str) {
    let mut list = state
        .meta(key)
        .and_then(|v| v.as_list())
        .map(|l| l.to_vec())
        .unwrap_or_default();
    list.push(item.to_string());
    state.set_meta(key, Value::List(list));
}

/// Data lines are sliced per the section opened in the cache
fn data(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let section = match ctx.cache.text("section") {
        Some(name) => Section::from(name),
        None => {
            ctx.diagnostics.debug(
                DiagnosticKind::StructuralMismatch,
                Some(fields.index),
                "content outside of any section: line dropped".to_string(),
            );
            return Ok(());
        },
    };
    let layout = match section.layout() {
        Some(layout) => layout,
        None => return Ok(()),
    };
    let parsed = Fields::parse(&fields.line, fields.index, layout, Strip::Whitespace, None)?;
    match section {
        Section::FileReference => {
            let key = format!("{}/{}", section, parsed.text("descriptor"));
            ctx.state
                .set_meta(&key, Value::from(parsed.text("information")));
        },
        Section::FileComment => extend_list(ctx.state, "comments", parsed.text("text")),
        Section::InputAcknowledgments => {
            extend_list(ctx.state, "acknowledgments", parsed.text("text"))
        },
        Section::MatrixEstimate | Section::MatrixApriori => {
            ctx.cache.append("matrix", parsed);
        },
        _ => ctx.state.push_row(section.name(), Row::from(&parsed)),
    }
    Ok(())
}

/// Section conclusion: matrices are rebuilt, sized from their companion table
fn conclude(ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let section = match ctx.cache.text("section") {
        Some(name) => Section::from(name),
        None => return Ok(()),
    };
    if !ctx.cache.contains("closed") {
        ctx.diagnostics.warning(
            DiagnosticKind::Other,
            None,
            format!("{}: section \"{}\" never closed", ctx.options.source, section),
        );
    }
    if !section.is_matrix() {
        return Ok(());
    }

    let triangle = ctx
        .cache
        .text("triangle")
        .map(|t| t.parse::<Triangle>().unwrap_or_default())
        .unwrap_or_default();
    let size = section
        .companion()
        .and_then(|companion| ctx.state.table(companion.name()))
        .map(|rows| rows.len());

    let rows = ctx.cache.take_rows("matrix");
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        entries.push(MatrixEntry::from_fields(row, "row", "col", &["v1", "v2", "v3"])?);
    }

    let matrix = reconstruct(
        &entries,
        &triangle,
        size,
        ctx.options.max_matrix_dimension,
        ctx.diagnostics,
    )?;

    // keyed by title: one section may come in several types
    let key = match ctx.cache.text("kind") {
        Some(kind) => format!("{} {}", section, kind),
        None => section.name().to_string(),
    };
    if ctx.state.matrix(&key).is_some() {
        ctx.diagnostics.warning(
            DiagnosticKind::Other,
            None,
            format!("{}: duplicate \"{}\" section replaced", ctx.options.source, key),
        );
    }
    ctx.state.set_matrix(&key, matrix);
    Ok(())
}

/// "%=SNX" header line
pub fn header_block() -> BlockDef<SinexLine, ParseState> {
    let record = RecordDef::new("%=SNX", header).with_fields(vec![
        FieldDef::new("version", 6, Some(10)).with_converter(Converter::Float),
        FieldDef::new("agency", 11, Some(14)),
        FieldDef::new("created", 15, Some(27)).with_converter(sinex_epoch()),
        FieldDef::new("data_agency", 28, Some(31)),
        FieldDef::new("start", 32, Some(44)).with_converter(sinex_epoch()),
        FieldDef::new("end", 45, Some(57)).with_converter(sinex_epoch()),
        FieldDef::new("technique", 58, Some(59)),
        FieldDef::new("estimates", 60, Some(65)).with_converter(Converter::Integer),
        FieldDef::new("constraint", 66, Some(67)).with_converter(Converter::Integer),
        FieldDef::new("contents", 68, None).with_converter(Converter::List),
    ]);
    BlockDef::new("SINEX HEADER", end_of_header, sinex_label)
        .with_record(SinexLine::Header, record)
        .with_fallback(RecordDef::new("missing header", missing_header))
}

/// One "+NAME" .. "-NAME" section
pub fn section_block() -> BlockDef<SinexLine, ParseState> {
    let raw = |name: &str, handler: Handler<ParseState>| {
        RecordDef::new(name, handler)
            .with_field(FieldDef::new("line", 0, None))
            .with_strip(Strip::None)
    };
    BlockDef::new("SINEX SECTION", end_of_section, sinex_label)
        .with_skip_line(is_comment)
        .with_record(SinexLine::Open, raw("open", open))
        .with_record(SinexLine::Close, raw("close", close))
        .with_record(SinexLine::Data, raw("data", data))
        .with_record(SinexLine::Trailer, raw("trailer", trailer))
        .with_end_callback(conclude)
}

/// SINEX parser: header line, then repeating sections
pub fn parser() -> ChainParser<SinexLine, ParseState> {
    ChainParser::new(Sequence::finite(vec![header_block()]).then_repeat(section_block()))
        .with_postprocessor(name_matrices)
        .with_postprocessor(correlation_to_covariance)
}

/// Renames matrices from their title ("<SECTION> <TYPE>")
/// to "<SECTION>/<TYPE>"
pub fn name_matrices(state: &mut ParseState, _: &mut Diagnostics) -> Result<(), ParsingError> {
    let named: Vec<(String, String)> = state
        .data
        .iter()
        .filter(|(_, item)| matches!(item, DataItem::Matrix(_)))
        .filter_map(|(key, _)| {
            key.split_once(' ')
                .map(|(section, kind)| (key.clone(), format!("{}/{}", section, kind)))
        })
        .collect();
    for (from, to) in named {
        state.rename(&from, &to);
    }
    Ok(())
}

/// CORR matrices carry standard deviations on their diagonal
/// and correlation factors elsewhere.
pub fn covariance(corr: &DMatrix<f64>) -> DMatrix<f64> {
    let n = corr.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            corr[(i, i)].powi(2)
        } else {
            corr[(i, j)] * corr[(i, i)] * corr[(j, j)]
        }
    })
}

/// Derives ".../COVA" from every ".../CORR" matrix, when not provided
pub fn correlation_to_covariance(
    state: &mut ParseState,
    diagnostics: &mut Diagnostics,
) -> Result<(), ParsingError> {
    let derived: Vec<(String, DMatrix<f64>)> = state
        .data
        .iter()
        .filter_map(|(key, item)| match item {
            DataItem::Matrix(m) => key
                .strip_suffix("/CORR")
                .map(|base| (format!("{}/COVA", base), covariance(m))),
            _ => None,
        })
        .filter(|(key, _)| !state.data.contains_key(key))
        .collect();
    for (key, cova) in derived {
        diagnostics.debug(
            DiagnosticKind::Other,
            None,
            format!("\"{}\" derived from correlations", key),
        );
        state.set_matrix(&key, cova);
    }
    Ok(())
}
