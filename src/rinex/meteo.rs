//! Meteo RINEX body: one repeating block per epoch
use crate::{
    block::BlockDef,
    converter::{Converter, EpochFormat},
    diagnostics::DiagnosticKind,
    error::ParsingError,
    fields::{slice, FieldDef, Fields, Span},
    record::{Context, RecordDef},
    rinex::RinexLine,
    state::{ParseState, Row},
};

use hifitime::TimeScale;

/// Name of the produced table
pub const METEO_TABLE: &str = "METEO";

/// Value width (F7.1)
const VALUE_WIDTH: usize = 7;

/// Continuation lines start with 4 blanks
const CONTINUATION_OFFSET: usize = 4;

const VALUE_NAMES: [&str; 10] = ["v1", "v2", "v3", "v4", "v5", "v6", "v7", "v8", "v9", "v10"];

fn values(offset: usize, count: usize) -> Vec<FieldDef> {
    VALUE_NAMES
        .iter()
        .take(count)
        .enumerate()
        .map(|(k, name)| {
            let start = offset + k * VALUE_WIDTH;
            FieldDef::new(*name, start, Some(start + VALUE_WIDTH)).with_converter(Converter::Float)
        })
        .collect()
}

/// True when this line starts a new epoch
pub fn is_new_epoch(line: &str) -> bool {
    !slice(line, Span::new(0, Some(CONTINUATION_OFFSET)))
        .trim()
        .is_empty()
}

/// Epoch closes when next line is a new epoch, or input ends
fn end_of_epoch(_: &str, _: usize, next: Option<&str>) -> bool {
    next.map(is_new_epoch).unwrap_or(true)
}

/// First line of the block is the epoch line: 4 digit years
/// identify V3 content.
fn meteo_label(line: &str, n: usize) -> Option<RinexLine> {
    if line.trim().is_empty() {
        return None;
    }
    if n > 1 {
        return Some(RinexLine::Continuation);
    }
    let year = slice(line, Span::new(1, Some(5)));
    if year.chars().all(|c| c.is_ascii_digit()) {
        Some(RinexLine::EpochV3)
    } else {
        Some(RinexLine::EpochV2)
    }
}

fn epoch(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let epoch = fields.get("epoch").cloned().unwrap_or_default();
    ctx.cache.set("epoch", epoch);
    ctx.cache.append("values", fields.clone());
    Ok(())
}

fn continuation(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    if !ctx.cache.contains("epoch") {
        return Err(ParsingError::Format {
            line: fields.index,
            reason: "meteo continuation line without epoch".to_string(),
        });
    }
    ctx.cache.append("values", fields.clone());
    Ok(())
}

/// Maps the accumulated values to the header observables
fn conclude(ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let epoch = match ctx.cache.get("epoch") {
        Some(epoch) => epoch.clone(),
        None => return Ok(()),
    };
    let codes = match ctx.state.meta("observables").and_then(|v| v.as_list()) {
        Some(codes) => codes.to_vec(),
        None => {
            ctx.diagnostics.warning(
                DiagnosticKind::Other,
                None,
                format!("{}: meteo epoch {} without declared observables", ctx.options.source, epoch),
            );
            return Ok(());
        },
    };
    let lines = ctx.cache.take_rows("values");
    let values = lines.iter().flat_map(|fields| {
        VALUE_NAMES
            .iter()
            .map_while(move |name| fields.get(name).cloned())
    });
    let mut row = Row::new();
    row.insert("epoch".to_string(), epoch);
    for (code, value) in codes.iter().zip(values) {
        row.insert(code.clone(), value);
    }
    ctx.state.push_row(METEO_TABLE, row);
    Ok(())
}

/// One epoch: epoch line then continuation lines
pub fn meteo_record() -> BlockDef<RinexLine, ParseState> {
    let v2 = RecordDef::new("METEO EPOCH V2", epoch).with_fields(
        std::iter::once(
            FieldDef::new("epoch", 0, Some(18))
                .with_converter(Converter::Epoch(EpochFormat::Gregorian, TimeScale::UTC)),
        )
        .chain(values(18, 8))
        .collect(),
    );
    let v3 = RecordDef::new("METEO EPOCH V3", epoch).with_fields(
        std::iter::once(
            FieldDef::new("epoch", 0, Some(20))
                .with_converter(Converter::Epoch(EpochFormat::Gregorian, TimeScale::UTC)),
        )
        .chain(values(20, 8))
        .collect(),
    );
    let cont = RecordDef::new("METEO CONTINUATION", continuation)
        .with_fields(values(CONTINUATION_OFFSET, 10));
    BlockDef::new("METEO EPOCH", end_of_epoch, meteo_label)
        .with_record(RinexLine::EpochV2, v2)
        .with_record(RinexLine::EpochV3, v3)
        .with_record(RinexLine::Continuation, cont)
        .with_end_callback(conclude)
}
