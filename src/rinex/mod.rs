//! RINEX (Observation header, Meteo) definitions
pub mod header;
pub mod meteo;

use crate::{
    block::Sequence,
    converter::Value,
    diagnostics::{DiagnosticKind, Diagnostics},
    error::{ConversionError, ParsingError},
    parser::ChainParser,
    state::ParseState,
};

use gnss::prelude::Constellation;
use hifitime::{Epoch, TimeScale};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

pub use header::HeaderMarker;
pub use meteo::METEO_TABLE;

/// RINEX line labels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RinexLine {
    /// Header line, identified by its marker
    Header(HeaderMarker),
    /// Meteo epoch line, 2 digit year
    EpochV2,
    /// Meteo epoch line, 4 digit year
    EpochV3,
    /// Meteo continuation line
    Continuation,
}

impl Display for RinexLine {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Header(marker) => write!(f, "{}", marker),
            Self::EpochV2 => write!(f, "EPOCH (V2)"),
            Self::EpochV3 => write!(f, "EPOCH (V3)"),
            Self::Continuation => write!(f, "CONTINUATION"),
        }
    }
}

/// Observation RINEX header parser. Observations themselves are not
/// interpreted: content past the header is ignored.
pub fn observation_parser() -> ChainParser<RinexLine, ParseState> {
    ChainParser::new(Sequence::finite(vec![header::observation_header()]))
        .with_postprocessor(resolve_time_scale)
        .with_postprocessor(apply_time_scale)
}

/// Meteo RINEX parser: header then one block per epoch
pub fn meteo_parser() -> ChainParser<RinexLine, ParseState> {
    ChainParser::new(
        Sequence::finite(vec![header::meteo_header()]).then_repeat(meteo::meteo_record()),
    )
    .with_postprocessor(resolve_time_scale)
    .with_postprocessor(apply_time_scale)
}

/// Time scale the file is expressed in: the `TIME OF FIRST OBS` system,
/// otherwise the header constellation, otherwise UTC.
pub fn time_scale(state: &ParseState) -> TimeScale {
    if let Some(system) = state.meta_text("time_system") {
        if system == "BDT" {
            return TimeScale::BDT;
        }
        if let Some(ts) = Constellation::from_str(system)
            .ok()
            .and_then(|c| c.timescale())
        {
            return ts;
        }
    }
    state
        .meta_text("constellation")
        .and_then(|c| Constellation::from_str(c).ok())
        .and_then(|c| c.timescale())
        .unwrap_or(TimeScale::UTC)
}

fn parse_time_scale(s: &str) -> Option<TimeScale> {
    match s {
        "UTC" => Some(TimeScale::UTC),
        "TAI" => Some(TimeScale::TAI),
        "GPST" => Some(TimeScale::GPST),
        "GST" => Some(TimeScale::GST),
        "BDT" => Some(TimeScale::BDT),
        _ => None,
    }
}

/// Resolves the file time scale, stored as meta `time_scale`
pub fn resolve_time_scale(
    state: &mut ParseState,
    diagnostics: &mut Diagnostics,
) -> Result<(), ParsingError> {
    let ts = time_scale(state);
    diagnostics.debug(
        DiagnosticKind::Other,
        None,
        format!("time scale resolved to {:?}", ts),
    );
    state.set_meta("time_scale", Value::Text(format!("{:?}", ts)));
    Ok(())
}

/// Epochs are decoded as UTC: they are re-expressed in the
/// resolved `time_scale`, which must run first.
pub fn apply_time_scale(
    state: &mut ParseState,
    diagnostics: &mut Diagnostics,
) -> Result<(), ParsingError> {
    let ts = match state.meta_text("time_scale").and_then(parse_time_scale) {
        Some(ts) => ts,
        None => {
            diagnostics.debug(
                DiagnosticKind::Other,
                None,
                "time scale not resolved: epochs left in UTC".to_string(),
            );
            return Ok(());
        },
    };
    if ts == TimeScale::UTC {
        return Ok(());
    }
    for key in ["time_of_first_obs", "time_of_last_obs"] {
        if let Some(epoch) = state.meta(key).and_then(|v| v.as_epoch()) {
            state.set_meta(key, Value::Epoch(reinterpret(epoch, ts)?));
        }
    }
    if let Some(rows) = state.table_mut(METEO_TABLE) {
        for row in rows.iter_mut() {
            if let Some(Value::Epoch(epoch)) = row.get_mut("epoch") {
                *epoch = reinterpret(*epoch, ts)?;
            }
        }
    }
    Ok(())
}

/// Same calendar date, in another time scale
fn reinterpret(epoch: Epoch, ts: TimeScale) -> Result<Epoch, ParsingError> {
    let (y, m, d, hh, mm, ss, ns) = epoch.to_gregorian_utc();
    Epoch::maybe_from_gregorian(y, m, d, hh, mm, ss, ns, ts)
        .map_err(|_| ParsingError::Value(ConversionError::new(&epoch.to_string(), "epoch")))
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn time_scale_resolution() {
        let mut state = ParseState::default();
        assert_eq!(time_scale(&state), TimeScale::UTC);
        state.set_meta("constellation", Value::from("G (GPS)"));
        assert_eq!(time_scale(&state), TimeScale::GPST);
        state.set_meta("time_system", Value::from("GAL"));
        assert_eq!(time_scale(&state), TimeScale::GST);
        state.set_meta("time_system", Value::from("BDT"));
        assert_eq!(time_scale(&state), TimeScale::BDT);
    }
    #[test]
    fn postprocessing_order() {
        let mut state = ParseState::default();
        let mut diags = Diagnostics::default();
        let epoch = Epoch::from_gregorian_utc(2021, 1, 7, 0, 0, 0, 0);
        state.set_meta("constellation", Value::from("G"));
        state.set_meta("time_of_first_obs", Value::Epoch(epoch));

        // applying before resolution is a no-op
        apply_time_scale(&mut state, &mut diags).unwrap();
        assert_eq!(state.meta("time_of_first_obs"), Some(&Value::Epoch(epoch)));

        resolve_time_scale(&mut state, &mut diags).unwrap();
        assert_eq!(state.meta_text("time_scale"), Some("GPST"));
        apply_time_scale(&mut state, &mut diags).unwrap();
        let gpst = state.meta("time_of_first_obs").and_then(|v| v.as_epoch()).unwrap();
        assert_eq!(gpst.time_scale, TimeScale::GPST);
        assert_eq!(gpst, Epoch::from_gregorian(2021, 1, 7, 0, 0, 0, 0, TimeScale::GPST));
    }
}
