//! RINEX header markers, records and validated header blocks
use crate::{
    block::BlockDef,
    converter::{Converter, EpochFormat, Value},
    diagnostics::DiagnosticKind,
    error::ParsingError,
    fields::{slice, FieldDef, Fields, Span},
    record::{Context, RecordDef},
    rinex::RinexLine,
    state::{ParseState, Row},
};

use hifitime::TimeScale;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Header markers are found in columns 60..80
pub const MARKER_COLUMN: usize = 60;

/// Prefix of cache keys holding declared item counts
const EXPECTED: &str = "expected/";

/// Header markers this crate knows how to interpret
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderMarker {
    Version,
    Program,
    Comment,
    MarkerName,
    MarkerNumber,
    ObserverAgency,
    Receiver,
    Antenna,
    ApproxPosition,
    AntennaDeltaHEN,
    /// V3 observables, per system
    SysObsTypes,
    /// V2 (and meteo) observables
    TypesOfObserv,
    SensorModTypeAcc,
    SensorPos,
    Interval,
    TimeOfFirstObs,
    TimeOfLastObs,
    LeapSeconds,
    MarkerType,
    AntennaDeltaXYZ,
    /// V2 L1/L2 wavelength factors
    WavelengthFact,
    GlonassSlotFrq,
    GlonassCodPhsBis,
    SysPhaseShift,
    PrnNumOfObs,
    NumberOfSatellites,
    RcvClockOffsAppl,
    SysDcbsApplied,
    SysPcvsApplied,
    SysScaleFactor,
    SignalStrengthUnit,
    Doi,
    LicenseOfUse,
    StationInformation,
    EndOfHeader,
    /// Any other marker
    Other(String),
}

impl HeaderMarker {
    /// Marker as it appears in the file
    pub fn as_str(&self) -> &str {
        match self {
            Self::Version => "RINEX VERSION / TYPE",
            Self::Program => "PGM / RUN BY / DATE",
            Self::Comment => "COMMENT",
            Self::MarkerName => "MARKER NAME",
            Self::MarkerNumber => "MARKER NUMBER",
            Self::ObserverAgency => "OBSERVER / AGENCY",
            Self::Receiver => "REC # / TYPE / VERS",
            Self::Antenna => "ANT # / TYPE",
            Self::ApproxPosition => "APPROX POSITION XYZ",
            Self::AntennaDeltaHEN => "ANTENNA: DELTA H/E/N",
            Self::SysObsTypes => "SYS / # / OBS TYPES",
            Self::TypesOfObserv => "# / TYPES OF OBSERV",
            Self::SensorModTypeAcc => "SENSOR MOD/TYPE/ACC",
            Self::SensorPos => "SENSOR POS XYZ/H",
            Self::Interval => "INTERVAL",
            Self::TimeOfFirstObs => "TIME OF FIRST OBS",
            Self::TimeOfLastObs => "TIME OF LAST OBS",
            Self::LeapSeconds => "LEAP SECONDS",
            Self::MarkerType => "MARKER TYPE",
            Self::AntennaDeltaXYZ => "ANTENNA: DELTA X/Y/Z",
            Self::WavelengthFact => "WAVELENGTH FACT L1/2",
            Self::GlonassSlotFrq => "GLONASS SLOT / FRQ #",
            Self::GlonassCodPhsBis => "GLONASS COD/PHS/BIS",
            Self::SysPhaseShift => "SYS / PHASE SHIFT",
            Self::PrnNumOfObs => "PRN / # OF OBS",
            Self::NumberOfSatellites => "# OF SATELLITES",
            Self::RcvClockOffsAppl => "RCV CLOCK OFFS APPL",
            Self::SysDcbsApplied => "SYS / DCBS APPLIED",
            Self::SysPcvsApplied => "SYS / PCVS APPLIED",
            Self::SysScaleFactor => "SYS / SCALE FACTOR",
            Self::SignalStrengthUnit => "SIGNAL STRENGTH UNIT",
            Self::Doi => "DOI",
            Self::LicenseOfUse => "LICENSE OF USE",
            Self::StationInformation => "STATION INFORMATION",
            Self::EndOfHeader => "END OF HEADER",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for HeaderMarker {
    fn from(s: &str) -> Self {
        match s.trim() {
            "RINEX VERSION / TYPE" => Self::Version,
            "PGM / RUN BY / DATE" => Self::Program,
            "COMMENT" => Self::Comment,
            "MARKER NAME" => Self::MarkerName,
            "MARKER NUMBER" => Self::MarkerNumber,
            "OBSERVER / AGENCY" => Self::ObserverAgency,
            "REC # / TYPE / VERS" => Self::Receiver,
            "ANT # / TYPE" => Self::Antenna,
            "APPROX POSITION XYZ" => Self::ApproxPosition,
            "ANTENNA: DELTA H/E/N" => Self::AntennaDeltaHEN,
            "SYS / # / OBS TYPES" => Self::SysObsTypes,
            "# / TYPES OF OBSERV" => Self::TypesOfObserv,
            "SENSOR MOD/TYPE/ACC" => Self::SensorModTypeAcc,
            "SENSOR POS XYZ/H" => Self::SensorPos,
            "INTERVAL" => Self::Interval,
            "TIME OF FIRST OBS" => Self::TimeOfFirstObs,
            "TIME OF LAST OBS" => Self::TimeOfLastObs,
            "LEAP SECONDS" => Self::LeapSeconds,
            "MARKER TYPE" => Self::MarkerType,
            "ANTENNA: DELTA X/Y/Z" => Self::AntennaDeltaXYZ,
            "WAVELENGTH FACT L1/2" => Self::WavelengthFact,
            "GLONASS SLOT / FRQ #" => Self::GlonassSlotFrq,
            "GLONASS COD/PHS/BIS" => Self::GlonassCodPhsBis,
            "SYS / PHASE SHIFT" => Self::SysPhaseShift,
            "PRN / # OF OBS" => Self::PrnNumOfObs,
            "# OF SATELLITES" => Self::NumberOfSatellites,
            "RCV CLOCK OFFS APPL" => Self::RcvClockOffsAppl,
            "SYS / DCBS APPLIED" => Self::SysDcbsApplied,
            "SYS / PCVS APPLIED" => Self::SysPcvsApplied,
            "SYS / SCALE FACTOR" => Self::SysScaleFactor,
            "SIGNAL STRENGTH UNIT" => Self::SignalStrengthUnit,
            "DOI" => Self::Doi,
            "LICENSE OF USE" => Self::LicenseOfUse,
            "STATION INFORMATION" => Self::StationInformation,
            "END OF HEADER" => Self::EndOfHeader,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for HeaderMarker {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Labels header lines by their marker. Lines with no marker are ignored.
pub fn header_label(line: &str, _: usize) -> Option<RinexLine> {
    let marker = slice(line, Span::new(MARKER_COLUMN, None)).trim();
    if marker.is_empty() {
        None
    } else {
        Some(RinexLine::Header(HeaderMarker::from(marker)))
    }
}

/// The header ends on its own marker
pub fn is_end_of_header(line: &str, _: usize, _: Option<&str>) -> bool {
    slice(line, Span::new(MARKER_COLUMN, None)).trim() == HeaderMarker::EndOfHeader.as_str()
}

/// Stores every non empty field in the meta store, under the field name
fn store_meta(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    for (name, value) in fields.iter() {
        match value {
            Value::Missing => {},
            Value::Text(s) if s.is_empty() => {},
            value => ctx.state.set_meta(name, value.clone()),
        }
    }
    Ok(())
}

fn extend_list(state: &mut ParseState, key: &str, items: &[String]) {
    let mut list = state
        .meta(key)
        .and_then(|v| v.as_list())
        .map(|l| l.to_vec())
        .unwrap_or_default();
    list.extend_from_slice(items);
    state.set_meta(key, Value::List(list));
}

/// Keeps the line content as is, one list item per line,
/// under the field name
fn passthrough(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    for (name, value) in fields.iter() {
        match value.as_str() {
            Some(content) if !content.is_empty() => {
                extend_list(ctx.state, name, &[content.to_string()]);
            },
            _ => {},
        }
    }
    Ok(())
}

fn comment(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    extend_list(ctx.state, "comments", &[fields.text("comment").to_string()]);
    Ok(())
}

/// V3 observables: continuation lines omit the system letter,
/// which is recovered from the cache.
fn sys_obs_types(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let system = match fields.text("system") {
        "" => ctx
            .cache
            .text("system")
            .map(|s| s.to_string())
            .ok_or_else(|| ParsingError::Format {
                line: fields.index,
                reason: format!("\"{}\" continuation without system", HeaderMarker::SysObsTypes),
            })?,
        system => {
            ctx.cache.set("system", Value::from(system));
            system.to_string()
        },
    };
    let key = format!("observables/{}", system);
    if let Some(count) = fields.integer("count") {
        ctx.cache
            .set(&format!("{}{}", EXPECTED, key), Value::Integer(count));
    }
    let codes = fields.get("codes").and_then(|v| v.as_list()).unwrap_or(&[]);
    extend_list(ctx.state, &key, codes);
    Ok(())
}

/// V2 observables: continuation lines omit the count
fn types_of_observ(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let expected = format!("{}observables", EXPECTED);
    match fields.integer("count") {
        Some(count) => ctx.cache.set(&expected, Value::Integer(count)),
        None => {
            if !ctx.cache.contains(&expected) {
                return Err(ParsingError::Format {
                    line: fields.index,
                    reason: format!("\"{}\" continuation without count", HeaderMarker::TypesOfObserv),
                });
            }
        },
    }
    let codes = fields.get("codes").and_then(|v| v.as_list()).unwrap_or(&[]);
    extend_list(ctx.state, "observables", codes);
    Ok(())
}

fn sensor(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    ctx.state.push_row("sensors", Row::from(fields));
    Ok(())
}

fn sensor_position(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    ctx.state.push_row("sensor_positions", Row::from(fields));
    Ok(())
}

fn end_of_header(_: &Fields, _: &mut Context<ParseState>) -> Result<(), ParsingError> {
    Ok(())
}

/// Header conclusion: declared counts are cross checked
/// against the listed observables.
fn conclude(ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
    let mut mismatches = Vec::new();
    for key in ctx.cache.keys() {
        let list = match key.strip_prefix(EXPECTED) {
            Some(list) => list,
            None => continue,
        };
        let declared = ctx.cache.get(key).and_then(|v| v.as_i64()).unwrap_or(0);
        let listed = ctx
            .state
            .meta(list)
            .and_then(|v| v.as_list())
            .map(|l| l.len())
            .unwrap_or(0);
        if declared != listed as i64 {
            mismatches.push(format!(
                "{}: {} declared, {} listed",
                list, declared, listed
            ));
        }
    }
    for mismatch in mismatches {
        ctx.diagnostics.warning(
            DiagnosticKind::Other,
            None,
            format!("{}: {}", ctx.options.source, mismatch),
        );
    }
    Ok(())
}

fn record(marker: &HeaderMarker) -> RecordDef<ParseState> {
    let name = marker.as_str();
    let epoch = Converter::Epoch(EpochFormat::Gregorian, TimeScale::UTC);
    match marker {
        HeaderMarker::Version => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("version", 0, Some(20)).with_converter(Converter::Float),
            FieldDef::new("type", 20, Some(40)),
            FieldDef::new("constellation", 40, Some(60)),
        ]),
        HeaderMarker::Program => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("program", 0, Some(20)),
            FieldDef::new("run_by", 20, Some(40)),
            FieldDef::new("date", 40, Some(60)),
        ]),
        HeaderMarker::Comment => {
            RecordDef::new(name, comment).with_field(FieldDef::new("comment", 0, Some(60)))
        },
        HeaderMarker::MarkerName => RecordDef::new(name, store_meta)
            .with_field(FieldDef::new("marker_name", 0, Some(60))),
        HeaderMarker::MarkerNumber => RecordDef::new(name, store_meta)
            .with_field(FieldDef::new("marker_number", 0, Some(20))),
        HeaderMarker::ObserverAgency => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("observer", 0, Some(20)),
            FieldDef::new("agency", 20, Some(60)),
        ]),
        HeaderMarker::Receiver => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("receiver_number", 0, Some(20)),
            FieldDef::new("receiver_model", 20, Some(40)),
            FieldDef::new("receiver_firmware", 40, Some(60)),
        ]),
        HeaderMarker::Antenna => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("antenna_number", 0, Some(20)),
            FieldDef::new("antenna_model", 20, Some(40)),
        ]),
        HeaderMarker::ApproxPosition => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("approx_position", 0, Some(42)).with_converter(Converter::Tuple),
        ),
        HeaderMarker::AntennaDeltaHEN => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("antenna_delta_hen", 0, Some(42)).with_converter(Converter::Tuple),
        ),
        HeaderMarker::SysObsTypes => RecordDef::new(name, sys_obs_types).with_fields(vec![
            FieldDef::new("system", 0, Some(1)),
            FieldDef::new("count", 3, Some(6)).with_converter(Converter::Integer),
            FieldDef::new("codes", 6, Some(58)).with_converter(Converter::List),
        ]),
        HeaderMarker::TypesOfObserv => RecordDef::new(name, types_of_observ).with_fields(vec![
            FieldDef::new("count", 0, Some(6)).with_converter(Converter::Integer),
            FieldDef::new("codes", 6, Some(60)).with_converter(Converter::List),
        ]),
        HeaderMarker::SensorModTypeAcc => RecordDef::new(name, sensor).with_fields(vec![
            FieldDef::new("model", 0, Some(20)),
            FieldDef::new("type", 20, Some(40)),
            FieldDef::new("accuracy", 40, Some(53)).with_converter(Converter::Float),
            FieldDef::new("observable", 53, Some(60)),
        ]),
        HeaderMarker::SensorPos => RecordDef::new(name, sensor_position).with_fields(vec![
            FieldDef::new("xyzh", 0, Some(56)).with_converter(Converter::Tuple),
            FieldDef::new("observable", 56, Some(60)),
        ]),
        HeaderMarker::Interval => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("interval", 0, Some(10)).with_converter(Converter::Float),
        ),
        HeaderMarker::TimeOfFirstObs => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("time_of_first_obs", 0, Some(43)).with_converter(epoch),
            FieldDef::new("time_system", 43, Some(60)),
        ]),
        HeaderMarker::TimeOfLastObs => RecordDef::new(name, store_meta).with_fields(vec![
            FieldDef::new("time_of_last_obs", 0, Some(43)).with_converter(epoch),
            FieldDef::new("time_system", 43, Some(60)),
        ]),
        HeaderMarker::LeapSeconds => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("leap_seconds", 0, Some(6)).with_converter(Converter::Integer),
        ),
        HeaderMarker::MarkerType => RecordDef::new(name, store_meta)
            .with_field(FieldDef::new("marker_type", 0, Some(20))),
        HeaderMarker::AntennaDeltaXYZ => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("antenna_delta_xyz", 0, Some(42)).with_converter(Converter::Tuple),
        ),
        HeaderMarker::NumberOfSatellites => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("satellites", 0, Some(6)).with_converter(Converter::Integer),
        ),
        HeaderMarker::RcvClockOffsAppl => RecordDef::new(name, store_meta).with_field(
            FieldDef::new("rcv_clock_offs_applied", 0, Some(6)).with_converter(Converter::Integer),
        ),
        HeaderMarker::SignalStrengthUnit => RecordDef::new(name, store_meta)
            .with_field(FieldDef::new("signal_strength_unit", 0, Some(20))),
        HeaderMarker::Doi => {
            RecordDef::new(name, store_meta).with_field(FieldDef::new("doi", 0, Some(60)))
        },
        HeaderMarker::WavelengthFact => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("wavelength_factors", 0, Some(60))),
        HeaderMarker::GlonassSlotFrq => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("glonass_slot_frq", 0, Some(60))),
        HeaderMarker::GlonassCodPhsBis => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("glonass_cod_phs_bis", 0, Some(60))),
        HeaderMarker::SysPhaseShift => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("phase_shifts", 0, Some(60))),
        HeaderMarker::PrnNumOfObs => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("prn_obs_counts", 0, Some(60))),
        HeaderMarker::SysDcbsApplied => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("dcbs_applied", 0, Some(60))),
        HeaderMarker::SysPcvsApplied => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("pcvs_applied", 0, Some(60))),
        HeaderMarker::SysScaleFactor => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("scale_factors", 0, Some(60))),
        HeaderMarker::LicenseOfUse => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("license", 0, Some(60))),
        HeaderMarker::StationInformation => RecordDef::new(name, passthrough)
            .with_field(FieldDef::new("station_information", 0, Some(60))),
        HeaderMarker::EndOfHeader | HeaderMarker::Other(_) => RecordDef::new(name, end_of_header),
    }
}

fn header(
    name: &str,
    mandatory: &[HeaderMarker],
    optional: &[HeaderMarker],
) -> BlockDef<RinexLine, ParseState> {
    let mut block = BlockDef::new(name, is_end_of_header, header_label).with_end_callback(conclude);
    for marker in mandatory {
        block = block.with_mandatory(RinexLine::Header(marker.clone()), record(marker));
    }
    for marker in optional {
        block = block.with_optional(RinexLine::Header(marker.clone()), record(marker));
    }
    block
}

/// Observation RINEX header
pub fn observation_header() -> BlockDef<RinexLine, ParseState> {
    header(
        "OBS HEADER",
        &[
            HeaderMarker::Version,
            HeaderMarker::Program,
            HeaderMarker::MarkerName,
            HeaderMarker::ObserverAgency,
            HeaderMarker::EndOfHeader,
        ],
        &[
            HeaderMarker::Comment,
            HeaderMarker::MarkerNumber,
            HeaderMarker::Receiver,
            HeaderMarker::Antenna,
            HeaderMarker::ApproxPosition,
            HeaderMarker::AntennaDeltaHEN,
            HeaderMarker::SysObsTypes,
            HeaderMarker::TypesOfObserv,
            HeaderMarker::Interval,
            HeaderMarker::TimeOfFirstObs,
            HeaderMarker::TimeOfLastObs,
            HeaderMarker::LeapSeconds,
            HeaderMarker::MarkerType,
            HeaderMarker::AntennaDeltaXYZ,
            HeaderMarker::WavelengthFact,
            HeaderMarker::GlonassSlotFrq,
            HeaderMarker::GlonassCodPhsBis,
            HeaderMarker::SysPhaseShift,
            HeaderMarker::PrnNumOfObs,
            HeaderMarker::NumberOfSatellites,
            HeaderMarker::RcvClockOffsAppl,
            HeaderMarker::SysDcbsApplied,
            HeaderMarker::SysPcvsApplied,
            HeaderMarker::SysScaleFactor,
            HeaderMarker::SignalStrengthUnit,
            HeaderMarker::Doi,
            HeaderMarker::LicenseOfUse,
            HeaderMarker::StationInformation,
        ],
    )
}

/// Meteo RINEX header
pub fn meteo_header() -> BlockDef<RinexLine, ParseState> {
    header(
        "METEO HEADER",
        &[
            HeaderMarker::Version,
            HeaderMarker::Program,
            HeaderMarker::MarkerName,
            HeaderMarker::TypesOfObserv,
            HeaderMarker::EndOfHeader,
        ],
        &[
            HeaderMarker::Comment,
            HeaderMarker::MarkerNumber,
            HeaderMarker::SensorModTypeAcc,
            HeaderMarker::SensorPos,
            HeaderMarker::Interval,
            HeaderMarker::TimeOfFirstObs,
            HeaderMarker::TimeOfLastObs,
            HeaderMarker::LeapSeconds,
            HeaderMarker::MarkerType,
            HeaderMarker::Doi,
            HeaderMarker::LicenseOfUse,
            HeaderMarker::StationInformation,
        ],
    )
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn markers() {
        for marker in [
            HeaderMarker::Version,
            HeaderMarker::SysObsTypes,
            HeaderMarker::TypesOfObserv,
            HeaderMarker::EndOfHeader,
        ] {
            assert_eq!(HeaderMarker::from(marker.as_str()), marker);
        }
        assert_eq!(
            HeaderMarker::from("WAVELENGTH FACT L1/2"),
            HeaderMarker::WavelengthFact
        );
        assert_eq!(
            HeaderMarker::from("GLONASS SLOT / FRQ #"),
            HeaderMarker::GlonassSlotFrq
        );
        assert_eq!(
            HeaderMarker::from("VENDOR NOTES"),
            HeaderMarker::Other("VENDOR NOTES".to_string())
        );
        let line =
            "     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE";
        assert_eq!(
            header_label(line, 1),
            Some(RinexLine::Header(HeaderMarker::Version))
        );
        assert_eq!(header_label("short line", 2), None);
        assert!(is_end_of_header(
            "                                                            END OF HEADER",
            10,
            None
        ));
    }
    #[test]
    fn record_layouts() {
        let block = observation_header();
        assert!(block.validate().is_ok());
        let block = meteo_header();
        assert!(block.validate().is_ok());
        let validator = block.validator.as_ref().unwrap();
        assert_eq!(validator.mandatory().len(), 5);
        assert!(validator.is_known(&RinexLine::Header(HeaderMarker::SensorPos)));
    }
}
