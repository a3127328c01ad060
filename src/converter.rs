//! Named type converters, applied to raw field substrings
use crate::error::ConversionError;
use dms_coordinates::{Cardinal, DMS};
use hifitime::{Duration, Epoch, TimeScale};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A converted field value
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// Blank field, or explicitly "unset" content
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Epoch(Epoch),
    /// Whitespace separated items
    List(Vec<String>),
    /// Whitespace separated numbers
    Tuple(Vec<f64>),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
    /// Integers are promoted to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_epoch(&self) -> Option<Epoch> {
        match self {
            Self::Epoch(e) => Some(*e),
            _ => None,
        }
    }
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
    pub fn as_tuple(&self) -> Option<&[f64]> {
        match self {
            Self::Tuple(t) => Some(t),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Missing => write!(f, "-"),
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Epoch(e) => write!(f, "{}", e),
            Self::List(l) => write!(f, "{}", l.join(" ")),
            Self::Tuple(t) => {
                let items: Vec<String> = t.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", items.join(" "))
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<Epoch> for Value {
    fn from(e: Epoch) -> Self {
        Self::Epoch(e)
    }
}

/// Epoch text encodings
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpochFormat {
    /// "YY:DDD:SSSSS" or "YYYY:DDD:SSSSS" (SINEX)
    YearDaySeconds,
    /// "yyyy mm dd hh mm ss.sssssss" (RINEX), 2 digit years accepted
    Gregorian,
    /// Modified julian day, as a float number
    Mjd,
}

/// [Converter] is the registry of known conversions.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Converter {
    /// Text passthrough
    #[default]
    Text,
    Integer,
    Float,
    /// Float that may use the Fortran `D` exponent marker
    FloatD,
    /// "D M S" to decimal degrees
    DmsDegrees,
    /// "D M S" to radians
    DmsRadians,
    /// Epoch in given encoding, expressed in given [TimeScale]
    Epoch(EpochFormat, TimeScale),
    /// Whitespace split into text items
    List,
    /// Whitespace split into float numbers
    Tuple,
}

impl FromStr for Converter {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "str" | "text" => Ok(Self::Text),
            "int" | "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "d_float" | "float_d" => Ok(Self::FloatD),
            "dms2deg" => Ok(Self::DmsDegrees),
            "dms2rad" => Ok(Self::DmsRadians),
            "epoch" | "sinex_epoch" => Ok(Self::Epoch(
                EpochFormat::YearDaySeconds,
                TimeScale::UTC,
            )),
            "rinex_epoch" => Ok(Self::Epoch(EpochFormat::Gregorian, TimeScale::UTC)),
            "mjd" => Ok(Self::Epoch(EpochFormat::Mjd, TimeScale::UTC)),
            "list" => Ok(Self::List),
            "tuple" => Ok(Self::Tuple),
            _ => Err(ConversionError::new(s, "converter name")),
        }
    }
}

impl Converter {
    /// Name of the produced type
    pub fn target(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float | Self::FloatD => "float",
            Self::DmsDegrees => "degrees",
            Self::DmsRadians => "radians",
            Self::Epoch(EpochFormat::YearDaySeconds, _) => "YY:DDD:SSSSS epoch",
            Self::Epoch(EpochFormat::Gregorian, _) => "yyyy mm dd hh mm ss epoch",
            Self::Epoch(EpochFormat::Mjd, _) => "mjd epoch",
            Self::List => "list",
            Self::Tuple => "float tuple",
        }
    }

    /// True for converters that produce text: blank sentinels do not apply
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Converts a stripped substring. Blank handling is up to the caller.
    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        match self {
            Self::Text => Ok(Value::Text(raw.to_string())),
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ConversionError::new(raw, self.target())),
            Self::Float => parse_float(raw)
                .map(Value::Float)
                .ok_or_else(|| ConversionError::new(raw, self.target())),
            Self::FloatD => parse_float(&raw.replace(['D', 'd'], "E"))
                .map(Value::Float)
                .ok_or_else(|| ConversionError::new(raw, self.target())),
            Self::DmsDegrees => dms_to_degrees(raw).map(Value::Float),
            Self::DmsRadians => dms_to_degrees(raw).map(|deg| Value::Float(deg.to_radians())),
            Self::Epoch(EpochFormat::YearDaySeconds, ts) => parse_year_day_seconds(raw, *ts),
            Self::Epoch(EpochFormat::Gregorian, ts) => {
                parse_gregorian(raw, *ts).map(Value::Epoch)
            },
            Self::Epoch(EpochFormat::Mjd, ts) => parse_float(raw)
                .map(|mjd| Value::Epoch(Epoch::from_mjd_in_time_scale(mjd, *ts)))
                .ok_or_else(|| ConversionError::new(raw, self.target())),
            Self::List => Ok(Value::List(
                raw.split_ascii_whitespace().map(|s| s.to_string()).collect(),
            )),
            Self::Tuple => {
                let mut values = Vec::new();
                for item in raw.split_ascii_whitespace() {
                    let value = parse_float(&item.replace(['D', 'd'], "E"))
                        .ok_or_else(|| ConversionError::new(raw, self.target()))?;
                    values.push(value);
                }
                Ok(Value::Tuple(values))
            },
        }
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Converts "D M S" to decimal degrees. The sign of the degree token
/// applies to the whole angle, expressed as a southern bearing.
pub fn dms_to_degrees(raw: &str) -> Result<f64, ConversionError> {
    let err = || ConversionError::new(raw, "degrees");
    let items: Vec<&str> = raw.split_ascii_whitespace().collect();
    if items.is_empty() || items.len() > 3 {
        return Err(err());
    }
    let degrees = items[0].parse::<i32>().map_err(|_| err())?;
    let minutes = match items.get(1) {
        Some(item) => item.parse::<u8>().map_err(|_| err())?,
        None => 0,
    };
    let seconds = match items.get(2) {
        Some(item) => item.parse::<f64>().map_err(|_| err())?,
        None => 0.0,
    };
    let bearing = if items[0].starts_with('-') {
        Some(Cardinal::South)
    } else {
        Some(Cardinal::North)
    };
    let degrees = u16::try_from(degrees.unsigned_abs()).map_err(|_| err())?;
    let dms = DMS::new(degrees, minutes, seconds, bearing);
    Ok(dms.to_ddeg_angle())
}

/// Parses "YY:DDD:SSSSS" (or 4 digit year). "00:000:00000" is the unset epoch.
fn parse_year_day_seconds(raw: &str, ts: TimeScale) -> Result<Value, ConversionError> {
    let err = || ConversionError::new(raw, "YY:DDD:SSSSS epoch");
    let items: Vec<&str> = raw.trim().split(':').collect();
    if items.len() != 3 {
        return Err(err());
    }
    let year = items[0].parse::<i32>().map_err(|_| err())?;
    let doy = items[1].parse::<u16>().map_err(|_| err())?;
    let secs = items[2].parse::<f64>().map_err(|_| err())?;
    if year == 0 && doy == 0 && secs == 0.0 {
        return Ok(Value::Missing);
    }
    if doy == 0 || doy > 366 || !(0.0..=86_400.0).contains(&secs) {
        return Err(err());
    }
    let year = if items[0].len() > 2 {
        year
    } else if year <= 50 {
        year + 2000
    } else {
        year + 1900
    };
    let new_year = Epoch::from_gregorian(year, 1, 1, 0, 0, 0, 0, ts);
    Ok(Value::Epoch(
        new_year + Duration::from_days((doy - 1) as f64) + Duration::from_seconds(secs),
    ))
}

/// Parses "yyyy mm dd hh mm ss.sssssss"
fn parse_gregorian(raw: &str, ts: TimeScale) -> Result<Epoch, ConversionError> {
    let err = || ConversionError::new(raw, "yyyy mm dd hh mm ss epoch");
    let items: Vec<&str> = raw.split_ascii_whitespace().collect();
    if items.len() != 6 {
        return Err(err());
    }
    let mut y = items[0].parse::<i32>().map_err(|_| err())?;
    let m = items[1].parse::<u8>().map_err(|_| err())?;
    let d = items[2].parse::<u8>().map_err(|_| err())?;
    let hh = items[3].parse::<u8>().map_err(|_| err())?;
    let mm = items[4].parse::<u8>().map_err(|_| err())?;
    let secs = items[5].parse::<f64>().map_err(|_| err())?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || hh > 23 || mm > 59 {
        return Err(err());
    }
    if !(0.0..61.0).contains(&secs) {
        return Err(err());
    }
    if items[0].len() < 3 {
        // old RINEX 2 digit years
        if y < 80 {
            y += 2000;
        } else {
            y += 1900;
        }
    }
    let ss = secs.trunc() as u8;
    let nanos = ((secs - secs.trunc()) * 1.0E9).round() as u32;
    Epoch::maybe_from_gregorian(y, m, d, hh, mm, ss, nanos, ts).map_err(|_| err())
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn numbers() {
        assert_eq!(Converter::Integer.convert(" 42"), Ok(Value::Integer(42)));
        assert!(Converter::Integer.convert("4.2").is_err());
        assert_eq!(Converter::Float.convert("-2.5e-01"), Ok(Value::Float(-0.25)));
        assert_eq!(Converter::FloatD.convert("0.1025D-07"), Ok(Value::Float(0.1025E-07)));
        assert_eq!(Converter::FloatD.convert("1.34d+03"), Ok(Value::Float(1340.0)));
        let err = Converter::Float.convert("abc").unwrap_err();
        assert_eq!(err.raw, "abc");
        assert_eq!(err.target, "float");
    }
    #[test]
    fn dms() {
        assert_eq!(Converter::DmsDegrees.convert("40 30 0.0"), Ok(Value::Float(40.5)));
        assert_eq!(Converter::DmsDegrees.convert("-0 30 0.0"), Ok(Value::Float(-0.5)));
        let deg = Converter::DmsDegrees.convert("-12 15 36").unwrap();
        assert!((deg.as_f64().unwrap() + 12.26).abs() < 1.0E-12);
        let rad = Converter::DmsRadians.convert("180 0 0").unwrap();
        assert!((rad.as_f64().unwrap() - std::f64::consts::PI).abs() < 1.0E-12);
        assert!(Converter::DmsDegrees.convert("40 x 0").is_err());
        assert!(Converter::DmsDegrees.convert("1 2 3 4").is_err());
        assert!(Converter::DmsDegrees.convert("1.5 2 3").is_err());
        assert_eq!(Converter::DmsDegrees.convert("-12"), Ok(Value::Float(-12.0)));
    }
    #[test]
    fn sinex_epochs() {
        let conv = Converter::Epoch(EpochFormat::YearDaySeconds, TimeScale::UTC);
        let expected = Epoch::from_gregorian(2021, 1, 1, 0, 0, 0, 0, TimeScale::UTC)
            + Duration::from_days(313.0)
            + Duration::from_seconds(37740.0);
        assert_eq!(conv.convert("21:314:37740"), Ok(Value::Epoch(expected)));
        assert_eq!(
            conv.convert("21:314:37740"),
            Ok(Value::Epoch(Epoch::from_gregorian(
                2021,
                11,
                10,
                10,
                29,
                0,
                0,
                TimeScale::UTC
            )))
        );
        assert_eq!(
            conv.convert("95:001:00000"),
            Ok(Value::Epoch(Epoch::from_gregorian(
                1995,
                1,
                1,
                0,
                0,
                0,
                0,
                TimeScale::UTC
            )))
        );
        assert_eq!(
            conv.convert("2022:021:00000"),
            Ok(Value::Epoch(Epoch::from_gregorian(
                2022,
                1,
                21,
                0,
                0,
                0,
                0,
                TimeScale::UTC
            )))
        );
        assert_eq!(conv.convert("00:000:00000"), Ok(Value::Missing));
        assert!(conv.convert("21:400:00000").is_err());
        assert!(conv.convert("21-314-37740").is_err());
    }
    #[test]
    fn rinex_epochs() {
        let conv = Converter::Epoch(EpochFormat::Gregorian, TimeScale::GPST);
        assert_eq!(
            conv.convert("2021  1  7  0  0  0.0000000"),
            Ok(Value::Epoch(Epoch::from_gregorian(
                2021,
                1,
                7,
                0,
                0,
                0,
                0,
                TimeScale::GPST
            )))
        );
        assert_eq!(
            conv.convert(" 96  4  1  0  0 15"),
            Ok(Value::Epoch(Epoch::from_gregorian(
                1996,
                4,
                1,
                0,
                0,
                15,
                0,
                TimeScale::GPST
            )))
        );
        assert!(conv.convert("2021 13  7  0  0  0").is_err());
    }
    #[test]
    fn splitting() {
        assert_eq!(
            Converter::List.convert("C1C L1C  D1C"),
            Ok(Value::List(vec![
                "C1C".to_string(),
                "L1C".to_string(),
                "D1C".to_string()
            ]))
        );
        assert_eq!(
            Converter::Tuple.convert(" 993.3   23.0   90.0"),
            Ok(Value::Tuple(vec![993.3, 23.0, 90.0]))
        );
        assert!(Converter::Tuple.convert("1.0 abc").is_err());
    }
    #[test]
    fn registry() {
        assert_eq!(Converter::from_str("d_float"), Ok(Converter::FloatD));
        assert_eq!(Converter::from_str("dms2rad"), Ok(Converter::DmsRadians));
        assert_eq!(
            Converter::from_str("epoch"),
            Ok(Converter::Epoch(EpochFormat::YearDaySeconds, TimeScale::UTC))
        );
        assert!(Converter::from_str("complex").is_err());
    }
}
