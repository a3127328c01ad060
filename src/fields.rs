//! Field slicer: column based (or delimiter based) field extraction
use crate::{
    converter::{Converter, Value},
    error::ParsingError,
};

use std::collections::HashMap;

/// Half-open `[start, end)` character span. `end = None` reads to end of line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: Option<usize>,
}

impl Span {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }
    /// Returns true if both spans share at least one column
    pub fn overlaps(&self, rhs: &Self) -> bool {
        let lhs_end = self.end.unwrap_or(usize::MAX);
        let rhs_end = rhs.end.unwrap_or(usize::MAX);
        self.start < rhs_end && rhs.start < lhs_end
    }
    pub fn is_empty(&self) -> bool {
        matches!(self.end, Some(end) if end <= self.start)
    }
}

/// Returns the substring covered by given [Span], using character offsets.
/// Never fails: short lines yield a partial or empty substring.
pub fn slice(line: &str, span: Span) -> &str {
    let byte_offset = |nth: usize| {
        line.char_indices()
            .nth(nth)
            .map(|(offset, _)| offset)
            .unwrap_or(line.len())
    };
    let start = byte_offset(span.start);
    let end = match span.end {
        Some(end) if end > span.start => byte_offset(end),
        Some(_) => start,
        None => line.len(),
    };
    &line[start..end]
}

/// Characters trimmed from each field
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Strip {
    /// Trim whitespaces (default)
    #[default]
    Whitespace,
    /// Trim any of these characters
    Chars(&'static str),
    /// Raw content
    None,
}

impl Strip {
    pub fn apply<'a>(&self, s: &'a str) -> &'a str {
        match self {
            Self::Whitespace => s.trim(),
            Self::Chars(chars) => s.trim_matches(|c| chars.contains(c)),
            Self::None => s,
        }
    }
}

/// One field of a [crate::RecordDef]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Column span, ignored by delimited records
    pub span: Span,
    pub converter: Converter,
    /// Value of an all blank field, for non textual converters
    pub blank: Value,
}

impl FieldDef {
    /// Text field covering `[start, end)`
    pub fn new(name: &'static str, start: usize, end: Option<usize>) -> Self {
        Self {
            name,
            span: Span::new(start, end),
            converter: Converter::Text,
            blank: Value::Missing,
        }
    }
    /// Text field for delimited records, matched by position
    pub fn token(name: &'static str) -> Self {
        Self::new(name, 0, None)
    }
    pub fn with_converter(&self, converter: Converter) -> Self {
        let mut s = self.clone();
        s.converter = converter;
        s
    }
    pub fn with_blank(&self, blank: Value) -> Self {
        let mut s = self.clone();
        s.blank = blank;
        s
    }
    /// Converts stripped content
    pub fn convert(&self, raw: &str) -> Result<Value, crate::error::ConversionError> {
        if raw.trim().is_empty() && !self.converter.is_textual() {
            return Ok(self.blank.clone());
        }
        self.converter.convert(raw)
    }
}

/// Slices `line` into `(name, substring)` pairs, in declaration order.
pub fn extract<'a>(
    line: &'a str,
    fields: &[FieldDef],
    strip: Strip,
    delimiter: Option<char>,
) -> Vec<(&'static str, &'a str)> {
    match delimiter {
        Some(delim) => {
            let mut tokens: Box<dyn Iterator<Item = &'a str> + 'a> = if delim == ' ' {
                Box::new(line.split_ascii_whitespace())
            } else {
                Box::new(line.split(delim))
            };
            fields
                .iter()
                .map(|f| (f.name, strip.apply(tokens.next().unwrap_or(""))))
                .collect()
        },
        None => fields
            .iter()
            .map(|f| (f.name, strip.apply(slice(line, f.span))))
            .collect(),
    }
}

/// [Fields] are the named and converted content of one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    /// Absolute (0-based) line index
    pub index: usize,
    /// Raw line content
    pub line: String,
    values: HashMap<&'static str, Value>,
}

impl Fields {
    /// Extracts and converts `line` with given field definitions.
    pub fn parse(
        line: &str,
        index: usize,
        fields: &[FieldDef],
        strip: Strip,
        delimiter: Option<char>,
    ) -> Result<Self, ParsingError> {
        let mut values = HashMap::with_capacity(fields.len());
        for (def, (name, raw)) in fields.iter().zip(extract(line, fields, strip, delimiter)) {
            let value = def.convert(raw).map_err(|source| ParsingError::Conversion {
                line: index,
                field: name,
                source,
            })?;
            values.insert(name, value);
        }
        Ok(Self {
            index,
            line: line.to_string(),
            values,
        })
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
    /// Text content of this field. Blank fields are empty strings.
    pub fn text(&self, name: &str) -> &str {
        self.values.get(name).and_then(|v| v.as_str()).unwrap_or("")
    }
    pub fn float(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(|v| v.as_f64())
    }
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(|v| v.as_i64())
    }
    pub fn insert(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }
    /// Iterates (name, value) pairs, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
