//! Record definitions: how one line is sliced and handled
use crate::{
    cache::Cache,
    diagnostics::Diagnostics,
    error::{DefinitionError, ParsingError},
    fields::{FieldDef, Fields, Strip},
    options::ParsingOptions,
};

/// [Context] is handed to every handler, by reference.
/// It gives access to the state of the ongoing parse, and only this parse.
pub struct Context<'a, S> {
    /// Shared parse state
    pub state: &'a mut S,
    /// Active block cache
    pub cache: &'a mut Cache,
    pub diagnostics: &'a mut Diagnostics,
    pub options: &'a ParsingOptions,
}

/// Record handler
pub type Handler<S> = fn(&Fields, &mut Context<S>) -> Result<(), ParsingError>;

/// [RecordDef] pairs a field layout with a [Handler]
pub struct RecordDef<S> {
    /// Name used in diagnostics
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub strip: Strip,
    /// Fields are matched by position on delimited lines.
    /// `' '` splits on any whitespace run.
    pub delimiter: Option<char>,
    pub handler: Handler<S>,
}

impl<S> Clone for RecordDef<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fields: self.fields.clone(),
            strip: self.strip,
            delimiter: self.delimiter,
            handler: self.handler,
        }
    }
}

impl<S> std::fmt::Debug for RecordDef<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RecordDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("strip", &self.strip)
            .field("delimiter", &self.delimiter)
            .finish()
    }
}

impl<S> RecordDef<S> {
    /// Builds a new column based [RecordDef]
    pub fn new(name: &str, handler: Handler<S>) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            strip: Strip::default(),
            delimiter: None,
            handler,
        }
    }
    /// Adds one field
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
    /// Replaces all fields
    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }
    pub fn with_strip(mut self, strip: Strip) -> Self {
        self.strip = strip;
        self
    }
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
    /// Verifies that no column is claimed by two fields
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.delimiter.is_some() {
            return Ok(());
        }
        for (i, lhs) in self.fields.iter().enumerate() {
            if lhs.span.is_empty() {
                return Err(DefinitionError::EmptySpan {
                    record: self.name.clone(),
                    field: lhs.name,
                });
            }
            for rhs in self.fields.iter().skip(i + 1) {
                if lhs.span.overlaps(&rhs.span) {
                    return Err(DefinitionError::OverlappingFields {
                        record: self.name.clone(),
                        first: lhs.name,
                        second: rhs.name,
                    });
                }
            }
        }
        Ok(())
    }
    /// Slices and converts given line
    pub fn extract(&self, line: &str, index: usize) -> Result<Fields, ParsingError> {
        Fields::parse(line, index, &self.fields, self.strip, self.delimiter)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::converter::Converter;

    fn nop(_: &Fields, _: &mut Context<()>) -> Result<(), ParsingError> {
        Ok(())
    }

    #[test]
    fn overlapping_fields() {
        let record = RecordDef::new("PGM / RUN BY / DATE", nop)
            .with_field(FieldDef::new("program", 0, Some(20)))
            .with_field(FieldDef::new("run_by", 19, Some(40)));
        assert_eq!(
            record.validate(),
            Err(DefinitionError::OverlappingFields {
                record: "PGM / RUN BY / DATE".to_string(),
                first: "program",
                second: "run_by",
            })
        );
        let record = RecordDef::new("INTERVAL", nop)
            .with_field(FieldDef::new("interval", 0, Some(10)).with_converter(Converter::Float))
            .with_field(FieldDef::new("rest", 10, None));
        assert!(record.validate().is_ok());
        let record =
            RecordDef::new("broken", nop).with_field(FieldDef::new("nothing", 10, Some(10)));
        assert!(record.validate().is_err());
    }

    #[test]
    fn delimited_records_skip_span_checks() {
        let record = RecordDef::new("matrix", nop)
            .with_delimiter(' ')
            .with_fields(vec![
                FieldDef::token("row").with_converter(Converter::Integer),
                FieldDef::token("col").with_converter(Converter::Integer),
                FieldDef::token("value").with_converter(Converter::Float),
            ]);
        assert!(record.validate().is_ok());
        let fields = record.extract("2 1 -2.5e-01", 4).unwrap();
        assert_eq!(fields.integer("row"), Some(2));
        assert_eq!(fields.integer("col"), Some(1));
        assert_eq!(fields.float("value"), Some(-0.25));
        assert_eq!(fields.index, 4);
    }
}
