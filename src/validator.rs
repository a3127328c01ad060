//! Header validation: mandatory and optional markers
use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    error::ParsingError,
    options::ParsingOptions,
};

use std::{collections::HashSet, fmt::Display, hash::Hash};

/// [HeaderValidator] cross checks which markers were dispatched
/// against the declared mandatory and optional markers.
#[derive(Debug, Clone)]
pub struct HeaderValidator<L> {
    mandatory: Vec<L>,
    optional: Vec<L>,
}

impl<L> Default for HeaderValidator<L> {
    fn default() -> Self {
        Self {
            mandatory: Vec::new(),
            optional: Vec::new(),
        }
    }
}

impl<L: Clone + Eq + Hash + Display> HeaderValidator<L> {
    pub fn with_mandatory(mut self, marker: L) -> Self {
        self.mandatory.push(marker);
        self
    }
    pub fn with_optional(mut self, marker: L) -> Self {
        self.optional.push(marker);
        self
    }
    pub fn mandatory(&self) -> &[L] {
        &self.mandatory
    }
    pub fn optional(&self) -> &[L] {
        &self.optional
    }
    /// Returns true if `marker` is declared (mandatory or optional)
    pub fn is_known(&self, marker: &L) -> bool {
        self.mandatory.contains(marker) || self.optional.contains(marker)
    }
    /// Mandatory markers not present in `seen`, in declaration order
    pub fn missing<'a>(&'a self, seen: &'a HashSet<L>) -> impl Iterator<Item = &'a L> + 'a {
        self.mandatory.iter().filter(move |m| !seen.contains(*m))
    }
    /// Runs the validation, once the header is concluded.
    /// Unknown markers are always warnings. Missing mandatory markers are
    /// warnings in lenient mode and an error in strict mode.
    pub fn validate(
        &self,
        seen: &HashSet<L>,
        unknown: &[(usize, L)],
        options: &ParsingOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ParsingError> {
        for (line, marker) in unknown {
            diagnostics.warning(
                DiagnosticKind::UnknownMarker(marker.to_string()),
                Some(*line),
                format!("{}: unknown header marker \"{}\"", options.source, marker),
            );
        }
        let mut first_missing = Option::<String>::None;
        for marker in self.missing(seen) {
            let marker = marker.to_string();
            let message = format!(
                "{}: missing mandatory marker \"{}\"",
                options.source, marker
            );
            if options.is_strict() {
                diagnostics.fatal(None, message);
            } else {
                diagnostics.warning(DiagnosticKind::MissingMandatory(marker.clone()), None, message);
            }
            if first_missing.is_none() {
                first_missing = Some(marker);
            }
        }
        match first_missing {
            Some(marker) if options.is_strict() => Err(ParsingError::MissingMandatory {
                marker,
                source_name: options.source.clone(),
            }),
            _ => Ok(()),
        }
    }
}
