//! Chain parser: drives a [Sequence] of [BlockDef]s over a line stream
use crate::{
    block::{BlockDef, Label, Sequence},
    cache::Cache,
    diagnostics::{DiagnosticKind, Diagnostics},
    error::ParsingError,
    options::ParsingOptions,
    reader::{BufferedReader, Lines},
    record::Context,
};

use itertools::Itertools;
use thiserror::Error;

use std::{collections::HashSet, io::BufRead, iter::Peekable, path::Path};

#[cfg(feature = "log")]
use log::debug;

/// Postprocessing transform, applied once the sequence is exhausted
pub type Postprocessor<S> = fn(&mut S, &mut Diagnostics) -> Result<(), ParsingError>;

/// Parser states
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    /// No block active
    AwaitingBlock,
    /// Consuming lines of the active block
    InBlock,
    /// End marker fired (or input ended): block is being concluded
    BlockClosing,
    /// Sequence consumed or input ended
    Exhausted,
}

/// Summary of one visited block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    /// [BlockDef] name
    pub name: String,
    /// Absolute (0-based) index of its first line
    pub first_line: usize,
    /// Absolute (0-based) index of its last line
    pub last_line: usize,
    /// Number of lines consumed
    pub lines: usize,
}

/// [Parsed] is the outcome of a completed parse
#[derive(Debug, Clone)]
pub struct Parsed<S> {
    /// Populated shared state
    pub state: S,
    /// Everything the parse had to say
    pub diagnostics: Diagnostics,
    /// Visited blocks, in visit order
    pub blocks: Vec<BlockReport>,
}

impl<S> Parsed<S> {
    /// Promotes warnings to a hard error, for callers that cannot
    /// tolerate incomplete content.
    pub fn strict(self) -> Result<Self, Failure> {
        let count = self.diagnostics.warnings().count();
        let first = self.diagnostics.warnings().next().map(|w| w.to_string());
        let first = match first {
            Some(first) => first,
            None => return Ok(self),
        };
        Err(Failure {
            error: ParsingError::Strict { count, first },
            diagnostics: self.diagnostics,
            blocks: self.blocks,
        })
    }
}

/// [Failure] is the outcome of an aborted parse: the error, along with
/// everything diagnosed up to that point. The error itself is the last
/// diagnostic, with [crate::diagnostics::Severity::Fatal].
#[derive(Error, Debug)]
#[error("{error}")]
pub struct Failure {
    pub error: ParsingError,
    /// Diagnostics collected before (and including) the abort
    pub diagnostics: Diagnostics,
    /// Blocks that were closed before the abort
    pub blocks: Vec<BlockReport>,
}

impl From<ParsingError> for Failure {
    fn from(error: ParsingError) -> Self {
        Self {
            error,
            diagnostics: Diagnostics::default(),
            blocks: Vec::new(),
        }
    }
}

/// Per block bookkeeping
struct BlockTracker<L> {
    cache: Cache,
    /// Validated markers that were dispatched
    seen: HashSet<L>,
    /// Markers unknown to the validator: (absolute line index, marker)
    unknown: Vec<(usize, L)>,
    report: Option<BlockReport>,
}

impl<L: Label> BlockTracker<L> {
    fn new() -> Self {
        Self {
            cache: Cache::default(),
            seen: HashSet::new(),
            unknown: Vec::new(),
            report: None,
        }
    }
    fn enter(&mut self, name: &str) {
        self.cache.reset();
        self.seen.clear();
        self.unknown.clear();
        self.report = Some(BlockReport {
            name: name.to_string(),
            first_line: 0,
            last_line: 0,
            lines: 0,
        });
    }
    fn consumed(&mut self, index: usize) {
        self.cache.line_num += 1;
        if let Some(report) = &mut self.report {
            if report.lines == 0 {
                report.first_line = index;
            }
            report.last_line = index;
            report.lines += 1;
        }
    }
}

/// [ChainParser] runs a [Sequence] of block definitions over the input,
/// then the postprocessing transforms, in declaration order.
pub struct ChainParser<L, S> {
    sequence: Sequence<L, S>,
    postprocessors: Vec<Postprocessor<S>>,
    options: ParsingOptions,
}

impl<L: Label, S> ChainParser<L, S> {
    pub fn new(sequence: Sequence<L, S>) -> Self {
        Self {
            sequence,
            postprocessors: Vec::new(),
            options: ParsingOptions::default(),
        }
    }
    /// Appends a postprocessing transform
    pub fn with_postprocessor(mut self, postprocessor: Postprocessor<S>) -> Self {
        self.postprocessors.push(postprocessor);
        self
    }
    pub fn with_options(mut self, options: ParsingOptions) -> Self {
        self.options = options;
        self
    }
    pub fn options(&self) -> &ParsingOptions {
        &self.options
    }

    /// Parses in memory content
    pub fn parse_str(&self, content: &str) -> Result<Parsed<S>, Failure>
    where
        S: Default,
    {
        let lines = content.lines().map(|l| Ok(l.to_string()));
        self.parse_lines(lines, S::default(), &self.options)
    }

    /// Parses any [BufRead]able source, decoded per [ParsingOptions::encoding]
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Parsed<S>, Failure>
    where
        S: Default,
    {
        let lines = Lines::new(reader, self.options.encoding);
        self.parse_lines(lines, S::default(), &self.options)
    }

    /// Parses a local file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Parsed<S>, Failure>
    where
        S: Default,
    {
        let options = self.file_options(path.as_ref());
        let reader = BufferedReader::plain_file(path).map_err(ParsingError::Io)?;
        let lines = Lines::new(reader, options.encoding);
        self.parse_lines(lines, S::default(), &options)
    }

    /// Parses a gzip compressed local file
    #[cfg(feature = "flate2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "flate2")))]
    pub fn parse_gzip_file<P: AsRef<Path>>(&self, path: P) -> Result<Parsed<S>, Failure>
    where
        S: Default,
    {
        let options = self.file_options(path.as_ref());
        let reader = BufferedReader::gzip_file(path).map_err(ParsingError::Io)?;
        let lines = Lines::new(reader, options.encoding);
        self.parse_lines(lines, S::default(), &options)
    }

    /// Source name defaults to the file name
    fn file_options(&self, path: &Path) -> ParsingOptions {
        if self.options.source == ParsingOptions::default().source {
            self.options.with_source(&path.display().to_string())
        } else {
            self.options.clone()
        }
    }

    /// Parses a stream of decoded lines, populating given initial state.
    /// Unrecoverable errors are recorded as fatal diagnostics, then returned
    /// along with all diagnostics collected so far.
    pub fn parse_lines<I>(
        &self,
        lines: I,
        mut state: S,
        options: &ParsingOptions,
    ) -> Result<Parsed<S>, Failure>
    where
        I: Iterator<Item = Result<String, ParsingError>>,
    {
        let mut diagnostics = Diagnostics::default();
        let mut blocks = Vec::<BlockReport>::new();
        match self.run(lines, &mut state, &mut diagnostics, &mut blocks, options) {
            Ok(()) => Ok(Parsed {
                state,
                diagnostics,
                blocks,
            }),
            Err(e) => {
                let line = match &e {
                    ParsingError::Conversion { line, .. } => Some(*line),
                    ParsingError::Format { line, .. } => Some(*line),
                    ParsingError::Encoding(line) => Some(*line),
                    _ => None,
                };
                // strict validation already reported this one
                if !matches!(e, ParsingError::MissingMandatory { .. }) {
                    diagnostics.fatal(line, format!("{}: {}", options.source, e));
                }
                Err(Failure {
                    error: e,
                    diagnostics,
                    blocks,
                })
            },
        }
    }

    fn run<I>(
        &self,
        lines: I,
        state: &mut S,
        diagnostics: &mut Diagnostics,
        blocks: &mut Vec<BlockReport>,
        options: &ParsingOptions,
    ) -> Result<(), ParsingError>
    where
        I: Iterator<Item = Result<String, ParsingError>>,
    {
        self.sequence.validate()?;

        let mut lines: Peekable<_> = lines.enumerate().peekable();
        let mut tracker = BlockTracker::<L>::new();
        let mut machine = State::AwaitingBlock;
        let mut pos = 0;

        loop {
            match machine {
                State::AwaitingBlock => {
                    if lines.peek().is_none() {
                        machine = State::Exhausted;
                        continue;
                    }
                    match self.sequence.nth(pos) {
                        Some(block) => {
                            #[cfg(feature = "log")]
                            debug!("entering block \"{}\"", block.name);
                            tracker.enter(&block.name);
                            machine = State::InBlock;
                        },
                        None => {
                            diagnostics.debug(
                                DiagnosticKind::Other,
                                lines.peek().map(|(index, _)| *index),
                                "sequence consumed: trailing content ignored".to_string(),
                            );
                            machine = State::Exhausted;
                        },
                    }
                },
                State::InBlock => {
                    let block = self.active(pos)?;
                    let (index, line) = match lines.next() {
                        Some((index, line)) => (index, line?),
                        None => {
                            machine = State::BlockClosing;
                            continue;
                        },
                    };
                    tracker.consumed(index);
                    let next = lines
                        .peek()
                        .and_then(|(_, next)| next.as_ref().ok())
                        .map(|next| next.as_str());
                    let closing = (block.end_marker)(&line, tracker.cache.line_num, next);

                    self.dispatch(block, &line, index, state, &mut tracker, diagnostics, options)?;

                    if closing {
                        machine = State::BlockClosing;
                    }
                },
                State::BlockClosing => {
                    let block = self.active(pos)?;
                    self.close(block, state, &mut tracker, diagnostics, options)?;
                    if let Some(report) = tracker.report.take() {
                        #[cfg(feature = "log")]
                        debug!(
                            "block \"{}\" closed: {} line(s)",
                            report.name, report.lines
                        );
                        blocks.push(report);
                    }
                    pos += 1;
                    machine = State::AwaitingBlock;
                },
                State::Exhausted => break,
            }
        }

        let unseen = self.sequence.remaining(pos);
        if !unseen.is_empty() {
            diagnostics.warning(
                DiagnosticKind::UnseenBlocks(unseen.clone()),
                None,
                format!(
                    "{}: input ended before block(s): {}",
                    options.source,
                    unseen.iter().join(", ")
                ),
            );
        }

        for postprocessor in self.postprocessors.iter() {
            postprocessor(state, diagnostics)?;
        }
        Ok(())
    }

    fn active(&self, pos: usize) -> Result<&BlockDef<L, S>, ParsingError> {
        self.sequence.nth(pos).ok_or(ParsingError::Format {
            line: 0,
            reason: format!("no block definition at position {}", pos),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        block: &BlockDef<L, S>,
        line: &str,
        index: usize,
        state: &mut S,
        tracker: &mut BlockTracker<L>,
        diagnostics: &mut Diagnostics,
        options: &ParsingOptions,
    ) -> Result<(), ParsingError> {
        if let Some(skip) = block.skip_line {
            if skip(line) {
                diagnostics.debug(
                    DiagnosticKind::SkippedLine,
                    Some(index),
                    format!("{}: line skipped", block.name),
                );
                return Ok(());
            }
        }

        let label = match (block.label)(line, tracker.cache.line_num) {
            Some(label) => label,
            None => return Ok(()),
        };

        if let Some(validator) = &block.validator {
            if validator.is_known(&label) {
                tracker.seen.insert(label.clone());
            } else {
                tracker.unknown.push((index, label.clone()));
            }
        }

        match block.record(&label) {
            Some(record) => {
                let fields = record.extract(line, index)?;
                #[cfg(feature = "log")]
                debug!("{}: \"{}\" dispatched to \"{}\"", index, label, record.name);
                let mut ctx = Context {
                    state,
                    cache: &mut tracker.cache,
                    diagnostics,
                    options,
                };
                (record.handler)(&fields, &mut ctx)
            },
            None => {
                diagnostics.debug(
                    DiagnosticKind::StructuralMismatch,
                    Some(index),
                    format!("{}: no record for \"{}\", line dropped", block.name, label),
                );
                Ok(())
            },
        }
    }

    fn close(
        &self,
        block: &BlockDef<L, S>,
        state: &mut S,
        tracker: &mut BlockTracker<L>,
        diagnostics: &mut Diagnostics,
        options: &ParsingOptions,
    ) -> Result<(), ParsingError> {
        if let Some(callback) = block.end_callback {
            let mut ctx = Context {
                state,
                cache: &mut tracker.cache,
                diagnostics,
                options,
            };
            callback(&mut ctx)?;
        }
        if let Some(validator) = &block.validator {
            validator.validate(&tracker.seen, &tracker.unknown, options, diagnostics)?;
        }
        tracker.cache.reset();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        converter::{Converter, Value},
        diagnostics::Severity,
        fields::{FieldDef, Fields},
        record::RecordDef,
        state::{ParseState, Row},
    };

    fn first_char(line: &str, _: usize) -> Option<char> {
        line.chars().next()
    }

    fn closes_on_blank_next(_: &str, _: usize, next: Option<&str>) -> bool {
        next.map(|n| n.trim().is_empty()).unwrap_or(true)
    }

    fn closes_on_blank(line: &str, _: usize, _: Option<&str>) -> bool {
        line.trim().is_empty()
    }

    fn store(fields: &Fields, ctx: &mut Context<ParseState>) -> Result<(), ParsingError> {
        ctx.state.push_row("rows", Row::from(fields));
        Ok(())
    }

    fn sequence() -> Sequence<char, ParseState> {
        let record = RecordDef::new("value", store).with_field(
            FieldDef::new("value", 1, None).with_converter(Converter::Integer),
        );
        Sequence::finite(vec![
            BlockDef::new("first", closes_on_blank, first_char).with_record('a', record.clone()),
            BlockDef::new("second", closes_on_blank_next, first_char).with_record('b', record),
        ])
    }

    #[test]
    fn blocks_in_declared_order() {
        let parser = ChainParser::new(sequence());
        let parsed = parser.parse_str("a1\na2\n\nb3\nb4").unwrap();
        let names: Vec<_> = parsed.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(parsed.blocks[0].lines, 3);
        assert_eq!(parsed.blocks[1].first_line, 3);
        assert_eq!(parsed.blocks[1].last_line, 4);
        let rows = parsed.state.table("rows").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].get("value"), Some(&Value::Integer(4)));
        assert!(parsed.diagnostics.warnings().next().is_none());
    }

    #[test]
    fn finite_blocks_never_reentered() {
        let parser = ChainParser::new(sequence());
        // second block closes on the blank line lookahead: content after it is dropped
        let parsed = parser.parse_str("a1\n\nb2\n\nb3\na4").unwrap();
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(parsed.state.table("rows").unwrap().len(), 2);
        assert!(parsed.diagnostics.contains(&DiagnosticKind::Other));
    }

    #[test]
    fn unseen_blocks_reported() {
        let parser = ChainParser::new(sequence());
        let parsed = parser.parse_str("a1\na2").unwrap();
        assert_eq!(parsed.blocks.len(), 1);
        assert!(parsed
            .diagnostics
            .contains(&DiagnosticKind::UnseenBlocks(vec!["second".to_string()])));
        let failure = parsed.strict().unwrap_err();
        assert!(matches!(failure.error, ParsingError::Strict { count: 1, .. }));
        assert_eq!(failure.blocks.len(), 1);
        assert_eq!(failure.diagnostics.warnings().count(), 1);
    }

    #[test]
    fn unlabeled_and_unmatched_lines() {
        let parser = ChainParser::new(sequence());
        let parsed = parser.parse_str("a1\nz9\n\nb2").unwrap();
        assert_eq!(parsed.state.table("rows").unwrap().len(), 2);
        assert!(parsed
            .diagnostics
            .contains(&DiagnosticKind::StructuralMismatch));
    }

    #[test]
    fn conversion_errors_abort() {
        let parser = ChainParser::new(sequence());
        let failure = parser.parse_str("a1\naX\n").unwrap_err();
        match &failure.error {
            ParsingError::Conversion { line, field, .. } => {
                assert_eq!(*line, 1);
                assert_eq!(*field, "value");
            },
            other => panic!("unexpected error: {:?}", other),
        }
        // the abort is the last diagnostic
        let fatal = failure.diagnostics.iter().last().unwrap();
        assert_eq!(fatal.severity, Severity::Fatal);
        assert_eq!(fatal.line, Some(1));
        assert!(failure.blocks.is_empty());
    }

    #[test]
    fn postprocessors_in_declaration_order() {
        fn first(state: &mut ParseState, _: &mut Diagnostics) -> Result<(), ParsingError> {
            state.set_meta("step", Value::from("first"));
            Ok(())
        }
        fn second(state: &mut ParseState, _: &mut Diagnostics) -> Result<(), ParsingError> {
            let previous = state.meta_text("step").unwrap_or("").to_string();
            state.set_meta("step", Value::from(format!("{}+second", previous).as_str()));
            Ok(())
        }
        let parser = ChainParser::new(sequence())
            .with_postprocessor(first)
            .with_postprocessor(second);
        let parsed = parser.parse_str("a1\n\nb1").unwrap();
        assert_eq!(parsed.state.meta_text("step"), Some("first+second"));
    }

    #[test]
    fn repeating_sequence() {
        let record = RecordDef::new("value", store)
            .with_field(FieldDef::new("value", 1, None).with_converter(Converter::Integer));
        let block = BlockDef::new("record", closes_on_blank, first_char)
            .with_record('v', record)
            .with_skip_line(|line| line.starts_with('#'));
        let parser = ChainParser::new(Sequence::repeating(block));
        let parsed = parser.parse_str("v1\n#\n\nv2\n\nv3").unwrap();
        assert_eq!(parsed.blocks.len(), 3);
        assert_eq!(parsed.state.table("rows").unwrap().len(), 3);
        assert!(parsed.diagnostics.contains(&DiagnosticKind::SkippedLine));
        assert!(parsed.diagnostics.warnings().next().is_none());
    }
}
