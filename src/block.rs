//! Block definitions and block sequences
use crate::{
    error::{DefinitionError, ParsingError},
    record::{Context, RecordDef},
    validator::HeaderValidator,
};

use std::{collections::HashMap, fmt::Debug, fmt::Display, hash::Hash};

/// Label types must be hashable and printable
pub trait Label: Clone + Eq + Hash + Debug + Display {}

impl<T: Clone + Eq + Hash + Debug + Display> Label for T {}

/// Block end predicate: (line, block line number, next line)
pub type EndMarker = fn(&str, usize, Option<&str>) -> bool;

/// Line labeling: (line, block line number). `None` ignores the line.
pub type LabelFn<L> = fn(&str, usize) -> Option<L>;

/// Skip predicate
pub type SkipFn = fn(&str) -> bool;

/// Invoked with the accumulated cache when the block closes
pub type EndCallback<S> = fn(&mut Context<S>) -> Result<(), ParsingError>;

/// [BlockDef] describes one logical section of a file.
/// Block line numbers are 1-based and restart with each block.
pub struct BlockDef<L, S> {
    pub name: String,
    pub end_marker: EndMarker,
    pub label: LabelFn<L>,
    pub skip_line: Option<SkipFn>,
    pub parser_def: HashMap<L, RecordDef<S>>,
    /// Handles labels that have no entry in `parser_def`
    pub fallback: Option<RecordDef<S>>,
    pub end_callback: Option<EndCallback<S>>,
    pub validator: Option<HeaderValidator<L>>,
}

impl<L: Label, S> BlockDef<L, S> {
    pub fn new(name: &str, end_marker: EndMarker, label: LabelFn<L>) -> Self {
        Self {
            name: name.to_string(),
            end_marker,
            label,
            skip_line: None,
            parser_def: HashMap::new(),
            fallback: None,
            end_callback: None,
            validator: None,
        }
    }
    pub fn with_skip_line(mut self, skip: SkipFn) -> Self {
        self.skip_line = Some(skip);
        self
    }
    /// Adds a [RecordDef] for given label
    pub fn with_record(mut self, label: L, record: RecordDef<S>) -> Self {
        self.parser_def.insert(label, record);
        self
    }
    pub fn with_fallback(mut self, record: RecordDef<S>) -> Self {
        self.fallback = Some(record);
        self
    }
    pub fn with_end_callback(mut self, callback: EndCallback<S>) -> Self {
        self.end_callback = Some(callback);
        self
    }
    /// Adds a mandatory marker: the block becomes a validated header
    pub fn with_mandatory(mut self, marker: L, record: RecordDef<S>) -> Self {
        let validator = self.validator.take().unwrap_or_default();
        self.validator = Some(validator.with_mandatory(marker.clone()));
        self.with_record(marker, record)
    }
    /// Adds an optional marker: the block becomes a validated header
    pub fn with_optional(mut self, marker: L, record: RecordDef<S>) -> Self {
        let validator = self.validator.take().unwrap_or_default();
        self.validator = Some(validator.with_optional(marker.clone()));
        self.with_record(marker, record)
    }
    /// Returns the [RecordDef] that should handle `label`
    pub fn record(&self, label: &L) -> Option<&RecordDef<S>> {
        self.parser_def.get(label).or(self.fallback.as_ref())
    }
    /// Verifies all record layouts
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for record in self.parser_def.values().chain(self.fallback.iter()) {
            record.validate()?;
        }
        Ok(())
    }
}

/// [Sequence] of [BlockDef]s driven by the chain parser:
/// leading blocks are visited once, in order, the repeating block
/// (if any) is then restarted until input ends.
pub struct Sequence<L, S> {
    leading: Vec<BlockDef<L, S>>,
    repeating: Option<BlockDef<L, S>>,
}

impl<L: Label, S> Sequence<L, S> {
    /// Finite ordered sequence
    pub fn finite(blocks: Vec<BlockDef<L, S>>) -> Self {
        Self {
            leading: blocks,
            repeating: None,
        }
    }
    /// Infinitely repeating single block
    pub fn repeating(block: BlockDef<L, S>) -> Self {
        Self {
            leading: Vec::new(),
            repeating: Some(block),
        }
    }
    /// Repeats given block once leading blocks are consumed
    pub fn then_repeat(mut self, block: BlockDef<L, S>) -> Self {
        self.repeating = Some(block);
        self
    }
    /// Block to run at given position
    pub fn nth(&self, pos: usize) -> Option<&BlockDef<L, S>> {
        self.leading.get(pos).or(self.repeating.as_ref())
    }
    /// Names of the finite blocks from given position
    pub fn remaining(&self, pos: usize) -> Vec<String> {
        self.leading
            .iter()
            .skip(pos)
            .map(|b| b.name.clone())
            .collect()
    }
    pub fn is_repeating(&self) -> bool {
        self.repeating.is_some()
    }
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for block in self.leading.iter().chain(self.repeating.iter()) {
            block.validate()?;
        }
        Ok(())
    }
}
