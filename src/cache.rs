//! Per block cache
use crate::{converter::Value, fields::Fields};
use std::collections::HashMap;

/// [Cache] is reset at block entry and shared by every record handler
/// of that block. Handlers use it to recover values omitted by
/// continuation lines, or to accumulate lines until the block closes.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    /// Number of lines consumed by current block
    pub(crate) line_num: usize,
    values: HashMap<String, Value>,
    rows: HashMap<String, Vec<Fields>>,
}

impl Cache {
    /// Number of lines consumed so far by the active block,
    /// including the current one
    pub fn line_num(&self) -> usize {
        self.line_num
    }
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
    /// Iterates stored keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }
    /// Text value stored under `key`
    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }
    /// Appends a line to the accumulator named `key`
    pub fn append(&mut self, key: &str, fields: Fields) {
        self.rows.entry(key.to_string()).or_default().push(fields);
    }
    /// Lines accumulated under `key`
    pub fn rows(&self, key: &str) -> &[Fields] {
        self.rows.get(key).map(|r| r.as_slice()).unwrap_or(&[])
    }
    /// Takes ownership of the lines accumulated under `key`
    pub fn take_rows(&mut self, key: &str) -> Vec<Fields> {
        self.rows.remove(key).unwrap_or_default()
    }
    pub(crate) fn reset(&mut self) {
        self.line_num = 0;
        self.values.clear();
        self.rows.clear();
    }
}
