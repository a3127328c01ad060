//! integrated tests

mod parser;
