//! A small interactive POSIX-style shell.
//!
//! The crate is organized as a pipeline of transformations applied to every
//! input line: the [`editor`] turns terminal bytes into a command line, the
//! [`lexer`] and [`parser`] turn the line into a [`parser::Pipeline`] of
//! process descriptors, and [`job`] forks and waits for the pipeline while
//! managing process groups and the controlling terminal.
//!
//! The library exists mainly so the pieces can be exercised in isolation; the
//! `minish` binary wires them together behind a tiny CLI. The high-level
//! entry point is [`Interpreter`].

pub mod editor;
pub mod history;
pub mod interpreter;
pub mod job;
pub mod keys;
pub mod lexer;
pub mod parser;
pub mod term;
pub mod utf8;

/// Just a convenient re-export of the shell driver.
///
/// See [`interpreter::Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
