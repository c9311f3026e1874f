//! # compositor-script
//!
//! A grammar-driven compiler for compositor scripts.
//!
//! The grammar is written in a small BNF dialect and compiled once; scripts are then
//! tokenized statement by statement against it and each statement's actions are
//! dispatched into a builder. See the [script module](script) for the pipeline.

pub mod script;
