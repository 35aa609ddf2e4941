//! # Lorekeep
//!
//! Command-line front end for the `lorekeep-core` process memory store.
//!
//! The library target exposes the CLI and configuration layers so they can
//! be exercised from integration tests; `main.rs` only wires up logging and
//! calls [`cli::execute`].

pub mod cli;
pub mod config;
