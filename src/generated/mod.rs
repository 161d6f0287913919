//! Generated function signature table.
//!
//! DO NOT EDIT MANUALLY - generated by build.rs from specs/functions.toml

pub mod functions;

pub use functions::*;
