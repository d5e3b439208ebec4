//! Common utilities for mongo-proc
//!
//! This crate provides the error type shared by the facade and the CLI.

pub mod error;

pub use error::{MongoProcError, Result};
