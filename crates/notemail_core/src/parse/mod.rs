//! Note markup parsing.
//!
//! # Responsibility
//! - Turn raw note text into a `ParsedNote` without any I/O.

pub mod note;
