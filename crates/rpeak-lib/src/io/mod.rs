//! Readers that turn numeric text into a sample buffer.

pub mod csv;
pub mod text;
