//! Core simulation primitives

pub mod env;
pub mod select;
pub mod time;

pub use env::Environment;
