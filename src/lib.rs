pub mod cli;
pub mod component;
pub mod config;
pub mod error;
pub mod signal;
pub mod tools;

pub use error::{EditError, EditResult};
