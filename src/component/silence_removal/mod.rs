mod main;
mod silence;

pub use main::{SilenceRemovalSummary, SilenceRemover};
pub use silence::{SilenceInterval, complement_of_silence, parse_silence_output};
