mod args;
mod handlers;

pub use args::{Cli, Command, ConfigCommand, SilenceArgs, ThumbnailArgs, ThumbnailCommand};
pub use handlers::{run, run_media};
