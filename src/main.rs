use auto_scene_edit::cli::{self, Cli};
use auto_scene_edit::signal::setup_shutdown_signal;
use clap::Parser;
use console::style;
use log::{LevelFilter, debug, info};
use std::process::ExitCode;

fn init_logger(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = setup_shutdown_signal()
        .map_err(anyhow::Error::from)
        .and_then(|shutdown_signal| cli::run(cli, &shutdown_signal));

    match result {
        Ok(document) => match serde_json::to_string_pretty(&document) {
            Ok(text) => {
                println!("{text}");
                info!("完成");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{} {e}", style("錯誤:").red().bold());
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            debug!("{e:?}");
            eprintln!("{} {e:#}", style("錯誤:").red().bold());
            ExitCode::FAILURE
        }
    }
}
