use std::{panic, path::PathBuf};

use clap::Parser;

use pomodash::{
    cli::{self, RootCommand},
    logging::init_logging,
};

#[derive(Parser, Debug)]
#[command(
    name = "pomodash",
    about = "Pomodoro-driven daily task dashboard",
    long_about = "A pomodoro timer, per-day task list, and month calendar, synced through a hosted data store.",
    version = env!("POMODASH_BUILD_VERSION"),
    author
)]
struct Cli {
    /// Emit a machine-readable JSON envelope instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Suppress success output
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, or error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: RootCommand,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match init_logging(cli.log_level.as_deref()) {
        Ok(path) => install_panic_hook_with_log(path),
        Err(err) => eprintln!("warning: failed to initialize logging: {err}"),
    }

    let code = cli::run(cli.command, cli.json, cli.quiet, cli.config.as_deref()).await;
    std::process::exit(code);
}

fn install_panic_hook_with_log(log_path: PathBuf) {
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        eprintln!();
        eprintln!("log file: {}", log_path.display());
        previous_hook(panic_info);
    }));
}
