//! A single-host process supervisor.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use supervisor::config;
use supervisor::supervisor::Supervisor;
use supervisor::telemetry::init_tracing;

#[derive(Parser)]
#[command(name = "supervisor")]
#[command(about = "Autostarts and supervises a fixed set of programs, with cgroup limits and restart policies")]
#[command(version)]
struct Cli {
    /// Path to the program configuration file.
    #[arg(default_value = "supervisor.conf")]
    config: PathBuf,

    /// Path to the event log file.
    #[arg(long, default_value = "supervisor.log")]
    log: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let configs = match config::load(&cli.config) {
        Ok(configs) => configs,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    let mut supervisor = Supervisor::new(configs, &cli.log);
    supervisor.run();
    ExitCode::SUCCESS
}
