use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Construct a sandbox filesystem view and run a program inside it",
    long_about = None,
    override_usage = "\n    sandboxctl -s <ROLE> [-c <FILE>] [-p <CMDLINE>]\n    sandboxctl -p <CMDLINE>")]
pub struct Args {
    /// Set the log level to one of trace, debug, info, warn, or error.
    /// `-v` is shorthand for enabling verbose (trace) logging.
    #[arg(short = 'v',
        long,
        default_missing_value = "trace",
        num_args = 0..=1,
        require_equals = true,
        value_parser = parse_log_level
    )]
    pub log_level: Option<log::LevelFilter>,

    /// Sandbox to construct and enter: system, chipset, priv-app or app.
    #[arg(short = 's', long = "sandbox_name")]
    pub sandbox_name: Option<String>,

    /// Parse this policy file instead of the layered configuration search
    /// path.
    #[arg(short = 'c', long = "config_file", value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// Command line to execute inside the sandbox instead of a shell.
    #[arg(short = 'p', long = "process_name")]
    pub process_name: Option<String>,
}

fn parse_log_level(s: &str) -> Result<log::LevelFilter, String> {
    s.parse::<log::LevelFilter>().map_err(|e| e.to_string())
}
