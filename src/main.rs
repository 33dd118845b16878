use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dtipipe::config;
use dtipipe::paths;
use dtipipe::pipeline::{self, RunPaths};

mod tty;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "dtipipe")]
#[command(version = VERSION)]
#[command(about = "Automate FSL diffusion preprocessing, bedpostx and probabilistic tractography")]
struct Cli {
    /// Directory of structural (MPRAGE) DICOMs
    struct_dir: String,

    /// Directory of diffusion (DTI) DICOMs
    diff_dir: String,

    /// Destination directory (full path; wiped at the start of the run)
    dest_dir: String,

    /// Skip the destination-wipe confirmation
    #[arg(long)]
    yes: bool,

    /// Use an alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> dtipipe::Result<()> {
    let cfg = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load()?,
    };

    let inputs = RunPaths {
        dicom_struct: paths::normalize_dir(&cli.struct_dir),
        dicom_diff: paths::normalize_dir(&cli.diff_dir),
        destination: paths::validate_destination(&cli.dest_dir)?,
    };

    if !cli.yes {
        let question = format!("Delete contents of {} and continue?", inputs.destination);
        if !tty::confirm(&question) {
            println!("OK, quitting.");
            return Ok(());
        }
    }

    pipeline::run(&inputs, &cfg)
}
