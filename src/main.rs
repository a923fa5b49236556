use clap::Parser;
use moneybin::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
