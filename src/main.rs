use clap::Parser;
use neozork::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    neozork::logging::init_logging(cli.verbose);
    run(cli)
}
