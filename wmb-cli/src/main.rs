//! WMB CLI - Command line tool for generating water management bulletins.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "wmb-cli",
    version,
    about = "Water management bulletin toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: wmb_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("[WMB] cli: starting");
    wmb_cmd::run(cli.command)
}
