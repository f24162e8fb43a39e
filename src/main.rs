#![deny(unsafe_code)]
pub mod commands;

use anyhow::Result;
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());
use commands::call::Call;
use commands::command::Command;
use commands::consensus::Consensus;
use enum_dispatch::enum_dispatch;
use env_logger::Env;
use log::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(styles = STYLES)]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
#[command(version)]
#[allow(clippy::large_enum_variant)]
enum Subcommand {
    #[command(display_order = 1)]
    Call(Call),
    #[command(display_order = 2)]
    Consensus(Consensus),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Capture the full command line before clap parsing for logging
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let args = Args::parse();

    info!("Running umivar version {}", env!("CARGO_PKG_VERSION"));
    args.subcommand.execute(&command_line)
}
