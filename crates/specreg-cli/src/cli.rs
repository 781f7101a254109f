use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "specreg", about = "Spec registry server and tools", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the registry HTTP server
    Serve(ServeArgs),
    /// Validate a spec document locally and show what would be stored
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address, overrides the config file
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
    /// Data directory, overrides the config file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Spec document to check
    pub file: PathBuf,
    /// Declared source language of the document
    #[arg(short, long, default_value = "json")]
    pub language: String,
}
