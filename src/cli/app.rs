use super::commands::{CheckCommands, NavigateCommands};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "page-transitions")]
#[command(about = "Drive in-page navigations against a live site")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra exclusion selector for links that keep default navigation
    #[arg(long = "exclude", global = true)]
    pub exclusions: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Boot a page and navigate in place to another one
    Navigate(NavigateCommands),
    /// Report whether activating a link would be intercepted
    Check(CheckCommands),
}
