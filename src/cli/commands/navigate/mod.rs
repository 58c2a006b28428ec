pub mod handler;

use clap::Args;

pub use handler::handle_navigate_command;

#[derive(Args)]
pub struct NavigateCommands {
    /// Page to boot (absolute URL)
    pub from: String,

    /// Destination, absolute or relative to the booted page
    pub to: String,

    /// Activate the first link whose href is `to`, going through
    /// interception like a click would
    #[arg(long, help = "Activate the link pointing at the destination instead of navigating programmatically")]
    pub click: bool,

    /// Skip effect durations
    #[arg(long)]
    pub instant: bool,

    /// Print collected metrics as JSON
    #[arg(long)]
    pub stats: bool,
}
