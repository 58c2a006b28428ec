pub mod handler;

use clap::Args;

pub use handler::{find_link, handle_check_command};

#[derive(Args)]
pub struct CheckCommands {
    /// Page containing the link (absolute URL)
    pub page: String,

    /// Exact href of the link to check
    pub href: String,
}
