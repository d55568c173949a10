//! Command dispatch: bridges CLI args -> core workflows -> output formatting.

pub mod assets;
pub mod breakglass;
pub mod clusters;
pub mod config_cmd;
pub mod groups;
pub mod hunt;
pub mod token;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a tenant-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Assets(args) => assets::handle(session, args, global).await,
        Command::Groups(args) => groups::handle(session, args, global).await,
        Command::Clusters(args) => clusters::handle(session, args, global).await,
        Command::Hunt(args) => hunt::handle(session, args, global).await,
        Command::BreakGlass(args) => breakglass::handle(session, args, global).await,
        // Handled before a session exists
        Command::Token(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
