//! Command dispatch: bridges CLI args -> core `Connection` -> output formatting.

pub mod auth;
pub mod events;
pub mod files;
pub mod run;
pub mod session;
pub mod settings;
pub mod util;
pub mod watch;

use crate::cli::Command;
use crate::config::Ctx;
use crate::error::CliError;

/// Dispatch an agent-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Ctx) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(ctx, args).await,
        Command::Logout => auth::logout(ctx).await,
        Command::Status => auth::status(ctx).await,
        Command::Session(args) => session::handle(ctx, args).await,
        Command::Events(args) => events::handle(ctx, args).await,
        Command::Watch(args) => watch::handle(ctx, args).await,
        Command::Run(args) => run::handle(ctx, args).await,
        Command::File(args) => files::handle(ctx, args).await,
        Command::Settings(args) => settings::handle(ctx, args),
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
