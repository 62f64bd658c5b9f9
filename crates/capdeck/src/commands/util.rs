//! Shared helpers for command handlers.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use capdeck_core::{Connection, Session};

use crate::config::Ctx;
use crate::error::CliError;

/// Open a connection with the saved credentials loaded.
pub fn restored(ctx: &Ctx) -> Result<Connection, CliError> {
    let conn = ctx.connect()?;
    if !conn.restore() {
        return Err(CliError::NotLoggedIn);
    }
    Ok(conn)
}

/// Restore, then fetch the session once so the credentials and the
/// agent version are checked before the command runs.
pub async fn logged_in(ctx: &Ctx) -> Result<(Connection, Arc<Session>), CliError> {
    let conn = restored(ctx)?;
    let session = conn.fetch_session().await?;
    Ok((conn, session))
}

/// Read a local file, or stdin when no path is given.
pub fn read_input(from: Option<&Path>) -> Result<String, CliError> {
    match from {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Truncate to `max` characters, marking the cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
