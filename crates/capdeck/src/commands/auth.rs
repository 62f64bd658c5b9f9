//! Login, logout and status handlers.

use secrecy::SecretString;
use serde::Serialize;

use crate::cli::LoginArgs;
use crate::config::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn login(ctx: &Ctx, args: LoginArgs) -> Result<(), CliError> {
    let password = match args.password {
        Some(p) => SecretString::from(p),
        None => {
            let prompt = format!("Password for {}: ", args.username);
            SecretString::from(rpassword::prompt_password(prompt)?)
        }
    };

    let conn = ctx.connect()?;
    let session = conn.login(&args.username, password).await?;

    if !ctx.quiet {
        eprintln!(
            "Logged in to {} as {} (agent v{})",
            conn.endpoint().base(),
            args.username,
            session.version
        );
    }
    Ok(())
}

pub async fn logout(ctx: &Ctx) -> Result<(), CliError> {
    let conn = ctx.connect()?;
    if !conn.restore() {
        if !ctx.quiet {
            eprintln!("Not logged in");
        }
        return Ok(());
    }
    conn.logout().await;
    if !ctx.quiet {
        eprintln!("Logged out");
    }
    Ok(())
}

#[derive(Serialize)]
struct Status {
    url: String,
    username: Option<String>,
    auth: String,
    version: String,
    ping_ms: u64,
    modules: usize,
    running: usize,
    ready: bool,
}

pub async fn status(ctx: &Ctx) -> Result<(), CliError> {
    let (conn, session) = util::logged_in(ctx).await?;
    let snap = conn.snapshot();

    let status = Status {
        url: conn.endpoint().base().to_string(),
        username: conn.username(),
        auth: conn.auth_state().to_string(),
        version: session.version.clone(),
        ping_ms: snap.ping_ms,
        modules: session.modules.len(),
        running: session.modules.values().filter(|m| m.running).count(),
        ready: conn.is_ready(),
    };

    let color = ctx.color;
    let out = output::render_single(
        ctx.output,
        &status,
        |s| {
            output::detail_lines(&[
                ("URL", s.url.clone()),
                ("User", s.username.clone().unwrap_or_default()),
                ("Auth", s.auth.clone()),
                ("Version", s.version.clone()),
                ("Ping", format!("{} ms", s.ping_ms)),
                ("Modules", format!("{} ({} running)", s.modules, s.running)),
                ("Ready", output::paint_bool(s.ready, color)),
            ])
        },
        |s| s.auth.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
