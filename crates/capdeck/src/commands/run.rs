//! `run`: send one command line to the agent.

use serde::Serialize;

use capdeck_core::CoreError;

use crate::cli::RunArgs;
use crate::config::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct RunResult<'a> {
    cmd: &'a str,
    success: bool,
    msg: String,
}

pub async fn handle(ctx: &Ctx, args: RunArgs) -> Result<(), CliError> {
    let conn = util::restored(ctx)?;
    let cmd = args.cmd.join(" ");

    if args.detach {
        let mut failures = conn.on_command_error();
        conn.submit(cmd.clone())
            .await
            .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
        if let Some(err) = failures.try_recv() {
            return Err(CliError::CommandFailed {
                message: err.to_string(),
            });
        }
        if !ctx.quiet {
            eprintln!("Sent: {cmd}");
        }
        return Ok(());
    }

    let answer = conn.execute(&cmd).await.map_err(|e| match e {
        CoreError::Api { message, .. } => CliError::CommandFailed { message },
        other => CliError::from(other),
    })?;
    if !answer.success {
        return Err(CliError::CommandFailed {
            message: if answer.msg.is_empty() {
                cmd
            } else {
                answer.msg
            },
        });
    }

    let result = RunResult {
        cmd: &cmd,
        success: answer.success,
        msg: answer.msg,
    };
    let out = output::render_single(ctx.output, &result, |r| r.msg.clone(), |r| r.msg.clone())?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
