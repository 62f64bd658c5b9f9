//! Remote file handlers.

use crate::cli::{FileArgs, FileCommand};
use crate::config::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(ctx: &Ctx, args: FileArgs) -> Result<(), CliError> {
    let conn = util::restored(ctx)?;

    match args.command {
        FileCommand::Get { name } => {
            let contents = conn.read_file(&name).await?;
            // Raw contents; a trailing newline is the file's own
            print!("{contents}");
            Ok(())
        }

        FileCommand::Put { name, from } => {
            let contents = util::read_input(from.as_deref())?;
            let size = contents.len();
            conn.write_file(&name, contents).await?;
            output::print_output(&format!("Wrote {size} bytes to {name}"), ctx.quiet);
            Ok(())
        }
    }
}
