//! `acoslb config`: inspect the effective configuration.

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;

use super::Context;

pub fn handle(args: &ConfigArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let rendered = ctx
                .config
                .to_redacted_toml()
                .map_err(|e| CliError::config(&ctx.config_path, e))?;
            ctx.print(rendered.trim_end());
        }
        ConfigCommand::Path => ctx.print(&ctx.config_path.display().to_string()),
    }
    Ok(())
}
