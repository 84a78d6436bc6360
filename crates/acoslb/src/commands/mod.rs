//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod params;
pub mod run;
pub mod select;
pub mod verify;

use std::path::PathBuf;

use acoslb_config::Config;
use acoslb_core::{AxapiSessionFactory, ClientCache, DeviceInventory};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Everything a command handler needs: the loaded config and global flags.
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub global: GlobalOpts,
}

impl Context {
    /// Enabled devices; an empty inventory is an error for every caller.
    pub fn inventory(&self) -> Result<DeviceInventory, CliError> {
        let inventory = self
            .config
            .inventory()
            .map_err(|e| CliError::config(&self.config_path, e))?;
        if inventory.is_empty() {
            return Err(CliError::NoDevices {
                path: self.config_path.display().to_string(),
            });
        }
        Ok(inventory)
    }

    pub fn open_cache(&self) -> Result<ClientCache<AxapiSessionFactory>, CliError> {
        let policy = self
            .config
            .cache_policy()
            .map_err(|e| CliError::config(&self.config_path, e))?;
        let factory = AxapiSessionFactory::new(self.config.transport());
        Ok(ClientCache::open(factory, policy))
    }

    pub fn print(&self, rendered: &str) {
        output::print_output(rendered, self.global.quiet);
    }
}

/// Dispatch a parsed command to its handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    tracing::debug!(command = ?cmd, "dispatching command");
    match cmd {
        Command::Devices => devices::handle(ctx),
        Command::Select(args) => select::handle(&args, ctx),
        Command::Vport(args) => params::handle_vport(&args, ctx),
        Command::Vserver(args) => params::handle_vserver(&args, ctx),
        Command::Verify => verify::handle(ctx).await,
        Command::Run(args) => run::handle(&args, ctx).await,
        Command::Config(args) => config_cmd::handle(&args, ctx),
    }
}
