//! `acoslb select <tenant>`: show the appliance the default selector picks.

use acoslb_core::{DeviceSelector, HashSelector};

use crate::cli::SelectArgs;
use crate::error::CliError;
use crate::output;

use super::Context;
use super::devices::{DeviceSummary, detail};

pub fn handle(args: &SelectArgs, ctx: &Context) -> Result<(), CliError> {
    let inventory = ctx.inventory()?;
    let device = HashSelector::new(&inventory).select(&args.tenant)?;
    tracing::debug!(tenant = %args.tenant, device = %device.key, "tenant placed");

    let summary = DeviceSummary::from(&device);
    let rendered = output::render_single(&ctx.global.output, &summary, detail, |d| d.key.clone())?;
    ctx.print(&rendered);
    Ok(())
}
