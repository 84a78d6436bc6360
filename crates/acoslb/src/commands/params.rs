//! `acoslb vport` / `acoslb vserver`: print version-correct request bodies.

use acoslb_core::{build_virtual_port, build_virtual_server, parse_options};
use serde_json::Value;

use crate::cli::{OutputFormat, ParamsArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

pub fn handle_vport(args: &ParamsArgs, ctx: &Context) -> Result<(), CliError> {
    let device = ctx.inventory()?.require(&args.device)?;
    let options = parse_options(&args.options, "vport")?;
    let body = build_virtual_port(&options, &device)?;
    print_body(&body, ctx)
}

pub fn handle_vserver(args: &ParamsArgs, ctx: &Context) -> Result<(), CliError> {
    let device = ctx.inventory()?.require(&args.device)?;
    let options = parse_options(&args.options, "virtual_server")?;
    let body = build_virtual_server(&options, &device);
    print_body(&body, ctx)
}

/// Request bodies are JSON; table and plain output fall back to pretty JSON.
fn print_body(body: &Value, ctx: &Context) -> Result<(), CliError> {
    let format = match ctx.global.output {
        OutputFormat::Table | OutputFormat::Plain => &OutputFormat::Json,
        ref other => other,
    };
    let rendered = output::render_single(format, body, Value::to_string, Value::to_string)?;
    ctx.print(&rendered);
    Ok(())
}
