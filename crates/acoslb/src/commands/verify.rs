//! `acoslb verify`: log into every appliance once and report.

use acoslb_core::{VerifyReport, verify_appliances};
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct VerifyRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&VerifyReport> for VerifyRow {
    fn from(r: &VerifyReport) -> Self {
        Self {
            device: r.device.clone(),
            address: r.address.clone(),
            status: if r.reachable {
                "ok".into()
            } else {
                r.error.clone().unwrap_or_else(|| "unreachable".into())
            },
        }
    }
}

fn render(format: &OutputFormat, reports: &[VerifyReport]) -> Result<String, CliError> {
    output::render_list(
        format,
        reports,
        |r| VerifyRow::from(r),
        |r| format!("{} {}", r.device, if r.reachable { "ok" } else { "unreachable" }),
    )
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let inventory = ctx.inventory()?;
    let cache = ctx.open_cache()?;

    let reports = verify_appliances(&cache, &inventory).await;
    cache.shutdown(cache.policy().shutdown_grace).await;

    let rendered = render(&ctx.global.output, &reports)?;
    ctx.print(&rendered);

    let count = reports.iter().filter(|r| !r.reachable).count();
    if count > 0 {
        return Err(CliError::VerifyFailed {
            count,
            total: reports.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reports() -> Vec<VerifyReport> {
        vec![
            VerifyReport {
                device: "ax1".into(),
                address: "10.0.0.1:443".into(),
                reachable: true,
                info: None,
                error: None,
            },
            VerifyReport {
                device: "ax2".into(),
                address: "10.0.0.2:443".into(),
                reachable: false,
                info: None,
                error: Some("Appliance 10.0.0.2:443 unavailable after 9 attempts".into()),
            },
        ]
    }

    #[test]
    fn plain_reports_status_per_device() {
        let out = render(&OutputFormat::Plain, &reports()).unwrap();
        assert_eq!(out, "ax1 ok\nax2 unreachable");
    }

    #[test]
    fn table_shows_failure_reason() {
        let out = render(&OutputFormat::Table, &reports()).unwrap();
        assert!(out.contains("Status"));
        assert!(out.contains("after 9 attempts"));
    }
}
