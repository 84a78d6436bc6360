//! `acoslb run`: hold a warm session to every appliance until signalled.

use futures_util::future::join_all;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use acoslb_core::{ShutdownCoordinator, verify_appliances};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::Context;

pub async fn handle(args: &RunArgs, ctx: &Context) -> Result<(), CliError> {
    let inventory = ctx.inventory()?;
    let cache = ctx.open_cache()?;
    let policy = cache.policy().clone();

    if args.verify || ctx.config.verify_appliances {
        let reports = verify_appliances(&cache, &inventory).await;
        let down = reports.iter().filter(|r| !r.reachable).count();
        if down > 0 {
            warn!(down, total = reports.len(), "some appliances failed verification");
        }
    }

    let coordinator = ShutdownCoordinator::install(cache.clone(), policy.shutdown_grace)?
        .ok_or_else(|| CliError::Internal {
            message: "shutdown handlers are already installed".into(),
        })?;

    info!(devices = inventory.len(), ttl = ?policy.ttl, "keeping appliance sessions warm");

    let mut refresh = interval(policy.ttl.max(std::time::Duration::from_secs(1)));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = coordinator.finished() => break,
            _ = refresh.tick() => {
                join_all(inventory.iter().map(|device| {
                    let cache = &cache;
                    async move {
                        if let Err(e) = cache.get_client(device).await {
                            warn!(device = %device.key, error = %e, "could not refresh session");
                        }
                    }
                }))
                .await;
            }
        }
    }

    if let Some(report) = coordinator.join().await {
        info!(
            dispatched = report.dispatched,
            completed = report.completed,
            pending = report.pending,
            "appliance sessions drained"
        );
    }
    Ok(())
}
