// ── Shutdown coordinator ──
//
// Turns the first termination signal into an orderly cache shutdown and
// tells the process entry point when it may exit. Signal handlers are
// registered at most once per process.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{ClientCache, ShutdownReport};
use crate::session::SessionFactory;

static SIGNALS_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Background task that drains a [`ClientCache`] when triggered.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    done: CancellationToken,
    task: JoinHandle<ShutdownReport>,
}

impl ShutdownCoordinator {
    /// Register SIGINT, SIGHUP and SIGTERM handlers (Ctrl-C elsewhere)
    /// that shut `cache` down with `grace`.
    ///
    /// Returns `Ok(None)` if handlers were already installed in this
    /// process.
    pub fn install<F: SessionFactory>(
        cache: ClientCache<F>,
        grace: Duration,
    ) -> io::Result<Option<Self>> {
        if SIGNALS_INSTALLED.swap(true, Ordering::SeqCst) {
            debug!("shutdown handlers already installed");
            return Ok(None);
        }

        let signals = match TerminationSignals::register() {
            Ok(signals) => signals,
            Err(e) => {
                SIGNALS_INSTALLED.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        debug!("shutdown handlers installed");
        Ok(Some(Self::on_trigger(cache, grace, signals.recv())))
    }

    /// Shut `cache` down once `trigger` resolves, with its label as the
    /// reason. Does not touch process signals.
    pub fn on_trigger<F, T>(cache: ClientCache<F>, grace: Duration, trigger: T) -> Self
    where
        F: SessionFactory,
        T: Future<Output = &'static str> + Send + 'static,
    {
        let done = CancellationToken::new();
        let finished = done.clone();
        let task = tokio::spawn(async move {
            let reason = trigger.await;
            info!(reason, "shutting down, draining appliance sessions");
            let report = cache.shutdown(grace).await;
            finished.cancel();
            report
        });
        Self { done, task }
    }

    /// Token cancelled once the drain finished or its grace period ended.
    pub fn token(&self) -> CancellationToken {
        self.done.clone()
    }

    pub async fn finished(&self) {
        self.done.cancelled().await;
    }

    /// Wait for the shutdown to run and return its report.
    pub async fn join(self) -> Option<ShutdownReport> {
        match self.task.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "shutdown task did not complete");
                None
            }
        }
    }
}

#[cfg(unix)]
struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    #[allow(clippy::unnecessary_wraps)]
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler failed");
        }
        "ctrl-c"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use acoslb_api::{CloseStatus, Error};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tokio::sync::oneshot;

    use super::*;
    use crate::cache::CachePolicy;
    use crate::device::DeviceDescriptor;
    use crate::session::ApplianceSession;

    struct Quiet;

    impl ApplianceSession for Quiet {
        async fn ensure_session(&self) -> Result<(), Error> {
            Ok(())
        }

        async fn close(&self) -> Result<CloseStatus, Error> {
            Ok(CloseStatus {
                ok: true,
                body: json!({ "response": { "status": "OK" } }),
            })
        }

        async fn system_information(&self) -> Result<Value, Error> {
            Ok(Value::Null)
        }
    }

    struct QuietFactory;

    impl SessionFactory for QuietFactory {
        type Session = Quiet;

        async fn connect(&self, _device: &DeviceDescriptor) -> Result<Quiet, Error> {
            Ok(Quiet)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_drains_cache_and_cancels_token() {
        let cache = ClientCache::open(QuietFactory, CachePolicy::default());
        let device = DeviceDescriptor::new("ax1", "10.0.0.1", "admin", SecretString::from("a10".to_string()));
        cache.get_client(&device).await.unwrap();

        let (fire, fired) = oneshot::channel::<()>();
        let coordinator = ShutdownCoordinator::on_trigger(cache.clone(), Duration::from_secs(10), async move {
            let _ = fired.await;
            "test"
        });
        let token = coordinator.token();
        assert!(!token.is_cancelled());

        fire.send(()).unwrap();
        coordinator.finished().await;

        assert!(token.is_cancelled());
        assert!(cache.is_closed());
        assert!(cache.is_empty());
        let report = coordinator.join().await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert!(report.completed);
    }

    #[tokio::test]
    async fn second_install_is_a_no_op() {
        let cache = ClientCache::open(QuietFactory, CachePolicy::default());

        let first = ShutdownCoordinator::install(cache.clone(), Duration::from_secs(1)).unwrap();
        let second = ShutdownCoordinator::install(cache, Duration::from_secs(1)).unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }
}
