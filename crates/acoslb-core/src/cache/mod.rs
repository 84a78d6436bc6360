// ── Appliance session cache ──
//
// One authenticated session per `host:port`, created on first use,
// refreshed once older than the TTL, closed when superseded or drained.
//
// Each key owns a slot in a `DashMap`. A slot holds the installed entry
// and, while a creation runs, a shared handle to it that every concurrent
// caller for the key awaits. Creations run on their own task and install
// their result themselves, so a caller that gives up cannot strand a slot.
// Shard locks only cover map bookkeeping and are never held across I/O.

mod drain;
mod policy;

pub use drain::{Drain, ShutdownReport};
pub use policy::CachePolicy;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::device::{CacheKey, DeviceDescriptor};
use crate::error::CoreError;
use crate::session::{ApplianceSession, SessionFactory};

// ── Slots ────────────────────────────────────────────────────────────

/// An installed session. Replaced as a whole, never edited in place.
struct CacheEntry<S> {
    device: Arc<DeviceDescriptor>,
    client: Arc<S>,
    created_at: Instant,
    installed_at: DateTime<Utc>,
}

impl<S> CacheEntry<S> {
    fn new(device: Arc<DeviceDescriptor>, client: Arc<S>) -> Self {
        Self {
            device,
            client,
            created_at: Instant::now(),
            installed_at: Utc::now(),
        }
    }

    fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// What a finished creation hands to everyone waiting on it.
enum FlightOutcome<S> {
    Fresh(Arc<S>),
    /// Refresh failed; the previous session is still installed.
    Stale(Arc<S>),
    Failed(CoreError),
}

impl<S> Clone for FlightOutcome<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Fresh(client) => Self::Fresh(Arc::clone(client)),
            Self::Stale(client) => Self::Stale(Arc::clone(client)),
            Self::Failed(err) => Self::Failed(err.clone()),
        }
    }
}

type Flight<S> = Shared<BoxFuture<'static, FlightOutcome<S>>>;

struct Slot<S> {
    entry: Option<CacheEntry<S>>,
    flight: Option<Flight<S>>,
}

impl<S> Slot<S> {
    fn vacant() -> Self {
        Self {
            entry: None,
            flight: None,
        }
    }

    fn is_vacant(&self) -> bool {
        self.entry.is_none() && self.flight.is_none()
    }
}

/// Point-in-time view of one cached session.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub key: CacheKey,
    /// Logical name of the device the session was created from.
    pub device_key: String,
    pub age: Duration,
    pub installed_at: DateTime<Utc>,
}

// ── ClientCache ──────────────────────────────────────────────────────

struct CacheInner<F: SessionFactory> {
    factory: F,
    policy: CachePolicy,
    slots: DashMap<CacheKey, Slot<F::Session>>,
    /// Creations in flight and closes of superseded sessions.
    background: TaskTracker,
    closed: CancellationToken,
}

/// Shared cache of appliance sessions.
///
/// Cheap to clone; all clones share the same slots. Must be used from
/// within a Tokio runtime since creations and closes are spawned.
pub struct ClientCache<F: SessionFactory> {
    inner: Arc<CacheInner<F>>,
}

impl<F: SessionFactory> Clone for ClientCache<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: SessionFactory> fmt::Debug for ClientCache<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCache")
            .field("entries", &self.len())
            .field("policy", &self.inner.policy)
            .field("closed", &self.inner.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<F: SessionFactory> ClientCache<F> {
    pub fn open(factory: F, policy: CachePolicy) -> Self {
        debug!(ttl = ?policy.ttl, "opening session cache");
        Self {
            inner: Arc::new(CacheInner {
                factory,
                policy,
                slots: DashMap::new(),
                background: TaskTracker::new(),
                closed: CancellationToken::new(),
            }),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    /// Return a ready session for `device`, creating or refreshing it as
    /// needed.
    ///
    /// A failed refresh is not an error: the caller gets the previous
    /// session back. A failed first creation is `ClientUnavailable` and
    /// nothing is cached.
    pub async fn get_client(&self, device: &DeviceDescriptor) -> Result<Arc<F::Session>, CoreError> {
        if self.is_closed() {
            return Err(CoreError::ShuttingDown);
        }

        let key = device.cache_key();
        let flight = {
            let mut guard = self
                .inner
                .slots
                .entry(key.clone())
                .or_insert_with(Slot::vacant);
            let slot = &mut *guard;

            if let Some(flight) = &slot.flight {
                debug!(%key, "joining session creation in flight");
                flight.clone()
            } else {
                let source = match &slot.entry {
                    Some(entry) if entry.age() < self.inner.policy.ttl => {
                        return Ok(Arc::clone(&entry.client));
                    }
                    Some(entry) => {
                        info!(%key, age = ?entry.age(), "session expired, refreshing");
                        Arc::clone(&entry.device)
                    }
                    None => {
                        debug!(%key, device = %device.key, "no cached session, creating");
                        Arc::new(device.clone())
                    }
                };
                let flight = self.inner.start_flight(key.clone(), source);
                slot.flight = Some(flight.clone());
                flight
            }
        };

        match flight.await {
            FlightOutcome::Fresh(client) | FlightOutcome::Stale(client) => Ok(client),
            FlightOutcome::Failed(err) => Err(err),
        }
    }

    /// The installed session for `device`, whatever its age. Never creates.
    pub fn peek(&self, device: &DeviceDescriptor) -> Option<Arc<F::Session>> {
        self.inner
            .slots
            .get(&device.cache_key())
            .and_then(|slot| slot.entry.as_ref().map(|entry| Arc::clone(&entry.client)))
    }

    /// Drop the session for `device` and close it in the background.
    ///
    /// Returns `false` if nothing was cached. A creation already in flight
    /// is left alone and will install its result normally.
    pub fn invalidate(&self, device: &DeviceDescriptor) -> bool {
        let key = device.cache_key();
        let removed = self
            .inner
            .slots
            .get_mut(&key)
            .and_then(|mut slot| slot.entry.take());
        self.inner.slots.remove_if(&key, |_, slot| slot.is_vacant());

        match removed {
            Some(entry) => {
                info!(%key, "session invalidated");
                self.inner.spawn_close(key, entry.client);
                true
            }
            None => false,
        }
    }

    /// Remove every installed session and close each on its own task.
    ///
    /// Close failures are logged, never returned. Creations in flight are
    /// not interrupted.
    pub fn drain_all(&self) -> Drain {
        let taken: Vec<(CacheKey, CacheEntry<F::Session>)> = self
            .inner
            .slots
            .iter_mut()
            .filter_map(|mut slot| {
                let key = slot.key().clone();
                slot.value_mut().entry.take().map(|entry| (key, entry))
            })
            .collect();
        self.inner.slots.retain(|_, slot| !slot.is_vacant());

        let tracker = TaskTracker::new();
        for (key, entry) in &taken {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            let client = Arc::clone(&entry.client);
            tracker.spawn(async move { inner.close_client(&key, &client).await });
        }

        info!(sessions = taken.len(), "draining session cache");
        Drain::new(tracker, taken.len())
    }

    /// Refuse new work, drain every session, and wait up to `grace` for
    /// all outstanding closes.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.inner.closed.cancel();
        let drain = self.drain_all();
        self.inner.background.close();

        let deadline = Instant::now() + grace;
        let completed = drain.wait_for(grace).await
            && tokio::time::timeout_at(deadline, self.inner.background.wait())
                .await
                .is_ok();

        let pending = drain.pending() + self.inner.background.len();
        if completed {
            info!(dispatched = drain.dispatched(), "session cache shut down");
        } else {
            warn!(
                dispatched = drain.dispatched(),
                pending,
                grace = ?grace,
                "shutdown grace period elapsed with session closes outstanding"
            );
        }

        ShutdownReport {
            dispatched: drain.dispatched(),
            pending,
            completed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Snapshot of installed sessions, ordered by key.
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        let mut entries: Vec<CacheEntryInfo> = self
            .inner
            .slots
            .iter()
            .filter_map(|slot| {
                slot.entry.as_ref().map(|entry| CacheEntryInfo {
                    key: slot.key().clone(),
                    device_key: entry.device.key.clone(),
                    age: entry.age(),
                    installed_at: entry.installed_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Number of installed sessions.
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Creation and teardown ────────────────────────────────────────────

impl<F: SessionFactory> CacheInner<F> {
    /// Spawn a creation for `key` and return the handle callers await.
    fn start_flight(
        self: &Arc<Self>,
        key: CacheKey,
        device: Arc<DeviceDescriptor>,
    ) -> Flight<F::Session> {
        let inner = Arc::clone(self);
        let task_key = key.clone();
        let task = self.background.spawn(async move {
            let created = inner.create_client(&task_key, &device).await;
            inner.complete_flight(&task_key, device, created)
        });

        let inner = Arc::clone(self);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    if let Some(mut slot) = inner.slots.get_mut(&key) {
                        slot.flight = None;
                    }
                    FlightOutcome::Failed(CoreError::Internal(format!(
                        "session creation for {key} aborted: {join_error}"
                    )))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Connect and probe until the appliance issues a session.
    async fn create_client(
        &self,
        key: &CacheKey,
        device: &DeviceDescriptor,
    ) -> Result<F::Session, CoreError> {
        let session = self.factory.connect(device).await?;
        let attempts = self.policy.create_attempts.max(1);

        let mut attempt = 1;
        loop {
            match session.ensure_session().await {
                Ok(()) => {
                    info!(%key, attempt, "session established");
                    return Ok(session);
                }
                Err(e) if attempt >= attempts => {
                    warn!(%key, attempts, error = %e, "giving up on session creation");
                    return Err(CoreError::ClientUnavailable {
                        key: key.to_string(),
                        attempts,
                        source: Arc::new(e),
                    });
                }
                Err(e) => {
                    debug!(%key, attempt, error = %e, "session probe failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
            }
        }
    }

    /// Install the result of a creation and decide what its waiters get.
    fn complete_flight(
        self: &Arc<Self>,
        key: &CacheKey,
        device: Arc<DeviceDescriptor>,
        created: Result<F::Session, CoreError>,
    ) -> FlightOutcome<F::Session> {
        let mut superseded = None;
        let mut discarded = None;
        let closing;
        let outcome = {
            let mut guard = self.slots.entry(key.clone()).or_insert_with(Slot::vacant);
            let slot = &mut *guard;
            slot.flight = None;

            // Checked under the slot lock: `drain_all` either takes the
            // installed entry or this creation sees the cache closed.
            closing = self.closed.is_cancelled();
            if closing {
                if let Ok(session) = created {
                    debug!(%key, "cache closed during creation, discarding new session");
                    discarded = Some(Arc::new(session));
                }
                FlightOutcome::Failed(CoreError::ShuttingDown)
            } else {
                match created {
                    Ok(session) => {
                        let client = Arc::new(session);
                        let fresh = CacheEntry::new(device, Arc::clone(&client));
                        if let Some(old) = slot.entry.replace(fresh) {
                            info!(%key, "session refreshed");
                            superseded = Some(old.client);
                        } else {
                            info!(%key, "session cached");
                        }
                        FlightOutcome::Fresh(client)
                    }
                    Err(err) => match &slot.entry {
                        Some(entry) => {
                            warn!(%key, error = %err, "session refresh failed, serving previous session");
                            FlightOutcome::Stale(Arc::clone(&entry.client))
                        }
                        None => FlightOutcome::Failed(err),
                    },
                }
            }
        };

        if closing {
            self.slots.remove_if(key, |_, slot| slot.is_vacant());
        }
        if let Some(session) = discarded {
            self.spawn_close(key.clone(), session);
        }
        if let Some(old) = superseded {
            self.spawn_close(key.clone(), old);
        }
        outcome
    }

    fn spawn_close(self: &Arc<Self>, key: CacheKey, client: Arc<F::Session>) {
        let inner = Arc::clone(self);
        self.background
            .spawn(async move { inner.close_client(&key, &client).await });
    }

    /// Close `client`, retrying until the appliance acknowledges. Failure
    /// is logged; the session is abandoned either way.
    async fn close_client(&self, key: &CacheKey, client: &F::Session) {
        if let Err(err) = self.try_close(key, client).await {
            warn!(%key, error = %err, "abandoning session");
        }
    }

    async fn try_close(&self, key: &CacheKey, client: &F::Session) -> Result<(), CoreError> {
        let attempts = self.policy.close_attempts.max(1);
        let mut last_status = String::new();

        for attempt in 1..=attempts {
            match client.close().await {
                Ok(status) if status.ok => {
                    debug!(%key, attempt, "session closed");
                    return Ok(());
                }
                Ok(status) => {
                    debug!(%key, attempt, body = %status.body, "session close not acknowledged");
                    last_status = status.body.to_string();
                }
                Err(e) => {
                    debug!(%key, attempt, error = %e, "session close failed");
                    last_status = e.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        Err(CoreError::SessionCloseFailed {
            key: key.to_string(),
            attempts,
            status: last_status,
        })
    }
}
