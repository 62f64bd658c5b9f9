// ── Connection facade ──
//
// Full lifecycle for one agent: credential handling, the two pollers,
// the compatibility gate, the snapshot cache, commands and remote files.
// Everything consumers observe goes out through the `NotificationBus`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use capdeck_api::{AgentClient, CommandResponse, Endpoint, Event, Session};

use crate::bus::{NotificationBus, Subscription};
use crate::config::CoreConfig;
use crate::credentials::CredentialStore;
use crate::error::CoreError;
use crate::gate::{CompatibilityGate, GateDecision};
use crate::model::AuthState;
use crate::persist::{Persistence, StoredAuth};
use crate::settings::{ConnectionSettings, PartialSettings};
use crate::store::{Snapshot, SnapshotCache, SnapshotUpdate};

/// Floor for both poll cadences, so a zero interval can not spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ── Connection ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ConnectionInner>`. A freshly built
/// connection is idle: call [`restore()`](Self::restore) or
/// [`login()`](Self::login), then [`start()`](Self::start) to begin
/// polling.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    config: CoreConfig,
    client: AgentClient,
    gate: CompatibilityGate,
    settings: Mutex<ConnectionSettings>,
    credentials: Mutex<CredentialStore>,
    cache: SnapshotCache,
    bus: NotificationBus,
    persistence: Arc<dyn Persistence>,
    /// Serializes session cycles: the poller, `login()` and manual
    /// refreshes never overlap.
    session_cycle: tokio::sync::Mutex<()>,
    event_cycle: tokio::sync::Mutex<()>,
    /// Bumped by `stop()`. A fetch that started under an older epoch is
    /// discarded when it resolves.
    epoch: AtomicU64,
    pollers: Mutex<PollerTasks>,
}

#[derive(Default)]
struct PollerTasks {
    cancel: CancellationToken,
    session: Option<JoinHandle<()>>,
    events: Option<JoinHandle<()>>,
}

impl Connection {
    /// Build a connection. Persisted settings are restored best-effort:
    /// a failing backend is logged and defaults are used.
    pub fn new(config: CoreConfig, persistence: Arc<dyn Persistence>) -> Result<Self, CoreError> {
        let client = AgentClient::new(&config.transport)?;
        Ok(Self::with_client(config, persistence, client))
    }

    /// Build a connection around an existing HTTP client.
    pub fn with_client(
        config: CoreConfig,
        persistence: Arc<dyn Persistence>,
        client: AgentClient,
    ) -> Self {
        let mut settings = ConnectionSettings::default();
        match persistence.load_settings() {
            Ok(Some(saved)) => {
                settings.merge_from(&saved);
                debug!(url = %settings.url(), "restored connection settings");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not load saved settings, using defaults"),
        }

        let gate = CompatibilityGate::new(config.required_version.clone(), config.production);

        Self {
            inner: Arc::new(ConnectionInner {
                config,
                client,
                gate,
                settings: Mutex::new(settings),
                credentials: Mutex::new(CredentialStore::new()),
                cache: SnapshotCache::new(),
                bus: NotificationBus::new(),
                persistence,
                session_cycle: tokio::sync::Mutex::new(()),
                event_cycle: tokio::sync::Mutex::new(()),
                epoch: AtomicU64::new(0),
                pollers: Mutex::new(PollerTasks::default()),
            }),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn gate(&self) -> &CompatibilityGate {
        &self.inner.gate
    }

    // ── Authentication ───────────────────────────────────────────

    /// Load saved credentials into the credential store.
    ///
    /// Returns `true` when credentials were found; the next session
    /// fetch decides whether they are still good. Without saved
    /// credentials a logged-out notification (no error) is emitted so
    /// consumers can prompt for a login.
    pub fn restore(&self) -> bool {
        let saved = match self.inner.persistence.load_auth() {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "could not load saved credentials");
                None
            }
        };

        match saved {
            Some(auth) => {
                debug!(username = %auth.username, "restored saved credentials");
                self.credentials().set(auth.username, auth.password);
                true
            }
            None => {
                self.inner.bus.emit_logged_out(None);
                false
            }
        }
    }

    /// Store new credentials and run one gated session fetch with them.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: SecretString,
    ) -> Result<Arc<Session>, CoreError> {
        let username = username.into();
        debug!(%username, "logging in");
        self.credentials().set(username, password);
        self.fetch_session().await
    }

    /// Stop the pollers and discard in-flight fetches, then forget the
    /// credentials and both saved records. Emits nothing when already
    /// logged out.
    pub async fn logout(&self) {
        self.stop().await;

        let logged_in = {
            let creds = self.credentials();
            creds.is_valid() || creds.has_credentials()
        };
        if !logged_in {
            return;
        }

        self.credentials().clear();
        self.clear_persisted();
        info!("logged out");
        self.inner.bus.emit_logged_out(None);
    }

    pub fn auth_state(&self) -> AuthState {
        let (has_credentials, valid) = {
            let creds = self.credentials();
            (creds.has_credentials(), creds.is_valid())
        };
        AuthState::derive(has_credentials, valid, self.inner.cache.session().is_some())
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials().is_valid()
    }

    /// Credentials are valid and the agent reports at least one module.
    pub fn is_ready(&self) -> bool {
        self.is_logged_in()
            && self
                .inner
                .cache
                .session()
                .is_some_and(|s| s.has_modules())
    }

    pub fn username(&self) -> Option<String> {
        self.credentials().username().map(str::to_owned)
    }

    // ── Settings ─────────────────────────────────────────────────

    pub fn settings(&self) -> ConnectionSettings {
        self.settings_guard().clone()
    }

    /// Apply the present fields of `partial` and persist the result.
    /// Pollers pick the new endpoint and cadence up on their next cycle.
    pub fn update_settings(&self, partial: &PartialSettings) -> ConnectionSettings {
        let updated = {
            let mut settings = self.settings_guard();
            settings.merge_from(partial);
            settings.clone()
        };
        debug!(url = %updated.url(), "connection settings updated");
        if let Err(e) = self.inner.persistence.save_settings(&updated) {
            warn!(error = %e, "could not persist settings");
        }
        updated
    }

    /// Apply the present fields of `partial` for this process only. They
    /// are saved with the next accepted session, like any login.
    pub fn apply_settings(&self, partial: &PartialSettings) -> ConnectionSettings {
        let mut settings = self.settings_guard();
        settings.merge_from(partial);
        settings.clone()
    }

    /// Where the next request goes and as whom.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint_with_generation().0
    }

    /// Endpoint plus the credential generation its header was built from.
    fn endpoint_with_generation(&self) -> (Endpoint, u64) {
        let url = self.settings_guard().url();
        let creds = self.credentials();
        let endpoint = Endpoint::new(url).with_authorization(creds.auth_header());
        (endpoint, creds.generation())
    }

    // ── Snapshot accessors ───────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.cache.get()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.cache.session()
    }

    pub fn events(&self) -> Arc<Vec<Event>> {
        self.inner.cache.events()
    }

    // ── Notifications ────────────────────────────────────────────

    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    pub fn on_new_session(&self) -> Subscription<Arc<Session>> {
        self.inner.bus.new_session()
    }

    pub fn on_new_events(&self) -> Subscription<Arc<Vec<Event>>> {
        self.inner.bus.new_events()
    }

    pub fn on_logged_in(&self) -> Subscription<()> {
        self.inner.bus.logged_in()
    }

    pub fn on_logged_out(&self) -> Subscription<Option<CoreError>> {
        self.inner.bus.logged_out()
    }

    pub fn on_session_error(&self) -> Subscription<CoreError> {
        self.inner.bus.session_error()
    }

    pub fn on_command_error(&self) -> Subscription<CoreError> {
        self.inner.bus.command_error()
    }

    // ── Session cycle ────────────────────────────────────────────

    /// Run one session cycle and return the resulting snapshot.
    ///
    /// Never fails: errors go out as notifications and the last cached
    /// snapshot is returned unchanged.
    pub async fn refresh_session(&self) -> Arc<Snapshot> {
        let _ = self.fetch_session().await;
        self.inner.cache.get()
    }

    /// Run one session cycle and return its outcome.
    ///
    /// Side effects are identical to [`refresh_session()`](Self::refresh_session);
    /// the error is additionally handed back to the caller.
    pub async fn fetch_session(&self) -> Result<Arc<Session>, CoreError> {
        let _cycle = self.inner.session_cycle.lock().await;
        let epoch = self.epoch();
        let (endpoint, generation) = self.endpoint_with_generation();
        let started = Instant::now();

        let result = self.inner.client.get_session(&endpoint).await;

        if self.epoch() != epoch {
            debug!("discarding session response from a stopped cycle");
            return Err(CoreError::Cancelled);
        }

        match result {
            Ok(session) => {
                let ping_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.accept_session(session, ping_ms, endpoint.base(), generation)
            }
            Err(e) => {
                let err = CoreError::from(e);
                if err.is_auth_rejection() {
                    if self.force_logout(generation, Some(err.clone())) {
                        warn!(error = %err, "agent rejected credentials");
                    } else {
                        debug!(error = %err, "ignoring rejection of superseded credentials");
                    }
                } else {
                    debug!(error = %err, "session fetch failed");
                    self.inner.bus.emit_session_error(err.clone());
                }
                Err(err)
            }
        }
    }

    fn accept_session(
        &self,
        session: Session,
        ping_ms: u64,
        url: &str,
        generation: u64,
    ) -> Result<Arc<Session>, CoreError> {
        match self.inner.gate.check(&session) {
            GateDecision::Accept => {}
            GateDecision::AcceptOutdated { required, found } => {
                warn!(%required, %found, "agent API is older than required, continuing outside production");
            }
            GateDecision::Reject { required, found } => {
                let err = CoreError::IncompatibleVersion {
                    required,
                    found,
                    url: url.to_owned(),
                };
                warn!(error = %err, "rejecting incompatible agent");
                self.force_logout(generation, Some(err.clone()));
                return Err(err);
            }
        }

        let session = Arc::new(session);
        self.inner
            .cache
            .update(&SnapshotUpdate::session(Arc::clone(&session), ping_ms));

        // Only the credentials this request carried are proven good.
        let proven = {
            let mut creds = self.credentials();
            (creds.generation() == generation).then(|| {
                let edge = creds.mark_valid();
                let auth = creds.credentials().map(|c| StoredAuth {
                    username: c.username.clone(),
                    password: c.password.clone(),
                });
                (edge, auth)
            })
        };

        let mut became_valid = false;
        if let Some((edge, auth)) = proven {
            self.persist_login(auth.as_ref());
            became_valid = edge;
        }

        if became_valid {
            info!(version = %session.version, ping_ms, "logged in");
            self.inner.bus.emit_logged_in();
        }
        self.inner.bus.emit_new_session(Arc::clone(&session));
        Ok(session)
    }

    /// Agent-initiated logout. Pollers keep running.
    ///
    /// Applies only while the credentials are still the ones the failing
    /// request carried; returns `false` when they have since been replaced.
    fn force_logout(&self, generation: u64, reason: Option<CoreError>) -> bool {
        {
            let mut creds = self.credentials();
            if creds.generation() != generation {
                return false;
            }
            creds.clear();
        }
        self.clear_persisted();
        self.inner.bus.emit_logged_out(reason);
        true
    }

    // ── Event cycle ──────────────────────────────────────────────

    /// Run one event cycle and return the cached events. Failures are
    /// logged only.
    pub async fn refresh_events(&self) -> Arc<Vec<Event>> {
        match self.fetch_events().await {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "event fetch failed");
                self.inner.cache.events()
            }
        }
    }

    /// Run one event cycle and surface its error. A response that lands
    /// after `stop()` is dropped with [`CoreError::Cancelled`].
    pub async fn fetch_events(&self) -> Result<Arc<Vec<Event>>, CoreError> {
        let _cycle = self.inner.event_cycle.lock().await;
        let epoch = self.epoch();
        let endpoint = self.endpoint();
        let limit = self.settings_guard().event_page_size;

        let result = self.inner.client.get_events(&endpoint, limit).await;

        if self.epoch() != epoch {
            return Err(CoreError::Cancelled);
        }

        let events = Arc::new(result?);
        self.inner
            .cache
            .update(&SnapshotUpdate::events(Arc::clone(&events)));
        self.inner.bus.emit_new_events(Arc::clone(&events));
        Ok(events)
    }

    /// Clear the agent's event log, then empty the cached events.
    pub async fn clear_events(&self) -> Result<(), CoreError> {
        self.inner.client.clear_events(&self.endpoint()).await?;
        let empty = Arc::new(Vec::new());
        self.inner
            .cache
            .update(&SnapshotUpdate::events(Arc::clone(&empty)));
        self.inner.bus.emit_new_events(empty);
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Run a command and wait for the agent's answer. Never retried, and
    /// a failure never touches the credentials: inspect
    /// [`CoreError::status()`] to tell an auth problem apart.
    pub async fn execute(&self, cmd: &str) -> Result<CommandResponse, CoreError> {
        let endpoint = self.endpoint();
        Ok(self.inner.client.run_command(&endpoint, cmd).await?)
    }

    /// Fire-and-forget variant of [`execute()`](Self::execute). The
    /// answer is discarded; a failure goes out on the command-error
    /// channel.
    pub fn submit(&self, cmd: impl Into<String>) -> JoinHandle<()> {
        let conn = self.clone();
        let cmd = cmd.into();
        tokio::spawn(async move {
            if let Err(e) = conn.execute(&cmd).await {
                debug!(%cmd, error = %e, "detached command failed");
                conn.inner.bus.emit_command_error(e);
            }
        })
    }

    // ── Remote files ─────────────────────────────────────────────

    pub async fn read_file(&self, name: &str) -> Result<String, CoreError> {
        Ok(self.inner.client.read_file(&self.endpoint(), name).await?)
    }

    pub async fn write_file(&self, name: &str, contents: String) -> Result<(), CoreError> {
        Ok(self
            .inner
            .client
            .write_file(&self.endpoint(), name, contents)
            .await?)
    }

    // ── Poller lifecycle ─────────────────────────────────────────

    /// Start both pollers.
    pub fn start(&self) {
        self.start_session_poller();
        self.start_event_poller();
    }

    /// Start the session poller unless it is already running.
    pub fn start_session_poller(&self) {
        let mut tasks = self.pollers();
        if tasks.session.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let cancel = tasks.cancel.clone();
        tasks.session = Some(tokio::spawn(session_poll_task(self.clone(), cancel)));
        info!(interval_ms = self.settings_guard().interval_ms, "session poller started");
    }

    /// Start the event poller unless it is already running.
    pub fn start_event_poller(&self) {
        let mut tasks = self.pollers();
        if tasks.events.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let cancel = tasks.cancel.clone();
        tasks.events = Some(tokio::spawn(event_poll_task(self.clone(), cancel)));
        info!("event poller started");
    }

    /// Stop both pollers and invalidate any fetch still in flight.
    pub async fn stop(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let handles = {
            let mut tasks = self.pollers();
            let old = std::mem::take(&mut *tasks);
            old.cancel.cancel();
            [old.session, old.events]
        };

        let mut stopped = false;
        for handle in handles.into_iter().flatten() {
            let _ = handle.await;
            stopped = true;
        }
        if stopped {
            info!("pollers stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        let tasks = self.pollers();
        [&tasks.session, &tasks.events]
            .into_iter()
            .flatten()
            .any(|h| !h.is_finished())
    }

    fn session_interval(&self) -> Duration {
        self.settings_guard()
            .poll_interval()
            .max(MIN_POLL_INTERVAL)
    }

    fn event_interval(&self) -> Duration {
        self.inner
            .config
            .event_interval
            .unwrap_or_else(|| self.settings_guard().poll_interval())
            .max(MIN_POLL_INTERVAL)
    }

    // ── Internals ────────────────────────────────────────────────

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn credentials(&self) -> MutexGuard<'_, CredentialStore> {
        self.inner
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn settings_guard(&self) -> MutexGuard<'_, ConnectionSettings> {
        self.inner
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn pollers(&self) -> MutexGuard<'_, PollerTasks> {
        self.inner
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_login(&self, auth: Option<&StoredAuth>) {
        let store = &self.inner.persistence;
        if let Some(auth) = auth {
            if let Err(e) = store.save_auth(auth) {
                warn!(error = %e, "could not persist credentials");
            }
        }
        let settings = self.settings();
        if let Err(e) = store.save_settings(&settings) {
            warn!(error = %e, "could not persist settings");
        }
    }

    fn clear_persisted(&self) {
        let store = &self.inner.persistence;
        if let Err(e) = store.clear_auth() {
            warn!(error = %e, "could not clear saved credentials");
        }
        if let Err(e) = store.clear_settings() {
            warn!(error = %e, "could not clear saved settings");
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Fetch immediately, then again `interval` after each cycle resolves.
async fn session_poll_task(conn: Connection, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = conn.refresh_session() => {}
        }

        let interval = conn.session_interval();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    debug!("session poller exited");
}

async fn event_poll_task(conn: Connection, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = conn.refresh_events() => {}
        }

        let interval = conn.event_interval();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    debug!("event poller exited");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;

    fn connection(store: Arc<MemoryStore>) -> Connection {
        Connection::new(CoreConfig::default(), store).unwrap()
    }

    #[tokio::test]
    async fn restores_saved_settings() {
        let store = Arc::new(MemoryStore::with_records(
            Some(PartialSettings {
                host: Some("10.0.0.2".into()),
                port: Some(8083),
                ..PartialSettings::default()
            }),
            None,
        ));
        let conn = connection(store);
        assert_eq!(conn.settings().url(), "http://10.0.0.2:8083/api");
    }

    #[tokio::test]
    async fn failing_backend_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let conn = connection(store);
        assert_eq!(conn.settings(), ConnectionSettings::default());
        assert!(!conn.restore());
    }

    #[tokio::test]
    async fn update_settings_persists() {
        let store = Arc::new(MemoryStore::new());
        let conn = connection(Arc::clone(&store));
        conn.update_settings(&PartialSettings {
            interval: Some(500),
            ..PartialSettings::default()
        });
        assert_eq!(conn.settings().interval_ms, 500);
        assert_eq!(store.load_settings().unwrap().unwrap().interval, Some(500));
    }

    #[tokio::test]
    async fn apply_settings_does_not_persist() {
        let store = Arc::new(MemoryStore::new());
        let conn = connection(Arc::clone(&store));
        conn.apply_settings(&PartialSettings {
            host: Some("10.1.1.1".into()),
            ..PartialSettings::default()
        });
        assert_eq!(conn.settings().host, "10.1.1.1");
        assert!(store.load_settings().unwrap().is_none());
    }

    #[tokio::test]
    async fn endpoint_carries_current_credentials() {
        let conn = connection(Arc::new(MemoryStore::new()));
        assert!(conn.endpoint().base().ends_with(":8081/api"));
        assert_eq!(conn.auth_state(), AuthState::LoggedOut);

        conn.credentials()
            .set("user", SecretString::from("pass".to_string()));
        assert_eq!(conn.auth_state(), AuthState::PendingFirstFetch);
        assert!(!conn.is_ready());
    }

    #[tokio::test]
    async fn logout_when_logged_out_is_silent() {
        let conn = connection(Arc::new(MemoryStore::new()));
        let mut logged_out = conn.on_logged_out();
        conn.logout().await;
        assert!(logged_out.try_recv().is_none());
    }
}
