use std::sync::{Arc, OnceLock};

use deckhand_core::bridge;
use deckhand_core::client::{
    session, GateOutcome, LoginAttempt, PairingError, ServerEndpoint, SessionOrchestrator,
    SessionPhase, ShellEvent,
};
use deckhand_core::store::{CredentialStore, MemoryStore, StoredConfig};
use parking_lot::RwLock;

static MANAGER: OnceLock<SessionManager> = OnceLock::new();

/// Owns the tokio runtime, the in-process credential store, and the
/// session orchestrator. All orchestrator mutation goes through the
/// write lock, so state transitions are serialized; network I/O runs on
/// the runtime's workers and reports back by re-entering the lock.
pub struct SessionManager {
    runtime: Arc<tokio::runtime::Runtime>,
    store: Arc<MemoryStore>,
    orchestrator: RwLock<SessionOrchestrator>,
    shell_tx: async_channel::Sender<ShellEvent>,
    shell_rx: async_channel::Receiver<ShellEvent>,
}

fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl SessionManager {
    /// Initialize the global singleton. Call once at app startup.
    pub fn init() {
        MANAGER.get_or_init(|| {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime");

            let store = Arc::new(MemoryStore::new());
            let (shell_tx, shell_rx) = async_channel::bounded::<ShellEvent>(256);
            let orchestrator = SessionOrchestrator::new(store.clone(), shell_tx.clone());

            SessionManager {
                runtime: Arc::new(runtime),
                store,
                orchestrator: RwLock::new(orchestrator),
                shell_tx,
                shell_rx,
            }
        });
    }

    /// Get the global singleton. Panics if `init()` hasn't been called.
    pub fn get() -> &'static SessionManager {
        MANAGER.get().expect("SessionManager not initialized")
    }

    /// Load the persisted namespace handed over by the platform keystore
    /// and decide the initial phase. A corrupt namespace is a fatal
    /// configuration error: the shell must treat setup as failed.
    pub fn hydrate(&self, json: &str) -> bool {
        match serde_json::from_str::<StoredConfig>(json) {
            Ok(config) => {
                self.store.hydrate(config);
                self.orchestrator.write().bootstrap(epoch_now());
                true
            }
            Err(e) => {
                log::error!("Persisted configuration unreadable: {}", e);
                self.emit(ShellEvent::FatalConfig {
                    message: format!("Stored configuration could not be read: {}", e),
                });
                false
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.orchestrator.read().phase()
    }

    pub fn access_granted(&self) -> bool {
        self.orchestrator.read().access_granted()
    }

    /// Start a login attempt against the given endpoint. Progress and the
    /// outcome arrive as shell events.
    pub fn begin_login(&self, host: String, port: u16, use_tls: bool, passphrase: String) {
        let endpoint = match ServerEndpoint::new(host, port, use_tls) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                self.emit(ShellEvent::LoginFailed { message: e.to_string() });
                return;
            }
        };
        match self.orchestrator.write().begin_login(endpoint, passphrase) {
            Ok(attempt) => self.spawn_login(attempt),
            Err(e) => self.emit(ShellEvent::LoginFailed { message: e.to_string() }),
        }
    }

    fn spawn_login(&self, attempt: LoginAttempt) {
        self.runtime.spawn(async move {
            let result =
                session::login(&attempt.endpoint, &attempt.passphrase, attempt.trust.as_ref())
                    .await;
            if let Some(mgr) = MANAGER.get() {
                mgr.orchestrator.write().finish_login(attempt, result);
            }
        });
    }

    /// Resolve the trust-on-first-use prompt. Accepting pins the
    /// fingerprint and retries the held login attempt.
    pub fn resolve_trust(&self, accept: bool) {
        let retry = self.orchestrator.write().resolve_trust(accept);
        if let Some(attempt) = retry {
            self.spawn_login(attempt);
        }
    }

    /// Decode a scanned pairing code, seeding trust when it carries a
    /// fingerprint. Returns the endpoint for the UI to prefill.
    pub fn submit_pairing(&self, text: &str) -> Result<ServerEndpoint, PairingError> {
        self.orchestrator.write().apply_pairing(text)
    }

    pub fn record_gate(&self, outcome: GateOutcome) {
        self.orchestrator.write().record_gate(outcome);
    }

    /// Run a health check against the stored endpoint. Offline is
    /// reported as a status event, never a hard error.
    pub fn request_health_check(&self) {
        let (Some(endpoint), Some(stored)) = (self.store.endpoint(), self.store.session()) else {
            self.emit(ShellEvent::Health { online: false, model: None });
            return;
        };
        let trust = self.store.trust_record();
        self.runtime.spawn(async move {
            let status = session::health_check(&endpoint, &stored.token, trust.as_ref()).await;
            if let Some(mgr) = MANAGER.get() {
                mgr.orchestrator.write().health_result(status);
            }
        });
    }

    /// Current reconnect delay for the UI's retry scheduler; doubles for
    /// the next call, reset by any success.
    pub fn next_retry_delay_ms(&self) -> u64 {
        self.orchestrator.write().next_retry_delay().as_millis() as u64
    }

    /// Fetch server speech audio for the text, falling back to the device
    /// TTS engine when the server has none.
    pub fn speak(&self, text: String, voice: String) {
        let (Some(endpoint), Some(stored)) = (self.store.endpoint(), self.store.session()) else {
            self.emit(ShellEvent::SpeakLocal { text });
            return;
        };
        let trust = self.store.trust_record();
        self.runtime.spawn(async move {
            let audio =
                session::fetch_tts(&endpoint, &stored.token, &text, &voice, trust.as_ref()).await;
            let event = match audio {
                Some(audio) => ShellEvent::SpeakAudio { audio },
                None => ShellEvent::SpeakLocal { text },
            };
            if let Some(mgr) = MANAGER.get() {
                mgr.emit(event);
            }
        });
    }

    pub fn logout(&self) {
        self.orchestrator.write().logout();
    }

    /// Injected-script payload for the WebView once authenticated.
    pub fn bootstrap_script(&self) -> Option<String> {
        let session = self.store.session()?;
        Some(bridge::bootstrap_script(&session.token))
    }

    pub fn biometric_enabled(&self) -> bool {
        self.store.biometric_enabled()
    }

    pub fn set_biometric_enabled(&self, enabled: bool) {
        self.store.set_biometric_enabled(enabled);
        self.persist();
    }

    pub fn auto_speak(&self) -> bool {
        self.store.auto_speak()
    }

    pub fn set_auto_speak(&self, enabled: bool) {
        self.store.set_auto_speak(enabled);
        self.persist();
    }

    /// Wait for the next shell event. Exactly one consumer (the UI event
    /// pump) drains this.
    pub async fn next_event(&self) -> Option<ShellEvent> {
        self.shell_rx.recv().await.ok()
    }

    fn persist(&self) {
        match serde_json::to_string(&self.store.snapshot()) {
            Ok(config) => self.emit(ShellEvent::Persist { config }),
            Err(e) => log::error!("Failed to serialize config for persistence: {}", e),
        }
    }

    fn emit(&self, event: ShellEvent) {
        if self.shell_tx.try_send(event).is_err() {
            log::warn!("Shell event channel closed; event dropped");
        }
    }
}
