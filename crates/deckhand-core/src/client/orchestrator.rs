use std::sync::Arc;
use std::time::Duration;

use crate::client::backoff::ReconnectBackoff;
use crate::client::config::ServerEndpoint;
use crate::client::pairing::{decode_pairing, PairingError};
use crate::client::session::HealthStatus;
use crate::client::trust::{short_fingerprint, TrustRecord};
use crate::client::types::{GateOutcome, SessionError, SessionPhase, ShellEvent};
use crate::store::{CredentialStore, Session};

/// Everything a login worker needs; built by [`SessionOrchestrator::begin_login`]
/// and handed back to [`SessionOrchestrator::finish_login`] with the result.
#[derive(Clone, Debug)]
pub struct LoginAttempt {
    pub endpoint: ServerEndpoint,
    pub passphrase: String,
    pub trust: Option<TrustRecord>,
}

/// Sequences the credential store, trust verifier, and session client.
///
/// All methods are synchronous state transitions: the owning shell layer
/// performs the actual network I/O between `begin_login` and
/// `finish_login`, and serializes every call onto a single logical thread
/// (the manager's lock). Events flow out through a bounded channel the
/// UI drains; a full channel drops the event rather than blocking a
/// state transition.
pub struct SessionOrchestrator {
    store: Arc<dyn CredentialStore>,
    backoff: ReconnectBackoff,
    phase: SessionPhase,
    login_in_flight: bool,
    pending_trust: Option<(LoginAttempt, String)>,
    gate_passed: bool,
    event_tx: async_channel::Sender<ShellEvent>,
}

impl SessionOrchestrator {
    pub fn new(store: Arc<dyn CredentialStore>, event_tx: async_channel::Sender<ShellEvent>) -> Self {
        Self {
            store,
            backoff: ReconnectBackoff::new(),
            phase: SessionPhase::Unconfigured,
            login_in_flight: false,
            pending_trust: None,
            gate_passed: false,
            event_tx,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Decide the initial phase from the hydrated store.
    pub fn bootstrap(&mut self, now: i64) {
        let phase = if self.store.is_configured() && self.store.is_session_valid(now) {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unconfigured
        };
        self.set_phase(phase);
    }

    /// Start a login attempt. At most one may be in flight: a second call
    /// while one is pending is rejected rather than racing token writes.
    pub fn begin_login(
        &mut self,
        endpoint: ServerEndpoint,
        passphrase: String,
    ) -> Result<LoginAttempt, SessionError> {
        if self.login_in_flight {
            return Err(SessionError::LoginInProgress);
        }
        self.login_in_flight = true;
        self.pending_trust = None;
        self.set_phase(SessionPhase::Authenticating);
        Ok(LoginAttempt {
            endpoint,
            passphrase,
            trust: self.store.trust_record(),
        })
    }

    /// Apply a finished login attempt.
    ///
    /// Success persists endpoint + session and enters Authenticated.
    /// `TrustRequired` keeps the attempt pending behind a user prompt.
    /// Any other failure surfaces the message and returns to Unconfigured
    /// with nothing persisted.
    pub fn finish_login(&mut self, attempt: LoginAttempt, result: Result<Session, SessionError>) {
        self.login_in_flight = false;
        match result {
            Ok(session) => {
                self.store.set_endpoint(&attempt.endpoint);
                self.store.set_session(&session);
                self.backoff.reset();
                self.persist();
                self.set_phase(SessionPhase::Authenticated);
            }
            Err(SessionError::TrustRequired { fingerprint }) => {
                self.emit(ShellEvent::TrustPrompt {
                    short: short_fingerprint(&fingerprint).to_string(),
                    fingerprint: fingerprint.clone(),
                });
                self.pending_trust = Some((attempt, fingerprint));
            }
            Err(err) => {
                self.emit(ShellEvent::LoginFailed {
                    message: err.to_string(),
                });
                self.set_phase(SessionPhase::Unconfigured);
            }
        }
    }

    /// Resolve the interactive trust-on-first-use prompt. Confirmation
    /// pins the fingerprint and returns the attempt for the caller to
    /// retry; rejection aborts with no state change beyond the phase.
    pub fn resolve_trust(&mut self, accept: bool) -> Option<LoginAttempt> {
        let (mut attempt, fingerprint) = self.pending_trust.take()?;
        if accept {
            let record = TrustRecord::new(fingerprint);
            self.store.set_trust_record(&record);
            self.persist();
            attempt.trust = Some(record);
            self.login_in_flight = true;
            Some(attempt)
        } else {
            self.emit(ShellEvent::LoginFailed {
                message: SessionError::CertificateUntrusted.to_string(),
            });
            self.set_phase(SessionPhase::Unconfigured);
            None
        }
    }

    /// Decode a scanned pairing payload. Seeds the trust record when a
    /// fingerprint is carried (pre-trusted, no prompt) and returns the
    /// endpoint with `use_tls` defaulted to false for the UI to prefill.
    pub fn apply_pairing(&mut self, text: &str) -> Result<ServerEndpoint, PairingError> {
        let payload = decode_pairing(text)?;
        let endpoint = ServerEndpoint::new(payload.host, payload.port, false)
            .map_err(|_| PairingError::BadField("host"))?;
        if let Some(fingerprint) = payload.fingerprint {
            self.store.set_trust_record(&TrustRecord::new(fingerprint));
            self.persist();
        }
        Ok(endpoint)
    }

    /// Record the platform biometric gate outcome. The gate is a
    /// side-entry in front of the Authenticated state: it never revokes
    /// the session, only withholds access for this launch.
    pub fn record_gate(&mut self, outcome: GateOutcome) {
        match outcome {
            GateOutcome::Passed => self.gate_passed = true,
            // Fail-open when the device has no biometric capability.
            GateOutcome::Unavailable => self.gate_passed = true,
            GateOutcome::Failed => {
                self.gate_passed = false;
                self.emit(ShellEvent::GateDenied);
            }
        }
    }

    /// Whether the shell may expose the authenticated UI.
    pub fn access_granted(&self) -> bool {
        !self.store.biometric_enabled() || self.gate_passed
    }

    /// Fold in a health check result. Any success clears accumulated
    /// backoff.
    pub fn health_result(&mut self, status: HealthStatus) {
        if status.online {
            self.backoff.reset();
        }
        self.emit(ShellEvent::Health {
            online: status.online,
            model: status.model,
        });
    }

    /// Current retry delay; doubles for the next caller.
    pub fn next_retry_delay(&mut self) -> Duration {
        self.backoff.next_delay()
    }

    /// Clear the store as a unit and return to Unconfigured.
    pub fn logout(&mut self) {
        self.store.clear();
        self.persist();
        self.pending_trust = None;
        self.login_in_flight = false;
        self.gate_passed = false;
        self.set_phase(SessionPhase::Unconfigured);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.emit(ShellEvent::PhaseChanged { phase });
    }

    fn persist(&self) {
        match serde_json::to_string(&self.store.snapshot()) {
            Ok(config) => self.emit(ShellEvent::Persist { config }),
            Err(e) => log::error!("Failed to serialize config for persistence: {}", e),
        }
    }

    fn emit(&self, event: ShellEvent) {
        if self.event_tx.try_send(event).is_err() {
            log::warn!("Shell event channel full or closed; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::trust::fingerprint_hex;
    use crate::store::MemoryStore;

    fn now() -> i64 {
        1_700_000_000
    }

    fn setup() -> (
        SessionOrchestrator,
        Arc<MemoryStore>,
        async_channel::Receiver<ShellEvent>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = async_channel::bounded(256);
        let orch = SessionOrchestrator::new(store.clone(), tx);
        (orch, store, rx)
    }

    fn drain(rx: &async_channel::Receiver<ShellEvent>) -> Vec<ShellEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("192.168.1.5", 17789, false).unwrap()
    }

    #[test]
    fn bootstrap_starts_authenticated_with_valid_stored_session() {
        let (mut orch, store, _rx) = setup();
        store.set_endpoint(&endpoint());
        store.set_session(&Session { token: "tok".into(), expires_at: 0 });
        orch.bootstrap(now());
        assert_eq!(orch.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn bootstrap_starts_unconfigured_on_empty_or_expired_store() {
        let (mut orch, store, _rx) = setup();
        orch.bootstrap(now());
        assert_eq!(orch.phase(), SessionPhase::Unconfigured);

        store.set_endpoint(&endpoint());
        store.set_session(&Session { token: "tok".into(), expires_at: now() - 1 });
        orch.bootstrap(now());
        assert_eq!(orch.phase(), SessionPhase::Unconfigured);
    }

    #[test]
    fn second_login_while_in_flight_is_rejected() {
        let (mut orch, _store, _rx) = setup();
        orch.begin_login(endpoint(), "pw".into()).unwrap();
        assert_eq!(
            orch.begin_login(endpoint(), "pw".into()).unwrap_err(),
            SessionError::LoginInProgress
        );
    }

    #[test]
    fn successful_login_persists_and_authenticates() {
        let (mut orch, store, rx) = setup();
        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        assert_eq!(orch.phase(), SessionPhase::Authenticating);

        orch.finish_login(
            attempt,
            Ok(Session { token: "abc123".into(), expires_at: 1_700_003_600 }),
        );
        assert_eq!(orch.phase(), SessionPhase::Authenticated);
        assert_eq!(store.session().unwrap().token, "abc123");
        assert_eq!(store.endpoint().unwrap(), endpoint());

        let events = drain(&rx);
        assert!(events.iter().any(|e| matches!(e, ShellEvent::Persist { .. })));
        // A fresh login is allowed again afterwards.
        assert!(orch.begin_login(endpoint(), "pw".into()).is_ok());
    }

    #[test]
    fn failed_login_persists_nothing_and_surfaces_message() {
        let (mut orch, store, rx) = setup();
        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        orch.finish_login(
            attempt,
            Err(SessionError::AuthenticationRejected("bad password".into())),
        );
        assert_eq!(orch.phase(), SessionPhase::Unconfigured);
        assert!(store.session().is_none());
        assert!(store.endpoint().is_none());
        assert!(drain(&rx).iter().any(
            |e| matches!(e, ShellEvent::LoginFailed { message } if message == "bad password")
        ));
    }

    #[test]
    fn trust_prompt_confirm_pins_and_retries() {
        let (mut orch, store, rx) = setup();
        let fp = fingerprint_hex(b"server-cert");
        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        orch.finish_login(attempt, Err(SessionError::TrustRequired { fingerprint: fp.clone() }));

        let events = drain(&rx);
        assert!(events.iter().any(|e| matches!(
            e,
            ShellEvent::TrustPrompt { short, .. } if short.len() == 32
        )));

        let retry = orch.resolve_trust(true).unwrap();
        assert_eq!(store.trust_record().unwrap().fingerprint, fp);
        assert_eq!(retry.trust.clone().unwrap().fingerprint, fp);

        // Retried attempt succeeding completes the flow.
        orch.finish_login(retry, Ok(Session { token: "t".into(), expires_at: 0 }));
        assert_eq!(orch.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn trust_prompt_decline_aborts_without_state_change() {
        let (mut orch, store, rx) = setup();
        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        orch.finish_login(
            attempt,
            Err(SessionError::TrustRequired { fingerprint: fingerprint_hex(b"x") }),
        );
        assert!(orch.resolve_trust(false).is_none());
        assert_eq!(orch.phase(), SessionPhase::Unconfigured);
        assert!(store.trust_record().is_none());
        assert!(drain(&rx).iter().any(|e| matches!(e, ShellEvent::LoginFailed { .. })));
    }

    #[test]
    fn pinned_mismatch_is_surfaced_not_retried() {
        let (mut orch, _store, rx) = setup();
        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        orch.finish_login(attempt, Err(SessionError::mismatch("aaaa", "bbbb")));
        assert_eq!(orch.phase(), SessionPhase::Unconfigured);
        assert!(drain(&rx).iter().any(
            |e| matches!(e, ShellEvent::LoginFailed { message } if message.contains("mismatch"))
        ));
    }

    #[test]
    fn pairing_seeds_trust_and_defaults_to_plaintext() {
        let (mut orch, store, _rx) = setup();
        let fp = fingerprint_hex(b"paired-cert");
        let text = format!(
            r#"{{"app":"galactic-ai","host":"192.168.1.5","port":17789,"fingerprint":"{}"}}"#,
            fp
        );
        let ep = orch.apply_pairing(&text).unwrap();
        assert!(!ep.use_tls);
        assert_eq!(ep.host, "192.168.1.5");
        // Pre-trusted: written without an interactive prompt.
        assert_eq!(store.trust_record().unwrap().fingerprint, fp);
    }

    #[test]
    fn pairing_without_fingerprint_leaves_trust_untouched() {
        let (mut orch, store, _rx) = setup();
        orch.apply_pairing(r#"{"app":"galactic-ai","host":"h","port":1}"#)
            .unwrap();
        assert!(store.trust_record().is_none());
    }

    #[test]
    fn gate_policy_matrix() {
        // Gate disabled: always granted.
        let (orch, _store, _rx) = setup();
        assert!(orch.access_granted());

        // Enabled + passed: granted.
        let (mut orch, store, _rx) = setup();
        store.set_biometric_enabled(true);
        assert!(!orch.access_granted());
        orch.record_gate(GateOutcome::Passed);
        assert!(orch.access_granted());

        // Enabled + unavailable: fail-open, granted.
        let (mut orch, store, _rx) = setup();
        store.set_biometric_enabled(true);
        orch.record_gate(GateOutcome::Unavailable);
        assert!(orch.access_granted());

        // Enabled + failed: denied for this launch, session untouched.
        let (mut orch, store, rx) = setup();
        store.set_biometric_enabled(true);
        store.set_session(&Session { token: "tok".into(), expires_at: 0 });
        orch.record_gate(GateOutcome::Failed);
        assert!(!orch.access_granted());
        assert!(store.session().is_some());
        assert!(drain(&rx).contains(&ShellEvent::GateDenied));
    }

    #[test]
    fn health_success_resets_backoff() {
        let (mut orch, _store, rx) = setup();
        assert_eq!(orch.next_retry_delay(), Duration::from_millis(1000));
        assert_eq!(orch.next_retry_delay(), Duration::from_millis(2000));
        orch.health_result(HealthStatus { online: true, model: None });
        assert_eq!(orch.next_retry_delay(), Duration::from_millis(1000));
        assert!(drain(&rx).iter().any(|e| matches!(e, ShellEvent::Health { online: true, .. })));
    }

    #[test]
    fn full_event_channel_drops_events_without_blocking_transitions() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = async_channel::bounded(1);
        let mut orch = SessionOrchestrator::new(store, tx);

        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        orch.finish_login(attempt, Ok(Session { token: "t".into(), expires_at: 0 }));

        // State advanced even though most events overflowed the channel.
        assert_eq!(orch.phase(), SessionPhase::Authenticated);
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn logout_clears_store_and_returns_to_unconfigured() {
        let (mut orch, store, rx) = setup();
        let attempt = orch.begin_login(endpoint(), "pw".into()).unwrap();
        orch.finish_login(attempt, Ok(Session { token: "t".into(), expires_at: 0 }));
        drain(&rx);

        orch.logout();
        assert_eq!(orch.phase(), SessionPhase::Unconfigured);
        assert!(store.session().is_none());
        assert!(store.endpoint().is_none());
        // The cleared namespace is persisted as a unit.
        assert!(drain(&rx).iter().any(|e| matches!(
            e,
            ShellEvent::Persist { config } if config.contains(r#""token":"""#)
        )));
    }
}
