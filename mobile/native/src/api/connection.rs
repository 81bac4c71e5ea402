use crate::client::manager::SessionManager;

use deckhand_core::client::{GateOutcome, SessionPhase, ShellEvent};

/// Session phase returned via FFI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPhase {
    Unconfigured,
    Authenticating,
    Authenticated,
}

impl From<SessionPhase> for ShellPhase {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Unconfigured => ShellPhase::Unconfigured,
            SessionPhase::Authenticating => ShellPhase::Authenticating,
            SessionPhase::Authenticated => ShellPhase::Authenticated,
        }
    }
}

/// Biometric gate outcome reported by the platform.
#[derive(Debug, Clone, Copy)]
pub enum GateResult {
    Passed,
    Failed,
    Unavailable,
}

impl From<GateResult> for GateOutcome {
    fn from(result: GateResult) -> Self {
        match result {
            GateResult::Passed => GateOutcome::Passed,
            GateResult::Failed => GateOutcome::Failed,
            GateResult::Unavailable => GateOutcome::Unavailable,
        }
    }
}

/// Shell event delivered to the UI event pump.
#[derive(Debug, Clone)]
pub enum ShellNotification {
    PhaseChanged { phase: ShellPhase },
    LoginFailed { message: String },
    /// Ask the user to confirm a first-contact certificate. `short` is
    /// the 32-char human-verifiable form of the fingerprint.
    TrustPrompt { fingerprint: String, short: String },
    /// Write this serialized namespace back to the platform keystore.
    Persist { config: String },
    GateDenied,
    Health { online: bool, model: Option<String> },
    /// Server-rendered speech audio to play.
    SpeakAudio { audio: Vec<u8> },
    /// Speak with the device TTS engine instead.
    SpeakLocal { text: String },
    FatalConfig { message: String },
}

impl From<ShellEvent> for ShellNotification {
    fn from(event: ShellEvent) -> Self {
        match event {
            ShellEvent::PhaseChanged { phase } => ShellNotification::PhaseChanged {
                phase: phase.into(),
            },
            ShellEvent::LoginFailed { message } => ShellNotification::LoginFailed { message },
            ShellEvent::TrustPrompt { fingerprint, short } => {
                ShellNotification::TrustPrompt { fingerprint, short }
            }
            ShellEvent::Persist { config } => ShellNotification::Persist { config },
            ShellEvent::GateDenied => ShellNotification::GateDenied,
            ShellEvent::Health { online, model } => ShellNotification::Health { online, model },
            ShellEvent::SpeakAudio { audio } => ShellNotification::SpeakAudio { audio },
            ShellEvent::SpeakLocal { text } => ShellNotification::SpeakLocal { text },
            ShellEvent::FatalConfig { message } => ShellNotification::FatalConfig { message },
        }
    }
}

/// Connection parameters decoded from a pairing code, for prefilling the
/// login form. Pairing-derived endpoints default to plaintext HTTP.
#[derive(Debug, Clone)]
pub struct PairedEndpoint {
    pub host: String,
    pub port: u16,
}

/// Initialize the app (called once at startup).
#[flutter_rust_bridge::frb(init)]
pub fn init_app() {
    flutter_rust_bridge::setup_default_user_utils();
    SessionManager::init();
}

/// Hand over the decrypted persisted namespace from the platform
/// keystore. Returns false (and emits a fatal-config event) when the
/// stored blob is unreadable.
#[flutter_rust_bridge::frb(sync)]
pub fn hydrate_config(json: String) -> bool {
    SessionManager::get().hydrate(&json)
}

/// Current orchestrator phase.
#[flutter_rust_bridge::frb(sync)]
pub fn session_phase() -> ShellPhase {
    SessionManager::get().phase().into()
}

/// Start a login attempt. At most one may be in flight; a concurrent
/// call surfaces as a LoginFailed event. The passphrase is used once and
/// never persisted.
#[flutter_rust_bridge::frb(sync)]
pub fn begin_login(host: String, port: u16, use_tls: bool, passphrase: String) {
    SessionManager::get().begin_login(host, port, use_tls, passphrase);
}

/// Decode a scanned pairing code. Distinguishes "not a pairing code"
/// from "belongs to another app" in the error message.
pub fn submit_pairing(text: String) -> anyhow::Result<PairedEndpoint> {
    let endpoint = SessionManager::get()
        .submit_pairing(&text)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(PairedEndpoint {
        host: endpoint.host,
        port: endpoint.port,
    })
}

/// Resolve the pending trust-on-first-use prompt.
#[flutter_rust_bridge::frb(sync)]
pub fn resolve_trust_prompt(accept: bool) {
    SessionManager::get().resolve_trust(accept);
}

/// Report the platform biometric gate outcome.
#[flutter_rust_bridge::frb(sync)]
pub fn report_gate_result(result: GateResult) {
    SessionManager::get().record_gate(result.into());
}

/// Whether the shell may show the authenticated UI.
#[flutter_rust_bridge::frb(sync)]
pub fn access_granted() -> bool {
    SessionManager::get().access_granted()
}

/// Trigger a health check against the stored endpoint; the result
/// arrives as a Health event.
#[flutter_rust_bridge::frb(sync)]
pub fn request_health_check() {
    SessionManager::get().request_health_check();
}

/// Delay before the next reconnect attempt, in milliseconds. Doubles per
/// call up to the ceiling; any success resets it.
#[flutter_rust_bridge::frb(sync)]
pub fn next_retry_delay_ms() -> u64 {
    SessionManager::get().next_retry_delay_ms()
}

/// Clear the stored endpoint, session, and trust record as a unit.
#[flutter_rust_bridge::frb(sync)]
pub fn logout() {
    SessionManager::get().logout();
}

/// Script for the WebView to inject once authenticated: seeds the page's
/// localStorage with the bearer token and the embedded capability flag.
#[flutter_rust_bridge::frb(sync)]
pub fn bootstrap_script() -> Option<String> {
    SessionManager::get().bootstrap_script()
}

/// Script forwarding a recognized speech transcript into the hosted page.
#[flutter_rust_bridge::frb(sync)]
pub fn transcript_script(text: String) -> String {
    deckhand_core::bridge::transcript_script(&text)
}

/// Wait for the next shell event. The UI runs exactly one pump loop over
/// this.
pub async fn next_event() -> Option<ShellNotification> {
    SessionManager::get().next_event().await.map(Into::into)
}
