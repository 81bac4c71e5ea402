use serde::{Deserialize, Serialize};

use crate::client::trust::short_fingerprint;

/// Orchestrator phase. `Authenticated` is terminal for the process
/// lifetime unless an explicit logout clears the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No usable endpoint + session in the store
    Unconfigured,
    /// A login attempt is in flight
    Authenticating,
    /// Valid session available to the shell
    Authenticated,
}

/// Outcome of the platform biometric gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    Passed,
    Failed,
    /// No biometric/PIN capability on this device; access proceeds
    /// without the gate (fail-open).
    Unavailable,
}

/// Component-boundary error taxonomy. No raw transport, TLS, or parse
/// error crosses into the orchestrator — everything is converted to one
/// of these first.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Transport/timeout/DNS fault during login. Retryable, never fatal.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx or explicit `success: false` from /login. Surfaced verbatim.
    #[error("{0}")]
    AuthenticationRejected(String),

    /// TOFU fingerprint mismatch on a previously trusted link — the
    /// tamper/MITM detector. Never silently downgraded to trust.
    #[error("certificate mismatch: expected {expected_prefix}…, got {got_prefix}…")]
    CertificateMismatch {
        expected_prefix: String,
        got_prefix: String,
    },

    /// First contact over TLS with no trust record: the observed
    /// fingerprint needs explicit user confirmation before any retry.
    #[error("server certificate requires confirmation")]
    TrustRequired { fingerprint: String },

    /// User declined the interactive trust confirmation.
    #[error("server certificate is not trusted")]
    CertificateUntrusted,

    /// A login attempt is already in flight.
    #[error("a login attempt is already in progress")]
    LoginInProgress,
}

impl SessionError {
    pub(crate) fn mismatch(expected: &str, got: &str) -> Self {
        SessionError::CertificateMismatch {
            expected_prefix: short_fingerprint(expected).to_string(),
            got_prefix: short_fingerprint(got).to_string(),
        }
    }
}

/// Events emitted by the orchestrator for the shell/UI layer. Exactly one
/// event stream exists per process; the mobile layer drains it on its own
/// executor.
#[derive(Clone, Debug, PartialEq)]
pub enum ShellEvent {
    /// The orchestrator moved to a new phase.
    PhaseChanged { phase: SessionPhase },
    /// Login failed; the message is shown verbatim and nothing was persisted.
    LoginFailed { message: String },
    /// First TLS contact: ask the user to confirm the fingerprint.
    /// `short` is the human-verifiable 32-char form.
    TrustPrompt { fingerprint: String, short: String },
    /// The stored configuration changed; the platform must write this
    /// serialized namespace back to its encrypted keystore as a unit.
    Persist { config: String },
    /// Biometric gate explicitly failed: access denied for this launch.
    /// The session itself is not revoked.
    GateDenied,
    /// Health check result (never a hard error).
    Health { online: bool, model: Option<String> },
    /// Server-rendered speech audio is ready to play.
    SpeakAudio { audio: Vec<u8> },
    /// No server audio available — fall back to the device TTS engine.
    SpeakLocal { text: String },
    /// The persisted configuration could not be read. Fatal to setup.
    FatalConfig { message: String },
}
