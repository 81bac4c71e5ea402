pub mod backoff;
pub mod config;
pub mod orchestrator;
pub mod pairing;
pub mod session;
pub mod trust;
pub mod types;

pub use backoff::ReconnectBackoff;
pub use config::ServerEndpoint;
pub use orchestrator::{LoginAttempt, SessionOrchestrator};
pub use pairing::{decode_pairing, PairingError, PairingPayload, PAIRING_APP_ID};
pub use session::{fetch_tts, health_check, login, HealthStatus};
pub use trust::{fingerprint_hex, short_fingerprint, TofuVerifier, TrustRecord};
pub use types::{GateOutcome, SessionError, SessionPhase, ShellEvent};
