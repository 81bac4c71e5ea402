use std::sync::Arc;
use std::time::Duration;

use crate::api::{LoginRequest, LoginResponse, StatusResponse, TtsRequest};
use crate::client::config::ServerEndpoint;
use crate::client::trust::{pinned_tls_config, TofuVerifier, TrustFailure, TrustRecord};
use crate::client::types::SessionError;
use crate::store::Session;

/// Connect/read timeout for login.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Connect/read timeout for health checks.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
/// Connect/read timeout for server TTS fetches.
const TTS_TIMEOUT: Duration = Duration::from_secs(10);

/// The server rejects longer TTS requests.
pub const MAX_TTS_CHARS: usize = 5000;

/// Result of a health check. Health failures are a status signal, never a
/// hard error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealthStatus {
    pub online: bool,
    pub model: Option<String>,
}

impl HealthStatus {
    fn offline() -> Self {
        Self::default()
    }
}

/// Build an HTTP client for the endpoint. Over TLS, all certificate
/// decisions go through a fresh [`TofuVerifier`] pinned to the given
/// trust record; the verifier handle is returned so a failed request can
/// be attributed to a trust decision rather than a generic transport
/// fault.
fn http_client(
    endpoint: &ServerEndpoint,
    trust: Option<&TrustRecord>,
    timeout: Duration,
) -> Result<(reqwest::Client, Option<Arc<TofuVerifier>>), SessionError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout);

    let verifier = if endpoint.use_tls {
        let verifier = TofuVerifier::new(trust);
        let tls = pinned_tls_config(verifier.clone())
            .map_err(|e| SessionError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;
        builder = builder.use_preconfigured_tls(tls);
        Some(verifier)
    } else {
        None
    };

    let client = builder
        .build()
        .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;
    Ok((client, verifier))
}

/// Convert a transport fault into the boundary taxonomy, attributing TLS
/// failures recorded by the verifier.
fn map_transport(error: reqwest::Error, verifier: Option<&TofuVerifier>) -> SessionError {
    if let Some(failure) = verifier.and_then(|v| v.take_failure()) {
        return match failure {
            TrustFailure::Untrusted { fingerprint } => SessionError::TrustRequired { fingerprint },
            TrustFailure::Mismatch { expected, got } => SessionError::mismatch(&expected, &got),
            TrustFailure::NoCertificate => {
                SessionError::ConnectionFailed("server presented no certificate".to_string())
            }
        };
    }
    SessionError::ConnectionFailed(format!("Cannot reach server: {}", error))
}

/// Perform the login handshake: `POST /login` with the passphrase, JSON
/// body built structurally so any passphrase is escaped correctly. The
/// passphrase is used once and dropped; it is never logged or persisted.
pub async fn login(
    endpoint: &ServerEndpoint,
    passphrase: &str,
    trust: Option<&TrustRecord>,
) -> Result<Session, SessionError> {
    let (client, verifier) = http_client(endpoint, trust, LOGIN_TIMEOUT)?;
    let url = format!("{}/login", endpoint.base_url());

    let resp = client
        .post(&url)
        .json(&LoginRequest { password: passphrase })
        .timeout(LOGIN_TIMEOUT)
        .send()
        .await
        .map_err(|e| map_transport(e, verifier.as_deref()))?;

    let code = resp.status().as_u16();
    let success_status = resp.status().is_success();
    // Tolerate any body shape; missing fields fall out as None/false.
    let body: LoginResponse = resp.json().await.unwrap_or_default();

    if success_status && body.success {
        if let Some(token) = body.token.filter(|t| !t.is_empty()) {
            log::info!("Logged in to {}:{}", endpoint.host, endpoint.port);
            return Ok(Session {
                token,
                expires_at: body.expires.unwrap_or(0),
            });
        }
    }

    let message = body
        .error
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| format!("Login failed (HTTP {})", code));
    log::warn!("Login rejected by {}:{}", endpoint.host, endpoint.port);
    Err(SessionError::AuthenticationRejected(message))
}

/// `GET /api/status` with the bearer token. Any non-200 outcome or
/// transport fault reads as offline.
pub async fn health_check(
    endpoint: &ServerEndpoint,
    token: &str,
    trust: Option<&TrustRecord>,
) -> HealthStatus {
    let Ok((client, _verifier)) = http_client(endpoint, trust, HEALTH_TIMEOUT) else {
        return HealthStatus::offline();
    };
    let url = format!("{}/api/status", endpoint.base_url());

    match client
        .get(&url)
        .header("Authorization", format!("Bearer {}", token))
        .timeout(HEALTH_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
            let body: StatusResponse = resp.json().await.unwrap_or_default();
            HealthStatus {
                online: true,
                model: body.model,
            }
        }
        Ok(resp) => {
            log::debug!("Health check got HTTP {}", resp.status());
            HealthStatus::offline()
        }
        Err(e) => {
            log::debug!("Health check failed: {}", e);
            HealthStatus::offline()
        }
    }
}

/// `POST /api/tts` for server-rendered speech audio. Absence or failure is
/// not an error — it just means no server audio is available and the
/// caller should fall back to the device TTS engine.
pub async fn fetch_tts(
    endpoint: &ServerEndpoint,
    token: &str,
    text: &str,
    voice: &str,
    trust: Option<&TrustRecord>,
) -> Option<Vec<u8>> {
    let (client, _verifier) = http_client(endpoint, trust, TTS_TIMEOUT).ok()?;
    let url = format!("{}/api/tts", endpoint.base_url());

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", token))
        .json(&TtsRequest {
            text: clamp_tts_text(text),
            voice,
        })
        .timeout(TTS_TIMEOUT)
        .send()
        .await
        .ok()?;

    if resp.status() != reqwest::StatusCode::OK {
        log::debug!("TTS fetch got HTTP {}", resp.status());
        return None;
    }
    let is_audio = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("audio/"));
    if !is_audio {
        return None;
    }
    resp.bytes().await.ok().map(|b| b.to_vec())
}

/// Clamp TTS input to the server limit on a char boundary.
pub(crate) fn clamp_tts_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TTS_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
