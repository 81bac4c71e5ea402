use serde::{Deserialize, Serialize};

// ── API request/response types ──────────────────────────────────────────────

/// POST /login request body
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub password: &'a str,
}

/// POST /login response body.
///
/// Every field defaults so that arbitrary surrounding JSON (extra keys,
/// partial bodies) deserializes instead of erroring — the caller decides
/// what a missing `token` means.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    /// Seconds since epoch; absent or 0 means the token never expires.
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// GET /api/status response body (200 only)
#[derive(Debug, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub model: Option<String>,
}

/// POST /api/tts request body
#[derive(Serialize)]
pub struct TtsRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
}
