use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::client::config::ServerEndpoint;
use crate::client::trust::TrustRecord;

/// A persisted bearer session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    /// Seconds since epoch; 0 means no expiry.
    pub expires_at: i64,
}

impl Session {
    pub fn is_valid(&self, now: i64) -> bool {
        !self.token.is_empty() && (self.expires_at == 0 || self.expires_at > now)
    }
}

/// The full persisted namespace, serialized as a unit.
///
/// The platform keystore owns the bytes and supplies encryption at rest;
/// this struct is only ever exchanged with it as one opaque JSON blob
/// (hydrated at startup, written back after every mutation, cleared as a
/// unit on logout).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub token_expiry: i64,
    #[serde(default)]
    pub cert_fingerprint: String,
    #[serde(default)]
    pub biometric_enabled: bool,
    #[serde(default)]
    pub auto_speak: bool,
}

/// Typed access to the persisted connection configuration and session.
///
/// The passphrase is deliberately absent: credentials are used once per
/// login attempt and discarded, never stored.
pub trait CredentialStore: Send + Sync {
    fn endpoint(&self) -> Option<ServerEndpoint>;
    fn set_endpoint(&self, endpoint: &ServerEndpoint);

    fn session(&self) -> Option<Session>;
    fn set_session(&self, session: &Session);

    fn trust_record(&self) -> Option<TrustRecord>;
    fn set_trust_record(&self, record: &TrustRecord);

    fn biometric_enabled(&self) -> bool;
    fn set_biometric_enabled(&self, enabled: bool);

    fn auto_speak(&self) -> bool;
    fn set_auto_speak(&self, enabled: bool);

    /// Erase every field as a unit.
    fn clear(&self);

    /// Snapshot of the whole namespace for the platform to persist.
    fn snapshot(&self) -> StoredConfig;

    /// Replace the whole namespace from the platform's persisted copy.
    fn hydrate(&self, config: StoredConfig);

    /// True iff both a host and a token are present. A crash between the
    /// endpoint and session writes leaves partial state; this conjunctive
    /// check treats partial state as unconfigured, which is the intended
    /// recovery path.
    fn is_configured(&self) -> bool {
        self.endpoint().is_some() && self.session().is_some_and(|s| !s.token.is_empty())
    }

    fn is_session_valid(&self, now: i64) -> bool {
        self.session().is_some_and(|s| s.is_valid(now))
    }
}

/// In-process store over the hydrated namespace. The mobile manager
/// hydrates it from the platform keystore at startup and forwards every
/// snapshot back for encrypted persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoredConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn endpoint(&self) -> Option<ServerEndpoint> {
        let inner = self.inner.read().ok()?;
        ServerEndpoint::new(inner.host.clone(), inner.port, inner.use_tls).ok()
    }

    fn set_endpoint(&self, endpoint: &ServerEndpoint) {
        if let Ok(mut inner) = self.inner.write() {
            inner.host = endpoint.host.clone();
            inner.port = endpoint.port;
            inner.use_tls = endpoint.use_tls;
        }
    }

    fn session(&self) -> Option<Session> {
        let inner = self.inner.read().ok()?;
        if inner.token.is_empty() {
            return None;
        }
        Some(Session {
            token: inner.token.clone(),
            expires_at: inner.token_expiry,
        })
    }

    fn set_session(&self, session: &Session) {
        if let Ok(mut inner) = self.inner.write() {
            inner.token = session.token.clone();
            inner.token_expiry = session.expires_at;
        }
    }

    fn trust_record(&self) -> Option<TrustRecord> {
        let inner = self.inner.read().ok()?;
        if inner.cert_fingerprint.is_empty() {
            return None;
        }
        Some(TrustRecord::new(inner.cert_fingerprint.clone()))
    }

    fn set_trust_record(&self, record: &TrustRecord) {
        if let Ok(mut inner) = self.inner.write() {
            inner.cert_fingerprint = record.fingerprint.clone();
        }
    }

    fn biometric_enabled(&self) -> bool {
        self.inner.read().map(|i| i.biometric_enabled).unwrap_or(false)
    }

    fn set_biometric_enabled(&self, enabled: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.biometric_enabled = enabled;
        }
    }

    fn auto_speak(&self) -> bool {
        self.inner.read().map(|i| i.auto_speak).unwrap_or(false)
    }

    fn set_auto_speak(&self, enabled: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.auto_speak = enabled;
        }
    }

    fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = StoredConfig::default();
        }
    }

    fn snapshot(&self) -> StoredConfig {
        self.inner.read().map(|i| i.clone()).unwrap_or_default()
    }

    fn hydrate(&self, config: StoredConfig) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = config;
        }
    }
}
