use serde_json::Value;

/// The `app` identifier a pairing payload must carry.
pub const PAIRING_APP_ID: &str = "galactic-ai";

/// Connection parameters decoded from a scanned pairing code.
///
/// Transient: consumed immediately to populate connection fields, never
/// persisted as-is. The caller defaults `use_tls = false` for
/// pairing-derived endpoints (LAN pairing assumes plaintext HTTP) and
/// seeds the trust record when `fingerprint` is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairingPayload {
    pub app: String,
    pub host: String,
    pub port: u16,
    /// Pre-trusted certificate fingerprint delivered out-of-band.
    pub fingerprint: Option<String>,
}

/// Why a scanned payload was refused. `NotJson` and `WrongApp` are kept
/// apart so the UI can tell "that isn't a pairing code" from "that code
/// belongs to another app".
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("not a pairing code (invalid JSON)")]
    NotJson,
    #[error("pairing code belongs to another app ({found})")]
    WrongApp { found: String },
    #[error("pairing code is missing or has an invalid `{0}` field")]
    BadField(&'static str),
}

/// Decode raw scanned text into a [`PairingPayload`].
pub fn decode_pairing(text: &str) -> Result<PairingPayload, PairingError> {
    let value: Value = serde_json::from_str(text).map_err(|_| PairingError::NotJson)?;

    let app = value
        .get("app")
        .and_then(Value::as_str)
        .ok_or(PairingError::BadField("app"))?;
    if app != PAIRING_APP_ID {
        return Err(PairingError::WrongApp {
            found: app.to_string(),
        });
    }

    let host = value
        .get("host")
        .and_then(Value::as_str)
        .filter(|h| !h.trim().is_empty())
        .ok_or(PairingError::BadField("host"))?;

    let port = value
        .get("port")
        .and_then(Value::as_u64)
        .filter(|p| (1..=65535).contains(p))
        .ok_or(PairingError::BadField("port"))? as u16;

    let fingerprint = value
        .get("fingerprint")
        .and_then(Value::as_str)
        .map(|f| f.to_ascii_lowercase());

    Ok(PairingPayload {
        app: app.to_string(),
        host: host.to_string(),
        port,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_payload() {
        let payload =
            decode_pairing(r#"{"app":"galactic-ai","host":"192.168.1.5","port":17789}"#).unwrap();
        assert_eq!(payload.host, "192.168.1.5");
        assert_eq!(payload.port, 17789);
        assert!(payload.fingerprint.is_none());
    }

    #[test]
    fn decodes_fingerprint_lowercased() {
        let payload = decode_pairing(
            r#"{"app":"galactic-ai","host":"10.0.0.2","port":17789,"fingerprint":"ABCD1234"}"#,
        )
        .unwrap();
        assert_eq!(payload.fingerprint.as_deref(), Some("abcd1234"));
    }

    #[test]
    fn rejects_foreign_app() {
        match decode_pairing(r#"{"app":"other","host":"h","port":1}"#) {
            Err(PairingError::WrongApp { found }) => assert_eq!(found, "other"),
            other => panic!("expected WrongApp, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_json() {
        assert_eq!(
            decode_pairing("https://example.com/not-a-code"),
            Err(PairingError::NotJson)
        );
        assert_eq!(decode_pairing(""), Err(PairingError::NotJson));
    }

    #[test]
    fn rejects_bad_fields() {
        assert_eq!(
            decode_pairing(r#"{"app":"galactic-ai","port":17789}"#),
            Err(PairingError::BadField("host"))
        );
        assert_eq!(
            decode_pairing(r#"{"app":"galactic-ai","host":"h"}"#),
            Err(PairingError::BadField("port"))
        );
        assert_eq!(
            decode_pairing(r#"{"app":"galactic-ai","host":"h","port":0}"#),
            Err(PairingError::BadField("port"))
        );
        assert_eq!(
            decode_pairing(r#"{"app":"galactic-ai","host":"h","port":70000}"#),
            Err(PairingError::BadField("port"))
        );
        assert_eq!(
            decode_pairing(r#"{"host":"h","port":1}"#),
            Err(PairingError::BadField("app"))
        );
    }
}
