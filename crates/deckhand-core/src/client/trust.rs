use std::sync::{Arc, Mutex};

use data_encoding::HEXLOWER;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, Error as TlsError, SignatureScheme};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The remembered certificate fingerprint.
///
/// Exactly one record exists per installation — not per server. Trusting a
/// new server overwrites the previous record. Set either from a pairing
/// payload (pre-trusted, no prompt) or by interactive trust-on-first-use
/// confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    /// Lowercase hex SHA-256 of the leaf certificate DER (64 chars)
    pub fingerprint: String,
}

impl TrustRecord {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into().to_ascii_lowercase(),
        }
    }
}

/// Hex SHA-256 fingerprint of a DER-encoded certificate.
pub fn fingerprint_hex(der: &[u8]) -> String {
    HEXLOWER.encode(&Sha256::digest(der))
}

/// Human-verifiable short form: the first 32 hex characters.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    let mut end = fingerprint.len().min(32);
    // Pairing-seeded records are arbitrary strings; never split a char.
    while !fingerprint.is_char_boundary(end) {
        end -= 1;
    }
    &fingerprint[..end]
}

/// Why a TLS handshake was refused by the pinning verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrustFailure {
    /// No record exists; the observed fingerprint needs user confirmation.
    Untrusted { fingerprint: String },
    /// The presented certificate does not match the remembered one.
    Mismatch { expected: String, got: String },
    /// The peer presented no usable certificate. Fail closed.
    NoCertificate,
}

/// Trust-on-first-use certificate verifier.
///
/// The Galactic AI server uses self-signed certificates by design, so CA
/// validation is replaced by fingerprint pinning. A rustls verifier cannot
/// block on user input, so first contact never succeeds silently: with no
/// pinned fingerprint the handshake is rejected and the observed
/// fingerprint is captured for the caller to surface as a confirmation
/// prompt. With a pinned fingerprint the handshake succeeds iff the leaf
/// matches; a mismatch is the tamper/MITM detector and is always surfaced.
#[derive(Debug)]
pub struct TofuVerifier {
    pinned: Option<String>,
    failure: Mutex<Option<TrustFailure>>,
    provider: Arc<CryptoProvider>,
}

impl TofuVerifier {
    pub fn new(pinned: Option<&TrustRecord>) -> Arc<Self> {
        Arc::new(Self {
            pinned: pinned.map(|r| r.fingerprint.to_ascii_lowercase()),
            failure: Mutex::new(None),
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        })
    }

    /// Take the failure recorded by the last rejected handshake, if any.
    pub fn take_failure(&self) -> Option<TrustFailure> {
        self.failure.lock().ok().and_then(|mut slot| slot.take())
    }

    fn reject(&self, failure: TrustFailure) -> TlsError {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(failure);
        }
        TlsError::InvalidCertificate(CertificateError::ApplicationVerificationFailure)
    }
}

impl ServerCertVerifier for TofuVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        if end_entity.as_ref().is_empty() {
            return Err(self.reject(TrustFailure::NoCertificate));
        }
        let got = fingerprint_hex(end_entity.as_ref());
        match &self.pinned {
            Some(expected) => {
                if bool::from(expected.as_bytes().ct_eq(got.as_bytes())) {
                    Ok(ServerCertVerified::assertion())
                } else {
                    Err(self.reject(TrustFailure::Mismatch {
                        expected: expected.clone(),
                        got,
                    }))
                }
            }
            None => Err(self.reject(TrustFailure::Untrusted { fingerprint: got })),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build a rustls client config that delegates all trust decisions to the
/// given verifier.
pub fn pinned_tls_config(verifier: Arc<TofuVerifier>) -> Result<rustls::ClientConfig, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(config)
}
