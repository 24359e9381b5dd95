//! # Webhook Signature Verification
//!
//! Authenticates GitHub deliveries by recomputing the `X-Hub-Signature-256`
//! HMAC-SHA256 over the raw body and comparing it in constant time.
//!
//! Only the outcome is ever logged. Digests and the shared secret never reach
//! a log line or an error message.

use std::fmt;

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use metrics::counter;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the `sha256=<hex>` signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Reasons a delivery fails authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Missing required signature header: X-Hub-Signature-256")]
    MissingSignature,

    #[error("Invalid signature format: expected sha256=<hex>")]
    InvalidSignature,

    #[error("Signature verification failed")]
    SignatureMismatch,
}

impl VerificationError {
    /// Returns the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Stable label used for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationError::MissingSignature => "missing",
            VerificationError::InvalidSignature => "invalid",
            VerificationError::SignatureMismatch => "mismatch",
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(error: VerificationError) -> Self {
        unauthorized(Some(&error.to_string()))
    }
}

/// Result type for webhook verification
pub type VerificationResult<T> = Result<T, VerificationError>;

/// Outcome of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature matched the configured secret.
    Verified,
    /// No secret is configured, so no check was performed.
    Disabled,
}

/// Verifies GitHub webhook signature using HMAC-SHA256
pub fn verify_github_signature(
    body: &[u8],
    signature_header: &str,
    secret: &str,
) -> VerificationResult<()> {
    debug!(
        body_size = body.len(),
        "Starting GitHub signature verification"
    );

    if signature_header.trim().is_empty() {
        return Err(VerificationError::MissingSignature);
    }

    let Some(provided_hex) = signature_header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return Err(VerificationError::InvalidSignature);
    };

    let provided_bytes =
        hex::decode(provided_hex).map_err(|_| VerificationError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| VerificationError::SignatureMismatch)?;
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    let computed_bytes: &[u8] = computed.as_ref();
    if computed_bytes.ct_eq(&provided_bytes[..]).into() {
        Ok(())
    } else {
        Err(VerificationError::SignatureMismatch)
    }
}

/// Signature policy bound to the operator's configuration.
///
/// An absent or empty secret means verification is switched off. That is a
/// deliberate operator choice, reported as [`SignatureCheck::Disabled`].
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.webhook_github_secret.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check one delivery. `signature_header` is `None` when the header was absent.
    pub fn check(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> VerificationResult<SignatureCheck> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(SignatureCheck::Disabled);
        };

        match verify_github_signature(body, signature_header.unwrap_or_default(), secret) {
            Ok(()) => Ok(SignatureCheck::Verified),
            Err(err) => {
                warn!(reason = err.reason(), "Webhook signature rejected");
                counter!("webhook_signature_failures_total", "reason" => err.reason())
                    .increment(1);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_github_signature_verification_success() {
        let body = b"{\"zen\":\"Keep it logically awesome.\"}";
        let header = sign("test_secret", body);

        assert!(verify_github_signature(body, &header, "test_secret").is_ok());
    }

    #[test]
    fn test_uppercase_hex_digest_accepted() {
        let body = b"payload";
        let header = sign("test_secret", body);
        let upper = format!("sha256={}", header["sha256=".len()..].to_uppercase());

        assert!(verify_github_signature(body, &upper, "test_secret").is_ok());
    }

    #[test]
    fn test_signature_mismatch_with_wrong_secret() {
        let body = b"payload";
        let header = sign("other_secret", body);

        assert_eq!(
            verify_github_signature(body, &header, "test_secret"),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn test_signature_mismatch_on_tampered_body() {
        let header = sign("test_secret", b"original");

        assert_eq!(
            verify_github_signature(b"tampered", &header, "test_secret"),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn test_missing_signature() {
        assert_eq!(
            verify_github_signature(b"payload", "", "test_secret"),
            Err(VerificationError::MissingSignature)
        );
    }

    #[test]
    fn test_invalid_signature_format() {
        assert_eq!(
            verify_github_signature(b"payload", "sha1=abcdef", "test_secret"),
            Err(VerificationError::InvalidSignature)
        );
        assert_eq!(
            verify_github_signature(b"payload", "sha256=not-hex!", "test_secret"),
            Err(VerificationError::InvalidSignature)
        );
    }

    #[test]
    fn test_short_digest_is_mismatch() {
        assert_eq!(
            verify_github_signature(b"payload", "sha256=abcd", "test_secret"),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn test_verifier_disabled_without_secret() {
        let verifier = SignatureVerifier::new(None);
        assert!(!verifier.is_enabled());
        assert_eq!(
            verifier.check(b"anything", None),
            Ok(SignatureCheck::Disabled)
        );

        let empty = SignatureVerifier::new(Some(String::new()));
        assert_eq!(empty.check(b"anything", None), Ok(SignatureCheck::Disabled));
    }

    #[test]
    fn test_verifier_enabled_requires_header() {
        let verifier = SignatureVerifier::new(Some("s3cret".to_string()));
        assert_eq!(
            verifier.check(b"body", None),
            Err(VerificationError::MissingSignature)
        );

        let header = sign("s3cret", b"body");
        assert_eq!(
            verifier.check(b"body", Some(&header)),
            Ok(SignatureCheck::Verified)
        );
    }

    #[test]
    fn test_debug_output_never_contains_secret() {
        let verifier = SignatureVerifier::new(Some("hunter2-secret".to_string()));
        let rendered = format!("{:?}", verifier);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("enabled: true"));
    }

    #[test]
    fn test_errors_map_to_unauthorized() {
        for err in [
            VerificationError::MissingSignature,
            VerificationError::InvalidSignature,
            VerificationError::SignatureMismatch,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            let api: ApiError = err.into();
            assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        }
    }
}
