//! HTTP Signature authentication for the Visa Acceptance (CyberSource) REST API.
//!
//! Each request is signed over `host date request-target [digest] v-c-merchant-id`
//! with HMAC-SHA256 keyed by the base64-decoded shared secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("secret key is not valid base64")]
    InvalidSecret,
    #[error("secret key is empty")]
    EmptySecret,
}

/// Header values to attach to one outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeaders {
    pub host: String,
    pub date: String,
    pub digest: Option<String>,
    pub merchant_id: String,
    pub signature: String,
}

#[derive(Clone)]
pub struct RequestSigner {
    merchant_id: String,
    api_key_id: String,
    /// Keyed once; cloned fresh for every request.
    keyed_mac: HmacSha256,
}

impl RequestSigner {
    pub fn new(merchant_id: &str, api_key_id: &str, secret_b64: &str) -> Result<Self, SigningError> {
        let trimmed = secret_b64.trim();
        if trimmed.is_empty() {
            return Err(SigningError::EmptySecret);
        }
        let key = STANDARD.decode(trimmed).map_err(|_| SigningError::InvalidSecret)?;
        if key.is_empty() {
            return Err(SigningError::EmptySecret);
        }
        let keyed_mac =
            HmacSha256::new_from_slice(&key).map_err(|_| SigningError::InvalidSecret)?;

        Ok(Self {
            merchant_id: merchant_id.to_string(),
            api_key_id: api_key_id.to_string(),
            keyed_mac,
        })
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// Signs a request. `body` is `Some` for requests that carry a payload,
    /// which adds the `digest` header to the signed set.
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        path_and_query: &str,
        body: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> SignedHeaders {
        let date = http_date(now);
        let digest = body.map(body_digest);
        let request_target = format!("{} {}", method.to_ascii_lowercase(), path_and_query);

        let mut header_names = vec!["host", "date", "request-target"];
        let mut lines = vec![
            format!("host: {host}"),
            format!("date: {date}"),
            format!("request-target: {request_target}"),
        ];
        if let Some(digest) = &digest {
            header_names.push("digest");
            lines.push(format!("digest: {digest}"));
        }
        header_names.push("v-c-merchant-id");
        lines.push(format!("v-c-merchant-id: {}", self.merchant_id));

        let signature = STANDARD.encode(self.mac(lines.join("\n").as_bytes()));
        let signature = format!(
            "keyid=\"{}\", algorithm=\"HmacSHA256\", headers=\"{}\", signature=\"{}\"",
            self.api_key_id,
            header_names.join(" "),
            signature
        );

        SignedHeaders {
            host: host.to_string(),
            date,
            digest,
            merchant_id: self.merchant_id.clone(),
            signature,
        }
    }

    fn mac(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.keyed_mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("merchant_id", &self.merchant_id)
            .field("api_key_id", &self.api_key_id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

pub fn body_digest(body: &[u8]) -> String {
    format!("SHA-256={}", STANDARD.encode(Sha256::digest(body)))
}

/// RFC 7231 IMF-fixdate, always in GMT.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{body_digest, http_date, RequestSigner, SigningError};

    const SECRET: &str = "cGF5aHViLXRlc3Qtc2VjcmV0LWtleS1tYXRlcmlhbCE=";
    const HOST: &str = "apitest.cybersource.com";

    fn signer() -> RequestSigner {
        RequestSigner::new("merchant_1", "key_1", SECRET).expect("valid secret")
    }

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).single().expect("valid time")
    }

    #[test]
    fn date_uses_imf_fixdate() {
        assert_eq!(http_date(fixed_now()), "Tue, 05 Mar 2024 09:30:00 GMT");
    }

    #[test]
    fn digest_of_empty_body_is_well_known() {
        assert_eq!(body_digest(b""), "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn post_signature_covers_digest() {
        let headers =
            signer().sign("POST", HOST, "/invoicing/v2/invoices", Some(br#"{"amount":10}"#), fixed_now());

        assert_eq!(
            headers.digest.as_deref(),
            Some("SHA-256=qLiLgv6QoWBI64hR/jgkBTlc05Xa+qfKm+kOwA+Cpys=")
        );
        assert_eq!(
            headers.signature,
            "keyid=\"key_1\", algorithm=\"HmacSHA256\", \
             headers=\"host date request-target digest v-c-merchant-id\", \
             signature=\"IkT6WldxNBBPiP7v5dy95ovLYQCqROMDR5AIIJhtj5o=\""
        );
    }

    #[test]
    fn get_signature_omits_digest() {
        let headers = signer().sign(
            "GET",
            HOST,
            "/invoicing/v2/invoices?offset=0&limit=10",
            None,
            fixed_now(),
        );

        assert!(headers.digest.is_none());
        assert!(headers.signature.contains("headers=\"host date request-target v-c-merchant-id\""));
        assert!(headers.signature.ends_with("signature=\"uphpQXyOB1psHv+L89PjndQPHXvu6h+tX1NqYgq7A3M=\""));
    }

    #[test]
    fn repeated_signing_is_stable() {
        let signer = signer();
        let sign = || signer.sign("GET", HOST, "/ipl/v2/payment-links", None, fixed_now());

        let first = sign();
        assert_eq!(first, sign());
        assert!(!first.signature.ends_with("signature=\"\""));
    }

    #[test]
    fn rejects_non_base64_and_empty_secrets() {
        assert_eq!(
            RequestSigner::new("m", "k", "not base64!").expect_err("invalid"),
            SigningError::InvalidSecret
        );
        assert_eq!(RequestSigner::new("m", "k", "  ").expect_err("empty"), SigningError::EmptySecret);
    }

    #[test]
    fn debug_redacts_key_material() {
        let rendered = format!("{:?}", signer());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(SECRET));
    }
}
