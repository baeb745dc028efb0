//! SSL certificates attached to a stack.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an SSL certificate is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateType {
    /// Issued and renewed automatically via Let's Encrypt.
    LetsEncrypt,
    /// Certificate and key supplied by the user.
    Manual,
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LetsEncrypt => "lets_encrypt",
            Self::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

/// An SSL certificate as stored on the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslCertificate {
    /// Unique certificate identifier. Absent on creation requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Provisioning type.
    #[serde(rename = "type")]
    pub cert_type: CertificateType,
    /// Comma separated domain names the certificate covers.
    #[serde(default)]
    pub server_names: String,
    /// PEM certificate body. Required for manual certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// PEM private key. Required for manual certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// PEM intermediate chain, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_certificate: Option<String>,
    /// Server-side status text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Expiry time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SslCertificate {
    /// Builds a Let's Encrypt certificate request for the given domains.
    #[must_use]
    pub fn lets_encrypt(domains: impl Into<String>) -> Self {
        Self {
            uuid: None,
            cert_type: CertificateType::LetsEncrypt,
            server_names: domains.into(),
            certificate: None,
            key: None,
            intermediate_certificate: None,
            status: None,
            expires_at: None,
        }
    }

    /// Builds a manual certificate request from PEM contents.
    #[must_use]
    pub fn manual(
        domains: impl Into<String>,
        certificate: String,
        key: String,
        intermediate: Option<String>,
    ) -> Self {
        Self {
            uuid: None,
            cert_type: CertificateType::Manual,
            server_names: domains.into(),
            certificate: Some(certificate),
            key: Some(key),
            intermediate_certificate: intermediate,
            status: None,
            expires_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&CertificateType::LetsEncrypt).expect("serializes"),
            "\"lets_encrypt\""
        );
        assert_eq!(CertificateType::Manual.to_string(), "manual");
    }

    #[test]
    fn lets_encrypt_request_omits_pem_fields() {
        let cert = SslCertificate::lets_encrypt("web.test,api.test");
        let json = serde_json::to_value(&cert).expect("serializes");
        assert_eq!(json["type"], "lets_encrypt");
        assert_eq!(json["server_names"], "web.test,api.test");
        assert!(json.get("certificate").is_none());
        assert!(json.get("uuid").is_none());
    }

    #[test]
    fn manual_request_carries_pem_fields() {
        let cert = SslCertificate::manual("web.test", "CERT".into(), "KEY".into(), None);
        let json = serde_json::to_value(&cert).expect("serializes");
        assert_eq!(json["type"], "manual");
        assert_eq!(json["certificate"], "CERT");
        assert_eq!(json["key"], "KEY");
        assert!(json.get("intermediate_certificate").is_none());
    }
}
