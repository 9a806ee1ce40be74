//! Authentication material for the OVHcloud API
//!
//! Three modes are supported: application key signing, OAuth2 client
//! credentials and a pre-issued bearer access token.

use ring::digest;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Header names used by application key signing
pub const HEADER_APPLICATION: &str = "X-Ovh-Application";
pub const HEADER_CONSUMER: &str = "X-Ovh-Consumer";
pub const HEADER_TIMESTAMP: &str = "X-Ovh-Timestamp";
pub const HEADER_SIGNATURE: &str = "X-Ovh-Signature";
pub const HEADER_QUERY_ID: &str = "X-Ovh-QueryID";

#[derive(Clone)]
pub enum Credentials {
    ApplicationKey {
        application_key: String,
        application_secret: String,
        consumer_key: Option<String>,
    },
    OAuth2 {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
    AccessToken(String),
}

impl Credentials {
    /// Short name of the mode, safe to log
    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::ApplicationKey { .. } => "application_key",
            Credentials::OAuth2 { .. } => "oauth2",
            Credentials::AccessToken(_) => "access_token",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApplicationKey {
                application_key,
                consumer_key,
                ..
            } => f
                .debug_struct("ApplicationKey")
                .field("application_key", application_key)
                .field("application_secret", &"<redacted>")
                .field("consumer_key", &consumer_key.as_ref().map(|_| "<redacted>"))
                .finish(),
            Credentials::OAuth2 {
                client_id,
                token_url,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("token_url", token_url)
                .finish(),
            Credentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// `$1$` followed by the SHA1 hex digest of
/// `secret+consumer+METHOD+url+body+timestamp`
pub fn signature(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let payload = format!(
        "{}+{}+{}+{}+{}+{}",
        application_secret, consumer_key, method, url, body, timestamp
    );
    let hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, payload.as_bytes());
    format!("$1${}", hex::encode(hash.as_ref()))
}

/// Token endpoint of the OAuth2 authorization server for an endpoint name
pub fn oauth2_token_url(endpoint_name: &str) -> Option<&'static str> {
    match endpoint_name {
        "ovh-eu" => Some("https://www.ovh.com/auth/oauth2/token"),
        "ovh-ca" => Some("https://ca.ovh.com/auth/oauth2/token"),
        "ovh-us" => Some("https://us.ovhcloud.com/auth/oauth2/token"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

pub(crate) struct CachedToken {
    pub token: String,
    pub expires_at: Instant,
}

impl CachedToken {
    pub fn new(response: TokenResponse) -> Self {
        // Renew slightly early so a token never expires mid-request
        let lifetime = response.expires_in.unwrap_or(3600).saturating_sub(10);
        Self {
            token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        }
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Response of GET /auth/currentCredential
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentCredential {
    pub credential_id: i64,
    pub application_id: i64,
    pub status: String,
    #[serde(default)]
    pub expiration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_reference_digest() {
        let signed = signature(
            "EgWIz07P0HYwtQDs",
            "MtSwSrPpNjqfuSXV1sknBz47gSqp2N3",
            "GET",
            "https://eu.api.ovh.com/1.0/me",
            "",
            1366560945,
        );
        assert_eq!(signed, "$1$462b97d1b2fdfceec8c25eab68c478533583e17e");
    }

    #[test]
    fn signature_covers_body() {
        let signed = signature(
            "secret",
            "ck",
            "POST",
            "https://eu.api.ovh.com/1.0/me/sshKey",
            r#"{"keyName":"laptop"}"#,
            1700000000,
        );
        assert_eq!(signed, "$1$aff416ca6270ed5afe0f1b502cb7f834bc4ec4c2");
    }

    #[test]
    fn oauth2_is_limited_to_main_regions() {
        assert!(oauth2_token_url("ovh-eu").is_some());
        assert!(oauth2_token_url("ovh-us").is_some());
        assert!(oauth2_token_url("kimsufi-eu").is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials::ApplicationKey {
            application_key: "ak".to_string(),
            application_secret: "very-secret".to_string(),
            consumer_key: Some("consumer".to_string()),
        };
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("ak"));
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("consumer\""));
    }
}
