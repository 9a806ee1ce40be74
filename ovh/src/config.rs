//! Provider configuration: provider block, environment, then `ovh.conf`

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tfplug::types::{AttributePath, DynamicValue};

use crate::api::auth::oauth2_token_url;
use crate::api::{ApiError, Client, Credentials, RetryConfig};

/// Named API endpoints accepted in place of a URL
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("endpoint is required (set it in the provider block, OVH_ENDPOINT or ovh.conf)")]
    MissingEndpoint,

    #[error("unknown endpoint {0:?}: expected one of {known} or an http(s) URL", known = endpoint_names())]
    UnknownEndpoint(String),

    #[error("no credentials found: configure an application key, OAuth2 client or access token")]
    MissingCredentials,

    #[error("only one authentication method can be used, found {0}")]
    ConflictingCredentials(String),

    #[error("incomplete credentials: {0}")]
    IncompleteCredentials(String),

    #[error("OAuth2 authentication is not available on endpoint {0:?}")]
    OAuth2Unsupported(String),

    #[error("failed to read ovh.conf: {0}")]
    ConfFile(#[from] ::config::ConfigError),

    #[error("failed to build API client: {0}")]
    Client(ApiError),

    #[error("OVH client seems to be misconfigured: {0}")]
    Misconfigured(ApiError),
}

fn endpoint_names() -> String {
    ENDPOINTS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps an endpoint name to its URL; URLs pass through untouched
pub fn resolve_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    if let Some((_, url)) = ENDPOINTS.iter().find(|(name, _)| *name == endpoint) {
        return Ok(url.to_string());
    }
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }
    Err(ConfigError::UnknownEndpoint(endpoint.to_string()))
}

/// `ovh.conf` locations, later files taking precedence
pub fn default_conf_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/ovh.conf")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ovh.conf"));
    }
    paths.push(PathBuf::from("ovh.conf"));
    paths
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub application_key: Option<String>,
    pub application_secret: Option<String>,
    pub consumer_key: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub user_agent_extra: Option<String>,
}

impl Config {
    /// Reads the provider block; null and empty values count as unset
    pub fn from_provider_config(config: &DynamicValue) -> Self {
        let get = |name: &str| {
            config
                .get_string(&AttributePath::new(name))
                .ok()
                .filter(|value| !value.is_empty())
        };

        Self {
            endpoint: get("endpoint"),
            application_key: get("application_key"),
            application_secret: get("application_secret"),
            consumer_key: get("consumer_key"),
            client_id: get("client_id"),
            client_secret: get("client_secret"),
            access_token: get("access_token"),
            user_agent_extra: get("user_agent_extra"),
        }
    }

    /// Fills unset values from `OVH_*` environment variables
    pub fn merge_env(&mut self) {
        let fields: [(&mut Option<String>, &str); 8] = [
            (&mut self.endpoint, "OVH_ENDPOINT"),
            (&mut self.application_key, "OVH_APPLICATION_KEY"),
            (&mut self.application_secret, "OVH_APPLICATION_SECRET"),
            (&mut self.consumer_key, "OVH_CONSUMER_KEY"),
            (&mut self.client_id, "OVH_CLIENT_ID"),
            (&mut self.client_secret, "OVH_CLIENT_SECRET"),
            (&mut self.access_token, "OVH_ACCESS_TOKEN"),
            (&mut self.user_agent_extra, "OVH_USER_AGENT_EXTRA"),
        ];

        for (field, var) in fields {
            if field.is_none() {
                *field = std::env::var(var).ok().filter(|value| !value.is_empty());
            }
        }
    }

    /// Fills unset values from the INI files that exist among `paths`
    ///
    /// The endpoint comes from `[default]`, credentials from the section named
    /// after the endpoint.
    pub fn merge_conf_file(&mut self, paths: &[PathBuf]) -> Result<(), ConfigError> {
        let mut builder = ::config::Config::builder();
        for path in paths {
            builder = builder.add_source(
                ::config::File::from(path.as_path())
                    .format(::config::FileFormat::Ini)
                    .required(false),
            );
        }
        let sections: HashMap<String, HashMap<String, String>> =
            builder.build()?.try_deserialize()?;

        if self.endpoint.is_none() {
            self.endpoint = sections
                .get("default")
                .and_then(|section| section.get("endpoint"))
                .cloned();
        }

        let Some(section) = self
            .endpoint
            .as_ref()
            .and_then(|endpoint| sections.get(endpoint))
        else {
            return Ok(());
        };

        let fields: [(&mut Option<String>, &str); 6] = [
            (&mut self.application_key, "application_key"),
            (&mut self.application_secret, "application_secret"),
            (&mut self.consumer_key, "consumer_key"),
            (&mut self.client_id, "client_id"),
            (&mut self.client_secret, "client_secret"),
            (&mut self.access_token, "access_token"),
        ];
        for (field, key) in fields {
            if field.is_none() {
                *field = section.get(key).filter(|value| !value.is_empty()).cloned();
            }
        }

        Ok(())
    }

    /// Checks the endpoint and picks exactly one authentication method
    pub fn validate(&self) -> Result<(String, Credentials), ConfigError> {
        let endpoint = self.endpoint.as_deref().ok_or(ConfigError::MissingEndpoint)?;
        let url = resolve_endpoint(endpoint)?;

        let mut modes = Vec::new();
        if self.application_key.is_some()
            || self.application_secret.is_some()
            || self.consumer_key.is_some()
        {
            modes.push("application key");
        }
        if self.client_id.is_some() || self.client_secret.is_some() {
            modes.push("OAuth2 client");
        }
        if self.access_token.is_some() {
            modes.push("access token");
        }
        if modes.len() > 1 {
            return Err(ConfigError::ConflictingCredentials(modes.join(" and ")));
        }

        let credentials = match modes.first().copied() {
            None => return Err(ConfigError::MissingCredentials),
            Some("application key") => {
                match (&self.application_key, &self.application_secret) {
                    (Some(key), Some(secret)) => Credentials::ApplicationKey {
                        application_key: key.clone(),
                        application_secret: secret.clone(),
                        consumer_key: self.consumer_key.clone(),
                    },
                    (None, _) => {
                        return Err(ConfigError::IncompleteCredentials(
                            "application_key is required with application_secret".to_string(),
                        ))
                    }
                    (_, None) => {
                        return Err(ConfigError::IncompleteCredentials(
                            "application_secret is required with application_key".to_string(),
                        ))
                    }
                }
            }
            Some("OAuth2 client") => match (&self.client_id, &self.client_secret) {
                (Some(client_id), Some(client_secret)) => {
                    let token_url = oauth2_token_url(endpoint)
                        .ok_or_else(|| ConfigError::OAuth2Unsupported(endpoint.to_string()))?;
                    Credentials::OAuth2 {
                        client_id: client_id.clone(),
                        client_secret: client_secret.clone(),
                        token_url: token_url.to_string(),
                    }
                }
                _ => {
                    return Err(ConfigError::IncompleteCredentials(
                        "client_id and client_secret must be set together".to_string(),
                    ))
                }
            },
            Some(_) => Credentials::AccessToken(self.access_token.clone().unwrap_or_default()),
        };

        Ok((url, credentials))
    }

    /// Builds the client and proves the credentials with one authenticated call
    pub async fn load_and_validate(&self) -> Result<Client, ConfigError> {
        let (url, credentials) = self.validate()?;
        let mode = credentials.mode();
        let verify_key = matches!(
            &credentials,
            Credentials::ApplicationKey {
                consumer_key: Some(_),
                ..
            }
        );

        let client = Client::with_config(
            &url,
            credentials,
            RetryConfig::default(),
            self.user_agent_extra.as_deref(),
        )
        .map_err(ConfigError::Client)?;

        match mode {
            "application_key" if verify_key => {
                let credential = client
                    .current_credential()
                    .await
                    .map_err(ConfigError::Misconfigured)?;
                tracing::debug!(
                    "Using credential {} of application {}",
                    credential.credential_id,
                    credential.application_id
                );
            }
            "application_key" => {
                tracing::warn!("No consumer key configured, only unauthenticated calls will work");
            }
            _ => {
                let me = client.me().get().await.map_err(ConfigError::Misconfigured)?;
                tracing::debug!("Authenticated as {}", me.nichandle);
            }
        }

        tracing::info!("Configured OVH client for {} using {} authentication", url, mode);
        Ok(client)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tfplug::types::Dynamic;

    const OVH_VARS: &[&str] = &[
        "OVH_ENDPOINT",
        "OVH_APPLICATION_KEY",
        "OVH_APPLICATION_SECRET",
        "OVH_CONSUMER_KEY",
        "OVH_CLIENT_ID",
        "OVH_CLIENT_SECRET",
        "OVH_ACCESS_TOKEN",
        "OVH_USER_AGENT_EXTRA",
    ];

    fn clear_env() {
        for var in OVH_VARS {
            std::env::remove_var(var);
        }
    }

    fn write_conf(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.conf", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn key_config() -> Config {
        Config {
            endpoint: Some("ovh-eu".to_string()),
            application_key: Some("ak".to_string()),
            application_secret: Some("as".to_string()),
            consumer_key: Some("ck".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_named_and_url_endpoints() {
        assert_eq!(resolve_endpoint("ovh-ca").unwrap(), "https://ca.api.ovh.com/1.0");
        assert_eq!(
            resolve_endpoint("http://127.0.0.1:8080/1.0/").unwrap(),
            "http://127.0.0.1:8080/1.0"
        );
        assert!(matches!(
            resolve_endpoint("ovh-mars"),
            Err(ConfigError::UnknownEndpoint(_))
        ));
    }

    #[test]
    fn provider_block_ignores_null_and_empty() {
        let config = DynamicValue::new(Dynamic::Map(HashMap::from([
            ("endpoint".to_string(), Dynamic::String("ovh-eu".to_string())),
            ("application_key".to_string(), Dynamic::String(String::new())),
            ("consumer_key".to_string(), Dynamic::Null),
        ])));

        let config = Config::from_provider_config(&config);
        assert_eq!(config.endpoint.as_deref(), Some("ovh-eu"));
        assert!(config.application_key.is_none());
        assert!(config.consumer_key.is_none());
    }

    #[test]
    #[serial]
    fn environment_fills_only_unset_values() {
        clear_env();
        std::env::set_var("OVH_ENDPOINT", "ovh-us");
        std::env::set_var("OVH_ACCESS_TOKEN", "token-from-env");

        let mut config = Config {
            endpoint: Some("ovh-eu".to_string()),
            ..Default::default()
        };
        config.merge_env();

        assert_eq!(config.endpoint.as_deref(), Some("ovh-eu"));
        assert_eq!(config.access_token.as_deref(), Some("token-from-env"));
        clear_env();
    }

    #[test]
    fn conf_file_provides_endpoint_and_section_credentials() {
        let global = write_conf(
            "ovh-global",
            "[default]\nendpoint=ovh-eu\n\n[ovh-eu]\napplication_key=global-ak\napplication_secret=global-as\n",
        );
        let local = write_conf(
            "ovh-local",
            "[ovh-eu]\napplication_secret=local-as\nconsumer_key=local-ck\n",
        );

        let mut config = Config::default();
        config
            .merge_conf_file(&[global.clone(), PathBuf::from("/nonexistent/ovh.conf"), local.clone()])
            .unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("ovh-eu"));
        assert_eq!(config.application_key.as_deref(), Some("global-ak"));
        assert_eq!(config.application_secret.as_deref(), Some("local-as"));
        assert_eq!(config.consumer_key.as_deref(), Some("local-ck"));

        let _ = std::fs::remove_file(global);
        let _ = std::fs::remove_file(local);
    }

    #[test]
    fn conf_file_never_overrides_explicit_values() {
        let path = write_conf(
            "ovh-explicit",
            "[default]\nendpoint=ovh-ca\n\n[ovh-eu]\napplication_key=file-ak\n",
        );
        let mut config = Config {
            endpoint: Some("ovh-eu".to_string()),
            application_key: Some("block-ak".to_string()),
            ..Default::default()
        };
        config.merge_conf_file(&[path.clone()]).unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("ovh-eu"));
        assert_eq!(config.application_key.as_deref(), Some("block-ak"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn validate_builds_application_key_credentials() {
        let (url, credentials) = key_config().validate().unwrap();
        assert_eq!(url, "https://eu.api.ovh.com/1.0");
        assert_eq!(credentials.mode(), "application_key");
    }

    #[test]
    fn validate_rejects_mixed_and_partial_credentials() {
        let mut mixed = key_config();
        mixed.access_token = Some("token".to_string());
        assert!(matches!(
            mixed.validate(),
            Err(ConfigError::ConflictingCredentials(_))
        ));

        let partial = Config {
            endpoint: Some("ovh-eu".to_string()),
            application_key: Some("ak".to_string()),
            ..Default::default()
        };
        let err = partial.validate().unwrap_err();
        assert!(err.to_string().contains("application_secret is required"));

        let missing = Config {
            endpoint: Some("ovh-eu".to_string()),
            ..Default::default()
        };
        assert!(matches!(missing.validate(), Err(ConfigError::MissingCredentials)));
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::MissingEndpoint)
        ));
    }

    #[test]
    fn oauth2_needs_a_supported_endpoint() {
        let config = Config {
            endpoint: Some("kimsufi-eu".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OAuth2Unsupported(_))
        ));

        let config = Config {
            endpoint: Some("ovh-ca".to_string()),
            ..config
        };
        assert_eq!(config.validate().unwrap().1.mode(), "oauth2");
    }

    #[tokio::test]
    async fn load_and_validate_verifies_credentials() {
        let mut server = mockito::Server::new_async().await;
        let _time = server
            .mock("GET", "/auth/time")
            .with_body(chrono::Utc::now().timestamp().to_string())
            .create_async()
            .await;
        let credential = server
            .mock("GET", "/auth/currentCredential")
            .match_header("X-Ovh-Consumer", "ck")
            .with_body(
                r#"{"credentialId":7,"applicationId":42,"status":"validated","expiration":null}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let config = Config {
            endpoint: Some(server.url()),
            ..key_config()
        };
        let client = config.load_and_validate().await;

        assert!(client.is_ok());
        credential.assert_async().await;
    }

    #[tokio::test]
    async fn load_and_validate_reports_misconfiguration() {
        let mut server = mockito::Server::new_async().await;
        let _me = server
            .mock("GET", "/me")
            .with_status(403)
            .with_body(r#"{"class":"Client::Forbidden","message":"This call has not been granted"}"#)
            .create_async()
            .await;

        let config = Config {
            endpoint: Some(server.url()),
            access_token: Some("token".to_string()),
            ..Default::default()
        };
        let err = config.load_and_validate().await.err().unwrap();

        assert!(err.to_string().starts_with("OVH client seems to be misconfigured"));
        assert!(err.to_string().contains("This call has not been granted"));
    }
}
