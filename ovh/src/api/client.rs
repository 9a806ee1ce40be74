use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

use super::auth::{
    self, CachedToken, Credentials, TokenResponse, HEADER_APPLICATION, HEADER_CONSUMER,
    HEADER_QUERY_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
use super::error::ApiError;

/// OVHcloud API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    retry_config: RetryConfig,
    time_delta: OnceCell<i64>,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_config(endpoint, credentials, RetryConfig::default(), None)
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        credentials: Credentials,
        retry_config: RetryConfig,
        user_agent_extra: Option<&str>,
    ) -> Result<Self, ApiError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ApiError::InvalidConfig(format!(
                "endpoint {} is not an HTTP(S) URL",
                endpoint
            )));
        }

        let mut user_agent = format!("terraform-provider-ovh/{}", env!("CARGO_PKG_VERSION"));
        if let Some(extra) = user_agent_extra.filter(|extra| !extra.is_empty()) {
            user_agent = format!("{} {}", user_agent, extra);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                credentials,
                retry_config,
                time_delta: OnceCell::new(),
                token: Mutex::new(None),
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::GET, path, String::new())
            .await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.execute_with_retry(Method::POST, path, body).await
    }

    /// Execute a POST request that carries no body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::POST, path, String::new())
            .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.execute_with_retry(Method::PUT, path, body).await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::DELETE, path, String::new())
            .await
    }

    /// Account API operations
    pub fn me(&self) -> crate::api::me::MeApi<'_> {
        crate::api::me::MeApi::new(self)
    }

    /// DNS zone API operations
    pub fn domain(&self) -> crate::api::domain::DomainApi<'_> {
        crate::api::domain::DomainApi::new(self)
    }

    /// Public Cloud project API operations
    pub fn cloud_project(&self, service_name: &str) -> crate::api::cloud_project::CloudProjectApi<'_> {
        crate::api::cloud_project::CloudProjectApi::new(self, service_name)
    }

    /// IP Load Balancer API operations
    pub fn ip_loadbalancing(
        &self,
        service_name: &str,
    ) -> crate::api::iploadbalancing::IpLoadbalancingApi<'_> {
        crate::api::iploadbalancing::IpLoadbalancingApi::new(self, service_name)
    }

    /// IAM v2 API operations
    pub fn iam(&self) -> crate::api::iam::IamApi<'_> {
        crate::api::iam::IamApi::new(self)
    }

    /// Dedicated server API operations
    pub fn dedicated_server(&self) -> crate::api::dedicated_server::DedicatedServerApi<'_> {
        crate::api::dedicated_server::DedicatedServerApi::new(self)
    }

    /// vRack API operations
    pub fn vrack(&self, service_name: &str) -> crate::api::vrack::VrackApi<'_> {
        crate::api::vrack::VrackApi::new(self, service_name)
    }

    /// Verifies application key credentials
    pub async fn current_credential(&self) -> Result<auth::CurrentCredential, ApiError> {
        self.get("/auth/currentCredential").await
    }

    /// `/v1` and `/v2` paths live beside the `/1.0` root
    fn url(&self, path: &str) -> String {
        if path.starts_with("/v1/") || path.starts_with("/v2/") {
            format!("{}{}", self.inner.endpoint.trim_end_matches("/1.0"), path)
        } else {
            format!("{}{}", self.inner.endpoint, path)
        }
    }

    /// Difference between the API server clock and ours, fetched once
    pub async fn time_delta(&self) -> Result<i64, ApiError> {
        self.inner
            .time_delta
            .get_or_try_init(|| async {
                let url = self.url("/auth/time");
                tracing::debug!("GET request to: {}", url);

                let response = self.inner.http_client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(self.error_from_response(response).await);
                }

                let text = response.text().await?;
                let server_time = text.trim().parse::<i64>().map_err(|e| {
                    ApiError::ParseError(format!("invalid server time {:?}: {}", text, e))
                })?;
                Ok::<i64, ApiError>(server_time - chrono::Utc::now().timestamp())
            })
            .await
            .copied()
    }

    async fn bearer_token(&self) -> Result<String, ApiError> {
        let (client_id, client_secret, token_url) = match &self.inner.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::OAuth2 {
                client_id,
                client_secret,
                token_url,
            } => (client_id, client_secret, token_url),
            Credentials::ApplicationKey { .. } => {
                return Err(ApiError::InvalidConfig(
                    "application key credentials do not use bearer tokens".to_string(),
                ))
            }
        };

        let mut cached = self.inner.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_valid()) {
            return Ok(token.token.clone());
        }

        tracing::debug!("Requesting OAuth2 token from {}", token_url);
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", client_id)
            .append_pair("client_secret", client_secret)
            .append_pair("scope", "all")
            .finish();

        let response = self
            .inner
            .http_client
            .post(token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::AuthError(format!(
                "failed to obtain OAuth2 token (HTTP {}): {}",
                status.as_u16(),
                text
            )));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse OAuth2 token: {}", e)))?;
        let token = CachedToken::new(token);
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn build_request(
        &self,
        method: &Method,
        url: &str,
        body: &str,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut request = self
            .inner
            .http_client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");

        if !body.is_empty() {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        match &self.inner.credentials {
            Credentials::ApplicationKey {
                application_key,
                application_secret,
                consumer_key,
            } => {
                request = request.header(HEADER_APPLICATION, application_key);
                if let Some(consumer_key) = consumer_key {
                    let timestamp = chrono::Utc::now().timestamp() + self.time_delta().await?;
                    request = request
                        .header(HEADER_CONSUMER, consumer_key)
                        .header(HEADER_TIMESTAMP, timestamp.to_string())
                        .header(
                            HEADER_SIGNATURE,
                            auth::signature(
                                application_secret,
                                consumer_key,
                                method.as_str(),
                                url,
                                body,
                                timestamp,
                            ),
                        );
                }
            }
            Credentials::OAuth2 { .. } | Credentials::AccessToken(_) => {
                let token = self.bearer_token().await?;
                request = request.header(AUTHORIZATION, format!("Bearer {}", token));
            }
        }

        Ok(request)
    }

    /// Execute request with retry logic
    ///
    /// Rate limiting and connection failures are retried for every method,
    /// server errors and timeouts only for GET.
    async fn execute_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: String,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let idempotent = method == Method::GET;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            tracing::debug!("{} request to: {}", method, url);
            let request = self.build_request(&method, &url, &body).await?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() && idempotent {
                        last_error = Some(self.error_from_response(response).await);
                    } else {
                        return Err(self.error_from_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() && idempotent {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::RequestError(e));
                    } else if e.is_timeout() {
                        return Err(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", redact_body(&text));

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {} ({} bytes)", e, text.len());
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Decode the `{"class", "message"}` error body
    async fn error_from_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let query_id = response
            .headers()
            .get(HEADER_QUERY_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (class, message) = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => (
                body.class.unwrap_or_default(),
                body.message.unwrap_or_else(|| text.clone()),
            ),
            Err(_) => (String::new(), text),
        };

        if status == 401 {
            return ApiError::AuthError(message);
        }

        ApiError::ApiError {
            status,
            class,
            message,
            query_id,
        }
    }
}

/// Response fields that carry credentials or cluster access
fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password")
        || key.contains("secret")
        || key.contains("token")
        || key == "consumerkey"
        || key == "content"
}

fn redact_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive_key(key) && !field.is_null() {
                    *field = serde_json::Value::String("<redacted>".to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

/// Body as it may appear in logs; non-JSON bodies only show their size
fn redact_body(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes>", text.len()),
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body)
        .map_err(|e| ApiError::ParseError(format!("Failed to encode request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn fast_retries() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        }
    }

    fn token_client(url: &str) -> Client {
        Client::with_config(
            &format!("{}/1.0", url),
            Credentials::AccessToken("token".to_string()),
            fast_retries(),
            None,
        )
        .unwrap()
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn redaction_hides_nested_secrets() {
        let body = r#"{"id":"u-1","password":"Sup3rS3cret!","nested":[{"accessToken":"t0ken-value"}],"content":"apiVersion: v1"}"#;
        let redacted = redact_body(body);

        assert!(redacted.contains("u-1"));
        assert!(!redacted.contains("Sup3rS3cret!"));
        assert!(!redacted.contains("t0ken-value"));
        assert!(!redacted.contains("apiVersion"));
        assert_eq!(redact_body("not json at all"), "<15 bytes>");
    }

    #[tokio::test]
    async fn response_logging_leaves_out_passwords() {
        let mut server = Server::new_async().await;
        let _user = server
            .mock("POST", "/1.0/cloud/project/abc123/user")
            .with_body(r#"{"id":42,"username":"user-abc","password":"Sup3rS3cret!","status":"creating"}"#)
            .create_async()
            .await;
        let _garbled = server
            .mock("GET", "/1.0/me")
            .with_body(r#"{"password":"Sup3rS3cret!""#)
            .create_async()
            .await;

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = token_client(&server.url());
        let user: serde_json::Value = client
            .post("/cloud/project/abc123/user", &json!({"description": "ci"}))
            .await
            .unwrap();
        assert_eq!(user["password"], "Sup3rS3cret!");
        let garbled = client.get::<serde_json::Value>("/me").await;
        assert!(matches!(garbled, Err(ApiError::ParseError(_))));

        let output = logs.text();
        assert!(output.contains("API response body"), "{}", output);
        assert!(output.contains("<redacted>"), "{}", output);
        assert!(!output.contains("Sup3rS3cret!"), "{}", output);
    }

    #[tokio::test]
    async fn signs_requests_with_application_key() {
        let mut server = Server::new_async().await;
        let now = chrono::Utc::now().timestamp();
        let time_mock = server
            .mock("GET", "/1.0/auth/time")
            .with_body(now.to_string())
            .expect(1)
            .create_async()
            .await;
        let me_mock = server
            .mock("GET", "/1.0/me")
            .match_header("x-ovh-application", "ak")
            .match_header("x-ovh-consumer", "ck")
            .match_header("x-ovh-timestamp", Matcher::Regex(r"^\d+$".to_string()))
            .match_header(
                "x-ovh-signature",
                Matcher::Regex(r"^\$1\$[0-9a-f]{40}$".to_string()),
            )
            .with_body(r#"{"nichandle":"xx1234-ovh"}"#)
            .expect(2)
            .create_async()
            .await;

        let client = Client::new(
            &format!("{}/1.0", server.url()),
            Credentials::ApplicationKey {
                application_key: "ak".to_string(),
                application_secret: "as".to_string(),
                consumer_key: Some("ck".to_string()),
            },
        )
        .unwrap();

        for _ in 0..2 {
            let me: serde_json::Value = client.get("/me").await.unwrap();
            assert_eq!(me["nichandle"], "xx1234-ovh");
        }

        time_mock.assert_async().await;
        me_mock.assert_async().await;
    }

    #[tokio::test]
    async fn decodes_error_body_and_query_id() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/1.0/me/sshKey/missing")
            .with_status(404)
            .with_header("X-Ovh-QueryID", "EU.ext-1.abc")
            .with_body(r#"{"class":"Client::NotFound","message":"The requested object (keyName = missing) does not exist"}"#)
            .create_async()
            .await;

        let client = token_client(&server.url());
        let err = client
            .get::<serde_json::Value>("/me/sshKey/missing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match &err {
            ApiError::ApiError {
                class, query_id, ..
            } => {
                assert_eq!(class, "Client::NotFound");
                assert_eq!(query_id, "EU.ext-1.abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn retries_server_errors_for_get() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/1.0/me")
            .with_status(503)
            .with_body(r#"{"message":"maintenance"}"#)
            .expect(3)
            .create_async()
            .await;

        let client = token_client(&server.url());
        let err = client.get::<serde_json::Value>("/me").await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn does_not_retry_server_errors_for_post() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/1.0/me/sshKey")
            .with_status(500)
            .with_body(r#"{"message":"boom"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = token_client(&server.url());
        let result = client
            .post::<(), _>("/me/sshKey", &json!({"keyName": "k", "key": "ssh-ed25519 AAAA"}))
            .await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_rate_limited_requests() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("PUT", "/1.0/me/sshKey/k")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = token_client(&server.url());
        let err = client
            .put::<(), _>("/me/sshKey/k", &json!({"default": true}))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn versioned_paths_skip_the_legacy_root() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/iam/policy")
            .match_header("authorization", "Bearer token")
            .with_body("[]")
            .create_async()
            .await;

        let client = token_client(&server.url());
        let policies: Vec<serde_json::Value> = client.get("/v2/iam/policy").await.unwrap();

        assert!(policies.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_and_null_bodies_decode_as_unit_or_none() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/1.0/me/sshKey/k")
            .with_body("")
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/1.0/domain/zone/example.com/refresh")
            .with_body("null")
            .create_async()
            .await;

        let client = token_client(&server.url());
        client.delete::<()>("/me/sshKey/k").await.unwrap();
        let refreshed: Option<serde_json::Value> = client
            .post_empty("/domain/zone/example.com/refresh")
            .await
            .unwrap();
        assert!(refreshed.is_none());
    }

    #[tokio::test]
    async fn oauth2_token_is_fetched_once() {
        let mut server = Server::new_async().await;
        let token_mock = server
            .mock("POST", "/auth/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "id".into()),
                Matcher::UrlEncoded("scope".into(), "all".into()),
            ]))
            .with_body(r#"{"access_token":"fresh","token_type":"Bearer","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;
        let me_mock = server
            .mock("GET", "/1.0/me")
            .match_header("authorization", "Bearer fresh")
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let client = Client::with_config(
            &format!("{}/1.0", server.url()),
            Credentials::OAuth2 {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                token_url: format!("{}/auth/oauth2/token", server.url()),
            },
            fast_retries(),
            None,
        )
        .unwrap();

        let _: serde_json::Value = client.get("/me").await.unwrap();
        let _: serde_json::Value = client.get("/me").await.unwrap();

        token_mock.assert_async().await;
        me_mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/1.0/me")
            .with_status(401)
            .with_body(r#"{"class":"Client::Unauthorized","message":"This credential is not valid"}"#)
            .create_async()
            .await;

        let client = token_client(&server.url());
        let err = client.get::<serde_json::Value>("/me").await.unwrap_err();

        match err {
            ApiError::AuthError(message) => assert_eq!(message, "This credential is not valid"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let result = Client::new("ovh-eu", Credentials::AccessToken("t".to_string()));
        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }
}
