use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::api::PagerDutyApi;
use crate::error::ApiError;
use crate::types::{
    Addon, EscalationPolicy, Extension, Integration, MaintenanceWindow, Member, Service, Team,
    User, Vendor,
};

/// Default base URL of the REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.pagerduty.com";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Media type selecting version 2 of the REST API.
const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

/// Page size used when walking list endpoints.
const PAGE_LIMIT: usize = 100;

/// Builder for configuring a [`PagerDutyClient`].
pub struct PagerDutyClientBuilder {
    token: SecretString,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    client: Option<Client>,
}

impl PagerDutyClientBuilder {
    /// Create a new builder with the given API token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("pagerform/{}", env!("CARGO_PKG_VERSION")),
            client: None,
        }
    }

    /// Override the API base URL (useful for testing against a mock server).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `User-Agent` header sent with every request.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a custom reqwest Client.
    ///
    /// The timeout and user agent configured on this builder are ignored.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PagerDutyClient, ApiError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(ApiError::Configuration(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }

        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .user_agent(self.user_agent)
                .build()
                .map_err(|e| ApiError::Configuration(e.to_string()))?,
        };

        Ok(PagerDutyClient {
            client,
            base_url,
            token: self.token,
        })
    }
}

/// HTTP client for the `PagerDuty` REST API v2.
pub struct PagerDutyClient {
    client: Client,
    base_url: Url,
    token: SecretString,
}

impl fmt::Debug for PagerDutyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagerDutyClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PagerDutyClient {
    /// Create a builder for the given API token.
    pub fn builder(token: impl Into<String>) -> PagerDutyClientBuilder {
        PagerDutyClientBuilder::new(token)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(
                AUTHORIZATION,
                format!("Token token={}", self.token.expose_secret()),
            )
            .header(ACCEPT, ACCEPT_V2)
    }

    /// Send a request, turning non-success responses into [`ApiError::Api`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("PagerDuty API rate limit hit");
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_body(status.as_u16(), &body))
    }

    /// Decode `{"<key>": {...}}` into `T`.
    async fn decode<T: DeserializeOwned>(response: Response, key: &str) -> Result<T, ApiError> {
        let mut body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;

        let inner = body
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or_else(|| {
                ApiError::Deserialization(format!("response is missing the '{key}' field"))
            })?;

        serde_json::from_value(inner).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Wrap a request body as `{"<key>": body}`.
    fn envelope<B: Serialize>(key: &str, body: &B) -> Result<serde_json::Value, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut map = serde_json::Map::new();
        map.insert(key.to_owned(), value);
        Ok(serde_json::Value::Object(map))
    }

    async fn get_one<T: DeserializeOwned>(&self, segments: &[&str], key: &str) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::GET, self.url(segments)))
            .await?;
        Self::decode(response, key).await
    }

    async fn write_one<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        key: &str,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let payload = Self::envelope(key, body)?;
        let response = self
            .send(self.request(method, self.url(segments)).json(&payload))
            .await?;
        Self::decode(response, key).await
    }

    async fn delete_one(&self, segments: &[&str]) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, self.url(segments)))
            .await?;
        Ok(())
    }

    /// Walk every page of an offset-paginated list endpoint.
    async fn list_all<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        key: &str,
        query: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut url = self.url(segments);
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("limit", &PAGE_LIMIT.to_string())
                    .append_pair("offset", &offset.to_string());
                if !query.is_empty() {
                    pairs.append_pair("query", query);
                }
            }

            let response = self.send(self.request(Method::GET, url)).await?;
            let mut body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ApiError::Deserialization(e.to_string()))?;

            let more = body
                .get("more")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            let page: Vec<T> = match body.get_mut(key).map(serde_json::Value::take) {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| ApiError::Deserialization(e.to_string()))?,
                None => Vec::new(),
            };

            let fetched = page.len();
            debug!(key, offset, fetched, more, "fetched list page");
            items.extend(page);
            offset += fetched;

            if !more || fetched == 0 {
                break;
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl PagerDutyApi for PagerDutyClient {
    #[instrument(skip(self))]
    async fn list_abilities(&self) -> Result<Vec<String>, ApiError> {
        self.get_one(&["abilities"], "abilities").await
    }

    #[instrument(skip(self))]
    async fn list_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        self.list_all(&["users"], "users", query).await
    }

    #[instrument(skip(self, user), fields(name = %user.name))]
    async fn create_user(&self, user: &User) -> Result<User, ApiError> {
        self.write_one(Method::POST, &["users"], "user", user).await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.get_one(&["users", id], "user").await
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, id: &str, user: &User) -> Result<User, ApiError> {
        self.write_one(Method::PUT, &["users", id], "user", user)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.delete_one(&["users", id]).await
    }

    #[instrument(skip(self))]
    async fn list_teams(&self, query: &str) -> Result<Vec<Team>, ApiError> {
        self.list_all(&["teams"], "teams", query).await
    }

    #[instrument(skip(self))]
    async fn get_team(&self, id: &str) -> Result<Team, ApiError> {
        self.get_one(&["teams", id], "team").await
    }

    #[instrument(skip(self))]
    async fn list_members(&self, team_id: &str) -> Result<Vec<Member>, ApiError> {
        self.list_all(&["teams", team_id, "members"], "members", "")
            .await
    }

    #[instrument(skip(self))]
    async fn add_user_to_team(
        &self,
        team_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(&["teams", team_id, "users", user_id]);
        self.send(
            self.request(Method::PUT, url)
                .json(&serde_json::json!({ "role": role })),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_user_from_team(&self, team_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.delete_one(&["teams", team_id, "users", user_id])
            .await
    }

    #[instrument(skip(self))]
    async fn list_escalation_policies(
        &self,
        query: &str,
    ) -> Result<Vec<EscalationPolicy>, ApiError> {
        self.list_all(&["escalation_policies"], "escalation_policies", query)
            .await
    }

    #[instrument(skip(self, policy), fields(name = %policy.name))]
    async fn create_escalation_policy(
        &self,
        policy: &EscalationPolicy,
    ) -> Result<EscalationPolicy, ApiError> {
        self.write_one(
            Method::POST,
            &["escalation_policies"],
            "escalation_policy",
            policy,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_escalation_policy(&self, id: &str) -> Result<EscalationPolicy, ApiError> {
        self.get_one(&["escalation_policies", id], "escalation_policy")
            .await
    }

    #[instrument(skip(self, policy))]
    async fn update_escalation_policy(
        &self,
        id: &str,
        policy: &EscalationPolicy,
    ) -> Result<EscalationPolicy, ApiError> {
        self.write_one(
            Method::PUT,
            &["escalation_policies", id],
            "escalation_policy",
            policy,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_escalation_policy(&self, id: &str) -> Result<(), ApiError> {
        self.delete_one(&["escalation_policies", id]).await
    }

    #[instrument(skip(self, extension), fields(name = %extension.name))]
    async fn create_extension(&self, extension: &Extension) -> Result<Extension, ApiError> {
        self.write_one(Method::POST, &["extensions"], "extension", extension)
            .await
    }

    #[instrument(skip(self))]
    async fn get_extension(&self, id: &str) -> Result<Extension, ApiError> {
        self.get_one(&["extensions", id], "extension").await
    }

    #[instrument(skip(self, extension))]
    async fn update_extension(
        &self,
        id: &str,
        extension: &Extension,
    ) -> Result<Extension, ApiError> {
        self.write_one(Method::PUT, &["extensions", id], "extension", extension)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_extension(&self, id: &str) -> Result<(), ApiError> {
        self.delete_one(&["extensions", id]).await
    }

    #[instrument(skip(self, window))]
    async fn create_maintenance_window(
        &self,
        window: &MaintenanceWindow,
    ) -> Result<MaintenanceWindow, ApiError> {
        self.write_one(
            Method::POST,
            &["maintenance_windows"],
            "maintenance_window",
            window,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_maintenance_window(&self, id: &str) -> Result<MaintenanceWindow, ApiError> {
        self.get_one(&["maintenance_windows", id], "maintenance_window")
            .await
    }

    #[instrument(skip(self, window))]
    async fn update_maintenance_window(
        &self,
        id: &str,
        window: &MaintenanceWindow,
    ) -> Result<MaintenanceWindow, ApiError> {
        self.write_one(
            Method::PUT,
            &["maintenance_windows", id],
            "maintenance_window",
            window,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_maintenance_window(&self, id: &str) -> Result<(), ApiError> {
        self.delete_one(&["maintenance_windows", id]).await
    }

    #[instrument(skip(self))]
    async fn list_addons(&self) -> Result<Vec<Addon>, ApiError> {
        self.list_all(&["addons"], "addons", "").await
    }

    #[instrument(skip(self, addon), fields(name = %addon.name))]
    async fn create_addon(&self, addon: &Addon) -> Result<Addon, ApiError> {
        self.write_one(Method::POST, &["addons"], "addon", addon)
            .await
    }

    #[instrument(skip(self))]
    async fn get_addon(&self, id: &str) -> Result<Addon, ApiError> {
        self.get_one(&["addons", id], "addon").await
    }

    #[instrument(skip(self, addon))]
    async fn update_addon(&self, id: &str, addon: &Addon) -> Result<Addon, ApiError> {
        self.write_one(Method::PUT, &["addons", id], "addon", addon)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_addon(&self, id: &str) -> Result<(), ApiError> {
        self.delete_one(&["addons", id]).await
    }

    #[instrument(skip(self))]
    async fn list_vendors(&self, query: &str) -> Result<Vec<Vendor>, ApiError> {
        self.list_all(&["vendors"], "vendors", query).await
    }

    #[instrument(skip(self))]
    async fn list_services(&self, query: &str) -> Result<Vec<Service>, ApiError> {
        self.list_all(&["services"], "services", query).await
    }

    #[instrument(skip(self, integration))]
    async fn create_integration(
        &self,
        service_id: &str,
        integration: &Integration,
    ) -> Result<Integration, ApiError> {
        self.write_one(
            Method::POST,
            &["services", service_id, "integrations"],
            "integration",
            integration,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_integration(
        &self,
        service_id: &str,
        id: &str,
    ) -> Result<Integration, ApiError> {
        self.get_one(&["services", service_id, "integrations", id], "integration")
            .await
    }

    #[instrument(skip(self, integration))]
    async fn update_integration(
        &self,
        service_id: &str,
        id: &str,
        integration: &Integration,
    ) -> Result<Integration, ApiError> {
        self.write_one(
            Method::PUT,
            &["services", service_id, "integrations", id],
            "integration",
            integration,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_integration(&self, service_id: &str, id: &str) -> Result<(), ApiError> {
        self.delete_one(&["services", service_id, "integrations", id])
            .await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// A minimal mock HTTP server built on tokio that returns canned responses.
    struct MockPagerDutyServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockPagerDutyServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        fn client(&self) -> PagerDutyClient {
            PagerDutyClient::builder("test-token")
                .base_url(&self.base_url)
                .build()
                .unwrap()
        }

        /// Accept one connection per canned response, answer it and close it.
        /// Returns the head of every request received, in order.
        async fn respond(self, responses: Vec<(u16, &'static str)>) -> Vec<String> {
            let mut requests = Vec::with_capacity(responses.len());

            for (status_code, body) in responses {
                let (mut stream, _) = self.listener.accept().await.unwrap();

                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap();
                requests.push(String::from_utf8_lossy(&buf[..n]).into_owned());

                let response = format!(
                    "HTTP/1.1 {status_code} OK\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\
                     \r\n\
                     {body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }

            requests
        }
    }

    #[test]
    fn builder_rejects_invalid_base_url() {
        let err = PagerDutyClient::builder("t")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let client = PagerDutyClient::builder("super-secret").build().unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn url_encodes_path_segments() {
        let client = PagerDutyClient::builder("t")
            .base_url("http://localhost:9999/")
            .build()
            .unwrap();
        let url = client.url(&["users", "P/1 2"]);
        assert_eq!(url.as_str(), "http://localhost:9999/users/P%2F1%202");
    }

    #[tokio::test]
    async fn get_user_sends_credentials_and_decodes_envelope() {
        let server = MockPagerDutyServer::start().await;
        let client = server.client();

        let handle = tokio::spawn(server.respond(vec![(
            200,
            r#"{"user":{"id":"PU1","type":"user","name":"Ada","email":"ada@example.com"}}"#,
        )]));

        let user = client.get_user("PU1").await.unwrap();
        let requests = handle.await.unwrap();

        assert_eq!(user.id, "PU1");
        assert_eq!(user.email, "ada@example.com");

        let request = requests[0].to_lowercase();
        assert!(request.starts_with("get /users/pu1 http/1.1"));
        assert!(request.contains("authorization: token token=test-token"));
        assert!(request.contains("accept: application/vnd.pagerduty+json;version=2"));
    }

    #[tokio::test]
    async fn missing_object_maps_to_not_found() {
        let server = MockPagerDutyServer::start().await;
        let client = server.client();

        let handle = tokio::spawn(server.respond(vec![(
            404,
            r#"{"error":{"message":"Not Found","code":2100}}"#,
        )]));

        let err = client.get_addon("PA404").await.unwrap_err();
        handle.await.unwrap();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "PagerDuty API error (HTTP 404): Not Found");
    }

    #[tokio::test]
    async fn server_error_on_team_add_is_reported_with_status() {
        let server = MockPagerDutyServer::start().await;
        let client = server.client();

        let handle = tokio::spawn(server.respond(vec![(500, "")]));

        let err = client
            .add_user_to_team("PT1", "PU1", "responder")
            .await
            .unwrap_err();
        let requests = handle.await.unwrap();

        assert!(err.is_server_error());
        assert!(requests[0].starts_with("PUT /teams/PT1/users/PU1 HTTP/1.1"));
    }

    #[tokio::test]
    async fn list_walks_every_page_and_forwards_query() {
        let server = MockPagerDutyServer::start().await;
        let client = server.client();

        let handle = tokio::spawn(server.respond(vec![
            (
                200,
                r#"{"vendors":[{"id":"PV1","name":"Datadog"}],"limit":1,"offset":0,"more":true}"#,
            ),
            (
                200,
                r#"{"vendors":[{"id":"PV2","name":"Datadog Agent"}],"limit":1,"offset":1,"more":false}"#,
            ),
        ]));

        let vendors = client.list_vendors("datadog").await.unwrap();
        let requests = handle.await.unwrap();

        assert_eq!(
            vendors.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec!["PV1", "PV2"]
        );
        assert!(requests[0].starts_with("GET /vendors?limit=100&offset=0&query=datadog "));
        assert!(requests[1].starts_with("GET /vendors?limit=100&offset=1&query=datadog "));
    }

    #[tokio::test]
    async fn create_wraps_body_in_envelope() {
        let server = MockPagerDutyServer::start().await;
        let client = server.client();

        let handle = tokio::spawn(server.respond(vec![(
            201,
            r#"{"addon":{"id":"PA1","type":"full_page_addon","name":"status","src":"https://intranet.foo.com/status"}}"#,
        )]));

        let addon = Addon {
            name: "status".into(),
            src: "https://intranet.foo.com/status".into(),
            kind: "full_page_addon".into(),
            ..Addon::default()
        };
        let created = client.create_addon(&addon).await.unwrap();
        let requests = handle.await.unwrap();

        assert_eq!(created.id, "PA1");
        assert!(requests[0].starts_with("POST /addons HTTP/1.1"));
    }

    #[tokio::test]
    async fn missing_envelope_key_is_a_decode_error() {
        let server = MockPagerDutyServer::start().await;
        let client = server.client();

        let handle = tokio::spawn(server.respond(vec![(200, r#"{"unexpected":{}}"#)]));

        let err = client.get_team("PT1").await.unwrap_err();
        handle.await.unwrap();

        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[tokio::test]
    async fn connection_failure_is_http_error() {
        // Point to a port that nothing is listening on.
        let client = PagerDutyClient::builder("t")
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap();

        let err = client.list_abilities().await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
        assert!(!err.is_not_found());
    }
}
