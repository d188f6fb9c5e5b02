//! JSON REST client with trace propagation and error normalisation.

use crate::error::AppError;
use crate::http::error::RemoteError;
use crate::observability::outgoing_headers;
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL every path is joined to, e.g. `http://127.0.0.1:8000/api/`.
    pub base_url: String,
    pub access_token: Option<Secret<String>>,
    /// Per-request timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct RestClient {
    client: Client,
    config: RestClientConfig,
}

impl RestClient {
    pub fn new(config: RestClientConfig) -> Result<Self, AppError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Join `path` onto the base URL with exactly one `/` between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> (String, RequestBuilder) {
        let url = self.url(path);
        let builder = self.client.request(method, &url);
        (url, builder)
    }

    pub async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let (url, request) = self.request(Method::GET, path);
        self.execute(Method::GET, &url, request.query(query)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (url, request) = self.request(Method::POST, path);
        self.execute(Method::POST, &url, request.json(body)).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let (url, request) = self.request(Method::POST, path);
        self.execute(Method::POST, &url, request).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (url, request) = self.request(Method::PATCH, path);
        self.execute(Method::PATCH, &url, request.json(body)).await
    }

    /// PATCH without a request body.
    pub async fn patch_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let (url, request) = self.request(Method::PATCH, path);
        self.execute(Method::PATCH, &url, request).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        let (url, request) = self.request(Method::DELETE, path);
        let _: serde_json::Value = self.execute(Method::DELETE, &url, request).await?;
        Ok(())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        mut request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }

        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(method = %method, url = %url, request_id = %request_id, "Sending request");

        let response = request
            .headers(outgoing_headers(&request_id))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(method = %method, url = %url, request_id = %request_id, error = %e, "HTTP request failed");
                RemoteError::transport(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!(method = %method, url = %url, error = %e, "Failed to read response body");
            RemoteError::transport(e)
        })?;

        if !status.is_success() {
            let err = RemoteError::from_response(status.as_u16(), &body);
            tracing::error!(
                method = %method,
                url = %url,
                request_id = %request_id,
                status = status.as_u16(),
                body = %body,
                user_message = %err.user_message,
                "Remote call failed"
            );
            return Err(err);
        }

        let payload = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(payload).map_err(|e| {
            tracing::error!(method = %method, url = %url, status = status.as_u16(), error = %e, "Failed to decode response");
            RemoteError::decode(status.as_u16(), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::{NOT_FOUND_MESSAGE, RemoteErrorKind};
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> RestClient {
        RestClient::new(RestClientConfig {
            base_url: format!("{}/api/", server.uri()),
            access_token: token.map(|t| Secret::new(t.to_string())),
            timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn url_joins_with_single_slash() {
        let client = RestClient::new(RestClientConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            access_token: None,
            timeout: None,
        })
        .unwrap();
        assert_eq!(
            client.url("/liquidaciones/"),
            "http://localhost:8000/api/liquidaciones/"
        );
        assert_eq!(client.url("manicuristas/3/"), "http://localhost:8000/api/manicuristas/3/");
    }

    #[tokio::test]
    async fn get_sends_query_bearer_and_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/liquidaciones/"))
            .and(query_param("manicurista", "3"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret-token"));
        let value: Value = client
            .get("liquidaciones/", &[("manicurista", "3")])
            .await
            .unwrap();
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn post_serialises_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/liquidaciones/"))
            .and(body_json(json!({"valor": 10.5})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let value: Value = client
            .post("liquidaciones/", &json!({"valor": 10.5}))
            .await
            .unwrap();
        assert_eq!(value["id"], 1);
    }

    #[tokio::test]
    async fn non_success_maps_to_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/liquidaciones/99/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "No encontrado."})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .get::<Value, _>("liquidaciones/99/", &())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.user_message, NOT_FOUND_MESSAGE);
        assert!(err.detail.contains("No encontrado"));
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/liquidaciones/5/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        client.delete("liquidaciones/5/").await.unwrap();
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/liquidaciones/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .get::<Value, _>("liquidaciones/", &())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Decode);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let client = RestClient::new(RestClientConfig {
            base_url: "http://127.0.0.1:9/api/".to_string(),
            access_token: None,
            timeout: Some(Duration::from_secs(2)),
        })
        .unwrap();
        let err = client
            .get::<Value, _>("liquidaciones/", &())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Transport);
        assert_eq!(err.status, None);
    }
}
