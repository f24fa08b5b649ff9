//! REST document store client.
//!
//! Talks to a JSON document API that mirrors the collection layout:
//! `{base}/users/{uid}/snapshots[/{id}]`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::backend::DocumentStore;
use crate::document::{DocumentPatch, Query, SnapshotDocument, StoredDocument, UserScope};
use crate::error::{StoreError, StoreResult};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<StoredDocument>,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentStore {
    /// Create a client for the given API base URL.
    pub fn new(base_url: &str) -> StoreResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> StoreResult<Self> {
        let parsed =
            Url::parse(base_url).map_err(|e| StoreError::InvalidBaseUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(StoreError::InvalidBaseUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, scope: &UserScope) -> String {
        format!(
            "{}/users/{}/snapshots",
            self.base_url,
            urlencoding::encode(scope.uid())
        )
    }

    fn document_url(&self, scope: &UserScope, id: &str) -> String {
        format!("{}/{}", self.collection_url(scope), urlencoding::encode(id))
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        scope: &UserScope,
    ) -> reqwest::RequestBuilder {
        match scope.bearer_token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Map non-success statuses onto store errors.
    async fn check_status(
        response: reqwest::Response,
        id: Option<&str>,
    ) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 => Err(StoreError::Unauthenticated),
            403 => Err(StoreError::PermissionDenied(text)),
            404 => Err(StoreError::not_found(id.unwrap_or_default())),
            code => Err(StoreError::Api {
                status: code,
                message: text,
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self), level = "debug")]
    async fn query(&self, scope: &UserScope, query: Query) -> StoreResult<Vec<StoredDocument>> {
        let request = self
            .client
            .get(self.collection_url(scope))
            .query(&[("orderBy", query.order_by_param())]);

        let response = self.authorize(request, scope).send().await?;
        let response = Self::check_status(response, None).await?;

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(body.documents)
    }

    #[instrument(skip(self, fields), level = "debug")]
    async fn add(&self, scope: &UserScope, fields: SnapshotDocument) -> StoreResult<String> {
        let request = self.client.post(self.collection_url(scope)).json(&fields);

        let response = self.authorize(request, scope).send().await?;
        let response = Self::check_status(response, None).await?;

        let body: AddResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        tracing::debug!("Created document {}", body.id);
        Ok(body.id)
    }

    #[instrument(skip(self), level = "debug")]
    async fn update(&self, scope: &UserScope, id: &str, patch: DocumentPatch) -> StoreResult<()> {
        let request = self.client.patch(self.document_url(scope, id)).json(&patch);

        let response = self.authorize(request, scope).send().await?;
        Self::check_status(response, Some(id)).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, scope: &UserScope, id: &str) -> StoreResult<()> {
        let request = self.client.delete(self.document_url(scope, id));

        let response = self.authorize(request, scope).send().await?;
        match Self::check_status(response, Some(id)).await {
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::document::{DateValue, Timestamp};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lagos() -> SnapshotDocument {
        SnapshotDocument {
            city: "Lagos".to_string(),
            country: "NG".to_string(),
            temp: 31.0,
            description: "Clear".to_string(),
            icon: "c01d".to_string(),
            date: Some(DateValue::Timestamp(Timestamp {
                seconds: 1714566600,
                nanoseconds: 0,
            })),
            note: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn test_query_sends_order_and_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/u1/snapshots"))
            .and(query_param("orderBy", "date desc"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documents": [
                    {
                        "id": "d1",
                        "fields": {
                            "city": "Lagos", "country": "NG", "temp": 31,
                            "description": "Clear", "icon": "c01d",
                            "date": {"seconds": 1714566600, "nanoseconds": 0}
                        }
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(&mock_server.uri()).unwrap();
        let scope = UserScope::new("u1").with_token("tok");
        let docs = store.query(&scope, Query::newest_first()).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "d1");
        assert_eq!(docs[0].fields.note, None);
        assert!(matches!(docs[0].fields.date, Some(DateValue::Timestamp(_))));
    }

    #[tokio::test]
    async fn test_add_returns_assigned_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/u1/snapshots"))
            .and(body_json(serde_json::to_value(lagos()).unwrap()))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "new-id"})),
            )
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(&mock_server.uri()).unwrap();
        let id = store.add(&UserScope::new("u1"), lagos()).await.unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn test_update_sends_partial_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/users/u1/snapshots/d1"))
            .and(body_json(serde_json::json!({"note": "x"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(&mock_server.uri()).unwrap();
        store
            .update(&UserScope::new("u1"), "d1", DocumentPatch::note("x"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/users/u1/snapshots/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(&mock_server.uri()).unwrap();
        let result = store
            .update(&UserScope::new("u1"), "missing", DocumentPatch::note("x"))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_delete_treats_missing_as_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/users/u1/snapshots/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(&mock_server.uri()).unwrap();
        assert!(store.delete(&UserScope::new("u1"), "gone").await.is_ok());
    }

    #[tokio::test]
    async fn test_unauthorized_and_server_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/u1/snapshots"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/u2/snapshots"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(&mock_server.uri()).unwrap();

        let result = store.query(&UserScope::new("u1"), Query::newest_first()).await;
        assert!(matches!(result, Err(StoreError::Unauthenticated)));

        let result = store.query(&UserScope::new("u2"), Query::newest_first()).await;
        match result {
            Err(StoreError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            HttpDocumentStore::new("not a url"),
            Err(StoreError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpDocumentStore::new("ftp://example.com"),
            Err(StoreError::InvalidBaseUrl(_))
        ));
    }
}
