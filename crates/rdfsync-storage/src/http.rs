//! SPARQL 1.1 protocol client implementing [`TripleStore`].
//!
//! Queries are POSTed form-encoded as `query=` to the query endpoint and
//! updates as `update=` to the update endpoint. A combined update is sent
//! as one request (`DELETE DATA ; INSERT DATA`); whether the server applies
//! it atomically is up to the server.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use rdfsync_core::{Statement, StatementSet};

use crate::error::StorageError;
use crate::sparql;
use crate::traits::{TriplePattern, TripleStore};

const RESULTS_JSON: &str = "application/sparql-results+json";

/// Remote triple store reached over the SPARQL protocol.
pub struct SparqlHttpStore {
    client: Client,
    query_endpoint: String,
    update_endpoint: String,
    auth_token: Option<String>,
    request_timeout: Duration,
}

impl SparqlHttpStore {
    /// Creates a client using `endpoint` for both queries and updates.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::new(),
            update_endpoint: endpoint.clone(),
            query_endpoint: endpoint,
            auth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sends updates to a separate endpoint.
    pub fn with_update_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.update_endpoint = endpoint.into();
        self
    }

    /// Sets a bearer token sent with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.post(url).timeout(self.request_timeout);
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn map_network_error(&self, e: reqwest::Error) -> StorageError {
        if e.is_timeout() {
            StorageError::Timeout {
                after: self.request_timeout,
            }
        } else if e.is_connect() {
            StorageError::Unavailable {
                reason: format!("connection failed: {e}"),
            }
        } else {
            StorageError::Unavailable {
                reason: e.to_string(),
            }
        }
    }

    async fn map_status(resp: Response) -> StorageError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        status_error(status, body)
    }

    async fn query(&self, query: String) -> Result<String, StorageError> {
        tracing::trace!(endpoint = %self.query_endpoint, %query, "sparql query");
        let resp = self
            .post(&self.query_endpoint)
            .header(reqwest::header::ACCEPT, RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(|e| self.map_network_error(e))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(resp).await);
        }
        resp.text().await.map_err(|e| StorageError::Decode {
            reason: format!("failed to read response body: {e}"),
        })
    }

    async fn execute_update(&self, update: String) -> Result<(), StorageError> {
        tracing::trace!(endpoint = %self.update_endpoint, %update, "sparql update");
        let resp = self
            .post(&self.update_endpoint)
            .form(&[("update", update)])
            .send()
            .await
            .map_err(|e| self.map_network_error(e))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(resp).await);
        }
        Ok(())
    }
}

/// Maps a non-2xx status: server errors and throttling are transient,
/// client errors are rejections.
fn status_error(status: StatusCode, body: String) -> StorageError {
    let reason = if body.is_empty() {
        status.to_string()
    } else {
        body
    };
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        StorageError::Unavailable { reason }
    } else {
        StorageError::Rejected {
            status: status.as_u16(),
            reason,
        }
    }
}

impl fmt::Debug for SparqlHttpStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparqlHttpStore")
            .field("query_endpoint", &self.query_endpoint)
            .field("update_endpoint", &self.update_endpoint)
            .field("has_auth_token", &self.auth_token.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl TripleStore for SparqlHttpStore {
    async fn select(&self, pattern: &TriplePattern) -> Result<Vec<Statement>, StorageError> {
        // A ground pattern has nothing to project; answer it with ASK.
        if let Some(statement) = pattern.as_statement() {
            return Ok(if self.ask(pattern).await? {
                vec![statement]
            } else {
                Vec::new()
            });
        }
        let body = self.query(sparql::select_query(pattern)).await?;
        sparql::parse_select(pattern, &body)
    }

    async fn ask(&self, pattern: &TriplePattern) -> Result<bool, StorageError> {
        let body = self.query(sparql::ask_query(pattern)).await?;
        sparql::parse_ask(&body)
    }

    async fn update(
        &self,
        delete: &StatementSet,
        insert: &StatementSet,
    ) -> Result<(), StorageError> {
        match sparql::combined_update(delete, insert) {
            Some(update) => self.execute_update(update).await,
            None => Ok(()),
        }
    }

    async fn delete(&self, statements: &StatementSet) -> Result<(), StorageError> {
        if statements.is_empty() {
            return Ok(());
        }
        self.execute_update(sparql::delete_data(statements)).await
    }

    async fn insert(&self, statements: &StatementSet) -> Result<(), StorageError> {
        if statements.is_empty() {
            return Ok(());
        }
        self.execute_update(sparql::insert_data(statements)).await
    }
}
