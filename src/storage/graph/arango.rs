//! `ArangoDB` graph store over the HTTP API.
//!
//! Queries go through the cursor API:
//!
//! ```text
//! POST   /_db/{db}/_api/cursor        first batch  {query, bindVars, batchSize}
//! PUT    /_db/{db}/_api/cursor/{id}   next batch   (while hasMore)
//! DELETE /_db/{db}/_api/cursor/{id}   release      (cursor dropped early)
//! ```
//!
//! The connection is a blocking `reqwest` client plus the database base URL.
//! There is no pooling beyond what the client does, no retry and no
//! transaction handling.

use super::query::{AqlQuery, GraphQuery, validate_name};
use crate::config::ArangoSettings;
use crate::models::Node;
use crate::storage::traits::{GraphStore, NodeStream};
use crate::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::time::Duration;

/// Live connection to one `ArangoDB` database.
pub struct ArangoConnection {
    client: Client,
    endpoint: String,
    database: String,
    base_url: String,
    username: String,
    password: SecretString,
    batch_size: u32,
    server_version: String,
}

impl std::fmt::Debug for ArangoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArangoConnection")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("server_version", &self.server_version)
            .finish_non_exhaustive()
    }
}

impl ArangoConnection {
    /// Connects to the configured database and verifies the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the endpoint is unreachable, the
    /// credentials are rejected, or the database does not exist, and
    /// [`Error::InvalidInput`] if the database name is malformed.
    pub fn connect(settings: &ArangoSettings) -> Result<Self> {
        validate_name("database", &settings.database)?;

        let endpoint = settings.endpoint.trim_end_matches('/').to_string();
        let client = build_http_client(settings).map_err(|e| Error::Connection {
            endpoint: endpoint.clone(),
            cause: format!("failed to build HTTP client: {e}"),
        })?;

        let mut connection = Self {
            client,
            base_url: format!("{endpoint}/_db/{}", settings.database),
            endpoint,
            database: settings.database.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            batch_size: settings.batch_size,
            server_version: String::new(),
        };

        connection.server_version = connection.probe_version()?;
        tracing::info!(
            endpoint = %connection.endpoint,
            database = %connection.database,
            server_version = %connection.server_version,
            "Connected to ArangoDB"
        );

        Ok(connection)
    }

    /// Server version reported during connect.
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Endpoint this connection talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Database this connection is bound to.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Starts an AQL query and returns a lazy cursor over its results.
    ///
    /// Only the first batch is fetched here; the cursor pulls the rest on
    /// demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the request fails or the server rejects
    /// the query.
    pub fn cursor(&self, query: &AqlQuery) -> Result<Cursor<'_>> {
        tracing::debug!(
            database = %self.database,
            bind_vars = query.bind_vars.len(),
            "Starting AQL cursor"
        );

        let body = CursorRequest {
            query: &query.query,
            bind_vars: &query.bind_vars,
            batch_size: self.batch_size,
        };
        let request = self
            .authorized(self.client.post(format!("{}/_api/cursor", self.base_url)))
            .json(&body);
        let batch = self.send_cursor_request(request, "cursor_create")?;

        Ok(Cursor::new(self, batch))
    }

    /// Closes the connection.
    ///
    /// The HTTP API is stateless apart from open cursors, which are released
    /// when dropped, so closing only drops the client.
    pub fn close(self) {
        tracing::info!(
            endpoint = %self.endpoint,
            database = %self.database,
            "Closed ArangoDB connection"
        );
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    fn probe_version(&self) -> Result<String> {
        let response = self
            .authorized(self.client.get(format!("{}/_api/version", self.base_url)))
            .send()
            .map_err(|e| Error::Connection {
                endpoint: self.endpoint.clone(),
                cause: format!("{} error: {e}", transport_error_kind(&e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let cause = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    format!("credentials rejected for user '{}' ({status})", self.username)
                },
                StatusCode::NOT_FOUND => format!("database '{}' not found", self.database),
                _ => format!("unexpected status {status}"),
            };
            tracing::error!(endpoint = %self.endpoint, status = %status, "ArangoDB connect failed");
            return Err(Error::Connection {
                endpoint: self.endpoint.clone(),
                cause,
            });
        }

        let version: VersionResponse = response.json().map_err(|e| Error::Connection {
            endpoint: self.endpoint.clone(),
            cause: format!("unreadable version response: {e}"),
        })?;

        Ok(version.version)
    }

    fn next_batch(&self, cursor_id: &str) -> Result<CursorBatch> {
        let request = self.authorized(
            self.client
                .put(format!("{}/_api/cursor/{cursor_id}", self.base_url)),
        );
        self.send_cursor_request(request, "cursor_next")
    }

    fn delete_cursor(&self, cursor_id: &str) {
        let result = self
            .authorized(
                self.client
                    .delete(format!("{}/_api/cursor/{cursor_id}", self.base_url)),
            )
            .send();

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(cursor_id, "Released AQL cursor");
            },
            Ok(response) => {
                tracing::warn!(cursor_id, status = %response.status(), "Failed to release AQL cursor");
            },
            Err(e) => {
                tracing::warn!(cursor_id, error = %e, "Failed to release AQL cursor");
            },
        }
    }

    fn send_cursor_request(&self, request: RequestBuilder, operation: &str) -> Result<CursorBatch> {
        let response = request.send().map_err(|e| {
            let error_kind = transport_error_kind(&e);
            tracing::error!(
                database = %self.database,
                operation,
                error = %e,
                error_kind,
                "ArangoDB request failed"
            );
            Error::query(format!("{operation}: {error_kind} error: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(query_error_from(response, operation));
        }

        response
            .json::<CursorBatch>()
            .map_err(|e| Error::query(format!("{operation}: unreadable response: {e}")))
    }
}

impl GraphStore for ArangoConnection {
    fn name(&self) -> &'static str {
        "arangodb"
    }

    fn execute(&self, query: &GraphQuery) -> Result<NodeStream<'_>> {
        let cursor = self.cursor(&query.to_aql())?;
        Ok(Box::new(cursor))
    }

    fn close(self: Box<Self>) -> Result<()> {
        ArangoConnection::close(*self);
        Ok(())
    }
}

/// Lazy, single-pass iterator over the results of one AQL query.
///
/// Further batches are fetched as the buffer drains. An error ends the
/// iteration. Dropping an unfinished cursor releases it on the server.
pub struct Cursor<'a> {
    connection: &'a ArangoConnection,
    buffer: VecDeque<Value>,
    id: Option<String>,
    has_more: bool,
}

impl<'a> Cursor<'a> {
    fn new(connection: &'a ArangoConnection, batch: CursorBatch) -> Self {
        let mut cursor = Self {
            connection,
            buffer: VecDeque::new(),
            id: None,
            has_more: false,
        };
        cursor.absorb(batch);
        cursor
    }

    fn absorb(&mut self, batch: CursorBatch) {
        self.buffer.extend(batch.result);
        self.has_more = batch.has_more;
        if batch.id.is_some() {
            self.id = batch.id;
        }
    }

    /// Whether the server holds further batches.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(
                    serde_json::from_value(row)
                        .map_err(|e| Error::query(format!("unreadable node record: {e}"))),
                );
            }

            if !self.has_more {
                return None;
            }

            let Some(id) = self.id.as_deref() else {
                self.has_more = false;
                return Some(Err(Error::query("server reported more results without a cursor id")));
            };

            match self.connection.next_batch(id) {
                Ok(batch) => self.absorb(batch),
                Err(e) => {
                    self.has_more = false;
                    return Some(Err(e));
                },
            }
        }
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if self.has_more
            && let Some(id) = self.id.as_deref()
        {
            self.connection.delete_cursor(id);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CursorRequest<'a> {
    query: &'a str,
    bind_vars: &'a Map<String, Value>,
    batch_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorBatch {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    error_num: Option<u32>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Converts a non-success cursor response into [`Error::Query`].
fn query_error_from(response: Response, operation: &str) -> Error {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let parsed: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();

    tracing::error!(
        operation,
        status = %status,
        error_num = parsed.error_num,
        "ArangoDB rejected query"
    );

    let detail = parsed.error_message.unwrap_or(body);
    let message = match parsed.error_num {
        Some(num) => format!("{operation}: {status} (errorNum {num}): {detail}"),
        None => format!("{operation}: {status}: {detail}"),
    };

    Error::Query {
        code: parsed.error_num,
        message,
    }
}

fn transport_error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    }
}

fn build_http_client(settings: &ArangoSettings) -> reqwest::Result<Client> {
    let mut builder = Client::builder();
    if settings.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(settings.timeout_ms));
    }
    if settings.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(settings.connect_timeout_ms));
    }
    builder.build()
}
