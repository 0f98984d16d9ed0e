//! Transactional upload protocol.
//!
//! A [`Transaction`] wraps one repository transaction: every graph is upserted
//! (create, or update the existing resource after a conflict), binaries go to the
//! canonical URI of their resource, and the run ends with exactly one commit or
//! rollback. After that the handle refuses further calls.
//!
//! The transaction also owns the identifier → canonical URI map. References in a
//! graph are rewritten through it right before the graph is sent, so children
//! always point at the URI their parent actually got.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::ConflictResolver;
use crate::contract::{BinaryPayload, ContentType, Repository, TransportError};
use crate::error::RepositoryError;
use crate::graph::Graph;
use crate::turtle::to_turtle;
use crate::vocabulary::Vocabulary;

/// Body of `POST {base}/transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub transaction_id: u64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub last_request: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub locked_resource_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        }
    }
}

/// What an upsert did to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "uri", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created(String),
    Updated(String),
}

impl UpsertOutcome {
    pub fn uri(&self) -> &str {
        match self {
            UpsertOutcome::Created(uri) | UpsertOutcome::Updated(uri) => uri,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

fn transport(target: String) -> impl FnOnce(TransportError) -> RepositoryError {
    move |source| RepositoryError::Transport { target, source }
}

pub struct Transaction<'a, R: Repository + ?Sized> {
    repository: &'a R,
    vocabulary: &'a Vocabulary,
    token: String,
    info: TransactionInfo,
    state: TransactionState,
    canonical: HashMap<String, String>,
}

impl<'a, R: Repository + ?Sized> Transaction<'a, R> {
    /// Open a transaction. The token is the `transactionId` of the response body.
    pub async fn begin(repository: &'a R, vocabulary: &'a Vocabulary) -> Result<Self, RepositoryError> {
        let target = "begin transaction".to_string();
        let response = repository
            .begin_transaction()
            .await
            .map_err(transport(target.clone()))?;
        if !response.is_success() {
            return Err(RepositoryError::from_status(&target, response.status, response.body));
        }
        let info: TransactionInfo =
            serde_json::from_str(&response.body).map_err(|e| RepositoryError::MalformedResponse {
                target,
                reason: e.to_string(),
            })?;
        info!(
            transaction_id = info.transaction_id,
            state = ?info.state,
            "[EXPORT] Transaction started"
        );
        Ok(Self {
            repository,
            vocabulary,
            token: info.transaction_id.to_string(),
            info,
            state: TransactionState::Active,
            canonical: HashMap::new(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn info(&self) -> &TransactionInfo {
        &self.info
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn canonical_uri(&self, identifier: &str) -> Option<&str> {
        self.canonical.get(identifier).map(String::as_str)
    }

    fn ensure_active(&self) -> Result<(), RepositoryError> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(RepositoryError::Inactive {
                state: state.as_str(),
            }),
        }
    }

    fn serialise(&self, graph: &Graph) -> Result<String, RepositoryError> {
        to_turtle(graph, self.vocabulary).map_err(|source| RepositoryError::Serialisation {
            identifier: graph.identifier().to_string(),
            source,
        })
    }

    /// Create the graph's primary resource, or update the existing one when the
    /// repository answers 409. On success the primary node is rebased onto its
    /// canonical URI and recorded for later references.
    pub async fn upsert(&mut self, graph: &mut Graph) -> Result<UpsertOutcome, RepositoryError> {
        self.ensure_active()?;
        let identifier = graph.identifier().to_string();
        let rewritten = graph.retarget(&self.canonical);
        if rewritten > 0 {
            debug!(identifier = %identifier, rewritten, "[EXPORT] Rewrote references to canonical URIs");
        }

        let turtle = self.serialise(graph)?;
        let target = format!("create {identifier}");
        let response = self
            .repository
            .create_metadata(&self.token, turtle)
            .await
            .map_err(transport(target.clone()))?;

        let outcome = match response.status {
            201 => {
                let location = response
                    .location
                    .as_deref()
                    .map(str::trim)
                    .filter(|location| !location.is_empty())
                    .ok_or_else(|| RepositoryError::MalformedResponse {
                        target: target.clone(),
                        reason: "201 Created without a Location header".to_string(),
                    })?;
                let uri = location.trim_end_matches("/metadata").to_string();
                if uri != graph.primary().uri() {
                    graph.primary_mut().rebase(uri.clone());
                }
                debug!(identifier = %identifier, uri = %uri, "[EXPORT] Created resource");
                UpsertOutcome::Created(uri)
            }
            409 => {
                debug!(identifier = %identifier, "[EXPORT][CONFLICT] Resource already exists");
                let uri = ConflictResolver::new(self.repository, self.vocabulary)
                    .resolve(&identifier)
                    .await?;
                graph.primary_mut().rebase(uri.clone());
                let turtle = self.serialise(graph)?;
                let response = self
                    .repository
                    .update_metadata(&self.token, &uri, turtle)
                    .await
                    .map_err(transport(format!("update {uri}")))?;
                if !response.is_success() {
                    return Err(RepositoryError::from_status(&uri, response.status, response.body));
                }
                debug!(identifier = %identifier, uri = %uri, "[EXPORT] Updated existing resource");
                UpsertOutcome::Updated(uri)
            }
            status => return Err(RepositoryError::from_status(&target, status, response.body)),
        };

        self.canonical
            .insert(identifier, outcome.uri().to_string());
        Ok(outcome)
    }

    /// Send the file at `path` to the binary slot of `uri`.
    pub async fn upload_binary(&self, uri: &str, path: &Path) -> Result<ContentType, RepositoryError> {
        self.ensure_active()?;
        let payload_error = |source: std::io::Error| RepositoryError::Payload {
            uri: uri.to_string(),
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(payload_error)?;
        let length = file.metadata().await.map_err(payload_error)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = ContentType::from_file_name(&file_name);
        debug!(
            uri,
            file = %file_name,
            content_type = content_type.mime(),
            bytes = length,
            "[EXPORT] Uploading binary"
        );
        let payload = BinaryPayload {
            file_name,
            content_type,
            length,
            file,
        };
        let response = self
            .repository
            .put_binary(&self.token, uri, payload)
            .await
            .map_err(transport(format!("binary {uri}")))?;
        if response.is_success() {
            Ok(content_type)
        } else {
            Err(RepositoryError::from_status(uri, response.status, response.body))
        }
    }

    /// A failed commit leaves the transaction active, so it can still be rolled back.
    pub async fn commit(&mut self) -> Result<(), RepositoryError> {
        self.ensure_active()?;
        let target = format!("commit transaction {}", self.token);
        let response = self
            .repository
            .commit_transaction(&self.token)
            .await
            .map_err(transport(target.clone()))?;
        if !response.is_success() {
            return Err(RepositoryError::from_status(&target, response.status, response.body));
        }
        self.state = TransactionState::Committed;
        info!(transaction_id = self.info.transaction_id, "[EXPORT] Transaction committed");
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<(), RepositoryError> {
        self.ensure_active()?;
        let target = format!("rollback transaction {}", self.token);
        let response = self
            .repository
            .rollback_transaction(&self.token)
            .await
            .map_err(transport(target.clone()))?;
        if !response.is_success() {
            return Err(RepositoryError::from_status(&target, response.status, response.body));
        }
        self.state = TransactionState::RolledBack;
        info!(transaction_id = self.info.transaction_id, "[EXPORT] Transaction rolled back");
        Ok(())
    }
}

impl<R: Repository + ?Sized> Drop for Transaction<'_, R> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            warn!(
                transaction_id = self.info.transaction_id,
                "[EXPORT] Transaction dropped while still active; the repository will expire it"
            );
        }
    }
}
