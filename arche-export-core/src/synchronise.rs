//! High-level pipeline: build → check payloads → transactional upload.
//!
//! [`export`] runs one process end to end:
//!   - Builds every resource graph for the process (pure, no I/O)
//!   - Checks that every binary payload is readable, still before any network call
//!   - Opens a transaction, upserts graphs strictly in build order and sends each
//!     binary right after its resource's metadata
//!   - Commits, or rolls back on the first failure and returns that failure
//!
//! [`render`] stops after the first step and hands back the Turtle documents, for
//! inspecting an export without a repository.
//!
//! # Error Handling
//! Input errors ([`crate::error::BuildError`]) surface before the transaction is
//! opened. Repository errors abort the run; nothing is retried.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::builder::build_export;
use crate::config::ExportConfig;
use crate::contract::{ContentType, Repository};
use crate::document::ProcessContext;
use crate::error::{BuildError, ExportError, RepositoryError};
use crate::graph::Graph;
use crate::transaction::{Transaction, UpsertOutcome};
use crate::turtle::to_turtle;
use crate::vocabulary::{ResourceType, Vocabulary};

/// Summary of a committed export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub transaction_id: u64,
    pub resources: Vec<ResourceReport>,
}

impl ExportReport {
    pub fn created(&self) -> usize {
        self.resources
            .iter()
            .filter(|resource| resource.outcome.is_created())
            .count()
    }

    pub fn updated(&self) -> usize {
        self.resources.len() - self.created()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub identifier: String,
    pub resource_type: ResourceType,
    pub outcome: UpsertOutcome,
    /// MIME type of the uploaded binary, if the resource has one.
    pub content_type: Option<&'static str>,
}

impl ResourceReport {
    pub fn uri(&self) -> &str {
        self.outcome.uri()
    }
}

/// Export one process into the repository in a single transaction.
pub async fn export<R>(
    ctx: &ProcessContext,
    config: &ExportConfig,
    repository: &R,
) -> Result<ExportReport, ExportError>
where
    R: Repository + ?Sized,
{
    info!(process = %ctx.process_title, project = %ctx.project.title, "[EXPORT] Starting export");
    let vocabulary = Vocabulary::from_config(config);

    let mut graphs = build_export(ctx, config, &vocabulary).map_err(|e| {
        error!(error = %e, "[EXPORT][ERROR] Building resource graphs failed");
        e
    })?;
    check_payloads(&graphs).await?;

    let mut transaction = Transaction::begin(repository, &vocabulary).await?;
    let transaction_id = transaction.info().transaction_id;

    match upload_all(&mut transaction, &mut graphs).await {
        Ok(resources) => {
            if let Err(e) = transaction.commit().await {
                error!(error = %e, "[EXPORT][ERROR] Commit failed");
                abort(&mut transaction).await;
                return Err(e.into());
            }
            let report = ExportReport {
                transaction_id,
                resources,
            };
            info!(
                transaction_id,
                created = report.created(),
                updated = report.updated(),
                "[EXPORT] Export finished"
            );
            Ok(report)
        }
        Err(e) => {
            error!(error = %e, "[EXPORT][ERROR] Upload failed");
            abort(&mut transaction).await;
            Err(e.into())
        }
    }
}

async fn upload_all<R>(
    transaction: &mut Transaction<'_, R>,
    graphs: &mut [Graph],
) -> Result<Vec<ResourceReport>, RepositoryError>
where
    R: Repository + ?Sized,
{
    let mut resources = Vec::with_capacity(graphs.len());
    for graph in graphs.iter_mut() {
        let outcome = transaction.upsert(graph).await?;
        let mut content_type: Option<ContentType> = None;
        if let Some(path) = graph.binary() {
            content_type = Some(transaction.upload_binary(outcome.uri(), path).await?);
        }
        resources.push(ResourceReport {
            identifier: graph.identifier().to_string(),
            resource_type: graph.primary().resource_type(),
            outcome,
            content_type: content_type.map(ContentType::mime),
        });
    }
    Ok(resources)
}

/// The run error is what the caller sees; a failed rollback is only logged.
async fn abort<R>(transaction: &mut Transaction<'_, R>)
where
    R: Repository + ?Sized,
{
    if let Err(e) = transaction.rollback().await {
        warn!(error = %e, "[EXPORT][ERROR] Rollback failed");
    }
}

async fn check_payloads(graphs: &[Graph]) -> Result<(), BuildError> {
    let paths: Vec<PathBuf> = graphs
        .iter()
        .filter_map(|graph| graph.binary().map(PathBuf::from))
        .collect();
    for path in &paths {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(BuildError::UnreadablePayload {
                    path: path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
                })
            }
            Err(source) => {
                error!(path = %path.display(), error = %source, "[EXPORT][ERROR] Payload missing");
                return Err(BuildError::UnreadablePayload {
                    path: path.clone(),
                    source,
                });
            }
        }
    }
    debug!(payloads = paths.len(), "[EXPORT] All payloads readable");
    Ok(())
}

/// Build the graphs of a process and serialise each one, keyed by identifier.
pub fn render(ctx: &ProcessContext, config: &ExportConfig) -> Result<Vec<(String, String)>, ExportError> {
    let vocabulary = Vocabulary::from_config(config);
    let graphs = build_export(ctx, config, &vocabulary)?;
    graphs
        .iter()
        .map(|graph| {
            to_turtle(graph, &vocabulary)
                .map(|turtle| (graph.identifier().to_string(), turtle))
                .map_err(|source| {
                    ExportError::Repository(RepositoryError::Serialisation {
                        identifier: graph.identifier().to_string(),
                        source,
                    })
                })
        })
        .collect()
}
