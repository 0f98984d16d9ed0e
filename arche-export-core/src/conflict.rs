//! Conflict resolution: finding the existing resource behind an identifier after
//! the repository refused to create it.

use tracing::{debug, warn};

use crate::contract::Repository;
use crate::error::RepositoryError;
use crate::turtle::subjects_with;
use crate::vocabulary::{property, Vocabulary};

pub struct ConflictResolver<'a, R: Repository + ?Sized> {
    repository: &'a R,
    vocabulary: &'a Vocabulary,
}

impl<'a, R: Repository + ?Sized> ConflictResolver<'a, R> {
    pub fn new(repository: &'a R, vocabulary: &'a Vocabulary) -> Self {
        Self {
            repository,
            vocabulary,
        }
    }

    /// Canonical URI of the resource whose `hasIdentifier` equals `identifier`.
    ///
    /// When the search returns several subjects the first one is taken.
    pub async fn resolve(&self, identifier: &str) -> Result<String, RepositoryError> {
        let property = self.vocabulary.property(property::HAS_IDENTIFIER);
        let target = format!("search {identifier}");
        debug!(identifier, "[EXPORT][CONFLICT] Searching existing resource");

        let response = self
            .repository
            .search(&property, identifier)
            .await
            .map_err(|source| RepositoryError::Transport {
                target: target.clone(),
                source,
            })?;

        match response.status {
            200 => {
                let subjects = subjects_with(&response.body, &property, identifier).map_err(|e| {
                    RepositoryError::MalformedResponse {
                        target,
                        reason: e.to_string(),
                    }
                })?;
                if subjects.len() > 1 {
                    warn!(
                        identifier,
                        matches = subjects.len(),
                        "[EXPORT][CONFLICT] Identifier matches several resources, taking the first"
                    );
                }
                subjects
                    .into_iter()
                    .next()
                    .ok_or_else(|| RepositoryError::UnresolvedConflict {
                        identifier: identifier.to_string(),
                    })
            }
            404 => Err(RepositoryError::UnresolvedConflict {
                identifier: identifier.to_string(),
            }),
            status => Err(RepositoryError::from_status(&target, status, response.body)),
        }
    }
}
