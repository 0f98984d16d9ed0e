#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arche_export_core::config::ExportConfig;
use arche_export_core::contract::{BinaryPayload, Repository, RepositoryResponse, TransportError};
use arche_export_core::document::{DocStruct, FolderListing, ProcessContext, ProjectInfo};
use async_trait::async_trait;
use rio_api::model::{Literal, Subject, Term, Triple};
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleParser};

pub const REPOSITORY_BASE: &str = "https://arche.example.org/api";
pub const HAS_IDENTIFIER: &str = "https://vocabs.acdh.oeaw.ac.at/schema#hasIdentifier";

pub fn export_config() -> ExportConfig {
    let mut config = ExportConfig::for_repository(REPOSITORY_BASE);
    config
        .licenses
        .insert("CC-BY-4.0".to_string(), "cc-by-4-0".to_string());
    config.project.default_license = Some("CC-BY-4.0".to_string());
    config.project.viewer_url = Some("https://viewer.example.org/viewer".to_string());
    config.project.catalogue_permalink = Some("https://permalink.example.org/".to_string());
    config.project.hosting = Some("https://id.acdh.oeaw.ac.at/acdh".to_string());
    config
}

pub fn monograph(title: &str, catalog_id: &str) -> DocStruct {
    DocStruct {
        type_name: "Monograph".to_string(),
        ..Default::default()
    }
    .with_metadata("TitleDocMain", title)
    .with_metadata("CatalogIDDigital", catalog_id)
}

/// Process "Alpenpost" of project "woldan" with the given master images.
pub fn alpenpost(master_files: Vec<PathBuf>) -> ProcessContext {
    let mut folders = BTreeMap::new();
    folders.insert(
        "master".to_string(),
        FolderListing {
            name: "Alpenpost_master".to_string(),
            path: None,
            files: master_files,
        },
    );
    ProcessContext {
        process_id: 4711,
        process_title: "Alpenpost".to_string(),
        project: ProjectInfo {
            title: "woldan".to_string(),
            description: Some("Scans der Sammlung Woldan".to_string()),
            ..Default::default()
        },
        properties: BTreeMap::new(),
        document: monograph("Alpenpost", "AC123")
            .with_metadata("DocLanguage", "de")
            .with_metadata("PublicationYear", "[1862?]"),
        folders,
        metadata_files: Vec::new(),
    }
}

pub fn write_payload(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"payload bytes").expect("write payload");
    path
}

/// All triples of a Turtle document as (subject, predicate, lexical object).
pub fn triples(turtle: &str) -> Vec<(String, String, String)> {
    let mut out = Vec::new();
    TurtleParser::new(turtle.as_bytes(), None)
        .parse_all(&mut |triple: Triple<'_>| -> Result<(), TurtleError> {
            let subject = match triple.subject {
                Subject::NamedNode(node) => node.iri.to_string(),
                other => other.to_string(),
            };
            let object = match triple.object {
                Term::NamedNode(node) => node.iri.to_string(),
                Term::Literal(Literal::Simple { value })
                | Term::Literal(Literal::LanguageTaggedString { value, .. })
                | Term::Literal(Literal::Typed { value, .. }) => value.to_string(),
                other => other.to_string(),
            };
            out.push((subject, triple.predicate.iri.to_string(), object));
            Ok(())
        })
        .expect("valid turtle");
    out
}

/// `hasIdentifier` of the first subject in the document.
pub fn primary_identifier(turtle: &str) -> String {
    let triples = triples(turtle);
    let subject = triples.first().map(|t| t.0.clone()).expect("non-empty graph");
    triples
        .into_iter()
        .find(|(s, p, _)| *s == subject && p == HAS_IDENTIFIER)
        .map(|(_, _, o)| o)
        .expect("primary node carries hasIdentifier")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin,
    Create { identifier: String, turtle: String },
    Update { uri: String, turtle: String },
    Search { value: String },
    Binary { uri: String, content_type: &'static str, file_name: String, length: u64 },
    Commit,
    Rollback,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    /// identifier → canonical URI
    stored: BTreeMap<String, String>,
    /// identifiers created in the open transaction
    pending: Vec<String>,
    next_id: u64,
    transactions: u64,
}

/// In-memory stand-in for the repository: assigns `{base}/{n}` URIs on create,
/// answers 409 for known identifiers and resolves them through search.
#[derive(Default)]
pub struct ScriptedRepository {
    state: Mutex<State>,
    binary_status: Option<u16>,
}

impl ScriptedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self, identifier: &str, uri: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .stored
            .insert(identifier.to_string(), uri.to_string());
        self
    }

    /// Every binary upload answers with `status`.
    pub fn failing_binary(mut self, status: u16) -> Self {
        self.binary_status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn uri_of(&self, identifier: &str) -> Option<String> {
        self.state.lock().unwrap().stored.get(identifier).cloned()
    }
}

#[async_trait]
impl Repository for ScriptedRepository {
    async fn begin_transaction(&self) -> Result<RepositoryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Begin);
        state.transactions += 1;
        let body = format!(
            r#"{{"transactionId": {}, "startedAt": "2026-10-19 10:00:00", "state": "active", "lockedResourceCount": 0}}"#,
            state.transactions
        );
        Ok(RepositoryResponse::new(201).with_body(body))
    }

    async fn create_metadata(
        &self,
        _token: &str,
        turtle: String,
    ) -> Result<RepositoryResponse, TransportError> {
        let identifier = primary_identifier(&turtle);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            identifier: identifier.clone(),
            turtle,
        });
        if state.stored.contains_key(&identifier) {
            return Ok(RepositoryResponse::new(409).with_body("Duplicated resource identifier"));
        }
        state.next_id += 1;
        let uri = format!("{REPOSITORY_BASE}/{}", state.next_id);
        state.stored.insert(identifier.clone(), uri.clone());
        state.pending.push(identifier);
        Ok(RepositoryResponse::new(201).with_location(format!("{uri}/metadata")))
    }

    async fn update_metadata(
        &self,
        _token: &str,
        uri: &str,
        turtle: String,
    ) -> Result<RepositoryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            uri: uri.to_string(),
            turtle,
        });
        Ok(RepositoryResponse::new(200))
    }

    async fn search(&self, property: &str, value: &str) -> Result<RepositoryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Search {
            value: value.to_string(),
        });
        let body = match state.stored.get(value) {
            Some(uri) => format!("<{uri}> <{property}> <{value}> .\n"),
            None => String::new(),
        };
        Ok(RepositoryResponse::new(200).with_body(body))
    }

    async fn put_binary(
        &self,
        _token: &str,
        uri: &str,
        payload: BinaryPayload,
    ) -> Result<RepositoryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Binary {
            uri: uri.to_string(),
            content_type: payload.content_type.mime(),
            file_name: payload.file_name,
            length: payload.length,
        });
        let status = self.binary_status.unwrap_or(204);
        Ok(RepositoryResponse::new(status).with_body(format!("binary answered {status}")))
    }

    async fn commit_transaction(&self, _token: &str) -> Result<RepositoryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Commit);
        state.pending.clear();
        Ok(RepositoryResponse::new(204))
    }

    async fn rollback_transaction(&self, _token: &str) -> Result<RepositoryResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Rollback);
        let pending = std::mem::take(&mut state.pending);
        for identifier in pending {
            state.stored.remove(&identifier);
        }
        Ok(RepositoryResponse::new(204))
    }
}
