#![allow(unused)]

//! # contract: the repository seam
//!
//! This module defines the single trait ([`Repository`]) through which the
//! transaction protocol talks to a remote ARCHE-style repository, plus the plain
//! data types crossing that seam.
//!
//! ## Interface & Extensibility
//! - The trait mirrors the wire protocol one call per endpoint: begin, create
//!   metadata, update metadata, search, binary upload, commit, rollback.
//! - Implementations only transport. They return the raw status, `Location` header
//!   and body; interpreting statuses (created, conflict, permission, ...) is the job
//!   of [`crate::transaction`], so every implementation behaves the same.
//! - Transport failures (connection refused, TLS, ...) are boxed errors.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests can script exact status
//!   sequences without a server.

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Boxed error for failures below HTTP (no status was received).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Raw outcome of one repository call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryResponse {
    pub status: u16,
    /// Value of the `Location` header, if the server sent one.
    pub location: Option<String>,
    pub body: String,
}

impl RepositoryResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: String::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Content type of a binary payload, chosen from the file name suffix only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Xml,
    Jpeg,
    Tiff,
    OctetStream,
}

impl ContentType {
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        let suffix = lower.rsplit_once('.').map(|(_, suffix)| suffix);
        match suffix {
            Some("xml") => ContentType::Xml,
            Some("jpg") | Some("jpeg") => ContentType::Jpeg,
            Some("tif") | Some("tiff") => ContentType::Tiff,
            _ => ContentType::OctetStream,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Xml => "application/xml",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Tiff => "image/tiff",
            ContentType::OctetStream => "application/octet-stream",
        }
    }
}

/// An opened file ready to be streamed to a resource's binary slot.
#[derive(Debug)]
pub struct BinaryPayload {
    pub file_name: String,
    pub content_type: ContentType,
    /// Size in bytes, sent as `Content-Length`.
    pub length: u64,
    pub file: tokio::fs::File,
}

/// Transport to the remote repository.
///
/// Every call after `begin_transaction` presents the transaction token, which the
/// implementation sends as the `X-TRANSACTION-ID` header.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// `POST {base}/transaction`
    async fn begin_transaction(&self) -> Result<RepositoryResponse, TransportError>;

    /// `POST {base}/metadata` with a Turtle graph.
    async fn create_metadata(
        &self,
        token: &str,
        turtle: String,
    ) -> Result<RepositoryResponse, TransportError>;

    /// `PATCH {uri}/metadata` with a Turtle graph already rebased onto `uri`.
    async fn update_metadata(
        &self,
        token: &str,
        uri: &str,
        turtle: String,
    ) -> Result<RepositoryResponse, TransportError>;

    /// `GET {base}/search?value[]={value}&property[]={property}`, Turtle response.
    async fn search(
        &self,
        property: &str,
        value: &str,
    ) -> Result<RepositoryResponse, TransportError>;

    /// `PUT {uri}` streaming the file contents.
    async fn put_binary(
        &self,
        token: &str,
        uri: &str,
        payload: BinaryPayload,
    ) -> Result<RepositoryResponse, TransportError>;

    /// `PUT {base}/transaction`
    async fn commit_transaction(&self, token: &str)
        -> Result<RepositoryResponse, TransportError>;

    /// `DELETE {base}/transaction`
    async fn rollback_transaction(
        &self,
        token: &str,
    ) -> Result<RepositoryResponse, TransportError>;
}
