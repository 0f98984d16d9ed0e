#![doc = "HTTP transport for the repository seam: implements the core `Repository` trait against an ARCHE REST API."]
//
//! # Repository client (CLI <-> Core)
//!
//! [`ArcheClient`] speaks the repository's REST protocol with `reqwest`. It only
//! transports: every method returns the raw status, `Location` header and body,
//! and the core transaction protocol decides what they mean.
//!
//! - Credentials come from the loaded [`RepositoryConfig`] (which picks up
//!   `ARCHE_USERNAME` / `ARCHE_PASSWORD` from the environment).
//! - Calls inside a transaction carry the `X-TRANSACTION-ID` header.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client, RequestBuilder, Response, Url};

use arche_export_core::config::RepositoryConfig;
use arche_export_core::contract::{BinaryPayload, Repository, RepositoryResponse, TransportError};

pub const TRANSACTION_HEADER: &str = "X-TRANSACTION-ID";
const TURTLE: &str = "text/turtle";

pub struct ArcheClient {
    base_url: String,
    http: Client,
    username: Option<String>,
    password: Option<String>,
}

impl ArcheClient {
    /// Fails when the base URL is not an absolute http(s) URL.
    pub fn new(config: &RepositoryConfig) -> Result<Self, TransportError> {
        let parsed = Url::parse(config.base_url.trim()).map_err(|e| {
            tracing::error!(error = %e, base_url = %config.base_url, "Invalid repository base URL");
            format!("invalid repository base URL {:?}: {e}", config.base_url)
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("repository base URL must be http(s): {}", config.base_url).into());
        }
        tracing::info!(
            base_url = %config.base_url,
            authenticated = config.username.is_some(),
            "Initialised ArcheClient"
        );
        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            http: Client::new(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => req.basic_auth(username, self.password.as_ref()),
            None => req,
        }
    }

    fn in_transaction(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
        self.add_auth(req).header(TRANSACTION_HEADER, token)
    }

    fn transaction_url(&self) -> String {
        format!("{}/transaction", self.base_url)
    }
}

async fn into_response(resp: Response) -> Result<RepositoryResponse, TransportError> {
    let status = resp.status().as_u16();
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = resp.text().await?;
    tracing::debug!(status, location = ?location, "Repository responded");
    let response = RepositoryResponse::new(status).with_body(body);
    Ok(match location {
        Some(location) => response.with_location(location),
        None => response,
    })
}

#[async_trait]
impl Repository for ArcheClient {
    async fn begin_transaction(&self) -> Result<RepositoryResponse, TransportError> {
        let req = self
            .add_auth(self.http.post(self.transaction_url()))
            .header(ACCEPT, "application/json");
        into_response(req.send().await?).await
    }

    async fn create_metadata(
        &self,
        token: &str,
        turtle: String,
    ) -> Result<RepositoryResponse, TransportError> {
        let url = format!("{}/metadata", self.base_url);
        let req = self
            .in_transaction(self.http.post(&url), token)
            .header(CONTENT_TYPE, TURTLE)
            .header(ACCEPT, TURTLE)
            .body(turtle);
        into_response(req.send().await?).await
    }

    async fn update_metadata(
        &self,
        token: &str,
        uri: &str,
        turtle: String,
    ) -> Result<RepositoryResponse, TransportError> {
        let url = format!("{}/metadata", uri.trim_end_matches('/'));
        let req = self
            .in_transaction(self.http.patch(&url), token)
            .header(CONTENT_TYPE, TURTLE)
            .header(ACCEPT, TURTLE)
            .body(turtle);
        into_response(req.send().await?).await
    }

    async fn search(&self, property: &str, value: &str) -> Result<RepositoryResponse, TransportError> {
        let url = format!("{}/search", self.base_url);
        let req = self
            .add_auth(self.http.get(&url))
            .query(&[("value[]", value), ("property[]", property)])
            .header(ACCEPT, TURTLE);
        into_response(req.send().await?).await
    }

    async fn put_binary(
        &self,
        token: &str,
        uri: &str,
        payload: BinaryPayload,
    ) -> Result<RepositoryResponse, TransportError> {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            payload.file_name.replace('"', "")
        );
        let req = self
            .in_transaction(self.http.put(uri), token)
            .header(CONTENT_TYPE, payload.content_type.mime())
            .header(CONTENT_DISPOSITION, disposition)
            .header(CONTENT_LENGTH, payload.length)
            .body(Body::from(payload.file));
        into_response(req.send().await?).await
    }

    async fn commit_transaction(&self, token: &str) -> Result<RepositoryResponse, TransportError> {
        let req = self.in_transaction(self.http.put(self.transaction_url()), token);
        into_response(req.send().await?).await
    }

    async fn rollback_transaction(&self, token: &str) -> Result<RepositoryResponse, TransportError> {
        let req = self.in_transaction(self.http.delete(self.transaction_url()), token);
        into_response(req.send().await?).await
    }
}
