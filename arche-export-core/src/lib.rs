#![doc = "arche-export-core: resource graph builder and transactional upload protocol."]

//! This crate holds everything needed to export a digitised process into an
//! ARCHE-style repository, independent of how the repository is reached.
//!
//! # Layout
//! - [`vocabulary`], [`config`]: property catalogue, language/license tables, settings
//! - [`document`]: the process, its logical document tree and folders (input)
//! - [`identifier`], [`graph`], [`builder`]: identifiers and resource graphs
//! - [`turtle`]: Turtle serialisation and search-result parsing
//! - [`contract`]: the [`contract::Repository`] seam a transport implements
//! - [`conflict`], [`transaction`]: the upload protocol
//! - [`synchronise`]: the end-to-end [`synchronise::export`] entrypoint
//!
//! # Usage
//! The CLI crate supplies an HTTP [`contract::Repository`]; tests use the generated
//! `MockRepository`.

pub mod builder;
pub mod config;
pub mod conflict;
pub mod contract;
pub mod document;
pub mod error;
pub mod graph;
pub mod identifier;
pub mod synchronise;
pub mod transaction;
pub mod turtle;
pub mod vocabulary;

pub use error::{BuildError, ExportError, RepositoryError};
pub use synchronise::{export, render, ExportReport};
