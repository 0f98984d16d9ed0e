//! Resource nodes, statements and graphs.
//!
//! A [`Graph`] is one transfer unit: a primary [`ResourceNode`] plus the agent
//! nodes first described alongside it, and optionally the binary payload that goes
//! to the primary resource once its metadata is stored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::vocabulary::{self, property, ResourceType};

/// How a statement's value is to be read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Plain,
    /// Language-tagged string; the tag is a two-letter code.
    Lang(String),
    /// Literal with an XSD datatype IRI.
    Typed(String),
    /// URI of another resource.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    /// Local property name, e.g. `hasTitle`.
    pub property: String,
    pub value: String,
    pub kind: ValueKind,
}

impl Statement {
    pub fn plain(property: &str, value: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            value: value.into(),
            kind: ValueKind::Plain,
        }
    }

    pub fn lang(property: &str, value: impl Into<String>, language: &str) -> Self {
        Self {
            property: property.to_string(),
            value: value.into(),
            kind: ValueKind::Lang(language.to_string()),
        }
    }

    pub fn typed(property: &str, value: impl Into<String>, datatype: &str) -> Self {
        Self {
            property: property.to_string(),
            value: value.into(),
            kind: ValueKind::Typed(datatype.to_string()),
        }
    }

    pub fn reference(property: &str, uri: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            value: uri.into(),
            kind: ValueKind::Reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    /// Current identity. Starts out as the identifier and may be rebased onto the
    /// repository's canonical URI.
    uri: String,
    identifier: String,
    resource_type: ResourceType,
    statements: Vec<Statement>,
}

impl ResourceNode {
    /// A node whose identity is its identifier. The `hasIdentifier` statement is
    /// added here so that it survives rebasing.
    pub fn new(identifier: impl Into<String>, resource_type: ResourceType) -> Self {
        let identifier = identifier.into();
        Self {
            uri: identifier.clone(),
            statements: vec![Statement::reference(
                property::HAS_IDENTIFIER,
                identifier.clone(),
            )],
            identifier,
            resource_type,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn add_plain(&mut self, property: &str, value: impl Into<String>) {
        self.push(Statement::plain(property, value));
    }

    pub fn add_lang(&mut self, property: &str, value: impl Into<String>, language: &str) {
        self.push(Statement::lang(property, value, language));
    }

    pub fn add_typed(&mut self, property: &str, value: impl Into<String>, datatype: &str) {
        self.push(Statement::typed(property, value, datatype));
    }

    pub fn add_reference(&mut self, property: &str, uri: impl Into<String>) {
        self.push(Statement::reference(property, uri));
    }

    pub fn values<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements
            .iter()
            .filter(move |statement| statement.property == property)
    }

    pub fn first(&self, property: &str) -> Option<&Statement> {
        self.statements
            .iter()
            .find(|statement| statement.property == property)
    }

    /// Copy every inheritable statement of `parent`, in the parent's order.
    pub fn inherit_from(&mut self, parent: &ResourceNode) {
        let inherited: Vec<Statement> = parent
            .statements
            .iter()
            .filter(|statement| vocabulary::is_inheritable(&statement.property))
            .cloned()
            .collect();
        self.statements.extend(inherited);
    }

    /// Move the node's identity to `uri`. Statements are untouched, so
    /// `hasIdentifier` keeps pointing at the locally computed identifier.
    pub fn rebase(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
    }

    pub fn is_rebased(&self) -> bool {
        self.uri != self.identifier
    }

    /// Point references at their canonical URIs. `hasIdentifier` is never rewritten.
    fn retarget(&mut self, canonical: &HashMap<String, String>) -> usize {
        let mut rewritten = 0;
        for statement in &mut self.statements {
            if statement.kind != ValueKind::Reference
                || statement.property == property::HAS_IDENTIFIER
            {
                continue;
            }
            if let Some(uri) = canonical.get(&statement.value) {
                if *uri != statement.value {
                    statement.value = uri.clone();
                    rewritten += 1;
                }
            }
        }
        rewritten
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<ResourceNode>,
    binary: Option<PathBuf>,
}

impl Graph {
    pub fn new(primary: ResourceNode) -> Self {
        Self {
            nodes: vec![primary],
            binary: None,
        }
    }

    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    pub fn push_agent(&mut self, agent: ResourceNode) {
        self.nodes.push(agent);
    }

    pub fn primary(&self) -> &ResourceNode {
        &self.nodes[0]
    }

    pub fn primary_mut(&mut self) -> &mut ResourceNode {
        &mut self.nodes[0]
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Agent nodes described in this graph.
    pub fn agents(&self) -> &[ResourceNode] {
        &self.nodes[1..]
    }

    pub fn identifier(&self) -> &str {
        self.primary().identifier()
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    /// Rewrite references to resources that already have a canonical URI.
    /// Returns the number of rewritten statements.
    pub fn retarget(&mut self, canonical: &HashMap<String, String>) -> usize {
        self.nodes
            .iter_mut()
            .map(|node| node.retarget(canonical))
            .sum()
    }
}
