//! Resource Graph Builder: turns a process and its document tree into the ordered
//! list of graphs one export run uploads.
//!
//! The builder is pure. It reads the [`ProcessContext`], the configuration and the
//! [`Vocabulary`] and hands back [`Graph`] values; it never touches the network or
//! the file system. Nodes reference each other by identifier only. Rewriting those
//! references to canonical URIs happens later, inside the transaction.
//!
//! Order of the produced graphs (producers before consumers):
//! top collection, collection, anchor publication, volume publication, metadata
//! files, then each folder followed by its files.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::document::{DocStruct, FolderListing, ProcessContext, EXPORTED_FOLDERS, FOLDER_MASTER};
use crate::error::BuildError;
use crate::graph::{Graph, ResourceNode, Statement};
use crate::identifier::{IdentifierScheme, Scope};
use crate::vocabulary::{
    self, is_absolute_uri, property, xsd, LifeCycleStatus, ResourceType, Vocabulary,
    AGENT_PROPERTIES,
};

pub const FIELD_MAIN_TITLE: &str = "TitleDocMain";
pub const FIELD_SORT_TITLE: &str = "TitleDocMainShort";
pub const FIELD_SUBTITLE: &str = "TitleDocSub1";
pub const FIELD_ORDER_NUMBER: &str = "CurrentNo";
pub const FIELD_CATALOG_ID: &str = "CatalogIDDigital";
pub const FIELD_LANGUAGE: &str = "DocLanguage";
pub const FIELD_LICENSE: &str = "AccessLicense";
pub const FIELD_DATE_OF_ORIGIN: &str = "DateOfOrigin";
pub const FIELD_PUBLICATION_YEAR: &str = "PublicationYear";
pub const FIELD_HANDLE: &str = "Handle";
pub const FIELD_SHELFMARK: &str = "shelfmarksource";

/// Plain-string fields copied onto publications.
const PUBLICATION_FIELDS: [(&str, &str); 3] = [
    (FIELD_SHELFMARK, property::HAS_NON_LINKED_IDENTIFIER),
    ("PublisherName", property::HAS_PUBLISHER),
    ("PlaceOfPublication", property::HAS_CITY),
];

/// Language tag for agent names.
const AGENT_NAME_LANGUAGE: &str = "und";

/// Output property for a person or corporate role. Corporate roles may carry a
/// `Corporate` prefix (`CorporateEditor`).
pub fn role_property(role: &str) -> Option<&'static str> {
    let role = role.strip_prefix("Corporate").unwrap_or(role);
    match role {
        "Author" | "Cartographer" | "Artist" => Some(property::HAS_AUTHOR),
        "Editor" => Some(property::HAS_EDITOR),
        "OtherPerson" | "Lithographer" | "Engraver" | "Contributor" | "Printer"
        | "PublisherPerson" => Some(property::HAS_CONTRIBUTOR),
        _ => None,
    }
}

/// Strip the `<<`/`>>` article markers, keeping the text between them.
pub fn normalize_title(title: &str) -> String {
    title.replace("<<", "").replace(">>", "")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Titles {
    pub main: String,
    pub alternative: String,
}

/// `main = (sort title or main title) + order number`,
/// `alternative = main title [+ " : " + subtitle]`, both normalised.
/// `None` when the main title is missing.
pub fn compose_titles(doc: &DocStruct) -> Option<Titles> {
    let main_title = doc.value(FIELD_MAIN_TITLE)?;
    let sort_title = doc.value(FIELD_SORT_TITLE).unwrap_or(main_title);
    let main = match doc.value(FIELD_ORDER_NUMBER) {
        Some(order) => format!("{sort_title}{order}"),
        None => sort_title.to_string(),
    };
    let alternative = match doc.value(FIELD_SUBTITLE) {
        Some(subtitle) => format!("{main_title} : {subtitle}"),
        None => main_title.to_string(),
    };
    Some(Titles {
        main: normalize_title(&main),
        alternative: normalize_title(&alternative),
    })
}

/// Qualifier read from the lexical markers of a date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateQualifier {
    Inferred,
    Uncertain,
    InferredAndUncertain,
}

impl DateQualifier {
    /// `[` marks an inferred date, `?` an uncertain one.
    pub fn of(date: &str) -> Option<Self> {
        match (date.contains('['), date.contains('?')) {
            (true, true) => Some(DateQualifier::InferredAndUncertain),
            (true, false) => Some(DateQualifier::Inferred),
            (false, true) => Some(DateQualifier::Uncertain),
            (false, false) => None,
        }
    }

    /// English and German note.
    pub fn notes(self) -> [(&'static str, &'static str); 2] {
        match self {
            DateQualifier::Inferred => [("Date is inferred.", "en"), ("Datum abgeleitet.", "de")],
            DateQualifier::Uncertain => [("Date is uncertain.", "en"), ("Datum unsicher.", "de")],
            DateQualifier::InferredAndUncertain => [
                ("Date is inferred and uncertain.", "en"),
                ("Datum abgeleitet und unsicher.", "de"),
            ],
        }
    }
}

pub fn date_notes(date: &str) -> Vec<Statement> {
    DateQualifier::of(date)
        .map(|qualifier| {
            qualifier
                .notes()
                .iter()
                .map(|(text, language)| Statement::lang(property::HAS_NOTE, *text, language))
                .collect()
        })
        .unwrap_or_default()
}

/// `hasDate` statement for a date string with its markers removed: `xsd:date` for
/// full dates, `xsd:gYear` for years, a plain string for anything else.
pub fn date_statement(date: &str) -> Option<Statement> {
    static FULL_DATE: OnceLock<Regex> = OnceLock::new();
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let full_date = FULL_DATE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));
    let year = YEAR.get_or_init(|| Regex::new(r"^\d{4}$").expect("static regex"));

    let cleaned = date.replace(['[', ']', '?'], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else if full_date.is_match(cleaned) {
        Some(Statement::typed(property::HAS_DATE, cleaned, xsd::DATE))
    } else if year.is_match(cleaned) {
        Some(Statement::typed(property::HAS_DATE, cleaned, xsd::G_YEAR))
    } else {
        Some(Statement::plain(property::HAS_DATE, cleaned))
    }
}

fn require<'d>(doc: &'d DocStruct, field: &'static str) -> Result<&'d str, BuildError> {
    doc.value(field).ok_or_else(|| BuildError::MissingField {
        field,
        node: describe(doc),
    })
}

fn describe(doc: &DocStruct) -> String {
    if doc.type_name.is_empty() {
        "logical document".to_string()
    } else {
        format!("logical document of type {}", doc.type_name)
    }
}

fn file_name(path: &Path) -> Result<&str, BuildError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BuildError::InvalidPath(path.to_path_buf()))
}

/// Builds the nodes of one process. Agents minted once are only referenced
/// afterwards, so each agent is described by the first graph that needs it.
pub struct GraphBuilder<'a> {
    config: &'a ExportConfig,
    vocabulary: &'a Vocabulary,
    ids: IdentifierScheme,
    /// Tag for language-tagged titles and descriptions.
    language: String,
    minted_agents: HashSet<String>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        ctx: &ProcessContext,
        config: &'a ExportConfig,
        vocabulary: &'a Vocabulary,
    ) -> Result<Self, BuildError> {
        let ids = IdentifierScheme::new(
            &config.vocabulary.identifier_prefix,
            &ctx.project.title,
            &ctx.process_title,
        )?;
        let (volume, _) = ctx.logical_nodes();
        let language = volume
            .value(FIELD_LANGUAGE)
            .and_then(|code| vocabulary.language(code))
            .map(|language| language.two_letter)
            .unwrap_or_else(|| config.project.default_language.clone());
        Ok(Self {
            config,
            vocabulary,
            ids,
            language,
            minted_agents: HashSet::new(),
        })
    }

    pub fn build_top_collection(&mut self, ctx: &ProcessContext) -> Result<Graph, BuildError> {
        let project = &ctx.project;
        let mut node = ResourceNode::new(
            self.ids.identifier(Scope::Project)?,
            ResourceType::TopCollection,
        );
        let mut agents = Vec::new();

        node.add_lang(property::HAS_TITLE, project.title.trim(), &self.language);
        if let Some(viewer) = &self.config.project.viewer_url {
            node.add_typed(property::HAS_URL, viewer.as_str(), xsd::ANY_URI);
        }
        if let Some(description) = project.description.as_deref().filter(|d| !d.trim().is_empty()) {
            node.add_lang(property::HAS_DESCRIPTION, description.trim(), &self.language);
        }
        let status = if project.archived {
            LifeCycleStatus::Completed
        } else {
            LifeCycleStatus::Active
        };
        node.add_reference(property::HAS_LIFE_CYCLE_STATUS, self.vocabulary.lifecycle(status));
        if let Some(software) = &self.config.project.used_software {
            node.add_plain(property::HAS_USED_SOFTWARE, software.as_str());
        }
        for discipline in &self.config.project.related_disciplines {
            node.add_reference(property::HAS_RELATED_DISCIPLINE, discipline.as_str());
        }
        for subject in &self.config.project.subjects {
            node.add_lang(property::HAS_SUBJECT, subject.as_str(), &self.language);
        }
        for (name, agent_property) in AGENT_PROPERTIES {
            if let Some(value) = project.property(name) {
                self.add_agent_values(&mut node, &mut agents, agent_property, value);
            }
        }
        self.add_hosting(&mut node, &mut agents);
        if let Some(license) = self.default_license() {
            node.add_reference(property::HAS_LICENSE, license);
        }

        Ok(assemble(node, agents))
    }

    pub fn build_collection(
        &mut self,
        ctx: &ProcessContext,
        top: &ResourceNode,
    ) -> Result<Graph, BuildError> {
        let (volume, _) = ctx.logical_nodes();
        let catalog_id = require(volume, FIELD_CATALOG_ID)?;
        let titles = compose_titles(volume).ok_or_else(|| BuildError::MissingField {
            field: FIELD_MAIN_TITLE,
            node: describe(volume),
        })?;

        let mut node = ResourceNode::new(
            self.ids.identifier(Scope::Process)?,
            ResourceType::Collection,
        );
        let mut agents = Vec::new();

        node.add_lang(property::HAS_TITLE, titles.main, &self.language);
        node.add_lang(property::HAS_ALTERNATIVE_TITLE, titles.alternative, &self.language);
        let handle = ctx
            .properties
            .get("handle")
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .or_else(|| volume.value(FIELD_HANDLE));
        if let Some(handle) = handle {
            node.add_typed(property::HAS_PID, handle, xsd::ANY_URI);
        }
        node.add_plain(property::HAS_NON_LINKED_IDENTIFIER, catalog_id);
        if let Some(shelfmark) = volume.value(FIELD_SHELFMARK) {
            node.add_plain(property::HAS_NON_LINKED_IDENTIFIER, shelfmark);
        }
        node.add_plain(property::HAS_NON_LINKED_IDENTIFIER, ctx.process_id.to_string());
        if let Some(viewer) = &self.config.project.viewer_url {
            let url = format!("{}/image/{}", viewer.trim_end_matches('/'), catalog_id);
            node.add_typed(property::HAS_URL, url, xsd::ANY_URI);
        }
        if let Some(permalink) = &self.config.project.catalogue_permalink {
            let record = format!("{permalink}{catalog_id}");
            node.add_lang(
                property::HAS_DESCRIPTION,
                format!("A collection of scans from: {record}"),
                "en",
            );
            node.add_reference(property::RELATION, record);
        }
        self.add_language(&mut node, volume);
        node.add_reference(
            property::HAS_LIFE_CYCLE_STATUS,
            self.vocabulary.lifecycle(LifeCycleStatus::Completed),
        );
        node.add_lang(
            property::HAS_EXTENT,
            format!("{} files", ctx.master_image_count()),
            "en",
        );
        add_date(&mut node, volume);
        for (name, agent_property) in AGENT_PROPERTIES {
            if let Some(value) = ctx.agent_property(name) {
                self.add_agent_values(&mut node, &mut agents, agent_property, value);
            }
        }
        self.add_hosting(&mut node, &mut agents);
        let license = volume
            .value(FIELD_LICENSE)
            .and_then(|name| self.vocabulary.license(name))
            .or_else(|| self.default_license());
        if let Some(license) = license {
            node.add_reference(property::HAS_LICENSE, license);
        }
        node.add_reference(property::IS_PART_OF, top.identifier());

        debug!(identifier = %node.identifier(), statements = node.statements().len(), "[BUILD] Collection node built");
        Ok(assemble(node, agents))
    }

    /// A publication for `doc`. A volume passes its anchor's node, an anchor (or a
    /// monograph) passes `None`.
    pub fn build_publication(
        &mut self,
        doc: &DocStruct,
        anchor: Option<&ResourceNode>,
    ) -> Result<Graph, BuildError> {
        let catalog_id = require(doc, FIELD_CATALOG_ID)?;
        let titles = compose_titles(doc).ok_or_else(|| BuildError::MissingField {
            field: FIELD_MAIN_TITLE,
            node: describe(doc),
        })?;

        let mut node = ResourceNode::new(
            self.ids.identifier(Scope::Child(catalog_id))?,
            ResourceType::Publication,
        );
        let mut agents = Vec::new();

        node.add_lang(property::HAS_TITLE, titles.main, &self.language);
        node.add_lang(property::HAS_ALTERNATIVE_TITLE, titles.alternative, &self.language);
        node.add_plain(property::HAS_NON_LINKED_IDENTIFIER, catalog_id);
        for (field, target) in PUBLICATION_FIELDS {
            for value in doc.values(field) {
                node.add_plain(target, value);
            }
        }
        self.add_language(&mut node, doc);
        add_date(&mut node, doc);

        for person in &doc.persons {
            let Some(role_target) = role_property(&person.role) else {
                continue;
            };
            if let Some(authority) = person.authority_uri.as_deref().filter(|a| !a.trim().is_empty()) {
                node.add_reference(role_target, authority.trim());
                continue;
            }
            let Some(display_name) = person.display_name() else {
                continue;
            };
            let minted = self.mint_agent(
                ResourceType::Person,
                &display_name,
                person.first_name.as_deref(),
                person.last_name.as_deref(),
                &mut agents,
            );
            if let Some(id) = minted {
                node.add_reference(role_target, id);
            }
        }
        for corporate in &doc.corporates {
            let Some(role_target) = role_property(&corporate.role) else {
                continue;
            };
            if let Some(authority) = corporate.authority_uri.as_deref().filter(|a| !a.trim().is_empty()) {
                node.add_reference(role_target, authority.trim());
                continue;
            }
            let minted = self.mint_agent(
                ResourceType::Organisation,
                corporate.name.trim(),
                None,
                None,
                &mut agents,
            );
            if let Some(id) = minted {
                node.add_reference(role_target, id);
            }
        }

        if let Some(anchor) = anchor {
            node.add_reference(property::IS_PART_OF, anchor.identifier());
        }

        Ok(assemble(node, agents))
    }

    pub fn build_metadata(
        &mut self,
        path: &Path,
        collection: &ResourceNode,
        described: &ResourceNode,
    ) -> Result<Graph, BuildError> {
        let name = file_name(path)?;
        let mut node = ResourceNode::new(
            self.ids.identifier(Scope::Child(name))?,
            ResourceType::Metadata,
        );
        node.add_lang(property::HAS_TITLE, name, &self.language);
        node.add_reference(property::IS_METADATA_FOR, described.identifier());
        node.inherit_from(collection);
        Ok(Graph::new(node).with_binary(path))
    }

    pub fn build_folder(
        &mut self,
        listing: &FolderListing,
        collection: &ResourceNode,
    ) -> Result<Graph, BuildError> {
        let mut node = ResourceNode::new(
            self.ids.identifier(Scope::Child(&listing.name))?,
            ResourceType::Folder,
        );
        node.add_lang(property::HAS_TITLE, listing.name.trim(), &self.language);
        node.add_lang(
            property::HAS_EXTENT,
            format!("{} files", listing.files.len()),
            "en",
        );
        node.add_reference(property::IS_PART_OF, collection.identifier());
        node.inherit_from(collection);
        Ok(Graph::new(node))
    }

    pub fn build_file(
        &mut self,
        listing: &FolderListing,
        folder: &ResourceNode,
        path: &Path,
        collection: &ResourceNode,
    ) -> Result<Graph, BuildError> {
        let name = file_name(path)?;
        let mut node = ResourceNode::new(
            self.ids.identifier(Scope::File {
                folder: &listing.name,
                file: name,
            })?,
            ResourceType::FileResource,
        );
        node.add_lang(property::HAS_TITLE, name, &self.language);
        node.add_reference(property::IS_PART_OF, folder.identifier());
        node.inherit_from(collection);
        Ok(Graph::new(node).with_binary(path))
    }

    fn add_language(&self, node: &mut ResourceNode, doc: &DocStruct) {
        if let Some(iri) = doc
            .value(FIELD_LANGUAGE)
            .and_then(|code| self.vocabulary.language_iri(code))
        {
            node.add_reference(property::HAS_LANGUAGE, iri);
        }
    }

    fn default_license(&self) -> Option<String> {
        self.config
            .project
            .default_license
            .as_deref()
            .and_then(|name| self.vocabulary.license(name))
    }

    fn add_hosting(&mut self, node: &mut ResourceNode, agents: &mut Vec<ResourceNode>) {
        if let Some(hosting) = self.config.project.hosting.clone() {
            self.add_agent_values(node, agents, property::HAS_HOSTING, &hosting);
        }
    }

    /// `;`-separated agents: URIs are referenced, names become organisations.
    fn add_agent_values(
        &mut self,
        node: &mut ResourceNode,
        agents: &mut Vec<ResourceNode>,
        agent_property: &str,
        raw: &str,
    ) {
        for value in raw.split(';').map(str::trim).filter(|v| !v.is_empty()) {
            if is_absolute_uri(value) {
                node.add_reference(agent_property, value);
            } else if let Some(id) =
                self.mint_agent(ResourceType::Organisation, value, None, None, agents)
            {
                node.add_reference(agent_property, id);
            }
        }
    }

    fn mint_agent(
        &mut self,
        resource_type: ResourceType,
        display_name: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        agents: &mut Vec<ResourceNode>,
    ) -> Option<String> {
        let id = self.ids.agent(display_name)?;
        if self.minted_agents.insert(id.clone()) {
            let mut agent = ResourceNode::new(id.clone(), resource_type);
            agent.add_lang(property::HAS_TITLE, display_name, AGENT_NAME_LANGUAGE);
            if let Some(first) = first_name.map(str::trim).filter(|f| !f.is_empty()) {
                agent.add_plain(property::HAS_FIRST_NAME, first);
            }
            if let Some(last) = last_name.map(str::trim).filter(|l| !l.is_empty()) {
                agent.add_plain(property::HAS_LAST_NAME, last);
            }
            debug!(identifier = %id, kind = ?resource_type, "[BUILD] Minted agent");
            agents.push(agent);
        }
        Some(id)
    }
}

fn add_date(node: &mut ResourceNode, doc: &DocStruct) {
    let date = doc
        .value(FIELD_DATE_OF_ORIGIN)
        .or_else(|| doc.value(FIELD_PUBLICATION_YEAR));
    if let Some(date) = date {
        if let Some(statement) = date_statement(date) {
            node.push(statement);
        }
        for note in date_notes(date) {
            node.push(note);
        }
    }
}

fn assemble(node: ResourceNode, agents: Vec<ResourceNode>) -> Graph {
    let mut graph = Graph::new(node);
    for agent in agents {
        graph.push_agent(agent);
    }
    graph
}

/// Build every graph of one process, in upload order.
///
/// Fails with an input error when a mandatory field or the master folder is
/// missing, or when two resources would share an identifier.
pub fn build_export(
    ctx: &ProcessContext,
    config: &ExportConfig,
    vocabulary: &Vocabulary,
) -> Result<Vec<Graph>, BuildError> {
    let mut builder = GraphBuilder::new(ctx, config, vocabulary)?;
    let master = ctx
        .folder(FOLDER_MASTER)
        .ok_or_else(|| BuildError::MissingFolder(FOLDER_MASTER.to_string()))?;
    debug!(folder = %master.name, files = master.files.len(), "[BUILD] Master folder present");

    let top = builder.build_top_collection(ctx)?;
    let collection = builder.build_collection(ctx, top.primary())?;

    let (volume_doc, anchor_doc) = ctx.logical_nodes();
    let anchor = match anchor_doc {
        Some(doc) => Some(builder.build_publication(doc, None)?),
        None => None,
    };
    let volume = builder.build_publication(volume_doc, anchor.as_ref().map(Graph::primary))?;

    let mut dependents = Vec::new();
    for path in &ctx.metadata_files {
        let is_anchor_file = file_name(path)?.contains("anchor");
        let described = match (&anchor, is_anchor_file) {
            (Some(anchor), true) => anchor.primary(),
            _ => volume.primary(),
        };
        dependents.push(builder.build_metadata(path, collection.primary(), described)?);
    }
    for kind in EXPORTED_FOLDERS {
        let Some(listing) = ctx.folder(kind) else {
            continue;
        };
        let folder = builder.build_folder(listing, collection.primary())?;
        let files = listing
            .files
            .iter()
            .map(|path| builder.build_file(listing, folder.primary(), path, collection.primary()))
            .collect::<Result<Vec<_>, _>>()?;
        dependents.push(folder);
        dependents.extend(files);
    }

    let mut graphs = vec![top, collection];
    graphs.extend(anchor);
    graphs.push(volume);
    graphs.extend(dependents);

    ensure_unique(&graphs)?;
    info!(
        process = %ctx.process_title,
        graphs = graphs.len(),
        "[BUILD] Built resource graphs"
    );
    Ok(graphs)
}

fn ensure_unique(graphs: &[Graph]) -> Result<(), BuildError> {
    let mut seen = HashSet::new();
    for node in graphs.iter().flat_map(|graph| graph.nodes()) {
        if !seen.insert(node.identifier()) {
            return Err(BuildError::DuplicateIdentifier(node.identifier().to_string()));
        }
    }
    Ok(())
}

/// Inheritable statements of a node, for checks and reporting.
pub fn inheritable_statements(node: &ResourceNode) -> Vec<&Statement> {
    node.statements()
        .iter()
        .filter(|statement| vocabulary::is_inheritable(&statement.property))
        .collect()
}
