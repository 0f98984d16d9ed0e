//! Vocabulary registry: the fixed ARCHE property catalogue plus the per-deployment
//! language and license tables.
//!
//! Statements carry the *local* property name (`hasTitle`, `isPartOf`, ...). The
//! [`Vocabulary`] expands those names against the configured namespace when a graph
//! is serialised, and resolves controlled-vocabulary values (languages, licenses,
//! lifecycle states) to their URIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// XSD datatypes used for typed literals.
pub mod xsd {
    pub const ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const G_YEAR: &str = "http://www.w3.org/2001/XMLSchema#gYear";
}

/// Local names of every property the exporter emits.
pub mod property {
    pub const HAS_TITLE: &str = "hasTitle";
    pub const HAS_ALTERNATIVE_TITLE: &str = "hasAlternativeTitle";
    pub const HAS_IDENTIFIER: &str = "hasIdentifier";
    pub const HAS_NON_LINKED_IDENTIFIER: &str = "hasNonLinkedIdentifier";
    pub const HAS_PID: &str = "hasPid";
    pub const HAS_URL: &str = "hasUrl";
    pub const HAS_DESCRIPTION: &str = "hasDescription";
    pub const HAS_LANGUAGE: &str = "hasLanguage";
    pub const HAS_LIFE_CYCLE_STATUS: &str = "hasLifeCycleStatus";
    pub const HAS_EXTENT: &str = "hasExtent";
    pub const HAS_NOTE: &str = "hasNote";
    pub const HAS_DATE: &str = "hasDate";
    pub const HAS_SUBJECT: &str = "hasSubject";
    pub const HAS_USED_SOFTWARE: &str = "hasUsedSoftware";
    pub const HAS_RELATED_DISCIPLINE: &str = "hasRelatedDiscipline";
    pub const RELATION: &str = "relation";
    pub const IS_PART_OF: &str = "isPartOf";
    pub const IS_METADATA_FOR: &str = "isMetadataFor";
    pub const HAS_PUBLISHER: &str = "hasPublisher";
    pub const HAS_CITY: &str = "hasCity";
    pub const HAS_FIRST_NAME: &str = "hasFirstName";
    pub const HAS_LAST_NAME: &str = "hasLastName";

    pub const HAS_AUTHOR: &str = "hasAuthor";
    pub const HAS_EDITOR: &str = "hasEditor";
    pub const HAS_CONTRIBUTOR: &str = "hasContributor";

    pub const HAS_CONTACT: &str = "hasContact";
    pub const HAS_DIGITISING_AGENT: &str = "hasDigitisingAgent";
    pub const HAS_CURATOR: &str = "hasCurator";
    pub const HAS_DEPOSITOR: &str = "hasDepositor";
    pub const HAS_HOSTING: &str = "hasHosting";
    pub const HAS_LICENSE: &str = "hasLicense";
    pub const HAS_LICENSOR: &str = "hasLicensor";
    pub const HAS_METADATA_CREATOR: &str = "hasMetadataCreator";
    pub const HAS_OWNER: &str = "hasOwner";
    pub const HAS_RIGHTS_HOLDER: &str = "hasRightsHolder";
}

/// Properties copied verbatim from a Collection to the Folder, FileResource and
/// Metadata nodes beneath it.
pub const INHERITABLE: [&str; 9] = [
    property::HAS_CURATOR,
    property::HAS_DEPOSITOR,
    property::HAS_HOSTING,
    property::HAS_LICENSE,
    property::HAS_LICENSOR,
    property::HAS_METADATA_CREATOR,
    property::HAS_OWNER,
    property::HAS_RIGHTS_HOLDER,
    property::HAS_DATE,
];

pub fn is_inheritable(property: &str) -> bool {
    INHERITABLE.contains(&property)
}

/// Workflow property name → agent property, used for the process/project fallbacks.
pub const AGENT_PROPERTIES: [(&str, &str); 8] = [
    ("contact", property::HAS_CONTACT),
    ("digitisingAgent", property::HAS_DIGITISING_AGENT),
    ("owner", property::HAS_OWNER),
    ("rightsHolder", property::HAS_RIGHTS_HOLDER),
    ("licensor", property::HAS_LICENSOR),
    ("depositor", property::HAS_DEPOSITOR),
    ("curator", property::HAS_CURATOR),
    ("metadataCreator", property::HAS_METADATA_CREATOR),
];

/// The single primary type tag of a resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    TopCollection,
    Collection,
    Publication,
    Metadata,
    Folder,
    FileResource,
    Person,
    Organisation,
}

impl ResourceType {
    /// Class name in the repository schema. Folders are collections and files are
    /// plain resources on the wire.
    pub fn class_name(self) -> &'static str {
        match self {
            ResourceType::TopCollection => "TopCollection",
            ResourceType::Collection | ResourceType::Folder => "Collection",
            ResourceType::Publication => "Publication",
            ResourceType::Metadata => "Metadata",
            ResourceType::FileResource => "Resource",
            ResourceType::Person => "Person",
            ResourceType::Organisation => "Organisation",
        }
    }

    /// Node types that receive the Collection's inheritable statements.
    pub fn inherits(self) -> bool {
        matches!(
            self,
            ResourceType::Folder | ResourceType::FileResource | ResourceType::Metadata
        )
    }
}

/// Lifecycle states of the `archelifecyclestatus` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycleStatus {
    Active,
    Completed,
}

impl LifeCycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LifeCycleStatus::Active => "active",
            LifeCycleStatus::Completed => "completed",
        }
    }
}

/// A resolved language: the two-letter tag used for language-tagged literals and
/// the three-letter code used for the `hasLanguage` concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub two_letter: String,
    pub three_letter: String,
}

/// Two-letter ⇄ three-letter language code table.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    by_two_letter: BTreeMap<String, String>,
}

impl LanguageTable {
    pub fn new(table: &BTreeMap<String, String>) -> Self {
        let by_two_letter = table
            .iter()
            .map(|(two, three)| (two.trim().to_lowercase(), three.trim().to_lowercase()))
            .collect();
        Self { by_two_letter }
    }

    /// Resolve either form of a code. Unknown codes yield `None`.
    pub fn resolve(&self, code: &str) -> Option<Language> {
        let code = code.trim().to_lowercase();
        if let Some(three) = self.by_two_letter.get(&code) {
            return Some(Language {
                two_letter: code,
                three_letter: three.clone(),
            });
        }
        self.by_two_letter
            .iter()
            .find(|(_, three)| **three == code)
            .map(|(two, three)| Language {
                two_letter: two.clone(),
                three_letter: three.clone(),
            })
    }
}

/// License name → controlled-vocabulary URI.
#[derive(Debug, Clone, Default)]
pub struct LicenseTable {
    by_name: BTreeMap<String, String>,
}

impl LicenseTable {
    /// Relative table entries are resolved against the license vocabulary base.
    pub fn new(table: &BTreeMap<String, String>, vocabulary_base: &str) -> Self {
        let by_name = table
            .iter()
            .map(|(name, uri)| {
                let uri = if is_absolute_uri(uri) {
                    uri.clone()
                } else {
                    format!("{vocabulary_base}{uri}")
                };
                (name.trim().to_string(), uri)
            })
            .collect();
        Self { by_name }
    }

    /// A value that already is a URI is passed through; otherwise the table decides.
    pub fn resolve(&self, license: &str) -> Option<String> {
        let license = license.trim();
        if is_absolute_uri(license) {
            return Some(license.to_string());
        }
        self.by_name.get(license).cloned()
    }
}

/// The registry handed to the builder and the serialiser.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    namespace: String,
    language_vocabulary: String,
    lifecycle_vocabulary: String,
    languages: LanguageTable,
    licenses: LicenseTable,
}

impl Vocabulary {
    pub fn from_config(config: &ExportConfig) -> Self {
        let vocabulary = &config.vocabulary;
        Self {
            namespace: vocabulary.namespace.clone(),
            language_vocabulary: vocabulary.language_vocabulary.clone(),
            lifecycle_vocabulary: vocabulary.lifecycle_vocabulary.clone(),
            languages: LanguageTable::new(&config.languages),
            licenses: LicenseTable::new(&config.licenses, &vocabulary.license_vocabulary),
        }
    }

    /// Full IRI of a property given its local name.
    pub fn property(&self, local_name: &str) -> String {
        format!("{}{}", self.namespace, local_name)
    }

    /// Full IRI of the schema class for a node type.
    pub fn class(&self, resource_type: ResourceType) -> String {
        format!("{}{}", self.namespace, resource_type.class_name())
    }

    pub fn language(&self, code: &str) -> Option<Language> {
        self.languages.resolve(code)
    }

    pub fn language_concept(&self, language: &Language) -> String {
        format!("{}{}", self.language_vocabulary, language.three_letter)
    }

    /// Concept IRI for a language code. A three-letter code missing from the
    /// table (e.g. the bibliographic `ger`) is taken as an ISO 639-3 code.
    pub fn language_iri(&self, code: &str) -> Option<String> {
        if let Some(language) = self.language(code) {
            return Some(self.language_concept(&language));
        }
        let code = code.trim().to_ascii_lowercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase()) {
            Some(format!("{}{code}", self.language_vocabulary))
        } else {
            None
        }
    }

    pub fn license(&self, name: &str) -> Option<String> {
        self.licenses.resolve(name)
    }

    pub fn lifecycle(&self, status: LifeCycleStatus) -> String {
        format!("{}{}", self.lifecycle_vocabulary, status.as_str())
    }
}

pub(crate) fn is_absolute_uri(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
