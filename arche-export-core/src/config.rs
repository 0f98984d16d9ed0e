use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

pub const ARCHE_NAMESPACE: &str = "https://vocabs.acdh.oeaw.ac.at/schema#";
pub const ARCHE_IDENTIFIER_PREFIX: &str = "https://id.acdh.oeaw.ac.at/";

/// Everything one export run needs besides the process itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    /// Two-letter → three-letter language codes.
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, String>,
    /// License name (as found in `AccessLicense`) → vocabulary URI or suffix.
    #[serde(default)]
    pub licenses: BTreeMap<String, String>,
    #[serde(default)]
    pub project: ProjectDefaults,
}

impl ExportConfig {
    /// A configuration with every optional section at its default.
    pub fn for_repository(base_url: impl Into<String>) -> Self {
        Self {
            repository: RepositoryConfig {
                base_url: base_url.into(),
                username: None,
                password: None,
            },
            vocabulary: VocabularyConfig::default(),
            languages: default_languages(),
            licenses: BTreeMap::new(),
            project: ProjectDefaults::default(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.repository.base_url,
            identifier_prefix = %self.vocabulary.identifier_prefix,
            languages = self.languages.len(),
            licenses = self.licenses.len(),
            "Loaded ExportConfig"
        );
        debug!(?self, "ExportConfig loaded (full debug)");
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub namespace: String,
    pub identifier_prefix: String,
    pub language_vocabulary: String,
    pub license_vocabulary: String,
    pub lifecycle_vocabulary: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            namespace: ARCHE_NAMESPACE.to_string(),
            identifier_prefix: ARCHE_IDENTIFIER_PREFIX.to_string(),
            language_vocabulary: "https://vocabs.acdh.oeaw.ac.at/iso6393/".to_string(),
            license_vocabulary: "https://vocabs.acdh.oeaw.ac.at/archelicenses/".to_string(),
            lifecycle_vocabulary: "https://vocabs.acdh.oeaw.ac.at/archelifecyclestatus/"
                .to_string(),
        }
    }
}

/// Deployment-wide values used on the top collection and as fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDefaults {
    /// Viewer root; the process URL appends the catalogue identifier.
    pub viewer_url: Option<String>,
    /// Catalogue permalink base, e.g. `https://permalink.obvsg.at/`.
    pub catalogue_permalink: Option<String>,
    /// Hosting agent (URI or organisation name).
    pub hosting: Option<String>,
    pub default_license: Option<String>,
    /// Tag for language-tagged literals when the document language is unknown.
    pub default_language: String,
    pub used_software: Option<String>,
    pub related_disciplines: Vec<String>,
    pub subjects: Vec<String>,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            viewer_url: None,
            catalogue_permalink: None,
            hosting: None,
            default_license: None,
            default_language: "de".to_string(),
            used_software: Some("Goobi".to_string()),
            related_disciplines: Vec::new(),
            subjects: Vec::new(),
        }
    }
}

pub fn default_languages() -> BTreeMap<String, String> {
    [
        ("de", "deu"),
        ("en", "eng"),
        ("fr", "fra"),
        ("it", "ita"),
        ("la", "lat"),
        ("cs", "ces"),
        ("hu", "hun"),
        ("pl", "pol"),
    ]
    .into_iter()
    .map(|(two, three)| (two.to_string(), three.to_string()))
    .collect()
}
