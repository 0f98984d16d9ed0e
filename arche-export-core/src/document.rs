//! Input model handed over by the digitisation workflow: the process with its
//! project, the logical document tree, named folders and workflow properties.
//!
//! Everything here is plain, read-only data. It deserialises from the YAML/JSON
//! process description the CLI reads.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const FOLDER_MASTER: &str = "master";
pub const FOLDER_MEDIA: &str = "media";
pub const FOLDER_OCR: &str = "ocr";

/// Folders exported as Folder resources, in export order.
pub const EXPORTED_FOLDERS: [&str; 3] = [FOLDER_MASTER, FOLDER_MEDIA, FOLDER_OCR];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessContext {
    /// Workflow-internal process id, exported as a non-linked identifier.
    pub process_id: u64,
    pub process_title: String,
    pub project: ProjectInfo,
    /// Process-level properties (agent fallbacks, handle, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Top logical node of the document.
    pub document: DocStruct,
    /// Folder kind (`master`, `media`, `ocr`) → listing.
    #[serde(default)]
    pub folders: BTreeMap<String, FolderListing>,
    /// Internal metadata files (`meta.xml`, `meta_anchor.xml`).
    #[serde(default)]
    pub metadata_files: Vec<PathBuf>,
}

impl ProcessContext {
    /// Process property, falling back to the project property of the same name.
    pub fn agent_property(&self, name: &str) -> Option<&str> {
        non_blank(self.properties.get(name)).or_else(|| self.project.property(name))
    }

    pub fn folder(&self, kind: &str) -> Option<&FolderListing> {
        self.folders.get(kind)
    }

    /// Number of master images, used for the extent statement.
    pub fn master_image_count(&self) -> usize {
        self.folder(FOLDER_MASTER)
            .map(|folder| folder.files.len())
            .unwrap_or(0)
    }

    /// The volume (logical node carrying the bibliographic data) and, for
    /// multi-volume works, its anchor.
    pub fn logical_nodes(&self) -> (&DocStruct, Option<&DocStruct>) {
        if self.document.anchor {
            if let Some(volume) = self.document.children.first() {
                return (volume, Some(&self.document));
            }
        }
        (&self.document, None)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ProjectInfo {
    pub fn property(&self, name: &str) -> Option<&str> {
        non_blank(self.properties.get(name))
    }
}

/// One node of the logical document tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocStruct {
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub anchor: bool,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub corporates: Vec<Corporate>,
    #[serde(default)]
    pub children: Vec<DocStruct>,
}

impl DocStruct {
    /// First non-blank value of a metadata field.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.metadata
            .iter()
            .map(|entry| (entry, entry.value.trim()))
            .find(|(entry, value)| entry.name == field && !value.is_empty())
            .map(|(_, value)| value)
    }

    pub fn values<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.metadata
            .iter()
            .filter(move |entry| entry.name == field)
            .map(|entry| entry.value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn with_metadata(mut self, name: &str, value: &str) -> Self {
        self.metadata.push(MetadataEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Person {
    pub role: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// External authority record (GND, VIAF, ...).
    #[serde(default)]
    pub authority_uri: Option<String>,
}

impl Person {
    /// Explicit display name, else "Last, First", else whichever part exists.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = non_blank(self.display_name.as_ref()) {
            return Some(name.to_string());
        }
        let first = non_blank(self.first_name.as_ref());
        let last = non_blank(self.last_name.as_ref());
        match (last, first) {
            (Some(last), Some(first)) => Some(format!("{last}, {first}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corporate {
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub authority_uri: Option<String>,
}

/// A named folder and the files it contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderListing {
    /// Folder name as it appears on disk, e.g. `Alpenpost_master`.
    pub name: String,
    /// Directory to list when `files` is empty.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
