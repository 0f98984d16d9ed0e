//! Hierarchical resource identifiers.
//!
//! `prefix + project + "/" + process [+ "/" + child [+ "/" + file]]`
//!
//! Minted agents live under `prefix + "agents/" + slug`, apart from projects.
//!
//! Segments are percent-encoded where IRIs forbid the character (and `%` itself,
//! so encoding stays injective). A segment must not be blank or contain `/`,
//! otherwise two positions in the hierarchy could produce the same string.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::BuildError;

/// Sub-namespace of minted Person/Organisation identifiers.
pub const AGENT_NAMESPACE: &str = "agents/";

/// Position of a resource in the export hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Project,
    Process,
    /// Direct child of the process: folder, publication or metadata file.
    Child(&'a str),
    File { folder: &'a str, file: &'a str },
}

#[derive(Debug, Clone)]
pub struct IdentifierScheme {
    prefix: String,
    project: String,
    process: String,
}

impl IdentifierScheme {
    pub fn new(prefix: &str, project_title: &str, process_title: &str) -> Result<Self, BuildError> {
        Ok(Self {
            prefix: prefix.to_string(),
            project: encode_segment(project_title)?,
            process: encode_segment(process_title)?,
        })
    }

    pub fn identifier(&self, scope: Scope<'_>) -> Result<String, BuildError> {
        let top = format!("{}{}", self.prefix, self.project);
        let id = match scope {
            Scope::Project => top,
            Scope::Process => format!("{top}/{}", self.process),
            Scope::Child(child) => format!("{top}/{}/{}", self.process, encode_segment(child)?),
            Scope::File { folder, file } => format!(
                "{top}/{}/{}/{}",
                self.process,
                encode_segment(folder)?,
                encode_segment(file)?
            ),
        };
        Ok(id)
    }

    /// Identifier of a minted agent, derived from its normalised display name.
    pub fn agent(&self, display_name: &str) -> Option<String> {
        let slug = normalize_name(display_name);
        if slug.is_empty() {
            None
        } else {
            Some(format!("{}{AGENT_NAMESPACE}{slug}", self.prefix))
        }
    }
}

fn encode_segment(segment: &str) -> Result<String, BuildError> {
    let trimmed = segment.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err(BuildError::InvalidSegment(segment.to_string()));
    }
    let mut encoded = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            ' ' | '%' | '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`' => {
                encoded.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
            c => encoded.push(c),
        }
    }
    Ok(encoded)
}

/// Lower-case the name and collapse every run of non-alphanumerics to a single `-`.
pub fn normalize_name(name: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"));
    separators
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}
