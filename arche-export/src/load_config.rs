/// `load_config` module: reads the YAML export configuration and the process
/// description, and injects repository credentials from the environment.
///
/// This is the only place where user-supplied YAML is parsed into the core's
/// strongly-typed [`ExportConfig`] and [`ProcessContext`].
///
/// # Environment
/// - `ARCHE_USERNAME`, `ARCHE_PASSWORD`: repository credentials (never put them in YAML)
/// - `ARCHE_API_URL`: overrides `repository.base_url`
///
/// # Errors
/// All errors use `anyhow::Error` with the offending path in the message and
/// are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use arche_export_core::config::ExportConfig;
use arche_export_core::document::ProcessContext;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ENV_USERNAME: &str = "ARCHE_USERNAME";
pub const ENV_PASSWORD: &str = "ARCHE_PASSWORD";
pub const ENV_API_URL: &str = "ARCHE_API_URL";

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Loads the YAML export configuration and applies the environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExportConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let mut config: ExportConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    if let Some(base_url) = env_value(ENV_API_URL) {
        info!(base_url = %base_url, "Repository base URL overridden from environment");
        config.repository.base_url = base_url;
    }
    if let Some(username) = env_value(ENV_USERNAME) {
        config.repository.username = Some(username);
    }
    if let Some(password) = env_value(ENV_PASSWORD) {
        config.repository.password = Some(password);
    }

    config.trace_loaded();
    Ok(config)
}

/// Loads a process description (YAML or JSON). Relative paths are resolved
/// against the description's directory; a folder given only by `path` is listed,
/// regular files only, sorted by name.
pub fn load_process<P: AsRef<Path>>(path: P) -> Result<ProcessContext> {
    let path_ref = path.as_ref();
    info!(process_path = ?path_ref, "Loading process description");

    let content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read process file {:?}", path_ref))?;
    let mut ctx: ProcessContext = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse process file {:?}", path_ref))?;

    let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
    for listing in ctx.folders.values_mut() {
        if listing.files.is_empty() {
            if let Some(dir) = &listing.path {
                let dir = resolve(base, dir);
                listing.files = list_files(&dir)?;
            }
        } else {
            listing.files = listing.files.iter().map(|file| resolve(base, file)).collect();
        }
    }
    ctx.metadata_files = ctx
        .metadata_files
        .iter()
        .map(|file| resolve(base, file))
        .collect();

    info!(
        process = %ctx.process_title,
        folders = ctx.folders.len(),
        master_images = ctx.master_image_count(),
        "Loaded process description"
    );
    Ok(ctx)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list folder {:?}", dir))? {
        let entry = entry.with_context(|| format!("Failed to list folder {:?}", dir))?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
