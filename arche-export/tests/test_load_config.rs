use serial_test::serial;
use std::env;
use std::fs::{create_dir, write};
use tempfile::{tempdir, NamedTempFile};

use arche_export::load_config::{load_config, load_process};

const CONFIG_YAML: &str = r#"
repository:
  base_url: "https://arche.example.org/api"
  username: "exporter"
licenses:
  CC-BY-4.0: cc-by-4-0
project:
  viewer_url: "https://viewer.example.org/viewer"
  default_license: "CC-BY-4.0"
  subjects:
    - Kartographie
"#;

fn clear_env() {
    env::remove_var("ARCHE_USERNAME");
    env::remove_var("ARCHE_PASSWORD");
    env::remove_var("ARCHE_API_URL");
}

fn config_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), content).unwrap();
    file
}

/// A partial YAML file yields a full configuration with defaults filled in.
#[tokio::test]
#[serial]
async fn test_load_config_fills_defaults() {
    clear_env();
    let file = config_file(CONFIG_YAML);

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.repository.base_url, "https://arche.example.org/api");
    assert_eq!(config.repository.username.as_deref(), Some("exporter"));
    assert!(config.repository.password.is_none());
    assert_eq!(
        config.vocabulary.identifier_prefix,
        "https://id.acdh.oeaw.ac.at/"
    );
    assert_eq!(config.languages.get("de").map(String::as_str), Some("deu"));
    assert_eq!(config.licenses.get("CC-BY-4.0").map(String::as_str), Some("cc-by-4-0"));
    assert_eq!(config.project.default_language, "de");
    assert_eq!(config.project.subjects, vec!["Kartographie".to_string()]);
}

/// Credentials and the base URL come from the environment when set.
#[tokio::test]
#[serial]
async fn test_load_config_applies_environment_overrides() {
    clear_env();
    env::set_var("ARCHE_USERNAME", "robot");
    env::set_var("ARCHE_PASSWORD", "s3cret");
    env::set_var("ARCHE_API_URL", "http://localhost:8080/api");
    let file = config_file(CONFIG_YAML);

    let config = load_config(file.path()).expect("Config should load");
    clear_env();

    assert_eq!(config.repository.base_url, "http://localhost:8080/api");
    assert_eq!(config.repository.username.as_deref(), Some("robot"));
    assert_eq!(config.repository.password.as_deref(), Some("s3cret"));
    let debug = format!("{:?}", config.repository);
    assert!(!debug.contains("s3cret"), "password leaked into debug output: {debug}");
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let file = config_file("not-yaml: [:::");

    let err = load_config(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_missing_file() {
    clear_env();
    let err = load_config("/nonexistent/export.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_load_process_lists_folder_paths_sorted() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    create_dir(&images).unwrap();
    write(images.join("AC123_master_0002.tif"), b"2").unwrap();
    write(images.join("AC123_master_0001.tif"), b"1").unwrap();
    create_dir(images.join("thumbs")).unwrap();
    write(dir.path().join("meta.xml"), b"<mets/>").unwrap();

    let process_yaml = r#"
process_id: 4711
process_title: Alpenpost
project:
  title: woldan
properties:
  owner: "Österreichische Nationalbibliothek"
document:
  type: Monograph
  metadata:
    - name: TitleDocMain
      value: Alpenpost
    - name: CatalogIDDigital
      value: AC123
folders:
  master:
    name: Alpenpost_master
    path: images
metadata_files:
  - meta.xml
"#;
    let process_path = dir.path().join("process.yaml");
    write(&process_path, process_yaml).unwrap();

    let ctx = load_process(&process_path).expect("Process should load");

    assert_eq!(ctx.process_title, "Alpenpost");
    assert_eq!(ctx.document.value("CatalogIDDigital"), Some("AC123"));
    assert_eq!(ctx.agent_property("owner"), Some("Österreichische Nationalbibliothek"));
    let master = ctx.folder("master").expect("master folder");
    assert_eq!(
        master.files,
        vec![
            images.join("AC123_master_0001.tif"),
            images.join("AC123_master_0002.tif"),
        ]
    );
    assert_eq!(ctx.metadata_files, vec![dir.path().join("meta.xml")]);
}

#[test]
fn test_load_process_errors_for_missing_folder() {
    let dir = tempdir().unwrap();
    let process_yaml = r#"
process_id: 1
process_title: Alpenpost
project:
  title: woldan
document:
  metadata: []
folders:
  master:
    name: Alpenpost_master
    path: does-not-exist
"#;
    let process_path = dir.path().join("process.yaml");
    write(&process_path, process_yaml).unwrap();

    let err = load_process(&process_path).unwrap_err();
    assert!(err.to_string().contains("Failed to list folder"), "{err}");
}
