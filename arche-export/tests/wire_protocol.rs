use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Bytes};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

use arche_export::upload::{ArcheClient, TRANSACTION_HEADER};
use arche_export_core::config::{ExportConfig, RepositoryConfig};
use arche_export_core::contract::{BinaryPayload, ContentType, Repository};
use arche_export_core::document::{DocStruct, FolderListing, ProcessContext, ProjectInfo};
use arche_export_core::synchronise::export;

const HAS_IDENTIFIER: &str = "https://vocabs.acdh.oeaw.ac.at/schema#hasIdentifier";
const TURTLE: &str = "<https://id.acdh.oeaw.ac.at/woldan> <https://vocabs.acdh.oeaw.ac.at/schema#hasTitle> \"woldan\"@und .\n";

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let url = reqwest::Url::parse(&format!(
            "http://stub/?{}",
            self.query.as_deref().unwrap_or_default()
        ))
        .unwrap();
        url.query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }
}

/// Minimal ARCHE endpoint set that records every request it receives.
///
/// New resources get ids from 11 upwards. With `existing` set, every create is
/// answered with 409 and every search finds resource 900.
#[derive(Clone)]
struct StubRepository {
    base: String,
    existing: bool,
    next_id: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubRepository {
    fn api(&self) -> String {
        format!("{}/api", self.base)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, request: &Recorded) -> Response {
        let api = self.api();
        let resource = request.path.strip_prefix("/api/").unwrap_or_default();
        match (&request.method, resource) {
            (&Method::POST, "transaction") => (
                StatusCode::CREATED,
                [(CONTENT_TYPE, "application/json")],
                r#"{"transactionId":42}"#,
            )
                .into_response(),
            (&Method::PUT, "transaction") | (&Method::DELETE, "transaction") => {
                StatusCode::NO_CONTENT.into_response()
            }
            (&Method::POST, "metadata") if self.existing => {
                (StatusCode::CONFLICT, "Duplicated resource identifier").into_response()
            }
            (&Method::POST, "metadata") => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::CREATED,
                    [(LOCATION, format!("{api}/{id}/metadata"))],
                    "",
                )
                    .into_response()
            }
            (&Method::GET, "search") => {
                let pairs = request.query_pairs();
                let lookup = |key: &str| {
                    pairs
                        .iter()
                        .find(|(name, _)| name == key)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default()
                };
                let body = format!("<{api}/900> <{}> <{}> .\n", lookup("property[]"), lookup("value[]"));
                (StatusCode::OK, [(CONTENT_TYPE, "text/turtle")], body).into_response()
            }
            (&Method::PATCH, path) if path.ends_with("/metadata") => StatusCode::OK.into_response(),
            (&Method::PUT, _) => StatusCode::NO_CONTENT.into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

async fn record(State(stub): State<StubRepository>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let recorded = Recorded {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body: to_bytes(body, usize::MAX).await.unwrap_or_default(),
    };
    let response = stub.answer(&recorded);
    stub.requests.lock().unwrap().push(recorded);
    response
}

async fn start_stub(existing: bool) -> StubRepository {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let stub = StubRepository {
        base: format!("http://{addr}"),
        existing,
        next_id: Arc::new(AtomicU64::new(11)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new().fallback(record).with_state(stub.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    stub
}

fn client(stub: &StubRepository) -> ArcheClient {
    ArcheClient::new(&RepositoryConfig {
        base_url: stub.api(),
        username: Some("exporter".to_string()),
        password: Some("secret".to_string()),
    })
    .unwrap()
}

fn alpenpost(dir: &std::path::Path) -> ProcessContext {
    let image = dir.join("AC123_master_0001.tif");
    std::fs::write(&image, b"tiff bytes").unwrap();
    let mut ctx = ProcessContext {
        process_id: 4711,
        process_title: "Alpenpost".to_string(),
        project: ProjectInfo {
            title: "woldan".to_string(),
            ..Default::default()
        },
        document: DocStruct::default()
            .with_metadata("TitleDocMain", "Alpenpost")
            .with_metadata("CatalogIDDigital", "AC123"),
        ..Default::default()
    };
    ctx.folders.insert(
        "master".to_string(),
        FolderListing {
            name: "Alpenpost_master".to_string(),
            path: None,
            files: vec![image],
        },
    );
    ctx
}

#[tokio::test]
async fn begin_posts_to_transaction_endpoint_with_basic_auth() {
    let stub = start_stub(false).await;
    let response = client(&stub).begin_transaction().await.unwrap();

    assert_eq!(response.status, 201);
    assert!(response.body.contains("42"));
    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/api/transaction");
    assert_eq!(requests[0].header("accept"), Some("application/json"));
    assert!(requests[0]
        .header("authorization")
        .is_some_and(|value| value.starts_with("Basic ")));
    assert!(requests[0].header(TRANSACTION_HEADER).is_none());
}

#[tokio::test]
async fn metadata_calls_send_turtle_inside_the_transaction() {
    let stub = start_stub(false).await;
    let client = client(&stub);

    let created = client.create_metadata("42", TURTLE.to_string()).await.unwrap();
    assert_eq!(created.status, 201);
    assert_eq!(created.location, Some(format!("{}/11/metadata", stub.api())));

    let uri = format!("{}/11", stub.api());
    let updated = client.update_metadata("42", &uri, TURTLE.to_string()).await.unwrap();
    assert_eq!(updated.status, 200);

    let requests = stub.requests();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/api/metadata");
    assert_eq!(requests[1].method, Method::PATCH);
    assert_eq!(requests[1].path, "/api/11/metadata");
    for request in &requests {
        assert_eq!(request.header(TRANSACTION_HEADER), Some("42"));
        assert_eq!(request.header("content-type"), Some("text/turtle"));
        assert_eq!(request.header("accept"), Some("text/turtle"));
        assert_eq!(request.body.as_ref(), TURTLE.as_bytes());
    }
}

#[tokio::test]
async fn search_passes_value_and_property_as_query_parameters() {
    let stub = start_stub(false).await;
    let identifier = "https://id.acdh.oeaw.ac.at/woldan/Alpenpost";

    let response = client(&stub).search(HAS_IDENTIFIER, identifier).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains(&format!("{}/900", stub.api())));
    let requests = stub.requests();
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, "/api/search");
    assert_eq!(requests[0].header("accept"), Some("text/turtle"));
    assert_eq!(
        requests[0].query_pairs(),
        vec![
            ("value[]".to_string(), identifier.to_string()),
            ("property[]".to_string(), HAS_IDENTIFIER.to_string()),
        ]
    );
}

#[tokio::test]
async fn binary_is_put_to_the_resource_with_type_and_file_name() {
    let stub = start_stub(false).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AC123_master_0001.tif");
    std::fs::write(&path, b"tiff bytes").unwrap();
    let payload = BinaryPayload {
        file_name: "AC123_master_0001.tif".to_string(),
        content_type: ContentType::Tiff,
        length: 10,
        file: tokio::fs::File::open(&path).await.unwrap(),
    };

    let uri = format!("{}/11", stub.api());
    let response = client(&stub).put_binary("42", &uri, payload).await.unwrap();

    assert_eq!(response.status, 204);
    let request = &stub.requests()[0];
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path, "/api/11");
    assert_eq!(request.header(TRANSACTION_HEADER), Some("42"));
    assert_eq!(request.header("content-type"), Some("image/tiff"));
    assert_eq!(request.header("content-length"), Some("10"));
    assert_eq!(
        request.header("content-disposition"),
        Some("attachment; filename=\"AC123_master_0001.tif\"")
    );
    assert_eq!(request.body.as_ref(), b"tiff bytes");
}

#[tokio::test]
async fn commit_and_rollback_address_the_transaction_endpoint() {
    let stub = start_stub(false).await;
    let client = client(&stub);

    assert_eq!(client.commit_transaction("42").await.unwrap().status, 204);
    assert_eq!(client.rollback_transaction("42").await.unwrap().status, 204);

    let calls: Vec<(Method, String, Option<String>)> = stub
        .requests()
        .into_iter()
        .map(|r| {
            let token = r.header(TRANSACTION_HEADER).map(str::to_string);
            (r.method, r.path, token)
        })
        .collect();
    assert_eq!(
        calls,
        vec![
            (Method::PUT, "/api/transaction".to_string(), Some("42".to_string())),
            (Method::DELETE, "/api/transaction".to_string(), Some("42".to_string())),
        ]
    );
}

#[tokio::test]
async fn export_over_http_creates_uploads_and_commits() {
    let stub = start_stub(false).await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = alpenpost(dir.path());
    let config = ExportConfig::for_repository(stub.api());

    let report = export(&ctx, &config, &client(&stub)).await.unwrap();

    assert_eq!(report.transaction_id, 42);
    assert_eq!(report.created(), 5);
    let requests: Vec<(Method, String)> = stub
        .requests()
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    let metadata = (Method::POST, "/api/metadata".to_string());
    assert_eq!(
        requests,
        vec![
            (Method::POST, "/api/transaction".to_string()),
            metadata.clone(),
            metadata.clone(),
            metadata.clone(),
            metadata.clone(),
            metadata,
            (Method::PUT, "/api/15".to_string()),
            (Method::PUT, "/api/transaction".to_string()),
        ]
    );
    assert!(stub
        .requests()
        .iter()
        .skip(1)
        .all(|r| r.header(TRANSACTION_HEADER) == Some("42")));
}

#[tokio::test]
async fn export_over_http_updates_resources_found_by_identifier() {
    let stub = start_stub(true).await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = alpenpost(dir.path());
    let config = ExportConfig::for_repository(stub.api());

    let report = export(&ctx, &config, &client(&stub)).await.unwrap();

    assert_eq!(report.updated(), 5);
    let requests = stub.requests();
    let searches: Vec<&Recorded> = requests.iter().filter(|r| r.method == Method::GET).collect();
    assert_eq!(searches.len(), 5);
    assert!(searches[0]
        .query_pairs()
        .contains(&("property[]".to_string(), HAS_IDENTIFIER.to_string())));
    assert_eq!(
        requests
            .iter()
            .filter(|r| r.method == Method::PATCH && r.path == "/api/900/metadata")
            .count(),
        5
    );
    assert!(requests
        .iter()
        .any(|r| r.method == Method::PUT && r.path == "/api/900"));
}
