//! 端到端流程测试
//!
//! 使用 axum 启动一个内存版 WebDAV 服务和令牌端点，
//! 验证真实 HTTP 请求下的 上传 -> 下载 -> 删除 流程。

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::{post, put};
use axum::{Form, Json, Router};
use serde_json::{Value, json};

use dav_scenario::account::Account;
use dav_scenario::asset::Asset;
use dav_scenario::credential::OidcTokenExchange;
use dav_scenario::driver::{RunOptions, ScenarioDriver};
use dav_scenario::error::ScenarioError;
use dav_scenario::playbook::DavPlaybook;
use dav_scenario::scenario::{IterationState, ScenarioExecutor, ScenarioSettings, setup};

#[derive(Debug, Clone)]
struct LoggedRequest {
    method: &'static str,
    file: String,
    authorization: Option<String>,
}

#[derive(Default)]
struct FakeDav {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    requests: Mutex<Vec<LoggedRequest>>,
    token_requests: Mutex<usize>,
}

impl FakeDav {
    fn record(&self, method: &'static str, file: &str, headers: &HeaderMap) {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(LoggedRequest {
            method,
            file: file.to_string(),
            authorization,
        });
    }

    fn requests(&self) -> Vec<LoggedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

type Shared = Arc<FakeDav>;

async fn put_file(
    State(dav): State<Shared>,
    Path((user, file)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    dav.record("PUT", &file, &headers);
    if user == "readonly" {
        return StatusCode::FORBIDDEN;
    }
    dav.files.lock().unwrap().insert((user, file), body.to_vec());
    StatusCode::CREATED
}

async fn get_file(
    State(dav): State<Shared>,
    Path((user, file)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Vec<u8>, StatusCode> {
    dav.record("GET", &file, &headers);
    dav.files
        .lock()
        .unwrap()
        .get(&(user, file))
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_file(
    State(dav): State<Shared>,
    Path((user, file)): Path<(String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    dav.record("DELETE", &file, &headers);
    match dav.files.lock().unwrap().remove(&(user, file)) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn issue_token(
    State(dav): State<Shared>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    *dav.token_requests.lock().unwrap() += 1;

    let valid = form.get("grant_type").map(String::as_str) == Some("password")
        && form.get("client_id").map(String::as_str) == Some("web")
        && form.get("username").map(String::as_str) == Some("einstein")
        && form.get("password").map(String::as_str) == Some("relativity");
    if !valid {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Json(json!({
        "access_token": "token-einstein",
        "token_type": "Bearer",
        "expires_in": 300
    })))
}

async fn start_server() -> (String, Shared) {
    let dav: Shared = Arc::new(FakeDav::default());
    let app = Router::new()
        .route(
            "/remote.php/dav/files/{user}/{file}",
            put(put_file).get(get_file).delete(delete_file),
        )
        .route("/konnect/v1/token", post(issue_token))
        .with_state(dav.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), dav)
}

fn executor(base_url: &str, user_name: &str) -> ScenarioExecutor {
    executor_with_asset(base_url, user_name, "testfile.bin")
}

fn executor_with_asset(base_url: &str, user_name: &str, asset: &str) -> ScenarioExecutor {
    let playbook = Arc::new(DavPlaybook::new(reqwest::Client::new(), base_url));
    ScenarioExecutor::new(
        playbook,
        Arc::new(ScenarioSettings {
            user_name: user_name.to_string(),
            asset: Arc::new(Asset::new(asset, vec![7u8; 2048])),
            pacing: Duration::ZERO,
        }),
    )
}

fn token_exchange(base_url: &str) -> OidcTokenExchange {
    OidcTokenExchange::new(
        reqwest::Client::new(),
        format!("{base_url}/konnect/v1/token"),
        "web",
        "openid profile email",
    )
}

#[tokio::test]
async fn test_iteration_with_basic_auth() {
    let (base_url, dav) = start_server().await;
    let account = Account::new("einstein", "relativity");

    let context = setup(&token_exchange(&base_url), &account, false)
        .await
        .unwrap();
    let report = executor(&base_url, "einstein")
        .run_iteration(&context)
        .await
        .unwrap();

    assert_eq!(report.state, IterationState::Done);
    assert!(report.file_name.as_str().starts_with("testfile.bin-"));

    let requests = dav.requests();
    let methods: Vec<_> = requests.iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["PUT", "GET", "DELETE"]);
    for request in &requests {
        assert_eq!(request.file, report.file_name.as_str());
        assert_eq!(
            request.authorization.as_deref(),
            Some("Basic ZWluc3RlaW46cmVsYXRpdml0eQ==")
        );
    }

    assert!(dav.files.lock().unwrap().is_empty());
    assert_eq!(*dav.token_requests.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_reserved_characters_stay_in_file_name() {
    let (base_url, dav) = start_server().await;
    let account = Account::new("einstein", "relativity");

    let context = setup(&token_exchange(&base_url), &account, false)
        .await
        .unwrap();
    let report = executor_with_asset(&base_url, "einstein", "notes #1?.txt")
        .run_iteration(&context)
        .await
        .unwrap();

    assert!(report.file_name.as_str().starts_with("notes #1?.txt-"));
    let requests = dav.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.file == report.file_name.as_str()));
    assert!(dav.files.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_iteration_with_token() {
    let (base_url, dav) = start_server().await;
    let account = Account::new("einstein", "relativity");

    let context = setup(&token_exchange(&base_url), &account, true)
        .await
        .unwrap();
    let executor = executor(&base_url, "einstein");
    executor.run_iteration(&context).await.unwrap();
    executor.run_iteration(&context).await.unwrap();

    assert_eq!(*dav.token_requests.lock().unwrap(), 1);
    let requests = dav.requests();
    assert_eq!(requests.len(), 6);
    assert!(
        requests
            .iter()
            .all(|r| r.authorization.as_deref() == Some("Bearer token-einstein"))
    );
}

#[tokio::test]
async fn test_setup_fails_with_wrong_password() {
    let (base_url, dav) = start_server().await;
    let account = Account::new("einstein", "wrong");

    let result = setup(&token_exchange(&base_url), &account, true).await;

    assert!(matches!(
        result,
        Err(ScenarioError::Authentication { ref login, .. }) if login == "einstein"
    ));
    assert_eq!(*dav.token_requests.lock().unwrap(), 1);
    assert!(dav.requests().is_empty());
}

#[tokio::test]
async fn test_upload_rejected_stops_iteration() {
    let (base_url, dav) = start_server().await;
    let account = Account::new("readonly", "secret");

    let context = setup(&token_exchange(&base_url), &account, false)
        .await
        .unwrap();
    let failure = executor(&base_url, "readonly")
        .run_iteration(&context)
        .await
        .unwrap_err();

    assert_eq!(failure.state, IterationState::Start);
    assert!(matches!(
        failure.error,
        ScenarioError::UnexpectedStatus { status: 403, .. }
    ));

    let methods: Vec<_> = dav.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["PUT"]);
}

#[tokio::test]
async fn test_driver_runs_all_virtual_users() {
    let (base_url, dav) = start_server().await;
    let account = Account::new("einstein", "relativity");

    let driver = ScenarioDriver::new(
        Arc::new(token_exchange(&base_url)),
        account,
        true,
        Arc::new(executor(&base_url, "einstein")),
    );
    let summary = driver
        .run(&RunOptions {
            vus: 2,
            iterations: 2,
            max_duration: None,
        })
        .await;

    assert!(summary.is_all_success());
    assert_eq!(summary.iterations_succeeded, 4);
    assert_eq!(*dav.token_requests.lock().unwrap(), 2);
    assert_eq!(dav.requests().len(), 12);
    assert!(dav.files.lock().unwrap().is_empty());
}
