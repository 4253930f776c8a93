use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const ROUTE: &str = "/wp-json/es6-wp-rest-demo/v1/increment";

#[derive(Debug, Deserialize)]
struct IncrementResponse {
    response: String,
    data: Value,
}

struct TestServer {
    base_url: String,
    data_path: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.data_path);
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("es6_rest_demo_{tag}_{}_{}.json", std::process::id(), nanos));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(data_path: &Path) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_es6_rest_demo"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_path: data_path.to_path_buf(),
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(&unique_data_path("shared")).await);
    *guard = Some(Arc::clone(&server));
    server
}

fn cookie_client() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

fn between<'a>(html: &'a str, start: &str, end: &str) -> &'a str {
    let from = html.find(start).expect("start marker") + start.len();
    let len = html[from..].find(end).expect("end marker");
    &html[from..from + len]
}

async fn page(client: &Client, server: &TestServer) -> String {
    client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

async fn displayed(client: &Client, server: &TestServer) -> i64 {
    let html = page(client, server).await;
    between(&html, r#"<div id="es6-demo-output">"#, "</div>")
        .parse()
        .unwrap()
}

async fn page_nonce(client: &Client, server: &TestServer) -> String {
    let html = page(client, server).await;
    between(&html, r#""nonce":""#, r#"""#).to_string()
}

#[tokio::test]
async fn http_increment_bumps_stored_counter() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let before = displayed(&client, &server).await;
    let nonce = page_nonce(&client, &server).await;

    let response = client
        .post(format!("{}{ROUTE}", server.base_url))
        .header("X-WP-Nonce", nonce)
        .json(&json!({ "sum": "999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: IncrementResponse = response.json().await.unwrap();
    assert_eq!(body.response, "success");
    assert_eq!(body.data, json!(before + 1));
    assert_eq!(displayed(&client, &server).await, before + 1);
}

#[tokio::test]
async fn http_non_numeric_sum_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let before = displayed(&client, &server).await;
    let response = client
        .post(format!("{}{ROUTE}", server.base_url))
        .json(&json!({ "sum": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "rest_invalid_param");
    assert_eq!(displayed(&client, &server).await, before);
}

#[tokio::test]
async fn http_malformed_json_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let before = displayed(&client, &server).await;
    let response = client
        .post(format!("{}{ROUTE}", server.base_url))
        .header("content-type", "application/json")
        .body("{\"sum\":")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "rest_invalid_json");
    assert_eq!(displayed(&client, &server).await, before);
}

#[tokio::test]
async fn http_anonymous_request_is_allowed() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let before = displayed(&client, &server).await;
    let response = client
        .post(format!("{}{ROUTE}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: IncrementResponse = response.json().await.unwrap();
    assert_eq!(body.response, "success");
    assert_eq!(body.data, json!(before + 1));
}

#[tokio::test]
async fn http_forged_nonce_is_forbidden() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let before = displayed(&client, &server).await;
    let response = client
        .post(format!("{}{ROUTE}", server.base_url))
        .header("X-WP-Nonce", "0000000000")
        .json(&json!({ "sum": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "rest_cookie_invalid_nonce");
    assert_eq!(displayed(&client, &server).await, before);
}

#[tokio::test]
async fn http_nonce_is_tied_to_the_issuing_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let visitor_a = cookie_client();
    let visitor_b = cookie_client();

    let nonce_a = page_nonce(&visitor_a, &server).await;
    let nonce_b = page_nonce(&visitor_b, &server).await;
    assert_ne!(nonce_a, nonce_b);

    let before = displayed(&visitor_b, &server).await;
    let response = visitor_b
        .post(format!("{}{ROUTE}", server.base_url))
        .header("X-WP-Nonce", nonce_a)
        .json(&json!({ "sum": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(displayed(&visitor_b, &server).await, before);
}

#[tokio::test]
async fn http_page_keeps_an_existing_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let first = Client::new()
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    let cookie = first
        .headers()
        .get("set-cookie")
        .expect("first visit sets a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("es6demo_session="));

    let second = Client::new()
        .get(format!("{}/", server.base_url))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert!(second.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn http_query_sum_is_validated_and_body_wins() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let before = displayed(&client, &server).await;
    let rejected = client
        .post(format!("{}{ROUTE}?sum=abc", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(displayed(&client, &server).await, before);

    let accepted = client
        .post(format!("{}{ROUTE}?sum=abc", server.base_url))
        .json(&json!({ "sum": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    let body: IncrementResponse = accepted.json().await.unwrap();
    assert_eq!(body.data, json!(before + 1));
}

#[tokio::test]
async fn http_route_only_accepts_post() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let response = client
        .get(format!("{}{ROUTE}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn http_assets_are_served() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = cookie_client();

    let script = client
        .get(format!("{}/assets/es6-wp-rest-demo.js", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(script.status().is_success());
    assert!(script.text().await.unwrap().contains("X-WP-Nonce"));

    let css = client
        .get(format!("{}/assets/es6-wp-rest-demo.css", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(css.status().is_success());
}

#[tokio::test]
async fn http_counter_persists_across_restart() {
    let data_path = unique_data_path("restart");
    std::fs::write(&data_path, br#"{ "es6demo_sum": 4 }"#).unwrap();
    let client = cookie_client();

    let server = spawn_server(&data_path).await;
    assert_eq!(displayed(&client, &server).await, 4);

    let body: IncrementResponse = client
        .post(format!("{}{ROUTE}", server.base_url))
        .header("X-WP-Nonce", page_nonce(&client, &server).await)
        .json(&json!({ "sum": "4" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.response, "success");
    assert_eq!(body.data, json!(5));

    let stored: Value = serde_json::from_slice(&std::fs::read(&data_path).unwrap()).unwrap();
    assert_eq!(stored, json!({ "es6demo_sum": 5 }));

    let mut server = server;
    let _ = server.child.kill();
    let _ = server.child.wait();
    let restarted = spawn_server(&data_path).await;
    assert_eq!(displayed(&client, &restarted).await, 5);
    drop(server);
}
