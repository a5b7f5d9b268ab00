use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Output;
use std::sync::Arc;

use axum::extract::Json;
use axum::http::{HeaderMap, Method, Uri};
use axum::Router;
use serde_json::{json, Value};

/// Find a free TCP port by binding to port 0
pub fn find_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to port 0");
    listener.local_addr().unwrap().port()
}

/// Get the path to a compiled binary in the target directory
fn cargo_bin(name: &str) -> PathBuf {
    // Look for the binary next to the test executable (target/debug)
    let mut path = std::env::current_exe()
        .expect("Failed to get current exe")
        .parent()
        .expect("No parent")
        .parent()
        .expect("No grandparent")
        .to_path_buf();
    path.push(name);
    if path.exists() {
        return path;
    }

    // Fallback: try target/debug directly
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // integration-tests -> workspace root
    path.push("target");
    path.push("debug");
    path.push(name);
    if path.exists() {
        return path;
    }

    panic!("Binary '{}' not found. Run `cargo build --workspace` first.", name);
}

/// An in-process inspector endpoint serving canned responses
pub struct StubInspector {
    pub port: u16,
    handle: tokio::task::JoinHandle<()>,
}

impl StubInspector {
    /// Serve the same envelope for every request
    pub async fn serve_envelope(envelope: Value) -> Self {
        let envelope = Arc::new(envelope);
        let app = Router::new().fallback(move || {
            let envelope = envelope.clone();
            async move { Json((*envelope).clone()) }
        });
        Self::spawn(app).await
    }

    /// Serve `{"result": <result>}` for every request
    pub async fn serve_result(result: Value) -> Self {
        Self::serve_envelope(json!({ "result": result })).await
    }

    /// Echo the received method, path, headers, and body back as the result
    pub async fn echo() -> Self {
        Self::spawn(Router::new().fallback(echo_handler)).await
    }

    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub inspector");
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub inspector failed");
        });
        Self { port, handle }
    }
}

impl Drop for StubInspector {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn echo_handler(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Json<Value> {
    Json(json!({
        "result": {
            "method": method.to_string(),
            "path": uri.path(),
            "authorization": headers.get("authorization").and_then(|v| v.to_str().ok()),
            "content_type": headers.get("content-type").and_then(|v| v.to_str().ok()),
            "args": body.map(|Json(v)| v),
        }
    }))
}

/// Run the compiled kilnctl binary with the given arguments
pub async fn kilnctl(args: &[&str]) -> Output {
    tokio::process::Command::new(cargo_bin("kilnctl"))
        .args(args)
        // Keep the invocation hermetic: no user config, no ambient token
        .env("XDG_CONFIG_HOME", std::env::temp_dir().join("kilnctl-itest-no-config"))
        .env_remove("KILNCTL_API_KEY")
        .output()
        .await
        .expect("Failed to run kilnctl")
}

/// Run kilnctl against a stub inspector listening on `port`
pub async fn kilnctl_at(port: u16, args: &[&str]) -> Output {
    let port = port.to_string();
    let mut full = vec!["--host", "127.0.0.1", "--port", port.as_str()];
    full.extend_from_slice(args);
    kilnctl(&full).await
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
