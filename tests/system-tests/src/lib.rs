#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::process::Stdio;
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;

    use anyhow::{Context, Result, bail};
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use client_sdk::{ClientConfig, KvClient};
    use common::{ErrorResponse, GetResult, MessageResponse, PutRequest};
    use controller::{InteractionController, Operation, OutcomeKind, Session};
    use tokio::process::{Child, Command};
    use tokio::sync::Mutex;
    use tokio::time::sleep;

    /// In-process stand-in for the store: the three endpoints over a map.
    #[derive(Clone, Default)]
    struct FakeStore {
        entries: Arc<Mutex<HashMap<String, String>>>,
        compactions: Arc<Mutex<usize>>,
    }

    async fn store_put(
        State(store): State<FakeStore>,
        Json(request): Json<PutRequest>,
    ) -> impl IntoResponse {
        if request.key == "forbidden" {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("key is reserved")),
            )
                .into_response();
        }
        store
            .entries
            .lock()
            .await
            .insert(request.key, request.value);
        Json(MessageResponse {
            message: "success".to_string(),
        })
        .into_response()
    }

    async fn store_get(State(store): State<FakeStore>, Path(key): Path<String>) -> Json<GetResult> {
        let value = store.entries.lock().await.get(&key).cloned();
        Json(GetResult {
            found: value.is_some(),
            key,
            value: value.unwrap_or_default(),
        })
    }

    async fn store_compact(State(store): State<FakeStore>) -> Json<MessageResponse> {
        let mut compactions = store.compactions.lock().await;
        *compactions += 1;
        Json(MessageResponse {
            message: format!("compaction {} started", *compactions),
        })
    }

    async fn start_fake_store() -> Result<(String, FakeStore)> {
        let store = FakeStore::default();
        let app = Router::new()
            .route("/put", post(store_put))
            .route("/get/{*key}", get(store_get))
            .route("/compact", post(store_compact))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok((format!("http://{addr}"), store))
    }

    async fn unreachable_url() -> Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        Ok(format!("http://{addr}"))
    }

    #[tokio::test]
    async fn controller_put_then_get_against_store() -> Result<()> {
        let (base_url, store) = start_fake_store().await?;
        let controller = InteractionController::new(KvClient::new(ClientConfig::new(&base_url))?);

        let put = controller.submit_put("greeting", "hello").await;
        assert_eq!(put.kind, OutcomeKind::Success);
        assert_eq!(put.message, "Put successful: success");
        assert_eq!(
            store.entries.lock().await.get("greeting").map(String::as_str),
            Some("hello")
        );

        let get = controller.fetch_get("greeting").await;
        assert_eq!(get.kind, OutcomeKind::Success);
        assert_eq!(get.message, "Key: greeting, Value: hello");

        let missing = controller.fetch_get("nope").await;
        assert_eq!(missing.kind, OutcomeKind::ServerError);
        assert_eq!(missing.message, "Key 'nope' not found.");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_put_surfaces_store_error() -> Result<()> {
        let (base_url, _store) = start_fake_store().await?;
        let controller = InteractionController::new(KvClient::new(ClientConfig::new(&base_url))?);

        let outcome = controller.submit_put("forbidden", "x").await;

        assert_eq!(outcome.kind, OutcomeKind::ServerError);
        assert_eq!(outcome.message, "Error: key is reserved");
        assert!(outcome.cleared_fields.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn sequential_compacts_each_report_their_own_reply() -> Result<()> {
        let (base_url, _store) = start_fake_store().await?;
        let session = Session::new(KvClient::new(ClientConfig::new(&base_url))?);

        let first = session.submit(Operation::Compact).await;
        let second = session.submit(Operation::Compact).await;

        assert!(first.applied && second.applied);
        assert_eq!(first.outcome.message, "Compaction: compaction 1 started");
        assert_eq!(second.outcome.message, "Compaction: compaction 2 started");
        let board = session.board();
        assert_eq!(
            board
                .lock()
                .await
                .status(Operation::Compact)
                .map(|line| line.text.clone()),
            Some("Compaction: compaction 2 started".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn session_put_clears_fields_and_get_reads_them_back() -> Result<()> {
        let (base_url, _store) = start_fake_store().await?;
        let session = Session::new(KvClient::new(ClientConfig::new(&base_url))?);

        let pending = session
            .begin(Operation::Put, |fields| {
                fields.put_key = "k1".to_string();
                fields.put_value = "v1".to_string();
            })
            .await;
        let put = session.complete(pending).await;
        assert_eq!(put.outcome.kind, OutcomeKind::Success);
        {
            let board = session.board();
            let board = board.lock().await;
            assert!(board.fields().put_key.is_empty());
            assert!(board.fields().put_value.is_empty());
        }

        let pending = session
            .begin(Operation::Get, |fields| fields.get_key = "k1".to_string())
            .await;
        let get = session.complete(pending).await;
        assert_eq!(get.outcome.message, "Key: k1, Value: v1");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_store_is_a_network_error() -> Result<()> {
        let controller =
            InteractionController::new(KvClient::new(ClientConfig::new(unreachable_url().await?))?);

        let outcome = controller.fetch_get("k").await;

        assert_eq!(outcome.kind, OutcomeKind::NetworkError);
        assert!(outcome.message.starts_with("Network error: "));
        assert!(
            outcome.message.contains("tcp connect error"),
            "transport cause missing from {}",
            outcome.message
        );
        Ok(())
    }

    #[tokio::test]
    async fn cli_put_then_get_against_store() -> Result<()> {
        let (base_url, _store) = start_fake_store().await?;

        let put = run_cli(&["--server-url", &base_url, "put", "cli-key", "cli-value"]).await?;
        assert!(put.success, "put failed: {}", put.stderr);
        assert!(put.stdout.contains("Put successful: success"));

        let get = run_cli(&["--server-url", &base_url, "get", "cli-key"]).await?;
        assert!(get.success, "get failed: {}", get.stderr);
        assert!(get.stdout.contains("Key: cli-key, Value: cli-value"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_exits_with_failure_on_validation_and_network_errors() -> Result<()> {
        let base_url = unreachable_url().await?;

        let empty_get = run_cli(&["--server-url", &base_url, "get", ""]).await?;
        assert!(!empty_get.success);
        assert!(empty_get.stdout.is_empty());
        assert!(empty_get.stderr.contains("Please enter a key."));

        let compact = run_cli(&["--server-url", &base_url, "compact"]).await?;
        assert!(!compact.success);
        assert!(compact.stderr.contains("Network error: "));
        assert!(compact.stderr.contains("tcp connect error"), "{}", compact.stderr);
        Ok(())
    }

    #[tokio::test]
    async fn cli_web_api_runs_flows_against_store() -> Result<()> {
        let (base_url, _store) = start_fake_store().await?;
        let bind = "127.0.0.1:19182";
        let mut cli_web = start_cli_web(bind, &base_url).await?;
        let web_url = format!("http://{bind}");
        let http = reqwest::Client::new();

        let result = async {
            let put: serde_json::Value = http
                .post(format!("{web_url}/api/put"))
                .json(&serde_json::json!({ "key": "web-key", "value": "web-value" }))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            assert_eq!(put["kind"], "success");
            assert_eq!(put["cleared_fields"], serde_json::json!(["put-key", "put-value"]));

            let get: serde_json::Value = http
                .get(format!("{web_url}/api/get"))
                .query(&[("key", "web-key")])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            assert_eq!(get["message"], "Key: web-key, Value: web-value");

            let empty: serde_json::Value = http
                .get(format!("{web_url}/api/get"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            assert_eq!(empty["kind"], "validation_error");
            assert_eq!(empty["message"], "Please enter a key.");

            let compact: serde_json::Value = http
                .post(format!("{web_url}/api/compact"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            assert_eq!(compact["message"], "Compaction: compaction 1 started");

            let page = http
                .get(format!("{web_url}/"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(page.contains("id=\"put-status\""));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_process(&mut cli_web).await;
        result
    }

    struct CliOutput {
        success: bool,
        stdout: String,
        stderr: String,
    }

    async fn run_cli(args: &[&str]) -> Result<CliOutput> {
        let output = Command::new(binary_path("cli-client")?)
            .args(args)
            .output()
            .await
            .context("failed to execute cli-client")?;

        Ok(CliOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn start_cli_web(bind: &str, server_url: &str) -> Result<Child> {
        let cli_bin = binary_path("cli-client")?;

        let child = Command::new(cli_bin)
            .arg("--server-url")
            .arg(server_url)
            .arg("serve-web")
            .arg("--bind")
            .arg(bind)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn cli-client serve-web")?;

        wait_for_url_status(&format!("http://{bind}/api/ping"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn wait_for_url_status(url: &str, expected: StatusCode, retries: usize) -> Result<()> {
        let http = reqwest::Client::new();

        for _ in 0..retries {
            if let Ok(resp) = http.get(url).send().await
                && resp.status() == expected
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }

        bail!("service did not return {expected} at {url}");
    }

    async fn stop_process(child: &mut Child) {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    fn binary_path(name: &str) -> Result<PathBuf> {
        let workspace_root = workspace_root()?;
        ensure_binaries_built(&workspace_root)?;
        let mut path = workspace_root.join("target").join("debug").join(name);

        if let Some(suffix) = std::env::consts::EXE_SUFFIX.strip_prefix('.') {
            let mut filename = OsString::from(name);
            filename.push(".");
            filename.push(suffix);
            path = workspace_root.join("target").join("debug").join(filename);
        }

        if !path.exists() {
            bail!("expected binary does not exist: {}", path.display());
        }

        Ok(path)
    }

    fn workspace_root() -> Result<PathBuf> {
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_dir
            .parent()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .context("failed to resolve workspace root")
    }

    fn ensure_binaries_built(workspace_root: &PathBuf) -> Result<()> {
        static BUILD_RESULT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

        let result = BUILD_RESULT.get_or_init(|| {
            let status = std::process::Command::new(env!("CARGO"))
                .arg("build")
                .arg("-p")
                .arg("cli-client")
                .current_dir(workspace_root)
                .status()
                .map_err(|err| format!("failed to run cargo build: {err}"))?;

            if status.success() {
                Ok(())
            } else {
                Err("cargo build for cli-client failed".to_string())
            }
        });

        if let Err(message) = result {
            bail!("failed to build required binaries: {message}");
        }

        Ok(())
    }
}
