use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::{Parser, Subcommand};
use client_sdk::{ClientConfig, KeyEncoding, KvClient};
use common::DEFAULT_SERVER_URL;
use controller::{InteractionController, Outcome, Session};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod shell;

#[derive(Clone)]
struct WebState {
    controller: Arc<InteractionController<KvClient>>,
}

#[derive(Debug, Parser)]
#[command(name = "cli-client")]
#[command(about = "Client for the HTTP key-value store")]
struct Cli {
    #[arg(long, env = "KV_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,
    /// Percent-encode keys in `get/{key}` instead of appending them verbatim.
    #[arg(long, env = "KV_PERCENT_ENCODE_KEYS")]
    percent_encode_keys: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Put {
        key: String,
        value: String,
    },
    Get {
        key: String,
    },
    Compact,
    /// Read commands from stdin; requests run concurrently.
    Shell,
    ServeWeb {
        #[arg(long, default_value = "127.0.0.1:8081")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        Commands::ServeWeb { .. } => "info",
        _ => "warn",
    });

    let client = KvClient::new(client_config(&cli.server_url, cli.percent_encode_keys))
        .context("failed to configure store client")?;

    match cli.command {
        Commands::Put { key, value } => {
            let outcome = InteractionController::new(client)
                .submit_put(&key, &value)
                .await;
            Ok(report(&outcome))
        }
        Commands::Get { key } => {
            let outcome = InteractionController::new(client).fetch_get(&key).await;
            Ok(report(&outcome))
        }
        Commands::Compact => {
            let outcome = InteractionController::new(client).trigger_compact().await;
            Ok(report(&outcome))
        }
        Commands::Shell => {
            shell::run(Session::new(client)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::ServeWeb { bind } => {
            let bind_addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address: {bind}"))?;
            let server_url = client.base_url().to_string();
            let app = web_router(WebState {
                controller: Arc::new(InteractionController::new(client)),
            });

            info!(%bind_addr, %server_url, "web interface listening");
            println!("web interface at http://{bind_addr}");
            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, app).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn client_config(server_url: &str, percent_encode_keys: bool) -> ClientConfig {
    let key_encoding = if percent_encode_keys {
        KeyEncoding::Percent
    } else {
        KeyEncoding::Raw
    };
    ClientConfig::new(server_url).with_key_encoding(key_encoding)
}

/// Status line goes to stdout on success and stderr otherwise.
fn report(outcome: &Outcome) -> ExitCode {
    if outcome.is_error() {
        eprintln!("{}", outcome.message);
        ExitCode::FAILURE
    } else {
        println!("{}", outcome.message);
        ExitCode::SUCCESS
    }
}

fn web_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(web_ui::app_html()) }))
        .route(
            "/api/ping",
            get(|| async {
                Json(serde_json::json!({
                    "ok": true,
                    "service": "cli-client-web"
                }))
            }),
        )
        .route("/api/put", post(web_put))
        .route("/api/get", get(web_get))
        .route("/api/compact", post(web_compact))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct WebPutRequest {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct WebGetQuery {
    #[serde(default)]
    key: String,
}

async fn web_put(
    State(state): State<WebState>,
    Json(payload): Json<WebPutRequest>,
) -> Json<Outcome> {
    Json(
        state
            .controller
            .submit_put(&payload.key, &payload.value)
            .await,
    )
}

async fn web_get(State(state): State<WebState>, Query(query): Query<WebGetQuery>) -> Json<Outcome> {
    Json(state.controller.fetch_get(&query.key).await)
}

async fn web_compact(State(state): State<WebState>) -> Json<Outcome> {
    Json(state.controller.trigger_compact().await)
}
