use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::client::{Credentials, HttpTransport, ResolverConfig, Transport, verify_credentials};
use crate::connector::{Connector, ConnectorConfig, ErrorMode};
use crate::core::Bag;
use crate::error::ConnectorError;

#[derive(Parser)]
#[command(
    name = "nowcapital",
    about = "Runs Canadian retirement-planning calculations against the NowCapital API"
)]
struct Cli {
    #[arg(long, env = "NOWCAPITAL_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(
        long,
        env = "NOWCAPITAL_BASE_URL",
        help = "Service base URL; defaults to the production host"
    )]
    base_url: Option<String>,
    #[arg(long, default_value_t = 60, help = "Per-request timeout in seconds")]
    timeout_secs: u64,
    #[arg(
        long,
        default_value_t = false,
        help = "Record failing rows as {\"error\": ...} instead of aborting the run"
    )]
    continue_on_fail: bool,
    #[arg(
        long,
        default_value_t = 1,
        help = "How many simulation job hand-overs to follow"
    )]
    max_handover_depth: u32,
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Execute rows from a JSON file (an array of rows or a single row).
    Run {
        #[arg(long)]
        input: PathBuf,
    },
    /// Serve the connector over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Check that the API key is accepted by the service.
    CheckKey,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutePayload {
    rows: Vec<Bag>,
    #[serde(default)]
    continue_on_fail: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ExecuteResponse {
    results: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let connector = match build_connector(&cli) {
        Ok(connector) => connector,
        Err(e) => {
            error!(error = %e, "could not configure connector");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Run { input } => run_file(&connector, &input).await,
        Command::CheckKey => check_key(connector.transport()).await,
        Command::Serve { port } => run_http_server(Arc::new(connector), port)
            .await
            .map_err(|e| format!("server error: {e}")),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            error!("{msg}");
            ExitCode::FAILURE
        }
    }
}

// Logs go to stderr so `run` output on stdout stays parseable.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn connector_config(cli: &Cli) -> ConnectorConfig {
    ConnectorConfig {
        error_mode: if cli.continue_on_fail {
            ErrorMode::Continue
        } else {
            ErrorMode::Abort
        },
        resolver: ResolverConfig {
            max_handover_depth: cli.max_handover_depth,
        },
    }
}

fn build_connector(cli: &Cli) -> Result<Connector<HttpTransport>, ConnectorError> {
    if cli.timeout_secs == 0 {
        return Err(ConnectorError::Configuration(
            "--timeout-secs must be > 0".to_string(),
        ));
    }
    let credentials = Credentials::new(
        SecretString::from(cli.api_key.clone()),
        cli.base_url.as_deref(),
    )?;
    let transport = HttpTransport::new(credentials, Duration::from_secs(cli.timeout_secs))?;
    Ok(Connector::new(transport, connector_config(cli)))
}

fn parse_rows(json: &str) -> Result<Vec<Bag>, String> {
    match serde_json::from_str::<Value>(json).map_err(|e| format!("Invalid rows JSON: {e}"))? {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(row) => Ok(row),
                _ => Err(format!("row {index} is not a JSON object")),
            })
            .collect(),
        _ => Err("rows JSON must be an object or an array of objects".to_string()),
    }
}

async fn run_file<T: Transport>(connector: &Connector<T>, input: &Path) -> Result<(), String> {
    let json = std::fs::read_to_string(input)
        .map_err(|e| format!("could not read {}: {e}", input.display()))?;
    let rows = parse_rows(&json)?;
    info!(rows = rows.len(), "executing rows");

    let results = connector.execute(&rows).await.map_err(|e| e.to_string())?;
    let rendered = serde_json::to_string_pretty(&results).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}

async fn check_key<T: Transport>(transport: &T) -> Result<(), String> {
    let status = verify_credentials(transport)
        .await
        .map_err(|e| format!("API key check failed: {e}"))?;
    let rendered = serde_json::to_string_pretty(&status).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn router<T: Transport + 'static>(connector: Arc<Connector<T>>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/execute", post(execute_handler::<T>))
        .fallback(not_found_handler)
        .with_state(connector)
}

pub async fn run_http_server<T: Transport + 'static>(
    connector: Arc<Connector<T>>,
    port: u16,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "connector HTTP API listening");

    axum::serve(listener, router(connector)).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn execute_handler<T: Transport + 'static>(
    State(connector): State<Arc<Connector<T>>>,
    Json(payload): Json<ExecutePayload>,
) -> Response {
    let mode = match payload.continue_on_fail {
        Some(true) => ErrorMode::Continue,
        Some(false) => ErrorMode::Abort,
        None => connector.config().error_mode,
    };

    match connector.execute_with_mode(&payload.rows, mode).await {
        Ok(results) => json_response(StatusCode::OK, ExecuteResponse { results }),
        Err(e) => error_response(status_for(&e), &e.to_string()),
    }
}

fn status_for(err: &ConnectorError) -> StatusCode {
    match err {
        ConnectorError::MissingParameter { .. }
        | ConnectorError::InvalidParameter { .. }
        | ConnectorError::UnknownOperation { .. } => StatusCode::BAD_REQUEST,
        ConnectorError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ConnectorError::Row { source, .. } => status_for(source),
        ConnectorError::Transport(_) | ConnectorError::Api { .. } | ConnectorError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
