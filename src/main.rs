use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use sponsorship_app::config::AppConfig;
use sponsorship_app::error::AppError;
use sponsorship_app::sponsorship::{
    sponsorship_router, CapacityOracle, Conference, ConferenceId, InMemoryDirectory,
    LoggingHistoryProcessor, Plan, PlanId, SponsorshipService,
};
use sponsorship_app::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Sponsorship App",
    about = "Run the conference sponsorship application service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let directory = Arc::new(InMemoryDirectory::new());
    seed_demo_conference(&directory);
    let oracle = Arc::new(CapacityOracle::new(directory.clone()));
    let processor = Arc::new(LoggingHistoryProcessor);
    let service = Arc::new(SponsorshipService::new(directory, oracle, processor));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(sponsorship_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "sponsorship service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Until conference/plan CRUD arrives the service boots with one open
/// conference so the sponsor surface is exercisable end to end.
fn seed_demo_conference(directory: &InMemoryDirectory) {
    let conference_id = ConferenceId("conf-demo".to_string());
    directory.put_conference(Conference {
        id: conference_id.clone(),
        slug: "aurora-2026".to_string(),
        name: "Aurora 2026".to_string(),
        contact_email_address: "sponsorships@aurora.example".to_string(),
    });
    directory.put_plan(Plan {
        id: PlanId("plan-platinum".to_string()),
        conference_id: conference_id.clone(),
        name: "Platinum".to_string(),
        rank: 1,
        capacity: Some(2),
        number_of_guests: 5,
        booth_size: 4,
        word_limit_hard: Some(200),
    });
    directory.put_plan(Plan {
        id: PlanId("plan-gold".to_string()),
        conference_id: conference_id.clone(),
        name: "Gold".to_string(),
        rank: 2,
        capacity: Some(10),
        number_of_guests: 2,
        booth_size: 2,
        word_limit_hard: Some(150),
    });
    directory.put_plan(Plan {
        id: PlanId("plan-community".to_string()),
        conference_id,
        name: "Community".to_string(),
        rank: 3,
        capacity: None,
        number_of_guests: 1,
        booth_size: 0,
        word_limit_hard: Some(100),
    });
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
