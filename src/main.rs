use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use placement_ai::config::AppConfig;
use placement_ai::error::AppError;
use placement_ai::telemetry;
use placement_ai::workflows::placement::{
    eligibility, DriveCriteria, EligibilityRule, InMemoryPlacementRepository, OfferPolicy,
    PlacementService, StudentId, StudentSnapshot, TracingNotifier,
};
use placement_ai::workflows::roster::RosterImporter;
use serde_json::json;
use std::path::PathBuf;
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
    name = "Campus Placement Orchestrator",
    about = "Run the campus placement drive service or screen rosters from the command line",
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
    /// Drive utilities for offline runs
    Drive {
        #[command(subcommand)]
        command: DriveCommand,
    },
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

#[derive(Subcommand, Debug)]
enum DriveCommand {
    /// Screen a student roster CSV against drive criteria
    Screen(ScreenArgs),
}

#[derive(Args, Debug)]
struct ScreenArgs {
    /// Roster CSV export with one student per row
    #[arg(long)]
    roster: PathBuf,
    /// Drive criteria as a JSON document
    #[arg(long)]
    criteria: PathBuf,
    /// List every ineligible student with the rules they failed
    #[arg(long)]
    list_failures: bool,
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
        Command::Drive {
            command: DriveCommand::Screen(args),
        } => run_drive_screen(args),
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let repository = Arc::new(InMemoryPlacementRepository::default());
    let notifier = Arc::new(TracingNotifier);
    let service = Arc::new(PlacementService::new(
        repository,
        notifier,
        OfferPolicy {
            default_validity_hours: config.placement.offer_validity_hours,
        },
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(placement_ai::workflows::placement::placement_router(
            service,
        ))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campus placement orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_drive_screen(args: ScreenArgs) -> Result<(), AppError> {
    let ScreenArgs {
        roster,
        criteria,
        list_failures,
    } = args;

    let roster = RosterImporter::from_path(roster)?;
    let criteria_file = std::fs::File::open(criteria)?;
    let criteria: DriveCriteria =
        serde_json::from_reader(criteria_file).map_err(AppError::Criteria)?;

    let summary = ScreeningSummary::build(&roster, &criteria);
    render_screening_summary(&summary, list_failures);

    Ok(())
}

struct ScreeningSummary {
    screened: usize,
    eligible: usize,
    failures: Vec<(StudentId, Vec<EligibilityRule>)>,
}

impl ScreeningSummary {
    fn build(roster: &[StudentSnapshot], criteria: &DriveCriteria) -> Self {
        let mut eligible = 0;
        let mut failures = Vec::new();

        for snapshot in roster {
            let report = eligibility::evaluate(snapshot, criteria);
            if report.eligible {
                eligible += 1;
            } else {
                failures.push((snapshot.student.clone(), report.failed_rules));
            }
        }

        Self {
            screened: roster.len(),
            eligible,
            failures,
        }
    }
}

fn render_screening_summary(summary: &ScreeningSummary, list_failures: bool) {
    println!("Roster screening");
    println!(
        "Screened {} student(s), {} eligible, {} filtered out",
        summary.screened,
        summary.eligible,
        summary.failures.len()
    );

    if list_failures && !summary.failures.is_empty() {
        println!("\nIneligible students");
        for (student, rules) in &summary.failures {
            let rule_labels = rules
                .iter()
                .map(|rule| rule.label())
                .collect::<Vec<_>>()
                .join(", ");
            println!("- {} | failed: {}", student.0, rule_labels);
        }
    }
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
