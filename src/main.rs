use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use branch_survey_bot::channels::{Messenger, WatiClient};
use branch_survey_bot::config::BotConfig;
use branch_survey_bot::distribution::DistributionSweep;
use branch_survey_bot::report::{CronTrigger, ReportCompiler, spawn_report_scheduler};
use branch_survey_bot::roster::import_roster;
use branch_survey_bot::store::LibSqlBackend;
use branch_survey_bot::survey::{QuestionSource, ResponseRecorder, SheetQuestionSource};
use branch_survey_bot::webhook::webhook_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the environment.
    dotenvy::dotenv().ok();

    let config = BotConfig::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("📋 Survey Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Report schedule: {}", config.report.schedule);
    eprintln!("   Reports: {}", config.report.output_dir.display());

    // ── Database ─────────────────────────────────────────────────────────
    // Everything downstream depends on the store, so failing to open it is fatal.
    let db = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Collaborators ────────────────────────────────────────────────────
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let messenger: Arc<dyn Messenger> = Arc::new(WatiClient::new(
        &config.wati_api_url,
        config.wati_access_token.clone(),
        http.clone(),
    ));
    let questions: Arc<dyn QuestionSource> =
        Arc::new(SheetQuestionSource::new(http, &config.questions_sheet_url));

    // ── Staff roster import ──────────────────────────────────────────────
    if let Some(path) = &config.sweep.roster_csv {
        let summary = import_roster(&*db, path)
            .await
            .with_context(|| format!("failed to import staff roster from {}", path.display()))?;
        eprintln!(
            "   Roster: {} added, {} already present, {} skipped",
            summary.added, summary.existing, summary.skipped
        );
    }

    // ── Startup distribution sweep ───────────────────────────────────────
    if config.sweep.enabled {
        let sweep = DistributionSweep::new(
            db.clone(),
            questions.clone(),
            messenger.clone(),
            config.sweep.clone(),
        );
        let summary = sweep
            .run()
            .await
            .context("distribution sweep could not read the staff roster")?;
        eprintln!("   Sweep: {summary}");
    } else {
        eprintln!("   Sweep: disabled");
    }

    // ── Report scheduler ─────────────────────────────────────────────────
    let compiler = Arc::new(ReportCompiler::new(
        db.clone(),
        questions.clone(),
        messenger,
        config.report.clone(),
    ));
    let trigger = Arc::new(CronTrigger::parse(&config.report.schedule)?);
    let _scheduler = spawn_report_scheduler(trigger, compiler);

    // ── Webhook server ───────────────────────────────────────────────────
    let recorder = Arc::new(ResponseRecorder::new(questions, db));
    let app = webhook_routes(recorder);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Webhook server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")?;

    tracing::info!("Shut down");
    Ok(())
}

/// Stderr logging, plus a daily rolling file when `log_dir` is set.
///
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "survey-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
