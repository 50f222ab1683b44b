/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Tracked import task with console notifications and exit status
[POS]:    Binary entry point
[UPDATE]: When changing CLI commands, startup flow, or shutdown handling
*/

mod cli;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use examdesk_adapter::ExamdeskClient;
use examdesk_import_watch::{
    ConsoleNotifier, JsonFileStore, NotificationKind, NotificationSink, ResumeOutcome, TaskPoller,
    WatchConfig,
};

const DEFAULT_CONFIG_PATH: &str = "examdesk-watch.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "examdesk-import-watch",
    version,
    about = "Track examdesk import tasks until they resolve"
)]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    /// Also write daily-rolling log files into DIR
    #[arg(long = "log-dir", value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactively write a configuration file
    Init {
        #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },
    /// Start tracking TASK_ID and wait for it to resolve
    Watch { task_id: String },
    /// Resume the task persisted by an earlier run
    Resume,
    /// Forget the persisted task
    Stop,
    /// Fetch the status of TASK_ID once and print it as JSON
    Status { task_id: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    let _log_guard = init_tracing(&args.log_level, args.log_dir.as_deref())?;

    let config_path = args
        .config_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    match args.command {
        Command::Init { output } => {
            cli::init::run_init(output)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Watch { task_id } => {
            let config = load_config(&config_path)?;
            run_watch(config, Some(task_id)).await
        }
        Command::Resume => {
            let config = load_config(&config_path)?;
            run_watch(config, None).await
        }
        Command::Stop => {
            let config = load_config(&config_path)?;
            let (poller, _) = build_poller(&config).await?;
            poller.stop().await;
            println!(
                "{} cleared persisted task for {}",
                style("OK").bold().green(),
                style(&config.storage.key).cyan()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { task_id } => {
            let config = load_config(&config_path)?;
            run_status(config, &task_id).await
        }
    }
}

fn init_tracing(log_level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "examdesk-import-watch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(guard)
}

fn load_config(path: &Path) -> Result<WatchConfig> {
    let config = WatchConfig::from_file(path)?;
    info!(
        config_path = %path.display(),
        storage_key = %config.storage.key,
        base_url = %config.api.base_url,
        "configuration loaded"
    );
    Ok(config)
}

/// Console output plus a record of whether anything went wrong.
#[derive(Default)]
struct OutcomeNotifier {
    console: ConsoleNotifier,
    failed: AtomicBool,
}

impl OutcomeNotifier {
    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

impl NotificationSink for OutcomeNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        if kind != NotificationKind::InfoSuccess {
            self.failed.store(true, Ordering::SeqCst);
        }
        self.console.notify(kind, message);
    }
}

async fn build_poller(config: &WatchConfig) -> Result<(TaskPoller, Arc<OutcomeNotifier>)> {
    let client = ExamdeskClient::with_config(config.client_config(), &config.api.base_url)
        .context("create API client")?;
    let store_path = config.store_path()?;
    let store = JsonFileStore::open(&store_path)
        .await
        .with_context(|| format!("open state file {}", store_path.display()))?;
    let notifier = Arc::new(OutcomeNotifier::default());

    let poller = TaskPoller::builder(
        Arc::new(client),
        Arc::new(store),
        notifier.clone(),
        config.token_store(),
    )
    .storage_key(config.storage.key.clone())
    .poll_interval(config.poll_interval())
    .on_success(|result| {
        println!(
            "  {} imported, {} failed",
            style(result.success_count).green(),
            style(result.failed_count).yellow()
        );
    })
    .on_error(|errors| {
        for error in errors {
            eprintln!("  {} {}", style("-").red(), error);
        }
    })
    .build()?;

    Ok((poller, notifier))
}

async fn run_watch(config: WatchConfig, task_id: Option<String>) -> Result<ExitCode> {
    let (poller, outcome) = build_poller(&config).await?;

    match task_id {
        Some(task_id) => {
            config
                .require_token()
                .context("watch needs a token to check status")?;
            poller.start(task_id.clone()).await.context("start tracking")?;
            println!("Tracking import task {}", style(task_id).cyan());
        }
        None => match poller.resume().await.context("resume tracking")? {
            ResumeOutcome::Resumed(task_id) => {
                println!("Resumed import task {}", style(task_id).cyan());
            }
            ResumeOutcome::NothingToResume | ResumeOutcome::AlreadyTracking => {
                println!("No persisted import task for {}", style(&config.storage.key).cyan());
                return Ok(ExitCode::SUCCESS);
            }
            ResumeOutcome::Deferred(task_id) => {
                poller.detach().await;
                bail!("task {task_id} is persisted but no valid auth.token is configured");
            }
        },
    }

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let mut snapshots = poller.subscribe();
    tokio::select! {
        _ = shutdown.cancelled() => {
            poller.detach().await;
            info!("shutdown signal received; task stays persisted for resume");
            return Ok(ExitCode::SUCCESS);
        }
        finished = snapshots.wait_for(|snapshot| !snapshot.is_polling) => {
            finished
                .map(|_| ())
                .map_err(|_| anyhow!("poller state channel closed"))?;
        }
    }

    if outcome.failed() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn run_status(config: WatchConfig, task_id: &str) -> Result<ExitCode> {
    let token = config
        .require_token()
        .context("status checks need a token")?;
    let client = ExamdeskClient::with_config(config.client_config(), &config.api.base_url)
        .context("create API client")?;

    let status = client
        .fetch_import_status(&token, task_id)
        .await
        .with_context(|| format!("fetch status of {task_id}"))?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(ExitCode::SUCCESS)
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
