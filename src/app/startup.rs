//! Binary entry point: settings, logging, agent wiring and the watch loop

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::app::cli::args::Args;
use crate::app::cli::config::Settings;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, set_log_level};
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::long_version;
use crate::notifications::api::{
    EventSink, FanoutSink, JsonLinesFileSink, NotificationError, StdoutSink, WebhookSink,
};
use crate::observatory::api::{
    AgentConfig, CycleOutcome, JsonFileStateStore, ObservatoryAgent, ObservatoryError,
    ObservatoryResult, ReqwestTransport, DEFAULT_HTTP_TIMEOUT_SECS,
};

/// How the host drives the agent once everything is wired up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub cycle_timeout: Option<Duration>,
}

impl Schedule {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: Duration::from_secs(settings.schedule_interval_secs),
            cycle_timeout: settings.cycle_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Initialize application startup
pub fn startup() -> ExitCode {
    let args = Args::parse_from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(args))
}

async fn run(args: Args) -> ExitCode {
    // Logging is not up yet, so settings problems go straight to stderr
    let settings = match Settings::load(&args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let use_color = settings
        .color
        .unwrap_or_else(|| colored::control::SHOULD_COLORIZE.should_colorize());
    colored::control::set_override(use_color);
    if let Err(e) = init_logging(
        settings.log_level.as_deref(),
        settings.log_format.as_deref(),
        settings.log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    log::info!("observatory-watch {} starting", long_version());

    let config = match settings.agent.validate() {
        Ok(config) => config,
        Err(e) => {
            log_error_with_context(&e, "Validating agent options");
            return ExitCode::FAILURE;
        }
    };

    // The agent's debug option also raises the log level unless one was chosen
    if config.debug && settings.log_level.is_none() {
        if let Err(e) = set_log_level("debug") {
            log::warn!("Could not raise log level for debug mode: {}", e);
        }
    }

    if args.check_config {
        log::info!(
            "Configuration is valid: site={} variant={} changes_only={}",
            config.site,
            config.variant,
            config.changes_only
        );
        return ExitCode::SUCCESS;
    }

    let agent = match build_agent(&settings, config) {
        Ok(agent) => agent,
        Err(e) => {
            log_error_with_context(&e, "Setting up the agent");
            return ExitCode::FAILURE;
        }
    };
    let schedule = Schedule::from_settings(&settings);

    if args.once {
        return match run_cycle(&agent, schedule.cycle_timeout).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let (coordinator, shutdown_rx) = ShutdownCoordinator::new();
    coordinator.listen_for_ctrl_c();
    watch(&agent, schedule, &coordinator, shutdown_rx).await;

    log::info!("observatory-watch stopped");
    ExitCode::SUCCESS
}

/// Wire the production transport, store and sinks around `config`
pub fn build_agent(settings: &Settings, config: AgentConfig) -> ObservatoryResult<ObservatoryAgent> {
    let transport = ReqwestTransport::new(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))?;

    let state_path = match &settings.state_file {
        Some(path) => path.clone(),
        None => JsonFileStateStore::default_path(&config.site).ok_or_else(|| {
            ObservatoryError::State {
                message: "No data directory available; pass --state-file".to_string(),
            }
        })?,
    };
    log::debug!("State file: {}", state_path.display());
    let store = JsonFileStateStore::new(state_path, &config.site);

    let sink = build_sink(settings)?;
    log::debug!("Event sink: {}", sink.sink_id());

    Ok(ObservatoryAgent::new(
        config,
        Arc::new(transport),
        Arc::new(store),
        sink,
    ))
}

/// Stdout unless a file or webhook was configured; several sinks fan out
pub fn build_sink(settings: &Settings) -> Result<Arc<dyn EventSink>, NotificationError> {
    let mut sinks: Vec<Arc<dyn EventSink>> = Vec::new();

    if let Some(path) = &settings.events_file {
        sinks.push(Arc::new(JsonLinesFileSink::new(path)));
    }
    if let Some(url) = &settings.webhook_url {
        let timeout = Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS);
        sinks.push(Arc::new(WebhookSink::new(url, timeout)?));
    }

    Ok(match sinks.len() {
        0 => Arc::new(StdoutSink::new()),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutSink::new(sinks)),
    })
}

/// Run one check cycle, its poll optionally bounded, and log the outcome and liveness
pub async fn run_cycle(
    agent: &ObservatoryAgent,
    cycle_timeout: Option<Duration>,
) -> ObservatoryResult<CycleOutcome> {
    let result = agent.check_within(cycle_timeout).await;

    match &result {
        Ok(outcome) => log::info!(
            "Check of {} complete: {:?}, event {}",
            agent.config().site,
            outcome.decision.reason,
            if outcome.event.is_some() { "created" } else { "not created" }
        ),
        Err(e) => log_error_with_context(e, &format!("Checking {}", agent.config().site)),
    }

    let report = agent.health_report();
    if report.working {
        log::info!("Agent for {} is working", agent.config().site);
    } else {
        log::warn!(
            "Agent for {} is not working: no successful event in {} days or recent errors",
            agent.config().site,
            agent.config().expected_receive_period_in_days
        );
    }
    match serde_json::to_string(&report) {
        Ok(json) => log::debug!("Health: {}", json),
        Err(e) => log::debug!("Health report not serializable: {}", e),
    }

    result
}

/// Run a cycle now and then once per interval until shutdown is requested.
///
/// A shutdown request during a cycle lets that cycle finish first.
pub async fn watch(
    agent: &ObservatoryAgent,
    schedule: Schedule,
    coordinator: &ShutdownCoordinator,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        // Failures are logged and recorded in health; the next cycle still runs
        let _ = run_cycle(agent, schedule.cycle_timeout).await;

        if coordinator.is_shutdown_requested() {
            break;
        }

        log::info!("Next check in {}s", schedule.interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(schedule.interval) => {}
            _ = shutdown_rx.recv() => break,
        }
    }
}
