//! JalDrishti CLI
//!
//! Field client for the JalDrishti dashboard:
//! - Show the dashboard summary (network, cache or built-in data)
//! - Queue offline actions and sync them
//! - Change theme and danger-zone preferences
//! - Run the safety countdowns

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use jaldrishti::config::{generate_default_config, Config};
use jaldrishti::connectivity::Connectivity;
use jaldrishti::fetch::HttpSnapshotSource;
use jaldrishti::model::{SiteStatus, StatKey};
use jaldrishti::safety::{SafetyEvent, SafetyMonitor};
use jaldrishti::storage::{FileStore, KeyValueStore};
use jaldrishti::store::{DataStore, StoreDeps, SyncOutcome};
use jaldrishti::sync::HttpBatchSubmitter;
use jaldrishti::theme::ThemeStore;
use jaldrishti::SystemClock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

/// How often `countdown` re-reads preferences written by other invocations
const PREFERENCE_RELOAD_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "jaldrishti")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first field client for water-level monitoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Start in offline mode
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the dashboard summary
    Status,

    /// List notifications
    Notifications {
        /// Mark this notification as read first
        #[arg(long)]
        read: Option<u32>,
    },

    /// Manage the offline queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Override a dashboard statistic for this session
    Stat {
        /// activeSites, anomaliesDetected, verifiedSubmissions or communityReports
        key: StatKey,
        value: u64,
    },

    /// Show or set the theme (light, dark, boost, or "cycle")
    Theme { value: Option<String> },

    /// Turn danger-zone mode on, off, or toggle it
    DangerZone { mode: Option<String> },

    /// Keep the dashboard loaded, following connectivity until Ctrl+C
    ///
    /// Uses `fetch.probe_url` to detect connectivity when configured.
    Watch,

    /// Run the safety monitor until Ctrl+C
    ///
    /// Commands on stdin: c = check in, f = report fall, d = dismiss fall, s = send SOS,
    /// z = toggle danger-zone mode. Danger-zone changes made by other invocations
    /// are picked up within a few seconds.
    Countdown,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum QueueAction {
    /// Queue an action
    Add {
        /// Action type, e.g. gauge-reading
        kind: String,
        /// JSON payload
        data: String,
    },
    /// List pending actions
    List,
    /// Submit pending actions
    Sync,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    config.logging.init();

    match cli.command {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }

        Commands::Theme { value } => {
            let themes = ThemeStore::load(open_storage(&config)?);
            let state = match value.as_deref() {
                None => themes.state(),
                Some("cycle") => themes.cycle_theme(),
                Some(v) => themes.set_theme_str(v)?,
            };
            print_json_or(cli.json, &state, || {
                println!("Theme: {}  (root classes: {})", state.theme, state.root_classes().join(" "));
            })?;
        }

        Commands::DangerZone { mode } => {
            let themes = ThemeStore::load(open_storage(&config)?);
            let state = match mode.as_deref() {
                None => themes.state(),
                Some("on") => themes.set_danger_zone(true),
                Some("off") => themes.set_danger_zone(false),
                Some("toggle") => themes.toggle_danger_zone(),
                Some(other) => bail!("Unknown danger-zone mode '{}' (expected on, off or toggle)", other),
            };
            print_json_or(cli.json, &state, || {
                let label = if state.is_danger_zone { "ON" } else { "off" };
                println!("Danger zone: {}", label);
            })?;
        }

        Commands::Countdown => run_countdown(&config).await?,

        Commands::Watch => run_watch(&config, cli.offline).await?,

        Commands::Status => {
            let store = open_store(&config, cli.offline)?;
            let report = store.load().await;
            let Some(data) = store.snapshot() else {
                bail!("No snapshot available");
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(data.as_ref())?);
                return Ok(());
            }

            println!("Source: {:?}", report.origin);
            if let Some(advisory) = store.error() {
                println!("! {}", advisory);
            }
            println!();
            for key in StatKey::ALL {
                println!("  {:<22} {}", key.as_str(), data.stats.get(key));
            }
            println!();
            println!(
                "Flood probability: {}% ({}), next 24h: {}",
                data.flood_probability.percentage,
                data.flood_probability.trend,
                data.flood_probability.prediction_24h
            );
            println!(
                "Trust: AI {}%, blockchain {}, drone {}",
                data.trust_metrics.ai_confidence,
                if data.trust_metrics.blockchain_valid { "valid" } else { "invalid" },
                if data.trust_metrics.drone_verified { "verified" } else { "pending" }
            );
            println!();
            for status in [SiteStatus::Critical, SiteStatus::Warning, SiteStatus::Normal] {
                for site in data.sites_by_status(status) {
                    let ratio = site
                        .level_ratio()
                        .map(|r| format!("{:.0}%", r * 100.0))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  [{:<8}] {:<28} {:>5.1}m / {:>5.1}m ({})",
                        status, site.name, site.water_level, site.danger_level, ratio
                    );
                }
            }
            for alert in &data.recent_alerts {
                println!();
                println!("  ALERT {} {:?}: {}", alert.id, alert.severity, alert.title);
                println!("    {} ({}, {})", alert.message, alert.location, alert.time);
            }
            println!();
            println!(
                "{} unread notifications, {} queued offline actions",
                store.unread_notifications(),
                store.offline_queue().len()
            );
        }

        Commands::Notifications { read } => {
            let store = open_store(&config, cli.offline)?;
            store.load().await;
            if let Some(id) = read {
                if !store.mark_notification_read(id) {
                    bail!("No notification with id {}", id);
                }
            }
            let Some(data) = store.snapshot() else {
                bail!("No snapshot available");
            };

            print_json_or(cli.json, &data.notifications, || {
                for n in &data.notifications {
                    let marker = if n.read { " " } else { "*" };
                    println!("{} #{:<4} {:?} {} ({})", marker, n.id, n.kind, n.title, n.time);
                    println!("         {}", n.message);
                }
                println!("{} unread", store.unread_notifications());
            })?;
        }

        Commands::Stat { key, value } => {
            let store = open_store(&config, cli.offline)?;
            store.load().await;
            store.update_stat(key, value);
            if let Some(data) = store.snapshot() {
                print_json_or(cli.json, &data.stats, || {
                    for key in StatKey::ALL {
                        println!("  {:<22} {}", key.as_str(), data.stats.get(key));
                    }
                })?;
            }
        }

        Commands::Queue { action } => {
            let store = open_store(&config, cli.offline)?;
            match action {
                QueueAction::Add { kind, data } => {
                    let payload: serde_json::Value = serde_json::from_str(&data)
                        .with_context(|| format!("payload is not valid JSON: {}", data))?;
                    let item = store.add_to_offline_queue(kind, payload)?;
                    println!("Queued {} ({} pending)", item.id, store.offline_queue().len());
                }
                QueueAction::List => {
                    let queue = store.offline_queue();
                    print_json_or(cli.json, queue.as_ref(), || {
                        if queue.is_empty() {
                            println!("Offline queue is empty");
                        }
                        for item in queue.iter() {
                            println!("{}  {:<20} {}", item.id, item.kind, item.data);
                        }
                    })?;
                }
                QueueAction::Sync => match store.sync_offline_queue().await? {
                    SyncOutcome::Synced { items } => println!("Synced {} actions", items),
                    SyncOutcome::Skipped(reason) => println!("Nothing synced: {:?}", reason),
                },
            }
        }
    }

    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let dir = config.storage.data_path();
    let store = FileStore::open(&dir)
        .with_context(|| format!("opening data directory {}", dir.display()))?;
    Ok(Arc::new(store))
}

fn open_store(config: &Config, offline: bool) -> anyhow::Result<DataStore> {
    let deps = StoreDeps::new(
        Arc::new(HttpSnapshotSource::new(config.snapshot_source())?),
        open_storage(config)?,
        Arc::new(HttpBatchSubmitter::new(config.submitter())?),
        Connectivity::new(!offline),
    );
    Ok(DataStore::new(deps, config.store()))
}

fn print_json_or<T: serde::Serialize + ?Sized>(
    json: bool,
    value: &T,
    text: impl FnOnce(),
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

async fn run_watch(config: &Config, offline: bool) -> anyhow::Result<()> {
    let connectivity = Connectivity::new(!offline);
    let deps = StoreDeps::new(
        Arc::new(HttpSnapshotSource::new(config.snapshot_source())?),
        open_storage(config)?,
        Arc::new(HttpBatchSubmitter::new(config.submitter())?),
        connectivity.clone(),
    );
    let store = Arc::new(DataStore::new(deps, config.store()));
    let mut events = store.subscribe();

    let probe = config.fetch.probe_url.clone().map(|url| {
        tracing::info!(url = %url, "Starting connectivity probe");
        connectivity.spawn_probe(url, std::time::Duration::from_secs(config.fetch.probe_interval_secs.max(1)))
    });
    let watcher = Arc::clone(&store).watch_connectivity();

    let report = store.load().await;
    println!("Loaded from {:?}; {} queued actions", report.origin, store.offline_queue().len());
    if let Some(advisory) = report.error {
        println!("! {}", advisory);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    store.shutdown();
    if let Some(probe) = probe {
        probe.abort();
    }
    watcher.await?;
    Ok(())
}

async fn run_countdown(config: &Config) -> anyhow::Result<()> {
    let themes = ThemeStore::load(open_storage(config)?);
    let monitor = Arc::new(SafetyMonitor::new(config.monitor(), Arc::new(SystemClock)));
    let mut events = monitor.subscribe();
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let runner = tokio::spawn(Arc::clone(&monitor).run(themes.subscribe(), stop_rx));

    if !themes.is_danger_zone() {
        println!("Danger-zone mode is off; the dead-man switch stays disarmed.");
        println!("Press z (or run `jaldrishti danger-zone on` elsewhere) to arm it.");
    }
    println!("c = check in, f = report fall, d = dismiss fall, s = send SOS, z = toggle danger zone, Ctrl+C to stop");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
    let mut reload = tokio::time::interval(PREFERENCE_RELOAD_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                match line?.as_deref().map(str::trim) {
                    None => break,
                    Some("c") => {
                        if !monitor.check_in() {
                            println!("Dead-man switch is not active");
                        }
                    }
                    Some("f") => monitor.report_fall(),
                    Some("d") => monitor.dismiss_fall(),
                    Some("s") => {
                        monitor.send_sos();
                    }
                    Some("z") => {
                        themes.toggle_danger_zone();
                    }
                    Some("") => {}
                    Some(other) => println!("Unknown command '{}'", other),
                }
            }
            event = events.recv() => {
                if let Ok(event) = event {
                    print_safety_event(&event);
                }
            }
            _ = reload.tick() => {
                themes.reload();
            }
            _ = ticker.tick() => {
                let status = monitor.status();
                println!("dead-man {:?} {}  fall {:?} {}",
                    status.dead_man, status.dead_man_display, status.fall, status.fall_display);
            }
        }
    }

    stop_tx.send_replace(true);
    runner.await?;
    Ok(())
}

fn print_safety_event(event: &SafetyEvent) {
    match event {
        SafetyEvent::SwitchActivated => {
            println!("Dead-man switch activated. Check in every interval or your supervisor is alerted.")
        }
        SafetyEvent::SwitchDeactivated => println!("Dead-man switch deactivated"),
        SafetyEvent::CheckInWarning { remaining_secs } => {
            println!("CHECK IN NOW: {}:{:02} remaining", remaining_secs / 60, remaining_secs % 60)
        }
        SafetyEvent::CheckedIn => println!("Check-in successful. Timer reset."),
        SafetyEvent::EmergencyAlert { location, .. } => {
            println!("EMERGENCY ALERT SENT. Supervisor notified with location: {}", location)
        }
        SafetyEvent::FallDetected => println!("Fall detected! Dismiss within the countdown or SOS is sent."),
        SafetyEvent::FallDismissed => println!("Fall alert dismissed"),
        SafetyEvent::FallSos { location, .. } => {
            println!("SOS SENT. Emergency services notified with location: {}", location)
        }
    }
}
