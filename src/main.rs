//! Aces market watcher
//!
//! Polls the sportsbook and alerts on newly listed aces markets.

use aces_watch::{
    client::{proxy_short_name, ProxyPool, SocketClient},
    config::Config,
    decoder::{find_densest_block, FrameDecoder},
    extractor::MarketExtractor,
    notify::{cycle_started, cycle_summary, matches_found, Notifier},
    ordering::order_bets,
    watcher::{CycleReport, Watcher},
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "aces-watch")]
#[command(about = "Watch sportsbook aces markets and alert on new ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously
    Run,
    /// Run a single cycle and exit
    Once,
    /// Decode a dumped match response and print its bets
    Decode {
        /// Raw response body file
        file: PathBuf,
        /// Match title used for ordering
        #[arg(short, long, default_value = "")]
        title: String,
    },
    /// Test Telegram notification
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run => run_watcher(config).await,
        Commands::Once => run_once(config).await,
        Commands::Decode { file, title } => decode_file(config, &file, &title).await,
        Commands::TestNotify => test_notify(config).await,
    }
}

async fn load_proxies(config: &Config) -> ProxyPool {
    let Some(path) = &config.transport.proxy_file else {
        return ProxyPool::default();
    };
    match ProxyPool::load(path).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Failed to load proxies from {}: {}", path.display(), e);
            ProxyPool::default()
        }
    }
}

fn summary(report: &CycleReport, proxy_name: &str) -> String {
    cycle_summary(report.matches, report.bets, proxy_name)
}

/// Notifier for alerting commands; Telegram is mandatory there
fn require_notifier(config: &Config) -> anyhow::Result<Notifier> {
    let notifier = Notifier::from_config(config.telegram.as_ref());
    if !notifier.is_enabled() {
        anyhow::bail!("Telegram not configured; add a [telegram] section or ACES__TELEGRAM__* variables");
    }
    Ok(notifier)
}

/// Sleep unless interrupted; `false` means shut down
async fn pause(secs: u64) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(secs)) => true,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            false
        }
    }
}

async fn run_watcher(config: Config) -> anyhow::Result<()> {
    let notifier = require_notifier(&config)?;

    let proxies = load_proxies(&config).await;
    if proxies.is_empty() {
        tracing::info!("No proxies loaded, running direct");
    } else {
        tracing::info!("Loaded {} proxies", proxies.len());
    }
    notifier
        .log_event(&format!("🚀 Démarrage - {} proxies chargés", proxies.len()))
        .await;

    let watcher = Watcher::from_config(&config);
    let max_failures = config.watch.max_consecutive_failures;
    let mut failures = 0u32;
    let mut cycle = 0u64;

    loop {
        cycle += 1;
        let proxy = proxies.pick();
        let proxy_name = proxy_short_name(proxy);

        let outcome = match SocketClient::new(&config.transport, proxy) {
            Ok(client) => {
                let line = cycle_started(cycle, &proxy_name);
                tracing::info!("{}", line);
                notifier.log_event(&line).await;
                watcher.run_cycle(&client, &notifier, Utc::now()).await
            }
            Err(e) => Err(e),
        };

        let delay = match outcome {
            Ok(report) => {
                failures = 0;
                notifier.log_event(&matches_found(report.candidates)).await;
                let line = summary(&report, &proxy_name);
                tracing::info!("{}", line);
                notifier.log_event(&line).await;
                config.watch.poll_interval_secs
            }
            Err(e) if !e.counts_as_failure() => {
                if e.is_decode() {
                    tracing::warn!("Decode failed, retrying: {}", e);
                    notifier.log_event("⚠️ Erreur décodage - retry...").await;
                } else {
                    tracing::warn!("⚠️ Proxy error [{}], switching: {}", proxy_name, e);
                    notifier
                        .log_event(&format!("⚠️ Erreur proxy [{}] - changement...", proxy_name))
                        .await;
                }
                config.watch.retry_delay_secs
            }
            Err(e) => {
                failures += 1;
                tracing::error!(
                    "Cycle #{} failed ({}/{}): {}",
                    cycle,
                    failures,
                    max_failures,
                    e
                );
                if failures >= max_failures {
                    notifier
                        .log_event(&format!("❌ Échec {} fois de suite, arrêt", failures))
                        .await;
                    anyhow::bail!("{} consecutive failures, last: {}", failures, e);
                }
                config.watch.retry_delay_secs
            }
        };

        if !pause(delay).await {
            return Ok(());
        }
    }
}

async fn run_once(config: Config) -> anyhow::Result<()> {
    let notifier = require_notifier(&config)?;
    let proxies = load_proxies(&config).await;
    let proxy = proxies.pick();
    let client = SocketClient::new(&config.transport, proxy)?;

    let watcher = Watcher::from_config(&config);
    let report = watcher.run_cycle(&client, &notifier, Utc::now()).await?;

    println!("{}", summary(&report, client.proxy_name()));
    println!(
        "   candidates: {}, skipped: {}, alerts: {} sent / {} failed, suppressed: {}",
        report.candidates,
        report.skipped,
        report.diff.alerts_sent,
        report.diff.alerts_failed,
        report.diff.suppressed
    );
    Ok(())
}

async fn decode_file(config: Config, file: &Path, title: &str) -> anyhow::Result<()> {
    let raw = tokio::fs::read(file).await?;
    let document = FrameDecoder::default().decode(&raw)?;
    let block = find_densest_block(&document)
        .ok_or_else(|| anyhow::anyhow!("No bets/outcomes/odds block in {}", file.display()))?;

    let extractor = MarketExtractor::from_config(&config.watch);
    let bets = order_bets(extractor.bets_from_block(&block), title);

    eprintln!("Densest block: {} bet definitions, {} kept", block.len(), bets.len());
    println!("{}", serde_json::to_string_pretty(&bets)?);
    Ok(())
}

async fn test_notify(config: Config) -> anyhow::Result<()> {
    let tg_config = config
        .telegram
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Telegram not configured in config.toml"))?;

    let notifier = Notifier::from_config(Some(tg_config));
    notifier
        .send("🧪 <b>Test Notification</b>\n\nIf you see this, Telegram integration is working!")
        .await?;
    notifier.log_event("🧪 Test log channel").await;

    println!("✅ Test notification sent!");
    Ok(())
}
