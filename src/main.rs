use anyhow::Context;
use browser_sessions::{
    spawn_reaper, ActionExecutor, BrowserConfig, ChromeHandle, Config, SessionRegistry,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "browser-sessions", about = "Open a page in a managed browser session")]
struct Args {
    /// URL to open
    #[arg(default_value = "https://example.com")]
    url: String,

    /// CSS selector to wait for after navigation
    #[arg(long)]
    wait_for: Option<String>,

    /// CSS selector whose text content to print
    #[arg(long)]
    text_of: Option<String>,

    /// Write a PNG screenshot to this path before closing
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Selector wait bound in milliseconds
    #[arg(long, default_value_t = 20_000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = Config {
        browser: BrowserConfig {
            headless: !args.headed,
            ..BrowserConfig::from_env()
        },
        ..Default::default()
    };
    let reap_interval = Duration::from_secs(config.session.reap_interval_secs);
    let max_idle = Duration::from_secs(config.session.max_idle_secs);

    let registry = Arc::new(SessionRegistry::<ChromeHandle>::new(config));
    let _reaper = spawn_reaper(Arc::clone(&registry), reap_interval, max_idle);
    let executor = ActionExecutor::new(Arc::clone(&registry));

    let session_id = registry.create().await?;
    info!(session_id = %session_id, "session ready");

    let timeout = Some(Duration::from_millis(args.timeout_ms));
    let page = executor
        .navigate(&session_id, &args.url, args.wait_for.as_deref(), timeout)
        .await?;
    info!(url = %page.url, title = %page.title, "page loaded");
    println!("{}", serde_json::to_string(&page)?);

    if let Some(selector) = &args.text_of {
        let content = executor.get_text(&session_id, selector, timeout).await?;
        println!("{}", serde_json::to_string(&content)?);
    }

    if let Ok(info) = registry.session_info(&session_id) {
        info!(age_ms = info.age_ms, idle_ms = info.idle_ms, "session stats");
    }

    if let Some(path) = &args.screenshot {
        let shot = executor.screenshot(&session_id).await?;
        tokio::fs::write(path, &shot.bytes)
            .await
            .with_context(|| format!("writing screenshot to {}", path.display()))?;
        info!(path = %path.display(), bytes = shot.bytes.len(), "screenshot saved");
    }

    registry.close(&session_id).await;
    Ok(())
}
