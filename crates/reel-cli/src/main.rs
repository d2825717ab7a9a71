//! reel -- records the digital-twin stack demo as a terminal video.
//!
//! One run end to end: drive the stack's commands in order, fold their
//! output into the playback script, replay it as a typewriter in a
//! headless browser while the screencast captures frames, and encode the
//! frames into the final MP4.

mod finalize;
mod stages;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reel_browser::{play, HeadlessBrowser, LaunchOptions, PageDriver, PageSurface, Recorder};
use reel_exec::ShellExecutor;
use reel_script::{build_script, script_duration, TimingProfile};

const CAPTURE_WIDTH: u32 = 1366;
const CAPTURE_HEIGHT: u32 = 768;

/// Record the full functional demo of the digital-twin stack.
#[derive(Parser, Debug)]
#[command(name = "reel", version, about)]
struct Cli {
    /// Record the slow five-minute cut instead of the compact one
    #[arg(long)]
    five_min: bool,

    /// Root of the demoed project (docker compose and pytest run here)
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Output directory for the MP4, relative to the project root
    #[arg(long, default_value = "demo")]
    demo_dir: PathBuf,

    /// Explicit Chromium/Chrome binary; auto-discovered when omitted
    #[arg(long)]
    chrome: Option<PathBuf>,
}

/// Where the finished video lands. The five-minute cut gets its own name
/// so the two renditions can coexist.
fn output_path(project_root: &Path, demo_dir: &Path, five_min: bool) -> PathBuf {
    let name = if five_min {
        "vw-digital-twin-full-demo-5min.mp4"
    } else {
        "vw-digital-twin-full-demo.mp4"
    };
    project_root.join(demo_dir).join(name)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with env filter (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let output = output_path(&cli.project_root, &cli.demo_dir, cli.five_min);
    if let Some(dir) = output.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    // Drive the stack and capture every stage's output.
    let executor = ShellExecutor::new(&cli.project_root);
    let results = stages::run_stages(&executor)
        .await
        .context("demo stages failed")?;

    let script = build_script(&results);
    let timing = TimingProfile::select(cli.five_min);
    tracing::info!(
        lines = script.len(),
        playback = ?script_duration(&script, &timing),
        "script assembled"
    );

    // Bring up the rendering surface and start capturing before the first
    // character is drawn.
    let options = LaunchOptions {
        binary: cli.chrome.clone(),
        width: CAPTURE_WIDTH,
        height: CAPTURE_HEIGHT,
    };
    let browser = HeadlessBrowser::launch(&options).await?;
    let ws_url = browser.page_ws_url().await?;
    let (driver, events) = PageDriver::attach(&ws_url).await?;
    let mut surface = PageSurface::prepare(driver.clone()).await?;

    let capture_dir = tempfile::tempdir().context("failed to create capture directory")?;
    let recorder = Recorder::start(
        driver.clone(),
        events,
        capture_dir.path(),
        CAPTURE_WIDTH,
        CAPTURE_HEIGHT,
    )
    .await?;

    play(&script, timing, &mut surface).await?;

    recorder.stop().await?;
    browser.close().await?;

    finalize::finalize(capture_dir.path(), &output)
        .await
        .context("video encoding failed")?;

    println!("Video created: {}", output.display());
    Ok(())
}
