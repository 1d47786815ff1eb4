//! # chatharvest CLI
//!
//! Command-line interface for the chatharvest library.

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use chatharvest::cli::Args;
use chatharvest::client::ApiClient;
use chatharvest::config::{RunConfig, Settings};
use chatharvest::core::output::{export_filename, write_json};
use chatharvest::core::pipeline::{CancelFlag, run_harvest};
use chatharvest::progress::{Progress, stderr_progress};
use chatharvest::{HarvestError, Result};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => {}
        Err(HarvestError::Cancelled) => {
            eprintln!("\n⚠️  Interrupted, no file was written");
            process::exit(130);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();

    let window = args.window()?;
    let settings = Settings::from_env()?;
    let config = RunConfig::new()
        .with_window(window)
        .with_channels(args.channel_selection())
        .with_rate_limit_delay(std::time::Duration::from_millis(args.rate_limit_ms))
        .with_workers(args.workers);

    // Print header
    println!("📦 chatharvest v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🌐 API:      {}", settings.api_url);
    println!("🆔 Account:  {}", settings.account_id);
    match &config.window {
        Some(window) => println!("📅 Window:   {}", window.label()),
        None => println!("📅 Window:   full history"),
    }
    if let Some(channels) = &config.channels {
        println!(
            "📨 Channels: {}",
            channels
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!();

    let client = ApiClient::new(&settings, &config)?;

    // Ctrl-C aborts between pages/conversations, before anything is written.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let progress = stderr_progress();
    let report = run_harvest(&client, &settings.account_id, &config, &progress, &cancel).await?;

    if report.is_empty() {
        println!("⚠️  No messages to export");
        return Ok(());
    }

    // Write the dump
    let filename = export_filename(config.window.as_ref(), chrono::Utc::now());
    let path = Path::new(&args.output).join(filename);
    write_json(&report.records, &path)?;
    progress(Progress::new(Some(100.0), "Export saved"));

    let total_time = total_start.elapsed();
    let file_size_mb = std::fs::metadata(&path)
        .map(|meta| meta.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0);

    println!();
    println!("✅ Done! Output saved to {}", path.display());

    // Summary
    println!();
    println!("📊 Summary:");
    println!("   Channels:       {}", report.channels);
    println!("   Discovered:     {} conversations", report.conversations_discovered);
    println!("   In window:      {} conversations", report.conversations_retained);
    println!("   Messages:       {}", report.message_count());
    println!("   File size:      {:.2} MB", file_size_mb);
    println!("   Total time:     {:.2}s", total_time.as_secs_f64());

    Ok(())
}
