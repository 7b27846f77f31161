mod args;
mod tui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Args;
use screcon_client::{ApiClient, CancellationToken};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing based on verbosity; logs go to stderr so the TUI
    // keeps stdout.
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(backend = %args.backend_url, timing = args.timing, "starting");
    let client = ApiClient::new(&args.backend_url)?;

    if args.no_tui {
        return print_scan_list(&client).await;
    }

    tui::run_tui(client, args.timing).await
}

/// One-shot mode: fetch and print the scan collection, newest first.
async fn print_scan_list(client: &ApiClient) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut scans = client.list_scans(&cancel).await?;
    scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if scans.is_empty() {
        println!("No scans found.");
        return Ok(());
    }

    println!("{:<8} {:<24} {:<20} {:>5}", "ID", "Created", "Target", "CVEs");
    for scan in &scans {
        println!(
            "{:<8} {:<24} {:<20} {:>5}",
            scan.scan_id,
            scan.created_at,
            scan.ip,
            scan.cve_count(),
        );
    }
    Ok(())
}
