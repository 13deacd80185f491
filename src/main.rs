use anyhow::{anyhow, Result};
use clap::Parser;
use proxy_probe::{
    proxy::{
        aggregate, export::working_by_latency, export_to_file, normalize_test_url, run_batch,
        BatchError, BatchProgress, CheckerConfig, ExportFormat, ProbeResult, ProxyParser,
    },
    telemetry,
};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Number of fastest working proxies listed after a run
const FASTEST_SHOWN: usize = 10;

/// Check proxy liveness and latency in batches
#[derive(Parser)]
#[command(name = "proxy-probe")]
#[command(about = "Check a list of proxies for availability and latency")]
struct Cli {
    /// Input file containing proxies, one per line
    #[arg(short, long)]
    input: PathBuf,

    /// Output file for the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format (txt, csv, json)
    #[arg(long, default_value = "txt")]
    format: String,

    /// URL to test proxies against
    #[arg(short = 'u', long, default_value = "http://www.google.com")]
    url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Number of concurrent checks
    #[arg(short, long, default_value = "10")]
    concurrency: usize,

    /// Print every result, not only working proxies
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let format: ExportFormat = cli.format.parse()?;
    let entries = ProxyParser::parse_file(&cli.input)?;
    if entries.is_empty() {
        return Err(anyhow!("No valid proxy addresses found in {:?}", cli.input));
    }

    let config = CheckerConfig::new()
        .with_concurrency(cli.concurrency)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_test_url(cli.url);

    println!("Checking {} proxies from {:?}", entries.len(), cli.input);
    println!("Test URL: {}", normalize_test_url(&config.test_url));
    println!("Timeout: {}s | Concurrency: {}", cli.timeout, cli.concurrency);
    println!("{}", "-".repeat(80));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(interrupt, tokio::signal::ctrl_c).await {
            eprintln!("\nInterrupted again, exiting without waiting");
            std::process::exit(1);
        }
    });

    let verbose = cli.verbose;
    let outcome = run_batch(entries, &config, cancel.clone(), |progress| {
        print_progress(&progress, verbose)
    })
    .await;

    let (results, interrupted) = settle(outcome, cancel.is_cancelled())?;
    let code = if interrupted {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    };

    print_statistics(&results);

    if let Some(output_path) = &cli.output {
        match export_to_file(output_path, format, &results) {
            Ok(()) => println!("\nResults exported to {:?}", output_path),
            Err(e) => eprintln!("\nExport failed: {e:#}"),
        }
    }

    print_fastest(&results);

    Ok(code)
}

/// First signal stops admission and lets in-flight checks finish. Returns
/// true once a second signal arrives, false if the signal source fails.
async fn watch_interrupts<F, Fut>(cancel: CancellationToken, mut next_signal: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupted, waiting for in-flight probes to finish (Ctrl-C again to quit)");
    cancel.cancel();

    next_signal().await.is_ok()
}

/// Split a batch outcome into its results and whether the run was
/// interrupted. A stop signal that fired after every entry was admitted
/// still counts as an interruption.
fn settle(
    outcome: Result<Vec<ProbeResult>, BatchError>,
    interrupted: bool,
) -> Result<(Vec<ProbeResult>, bool)> {
    match outcome {
        Ok(results) => {
            if interrupted {
                println!("\nCheck interrupted after all {} proxies were started", results.len());
            }
            Ok((results, interrupted))
        }
        Err(BatchError::Cancelled { results, total }) => {
            println!("\nCheck interrupted after {}/{} proxies", results.len(), total);
            Ok((results, true))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_progress(progress: &BatchProgress<'_>, verbose: bool) {
    let result = progress.result;

    if result.is_success() {
        println!(
            "[{}/{}] ✓ {} - {:.2}ms",
            progress.completed,
            progress.total,
            result.proxy_url(),
            result.latency_ms
        );
    } else if verbose {
        println!(
            "[{}/{}] ✗ {} - {}",
            progress.completed,
            progress.total,
            result.proxy_url(),
            result.error_detail
        );
    } else if progress.completed % 10 == 0 {
        println!(
            "[{}/{}] Progress: {:.1}%",
            progress.completed,
            progress.total,
            progress.percent()
        );
    }
}

fn print_statistics(results: &[ProbeResult]) {
    let rule = "=".repeat(80);
    println!("\n{rule}");
    println!("Statistics");
    println!("{rule}");
    println!("{}", aggregate(results));
    println!("{rule}");
}

fn print_fastest(results: &[ProbeResult]) {
    let working = working_by_latency(results);
    if working.is_empty() {
        return;
    }

    println!("\nWorking proxies:");
    for result in working.iter().take(FASTEST_SHOWN) {
        println!("  {} - {:.2}ms", result.proxy_url(), result.latency_ms);
    }
    if working.len() > FASTEST_SHOWN {
        println!("  ... and {} more", working.len() - FASTEST_SHOWN);
    }
}
