//! fcrawl main entry point
//!
//! This is the command-line interface for the fcrawl resource crawler.

use clap::Parser;
use fcrawl::crawler::HtmlCrawler;
use fcrawl::fetch::Downloader;
use fcrawl::uri::Uri;
use fcrawl::FcrawlError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// fcrawl: download a page and everything it references
///
/// fcrawl fetches the seed page, discovers href/src references while the
/// body is still arriving, downloads each referenced resource
/// concurrently, and reports storage name, size and Adler-32 checksum per
/// resource, plus the smallest and largest one encountered.
#[derive(Parser, Debug)]
#[command(name = "fcrawl")]
#[command(version)]
#[command(about = "Streaming HTML resource crawler", long_about = None)]
struct Cli {
    /// Seed page URI
    #[arg(value_name = "URI", default_value = "www.meetangee.com")]
    uri: String,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Cap on concurrent download workers (default: unlimited)
    #[arg(short, long, value_name = "N")]
    thread_limit: Option<usize>,

    /// Directory resources are stored into; must already exist
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // An unexpected extra argument exits 1; help/version and the
            // remaining usage errors keep clap's conventions.
            if e.kind() == clap::error::ErrorKind::UnknownArgument {
                let _ = e.print();
                return ExitCode::from(1);
            }
            e.exit();
        }
    };

    setup_logging(cli.verbose);

    // Failure wrapper: anything that escapes the run, an error or a
    // panic, is reported and mapped to exit code 64.
    match catch_unwind(AssertUnwindSafe(|| run(&cli))) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            eprintln!("fcrawl failed: {}", e);
            ExitCode::from(64)
        }
        Err(_) => {
            eprintln!("fcrawl failed: unhandled panic");
            ExitCode::from(64)
        }
    }
}

/// Sets up the tracing subscriber on stderr from the -v count.
fn setup_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("fcrawl=warn"),
        1 => EnvFilter::new("fcrawl=debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Runs the whole crawl: seed download through the crawler, pool drain,
/// report, elapsed times.
fn run(cli: &Cli) -> fcrawl::Result<()> {
    let run_started = Instant::now();

    if !cli.output_dir.is_dir() {
        return Err(FcrawlError::File {
            path: cli.output_dir.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        });
    }

    let seed = Uri::parse(&cli.uri);
    tracing::debug!("seed URI \"{}\", host \"{}\"", seed, seed.host);

    let mut crawler = HtmlCrawler::new(&seed, cli.thread_limit, &cli.output_dir);
    let downloader = Downloader::new(seed, cli.output_dir.join("index.html"));

    let download_started = Instant::now();
    if !downloader.run_with(&mut crawler) {
        // Nothing was parsed, so the report below comes out empty; the
        // failure itself has already been logged.
        tracing::error!("seed download failed");
    }
    println!(
        "Total download time: {} s",
        download_started.elapsed().as_secs_f64()
    );

    let report = crawler.finish();
    report.print();

    let stats = fcrawl::output::collect_statistics(&report);
    fcrawl::output::log_statistics(&stats);

    println!("Total run time: {} s", run_started.elapsed().as_secs_f64());
    Ok(())
}
