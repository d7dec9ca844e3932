mod export;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use booktags_lib::validation::{validate_max_pages, validate_topics};
use booktags_lib::{
    interrupt_channel, Client, CrawlConfig, Crawler, FileConfig, FilterMode, RotationKind,
};
use clap::Parser;

use crate::export::ExportFormat;

#[derive(Parser, Debug)]
#[command(name = "booktags")]
#[command(about = "Collect well-rated books for Douban tags")]
struct Cli {
    /// Tags to crawl, in order
    #[arg(required = true)]
    topics: Vec<String>,

    /// Listing pages to fetch per tag (1-100)
    #[arg(long, default_value_t = 3)]
    max_pages: u32,

    /// Minimum number of ratings a book needs to be kept
    #[arg(long, default_value_t = 300)]
    min_engagement: u64,

    /// Export format
    #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
    format: ExportFormat,

    /// Directory for exported files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Site base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Minimum pause before each request, in milliseconds
    #[arg(long)]
    delay_min_ms: Option<u64>,

    /// Maximum pause before each request, in milliseconds
    #[arg(long)]
    delay_max_ms: Option<u64>,

    /// Pick request identities at random instead of in turn
    #[arg(long)]
    random_identity: bool,

    /// Drop books below the engagement threshold while crawling
    #[arg(long)]
    eager_filter: bool,

    /// Fetch detail pages for books listed without a rating count
    #[arg(long)]
    detail_lookup: bool,
}

/// Layers defaults, the config file, `BOOKTAGS_*` variables, and flags.
fn build_config(cli: &Cli) -> Result<CrawlConfig> {
    let mut config = CrawlConfig::default();
    if let Some(path) = &cli.config {
        config.apply_file(FileConfig::load(path)?);
    }
    config.apply_env();

    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(ms) = cli.delay_min_ms {
        config.policy.delay.min = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.delay_max_ms {
        config.policy.delay.max = Duration::from_millis(ms);
    }
    if cli.random_identity {
        config.rotation = RotationKind::Random;
    }
    if cli.eager_filter {
        config.policy.filter_mode = FilterMode::Eager;
    }
    if cli.detail_lookup {
        config.detail_lookup = true;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("booktags=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let topics = validate_topics(&cli.topics)?;
    let max_pages = validate_max_pages(cli.max_pages)?;
    let config = build_config(&cli)?;

    tracing::info!(
        "Tags: {} | up to {} pages each | keeping books with >= {} ratings",
        topics.join(", "),
        max_pages,
        cli.min_engagement
    );

    let (handle, interrupt) = interrupt_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing with what has been collected");
            handle.raise();
        }
    });

    let client = Client::with_base_url(&config.base_url, config.timeout)?;
    let mut crawler = Crawler::from_config(client, &config)?.with_interrupt(interrupt);
    let report = crawler.run(&topics, max_pages, cli.min_engagement).await;

    output::print_summary(&report, cli.min_engagement);
    if report.is_empty() {
        eprintln!("{}", output::no_data_message());
        return Ok(());
    }

    for path in export::export(&report, cli.format, &cli.out_dir)? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("booktags").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&["python", "心理学"]);
        assert_eq!(cli.topics, vec!["python", "心理学"]);
        assert_eq!(cli.max_pages, 3);
        assert_eq!(cli.min_engagement, 300);
        assert_eq!(cli.format, ExportFormat::Xlsx);
        assert_eq!(cli.out_dir, PathBuf::from("."));
        assert!(!cli.eager_filter);
    }

    #[test]
    fn topics_required() {
        assert!(Cli::try_parse_from(["booktags"]).is_err());
    }

    #[test]
    fn format_values() {
        assert_eq!(parse(&["x", "--format", "csv"]).format, ExportFormat::Csv);
        assert_eq!(parse(&["x", "--format", "json"]).format, ExportFormat::Json);
        assert!(Cli::try_parse_from(["booktags", "x", "--format", "pdf"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("booktags.toml");
        std::fs::write(
            &path,
            "delay_min_ms = 100\ndelay_max_ms = 200\nmax_retries = 2\nrotation = \"round_robin\"\n",
        )
        .unwrap();

        let cli = parse(&[
            "python",
            "--config",
            path.to_str().unwrap(),
            "--delay-max-ms",
            "900",
            "--random-identity",
            "--eager-filter",
            "--detail-lookup",
            "--base-url",
            "http://127.0.0.1:9999",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.policy.delay.min, Duration::from_millis(100));
        assert_eq!(config.policy.delay.max, Duration::from_millis(900));
        assert_eq!(config.policy.max_retries, 2);
        assert_eq!(config.rotation, RotationKind::Random);
        assert_eq!(config.policy.filter_mode, FilterMode::Eager);
        assert!(config.detail_lookup);
        assert_eq!(config.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn inverted_delay_rejected() {
        let cli = parse(&["python", "--delay-min-ms", "5000", "--delay-max-ms", "10"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn missing_config_file_rejected() {
        let cli = parse(&["python", "--config", "/nonexistent/booktags.toml"]);
        assert!(build_config(&cli).is_err());
    }
}
