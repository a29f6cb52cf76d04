use std::process;
use std::time::Duration;

use cairns_da::{MonthRange, ScraperConfig, WebScraper};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "cairns-da")]
#[command(about = "A Cairns Regional Council development application scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Override the portal's search initialization URL"
    )]
    search_url: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "MAILTO",
        help = "Override the mailto: address used for comment links"
    )]
    feedback_url: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Per-request timeout"
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Jsonl,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one month of lodgements and list the application detail pages found
    List {
        #[arg(
            long,
            value_name = "YYYY-MM",
            help = "Month to search (defaults to the current month)",
            value_parser = parse_month,
        )]
        month: Option<MonthRange>,
    },
    /// Search one month of lodgements and scrape every application found
    Scrape {
        #[arg(
            long,
            value_name = "YYYY-MM",
            help = "Month to search (defaults to the current month)",
            value_parser = parse_month,
        )]
        month: Option<MonthRange>,

        #[arg(
            long,
            default_value_t = 4,
            help = "Maximum number of detail pages fetched at once",
            value_parser = clap::value_parser!(u16).range(1..)
        )]
        concurrency: u16,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_month(s: &str) -> Result<MonthRange, String> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM: {}", e))?;
    MonthRange::for_month(first.year(), first.month())
        .ok_or_else(|| format!("invalid month '{}'", s))
}

fn serialize_json<T: serde::Serialize>(value: &T, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let defaults = ScraperConfig::default();
    let config = ScraperConfig {
        search_url: cli.search_url.unwrap_or(defaults.search_url),
        feedback_url: cli.feedback_url.unwrap_or(defaults.feedback_url),
        timeout: Duration::from_secs(cli.timeout),
        user_agent: defaults.user_agent,
    };

    let scraper = WebScraper::with_config(config).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::List { month } => {
            let range = month.unwrap_or_else(MonthRange::current);

            let session = scraper.bootstrap().await.unwrap_or_else(|e| {
                log::error!("Error opening portal session: {}", e);
                process::exit(1);
            });
            let results = session.search(range).await.unwrap_or_else(|e| {
                log::error!("Error searching applications: {}", e);
                process::exit(1);
            });

            if results.is_empty() {
                println!("No applications lodged {}.", range);
            } else {
                for (i, url) in results.detail_urls().iter().enumerate() {
                    println!("{:>3}. {}", i + 1, url);
                }
            }
        }

        Commands::Scrape {
            month,
            concurrency,
            format,
        } => {
            let range = month.unwrap_or_else(MonthRange::current);

            let report = scraper
                .scrape(range, usize::from(concurrency))
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error scraping applications: {}", e);
                    process::exit(1);
                });

            match format {
                OutputFormat::Json => serialize_json(&report.applications, true),
                OutputFormat::Jsonl => {
                    for application in &report.applications {
                        serialize_json(application, false);
                    }
                }
                OutputFormat::Text => {
                    if report.applications.is_empty() {
                        println!("No applications to display.");
                    } else {
                        for application in &report.applications {
                            println!("{}\n", application);
                        }
                    }
                    print!("{}", report);
                }
            }
        }
    }
}
