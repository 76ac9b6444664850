// src/main.rs
mod bot;
mod charts;
mod details;
mod edgar;
mod extractors;
mod server;
mod storage;
mod utils;

use bot::{FinancialBot, GeminiClient};
use clap::{Parser, Subcommand};
use details::DetailsService;
use edgar::{CompanyDetails, EdgarClient, FiscalPeriod};
use extractors::DedupPolicy;
use std::sync::Arc;
use storage::StorageManager;
use utils::config::{Settings, DEFAULT_BIND_ADDR};
use utils::AppError;

/// Financial metrics (revenue, net income, EPS) from SEC company facts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// User-Agent sent to the SEC ("AppName/Version (contact)")
    #[arg(long, env = "SEC_USER_AGENT", global = true)]
    user_agent: Option<String>,

    /// Key for the Gemini API (enables the bot)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", global = true)]
    gemini_model: Option<String>,

    /// Which disclosures collapse into one observation
    #[arg(long, value_enum, default_value_t = DedupPolicy::PeriodAndForm, global = true)]
    dedup_key: DedupPolicy,

    /// Output directory for charts and debug dumps
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: String,

    /// Debug mode - save the raw company facts document
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log at debug level (skipped facts, unit fallbacks)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the extracted metrics for a company
    Details {
        /// Ticker symbol of the company
        #[arg(short, long)]
        ticker: String,

        /// Fiscal year filter (e.g. 2022)
        #[arg(long)]
        year: Option<i32>,

        /// Fiscal period filter: Q1, Q2, Q3, Q4 or FY
        #[arg(long)]
        period: Option<FiscalPeriod>,

        /// Print the JSON API representation instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Render one metric's history to a PNG file
    Plot {
        /// Ticker symbol of the company
        #[arg(short, long)]
        ticker: String,

        /// Metric display name, e.g. "Net Income"
        #[arg(short, long)]
        metric: String,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
        bind: String,
    },
    /// Ask a question in plain English
    Ask {
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load .env before clap reads env fallbacks
    dotenv::dotenv().ok();

    // 2. Parse CLI Arguments
    let args = Args::parse();

    // 3. Setup Logging (RUST_LOG overrides --verbose)
    utils::logging::setup_logging(if args.verbose { "debug" } else { "info" });
    tracing::debug!("Starting with command: {:?}", args.command);

    let settings = Settings::resolve(
        args.user_agent.clone(),
        args.gemini_api_key.clone(),
        args.gemini_model.clone(),
        args.dedup_key,
    );

    // 4. Build the pipeline
    let fetcher = EdgarClient::new(&settings.user_agent)
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
    let details = Arc::new(DetailsService::with_defaults(
        Arc::new(fetcher),
        settings.dedup,
    ));

    match args.command {
        Command::Details {
            ticker,
            year,
            period,
            json,
        } => {
            let (cik, document) = details.fetch_document(&ticker).await?;
            if args.debug {
                StorageManager::new(&args.output_dir)?.save_raw_facts(&ticker, &document)?;
            }
            let company = details.build_details(&ticker, &cik, &document, year, period);
            if json {
                let text = serde_json::to_string_pretty(&company)
                    .map_err(|e| AppError::Config(format!("Failed to serialize details: {}", e)))?;
                println!("{}", text);
            } else {
                print_details(&company, year, period);
            }
        }
        Command::Plot { ticker, metric } => {
            let storage = StorageManager::new(&args.output_dir)?;
            details.catalog().require(&metric)?;
            let (cik, document) = details.fetch_document(&ticker).await?;
            if args.debug {
                storage.save_raw_facts(&ticker, &document)?;
            }
            let png = details.chart_from_document(&ticker, &cik, &document, &metric)?;
            let path = storage.save_chart(&ticker, &metric, &png)?;
            println!("Saved {} chart for {} ({} bytes) to {}", metric, ticker, png.len(), path.display());
        }
        Command::Serve { bind } => {
            let state = Arc::new(server::AppState {
                bot: build_bot(&settings, details.clone())?,
                details,
            });
            server::serve(state, &bind).await?;
        }
        Command::Ask { question } => {
            let bot = build_bot(&settings, details)?.ok_or(utils::error::BotError::NotConfigured)?;
            let reply = bot.ask(&question).await?;
            println!("{}", reply.answer);
            if let Some(tool_response) = reply.debug_tool_response {
                tracing::info!("Tool response: {}", tool_response);
            }
        }
    }

    Ok(())
}

fn build_bot(settings: &Settings, details: Arc<DetailsService>) -> Result<Option<FinancialBot>, AppError> {
    let Some(api_key) = settings.gemini_api_key.as_deref() else {
        tracing::warn!("GEMINI_API_KEY not set; bot endpoint disabled");
        return Ok(None);
    };
    let model = GeminiClient::new(api_key, &settings.gemini_model)?;
    Ok(Some(FinancialBot::new(details, Arc::new(model))))
}

fn print_details(company: &CompanyDetails, year: Option<i32>, period: Option<FiscalPeriod>) {
    println!(
        "\n--- Financial Details for {} (Year: {}, Period: {}) ---",
        company.company_display_name,
        year.map(|y| y.to_string()).unwrap_or_else(|| "All".to_string()),
        period.map(|p| p.to_string()).unwrap_or_else(|| "All".to_string()),
    );
    for (name, metric) in company.metrics.iter() {
        println!("\nMetric: {} ({})", name, metric.unit);
        if metric.data.is_empty() {
            println!("No data found for this metric for the specified period.");
            continue;
        }
        println!(
            "{:<12} {:>20} {:<6} {:<12} {:<10}",
            "EndDate", "Value", "Form", "FiscalPeriod", "FiscalYear"
        );
        for obs in &metric.data {
            let fiscal_year = match &obs.fiscal_year {
                Some(edgar::FiscalYear::Number(n)) => n.to_string(),
                Some(edgar::FiscalYear::Text(s)) => s.clone(),
                None => "-".to_string(),
            };
            println!(
                "{:<12} {:>20} {:<6} {:<12} {:<10}",
                obs.end_date.to_string(),
                obs.value,
                obs.form.to_string(),
                obs.fiscal_period,
                fiscal_year
            );
        }
    }
}
