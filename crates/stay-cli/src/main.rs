//! `stay` CLI: search a rental knowledge base from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Three nights from 10 July, willing to shift a day either way
//! stay --kb cottages.json search --start-date 10.07.2025 --num-days 3 --shift-days 1
//!
//! # Filter by party size, city and lake distance
//! stay --kb cottages.json search --start-date 10.07.2025 --num-people 4 \
//!     --city tampere --max-lake-dist 200
//!
//! # Read the request as JSON (stdin with "-"), flags override its fields
//! echo '{"startDate":"10.07.2025","numDays":"3"}' | stay --kb cottages.json search --request -
//!
//! # Show the candidate windows a request would try
//! stay windows --start-date 10.07.2025 --num-days 3 --shift-days 2
//!
//! # Knowledge base statistics
//! stay --kb cottages.json stats
//! ```
//!
//! The knowledge base path may also come from `STAY_KB_PATH`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::time::Duration;
use stay_engine::aggregate::{DEFAULT_BOOKING_BASE, DEFAULT_QUERY_TIMEOUT};
use stay_engine::{
    generate_windows, search_raw, GraphStore, RawSearchRequest, SearchConfig, MAX_SHIFT_DAYS,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "stay", version, about = "Holiday rental availability search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Knowledge base document (JSON)
    #[arg(long, env = "STAY_KB_PATH", global = true)]
    kb: Option<String>,

    /// Log filter, e.g. "info" or "stay_engine=debug". Logs go to stderr.
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Find units matching a stay request
    Search {
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        tuning: TuningArgs,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the candidate date windows for a start date
    Windows {
        /// Start date, dd.mm.yyyy
        #[arg(long)]
        start_date: String,
        /// Nights per stay
        #[arg(long, default_value_t = 1)]
        num_days: u32,
        /// Days to shift the start either way
        #[arg(
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_SHIFT_DAYS))
        )]
        shift_days: u32,
    },
    /// Show knowledge base statistics
    Stats,
}

/// Request fields, taken as raw strings so malformed numbers fall back to
/// their defaults exactly as they would at any other entry point.
#[derive(Args)]
struct RequestArgs {
    /// JSON request file ("-" for stdin); individual flags override its fields
    #[arg(long)]
    request: Option<String>,
    #[arg(long)]
    booker_name: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    num_people: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    num_bedrooms: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    max_lake_dist: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    max_city_dist: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    num_days: Option<String>,
    /// Start date, dd.mm.yyyy
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    shift_days: Option<String>,
}

#[derive(Args)]
struct TuningArgs {
    /// Per-window query timeout in milliseconds
    #[arg(long, env = "STAY_QUERY_TIMEOUT_MS", default_value_t = DEFAULT_QUERY_TIMEOUT.as_millis() as u64)]
    query_timeout_ms: u64,
    /// First booking number of the search
    #[arg(long, env = "STAY_BOOKING_BASE", default_value_t = DEFAULT_BOOKING_BASE)]
    booking_base: u64,
    /// Query all windows concurrently
    #[arg(long)]
    parallel: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Search {
            request,
            tuning,
            output,
        } => {
            let store = load_store(cli.kb.as_deref())?;
            let raw = build_request(&request)?;
            let config = SearchConfig {
                booking_base: tuning.booking_base,
                query_timeout: Duration::from_millis(tuning.query_timeout_ms),
                parallel: tuning.parallel,
            };
            let response = search_raw(&store, &raw, &config).context("Search failed")?;
            let json = serde_json::to_string_pretty(&response)?;
            write_output(output.as_deref(), &json)?;
        }
        Commands::Windows {
            start_date,
            num_days,
            shift_days,
        } => {
            let windows = generate_windows(&start_date, num_days.max(1), shift_days)
                .context("Failed to generate windows")?;
            println!("{}", serde_json::to_string_pretty(&windows)?);
        }
        Commands::Stats => {
            let store = load_store(cli.kb.as_deref())?;
            let stats = store.stats();
            println!("Units:         {}", stats.units);
            println!("Periods:       {}", stats.periods);
            println!("Free periods:  {}", stats.free_periods);
            println!("Links:         {}", stats.edges);
        }
    }

    Ok(())
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter: '{}'", filter))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    Ok(())
}

fn load_store(path: Option<&str>) -> Result<GraphStore> {
    let path = path.context("No knowledge base given: pass --kb or set STAY_KB_PATH")?;
    let store = GraphStore::load(path)
        .with_context(|| format!("Knowledge base unavailable: {}", path))?;
    info!(path, units = store.stats().units, "knowledge base loaded");
    Ok(store)
}

/// Merge the optional JSON request with individual flags (flags win).
fn build_request(args: &RequestArgs) -> Result<RawSearchRequest> {
    let mut raw = match args.request.as_deref() {
        Some(source) => {
            let text = read_input(source)?;
            serde_json::from_str(&text).context("Failed to parse request JSON")?
        }
        None => RawSearchRequest::default(),
    };

    let overrides = [
        (&mut raw.booker_name, &args.booker_name),
        (&mut raw.num_people, &args.num_people),
        (&mut raw.num_bedrooms, &args.num_bedrooms),
        (&mut raw.max_lake_dist, &args.max_lake_dist),
        (&mut raw.city, &args.city),
        (&mut raw.max_city_dist, &args.max_city_dist),
        (&mut raw.num_days, &args.num_days),
        (&mut raw.start_date, &args.start_date),
        (&mut raw.shift_days, &args.shift_days),
    ];
    for (field, flag) in overrides {
        if flag.is_some() {
            *field = flag.clone();
        }
    }
    Ok(raw)
}

fn read_input(source: &str) -> Result<String> {
    match source {
        "-" => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
        path => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
