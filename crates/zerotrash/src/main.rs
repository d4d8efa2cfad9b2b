mod impact;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use macro_rules_attribute::apply;
use smol_macros::main;

use zerotrash_places::geocoding::nominatim;
use zerotrash_places::{Options, Place, SearchBox};

#[derive(Parser)]
#[command(name = "zerotrash", version, about = "Zero-Trash waste reporting tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a location interactively: each input line replaces the query,
    /// `:N` picks suggestion N.
    Search(SearchArgs),
    /// Print community impact statistics from a JSON records snapshot.
    Impact {
        /// Snapshot with `reports`, `rewards` and `tasks` arrays.
        path: PathBuf,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Base URL of a Nominatim-compatible geocoding service.
    #[arg(long, env = "ZEROTRASH_GEOCODER_URL", default_value = nominatim::OPENSTREETMAP)]
    endpoint: String,
    /// API key, for services such as geocode.maps.co that require one.
    #[arg(long, env = "ZEROTRASH_GEOCODER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Milliseconds the query must stay unchanged before a lookup is sent.
    #[arg(long, default_value_t = 300)]
    quiet_period_ms: u64,
    /// Maximum number of suggestions.
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[apply(main!)]
async fn main(executor: Arc<async_executor::Executor<'static>>) {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,isahc=error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Search(args) => run_search(executor, args).await,
        Command::Impact { path } => match impact::report(&path).await {
            Ok(report) => print!("{report}"),
            Err(e) => {
                tracing::error!(%e, "impact report failed");
                std::process::exit(1);
            }
        },
    }
}

async fn run_search(executor: Arc<async_executor::Executor<'static>>, args: SearchArgs) {
    let mut backend = match nominatim::Backend::new(args.endpoint) {
        Ok(backend) => backend.with_limit(args.limit),
        Err(e) => {
            tracing::error!(%e, "failed to set up geocoder");
            std::process::exit(1);
        }
    };
    if let Some(key) = args.api_key {
        backend = backend.with_api_key(key);
    }
    let options = Options {
        quiet_period: Duration::from_millis(args.quiet_period_ms),
        ..Options::default()
    };

    let search = SearchBox::start(executor, backend, options, |place: &Place| {
        println!("{}", terminal::format_selection(place));
    });
    tracing::info!("type a location; `:N` selects suggestion N, EOF quits");
    terminal::run(search).await;
}
