//! Prodload CLI - bulk product import from CSV
//!
//! # Commands
//!
//! ```bash
//! prodload serve                          # Start HTTP server (port 3000)
//! prodload import products.csv            # Import a file, print the per-row result
//! prodload import products.csv -s ';'     # Same, with a custom separator
//! prodload list                           # Print stored products as JSON
//! ```
//!
//! Products go to PostgreSQL when `DATABASE_URL` is set, otherwise to a
//! process-local store that lives as long as the command.

use clap::{Parser, Subcommand};
use prodload::logging::init_logging;
use prodload::{
    parse_file, BatchImporter, Config, ImportLog, MemoryStore, PgStore, ProductGateway,
    ProductStore, Separator, UploadResponse,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "prodload")]
#[command(about = "Import product catalogs from CSV with per-row validation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Address to bind (overrides PRODLOAD_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PRODLOAD_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Import a CSV file and print the batch result as JSON
    Import {
        /// Input CSV file
        input: PathBuf,

        /// Field separator (single ASCII character, default from config)
        #[arg(short, long)]
        separator: Option<String>,
    },

    /// List stored products as JSON
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = init_logging(&config.log_filter) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Serve { host, port } => cmd_serve(config, host, port).await,
        Commands::Import { input, separator } => cmd_import(&config, &input, separator.as_deref()).await,
        Commands::List => cmd_list(&config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// PostgreSQL when a URL is configured, memory otherwise.
async fn open_store(config: &Config) -> Result<Arc<dyn ProductStore>, Box<dyn std::error::Error>> {
    match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, config.database.max_connections).await?;
            tracing::info!("Using PostgreSQL product store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory product store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn cmd_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let store = open_store(&config).await?;
    prodload::server::start_server(&config, store).await
}

async fn cmd_import(
    config: &Config,
    input: &Path,
    separator: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let separator: Separator = match separator {
        Some(raw) => raw.parse()?,
        None => config.import.separator,
    };

    eprintln!("Importing: {} (separator '{}')", input.display(), separator);
    let rows = parse_file(input, separator)?;
    eprintln!("   Rows: {}", rows.len());

    let store = open_store(config).await?;
    let log = ImportLog::new();
    let gateway = ProductGateway::new(store, log.clone());
    let importer = BatchImporter::new(Arc::new(gateway), log);

    let result = importer.import_rows(&rows).await?;

    eprintln!(
        "Imported {} product(s), {} row(s) rejected",
        result.success_count, result.error_count
    );

    let response = UploadResponse::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn cmd_list(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let products = store.list_all().await?;
    eprintln!("{} product(s) stored", products.len());
    println!("{}", serde_json::to_string_pretty(&products)?);
    Ok(())
}
